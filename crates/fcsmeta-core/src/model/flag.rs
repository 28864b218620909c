//! Processing-state flag on tube records

use crate::errors::{FcsMetaError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of processing states a TubeCase can be in.
///
/// The wire string (what is persisted in `TubeCases.flag`) is returned by
/// [`Flag::as_str`]; anything else is rejected by [`Flag::from_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Flag {
    /// Ingested, awaiting downstream processing
    #[serde(rename = "Pending")]
    Pending,
    /// Downstream QC completed
    #[serde(rename = "Processed")]
    Processed,
    /// Placeholder synthesized from a custom classification file
    #[serde(rename = "CustomData_ONLY")]
    CustomDataOnly,
    /// Processing failed; the error message says why
    #[serde(rename = "Error")]
    Error,
}

impl Flag {
    pub const ALL: [Flag; 4] = [
        Flag::Pending,
        Flag::Processed,
        Flag::CustomDataOnly,
        Flag::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Pending => "Pending",
            Flag::Processed => "Processed",
            Flag::CustomDataOnly => "CustomData_ONLY",
            Flag::Error => "Error",
        }
    }

    /// Flagged tubes carry an error message and are excluded from
    /// "not flagged" selections.
    pub fn is_flagged(&self) -> bool {
        matches!(self, Flag::CustomDataOnly | Flag::Error)
    }

    /// Check that `error_message` agrees with this flag.
    ///
    /// Flagged states need a non-empty message, unflagged states need none.
    pub fn validate_message(&self, error_message: Option<&str>) -> Result<()> {
        let has_message = error_message.is_some_and(|m| !m.trim().is_empty());
        if self.is_flagged() && !has_message {
            return Err(FcsMetaError::FlagMessageMismatch {
                flag: self.as_str().to_string(),
                requirement: "requires an error message".to_string(),
            });
        }
        if !self.is_flagged() && error_message.is_some() {
            return Err(FcsMetaError::FlagMessageMismatch {
                flag: self.as_str().to_string(),
                requirement: "must not carry an error message".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = FcsMetaError;

    fn from_str(s: &str) -> Result<Self> {
        Flag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| FcsMetaError::UnknownFlag {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_wire_strings() {
        for flag in Flag::ALL {
            assert_eq!(flag.as_str().parse::<Flag>().unwrap(), flag);
        }
    }

    #[test]
    fn test_rejects_unknown_value() {
        let err = "GOOD".parse::<Flag>().unwrap_err();
        assert_eq!(
            err,
            FcsMetaError::UnknownFlag {
                value: "GOOD".to_string()
            }
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert!("customdata_only".parse::<Flag>().is_err());
    }

    #[test]
    fn test_flagged_requires_message() {
        assert!(Flag::Error.validate_message(Some("bad file")).is_ok());
        assert!(Flag::Error.validate_message(None).is_err());
        assert!(Flag::CustomDataOnly.validate_message(Some("  ")).is_err());
    }

    #[test]
    fn test_unflagged_rejects_message() {
        assert!(Flag::Processed.validate_message(None).is_ok());
        assert!(Flag::Pending.validate_message(Some("stale")).is_err());
        assert!(Flag::Pending.validate_message(Some("")).is_err());
    }

    #[test]
    fn test_serde_uses_wire_strings() {
        let json = serde_json::to_string(&Flag::CustomDataOnly).unwrap();
        assert_eq!(json, "\"CustomData_ONLY\"");
    }
}

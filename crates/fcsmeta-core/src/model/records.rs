//! Case, tube and channel records

use crate::model::flag::Flag;
use serde::{Deserialize, Serialize};

/// Error message stamped on tubes synthesized from a classification file.
pub const PLACEHOLDER_ERROR_MESSAGE: &str =
    "Added to db because in custom list but not in metadb";

/// One clinical/research subject submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub case_number: String,
    pub date: Option<String>,
    /// Custom classification, back-filled by reconciliation
    pub category: Option<String>,
}

impl Case {
    pub fn new(case_number: impl Into<String>) -> Self {
        Self {
            case_number: case_number.into(),
            date: None,
            category: None,
        }
    }
}

/// One physical specimen tube, tied to exactly one Case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeCase {
    pub case_tube_idx: i64,
    pub case_number: String,
    pub flag: Flag,
    pub error_message: Option<String>,
    pub filename: Option<String>,
    pub tube_type_raw: Option<String>,
    pub date: Option<String>,
    pub cytometer: Option<String>,
    pub cytnum: Option<String>,
    pub specimen: Option<String>,
    pub total_events: Option<i64>,
}

impl TubeCase {
    /// A freshly ingested tube awaiting processing.
    pub fn new(case_tube_idx: i64, case_number: impl Into<String>) -> Self {
        Self {
            case_tube_idx,
            case_number: case_number.into(),
            flag: Flag::Pending,
            error_message: None,
            filename: None,
            tube_type_raw: None,
            date: None,
            cytometer: None,
            cytnum: None,
            specimen: None,
            total_events: None,
        }
    }
}

/// One detector channel of a tube acquisition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PmtTubeCase {
    pub case_tube_idx: i64,
    pub channel_number: i64,
    pub channel_name: Option<String>,
    pub antigen: Option<String>,
    pub fluorophore: Option<String>,
    pub voltage: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tube_is_pending_without_message() {
        let tube = TubeCase::new(1, "A100");
        assert_eq!(tube.flag, Flag::Pending);
        assert!(tube.error_message.is_none());
    }
}

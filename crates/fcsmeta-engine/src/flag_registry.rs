//! Tube flag state transitions

use fcsmeta_core::errors::{ExError, FcsMetaError};
use fcsmeta_core::model::Flag;
use fcsmeta_core::{log_op_end, log_op_error, log_op_start};
use fcsmeta_store::errors::{from_rusqlite, Result};
use fcsmeta_store::repo::tube_cases;
use rusqlite::Connection;

pub struct FlagRegistry;

impl FlagRegistry {
    /// Set the flag and error message of one tube in a single transaction.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if the message does not suit the flag
    /// - `NotFound` if no tube has `case_tube_idx`
    /// - `Integrity` if more than one does
    pub fn set_flag(
        conn: &mut Connection,
        case_tube_idx: i64,
        flag: Flag,
        error_message: Option<&str>,
    ) -> Result<()> {
        log_op_start!("set_flag", case_tube_idx = case_tube_idx, flag = flag.as_str());
        let start = std::time::Instant::now();

        Self::set_flag_impl(conn, case_tube_idx, flag, error_message).map_err(|e| {
            log_op_error!(
                "set_flag",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            e
        })?;

        log_op_end!(
            "set_flag",
            duration_ms = start.elapsed().as_millis() as u64
        );
        Ok(())
    }

    fn set_flag_impl(
        conn: &mut Connection,
        case_tube_idx: i64,
        flag: Flag,
        error_message: Option<&str>,
    ) -> Result<()> {
        let tx = conn.transaction().map_err(from_rusqlite)?;
        Self::apply(&tx, case_tube_idx, flag, error_message)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    /// Apply a transition on the caller's connection or transaction.
    pub(crate) fn apply(
        conn: &Connection,
        case_tube_idx: i64,
        flag: Flag,
        error_message: Option<&str>,
    ) -> Result<()> {
        flag.validate_message(error_message)
            .map_err(|e| ExError::from(e).with_entity_id(case_tube_idx.to_string()))?;

        match tube_cases::count_by_idx(conn, case_tube_idx)? {
            0 => Err(FcsMetaError::TubeCaseNotFound { case_tube_idx }.into()),
            1 => {
                tube_cases::update_flag(conn, case_tube_idx, flag, error_message)?;
                tracing::debug!(case_tube_idx, flag = flag.as_str(), "flag applied");
                Ok(())
            }
            matches => Err(FcsMetaError::DuplicateTubeCase {
                case_tube_idx,
                matches,
            }
            .into()),
        }
    }
}

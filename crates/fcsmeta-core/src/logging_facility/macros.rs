//! Operation boundary macros
//!
//! Every engine entry point brackets its work with one start event and one
//! terminal event (`end` or `end_error`). All three macros stamp the same
//! `component`, `op` and `event` fields so captured output can be filtered by
//! operation name alone. Extra `key = value` fields are passed straight
//! through to `tracing`.

/// Shared expansion behind the public boundary macros.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_op_event {
    ($level:expr, $event:ident, $op:expr $(, $($field:tt)*)?) => {
        $crate::logging_facility::__private::tracing::event!(
            $level,
            component = module_path!(),
            op = $op,
            event = $crate::logging_facility::__private::schema::$event,
            $($($field)*)?
        )
    };
}

/// Emit the `start` event for `op`.
///
/// ```
/// # use fcsmeta_core::log_op_start;
/// log_op_start!("set_flag");
/// log_op_start!("set_flag", case_tube_idx = 12);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            $crate::logging_facility::__private::tracing::Level::INFO,
            EVENT_START,
            $op
            $(, $($field)*)?
        )
    };
}

/// Emit the `end` event for `op`. `duration_ms` is mandatory.
///
/// ```
/// # use fcsmeta_core::log_op_end;
/// log_op_end!("set_flag", duration_ms = 3);
/// log_op_end!("import_custom_case_data", duration_ms = 8, rows = 2);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        $crate::__log_op_event!(
            $crate::logging_facility::__private::tracing::Level::INFO,
            EVENT_END,
            $op,
            duration_ms = $duration
            $(, $($field)*)?
        )
    };
}

/// Emit the `end_error` event for `op`, tagged with the error's kind and
/// stable code. `$err` is anything convertible into `ExError`.
///
/// ```
/// # use fcsmeta_core::{log_op_error, errors::FcsMetaError};
/// let err = FcsMetaError::TubeCaseNotFound { case_tube_idx: 9 };
/// log_op_error!("set_flag", err, duration_ms = 1);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let failure: $crate::errors::ExError = ::core::convert::Into::into($err);
        $crate::__log_op_event!(
            $crate::logging_facility::__private::tracing::Level::ERROR,
            EVENT_END_ERROR,
            $op,
            duration_ms = $duration,
            err_kind = ?failure.kind(),
            err_code = failure.code()
            $(, $($field)*)?
        )
    }};
}

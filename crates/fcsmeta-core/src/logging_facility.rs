//! Logging for fcsmeta binaries and tests
//!
//! Binaries call [`init`] once with a [`Profile`]. Library code logs through
//! `tracing` directly; engine entry points use the boundary macros
//! (`log_op_start!`, `log_op_end!`, `log_op_error!`) so each operation yields
//! a matched pair of events. Tests install [`init_test_capture`] instead and
//! assert on what was recorded.
//!
//! ```rust
//! use fcsmeta_core::logging_facility::{init, Profile};
//!
//! init(Profile::Development);
//! ```

pub mod init;
pub mod macros;
pub mod test_capture;

pub use init::{init, Profile};
pub use test_capture::{init_test_capture, CapturedEvent, TestCapture};

/// Paths the exported macros expand to, so callers need no direct
/// `tracing` or `fcsmeta-core-types` dependency.
#[doc(hidden)]
pub mod __private {
    pub use fcsmeta_core_types::schema;
    pub use tracing;
}

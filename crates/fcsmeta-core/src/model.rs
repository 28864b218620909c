//! Domain model for the FCS metadata store

pub mod flag;
pub mod records;
pub mod table;

pub use flag::Flag;
pub use records::{Case, PmtTubeCase, TubeCase, PLACEHOLDER_ERROR_MESSAGE};
pub use table::{cell_to_string, TableData, TableName};

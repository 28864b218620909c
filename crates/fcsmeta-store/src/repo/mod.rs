//! Repository layer: typed CRUD per table
//!
//! Every function takes a `&Connection`; pass a `Transaction` (which derefs to
//! a connection) to group several calls into one atomic unit.

pub mod cases;
pub mod custom_data;
pub mod reference;
pub mod tube_cases;

pub mod cases;
pub mod custom;
pub mod db;
pub mod flag;
pub mod query;
pub mod table;

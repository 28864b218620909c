//! fcsmeta Engine - Orchestration layer
//!
//! Coordinates core domain rules with the store:
//! - `FlagRegistry`: tube flag/error-message transitions
//! - `CaseReconciler`: classification import and placeholder synthesis
//! - `MetadataGateway`: the façade over schema, import, export, query and removal
//!
//! Every public operation here logs its boundary with `log_op_start!`,
//! `log_op_end!` and `log_op_error!`. Lower layers use only `tracing::debug!()`.

pub mod flag_registry;
pub mod gateway;
pub mod reconciler;

pub use flag_registry::FlagRegistry;
pub use gateway::{GatewayOptions, MetadataGateway, QueryOutput, RemovalSummary};
pub use reconciler::{CaseReconciler, ImportSummary};

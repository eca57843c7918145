//! Multi-record CRUD staged under one logical action.
//!
//! Salesforce's REST surface has no multi-record endpoint for these verbs,
//! so each staged entry costs one call; the batch context exists to resolve
//! all follow-up reads in a single aggregate query at commit time.

pub mod batch;
pub mod operation;

pub use batch::{BatchContext, BatchState};
pub use operation::RecordAction;

//! SOQL query construction and pagination.
//!
//! Queries are built once as a string and executed through the call
//! executor; continuation uses the opaque cursor Salesforce returns
//! instead of rebuilding the SELECT.

pub mod query;

pub use query::{build_field_list, continuation_path, QueryPage, SoqlQuery};

//! Salesforce REST API surface.
//!
//! The call executor handles transport and session refresh; metadata,
//! query, and operations build on it for schema discovery, SOQL reads,
//! and batched writes.

pub mod client;
pub mod inflect;
pub mod metadata;
pub mod operations;
pub mod query;

pub use client::{ClientOptions, SalesforceClient};
pub use metadata::{
    FieldDescriptor, FieldType, SObjectDescriptor, SchemaIntrospector, DEFAULT_ID_FIELD,
};
pub use operations::{BatchContext, BatchState, RecordAction};
pub use query::{build_field_list, continuation_path, QueryPage, SoqlQuery};

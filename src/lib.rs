//! A table-style data service adapter for the Salesforce REST API.
//!
//! Callers issue schema-discovery and CRUD requests against named SObjects;
//! the adapter translates them into authenticated HTTP calls, handling
//! session acquisition, token refresh, SOQL construction and multi-record
//! batching.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod platform;
pub mod service;

pub use api::{
    BatchContext, BatchState, FieldDescriptor, FieldType, QueryPage, RecordAction,
    SObjectDescriptor, SalesforceClient, SoqlQuery, DEFAULT_ID_FIELD,
};
pub use auth::{AuthManager, Session, SessionCache, SessionKey};
pub use config::{ConnectionConfig, Credentials, DelegatedTokenRef, SALESFORCE_API_VERSION};
pub use error::{Error, Result};
pub use platform::{AccessChecker, SchemaExtras, TokenProvider, TokenResponse};
pub use service::{QueryOptions, ResourceListing, SalesforceService, WriteOptions};

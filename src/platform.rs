//! Narrow interfaces to the surrounding platform.
//!
//! The adapter consumes these collaborators but never implements them:
//! delegated token lookup lives with the identity provider, display-name
//! overlays with the schema-extras store, and permission checks upstream.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Response payload captured when a delegated token was originally granted.
#[derive(Debug, Clone)]
pub struct TokenResponse {
    pub access_token: String,
    pub instance_url: String,
}

/// Lookup of externally managed OAuth tokens, keyed by (service, user).
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Currently valid access token, if the provider holds one.
    async fn cached_token(&self, service_ref: &str, user_ref: &str) -> Option<String>;

    /// Full grant response including the instance URL.
    async fn token_response(&self, service_ref: &str, user_ref: &str) -> Option<TokenResponse>;
}

/// Label/plural-name overrides merged onto resource names for display.
/// Must never affect query semantics.
pub trait SchemaExtras: Send + Sync {
    /// Overrides keyed by lower-cased resource name.
    fn extras_for(&self, names: &[String]) -> HashMap<String, ResourceExtras>;
}

#[derive(Debug, Clone, Default)]
pub struct ResourceExtras {
    pub label: Option<String>,
    pub plural: Option<String>,
}

/// Consulted only to filter which resource names are advertised; CRUD
/// enforcement lives upstream.
pub trait AccessChecker: Send + Sync {
    fn has_access(&self, resource_path: &str) -> bool;
}

/// Provider with no tokens; forces the legacy credential exchange.
pub struct NoTokenProvider;

#[async_trait]
impl TokenProvider for NoTokenProvider {
    async fn cached_token(&self, _service_ref: &str, _user_ref: &str) -> Option<String> {
        None
    }

    async fn token_response(&self, _service_ref: &str, _user_ref: &str) -> Option<TokenResponse> {
        None
    }
}

/// No display overrides.
pub struct NoSchemaExtras;

impl SchemaExtras for NoSchemaExtras {
    fn extras_for(&self, _names: &[String]) -> HashMap<String, ResourceExtras> {
        HashMap::new()
    }
}

/// Advertises everything.
pub struct AllowAll;

impl AccessChecker for AllowAll {
    fn has_access(&self, _resource_path: &str) -> bool {
        true
    }
}

pub fn default_token_provider() -> Arc<dyn TokenProvider> {
    Arc::new(NoTokenProvider)
}

pub fn default_schema_extras() -> Arc<dyn SchemaExtras> {
    Arc::new(NoSchemaExtras)
}

pub fn default_access_checker() -> Arc<dyn AccessChecker> {
    Arc::new(AllowAll)
}

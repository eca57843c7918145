//! Schema introspection for SObjects.
//!
//! Resource names and per-resource descriptors are fetched lazily and
//! cached until an explicit refresh; Salesforce has no metadata-change
//! notification, so staleness is accepted by design.
//!
//! The identifier field reported here is always the literal `Id`. Describe
//! metadata does mark id-typed fields, but the REST API exposes the
//! implicit identifier under that fixed name for every SObject, so the
//! flag is deliberately not trusted.

pub mod models;

pub use models::{FieldDescriptor, FieldType, SObjectDescriptor, DEFAULT_ID_FIELD};

use crate::api::client::SalesforceClient;
use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SchemaIntrospector {
    client: Arc<SalesforceClient>,
    names: RwLock<Option<Vec<String>>>,
    descriptors: RwLock<HashMap<String, Arc<SObjectDescriptor>>>,
}

impl SchemaIntrospector {
    pub fn new(client: Arc<SalesforceClient>) -> Self {
        Self {
            client,
            names: RwLock::new(None),
            descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// Raw resource-list entries as Salesforce reports them.
    pub async fn sobjects(&self) -> Result<Vec<Value>> {
        let result = self
            .client
            .call_resource(Method::GET, "sobjects", &[], None)
            .await?;
        Ok(result
            .get("sobjects")
            .and_then(|s| s.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Resource names in remote-reported order, cached after the first call.
    pub async fn list_resource_names(&self) -> Result<Vec<String>> {
        if let Some(names) = self.names.read().await.as_ref() {
            log::debug!("serving {} resource names from cache", names.len());
            return Ok(names.clone());
        }

        let names: Vec<String> = self
            .sobjects()
            .await?
            .iter()
            .filter_map(|entry| entry.get("name").and_then(|n| n.as_str()))
            .map(str::to_string)
            .collect();

        *self.names.write().await = Some(names.clone());
        Ok(names)
    }

    /// Cached descriptor for `name`, fetching the describe on first use.
    pub async fn describe(&self, name: &str) -> Result<Arc<SObjectDescriptor>> {
        if name.is_empty() {
            return Err(Error::BadRequest("Table name can not be empty.".into()));
        }

        let key = name.to_lowercase();
        if let Some(descriptor) = self.descriptors.read().await.get(&key) {
            log::debug!("serving descriptor for '{}' from cache", name);
            return Ok(descriptor.clone());
        }

        let result = self
            .client
            .call_resource(Method::GET, &format!("sobjects/{}/describe", name), &[], None)
            .await
            .map_err(|err| match err {
                Error::Remote { status: 404, .. } => {
                    Error::NotFound(format!("Table '{}' not found.", name))
                }
                other => other,
            })?;

        let descriptor = SObjectDescriptor::from_describe(&result)
            .map(Arc::new)
            .ok_or_else(|| {
                Error::Transport(format!("malformed describe response for '{}'", name))
            })?;

        self.descriptors
            .write()
            .await
            .insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Single field of a resource; absence is a normal `NotFound` outcome.
    pub async fn describe_field(&self, table: &str, field: &str) -> Result<FieldDescriptor> {
        let descriptor = self.describe(table).await?;
        descriptor
            .field(field)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Field '{}' not found.", field)))
    }

    /// Clears the name list and every cached descriptor.
    pub async fn refresh(&self) {
        *self.names.write().await = None;
        self.descriptors.write().await.clear();
        log::debug!("schema cache cleared");
    }
}

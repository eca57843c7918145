//! The table-style data service exposed to the surrounding platform.
//!
//! `SalesforceService` wires the auth manager, call executor, schema
//! introspector and batch coordinator together behind the operations the
//! platform consumes: schema discovery, SOQL queries and batched CRUD.

use crate::api::client::{ClientOptions, SalesforceClient};
use crate::api::inflect;
use crate::api::metadata::{FieldDescriptor, SObjectDescriptor, SchemaIntrospector, DEFAULT_ID_FIELD};
use crate::api::operations::batch::{fetch_record, BatchContext};
use crate::api::operations::operation::{record_id, RecordAction};
use crate::api::query::{build_field_list, continuation_path, QueryPage, SoqlQuery};
use crate::auth::{AuthManager, SessionCache};
use crate::config::ConnectionConfig;
use crate::error::{Error, Result};
use crate::platform::{
    default_access_checker, default_schema_extras, default_token_provider, AccessChecker,
    SchemaExtras, TokenProvider,
};
use reqwest::Method;
use serde_json::Value;
use std::sync::Arc;

/// Path prefixes under which resources are advertised to the platform.
const SCHEMA_RESOURCE: &str = "_schema";
const TABLE_RESOURCE: &str = "_table";

#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Option<String>,
    /// Comma-separated field list, or `*` for every described field.
    pub fields: Option<String>,
    pub order: Option<String>,
    pub offset: u64,
    pub limit: u64,
    pub include_count: bool,
    /// Continuation token from a previous page; when set, all other
    /// options are ignored and the cursor is consumed instead.
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Fields to return for affected rows; implies a commit-time fetch.
    pub fields: Option<String>,
    /// Return enriched rows even without an explicit field list.
    pub require_full_record: bool,
}

impl WriteOptions {
    fn wants_full_record(&self) -> bool {
        self.require_full_record || self.fields.is_some()
    }
}

/// A resource name with its display overlay applied.
#[derive(Debug, Clone)]
pub struct ResourceListing {
    pub name: String,
    pub label: String,
    pub plural: String,
}

pub struct ServiceBuilder {
    config: ConnectionConfig,
    cache: Option<SessionCache>,
    token_provider: Arc<dyn TokenProvider>,
    extras: Arc<dyn SchemaExtras>,
    access: Arc<dyn AccessChecker>,
    client_options: ClientOptions,
    login_url: Option<String>,
}

impl ServiceBuilder {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            cache: None,
            token_provider: default_token_provider(),
            extras: default_schema_extras(),
            access: default_access_checker(),
            client_options: ClientOptions::default(),
            login_url: None,
        }
    }

    /// Defaults to the process-wide shared cache.
    pub fn session_cache(mut self, cache: SessionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = provider;
        self
    }

    pub fn schema_extras(mut self, extras: Arc<dyn SchemaExtras>) -> Self {
        self.extras = extras;
        self
    }

    pub fn access_checker(mut self, access: Arc<dyn AccessChecker>) -> Self {
        self.access = access;
        self
    }

    pub fn client_options(mut self, options: ClientOptions) -> Self {
        self.client_options = options;
        self
    }

    pub fn login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    pub fn build(self) -> SalesforceService {
        let cache = self.cache.unwrap_or_else(SessionCache::shared);
        let mut auth = AuthManager::new(self.config, cache, self.token_provider);
        if let Some(url) = self.login_url {
            auth = auth.with_login_url(url);
        }
        let client = Arc::new(SalesforceClient::with_options(auth, self.client_options));
        SalesforceService {
            schema: SchemaIntrospector::new(client.clone()),
            client,
            extras: self.extras,
            access: self.access,
        }
    }
}

pub struct SalesforceService {
    client: Arc<SalesforceClient>,
    schema: SchemaIntrospector,
    extras: Arc<dyn SchemaExtras>,
    access: Arc<dyn AccessChecker>,
}

impl SalesforceService {
    pub fn builder(config: ConnectionConfig) -> ServiceBuilder {
        ServiceBuilder::new(config)
    }

    pub fn new(config: ConnectionConfig) -> Self {
        ServiceBuilder::new(config).build()
    }

    pub fn client(&self) -> &SalesforceClient {
        &self.client
    }

    /// Eagerly acquires a session, surfacing credential problems early.
    pub async fn authenticate(&self) -> Result<()> {
        self.client.auth().session().await.map(|_| ())
    }

    // ---- schema discovery ----

    pub async fn list_resources(&self) -> Result<Vec<String>> {
        self.schema.list_resource_names().await
    }

    /// Names with their display overlay; overrides come from the schema
    /// extras collaborator, defaults are inflected from the name.
    pub async fn list_resources_detailed(&self) -> Result<Vec<ResourceListing>> {
        let names = self.schema.list_resource_names().await?;
        let overlay = self.extras.extras_for(&names);

        Ok(names
            .into_iter()
            .map(|name| {
                let extras = overlay.get(&name.to_lowercase()).cloned().unwrap_or_default();
                let label = extras
                    .label
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| inflect::labelize(&name));
                let plural = extras
                    .plural
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| inflect::pluralize(&label));
                ResourceListing { name, label, plural }
            })
            .collect())
    }

    pub async fn describe_resource(&self, name: &str) -> Result<Arc<SObjectDescriptor>> {
        self.schema.describe(name).await
    }

    pub async fn describe_field(&self, resource: &str, field: &str) -> Result<FieldDescriptor> {
        self.schema.describe_field(resource, field).await
    }

    /// Advertised resource paths, filtered through the access checker.
    pub async fn access_list(&self) -> Result<Vec<String>> {
        let names = self.schema.list_resource_names().await?;
        let mut resources = Vec::new();

        for prefix in [SCHEMA_RESOURCE, TABLE_RESOURCE] {
            let root = format!("{}/", prefix);
            if self.access.has_access(&root) {
                resources.push(root.clone());
                resources.push(format!("{}*", root));
            }
            for name in &names {
                let path = format!("{}/{}", prefix, name);
                if self.access.has_access(&path) {
                    resources.push(path);
                }
            }
        }
        Ok(resources)
    }

    pub async fn refresh_schema_cache(&self) {
        self.schema.refresh().await;
    }

    // ---- queries ----

    pub async fn query(&self, resource: &str, options: QueryOptions) -> Result<QueryPage> {
        let result = match &options.cursor {
            Some(cursor) => {
                // Scroll continuation never rebuilds the SELECT.
                self.client
                    .call_resource(Method::GET, &continuation_path(cursor), &[], None)
                    .await?
            }
            None => {
                let fields = self.resolve_field_list(resource, options.fields.as_deref()).await?;
                let query = SoqlQuery::new(resource, fields)
                    .with_filter(options.filter.clone().unwrap_or_default())
                    .with_order(options.order.clone().unwrap_or_default())
                    .with_offset(options.offset)
                    .with_limit(options.limit);
                let soql = query.to_soql();
                log::debug!("executing query: {}", soql);
                self.client
                    .call_resource(Method::GET, "query", &[("q".to_string(), soql)], None)
                    .await?
            }
        };
        Ok(QueryPage::from_response(&result, options.include_count))
    }

    // ---- batched CRUD ----

    pub async fn create_records(
        &self,
        resource: &str,
        records: &[Value],
        options: WriteOptions,
    ) -> Result<Vec<Value>> {
        if records.is_empty() {
            return Err(Error::BadRequest("There are no record sets in the request.".into()));
        }

        let mut batch = self
            .write_context(RecordAction::Create, resource, &options)
            .await?;
        for record in records {
            if let Err(err) = batch.stage_create(&self.client, record).await {
                batch.rollback().ok();
                return Err(err);
            }
        }
        batch.commit(&self.client).await
    }

    /// Updates records carrying their own identifiers. When `updates` is
    /// given it overlays every record's payload.
    pub async fn update_records(
        &self,
        resource: &str,
        records: &[Value],
        updates: Option<&Value>,
        options: WriteOptions,
    ) -> Result<Vec<Value>> {
        if records.is_empty() {
            return Err(Error::BadRequest("There are no record sets in the request.".into()));
        }

        let mut batch = self
            .write_context(RecordAction::Update, resource, &options)
            .await?;
        for record in records {
            let id = record_id(record, &[DEFAULT_ID_FIELD.to_string()]).ok_or_else(|| {
                Error::BadRequest("Record identifier can not be empty.".into())
            })?;
            let payload = updates.unwrap_or(record);
            if let Err(err) = batch.stage_update(&self.client, &id, payload).await {
                batch.rollback().ok();
                return Err(err);
            }
        }
        batch.commit(&self.client).await
    }

    /// Applies one update payload to every identified record.
    pub async fn update_records_by_ids(
        &self,
        resource: &str,
        ids: &[String],
        updates: &Value,
        options: WriteOptions,
    ) -> Result<Vec<Value>> {
        if ids.is_empty() {
            return Err(Error::BadRequest("Identifiers can not be empty.".into()));
        }

        let mut batch = self
            .write_context(RecordAction::Update, resource, &options)
            .await?;
        for id in ids {
            if let Err(err) = batch.stage_update(&self.client, id, updates).await {
                batch.rollback().ok();
                return Err(err);
            }
        }
        batch.commit(&self.client).await
    }

    pub async fn delete_records(
        &self,
        resource: &str,
        ids: &[String],
        options: WriteOptions,
    ) -> Result<Vec<Value>> {
        if ids.is_empty() {
            return Err(Error::BadRequest("Identifiers can not be empty.".into()));
        }

        let mut batch = self
            .write_context(RecordAction::Delete, resource, &options)
            .await?;
        for id in ids {
            if let Err(err) = batch.stage_delete(&self.client, id).await {
                batch.rollback().ok();
                return Err(err);
            }
        }
        batch.commit(&self.client).await
    }

    pub async fn read_records(
        &self,
        resource: &str,
        ids: &[String],
        fields: Option<&str>,
    ) -> Result<Vec<Value>> {
        if ids.is_empty() {
            return Err(Error::BadRequest("Identifiers can not be empty.".into()));
        }
        let fields = self.resolve_field_list(resource, fields).await?;

        // A single read needs no batching and goes straight to the record.
        if ids.len() == 1 {
            let row = fetch_record(&self.client, resource, &ids[0], &fields).await?;
            return Ok(vec![row]);
        }

        let mut batch = BatchContext::new(RecordAction::Read, resource).with_fields(fields);
        for id in ids {
            batch.stage_read(id)?;
        }
        batch.commit(&self.client).await
    }

    // ---- schema mutation: permanently unsupported ----

    pub async fn create_resource(&self, _name: &str, _properties: &Value) -> Result<Value> {
        Err(not_implemented())
    }

    pub async fn update_resource(&self, _name: &str, _properties: &Value) -> Result<Value> {
        Err(not_implemented())
    }

    pub async fn drop_resource(&self, _name: &str) -> Result<()> {
        Err(not_implemented())
    }

    pub async fn create_field(&self, _resource: &str, _field: &str, _properties: &Value) -> Result<Value> {
        Err(not_implemented())
    }

    pub async fn update_field(&self, _resource: &str, _field: &str, _properties: &Value) -> Result<Value> {
        Err(not_implemented())
    }

    pub async fn drop_field(&self, _resource: &str, _field: &str) -> Result<()> {
        Err(not_implemented())
    }

    // ---- helpers ----

    /// Expands `*` against the descriptor and guarantees the identifier
    /// field is present exactly once.
    async fn resolve_field_list(&self, resource: &str, fields: Option<&str>) -> Result<String> {
        match fields {
            Some("*") => {
                let descriptor = self.schema.describe(resource).await?;
                Ok(descriptor.field_names().join(","))
            }
            other => Ok(build_field_list(other, DEFAULT_ID_FIELD)),
        }
    }

    async fn write_context(
        &self,
        action: RecordAction,
        resource: &str,
        options: &WriteOptions,
    ) -> Result<BatchContext> {
        let mut batch = BatchContext::new(action, resource);
        if options.wants_full_record() {
            let fields = self
                .resolve_field_list(resource, options.fields.as_deref())
                .await?;
            batch = batch.with_fields(fields);
        }
        Ok(batch)
    }
}

fn not_implemented() -> Error {
    Error::NotImplemented("Metadata actions currently not supported.".into())
}

//! Batch transaction coordinator.
//!
//! A [`BatchContext`] stages one or more record operations under one
//! logical action and resolves them at commit time. Staging issues the
//! per-record REST call immediately; commit performs at most one aggregate
//! SELECT over all staged identifiers to return enriched rows. The state
//! machine runs strictly forward: `Open -> Staging -> Committed |
//! RolledBack`, and a closed context is never reused.
//!
//! Rollback is best-effort only. Salesforce offers no multi-record atomic
//! rollback, so it clears local staged state without undoing remote
//! mutations that already happened.

use crate::api::client::SalesforceClient;
use crate::api::metadata::DEFAULT_ID_FIELD;
use crate::api::operations::operation::{parse_record, RecordAction};
use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    Open,
    Staging,
    Committed,
    RolledBack,
}

pub struct BatchContext {
    action: RecordAction,
    resource: String,
    id_fields: Vec<String>,
    /// Field list for enrichment fetches; always contains the identifier.
    fields: String,
    require_full_record: bool,
    state: BatchState,
    /// Identifiers awaiting the commit-time aggregate fetch.
    staged_ids: Vec<String>,
    /// Identifier-only results, handed back verbatim at commit.
    results: Vec<Value>,
}

impl BatchContext {
    pub fn new(action: RecordAction, resource: impl Into<String>) -> Self {
        Self {
            action,
            resource: resource.into(),
            id_fields: vec![DEFAULT_ID_FIELD.to_string()],
            fields: DEFAULT_ID_FIELD.to_string(),
            require_full_record: false,
            state: BatchState::Open,
            staged_ids: Vec::new(),
            results: Vec::new(),
        }
    }

    /// Field list (already resolved, identifier included) to fetch for
    /// enriched results; also turns on full-record returns.
    pub fn with_fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = fields.into();
        self.require_full_record = true;
        self
    }

    /// Identifier fields for the keyed commit fetch. More than one field
    /// forces the per-id fallback, since `IN (...)` needs a single key.
    pub fn with_id_fields(mut self, id_fields: Vec<String>) -> Self {
        if !id_fields.is_empty() {
            self.id_fields = id_fields;
        }
        self
    }

    pub fn action(&self) -> RecordAction {
        self.action
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    pub fn staged_count(&self) -> usize {
        self.staged_ids.len() + self.results.len()
    }

    fn ensure_active(&mut self) -> Result<()> {
        match self.state {
            BatchState::Open | BatchState::Staging => {
                self.state = BatchState::Staging;
                Ok(())
            }
            _ => Err(Error::BadRequest(
                "Batch context is already closed.".into(),
            )),
        }
    }

    fn stage_id(&mut self, id: String) {
        if self.require_full_record {
            self.staged_ids.push(id);
        } else {
            let id_field = self.id_fields[0].clone();
            self.results.push(json!({ id_field: id }));
        }
    }

    /// Creates one record and stages the returned identifier.
    pub async fn stage_create(
        &mut self,
        client: &SalesforceClient,
        record: &Value,
    ) -> Result<()> {
        self.ensure_active()?;
        let parsed = parse_record(record, &self.id_fields)?;

        let result = client
            .call_resource(
                Method::POST,
                &format!("sobjects/{}", self.resource),
                &[],
                Some(&Value::Object(parsed)),
            )
            .await?;
        check_success(&result, "insert", &self.resource)?;

        let id = result
            .get("id")
            .and_then(|id| id.as_str())
            .ok_or_else(|| {
                Error::Transport(format!(
                    "create response for '{}' carried no record id",
                    self.resource
                ))
            })?
            .to_string();
        self.stage_id(id);
        Ok(())
    }

    /// Applies `record` (with any partial-update overlay already merged)
    /// to the row identified by `id` and stages the identifier.
    pub async fn stage_update(
        &mut self,
        client: &SalesforceClient,
        id: &str,
        record: &Value,
    ) -> Result<()> {
        self.ensure_active()?;
        require_id(id)?;
        let parsed = parse_record(record, &self.id_fields)?;

        let result = client
            .call_resource(
                Method::PATCH,
                &format!("sobjects/{}/{}", self.resource, id),
                &[],
                Some(&Value::Object(parsed)),
            )
            .await?;
        check_success(&result, "update", &self.resource)?;

        self.stage_id(id.to_string());
        Ok(())
    }

    /// Deletes the row identified by `id` and stages the identifier.
    pub async fn stage_delete(&mut self, client: &SalesforceClient, id: &str) -> Result<()> {
        self.ensure_active()?;
        require_id(id)?;

        let result = client
            .call_resource(
                Method::DELETE,
                &format!("sobjects/{}/{}", self.resource, id),
                &[],
                None,
            )
            .await?;
        check_success(&result, "delete", &self.resource)?;

        self.stage_id(id.to_string());
        Ok(())
    }

    /// Stages an identifier for batched read resolution at commit.
    pub fn stage_read(&mut self, id: &str) -> Result<()> {
        self.ensure_active()?;
        require_id(id)?;
        self.staged_ids.push(id.to_string());
        Ok(())
    }

    /// Resolves all staged identifiers. With a single identifier field the
    /// enrichment happens as one aggregate SELECT over every staged id;
    /// composite keys fall back to per-id fetches. Staged state is cleared
    /// and the context closed whether or not the fetch succeeds.
    pub async fn commit(&mut self, client: &SalesforceClient) -> Result<Vec<Value>> {
        self.ensure_active()?;
        let staged = std::mem::take(&mut self.staged_ids);
        let mut out = std::mem::take(&mut self.results);
        self.state = BatchState::Committed;

        if staged.is_empty() {
            return Ok(out);
        }

        let fetched = if self.id_fields.len() == 1 {
            let id_field = &self.id_fields[0];
            let id_list = format!("('{}')", staged.join("','"));
            let soql = format!(
                "SELECT {} FROM {} WHERE {} IN {}",
                self.fields, self.resource, id_field, id_list
            );
            log::debug!(
                "committing {} staged {} ids via aggregate query",
                staged.len(),
                self.action.as_str()
            );

            let result = client
                .call_resource(
                    Method::GET,
                    "query",
                    &[("q".to_string(), soql)],
                    None,
                )
                .await?;
            let records = result
                .get("records")
                .and_then(|r| r.as_array())
                .cloned()
                .unwrap_or_default();
            // Every staged id belonged to an existing row moments ago, so a
            // short result set fails the whole batch; the fetch cannot tell
            // a missing row from a filtered one at finer granularity.
            if records.len() < staged.len() {
                return Err(Error::NotFound(
                    "No records were found using the given identifiers.".into(),
                ));
            }
            records
        } else {
            let mut rows = Vec::with_capacity(staged.len());
            for id in &staged {
                rows.push(fetch_record(client, &self.resource, id, &self.fields).await?);
            }
            rows
        };

        out.extend(fetched);
        Ok(out)
    }

    /// Clears staged state and closes the context. Remote mutations that
    /// already happened stay applied.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.staged_ids.clear();
        self.results.clear();
        self.state = BatchState::RolledBack;
        Ok(())
    }
}

/// Direct fetch of one record by identifier.
pub async fn fetch_record(
    client: &SalesforceClient,
    resource: &str,
    id: &str,
    fields: &str,
) -> Result<Value> {
    require_id(id)?;
    let result = client
        .call_resource(
            Method::GET,
            &format!("sobjects/{}/{}", resource, id),
            &[("fields".to_string(), fields.to_string())],
            None,
        )
        .await
        .map_err(|err| match err {
            Error::Remote { status: 404, .. } => {
                Error::NotFound(format!("Record with identifier '{}' not found.", id))
            }
            other => other,
        })?;
    if result.is_null() {
        return Err(Error::NotFound(format!(
            "Record with identifier '{}' not found.",
            id
        )));
    }
    Ok(result)
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(Error::BadRequest("Record identifier can not be empty.".into()))
    } else {
        Ok(())
    }
}

/// Writes come back as `{id, success, errors}`; deletes and updates may
/// carry no body at all, which counts as success.
fn check_success(result: &Value, verb: &str, resource: &str) -> Result<()> {
    if result.is_null() {
        return Ok(());
    }
    let success = result
        .get("success")
        .and_then(|s| s.as_bool())
        // Bodies without the flag (e.g. enriched representations) pass.
        .unwrap_or(true);
    if success {
        return Ok(());
    }
    let errors = result
        .get("errors")
        .map(|e| e.to_string())
        .unwrap_or_default();
    Err(Error::remote(
        200,
        "OPERATION_FAILED",
        format!("Record {} failed for table '{}'. {}", verb, resource, errors),
    ))
}

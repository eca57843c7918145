//! Resilient call executor for the Salesforce REST API.
//!
//! Every logical call makes at most two physical attempts: one with the
//! current session, and one more with a freshly acquired session after
//! invalidating the cache entry, only when Salesforce answers 401. Non-401
//! rejections and transport failures surface immediately.

use crate::auth::{AuthManager, Session};
use crate::error::{Error, Result};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// REST data path below the instance host.
const DATA_PATH: &str = "services/data";

#[derive(Clone, Copy, Debug, Default)]
pub struct ClientOptions {
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

pub struct SalesforceClient {
    http: reqwest::Client,
    auth: AuthManager,
}

impl SalesforceClient {
    pub fn new(auth: AuthManager) -> Self {
        Self::with_options(auth, ClientOptions::default())
    }

    pub fn with_options(auth: AuthManager, options: ClientOptions) -> Self {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(options.timeout.unwrap_or(Duration::from_secs(60)))
            .connect_timeout(options.connect_timeout.unwrap_or(Duration::from_secs(10)))
            .user_agent("salesforce-db/1.0")
            .build()
            .unwrap_or_default();
        Self { http, auth }
    }

    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Issue a call against a versioned resource path, e.g.
    /// `call_resource(GET, "sobjects/Account/describe", ...)` becomes
    /// `GET {instance}/services/data/v37.0/sobjects/Account/describe`.
    pub async fn call_resource(
        &self,
        method: Method,
        resource: &str,
        parameters: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let session = self.auth.session().await?;
        let path = format!("v{}/{}", session.version, resource);
        self.invoke_with_session(session, method, &path, parameters, body)
            .await
    }

    /// Issue a call against an unversioned data path (`""` lists the
    /// available API versions).
    pub async fn invoke(
        &self,
        method: Method,
        path: &str,
        parameters: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let session = self.auth.session().await?;
        self.invoke_with_session(session, method, path, parameters, body)
            .await
    }

    async fn invoke_with_session(
        &self,
        session: Session,
        method: Method,
        path: &str,
        parameters: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        log::debug!("[{}] {} {}", correlation_id, method, path);

        let response = self
            .send(&session, method.clone(), path, parameters, body)
            .await?;
        let status = response.status();
        log::debug!("[{}] response status {}", correlation_id, status);

        if status.is_success() {
            return parse_json_body(response).await;
        }

        let (code, message) = parse_error_envelope(response).await;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Session expired remotely: clear the cache and resend the
            // request exactly once with a rebuilt session.
            log::info!(
                "[{}] session rejected, re-authenticating and retrying",
                correlation_id
            );
            self.auth.invalidate().await;
            let session = self.auth.session().await?;

            let response = self.send(&session, method, path, parameters, body).await?;
            let retry_status = response.status();
            log::debug!("[{}] retry response status {}", correlation_id, retry_status);

            if retry_status.is_success() {
                return parse_json_body(response).await;
            }
            let (code, message) = parse_error_envelope(response).await;
            return Err(Error::remote(retry_status.as_u16(), code, message));
        }

        Err(Error::remote(status.as_u16(), code, message))
    }

    async fn send(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        parameters: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let url = format!(
            "{}/{}/{}",
            session.server_url.trim_end_matches('/'),
            DATA_PATH,
            path
        );

        let mut request = self
            .http
            .request(method, &url)
            .bearer_auth(&session.session_id);
        if !parameters.is_empty() {
            request = request.query(parameters);
        }
        if let Some(body) = body {
            request = request.header("Content-Type", "application/json").json(body);
        }

        Ok(request.send().await?)
    }
}

async fn parse_json_body(response: reqwest::Response) -> Result<Value> {
    let text = response.text().await?;
    if text.is_empty() {
        // 204 on update/delete carries no body.
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(&text)?)
}

/// Salesforce reports failures as an array of `{message, errorCode}`;
/// the first element is authoritative.
async fn parse_error_envelope(response: reqwest::Response) -> (String, String) {
    let reason = response
        .status()
        .canonical_reason()
        .unwrap_or("Unknown error")
        .to_string();
    let text = response.text().await.unwrap_or_default();
    envelope_from_text(&text, &reason)
}

fn envelope_from_text(text: &str, fallback_message: &str) -> (String, String) {
    let parsed: Option<Value> = serde_json::from_str(text).ok();
    let first = parsed
        .as_ref()
        .and_then(|v| v.as_array())
        .and_then(|errors| errors.first())
        .cloned()
        .unwrap_or(Value::Null);

    let code = first
        .get("errorCode")
        .and_then(|c| c.as_str())
        .unwrap_or("ERROR")
        .to_string();
    let message = first
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or(fallback_message)
        .to_string();
    (code, message)
}

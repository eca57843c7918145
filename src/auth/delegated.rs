//! Delegated-token strategy.
//!
//! When an OAuth service reference is configured, the adapter borrows a
//! token the identity provider already holds for the current caller instead
//! of performing its own credential exchange. The token keeps its external
//! lifecycle and is never written to the session cache; only the derived
//! server URL and API version are cached.

use crate::auth::session::{Endpoint, Session};
use crate::config::DelegatedTokenRef;
use crate::error::{Error, Result};
use crate::platform::TokenProvider;
use serde_json::Value;
use std::time::Duration;

pub struct DelegatedToken<'a> {
    provider: &'a dyn TokenProvider,
    reference: &'a DelegatedTokenRef,
}

impl<'a> DelegatedToken<'a> {
    pub fn new(provider: &'a dyn TokenProvider, reference: &'a DelegatedTokenRef) -> Self {
        Self { provider, reference }
    }

    /// Current access token, if the provider holds one for this caller.
    pub async fn token(&self) -> Option<String> {
        self.provider
            .cached_token(&self.reference.service_ref, &self.reference.user_ref)
            .await
    }

    /// Builds a session from the provider's grant response. `cached`
    /// endpoint data short-circuits the instance probe when available.
    pub async fn acquire(&self, cached: Option<Endpoint>) -> Result<(Session, Endpoint)> {
        let token = self.token().await.ok_or_else(|| {
            Error::Auth("failed to build session with Salesforce with the given configuration".into())
        })?;

        let endpoint = match cached {
            Some(endpoint) => endpoint,
            None => {
                let response = self
                    .provider
                    .token_response(&self.reference.service_ref, &self.reference.user_ref)
                    .await
                    .ok_or_else(|| {
                        Error::Auth(
                            "failed to build session with Salesforce with the given configuration"
                                .into(),
                        )
                    })?;
                let version = probe_latest_version(&response.instance_url, &token).await?;
                Endpoint {
                    server_url: response.instance_url.trim_end_matches('/').to_string(),
                    version,
                }
            }
        };

        let session = Session {
            session_id: token,
            server_url: endpoint.server_url.clone(),
            version: endpoint.version.clone(),
        };
        Ok((session, endpoint))
    }
}

/// Asks the instance which API versions it serves and picks the newest.
async fn probe_latest_version(instance_url: &str, token: &str) -> Result<String> {
    let url = format!("{}/services/data/", instance_url.trim_end_matches('/'));
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default();

    let response = http.get(&url).bearer_auth(token).send().await?;
    if !response.status().is_success() {
        return Err(Error::Auth(format!(
            "version discovery against {} returned status {}",
            instance_url,
            response.status()
        )));
    }

    let listing: Value = response.json().await?;
    latest_version(&listing)
        .ok_or_else(|| Error::Auth("no API versions advertised by Salesforce instance".into()))
}

pub(crate) fn latest_version(listing: &Value) -> Option<String> {
    listing
        .as_array()?
        .last()?
        .get("version")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_latest_version_takes_last_entry() {
        let listing = json!([
            {"label": "Winter '16", "version": "35.0"},
            {"label": "Spring '16", "version": "36.0"},
            {"label": "Summer '16", "version": "37.0"}
        ]);
        assert_eq!(latest_version(&listing), Some("37.0".to_string()));
    }

    #[test]
    fn test_latest_version_rejects_malformed_listing() {
        assert_eq!(latest_version(&json!({})), None);
        assert_eq!(latest_version(&json!([])), None);
        assert_eq!(latest_version(&json!([{"label": "no version"}])), None);
    }
}

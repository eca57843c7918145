//! Shared harness: a service wired to a wiremock instance through the
//! delegated-token strategy, so no real login endpoint is needed.

use async_trait::async_trait;
use salesforce_db::platform::{TokenProvider, TokenResponse};
use salesforce_db::{ConnectionConfig, DelegatedTokenRef, SalesforceService, SessionCache};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "00Dmock!session";

struct MockTokens {
    instance_url: String,
}

#[async_trait]
impl TokenProvider for MockTokens {
    async fn cached_token(&self, _service: &str, _user: &str) -> Option<String> {
        Some(TOKEN.to_string())
    }

    async fn token_response(&self, _service: &str, _user: &str) -> Option<TokenResponse> {
        Some(TokenResponse {
            access_token: TOKEN.to_string(),
            instance_url: self.instance_url.clone(),
        })
    }
}

/// Mounts the version-discovery listing the delegated strategy probes.
pub async fn mount_version_listing(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/services/data/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "Summer '16", "version": "37.0"}
        ])))
        .mount(server)
        .await;
}

pub async fn service_for(server: &MockServer) -> SalesforceService {
    let _ = env_logger::builder().is_test(true).try_init();
    mount_version_listing(server).await;

    let config = ConnectionConfig::new(
        "sf-test",
        None,
        Some(DelegatedTokenRef {
            service_ref: "oauth-test".into(),
            user_ref: "tester".into(),
        }),
    )
    .expect("valid test config");

    SalesforceService::builder(config)
        .session_cache(SessionCache::new())
        .token_provider(Arc::new(MockTokens {
            instance_url: server.uri(),
        }))
        .build()
}

//! Process-wide session cache.
//!
//! Entries are keyed by (service identity, user identity) and hold the
//! bearer session plus the derived server endpoint. There is no time-based
//! expiry; a 401 from Salesforce is the only expiry signal and clears the
//! entry. Invalidation is idempotent, so a race between "read session" and
//! "invalidate on 401" costs at most one extra login round trip. Values are
//! always read and written as whole snapshots, never mutated in place.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The bearer credential plus server location needed to call the REST API.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub server_url: String,
    pub version: String,
}

/// Server location cached independently of the session token, so a
/// delegated token (whose lifecycle lives elsewhere) never lands here.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub server_url: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub service: String,
    pub user: Option<String>,
}

impl SessionKey {
    pub fn new(service: impl Into<String>, user: Option<String>) -> Self {
        Self {
            service: service.into(),
            user,
        }
    }
}

#[derive(Clone, Default)]
pub struct SessionCache {
    sessions: Arc<RwLock<HashMap<SessionKey, Session>>>,
    endpoints: Arc<RwLock<HashMap<SessionKey, Endpoint>>>,
}

static SHARED: Lazy<SessionCache> = Lazy::new(SessionCache::default);

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache shared by all service instances.
    pub fn shared() -> Self {
        SHARED.clone()
    }

    pub async fn session(&self, key: &SessionKey) -> Option<Session> {
        self.sessions.read().await.get(key).cloned()
    }

    /// Written only after a fully parsed, successful auth response.
    pub async fn store_session(&self, key: SessionKey, session: Session) {
        let endpoint = Endpoint {
            server_url: session.server_url.clone(),
            version: session.version.clone(),
        };
        self.sessions.write().await.insert(key.clone(), session);
        self.endpoints.write().await.insert(key, endpoint);
    }

    pub async fn endpoint(&self, key: &SessionKey) -> Option<Endpoint> {
        self.endpoints.read().await.get(key).cloned()
    }

    pub async fn store_endpoint(&self, key: SessionKey, endpoint: Endpoint) {
        self.endpoints.write().await.insert(key, endpoint);
    }

    /// Clears the entry for `key`. A no-op when already cleared.
    pub async fn invalidate(&self, key: &SessionKey) {
        self.sessions.write().await.remove(key);
        self.endpoints.write().await.remove(key);
        log::debug!("invalidated cached session for {:?}", key);
    }
}

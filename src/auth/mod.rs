//! Session acquisition for the Salesforce REST API.
//!
//! Two mutually exclusive strategies produce a [`Session`]: a delegated
//! token borrowed from an external identity provider, or the legacy SOAP
//! credential exchange. A configured delegated reference is always tried
//! first; its failure falls back to the credential exchange when a
//! username/password pair is present.

pub mod delegated;
pub mod session;
pub mod soap;

pub use session::{Endpoint, Session, SessionCache, SessionKey};

use crate::auth::delegated::DelegatedToken;
use crate::auth::soap::SoapLogin;
use crate::config::{ConnectionConfig, SALESFORCE_API_VERSION};
use crate::error::{Error, Result};
use crate::platform::TokenProvider;
use std::sync::Arc;

/// Acquires sessions for one service instance and keeps the shared cache
/// entry for its (service, user) key up to date.
pub struct AuthManager {
    config: ConnectionConfig,
    cache: SessionCache,
    token_provider: Arc<dyn TokenProvider>,
    key: SessionKey,
    login_url: Option<String>,
}

impl AuthManager {
    pub fn new(
        config: ConnectionConfig,
        cache: SessionCache,
        token_provider: Arc<dyn TokenProvider>,
    ) -> Self {
        let key = SessionKey::new(
            config.service.clone(),
            config.delegated.as_ref().map(|d| d.user_ref.clone()),
        );
        Self {
            config,
            cache,
            token_provider,
            key,
            login_url: None,
        }
    }

    /// Override the SOAP login endpoint, e.g. for a sandbox host.
    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = Some(url.into());
        self
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Current session, acquiring one when none is cached.
    ///
    /// A delegated token takes precedence over a cached login session; the
    /// token is re-read from its provider on every acquisition and never
    /// cached here.
    pub async fn session(&self) -> Result<Session> {
        if let Some(reference) = &self.config.delegated {
            let strategy = DelegatedToken::new(self.token_provider.as_ref(), reference);
            if strategy.token().await.is_some() {
                let cached = self.cache.endpoint(&self.key).await;
                match strategy.acquire(cached).await {
                    Ok((mut session, endpoint)) => {
                        if let Some(pinned) = &self.config.version {
                            session.version = pinned.clone();
                        }
                        self.cache
                            .store_endpoint(
                                self.key.clone(),
                                Endpoint {
                                    server_url: endpoint.server_url,
                                    version: session.version.clone(),
                                },
                            )
                            .await;
                        return Ok(session);
                    }
                    Err(err) => {
                        log::warn!("delegated token strategy failed, falling back: {}", err);
                    }
                }
            } else {
                log::debug!("no delegated token available for {:?}", self.key);
            }
        }

        if let Some(session) = self.cache.session(&self.key).await {
            log::debug!("using cached session for {:?}", self.key);
            return Ok(session);
        }

        self.login().await
    }

    /// Performs the legacy credential exchange and caches the result.
    async fn login(&self) -> Result<Session> {
        if self.config.credentials.is_none() {
            return Err(Error::Auth(
                "failed to build a session with Salesforce: no usable credential path".into(),
            ));
        }

        let soap = match &self.login_url {
            Some(url) => SoapLogin::with_login_url(url.clone()),
            None => SoapLogin::new(&self.config)?,
        };
        let mut session = soap.acquire(&self.config).await?;

        if let Some(pinned) = &self.config.version {
            session.version = pinned.clone();
        } else if session.version.is_empty() {
            session.version = SALESFORCE_API_VERSION.to_string();
        }

        // Cached only now, after the response parsed cleanly.
        self.cache
            .store_session(self.key.clone(), session.clone())
            .await;
        Ok(session)
    }

    /// Drops the cached entry so the next call re-authenticates.
    pub async fn invalidate(&self) {
        self.cache.invalidate(&self.key).await;
    }
}

//! Resolved connection parameters for one Salesforce service instance.
//!
//! The surrounding platform hands us an already-decrypted configuration;
//! this module only validates that at least one authentication path is
//! fully populated and normalizes it for the auth manager.

use crate::error::{Error, Result};

/// Default Salesforce API version if not gleaned from the connection.
pub const SALESFORCE_API_VERSION: &str = "37.0";

/// Username/password/security-token triple for the legacy SOAP login.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Appended to the password during the login handshake. Empty when the
    /// org does not require one.
    pub security_token: String,
}

/// Reference to a delegated token owned by an external identity provider.
#[derive(Debug, Clone)]
pub struct DelegatedTokenRef {
    /// Identity of the OAuth service holding the token.
    pub service_ref: String,
    /// Caller identity the token was issued for.
    pub user_ref: String,
}

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Logical name of this service instance, used to key the session cache.
    pub service: String,
    pub credentials: Option<Credentials>,
    pub delegated: Option<DelegatedTokenRef>,
    /// Pinned API version, e.g. "37.0". Derived from the login when absent.
    pub version: Option<String>,
    /// Path to the enterprise WSDL used to locate the SOAP login endpoint.
    pub wsdl: Option<String>,
}

impl ConnectionConfig {
    /// Validates that at least one authentication path is usable.
    pub fn new(
        service: impl Into<String>,
        credentials: Option<Credentials>,
        delegated: Option<DelegatedTokenRef>,
    ) -> Result<Self> {
        let config = Self {
            service: service.into(),
            credentials,
            delegated,
            version: None,
            wsdl: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_wsdl(mut self, wsdl: impl Into<String>) -> Self {
        self.wsdl = Some(wsdl.into());
        self
    }

    /// Load connection settings from `SALESFORCE_*` environment variables,
    /// reading a `.env` file when present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let username = std::env::var("SALESFORCE_USERNAME").ok();
        let password = std::env::var("SALESFORCE_PASSWORD").ok();
        let security_token = std::env::var("SALESFORCE_SECURITY_TOKEN").unwrap_or_default();

        let credentials = match (username, password) {
            (Some(username), Some(password)) => Some(Credentials {
                username,
                password,
                security_token,
            }),
            _ => None,
        };

        let delegated = std::env::var("SALESFORCE_OAUTH_SERVICE").ok().map(|service_ref| {
            DelegatedTokenRef {
                service_ref,
                user_ref: std::env::var("SALESFORCE_OAUTH_USER").unwrap_or_default(),
            }
        });

        let mut config = Self::new("salesforce", credentials, delegated)?;
        if let Ok(version) = std::env::var("SALESFORCE_VERSION") {
            config.version = Some(version);
        }
        if let Ok(wsdl) = std::env::var("SALESFORCE_WSDL") {
            config.wsdl = Some(wsdl);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.delegated.is_some() {
            return Ok(());
        }
        match &self.credentials {
            Some(c) if !c.username.is_empty() && !c.password.is_empty() => Ok(()),
            _ => Err(Error::Auth(
                "a delegated token service or a Salesforce username and password \
                 are required for this service"
                    .to_string(),
            )),
        }
    }

    /// Password as sent to the login endpoint: security token appended.
    pub fn login_password(&self) -> Option<String> {
        self.credentials
            .as_ref()
            .map(|c| format!("{}{}", c.password, c.security_token))
    }
}

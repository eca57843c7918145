//! Legacy credential exchange: the stateful SOAP login handshake.
//!
//! Salesforce's enterprise login endpoint takes username plus
//! password-with-appended-security-token in a SOAP envelope and returns a
//! session id and the server instance URL. The endpoint location comes from
//! the configured WSDL when one is present, otherwise from the public login
//! host pinned at the default API version.

use crate::auth::session::Session;
use crate::config::{ConnectionConfig, SALESFORCE_API_VERSION};
use crate::error::{Error, Result};
use quick_xml::escape::escape;
use roxmltree::Document;
use std::time::Duration;

const LOGIN_HOST: &str = "https://login.salesforce.com";

pub struct SoapLogin {
    http: reqwest::Client,
    login_url: String,
}

impl SoapLogin {
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let login_url = match &config.wsdl {
            Some(path) => {
                let wsdl = std::fs::read_to_string(path).map_err(|e| {
                    Error::Auth(format!("failed to read WSDL file '{}': {}", path, e))
                })?;
                login_url_from_wsdl(&wsdl).ok_or_else(|| {
                    Error::Auth(format!("no SOAP endpoint location found in WSDL '{}'", path))
                })?
            }
            None => {
                let version = config.version.as_deref().unwrap_or(SALESFORCE_API_VERSION);
                format!("{}/services/Soap/c/{}", LOGIN_HOST, version)
            }
        };
        Ok(Self::with_login_url(login_url))
    }

    /// Point the handshake at a non-default endpoint, e.g. a sandbox host.
    pub fn with_login_url(login_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            login_url: login_url.into(),
        }
    }

    pub async fn acquire(&self, config: &ConnectionConfig) -> Result<Session> {
        let credentials = config.credentials.as_ref().ok_or_else(|| {
            Error::Auth("failed to build session with Salesforce with the given configuration".into())
        })?;
        let password = config.login_password().unwrap_or_default();

        log::debug!(
            "attempting SOAP login for {} via {}",
            credentials.username,
            self.login_url
        );

        let envelope = login_envelope(&credentials.username, &password);
        let response = self
            .http
            .post(&self.login_url)
            .header("Content-Type", "text/xml; charset=UTF-8")
            .header("SOAPAction", "login")
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            // Login faults come back as HTTP 500 with a SOAP fault body.
            let detail = fault_string(&body)
                .unwrap_or_else(|| format!("login endpoint returned status {}", status));
            return Err(Error::Auth(detail));
        }

        let session = parse_login_response(&body)?;
        log::info!(
            "SOAP login succeeded, instance {} version {}",
            session.server_url,
            session.version
        );
        Ok(session)
    }
}

pub(crate) fn login_envelope(username: &str, password: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:urn="urn:enterprise.soap.sforce.com">"#,
            "<soapenv:Body><urn:login>",
            "<urn:username>{}</urn:username>",
            "<urn:password>{}</urn:password>",
            "</urn:login></soapenv:Body></soapenv:Envelope>"
        ),
        escape(username),
        escape(password)
    )
}

/// Extracts session id, server instance and protocol version from a
/// successful login response.
pub(crate) fn parse_login_response(xml: &str) -> Result<Session> {
    let doc = Document::parse(xml)
        .map_err(|e| Error::Auth(format!("unparseable login response: {}", e)))?;

    let text_of = |tag: &str| {
        doc.descendants()
            .find(|n| n.tag_name().name() == tag)
            .and_then(|n| n.text())
            .map(str::to_string)
    };

    let session_id = text_of("sessionId")
        .ok_or_else(|| Error::Auth("failed to get session id from Salesforce".into()))?;
    let soap_url = text_of("serverUrl")
        .ok_or_else(|| Error::Auth("failed to get server instance from Salesforce".into()))?;

    let server_url = instance_base_url(&soap_url)?;
    let version =
        version_from_soap_url(&soap_url).unwrap_or_else(|| SALESFORCE_API_VERSION.to_string());

    Ok(Session {
        session_id,
        server_url,
        version,
    })
}

/// `https://na1.salesforce.com/services/Soap/c/37.0/...` -> `https://na1.salesforce.com`
pub(crate) fn instance_base_url(soap_url: &str) -> Result<String> {
    let rest = soap_url
        .strip_prefix("https://")
        .or_else(|| soap_url.strip_prefix("http://"))
        .ok_or_else(|| Error::Auth(format!("unexpected server URL '{}'", soap_url)))?;
    let host = rest.split('/').next().unwrap_or_default();
    let instance = host.split('.').next().unwrap_or_default();
    if instance.is_empty() {
        return Err(Error::Auth(format!("unexpected server URL '{}'", soap_url)));
    }
    Ok(format!("https://{}.salesforce.com", instance))
}

/// Version is the path segment following `/Soap/c/`.
pub(crate) fn version_from_soap_url(soap_url: &str) -> Option<String> {
    let lower = soap_url.to_lowercase();
    let at = lower.find("/soap/c/")?;
    let tail = &soap_url[at + "/soap/c/".len()..];
    let version = tail.split('/').next()?;
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

/// First `location` attribute of a SOAP address element in the WSDL.
pub(crate) fn login_url_from_wsdl(wsdl: &str) -> Option<String> {
    let doc = Document::parse(wsdl).ok()?;
    doc.descendants()
        .find(|n| n.tag_name().name() == "address" && n.attribute("location").is_some())
        .and_then(|n| n.attribute("location"))
        .map(str::to_string)
}

fn fault_string(xml: &str) -> Option<String> {
    let doc = Document::parse(xml).ok()?;
    doc.descendants()
        .find(|n| n.tag_name().name() == "faultstring")
        .and_then(|n| n.text())
        .map(str::to_string)
}

//! # Remote Endpoint Store
//!
//! Client side of the blob protocol spoken by a remote endpoint:
//!
//! ```text
//! GET  <base>?action=read                          -> empty body or a stored blob
//! POST <base>?action=save  (text/plain, the blob)  -> exactly "ok" on success
//! ```
//!
//! Any other save body, any network error and any timeout is a
//! [`TransportError`]. The coordinator treats those as a signal to fall back,
//! never as a reason to abort.

use coffer_core::primitives::{ACTION_READ, ACTION_SAVE, REMOTE_SAVE_ACK};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Default template for bare deployment identifiers.
pub const DEFAULT_URL_TEMPLATE: &str = "https://script.google.com/macros/s/{id}/exec";

/// Placeholder substituted by the deployment identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Longest rejected save body echoed back in errors.
const MAX_ECHOED_BODY: usize = 200;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors from the remote transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The request could not be completed (connect, timeout, body read).
    #[error("cannot reach remote endpoint {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// The endpoint answered with a non-success status.
    #[error("remote endpoint answered HTTP {0}")]
    Status(u16),

    /// A save was answered with something other than the acknowledgement.
    #[error("remote endpoint rejected save: {0:?}")]
    Rejected(String),

    /// The HTTP client could not be built.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

// =============================================================================
// ADDRESS
// =============================================================================

/// A resolved remote endpoint base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteAddress {
    base: String,
}

impl RemoteAddress {
    /// Resolve a Remote Endpoint Identifier.
    ///
    /// Identifiers that already are `http://` or `https://` URLs are used
    /// verbatim; anything else is substituted into `template`.
    #[must_use]
    pub fn resolve(identifier: &str, template: &str) -> Self {
        let identifier = identifier.trim();
        let base = if identifier.starts_with("http://") || identifier.starts_with("https://") {
            identifier.to_string()
        } else {
            template.replace(ID_PLACEHOLDER, identifier)
        };
        Self { base }
    }

    /// The base URL, without the action query.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.base
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Raw blob transport to a remote endpoint.
pub trait RemoteEndpoint: Send + Sync {
    /// Fetch the stored blob. An empty string means the endpoint holds nothing.
    fn read(
        &self,
        address: &RemoteAddress,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;

    /// Store a blob. `Ok` only when the endpoint acknowledged with `"ok"`.
    fn write(
        &self,
        address: &RemoteAddress,
        blob: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    http: reqwest::Client,
}

impl HttpRemote {
    /// Create a transport whose every request gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { http })
    }

    /// Send a request and read the body as text.
    async fn exchange(
        &self,
        address: &RemoteAddress,
        req: reqwest::RequestBuilder,
    ) -> Result<String, TransportError> {
        let unreachable = |e: reqwest::Error| TransportError::Unreachable {
            url: address.to_string(),
            reason: e.to_string(),
        };

        let resp = req.send().await.map_err(unreachable)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }
        resp.text().await.map_err(unreachable)
    }
}

impl RemoteEndpoint for HttpRemote {
    async fn read(&self, address: &RemoteAddress) -> Result<String, TransportError> {
        let req = self
            .http
            .get(address.as_str())
            .query(&[("action", ACTION_READ)]);
        self.exchange(address, req).await
    }

    async fn write(&self, address: &RemoteAddress, blob: &str) -> Result<(), TransportError> {
        let req = self
            .http
            .post(address.as_str())
            .query(&[("action", ACTION_SAVE)])
            .header(reqwest::header::CONTENT_TYPE, "text/plain")
            .body(blob.to_string());
        let body = self.exchange(address, req).await?;

        if body == REMOTE_SAVE_ACK {
            Ok(())
        } else {
            Err(TransportError::Rejected(
                body.chars().take(MAX_ECHOED_BODY).collect(),
            ))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identifier_uses_template() {
        let address = RemoteAddress::resolve("AKfycbx123", DEFAULT_URL_TEMPLATE);
        assert_eq!(
            address.as_str(),
            "https://script.google.com/macros/s/AKfycbx123/exec"
        );
    }

    #[test]
    fn url_identifier_used_verbatim() {
        let address = RemoteAddress::resolve(
            " http://127.0.0.1:8787/macros/s/home/exec ",
            DEFAULT_URL_TEMPLATE,
        );
        assert_eq!(address.as_str(), "http://127.0.0.1:8787/macros/s/home/exec");
    }

    #[test]
    fn custom_template() {
        let address = RemoteAddress::resolve("home", "http://nas.local:8787/macros/s/{id}/exec");
        assert_eq!(address.to_string(), "http://nas.local:8787/macros/s/home/exec");
    }

    #[test]
    fn rejected_error_quotes_body() {
        let err = TransportError::Rejected("quota".to_string());
        assert_eq!(err.to_string(), "remote endpoint rejected save: \"quota\"");
    }
}

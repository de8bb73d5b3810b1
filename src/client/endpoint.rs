//! Endpoint identity and address construction

use url::Url;

use crate::error::{ClientError, Result};

/// The `(tenant, session, base address)` triple a session connects to.
///
/// The target address is `{base_url}/ws/{session_id}?company_id={tenant_id}`.
/// Trailing slashes on the base URL are collapsed, so `wss://host/` and
/// `wss://host` both produce `wss://host/ws/{session_id}?company_id={tenant_id}`.
/// Path segments and the query value are percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    tenant_id: String,
    session_id: String,
    base_url: String,
    url: Url,
}

impl Endpoint {
    pub fn new(tenant_id: &str, session_id: &str, base_url: &str) -> Result<Self> {
        if tenant_id.is_empty() {
            return Err(ClientError::Validation(
                "tenant_id must not be empty".to_string(),
            ));
        }
        if session_id.is_empty() {
            return Err(ClientError::Validation(
                "session_id must not be empty".to_string(),
            ));
        }

        let mut url = Url::parse(base_url.trim_end_matches('/'))?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => {
                return Err(ClientError::Validation(format!(
                    "base_url must use ws or wss scheme, got {}",
                    other
                )));
            }
        }

        url.set_query(None);
        url.set_fragment(None);
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation(format!("{} cannot be a base URL", base_url)))?
            .pop_if_empty()
            .push("ws")
            .push(session_id);
        url.query_pairs_mut().append_pair("company_id", tenant_id);

        Ok(Self {
            tenant_id: tenant_id.to_string(),
            session_id: session_id.to_string(),
            base_url: base_url.to_string(),
            url,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Base URL as configured, before normalization
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fully composed session address
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_collapsed() {
        let endpoint = Endpoint::new("1", "abc", "wss://host/").unwrap();
        assert_eq!(endpoint.url().as_str(), "wss://host/ws/abc?company_id=1");
        assert_eq!(endpoint.base_url(), "wss://host/");
    }

    #[test]
    fn test_without_trailing_slash() {
        let endpoint = Endpoint::new("1", "s1", "wss://example").unwrap();
        assert_eq!(endpoint.url().as_str(), "wss://example/ws/s1?company_id=1");
    }

    #[test]
    fn test_base_path_is_kept() {
        let endpoint = Endpoint::new("7", "s1", "ws://localhost:8001/engine//").unwrap();
        assert_eq!(
            endpoint.url().as_str(),
            "ws://localhost:8001/engine/ws/s1?company_id=7"
        );
    }

    #[test]
    fn test_components_are_encoded() {
        let endpoint = Endpoint::new("acme corp", "a/b c", "wss://host").unwrap();
        assert_eq!(
            endpoint.url().as_str(),
            "wss://host/ws/a%2Fb%20c?company_id=acme+corp"
        );
    }

    #[test]
    fn test_rejects_non_websocket_scheme() {
        let err = Endpoint::new("1", "s1", "https://host").unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_rejects_empty_identity() {
        assert!(Endpoint::new("", "s1", "wss://host").is_err());
        assert!(Endpoint::new("1", "", "wss://host").is_err());
    }

    #[test]
    fn test_rejects_garbage_url() {
        let err = Endpoint::new("1", "s1", "not a url").unwrap_err();
        assert!(matches!(err, ClientError::Url(_)));
    }
}

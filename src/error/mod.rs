use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("No Tokio runtime available to drive the session")]
    NoRuntime,
}

/// Failures reported by a transport while opening or using a channel.
///
/// These never cross the manager boundary; the manager converts them into
/// status notifications.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Failed to open channel: {0}")]
    Connect(String),

    #[error("Failed to send frame: {0}")]
    Send(String),

    #[error("Failed to receive frame: {0}")]
    Receive(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for TransportError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        TransportError::Receive(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = ClientError::Validation("tenant_id must not be empty".to_string());
        assert_eq!(
            err.to_string(),
            "Validation error: tenant_id must not be empty"
        );
    }

    #[test]
    fn test_url_error_converts() {
        let parse_err = url::Url::parse("not a url").unwrap_err();
        let err: ClientError = parse_err.into();
        assert!(matches!(err, ClientError::Url(_)));
    }
}

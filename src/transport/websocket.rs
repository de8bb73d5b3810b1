use async_trait::async_trait;
use futures::{future, SinkExt, StreamExt};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use url::Url;

use super::{Channel, Connector};
use crate::error::TransportError;

/// WebSocket connector backed by `tokio-tungstenite`
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for WsConnector {
    #[tracing::instrument(name = "ws.open", skip(self, url), fields(url = %url))]
    async fn open(&self, url: &Url) -> Result<Channel, TransportError> {
        let (ws, response) = connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(status = %response.status(), "WebSocket handshake complete");

        let (write, read) = ws.split();
        let sink = write
            .sink_map_err(|e| TransportError::Send(e.to_string()))
            .with(|text: String| future::ready(Ok::<_, TransportError>(Message::Text(text))));
        let stream = read.filter_map(|frame| future::ready(decode_frame(frame)));

        Ok(Channel::new(sink, stream))
    }
}

/// Map a raw frame to a text payload; control frames are skipped.
fn decode_frame(
    frame: Result<Message, tokio_tungstenite::tungstenite::Error>,
) -> Option<Result<String, TransportError>> {
    match frame {
        Ok(Message::Text(text)) => Some(Ok(text)),
        Ok(Message::Binary(data)) => match String::from_utf8(data) {
            Ok(text) => Some(Ok(text)),
            Err(_) => {
                tracing::warn!("Ignoring non UTF-8 binary frame");
                None
            }
        },
        // Ping/Pong are answered by tungstenite, Close ends the stream
        Ok(_) => None,
        Err(e) => Some(Err(e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_frame() {
        let decoded = decode_frame(Ok(Message::Text("hi there".to_string())));
        assert_eq!(decoded, Some(Ok("hi there".to_string())));
    }

    #[test]
    fn test_decode_utf8_binary_frame() {
        let decoded = decode_frame(Ok(Message::Binary(b"halo".to_vec())));
        assert_eq!(decoded, Some(Ok("halo".to_string())));
    }

    #[test]
    fn test_decode_skips_invalid_binary_and_control() {
        assert_eq!(decode_frame(Ok(Message::Binary(vec![0xff, 0xfe]))), None);
        assert_eq!(decode_frame(Ok(Message::Ping(vec![1]))), None);
        assert_eq!(decode_frame(Ok(Message::Close(None))), None);
    }

    #[test]
    fn test_decode_error_is_reported() {
        let decoded = decode_frame(Err(
            tokio_tungstenite::tungstenite::Error::ConnectionClosed,
        ));
        assert!(matches!(decoded, Some(Err(TransportError::Receive(_)))));
    }
}

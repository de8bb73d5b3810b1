//! Transport abstraction used by the session manager
//!
//! A [`Connector`] opens one bidirectional text channel per call. The
//! manager owns the returned [`Channel`] exclusively and never hands it out.

mod websocket;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};
use url::Url;

use crate::error::TransportError;

pub use websocket::WsConnector;

/// Outbound half of a channel: one `String` per text frame
pub type FrameSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a channel; the stream ends when the remote closes
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An open bidirectional text channel
pub struct Channel {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Channel {
    pub fn new<S, R>(sink: S, stream: R) -> Self
    where
        S: Sink<String, Error = TransportError> + Send + 'static,
        R: Stream<Item = Result<String, TransportError>> + Send + 'static,
    {
        Self {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        }
    }
}

/// Opens channels to a session address
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn open(&self, url: &Url) -> Result<Channel, TransportError>;
}

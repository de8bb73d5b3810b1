//! Session manager: one auto-reconnecting channel per endpoint

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::backoff::{BackoffConfig, LinearBackoff};
use super::endpoint::Endpoint;
use super::state::{ConnectionStatus, SendOutcome};
use super::stats::{Counters, SessionStats};
use crate::error::{ClientError, Result, TransportError};
use crate::transport::{Channel, Connector, FrameSink, WsConnector};

/// Upper bound on a graceful close before the transport is dropped
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Options a session is created with
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub endpoint: Endpoint,
    /// Consecutive reconnects allowed before the session stays disconnected
    pub max_reconnect_attempts: u32,
    pub backoff: BackoffConfig,
}

impl ClientOptions {
    /// Options with the default reconnect policy (5 attempts, 2s linear backoff)
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            max_reconnect_attempts: 5,
            backoff: BackoffConfig::default(),
        }
    }
}

type MessageHandler = Arc<dyn Fn(String) + Send + Sync>;
type StatusHandler = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Single-slot callbacks; setting a slot replaces the previous handler
#[derive(Default)]
struct Handlers {
    on_message: RwLock<Option<MessageHandler>>,
    on_status: RwLock<Option<StatusHandler>>,
}

enum SessionEvent {
    Status(ConnectionStatus),
    Message(String),
}

enum Command {
    Frame(String),
    Close,
}

/// Handle to the task that owns the live channel
struct Link {
    commands: mpsc::UnboundedSender<Command>,
}

impl Link {
    fn shutdown(self) {
        // The task may already be gone
        let _ = self.commands.send(Command::Close);
    }
}

struct Inner {
    status: ConnectionStatus,
    /// Advanced by every connect and disconnect; tasks and timers from an
    /// older generation must not touch the session.
    generation: u64,
    reconnect_attempts: u32,
    link: Option<Link>,
    reconnect_timer: Option<JoinHandle<()>>,
    counters: Counters,
}

struct Shared {
    options: ClientOptions,
    backoff: LinearBackoff,
    connector: Arc<dyn Connector>,
    runtime: Handle,
    inner: Mutex<Inner>,
    /// Notifications are queued while `inner` is locked so delivery order
    /// always matches transition order.
    events: mpsc::UnboundedSender<SessionEvent>,
}

/// Client side of a sales agent chat session.
///
/// Owns at most one transport at a time, reports status changes and inbound
/// text frames through two callback slots, and reconnects with linear backoff
/// after unexpected closures. Callbacks run on a dedicated dispatcher task and
/// may call back into the client.
///
/// `connect`, `send` and `disconnect` never block; all I/O runs on the Tokio
/// runtime the client was created in. Dropping the client disconnects it.
pub struct SalesAgentClient {
    shared: Arc<Shared>,
    handlers: Arc<Handlers>,
}

impl SalesAgentClient {
    /// Create a client using the given connector.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(options: ClientOptions, connector: Arc<dyn Connector>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| ClientError::NoRuntime)?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let handlers = Arc::new(Handlers::default());
        runtime.spawn(dispatch_events(events_rx, handlers.clone()));

        let backoff = LinearBackoff::with_config(options.backoff.clone());
        let shared = Arc::new(Shared {
            options,
            backoff,
            connector,
            runtime,
            inner: Mutex::new(Inner {
                status: ConnectionStatus::Disconnected,
                generation: 0,
                reconnect_attempts: 0,
                link: None,
                reconnect_timer: None,
                counters: Counters::default(),
            }),
            events: events_tx,
        });

        Ok(Self { shared, handlers })
    }

    /// Create a client that connects over WebSocket
    pub fn with_websocket(options: ClientOptions) -> Result<Self> {
        Self::new(options, Arc::new(WsConnector::new()))
    }

    /// Set the handler invoked once per inbound text frame
    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        *self.handlers.on_message.write() = Some(Arc::new(handler));
    }

    /// Set the handler invoked on every status transition
    pub fn on_status_change<F>(&self, handler: F)
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        *self.handlers.on_status.write() = Some(Arc::new(handler));
    }

    /// Open the session unless it is already connected or connecting.
    ///
    /// Cancels a pending reconnect and starts a fresh attempt immediately.
    pub fn connect(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.start_attempt(&mut inner);
    }

    /// Send one text frame.
    ///
    /// When the session is not open the payload is dropped and a connect is
    /// started instead; nothing is queued for later delivery.
    pub fn send(&self, payload: impl Into<String>) -> SendOutcome {
        let payload = payload.into();
        let mut guard = self.shared.inner.lock();
        let inner = &mut *guard;

        if inner.status.is_connected() {
            if let Some(link) = &inner.link {
                if link.commands.send(Command::Frame(payload)).is_ok() {
                    inner.counters.frames_sent += 1;
                    return SendOutcome::Sent;
                }
            }
        }

        inner.counters.dropped_sends += 1;
        tracing::warn!(
            session_id = %self.shared.options.endpoint.session_id(),
            status = %inner.status,
            "Session not connected, dropping message and reconnecting"
        );
        self.shared.start_attempt(inner);
        SendOutcome::Dropped
    }

    /// Close the session without reconnecting. Idempotent.
    pub fn disconnect(&self) {
        self.shared.disconnect();
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared.inner.lock().status
    }

    /// Reconnects scheduled since the last successful connection
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().reconnect_attempts
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.shared.options.endpoint
    }

    pub fn stats(&self) -> SessionStats {
        let inner = self.shared.inner.lock();
        let endpoint = &self.shared.options.endpoint;
        SessionStats {
            tenant_id: endpoint.tenant_id().to_string(),
            session_id: endpoint.session_id().to_string(),
            status: inner.status,
            reconnect_attempts: inner.reconnect_attempts,
            connected_since: inner.counters.connected_since,
            frames_sent: inner.counters.frames_sent,
            frames_received: inner.counters.frames_received,
            dropped_sends: inner.counters.dropped_sends,
            reconnects_scheduled: inner.counters.reconnects_scheduled,
        }
    }
}

impl Drop for SalesAgentClient {
    fn drop(&mut self) {
        self.shared.disconnect();
    }
}

impl Shared {
    fn transition(&self, inner: &mut Inner, status: ConnectionStatus) {
        inner.status = status;
        // Receiver lives as long as the dispatcher task
        let _ = self.events.send(SessionEvent::Status(status));
    }

    fn start_attempt(self: &Arc<Self>, inner: &mut Inner) {
        if matches!(
            inner.status,
            ConnectionStatus::Connected | ConnectionStatus::Connecting
        ) {
            tracing::debug!(status = %inner.status, "Connect ignored, attempt already active");
            return;
        }

        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(link) = inner.link.take() {
            link.shutdown();
        }

        inner.generation += 1;
        let generation = inner.generation;
        self.transition(inner, ConnectionStatus::Connecting);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        self.runtime
            .spawn(run_connection(Arc::clone(self), generation, commands_rx));
        inner.link = Some(Link {
            commands: commands_tx,
        });
    }

    fn disconnect(&self) {
        let mut inner = self.inner.lock();
        inner.generation += 1;

        if let Some(timer) = inner.reconnect_timer.take() {
            tracing::debug!("Cancelling pending reconnect");
            timer.abort();
        }
        if let Some(link) = inner.link.take() {
            link.shutdown();
        }
        inner.counters.connected_since = None;

        if inner.status != ConnectionStatus::Disconnected {
            tracing::info!(
                session_id = %self.options.endpoint.session_id(),
                "Sales agent session disconnected by client"
            );
            self.transition(&mut inner, ConnectionStatus::Disconnected);
        }
    }

    /// Returns false when the attempt was superseded while opening.
    fn mark_connected(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        inner.reconnect_attempts = 0;
        inner.counters.connected_since = Some(chrono::Utc::now());
        self.transition(&mut inner, ConnectionStatus::Connected);
        tracing::info!(
            session_id = %self.options.endpoint.session_id(),
            "Sales agent session connected"
        );
        true
    }

    fn deliver(&self, generation: u64, text: String) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        inner.counters.frames_received += 1;
        let _ = self.events.send(SessionEvent::Message(text));
    }

    /// Handle the end of a connection that was not closed by the client.
    fn on_closed(self: &Arc<Self>, generation: u64, failure: Option<TransportError>) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }

        inner.link = None;
        inner.counters.connected_since = None;
        if let Some(err) = failure {
            tracing::warn!(error = %err, "Sales agent transport error");
            self.transition(&mut inner, ConnectionStatus::Error);
        }
        self.transition(&mut inner, ConnectionStatus::Disconnected);
        tracing::info!(
            session_id = %self.options.endpoint.session_id(),
            "Sales agent session closed"
        );

        self.schedule_reconnect(&mut inner);
    }

    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner) {
        if inner.reconnect_attempts >= self.options.max_reconnect_attempts {
            tracing::warn!(
                attempts = inner.reconnect_attempts,
                "Reconnect attempts exhausted, waiting for explicit connect"
            );
            return;
        }

        inner.reconnect_attempts += 1;
        inner.counters.reconnects_scheduled += 1;
        let attempt = inner.reconnect_attempts;
        let delay = self.backoff.delay_for(attempt);
        let deadline = Instant::now() + delay;
        let generation = inner.generation;

        tracing::info!(
            attempt = attempt,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Scheduling reconnect"
        );

        let shared = Arc::clone(self);
        inner.reconnect_timer = Some(self.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            shared.fire_reconnect(generation);
        }));
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return;
        }
        // This is the running timer; drop the handle instead of aborting it
        inner.reconnect_timer = None;
        self.start_attempt(&mut inner);
    }
}

/// Own one channel for its whole life: open it, pump frames both ways and
/// report how it ended.
#[tracing::instrument(
    name = "session.connection",
    skip(shared, commands),
    fields(session_id = %shared.options.endpoint.session_id())
)]
async fn run_connection(
    shared: Arc<Shared>,
    generation: u64,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let url = shared.options.endpoint.url().clone();
    tracing::info!(url = %url, "Opening sales agent session");

    let opened = tokio::select! {
        result = shared.connector.open(&url) => result,
        // Close requested (or client dropped) before the channel opened
        _ = commands.recv() => return,
    };

    let Channel {
        mut sink,
        mut stream,
    } = match opened {
        Ok(channel) => channel,
        Err(err) => {
            shared.on_closed(generation, Some(err));
            return;
        }
    };

    if !shared.mark_connected(generation) {
        close_sink(sink).await;
        return;
    }

    let failure = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Frame(text)) => {
                    tracing::debug!(bytes = text.len(), "Sending frame");
                    if let Err(err) = sink.send(text).await {
                        break Some(err);
                    }
                }
                Some(Command::Close) | None => {
                    close_sink(sink).await;
                    return;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    tracing::debug!(bytes = text.len(), "Received frame");
                    shared.deliver(generation, text);
                }
                Some(Err(err)) => break Some(err),
                None => break None,
            },
        }
    };

    // Unlink first so no send is accepted while the close is in flight
    shared.on_closed(generation, failure);
    drop(stream);
    close_sink(sink).await;
}

async fn close_sink(mut sink: FrameSink) {
    match tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::debug!(error = %err, "Error while closing transport"),
        Err(_) => tracing::debug!(
            timeout_secs = CLOSE_TIMEOUT.as_secs(),
            "Transport close timed out, dropping it"
        ),
    }
}

async fn dispatch_events(
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    handlers: Arc<Handlers>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Status(status) => {
                let handler = handlers.on_status.read().clone();
                if let Some(handler) = handler {
                    handler(status);
                }
            }
            SessionEvent::Message(text) => {
                let handler = handlers.on_message.read().clone();
                if let Some(handler) = handler {
                    handler(text);
                }
            }
        }
    }
}

//! Session statistics

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ConnectionStatus;

/// Point-in-time view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    pub tenant_id: String,
    pub session_id: String,
    pub status: ConnectionStatus,
    pub reconnect_attempts: u32,
    pub connected_since: Option<DateTime<Utc>>,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub dropped_sends: u64,
    pub reconnects_scheduled: u64,
}

/// Running counters kept alongside the session state
#[derive(Debug, Clone, Default)]
pub(crate) struct Counters {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub dropped_sends: u64,
    pub reconnects_scheduled: u64,
    pub connected_since: Option<DateTime<Utc>>,
}

//! Sales agent session client
//!
//! - `endpoint`: endpoint identity and address construction
//! - `backoff`: linear reconnect backoff
//! - `manager`: the auto-reconnecting session manager
//! - `state`: connection status and send outcome
//! - `stats`: session statistics

mod backoff;
mod endpoint;
mod manager;
mod state;
mod stats;

pub use backoff::{BackoffConfig, LinearBackoff};
pub use endpoint::Endpoint;
pub use manager::{ClientOptions, SalesAgentClient};
pub use state::{ConnectionStatus, SendOutcome};
pub use stats::SessionStats;

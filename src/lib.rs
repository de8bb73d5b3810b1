// Infrastructure (shared components)
pub mod config;
pub mod error;
pub mod telemetry;

// Session management
pub mod client;
pub mod session;
pub mod transport;

pub use client::{
    BackoffConfig, ClientOptions, ConnectionStatus, Endpoint, SalesAgentClient, SendOutcome,
    SessionStats,
};
pub use error::{ClientError, Result, TransportError};

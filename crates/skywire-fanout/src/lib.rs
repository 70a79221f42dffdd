//! Fan-out relay for Skywire.
//!
//! Subscribes to the broker's snapshot and delta channels and serves
//! them to browser clients:
//!
//! - **`WebSocket` endpoint** (`/ws`) pushing every delta frame, gzip
//!   compressed, to all connected sockets
//! - **Snapshot endpoint** (`/api/snapshot`) serving the latest world,
//!   gzip compressed, for clients that are joining or resynchronising
//! - **Health endpoint** (`/health`)
//!
//! # Architecture
//!
//! A single relay task consumes the broker stream and compresses each
//! frame once. Each socket has its own bounded queue in the
//! [`ConnectionRegistry`]; a socket that cannot keep up is disconnected
//! instead of stalling the others.
//!
//! [`ConnectionRegistry`]: registry::ConnectionRegistry

pub mod compress;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod relay;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::FanoutError;
pub use registry::{BroadcastReport, ConnectionId, ConnectionRegistry};
pub use relay::{relay_message, run_relay};
pub use router::build_router;
pub use server::{ServerError, serve, start_server};
pub use state::{AppState, HealthResponse};

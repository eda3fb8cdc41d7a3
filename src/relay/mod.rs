//! Relay service
//!
//! A standalone endpoint that performs an HTTP GET on behalf of the caller,
//! attaching the caller-supplied headers verbatim, so the upstream sees the
//! relay's network identity and the browser identity in those headers.
//! [`client::RelayClient`] is the caller side of the same wire protocol.

pub mod client;
pub mod error;
pub mod server;

pub use client::RelayClient;
pub use error::RelayError;
pub use server::{create_router, serve_relay, start_relay_server, RelayState};

//! HTTP Inbound Adapter
//!
//! Axum-based server exposing the unary routes over HTTP and the streaming
//! RPCs over WebSocket.

pub(crate) mod handlers;
mod rate_limit;
mod server;
pub mod ws;

pub use rate_limit::CLIENT_ID_HEADER;
pub use server::HttpServer;

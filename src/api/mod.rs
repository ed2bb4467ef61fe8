//! API Layer Module
//!
//! HTTP server, REST routes and the WebSocket event stream.

pub mod routes;
pub mod server;
pub mod websocket;

pub use routes::{ApiError, ErrorResponse};
pub use server::{create_router, start_server, SharedAppState};

//! WebSocket Session Management
//!
//! This module contains the core logic for handling real-time call sessions
//! over WebSockets. It is structured into submodules for clarity:
//!
//! - `protocol`: Defines the JSON-based message format spoken with the voice platform.
//! - `session`: Manages the WebSocket connection lifecycle, from handshake to termination.
//! - `turn`: Decides when reply generation starts and enforces "most recent request wins".

pub mod protocol;
pub mod session;
mod turn;

pub use session::ws_handler;

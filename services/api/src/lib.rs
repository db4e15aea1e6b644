//! Front Desk API Library Crate
//!
//! This library contains all the logic for the voice front-desk web service:
//! the application state, REST handlers, WebSocket session logic, and
//! routing. The binaries in `bin/` are thin wrappers around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;

#[cfg(test)]
mod test_support;

//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds all shared,
//! clonable resources like the response streamer and the callback bridge.

use crate::config::Config;
use frontdesk_core::{callbacks::CallbackBridge, streamer::ResponseStreamer};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub streamer: Arc<ResponseStreamer>,
    pub callbacks: Arc<CallbackBridge>,
    pub http: reqwest::Client,
    pub config: Arc<Config>,
}

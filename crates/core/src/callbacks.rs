//! Bridge between synchronous-looking tool calls and asynchronous webhook
//! callbacks.
//!
//! A tool that depends on an external event registers a callback id, fires
//! the webhook with a callback URL embedded, and then polls the bridge for
//! the fulfillment that the webhook partner eventually POSTs back. One
//! instance is created at startup and injected wherever needed; there is no
//! module-level store.

use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Errors produced while waiting on a callback.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("timed out waiting for callback '{0}'")]
    Timeout(String),
}

struct PendingCallback {
    value: Option<Value>,
    created_at: Instant,
}

/// Concurrent store of in-flight callbacks, keyed by callback id.
///
/// Each id is logically single-owner: one registrant, one waiter. Reads are
/// destructive; a value is handed out at most once.
pub struct CallbackBridge {
    entries: Mutex<HashMap<String, PendingCallback>>,
    max_wait: Duration,
    poll_interval: Duration,
}

impl CallbackBridge {
    pub fn new(max_wait: Duration, poll_interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_wait,
            poll_interval,
        }
    }

    /// Announces that a fulfillment for `id` is expected.
    pub async fn register(&self, id: &str) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            id.to_string(),
            PendingCallback {
                value: None,
                created_at: Instant::now(),
            },
        );
    }

    /// Stores the fulfillment value for `id`, overwriting any unread value.
    ///
    /// A fulfillment arriving after the waiter timed out is stored anyway and
    /// silently discarded on the next overwrite; nothing awaits it anymore.
    pub async fn fulfill(&self, id: &str, value: Value) {
        let mut entries = self.entries.lock().await;
        let previous = entries.insert(
            id.to_string(),
            PendingCallback {
                value: Some(value),
                created_at: Instant::now(),
            },
        );
        if previous.is_some_and(|p| p.value.is_some()) {
            debug!(callback_id = %id, "Overwrote an unread callback value");
        }
    }

    /// Polls at a fixed interval until `id` is fulfilled or `max_wait` has
    /// elapsed. Consumes the entry on success; a timeout removes the
    /// registration so no residual entry is left behind.
    pub async fn await_result(&self, id: &str) -> Result<Value, CallbackError> {
        let mut waited = Duration::ZERO;
        loop {
            {
                let mut entries = self.entries.lock().await;
                let fulfilled = entries.get_mut(id).and_then(|entry| entry.value.take());
                if let Some(value) = fulfilled {
                    entries.remove(id);
                    return Ok(value);
                }
            }

            if waited >= self.max_wait {
                let mut entries = self.entries.lock().await;
                if let Some(entry) = entries.remove(id) {
                    debug!(
                        callback_id = %id,
                        age = ?entry.created_at.elapsed(),
                        "Gave up waiting for callback"
                    );
                }
                return Err(CallbackError::Timeout(id.to_string()));
            }

            tokio::time::sleep(self.poll_interval).await;
            waited += self.poll_interval;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bridge() -> CallbackBridge {
        CallbackBridge::new(Duration::from_secs(2), Duration::from_millis(50))
    }

    #[tokio::test(start_paused = true)]
    async fn round_trip_returns_value_once() {
        let bridge = bridge();
        bridge.register("cb-1").await;
        bridge.fulfill("cb-1", json!({"event": null})).await;

        let value = bridge.await_result("cb-1").await.unwrap();
        assert_eq!(value, json!({"event": null}));

        // The entry was consumed; a second wait times out.
        let err = bridge.await_result("cb-1").await.unwrap_err();
        assert!(matches!(err, CallbackError::Timeout(id) if id == "cb-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn fulfillment_during_poll_is_picked_up() {
        let bridge = std::sync::Arc::new(bridge());
        bridge.register("cb-2").await;

        let waiter = {
            let bridge = bridge.clone();
            tokio::spawn(async move { bridge.await_result("cb-2").await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        bridge.fulfill("cb-2", json!({"slot": "open"})).await;

        let value = waiter.await.unwrap().unwrap();
        assert_eq!(value, json!({"slot": "open"}));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_leaves_no_entry_behind() {
        let bridge = bridge();
        bridge.register("cb-3").await;
        let err = bridge.await_result("cb-3").await.unwrap_err();
        assert!(matches!(err, CallbackError::Timeout(_)));

        // A late fulfillment recreates an orphan entry; overwriting it is the
        // accepted lossy behavior.
        bridge.fulfill("cb-3", json!(1)).await;
        bridge.fulfill("cb-3", json!(2)).await;
        assert_eq!(bridge.await_result("cb-3").await.unwrap(), json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn fulfill_overwrites_pending_value() {
        let bridge = bridge();
        bridge.register("cb-4").await;
        bridge.fulfill("cb-4", json!("first")).await;
        bridge.fulfill("cb-4", json!("second")).await;
        assert_eq!(bridge.await_result("cb-4").await.unwrap(), json!("second"));
    }
}

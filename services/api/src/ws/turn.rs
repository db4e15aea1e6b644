//! Per-connection turn control: decides when a new reply generation starts
//! and guarantees that only the most recent request's chunks reach the peer.

use crate::ws::protocol::OutboundMessage;
use frontdesk_core::{
    streamer::ResponseStreamer,
    turn::{InteractionType, TurnRequest},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Owns the reply lifecycle for one connection.
///
/// Each `response_required`/`reminder_required` request starts an
/// independently cancellable turn task; a newer request supersedes the
/// in-flight one. Supersession is enforced twice: the stale task is aborted,
/// and the delivery pump re-checks the latest response id before every chunk
/// in case the abort races a send.
pub struct TurnController {
    streamer: Arc<ResponseStreamer>,
    outbound: mpsc::Sender<OutboundMessage>,
    latest_response_id: Arc<AtomicU64>,
    active_turn: Option<JoinHandle<()>>,
}

impl TurnController {
    pub fn new(streamer: Arc<ResponseStreamer>, outbound: mpsc::Sender<OutboundMessage>) -> Self {
        Self {
            streamer,
            outbound,
            latest_response_id: Arc::new(AtomicU64::new(0)),
            active_turn: None,
        }
    }

    /// Dispatches one inbound request.
    pub async fn handle_request(&mut self, request: TurnRequest) {
        match request.interaction_type {
            InteractionType::CallDetails | InteractionType::UpdateOnly => {}
            InteractionType::PingPong => {
                let _ = self
                    .outbound
                    .send(OutboundMessage::PingPong {
                        timestamp: request.timestamp,
                    })
                    .await;
            }
            InteractionType::ResponseRequired | InteractionType::ReminderRequired => {
                self.latest_response_id
                    .store(request.response_id, Ordering::SeqCst);
                if let Some(handle) = self.active_turn.take() {
                    handle.abort();
                    debug!(
                        superseded_by = request.response_id,
                        "Aborted the previous turn task"
                    );
                }
                let streamer = self.streamer.clone();
                let outbound = self.outbound.clone();
                let latest = self.latest_response_id.clone();
                self.active_turn = Some(tokio::spawn(async move {
                    run_turn(streamer, request, outbound, latest).await;
                }));
            }
        }
    }

    /// Aborts any in-flight turn. Called when the connection goes away.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.active_turn.take() {
            handle.abort();
        }
    }
}

/// Generates one reply and pumps its chunks to the outbound channel, dropping
/// the rest of the stream as soon as the turn is superseded.
async fn run_turn(
    streamer: Arc<ResponseStreamer>,
    request: TurnRequest,
    outbound: mpsc::Sender<OutboundMessage>,
    latest_response_id: Arc<AtomicU64>,
) {
    let response_id = request.response_id;
    let (tx, mut rx) = mpsc::channel(32);
    let generator = tokio::spawn(async move {
        streamer.generate(request, tx).await;
    });

    while let Some(chunk) = rx.recv().await {
        if chunk.response_id < latest_response_id.load(Ordering::SeqCst) {
            debug!(response_id, "Turn superseded; dropping remaining chunks");
            break;
        }
        if outbound
            .send(OutboundMessage::Response { chunk })
            .await
            .is_err()
        {
            break;
        }
    }

    // Closing the receiver starves the generator; aborting also cuts any
    // in-flight model or tool I/O short.
    generator.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedLlm, test_streamer};
    use frontdesk_core::llm_client::LlmStreamEvent;
    use std::time::Duration;

    fn text(content: &str) -> anyhow::Result<LlmStreamEvent> {
        Ok(LlmStreamEvent::TextDelta(content.to_string()))
    }

    fn request(interaction_type: InteractionType, response_id: u64) -> TurnRequest {
        TurnRequest {
            interaction_type,
            response_id,
            transcript: Vec::new(),
            timestamp: 42,
        }
    }

    fn controller_with(
        delay: Duration,
        scripts: Vec<Vec<anyhow::Result<LlmStreamEvent>>>,
    ) -> (TurnController, mpsc::Receiver<OutboundMessage>) {
        let streamer = test_streamer(Arc::new(ScriptedLlm::new(delay, scripts)));
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        (TurnController::new(streamer, outbound_tx), outbound_rx)
    }

    #[tokio::test]
    async fn ping_pong_echoes_timestamp_without_reply_chunks() {
        let (mut controller, mut outbound) = controller_with(Duration::ZERO, Vec::new());
        controller
            .handle_request(request(InteractionType::PingPong, 0))
            .await;

        match outbound.recv().await.unwrap() {
            OutboundMessage::PingPong { timestamp } => assert_eq!(timestamp, 42),
            other => panic!("unexpected message: {other:?}"),
        }
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test]
    async fn bookkeeping_messages_are_ignored() {
        let (mut controller, mut outbound) = controller_with(Duration::ZERO, Vec::new());
        controller
            .handle_request(request(InteractionType::CallDetails, 0))
            .await;
        controller
            .handle_request(request(InteractionType::UpdateOnly, 0))
            .await;
        assert!(outbound.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn single_turn_delivers_all_chunks_in_order() {
        let (mut controller, mut outbound) = controller_with(
            Duration::from_millis(10),
            vec![vec![text("Good "), text("morning"), text("!")]],
        );
        controller
            .handle_request(request(InteractionType::ResponseRequired, 1))
            .await;

        let mut contents = Vec::new();
        loop {
            match outbound.recv().await.unwrap() {
                OutboundMessage::Response { chunk } => {
                    let done = chunk.content_complete;
                    contents.push(chunk.content);
                    if done {
                        break;
                    }
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }
        assert_eq!(contents.concat(), "Good morning!");
        assert_eq!(contents.last().unwrap(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_request_supersedes_older_stream() {
        let older: Vec<_> = std::iter::repeat_with(|| text("old "))
            .take(20)
            .collect();
        let (mut controller, mut outbound) = controller_with(
            Duration::from_millis(50),
            vec![older, vec![text("new "), text("reply")]],
        );

        controller
            .handle_request(request(InteractionType::ResponseRequired, 1))
            .await;
        tokio::time::sleep(Duration::from_millis(160)).await;
        controller
            .handle_request(request(InteractionType::ResponseRequired, 2))
            .await;

        let mut delivered = Vec::new();
        loop {
            match outbound.recv().await.unwrap() {
                OutboundMessage::Response { chunk } => {
                    let done = chunk.content_complete && chunk.response_id == 2;
                    delivered.push(chunk);
                    if done {
                        break;
                    }
                }
                other => panic!("unexpected message: {other:?}"),
            }
        }

        // Once a chunk of the newer response is observed, no chunk of the
        // older response may follow.
        let first_new = delivered
            .iter()
            .position(|c| c.response_id == 2)
            .expect("newer response never delivered");
        assert!(delivered[first_new..].iter().all(|c| c.response_id == 2));

        let reply: String = delivered[first_new..]
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(reply, "new reply");
    }

    #[tokio::test(start_paused = true)]
    async fn reminder_request_starts_a_turn() {
        let (mut controller, mut outbound) = controller_with(
            Duration::from_millis(10),
            vec![vec![text("Are you still there?")]],
        );
        controller
            .handle_request(request(InteractionType::ReminderRequired, 3))
            .await;

        match outbound.recv().await.unwrap() {
            OutboundMessage::Response { chunk } => {
                assert_eq!(chunk.response_id, 3);
                assert_eq!(chunk.content, "Are you still there?");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}

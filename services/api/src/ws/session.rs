//! Manages the WebSocket connection lifecycle for one call.

use super::{protocol::OutboundMessage, turn::TurnController};
use crate::state::AppState;
use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use frontdesk_core::turn::TurnRequest;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

/// A connection that has gone this long without any inbound traffic is dead.
const IDLE_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(call_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, call_id))
}

/// Main handler for an individual call connection.
///
/// Sends the capability config and the greeting, then loops over inbound
/// transcript updates, handing each to the turn controller. A writer task
/// owns the socket sink so that chunks from the active turn are delivered in
/// generation order.
#[instrument(name = "call_session", skip_all, fields(call_id = %call_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, call_id: String) {
    info!("New call connection");
    let (socket_tx, socket_rx) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(64);
    let writer = tokio::spawn(write_outbound(socket_tx, outbound_rx));

    // Optional config so the platform knows our capabilities, then the
    // greeting to signal that the server is ready.
    let greeting = OutboundMessage::Response {
        chunk: state.streamer.greeting(),
    };
    if outbound_tx.send(OutboundMessage::session_config()).await.is_err()
        || outbound_tx.send(greeting).await.is_err()
    {
        error!("Connection closed before the handshake finished");
        return;
    }

    let mut controller = TurnController::new(state.streamer.clone(), outbound_tx.clone());
    run_session(&mut controller, socket_rx).await;

    controller.shutdown();
    drop(outbound_tx);
    let _ = writer.await;
    info!("Call session closed");
}

/// The inbound loop: parse each text frame as a turn request and dispatch it.
async fn run_session(controller: &mut TurnController, mut socket_rx: SplitStream<WebSocket>) {
    loop {
        match tokio::time::timeout(IDLE_TIMEOUT, socket_rx.next()).await {
            Err(_) => {
                info!("Connection idle too long; closing the session");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                error!(error = ?e, "Error receiving from the platform");
                break;
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                match serde_json::from_str::<TurnRequest>(&text) {
                    Ok(request) => controller.handle_request(request).await,
                    Err(e) => warn!(error = ?e, "Ignoring malformed inbound message"),
                }
            }
            Ok(Some(Ok(Message::Close(_)))) => {
                info!("Platform sent close frame");
                break;
            }
            Ok(Some(Ok(_))) => {}
        }
    }
}

/// Serializes outbound messages and owns the socket sink.
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<OutboundMessage>,
) {
    while let Some(message) = rx.recv().await {
        match serde_json::to_string(&message) {
            Ok(serialized) => {
                if sink.send(Message::Text(serialized.into())).await.is_err() {
                    break;
                }
            }
            Err(e) => error!(error = ?e, "Failed to serialize outbound message"),
        }
    }
}

//! Manages the WebSocket connection lifecycle for a relay session.

use super::{protocol::ServerMessage, turn::relay_turn};
use crate::{config::Provider, state::AppState};
use anyhow::Result;
use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use relay_core::llm_client::{ChatSession, LLMClient};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, instrument, warn};

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, peer, state))
}

/// Main handler for an individual WebSocket connection.
///
/// Each connection gets its own chat session, so history is never shared.
/// When the model failed to initialize, the client is told once and the
/// session is closed without processing any prompts.
#[instrument(name = "ws_session", skip_all, fields(session_id, %peer))]
async fn handle_socket(socket: WebSocket, peer: SocketAddr, state: Arc<AppState>) {
    let session_id: u32 = rand::random();
    tracing::Span::current().record("session_id", session_id);

    let Some(llm_client) = state.llm_client.clone() else {
        warn!("Generation client is not available. Cannot process requests.");
        let (mut socket_tx, mut socket_rx) = socket.split();
        if let Err(e) = reject_unavailable(&mut socket_tx).await {
            warn!(error = ?e, "Failed to notify client that the model is unavailable.");
            return;
        }
        // Prompts are discarded until the client completes the close handshake.
        while let Some(Ok(msg)) = socket_rx.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
        return;
    };

    info!("New chat session started for WebSocket connection.");
    match run_relay_session(socket, llm_client, &state).await {
        Ok(()) => info!("Client disconnected."),
        Err(e) => error!(error = ?e, "Relay session terminated with error."),
    }
}

/// Sends the unavailable notice and the sentinel, then closes the socket.
async fn reject_unavailable<S>(socket_tx: &mut S) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    send_msg(socket_tx, ServerMessage::ModelUnavailable).await?;
    send_msg(socket_tx, ServerMessage::End).await?;
    socket_tx.send(Message::Close(None)).await?;
    Ok(())
}

/// Splits the socket and runs the receive loop with a fresh chat session.
async fn run_relay_session(
    socket: WebSocket,
    llm_client: Arc<dyn LLMClient>,
    state: &AppState,
) -> Result<()> {
    let (mut socket_tx, socket_rx) = socket.split();
    let mut chat = llm_client.create_session();
    relay_frames(
        &mut socket_tx,
        socket_rx,
        chat.as_mut(),
        &state.config.provider,
    )
    .await
}

/// The receive loop for an active session.
///
/// Prompts are handled one at a time; the next frame is not read until the
/// current turn has sent its sentinel. A peer close ends the loop normally,
/// a read error ends it with that error.
pub(crate) async fn relay_frames<Tx, Rx, E>(
    socket_tx: &mut Tx,
    mut socket_rx: Rx,
    chat: &mut dyn ChatSession,
    provider: &Provider,
) -> Result<()>
where
    Tx: Sink<Message> + Unpin,
    Tx::Error: std::error::Error + Send + Sync + 'static,
    Rx: Stream<Item = Result<Message, E>> + Unpin,
    E: std::error::Error + Send + Sync + 'static,
{
    while let Some(msg_result) = socket_rx.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                info!(prompt = %text.as_str(), "Received message from client");
                relay_turn(&mut *socket_tx, &mut *chat, text.as_str(), provider).await?;
            }
            Ok(Message::Binary(data)) => {
                warn!(
                    bytes = data.len(),
                    "Ignoring binary frame; only text prompts are accepted."
                );
            }
            Ok(Message::Close(_)) => {
                info!("Client sent close frame.");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {}
            Err(e) => {
                return Err(anyhow::Error::new(e).context("Error receiving from client WebSocket"));
            }
        }
    }

    Ok(())
}

/// A helper function to send a `ServerMessage` to the client as a text frame.
pub(crate) async fn send_msg<S>(socket_tx: &mut S, msg: ServerMessage) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::error::Error + Send + Sync + 'static,
{
    socket_tx.send(Message::Text(msg.into_text().into())).await?;
    Ok(())
}

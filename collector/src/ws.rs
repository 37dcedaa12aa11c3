//! WebSocket endpoint observers connect to for the broadcaster.

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::IntoResponse,
};
use tracing::trace;

use crate::AppState;

pub async fn upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: axum::extract::ws::WebSocket, state: Arc<AppState>) {
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let (client_id, mut mailbox) = state.broadcaster.register();
    state.broadcaster.send_welcome(client_id);

    let forward = tokio::spawn(async move {
        while let Some(message) = mailbox.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Observers are not expected to send anything meaningful; drain and discard
    // until the socket closes so the connection is recognized as alive.
    while let Some(message) = receiver.next().await {
        if message.is_err() {
            break;
        }
    }

    forward.abort();
    state.broadcaster.deregister(client_id);
    trace!(client_id, "observer session closed");
}

//! WebSocket upgrade + per-connection loop.
//!
//! One connection = one user session: a `SessionFlow` plus one receiver per
//! snapshot feed. The loop selects over incoming client messages and the
//! three feeds; snapshots are pushed at connect and whenever a feed changes.
//! Dropping the receivers when the loop exits is the unsubscribe.

use std::sync::Arc;

use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{debug, error, info, instrument};

use crate::flow::SessionFlow;
use crate::protocol::{
  assignments_out, questions_out, users_out, ClientWsMessage, ServerWsMessage,
};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "mentora_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "mentora_backend", "WebSocket connected");

  let mut questions_rx = state.subscribe_questions();
  let mut users_rx = state.subscribe_users();
  let mut assignments_rx = state.subscribe_assignments();
  let mut flow = SessionFlow::new();

  // Session start: a signed-out identity plus the current snapshots.
  let hello = [
    ServerWsMessage::Identity { user: None },
    ServerWsMessage::Questions { questions: questions_out(&questions_rx.borrow_and_update()) },
    ServerWsMessage::Users { users: users_out(&users_rx.borrow_and_update()) },
    ServerWsMessage::Assignments {
      assignments: assignments_out(&assignments_rx.borrow_and_update()),
    },
  ];
  for msg in hello {
    if send(&mut socket, &msg).await.is_err() {
      return;
    }
  }

  loop {
    tokio::select! {
      incoming = socket.recv() => {
        match incoming {
          Some(Ok(Message::Text(txt))) => {
            // Parse, dispatch, serialize replies.
            let replies = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(msg) => {
                debug!(target: "mentora_backend", "WS received: {:?}", &msg);
                flow.handle(&state, msg).await
              }
              Err(e) => vec![ServerWsMessage::Error {
                code: "validation",
                message: format!("Invalid JSON: {}", e),
              }],
            };
            for msg in &replies {
              if send(&mut socket, msg).await.is_err() {
                return;
              }
            }
          }
          Some(Ok(Message::Ping(payload))) => { let _ = socket.send(Message::Pong(payload)).await; }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => {}
          Some(Err(e)) => {
            error!(target: "mentora_backend", error = %e, "WS receive error");
            break;
          }
        }
      }
      changed = questions_rx.changed() => {
        if changed.is_err() { break; }
        let msg = ServerWsMessage::Questions {
          questions: questions_out(&questions_rx.borrow_and_update()),
        };
        if send(&mut socket, &msg).await.is_err() { return; }
      }
      changed = users_rx.changed() => {
        if changed.is_err() { break; }
        let msg = ServerWsMessage::Users { users: users_out(&users_rx.borrow_and_update()) };
        if send(&mut socket, &msg).await.is_err() { return; }
      }
      changed = assignments_rx.changed() => {
        if changed.is_err() { break; }
        let msg = ServerWsMessage::Assignments {
          assignments: assignments_out(&assignments_rx.borrow_and_update()),
        };
        if send(&mut socket, &msg).await.is_err() { return; }
      }
    }
  }
  info!(target: "mentora_backend", "WebSocket disconnected");
}

async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> Result<(), axum::Error> {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "code": "internal", "message": format!("Serialization error: {}", e) }).to_string()
  });
  if let Err(e) = socket.send(Message::Text(out)).await {
    error!(target: "mentora_backend", error = %e, "WS send error");
    return Err(e);
  }
  Ok(())
}

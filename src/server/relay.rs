//! Socket relay: WebSocket senders feeding a streamed slot
//!
//! A relay session pairs one receiver socket with any number of sender
//! sockets. The receiver opens the session and is shown every update of a
//! keyed stream; senders push text frames into it as fragments. The stream
//! ends when a sender closes the session or the receiver disconnects.
//!
//! ```text
//!   /relay/:session/send ──frames──▶ RelayHub ──mpsc──▶ stream_markdown ──▶ /relay/:session/recv
//! ```

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::state::AppState;
use crate::display::{stream_markdown, MarkdownCall};
use crate::render::{ChannelHost, RenderContext, SessionState};
use crate::stream::{Fragment, FragmentSource};

/// Fragments buffered per session before senders wait
const RELAY_BUFFER: usize = 64;

struct RelaySession {
    tx: mpsc::Sender<Fragment>,
    generation: u64,
    opened_at: DateTime<Utc>,
}

#[derive(Default)]
struct Sessions {
    open: HashMap<String, RelaySession>,
    next_generation: u64,
}

/// One opening of a named session
///
/// Names are reused once a session closes, so every opening gets its own
/// generation and connections only ever close the opening they joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTicket {
    pub session: String,
    pub generation: u64,
}

/// Open relay sessions, shared by every connection
#[derive(Clone, Default)]
pub struct RelayHub {
    sessions: Arc<Mutex<Sessions>>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Open `session` for a receiver; `None` if it is already open
    pub fn open(&self, session: &str) -> Option<(RelayTicket, mpsc::Receiver<Fragment>)> {
        let mut sessions = self.sessions();
        if sessions.open.contains_key(session) {
            return None;
        }
        sessions.next_generation += 1;
        let generation = sessions.next_generation;
        let (tx, rx) = mpsc::channel(RELAY_BUFFER);
        sessions.open.insert(
            session.to_string(),
            RelaySession {
                tx,
                generation,
                opened_at: Utc::now(),
            },
        );
        let ticket = RelayTicket {
            session: session.to_string(),
            generation,
        };
        Some((ticket, rx))
    }

    /// Sending half of an open session
    pub fn sender(&self, session: &str) -> Option<(RelayTicket, mpsc::Sender<Fragment>)> {
        self.sessions().open.get(session).map(|s| {
            let ticket = RelayTicket {
                session: session.to_string(),
                generation: s.generation,
            };
            (ticket, s.tx.clone())
        })
    }

    /// Drop the hub's handle on the opening named by `ticket`
    ///
    /// The receiver's stream ends once every sender handed out has also been
    /// dropped. Returns false if that opening is already closed, even when a
    /// newer one of the same name is open.
    pub fn close(&self, ticket: &RelayTicket) -> bool {
        let mut sessions = self.sessions();
        let current = sessions
            .open
            .get(&ticket.session)
            .is_some_and(|s| s.generation == ticket.generation);
        if !current {
            return false;
        }
        let Some(closed) = sessions.open.remove(&ticket.session) else {
            return false;
        };
        let open_for = Utc::now() - closed.opened_at;
        tracing::debug!(
            "Relay session '{}' (generation {}) closed after {}ms",
            ticket.session,
            ticket.generation,
            open_for.num_milliseconds()
        );
        true
    }

    pub fn len(&self) -> usize {
        self.sessions().open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `GET /relay/:session/recv`
pub async fn relay_recv(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| run_receiver(socket, state, session))
}

/// `GET /relay/:session/send`
pub async fn relay_send(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Response {
    ws.on_upgrade(move |socket| run_sender(socket, state, session))
}

async fn run_receiver(socket: WebSocket, state: AppState, session: String) {
    let (mut sink, mut incoming) = socket.split();

    let Some((ticket, rx)) = state.relay.open(&session) else {
        tracing::warn!("Relay session '{}' already has a receiver", session);
        let _ = sink.send(Message::Close(None)).await;
        return;
    };
    tracing::info!("Relay session '{}' opened", session);

    // Host instructions are forwarded to the socket as JSON text frames
    let (host, mut instructions) = ChannelHost::channel();
    let forwarder = tokio::spawn(async move {
        while let Some(instruction) = instructions.recv().await {
            let text = match serde_json::to_string(&instruction) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to serialize instruction: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        sink
    });

    let disconnected = async move {
        while let Some(Ok(msg)) = incoming.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    };

    let outcome = {
        let mut session_state = SessionState::new();
        let mut ctx = RenderContext::new(&mut session_state, host, None);
        ctx.dev_server = state.dev_server.clone();
        let stream = stream_markdown(
            &mut ctx,
            FragmentSource::from_channel(rx),
            state.render.options(),
            MarkdownCall::keyed(session.clone()),
        );

        tokio::select! {
            result = stream => Some(result),
            _ = disconnected => None,
        }
    };
    state.relay.close(&ticket);

    let Ok(mut sink) = forwarder.await else {
        return;
    };
    let closing = match outcome {
        Some(Ok(text)) => json!({"op": "done", "text": text}),
        Some(Err(e)) => {
            tracing::warn!("Relay session '{}' failed: {}", session, e);
            json!({"op": "error", "message": e.to_string(), "partial": e.partial_content()})
        }
        None => {
            tracing::info!("Relay receiver for '{}' disconnected", session);
            return;
        }
    };
    let _ = sink.send(Message::Text(closing.to_string())).await;
    let _ = sink.send(Message::Close(None)).await;
}

async fn run_sender(mut socket: WebSocket, state: AppState, session: String) {
    let Some((ticket, tx)) = state.relay.sender(&session) else {
        tracing::warn!("Relay session '{}' is not open, closing sender", session);
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let mut sent = 0usize;
    while let Some(msg) = socket.next().await {
        let fragment = match msg {
            Ok(Message::Text(text)) => Fragment::Text(text),
            Ok(Message::Binary(data)) => Fragment::Bytes(Bytes::from(data)),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::warn!("Relay sender for '{}' failed: {}", session, e);
                break;
            }
        };
        if tx.send(fragment).await.is_err() {
            // receiver is gone
            break;
        }
        sent += 1;
    }

    tracing::debug!("Relay sender for '{}' done after {} fragment(s)", session, sent);
    drop(tx);
    state.relay.close(&ticket);
}

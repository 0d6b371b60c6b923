//! HTTP handlers: simulated token streams and the server-sent render stream

use axum::{
    body::Body,
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures::{Stream, StreamExt};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::error::ServerError;
use super::state::AppState;
use super::tokens::{simulated_token_stream, simulated_tokenizer_stream};
use crate::component::Theme;
use crate::display::{stream_markdown, MarkdownCall};
use crate::render::{ChannelHost, HostInstruction, HostReceiver, RenderContext, SessionState};
use crate::stream::{http_fragments, Fragment, FragmentSource};

/// Query of the simulated token endpoints
#[derive(Debug, Deserialize)]
pub struct TextQuery {
    pub text: String,
}

/// Query of the render stream
#[derive(Debug, Deserialize)]
pub struct RenderQuery {
    /// Text streamed through the simulated token stream
    pub text: Option<String>,
    /// Remote endpoint streaming a plain-text body; wins over `text`
    ///
    /// Must live under an allowed upstream.
    pub url: Option<String>,
    pub theme: Option<String>,
    pub rich_content: Option<bool>,
}

pub async fn health() -> &'static str {
    "ok"
}

/// `GET /simulated_token_stream?text=`
pub async fn simulated_tokens(
    State(state): State<AppState>,
    Query(query): Query<TextQuery>,
) -> Response {
    let chunks = simulated_token_stream(&query.text, &state.simulation);
    Body::from_stream(chunks.map(Ok::<_, Infallible>)).into_response()
}

/// `GET /simulated_with_tokenizer?text=`
pub async fn simulated_with_tokenizer(
    State(state): State<AppState>,
    Query(query): Query<TextQuery>,
) -> Response {
    let chunks = simulated_tokenizer_stream(&query.text, &state.simulation);
    Body::from_stream(chunks.map(Ok::<_, Infallible>)).into_response()
}

/// `GET /render/:key`
///
/// Streams the text into the keyed slot and reports every host instruction
/// as an SSE event (`clear`, `update`), then `done` with the final text or
/// `error` with whatever was shown before the failure.
pub async fn render_stream(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<RenderQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ServerError> {
    let source = match (&query.url, &query.text) {
        (Some(url), _) => {
            let url = Url::parse(url)
                .map_err(|e| ServerError::BadRequest(format!("invalid `url` {:?}: {}", url, e)))?;
            if !state.upstreams.allows(&url) {
                return Err(ServerError::Forbidden(format!(
                    "{} is not an allowed upstream",
                    url
                )));
            }
            http_fragments(&state.client, url.as_str()).await?
        }
        (None, Some(text)) => FragmentSource::from_stream(
            simulated_token_stream(text, &state.simulation).map(|c| Ok(Fragment::Text(c))),
        ),
        (None, None) => {
            return Err(ServerError::BadRequest(
                "either `text` or `url` is required".to_string(),
            ))
        }
    };

    let mut render = state.render.clone();
    if let Some(theme) = &query.theme {
        render.theme = Theme::from_str(theme);
    }
    if let Some(rich_content) = query.rich_content {
        render.rich_content = rich_content;
    }
    let options = render.options();

    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(100);
    let (host, instructions) = ChannelHost::channel();
    let forwarder = tokio::spawn(forward_instructions(instructions, tx.clone()));

    tracing::info!("Render stream for key '{}' started", key);
    tokio::spawn(async move {
        let result = {
            let mut session = SessionState::new();
            let mut ctx = RenderContext::new(&mut session, host, None);
            ctx.dev_server = state.dev_server.clone();
            stream_markdown(&mut ctx, source, options, MarkdownCall::keyed(key.clone())).await
        };
        // every update is queued before the closing event
        let _ = forwarder.await;

        let closing = match result {
            Ok(text) => {
                tracing::info!("Render stream for key '{}' done ({} bytes)", key, text.len());
                Event::default()
                    .event("done")
                    .data(json!({"key": key, "text": text}).to_string())
            }
            Err(e) => {
                tracing::warn!("Render stream for key '{}' failed: {}", key, e);
                Event::default().event("error").data(
                    json!({
                        "key": key,
                        "message": e.to_string(),
                        "partial": e.partial_content(),
                    })
                    .to_string(),
                )
            }
        };
        let _ = tx.send(Ok(closing)).await;
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}

/// Turn host instructions into SSE events until the host goes away
async fn forward_instructions(
    mut instructions: HostReceiver,
    tx: mpsc::Sender<Result<Event, Infallible>>,
) {
    while let Some(instruction) = instructions.recv().await {
        let name = match &instruction {
            HostInstruction::Clear { .. } => "clear",
            HostInstruction::Replace(_) => "update",
        };
        let event = match Event::default().event(name).json_data(&instruction) {
            Ok(event) => event,
            Err(e) => {
                tracing::error!("Failed to serialize instruction: {}", e);
                continue;
            }
        };
        if tx.send(Ok(event)).await.is_err() {
            // client went away
            break;
        }
    }
}

//! HTTP and WebSocket handlers for the relay.
//!
//! This module serves the browser client and runs one task per WebSocket
//! connection that feeds the relay and forwards its broadcasts.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::Result;
use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use bytes::BytesMut;
use circles_core::{ConnectionId, Relay, RelayConfig};
use circles_protocol::{codec, Encoding, Frame, ProtocolError};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

static INDEX_HTML: &str = include_str!("../assets/index.html");
static APP_JS: &str = include_str!("../assets/app.js");

/// Replaced in the page with the configured WebSocket path.
const WS_PATH_PLACEHOLDER: &str = "{{WS_PATH}}";

/// Shared server state.
pub struct AppState {
    /// The broadcast relay.
    pub relay: Relay,
    /// Server configuration.
    pub config: Config,
}

impl AppState {
    /// Create new app state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let relay_config = RelayConfig {
            max_connections: config.limits.max_connections,
            capacity: config.limits.broadcast_capacity,
        };

        Self {
            relay: Relay::with_config(relay_config),
            config,
        }
    }
}

/// Query parameters of the WebSocket endpoint.
#[derive(Debug, Default, Deserialize)]
struct WsParams {
    /// Encoding of events sent to this connection.
    #[serde(default)]
    encoding: Encoding,
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/app.js", get(script_handler))
        .route("/health", get(health_handler))
        .route(&state.config.transport.websocket_path, get(ws_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn run_server(config: Config) -> Result<()> {
    metrics::setup(&config.metrics);

    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve(listener, Arc::new(AppState::new(config))).await
}

/// Serve the relay on an already bound listener.
///
/// # Errors
///
/// Returns an error if serving fails.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Circles relay listening on http://{}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, state.config.transport.websocket_path
    );

    axum::serve(listener, app(state)).await?;

    Ok(())
}

/// Browser page.
async fn index_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(INDEX_HTML.replace(
        WS_PATH_PLACEHOLDER,
        &state.config.transport.websocket_path,
    ))
}

/// Browser script.
async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        APP_JS,
    )
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let stats = state.relay.stats();
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "connections": stats.connection_count,
        "receivers": stats.receiver_count,
        "events_relayed": stats.events_relayed,
    }))
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_websocket(socket, state, params.encoding))
}

/// Handle a WebSocket connection.
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>, encoding: Encoding) {
    let _metrics_guard = ConnectionMetricsGuard::new();
    let connection_id = ConnectionId::generate();

    let mut feed = match state.relay.join(&connection_id) {
        Ok(feed) => feed,
        Err(e) => {
            warn!(connection = %connection_id, error = %e, "Rejecting connection");
            metrics::record_error("join");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::AGAIN,
                    reason: e.to_string().into(),
                })))
                .await;
            return;
        }
    };

    debug!(connection = %connection_id, encoding = %encoding, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    // Read buffer for partial binary frames
    let mut read_buffer = BytesMut::with_capacity(4096);

    let heartbeat = &state.config.heartbeat;
    let timeout = Duration::from_millis(heartbeat.timeout_ms);
    let mut ticker = tokio::time::interval(Duration::from_millis(heartbeat.interval_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;
    let mut last_seen = Instant::now();

    loop {
        tokio::select! {
            // Frames broadcast by the relay, including our own
            delivery = feed.recv() => match delivery {
                Ok(envelope) => {
                    let sent = tokio::time::timeout(
                        timeout,
                        send_frame(&mut sender, &envelope.frame, encoding),
                    )
                    .await;
                    match sent {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            debug!(connection = %connection_id, error = %e, "Send failed");
                            break;
                        }
                        Err(_) => {
                            info!(connection = %connection_id, "Send stalled, dropping connection");
                            metrics::record_error("stalled");
                            break;
                        }
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(connection = %connection_id, skipped, "Connection lagging, events skipped");
                    metrics::record_error("lagged");
                }
                Err(RecvError::Closed) => break,
            },

            // Receive from WebSocket
            msg = receiver.next() => {
                last_seen = Instant::now();
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let start = Instant::now();
                        metrics::record_message(text.len(), "inbound");
                        match codec::decode_frame_text(&text) {
                            Ok(frame) => relay_frame(&state, &connection_id, frame),
                            Err(e) => {
                                warn!(connection = %connection_id, error = %e, "Ignoring undecodable text frame");
                                metrics::record_error("decode");
                            }
                        }
                        metrics::record_latency(start.elapsed().as_secs_f64());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let start = Instant::now();
                        metrics::record_message(data.len(), "inbound");
                        read_buffer.extend_from_slice(&data);
                        if let Err(e) = relay_buffered(&state, &connection_id, &mut read_buffer) {
                            warn!(connection = %connection_id, error = %e, "Dropping connection");
                            metrics::record_error("protocol");
                            break;
                        }
                        metrics::record_latency(start.elapsed().as_secs_f64());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                }
            }

            _ = ticker.tick() => {
                if last_seen.elapsed() >= timeout {
                    info!(connection = %connection_id, "Heartbeat timeout");
                    break;
                }
                let pinged = tokio::time::timeout(timeout, sender.send(Message::Ping(Vec::new()))).await;
                if !matches!(pinged, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }

    state.relay.leave(&connection_id);

    debug!(connection = %connection_id, "WebSocket disconnected");
}

/// Relay one frame to every connection.
fn relay_frame(state: &AppState, connection_id: &ConnectionId, frame: Frame) {
    let name = frame.event;
    let recipients = state.relay.broadcast(connection_id, frame);
    metrics::record_event(name.as_str());
    debug!(connection = %connection_id, event = %name, recipients, "Relayed");
}

/// Relay every complete binary frame in the buffer.
///
/// Undecodable frames are skipped; an oversized frame is fatal.
fn relay_buffered(
    state: &AppState,
    connection_id: &ConnectionId,
    buf: &mut BytesMut,
) -> Result<(), ProtocolError> {
    loop {
        match codec::decode_frame_from(buf) {
            Ok(Some(frame)) => relay_frame(state, connection_id, frame),
            Ok(None) => return Ok(()),
            Err(ProtocolError::Decode(e)) => {
                warn!(connection = %connection_id, error = %e, "Ignoring undecodable binary frame");
                metrics::record_error("decode");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Send a frame in the connection's encoding.
async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &Frame,
    encoding: Encoding,
) -> Result<()> {
    let message = match encoding {
        Encoding::Json => Message::Text(codec::encode_frame_text(frame)?),
        Encoding::MessagePack => Message::Binary(codec::encode_frame(frame)?.to_vec()),
    };
    let len = match &message {
        Message::Text(text) => text.len(),
        Message::Binary(data) => data.len(),
        _ => 0,
    };

    sender.send(message).await?;
    metrics::record_message(len, "outbound");
    Ok(())
}

//! WebSocket server handler using Axum.

use crate::config::TrackingVariant;
use crate::connection::{ConnectionRegistry, ConnectionState};
use crate::dispatcher::Dispatcher;
use crate::error::{RelayError, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge};
use serde::Serialize;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::interval;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

/// Interval between keepalive pings to the producer.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Connections silent for this long are reported as idle by `/health`.
const IDLE_THRESHOLD_MS: i64 = 5_000;

/// Shared application state.
pub struct AppState {
    pub variant: TrackingVariant,
    pub dispatcher: Dispatcher,
    pub registry: ConnectionRegistry,
}

impl AppState {
    pub fn new(variant: TrackingVariant, dispatcher: Dispatcher) -> Self {
        Self {
            variant,
            dispatcher,
            registry: ConnectionRegistry::new(),
        }
    }
}

/// Create the relay router.
///
/// Producers connect to `/` (e.g. `ws://localhost:8080`).
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Serve the relay on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    variant: &'static str,
    convention: &'static str,
    connections: usize,
    idle_connections: usize,
    messages: u64,
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        variant: state.variant.name(),
        convention: state.dispatcher.decoder().convention().name(),
        connections: state.registry.connection_count(),
        idle_connections: state.registry.idle_connections(IDLE_THRESHOLD_MS).len(),
        messages: state.registry.total_messages(),
    })
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle a producer connection.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let connection = Arc::new(ConnectionState::new());
    let connection_id = state.registry.register(connection.clone());

    counter!("relay_connections_total").increment(1);
    gauge!("relay_active_connections").set(state.registry.connection_count() as f64);

    info!("Producer {} connected ({})", connection_id, state.variant);

    // Ping interval for keepalive
    let mut ping_interval = interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ping_interval.reset();

    loop {
        tokio::select! {
            biased;

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(msg)) => {
                        if handle_message(&state, &connection, msg).is_break() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", connection_id, RelayError::from(e));
                        break;
                    }
                    None => break,
                }
            }

            _ = ping_interval.tick() => {
                if let Err(e) = ws_tx.send(Message::Ping(Bytes::new())).await {
                    debug!("Ping to {} failed: {}", connection_id, RelayError::from(e));
                    break;
                }
            }
        }
    }

    state.registry.unregister(&connection_id);

    counter!("relay_disconnections_total").increment(1);
    gauge!("relay_active_connections").set(state.registry.connection_count() as f64);

    let connected_for_ms = Utc::now().timestamp_millis() - connection.connected_at;
    info!(
        "Producer {} disconnected after {}ms, {} messages",
        connection_id,
        connected_for_ms,
        connection.message_count()
    );
}

/// Handle a single WebSocket frame. Decode failures never break the loop.
fn handle_message(
    state: &AppState,
    connection: &ConnectionState,
    msg: Message,
) -> ControlFlow<()> {
    match msg {
        Message::Text(text) => {
            state.registry.record_message(connection);
            state.dispatcher.dispatch(text.as_str());
            ControlFlow::Continue(())
        }
        Message::Binary(data) => {
            connection.touch();
            debug!(
                "Ignoring {}-byte binary frame from {}",
                data.len(),
                connection.id
            );
            ControlFlow::Continue(())
        }
        Message::Ping(_) | Message::Pong(_) => {
            // Pongs to pings are queued by the socket itself.
            connection.touch();
            ControlFlow::Continue(())
        }
        Message::Close(frame) => {
            debug!("Producer {} sent close: {:?}", connection.id, frame);
            ControlFlow::Break(())
        }
    }
}

//! Dashboard HTTP API
//!
//! REST endpoints and the `/ws` stream for dashboard clients.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::types::*;
use super::{DashboardMemory, WebSocketBroadcaster};
use crate::engine::{IndicatorSnapshot, TrendEngine};
use crate::feed::PriceHistoryStore;

/// Shared handles for every handler
#[derive(Debug, Clone)]
pub struct ApiState {
    pub memory: Arc<DashboardMemory>,
    pub history: Arc<PriceHistoryStore>,
    pub engine: Arc<TrendEngine>,
    pub broadcaster: WebSocketBroadcaster,
    /// Samples an instrument needs before it is evaluated
    pub min_history: usize,
}

/// Create the API router with all endpoints
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/prices", get(get_prices))
        .route("/api/history/:instrument", get(get_history))
        .route("/api/predictions", get(get_predictions))
        .route("/api/indicators/:instrument", get(get_indicators))
        .route("/api/health", get(get_health))
        // WebSocket
        .route("/ws", get(websocket_handler))
        // State
        .with_state(state)
        // CORS for frontend
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

// ─────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────

/// GET /api/prices - Latest price per instrument
async fn get_prices(State(state): State<ApiState>) -> impl IntoResponse {
    let prices = state.history.latest().await;
    Json(ApiResponse::success(prices))
}

/// GET /api/history/:instrument - Rolling price history, oldest first
async fn get_history(
    Path(instrument): Path<String>,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    let Some(instrument) = known_instrument(&state, &instrument).await else {
        return not_found::<HistoryResponse>(&instrument);
    };

    let prices = state.history.snapshot(&instrument).await;
    (
        StatusCode::OK,
        Json(ApiResponse::success(HistoryResponse {
            instrument,
            capacity: state.history.capacity(),
            prices,
        })),
    )
}

/// GET /api/predictions - Latest trend per instrument
async fn get_predictions(State(state): State<ApiState>) -> impl IntoResponse {
    let predictions = state.memory.get_predictions().await;
    Json(ApiResponse::success(predictions))
}

/// GET /api/indicators/:instrument - Indicator snapshot over the current history
async fn get_indicators(
    Path(instrument): Path<String>,
    State(state): State<ApiState>,
) -> impl IntoResponse {
    let Some(instrument) = known_instrument(&state, &instrument).await else {
        return not_found::<IndicatorsResponse>(&instrument);
    };

    let prices = state.history.snapshot(&instrument).await;
    if prices.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("No prices recorded for {instrument} yet"))),
        );
    }

    let indicators = IndicatorSnapshot::compute(&prices);
    let memory = state.engine.memory_snapshot(&instrument);
    (
        StatusCode::OK,
        Json(ApiResponse::success(IndicatorsResponse {
            instrument,
            indicators,
            memory,
        })),
    )
}

/// GET /api/health - Feed freshness per instrument
async fn get_health(State(state): State<ApiState>) -> impl IntoResponse {
    let health = state
        .memory
        .get_health(
            &state.history,
            state.broadcaster.subscriber_count(),
            state.min_history,
        )
        .await;
    Json(ApiResponse::success(health))
}

/// Normalize a path segment and check it names a tracked instrument
async fn known_instrument(state: &ApiState, raw: &str) -> Option<String> {
    let id = raw.trim().to_uppercase();
    state.history.instruments().await.contains(&id).then_some(id)
}

fn not_found<T: serde::Serialize>(instrument: &str) -> (StatusCode, Json<ApiResponse<T>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::error(format!("Unknown instrument: {instrument}"))),
    )
}

// ─────────────────────────────────────────────────────────────────
// WebSocket Handler
// ─────────────────────────────────────────────────────────────────

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;

/// WebSocket upgrade handler
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Outgoing message type for WebSocket
enum OutgoingMessage {
    Text(String),
    Pong(Vec<u8>),
}

/// Messages a newly connected client receives before live updates
async fn initial_messages(state: &ApiState) -> Vec<WsMessage> {
    let mut messages = vec![WsMessage::Prices(state.history.latest().await)];
    messages.extend(
        state
            .memory
            .get_predictions()
            .await
            .into_iter()
            .map(WsMessage::Trend),
    );
    messages
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: ApiState) {
    use futures_util::{SinkExt, StreamExt};

    // Subscribe before the snapshot so nothing published in between is lost
    let mut rx = state.broadcaster.subscribe();
    tracing::info!(
        subscribers = state.broadcaster.subscriber_count(),
        "🖥️ New WebSocket connection"
    );

    let (mut sender, mut receiver) = socket.split();

    // Send initial state
    for msg in initial_messages(&state).await {
        let Ok(json) = serde_json::to_string(&msg) else {
            continue;
        };
        if sender.send(Message::Text(json)).await.is_err() {
            return;
        }
    }

    // Channel for outgoing messages
    let (out_tx, mut out_rx) = tokio::sync::mpsc::channel::<OutgoingMessage>(32);

    // Spawn task to send outgoing messages
    let send_task = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let result = match msg {
                OutgoingMessage::Text(text) => sender.send(Message::Text(text)).await,
                OutgoingMessage::Pong(data) => sender.send(Message::Pong(data)).await,
            };
            if result.is_err() {
                break;
            }
        }
    });

    // Handle incoming messages (ping/pong) and broadcast updates
    loop {
        tokio::select! {
            // Broadcast updates
            broadcast_msg = rx.recv() => {
                match broadcast_msg {
                    Ok(msg) => {
                        if out_tx.send(OutgoingMessage::Text(msg)).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "WebSocket client lagging, skipped updates");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Incoming messages
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Ping(data))) => {
                        if out_tx.send(OutgoingMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received WebSocket message: {}", text);
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    send_task.abort();
    tracing::info!("🖥️ WebSocket connection closed");
}

//! WebSocket handlers with backpressure support.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures_util::stream::SplitStream;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::interval;
use tracing::{debug, info, warn};

use tgrab_models::{DownloadEvent, DownloadId, JobState};

use crate::metrics;
use crate::state::AppState;

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Configuration for WebSocket backpressure.
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Idle cutoff; two unanswered pings in a row means the client is gone.
const WS_CLIENT_TIMEOUT: Duration = Duration::from_secs(60);

/// Send a WebSocket message with backpressure handling.
async fn send_ws_message(tx: &mpsc::Sender<Message>, event: &DownloadEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(_) => return false,
    };
    // Use try_send for non-blocking, fall back to blocking send
    match tx.try_send(Message::Text(json.clone())) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            // Channel full - apply backpressure by blocking
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(Message::Text(json)).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Per-job event stream endpoint.
pub async fn ws_download(
    ws: WebSocketUpgrade,
    Path(download_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    // Track connection
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("download");

    ws.on_upgrade(move |socket| async move {
        handle_download_socket(socket, state, DownloadId::from(download_id)).await;
        // Decrement on disconnect
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

/// Fleet-wide event stream endpoint.
pub async fn ws_all(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection("all");

    ws.on_upgrade(move |socket| async move {
        handle_wildcard_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

/// Handle one per-job subscription.
async fn handle_download_socket(socket: WebSocket, state: AppState, id: DownloadId) {
    // Subscribe before checking job state so nothing published in between
    // can be missed.
    let events = state.registry.subscribe(&id).await;

    let (ws_sender, receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    // Spawn a task to handle sending messages with backpressure
    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    info!(job_id = %id, "WebSocket subscribed");

    // A client reconnecting after the job finished would otherwise wait
    // forever; synthesize the terminal event from registry state.
    if let Some(event) = terminal_event_for(&state, &id).await {
        metrics::record_ws_message_sent("download", event.event_type().as_str());
        send_ws_message(&tx, &event).await;
        drop(tx);
        let _ = send_task.await;
        return;
    }

    pump_events(events, receiver, tx, "download", true).await;
    let _ = send_task.await;
}

/// Handle one wildcard subscription over every job's events.
async fn handle_wildcard_socket(socket: WebSocket, state: AppState) {
    let events = state.registry.subscribe_all().await;

    let (ws_sender, receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);

    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    info!("WebSocket subscribed to all jobs");

    // one job's terminal event must not end the fleet view
    pump_events(events, receiver, tx, "all", false).await;
    let _ = send_task.await;
}

/// Forward broadcast events to the socket until the stream ends, the client
/// leaves, or (for per-job subscriptions) the terminal event is delivered.
async fn pump_events(
    mut events: broadcast::Receiver<DownloadEvent>,
    mut receiver: SplitStream<WebSocket>,
    tx: mpsc::Sender<Message>,
    endpoint: &'static str,
    stop_on_terminal: bool,
) {
    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            // Broadcast event from the registry
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        last_activity = Instant::now();
                        metrics::record_ws_message_sent(endpoint, event.event_type().as_str());

                        let terminal = event.is_terminal();
                        if !send_ws_message(&tx, &event).await {
                            warn!(endpoint, "WebSocket send failed, client disconnected");
                            break;
                        }
                        if stop_on_terminal && terminal {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(endpoint, skipped, "WebSocket subscriber lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // Heartbeat to keep connection alive
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_CLIENT_TIMEOUT {
                    info!(endpoint, "WebSocket idle timeout");
                    break;
                }
                // Send ping if no recent activity
                if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2 {
                    if tx.send(Message::Ping(vec![])).await.is_err() {
                        warn!(endpoint, "Heartbeat failed, client disconnected");
                        break;
                    }
                }
            }
            // Client message (for pong responses)
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!(endpoint, "Client closed connection");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Synthesized terminal event for an already-finished job, if any.
async fn terminal_event_for(state: &AppState, id: &DownloadId) -> Option<DownloadEvent> {
    let job = state.registry.snapshot(id).await?;
    match job.state {
        JobState::Completed => Some(DownloadEvent::complete(id.clone(), job.files)),
        JobState::Failed => Some(DownloadEvent::error(
            id.clone(),
            job.error_message
                .unwrap_or_else(|| "Download failed".to_string()),
        )),
        _ => None,
    }
}

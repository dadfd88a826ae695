//! Streaming session: handshake, then publish on a fixed tick

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use tokio::time::{interval, MissedTickBehavior};

use crate::protocol::Handshake;
use crate::state::AppState;

/// Text sent when the handshake names a model we have no profile for
pub const UNKNOWN_MODEL: &str = "Unknown Model";

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// Drive one client connection to completion
pub async fn run_session(mut socket: WebSocket, state: AppState) {
    let Some(first) = first_message(&mut socket, &state).await else {
        return;
    };

    let handshake = match Handshake::parse(&first) {
        Ok(handshake) => handshake,
        Err(e) => {
            tracing::warn!(
                error = %e,
                payload = %hex::encode(&first),
                "Rejected handshake"
            );
            let close = Message::Close(Some(CloseFrame {
                code: close_code::POLICY,
                reason: e.close_reason().into(),
            }));
            let _ = socket.send(close).await;
            return;
        }
    };

    let Some(profile) = state.profiles().get_by_model_id(handshake.model_id) else {
        tracing::warn!(model_id = format!("0x{:X}", handshake.model_id), "Unknown model");
        let _ = socket.send(Message::Text(UNKNOWN_MODEL.into())).await;
        return;
    };

    tracing::info!(
        model_id = format!("0x{:X}", handshake.model_id),
        profile = profile.display_name(),
        "Session started"
    );

    let generation = state.engine().start(profile).await;
    // previous run has stopped; drop its values before publishing
    state.aggregator().clear();

    publish_loop(&mut socket, &state).await;

    state.engine().stop_generation(generation).await;
    tracing::info!(generation, "Session ended");
}

/// Wait for the first data message. None if the client left or stalled.
async fn first_message(socket: &mut WebSocket, state: &AppState) -> Option<Vec<u8>> {
    let timeout = state.session().handshake_timeout;
    let wait = async {
        loop {
            match socket.recv().await? {
                Ok(Message::Binary(data)) => return Some(data.to_vec()),
                Ok(Message::Text(text)) => return Some(text.as_str().as_bytes().to_vec()),
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(Message::Close(_)) => return None,
                Err(e) => {
                    tracing::debug!(error = %e, "Connection error before handshake");
                    return None;
                }
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(first) => first,
        Err(_) => {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Handshake timed out");
            None
        }
    }
}

async fn publish_loop(socket: &mut WebSocket, state: &AppState) {
    let mut ticker = interval(state.session().publish_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Connection error");
                    break;
                }
                Some(Ok(_)) => {}
            },
            _ = ticker.tick() => {
                let aggregator = state.aggregator();
                aggregator.refresh_health(&state.engine().status());

                let update = match aggregator.take_update() {
                    Ok(Some(update)) => update,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize snapshot");
                        continue;
                    }
                };

                if socket.send(Message::Text(update.into())).await.is_err() {
                    tracing::debug!("Send failed, client gone");
                    break;
                }
            }
        }
    }
}

pub mod device;

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use brain_core::types::UserId;
use brain_devices::device::DeviceHandle;
use brain_protocol::Frame;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::user_context::StaticUserContextResolver;
use crate::ws::device::WsDevice;

const OUTBOUND_BUFFER: usize = 256;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    user_id: String,
}

/// Upgrades `GET /ws?user_id=...` to a WebSocket. There is no handshake or
/// auth step — the caller is trusted to supply its own user id, consistent
/// with auth middleware being out of scope for this crate.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let user_id = UserId::from(query.user_id);
    ws.on_upgrade(move |socket| handle_connection(socket, user_id, state))
}

/// Per-connection task: registers a [`WsDevice`] with the shared device
/// registry so the Brain Core's Output Pipeline can reach this socket, then
/// runs inbound percepts and outbound frames concurrently until either side
/// closes.
async fn handle_connection(socket: WebSocket, user_id: UserId, state: Arc<AppState>) {
    let conn_id = Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, user_id = %user_id, "new WS connection");

    let (mut tx, mut rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<Frame>(OUTBOUND_BUFFER);
    let device = Arc::new(WsDevice::new(user_id.clone(), outbound_tx));
    let handle: DeviceHandle = state.devices.register(user_id.clone(), device);

    let ctx = CancellationToken::new();

    loop {
        tokio::select! {
            outgoing = outbound_rx.recv() => {
                let Some(frame) = outgoing else { break };
                let json = serde_json::to_string(&frame).unwrap_or_default();
                if tx.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            incoming = rx.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        let user_ctx = StaticUserContextResolver::context_for(&user_id);
                        let core = state.core.clone();
                        let ctx = ctx.clone();
                        let percept = text.to_string();
                        tokio::spawn(async move {
                            if let Err(e) = core.process(ctx, user_ctx, percept).await {
                                warn!(error = %e, "percept processing failed");
                            }
                        });
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(conn_id = %conn_id, error = %e, "WS read error");
                        break;
                    }
                }
            }
        }
    }

    ctx.cancel();
    state.devices.unregister(&handle);
    info!(conn_id = %conn_id, "WS connection closed");
}

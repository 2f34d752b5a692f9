//! Serial monitor WebSocket route

use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use warp::Filter;
use warp::ws::{Message, WebSocket};

use super::{decode_segment, with_server_state};
use crate::models::{InboundFrame, MonitorQuery, OutboundMessage};
use crate::server::app::ServerState;

/// Lines buffered for a slow browser before the bridge waits on it
const OUTBOUND_BUFFER: usize = 256;

/// WS /ws/serial/{port}?baud=<n>
pub fn create_monitor_routes(
    state: Arc<ServerState>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::path("ws")
        .and(warp::path("serial"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::query::<MonitorQuery>())
        .and(warp::ws())
        .and(with_server_state(state))
        .map(
            |port: String, query: MonitorQuery, ws: warp::ws::Ws, state: Arc<ServerState>| {
                let port = decode_segment(&port);
                let baud_rate = query.baud.unwrap_or(state.config.default_baud_rate);
                ws.on_upgrade(move |socket| websocket_handler(socket, port, baud_rate, state))
            },
        )
}

/// Pump one monitor connection through the serial bridge
async fn websocket_handler(ws: WebSocket, port: String, baud_rate: u32, state: Arc<ServerState>) {
    log::info!("WebSocket monitor connected for {} at {} baud", port, baud_rate);

    let (mut ws_sender, ws_receiver) = ws.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_BUFFER);

    let writer_port = port.clone();
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(e) = ws_sender.send(Message::text(message.to_frame())).await {
                log::debug!("WebSocket send failed for {}: {}", writer_port, e);
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let inbound = ws_receiver.filter_map(|result| async move {
        match result {
            Ok(msg) if msg.is_text() => msg.to_str().ok().map(|text| InboundFrame::Text(text.to_string())),
            Ok(msg) if msg.is_close() => Some(InboundFrame::Close),
            Ok(_) => None,
            Err(e) => {
                log::debug!("WebSocket error: {}", e);
                Some(InboundFrame::Close)
            }
        }
    });

    let exit = state
        .bridge
        .run(&port, baud_rate, inbound, outbound_tx)
        .await;

    if let Err(e) = writer.await {
        log::warn!("WebSocket writer for {} ended abnormally: {}", port, e);
    }
    log::info!("WebSocket monitor for {} closed ({:?})", port, exit);
}

//! WebSocket transport for the control relay.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::debug;

use crate::relay::Relay;

/// Control messages are small JSON objects.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub async fn relay_handler(State(relay): State<Relay>, ws: WebSocketUpgrade) -> Response {
    upgrade(ws, relay)
}

pub fn upgrade(ws: WebSocketUpgrade, relay: Relay) -> Response {
    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, relay))
}

/// Pump messages between one socket and its relay membership until either
/// side goes away.
async fn handle_socket(socket: WebSocket, relay: Relay) {
    let mut conn = relay.connect();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = conn.recv() => match outbound {
                Some(payload) => {
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => conn.publish(text.to_string()),
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => conn.publish(text),
                    Err(_) => debug!("Relay ignored non-UTF-8 binary frame: peer={}", conn.id()),
                },
                // Pings are answered by axum.
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!("Relay socket error: peer={} err={}", conn.id(), e);
                    break;
                }
            },
        }
    }

    conn.close();
}

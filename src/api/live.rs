use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension,
    },
    response::Response,
};
use futures::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::notifications::BOARD_CHANNEL;

/// Fans rendered board snapshots out to connected websocket clients.
#[derive(Clone)]
pub struct BoardHub {
    tx: broadcast::Sender<String>,
}

impl BoardHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Returns how many clients received the snapshot.
    pub fn publish(&self, table: String) -> usize {
        let count = self.tx.send(table).unwrap_or(0);
        debug!("Broadcast board to {} clients", count);
        count
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub async fn board_socket(ws: WebSocketUpgrade, Extension(hub): Extension<BoardHub>) -> Response {
    ws.on_upgrade(move |socket| stream_board(socket, hub))
}

async fn stream_board(mut socket: WebSocket, hub: BoardHub) {
    let mut rx = hub.subscribe();
    info!("Board client connected, total clients: {}", hub.client_count());

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(table) => {
                    if socket.send(Message::Text(table)).await.is_err() {
                        break;
                    }
                }
                // Only the latest snapshot matters
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Board client lagged, skipped {} snapshots", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Board client disconnected");
}

/// Relays [`BOARD_CHANNEL`] into `hub`, resubscribing after any failure.
pub fn start_board_relay(redis_client: redis::Client, hub: BoardHub) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match relay(&redis_client, &hub).await {
                Ok(()) => warn!("Board relay subscription ended"),
                Err(e) => error!("Board relay failed: {}", e),
            }
            tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;
        }
    })
}

async fn relay(redis_client: &redis::Client, hub: &BoardHub) -> redis::RedisResult<()> {
    let mut pubsub = redis_client.get_async_pubsub().await?;
    pubsub.subscribe(BOARD_CHANNEL).await?;
    info!("Subscribed to {}", BOARD_CHANNEL);

    let mut messages = pubsub.on_message();
    while let Some(message) = messages.next().await {
        let table: String = message.get_payload()?;
        hub.publish(table);
    }
    Ok(())
}

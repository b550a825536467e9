/**
 * Event Fan-out Channel Server
 *
 * WebSocket accept loop on the dedicated sync port. Each connection
 * gets one task that multiplexes two directions with `tokio::select!`:
 * inbound JSON frames (`announce-identity`, `subscribe-list`) update
 * the registry, and events queued by the notifier go out as JSON text
 * frames. When the socket closes, for any reason, the connection is
 * removed from the registry before the task exits.
 */

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::backend::registry::{ConnectionId, MembershipRegistry};
use crate::shared::event::{ClientMessage, ServerEvent};

type ChannelResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Accept channel connections forever, one task per connection.
pub async fn run_sync_channel(listener: TcpListener, registry: Arc<MembershipRegistry>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::error!("channel accept failed: {}", e);
                continue;
            }
        };
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, addr, registry).await {
                tracing::debug!("channel connection from {} ended: {}", addr, e);
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<MembershipRegistry>,
) -> ChannelResult<()> {
    let socket = tokio_tungstenite::accept_async(stream).await?;
    let (connection, events) = registry.connect();
    tracing::info!(%connection, %addr, "channel connection established");

    let result = connection_loop(socket, connection, &registry, events).await;

    // Cleanup runs on every exit path, clean close or error.
    registry.disconnect(connection);
    tracing::info!(%connection, "channel connection closed");
    result
}

async fn connection_loop(
    socket: tokio_tungstenite::WebSocketStream<TcpStream>,
    connection: ConnectionId,
    registry: &MembershipRegistry,
    mut events: mpsc::Receiver<ServerEvent>,
) -> ChannelResult<()> {
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_message(connection, registry, text.as_str());
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        sink.send(Message::Pong(payload)).await?;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {
                        // Binary and pong frames are not part of the protocol.
                    }
                    Some(Err(e)) => {
                        tracing::debug!(%connection, "channel read error: {}", e);
                        break;
                    }
                }
            }
            outgoing = events.recv() => {
                match outgoing {
                    Some(event) => {
                        let frame = event.encode()?;
                        sink.send(Message::text(frame)).await?;
                    }
                    // Sender side gone; nothing left to deliver.
                    None => break,
                }
            }
        }
    }

    Ok(())
}

fn handle_client_message(connection: ConnectionId, registry: &MembershipRegistry, raw: &str) {
    match ClientMessage::decode(raw) {
        Ok(ClientMessage::AnnounceIdentity { user_id }) => {
            if registry.announce(connection, user_id) {
                tracing::info!(%connection, %user_id, "identity announced");
            } else {
                tracing::warn!(%connection, "repeat identity announcement ignored");
            }
        }
        Ok(ClientMessage::SubscribeList { list_id }) => {
            registry.subscribe(connection, list_id);
            tracing::info!(%connection, %list_id, "subscribed to list");
        }
        Err(e) => {
            // Malformed frames are logged and skipped, never fatal.
            tracing::warn!(%connection, "unparseable channel message: {}", e);
        }
    }
}

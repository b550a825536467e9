/**
 * Client Sync Controller
 *
 * Owns the client's side of the event fan-out channel. The controller
 * runs a background task with an explicit connection state machine:
 *
 *   Disconnected -> Connecting -> Authenticated -> Subscribed
 *
 * On every (re)connect it announces the user identity and re-subscribes
 * from scratch to the full desired list set; connections are ephemeral
 * and the server remembers nothing across them. Connection failures
 * back off exponentially (doubling from 500ms, capped at 30s) and the
 * backoff resets after a successful connect.
 *
 * Consumers drain `SyncSignal`s: `Refresh` means re-fetch list state
 * (each one carries a monotonically increasing sync generation so
 * stale refreshes are detectable), `RandomItemDrawn` is display-only
 * and mutates nothing. Events that arrive while disconnected are
 * simply missed; the reconnect refresh catches the client up.
 */

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::shared::event::{ClientMessage, ServerEvent};

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures_util::stream::SplitSink<WsStream, Message>;

const SIGNAL_BUFFER: usize = 256;
const COMMAND_BUFFER: usize = 32;

/// Connection lifecycle of the sync controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    /// Connected and identity announced
    Authenticated,
    /// All desired subscriptions re-announced
    Subscribed,
}

/// Signals surfaced to the controller's consumer
#[derive(Debug, Clone, PartialEq)]
pub enum SyncSignal {
    StateChanged(ConnectionState),
    /// A subscribed list changed; re-fetch it. `generation` increases
    /// with every refresh so consumers can discard stale ones.
    Refresh { list_id: Uuid, generation: u64 },
    /// Ephemeral draw result, display only.
    RandomItemDrawn {
        item: String,
        user_id: Uuid,
        list_id: Uuid,
    },
}

#[derive(Debug)]
enum Command {
    Subscribe(Uuid),
    Shutdown,
}

/// Tunable reconnection behavior
#[derive(Debug, Clone)]
pub struct SyncControllerConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for SyncControllerConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// Client-side controller for the event fan-out channel
pub struct SyncController {
    url: String,
    user_id: Uuid,
    config: SyncControllerConfig,
    state: Arc<RwLock<ConnectionState>>,
    generation: Arc<AtomicU64>,
    subscriptions: Arc<RwLock<HashSet<Uuid>>>,
    signal_tx: mpsc::Sender<SyncSignal>,
    signal_rx: Option<mpsc::Receiver<SyncSignal>>,
    command_tx: mpsc::Sender<Command>,
    command_rx: Option<mpsc::Receiver<Command>>,
    task: Option<JoinHandle<()>>,
}

impl SyncController {
    /// Create a controller for `user_id` against a `ws://host:port` URL.
    pub fn new(url: impl Into<String>, user_id: Uuid) -> Self {
        Self::with_config(url, user_id, SyncControllerConfig::default())
    }

    pub fn with_config(
        url: impl Into<String>,
        user_id: Uuid,
        config: SyncControllerConfig,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::channel(SIGNAL_BUFFER);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        Self {
            url: url.into(),
            user_id,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            generation: Arc::new(AtomicU64::new(0)),
            subscriptions: Arc::new(RwLock::new(HashSet::new())),
            signal_tx,
            signal_rx: Some(signal_rx),
            command_tx,
            command_rx: Some(command_rx),
            task: None,
        }
    }

    /// Take the signal receiver. Callable once.
    pub fn take_signal_rx(&mut self) -> Option<mpsc::Receiver<SyncSignal>> {
        self.signal_rx.take()
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Current sync generation (number of refreshes observed).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Register interest in a list. Takes effect immediately when
    /// connected; otherwise it is announced on the next connect.
    pub async fn subscribe(&self, list_id: Uuid) {
        self.subscriptions.write().await.insert(list_id);
        let _ = self.command_tx.send(Command::Subscribe(list_id)).await;
    }

    /// Spawn the background connection task.
    pub fn start(&mut self) -> Result<(), String> {
        let command_rx = self
            .command_rx
            .take()
            .ok_or_else(|| "sync controller already started".to_string())?;

        let runner = Runner {
            url: self.url.clone(),
            user_id: self.user_id,
            config: self.config.clone(),
            state: self.state.clone(),
            generation: self.generation.clone(),
            subscriptions: self.subscriptions.clone(),
            signals: self.signal_tx.clone(),
        };
        self.task = Some(tokio::spawn(runner.run(command_rx)));
        Ok(())
    }

    /// Close the channel deterministically and wait for the task to
    /// finish, so the server registry cleans up promptly.
    pub async fn shutdown(&mut self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
        // If the consumer never claimed the signal receiver, drop it so
        // pending sends cannot block the task on its way out.
        self.signal_rx.take();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

struct Runner {
    url: String,
    user_id: Uuid,
    config: SyncControllerConfig,
    state: Arc<RwLock<ConnectionState>>,
    generation: Arc<AtomicU64>,
    subscriptions: Arc<RwLock<HashSet<Uuid>>>,
    signals: mpsc::Sender<SyncSignal>,
}

enum Wait {
    Reconnect,
    Shutdown,
}

impl Runner {
    async fn run(self, mut commands: mpsc::Receiver<Command>) {
        let mut backoff = self.config.initial_backoff;
        loop {
            self.set_state(ConnectionState::Connecting).await;

            let socket = match tokio_tungstenite::connect_async(&self.url).await {
                Ok((socket, _)) => socket,
                Err(e) => {
                    tracing::warn!("sync channel connect failed: {}", e);
                    self.set_state(ConnectionState::Disconnected).await;
                    match self.wait_backoff(backoff, &mut commands).await {
                        Wait::Reconnect => {
                            backoff = (backoff * 2).min(self.config.max_backoff);
                            continue;
                        }
                        Wait::Shutdown => return,
                    }
                }
            };

            backoff = self.config.initial_backoff;
            match self.drive_connection(socket, &mut commands).await {
                Wait::Shutdown => {
                    self.set_state(ConnectionState::Disconnected).await;
                    return;
                }
                Wait::Reconnect => {
                    self.set_state(ConnectionState::Disconnected).await;
                    match self.wait_backoff(backoff, &mut commands).await {
                        Wait::Reconnect => {
                            backoff = (backoff * 2).min(self.config.max_backoff);
                        }
                        Wait::Shutdown => return,
                    }
                }
            }
        }
    }

    /// One established connection, from handshake to close.
    async fn drive_connection(
        &self,
        socket: WsStream,
        commands: &mut mpsc::Receiver<Command>,
    ) -> Wait {
        let (mut sink, mut source) = socket.split();

        let announce = ClientMessage::AnnounceIdentity {
            user_id: self.user_id,
        };
        if send_message(&mut sink, &announce).await.is_err() {
            return Wait::Reconnect;
        }
        self.set_state(ConnectionState::Authenticated).await;

        // Re-subscribe from scratch; the server kept nothing.
        let desired: Vec<Uuid> = self.subscriptions.read().await.iter().copied().collect();
        for list_id in desired {
            let subscribe = ClientMessage::SubscribeList { list_id };
            if send_message(&mut sink, &subscribe).await.is_err() {
                return Wait::Reconnect;
            }
        }
        self.set_state(ConnectionState::Subscribed).await;

        loop {
            tokio::select! {
                incoming = source.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_event(text.as_str()).await;
                        }
                        Some(Ok(Message::Close(_))) | None => return Wait::Reconnect,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!("sync channel read error: {}", e);
                            return Wait::Reconnect;
                        }
                    }
                }
                command = commands.recv() => {
                    match command {
                        Some(Command::Subscribe(list_id)) => {
                            self.subscriptions.write().await.insert(list_id);
                            let subscribe = ClientMessage::SubscribeList { list_id };
                            if send_message(&mut sink, &subscribe).await.is_err() {
                                return Wait::Reconnect;
                            }
                        }
                        Some(Command::Shutdown) | None => {
                            let _ = sink.send(Message::Close(None)).await;
                            return Wait::Shutdown;
                        }
                    }
                }
            }
        }
    }

    async fn handle_event(&self, raw: &str) {
        match ServerEvent::decode(raw) {
            Ok(ServerEvent::ListUpdated { id }) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::debug!(list_id = %id, generation, "list updated, refreshing");
                let _ = self
                    .signals
                    .send(SyncSignal::Refresh {
                        list_id: id,
                        generation,
                    })
                    .await;
            }
            Ok(ServerEvent::RandomItem {
                item,
                user_id,
                collab_list_id,
            }) => {
                let _ = self
                    .signals
                    .send(SyncSignal::RandomItemDrawn {
                        item,
                        user_id,
                        list_id: collab_list_id,
                    })
                    .await;
            }
            Err(e) => {
                tracing::warn!("unparseable sync event: {}", e);
            }
        }
    }

    /// Sleep out the backoff while staying responsive to commands.
    async fn wait_backoff(&self, backoff: Duration, commands: &mut mpsc::Receiver<Command>) -> Wait {
        tracing::debug!("reconnecting in {:?}", backoff);
        let deadline = tokio::time::Instant::now() + backoff;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return Wait::Reconnect,
                command = commands.recv() => {
                    match command {
                        Some(Command::Subscribe(list_id)) => {
                            self.subscriptions.write().await.insert(list_id);
                        }
                        Some(Command::Shutdown) | None => return Wait::Shutdown,
                    }
                }
            }
        }
    }

    async fn set_state(&self, next: ConnectionState) {
        {
            let mut state = self.state.write().await;
            if *state == next {
                return;
            }
            *state = next;
        }
        let _ = self.signals.send(SyncSignal::StateChanged(next)).await;
    }
}

async fn send_message(sink: &mut WsSink, message: &ClientMessage) -> Result<(), ()> {
    let frame = match message.encode() {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("failed to encode channel message: {}", e);
            return Err(());
        }
    };
    sink.send(Message::text(frame)).await.map_err(|e| {
        tracing::warn!("sync channel write failed: {}", e);
    })
}

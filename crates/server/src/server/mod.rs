//! Game server implementation.

use crate::config::Config;
use crate::economy::{DepositVerifier, FixedPrice, MemoryLedger, MemoryVerifier, PriceCache};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use protocol::packets::{self, RoundEvent, WorldBounds};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub mod client;
pub mod game;

pub use game::{run_game_loop, GameState, PendingBroadcasts};

/// A message to be sent to a specific client.
#[derive(Debug, Clone)]
pub struct TargetedMessage {
    /// Target client ID.
    pub client_id: u32,
    /// Message type.
    pub message: TargetedMessageType,
}

/// Types of targeted messages.
#[derive(Debug, Clone, PartialEq)]
pub enum TargetedMessageType {
    Welcome {
        player_id: u32,
        tick_rate: u16,
        snapshot_rate: u16,
        mode: u8,
        bounds: WorldBounds,
    },
    /// Sent to a human player on death.
    Eliminated { coins: u32, kills: u32 },
    Rejected { reason: String },
    ArenaFull { max_players: u16 },
    Balance { amount: f64 },
    CashedOut { payout: f64, fee: f64 },
    DepositResult { valid: bool, amount: f64, reason: String },
}

impl TargetedMessageType {
    /// Encode to a wire packet.
    pub fn encode(&self) -> Bytes {
        let w = match self {
            Self::Welcome {
                player_id,
                tick_rate,
                snapshot_rate,
                mode,
                bounds,
            } => packets::build_welcome(*player_id, *tick_rate, *snapshot_rate, *mode, bounds),
            Self::Eliminated { coins, kills } => packets::build_eliminated(*coins, *kills),
            Self::Rejected { reason } => packets::build_rejected(reason),
            Self::ArenaFull { max_players } => packets::build_arena_full(*max_players),
            Self::Balance { amount } => packets::build_balance(*amount),
            Self::CashedOut { payout, fee } => packets::build_cashed_out(*payout, *fee),
            Self::DepositResult {
                valid,
                amount,
                reason,
            } => packets::build_deposit_result(*valid, *amount, reason),
        };
        w.finish()
    }
}

/// Connection tracking state (shared across connection handlers).
struct ConnectionState {
    /// Number of connections per IP address.
    ip_connections: HashMap<IpAddr, usize>,
    /// Total number of connections.
    total_connections: usize,
}

impl ConnectionState {
    fn new() -> Self {
        Self {
            ip_connections: HashMap::new(),
            total_connections: 0,
        }
    }

    /// Try to add a connection, returns true if allowed.
    fn try_add_connection(&mut self, ip: IpAddr, max_total: usize, max_per_ip: usize) -> bool {
        if self.total_connections >= max_total {
            return false;
        }

        let current = self.ip_connections.get(&ip).copied().unwrap_or(0);
        if current >= max_per_ip {
            return false;
        }

        *self.ip_connections.entry(ip).or_insert(0) += 1;
        self.total_connections += 1;
        true
    }

    /// Remove a connection.
    fn remove_connection(&mut self, ip: IpAddr) {
        if let Some(count) = self.ip_connections.get_mut(&ip) {
            if *count > 0 {
                *count -= 1;
                self.total_connections = self.total_connections.saturating_sub(1);
            }
            if *count == 0 {
                self.ip_connections.remove(&ip);
            }
        }
    }
}

/// Run the game server.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = TcpListener::bind(&addr).await?;
    info!("{} listening on ws://{} ({:?} mode)", config.server.name, addr, config.server.mode);

    let conn_state = Arc::new(RwLock::new(ConnectionState::new()));

    // Snapshots are encoded once per broadcast; events and targeted messages per connection.
    let (snapshot_tx, _snapshot_rx) = broadcast::channel::<Bytes>(8);
    let (event_tx, _event_rx) = broadcast::channel::<RoundEvent>(64);
    let (targeted_tx, _targeted_rx) = broadcast::channel::<TargetedMessage>(256);

    let economy = &config.economy;
    let ledger = Arc::new(MemoryLedger::new());
    let prices = PriceCache::new(
        Arc::new(FixedPrice(economy.fallback_price)),
        Duration::from_millis(economy.price_cache_ms),
        economy.fallback_price,
    );
    let deposits = DepositVerifier::new(Arc::new(MemoryVerifier::new()), ledger.clone(), prices, economy);

    let game_state = Arc::new(RwLock::new(
        GameState::new(&config, ledger, snapshot_tx.clone(), event_tx.clone(), targeted_tx.clone())
            .with_deposits(Arc::new(deposits)),
    ));

    let game_loop_state = Arc::clone(&game_state);
    let tick_interval = Duration::from_secs_f64(1.0 / config.server.tick_rate.max(1) as f64);
    tokio::spawn(async move {
        game::run_game_loop(game_loop_state, tick_interval).await;
    });

    let max_connections = config.server.max_connections;
    let ip_limit = config.server.ip_limit;
    let idle_timeout = Duration::from_secs(config.server.idle_timeout_secs.max(1));

    loop {
        let (stream, addr) = listener.accept().await?;
        let ip = addr.ip();

        {
            let mut state = conn_state.write().await;
            if !state.try_add_connection(ip, max_connections, ip_limit) {
                warn!("Connection rejected (limit reached): {}", addr);
                continue;
            }
        }

        let game_state = Arc::clone(&game_state);
        let conn_state = Arc::clone(&conn_state);
        let channels = Channels {
            snapshots: snapshot_tx.subscribe(),
            events: event_tx.subscribe(),
            targeted: targeted_tx.subscribe(),
        };

        tokio::spawn(async move {
            let result = handle_connection(stream, addr, game_state, channels, idle_timeout).await;

            // Always remove from connection tracking when done
            {
                let mut state = conn_state.write().await;
                state.remove_connection(addr.ip());
            }

            if let Err(e) = result {
                error!("Connection error from {}: {}", addr, e);
            }
        });
    }
}

/// Broadcast receivers owned by one connection.
struct Channels {
    snapshots: broadcast::Receiver<Bytes>,
    events: broadcast::Receiver<RoundEvent>,
    targeted: broadcast::Receiver<TargetedMessage>,
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    game_state: Arc<RwLock<GameState>>,
    mut channels: Channels,
    idle_timeout: Duration,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New connection from {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let client_id = {
        let mut state = game_state.write().await;
        state.add_client(addr)
    };

    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        idle.as_mut().reset(Instant::now() + idle_timeout);
                        let mut state = game_state.write().await;
                        if let Err(e) = state.handle_packet(client_id, &data) {
                            warn!("Packet error from {}: {}", addr, e);
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("Client {} disconnected", addr);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error from {}: {}", addr, e);
                        break;
                    }
                    None => {
                        break;
                    }
                    _ => {}
                }
            }
            _ = &mut idle => {
                info!("Client {} idle for {:?}, closing", addr, idle_timeout);
                break;
            }
            snapshot = channels.snapshots.recv() => {
                match snapshot {
                    Ok(data) => {
                        if let Err(e) = write.send(Message::Binary(data)).await {
                            warn!("Failed to send snapshot to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => debug!("Client {} skipped {} snapshots", addr, n),
                    Err(RecvError::Closed) => break,
                }
            }
            event = channels.events.recv() => {
                match event {
                    Ok(event) => {
                        let packet = packets::build_round_event(&event);
                        if let Err(e) = write.send(Message::Binary(packet.finish())).await {
                            warn!("Failed to send round event to {}: {}", addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => debug!("Client {} skipped {} round events", addr, n),
                    Err(RecvError::Closed) => break,
                }
            }
            targeted = channels.targeted.recv() => {
                match targeted {
                    Ok(msg) => {
                        // Only process messages for this client
                        if msg.client_id != client_id {
                            continue;
                        }
                        if let Err(e) = write.send(Message::Binary(msg.message.encode())).await {
                            warn!("Failed to send {:?} to {}: {}", msg.message, addr, e);
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => warn!("Client {} missed {} targeted messages", addr, n),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    {
        let mut state = game_state.write().await;
        state.remove_client(client_id);
    }

    Ok(())
}

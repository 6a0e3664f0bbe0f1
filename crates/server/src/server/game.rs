//! Game state and main loop.

use crate::ai::BotManager;
use crate::config::Config;
use crate::economy::{calculate_cashout, DepositVerifier, Ledger};
use crate::entity::{ControlledBy, LifeState, Player};
use crate::error::JoinError;
use crate::gamemodes::{get_gamemode, GameMode};
use crate::snapshot;
use crate::systems::{combat, dash, input, movement, passive, projectile};
use crate::world::{ColorCycle, World};
use bytes::Bytes;
use futures_util::FutureExt;
use protocol::packets::{self, ClientPacket, InputPayload, RoundEvent};
use rand::Rng;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::client::Client;
use super::{TargetedMessage, TargetedMessageType};

/// Pending broadcasts to send after releasing the game state lock.
#[derive(Debug, Default)]
pub struct PendingBroadcasts {
    /// Encoded snapshot, on snapshot ticks only.
    pub snapshot: Option<Bytes>,
    pub round_events: Vec<RoundEvent>,
    pub targeted: Vec<TargetedMessage>,
}

/// Main game state.
pub struct GameState {
    pub config: Config,

    next_client_id: u32,

    // Connected clients
    pub clients: HashMap<u32, Client>,

    pub world: World,

    pub bots: BotManager,

    colors: ColorCycle,

    pub gamemode: Box<dyn GameMode>,

    ledger: Arc<dyn Ledger>,
    deposits: Option<Arc<DepositVerifier>>,

    snapshot_tx: broadcast::Sender<Bytes>,
    event_tx: broadcast::Sender<RoundEvent>,
    targeted_tx: broadcast::Sender<TargetedMessage>,

    // Average tick duration in milliseconds (exponential moving average).
    update_time_avg: f64,
}

impl GameState {
    /// Create a new game state.
    pub fn new(
        config: &Config,
        ledger: Arc<dyn Ledger>,
        snapshot_tx: broadcast::Sender<Bytes>,
        event_tx: broadcast::Sender<RoundEvent>,
        targeted_tx: broadcast::Sender<TargetedMessage>,
    ) -> Self {
        let gamemode = get_gamemode(config.server.mode);
        let world = World::new(&config.world, gamemode.containment(config));

        Self {
            config: config.clone(),
            next_client_id: 1,
            clients: HashMap::new(),
            world,
            bots: BotManager::new(),
            colors: ColorCycle::default(),
            gamemode,
            ledger,
            deposits: None,
            snapshot_tx,
            event_tx,
            targeted_tx,
            update_time_avg: 0.0,
        }
    }

    /// Attach the deposit verifier used for `VerifyDeposit` requests.
    pub fn with_deposits(mut self, deposits: Arc<DepositVerifier>) -> Self {
        self.deposits = Some(deposits);
        self
    }

    /// Add a new client.
    pub fn add_client(&mut self, addr: SocketAddr) -> u32 {
        let id = self.next_client_id;
        self.next_client_id += 1;
        let client = Client::new(id, addr, self.config.server.max_input_rate_per_second);
        self.clients.insert(id, client);
        info!("Client {} connected from {}", id, addr);
        id
    }

    /// Remove a client along with its player and boomerangs.
    pub fn remove_client(&mut self, id: u32) {
        let Some(client) = self.clients.remove(&id) else { return };
        info!("Client {} ({}) disconnected", id, client.addr);
        if let Some(player_id) = client.player_id {
            self.world.remove_player(player_id);
            self.sync_bots();
        }
    }

    /// Bring the bot population in line with the connected humans.
    pub fn sync_bots(&mut self) {
        self.bots
            .sync(&mut self.world, &self.config, self.gamemode.as_ref(), &mut self.colors);
    }

    fn send_to(&self, client_id: u32, message: TargetedMessageType) {
        let _ = self.targeted_tx.send(TargetedMessage { client_id, message });
    }

    fn reject(&self, client_id: u32, err: &JoinError) {
        debug!("Client {} request refused: {}", client_id, err);
        let message = match err {
            JoinError::ArenaFull { max } => TargetedMessageType::ArenaFull {
                max_players: (*max).min(u16::MAX as usize) as u16,
            },
            other => TargetedMessageType::Rejected {
                reason: other.to_string(),
            },
        };
        self.send_to(client_id, message);
    }

    /// Handle a packet from a client.
    pub fn handle_packet(&mut self, client_id: u32, data: &[u8]) -> anyhow::Result<()> {
        if !self.clients.contains_key(&client_id) {
            anyhow::bail!("Client not found");
        }

        let packet = ClientPacket::parse(data)?;
        if !matches!(packet, ClientPacket::Input(_)) {
            debug!("Client {} sent {:?}", client_id, packet);
        }

        let result = match packet {
            ClientPacket::Join { name, user_id } => self.handle_join(client_id, &name, user_id),
            ClientPacket::Input(payload) => {
                self.handle_input(client_id, &payload);
                Ok(())
            }
            ClientPacket::Cashout => self.handle_cashout(client_id),
            ClientPacket::VerifyDeposit { signature } => self.handle_verify_deposit(client_id, signature),
            ClientPacket::BalanceRequest => self.handle_balance(client_id),
        };
        if let Err(e) = result {
            self.reject(client_id, &e);
        }

        Ok(())
    }

    /// Handle join request.
    fn handle_join(&mut self, client_id: u32, name: &str, user_id: Option<String>) -> Result<(), JoinError> {
        let client = self.clients.get_mut(&client_id).ok_or(JoinError::NotConnected)?;
        if user_id.is_some() {
            client.user_id = user_id;
        }

        if let Some(player_id) = client.player_id {
            let keeps_dead = !self.gamemode.removes_dead();
            if self
                .world
                .player(player_id)
                .is_some_and(|p| p.is_alive() || keeps_dead)
            {
                return Err(JoinError::AlreadyJoined);
            }
            // A dead body still lingering is replaced by the new one.
            self.world.remove_player(player_id);
            client.player_id = None;
        }

        let max = self.config.server.max_players_per_arena;
        if self.world.human_count() >= max {
            warn!("Client {} join refused: arena full ({} players)", client_id, max);
            return Err(JoinError::ArenaFull { max });
        }

        let user_id = client.user_id.clone();
        let fee = self.config.economy.entry_fee;
        let paid = match &user_id {
            Some(user) if fee > 0.0 => {
                self.ledger.debit(user, fee)?;
                fee
            }
            _ => 0.0,
        };

        let name = sanitize_name(name, self.config.player.max_name_length);
        let position = self.gamemode.spawn_position(&self.world, &self.config);
        let player_id = self.world.next_id();
        let mut player = Player::new(
            player_id,
            name.clone(),
            self.colors.next_color(),
            ControlledBy::Human,
            position,
            &self.config,
            self.world.now,
        );
        player.user_id = user_id;
        player.entry_fee_paid = paid;
        if !self.gamemode.joins_alive() {
            player.life = LifeState::Dead { died_at: self.world.now };
        }
        self.world.add_player(player);

        if let Some(client) = self.clients.get_mut(&client_id) {
            client.player_id = Some(player_id);
        }
        info!("Client {} joined as '{}' (player {}, fee {:.2})", client_id, name, player_id, paid);

        self.send_to(
            client_id,
            TargetedMessageType::Welcome {
                player_id,
                tick_rate: self.config.server.tick_rate.min(u16::MAX as u32) as u16,
                snapshot_rate: self.config.server.snapshot_rate.min(u16::MAX as u32) as u16,
                mode: self.gamemode.id(),
                bounds: self.world.border.bounds(),
            },
        );

        self.sync_bots();
        Ok(())
    }

    fn handle_input(&mut self, client_id: u32, payload: &InputPayload) {
        let Some(client) = self.clients.get_mut(&client_id) else { return };
        let Some(player_id) = client.player_id else { return };
        if !client.inputs.allow(std::time::Instant::now()) {
            trace!("Client {} input dropped (rate limit)", client_id);
            return;
        }
        let now = self.world.now;
        if let Some(player) = self.world.player_mut(player_id) {
            input::apply(player, payload, now);
        }
    }

    /// Remove the player and pay out its coins minus the house fee.
    fn handle_cashout(&mut self, client_id: u32) -> Result<(), JoinError> {
        let client = self.clients.get_mut(&client_id).ok_or(JoinError::NotConnected)?;
        let player_id = client
            .player_id
            .filter(|id| self.world.player(*id).is_some_and(|p| p.is_alive()))
            .ok_or(JoinError::NotInArena)?;
        let user_id = client.user_id.clone().ok_or(JoinError::NoAccount)?;
        client.player_id = None;

        let Some(player) = self.world.remove_player(player_id) else {
            return Err(JoinError::NotInArena);
        };
        let amount = player.coins as f64 * self.config.economy.coin_value;
        let cashout = calculate_cashout(amount, self.config.economy.house_fee);
        self.ledger.credit(&user_id, cashout.payout);
        info!(
            "Client {} cashed out {} coins: {:.2} paid, {:.2} fee",
            client_id, player.coins, cashout.payout, cashout.fee
        );

        self.send_to(
            client_id,
            TargetedMessageType::CashedOut {
                payout: cashout.payout,
                fee: cashout.fee,
            },
        );
        self.sync_bots();
        Ok(())
    }

    fn handle_balance(&mut self, client_id: u32) -> Result<(), JoinError> {
        let client = self.clients.get(&client_id).ok_or(JoinError::NotConnected)?;
        let user_id = client.user_id.as_deref().ok_or(JoinError::NoAccount)?;
        let amount = self.ledger.balance(user_id);
        self.send_to(client_id, TargetedMessageType::Balance { amount });
        Ok(())
    }

    /// Start verification on its own task; the result arrives as a
    /// targeted message once the lookup settles.
    fn handle_verify_deposit(&mut self, client_id: u32, signature: String) -> Result<(), JoinError> {
        let client = self.clients.get(&client_id).ok_or(JoinError::NotConnected)?;
        let user_id = client.user_id.clone().ok_or(JoinError::NoAccount)?;
        let Some(deposits) = self.deposits.clone() else {
            self.send_to(
                client_id,
                TargetedMessageType::DepositResult {
                    valid: false,
                    amount: 0.0,
                    reason: "Deposits are not available".to_string(),
                },
            );
            return Ok(());
        };

        let tx = self.targeted_tx.clone();
        tokio::spawn(async move {
            let outcome = deposits.verify_deposit(&user_id, &signature).await;
            let _ = tx.send(TargetedMessage {
                client_id,
                message: TargetedMessageType::DepositResult {
                    valid: outcome.valid,
                    amount: outcome.amount,
                    reason: outcome.reason,
                },
            });
        });
        Ok(())
    }

    /// Run a single game tick and return pending broadcasts.
    pub fn tick(&mut self) -> PendingBroadcasts {
        let tick_start = std::time::Instant::now();
        let dt = self.config.dt();
        self.world.advance(dt as f64 * 1000.0);

        let ai_start = std::time::Instant::now();
        self.bots
            .update(&mut self.world, &self.config, self.gamemode.as_ref());
        let ai_time = ai_start.elapsed();

        let movement_start = std::time::Instant::now();
        dash::resolve(&mut self.world, &self.config.dash);
        movement::update(&mut self.world, &self.config, self.gamemode.crowd_separation());
        let movement_time = movement_start.elapsed();

        let projectile_start = std::time::Instant::now();
        projectile::throw(&mut self.world, &self.config, self.gamemode.as_ref());
        projectile::update_flight(&mut self.world, &self.config.boomerang, dt);
        let projectile_time = projectile_start.elapsed();

        let combat_start = std::time::Instant::now();
        combat::resolve(&mut self.world, &self.config);
        let targeted = self.drain_deaths();
        if self.gamemode.removes_dead() {
            let reaped = combat::reap_dead(&mut self.world, self.config.player.death_linger_ms);
            if !reaped.is_empty() {
                for client in self.clients.values_mut() {
                    if client.player_id.is_some_and(|id| reaped.contains(&id)) {
                        client.player_id = None;
                    }
                }
                self.sync_bots();
            }
        }
        let combat_time = combat_start.elapsed();

        let passive_start = std::time::Instant::now();
        passive::regenerate(&mut self.world, &self.config);
        passive::collect_coins(&mut self.world, &self.config);
        if let Some(lifetime) = self.gamemode.coin_lifetime_ms(&self.config) {
            passive::expire_coins(&mut self.world, lifetime);
        }
        if self.gamemode.food_enabled() {
            passive::eat_food(&mut self.world, &self.config);
            passive::decay_mass(&mut self.world, &self.config);
        }
        self.gamemode.on_tick(&mut self.world, &self.config);
        let passive_time = passive_start.elapsed();

        let round_events = std::mem::take(&mut self.world.round_events);
        let round_events = if self.gamemode.announces_rounds() {
            round_events
        } else {
            Vec::new()
        };

        let snapshot_start = std::time::Instant::now();
        let snapshot = (self.world.tick % self.config.snapshot_every() == 0).then(|| {
            let snap = snapshot::build(&mut self.world, self.gamemode.as_ref(), &self.config);
            packets::build_snapshot(&snap).finish()
        });
        let snapshot_time = snapshot_start.elapsed();

        // Log performance metrics every 400 ticks
        if self.world.tick % 400 == 0 {
            let total_time = tick_start.elapsed();
            debug!(
                "Tick #{}: {:.2}ms total, {:.2}ms avg | bots={:.2}ms move={:.2}ms projectiles={:.2}ms combat={:.2}ms passive={:.2}ms snapshot={:.2}ms | {} players, {} boomerangs, {} coins",
                self.world.tick,
                total_time.as_secs_f64() * 1000.0,
                self.update_time_avg,
                ai_time.as_secs_f64() * 1000.0,
                movement_time.as_secs_f64() * 1000.0,
                projectile_time.as_secs_f64() * 1000.0,
                combat_time.as_secs_f64() * 1000.0,
                passive_time.as_secs_f64() * 1000.0,
                snapshot_time.as_secs_f64() * 1000.0,
                self.world.player_count(),
                self.world.boomerangs.len(),
                self.world.coins.len(),
            );
        }

        PendingBroadcasts {
            snapshot,
            round_events,
            targeted,
        }
    }

    /// Turn this tick's deaths into elimination notices for human players.
    fn drain_deaths(&mut self) -> Vec<TargetedMessage> {
        std::mem::take(&mut self.world.deaths)
            .into_iter()
            .filter_map(|death| {
                let client = self
                    .clients
                    .values()
                    .find(|c| c.player_id == Some(death.victim_id))?;
                Some(TargetedMessage {
                    client_id: client.id,
                    message: TargetedMessageType::Eliminated {
                        coins: death.coins,
                        kills: death.kills,
                    },
                })
            })
            .collect()
    }
}

/// Trim, drop control characters and cap the length; empty names become a
/// random guest name.
fn sanitize_name(raw: &str, max_len: usize) -> String {
    let name: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .take(max_len)
        .collect();
    let name = name.trim_end().to_string();
    if name.is_empty() {
        format!("Guest-{:04x}", rand::rng().random::<u16>())
    } else {
        name
    }
}

/// Run the main game loop.
pub async fn run_game_loop(state: Arc<RwLock<GameState>>, tick_interval: Duration) {
    let start = Instant::now() + tick_interval;
    let mut ticker = interval_at(start, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    {
        let mut game = state.write().await;
        if game.gamemode.food_enabled() {
            let config = game.config.clone();
            game.world.ensure_food(&config);
        }
        game.sync_bots();
        info!(
            "World initialized: {} mode, {} food, {} bots",
            game.gamemode.name(),
            game.world.food.len(),
            game.bots.brains.len()
        );
    }

    loop {
        let scheduled = ticker.tick().await;

        // Hibernate when no users are connected to reduce CPU usage
        {
            let game = state.read().await;
            if game.clients.is_empty() {
                drop(game);
                sleep((tick_interval * 4).max(Duration::from_millis(100))).await;
                continue;
            }
        }

        // Drain any backlog of tick events so we always process the most recent tick.
        let mut skipped = 0u32;
        while ticker.tick().now_or_never().is_some() {
            skipped += 1;
        }
        if skipped > 0 {
            debug!(
                "Skipped {} ticks to stay current (lag: {:?})",
                skipped,
                Instant::now().saturating_duration_since(scheduled)
            );
        }

        let broadcasts = {
            let mut game = state.write().await;
            let tick_start = std::time::Instant::now();
            let broadcasts = game.tick();
            let tick_ms = tick_start.elapsed().as_secs_f64() * 1000.0;

            game.update_time_avg = game.update_time_avg * 0.5 + tick_ms * 0.5;

            let tick_budget = tick_interval.as_secs_f64() * 1000.0 * 0.9;
            if tick_ms > tick_budget {
                warn!(
                    "Slow tick #{}: {:.3}ms (budget: {:.1}ms) - {} clients, {} players, {} boomerangs",
                    game.world.tick,
                    tick_ms,
                    tick_budget,
                    game.clients.len(),
                    game.world.player_count(),
                    game.world.boomerangs.len()
                );
            }

            broadcasts
        }; // Write lock released here

        let (snapshot_tx, event_tx, targeted_tx) = {
            let game = state.read().await;
            (game.snapshot_tx.clone(), game.event_tx.clone(), game.targeted_tx.clone())
        };

        if let Some(snapshot) = broadcasts.snapshot {
            tokio::spawn(async move {
                let _ = snapshot_tx.send(snapshot);
            });
        }
        if !broadcasts.round_events.is_empty() || !broadcasts.targeted.is_empty() {
            let PendingBroadcasts {
                round_events, targeted, ..
            } = broadcasts;
            tokio::spawn(async move {
                for event in round_events {
                    let _ = event_tx.send(event);
                }
                for message in targeted {
                    let _ = targeted_tx.send(message);
                }
            });
        }
    }
}

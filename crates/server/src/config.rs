//! Server configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub dash: DashConfig,
    #[serde(default)]
    pub boomerang: BoomerangConfig,
    #[serde(default)]
    pub bots: BotConfig,
    #[serde(default)]
    pub food: FoodConfig,
    #[serde(default)]
    pub coins: CoinConfig,
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub economy: EconomyConfig,
}

impl Config {
    /// Load configuration from `config.toml` or use defaults.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Load configuration from `path`, writing the defaults there if it is missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            info!("No {} found, creating default config", path.display());
            let default_config = Self::default();
            std::fs::write(path, toml::to_string_pretty(&default_config)?)?;
            Ok(default_config)
        }
    }

    /// Fixed timestep in seconds.
    pub fn dt(&self) -> f32 {
        1.0 / self.server.tick_rate.max(1) as f32
    }

    /// Ticks between two snapshot broadcasts.
    pub fn snapshot_every(&self) -> u64 {
        let ratio = self.server.tick_rate as f32 / self.server.snapshot_rate.max(1) as f32;
        (ratio.round() as u64).max(1)
    }
}

/// Which rule set the arena runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    #[default]
    Ffa,
    Arena,
}

/// Server networking and general settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Connections per IP limit.
    #[serde(default = "default_ip_limit")]
    pub ip_limit: usize,
    /// Seconds without any packet before a connection is dropped.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    /// Server name used in logs.
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub mode: ModeKind,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Snapshot broadcasts per second.
    #[serde(default = "default_snapshot_rate")]
    pub snapshot_rate: u32,
    /// Living players (humans and bots) allowed in the arena.
    #[serde(default = "default_max_players")]
    pub max_players_per_arena: usize,
    /// Inputs accepted per player in any one-second window.
    #[serde(default = "default_max_input_rate")]
    pub max_input_rate_per_second: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            max_connections: default_max_connections(),
            ip_limit: default_ip_limit(),
            idle_timeout_secs: default_idle_timeout(),
            name: default_name(),
            mode: ModeKind::default(),
            tick_rate: default_tick_rate(),
            snapshot_rate: default_snapshot_rate(),
            max_players_per_arena: default_max_players(),
            max_input_rate_per_second: default_max_input_rate(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_max_connections() -> usize {
    100
}
fn default_ip_limit() -> usize {
    16
}
fn default_idle_timeout() -> u64 {
    300
}
fn default_name() -> String {
    "Snapback".to_string()
}
fn default_tick_rate() -> u32 {
    60
}
fn default_snapshot_rate() -> u32 {
    30
}
fn default_max_players() -> usize {
    8
}
fn default_max_input_rate() -> u32 {
    120
}

/// World geometry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f32,
    #[serde(default = "default_world_size")]
    pub height: f32,
    /// Circular containment radius used by the arena mode.
    #[serde(default = "default_arena_radius")]
    pub arena_radius: f32,
    /// Radius of the circle players are placed on at warmup.
    #[serde(default = "default_spawn_radius")]
    pub spawn_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            arena_radius: default_arena_radius(),
            spawn_radius: default_spawn_radius(),
        }
    }
}

fn default_world_size() -> f32 {
    3000.0
}
fn default_arena_radius() -> f32 {
    600.0
}
fn default_spawn_radius() -> f32 {
    250.0
}

/// Player body, health and speed settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayerConfig {
    #[serde(default = "default_initial_mass")]
    pub initial_mass: f32,
    #[serde(default = "default_min_mass")]
    pub min_mass: f32,
    #[serde(default = "default_max_mass")]
    pub max_mass: f32,
    #[serde(default = "default_max_hp")]
    pub max_hp: u8,
    /// Fraction of mass above the floor lost per second.
    #[serde(default = "default_mass_decay")]
    pub mass_decay_per_second: f32,
    #[serde(default = "default_spawn_immunity")]
    pub spawn_immunity_ms: f64,
    #[serde(default = "default_death_linger")]
    pub death_linger_ms: f64,
    #[serde(default = "default_regen_interval")]
    pub regen_interval_ms: f64,
    /// Coins are collected within `radius * coin_pickup_factor`.
    #[serde(default = "default_coin_pickup_factor")]
    pub coin_pickup_factor: f32,
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// When false every player moves at `speed_max`.
    #[serde(default = "default_true")]
    pub mass_slows: bool,
    #[serde(default = "default_speed_base")]
    pub speed_base: f32,
    #[serde(default = "default_speed_mass_drag")]
    pub speed_mass_drag: f32,
    #[serde(default = "default_speed_min")]
    pub speed_min: f32,
    #[serde(default = "default_speed_max")]
    pub speed_max: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_mass: default_initial_mass(),
            min_mass: default_min_mass(),
            max_mass: default_max_mass(),
            max_hp: default_max_hp(),
            mass_decay_per_second: default_mass_decay(),
            spawn_immunity_ms: default_spawn_immunity(),
            death_linger_ms: default_death_linger(),
            regen_interval_ms: default_regen_interval(),
            coin_pickup_factor: default_coin_pickup_factor(),
            max_name_length: default_max_name_length(),
            mass_slows: true,
            speed_base: default_speed_base(),
            speed_mass_drag: default_speed_mass_drag(),
            speed_min: default_speed_min(),
            speed_max: default_speed_max(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_initial_mass() -> f32 {
    80.0
}
fn default_min_mass() -> f32 {
    80.0
}
fn default_max_mass() -> f32 {
    1600.0
}
fn default_max_hp() -> u8 {
    3
}
fn default_mass_decay() -> f32 {
    0.004
}
fn default_spawn_immunity() -> f64 {
    3000.0
}
fn default_death_linger() -> f64 {
    1500.0
}
fn default_regen_interval() -> f64 {
    20000.0
}
fn default_coin_pickup_factor() -> f32 {
    1.5
}
fn default_max_name_length() -> usize {
    16
}
fn default_speed_base() -> f32 {
    110.0
}
fn default_speed_mass_drag() -> f32 {
    2.5
}
fn default_speed_min() -> f32 {
    22.0
}
fn default_speed_max() -> f32 {
    105.0
}

/// Dash settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashConfig {
    #[serde(default = "default_dash_distance")]
    pub distance: f32,
    #[serde(default = "default_dash_duration")]
    pub duration_ms: f64,
    #[serde(default = "default_dash_cooldown")]
    pub cooldown_ms: f64,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            distance: default_dash_distance(),
            duration_ms: default_dash_duration(),
            cooldown_ms: default_dash_cooldown(),
        }
    }
}

fn default_dash_distance() -> f32 {
    55.0
}
fn default_dash_duration() -> f64 {
    120.0
}
fn default_dash_cooldown() -> f64 {
    2000.0
}

/// Boomerang flight and damage settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoomerangConfig {
    /// Outbound speed in units per second.
    #[serde(default = "default_boomerang_speed")]
    pub speed: f32,
    #[serde(default = "default_return_factor")]
    pub return_speed_factor: f32,
    /// Outbound distance before the projectile turns back.
    #[serde(default = "default_boomerang_max_distance")]
    pub max_distance: f32,
    /// Added to the owner radius when checking for a catch.
    #[serde(default = "default_catch_radius")]
    pub catch_radius: f32,
    #[serde(default = "default_boomerang_min_radius")]
    pub min_radius: f32,
    /// Projectile radius relative to the owner radius.
    #[serde(default = "default_boomerang_radius_factor")]
    pub radius_factor: f32,
    #[serde(default = "default_outbound_damage")]
    pub outbound_damage: u8,
    #[serde(default = "default_return_damage")]
    pub return_damage: u8,
    /// Distance the return leg must cover before it counts as a real return.
    #[serde(default = "default_real_return_distance")]
    pub real_return_distance: f32,
    /// Flight time after which the projectile is force-returned.
    #[serde(default = "default_max_flight")]
    pub max_flight_ms: f64,
    #[serde(default)]
    pub throw_cooldown_ms: f64,
    /// Throw toward the nearest enemy instead of the aim angle.
    /// Unset means "on in arena mode, off in free-for-all".
    #[serde(default)]
    pub auto_aim: Option<bool>,
    #[serde(default = "default_lock_radius")]
    pub lock_radius: f32,
}

impl Default for BoomerangConfig {
    fn default() -> Self {
        Self {
            speed: default_boomerang_speed(),
            return_speed_factor: default_return_factor(),
            max_distance: default_boomerang_max_distance(),
            catch_radius: default_catch_radius(),
            min_radius: default_boomerang_min_radius(),
            radius_factor: default_boomerang_radius_factor(),
            outbound_damage: default_outbound_damage(),
            return_damage: default_return_damage(),
            real_return_distance: default_real_return_distance(),
            max_flight_ms: default_max_flight(),
            throw_cooldown_ms: 0.0,
            auto_aim: None,
            lock_radius: default_lock_radius(),
        }
    }
}

fn default_boomerang_speed() -> f32 {
    180.0
}
fn default_return_factor() -> f32 {
    1.3
}
fn default_boomerang_max_distance() -> f32 {
    80.0
}
fn default_catch_radius() -> f32 {
    4.0
}
fn default_boomerang_min_radius() -> f32 {
    3.0
}
fn default_boomerang_radius_factor() -> f32 {
    0.3
}
fn default_outbound_damage() -> u8 {
    1
}
fn default_return_damage() -> u8 {
    3
}
fn default_real_return_distance() -> f32 {
    5.0
}
fn default_max_flight() -> f64 {
    4000.0
}
fn default_lock_radius() -> f32 {
    220.0
}

/// Bot population and behavior tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Bots fill the arena up to this many players.
    #[serde(default = "default_fill_players")]
    pub fill_players: usize,
    /// Projectiles within `radius * danger_factor` trigger a dodge.
    #[serde(default = "default_danger_factor")]
    pub danger_factor: f32,
    /// Projectiles within `radius * dash_danger_factor` also trigger a dash.
    #[serde(default = "default_dash_danger_factor")]
    pub dash_danger_factor: f32,
    #[serde(default = "default_coin_attraction")]
    pub coin_attraction_radius: f32,
    #[serde(default = "default_preferred_range")]
    pub preferred_range: f32,
    #[serde(default = "default_separation_radius")]
    pub separation_radius: f32,
    #[serde(default = "default_separation_force")]
    pub separation_force: f32,
    /// Exponential approach rate toward the desired velocity, per second.
    #[serde(default = "default_steering_rate")]
    pub steering_rate: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            fill_players: default_fill_players(),
            danger_factor: default_danger_factor(),
            dash_danger_factor: default_dash_danger_factor(),
            coin_attraction_radius: default_coin_attraction(),
            preferred_range: default_preferred_range(),
            separation_radius: default_separation_radius(),
            separation_force: default_separation_force(),
            steering_rate: default_steering_rate(),
        }
    }
}

fn default_fill_players() -> usize {
    2
}
fn default_danger_factor() -> f32 {
    5.0
}
fn default_dash_danger_factor() -> f32 {
    2.5
}
fn default_coin_attraction() -> f32 {
    150.0
}
fn default_preferred_range() -> f32 {
    55.0
}
fn default_separation_radius() -> f32 {
    30.0
}
fn default_separation_force() -> f32 {
    200.0
}
fn default_steering_rate() -> f32 {
    4.0
}

/// Food pellets (free-for-all only).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FoodConfig {
    /// Pellets kept in the world; 0 disables food.
    #[serde(default)]
    pub count: usize,
    #[serde(default = "default_food_mass_min")]
    pub mass_min: f32,
    #[serde(default = "default_food_mass_max")]
    pub mass_max: f32,
}

impl Default for FoodConfig {
    fn default() -> Self {
        Self {
            count: 0,
            mass_min: default_food_mass_min(),
            mass_max: default_food_mass_max(),
        }
    }
}

fn default_food_mass_min() -> f32 {
    1.0
}
fn default_food_mass_max() -> f32 {
    3.0
}

/// Dropped coins and score.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoinConfig {
    /// Free-for-all coins disappear after this long.
    #[serde(default = "default_coin_lifetime")]
    pub lifetime_ms: f64,
    #[serde(default = "default_kill_score")]
    pub kill_score: u32,
    #[serde(default = "default_pickup_score")]
    pub pickup_score: u32,
}

impl Default for CoinConfig {
    fn default() -> Self {
        Self {
            lifetime_ms: default_coin_lifetime(),
            kill_score: default_kill_score(),
            pickup_score: default_pickup_score(),
        }
    }
}

fn default_coin_lifetime() -> f64 {
    8000.0
}
fn default_kill_score() -> u32 {
    10
}
fn default_pickup_score() -> u32 {
    5
}

/// Arena round timings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RoundConfig {
    #[serde(default = "default_warmup")]
    pub warmup_ms: f64,
    #[serde(default = "default_round_end")]
    pub round_end_ms: f64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            warmup_ms: default_warmup(),
            round_end_ms: default_round_end(),
        }
    }
}

fn default_warmup() -> f64 {
    3000.0
}
fn default_round_end() -> f64 {
    4000.0
}

/// Ledger-facing economy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EconomyConfig {
    /// Debited on join; 0 makes the arena free to enter.
    #[serde(default = "default_entry_fee")]
    pub entry_fee: f64,
    /// Fraction of a cashout kept by the house.
    #[serde(default = "default_house_fee")]
    pub house_fee: f64,
    /// Ledger value of one held coin.
    #[serde(default = "default_coin_value")]
    pub coin_value: f64,
    #[serde(default = "default_starting_coins")]
    pub starting_coins: u32,
    #[serde(default = "default_verify_attempts")]
    pub verify_max_attempts: u32,
    #[serde(default = "default_verify_retry")]
    pub verify_retry_ms: u64,
    #[serde(default = "default_price_cache")]
    pub price_cache_ms: u64,
    #[serde(default = "default_fallback_price")]
    pub fallback_price: f64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            entry_fee: default_entry_fee(),
            house_fee: default_house_fee(),
            coin_value: default_coin_value(),
            starting_coins: default_starting_coins(),
            verify_max_attempts: default_verify_attempts(),
            verify_retry_ms: default_verify_retry(),
            price_cache_ms: default_price_cache(),
            fallback_price: default_fallback_price(),
        }
    }
}

fn default_entry_fee() -> f64 {
    1.0
}
fn default_house_fee() -> f64 {
    0.15
}
fn default_coin_value() -> f64 {
    1.0
}
fn default_starting_coins() -> u32 {
    1
}
fn default_verify_attempts() -> u32 {
    8
}
fn default_verify_retry() -> u64 {
    3000
}
fn default_price_cache() -> u64 {
    60_000
}
fn default_fallback_price() -> f64 {
    150.0
}

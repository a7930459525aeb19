//! Run state definitions
//!
//! Contains all entities (player, obstacles, power-ups, bots), the economy
//! bookkeeping and the `RunContext` aggregate that every system receives.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use crate::game::constants::{self, ai, lanes, obstacles, player, powerups};
use crate::game::lanes::{Lane, LaneField};
use crate::game::modes::{GameMode, RunConfig};
use crate::game::skins::Skin;
use crate::game::systems::chaos::{ChaosEffect, ChaosState};
use crate::util::rect::Rect;

/// Identifier for obstacles and power-ups
pub type EntityId = u64;

/// Unique bot identifier
pub type BotId = Uuid;

/// The single active player
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    /// Logical lane (changes instantly on input)
    pub lane: Lane,
    /// Rendered x, eases toward the lane position
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub lives: u32,
    pub skin: Skin,
    pub ghost_charges: u32,
    /// Temporary milestone shield
    pub temp_shield: bool,
    pub shield_ticks: u32,
    /// Lane-change speed multiplier
    pub move_speed: f32,
}

impl PlayerState {
    pub fn new(skin: Skin, lives: u32, move_speed: f32, lanes: &LaneField) -> Self {
        Self {
            lane: lanes::START_LANE,
            x: lanes.position_of(lanes::START_LANE),
            y: player::Y,
            w: player::SIZE,
            h: player::SIZE,
            lives,
            skin,
            ghost_charges: 0,
            temp_shield: false,
            shield_ticks: 0,
            move_speed,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }

    pub fn is_alive(&self) -> bool {
        self.lives > 0
    }

    /// Grant (or refresh) the temporary shield
    pub fn grant_shield(&mut self, ticks: u32) {
        self.temp_shield = true;
        self.shield_ticks = ticks;
    }

    /// Use up the temporary shield. Returns false if none was active.
    pub fn consume_shield(&mut self) -> bool {
        if !self.temp_shield {
            return false;
        }
        self.temp_shield = false;
        self.shield_ticks = 0;
        true
    }

    /// Ease x toward the current lane
    pub fn step_motion(&mut self, lanes: &LaneField) {
        let target = lanes.position_of(self.lane);
        let diff = target - self.x;
        if diff.abs() <= player::SNAP_EPSILON {
            self.x = target;
        } else {
            let factor = (player::LANE_SMOOTHING * self.move_speed).min(1.0);
            self.x += diff * factor;
        }
    }
}

/// Lane-aligned falling obstacle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Obstacle {
    pub id: EntityId,
    pub lane: Lane,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Obstacle {
    pub fn new(id: EntityId, lane: Lane, x: f32) -> Self {
        Self {
            id,
            lane,
            x,
            y: obstacles::SPAWN_Y,
            w: obstacles::SIZE,
            h: obstacles::SIZE,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// Collectible power-up kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpKind {
    SpeedBoost,
    CoinMagnet,
    JumpBoost,
    Freeze,
    StarPower,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 5] = [
        PowerUpKind::SpeedBoost,
        PowerUpKind::CoinMagnet,
        PowerUpKind::JumpBoost,
        PowerUpKind::Freeze,
        PowerUpKind::StarPower,
    ];

    /// Effect duration in seconds; `None` for instantaneous effects
    pub fn duration_secs(&self) -> Option<f32> {
        match self {
            PowerUpKind::SpeedBoost => Some(powerups::SPEED_BOOST_SECS),
            PowerUpKind::CoinMagnet => Some(powerups::COIN_MAGNET_SECS),
            PowerUpKind::Freeze => Some(powerups::FREEZE_SECS),
            PowerUpKind::StarPower => Some(powerups::STAR_POWER_SECS),
            PowerUpKind::JumpBoost => None,
        }
    }
}

/// Power-up sitting on the field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerUp {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub lane: Lane,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Ticks left before it disappears uncollected
    pub lifetime: u32,
    pub collected: bool,
}

impl PowerUp {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// A collected, time-boxed effect
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActiveEffect {
    pub kind: PowerUpKind,
    /// Remaining ticks
    pub remaining: u32,
}

/// Bot difficulty tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotTier {
    Easy,
    Medium,
    Hard,
}

impl BotTier {
    /// Reaction time sampling range in milliseconds
    pub fn reaction_range_ms(&self) -> (f64, f64) {
        match self {
            BotTier::Easy => (300.0, 500.0),
            BotTier::Medium => (150.0, 300.0),
            BotTier::Hard => (50.0, 150.0),
        }
    }

    pub fn sample_reaction_ms(&self, rng: &mut impl Rng) -> f64 {
        let (min, max) = self.reaction_range_ms();
        rng.gen_range(min..max)
    }
}

/// Bot lane-change state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotMotion {
    Idle,
    Moving,
}

/// Multiplayer opponent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bot {
    pub id: BotId,
    pub name: String,
    pub color: String,
    pub tier: BotTier,
    pub lane: Lane,
    pub target_lane: Lane,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub alive: bool,
    pub score: f64,
    pub motion: BotMotion,
    /// Simulation time of the last decision
    pub last_decision_ms: f64,
    /// Wait before the next decision
    pub reaction_ms: f64,
}

impl Bot {
    pub fn new(name: &str, color: &str, tier: BotTier, y: f32, lanes: &LaneField, rng: &mut impl Rng) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            color: color.to_string(),
            tier,
            lane: lanes::START_LANE,
            target_lane: lanes::START_LANE,
            x: lanes.position_of(lanes::START_LANE),
            y,
            w: ai::SIZE,
            h: ai::SIZE,
            alive: true,
            score: 0.0,
            motion: BotMotion::Idle,
            last_decision_ms: 0.0,
            reaction_ms: tier.sample_reaction_ms(rng),
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// Score-driven economy bookkeeping for one run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EconomyState {
    pub score: f64,
    /// Score before the most recent advance
    pub prev_score: f64,
    pub coins_this_run: u64,
    pub crystals_this_run: u64,
    /// Fractional coins carried between bucket conversions
    pub coin_carry: f64,
    pub difficulty_level: u32,
    /// Shield milestones fired so far
    pub shield_milestones: u64,
    /// Ghost-charge milestones fired so far
    pub ghost_milestones: u64,
    /// Whole-run magnet from a one-shot boost
    pub magnet_boost: bool,
    /// Balance read from the profile at run start
    pub starting_coins: u64,
    pub starting_crystals: u64,
}

impl EconomyState {
    pub fn new(starting_coins: u64, starting_crystals: u64, magnet_boost: bool) -> Self {
        Self {
            difficulty_level: 1,
            magnet_boost,
            starting_coins,
            starting_crystals,
            ..Default::default()
        }
    }

    pub fn total_coins(&self) -> u64 {
        self.starting_coins + self.coins_this_run
    }

    pub fn total_crystals(&self) -> u64 {
        self.starting_crystals + self.crystals_this_run
    }
}

/// Per-run equipment resolved from the player's profile
#[derive(Debug, Clone, PartialEq)]
pub struct Loadout {
    pub skin: Skin,
    /// Permanent shield upgrades (extra starting lives)
    pub extra_lives: u32,
    /// One-shot boost: faster lane changes
    pub speed_boost: bool,
    /// One-shot boost: one additional life
    pub extra_shield: bool,
    /// One-shot boost: doubled coin conversion for the whole run
    pub coin_magnet: bool,
    pub starting_coins: u64,
    pub starting_crystals: u64,
}

impl Default for Loadout {
    fn default() -> Self {
        Self {
            skin: Skin::Default,
            extra_lives: 0,
            speed_boost: false,
            extra_shield: false,
            coin_magnet: false,
            starting_coins: 0,
            starting_crystals: 0,
        }
    }
}

/// Everything one run owns. Passed explicitly to every system.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: RunConfig,
    pub lanes: LaneField,
    pub player: PlayerState,
    pub obstacles: Vec<Obstacle>,
    pub power_ups: Vec<PowerUp>,
    pub effects: SmallVec<[ActiveEffect; 4]>,
    pub bots: Vec<Bot>,
    pub economy: EconomyState,
    /// Ticks until power-ups may spawn again
    pub powerup_cooldown: u32,
    /// Level-mode stage index (stages cleared so far)
    pub stage: usize,
    pub chaos: ChaosState,
    pub tick: u64,
    next_entity_id: EntityId,
    pub rng: StdRng,
}

impl RunContext {
    pub fn new(config: RunConfig, loadout: &Loadout, seed: u64) -> Self {
        let lanes = LaneField::canonical();
        let caps = loadout.skin.capabilities();

        let lives = config.lives_override.unwrap_or(
            player::STARTING_LIVES + loadout.extra_lives + loadout.extra_shield as u32,
        );
        let move_speed = if loadout.speed_boost {
            caps.move_speed * 1.2
        } else {
            caps.move_speed
        };

        let player = PlayerState::new(loadout.skin, lives, move_speed, &lanes);
        let powerup_cooldown = constants::secs_to_ticks(powerups::SPAWN_COOLDOWN_SECS, config.tick_rate);

        Self {
            config,
            lanes,
            player,
            obstacles: Vec::with_capacity(32),
            power_ups: Vec::with_capacity(2),
            effects: SmallVec::new(),
            bots: Vec::new(),
            economy: EconomyState::new(
                loadout.starting_coins,
                loadout.starting_crystals,
                loadout.coin_magnet,
            ),
            powerup_cooldown,
            stage: 0,
            chaos: ChaosState::default(),
            tick: 0,
            next_entity_id: 1,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn mode(&self) -> GameMode {
        self.config.mode
    }

    /// Allocate a new entity id (monotonically increasing)
    pub fn alloc_id(&mut self) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;
        id
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.config.elapsed_secs(self.tick)
    }

    /// Simulation clock in milliseconds
    pub fn elapsed_ms(&self) -> f64 {
        self.tick as f64 * constants::tick_ms(self.config.tick_rate)
    }

    pub fn has_effect(&self, kind: PowerUpKind) -> bool {
        self.effects.iter().any(|e| e.kind == kind && e.remaining > 0)
    }

    pub fn has_chaos(&self, effect: ChaosEffect) -> bool {
        self.chaos.current == Some(effect)
    }

    pub fn alive_bot_count(&self) -> usize {
        self.bots.iter().filter(|b| b.alive).count()
    }

    /// Current obstacle speed (zero while frozen)
    pub fn effective_speed(&self) -> f32 {
        if self.has_effect(PowerUpKind::Freeze) {
            0.0
        } else {
            crate::game::systems::obstacles::effective_speed(self)
        }
    }

    /// Immutable copy for render sinks
    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot {
            tick: self.tick,
            mode: self.config.mode,
            elapsed_secs: self.elapsed_secs(),
            speed: self.effective_speed(),
            player: self.player.clone(),
            obstacles: self.obstacles.clone(),
            power_ups: self.power_ups.clone(),
            effects: self.effects.to_vec(),
            bots: self.bots.clone(),
            economy: self.economy.clone(),
            stage: self.stage,
            chaos_effect: self.chaos.current,
        }
    }
}

/// Read-only view of a run handed to render sinks after every tick
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub mode: GameMode,
    pub elapsed_secs: f64,
    pub speed: f32,
    pub player: PlayerState,
    pub obstacles: Vec<Obstacle>,
    pub power_ups: Vec<PowerUp>,
    pub effects: Vec<ActiveEffect>,
    pub bots: Vec<Bot>,
    pub economy: EconomyState,
    pub stage: usize,
    pub chaos_effect: Option<ChaosEffect>,
}

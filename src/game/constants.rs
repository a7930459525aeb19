/// Field geometry and timing
pub mod field {
    /// Field width in world units
    pub const WIDTH: f32 = 480.0;
    /// Field height; obstacles at or beyond this y are pruned
    pub const HEIGHT: f32 = 640.0;
    /// Default tick rate in Hz
    pub const TICK_RATE: u32 = 60;
    /// Accepted tick rate range for configuration
    pub const MIN_TICK_RATE: u32 = 30;
    pub const MAX_TICK_RATE: u32 = 120;
}

/// Lane layout
pub mod lanes {
    /// Number of lanes
    pub const COUNT: usize = 3;
    /// Canonical x position of each lane
    pub const POSITIONS: [f32; COUNT] = [120.0, 220.0, 320.0];
    /// Lane the player and bots start in
    pub const START_LANE: usize = 1;
}

/// Player geometry and baseline stats
pub mod player {
    pub const Y: f32 = 540.0;
    pub const SIZE: f32 = 40.0;
    pub const STARTING_LIVES: u32 = 1;
    /// Fraction of remaining distance covered per tick at move speed 1.0
    pub const LANE_SMOOTHING: f32 = 0.6;
    /// Snap distance when approaching a lane
    pub const SNAP_EPSILON: f32 = 5.0;
}

/// Obstacle spawning and speed ramp
pub mod obstacles {
    pub const SIZE: f32 = 40.0;
    /// Spawn y (just above the visible field)
    pub const SPAWN_Y: f32 = -60.0;
    /// Spawn probability at score 0
    pub const BASE_SPAWN_RATE: f64 = 0.005;
    /// Spawn probability added per score step
    pub const SPAWN_RATE_STEP: f64 = 0.0025;
    /// Score points per spawn-rate step
    pub const SPAWN_RATE_SCORE_STEP: f64 = 500.0;
    /// Hard cap on per-tick spawn probability
    pub const MAX_SPAWN_RATE: f64 = 0.05;
    /// Base obstacle speed (units per tick)
    pub const BASE_SPEED: f32 = 7.0;
    /// Speed bonus per difficulty level above 1
    pub const SPEED_PER_LEVEL: f32 = 0.3;
    /// Maximum difficulty speed bonus above base
    pub const MAX_SPEED_BONUS: f32 = 8.0;
}

/// Score, currency and milestone buckets
pub mod economy {
    /// Score per tick in most modes
    pub const SCORE_PER_TICK: f64 = 0.25;
    /// Score per tick in coin rush
    pub const COIN_RUSH_SCORE_PER_TICK: f64 = 2.0;
    /// Points per coin bucket
    pub const COIN_BUCKET: f64 = 100.0;
    /// Points per crystal bucket
    pub const CRYSTAL_BUCKET: f64 = 80.0;
    /// Points per difficulty level
    pub const LEVEL_BUCKET: f64 = 250.0;
    /// Points per temporary shield grant
    pub const SHIELD_BUCKET: f64 = 1000.0;
    /// Points per ghost charge grant (ghost-capable skins only)
    pub const GHOST_BUCKET: f64 = 500.0;
    /// Temporary shield duration in seconds
    pub const SHIELD_DURATION_SECS: f32 = 10.0;
    /// Coin multiplier while a magnet is active
    pub const MAGNET_MULTIPLIER: f64 = 2.0;
    /// Coins granted when a tank-capable skin destroys an obstacle
    pub const TANK_BONUS_COINS: u64 = 2;
    /// Score multiplier while SpeedBoost is active
    pub const SPEED_BOOST_SCORE_MULTIPLIER: f64 = 1.5;
}

/// Collectible power-ups
pub mod powerups {
    pub const SIZE: f32 = 30.0;
    /// Cooldown after run start and after each spawn, in seconds
    pub const SPAWN_COOLDOWN_SECS: f32 = 15.0;
    /// Per-tick spawn chance once the cooldown has elapsed
    pub const SPAWN_CHANCE: f64 = 0.003;
    /// Time a power-up stays on the field uncollected, in seconds
    pub const FIELD_LIFETIME_SECS: f32 = 8.0;
    pub const SPEED_BOOST_SECS: f32 = 5.0;
    pub const COIN_MAGNET_SECS: f32 = 10.0;
    pub const FREEZE_SECS: f32 = 3.0;
    pub const STAR_POWER_SECS: f32 = 5.0;
}

/// AI bot constants
pub mod ai {
    /// Fixed multiplayer roster size
    pub const COUNT: usize = 4;
    pub const SIZE: f32 = 35.0;
    /// Vertical spread between roster slots around player::Y
    pub const ROSTER_SPREAD: f32 = 12.0;
    /// Fraction of remaining distance covered per tick while changing lanes
    pub const LANE_SMOOTHING: f32 = 0.6;
    pub const SNAP_EPSILON: f32 = 5.0;
    /// Danger scan: horizontal tolerance around the lane x
    pub const DANGER_LANE_TOLERANCE: f32 = 30.0;
    /// Danger scan: distance above the bot that counts as danger
    pub const LOOK_AHEAD: f32 = 200.0;
    /// Danger scan: margin below the bot's bottom edge
    pub const LOOK_BEHIND: f32 = 50.0;
    /// Chance of an exploratory lane change when the current lane is safe
    pub const EXPLORE_CHANCE: f64 = 0.15;
    /// Per-tick score jitter range around the base multiplier
    pub const SCORE_JITTER_MIN: f64 = 0.95;
    pub const SCORE_JITTER_MAX: f64 = 1.05;
}

/// Mode-specific presets and targets
pub mod modes {
    pub const SPEEDRUN_SPEED_FACTOR: f32 = 1.5;
    pub const SURVIVAL_SPEED_FACTOR: f32 = 0.8;
    pub const COIN_RUSH_SPEED_FACTOR: f32 = 1.2;
    pub const NIGHTMARE_SPEED_FACTOR: f32 = 1.3;
    /// Speedrun victory score
    pub const SPEEDRUN_TARGET: f64 = 1000.0;
    /// Coin rush victory coin count
    pub const COIN_RUSH_TARGET: u64 = 100;
    /// Nightmare extra per-tick spawn chance
    pub const NIGHTMARE_EXTRA_SPAWN: f64 = 0.005;
    /// Survival speed ramp per elapsed second
    pub const SURVIVAL_RAMP_PER_SEC: f32 = 0.1;
    pub const SURVIVAL_RAMP_CAP: f32 = 8.0;
    /// Cumulative score targets for level mode stages
    pub const LEVEL_TARGETS: [f64; 5] = [500.0, 1200.0, 2000.0, 3000.0, 4500.0];
    /// Base speed bonus per cleared stage
    pub const LEVEL_STAGE_SPEED_BONUS: f32 = 1.0;
}

/// Chaos mode rotation
pub mod chaos {
    /// Seconds between chaos effect rotations
    pub const ROTATION_SECS: f32 = 5.0;
    pub const SPEED_MULTIPLIER: f32 = 1.5;
    pub const SCORE_MULTIPLIER: f64 = 2.0;
    pub const GIANT_SIZE: f32 = 60.0;
    pub const TINY_SIZE: f32 = 20.0;
}

/// Convert a duration in seconds to a whole tick count at the given rate
pub fn secs_to_ticks(secs: f32, tick_rate: u32) -> u32 {
    (secs * tick_rate as f32).round().max(0.0) as u32
}

/// Milliseconds per tick at the given rate
pub fn tick_ms(tick_rate: u32) -> f64 {
    1000.0 / tick_rate.max(1) as f64
}

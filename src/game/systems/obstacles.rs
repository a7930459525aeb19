//! Obstacle field: spawn probability, speed ramp, advance and prune

use rand::Rng;

use crate::game::constants::{field, modes, obstacles::*};
use crate::game::game_loop::GameEvent;
use crate::game::lanes::Lane;
use crate::game::state::{EntityId, Obstacle, RunContext};
use crate::game::systems::chaos::ChaosEffect;

/// Per-tick spawn probability for a score. Monotonic non-decreasing, capped at `MAX_SPAWN_RATE`.
pub fn spawn_rate(score: f64) -> f64 {
    let steps = (score.max(0.0) / SPAWN_RATE_SCORE_STEP).floor();
    (BASE_SPAWN_RATE + steps * SPAWN_RATE_STEP).min(MAX_SPAWN_RATE)
}

/// Speed bonus for a difficulty level, monotonic and capped at `MAX_SPEED_BONUS`
pub fn difficulty_bonus(level: u32) -> f32 {
    (level.saturating_sub(1) as f32 * SPEED_PER_LEVEL).min(MAX_SPEED_BONUS)
}

/// Obstacle speed ignoring freeze
pub fn effective_speed(ctx: &RunContext) -> f32 {
    let cfg = &ctx.config;
    let base = (cfg.base_speed + cfg.stage_speed_bonus(ctx.stage)) * cfg.speed_factor;

    let ramp = if cfg.survival_ramp {
        (ctx.elapsed_secs() as f32 * modes::SURVIVAL_RAMP_PER_SEC).min(modes::SURVIVAL_RAMP_CAP)
    } else {
        0.0
    };

    let speed = base + difficulty_bonus(ctx.economy.difficulty_level) + ramp;

    if ctx.has_chaos(ChaosEffect::SuperSpeed) {
        speed * crate::game::constants::chaos::SPEED_MULTIPLIER
    } else {
        speed
    }
}

/// Place a new obstacle at the top of a lane
pub fn spawn_in_lane(ctx: &mut RunContext, lane: Lane) -> EntityId {
    let id = ctx.alloc_id();
    let x = ctx.lanes.position_of(lane);
    ctx.obstacles.push(Obstacle::new(id, lane, x));
    id
}

/// Spawn one obstacle in a uniformly random lane with probability `chance`
fn roll_spawn(ctx: &mut RunContext, chance: f64, events: &mut Vec<GameEvent>) -> Option<EntityId> {
    if !ctx.rng.gen_bool(chance.clamp(0.0, 1.0)) {
        return None;
    }
    let lane = ctx.rng.gen_range(0..ctx.lanes.lane_count());
    let id = spawn_in_lane(ctx, lane);
    events.push(GameEvent::ObstacleSpawned { id, lane });
    Some(id)
}

/// With probability `spawn_rate(score)`, spawn one obstacle
pub fn try_spawn(ctx: &mut RunContext, events: &mut Vec<GameEvent>) -> Option<EntityId> {
    let chance = spawn_rate(ctx.economy.score);
    roll_spawn(ctx, chance, events)
}

/// Move every obstacle forward and prune those past the field
pub fn advance(ctx: &mut RunContext, speed: f32) {
    for obstacle in &mut ctx.obstacles {
        obstacle.y += speed;
    }
    ctx.obstacles.retain(|o| o.y < field::HEIGHT);
}

/// Advance the field, then run the regular and mode-specific spawn rolls
pub fn update(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    let speed = ctx.effective_speed();
    advance(ctx, speed);

    try_spawn(ctx, events);

    let extra = ctx.config.extra_spawn_chance;
    if extra > 0.0 {
        roll_spawn(ctx, extra, events);
    }
}

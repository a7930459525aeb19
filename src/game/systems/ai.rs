use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;
use tracing::debug;

use crate::game::constants::{ai::*, player};
use crate::game::lanes::{Lane, LaneField};
use crate::game::state::{Bot, BotMotion, BotTier, Obstacle, PlayerState, RunContext};

/// Fixed multiplayer roster: name, color, tier
pub const ROSTER: [(&str, &str, BotTier); COUNT] = [
    ("Alpha", "#ff4444", BotTier::Hard),
    ("Beta", "#44ff44", BotTier::Medium),
    ("Gamma", "#4444ff", BotTier::Medium),
    ("Delta", "#ff44ff", BotTier::Easy),
];

/// Build the four multiplayer opponents
pub fn build_roster(lanes: &LaneField, rng: &mut impl Rng) -> Vec<Bot> {
    ROSTER
        .iter()
        .enumerate()
        .map(|(i, (name, color, tier))| {
            let y = player::Y + (i as f32 - 1.5) * ROSTER_SPREAD;
            Bot::new(name, color, *tier, y, lanes, rng)
        })
        .collect()
}

/// True if an obstacle threatens a body at `(y, h)` in the lane at `lane_x`
pub fn check_danger(obstacles: &[Obstacle], lane_x: f32, y: f32, h: f32) -> bool {
    obstacles.iter().any(|o| {
        (o.x - lane_x).abs() < DANGER_LANE_TOLERANCE && o.y > y - LOOK_AHEAD && o.y < y + h + LOOK_BEHIND
    })
}

/// Adjacent lanes with no danger for a body at `(y, h)`
fn safe_adjacent(obstacles: &[Obstacle], lanes: &LaneField, lane: Lane, y: f32, h: f32) -> SmallVec<[Lane; 2]> {
    lanes
        .adjacent(lane)
        .filter(|&l| !check_danger(obstacles, lanes.position_of(l), y, h))
        .collect()
}

/// Pick a new target lane for an idle bot
fn make_decision(bot: &mut Bot, obstacles: &[Obstacle], lanes: &LaneField, rng: &mut impl Rng) {
    let in_danger = check_danger(obstacles, lanes.position_of(bot.lane), bot.y, bot.h);
    let candidates = safe_adjacent(obstacles, lanes, bot.lane, bot.y, bot.h);

    let choice = if in_danger || rng.gen_bool(EXPLORE_CHANCE) {
        candidates.choose(rng).copied()
    } else {
        None
    };

    if let Some(lane) = choice {
        debug!(bot = %bot.name, from = bot.lane, to = lane, in_danger, "Bot changing lane");
        bot.target_lane = lane;
        bot.motion = BotMotion::Moving;
    }
}

/// Ease a moving bot toward its target lane
fn step_motion(bot: &mut Bot, lanes: &LaneField) {
    if bot.motion != BotMotion::Moving {
        return;
    }
    let target = lanes.position_of(bot.target_lane);
    let diff = target - bot.x;
    if diff.abs() <= SNAP_EPSILON {
        bot.x = target;
        bot.lane = bot.target_lane;
        bot.motion = BotMotion::Idle;
    } else {
        bot.x += diff * LANE_SMOOTHING;
    }
}

/// Advance every living bot: motion, decision timing and score
pub fn update(ctx: &mut RunContext) {
    let now = ctx.elapsed_ms();
    let base_score = ctx.config.score_per_tick;

    for bot in ctx.bots.iter_mut().filter(|b| b.alive) {
        step_motion(bot, &ctx.lanes);

        if bot.motion == BotMotion::Idle && now - bot.last_decision_ms >= bot.reaction_ms {
            make_decision(bot, &ctx.obstacles, &ctx.lanes, &mut ctx.rng);
            bot.last_decision_ms = now;
            bot.reaction_ms = bot.tier.sample_reaction_ms(&mut ctx.rng);
        }

        bot.score += base_score * ctx.rng.gen_range(SCORE_JITTER_MIN..SCORE_JITTER_MAX);
    }
}

/// Lane the player autopilot should steer to, using the bot danger scan.
/// Works from a frame snapshot so it can run outside the tick owner.
pub fn autopilot_lane(lanes: &LaneField, p: &PlayerState, obstacles: &[Obstacle], rng: &mut impl Rng) -> Lane {
    if !check_danger(obstacles, lanes.position_of(p.lane), p.y, p.h) {
        return p.lane;
    }
    safe_adjacent(obstacles, lanes, p.lane, p.y, p.h)
        .choose(rng)
        .copied()
        .unwrap_or(p.lane)
}

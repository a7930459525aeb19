//! Score-driven economy: coins, crystals, difficulty, shield and ghost-charge milestones
//!
//! Every milestone uses `floor(current / bucket) > floor(previous / bucket)`, so it
//! fires exactly once per boundary no matter how large a single score step is.

use tracing::debug;

use crate::game::constants::{self, chaos, economy::*};
use crate::game::game_loop::GameEvent;
use crate::game::state::{PowerUpKind, RunContext};
use crate::game::systems::chaos::ChaosEffect;

/// Number of `bucket` boundaries crossed going from `prev` to `cur`
pub fn crossings(prev: f64, cur: f64, bucket: f64) -> u64 {
    let before = (prev / bucket).floor();
    let after = (cur / bucket).floor();
    if after > before {
        (after - before) as u64
    } else {
        0
    }
}

/// Difficulty level for a score
pub fn level_for(score: f64) -> u32 {
    (score.max(0.0) / LEVEL_BUCKET).floor() as u32 + 1
}

/// Score gained this tick under current effects
pub fn score_gain(ctx: &RunContext) -> f64 {
    let mut gain = ctx.config.score_per_tick;
    if ctx.has_effect(PowerUpKind::SpeedBoost) {
        gain *= SPEED_BOOST_SCORE_MULTIPLIER;
    }
    if ctx.has_chaos(ChaosEffect::DoubleScore) {
        gain *= chaos::SCORE_MULTIPLIER;
    }
    gain
}

/// Coins awarded per crossed coin bucket
pub fn coin_multiplier(ctx: &RunContext) -> f64 {
    let mut multiplier = 1.0 + ctx.player.skin.capabilities().coin_bonus;
    if ctx.economy.magnet_boost || ctx.has_effect(PowerUpKind::CoinMagnet) {
        multiplier *= MAGNET_MULTIPLIER;
    }
    multiplier
}

/// Add score and fire every milestone crossed on the way
pub fn add_score(ctx: &mut RunContext, amount: f64, events: &mut Vec<GameEvent>) {
    let prev = ctx.economy.score;
    let cur = prev + amount.max(0.0);
    ctx.economy.prev_score = prev;
    ctx.economy.score = cur;

    // Coins, with fractional bonus carried to the next bucket
    let buckets = crossings(prev, cur, COIN_BUCKET);
    if buckets > 0 {
        let earned = buckets as f64 * coin_multiplier(ctx) + ctx.economy.coin_carry;
        let whole = earned.floor();
        ctx.economy.coin_carry = earned - whole;
        let amount = whole as u64;
        if amount > 0 {
            ctx.economy.coins_this_run += amount;
            events.push(GameEvent::CoinsAwarded {
                amount,
                total_this_run: ctx.economy.coins_this_run,
            });
        }
    }

    let crystals = crossings(prev, cur, CRYSTAL_BUCKET);
    if crystals > 0 {
        ctx.economy.crystals_this_run += crystals;
        events.push(GameEvent::CrystalsAwarded { amount: crystals });
    }

    let level = level_for(cur);
    if level > ctx.economy.difficulty_level {
        ctx.economy.difficulty_level = level;
        debug!("Difficulty level {} at score {:.1}", level, cur);
        events.push(GameEvent::LevelUp { level });
    }

    let shields = crossings(prev, cur, SHIELD_BUCKET);
    if shields > 0 {
        ctx.economy.shield_milestones += shields;
        let ticks = constants::secs_to_ticks(SHIELD_DURATION_SECS, ctx.config.tick_rate);
        ctx.player.grant_shield(ticks);
        events.push(GameEvent::ShieldGranted { ticks });
    }

    if ctx.player.skin.capabilities().earns_ghost_charges {
        let charges = crossings(prev, cur, GHOST_BUCKET);
        if charges > 0 {
            ctx.economy.ghost_milestones += charges;
            ctx.player.ghost_charges += charges as u32;
            events.push(GameEvent::GhostChargeGranted {
                charges: ctx.player.ghost_charges,
            });
        }
    }
}

/// Count down the temporary shield
fn tick_shield(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    if !ctx.player.temp_shield {
        return;
    }
    ctx.player.shield_ticks = ctx.player.shield_ticks.saturating_sub(1);
    if ctx.player.shield_ticks == 0 {
        ctx.player.temp_shield = false;
        events.push(GameEvent::ShieldExpired);
    }
}

/// Advance the economy by one tick
pub fn update(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    tick_shield(ctx, events);
    let gain = score_gain(ctx);
    add_score(ctx, gain, events);
}

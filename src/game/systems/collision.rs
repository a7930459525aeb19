//! Collision resolution for the player and bots
//!
//! The player runs a mitigation chain per overlapping obstacle; the first
//! applicable ability absorbs the hit and the obstacle is always removed.
//! Bots have no mitigation and are eliminated on any overlap. Bots are
//! checked first against the full field, so an obstacle the player absorbs
//! still hits every bot it overlaps.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::game::constants::economy::TANK_BONUS_COINS;
use crate::game::game_loop::GameEvent;
use crate::game::state::{PowerUpKind, RunContext};
use crate::game::systems::powerups;

/// What absorbed (or failed to absorb) an obstacle hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mitigation {
    StarPower,
    TankDestroy,
    GhostPhase,
    Shield,
    LifeLost,
    Fatal,
}

/// Apply the mitigation chain for one hit
pub fn resolve_player_hit(ctx: &mut RunContext) -> Mitigation {
    let caps = ctx.player.skin.capabilities();

    if ctx.has_effect(PowerUpKind::StarPower) {
        return Mitigation::StarPower;
    }
    if caps.destroys_obstacles {
        ctx.economy.coins_this_run += TANK_BONUS_COINS;
        return Mitigation::TankDestroy;
    }
    if caps.earns_ghost_charges && ctx.player.ghost_charges > 0 {
        ctx.player.ghost_charges -= 1;
        return Mitigation::GhostPhase;
    }
    if ctx.player.consume_shield() {
        return Mitigation::Shield;
    }
    if ctx.player.lives > 1 {
        ctx.player.lives -= 1;
        return Mitigation::LifeLost;
    }
    ctx.player.lives = 0;
    Mitigation::Fatal
}

/// Resolve player collisions with power-ups, then obstacles in field order
fn check_player(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    if !ctx.player.is_alive() {
        return;
    }
    powerups::collect_overlapping(ctx, events);

    let player_rect = ctx.player.rect();
    let mut i = 0;
    while i < ctx.obstacles.len() && ctx.player.is_alive() {
        if !ctx.obstacles[i].rect().overlaps(&player_rect) {
            i += 1;
            continue;
        }
        let obstacle = ctx.obstacles.remove(i);
        let mitigation = resolve_player_hit(ctx);
        debug!("Obstacle {} hit player: {:?}", obstacle.id, mitigation);

        match mitigation {
            Mitigation::TankDestroy => {
                events.push(GameEvent::CoinsAwarded {
                    amount: TANK_BONUS_COINS,
                    total_this_run: ctx.economy.coins_this_run,
                });
            }
            Mitigation::LifeLost => {
                events.push(GameEvent::LifeLost { remaining: ctx.player.lives });
            }
            Mitigation::Fatal => {
                info!("Player died at tick {}", ctx.tick);
                events.push(GameEvent::PlayerDied);
            }
            _ => {}
        }
        events.push(GameEvent::ObstacleMitigated { id: obstacle.id, by: mitigation });
    }
}

/// Eliminate every living bot that overlaps an obstacle
fn check_bots(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    for bot in ctx.bots.iter_mut().filter(|b| b.alive) {
        let rect = bot.rect();
        if ctx.obstacles.iter().any(|o| o.rect().overlaps(&rect)) {
            bot.alive = false;
            info!("Bot {} eliminated with score {:.0}", bot.name, bot.score);
            events.push(GameEvent::BotEliminated { id: bot.id, name: bot.name.clone() });
        }
    }
}

/// Resolve all collisions for this tick
pub fn update(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    check_bots(ctx, events);
    check_player(ctx, events);
}

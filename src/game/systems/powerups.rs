//! Collectible power-ups and their time-boxed effects

use rand::Rng;

use crate::game::constants::{self, field, obstacles, powerups::*};
use crate::game::game_loop::GameEvent;
use crate::game::lanes::Lane;
use crate::game::state::{ActiveEffect, EntityId, PowerUp, PowerUpKind, RunContext};

/// Count down active effects and drop the finished ones
fn tick_effects(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    for effect in ctx.effects.iter_mut() {
        effect.remaining = effect.remaining.saturating_sub(1);
    }
    ctx.effects.retain(|e| {
        if e.remaining == 0 {
            events.push(GameEvent::EffectExpired { kind: e.kind });
            false
        } else {
            true
        }
    });
}

/// Scroll field power-ups and expire the uncollected ones
fn advance_field(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    let speed = ctx.effective_speed();
    for item in &mut ctx.power_ups {
        item.y += speed;
        item.lifetime = item.lifetime.saturating_sub(1);
    }
    ctx.power_ups.retain(|p| {
        if p.collected {
            return false;
        }
        if p.lifetime == 0 || p.y >= field::HEIGHT {
            events.push(GameEvent::PowerUpExpired { id: p.id, kind: p.kind });
            return false;
        }
        true
    });
}

/// Place a power-up at the top of a lane and restart the cooldown
pub fn spawn(ctx: &mut RunContext, kind: PowerUpKind, lane: Lane) -> EntityId {
    let id = ctx.alloc_id();
    let lane_x = ctx.lanes.position_of(lane);
    let tick_rate = ctx.config.tick_rate;
    ctx.power_ups.push(PowerUp {
        id,
        kind,
        lane,
        // Centered on the obstacle footprint of the lane
        x: lane_x + (obstacles::SIZE - SIZE) / 2.0,
        y: obstacles::SPAWN_Y,
        w: SIZE,
        h: SIZE,
        lifetime: constants::secs_to_ticks(FIELD_LIFETIME_SECS, tick_rate),
        collected: false,
    });
    ctx.powerup_cooldown = constants::secs_to_ticks(SPAWN_COOLDOWN_SECS, tick_rate);
    id
}

fn try_spawn(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    if ctx.powerup_cooldown > 0 {
        ctx.powerup_cooldown -= 1;
        return;
    }
    if !ctx.power_ups.is_empty() || !ctx.rng.gen_bool(SPAWN_CHANCE) {
        return;
    }
    let kind = PowerUpKind::ALL[ctx.rng.gen_range(0..PowerUpKind::ALL.len())];
    let lane = ctx.rng.gen_range(0..ctx.lanes.lane_count());
    let id = spawn(ctx, kind, lane);
    events.push(GameEvent::PowerUpSpawned { id, kind, lane });
}

/// Advance effects, field items and the spawn roll
pub fn update(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    tick_effects(ctx, events);
    advance_field(ctx, events);
    try_spawn(ctx, events);
}

/// Remove the nearest obstacle ahead of the player in their lane
pub fn clear_nearest_obstacle(ctx: &mut RunContext) -> Option<EntityId> {
    let lane = ctx.player.lane;
    let bottom = ctx.player.rect().bottom();
    let idx = ctx
        .obstacles
        .iter()
        .enumerate()
        .filter(|(_, o)| o.lane == lane && o.y < bottom)
        .max_by(|(_, a), (_, b)| a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)?;
    Some(ctx.obstacles.remove(idx).id)
}

/// Apply a collected power-up
pub fn activate(ctx: &mut RunContext, kind: PowerUpKind, events: &mut Vec<GameEvent>) {
    match kind.duration_secs() {
        Some(secs) => {
            let ticks = constants::secs_to_ticks(secs, ctx.config.tick_rate);
            if let Some(existing) = ctx.effects.iter_mut().find(|e| e.kind == kind) {
                existing.remaining = ticks;
            } else {
                ctx.effects.push(ActiveEffect { kind, remaining: ticks });
            }
        }
        None => {
            if let Some(id) = clear_nearest_obstacle(ctx) {
                events.push(GameEvent::ObstacleCleared { id });
            }
        }
    }
    events.push(GameEvent::PowerUpCollected { kind });
}

/// Collect every power-up overlapping the player
pub fn collect_overlapping(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    let player_rect = ctx.player.rect();
    let mut collected = Vec::new();
    for item in ctx.power_ups.iter_mut() {
        if !item.collected && item.rect().overlaps(&player_rect) {
            item.collected = true;
            collected.push(item.kind);
        }
    }
    ctx.power_ups.retain(|p| !p.collected);
    for kind in collected {
        activate(ctx, kind, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::player;
    use crate::game::modes::{GameMode, RunConfig};
    use crate::game::state::Loadout;
    use crate::game::systems::obstacles::spawn_in_lane;

    fn ctx() -> RunContext {
        RunContext::new(RunConfig::for_mode(GameMode::Infinity, 60), &Loadout::default(), 21)
    }

    #[test]
    fn test_cooldown_blocks_spawn() {
        let mut c = ctx();
        let mut events = Vec::new();
        for _ in 0..899 {
            update(&mut c, &mut events);
        }
        assert!(c.power_ups.is_empty());
        assert!(!events.iter().any(|e| matches!(e, GameEvent::PowerUpSpawned { .. })));
    }

    #[test]
    fn test_at_most_one_on_field() {
        let mut c = ctx();
        let mut events = Vec::new();
        for _ in 0..200_000 {
            update(&mut c, &mut events);
            assert!(c.power_ups.len() <= 1);
        }
        assert!(events.iter().any(|e| matches!(e, GameEvent::PowerUpSpawned { .. })));
    }

    #[test]
    fn test_uncollected_expires() {
        let mut c = ctx();
        let mut events = Vec::new();
        spawn(&mut c, PowerUpKind::Freeze, 0);
        c.power_ups[0].lifetime = 2;
        advance_field(&mut c, &mut events);
        advance_field(&mut c, &mut events);
        assert!(c.power_ups.is_empty());
        assert!(events.iter().any(|e| matches!(e, GameEvent::PowerUpExpired { .. })));
    }

    #[test]
    fn test_collect_activates_effect() {
        let mut c = ctx();
        let mut events = Vec::new();
        let lane = c.player.lane;
        spawn(&mut c, PowerUpKind::StarPower, lane);
        c.power_ups[0].y = player::Y;
        collect_overlapping(&mut c, &mut events);
        assert!(c.power_ups.is_empty());
        assert!(c.has_effect(PowerUpKind::StarPower));
        assert_eq!(c.effects[0].remaining, 300);
    }

    #[test]
    fn test_recollect_refreshes_duration() {
        let mut c = ctx();
        let mut events = Vec::new();
        activate(&mut c, PowerUpKind::Freeze, &mut events);
        c.effects[0].remaining = 5;
        activate(&mut c, PowerUpKind::Freeze, &mut events);
        assert_eq!(c.effects.len(), 1);
        assert_eq!(c.effects[0].remaining, 180);
    }

    #[test]
    fn test_effects_expire() {
        let mut c = ctx();
        let mut events = Vec::new();
        c.effects.push(ActiveEffect { kind: PowerUpKind::SpeedBoost, remaining: 2 });
        tick_effects(&mut c, &mut events);
        assert!(c.has_effect(PowerUpKind::SpeedBoost));
        tick_effects(&mut c, &mut events);
        assert!(!c.has_effect(PowerUpKind::SpeedBoost));
        assert!(events.iter().any(|e| matches!(e, GameEvent::EffectExpired { kind: PowerUpKind::SpeedBoost })));
    }

    #[test]
    fn test_jump_boost_clears_nearest_in_lane() {
        let mut c = ctx();
        let mut events = Vec::new();
        let lane = c.player.lane;
        let far = spawn_in_lane(&mut c, lane);
        let near = spawn_in_lane(&mut c, lane);
        let other_lane = spawn_in_lane(&mut c, 0);
        c.obstacles.iter_mut().find(|o| o.id == near).unwrap().y = 400.0;
        c.obstacles.iter_mut().find(|o| o.id == far).unwrap().y = 100.0;
        c.obstacles.iter_mut().find(|o| o.id == other_lane).unwrap().y = 500.0;

        activate(&mut c, PowerUpKind::JumpBoost, &mut events);

        assert!(c.obstacles.iter().all(|o| o.id != near));
        assert!(c.obstacles.iter().any(|o| o.id == far));
        assert!(c.obstacles.iter().any(|o| o.id == other_lane));
        assert!(c.effects.is_empty());
    }

    #[test]
    fn test_jump_boost_ignores_passed_obstacles() {
        let mut c = ctx();
        let lane = c.player.lane;
        let passed = spawn_in_lane(&mut c, lane);
        c.obstacles[0].y = 600.0;
        assert_eq!(clear_nearest_obstacle(&mut c), None);
        assert_eq!(c.obstacles[0].id, passed);
    }
}

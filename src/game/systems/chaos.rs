//! Chaos mode: a random effect replaces the previous one every few seconds

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::game::constants::{self, chaos::*, player};
use crate::game::game_loop::GameEvent;
use crate::game::state::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChaosEffect {
    /// Obstacle speed multiplied
    SuperSpeed,
    /// Left and right input swapped
    ReverseControls,
    GiantPlayer,
    TinyPlayer,
    /// Player hidden from the render sink; simulation unchanged
    Invisible,
    DoubleScore,
    /// One permanent extra life on application
    ExtraLife,
}

impl ChaosEffect {
    pub const ALL: [ChaosEffect; 7] = [
        ChaosEffect::SuperSpeed,
        ChaosEffect::ReverseControls,
        ChaosEffect::GiantPlayer,
        ChaosEffect::TinyPlayer,
        ChaosEffect::Invisible,
        ChaosEffect::DoubleScore,
        ChaosEffect::ExtraLife,
    ];
}

#[derive(Debug, Clone, Default)]
pub struct ChaosState {
    pub current: Option<ChaosEffect>,
    /// Ticks since the last rotation
    pub ticks_since_rotation: u32,
    pub rotations: u32,
}

fn set_player_size(ctx: &mut RunContext, size: f32) {
    // Keep the bottom edge fixed so the player does not sink off the field
    let bottom = ctx.player.y + ctx.player.h;
    ctx.player.w = size;
    ctx.player.h = size;
    ctx.player.y = bottom - size;
}

fn apply(ctx: &mut RunContext, effect: ChaosEffect) {
    match effect {
        ChaosEffect::GiantPlayer => set_player_size(ctx, GIANT_SIZE),
        ChaosEffect::TinyPlayer => set_player_size(ctx, TINY_SIZE),
        ChaosEffect::ExtraLife => ctx.player.lives += 1,
        _ => {}
    }
    ctx.chaos.current = Some(effect);
}

fn revert(ctx: &mut RunContext) {
    if let Some(ChaosEffect::GiantPlayer | ChaosEffect::TinyPlayer) = ctx.chaos.current {
        set_player_size(ctx, player::SIZE);
    }
    ctx.chaos.current = None;
}

/// Replace the current effect with a different random one
pub fn rotate(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    let previous = ctx.chaos.current;
    revert(ctx);

    let choices: Vec<ChaosEffect> = ChaosEffect::ALL
        .into_iter()
        .filter(|e| Some(*e) != previous)
        .collect();
    let effect = choices[ctx.rng.gen_range(0..choices.len())];

    apply(ctx, effect);
    ctx.chaos.ticks_since_rotation = 0;
    ctx.chaos.rotations += 1;
    debug!("Chaos effect {:?} (rotation {})", effect, ctx.chaos.rotations);
    events.push(GameEvent::ChaosApplied { effect });
}

/// Advance the rotation timer; no-op outside chaos mode
pub fn update(ctx: &mut RunContext, events: &mut Vec<GameEvent>) {
    if !ctx.config.chaos {
        return;
    }
    ctx.chaos.ticks_since_rotation += 1;
    if ctx.chaos.ticks_since_rotation >= constants::secs_to_ticks(ROTATION_SECS, ctx.config.tick_rate) {
        rotate(ctx, events);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::modes::{GameMode, RunConfig};
    use crate::game::state::Loadout;

    fn ctx(mode: GameMode) -> RunContext {
        RunContext::new(RunConfig::for_mode(mode, 60), &Loadout::default(), 17)
    }

    #[test]
    fn test_rotates_every_five_seconds() {
        let mut c = ctx(GameMode::Chaos);
        let mut events = Vec::new();
        for _ in 0..299 {
            update(&mut c, &mut events);
        }
        assert!(c.chaos.current.is_none());
        update(&mut c, &mut events);
        assert!(c.chaos.current.is_some());
        for _ in 0..300 * 5 {
            update(&mut c, &mut events);
        }
        assert_eq!(c.chaos.rotations, 6);
        assert_eq!(events.len(), 6);
    }

    #[test]
    fn test_inactive_outside_chaos() {
        let mut c = ctx(GameMode::Infinity);
        let mut events = Vec::new();
        for _ in 0..1000 {
            update(&mut c, &mut events);
        }
        assert!(c.chaos.current.is_none());
        assert!(events.is_empty());
    }

    #[test]
    fn test_size_effects_revert() {
        let mut c = ctx(GameMode::Chaos);
        let bottom = c.player.y + c.player.h;
        apply(&mut c, ChaosEffect::GiantPlayer);
        assert_eq!(c.player.w, GIANT_SIZE);
        assert_eq!(c.player.y + c.player.h, bottom);
        revert(&mut c);
        assert_eq!(c.player.w, player::SIZE);
        assert_eq!(c.player.y, player::Y);
    }

    #[test]
    fn test_rotation_never_repeats() {
        let mut c = ctx(GameMode::Chaos);
        let mut events = Vec::new();
        let mut prev = None;
        for _ in 0..50 {
            rotate(&mut c, &mut events);
            assert_ne!(c.chaos.current, prev);
            prev = c.chaos.current;
        }
        let expected = match c.chaos.current {
            Some(ChaosEffect::GiantPlayer) => GIANT_SIZE,
            Some(ChaosEffect::TinyPlayer) => TINY_SIZE,
            _ => player::SIZE,
        };
        assert_eq!(c.player.h, expected);
    }

    #[test]
    fn test_extra_life_is_permanent() {
        let mut c = ctx(GameMode::Chaos);
        let lives = c.player.lives;
        apply(&mut c, ChaosEffect::ExtraLife);
        revert(&mut c);
        assert_eq!(c.player.lives, lives + 1);
    }
}

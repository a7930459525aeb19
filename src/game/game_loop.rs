//! One simulation tick in fixed order
//!
//! obstacles -> power-ups -> economy -> mode logic -> bots -> collision -> win/loss.
//! Rendering happens outside, from the snapshot taken after `tick` returns.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::game::constants::{ai as ai_consts, player};
use crate::game::lanes::Lane;
use crate::game::match_result::{self, EndReason, RunOutcome};
use crate::game::modes::RunConfig;
use crate::game::state::{BotId, EntityId, Loadout, PowerUpKind, RunContext};
use crate::game::systems::chaos::ChaosEffect;
use crate::game::systems::collision::Mitigation;
use crate::game::systems::{ai, chaos, collision, economy, obstacles, powerups};

/// Lane change request from the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerInput {
    MoveLeft,
    MoveRight,
}

impl PlayerInput {
    fn delta(&self, reversed: bool) -> i32 {
        let d = match self {
            PlayerInput::MoveLeft => -1,
            PlayerInput::MoveRight => 1,
        };
        if reversed {
            -d
        } else {
            d
        }
    }
}

/// Events emitted during a tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GameEvent {
    ObstacleSpawned { id: EntityId, lane: Lane },
    /// Removed by JumpBoost
    ObstacleCleared { id: EntityId },
    ObstacleMitigated { id: EntityId, by: Mitigation },
    PowerUpSpawned { id: EntityId, kind: PowerUpKind, lane: Lane },
    PowerUpCollected { kind: PowerUpKind },
    PowerUpExpired { id: EntityId, kind: PowerUpKind },
    EffectExpired { kind: PowerUpKind },
    CoinsAwarded { amount: u64, total_this_run: u64 },
    CrystalsAwarded { amount: u64 },
    LevelUp { level: u32 },
    ShieldGranted { ticks: u32 },
    ShieldExpired,
    GhostChargeGranted { charges: u32 },
    LifeLost { remaining: u32 },
    PlayerDied,
    BotEliminated { id: BotId, name: String },
    ChaosApplied { effect: ChaosEffect },
    StageCleared { stage: usize },
    RunFinished { outcome: RunOutcome, reason: EndReason },
}

/// Owns a `RunContext` and advances it tick by tick
pub struct GameLoop {
    ctx: RunContext,
    pending_inputs: Vec<PlayerInput>,
    finished: Option<(RunOutcome, EndReason)>,
}

impl GameLoop {
    pub fn new(config: RunConfig, loadout: &Loadout, seed: u64) -> Self {
        let mut ctx = RunContext::new(config, loadout, seed);
        if ctx.config.bots {
            ctx.bots = ai::build_roster(&ctx.lanes, &mut ctx.rng);
        }
        debug!(
            "Run context ready: mode {}, {} lives, skin {:?}",
            ctx.mode(),
            ctx.player.lives,
            ctx.player.skin
        );
        Self {
            ctx,
            pending_inputs: Vec::new(),
            finished: None,
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.ctx
    }

    /// Queue an input for the next tick
    pub fn queue_input(&mut self, input: PlayerInput) {
        self.pending_inputs.push(input);
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn finished(&self) -> Option<(RunOutcome, EndReason)> {
        self.finished
    }

    fn apply_inputs(&mut self) {
        let reversed = self.ctx.has_chaos(ChaosEffect::ReverseControls);
        for input in self.pending_inputs.drain(..) {
            let ctx = &mut self.ctx;
            ctx.player.lane = ctx.lanes.clamp_lane(ctx.player.lane, input.delta(reversed));
        }
    }

    /// Run one tick. A finished run does not advance.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.finished.is_some() {
            self.pending_inputs.clear();
            return events;
        }

        self.ctx.tick += 1;

        if self.ctx.player.is_alive() {
            self.apply_inputs();
            self.ctx.player.step_motion(&self.ctx.lanes);
        } else {
            self.pending_inputs.clear();
        }

        let ctx = &mut self.ctx;
        obstacles::update(ctx, &mut events);
        powerups::update(ctx, &mut events);
        economy::update(ctx, &mut events);
        chaos::update(ctx, &mut events);
        if ctx.config.bots {
            ai::update(ctx);
        }
        collision::update(ctx, &mut events);

        if let Some((outcome, reason)) = match_result::evaluate(ctx, &mut events) {
            self.finished = Some((outcome, reason));
            events.push(GameEvent::RunFinished { outcome, reason });
        }

        events
    }
}

/// Repair corrupted run state. Returns the number of repairs made.
pub fn sanitize(ctx: &mut RunContext) -> usize {
    let mut repairs = 0;

    if ctx.lanes.validate_or_reset() {
        repairs += 1;
    }
    let lane_count = ctx.lanes.lane_count();

    let p = &mut ctx.player;
    if p.lane >= lane_count {
        warn!("Player lane {} out of range, clamping", p.lane);
        p.lane = lane_count - 1;
        repairs += 1;
    }
    if !p.x.is_finite() || !p.y.is_finite() {
        warn!("Fixed non-finite player position");
        p.x = ctx.lanes.position_of(p.lane);
        p.y = player::Y;
        repairs += 1;
    }
    if !p.w.is_finite() || !p.h.is_finite() || p.w <= 0.0 || p.h <= 0.0 {
        warn!("Fixed invalid player size");
        p.w = player::SIZE;
        p.h = player::SIZE;
        repairs += 1;
    }

    let mut seen = HashSet::new();
    let before = ctx.obstacles.len();
    ctx.obstacles
        .retain(|o| o.lane < lane_count && o.rect().is_finite() && seen.insert(o.id));
    if ctx.obstacles.len() != before {
        warn!("Dropped {} corrupted obstacles", before - ctx.obstacles.len());
        repairs += 1;
    }

    let before = ctx.power_ups.len();
    ctx.power_ups
        .retain(|p| p.lane < lane_count && p.rect().is_finite() && seen.insert(p.id));
    if ctx.power_ups.len() != before {
        warn!("Dropped {} corrupted power-ups", before - ctx.power_ups.len());
        repairs += 1;
    }

    for bot in &mut ctx.bots {
        if bot.lane >= lane_count || bot.target_lane >= lane_count || !bot.x.is_finite() || !bot.y.is_finite() {
            warn!("Fixed corrupted bot {}", bot.name);
            bot.lane = bot.lane.min(lane_count - 1);
            bot.target_lane = bot.lane;
            bot.x = ctx.lanes.position_of(bot.lane);
            if !bot.y.is_finite() {
                bot.y = player::Y;
            }
            repairs += 1;
        }
        if !bot.score.is_finite() {
            bot.score = 0.0;
            repairs += 1;
        }
    }

    if ctx.config.bots && ctx.bots.len() != ai_consts::COUNT {
        warn!("Bot roster has {} entries, expected {}", ctx.bots.len(), ai_consts::COUNT);
        let mut names = HashSet::new();
        ctx.bots.retain(|b| names.insert(b.name.clone()));
        ctx.bots.truncate(ai_consts::COUNT);
        let missing: Vec<_> = ai::build_roster(&ctx.lanes, &mut ctx.rng)
            .into_iter()
            .filter(|b| !names.contains(&b.name))
            .collect();
        ctx.bots.extend(missing);
        ctx.bots.truncate(ai_consts::COUNT);
        repairs += 1;
    }

    if !ctx.economy.score.is_finite() || ctx.economy.score < 0.0 {
        warn!("Fixed invalid score {}", ctx.economy.score);
        ctx.economy.score = ctx.economy.prev_score.max(0.0);
        if !ctx.economy.score.is_finite() {
            ctx.economy.score = 0.0;
        }
        repairs += 1;
    }

    repairs
}

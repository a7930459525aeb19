//! Run result and ranking
//!
//! Evaluates the per-mode end conditions after every tick and builds the
//! final result, including the multiplayer ranking.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game::game_loop::GameEvent;
use crate::game::modes::{GameMode, ModeTarget};
use crate::game::state::RunContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Victory,
    Defeat,
    /// Stopped before any end condition fired
    Abandoned,
}

/// Reason why the run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    PlayerDied,
    /// Score, coin or final stage target reached
    TargetReached,
    /// Multiplayer: every bot is out
    AllBotsEliminated,
    Stopped,
}

/// One participant's line in the final ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub name: String,
    pub rank: u32,
    pub score: f64,
    pub alive: bool,
    pub is_player: bool,
}

/// Final result of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub mode: GameMode,
    pub outcome: RunOutcome,
    pub reason: EndReason,
    pub score: f64,
    pub elapsed_secs: f64,
    pub coins_this_run: u64,
    pub crystals_this_run: u64,
    pub stage: usize,
    pub difficulty_level: u32,
    /// Empty outside multiplayer
    pub rankings: Vec<Ranking>,
}

/// Advance level stages and check the end condition for the run's mode
pub fn evaluate(ctx: &mut RunContext, events: &mut Vec<GameEvent>) -> Option<(RunOutcome, EndReason)> {
    if let ModeTarget::Stages(targets) = ctx.config.target {
        while ctx.stage < targets.len() && ctx.economy.score >= targets[ctx.stage] {
            ctx.stage += 1;
            info!("Stage {} cleared at score {:.0}", ctx.stage, ctx.economy.score);
            events.push(GameEvent::StageCleared { stage: ctx.stage });
        }
    }

    if !ctx.player.is_alive() {
        return Some((RunOutcome::Defeat, EndReason::PlayerDied));
    }

    match ctx.config.target {
        ModeTarget::Score(target) if ctx.economy.score >= target => {
            return Some((RunOutcome::Victory, EndReason::TargetReached));
        }
        ModeTarget::Coins(target) if ctx.economy.coins_this_run >= target => {
            return Some((RunOutcome::Victory, EndReason::TargetReached));
        }
        ModeTarget::Stages(targets) if ctx.stage >= targets.len() => {
            return Some((RunOutcome::Victory, EndReason::TargetReached));
        }
        _ => {}
    }

    if ctx.config.bots && !ctx.bots.is_empty() && ctx.alive_bot_count() == 0 {
        return Some((RunOutcome::Victory, EndReason::AllBotsEliminated));
    }

    None
}

/// Rank the player and bots by descending score
pub fn determine_rankings(ctx: &RunContext, player_name: &str) -> Vec<Ranking> {
    let mut rankings: Vec<Ranking> = std::iter::once(Ranking {
        name: player_name.to_string(),
        rank: 0,
        score: ctx.economy.score,
        alive: ctx.player.is_alive(),
        is_player: true,
    })
    .chain(ctx.bots.iter().map(|b| Ranking {
        name: b.name.clone(),
        rank: 0,
        score: b.score,
        alive: b.alive,
        is_player: false,
    }))
    .collect();

    rankings.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    for (i, ranking) in rankings.iter_mut().enumerate() {
        ranking.rank = (i + 1) as u32;
    }

    rankings
}

/// Build the final result of a run
pub fn determine_result(ctx: &RunContext, player_name: &str, outcome: RunOutcome, reason: EndReason) -> RunResult {
    let rankings = if ctx.config.bots {
        determine_rankings(ctx, player_name)
    } else {
        Vec::new()
    };

    RunResult {
        mode: ctx.mode(),
        outcome,
        reason,
        score: ctx.economy.score,
        elapsed_secs: ctx.elapsed_secs(),
        coins_this_run: ctx.economy.coins_this_run,
        crystals_this_run: ctx.economy.crystals_this_run,
        stage: ctx.stage,
        difficulty_level: ctx.economy.difficulty_level,
        rankings,
    }
}

impl RunResult {
    /// Rank of the player in multiplayer
    pub fn player_rank(&self) -> Option<u32> {
        self.rankings.iter().find(|r| r.is_player).map(|r| r.rank)
    }
}

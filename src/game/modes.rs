//! Run modes and their presets

use serde::{Deserialize, Serialize};

use crate::game::constants::{economy, field, modes, obstacles};

/// Named run configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Infinity,
    Level,
    Multiplayer,
    Chaos,
    Speedrun,
    Survival,
    Coinrush,
    Nightmare,
}

/// How a mode's best value is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BestPolicy {
    /// Final score, higher is better
    HighScore,
    /// Elapsed seconds survived, higher is better
    LongestTime,
    /// Elapsed seconds to reach the target, lower is better; only recorded on victory
    FastestTime,
}

impl GameMode {
    pub const ALL: [GameMode; 8] = [
        GameMode::Infinity,
        GameMode::Level,
        GameMode::Multiplayer,
        GameMode::Chaos,
        GameMode::Speedrun,
        GameMode::Survival,
        GameMode::Coinrush,
        GameMode::Nightmare,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            GameMode::Infinity => "infinity",
            GameMode::Level => "level",
            GameMode::Multiplayer => "multiplayer",
            GameMode::Chaos => "chaos",
            GameMode::Speedrun => "speedrun",
            GameMode::Survival => "survival",
            GameMode::Coinrush => "coinrush",
            GameMode::Nightmare => "nightmare",
        }
    }

    pub fn parse(s: &str) -> Option<GameMode> {
        GameMode::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
    }

    /// Single-life modes ignore permanent upgrades and life boosts
    pub fn has_fixed_lives(&self) -> bool {
        matches!(self, GameMode::Survival | GameMode::Nightmare)
    }

    pub fn best_policy(&self) -> BestPolicy {
        match self {
            GameMode::Speedrun | GameMode::Coinrush => BestPolicy::FastestTime,
            GameMode::Survival => BestPolicy::LongestTime,
            _ => BestPolicy::HighScore,
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode-specific win target
#[derive(Debug, Clone, PartialEq)]
pub enum ModeTarget {
    /// Ends only on death (or all bots dead in multiplayer)
    None,
    /// Victory once score reaches the value
    Score(f64),
    /// Victory once coins earned this run reach the value
    Coins(u64),
    /// Cumulative score thresholds; clearing the last one is a victory
    Stages(&'static [f64]),
}

/// Immutable configuration of one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub mode: GameMode,
    pub tick_rate: u32,
    /// Base obstacle speed before the mode factor
    pub base_speed: f32,
    /// Multiplier on base speed (speedrun starts faster, survival slower)
    pub speed_factor: f32,
    pub score_per_tick: f64,
    /// Forces the starting life count, ignoring permanent upgrades
    pub lives_override: Option<u32>,
    pub target: ModeTarget,
    /// Additional per-tick spawn attempt probability
    pub extra_spawn_chance: f64,
    pub chaos: bool,
    pub bots: bool,
    /// Speed grows with elapsed time on top of the difficulty bonus
    pub survival_ramp: bool,
}

impl RunConfig {
    pub fn for_mode(mode: GameMode, tick_rate: u32) -> Self {
        let base = Self {
            mode,
            tick_rate: tick_rate.clamp(field::MIN_TICK_RATE, field::MAX_TICK_RATE),
            base_speed: obstacles::BASE_SPEED,
            speed_factor: 1.0,
            score_per_tick: economy::SCORE_PER_TICK,
            lives_override: None,
            target: ModeTarget::None,
            extra_spawn_chance: 0.0,
            chaos: false,
            bots: false,
            survival_ramp: false,
        };

        match mode {
            GameMode::Infinity => base,
            GameMode::Level => Self {
                target: ModeTarget::Stages(&modes::LEVEL_TARGETS),
                ..base
            },
            GameMode::Multiplayer => Self { bots: true, ..base },
            GameMode::Chaos => Self { chaos: true, ..base },
            GameMode::Speedrun => Self {
                speed_factor: modes::SPEEDRUN_SPEED_FACTOR,
                target: ModeTarget::Score(modes::SPEEDRUN_TARGET),
                ..base
            },
            GameMode::Survival => Self {
                speed_factor: modes::SURVIVAL_SPEED_FACTOR,
                lives_override: Some(1),
                survival_ramp: true,
                ..base
            },
            GameMode::Coinrush => Self {
                speed_factor: modes::COIN_RUSH_SPEED_FACTOR,
                score_per_tick: economy::COIN_RUSH_SCORE_PER_TICK,
                target: ModeTarget::Coins(modes::COIN_RUSH_TARGET),
                ..base
            },
            GameMode::Nightmare => Self {
                speed_factor: modes::NIGHTMARE_SPEED_FACTOR,
                lives_override: Some(1),
                extra_spawn_chance: modes::NIGHTMARE_EXTRA_SPAWN,
                ..base
            },
        }
    }

    /// Seconds represented by a tick count under this config
    pub fn elapsed_secs(&self, ticks: u64) -> f64 {
        ticks as f64 / self.tick_rate as f64
    }

    /// Base speed bonus for a cleared level stage
    pub fn stage_speed_bonus(&self, stage: usize) -> f32 {
        match self.target {
            ModeTarget::Stages(_) => stage as f32 * modes::LEVEL_STAGE_SPEED_BONUS,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_mode_has_distinct_preset() {
        let presets: Vec<RunConfig> = GameMode::ALL
            .into_iter()
            .map(|m| RunConfig::for_mode(m, 60))
            .collect();
        for (i, a) in presets.iter().enumerate() {
            for b in presets.iter().skip(i + 1) {
                let same = a.speed_factor == b.speed_factor
                    && a.score_per_tick == b.score_per_tick
                    && a.lives_override == b.lives_override
                    && a.target == b.target
                    && a.extra_spawn_chance == b.extra_spawn_chance
                    && a.chaos == b.chaos
                    && a.bots == b.bots
                    && a.survival_ramp == b.survival_ramp;
                assert!(!same, "{} and {} share a preset", a.mode, b.mode);
            }
        }
    }

    #[test]
    fn test_fixed_lives_matches_presets() {
        for mode in GameMode::ALL {
            let config = RunConfig::for_mode(mode, 60);
            assert_eq!(config.lives_override.is_some(), mode.has_fixed_lives(), "{}", mode);
        }
    }

    #[test]
    fn test_coinrush_scores_faster() {
        let rush = RunConfig::for_mode(GameMode::Coinrush, 60);
        let inf = RunConfig::for_mode(GameMode::Infinity, 60);
        assert!(rush.score_per_tick > inf.score_per_tick);
        assert_eq!(rush.target, ModeTarget::Coins(100));
    }

    #[test]
    fn test_tick_rate_is_clamped() {
        assert_eq!(RunConfig::for_mode(GameMode::Infinity, 1).tick_rate, 30);
        assert_eq!(RunConfig::for_mode(GameMode::Infinity, 1000).tick_rate, 120);
    }

    #[test]
    fn test_best_policies() {
        assert_eq!(GameMode::Speedrun.best_policy(), BestPolicy::FastestTime);
        assert_eq!(GameMode::Coinrush.best_policy(), BestPolicy::FastestTime);
        assert_eq!(GameMode::Survival.best_policy(), BestPolicy::LongestTime);
        assert_eq!(GameMode::Nightmare.best_policy(), BestPolicy::HighScore);
    }

    #[test]
    fn test_parse_roundtrip_names() {
        for mode in GameMode::ALL {
            assert_eq!(GameMode::parse(mode.name()), Some(mode));
        }
        assert_eq!(GameMode::parse("SpeedRun"), Some(GameMode::Speedrun));
        assert_eq!(GameMode::parse("arcade"), None);
    }

    #[test]
    fn test_elapsed_secs() {
        let cfg = RunConfig::for_mode(GameMode::Speedrun, 60);
        assert_eq!(cfg.elapsed_secs(120), 2.0);
    }
}

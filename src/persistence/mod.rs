//! Player profile persistence
//!
//! One versioned JSON schema (`Profile`) behind the `ProfileStore` port.
//! Settlement folds a finished run into a profile; checkpoints apply the same
//! fold to the profile loaded at run start, so writes never double-count.

pub mod achievements;
pub mod file;
pub mod memory;
pub mod writer;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PersistenceError;
use crate::game::match_result::{RunOutcome, RunResult};
use crate::game::modes::{BestPolicy, GameMode};
use crate::game::skins::Skin;
use crate::game::state::Loadout;

pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use writer::{SettlementWriter, WriteRequest};

/// Current profile schema version
pub const SCHEMA_VERSION: u32 = 1;

/// One-shot shop boosts, consumed by the next run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Boost {
    /// Faster lane changes
    SpeedBoost,
    /// One additional life
    ExtraShield,
    /// Doubled coin conversion for the whole run
    CoinMagnet,
}

impl Boost {
    /// Whether a run in `mode` applies the boost. Unused boosts stay pending.
    pub fn used_by(&self, mode: GameMode) -> bool {
        match self {
            Boost::ExtraShield => !mode.has_fixed_lives(),
            Boost::SpeedBoost | Boost::CoinMagnet => true,
        }
    }
}

/// Cumulative stats across runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerStats {
    pub games_played: u64,
    pub victories: u64,
    pub total_coins_earned: u64,
    pub best_score: f64,
    pub last_score: f64,
    pub total_play_secs: f64,
}

/// Persisted player profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub version: u32,
    pub coins: u64,
    pub crystals: u64,
    /// Best value per mode; meaning depends on the mode's `BestPolicy`
    pub bests: HashMap<GameMode, f64>,
    pub unlocked_skins: Vec<Skin>,
    pub equipped_skin: Skin,
    /// Permanent shield upgrades
    pub extra_lives: u32,
    pub pending_boosts: Vec<Boost>,
    pub stats: PlayerStats,
    /// Ids of unlocked achievements
    pub achievements: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            coins: 0,
            crystals: 0,
            bests: HashMap::new(),
            unlocked_skins: vec![Skin::Default],
            equipped_skin: Skin::Default,
            extra_lives: 0,
            pending_boosts: Vec::new(),
            stats: PlayerStats::default(),
            achievements: Vec::new(),
        }
    }
}

impl Profile {
    pub fn is_unlocked(&self, skin: Skin) -> bool {
        skin == Skin::Default || self.unlocked_skins.contains(&skin)
    }

    pub fn has_boost(&self, boost: Boost) -> bool {
        self.pending_boosts.contains(&boost)
    }

    pub fn best(&self, mode: GameMode) -> Option<f64> {
        self.bests.get(&mode).copied()
    }

    /// Resolve the run loadout. A locked equipped skin falls back to the default.
    pub fn loadout(&self) -> Loadout {
        let skin = if self.is_unlocked(self.equipped_skin) {
            self.equipped_skin
        } else {
            warn!("Equipped skin {:?} is not unlocked, using default", self.equipped_skin);
            Skin::Default
        };

        Loadout {
            skin,
            extra_lives: self.extra_lives,
            speed_boost: self.has_boost(Boost::SpeedBoost),
            extra_shield: self.has_boost(Boost::ExtraShield),
            coin_magnet: self.has_boost(Boost::CoinMagnet),
            starting_coins: self.coins,
            starting_crystals: self.crystals,
        }
    }

    /// Record the run's best-candidate value. Returns true if it became the new best.
    pub fn record_best(&mut self, result: &RunResult) -> bool {
        let mode = result.mode;
        let current = self.best(mode);
        let (candidate, better) = match mode.best_policy() {
            BestPolicy::HighScore => (result.score, current.map_or(true, |b| result.score > b)),
            BestPolicy::LongestTime => (
                result.elapsed_secs,
                current.map_or(true, |b| result.elapsed_secs > b),
            ),
            BestPolicy::FastestTime => {
                if result.outcome != RunOutcome::Victory {
                    return false;
                }
                (
                    result.elapsed_secs,
                    current.map_or(true, |b| result.elapsed_secs < b),
                )
            }
        };
        if better {
            self.bests.insert(mode, candidate);
        }
        better
    }
}

/// Storage port for the profile
pub trait ProfileStore: Send + Sync {
    fn load_profile(&self) -> Result<Profile, PersistenceError>;
    fn save_profile(&self, profile: &Profile) -> Result<(), PersistenceError>;
}

/// Load the profile, falling back to defaults on any failure
pub fn load_or_default(store: &dyn ProfileStore) -> Profile {
    match store.load_profile() {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Failed to load profile, using defaults: {}", e);
            Profile::default()
        }
    }
}

/// Reject unknown schema versions
pub fn check_version(profile: &Profile) -> Result<(), PersistenceError> {
    if profile.version != SCHEMA_VERSION {
        return Err(PersistenceError::UnsupportedVersion {
            found: profile.version,
            expected: SCHEMA_VERSION,
        });
    }
    Ok(())
}

/// A finished run folded into the profile it started from
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub profile: Profile,
    pub result: RunResult,
    pub new_best: bool,
    /// Achievements unlocked by this run
    pub unlocked: Vec<&'static str>,
}

/// Fold a run result into `base`: currency, bests, stats, boosts, achievements
pub fn settle(base: &Profile, result: &RunResult) -> Settlement {
    let mut profile = base.clone();

    profile.coins += result.coins_this_run;
    profile.crystals += result.crystals_this_run;
    profile.pending_boosts.retain(|b| !b.used_by(result.mode));

    let stats = &mut profile.stats;
    stats.games_played += 1;
    stats.total_coins_earned += result.coins_this_run;
    stats.best_score = stats.best_score.max(result.score);
    stats.last_score = result.score;
    stats.total_play_secs += result.elapsed_secs;
    if result.outcome == RunOutcome::Victory {
        stats.victories += 1;
    }

    let new_best = profile.record_best(result);
    let unlocked = achievements::evaluate(&mut profile, result);

    Settlement {
        profile,
        result: result.clone(),
        new_best,
        unlocked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::match_result::EndReason;

    fn result(mode: GameMode, outcome: RunOutcome, score: f64, elapsed: f64) -> RunResult {
        RunResult {
            mode,
            outcome,
            reason: EndReason::PlayerDied,
            score,
            elapsed_secs: elapsed,
            coins_this_run: (score / 100.0).floor() as u64,
            crystals_this_run: (score / 80.0).floor() as u64,
            stage: 0,
            difficulty_level: 1,
            rankings: Vec::new(),
        }
    }

    #[test]
    fn test_default_profile() {
        let p = Profile::default();
        assert_eq!(p.version, SCHEMA_VERSION);
        assert!(p.is_unlocked(Skin::Default));
        assert!(!p.is_unlocked(Skin::Golden));
        assert!(check_version(&p).is_ok());
    }

    #[test]
    fn test_loadout_rejects_locked_skin() {
        let mut p = Profile {
            equipped_skin: Skin::Tank,
            extra_lives: 2,
            pending_boosts: vec![Boost::CoinMagnet],
            coins: 40,
            ..Default::default()
        };
        let loadout = p.loadout();
        assert_eq!(loadout.skin, Skin::Default);
        assert!(loadout.coin_magnet);
        assert!(!loadout.speed_boost);
        assert_eq!(loadout.extra_lives, 2);
        assert_eq!(loadout.starting_coins, 40);

        p.unlocked_skins.push(Skin::Tank);
        assert_eq!(p.loadout().skin, Skin::Tank);
    }

    #[test]
    fn test_high_score_best() {
        let mut p = Profile::default();
        assert!(p.record_best(&result(GameMode::Infinity, RunOutcome::Defeat, 500.0, 30.0)));
        assert!(!p.record_best(&result(GameMode::Infinity, RunOutcome::Defeat, 400.0, 30.0)));
        assert!(p.record_best(&result(GameMode::Infinity, RunOutcome::Defeat, 600.0, 30.0)));
        assert_eq!(p.best(GameMode::Infinity), Some(600.0));
    }

    #[test]
    fn test_fastest_time_best_only_on_victory() {
        let mut p = Profile::default();
        assert!(!p.record_best(&result(GameMode::Coinrush, RunOutcome::Defeat, 100.0, 5.0)));
        assert_eq!(p.best(GameMode::Coinrush), None);

        assert!(p.record_best(&result(GameMode::Coinrush, RunOutcome::Victory, 10_000.0, 90.0)));
        // Slower run does not replace
        assert!(!p.record_best(&result(GameMode::Coinrush, RunOutcome::Victory, 10_000.0, 95.0)));
        // Strictly lower replaces
        assert!(p.record_best(&result(GameMode::Coinrush, RunOutcome::Victory, 10_000.0, 80.0)));
        assert_eq!(p.best(GameMode::Coinrush), Some(80.0));
        // Equal does not replace
        assert!(!p.record_best(&result(GameMode::Coinrush, RunOutcome::Victory, 10_000.0, 80.0)));
    }

    #[test]
    fn test_longest_time_best() {
        let mut p = Profile::default();
        assert!(p.record_best(&result(GameMode::Survival, RunOutcome::Defeat, 10.0, 42.0)));
        assert!(!p.record_best(&result(GameMode::Survival, RunOutcome::Defeat, 99.0, 41.0)));
        assert_eq!(p.best(GameMode::Survival), Some(42.0));
    }

    #[test]
    fn test_settle_is_pure_over_base() {
        let base = Profile {
            coins: 10,
            pending_boosts: vec![Boost::ExtraShield],
            ..Default::default()
        };
        let r = result(GameMode::Infinity, RunOutcome::Defeat, 2500.0, 166.0);

        let a = settle(&base, &r);
        let b = settle(&base, &r);
        assert_eq!(a.profile, b.profile);
        assert_eq!(base.coins, 10);

        let s = a.profile;
        assert!(s.pending_boosts.is_empty());
        assert_eq!(s.stats.games_played, 1);
        assert_eq!(s.stats.total_coins_earned, 25);
        assert_eq!(s.stats.last_score, 2500.0);
        assert_eq!(s.crystals, 31);
        // 10 + 25 earned + achievement rewards
        assert!(s.coins >= 35);
    }

    #[test]
    fn test_single_life_mode_keeps_life_boost() {
        let base = Profile {
            pending_boosts: vec![Boost::ExtraShield, Boost::CoinMagnet],
            ..Default::default()
        };

        let survival = settle(&base, &result(GameMode::Survival, RunOutcome::Defeat, 300.0, 20.0));
        assert_eq!(survival.profile.pending_boosts, vec![Boost::ExtraShield]);

        let infinity = settle(&survival.profile, &result(GameMode::Infinity, RunOutcome::Defeat, 300.0, 20.0));
        assert!(infinity.profile.pending_boosts.is_empty());
    }

    #[test]
    fn test_profile_json_roundtrip() {
        let mut p = Profile::default();
        p.bests.insert(GameMode::Speedrun, 41.5);
        p.unlocked_skins.push(Skin::Rainbow);
        p.pending_boosts.push(Boost::SpeedBoost);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"speedrun\""));
        assert!(json.contains("\"speedBoost\""));
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_missing_fields_default() {
        let p: Profile = serde_json::from_str(r#"{"version":1,"coins":7}"#).unwrap();
        assert_eq!(p.coins, 7);
        assert_eq!(p.equipped_skin, Skin::Default);
        assert_eq!(p.unlocked_skins, vec![Skin::Default]);
    }
}

//! Achievement rule table, evaluated at settlement

use tracing::debug;

use crate::game::match_result::{RunOutcome, RunResult};
use crate::game::modes::GameMode;
use crate::persistence::Profile;

/// A one-time achievement. The predicate sees the profile after the run's stats are applied.
pub struct AchievementRule {
    pub id: &'static str,
    pub name: &'static str,
    pub reward_coins: u64,
    pub predicate: fn(&Profile, &RunResult) -> bool,
}

fn victory_in(result: &RunResult, mode: GameMode) -> bool {
    result.mode == mode && result.outcome == RunOutcome::Victory
}

pub const RULES: &[AchievementRule] = &[
    AchievementRule {
        id: "first_run",
        name: "First Steps",
        reward_coins: 10,
        predicate: |p, _| p.stats.games_played >= 1,
    },
    AchievementRule {
        id: "score_1000",
        name: "Getting Warm",
        reward_coins: 25,
        predicate: |_, r| r.score >= 1000.0,
    },
    AchievementRule {
        id: "score_5000",
        name: "Marathon",
        reward_coins: 100,
        predicate: |_, r| r.score >= 5000.0,
    },
    AchievementRule {
        id: "coin_hoarder",
        name: "Coin Hoarder",
        reward_coins: 50,
        predicate: |p, _| p.stats.total_coins_earned >= 500,
    },
    AchievementRule {
        id: "survivor",
        name: "Survivor",
        reward_coins: 50,
        predicate: |_, r| r.mode == GameMode::Survival && r.elapsed_secs >= 60.0,
    },
    AchievementRule {
        id: "speed_demon",
        name: "Speed Demon",
        reward_coins: 75,
        predicate: |_, r| victory_in(r, GameMode::Speedrun),
    },
    AchievementRule {
        id: "gold_rush",
        name: "Gold Rush",
        reward_coins: 75,
        predicate: |_, r| victory_in(r, GameMode::Coinrush),
    },
    AchievementRule {
        id: "level_master",
        name: "Level Master",
        reward_coins: 100,
        predicate: |_, r| victory_in(r, GameMode::Level),
    },
    AchievementRule {
        id: "top_runner",
        name: "Top Runner",
        reward_coins: 50,
        predicate: |_, r| r.mode == GameMode::Multiplayer && r.player_rank() == Some(1),
    },
    AchievementRule {
        id: "nightmare_1000",
        name: "Sleepless",
        reward_coins: 100,
        predicate: |_, r| r.mode == GameMode::Nightmare && r.score >= 1000.0,
    },
    AchievementRule {
        id: "veteran",
        name: "Veteran",
        reward_coins: 100,
        predicate: |p, _| p.stats.games_played >= 50,
    },
];

/// Unlock every newly satisfied rule, paying its reward once. Returns the new ids.
pub fn evaluate(profile: &mut Profile, result: &RunResult) -> Vec<&'static str> {
    let mut unlocked = Vec::new();
    for rule in RULES {
        if profile.achievements.iter().any(|a| a == rule.id) {
            continue;
        }
        if (rule.predicate)(profile, result) {
            profile.achievements.push(rule.id.to_string());
            profile.coins += rule.reward_coins;
            debug!("Achievement {} satisfied (+{} coins)", rule.name, rule.reward_coins);
            unlocked.push(rule.id);
        }
    }
    unlocked
}

pub fn find(id: &str) -> Option<&'static AchievementRule> {
    RULES.iter().find(|r| r.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::match_result::{EndReason, Ranking};

    fn result(mode: GameMode, outcome: RunOutcome, score: f64) -> RunResult {
        RunResult {
            mode,
            outcome,
            reason: EndReason::PlayerDied,
            score,
            elapsed_secs: 30.0,
            coins_this_run: 0,
            crystals_this_run: 0,
            stage: 0,
            difficulty_level: 1,
            rankings: Vec::new(),
        }
    }

    #[test]
    fn test_ids_unique() {
        for (i, a) in RULES.iter().enumerate() {
            assert!(RULES.iter().skip(i + 1).all(|b| b.id != a.id));
        }
        assert!(find("speed_demon").is_some());
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_awarded_once() {
        let mut p = Profile::default();
        p.stats.games_played = 1;
        let r = result(GameMode::Infinity, RunOutcome::Defeat, 1200.0);

        let first = evaluate(&mut p, &r);
        assert_eq!(first, vec!["first_run", "score_1000"]);
        assert_eq!(p.coins, 35);

        let second = evaluate(&mut p, &r);
        assert!(second.is_empty());
        assert_eq!(p.coins, 35);
    }

    #[test]
    fn test_mode_victories() {
        let mut p = Profile::default();
        let r = result(GameMode::Speedrun, RunOutcome::Defeat, 900.0);
        assert!(!evaluate(&mut p, &r).contains(&"speed_demon"));
        let r = result(GameMode::Speedrun, RunOutcome::Victory, 1000.0);
        assert!(evaluate(&mut p, &r).contains(&"speed_demon"));
    }

    #[test]
    fn test_top_runner_needs_rank_one() {
        let mut p = Profile::default();
        let mut r = result(GameMode::Multiplayer, RunOutcome::Victory, 100.0);
        r.rankings = vec![
            Ranking { name: "Alpha".into(), rank: 1, score: 200.0, alive: false, is_player: false },
            Ranking { name: "Runner".into(), rank: 2, score: 100.0, alive: true, is_player: true },
        ];
        assert!(!evaluate(&mut p, &r).contains(&"top_runner"));
        r.rankings[0].rank = 2;
        r.rankings[1].rank = 1;
        assert!(evaluate(&mut p, &r).contains(&"top_runner"));
    }
}

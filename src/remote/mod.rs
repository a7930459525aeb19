//! Score service port
//!
//! Runs report their final score and per-mode bests through `ScoreService`.
//! `LocalScoreService` keeps everything in memory; the `remote` feature adds
//! an HTTP client for the account backend.

#[cfg(feature = "remote")]
pub mod http;

use std::future::Future;
use std::time::{SystemTime, UNIX_EPOCH};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RemoteError;
use crate::game::modes::GameMode;
use crate::persistence::Settlement;

#[cfg(feature = "remote")]
pub use http::HttpBackend;

/// Backend key under which a mode's best value is stored
pub fn best_key(mode: GameMode) -> String {
    format!("lane-runner-{}", mode.name())
}

/// Backend key for a mode's submitted scores
pub fn scores_key(mode: GameMode) -> String {
    format!("lane-runner-{}-scores", mode.name())
}

/// One submitted score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub username: String,
    pub score: f64,
    /// Unix milliseconds
    pub submitted_at: u64,
}

/// Leaderboard and per-mode best storage
pub trait ScoreService: Send + Sync {
    fn submit_score(
        &self,
        username: &str,
        score: f64,
        game_id: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn load_best(&self, mode: GameMode) -> impl Future<Output = Result<Option<f64>, RemoteError>> + Send;

    fn save_best(&self, mode: GameMode, value: f64) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// In-process score service
#[derive(Default)]
pub struct LocalScoreService {
    scores: Mutex<HashMap<String, Vec<ScoreEntry>>>,
    bests: Mutex<HashMap<GameMode, f64>>,
}

impl LocalScoreService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest scores first
    pub fn leaderboard(&self, game_id: &str, limit: usize) -> Vec<ScoreEntry> {
        let mut entries = self.scores.lock().get(game_id).cloned().unwrap_or_default();
        entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        entries.truncate(limit);
        entries
    }
}

impl ScoreService for LocalScoreService {
    async fn submit_score(&self, username: &str, score: f64, game_id: &str) -> Result<(), RemoteError> {
        if !score.is_finite() {
            return Err(RemoteError::InvalidResponse(format!("non-finite score {}", score)));
        }
        self.scores
            .lock()
            .entry(game_id.to_string())
            .or_default()
            .push(ScoreEntry {
                username: username.to_string(),
                score,
                submitted_at: now_millis(),
            });
        Ok(())
    }

    async fn load_best(&self, mode: GameMode) -> Result<Option<f64>, RemoteError> {
        Ok(self.bests.lock().get(&mode).copied())
    }

    async fn save_best(&self, mode: GameMode, value: f64) -> Result<(), RemoteError> {
        self.bests.lock().insert(mode, value);
        Ok(())
    }
}

/// Submit a settled run's score, and its best when it set one
pub async fn report_settlement<S: ScoreService>(
    service: &S,
    username: &str,
    settlement: &Settlement,
) -> Result<(), RemoteError> {
    let mode = settlement.result.mode;
    service
        .submit_score(username, settlement.result.score, &scores_key(mode))
        .await?;

    if settlement.new_best {
        if let Some(best) = settlement.profile.best(mode) {
            service.save_best(mode, best).await?;
            debug!("Reported new {} best {:.1}", mode, best);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::match_result::{EndReason, RunOutcome, RunResult};
    use crate::persistence::{settle, Profile};

    fn settlement(mode: GameMode, score: f64, base: &Profile) -> Settlement {
        let result = RunResult {
            mode,
            outcome: RunOutcome::Defeat,
            reason: EndReason::PlayerDied,
            score,
            elapsed_secs: 12.0,
            coins_this_run: 0,
            crystals_this_run: 0,
            stage: 0,
            difficulty_level: 1,
            rankings: Vec::new(),
        };
        settle(base, &result)
    }

    #[test]
    fn test_keys() {
        assert_eq!(best_key(GameMode::Coinrush), "lane-runner-coinrush");
        assert_eq!(scores_key(GameMode::Level), "lane-runner-level-scores");
    }

    #[test]
    fn test_local_best_round_trip() {
        let service = LocalScoreService::new();
        tokio_test::block_on(async {
            assert_eq!(service.load_best(GameMode::Survival).await.unwrap(), None);
            service.save_best(GameMode::Survival, 61.5).await.unwrap();
            assert_eq!(service.load_best(GameMode::Survival).await.unwrap(), Some(61.5));
        });
    }

    #[tokio::test]
    async fn test_local_leaderboard_orders_scores() {
        let service = LocalScoreService::new();
        service.submit_score("a", 10.0, "g").await.unwrap();
        service.submit_score("b", 30.0, "g").await.unwrap();
        service.submit_score("c", 20.0, "g").await.unwrap();
        assert!(service.submit_score("d", f64::NAN, "g").await.is_err());

        let board = service.leaderboard("g", 2);
        let names: Vec<&str> = board.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(service.leaderboard("other", 5).is_empty());
    }

    #[tokio::test]
    async fn test_report_saves_best_only_when_new() {
        let service = LocalScoreService::new();
        let first = settlement(GameMode::Infinity, 500.0, &Profile::default());
        report_settlement(&service, "runner", &first).await.unwrap();
        assert_eq!(service.load_best(GameMode::Infinity).await.unwrap(), Some(500.0));

        let worse = settlement(GameMode::Infinity, 100.0, &first.profile);
        assert!(!worse.new_best);
        report_settlement(&service, "runner", &worse).await.unwrap();
        assert_eq!(service.load_best(GameMode::Infinity).await.unwrap(), Some(500.0));
        assert_eq!(service.leaderboard(&scores_key(GameMode::Infinity), 10).len(), 2);
    }
}

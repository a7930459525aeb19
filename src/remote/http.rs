//! HTTP client for the account and game-data backend
//!
//! Speaks the backend's JSON API under a base URL such as
//! `http://localhost:3000/api`. Authenticated routes send `Authorization: Bearer`.

use parking_lot::RwLock;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::game::modes::GameMode;
use crate::remote::{best_key, ScoreService};

/// Account as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: User,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    user: User,
}

/// A stored game-data blob
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameData {
    pub game_data: serde_json::Value,
    pub last_updated: Option<String>,
}

/// Entry of `GET /user/games`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GameSummary {
    pub game_name: String,
    pub updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GamesResponse {
    games: Vec<GameSummary>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveRequest<'a, T: Serialize> {
    game_name: &'a str,
    game_data: T,
}

/// Oldest submissions are dropped past this many per game key
const MAX_STORED_SCORES: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreRecord {
    username: String,
    score: f64,
    submitted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, Deserialize)]
struct BestRecord {
    best: f64,
}

/// Append a score to the stored list. Unreadable data starts a new list.
fn append_score(stored: Option<serde_json::Value>, record: ScoreRecord) -> Vec<ScoreRecord> {
    let mut scores: Vec<ScoreRecord> = match stored {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            warn!("Stored score list unreadable, starting over: {}", e);
            Vec::new()
        }),
        None => Vec::new(),
    };
    scores.push(record);
    if scores.len() > MAX_STORED_SCORES {
        let excess = scores.len() - MAX_STORED_SCORES;
        scores.drain(..excess);
    }
    scores
}

/// Backend client holding the session token
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
    user: RwLock<Option<User>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
            user: RwLock::new(None),
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.write() = Some(token.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    pub fn logout(&self) {
        self.token.write().take();
        self.user.write().take();
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(&self, request: RequestBuilder) -> Result<RequestBuilder, RemoteError> {
        let token = self.token.read().clone().ok_or(RemoteError::Unauthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            warn!("Backend error: {} - {}", status, message);
            return Err(RemoteError::Backend {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    fn store_session(&self, auth: AuthResponse) -> User {
        *self.token.write() = Some(auth.token);
        *self.user.write() = Some(auth.user.clone());
        auth.user
    }

    pub async fn register(&self, username: &str, password: &str, email: Option<&str>) -> Result<User, RemoteError> {
        let body = serde_json::json!({ "username": username, "password": password, "email": email });
        let response = self.client.post(self.url("/auth/register")).json(&body).send().await?;
        let auth: AuthResponse = Self::parse(response).await?;
        debug!("Registered backend user {}", auth.user.username);
        Ok(self.store_session(auth))
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<User, RemoteError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response = self.client.post(self.url("/auth/login")).json(&body).send().await?;
        let auth: AuthResponse = Self::parse(response).await?;
        debug!("Logged in as {}", auth.user.username);
        Ok(self.store_session(auth))
    }

    pub async fn profile(&self) -> Result<User, RemoteError> {
        let request = self.authed(self.client.get(self.url("/user/profile")))?;
        let profile: ProfileResponse = Self::parse(request.send().await?).await?;
        *self.user.write() = Some(profile.user.clone());
        Ok(profile.user)
    }

    pub async fn save_game_data<T: Serialize>(&self, game_name: &str, data: T) -> Result<(), RemoteError> {
        let body = SaveRequest {
            game_name,
            game_data: data,
        };
        let request = self.authed(self.client.post(self.url("/game/save")))?.json(&body);
        let _: serde_json::Value = Self::parse(request.send().await?).await?;
        Ok(())
    }

    /// `Ok(None)` when nothing is stored under `game_name`
    pub async fn load_game_data(&self, game_name: &str) -> Result<Option<GameData>, RemoteError> {
        let path = format!("/game/load/{}", game_name);
        let response = self.authed(self.client.get(self.url(&path)))?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::parse(response).await.map(Some)
    }

    pub async fn user_games(&self) -> Result<Vec<GameSummary>, RemoteError> {
        let request = self.authed(self.client.get(self.url("/user/games")))?;
        let games: GamesResponse = Self::parse(request.send().await?).await?;
        Ok(games.games)
    }

    /// Whether the backend answers its health check
    pub async fn health(&self) -> bool {
        let response = match self.client.get(self.url("/health")).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Backend health check failed: {}", e);
                return false;
            }
        };
        matches!(Self::parse::<HealthResponse>(response).await, Ok(h) if h.status == "ok")
    }
}

impl ScoreService for HttpBackend {
    async fn submit_score(&self, username: &str, score: f64, game_id: &str) -> Result<(), RemoteError> {
        let record = ScoreRecord {
            username: username.to_string(),
            score,
            submitted_at: chrono::Utc::now(),
        };
        let stored = self.load_game_data(game_id).await?.map(|data| data.game_data);
        let scores = append_score(stored, record);
        debug!("Submitting score {} ({} stored under {})", score, scores.len(), game_id);
        self.save_game_data(game_id, scores).await
    }

    async fn load_best(&self, mode: GameMode) -> Result<Option<f64>, RemoteError> {
        let Some(data) = self.load_game_data(&best_key(mode)).await? else {
            return Ok(None);
        };
        let record: BestRecord = serde_json::from_value(data.game_data)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        Ok(Some(record.best))
    }

    async fn save_best(&self, mode: GameMode, value: f64) -> Result<(), RemoteError> {
        self.save_game_data(&best_key(mode), BestRecord { best: value }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let backend = HttpBackend::new("http://localhost:3000/api/");
        assert_eq!(backend.url("/health"), "http://localhost:3000/api/health");
    }

    #[test]
    fn test_token_lifecycle() {
        let backend = HttpBackend::new("http://localhost:3000/api").with_token("abc");
        assert!(backend.is_authenticated());
        backend.logout();
        assert!(!backend.is_authenticated());
        assert!(matches!(
            backend.authed(backend.client.get(backend.url("/user/games"))),
            Err(RemoteError::Unauthenticated)
        ));
    }

    fn record(username: &str, score: f64) -> ScoreRecord {
        ScoreRecord {
            username: username.to_string(),
            score,
            submitted_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_scores_accumulate() {
        let first = append_score(None, record("a", 10.0));
        let stored = serde_json::to_value(&first).unwrap();
        let second = append_score(Some(stored), record("b", 20.0));

        let names: Vec<&str> = second.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(second[0], first[0]);
    }

    #[test]
    fn test_score_list_capped_and_recovers() {
        let full: Vec<ScoreRecord> = (0..MAX_STORED_SCORES).map(|i| record("p", i as f64)).collect();
        let scores = append_score(Some(serde_json::to_value(&full).unwrap()), record("new", 1e6));
        assert_eq!(scores.len(), MAX_STORED_SCORES);
        assert_eq!(scores[0].score, 1.0);
        assert_eq!(scores.last().map(|r| r.username.as_str()), Some("new"));

        let legacy = serde_json::json!({"username": "old", "score": 5.0});
        assert_eq!(append_score(Some(legacy), record("c", 1.0)).len(), 1);
    }

    #[test]
    fn test_wire_shapes() {
        let auth: AuthResponse = serde_json::from_str(
            r#"{"message":"Login successful","token":"t","user":{"id":3,"username":"zed","email":null,"lastLogin":"2024-01-01"}}"#,
        )
        .unwrap();
        assert_eq!(auth.user.id, 3);
        assert_eq!(auth.user.last_login.as_deref(), Some("2024-01-01"));

        let games: GamesResponse =
            serde_json::from_str(r#"{"games":[{"game_name":"lane-runner-infinity","updated_at":"x"}]}"#).unwrap();
        assert_eq!(games.games[0].game_name, "lane-runner-infinity");

        let save = serde_json::to_value(SaveRequest {
            game_name: "g",
            game_data: BestRecord { best: 4.5 },
        })
        .unwrap();
        assert_eq!(save, serde_json::json!({"gameName": "g", "gameData": {"best": 4.5}}));
    }
}

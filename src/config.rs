use std::path::PathBuf;

use crate::game::constants::field;
use crate::game::modes::GameMode;

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Where the JSON profile lives
    pub profile_path: PathBuf,
    /// Seconds between mid-run checkpoints (0 disables)
    pub autosave_interval_secs: u64,
    /// Fixed seed for reproducible runs
    pub rng_seed: Option<u64>,
    /// Metrics endpoint port (0 disables)
    pub metrics_port: u16,
    pub player_name: String,
    /// Mode the headless runner plays
    pub start_mode: GameMode,
    /// Abandon a headless run after this many seconds (0 = until it ends)
    pub max_run_secs: u64,
    /// Score backend base URL, e.g. `http://localhost:3000/api`
    pub score_api_url: Option<String>,
    pub score_api_token: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: field::TICK_RATE,
            profile_path: PathBuf::from("data/profile.json"),
            autosave_interval_secs: 10,
            rng_seed: None,
            metrics_port: 9090,
            player_name: "Runner".to_string(),
            start_mode: GameMode::Infinity,
            max_run_secs: 300,
            score_api_url: None,
            score_api_token: None,
        }
    }
}

impl EngineConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(rate) = lookup("TICK_RATE") {
            match rate.parse::<u32>() {
                Ok(parsed) if (field::MIN_TICK_RATE..=field::MAX_TICK_RATE).contains(&parsed) => {
                    config.tick_rate = parsed;
                }
                Ok(_) => tracing::warn!(
                    "TICK_RATE must be {}-{}, using default",
                    field::MIN_TICK_RATE,
                    field::MAX_TICK_RATE
                ),
                Err(_) => tracing::warn!("Invalid TICK_RATE '{}', using default", rate),
            }
        }

        if let Some(path) = lookup("PROFILE_PATH") {
            if path.trim().is_empty() {
                tracing::warn!("PROFILE_PATH is empty, using default");
            } else {
                config.profile_path = PathBuf::from(path);
            }
        }

        if let Some(secs) = lookup("AUTOSAVE_INTERVAL_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                config.autosave_interval_secs = parsed;
            } else {
                tracing::warn!("Invalid AUTOSAVE_INTERVAL_SECS '{}', using default", secs);
            }
        }

        if let Some(seed) = lookup("RNG_SEED") {
            if let Ok(parsed) = seed.parse::<u64>() {
                config.rng_seed = Some(parsed);
            } else {
                tracing::warn!("Invalid RNG_SEED '{}', using random seeds", seed);
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.metrics_port = parsed;
            } else {
                tracing::warn!("Invalid METRICS_PORT '{}', using default", port);
            }
        }

        if let Some(name) = lookup("PLAYER_NAME") {
            let name = name.trim();
            if name.is_empty() || name.len() > 32 {
                tracing::warn!("PLAYER_NAME must be 1-32 characters, using default");
            } else {
                config.player_name = name.to_string();
            }
        }

        if let Some(mode) = lookup("START_MODE") {
            if let Some(parsed) = GameMode::parse(&mode) {
                config.start_mode = parsed;
            } else {
                tracing::warn!("Unknown START_MODE '{}', using default", mode);
            }
        }

        if let Some(secs) = lookup("MAX_RUN_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                config.max_run_secs = parsed;
            } else {
                tracing::warn!("Invalid MAX_RUN_SECS '{}', using default", secs);
            }
        }

        if let Some(url) = lookup("SCORE_API_URL") {
            config.score_api_url = Some(url.trim_end_matches('/').to_string());
        }

        if let Some(token) = lookup("SCORE_API_TOKEN") {
            config.score_api_token = Some(token);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if !(field::MIN_TICK_RATE..=field::MAX_TICK_RATE).contains(&self.tick_rate) {
            return Err(format!(
                "tick_rate must be between {} and {}",
                field::MIN_TICK_RATE,
                field::MAX_TICK_RATE
            ));
        }
        if self.profile_path.as_os_str().is_empty() {
            return Err("profile_path cannot be empty".to_string());
        }
        if self.player_name.is_empty() {
            return Err("player_name cannot be empty".to_string());
        }
        if let Some(url) = &self.score_api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("score_api_url must be an http(s) URL".to_string());
            }
        }
        Ok(())
    }

    pub fn autosave_enabled(&self) -> bool {
        cfg!(feature = "autosave") && self.autosave_interval_secs > 0
    }
}

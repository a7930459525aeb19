use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lane_runner_engine::config::EngineConfig;
use lane_runner_engine::error::EngineError;
use lane_runner_engine::game::game_loop::PlayerInput;
use lane_runner_engine::game::lanes::LaneField;
use lane_runner_engine::game::state::FrameSnapshot;
use lane_runner_engine::game::systems::ai;
use lane_runner_engine::game::systems::chaos::ChaosEffect;
use lane_runner_engine::metrics::{self, EngineMetrics};
use lane_runner_engine::persistence::{JsonFileStore, Settlement};
use lane_runner_engine::session::run_manager::RunOptions;
use lane_runner_engine::session::{FrameDriver, InputBufferError, InputSender, RunManager, WatchSink};

/// Why the headless run stopped
enum Exit {
    Finished(Result<Option<Settlement>, EngineError>),
    TimeLimit,
    Signal,
}

/// Steer the player from published frames using the bot danger scan
async fn autopilot(mut frames: watch::Receiver<Option<Arc<FrameSnapshot>>>, inputs: InputSender, seed: u64) {
    let lanes = LaneField::canonical();
    let mut rng = StdRng::seed_from_u64(seed);

    while frames.changed().await.is_ok() {
        let Some(frame) = frames.borrow_and_update().clone() else {
            continue;
        };
        if !frame.player.is_alive() {
            continue;
        }

        let target = ai::autopilot_lane(&lanes, &frame.player, &frame.obstacles, &mut rng);
        let mut input = match target.cmp(&frame.player.lane) {
            Ordering::Less => PlayerInput::MoveLeft,
            Ordering::Greater => PlayerInput::MoveRight,
            Ordering::Equal => continue,
        };
        if frame.chaos_effect == Some(ChaosEffect::ReverseControls) {
            input = match input {
                PlayerInput::MoveLeft => PlayerInput::MoveRight,
                PlayerInput::MoveRight => PlayerInput::MoveLeft,
            };
        }

        match inputs.try_send(input) {
            Ok(()) | Err(InputBufferError::Full) => {}
            Err(InputBufferError::Disconnected) => break,
        }
    }
}

#[cfg(feature = "remote")]
async fn report_remote(config: &EngineConfig, settlement: &Settlement) {
    use lane_runner_engine::remote::{report_settlement, HttpBackend};

    let Some(url) = &config.score_api_url else {
        return;
    };
    let mut backend = HttpBackend::new(url.clone());
    if let Some(token) = &config.score_api_token {
        backend = backend.with_token(token.clone());
    }
    if !backend.health().await {
        warn!("Score backend at {} unreachable, skipping report", url);
        return;
    }
    match report_settlement(&backend, &config.player_name, settlement).await {
        Ok(()) => info!("Score reported to {}", url),
        Err(e) => warn!("Failed to report score: {}", e),
    }
}

#[cfg(not(feature = "remote"))]
async fn report_remote(config: &EngineConfig, _settlement: &Settlement) {
    if config.score_api_url.is_some() {
        warn!("SCORE_API_URL set but the `remote` feature is disabled");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Lane Runner Engine v{}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: mode={}, tick_rate={}, profile={}, autosave={}",
        config.start_mode,
        config.tick_rate,
        config.profile_path.display(),
        config.autosave_enabled()
    );

    let metrics = Arc::new(EngineMetrics::new());
    if config.metrics_port > 0 {
        let metrics_clone = metrics.clone();
        let port = config.metrics_port;
        tokio::spawn(async move {
            if let Err(e) = metrics::start_metrics_server(metrics_clone, port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let store = Arc::new(JsonFileStore::new(&config.profile_path));
    let (sink, frames) = WatchSink::new();
    let manager = RunManager::new(store, Arc::new(sink), RunOptions::from_config(&config), Some(metrics.clone()));
    let mut driver = FrameDriver::new(manager);

    driver.start(config.start_mode).await?;

    if let Some(inputs) = driver.input_sender() {
        let seed = config.rng_seed.unwrap_or_else(rand::random);
        tokio::spawn(autopilot(frames, inputs, seed));
    }

    let max_run_secs = config.max_run_secs;
    let time_limit = async move {
        if max_run_secs > 0 {
            tokio::time::sleep(Duration::from_secs(max_run_secs)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    let exit = tokio::select! {
        result = driver.wait() => Exit::Finished(result),
        _ = time_limit => Exit::TimeLimit,
        _ = tokio::signal::ctrl_c() => Exit::Signal,
    };

    let settlement = match exit {
        Exit::Finished(result) => result?,
        Exit::TimeLimit => {
            info!("Run time limit of {}s reached", max_run_secs);
            driver.stop().await?
        }
        Exit::Signal => {
            info!("Shutdown signal received");
            driver.stop().await?
        }
    };

    if let Some(settlement) = &settlement {
        let result = &settlement.result;
        info!(
            "Final: {} {:?} ({:?}), score {:.0}, {:.1}s, balance {} coins / {} crystals",
            result.mode,
            result.outcome,
            result.reason,
            result.score,
            result.elapsed_secs,
            settlement.profile.coins,
            settlement.profile.crystals
        );
        if let Some(rank) = result.player_rank() {
            info!("Finished rank {} of {}", rank, result.rankings.len());
        }
        report_remote(&config, settlement).await;
    }

    driver.shutdown().await?;
    info!("Engine stopped");

    Ok(())
}

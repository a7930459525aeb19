//! Run lifecycle: start, tick, pause, settle
//!
//! States: `Idle -> Running <-> Paused -> Ended -> Idle`. A run enters `Ended`
//! as soon as its win/loss check fires; `end()` settles it and returns to `Idle`.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::game::constants;
use crate::game::game_loop::{self, GameEvent, GameLoop, PlayerInput};
use crate::game::match_result::{self, EndReason, RunOutcome, RunResult};
use crate::game::modes::{GameMode, RunConfig};
use crate::game::performance::{PerformanceMonitor, PerformanceStatus};
use crate::game::state::FrameSnapshot;
use crate::metrics::EngineMetrics;
use crate::persistence::{self, Profile, ProfileStore, Settlement, SettlementWriter, WriteRequest};
use crate::session::input::{InputBuffer, InputSender};
use crate::session::render::RenderSink;

/// Lifecycle state of the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Paused,
    /// Win/loss reached, waiting for `end()`
    Ended,
}

/// Tunables for a manager
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub player_name: String,
    pub tick_rate: u32,
    /// Base seed; run `n` uses `seed + n`. Random when unset.
    pub seed: Option<u64>,
    /// Seconds between checkpoints (0 disables)
    pub autosave_interval_secs: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            player_name: "Runner".to_string(),
            tick_rate: constants::field::TICK_RATE,
            seed: None,
            autosave_interval_secs: 10,
        }
    }
}

impl RunOptions {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            player_name: config.player_name.clone(),
            tick_rate: config.tick_rate,
            seed: config.rng_seed,
            autosave_interval_secs: config.autosave_interval_secs,
        }
    }
}

/// Orchestrates one run at a time
pub struct RunManager {
    options: RunOptions,
    state: RunState,
    store: Arc<dyn ProfileStore>,
    sink: Arc<dyn RenderSink>,
    writer: SettlementWriter,
    metrics: Option<Arc<EngineMetrics>>,
    inputs: InputBuffer,
    performance: PerformanceMonitor,
    last_status: PerformanceStatus,
    game: Option<GameLoop>,
    /// Profile the current run started from
    base_profile: Option<Profile>,
    /// Latest settled profile; newer than the store while writes are queued
    cached_profile: Option<Profile>,
    runs_started: u64,
}

impl RunManager {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        sink: Arc<dyn RenderSink>,
        options: RunOptions,
        metrics: Option<Arc<EngineMetrics>>,
    ) -> Self {
        let writer = SettlementWriter::spawn(store.clone(), metrics.clone());
        let performance = PerformanceMonitor::new(options.tick_rate);
        Self {
            options,
            state: RunState::Idle,
            store,
            sink,
            writer,
            metrics,
            inputs: InputBuffer::default(),
            performance,
            last_status: PerformanceStatus::Excellent,
            game: None,
            base_profile: None,
            cached_profile: None,
            runs_started: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn game(&self) -> Option<&GameLoop> {
        self.game.as_ref()
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.performance
    }

    pub fn snapshot(&self) -> Option<FrameSnapshot> {
        self.game.as_ref().map(|g| g.context().snapshot())
    }

    /// Sender for input sources outside the tick owner
    pub fn input_sender(&self) -> InputSender {
        self.inputs.sender()
    }

    /// Queue an input for the next tick. Returns false if the buffer is full.
    pub fn input(&self, input: PlayerInput) -> bool {
        self.inputs.try_submit(input)
    }

    fn load_profile(&self) -> Profile {
        match &self.cached_profile {
            Some(profile) => profile.clone(),
            None => persistence::load_or_default(self.store.as_ref()),
        }
    }

    fn next_seed(&self) -> u64 {
        match self.options.seed {
            Some(seed) => seed.wrapping_add(self.runs_started),
            None => rand::thread_rng().gen(),
        }
    }

    /// Start a run in `mode`. Any active run is settled as abandoned first.
    pub fn start(&mut self, mode: GameMode) -> Result<(), EngineError> {
        if !self.sink.is_available() {
            warn!("Cannot start {} run: render target unavailable", mode);
            return Err(EngineError::ResourceUnavailable);
        }

        if self.state != RunState::Idle {
            info!("Settling previous run before starting {}", mode);
            self.end()?;
        }

        let profile = self.load_profile();
        let loadout = profile.loadout();
        let config = RunConfig::for_mode(mode, self.options.tick_rate);
        let seed = self.next_seed();

        self.game = Some(GameLoop::new(config, &loadout, seed));
        self.base_profile = Some(profile);
        self.performance = PerformanceMonitor::new(self.options.tick_rate);
        self.last_status = PerformanceStatus::Excellent;
        let stale = self.inputs.drain().len();
        if stale > 0 {
            debug!("Dropped {} stale inputs", stale);
        }
        self.runs_started += 1;
        self.state = RunState::Running;

        if let Some(metrics) = &self.metrics {
            metrics.runs_started.fetch_add(1, Ordering::Relaxed);
        }
        info!(
            "Run started: mode {}, skin {:?}, {} coins banked, seed {}",
            mode, loadout.skin, loadout.starting_coins, seed
        );
        Ok(())
    }

    /// Advance one tick. Returns the tick's events; empty unless running.
    pub fn tick(&mut self) -> Vec<GameEvent> {
        if self.state != RunState::Running {
            return Vec::new();
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };

        for input in self.inputs.drain() {
            game.queue_input(input);
        }

        let repairs = game_loop::sanitize(game.context_mut());
        if repairs > 0 {
            warn!("Repaired {} corrupted state entries before tick {}", repairs, game.context().tick + 1);
        }

        self.performance.tick_start();
        let events = game.tick();
        let ctx = game.context();
        let entity_count = ctx.obstacles.len() + ctx.power_ups.len() + ctx.bots.len() + 1;
        let duration = self.performance.tick_end(entity_count);

        let frame = Arc::new(ctx.snapshot());
        if let Some(metrics) = &self.metrics {
            if let Some(duration) = duration {
                metrics.record_tick_time(duration);
            }
            metrics.record_performance(&self.performance);
            metrics.record_frame(&frame);
        }
        self.sink.present(frame);

        let finished = game.finished();
        let tick = ctx.tick;

        self.check_performance();

        #[cfg(feature = "autosave")]
        self.maybe_checkpoint(tick);

        if let Some((outcome, reason)) = finished {
            info!("Run over at tick {}: {:?} ({:?})", tick, outcome, reason);
            self.state = RunState::Ended;
        }

        events
    }

    fn check_performance(&mut self) {
        let status = self.performance.status();
        if status.is_degraded() && status > self.last_status {
            warn!("Tick budget degraded: {}", self.performance.status_message());
        }
        self.last_status = status;
    }

    #[cfg(feature = "autosave")]
    fn maybe_checkpoint(&mut self, tick: u64) {
        let interval = self.options.autosave_interval_secs;
        if interval == 0 {
            return;
        }
        let every = constants::secs_to_ticks(interval as f32, self.options.tick_rate).max(1) as u64;
        if tick % every != 0 {
            return;
        }
        if let Some(profile) = self.checkpoint_profile() {
            debug!("Checkpoint at tick {}", tick);
            self.submit(WriteRequest::Checkpoint(profile));
        }
    }

    /// The profile as if the current run settled now
    pub fn checkpoint_profile(&self) -> Option<Profile> {
        let game = self.game.as_ref()?;
        let base = self.base_profile.as_ref()?;
        let partial = self.result_of(game, RunOutcome::Abandoned, EndReason::Stopped);
        Some(persistence::settle(base, &partial).profile)
    }

    fn result_of(&self, game: &GameLoop, outcome: RunOutcome, reason: EndReason) -> RunResult {
        match_result::determine_result(game.context(), &self.options.player_name, outcome, reason)
    }

    fn submit(&self, request: WriteRequest) {
        if let Err(e) = self.writer.submit(request) {
            error!("Failed to queue profile write: {}", e);
            if let Some(metrics) = &self.metrics {
                metrics.record_write(false);
            }
        }
    }

    pub fn pause(&mut self) -> Result<(), EngineError> {
        if self.state != RunState::Running {
            return Err(EngineError::InvalidState {
                action: "pause",
                state: self.state,
            });
        }
        self.state = RunState::Paused;
        info!("Run paused");
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), EngineError> {
        if self.state != RunState::Paused {
            return Err(EngineError::InvalidState {
                action: "resume",
                state: self.state,
            });
        }
        self.state = RunState::Running;
        info!("Run resumed");
        Ok(())
    }

    /// Settle the run and return to `Idle`. An unfinished run settles as abandoned.
    pub fn end(&mut self) -> Result<Settlement, EngineError> {
        let Some(game) = self.game.take() else {
            return Err(EngineError::InvalidState {
                action: "end",
                state: self.state,
            });
        };
        self.state = RunState::Ended;

        let (outcome, reason) = game
            .finished()
            .unwrap_or((RunOutcome::Abandoned, EndReason::Stopped));
        let result = self.result_of(&game, outcome, reason);
        let base = self.base_profile.take().unwrap_or_default();
        let settlement = persistence::settle(&base, &result);

        if settlement.new_best {
            if let Some(best) = settlement.profile.best(result.mode) {
                info!("New {} best: {:.1}", result.mode, best);
            }
        }
        for id in &settlement.unlocked {
            if let Some(rule) = persistence::achievements::find(id) {
                info!("Achievement unlocked: {} (+{} coins)", rule.name, rule.reward_coins);
            }
        }

        self.cached_profile = Some(settlement.profile.clone());
        self.submit(WriteRequest::Settle(Box::new(settlement.clone())));

        if let Some(metrics) = &self.metrics {
            metrics.runs_ended.fetch_add(1, Ordering::Relaxed);
        }
        info!(
            "Run settled: {} {:?}, score {:.0}, +{} coins, +{} crystals, {:.1}s",
            result.mode,
            result.outcome,
            result.score,
            result.coins_this_run,
            result.crystals_this_run,
            result.elapsed_secs
        );

        self.state = RunState::Idle;
        Ok(settlement)
    }

    /// Settle any active run and flush pending writes
    pub fn shutdown(&mut self) {
        if self.game.is_some() {
            if let Err(e) = self.end() {
                warn!("Failed to settle run on shutdown: {}", e);
            }
        }
        self.writer.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::Obstacle;
    use crate::persistence::MemoryStore;
    use crate::session::render::{NullSink, UnavailableSink, WatchSink};

    fn options() -> RunOptions {
        RunOptions {
            player_name: "Tester".into(),
            seed: Some(7),
            autosave_interval_secs: 0,
            ..Default::default()
        }
    }

    fn manager(store: Arc<MemoryStore>) -> RunManager {
        RunManager::new(store, Arc::new(NullSink), options(), None)
    }

    fn game_mut(m: &mut RunManager) -> &mut GameLoop {
        m.game.as_mut().unwrap()
    }

    #[test]
    fn test_lifecycle() {
        let mut m = manager(Arc::new(MemoryStore::new()));
        assert_eq!(m.state(), RunState::Idle);
        assert!(m.pause().is_err());
        assert!(m.end().is_err());

        m.start(GameMode::Infinity).unwrap();
        assert_eq!(m.state(), RunState::Running);
        m.tick();
        m.pause().unwrap();
        let tick = m.game().unwrap().context().tick;
        m.tick();
        assert_eq!(m.game().unwrap().context().tick, tick);
        assert!(m.pause().is_err());
        m.resume().unwrap();
        m.tick();
        assert_eq!(m.game().unwrap().context().tick, tick + 1);

        let s = m.end().unwrap();
        assert_eq!(s.result.outcome, RunOutcome::Abandoned);
        assert_eq!(s.result.reason, EndReason::Stopped);
        assert_eq!(m.state(), RunState::Idle);
        assert!(m.game().is_none());
    }

    #[test]
    fn test_unavailable_sink_fails_without_mutation() {
        let store = Arc::new(MemoryStore::new());
        let mut m = RunManager::new(store.clone(), Arc::new(UnavailableSink), options(), None);

        assert!(matches!(m.start(GameMode::Infinity), Err(EngineError::ResourceUnavailable)));
        assert_eq!(m.state(), RunState::Idle);
        assert!(m.game().is_none());
        assert!(m.base_profile.is_none());
        assert!(m.tick().is_empty());

        m.shutdown();
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_frames_reach_sink() {
        let (sink, rx) = WatchSink::new();
        let mut m = RunManager::new(Arc::new(MemoryStore::new()), Arc::new(sink), options(), None);
        m.start(GameMode::Infinity).unwrap();
        m.tick();
        m.tick();
        assert_eq!(rx.borrow().as_ref().map(|f| f.tick), Some(2));
    }

    #[test]
    fn test_inputs_apply_on_tick() {
        let mut m = manager(Arc::new(MemoryStore::new()));
        m.start(GameMode::Infinity).unwrap();
        let sender = m.input_sender();
        sender.try_send(PlayerInput::MoveLeft).unwrap();
        assert!(m.input(PlayerInput::MoveLeft));
        m.tick();
        assert_eq!(m.game().unwrap().context().player.lane, 0);
    }

    #[test]
    fn test_multiplayer_ranking_on_player_death() {
        let mut m = manager(Arc::new(MemoryStore::new()));
        m.start(GameMode::Multiplayer).unwrap();
        {
            let ctx = game_mut(&mut m).context_mut();
            assert_eq!(ctx.bots.len(), 4);
            ctx.economy.score = 600.0;
            let scores = [1000.0, 500.0, 200.0, 100.0];
            for (bot, score) in ctx.bots.iter_mut().zip(scores) {
                bot.score = score;
            }
            ctx.player.lives = 0;
        }

        m.tick();
        assert_eq!(m.state(), RunState::Ended);

        let s = m.end().unwrap();
        assert_eq!(s.result.outcome, RunOutcome::Defeat);
        assert_eq!(s.result.reason, EndReason::PlayerDied);
        assert_eq!(s.result.rankings.len(), 5);
        assert_eq!(s.result.player_rank(), Some(2));
        assert!(s.result.rankings.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_coinrush_best_time_only_improves() {
        let mut m = manager(Arc::new(MemoryStore::new()));

        let finish_at = |m: &mut RunManager, tick: u64| {
            m.start(GameMode::Coinrush).unwrap();
            let ctx = game_mut(m).context_mut();
            ctx.tick = tick;
            ctx.economy.coins_this_run = 100;
            m.tick();
            assert_eq!(m.state(), RunState::Ended);
            m.end().unwrap()
        };

        let first = finish_at(&mut m, 600);
        assert_eq!(first.result.outcome, RunOutcome::Victory);
        assert!(first.new_best);
        let best = first.profile.best(GameMode::Coinrush).unwrap();

        let slower = finish_at(&mut m, 1200);
        assert!(!slower.new_best);
        assert_eq!(slower.profile.best(GameMode::Coinrush), Some(best));

        let faster = finish_at(&mut m, 300);
        assert!(faster.new_best);
        assert!(faster.profile.best(GameMode::Coinrush).unwrap() < best);
    }

    #[test]
    fn test_tank_scenario_through_manager() {
        let store = Arc::new(MemoryStore::with_profile(Profile {
            unlocked_skins: vec![crate::game::skins::Skin::Default, crate::game::skins::Skin::Tank],
            equipped_skin: crate::game::skins::Skin::Tank,
            ..Default::default()
        }));
        let mut m = manager(store);
        m.start(GameMode::Infinity).unwrap();
        let lives = {
            let ctx = game_mut(&mut m).context_mut();
            let id = ctx.alloc_id();
            let mut obstacle = Obstacle::new(id, ctx.player.lane, ctx.player.x);
            obstacle.y = ctx.player.y;
            ctx.obstacles.push(obstacle);
            ctx.player.lives
        };

        m.tick();
        let ctx = m.game().unwrap().context();
        assert!(ctx.obstacles.iter().all(|o| o.y > ctx.player.y + ctx.player.h || o.y < 0.0));
        assert_eq!(ctx.player.lives, lives);
        assert_eq!(ctx.economy.coins_this_run, 2);
    }

    #[test]
    fn test_settlement_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let mut m = manager(store.clone());
        m.start(GameMode::Infinity).unwrap();
        game_mut(&mut m).context_mut().economy.score = 1999.0;
        for _ in 0..10 {
            m.tick();
        }
        let s = m.end().unwrap();
        assert!(s.profile.coins > 0);
        m.shutdown();
        assert_eq!(store.current(), Some(s.profile.clone()));

        // Fresh manager over the same store starts from the settled balance
        let mut fresh = manager(store);
        fresh.start(GameMode::Infinity).unwrap();
        let ctx = fresh.game().unwrap().context();
        assert_eq!(ctx.economy.starting_coins, s.profile.coins);
        assert_eq!(ctx.economy.starting_crystals, s.profile.crystals);
        assert_eq!(fresh.base_profile.as_ref().map(|p| p.bests.clone()), Some(s.profile.bests));
    }

    #[test]
    fn test_back_to_back_runs_do_not_lose_coins() {
        let mut m = manager(Arc::new(MemoryStore::new()));
        m.start(GameMode::Infinity).unwrap();
        game_mut(&mut m).context_mut().economy.score = 450.0;
        m.tick();
        let first = m.end().unwrap();

        m.start(GameMode::Infinity).unwrap();
        assert_eq!(m.game().unwrap().context().economy.starting_coins, first.profile.coins);
    }

    #[test]
    fn test_start_while_running_settles_previous() {
        let mut m = manager(Arc::new(MemoryStore::new()));
        m.start(GameMode::Infinity).unwrap();
        m.tick();
        m.start(GameMode::Chaos).unwrap();
        assert_eq!(m.state(), RunState::Running);
        assert_eq!(m.game().unwrap().context().mode(), GameMode::Chaos);
        assert_eq!(m.cached_profile.as_ref().map(|p| p.stats.games_played), Some(1));
    }

    #[test]
    fn test_checkpoint_matches_settlement_base() {
        let mut m = manager(Arc::new(MemoryStore::new()));
        m.start(GameMode::Infinity).unwrap();
        game_mut(&mut m).context_mut().economy.score = 250.0;
        m.tick();

        let a = m.checkpoint_profile().unwrap();
        let b = m.checkpoint_profile().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.stats.games_played, 1);

        let s = m.end().unwrap();
        assert_eq!(s.profile.coins, a.coins);
    }

    #[cfg(feature = "autosave")]
    #[test]
    fn test_autosave_writes_checkpoints() {
        let store = Arc::new(MemoryStore::new());
        let opts = RunOptions {
            autosave_interval_secs: 1,
            tick_rate: 30,
            ..options()
        };
        let mut m = RunManager::new(store.clone(), Arc::new(NullSink), opts, None);
        m.start(GameMode::Infinity).unwrap();
        // Keep the field clear so the run cannot end
        for _ in 0..90 {
            game_mut(&mut m).context_mut().obstacles.clear();
            m.tick();
        }
        m.writer.shutdown();
        assert_eq!(store.save_count(), 3);
    }
}

//! Frame driver: ticks a `RunManager` on a fixed interval
//!
//! The spawned task owns the manager for the length of a run and hands it back
//! through its `JoinHandle`. Ticks never overlap: each one completes before the
//! interval is awaited again, and missed ticks are skipped rather than bunched.

use std::time::{Duration, Instant};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::game::game_loop::{GameEvent, PlayerInput};
use crate::game::modes::GameMode;
use crate::persistence::Settlement;
use crate::session::input::InputSender;
use crate::session::run_manager::{RunManager, RunState};

/// Control messages for a running driver task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    Pause,
    Resume,
    Stop,
}

/// What the task returns when it exits
type TaskOutput = (RunManager, Option<Settlement>);

/// Live task plus its channels
pub struct DriverHandle {
    commands: mpsc::UnboundedSender<DriverCommand>,
    inputs: InputSender,
    task: JoinHandle<TaskOutput>,
}

/// Owns the single tick task. Starting a run stops the previous one first.
pub struct FrameDriver {
    manager: Option<RunManager>,
    handle: Option<DriverHandle>,
    state_tx: watch::Sender<RunState>,
}

impl FrameDriver {
    pub fn new(manager: RunManager) -> Self {
        let (state_tx, _) = watch::channel(manager.state());
        Self {
            manager: Some(manager),
            handle: None,
            state_tx,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.task.is_finished())
    }

    /// The manager while no task holds it
    pub fn manager(&self) -> Option<&RunManager> {
        self.manager.as_ref()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<RunState> {
        self.state_tx.subscribe()
    }

    /// Start a run on a fresh task. Returns the settlement of a run it replaced.
    pub async fn start(&mut self, mode: GameMode) -> Result<Option<Settlement>, EngineError> {
        let previous = if self.handle.is_some() {
            self.stop().await?
        } else {
            None
        };

        let mut manager = self
            .manager
            .take()
            .ok_or_else(|| EngineError::DriverFailed("run manager lost".into()))?;

        if let Err(e) = manager.start(mode) {
            self.manager = Some(manager);
            return Err(e);
        }

        let (commands, receiver) = mpsc::unbounded_channel();
        let inputs = manager.input_sender();
        self.state_tx.send_replace(manager.state());
        let task = tokio::spawn(run_loop(manager, receiver, self.state_tx.clone()));

        self.handle = Some(DriverHandle {
            commands,
            inputs,
            task,
        });
        Ok(previous)
    }

    /// Input handle for the running task, for sources living on other tasks
    pub fn input_sender(&self) -> Option<InputSender> {
        self.handle.as_ref().map(|h| h.inputs.clone())
    }

    /// Forward a lane change to the running task
    pub fn input(&self, input: PlayerInput) -> bool {
        match &self.handle {
            Some(handle) => handle.inputs.try_send(input).is_ok(),
            None => false,
        }
    }

    pub fn send(&self, command: DriverCommand) -> bool {
        match &self.handle {
            Some(handle) => handle.commands.send(command).is_ok(),
            None => false,
        }
    }

    pub fn pause(&self) -> bool {
        self.send(DriverCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(DriverCommand::Resume)
    }

    /// Halt the task, wait for it, and take the manager back
    pub async fn stop(&mut self) -> Result<Option<Settlement>, EngineError> {
        if let Some(handle) = &self.handle {
            // Already-exited tasks have dropped the receiver
            let _ = handle.commands.send(DriverCommand::Stop);
        }
        self.join().await
    }

    /// Wait for the run to finish on its own
    pub async fn wait(&mut self) -> Result<Option<Settlement>, EngineError> {
        self.join().await
    }

    /// Cancel-safe: the handle is only released once the task has been joined
    async fn join(&mut self) -> Result<Option<Settlement>, EngineError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(None);
        };
        let joined = (&mut handle.task).await;
        self.handle = None;
        match joined {
            Ok((manager, settlement)) => {
                self.state_tx.send_replace(manager.state());
                self.manager = Some(manager);
                Ok(settlement)
            }
            Err(e) => Err(EngineError::DriverFailed(e.to_string())),
        }
    }

    /// Stop any run and flush pending profile writes
    pub async fn shutdown(mut self) -> Result<(), EngineError> {
        self.stop().await?;
        if let Some(mut manager) = self.manager.take() {
            tokio::task::spawn_blocking(move || manager.shutdown())
                .await
                .map_err(|e| EngineError::DriverFailed(e.to_string()))?;
        }
        Ok(())
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::LifeLost { remaining } => debug!("Life lost, {} remaining", remaining),
        GameEvent::BotEliminated { name, .. } => debug!("Bot {} eliminated", name),
        GameEvent::LevelUp { level } => debug!("Difficulty level {}", level),
        GameEvent::ChaosApplied { effect } => debug!("Chaos effect {:?}", effect),
        GameEvent::PowerUpCollected { kind } => debug!("Collected {:?}", kind),
        _ => {}
    }
}

async fn run_loop(
    mut manager: RunManager,
    mut commands: mpsc::UnboundedReceiver<DriverCommand>,
    state_tx: watch::Sender<RunState>,
) -> TaskOutput {
    let tick_rate = manager.options().tick_rate.max(1);
    let mut ticker = interval(Duration::from_secs_f64(1.0 / tick_rate as f64));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Frame driver started at {} Hz", tick_rate);
    let start = Instant::now();
    let stats_every = tick_rate as u64 * 30;
    let mut tick_count: u64 = 0;

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                let result = match command {
                    Some(DriverCommand::Pause) => manager.pause(),
                    Some(DriverCommand::Resume) => manager.resume(),
                    Some(DriverCommand::Stop) | None => break,
                };
                if let Err(e) = result {
                    debug!("Ignored driver command: {}", e);
                }
            }

            _ = ticker.tick() => {
                if manager.state() != RunState::Running {
                    continue;
                }

                let events = manager.tick();
                tick_count += 1;
                events.iter().for_each(log_event);

                if tick_count % stats_every == 0 {
                    if let Some(game) = manager.game() {
                        let ctx = game.context();
                        info!(
                            "Run: {}s, tick {}, score {:.0}, balance {}c/{}x, {} obstacles, {} bots alive | Perf: {:?} ({:.1}%)",
                            start.elapsed().as_secs(),
                            ctx.tick,
                            ctx.economy.score,
                            ctx.economy.total_coins(),
                            ctx.economy.total_crystals(),
                            ctx.obstacles.len(),
                            ctx.alive_bot_count(),
                            manager.performance().status(),
                            manager.performance().budget_usage_percent()
                        );
                    }
                }

                if manager.state() == RunState::Ended {
                    break;
                }
            }
        }
        state_tx.send_if_modified(|state| {
            let changed = *state != manager.state();
            *state = manager.state();
            changed
        });
    }

    let settlement = match manager.end() {
        Ok(settlement) => Some(settlement),
        Err(e) => {
            warn!("Run ended without settlement: {}", e);
            None
        }
    };
    state_tx.send_replace(manager.state());
    info!("Frame driver stopped after {} ticks", tick_count);
    (manager, settlement)
}

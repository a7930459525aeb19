//! Background profile writer
//!
//! Checkpoints and settlements are queued over an unbounded channel and written
//! by a dedicated thread, so the tick path never waits on storage.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Sender};
use tracing::{debug, error, info};

use crate::error::PersistenceError;
use crate::metrics::EngineMetrics;
use crate::persistence::{Profile, ProfileStore, Settlement};

/// A queued profile write
#[derive(Debug)]
pub enum WriteRequest {
    /// Mid-run save of the profile as if the run settled now
    Checkpoint(Profile),
    /// Final settlement of a run
    Settle(Box<Settlement>),
}

impl WriteRequest {
    fn profile(&self) -> &Profile {
        match self {
            WriteRequest::Checkpoint(profile) => profile,
            WriteRequest::Settle(settlement) => &settlement.profile,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            WriteRequest::Checkpoint(_) => "checkpoint",
            WriteRequest::Settle(_) => "settlement",
        }
    }
}

/// Owns the writer thread. Dropping the last sender ends it.
pub struct SettlementWriter {
    sender: Option<Sender<WriteRequest>>,
    handle: Option<JoinHandle<()>>,
}

impl SettlementWriter {
    pub fn spawn(store: Arc<dyn ProfileStore>, metrics: Option<Arc<EngineMetrics>>) -> Self {
        let (sender, receiver) = unbounded::<WriteRequest>();

        let handle = std::thread::Builder::new()
            .name("profile-writer".into())
            .spawn(move || {
                for request in receiver.iter() {
                    let result = store.save_profile(request.profile());
                    if let Some(metrics) = &metrics {
                        metrics.record_write(result.is_ok());
                    }
                    match result {
                        Ok(()) => debug!("Profile {} written", request.label()),
                        Err(e) => error!("Profile {} write failed: {}", request.label(), e),
                    }
                }
                debug!("Profile writer stopped");
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("Failed to start profile writer thread: {}", e);
                None
            }
        };

        Self {
            sender: handle.as_ref().map(|_| sender),
            handle,
        }
    }

    /// Queue a write without blocking
    pub fn submit(&self, request: WriteRequest) -> Result<(), PersistenceError> {
        let sender = self.sender.as_ref().ok_or(PersistenceError::WriterClosed)?;
        sender.send(request).map_err(|_| PersistenceError::WriterClosed)
    }

    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// Flush queued writes and stop the thread
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Profile writer thread panicked");
            } else {
                info!("Profile writer flushed");
            }
        }
    }
}

impl Drop for SettlementWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::game::match_result::{EndReason, RunOutcome, RunResult};
    use crate::game::modes::GameMode;
    use crate::persistence::{settle, MemoryStore};

    fn run_result() -> RunResult {
        RunResult {
            mode: GameMode::Infinity,
            outcome: RunOutcome::Defeat,
            reason: EndReason::PlayerDied,
            score: 450.0,
            elapsed_secs: 30.0,
            coins_this_run: 4,
            crystals_this_run: 5,
            stage: 0,
            difficulty_level: 1,
            rankings: Vec::new(),
        }
    }

    #[test]
    fn test_writes_in_order() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = SettlementWriter::spawn(store.clone(), None);

        let base = Profile::default();
        let mut checkpoint = base.clone();
        checkpoint.coins = 2;
        writer.submit(WriteRequest::Checkpoint(checkpoint)).unwrap();

        let settlement = settle(&base, &run_result());
        let expected = settlement.profile.clone();
        writer.submit(WriteRequest::Settle(Box::new(settlement))).unwrap();

        writer.shutdown();
        assert_eq!(store.save_count(), 2);
        assert_eq!(store.current(), Some(expected));
    }

    #[test]
    fn test_failures_counted() {
        let store = Arc::new(MemoryStore::new());
        store.set_fail_writes(true);
        let metrics = Arc::new(EngineMetrics::new());
        let mut writer = SettlementWriter::spawn(store.clone(), Some(metrics.clone()));

        writer.submit(WriteRequest::Checkpoint(Profile::default())).unwrap();
        writer.shutdown();

        assert_eq!(metrics.persistence_failures.load(Ordering::Relaxed), 1);
        assert_eq!(store.save_count(), 0);
    }

    #[test]
    fn test_submit_after_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let mut writer = SettlementWriter::spawn(store, None);
        writer.shutdown();
        assert!(!writer.is_running());
        assert!(matches!(
            writer.submit(WriteRequest::Checkpoint(Profile::default())),
            Err(PersistenceError::WriterClosed)
        ));
    }
}

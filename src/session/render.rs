//! Render sink port

use std::sync::Arc;

use tokio::sync::watch;

use crate::game::state::FrameSnapshot;

/// Receives an immutable snapshot after every tick
pub trait RenderSink: Send + Sync {
    /// Whether a render target exists. Runs refuse to start without one.
    fn is_available(&self) -> bool;

    fn present(&self, frame: Arc<FrameSnapshot>);
}

/// Accepts and drops every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn is_available(&self) -> bool {
        true
    }

    fn present(&self, _frame: Arc<FrameSnapshot>) {}
}

/// Reports no render target
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSink;

impl RenderSink for UnavailableSink {
    fn is_available(&self) -> bool {
        false
    }

    fn present(&self, _frame: Arc<FrameSnapshot>) {}
}

/// Publishes the latest frame on a watch channel
pub struct WatchSink {
    sender: watch::Sender<Option<Arc<FrameSnapshot>>>,
}

impl WatchSink {
    pub fn new() -> (Self, watch::Receiver<Option<Arc<FrameSnapshot>>>) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<FrameSnapshot>>> {
        self.sender.subscribe()
    }
}

impl RenderSink for WatchSink {
    fn is_available(&self) -> bool {
        true
    }

    fn present(&self, frame: Arc<FrameSnapshot>) {
        // No receivers is fine; the latest frame is still retained
        self.sender.send_replace(Some(frame));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::modes::{GameMode, RunConfig};
    use crate::game::state::{Loadout, RunContext};

    fn frame(tick: u64) -> Arc<FrameSnapshot> {
        let mut ctx = RunContext::new(RunConfig::for_mode(GameMode::Infinity, 60), &Loadout::default(), 1);
        ctx.tick = tick;
        Arc::new(ctx.snapshot())
    }

    #[test]
    fn test_availability() {
        assert!(NullSink.is_available());
        assert!(!UnavailableSink.is_available());
    }

    #[test]
    fn test_watch_sink_keeps_latest() {
        let (sink, rx) = WatchSink::new();
        assert!(rx.borrow().is_none());

        sink.present(frame(1));
        sink.present(frame(2));

        let latest = rx.borrow().clone();
        assert_eq!(latest.map(|f| f.tick), Some(2));
        assert_eq!(sink.subscribe().borrow().as_ref().map(|f| f.tick), Some(2));
    }
}

//! Lock-free input buffer
//!
//! Input sources submit through cloned `InputSender`s; the tick owner drains
//! everything pending at the start of each tick.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::game::game_loop::PlayerInput;

/// Bounded MPSC queue of player inputs
pub struct InputBuffer {
    sender: Sender<PlayerInput>,
    receiver: Receiver<PlayerInput>,
    capacity: usize,
}

impl InputBuffer {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
        }
    }

    /// Create a sender handle for an input source
    pub fn sender(&self) -> InputSender {
        InputSender {
            sender: self.sender.clone(),
        }
    }

    /// Try to submit an input (non-blocking). Returns false if the buffer is full.
    #[inline]
    pub fn try_submit(&self, input: PlayerInput) -> bool {
        self.sender.try_send(input).is_ok()
    }

    /// Drain all pending inputs in submission order
    pub fn drain(&self) -> Vec<PlayerInput> {
        self.receiver.try_iter().collect()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InputBuffer {
    fn default() -> Self {
        // A human presses a lane key a handful of times per tick at most
        Self::new(64)
    }
}

/// Clonable sender handle
#[derive(Clone)]
pub struct InputSender {
    sender: Sender<PlayerInput>,
}

impl InputSender {
    #[inline]
    pub fn try_send(&self, input: PlayerInput) -> Result<(), InputBufferError> {
        self.sender.try_send(input).map_err(|e| match e {
            TrySendError::Full(_) => InputBufferError::Full,
            TrySendError::Disconnected(_) => InputBufferError::Disconnected,
        })
    }
}

/// Input buffer errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputBufferError {
    /// Buffer is full (backpressure)
    Full,
    /// Tick owner gone
    Disconnected,
}

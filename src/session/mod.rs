//! Run orchestration
//!
//! `RunManager` owns one run's lifecycle; `FrameDriver` ticks it on a tokio
//! interval. Frames leave through a `RenderSink`, inputs arrive through an
//! `InputBuffer`.

pub mod driver;
pub mod input;
pub mod render;
pub mod run_manager;

pub use driver::{DriverCommand, DriverHandle, FrameDriver};
pub use input::{InputBuffer, InputBufferError, InputSender};
pub use render::{NullSink, RenderSink, UnavailableSink, WatchSink};
pub use run_manager::{RunManager, RunState};

//! Lane Runner Engine
//!
//! Real-time simulation core of a three-lane runner game: obstacle field,
//! power-ups, collision with skin abilities, bot opponents, difficulty and
//! economy scheduling, and run orchestration across eight modes.
//!
//! # Features
//!
//! - `autosave` - Periodic mid-run profile checkpoints (enabled by default)
//! - `remote` - HTTP client for the account and score backend

pub mod config;
pub mod error;
pub mod metrics;
pub mod util;
pub mod game;
pub mod session;
pub mod persistence;
pub mod remote;

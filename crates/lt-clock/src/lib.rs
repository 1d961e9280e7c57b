//! lt-clock: Playback clock reconciliation for the LoopTrack timeline
//!
//! The authoritative playback position lives in the engine process and is
//! only reported now and then. This crate keeps a smooth local estimate:
//!
//! - `pacer` - frame-aligned wake-ups (the host's repaint grid)
//! - `scheduler` - origin-aligned repeating timers with owned, cancellable handles
//! - `extrapolator` - duration readout advanced every 50ms between reports
//! - `reconciler` - playhead advanced every heartbeat, with deadband correction
//! - `clock` - the paused/playing state machine tying them together
//!
//! Everything runs on a single-threaded Tokio runtime; ticks and state
//! updates interleave but never run concurrently.

pub mod clock;
pub mod config;
pub mod extrapolator;
pub mod pacer;
pub mod reconciler;
pub mod scheduler;

pub use clock::*;
pub use config::*;
pub use extrapolator::*;
pub use pacer::*;
pub use reconciler::*;
pub use scheduler::*;

//! lt-core: Shared types for the LoopTrack timeline
//!
//! Playback state as mirrored from the engine, elapsed-time derivation,
//! the track/clip state slices and the readout formatting used by the
//! timeline front end.

mod error;
mod format;
mod playback;
mod time;
mod track;

pub use error::*;
pub use format::*;
pub use playback::*;
pub use time::*;
pub use track::*;

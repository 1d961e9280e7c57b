//! lt-bridge: Timeline ↔ engine plumbing for LoopTrack
//!
//! - `requests` / `transport` / `client` - engine request calls
//! - `sync` - typed state-slice messages and the mirrored store
//! - `events` - inbound event bus and outbound state changes
//! - `focus` - the focused clip, its beat track and loop edit
//! - `input` - spacebar, timeline, clip and loop-editing input
//! - `ruler` - ruler tick layout
//! - `controller` - the event loop that ties it to the playback clock

pub mod client;
pub mod controller;
pub mod error;
pub mod events;
pub mod focus;
pub mod input;
pub mod requests;
pub mod ruler;
pub mod sync;
pub mod transport;

pub use client::*;
pub use controller::*;
pub use error::*;
pub use events::*;
pub use focus::*;
pub use input::*;
pub use requests::*;
pub use ruler::*;
pub use sync::*;
pub use transport::*;

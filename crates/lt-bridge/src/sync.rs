//! Typed state sync between engine and timeline
//!
//! The engine mirrors state slices over the event bus as
//! `{ key, value }` with `value` a JSON string. Each known key decodes into
//! one `StateMessage` variant and the `StateStore` replaces that slice
//! wholesale.
//!
//! Writable slices go the other way as a `StateChange`: a numeric
//! `StateKey` and the value inline. The timeline never applies its own
//! changes; it waits for the engine to mirror them back.

use serde::{Deserialize, Serialize};

use lt_core::{LtError, LtResult, PlaybackState, TrackState};

/// Engine → timeline state mirror
pub const STATE_SYNC_EVENT: &str = "state_sync_event";
/// Timeline → engine state change
pub const STATE_CHANGE_EVENT: &str = "state_change_event";

/// Wire payload of the state sync event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPayload {
    pub key: String,
    pub value: String,
}

/// Numeric keys used on the state change event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
#[repr(u32)]
pub enum StateKey {
    Tracks = 0,
    Check = 1,
}

impl StateKey {
    /// Name of the same slice on the sync event
    pub fn name(self) -> &'static str {
        match self {
            Self::Tracks => StateMessage::TRACKS_KEY,
            Self::Check => StateMessage::CHECK_KEY,
        }
    }
}

impl TryFrom<u32> for StateKey {
    type Error = LtError;

    fn try_from(value: u32) -> LtResult<Self> {
        match value {
            0 => Ok(Self::Tracks),
            1 => Ok(Self::Check),
            other => Err(LtError::UnknownStateKey(other.to_string())),
        }
    }
}

impl From<StateKey> for u32 {
    fn from(key: StateKey) -> Self {
        key as u32
    }
}

/// One state slice update
#[derive(Debug, Clone, PartialEq)]
pub enum StateMessage {
    Playback(PlaybackState),
    Tracks(Vec<TrackState>),
    Check(bool),
}

impl StateMessage {
    pub const PLAYBACK_KEY: &'static str = "playback";
    pub const TRACKS_KEY: &'static str = "tracks";
    pub const CHECK_KEY: &'static str = "check";

    pub fn key(&self) -> &'static str {
        match self {
            Self::Playback(_) => Self::PLAYBACK_KEY,
            Self::Tracks(_) => Self::TRACKS_KEY,
            Self::Check(_) => Self::CHECK_KEY,
        }
    }

    /// Decode a `{ key, value }` payload
    pub fn from_payload(payload: &SyncPayload) -> LtResult<Self> {
        let invalid = |e: serde_json::Error| LtError::InvalidPayload {
            key: payload.key.clone(),
            reason: e.to_string(),
        };

        match payload.key.as_str() {
            Self::PLAYBACK_KEY => serde_json::from_str(&payload.value)
                .map(Self::Playback)
                .map_err(invalid),
            Self::TRACKS_KEY => serde_json::from_str(&payload.value)
                .map(Self::Tracks)
                .map_err(invalid),
            Self::CHECK_KEY => serde_json::from_str(&payload.value)
                .map(Self::Check)
                .map_err(invalid),
            other => Err(LtError::UnknownStateKey(other.to_string())),
        }
    }

    pub fn to_payload(&self) -> LtResult<SyncPayload> {
        let value = match self {
            Self::Playback(state) => serde_json::to_string(state)?,
            Self::Tracks(tracks) => serde_json::to_string(tracks)?,
            Self::Check(check) => serde_json::to_string(check)?,
        };
        Ok(SyncPayload {
            key: self.key().to_string(),
            value,
        })
    }
}

/// Timeline → engine replacement of one writable slice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub key: StateKey,
    pub value: serde_json::Value,
}

impl StateChange {
    /// Playback is engine-owned and has no state change key
    pub fn from_message(message: &StateMessage) -> LtResult<Self> {
        let (key, value) = match message {
            StateMessage::Tracks(tracks) => (StateKey::Tracks, serde_json::to_value(tracks)?),
            StateMessage::Check(check) => (StateKey::Check, serde_json::Value::Bool(*check)),
            StateMessage::Playback(_) => {
                return Err(LtError::UnknownStateKey(
                    StateMessage::PLAYBACK_KEY.to_string(),
                ));
            }
        };
        Ok(Self { key, value })
    }

    pub fn into_message(self) -> LtResult<StateMessage> {
        let key = self.key;
        let invalid = |e: serde_json::Error| LtError::InvalidPayload {
            key: key.name().to_string(),
            reason: e.to_string(),
        };

        match key {
            StateKey::Tracks => serde_json::from_value(self.value)
                .map(StateMessage::Tracks)
                .map_err(invalid),
            StateKey::Check => serde_json::from_value(self.value)
                .map(StateMessage::Check)
                .map_err(invalid),
        }
    }
}

/// Mirrored application state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateStore {
    playback: PlaybackState,
    tracks: Vec<TrackState>,
    check: bool,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slice carried by `message`
    pub fn apply(&mut self, message: StateMessage) {
        match message {
            StateMessage::Playback(state) => self.playback = state,
            StateMessage::Tracks(tracks) => self.tracks = tracks,
            StateMessage::Check(check) => self.check = check,
        }
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// Optimistic local replacement of the playback slice
    pub fn set_playback(&mut self, state: PlaybackState) {
        self.playback = state;
    }

    pub fn tracks(&self) -> &[TrackState] {
        &self.tracks
    }

    pub fn check(&self) -> bool {
        self.check
    }
}

//! Event bus channels between the engine and the timeline
//!
//! Inbound: decoded `UiEvent`s. Outbound: `StateChange`s for the engine.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::{BridgeError, BridgeResult};
use crate::sync::{STATE_SYNC_EVENT, StateChange, StateMessage, SyncPayload};

/// File-open notification event name
pub const OPEN_FILE_EVENT: &str = "openFile";

/// Event queue depth
pub const EVENT_QUEUE_SIZE: usize = 256;

/// Outbound state change queue depth
pub const STATE_CHANGE_QUEUE_SIZE: usize = 64;

/// Payload of the file-open notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenFilePayload {
    pub path: String,
}

/// Decoded inbound event
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    StateSync(StateMessage),
    OpenFile(OpenFilePayload),
}

impl UiEvent {
    /// Decode a raw bus event. Events this layer does not listen for yield
    /// `Ok(None)`.
    pub fn decode(name: &str, payload: &str) -> BridgeResult<Option<Self>> {
        match name {
            STATE_SYNC_EVENT => {
                let payload: SyncPayload = serde_json::from_str(payload)?;
                let message = StateMessage::from_payload(&payload)?;
                Ok(Some(Self::StateSync(message)))
            }
            OPEN_FILE_EVENT => Ok(Some(Self::OpenFile(serde_json::from_str(payload)?))),
            other => {
                log::debug!("[Events] ignoring '{}'", other);
                Ok(None)
            }
        }
    }
}

/// Sending half of the event bus
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<UiEvent>,
}

/// Create a bounded event bus
pub fn event_bus() -> (EventSender, mpsc::Receiver<UiEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
    (EventSender { tx }, rx)
}

impl EventSender {
    pub async fn send(&self, event: UiEvent) -> BridgeResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| BridgeError::ChannelClosed("event bus"))
    }

    /// Decode and forward a raw event. Decode failures are logged and
    /// dropped; only a closed bus is an error.
    pub async fn send_raw(&self, name: &str, payload: &str) -> BridgeResult<()> {
        match UiEvent::decode(name, payload) {
            Ok(Some(event)) => self.send(event).await,
            Ok(None) => Ok(()),
            Err(e) => {
                log::warn!("[Events] dropping '{}': {}", name, e);
                Ok(())
            }
        }
    }

    /// Push a state slice the way the engine does, encoded as a
    /// `state_sync_event` payload
    pub async fn sync(&self, message: &StateMessage) -> BridgeResult<()> {
        let payload = serde_json::to_string(&message.to_payload()?)?;
        self.send_raw(STATE_SYNC_EVENT, &payload).await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Sending half of the state change channel
#[derive(Debug, Clone)]
pub struct StateChangeSender {
    tx: mpsc::Sender<StateChange>,
}

/// Create a bounded timeline → engine state change channel
pub fn state_change_bus() -> (StateChangeSender, mpsc::Receiver<StateChange>) {
    let (tx, rx) = mpsc::channel(STATE_CHANGE_QUEUE_SIZE);
    (StateChangeSender { tx }, rx)
}

impl StateChangeSender {
    pub async fn send(&self, change: StateChange) -> BridgeResult<()> {
        self.tx
            .send(change)
            .await
            .map_err(|_| BridgeError::ChannelClosed("state change bus"))
    }

    /// Ask the engine to replace the slice carried by `message`
    pub async fn emit(&self, message: &StateMessage) -> BridgeResult<()> {
        let change = StateChange::from_message(message)?;
        log::debug!("[Events] state change '{}'", change.key.name());
        self.send(change).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lt_core::{LtError, PlaybackState};

    #[test]
    fn test_decode_state_sync() {
        let raw = r#"{"key":"playback","value":"{\"isPaused\":true,\"totalFrames\":0,\"sampleRate\":48000}"}"#;
        let event = UiEvent::decode(STATE_SYNC_EVENT, raw).unwrap().unwrap();
        assert_eq!(
            event,
            UiEvent::StateSync(StateMessage::Playback(PlaybackState::new(true, 0, 48000)))
        );
    }

    #[test]
    fn test_decode_open_file() {
        let event = UiEvent::decode(OPEN_FILE_EVENT, r#"{"path":"/tmp/loop.wav"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            UiEvent::OpenFile(OpenFilePayload {
                path: "/tmp/loop.wav".into()
            })
        );
    }

    #[test]
    fn test_unknown_event_ignored() {
        assert!(UiEvent::decode("refresh", "null").unwrap().is_none());
    }

    #[test]
    fn test_unknown_state_key_is_decode_error() {
        let raw = r#"{"key":"totalSamples","value":"12"}"#;
        let err = UiEvent::decode(STATE_SYNC_EVENT, raw).unwrap_err();
        assert!(matches!(err, BridgeError::Decode(LtError::UnknownStateKey(_))));
    }

    #[tokio::test]
    async fn test_sync_goes_through_the_wire() {
        let (sender, mut rx) = event_bus();
        let state = PlaybackState::new(false, 88200, 44100);
        sender.sync(&StateMessage::Playback(state)).await.unwrap();

        assert_eq!(
            rx.recv().await,
            Some(UiEvent::StateSync(StateMessage::Playback(state)))
        );
    }

    #[tokio::test]
    async fn test_state_change_emit() {
        let (sender, mut rx) = state_change_bus();
        sender.emit(&StateMessage::Check(true)).await.unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.key, crate::sync::StateKey::Check);
        assert_eq!(change.value, serde_json::Value::Bool(true));

        let err = sender
            .emit(&StateMessage::Playback(PlaybackState::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Decode(LtError::UnknownStateKey(_))));

        drop(rx);
        let err = sender.emit(&StateMessage::Check(false)).await.unwrap_err();
        assert!(matches!(err, BridgeError::ChannelClosed("state change bus")));
    }

    #[tokio::test]
    async fn test_send_raw_drops_bad_events() {
        let (sender, mut rx) = event_bus();
        sender.send_raw(STATE_SYNC_EVENT, "not json").await.unwrap();
        sender
            .send_raw(OPEN_FILE_EVENT, r#"{"path":"a.wav"}"#)
            .await
            .unwrap();
        drop(sender);

        assert!(matches!(rx.recv().await, Some(UiEvent::OpenFile(_))));
        assert!(rx.recv().await.is_none());
    }
}

//! Typed engine client
//!
//! One method per engine command. Replies of the wrong shape surface as
//! `UnexpectedReply`; nothing here retries.

use std::collections::BTreeMap;

use tokio::task::JoinHandle;

use lt_core::{AudioData, ClipId, ClipState};

use crate::error::{BridgeError, BridgeResult};
use crate::requests::{EngineReply, EngineRequest};
use crate::transport::EngineTransport;

/// Typed front for an `EngineTransport`
#[derive(Debug, Clone)]
pub struct EngineClient<T> {
    transport: T,
}

impl<T: EngineTransport> EngineClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn expect_ack(&self, request: EngineRequest) -> BridgeResult<()> {
        let command = request.command();
        match self.transport.call(request).await? {
            EngineReply::Ack => Ok(()),
            _ => Err(BridgeError::UnexpectedReply { command }),
        }
    }

    pub async fn toggle_playback(&self) -> BridgeResult<()> {
        self.expect_ack(EngineRequest::TogglePlayback).await
    }

    /// Seek to `pos` seconds
    pub async fn try_seek(&self, pos: f64) -> BridgeResult<()> {
        self.expect_ack(EngineRequest::TrySeek { pos }).await
    }

    pub async fn add_track(&self) -> BridgeResult<()> {
        self.expect_ack(EngineRequest::AddTrack).await
    }

    pub async fn get_clip(&self, id: ClipId) -> BridgeResult<ClipState> {
        match self.transport.call(EngineRequest::GetClip { id }).await? {
            EngineReply::Clip(clip) => Ok(clip),
            _ => Err(BridgeError::UnexpectedReply {
                command: "get_clip",
            }),
        }
    }

    pub async fn get_audio_data(&self, path: &str) -> BridgeResult<AudioData> {
        let request = EngineRequest::GetAudioData {
            path: path.to_string(),
        };
        match self.transport.call(request).await? {
            EngineReply::AudioData(data) => Ok(data),
            _ => Err(BridgeError::UnexpectedReply {
                command: "get_audio_data",
            }),
        }
    }

    /// Set a clip's loop region. An empty or inverted region is refused
    /// before anything reaches the engine.
    pub async fn set_clip_loop_frames(
        &self,
        id: ClipId,
        start_frame: u32,
        end_frame: u32,
    ) -> BridgeResult<()> {
        if start_frame >= end_frame {
            return Err(BridgeError::InvalidRequest(format!(
                "loop start {} must precede loop end {} on clip {}",
                start_frame, end_frame, id
            )));
        }
        self.expect_ack(EngineRequest::SetClipLoopFrames {
            id,
            start_frame,
            end_frame,
        })
        .await
    }

    pub async fn clear_clip_loop(&self, id: ClipId) -> BridgeResult<()> {
        self.expect_ack(EngineRequest::ClearClipLoop { id }).await
    }

    /// Raw `beatIndex -> score` mapping
    pub async fn get_clip_preferred_transition_beats(
        &self,
        id: ClipId,
        beat: usize,
        count: u32,
    ) -> BridgeResult<BTreeMap<usize, f64>> {
        let request = EngineRequest::GetClipPreferredTransitionBeats { id, beat, count };
        match self.transport.call(request).await? {
            EngineReply::TransitionBeats(scores) => Ok(scores),
            _ => Err(BridgeError::UnexpectedReply {
                command: "get_clip_preferred_transition_beats",
            }),
        }
    }

    /// Transition candidates for `beat`, best (lowest score) first
    pub async fn preferred_transitions(
        &self,
        id: ClipId,
        beat: usize,
        count: u32,
    ) -> BridgeResult<Vec<(usize, f64)>> {
        let scores = self
            .get_clip_preferred_transition_beats(id, beat, count)
            .await?;
        Ok(rank_transitions(scores))
    }
}

impl<T> EngineClient<T>
where
    T: EngineTransport + Clone + 'static,
{
    /// Issue a request without waiting for it. Failures are logged and
    /// dropped.
    pub fn fire(&self, request: EngineRequest) -> JoinHandle<()> {
        let transport = self.transport.clone();
        tokio::spawn(async move {
            let command = request.command();
            match transport.call(request).await {
                Ok(_) => log::trace!("[Bridge] {} acknowledged", command),
                Err(e) => log::warn!("[Bridge] {} failed: {}", command, e),
            }
        })
    }
}

/// Sort scores ascending; ties keep beat order
pub fn rank_transitions(scores: BTreeMap<usize, f64>) -> Vec<(usize, f64)> {
    let mut ranked: Vec<(usize, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| a.1.total_cmp(&b.1));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_transitions() {
        let scores = BTreeMap::from([(2, 0.8), (7, 0.1), (4, 0.8), (9, 0.3)]);
        assert_eq!(
            rank_transitions(scores),
            vec![(7, 0.1), (9, 0.3), (2, 0.8), (4, 0.8)]
        );
        assert!(rank_transitions(BTreeMap::new()).is_empty());
    }
}

//! Playback clock state machine
//!
//! Two phases, `Paused` and `Playing`, starting paused. Every authoritative
//! report replaces the known `PlaybackState` wholesale and drives one
//! transition:
//!
//! | from    | report                 | effect                                        |
//! |---------|------------------------|-----------------------------------------------|
//! | Paused  | playing                | start extrapolator + heartbeat, snap, correct |
//! | Playing | paused                 | cancel both, freeze at authoritative value    |
//! | Playing | playing, moved         | re-anchor extrapolator, snap, correct         |
//! | Paused  | paused, moved          | update frozen values                          |
//!
//! Timers are Tokio tasks, so `apply` must run inside a runtime.

use lt_core::{PlaybackState, format_elapsed};

use crate::config::ClockConfig;
use crate::extrapolator::LocalTimeExtrapolator;
use crate::pacer::FramePacer;
use crate::reconciler::{HeartbeatReconciler, PlayheadFrame};
use crate::scheduler::FramePacedScheduler;

/// Clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockPhase {
    #[default]
    Paused,
    Playing,
}

/// What an authoritative report did to the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTransition {
    Started,
    Paused,
    SeekWhilePlaying,
    SeekWhilePaused,
    Unchanged,
}

/// Local view of the engine's playback clock
#[derive(Debug)]
pub struct PlaybackClock {
    config: ClockConfig,
    scheduler: FramePacedScheduler,
    state: PlaybackState,
    phase: ClockPhase,
    extrapolator: LocalTimeExtrapolator,
    reconciler: HeartbeatReconciler,
}

impl PlaybackClock {
    pub fn new(config: ClockConfig) -> Self {
        let pacer = FramePacer::from_config(&config);
        Self::with_pacer(config, pacer)
    }

    pub fn with_pacer(config: ClockConfig, pacer: FramePacer) -> Self {
        Self {
            scheduler: FramePacedScheduler::new(pacer),
            state: PlaybackState::default(),
            phase: ClockPhase::Paused,
            extrapolator: LocalTimeExtrapolator::from_config(&config),
            reconciler: HeartbeatReconciler::from_config(&config),
            config,
        }
    }

    /// Fold in a new authoritative (or optimistic local) playback state
    pub fn apply(&mut self, next: PlaybackState) -> ClockTransition {
        let prev = std::mem::replace(&mut self.state, next);
        let elapsed = next.elapsed_ms();

        let transition = match (self.phase, next.is_paused) {
            (ClockPhase::Paused, false) => {
                self.phase = ClockPhase::Playing;
                self.extrapolator.start(&self.scheduler, elapsed);
                self.reconciler.seek_landed(&self.scheduler, elapsed);
                self.reconciler.start_playing(&self.scheduler);
                ClockTransition::Started
            }
            (ClockPhase::Playing, true) => {
                self.phase = ClockPhase::Paused;
                self.extrapolator.freeze(elapsed);
                self.reconciler.pause_at(elapsed);
                ClockTransition::Paused
            }
            (ClockPhase::Playing, false) if prev.position_changed(&next) => {
                self.extrapolator.re_anchor(elapsed);
                self.reconciler.seek_landed(&self.scheduler, elapsed);
                ClockTransition::SeekWhilePlaying
            }
            (ClockPhase::Paused, true) if prev.position_changed(&next) => {
                self.extrapolator.freeze(elapsed);
                self.reconciler.snap_to(elapsed);
                ClockTransition::SeekWhilePaused
            }
            _ => ClockTransition::Unchanged,
        };

        if transition != ClockTransition::Unchanged {
            log::debug!(
                "[Clock] {:?} at {:.1}ms (frames={}, rate={:?})",
                transition,
                elapsed,
                next.total_frames,
                next.sample_rate
            );
        }
        transition
    }

    /// Cancel every timer and return to paused at the last known position
    pub fn shutdown(&mut self) {
        let elapsed = self.state.elapsed_ms();
        self.phase = ClockPhase::Paused;
        self.extrapolator.freeze(elapsed);
        self.reconciler.pause_at(elapsed);
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &FramePacedScheduler {
        &self.scheduler
    }

    pub fn reconciler(&self) -> &HeartbeatReconciler {
        &self.reconciler
    }

    pub fn extrapolator(&self) -> &LocalTimeExtrapolator {
        &self.extrapolator
    }

    /// Elapsed time shown in the duration readout
    pub fn displayed_elapsed_ms(&self) -> f64 {
        self.extrapolator.displayed_ms()
    }

    /// Duration readout as `HH:MM:SS.mmm`
    pub fn duration_readout(&self) -> String {
        format_elapsed(self.displayed_elapsed_ms())
    }

    pub fn playhead(&self) -> PlayheadFrame {
        self.reconciler.frame()
    }
}

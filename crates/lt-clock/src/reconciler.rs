//! Heartbeat reconciler: playhead position between authoritative reports
//!
//! The playhead advances one nominal unit (the distance covered in one
//! heartbeat period) per heartbeat tick. The displayed position is the
//! target for the *next* heartbeat; the renderer eases toward it over one
//! period when `animated` is set.
//!
//! When playback starts or a seek lands, the playhead snaps to the
//! authoritative position and a one-shot correction check runs shortly
//! after. The check compares the last heartbeat with the seek instant:
//!
//! ```text
//! diff = last_heartbeat - seek_instant
//! |diff| >  tolerance  → stale, no correction
//! diff  <= 0           → add (diff / period + 1) units
//! diff  >  0           → add (diff / period) units
//! ```
//!
//! The sign-dependent formula turns a once-per-period signal into a
//! sub-period initial offset, so the playhead does not jump a whole unit
//! right after a seek or resume.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use lt_core::finite_or_zero;

use crate::config::ClockConfig;
use crate::scheduler::{FramePacedScheduler, TimerSlot};

/// Most recent heartbeat. Earlier samples are discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartbeatSample {
    pub received_at: Instant,
    pub reported_elapsed_ms: f64,
}

/// Where the playhead should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlayheadFrame {
    pub position_px: f64,
    /// Ease toward the position over one heartbeat period; when false the
    /// renderer must jump.
    pub animated: bool,
}

/// Deadband and scaling of the one-shot correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionPolicy {
    pub tolerance_ms: f64,
    pub period_ms: f64,
}

impl CorrectionPolicy {
    pub fn new(tolerance_ms: f64, period_ms: f64) -> Self {
        Self {
            tolerance_ms,
            period_ms,
        }
    }

    pub fn from_config(config: &ClockConfig) -> Self {
        Self::new(
            config.heartbeat_tolerance_ms as f64,
            config.heartbeat_interval_ms as f64,
        )
    }

    /// Nominal units to add for a heartbeat `diff_ms` after the seek instant.
    ///
    /// `None` when the heartbeat falls outside the deadband.
    pub fn correction_units(&self, diff_ms: f64) -> Option<f64> {
        if !diff_ms.is_finite() || diff_ms.abs() > self.tolerance_ms || self.period_ms <= 0.0 {
            return None;
        }
        if diff_ms <= 0.0 {
            Some(diff_ms / self.period_ms + 1.0)
        } else {
            Some(diff_ms / self.period_ms)
        }
    }
}

/// Signed `a - b` in milliseconds
pub fn signed_ms_between(a: Instant, b: Instant) -> f64 {
    if a >= b {
        a.duration_since(b).as_secs_f64() * 1000.0
    } else {
        -(b.duration_since(a).as_secs_f64() * 1000.0)
    }
}

#[derive(Debug, Default)]
struct PlayheadShared {
    position_px: f64,
    animated: bool,
    last_heartbeat: Option<HeartbeatSample>,
    seek_instant: Option<Instant>,
}

impl PlayheadShared {
    fn apply_correction(&mut self, policy: &CorrectionPolicy, unit_px: f64) -> Option<f64> {
        let seek_instant = self.seek_instant?;
        let heartbeat = self.last_heartbeat?;
        let diff = signed_ms_between(heartbeat.received_at, seek_instant);

        match policy.correction_units(diff) {
            Some(units) => {
                self.position_px += units * unit_px;
                Some(units)
            }
            None => {
                log::debug!("[Reconciler] stale heartbeat ({:+.0}ms from seek), skipped", diff);
                None
            }
        }
    }
}

/// Drives the playhead position while playing and snaps it on state changes
#[derive(Debug)]
pub struct HeartbeatReconciler {
    interval: Duration,
    correction_delay: Duration,
    policy: CorrectionPolicy,
    pixels_per_second: f64,
    shared: Arc<Mutex<PlayheadShared>>,
    heartbeat: TimerSlot,
    correction: TimerSlot,
}

impl HeartbeatReconciler {
    pub fn from_config(config: &ClockConfig) -> Self {
        Self {
            interval: config.heartbeat_interval(),
            correction_delay: config.correction_delay(),
            policy: CorrectionPolicy::from_config(config),
            pixels_per_second: config.pixels_per_second,
            shared: Arc::new(Mutex::new(PlayheadShared::default())),
            heartbeat: TimerSlot::new("heartbeat"),
            correction: TimerSlot::new("correction"),
        }
    }

    /// Pixels covered in one heartbeat period
    pub fn unit_px(&self) -> f64 {
        self.pixels_per_second * self.interval.as_secs_f64()
    }

    fn ms_to_px(&self, elapsed_ms: f64) -> f64 {
        finite_or_zero(elapsed_ms) / 1000.0 * self.pixels_per_second
    }

    /// Snap to the authoritative position and schedule the one-shot
    /// correction check. Called when playback starts or a seek lands while
    /// playing. A pending check from an earlier seek is superseded.
    pub fn seek_landed(&mut self, scheduler: &FramePacedScheduler, authoritative_ms: f64) {
        let seek_instant = Instant::now();
        {
            let mut shared = self.shared.lock();
            shared.position_px = self.ms_to_px(authoritative_ms);
            shared.animated = false;
            shared.seek_instant = Some(seek_instant);
        }

        let shared = Arc::clone(&self.shared);
        let policy = self.policy;
        let unit_px = self.unit_px();
        self.correction
            .start_once(scheduler, self.correction_delay, move |_| {
                let mut shared = shared.lock();
                if let Some(units) = shared.apply_correction(&policy, unit_px) {
                    log::trace!("[Reconciler] corrected by {:.3} units", units);
                }
                shared.animated = true;
            });
    }

    /// Begin the heartbeat. The playhead immediately takes one unit of lead
    /// and then advances one unit per tick.
    pub fn start_playing(&mut self, scheduler: &FramePacedScheduler) {
        let unit_px = self.unit_px();
        let pixels_per_second = self.pixels_per_second;
        {
            let mut shared = self.shared.lock();
            shared.position_px += unit_px;
            shared.animated = true;
        }

        let shared = Arc::clone(&self.shared);
        self.heartbeat.start(scheduler, self.interval, move |frame_time| {
            let mut shared = shared.lock();
            let reported_elapsed_ms = shared.position_px / pixels_per_second * 1000.0;
            shared.last_heartbeat = Some(HeartbeatSample {
                received_at: frame_time,
                reported_elapsed_ms,
            });
            shared.position_px += unit_px;
        });
    }

    /// Stop the heartbeat and any pending correction, and draw the
    /// authoritative position directly.
    pub fn pause_at(&mut self, authoritative_ms: f64) {
        self.heartbeat.cancel();
        self.correction.cancel();
        self.snap_to(authoritative_ms);
    }

    /// Draw the authoritative position without extrapolation
    pub fn snap_to(&self, authoritative_ms: f64) {
        let mut shared = self.shared.lock();
        shared.position_px = self.ms_to_px(authoritative_ms);
        shared.animated = false;
    }

    pub fn last_heartbeat(&self) -> Option<HeartbeatSample> {
        self.shared.lock().last_heartbeat
    }

    pub fn is_running(&self) -> bool {
        self.heartbeat.is_active()
    }

    pub fn frame(&self) -> PlayheadFrame {
        let shared = self.shared.lock();
        PlayheadFrame {
            position_px: shared.position_px,
            animated: shared.animated,
        }
    }

    pub fn policy(&self) -> &CorrectionPolicy {
        &self.policy
    }
}

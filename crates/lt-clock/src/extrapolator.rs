//! Local time extrapolation for the duration readout
//!
//! Between authoritative reports the readout advances by exactly one interval
//! per tick. Wall-clock drift inside a tick is ignored; coarse corrections
//! only happen when the clock state changes.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use lt_core::finite_or_zero;

use crate::config::ClockConfig;
use crate::scheduler::{FramePacedScheduler, TimerSlot};

/// Advances the displayed elapsed time while playing
#[derive(Debug)]
pub struct LocalTimeExtrapolator {
    interval: Duration,
    reanchor_tolerance_ms: f64,
    displayed_ms: Arc<Mutex<f64>>,
    timer: TimerSlot,
}

impl LocalTimeExtrapolator {
    pub fn new(interval: Duration, reanchor_tolerance_ms: f64) -> Self {
        Self {
            interval,
            reanchor_tolerance_ms,
            displayed_ms: Arc::new(Mutex::new(0.0)),
            timer: TimerSlot::new("extrapolator"),
        }
    }

    pub fn from_config(config: &ClockConfig) -> Self {
        Self::new(
            config.extrapolator_interval(),
            config.reanchor_tolerance_ms as f64,
        )
    }

    /// Start ticking from `baseline_ms`. A previous timer is cancelled first.
    pub fn start(&mut self, scheduler: &FramePacedScheduler, baseline_ms: f64) {
        *self.displayed_ms.lock() = finite_or_zero(baseline_ms);

        let displayed = Arc::clone(&self.displayed_ms);
        let step_ms = self.interval.as_secs_f64() * 1000.0;
        self.timer.start(scheduler, self.interval, move |_| {
            *displayed.lock() += step_ms;
        });
    }

    /// Move the baseline to a new authoritative value while the timer keeps
    /// running.
    ///
    /// A baseline that trails the displayed value by no more than the
    /// re-anchor tolerance is absorbed: the readout never steps backward for
    /// sub-tick disagreement between the local estimate and the engine.
    pub fn re_anchor(&self, baseline_ms: f64) {
        let baseline = finite_or_zero(baseline_ms);
        let mut displayed = self.displayed_ms.lock();
        let lead = *displayed - baseline;

        if self.is_running() && lead > 0.0 && lead <= self.reanchor_tolerance_ms {
            log::trace!(
                "[Extrapolator] keeping {:.1}ms, authoritative {:.1}ms is {:.1}ms behind",
                *displayed,
                baseline,
                lead
            );
            return;
        }
        *displayed = baseline;
    }

    /// Stop ticking and show `value_ms`
    pub fn freeze(&mut self, value_ms: f64) {
        self.timer.cancel();
        *self.displayed_ms.lock() = finite_or_zero(value_ms);
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_active()
    }

    pub fn displayed_ms(&self) -> f64 {
        *self.displayed_ms.lock()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

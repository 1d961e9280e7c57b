//! Frame-Paced Interval Scheduler
//!
//! A repeating callback that stays aligned to a fixed origin. After every
//! tick the next wake-up is computed from the origin, not from the previous
//! tick, so timer slack never compounds:
//!
//! ```text
//! elapsed      = frame_time - origin
//! rounded      = round(elapsed / interval) * interval
//! target_next  = origin + rounded + interval
//! delay        = target_next - now          (<= 0 → next frame immediately)
//! ```
//!
//! Cancellation is cooperative and checked right before each callback, so a
//! wake-up that was already pending when the handle was cancelled does
//! nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::pacer::FramePacer;

/// Shortest interval accepted; zero would spin the loop
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Starts frame-paced repeating and one-shot timers.
///
/// Timers run as tasks on the current Tokio runtime, so `start` and `once`
/// must be called from within one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FramePacedScheduler {
    pacer: FramePacer,
}

impl FramePacedScheduler {
    pub fn new(pacer: FramePacer) -> Self {
        Self { pacer }
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    /// Start a repeating timer. The first tick lands one interval after now.
    pub fn start<F>(&self, interval: Duration, on_tick: F) -> SchedulerHandle
    where
        F: FnMut(Instant) + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);
        let origin = Instant::now();
        let cancelled = Arc::new(AtomicBool::new(false));

        let task = tokio::spawn(run_paced(
            self.pacer,
            origin,
            interval,
            Arc::clone(&cancelled),
            on_tick,
        ));

        SchedulerHandle {
            origin,
            interval,
            cancelled,
            task,
        }
    }

    /// Run `f` once after `delay`, unless cancelled first.
    pub fn once<F>(&self, delay: Duration, f: F) -> SchedulerHandle
    where
        F: FnOnce(Instant) + Send + 'static,
    {
        let origin = Instant::now();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let task = tokio::spawn(async move {
            tokio::time::sleep_until(origin + delay).await;
            if flag.load(Ordering::Acquire) {
                return;
            }
            f(Instant::now());
        });

        SchedulerHandle {
            origin,
            interval: delay,
            cancelled,
            task,
        }
    }
}

async fn run_paced<F>(
    pacer: FramePacer,
    origin: Instant,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
    mut on_tick: F,
) where
    F: FnMut(Instant),
{
    let mut frame_time = origin;
    loop {
        let delay = next_delay(origin, frame_time, Instant::now(), interval);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let frame = pacer.next_frame().await;

        if cancelled.load(Ordering::Acquire) {
            log::trace!("[Scheduler] timer ({:?}) cancelled, stopping", interval);
            return;
        }

        on_tick(frame);
        frame_time = frame;
    }
}

/// Time to wait from `now` until the tick after `frame_time`, on the grid
/// `origin + k * interval`. Zero when that target has already passed.
pub fn next_delay(origin: Instant, frame_time: Instant, now: Instant, interval: Duration) -> Duration {
    let interval_ns = interval.max(MIN_INTERVAL).as_nanos();
    let elapsed_ns = frame_time.saturating_duration_since(origin).as_nanos();

    // Round half up to the nearest grid step
    let steps = (elapsed_ns + interval_ns / 2) / interval_ns;
    let target_next = origin + Duration::from_nanos(((steps + 1) * interval_ns) as u64);

    target_next.saturating_duration_since(now)
}

/// Owned handle to a running timer.
///
/// Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct SchedulerHandle {
    origin: Instant,
    interval: Duration,
    cancelled: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn origin(&self) -> Instant {
        self.origin
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Stop producing ticks. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.task.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Stable slot holding the single live handle of one logical timer.
///
/// Starting through the slot cancels the previous handle before the new
/// timer is created.
#[derive(Debug)]
pub struct TimerSlot {
    name: &'static str,
    handle: Option<SchedulerHandle>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self { name, handle: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Replace the live timer with a new repeating one
    pub fn start<F>(&mut self, scheduler: &FramePacedScheduler, interval: Duration, on_tick: F)
    where
        F: FnMut(Instant) + Send + 'static,
    {
        self.cancel();
        log::trace!("[Scheduler] {} started every {:?}", self.name, interval);
        self.handle = Some(scheduler.start(interval, on_tick));
    }

    /// Replace the live timer with a one-shot
    pub fn start_once<F>(&mut self, scheduler: &FramePacedScheduler, delay: Duration, f: F)
    where
        F: FnOnce(Instant) + Send + 'static,
    {
        self.cancel();
        self.handle = Some(scheduler.once(delay, f));
    }

    /// Cancel the live timer, if any. Returns whether one was live.
    pub fn cancel(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.cancel();
                log::trace!("[Scheduler] {} cancelled", self.name);
                true
            }
            None => false,
        }
    }

    /// True while a repeating timer is installed and not cancelled
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|h| !h.is_cancelled() && !h.task.is_finished())
    }

    pub fn handle(&self) -> Option<&SchedulerHandle> {
        self.handle.as_ref()
    }
}

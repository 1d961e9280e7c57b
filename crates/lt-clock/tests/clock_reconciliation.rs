//! Playback clock scenarios
//!
//! End-to-end behaviour of the clock state machine with its extrapolator,
//! heartbeat reconciler and frame-paced timers, on virtual time.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use approx::assert_relative_eq;
use parking_lot::Mutex;
use tokio::time::sleep;

use lt_clock::{
    ClockConfig, ClockPhase, ClockTransition, FramePacedScheduler, FramePacer, PlaybackClock,
};
use lt_core::PlaybackState;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn unaligned_clock() -> PlaybackClock {
    PlaybackClock::with_pacer(ClockConfig::default(), FramePacer::unaligned())
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCHEDULER PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_tick_count_matches_duration_for_several_intervals() {
    let scheduler = FramePacedScheduler::new(FramePacer::from_config(&ClockConfig::default()));

    for (interval_ms, total_ms) in [(50u64, 2_000u64), (1000, 10_000), (250, 3_100), (33, 1_000)] {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let handle = scheduler.start(ms(interval_ms), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sleep(ms(total_ms)).await;
        handle.cancel();

        let expected = (total_ms / interval_ms) as i64;
        let got = ticks.load(Ordering::SeqCst) as i64;
        assert!(
            (got - expected).abs() <= 1,
            "interval {}ms over {}ms: {} ticks, expected {}±1",
            interval_ms,
            total_ms,
            got,
            expected
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_compounding_drift_at_display_rate() {
    let config = ClockConfig::default();
    let pacer = FramePacer::from_config(&config);
    let period = pacer.period().unwrap();
    let scheduler = FramePacedScheduler::new(pacer);

    let times = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&times);
    let handle = scheduler.start(ms(50), move |t| sink.lock().push(t));
    let origin = handle.origin();

    sleep(ms(60_000)).await;
    handle.cancel();

    let times = times.lock();
    assert!(times.len() >= 1199);
    for (k, t) in times.iter().enumerate() {
        let expected = origin + ms(50) * (k as u32 + 1);
        let deviation = t.saturating_duration_since(expected);
        // Timer wheel resolution is one millisecond on top of the frame grid
        assert!(
            deviation < period + ms(1),
            "tick {} deviates {:?} from its grid slot",
            k,
            deviation
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_after_pending_wakeup() {
    let scheduler = FramePacedScheduler::new(FramePacer::from_config(&ClockConfig::default()));
    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ticks);

    let handle = scheduler.start(ms(1000), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // The 1s wake-up is already armed when we cancel just before it
    sleep(ms(999)).await;
    handle.cancel();
    sleep(ms(5_000)).await;

    assert_eq!(ticks.load(Ordering::SeqCst), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_pause_snaps_to_authoritative_and_holds() {
    let mut clock = unaligned_clock();

    let playing = PlaybackState::new(false, 44100, 44100);
    assert_eq!(playing.elapsed_ms(), 1000.0);
    clock.apply(playing);
    assert_eq!(clock.displayed_elapsed_ms(), 1000.0);

    sleep(ms(730)).await;
    assert!(clock.displayed_elapsed_ms() > 1000.0);

    clock.apply(PlaybackState::new(true, 44100, 44100));
    assert_eq!(clock.phase(), ClockPhase::Paused);
    assert_eq!(clock.displayed_elapsed_ms(), 1000.0);
    assert_eq!(clock.duration_readout(), "00:00:01.000");
    let frozen_playhead = clock.playhead();
    assert_eq!(frozen_playhead.position_px, 10.0);

    sleep(ms(10_000)).await;
    assert_eq!(clock.displayed_elapsed_ms(), 1000.0);
    assert_eq!(clock.playhead(), frozen_playhead);
}

#[tokio::test(start_paused = true)]
async fn test_readout_extrapolates_between_reports() {
    let mut clock = unaligned_clock();
    clock.apply(PlaybackState::new(false, 0, 48000));

    sleep(ms(2_525)).await;
    assert_relative_eq!(clock.displayed_elapsed_ms(), 2_500.0);
    assert_eq!(clock.duration_readout(), "00:00:02.500");
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_playing_reanchors_without_backward_jump() {
    let mut clock = unaligned_clock();
    let start = PlaybackState::new(false, 0, 44100);
    clock.apply(start);
    sleep(ms(1_210)).await;

    // Optimistic local update issued together with try_seek(30.0)
    let optimistic = start.seeked_to(30.0);
    assert_eq!(clock.apply(optimistic), ClockTransition::SeekWhilePlaying);
    assert_eq!(clock.displayed_elapsed_ms(), 30_000.0);

    sleep(ms(60)).await;
    let before = clock.displayed_elapsed_ms();
    assert_relative_eq!(before, 30_050.0);

    // Engine confirms with the same frame count: nothing moves
    assert_eq!(clock.apply(optimistic), ClockTransition::Unchanged);
    assert_eq!(clock.displayed_elapsed_ms(), before);

    // Engine confirms with a count a few ms behind the estimate: still no step back
    let confirmed = PlaybackState::new(false, 30 * 44100 + 441, 44100);
    assert_eq!(clock.apply(confirmed), ClockTransition::SeekWhilePlaying);
    assert!(clock.displayed_elapsed_ms() >= before);
    assert_eq!(clock.phase(), ClockPhase::Playing);
    assert!(clock.extrapolator().is_running());
}

#[tokio::test(start_paused = true)]
async fn test_seek_while_paused_updates_frozen_value() {
    let mut clock = unaligned_clock();
    clock.apply(PlaybackState::new(true, 0, 44100));

    assert_eq!(
        clock.apply(PlaybackState::new(true, 441_000, 44100)),
        ClockTransition::SeekWhilePaused
    );
    assert_eq!(clock.displayed_elapsed_ms(), 10_000.0);
    assert_eq!(clock.playhead().position_px, 100.0);
    assert!(!clock.playhead().animated);

    sleep(ms(3_000)).await;
    assert_eq!(clock.displayed_elapsed_ms(), 10_000.0);
}

#[tokio::test(start_paused = true)]
async fn test_unset_sample_rate_never_shows_nan() {
    let mut clock = unaligned_clock();
    let state = PlaybackState {
        is_paused: true,
        total_frames: 1_000_000,
        sample_rate: None,
        channels: None,
    };
    clock.apply(state);
    assert_eq!(clock.displayed_elapsed_ms(), 0.0);
    assert_eq!(clock.playhead().position_px, 0.0);

    clock.apply(PlaybackState { is_paused: false, ..state });
    sleep(ms(100)).await;
    assert!(clock.displayed_elapsed_ms().is_finite());
    assert!(clock.playhead().position_px.is_finite());
}

// ═══════════════════════════════════════════════════════════════════════════════
// HEARTBEAT RECONCILIATION
// ═══════════════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn test_heartbeat_just_after_seek_adds_fraction() {
    let mut clock = unaligned_clock();
    clock.apply(PlaybackState::new(false, 0, 44100));

    // Seek to 30s lands at 1.99s, 10ms before the heartbeat at 2s
    sleep(ms(1_990)).await;
    clock.apply(PlaybackState::new(false, 30 * 44100, 44100));
    assert_eq!(clock.playhead().position_px, 300.0);

    // Heartbeat adds its unit, then the check at 2.01s adds 0.01 units
    sleep(ms(40)).await;
    assert_relative_eq!(clock.playhead().position_px, 310.1, epsilon = 1e-9);
    assert!(clock.playhead().animated);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_far_before_seek_is_discarded() {
    let config = ClockConfig {
        heartbeat_tolerance_ms: 250,
        ..Default::default()
    };
    let mut clock = PlaybackClock::with_pacer(config, FramePacer::unaligned());
    clock.apply(PlaybackState::new(false, 0, 44100));

    // Last heartbeat at 1s is 500ms before the seek, outside the deadband
    sleep(ms(1_500)).await;
    clock.apply(PlaybackState::new(false, 30 * 44100, 44100));
    sleep(ms(30)).await;
    assert_eq!(clock.playhead().position_px, 300.0);
    assert!(clock.playhead().animated);
}

#[tokio::test(start_paused = true)]
async fn test_resume_after_long_pause_ignores_old_heartbeat() {
    let mut clock = unaligned_clock();
    clock.apply(PlaybackState::new(false, 0, 44100));
    sleep(ms(2_100)).await;
    clock.apply(PlaybackState::new(true, 2 * 44100, 44100));
    sleep(ms(5_000)).await;

    // Last heartbeat is 5s old: the resume gets exactly one unit of lead
    clock.apply(PlaybackState::new(false, 2 * 44100, 44100));
    sleep(ms(30)).await;
    assert_relative_eq!(clock.playhead().position_px, 30.0);
    assert!(clock.playhead().animated);
}

#[tokio::test(start_paused = true)]
async fn test_seek_between_heartbeats_leads_to_next_heartbeat() {
    let mut clock = unaligned_clock();
    clock.apply(PlaybackState::new(false, 0, 44100));

    // Heartbeats at 1s and 2s; seek to 30s lands at 2.3s
    sleep(ms(2_300)).await;
    clock.apply(PlaybackState::new(false, 30 * 44100, 44100));
    sleep(ms(30)).await;
    assert_relative_eq!(clock.playhead().position_px, 307.0, epsilon = 1e-9);

    // Next heartbeat at 3s adds a full unit
    sleep(ms(700)).await;
    assert_relative_eq!(clock.playhead().position_px, 317.0, epsilon = 1e-9);
}

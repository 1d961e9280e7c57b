//! Clock configuration: TOML-based tuning for the playback clock

use std::time::Duration;

use serde::{Deserialize, Serialize};

use lt_core::{LtError, LtResult};

/// Timing and scale parameters for the playback clock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Tick interval of the duration readout extrapolator
    pub extrapolator_interval_ms: u32,

    /// Tick interval of the playhead heartbeat
    pub heartbeat_interval_ms: u32,

    /// Delay between a seek/resume and its one-shot correction check
    pub correction_delay_ms: u32,

    /// Deadband: heartbeats further than this from the seek instant are stale
    pub heartbeat_tolerance_ms: u32,

    /// Largest backward step a re-anchor may swallow while playing
    pub reanchor_tolerance_ms: u32,

    /// Horizontal pixels per second of timeline (one nominal playhead unit)
    pub pixels_per_second: f64,

    /// Host display refresh rate; 0 disables frame alignment, otherwise at least 1 Hz
    pub frame_rate_hz: f64,
}

/// Lowest non-zero display refresh rate accepted for frame alignment
pub const MIN_FRAME_RATE_HZ: f64 = 1.0;

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            extrapolator_interval_ms: 50,
            heartbeat_interval_ms: 1000,
            correction_delay_ms: 20,
            heartbeat_tolerance_ms: 1000,
            reanchor_tolerance_ms: 50,
            pixels_per_second: 10.0,
            frame_rate_hz: 60.0,
        }
    }
}

impl ClockConfig {
    /// Load from TOML string
    pub fn from_toml(toml_str: &str) -> LtResult<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| LtError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save to TOML string
    pub fn to_toml(&self) -> LtResult<String> {
        toml::to_string_pretty(self).map_err(|e| LtError::InvalidConfig(e.to_string()))
    }

    /// Validate the configuration
    pub fn validate(&self) -> LtResult<()> {
        if self.extrapolator_interval_ms == 0 {
            return Err(LtError::InvalidConfig(
                "extrapolator_interval_ms must be positive".to_string(),
            ));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(LtError::InvalidConfig(
                "heartbeat_interval_ms must be positive".to_string(),
            ));
        }
        if !self.pixels_per_second.is_finite() || self.pixels_per_second <= 0.0 {
            return Err(LtError::InvalidConfig(format!(
                "pixels_per_second must be finite and positive, got {}",
                self.pixels_per_second
            )));
        }
        if !self.frame_rate_hz.is_finite() || self.frame_rate_hz < 0.0 {
            return Err(LtError::InvalidConfig(format!(
                "frame_rate_hz must be finite and non-negative, got {}",
                self.frame_rate_hz
            )));
        }
        if self.frame_rate_hz > 0.0 && self.frame_rate_hz < MIN_FRAME_RATE_HZ {
            return Err(LtError::InvalidConfig(format!(
                "frame_rate_hz must be 0 or at least {MIN_FRAME_RATE_HZ}, got {}",
                self.frame_rate_hz
            )));
        }
        Ok(())
    }

    pub fn extrapolator_interval(&self) -> Duration {
        Duration::from_millis(self.extrapolator_interval_ms as u64)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms as u64)
    }

    pub fn correction_delay(&self) -> Duration {
        Duration::from_millis(self.correction_delay_ms as u64)
    }

    /// Frame period, `None` when frame alignment is disabled or the
    /// rate has no representable period
    pub fn frame_period(&self) -> Option<Duration> {
        if self.frame_rate_hz.is_nan() || self.frame_rate_hz <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f64(1.0 / self.frame_rate_hz).ok()
    }
}

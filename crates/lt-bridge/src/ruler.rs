//! Timeline ruler ticks

use lt_core::format_ruler_label;

/// Horizontal padding on each side of a ruler label
pub const LABEL_PADDING_PX: f64 = 10.0;

/// Most ticks a single ruler lays out
pub const MAX_RULER_TICKS: usize = 10_000;

/// A labelled tick on the ruler
#[derive(Debug, Clone, PartialEq)]
pub struct RulerTick {
    pub seconds: u64,
    pub x_px: f64,
    pub label: String,
}

/// Ruler layout at a fixed horizontal scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruler {
    pixels_per_second: f64,
}

impl Ruler {
    pub fn new(pixels_per_second: f64) -> Self {
        Self { pixels_per_second }
    }

    fn has_scale(&self) -> bool {
        self.pixels_per_second.is_finite() && self.pixels_per_second > 0.0
    }

    /// Seconds between ticks so that padded labels never overlap
    pub fn interval_seconds(&self, label_width_px: f64) -> u64 {
        if !self.has_scale() {
            return 1;
        }
        let span = (label_width_px.max(0.0) + 2.0 * LABEL_PADDING_PX) / self.pixels_per_second;
        (span.ceil() as u64).max(1)
    }

    /// Ticks covering a ruler `width_px` wide, at most [`MAX_RULER_TICKS`]
    pub fn ticks(&self, width_px: f64, label_width_px: f64) -> Vec<RulerTick> {
        if !self.has_scale() || !width_px.is_finite() || width_px <= 0.0 {
            return Vec::new();
        }
        let interval = self.interval_seconds(label_width_px);
        let visible_seconds = width_px / self.pixels_per_second;

        (0..MAX_RULER_TICKS as u64)
            .map_while(|i| i.checked_mul(interval))
            .take_while(|&s| (s as f64) < visible_seconds)
            .map(|seconds| RulerTick {
                seconds,
                x_px: seconds as f64 * self.pixels_per_second,
                label: format_ruler_label(seconds),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval() {
        let ruler = Ruler::new(10.0);
        // 44px label + 20px padding = 6.4s -> 7s
        assert_eq!(ruler.interval_seconds(44.0), 7);
        assert_eq!(ruler.interval_seconds(0.0), 2);
    }

    #[test]
    fn test_ticks() {
        let ruler = Ruler::new(10.0);
        let ticks = ruler.ticks(200.0, 44.0);
        let seconds: Vec<u64> = ticks.iter().map(|t| t.seconds).collect();
        assert_eq!(seconds, vec![0, 7, 14]);
        assert_eq!(ticks[1].x_px, 70.0);
        assert_eq!(ticks[2].label, "00:14");
    }

    #[test]
    fn test_degenerate_width() {
        let ruler = Ruler::new(10.0);
        assert!(ruler.ticks(0.0, 44.0).is_empty());
        assert!(Ruler::new(0.0).ticks(200.0, 44.0).is_empty());
    }

    #[test]
    fn test_unbounded_width() {
        let ruler = Ruler::new(10.0);
        assert!(ruler.ticks(f64::INFINITY, 44.0).is_empty());
        assert!(ruler.ticks(f64::NAN, 44.0).is_empty());

        let ticks = ruler.ticks(f64::MAX, 44.0);
        assert_eq!(ticks.len(), MAX_RULER_TICKS);
        assert_eq!(ticks.last().unwrap().seconds, 7 * (MAX_RULER_TICKS as u64 - 1));
    }
}

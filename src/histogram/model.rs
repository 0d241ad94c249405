use serde::Serialize;

/// Display units per bar; one bin per bar.
pub const BAR_WIDTH: u32 = 2;

/// Comment counts in fixed-width time bins. Derived from a timeline and the
/// display width; rebuilt from scratch on every resize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramModel {
    pub bin_width_secs: f64,
    pub counts: Vec<u32>,
}

impl HistogramModel {
    /// Bins `timestamps` over `[0, duration)` into `ceil(display_width / 2)`
    /// bins. Timestamps at or past `duration` are dropped.
    pub fn build(timestamps: &[f64], duration: f64, display_width: u32) -> Self {
        let bin_count = display_width.div_ceil(BAR_WIDTH) as usize;
        if bin_count == 0 || duration <= 0.0 {
            return Self {
                bin_width_secs: 0.0,
                counts: vec![0; bin_count],
            };
        }

        let bin_width_secs = duration / bin_count as f64;
        let mut counts = vec![0u32; bin_count];

        for &t in timestamps {
            if t < 0.0 {
                continue;
            }
            let bin = (t / bin_width_secs).floor() as usize;
            if let Some(count) = counts.get_mut(bin) {
                *count += 1;
            }
        }

        Self {
            bin_width_secs,
            counts,
        }
    }

    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Largest bin, never below 1.
    pub fn max_count(&self) -> u32 {
        self.counts.iter().copied().max().unwrap_or(0).max(1)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}

/// Height of a bar: `(count / max)^2 * available`. The square flattens quiet
/// bins and lets bursts stand out.
pub fn bar_height(count: u32, max_count: u32, available: f64) -> f64 {
    let ratio = count as f64 / max_count.max(1) as f64;
    ratio.powi(2) * available
}

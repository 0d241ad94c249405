use serde::Serialize;

/// Half-open range `[start, end)` of video seconds owned by one crawler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub index: usize,
    pub start: f64,
    pub end: f64,
}

impl Segment {
    /// Seconds covered.
    pub fn width(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, offset: f64) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Splits `[0, duration)` into `count` contiguous segments of equal width.
///
/// Neighbouring segments share the exact same boundary value and the last
/// one ends at `duration`, so the union covers the range with no gap or
/// overlap regardless of rounding.
pub fn partition(duration: f64, count: usize) -> Vec<Segment> {
    let count = count.max(1);
    let boundary = |i: usize| {
        if i >= count {
            duration
        } else {
            duration * i as f64 / count as f64
        }
    };

    (0..count)
        .map(|index| Segment {
            index,
            start: boundary(index),
            end: boundary(index + 1),
        })
        .collect()
}

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Per-segment "seconds advanced" counters.
///
/// Each slot has exactly one writer: the [`ProgressSlot`] handed to the
/// crawler that owns it. The vector itself only reads, and a stale read is
/// fine since the next tick catches up.
#[derive(Clone)]
pub struct ProgressVector {
    slots: Arc<[AtomicU64]>,
}

/// Write handle for a single slot. Not `Clone`.
pub struct ProgressSlot {
    slots: Arc<[AtomicU64]>,
    index: usize,
}

impl ProgressVector {
    pub fn new(len: usize) -> (Self, Vec<ProgressSlot>) {
        let slots: Arc<[AtomicU64]> = (0..len).map(|_| AtomicU64::new(0f64.to_bits())).collect();
        let handles = (0..len)
            .map(|index| ProgressSlot {
                slots: Arc::clone(&slots),
                index,
            })
            .collect();

        (Self { slots }, handles)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> f64 {
        self.slots
            .get(index)
            .map(|slot| f64::from_bits(slot.load(Ordering::Relaxed)))
            .unwrap_or(0.0)
    }

    /// Sum of all slots: seconds of the video already covered.
    pub fn total(&self) -> f64 {
        (0..self.slots.len()).map(|i| self.get(i)).sum()
    }
}

impl ProgressSlot {
    /// Records `advanced` seconds. Lower values than already recorded are
    /// ignored so the counter never moves backwards.
    pub fn report(&self, advanced: f64) {
        let slot = &self.slots[self.index];
        let current = f64::from_bits(slot.load(Ordering::Relaxed));
        if advanced > current {
            slot.store(advanced.to_bits(), Ordering::Relaxed);
        }
    }
}

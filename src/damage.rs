//! Damage accumulator (C5): merges incoming damage regions into a single
//! dirty region for the next frame, plus the root `Expose` batching helper
//! recovered from the original source (SPEC_FULL §4.8).

use crate::geometry::{Rectangle, Region};

/// Accumulates damage (`allDamage`) across one event-loop drain.
#[derive(Debug, Default)]
pub struct DamageAccumulator {
    all_damage: Region,
}

impl DamageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions `region` into the accumulator, taking ownership of it.
    pub fn add(&mut self, region: Region) {
        self.all_damage.union_with(region);
    }

    pub fn is_empty(&self) -> bool {
        self.all_damage.is_empty()
    }

    /// Takes the accumulated region, leaving the accumulator empty.
    pub fn take(&mut self) -> Region {
        std::mem::take(&mut self.all_damage)
    }

    pub fn peek(&self) -> &Region {
        &self.all_damage
    }
}

/// Batches root `Expose` rectangles until the event's `count` field
/// reaches zero, then the whole batch is unioned as one region —
/// preserving the server's own batching semantics (§4.5, §4.8).
#[derive(Debug, Default)]
pub struct ExposeAccumulator {
    pending: Vec<Rectangle>,
}

impl ExposeAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `Expose` rectangle. When `count == 0` (the last event
    /// of the batch), returns the unioned region of the whole batch and
    /// resets for the next one.
    pub fn push(&mut self, rect: Rectangle, count: u16) -> Option<Region> {
        self.pending.push(rect);
        if count == 0 {
            Some(Region::from_rects(std::mem::take(&mut self.pending)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coalesces_ten_damage_events_into_one_union() {
        let mut acc = DamageAccumulator::new();
        for i in 0..10 {
            acc.add(Region::from_rect(Rectangle::new(i, i, 10, 10)));
        }
        assert!(!acc.is_empty());
        let region = acc.take();
        assert!(acc.is_empty());
        assert_eq!(region.extents(), Rectangle::new(0, 0, 19, 19));
    }

    #[test]
    fn expose_batch_unions_only_once_count_reaches_zero() {
        let mut acc = ExposeAccumulator::new();
        assert!(acc.push(Rectangle::new(0, 0, 10, 10), 2).is_none());
        assert!(acc.push(Rectangle::new(20, 20, 10, 10), 1).is_none());
        let region = acc.push(Rectangle::new(5, 5, 5, 5), 0).unwrap();
        assert_eq!(region.rects().len(), 3);
    }

    #[test]
    fn take_leaves_accumulator_empty_for_next_frame() {
        let mut acc = DamageAccumulator::new();
        acc.add(Region::from_rect(Rectangle::new(0, 0, 5, 5)));
        let _ = acc.take();
        assert!(acc.is_empty());
    }
}

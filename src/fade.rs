//! Fade scheduler (C6): drives opacity animations on a fixed time grid.
//!
//! A `slotmap::SlotMap` replaces the original's singly linked list (the
//! "owning ordered sequence, no back-links" design note in SPEC_FULL §9):
//! a stable key survives the mutation a callback may trigger (e.g.
//! completing a destroy), so `tick` can safely read an entry, act on it,
//! and remove it without invalidating anything else it still needs to
//! visit — the slotmap generation check is the safety net the original's
//! "read `next` before dequeueing" comment hand-rolls.

use crate::geometry::WindowId;
use crate::window::record::OPAQUE;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// A stable handle to one in-flight fade, held by the window record it
    /// animates (`WindowRecord::fade_key`).
    pub struct FadeKey;
}

/// What to do once a fade reaches its target (§9: tagged variant replacing
/// function-pointer callbacks).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeFinish {
    /// Opacity animation only; nothing else to do.
    None,
    /// The window finished fading out after an unmap; release its
    /// remaining resources now.
    UnmapFinish(WindowId),
    /// The window finished fading out after a destroy; tear it down.
    /// `gone` mirrors the destroy's own flag (the window may already be
    /// gone from the server's perspective).
    DestroyFinish(WindowId, bool),
}

#[derive(Debug, Clone)]
struct FadeEntry {
    window: WindowId,
    current: f64,
    finish: f64,
    step: f64,
    callback: FadeFinish,
}

impl FadeEntry {
    /// Advances by `steps` ticks, clamping to `finish` once crossed in the
    /// direction `step`'s sign implies. Returns the new current value.
    fn advance(&mut self, steps: u32) -> f64 {
        self.current += self.step * steps as f64;
        if (self.step > 0.0 && self.current >= self.finish)
            || (self.step < 0.0 && self.current <= self.finish)
        {
            self.current = self.finish;
        }
        self.current
    }

    fn is_done(&self) -> bool {
        self.current == self.finish
    }
}

/// Result of one `enqueue` or `tick` step affecting a window's opacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpacityUpdate {
    pub window: WindowId,
    pub opacity: u32,
}

/// Drives all in-flight fades on a fixed `delta_ms` time grid.
#[derive(Debug)]
pub struct FadeScheduler {
    entries: SlotMap<FadeKey, FadeEntry>,
    delta_ms: u64,
}

impl FadeScheduler {
    pub fn new(delta_ms: u64) -> Self {
        Self { entries: SlotMap::with_key(), delta_ms: delta_ms.max(1) }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wait time until the next tick should run, or `None` ("infinite")
    /// if no fades are pending (§4.6, §5).
    pub fn timeout_ms(&self) -> Option<u64> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.delta_ms)
        }
    }

    /// Enqueues or replaces the fade for `window`.
    ///
    /// If `existing` names a fade already running for this window and
    /// `override_existing` is `false`, this is a no-op (silently ignored,
    /// per §4.6). Otherwise the entry's target, step, and callback are
    /// (re)set; a displaced callback is returned so the caller can fire it
    /// (the "optionally firing the previous callback" case).
    pub fn enqueue(
        &mut self,
        existing: Option<FadeKey>,
        window: WindowId,
        start: f64,
        finish: f64,
        step: f64,
        callback: FadeFinish,
        override_existing: bool,
    ) -> (FadeKey, Option<FadeFinish>) {
        if let Some(key) = existing {
            if let Some(entry) = self.entries.get_mut(key) {
                if !override_existing {
                    return (key, None);
                }
                let displaced = entry.callback;
                entry.finish = finish;
                entry.step = step;
                entry.callback = callback;
                let displaced = if displaced == FadeFinish::None { None } else { Some(displaced) };
                return (key, displaced);
            }
        }
        let key = self.entries.insert(FadeEntry { window, current: start, finish, step, callback });
        (key, None)
    }

    /// Cancels `key`'s fade without firing its callback (§4.6
    /// cancellation: destroying a window cancels its fade silently).
    pub fn cancel(&mut self, key: FadeKey) {
        self.entries.remove(key);
    }

    pub fn current_opacity(&self, key: FadeKey) -> Option<f64> {
        self.entries.get(key).map(|e| e.current)
    }

    /// Advances every entry by `steps` ticks, dequeuing and firing the
    /// callback of any that reached their target. Returns the opacity
    /// update for every entry still ticking or just completed, paired
    /// with the completed ones' finish callbacks.
    pub fn tick(&mut self, steps: u32) -> (Vec<OpacityUpdate>, Vec<FadeFinish>) {
        if steps == 0 {
            return (Vec::new(), Vec::new());
        }
        let mut updates = Vec::new();
        let mut finishes = Vec::new();
        let keys: Vec<FadeKey> = self.entries.keys().collect();
        for key in keys {
            // An earlier finish in this same batch may have removed other
            // entries (e.g. a destroy callback cancels a sibling's fade);
            // re-check membership before touching each one.
            let Some(entry) = self.entries.get_mut(key) else { continue };
            let current = entry.advance(steps);
            updates.push(OpacityUpdate {
                window: entry.window,
                opacity: (current.clamp(0.0, 1.0) * OPAQUE as f64) as u32,
            });
            if entry.is_done() {
                let callback = entry.callback;
                self.entries.remove(key);
                if callback != FadeFinish::None {
                    finishes.push(callback);
                }
            }
        }
        (updates, finishes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_in_reaches_target_after_expected_ticks() {
        let mut sched = FadeScheduler::new(10);
        let (key, _) = sched.enqueue(None, 1, 0.0, 1.0, 0.028, FadeFinish::None, false);
        let ticks = (1.0 / 0.028).ceil() as u32;
        let mut last_opacity = 0;
        for _ in 0..ticks {
            let (updates, _) = sched.tick(1);
            last_opacity = updates.iter().find(|u| u.window == 1).unwrap().opacity;
        }
        assert!(sched.current_opacity(key).is_none()); // entry dequeued
        assert_eq!(last_opacity, OPAQUE);
    }

    #[test]
    fn opacity_distance_to_finish_is_monotonically_non_increasing() {
        let mut sched = FadeScheduler::new(10);
        sched.enqueue(None, 1, 0.2, 0.9, 0.05, FadeFinish::None, false);
        let mut prev_distance = f64::MAX;
        for _ in 0..20 {
            let (updates, _) = sched.tick(1);
            if let Some(u) = updates.iter().find(|u| u.window == 1) {
                let distance = (0.9 - u.opacity as f64 / OPAQUE as f64).abs();
                assert!(distance <= prev_distance + 1e-9);
                prev_distance = distance;
            }
        }
    }

    #[test]
    fn non_overriding_enqueue_on_existing_fade_is_a_no_op() {
        let mut sched = FadeScheduler::new(10);
        let (key, _) = sched.enqueue(None, 1, 0.0, 1.0, 0.1, FadeFinish::None, false);
        let (key2, displaced) = sched.enqueue(Some(key), 1, 0.0, 0.5, 0.2, FadeFinish::None, false);
        assert_eq!(key, key2);
        assert!(displaced.is_none());
        assert_eq!(sched.current_opacity(key), Some(0.0));
    }

    #[test]
    fn overriding_enqueue_replaces_target_and_returns_displaced_callback() {
        let mut sched = FadeScheduler::new(10);
        let (key, _) = sched.enqueue(None, 42, 1.0, 0.0, -0.1, FadeFinish::UnmapFinish(42), false);
        let (_, displaced) =
            sched.enqueue(Some(key), 42, 1.0, 1.0, 0.1, FadeFinish::None, true);
        assert_eq!(displaced, Some(FadeFinish::UnmapFinish(42)));
    }

    #[test]
    fn cancel_drops_fade_without_firing_callback() {
        let mut sched = FadeScheduler::new(10);
        let (key, _) = sched.enqueue(None, 7, 1.0, 0.0, -0.1, FadeFinish::DestroyFinish(7, true), false);
        sched.cancel(key);
        let (_, finishes) = sched.tick(100);
        assert!(finishes.is_empty());
    }

    #[test]
    fn timeout_is_none_when_no_fades_pending() {
        let sched = FadeScheduler::new(10);
        assert_eq!(sched.timeout_ms(), None);
    }
}

//! Atom cache.
//!
//! Styled after the teacher's `utils::interner` (a global string→symbol
//! cache with a `preload_common_*` warm-up step), but backed by
//! `rustc_hash::FxHashMap` rather than `lasso`: every atom name ultimately
//! requires a real `InternAtom` round trip to the server the first time
//! it's seen, so there is nothing for a dedicated interner crate to buy us
//! beyond a fast hash map.

use crate::error::Result;
use crate::geometry::AtomId;
use rustc_hash::FxHashMap;

/// Names of every atom the engine consumes (§3, §6).
pub const NET_WM_WINDOW_OPACITY: &str = "_NET_WM_WINDOW_OPACITY";
pub const NET_WM_WINDOW_TYPE: &str = "_NET_WM_WINDOW_TYPE";
pub const NET_WM_WINDOW_TYPE_DESKTOP: &str = "_NET_WM_WINDOW_TYPE_DESKTOP";
pub const NET_WM_WINDOW_TYPE_DOCK: &str = "_NET_WM_WINDOW_TYPE_DOCK";
pub const NET_WM_WINDOW_TYPE_TOOLBAR: &str = "_NET_WM_WINDOW_TYPE_TOOLBAR";
pub const NET_WM_WINDOW_TYPE_MENU: &str = "_NET_WM_WINDOW_TYPE_MENU";
pub const NET_WM_WINDOW_TYPE_UTILITY: &str = "_NET_WM_WINDOW_TYPE_UTILITY";
pub const NET_WM_WINDOW_TYPE_SPLASH: &str = "_NET_WM_WINDOW_TYPE_SPLASH";
pub const NET_WM_WINDOW_TYPE_DIALOG: &str = "_NET_WM_WINDOW_TYPE_DIALOG";
pub const NET_WM_WINDOW_TYPE_NORMAL: &str = "_NET_WM_WINDOW_TYPE_NORMAL";
pub const NET_WM_NAME: &str = "_NET_WM_NAME";
pub const XROOTPMAP_ID: &str = "_XROOTPMAP_ID";
pub const XSETROOT_ID: &str = "_XSETROOT_ID";

const PRELOAD: &[&str] = &[
    NET_WM_WINDOW_OPACITY,
    NET_WM_WINDOW_TYPE,
    NET_WM_WINDOW_TYPE_DESKTOP,
    NET_WM_WINDOW_TYPE_DOCK,
    NET_WM_WINDOW_TYPE_TOOLBAR,
    NET_WM_WINDOW_TYPE_MENU,
    NET_WM_WINDOW_TYPE_UTILITY,
    NET_WM_WINDOW_TYPE_SPLASH,
    NET_WM_WINDOW_TYPE_DIALOG,
    NET_WM_WINDOW_TYPE_NORMAL,
    NET_WM_NAME,
    XROOTPMAP_ID,
    XSETROOT_ID,
];

/// Caches atom name → id lookups so each distinct name is interned with
/// the server at most once per connection.
#[derive(Debug, Default)]
pub struct AtomCache {
    by_name: FxHashMap<String, AtomId>,
}

impl AtomCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns every well-known atom name up front via `lookup`, so the
    /// hot path (property-change dispatch) never blocks on a round trip.
    pub fn preload(&mut self, mut lookup: impl FnMut(&str) -> Result<AtomId>) -> Result<()> {
        for name in PRELOAD {
            self.get_or_intern(name, &mut lookup)?;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<AtomId> {
        self.by_name.get(name).copied()
    }

    pub fn get_or_intern(
        &mut self,
        name: &str,
        lookup: &mut impl FnMut(&str) -> Result<AtomId>,
    ) -> Result<AtomId> {
        if let Some(&id) = self.by_name.get(name) {
            return Ok(id);
        }
        let id = lookup(name)?;
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_or_intern_caches_after_first_lookup() {
        let mut cache = AtomCache::new();
        let mut calls = 0;
        let mut lookup = |_: &str| {
            calls += 1;
            Ok(42)
        };
        assert_eq!(cache.get_or_intern("_NET_WM_NAME", &mut lookup).unwrap(), 42);
        assert_eq!(cache.get_or_intern("_NET_WM_NAME", &mut lookup).unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn preload_populates_all_well_known_names() {
        let mut cache = AtomCache::new();
        let mut next = 100u32;
        cache
            .preload(|_| {
                next += 1;
                Ok(next)
            })
            .unwrap();
        assert!(cache.get(NET_WM_WINDOW_OPACITY).is_some());
        assert!(cache.get(NET_WM_NAME).is_some());
    }
}

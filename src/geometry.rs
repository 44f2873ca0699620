//! Geometry primitives: rectangles and region (rectangle-set) algebra.
//!
//! The wire protocol models a region as an opaque server-side handle (see
//! the GLOSSARY in SPEC_FULL.md). Here it is instead an owned value built from
//! [`Rectangle`]s, following the "replace cached handles and linked
//! structures with owned sequences" guidance: region algebra is simple
//! enough that doing it client-side, and only pushing the *result* through
//! the display transport, keeps the engine testable without a live server.

use smallvec::SmallVec;

/// A window or screen identifier, as assigned by the X server.
pub type WindowId = u32;

/// An X atom.
pub type AtomId = u32;

/// An axis-aligned rectangle in root (screen) coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rectangle {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }

    /// Grows the rectangle outward by `amount` on every side.
    pub fn inflated(&self, amount: i32) -> Self {
        let x = self.x - amount;
        let y = self.y - amount;
        let width = (self.width as i32 + 2 * amount).max(0) as u32;
        let height = (self.height as i32 + 2 * amount).max(0) as u32;
        Self { x, y, width, height }
    }

    pub fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Returns the intersection of `self` and `other`, or `None` if disjoint.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        Some(Self::new(x, y, (right - x) as u32, (bottom - y) as u32))
    }

    /// Returns the smallest rectangle containing both `self` and `other`.
    pub fn union_bounds(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Self::new(x, y, (right - x) as u32, (bottom - y) as u32)
    }
}

/// A set of rectangles with union, intersection, subtraction and
/// translation, standing in for the server's `XserverRegion`.
///
/// The rectangle list is not kept minimal: overlapping or adjacent
/// rectangles are not merged. That is fine for clip lists (painting the
/// same pixel twice under a clip is wasteful, not incorrect) and keeps the
/// algebra here small and easy to trust.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Region {
    rects: SmallVec<[Rectangle; 4]>,
}

impl Region {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: Rectangle) -> Self {
        if rect.is_empty() {
            Self::empty()
        } else {
            Self { rects: SmallVec::from_iter([rect]) }
        }
    }

    pub fn from_rects(rects: impl IntoIterator<Item = Rectangle>) -> Self {
        let rects: SmallVec<[Rectangle; 4]> =
            rects.into_iter().filter(|r| !r.is_empty()).collect();
        Self { rects }
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rectangle] {
        &self.rects
    }

    /// The bounding rectangle of every rectangle in the region.
    pub fn extents(&self) -> Rectangle {
        self.rects
            .iter()
            .fold(Rectangle::default(), |acc, r| acc.union_bounds(r))
    }

    /// Unions `other` into `self` in place, taking ownership of `other`'s
    /// rectangles (mirroring the "takes ownership of `region`" contract of
    /// the damage accumulator's `add`).
    pub fn union_with(&mut self, other: Region) {
        self.rects.extend(other.rects);
    }

    pub fn union(&self, other: &Region) -> Region {
        let mut rects = self.rects.clone();
        rects.extend(other.rects.iter().copied());
        Region { rects }
    }

    /// Removes the area covered by `other` from `self`.
    pub fn subtract(&self, other: &Region) -> Region {
        let mut remaining: SmallVec<[Rectangle; 4]> = self.rects.clone();
        for cut in &other.rects {
            let mut next: SmallVec<[Rectangle; 4]> = SmallVec::new();
            for r in remaining {
                next.extend(subtract_rect(r, *cut));
            }
            remaining = next;
        }
        Region { rects: remaining }
    }

    pub fn intersect(&self, other: &Region) -> Region {
        let mut rects = SmallVec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(r) = a.intersection(b) {
                    rects.push(r);
                }
            }
        }
        Region { rects }
    }

    pub fn translated(&self, dx: i32, dy: i32) -> Region {
        Region { rects: self.rects.iter().map(|r| r.translated(dx, dy)).collect() }
    }
}

/// Splits `a` into the (up to four) sub-rectangles not covered by `b`.
fn subtract_rect(a: Rectangle, b: Rectangle) -> SmallVec<[Rectangle; 4]> {
    let Some(overlap) = a.intersection(&b) else {
        return SmallVec::from_iter([a]);
    };
    let mut out = SmallVec::new();
    // Top strip.
    if overlap.y > a.y {
        out.push(Rectangle::new(a.x, a.y, a.width, (overlap.y - a.y) as u32));
    }
    // Bottom strip.
    if overlap.bottom() < a.bottom() {
        out.push(Rectangle::new(
            a.x,
            overlap.bottom(),
            a.width,
            (a.bottom() - overlap.bottom()) as u32,
        ));
    }
    // Left strip, restricted to the overlap's vertical span.
    if overlap.x > a.x {
        out.push(Rectangle::new(
            a.x,
            overlap.y,
            (overlap.x - a.x) as u32,
            overlap.height,
        ));
    }
    // Right strip, restricted to the overlap's vertical span.
    if overlap.right() < a.right() {
        out.push(Rectangle::new(
            overlap.right(),
            overlap.y,
            (a.right() - overlap.right()) as u32,
            overlap.height,
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_rects_is_none() {
        let a = Rectangle::new(0, 0, 10, 10);
        let b = Rectangle::new(20, 20, 10, 10);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn subtract_full_overlap_leaves_empty() {
        let region = Region::from_rect(Rectangle::new(0, 0, 10, 10));
        let cut = Region::from_rect(Rectangle::new(-5, -5, 20, 20));
        assert!(region.subtract(&cut).is_empty());
    }

    #[test]
    fn subtract_center_leaves_four_strips_covering_original_area() {
        let region = Region::from_rect(Rectangle::new(0, 0, 10, 10));
        let cut = Region::from_rect(Rectangle::new(3, 3, 4, 4));
        let result = region.subtract(&cut);
        let area: u32 = result.rects().iter().map(|r| r.width * r.height).sum();
        assert_eq!(area, 10 * 10 - 4 * 4);
    }

    #[test]
    fn union_then_extents_covers_both_rects() {
        let a = Region::from_rect(Rectangle::new(0, 0, 10, 10));
        let b = Region::from_rect(Rectangle::new(50, 50, 10, 10));
        let u = a.union(&b);
        assert_eq!(u.extents(), Rectangle::new(0, 0, 60, 60));
    }

    #[test]
    fn intersect_picks_overlapping_area_only() {
        let a = Region::from_rect(Rectangle::new(0, 0, 10, 10));
        let b = Region::from_rect(Rectangle::new(5, 5, 10, 10));
        let i = a.intersect(&b);
        assert_eq!(i.extents(), Rectangle::new(5, 5, 5, 5));
    }

    #[test]
    fn translate_shifts_every_rect() {
        let r = Region::from_rect(Rectangle::new(0, 0, 10, 10));
        let t = r.translated(5, -5);
        assert_eq!(t.rects()[0], Rectangle::new(5, -5, 10, 10));
    }
}

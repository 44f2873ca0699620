//! Shadow alpha image synthesis (C2's `make_shadow`).

use super::kernel::{GaussianMap, ShadowTables};

/// An 8-bit alpha image, row-major, `width * height` bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaImage {
    pub width: usize,
    pub height: usize,
    data: Vec<u8>,
}

impl AlphaImage {
    fn filled(width: usize, height: usize, value: u8) -> Self {
        Self { width, height, data: vec![value; width * height] }
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

/// Builds the alpha-masked shadow image for a window of size `w * h` at the
/// given effective `opacity` (already scaled by the window's own opacity),
/// using the kernel the tables were built from.
///
/// When `w` and `h` are both at least `tables.size`, the precomputed
/// corner/top tables are used (the fast path). Otherwise every pixel is
/// computed directly via [`GaussianMap::sum_gaussian`] against a
/// `2*size x 2*size` window, matching the original's fallback exactly.
pub fn make_shadow(
    map: &GaussianMap,
    tables: &ShadowTables,
    opacity: f64,
    w: usize,
    h: usize,
) -> AlphaImage {
    let size = tables.size;
    let iw = w + size;
    let ih = h + size;

    if w < size || h < size {
        return make_shadow_direct(map, opacity, iw, ih, size);
    }

    let bucket = ShadowTables::bucket_for(opacity);
    // Interior fill always uses the fully-opaque bucket's deep-interior
    // value; only the edge bands below are opacity-dependent. This
    // reproduces the original's quirk of filling from a fixed bucket
    // rather than the requested one.
    let interior = tables.top(OPACITY_FULL_BUCKET, size);
    let mut image = AlphaImage::filled(iw, ih, interior);

    // Four corners, each `size x size`, mirrored into the far corners.
    for y in 0..size {
        for x in 0..size {
            let v = tables.corner(bucket, y, x);
            image.set(x, y, v); // top-left
            image.set(iw - size + x, y, tables.corner(bucket, y, size - 1 - x)); // top-right
            image.set(x, ih - size + y, tables.corner(bucket, size - 1 - y, x)); // bottom-left
            image.set(
                iw - size + x,
                ih - size + y,
                tables.corner(bucket, size - 1 - y, size - 1 - x),
            ); // bottom-right
        }
    }

    // Top / bottom bands, width `w - size`, height `size`.
    for d in 0..size {
        let v_top = tables.top(bucket, d);
        let v_bottom = tables.top(bucket, size - 1 - d);
        for x in size..w {
            image.set(x, d, v_top);
            image.set(x, ih - size + d, v_bottom);
        }
    }

    // Left / right bands, width `size`, height `h - size`.
    for d in 0..size {
        let v_left = tables.top(bucket, d);
        let v_right = tables.top(bucket, size - 1 - d);
        for y in size..h {
            image.set(d, y, v_left);
            image.set(iw - size + d, y, v_right);
        }
    }

    image
}

const OPACITY_FULL_BUCKET: usize = super::kernel::OPACITY_BUCKETS - 1;

fn make_shadow_direct(
    map: &GaussianMap,
    opacity: f64,
    iw: usize,
    ih: usize,
    size: usize,
) -> AlphaImage {
    let center = (size / 2) as i64;
    let span = (size * 2) as i64;
    let mut image = AlphaImage::filled(iw, ih, 0);
    for y in 0..ih {
        for x in 0..iw {
            let v = map.sum_gaussian(opacity, x as i64 - center, y as i64 - center, span, span);
            image.set(x, y, (v * 255.0).round().clamp(0.0, 255.0) as u8);
        }
    }
    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_window_still_produces_kernel_sized_image() {
        let map = GaussianMap::build(12.0);
        let tables = ShadowTables::presum(&map);
        let image = make_shadow(&map, &tables, 0.75, 0, 0);
        assert_eq!(image.width, tables.size);
        assert_eq!(image.height, tables.size);
    }

    #[test]
    fn large_window_center_equals_interior_fill_value() {
        let map = GaussianMap::build(12.0);
        let tables = ShadowTables::presum(&map);
        let image = make_shadow(&map, &tables, 0.75, 200, 100);
        assert_eq!(image.width, 200 + tables.size);
        assert_eq!(image.height, 100 + tables.size);
        let interior = tables.top(super::OPACITY_FULL_BUCKET, tables.size);
        assert_eq!(image.get(image.width / 2, image.height / 2), interior);
    }

    #[test]
    fn scenario_4_matches_spec_corner_value() {
        let map = GaussianMap::build(12.0);
        assert_eq!(map.size, 36);
        let tables = ShadowTables::presum(&map);
        let bucket = ShadowTables::bucket_for(0.75);
        assert_eq!(bucket, 18);
        let image = make_shadow(&map, &tables, 0.75, 200, 100);
        assert_eq!(image.width, 236);
        assert_eq!(image.height, 136);
        assert_eq!(image.get(0, 0), tables.corner(18, 0, 0));
    }
}

//! Shadow kernel (C2): precomputed gaussian convolution producing
//! per-window drop-shadow alpha images.

pub mod image;
pub mod kernel;

pub use image::{make_shadow, AlphaImage};
pub use kernel::{kernel_size, GaussianMap, ShadowTables};

/// Everything needed to synthesize shadows at a fixed radius: the
/// normalized kernel plus its precomputed opacity-bucket tables.
///
/// Built once at startup (radius does not change at runtime) and shared by
/// every window's `ensure_shadow`.
#[derive(Debug, Clone)]
pub struct ShadowKernel {
    pub map: GaussianMap,
    pub tables: ShadowTables,
}

impl ShadowKernel {
    pub fn build(radius: f64) -> Self {
        let map = GaussianMap::build(radius);
        let tables = ShadowTables::presum(&map);
        Self { map, tables }
    }

    pub fn size(&self) -> usize {
        self.map.size
    }

    pub fn make_shadow(&self, opacity: f64, w: usize, h: usize) -> AlphaImage {
        make_shadow(&self.map, &self.tables, opacity, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_exposes_consistent_size() {
        let kernel = ShadowKernel::build(12.0);
        assert_eq!(kernel.size(), kernel.map.size);
        assert_eq!(kernel.tables.size, kernel.map.size);
    }
}

//! Per-window freelist of reusable `Region` instances
//!
//! The redraw hot path builds and discards scratch regions constantly;
//! recycling them through a small freelist avoids allocation churn.
//! Pools are private to one window and never shared.

use super::Region;

/// Reusable `Region` freelist scoped to one window
#[derive(Debug, Default)]
pub struct RegionPool {
    free: Vec<Region>,
}

impl RegionPool {
    pub fn new() -> Self {
        Self { free: Vec::new() }
    }

    /// Lend an empty region; allocates a fresh one when the pool is dry
    pub fn get_region(&mut self) -> Region {
        match self.free.pop() {
            Some(mut region) => {
                region.clear();
                region
            }
            None => Region::new(),
        }
    }

    /// Lend a region pre-populated with a copy of `source`
    pub fn get_region_copy(&mut self, source: &Region) -> Region {
        let mut region = self.get_region();
        region.set_to(source);
        region
    }

    /// Return a region to the pool for later reuse
    pub fn recycle(&mut self, region: Region) {
        self.free.push(region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Rect;

    #[test]
    fn test_recycled_region_comes_back_empty() {
        let mut pool = RegionPool::new();
        let mut region = pool.get_region();
        region.include_rect(&Rect::from_xywh(0, 0, 10, 10));
        pool.recycle(region);

        let reused = pool.get_region();
        assert!(reused.is_empty());
    }

    #[test]
    fn test_get_region_copy() {
        let mut pool = RegionPool::new();
        let source = Region::from_rect(Rect::from_xywh(1, 2, 3, 4));
        let copy = pool.get_region_copy(&source);
        assert_eq!(copy, source);
    }

    #[test]
    fn test_exhaustion_allocates_fresh() {
        let mut pool = RegionPool::new();
        let a = pool.get_region();
        let b = pool.get_region();
        assert!(a.is_empty());
        assert!(b.is_empty());
    }
}

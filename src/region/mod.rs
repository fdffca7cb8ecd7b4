//! Region algebra over disjoint integer rectangles
//!
//! Clipping, occlusion and dirty tracking are all expressed as exact set
//! operations on pixel regions. A `Region` is a set of disjoint
//! axis-aligned rectangles; every operation is exact, not approximate:
//! intersecting two non-overlapping regions yields exactly the empty
//! region, and `exclude` reports the correct pixel set even when it does
//! not coalesce rectangles.

pub mod pool;

pub use pool::RegionPool;

/// Axis-aligned integer rectangle, half-open on the right and bottom
/// (`left <= x < right`, `top <= y < bottom`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Construct from origin and size; extents past the coordinate
    /// limits saturate rather than wrap
    pub fn from_xywh(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            left: x,
            top: y,
            right: x.saturating_add(width),
            bottom: y.saturating_add(height),
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// A rectangle with no pixels
    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left && x < self.right && y >= self.top && y < self.bottom
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let r = Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        };
        if r.is_empty() {
            None
        } else {
            Some(r)
        }
    }

    pub fn offset_by(&self, dx: i32, dy: i32) -> Rect {
        Rect {
            left: self.left + dx,
            top: self.top + dy,
            right: self.right + dx,
            bottom: self.bottom + dy,
        }
    }

    /// Pieces of `self` not covered by `other` (0 to 4 disjoint rects)
    fn subtract(&self, other: &Rect) -> SubtractPieces {
        let mut pieces = SubtractPieces::default();
        let Some(overlap) = self.intersection(other) else {
            pieces.push(*self);
            return pieces;
        };

        // Band above the overlap
        if overlap.top > self.top {
            pieces.push(Rect::new(self.left, self.top, self.right, overlap.top));
        }
        // Band below the overlap
        if overlap.bottom < self.bottom {
            pieces.push(Rect::new(self.left, overlap.bottom, self.right, self.bottom));
        }
        // Left and right slivers, clamped to the overlap's vertical band
        if overlap.left > self.left {
            pieces.push(Rect::new(self.left, overlap.top, overlap.left, overlap.bottom));
        }
        if overlap.right < self.right {
            pieces.push(Rect::new(overlap.right, overlap.top, self.right, overlap.bottom));
        }
        pieces
    }
}

/// Stack-allocated result of a rect/rect subtraction
#[derive(Default)]
struct SubtractPieces {
    rects: [Rect; 4],
    count: usize,
}

impl SubtractPieces {
    fn push(&mut self, r: Rect) {
        self.rects[self.count] = r;
        self.count += 1;
    }

    fn as_slice(&self) -> &[Rect] {
        &self.rects[..self.count]
    }
}

/// A set of disjoint integer rectangles with exact boolean set operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// The empty region
    pub fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// A region covering exactly one rectangle
    pub fn from_rect(rect: Rect) -> Self {
        let mut region = Self::new();
        region.include_rect(&rect);
        region
    }

    /// Replace the contents with a single rectangle
    pub fn set_to_rect(&mut self, rect: Rect) {
        self.rects.clear();
        if !rect.is_empty() {
            self.rects.push(rect);
        }
    }

    /// Replace the contents with a copy of `other`
    pub fn set_to(&mut self, other: &Region) {
        self.rects.clear();
        self.rects.extend_from_slice(&other.rects);
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn count_rects(&self) -> usize {
        self.rects.len()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Set union with a single rectangle
    pub fn include_rect(&mut self, rect: &Rect) {
        if rect.is_empty() {
            return;
        }
        // Keep rects disjoint: only insert the pieces of `rect` that are
        // not already covered.
        let mut pending = vec![*rect];
        for existing in &self.rects {
            let mut next = Vec::with_capacity(pending.len());
            for piece in &pending {
                next.extend_from_slice(piece.subtract(existing).as_slice());
            }
            pending = next;
            if pending.is_empty() {
                return;
            }
        }
        self.rects.extend(pending);
    }

    /// Set union: `self = self ∪ other`
    pub fn include(&mut self, other: &Region) {
        for rect in &other.rects {
            self.include_rect(rect);
        }
    }

    /// Set intersection: `self = self ∩ other`
    pub fn intersect_with(&mut self, other: &Region) {
        let mut result = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                if let Some(r) = a.intersection(b) {
                    result.push(r);
                }
            }
        }
        self.rects = result;
    }

    /// Restrict to a single rectangle
    pub fn intersect_with_rect(&mut self, rect: &Rect) {
        self.rects = self
            .rects
            .iter()
            .filter_map(|r| r.intersection(rect))
            .collect();
    }

    /// Set difference with a single rectangle
    pub fn exclude_rect(&mut self, rect: &Rect) {
        if rect.is_empty() {
            return;
        }
        let mut result = Vec::with_capacity(self.rects.len());
        for r in &self.rects {
            result.extend_from_slice(r.subtract(rect).as_slice());
        }
        self.rects = result;
    }

    /// Set difference: `self = self \ other`
    pub fn exclude(&mut self, other: &Region) {
        for rect in &other.rects {
            self.exclude_rect(rect);
            if self.rects.is_empty() {
                return;
            }
        }
    }

    /// Translate every rectangle by (dx, dy)
    pub fn offset_by(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        for r in &mut self.rects {
            *r = r.offset_by(dx, dy);
        }
    }

    /// Bounding rectangle of the whole region (empty rect if empty)
    pub fn frame(&self) -> Rect {
        let mut iter = self.rects.iter();
        let Some(first) = iter.next() else {
            return Rect::default();
        };
        let mut frame = *first;
        for r in iter {
            frame.left = frame.left.min(r.left);
            frame.top = frame.top.min(r.top);
            frame.right = frame.right.max(r.right);
            frame.bottom = frame.bottom.max(r.bottom);
        }
        frame
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    pub fn intersects_rect(&self, rect: &Rect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// Total pixel count (rects are disjoint, so a plain sum is exact)
    pub fn area(&self) -> i64 {
        self.rects
            .iter()
            .map(|r| r.width() as i64 * r.height() as i64)
            .sum()
    }

    /// True if every pixel of `other` is also in `self`
    pub fn contains_region(&self, other: &Region) -> bool {
        let mut probe = other.clone();
        probe.exclude(self);
        probe.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: i32, h: i32) -> Rect {
        Rect::from_xywh(x, y, w, h)
    }

    #[test]
    fn test_empty_region() {
        let region = Region::new();
        assert!(region.is_empty());
        assert_eq!(region.count_rects(), 0);
        assert_eq!(region.area(), 0);
    }

    #[test]
    fn test_include_disjoint_rects() {
        let mut region = Region::from_rect(rect(0, 0, 10, 10));
        region.include_rect(&rect(20, 0, 10, 10));
        assert_eq!(region.count_rects(), 2);
        assert_eq!(region.area(), 200);
    }

    #[test]
    fn test_include_overlapping_does_not_double_count() {
        let mut region = Region::from_rect(rect(0, 0, 10, 10));
        region.include_rect(&rect(5, 0, 10, 10));
        // 10x10 plus the uncovered 5x10 strip
        assert_eq!(region.area(), 150);
        assert!(region.contains_point(12, 5));
        assert!(!region.contains_point(15, 5));
    }

    #[test]
    fn test_include_fully_covered_is_noop() {
        let mut region = Region::from_rect(rect(0, 0, 100, 100));
        region.include_rect(&rect(10, 10, 20, 20));
        assert_eq!(region.count_rects(), 1);
        assert_eq!(region.area(), 10_000);
    }

    #[test]
    fn test_intersect_non_overlapping_is_exactly_empty() {
        let mut a = Region::from_rect(rect(0, 0, 10, 10));
        let b = Region::from_rect(rect(10, 0, 10, 10));
        a.intersect_with(&b);
        assert!(a.is_empty());
        assert_eq!(a.count_rects(), 0);
    }

    #[test]
    fn test_intersect_overlapping() {
        let mut a = Region::from_rect(rect(0, 0, 10, 10));
        let b = Region::from_rect(rect(5, 5, 10, 10));
        a.intersect_with(&b);
        assert_eq!(a.area(), 25);
        assert_eq!(a.frame(), rect(5, 5, 5, 5));
    }

    #[test]
    fn test_exclude_center_hole() {
        let mut region = Region::from_rect(rect(0, 0, 30, 30));
        region.exclude_rect(&rect(10, 10, 10, 10));
        assert_eq!(region.area(), 800);
        assert!(!region.contains_point(15, 15));
        assert!(region.contains_point(5, 15));
        assert!(region.contains_point(25, 15));
        assert!(region.contains_point(15, 5));
        assert!(region.contains_point(15, 25));
    }

    #[test]
    fn test_exclude_everything() {
        let mut region = Region::from_rect(rect(0, 0, 10, 10));
        region.exclude_rect(&rect(-5, -5, 30, 30));
        assert!(region.is_empty());
    }

    #[test]
    fn test_offset_by() {
        let mut region = Region::from_rect(rect(0, 0, 10, 10));
        region.include_rect(&rect(20, 20, 5, 5));
        region.offset_by(3, -2);
        assert_eq!(region.frame(), Rect::new(3, -2, 28, 23));
        assert_eq!(region.area(), 125);
    }

    #[test]
    fn test_frame_spans_all_rects() {
        let mut region = Region::from_rect(rect(0, 0, 10, 10));
        region.include_rect(&rect(50, 40, 10, 10));
        assert_eq!(region.frame(), Rect::new(0, 0, 60, 50));
    }

    #[test]
    fn test_contains_region() {
        let outer = Region::from_rect(rect(0, 0, 100, 100));
        let inner = Region::from_rect(rect(10, 10, 20, 20));
        assert!(outer.contains_region(&inner));
        assert!(!inner.contains_region(&outer));
    }

    #[test]
    fn test_union_then_subtract_restores_disjoint_part() {
        // (A ∪ B) \ B leaves exactly A \ B
        let mut union = Region::from_rect(rect(0, 0, 10, 10));
        union.include_rect(&rect(5, 0, 10, 10));
        let b = Region::from_rect(rect(5, 0, 10, 10));
        union.exclude(&b);
        assert_eq!(union.area(), 50);
        assert_eq!(union.frame(), rect(0, 0, 5, 10));
    }

    #[test]
    fn test_from_xywh_saturates_on_extreme_size() {
        let r = Rect::from_xywh(i32::MAX - 10, 5, i32::MAX, i32::MAX);
        assert_eq!(r.right, i32::MAX);
        assert_eq!(r.bottom, i32::MAX);
        assert!(!r.is_empty());
        assert_eq!(r.width(), 10);
    }

    #[test]
    fn test_empty_rect_include_is_noop() {
        let mut region = Region::new();
        region.include_rect(&Rect::new(5, 5, 5, 5));
        assert!(region.is_empty());
    }
}

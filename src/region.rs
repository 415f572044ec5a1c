//! Clip regions made of disjoint boxes.
//!
//! A region with a single box is "simple": spans only need clamping to its
//! extents, which the sweep already does. Anything else is "complex" and
//! every span is split against each box.

use smallvec::SmallVec;

use crate::basics::BoxI;

/// Union of non-overlapping boxes with cached extents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipRegion {
    extents: BoxI,
    boxes: SmallVec<[BoxI; 4]>,
}

impl ClipRegion {
    /// Region covering exactly `b`.
    pub fn new(b: BoxI) -> Self {
        let mut boxes = SmallVec::new();
        if !b.is_empty() {
            boxes.push(b);
        }
        Self { extents: b, boxes }
    }

    /// Region of a `width` x `height` surface.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(BoxI::new(0, 0, width, height))
    }

    /// Region covered by `boxes`. Empty boxes are dropped; the caller
    /// guarantees the rest do not overlap.
    pub fn from_boxes<I: IntoIterator<Item = BoxI>>(boxes: I) -> Self {
        let boxes: SmallVec<[BoxI; 4]> = boxes.into_iter().filter(|b| !b.is_empty()).collect();
        let extents = boxes
            .iter()
            .fold(BoxI::default(), |acc, b| acc.union(b));
        debug_assert!(
            boxes
                .iter()
                .enumerate()
                .all(|(i, a)| boxes[i + 1..].iter().all(|b| a.intersect(b).is_none())),
            "clip boxes overlap"
        );
        Self { extents, boxes }
    }

    #[inline]
    pub fn extents(&self) -> &BoxI {
        &self.extents
    }

    #[inline]
    pub fn boxes(&self) -> &[BoxI] {
        &self.boxes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// True when clipping needs more than the extents.
    #[inline]
    pub fn is_complex(&self) -> bool {
        self.boxes.len() > 1
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        self.extents.contains(x, y) && self.boxes.iter().any(|b| b.contains(x, y))
    }

    /// Restrict the region to `clip`.
    pub fn intersect(&self, clip: &BoxI) -> ClipRegion {
        ClipRegion::from_boxes(self.boxes.iter().filter_map(|b| b.intersect(clip)))
    }

    /// Call `f` with every piece of `b` inside the region.
    #[inline]
    pub fn for_each_piece<F: FnMut(&BoxI)>(&self, b: &BoxI, mut f: F) {
        if self.extents.intersect(b).is_none() {
            return;
        }
        for piece in self.boxes.iter().filter_map(|c| c.intersect(b)) {
            f(&piece);
        }
    }
}

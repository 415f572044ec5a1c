//! Span consumers.
//!
//! The sweep reports its output as boxes of uniform coverage. A box may be
//! several rows tall when rows were stepped in bulk. Coverage is in grid
//! units: `0..=grid_area`, always even.

use crate::basics::BoxI;
use crate::region::ClipRegion;

/// Receives `(box, coverage)` pairs from the sweep, in row order and left
/// to right within a row.
pub trait SpanSink {
    fn span(&mut self, b: &BoxI, coverage: i32);
}

impl<F: FnMut(&BoxI, i32)> SpanSink for F {
    #[inline]
    fn span(&mut self, b: &BoxI, coverage: i32) {
        self(b, coverage)
    }
}

// ============================================================================
// Clipped
// ============================================================================

/// Splits every span against a complex clip region.
pub struct Clipped<'r, S> {
    clip: &'r ClipRegion,
    inner: S,
}

impl<'r, S: SpanSink> Clipped<'r, S> {
    pub fn new(clip: &'r ClipRegion, inner: S) -> Self {
        Self { clip, inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: SpanSink> SpanSink for Clipped<'_, S> {
    fn span(&mut self, b: &BoxI, coverage: i32) {
        let inner = &mut self.inner;
        self.clip.for_each_piece(b, |piece| inner.span(piece, coverage));
    }
}

// ============================================================================
// Damage
// ============================================================================

/// Accumulated set of boxes that were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Damage {
    extents: BoxI,
    boxes: Vec<BoxI>,
}

impl Damage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, b: &BoxI) {
        if b.is_empty() {
            return;
        }
        self.extents = self.extents.union(b);
        self.boxes.push(*b);
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

    /// Total damaged pixels, counting overlaps once per box.
    pub fn area(&self) -> i64 {
        self.boxes.iter().map(BoxI::area).sum()
    }
}

/// Forwards spans and records each one as damage.
pub struct Damaged<'d, S> {
    damage: &'d mut Damage,
    inner: S,
}

impl<'d, S: SpanSink> Damaged<'d, S> {
    pub fn new(damage: &'d mut Damage, inner: S) -> Self {
        Self { damage, inner }
    }
}

impl<S: SpanSink> SpanSink for Damaged<'_, S> {
    #[inline]
    fn span(&mut self, b: &BoxI, coverage: i32) {
        self.inner.span(b, coverage);
        self.damage.add(b);
    }
}

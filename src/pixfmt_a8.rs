//! In-place span sinks for 8-bit alpha surfaces.
//!
//! Each sink converts a span's coverage to an 8-bit alpha (scaled by the
//! source opacity) and applies one operator directly to the destination
//! bytes. Boxes are in absolute surface coordinates and must lie inside
//! the accessor's rows.

use crate::basics::BoxI;
use crate::color::mul_8_8;
use crate::grid::SampleGrid;
use crate::rendering_buffer::RowAccessor;
use crate::span_sink::SpanSink;

/// Operators the a8 fast path applies in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum A8Op {
    /// `dst = alpha`
    Src,
    /// `dst = dst * alpha`
    In,
    /// `dst = min(dst + alpha, 255)`
    Add,
}

/// Coverage as alpha, scaled by `opacity` unless it is opaque.
#[inline]
pub fn coverage_opacity(grid: &SampleGrid, coverage: i32, opacity: u8) -> u8 {
    let a = grid.to_alpha(coverage);
    if opacity == 0xff {
        a
    } else {
        mul_8_8(a, opacity)
    }
}

/// Writes `op(dst, coverage * opacity)` for every span.
pub struct InplaceA8<'a, 'b> {
    rbuf: &'a mut RowAccessor<'b>,
    op: A8Op,
    opacity: u8,
    grid: SampleGrid,
}

impl<'a, 'b> InplaceA8<'a, 'b> {
    pub fn new(rbuf: &'a mut RowAccessor<'b>, op: A8Op, opacity: u8, grid: SampleGrid) -> Self {
        debug_assert_eq!(rbuf.bpp(), 1);
        Self {
            rbuf,
            op,
            opacity,
            grid,
        }
    }

    fn blt_src(&mut self, b: &BoxI, coverage: i32) {
        let a = coverage_opacity(&self.grid, coverage, self.opacity);
        self.rbuf.fill_box(b, a);
    }

    fn blt_in(&mut self, b: &BoxI, coverage: i32) {
        if coverage == 0 || self.opacity == 0 {
            self.rbuf.fill_box(b, 0);
            return;
        }
        let a = coverage_opacity(&self.grid, coverage, self.opacity);
        if a == 0xff {
            return;
        }
        for y in b.y1..b.y2 {
            for p in self.rbuf.span_mut(y, b.x1, b.x2) {
                *p = mul_8_8(*p, a);
            }
        }
    }

    fn blt_add(&mut self, b: &BoxI, coverage: i32) {
        if coverage == 0 {
            return;
        }
        let a = coverage_opacity(&self.grid, coverage, self.opacity);
        if a == 0xff {
            self.rbuf.fill_box(b, 0xff);
            return;
        }
        for y in b.y1..b.y2 {
            for p in self.rbuf.span_mut(y, b.x1, b.x2) {
                *p = p.saturating_add(a);
            }
        }
    }
}

impl SpanSink for InplaceA8<'_, '_> {
    fn span(&mut self, b: &BoxI, coverage: i32) {
        match self.op {
            A8Op::Src => self.blt_src(b, coverage),
            A8Op::In => self.blt_in(b, coverage),
            A8Op::Add => self.blt_add(b, coverage),
        }
    }
}

/// Writes coverage alpha into a standalone mask.
pub struct MaskWriter<'a, 'b> {
    rbuf: &'a mut RowAccessor<'b>,
    grid: SampleGrid,
}

impl<'a, 'b> MaskWriter<'a, 'b> {
    pub fn new(rbuf: &'a mut RowAccessor<'b>, grid: SampleGrid) -> Self {
        debug_assert_eq!(rbuf.bpp(), 1);
        Self { rbuf, grid }
    }
}

impl SpanSink for MaskWriter<'_, '_> {
    #[inline]
    fn span(&mut self, b: &BoxI, coverage: i32) {
        let a = self.grid.to_alpha(coverage);
        self.rbuf.fill_box(b, a);
    }
}

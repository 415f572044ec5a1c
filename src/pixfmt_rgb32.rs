//! In-place span sink for 32-bit packed color surfaces with a solid source.
//!
//! Pixels are native-endian `u32` values laid out as `0xAARRGGBB`
//! (premultiplied; the alpha byte is ignored on x8r8g8b8 surfaces).

use crate::basics::BoxI;
use crate::color::{add_4x8, lerp8x4, mul_4x8_8, out_reverse, over};
use crate::grid::SampleGrid;
use crate::rendering_buffer::RowAccessor;
use crate::span_sink::SpanSink;

const BPP: usize = 4;

/// How a solid color is combined with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rgb32Op {
    /// Interpolate toward the color by coverage; full coverage stores it.
    Lerp,
    /// Color scaled by coverage, composited over the destination.
    Over,
    /// Color scaled by coverage, added with saturation.
    Add,
    /// Destination scaled by the inverse of the coverage-scaled alpha.
    OutReverse,
}

/// Applies a solid color to every span. Zero-coverage spans are skipped.
pub struct InplaceRgb32<'a, 'b> {
    rbuf: &'a mut RowAccessor<'b>,
    op: Rgb32Op,
    color: u32,
    grid: SampleGrid,
}

impl<'a, 'b> InplaceRgb32<'a, 'b> {
    pub fn new(rbuf: &'a mut RowAccessor<'b>, op: Rgb32Op, color: u32, grid: SampleGrid) -> Self {
        debug_assert_eq!(rbuf.bpp(), BPP);
        Self {
            rbuf,
            op,
            color,
            grid,
        }
    }

    fn for_each_pixel<F: Fn(u32) -> u32>(&mut self, b: &BoxI, f: F) {
        for y in b.y1..b.y2 {
            for px in self.rbuf.span_mut(y, b.x1, b.x2).chunks_exact_mut(BPP) {
                let mut word = [0u8; BPP];
                word.copy_from_slice(px);
                let v = f(u32::from_ne_bytes(word));
                px.copy_from_slice(&v.to_ne_bytes());
            }
        }
    }
}

impl SpanSink for InplaceRgb32<'_, '_> {
    fn span(&mut self, b: &BoxI, coverage: i32) {
        if coverage == 0 {
            return;
        }
        let color = self.color;
        if coverage >= self.grid.grid_area() {
            match self.op {
                Rgb32Op::Lerp => self.for_each_pixel(b, |_| color),
                Rgb32Op::Over => self.for_each_pixel(b, |d| over(color, d)),
                Rgb32Op::Add => self.for_each_pixel(b, |d| add_4x8(color, d)),
                Rgb32Op::OutReverse => self.for_each_pixel(b, |d| out_reverse(color, d)),
            }
            return;
        }

        let a = self.grid.to_alpha(coverage);
        match self.op {
            Rgb32Op::Lerp => self.for_each_pixel(b, |d| lerp8x4(color, a, d)),
            Rgb32Op::Over => {
                let src = mul_4x8_8(color, a);
                self.for_each_pixel(b, |d| over(src, d))
            }
            Rgb32Op::Add => {
                let src = mul_4x8_8(color, a);
                self.for_each_pixel(b, |d| add_4x8(src, d))
            }
            Rgb32Op::OutReverse => {
                let src = mul_4x8_8(color, a);
                self.for_each_pixel(b, |d| out_reverse(src, d))
            }
        }
    }
}

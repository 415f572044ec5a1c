//! Row-oriented access to caller-owned pixel memory.
//!
//! [`RowAccessor`] borrows a byte slice laid out top-down with a fixed
//! stride. Rows are addressed by absolute y: an accessor produced by
//! [`RowAccessor::split_bands`] keeps the y range of its band, so sinks can
//! write through any band with the same coordinates they would use on the
//! whole surface.

use std::mem;

use crate::basics::BoxI;

/// Mutable view of `height` rows of `width` pixels, `bpp` bytes each.
#[derive(Debug)]
pub struct RowAccessor<'a> {
    buf: &'a mut [u8],
    width: usize,
    height: usize,
    stride: usize,
    bpp: usize,
    y_offset: i32,
}

impl<'a> RowAccessor<'a> {
    /// Wrap `buf`. The last row may be shorter than `stride`, but every row
    /// must hold `width * bpp` bytes.
    pub fn new(buf: &'a mut [u8], width: usize, height: usize, stride: usize, bpp: usize) -> Self {
        assert!(stride >= width * bpp, "stride {stride} too small for {width}x{bpp}");
        if height > 0 {
            let need = (height - 1) * stride + width * bpp;
            assert!(
                buf.len() >= need,
                "buffer of {} bytes cannot hold {height} rows (needs {need})",
                buf.len()
            );
        }
        Self {
            buf,
            width,
            height,
            stride,
            bpp,
            y_offset: 0,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn bpp(&self) -> usize {
        self.bpp
    }

    /// Rows covered by this accessor, in absolute coordinates.
    #[inline]
    pub fn bounds(&self) -> BoxI {
        BoxI::new(
            0,
            self.y_offset,
            self.width as i32,
            self.y_offset + self.height as i32,
        )
    }

    #[inline]
    fn row_start(&self, y: i32) -> usize {
        let local = y - self.y_offset;
        assert!(
            local >= 0 && (local as usize) < self.height,
            "row {y} outside {}..{}",
            self.y_offset,
            self.y_offset + self.height as i32
        );
        local as usize * self.stride
    }

    /// The `width * bpp` bytes of row `y`.
    #[inline]
    pub fn row(&self, y: i32) -> &[u8] {
        let start = self.row_start(y);
        &self.buf[start..start + self.width * self.bpp]
    }

    #[inline]
    pub fn row_mut(&mut self, y: i32) -> &mut [u8] {
        let start = self.row_start(y);
        let len = self.width * self.bpp;
        &mut self.buf[start..start + len]
    }

    /// Bytes of pixels `x1..x2` in row `y`.
    #[inline]
    pub fn span_mut(&mut self, y: i32, x1: i32, x2: i32) -> &mut [u8] {
        let bpp = self.bpp;
        &mut self.row_mut(y)[x1 as usize * bpp..x2 as usize * bpp]
    }

    /// Copy pixels `x1..x2` of row `src` into row `dst`.
    pub fn copy_row(&mut self, src: i32, dst: i32, x1: usize, x2: usize) {
        let (s, d) = (self.row_start(src), self.row_start(dst));
        let (a, b) = (x1 * self.bpp, x2 * self.bpp);
        self.buf.copy_within(s + a..s + b, d + a);
    }

    /// Set every byte of the pixels in `b` to `value`. `b` must lie inside
    /// [`bounds`](Self::bounds).
    pub fn fill_box(&mut self, b: &BoxI, value: u8) {
        for y in b.y1..b.y2 {
            self.span_mut(y, b.x1, b.x2).fill(value);
        }
    }

    /// Set every byte of every row to `value`.
    pub fn clear(&mut self, value: u8) {
        for y in self.y_offset..self.y_offset + self.height as i32 {
            self.row_mut(y).fill(value);
        }
    }

    /// Split into disjoint accessors for the given row bands. `bands` must
    /// be sorted, non-overlapping and inside [`bounds`](Self::bounds).
    pub fn split_bands(&mut self, bands: &[(i32, i32)]) -> Vec<RowAccessor<'_>> {
        let mut out = Vec::with_capacity(bands.len());
        let mut rest: &mut [u8] = &mut self.buf[..];
        let mut cursor = self.y_offset;

        for &(y1, y2) in bands {
            debug_assert!(y1 >= cursor && y2 >= y1);
            debug_assert!(y2 <= self.y_offset + self.height as i32);
            let skip = ((y1 - cursor) as usize * self.stride).min(rest.len());
            rest = &mut mem::take(&mut rest)[skip..];

            let rows = (y2 - y1) as usize;
            let take = (rows * self.stride).min(rest.len());
            let (band, tail) = mem::take(&mut rest).split_at_mut(take);
            out.push(RowAccessor {
                buf: band,
                width: self.width,
                height: rows,
                stride: self.stride,
                bpp: self.bpp,
                y_offset: y1,
            });
            rest = tail;
            cursor = y2;
        }
        out
    }
}

//! Sample grid, exact floored division and coverage conversion.
//!
//! Every pixel is subdivided into `samples_x * samples_y` sample points.
//! Coordinates are projected from 16.16 fixed point onto this grid with
//! `(v * samples) >> 16`, which floors toward negative infinity. Coverage
//! values produced by the sweep count each covered sample twice, so a fully
//! covered pixel has coverage [`SampleGrid::grid_area`].

use crate::basics::{Fixed, PointFixed, Trapezoid, FIXED_SHIFT};
use crate::error::RasterError;

/// Largest per-axis sample count.
pub const MAX_SAMPLES: i32 = 255;

/// Supersampling density. Default 17x15, so that `samples_x * samples_y`
/// is exactly 255 and half the coverage is directly an 8-bit alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SampleGrid {
    samples_x: i32,
    samples_y: i32,
}

impl SampleGrid {
    pub const DEFAULT: SampleGrid = SampleGrid {
        samples_x: 17,
        samples_y: 15,
    };

    /// Build a grid; each axis must be in `1..=255`.
    pub fn new(samples_x: i32, samples_y: i32) -> Result<Self, RasterError> {
        let ok = |s: i32| (1..=MAX_SAMPLES).contains(&s);
        if !ok(samples_x) || !ok(samples_y) {
            return Err(RasterError::InvalidGrid {
                samples_x,
                samples_y,
            });
        }
        Ok(Self {
            samples_x,
            samples_y,
        })
    }

    #[inline]
    pub fn samples_x(&self) -> i32 {
        self.samples_x
    }

    #[inline]
    pub fn samples_y(&self) -> i32 {
        self.samples_y
    }

    /// Sample points per pixel.
    #[inline]
    pub fn samples_per_pixel(&self) -> i32 {
        self.samples_x * self.samples_y
    }

    /// Coverage value of a fully covered pixel.
    #[inline]
    pub fn grid_area(&self) -> i32 {
        2 * self.samples_per_pixel()
    }

    #[inline]
    pub fn to_grid_x(&self, v: Fixed) -> i32 {
        ((v as i64 * self.samples_x as i64) >> FIXED_SHIFT) as i32
    }

    #[inline]
    pub fn to_grid_y(&self, v: Fixed) -> i32 {
        ((v as i64 * self.samples_y as i64) >> FIXED_SHIFT) as i32
    }

    /// Project a point, then offset by `(dx, dy)` grid units.
    #[inline]
    pub fn project_point(&self, p: PointFixed, dx: i32, dy: i32) -> PointFixed {
        PointFixed::new(self.to_grid_x(p.x) + dx, self.to_grid_y(p.y) + dy)
    }

    /// Project a trapezoid onto the grid. Every field of the result is in
    /// grid units. Returns `None` when the projection degenerates (a side
    /// collapses to horizontal or the band to nothing).
    pub fn project_trapezoid(&self, t: &Trapezoid, dx: i32, dy: i32) -> Option<Trapezoid> {
        let mut out = *t;
        out.top = self.to_grid_y(t.top) + dy;
        out.bottom = self.to_grid_y(t.bottom) + dy;
        if out.top >= out.bottom {
            return None;
        }
        out.left.p1 = self.project_point(t.left.p1, dx, dy);
        out.left.p2 = self.project_point(t.left.p2, dx, dy);
        out.right.p1 = self.project_point(t.right.p1, dx, dy);
        out.right.p2 = self.project_point(t.right.p2, dx, dy);
        if out.left.is_horizontal() || out.right.is_horizontal() {
            return None;
        }
        Some(out)
    }

    /// Split a grid x into (pixel, sample within pixel), flooring.
    #[inline]
    pub fn split_x(&self, x: i32) -> (i32, i32) {
        let q = floored_divrem(x, self.samples_x);
        (q.quo, q.rem)
    }

    /// 8-bit alpha for a count of covered samples.
    #[inline]
    pub fn samples_to_alpha(&self, samples: i32) -> u8 {
        let n = self.samples_per_pixel();
        let s = samples.clamp(0, n);
        if n == 255 {
            s as u8
        } else {
            ((s * 255 + n / 2) / n) as u8
        }
    }

    /// 8-bit alpha for a coverage value, `(c + 1) >> 1` samples.
    #[inline]
    pub fn to_alpha(&self, coverage: i32) -> u8 {
        self.samples_to_alpha((coverage + 1) >> 1)
    }

    /// Coverage as a fraction of a full pixel.
    #[inline]
    pub fn area_to_float(&self, coverage: i32) -> f32 {
        coverage as f32 / self.grid_area() as f32
    }
}

impl Default for SampleGrid {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ============================================================================
// Floored division
// ============================================================================

/// Quotient and remainder of a floored division. For a positive divisor the
/// remainder is always in `0..divisor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuoRem {
    pub quo: i32,
    pub rem: i32,
}

impl QuoRem {
    pub const fn new(quo: i32, rem: i32) -> Self {
        Self { quo, rem }
    }
}

/// `a / b` rounded toward negative infinity.
#[inline]
pub fn floored_divrem(a: i32, b: i32) -> QuoRem {
    let mut qr = QuoRem::new(a / b, a % b);
    if (qr.rem ^ b) < 0 && qr.rem != 0 {
        qr.quo -= 1;
        qr.rem += b;
    }
    qr
}

/// `x * a / b` rounded toward negative infinity, with a 64-bit product.
#[inline]
pub fn floored_muldivrem(x: i32, a: i32, b: i32) -> QuoRem {
    let xa = x as i64 * a as i64;
    let b64 = b as i64;
    let mut quo = xa / b64;
    let mut rem = xa % b64;
    if (rem ^ b64) < 0 && rem != 0 {
        quo -= 1;
        rem += b64;
    }
    QuoRem::new(quo as i32, rem as i32)
}

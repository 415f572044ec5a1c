//! Foundation types: 16.16 fixed-point geometry and integer boxes.
//!
//! Everything the rasterizer consumes is expressed in [`Fixed`] units
//! (16 integer bits, 16 fractional bits). Output regions are half-open
//! integer [`BoxI`]s: `x1 <= x < x2`, `y1 <= y < y2`.

// ============================================================================
// Fixed point
// ============================================================================

/// Signed 16.16 fixed-point value.
pub type Fixed = i32;

pub const FIXED_SHIFT: u32 = 16;
pub const FIXED_ONE: Fixed = 1 << FIXED_SHIFT;
pub const FIXED_FRAC_MASK: Fixed = FIXED_ONE - 1;

/// Convert an integer to fixed point.
#[inline]
pub const fn fixed_from_int(v: i32) -> Fixed {
    v << FIXED_SHIFT
}

/// Integer part, rounding toward negative infinity.
#[inline]
pub const fn fixed_to_int(v: Fixed) -> i32 {
    v >> FIXED_SHIFT
}

/// Largest integer not above `v`.
#[inline]
pub const fn fixed_integer_floor(v: Fixed) -> i32 {
    v >> FIXED_SHIFT
}

/// Smallest integer not below `v`.
#[inline]
pub const fn fixed_integer_ceil(v: Fixed) -> i32 {
    ((v as i64 + FIXED_FRAC_MASK as i64) >> FIXED_SHIFT) as i32
}

/// Convert a float to fixed point, truncating toward zero.
#[inline]
pub fn fixed_from_f64(v: f64) -> Fixed {
    (v * FIXED_ONE as f64) as Fixed
}

// ============================================================================
// Points, lines, trapezoids, triangles
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct PointFixed {
    pub x: Fixed,
    pub y: Fixed,
}

impl PointFixed {
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Point at integer pixel coordinates.
    pub const fn from_ints(x: i32, y: i32) -> Self {
        Self::new(fixed_from_int(x), fixed_from_int(y))
    }
}

/// A directed line through two points. Trapezoid sides use the line's
/// infinite extension, not just the segment between `p1` and `p2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct LineFixed {
    pub p1: PointFixed,
    pub p2: PointFixed,
}

impl LineFixed {
    pub const fn new(p1: PointFixed, p2: PointFixed) -> Self {
        Self { p1, p2 }
    }

    /// Vertical line at `x` spanning `y1..y2`.
    pub const fn vertical(x: Fixed, y1: Fixed, y2: Fixed) -> Self {
        Self::new(PointFixed::new(x, y1), PointFixed::new(x, y2))
    }

    /// True when the line has no vertical extent.
    #[inline]
    pub fn is_horizontal(&self) -> bool {
        self.p1.y == self.p2.y
    }

    /// X coordinate of the line at height `y`, rounded down or up.
    ///
    /// The line must not be horizontal.
    pub fn x_for_y(&self, y: Fixed, ceil: bool) -> Fixed {
        let d = self.p2.y as i64 - self.p1.y as i64;
        debug_assert!(d != 0);
        let ex = (y as i64 - self.p1.y as i64) * (self.p2.x as i64 - self.p1.x as i64);
        let q = if ceil {
            div_ceil_i64(ex, d)
        } else {
            div_floor_i64(ex, d)
        };
        (self.p1.x as i64 + q) as Fixed
    }
}

#[inline]
fn div_floor_i64(a: i64, b: i64) -> i64 {
    let (q, r) = (a / b, a % b);
    if r != 0 && ((r < 0) != (b < 0)) {
        q - 1
    } else {
        q
    }
}

#[inline]
fn div_ceil_i64(a: i64, b: i64) -> i64 {
    -div_floor_i64(-a, b)
}

/// Region bounded by two horizontal lines (`top`, `bottom`) and two
/// arbitrary non-horizontal lines (`left`, `right`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Trapezoid {
    pub top: Fixed,
    pub bottom: Fixed,
    pub left: LineFixed,
    pub right: LineFixed,
}

impl Trapezoid {
    pub const fn new(top: Fixed, bottom: Fixed, left: LineFixed, right: LineFixed) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Axis-aligned rectangle `[x1, x2) x [y1, y2)` as a trapezoid.
    pub const fn rect(x1: Fixed, y1: Fixed, x2: Fixed, y2: Fixed) -> Self {
        Self::new(
            y1,
            y2,
            LineFixed::vertical(x1, y1, y2),
            LineFixed::vertical(x2, y1, y2),
        )
    }

    /// Neither side is horizontal and the band between top and bottom is
    /// non-empty.
    #[inline]
    pub fn is_valid(&self) -> bool {
        !self.left.is_horizontal() && !self.right.is_horizontal() && self.bottom > self.top
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Triangle {
    pub p1: PointFixed,
    pub p2: PointFixed,
    pub p3: PointFixed,
}

impl Triangle {
    pub const fn new(p1: PointFixed, p2: PointFixed, p3: PointFixed) -> Self {
        Self { p1, p2, p3 }
    }
}

// ============================================================================
// BoxI
// ============================================================================

/// Half-open integer rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct BoxI {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoxI {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    #[inline]
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// True when the box covers no pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.x2 <= self.x1 || self.y2 <= self.y1
    }

    /// Number of pixels covered.
    #[inline]
    pub fn area(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            self.width() as i64 * self.height() as i64
        }
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Intersection with `r`, or `None` when they do not overlap.
    pub fn intersect(&self, r: &BoxI) -> Option<BoxI> {
        let b = BoxI::new(
            self.x1.max(r.x1),
            self.y1.max(r.y1),
            self.x2.min(r.x2),
            self.y2.min(r.y2),
        );
        if b.is_empty() {
            None
        } else {
            Some(b)
        }
    }

    /// Bounding box of both. Empty boxes do not contribute.
    pub fn union(&self, r: &BoxI) -> BoxI {
        if self.is_empty() {
            return *r;
        }
        if r.is_empty() {
            return *self;
        }
        BoxI::new(
            self.x1.min(r.x1),
            self.y1.min(r.y1),
            self.x2.max(r.x2),
            self.y2.max(r.y2),
        )
    }

    pub fn translate(&self, dx: i32, dy: i32) -> BoxI {
        BoxI::new(self.x1 + dx, self.y1 + dy, self.x2 + dx, self.y2 + dy)
    }
}

// ============================================================================
// Bounds
// ============================================================================

/// Integer extents covering every valid trapezoid in `traps`.
///
/// Side x positions are evaluated exactly at each trapezoid's top and
/// bottom, then floored (left) and ceiled (right). Invalid trapezoids are
/// ignored. Returns `None` when nothing remains.
pub fn trapezoids_bounds(traps: &[Trapezoid]) -> Option<BoxI> {
    let mut x1 = Fixed::MAX;
    let mut x2 = Fixed::MIN;
    let mut y1 = Fixed::MAX;
    let mut y2 = Fixed::MIN;

    for t in traps.iter().filter(|t| t.is_valid()) {
        y1 = y1.min(t.top);
        y2 = y2.max(t.bottom);

        let side_x = |l: &LineFixed, ceil: bool| {
            let at_top = if l.p1.y == t.top {
                l.p1.x
            } else {
                l.x_for_y(t.top, ceil)
            };
            let at_bottom = if l.p2.y == t.bottom {
                l.p2.x
            } else {
                l.x_for_y(t.bottom, ceil)
            };
            (at_top, at_bottom)
        };

        // Self-crossing sides are legal, so both lines feed both bounds.
        let (lt, lb) = side_x(&t.left, false);
        let (rt, rb) = side_x(&t.right, true);
        x1 = x1.min(lt).min(lb).min(rt).min(rb);
        x2 = x2.max(lt).max(lb).max(rt).max(rb);
    }

    if y1 > y2 {
        return None;
    }
    let b = BoxI::new(
        fixed_integer_floor(x1),
        fixed_integer_floor(y1),
        fixed_integer_ceil(x2),
        fixed_integer_ceil(y2),
    );
    if b.is_empty() {
        None
    } else {
        Some(b)
    }
}

/// Integer extents of a point cloud (triangle vertices).
pub fn points_bounds<'a, I>(points: I) -> Option<BoxI>
where
    I: IntoIterator<Item = &'a PointFixed>,
{
    let mut it = points.into_iter();
    let first = it.next()?;
    let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
    for p in it {
        x1 = x1.min(p.x);
        y1 = y1.min(p.y);
        x2 = x2.max(p.x);
        y2 = y2.max(p.y);
    }
    let b = BoxI::new(
        fixed_integer_floor(x1),
        fixed_integer_floor(y1),
        fixed_integer_ceil(x2),
        fixed_integer_ceil(y2),
    );
    if b.is_empty() {
        None
    } else {
        Some(b)
    }
}

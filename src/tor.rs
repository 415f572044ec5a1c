//! Trapezoid-to-coverage sweep.
//!
//! [`Tor`] owns one polygon and one cell list for a box of output pixels.
//! Edges are added in grid units, then [`Tor::render`] walks the pixel rows
//! top to bottom:
//!
//! - rows with no edges at all are skipped in one go
//! - rows where every active edge is vertical and spans the whole row are
//!   accumulated once, and as many identical rows as possible are merged
//!   into the same output box
//! - every other row is swept one sample row at a time
//!
//! Coverage is exact: each output value is twice the number of grid samples
//! inside the shape under the nonzero winding rule.

use smallvec::SmallVec;

use crate::active_list::ActiveList;
use crate::basics::{BoxI, PointFixed, Trapezoid};
use crate::cell_list::{CellList, CoverageAccumulator};
use crate::error::RasterError;
use crate::grid::SampleGrid;
use crate::polygon::{Polygon, NIL};
use crate::rendering_buffer::RowAccessor;
use crate::span_sink::SpanSink;

const EMBEDDED_ROW: usize = 128;
const EMBEDDED_SUBROWS: usize = 32;

/// What the last sweep did, row by row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Pixel rows with no active or pending edges.
    pub skipped_rows: i32,
    /// Number of full-row accumulations.
    pub full_steps: i32,
    /// Pixel rows produced by full-row accumulation, merged rows included.
    pub full_step_rows: i32,
    /// Pixel rows swept one sample row at a time.
    pub subsampled_rows: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rows {
    Empty,
    Covered,
}

/// Rasterizer for one output box.
pub struct Tor {
    polygon: Polygon,
    cells: CellList,
    grid: SampleGrid,
    extents: BoxI,
}

impl Tor {
    /// Reserve storage for `num_edges` edges over `extents`.
    pub fn new(extents: BoxI, num_edges: usize, grid: SampleGrid) -> Result<Self, RasterError> {
        debug_assert!(!extents.is_empty());
        let sy = grid.samples_y() as i64;
        let ymin = extents.y1 as i64 * sy;
        let ymax = extents.y2 as i64 * sy;
        if ymin < i32::MIN as i64 || ymax > i32::MAX as i64 {
            return Err(RasterError::ExtentTooLarge {
                height: ymax - ymin,
            });
        }
        let polygon = Polygon::new(num_edges, ymin as i32, ymax as i32, sy as i32)?;
        let cells = CellList::new(extents.x1, extents.x2, grid)?;
        log::trace!(
            "tor init: extents {:?}, {} edges, grid {}x{}",
            extents,
            num_edges,
            grid.samples_x(),
            grid.samples_y()
        );
        Ok(Self {
            polygon,
            cells,
            grid,
            extents,
        })
    }

    #[inline]
    pub fn extents(&self) -> &BoxI {
        &self.extents
    }

    #[inline]
    pub fn grid(&self) -> &SampleGrid {
        &self.grid
    }

    #[inline]
    pub fn num_edges(&self) -> usize {
        self.polygon.num_edges()
    }

    /// Add a trapezoid already projected to grid units: the left side
    /// winds +1 and the right side -1.
    pub fn add_trapezoid(&mut self, t: &Trapezoid) {
        let (l, r) = (&t.left, &t.right);
        self.polygon
            .add_edge(l.p1.x, l.p2.x, l.p1.y, l.p2.y, t.top, t.bottom, 1);
        self.polygon
            .add_edge(r.p1.x, r.p2.x, r.p1.y, r.p2.y, t.top, t.bottom, -1);
    }

    /// Project a fixed-point trapezoid with a grid offset and add it.
    /// Returns false when it degenerates on the grid.
    pub fn add_fixed_trapezoid(&mut self, t: &Trapezoid, dx: i32, dy: i32) -> bool {
        match self.grid.project_trapezoid(t, dx, dy) {
            Some(g) => {
                self.add_trapezoid(&g);
                true
            }
            None => false,
        }
    }

    /// Add one segment of a closed outline, in grid units.
    pub fn add_line(&mut self, p1: PointFixed, p2: PointFixed) {
        self.polygon.add_line(p1, p2);
    }

    /// Sweep the polygon and hand every box of uniform coverage to `sink`.
    ///
    /// With `unbounded`, every pixel of the extents is reported, zero
    /// coverage included; otherwise zero-coverage boxes are omitted.
    pub fn render<S: SpanSink + ?Sized>(self, sink: &mut S, unbounded: bool) -> SweepStats {
        let Tor {
            mut polygon,
            mut cells,
            grid,
            extents,
        } = self;
        let (x1, x2) = (extents.x1, extents.x2);
        sweep(
            &mut polygon,
            &mut cells,
            &grid,
            extents.y1,
            |cells, rows, y, height| match rows {
                Rows::Empty => {
                    if unbounded {
                        sink.span(&BoxI::new(x1, y, x2, y + height), 0);
                    }
                }
                Rows::Covered => {
                    blt(cells, sink, y, height, x1, x2, unbounded, grid.samples_x());
                    cells.reset();
                }
            },
        )
    }

    /// Sweep straight into 8-bit alpha rows of `dst`, writing every pixel
    /// of the extents. Produces the same bytes as [`render`](Self::render)
    /// feeding a mask writer in unbounded mode.
    pub fn render_mask(self, dst: &mut RowAccessor<'_>) -> SweepStats {
        let Tor {
            mut polygon,
            grid,
            extents,
            ..
        } = self;
        debug_assert!(extents.x1 >= 0 && extents.x2 as usize <= dst.width());
        let (x1, x2) = (extents.x1 as usize, extents.x2 as usize);
        let mut row = RowSamples::new(extents.x1, extents.x2, grid);

        sweep(
            &mut polygon,
            &mut row,
            &grid,
            extents.y1,
            |row, rows, y, height| {
                match rows {
                    Rows::Empty => {
                        for yy in y..y + height {
                            dst.row_mut(yy)[x1..x2].fill(0);
                        }
                    }
                    Rows::Covered => {
                        let out = &mut dst.row_mut(y)[x1..x2];
                        for (d, &s) in out.iter_mut().zip(row.counts.iter()) {
                            *d = grid.samples_to_alpha(s);
                        }
                        for yy in y + 1..y + height {
                            dst.copy_row(y, yy, x1, x2);
                        }
                        row.clear();
                    }
                }
            },
        )
    }
}

/// Row loop shared by the span and mask renderers. `emit` receives each
/// finished group of `height` rows starting at pixel row `y`.
fn sweep<A, F>(polygon: &mut Polygon, acc: &mut A, grid: &SampleGrid, ymin: i32, mut emit: F) -> SweepStats
where
    A: CoverageAccumulator,
    F: FnMut(&mut A, Rows, i32, i32),
{
    let sy = grid.samples_y();
    let h = polygon.num_rows() as i32;
    let row_ymin = polygon.ymin();
    let mut stats = SweepStats::default();
    let mut subrows: SmallVec<[u32; EMBEDDED_SUBROWS]> = SmallVec::from_elem(NIL, sy as usize);
    let (mut active, buckets): (ActiveList<'_>, &[u32]) = polygon.sweep();

    let mut i = 0;
    while i < h {
        let mut j = i + 1;
        let mut full_step = 0;

        if buckets[i as usize] == NIL {
            if active.is_empty() {
                while j < h && buckets[j as usize] == NIL {
                    j += 1;
                }
                log::trace!("rows {}..{}: empty", i + ymin, j + ymin);
                stats.skipped_rows += j - i;
                emit(acc, Rows::Empty, i + ymin, j - i);
                i = j;
                continue;
            }
            full_step = active.can_full_step(sy);
        }

        if full_step > 0 {
            active.nonzero_row(acc, sy);
            while j < h && buckets[j as usize] == NIL && full_step >= 2 * sy {
                full_step -= sy;
                j += 1;
            }
            if j != i + 1 {
                active.step_edges(j - (i + 1), sy);
            }
            log::trace!("rows {}..{}: full step", i + ymin, j + ymin);
            stats.full_steps += 1;
            stats.full_step_rows += j - i;
        } else {
            active.fill_buckets(buckets[i as usize], row_ymin + i * sy, &mut subrows);
            for slot in subrows.iter_mut() {
                if *slot != NIL {
                    active.merge_edges(*slot);
                    *slot = NIL;
                }
                active.nonzero_subrow(acc);
            }
            log::trace!("row {}: subsampled", i + ymin);
            stats.subsampled_rows += 1;
        }

        emit(acc, Rows::Covered, i + ymin, j - i);
        i = j;
    }
    stats
}

/// Emit one group of rows from the accumulated cells.
#[allow(clippy::too_many_arguments)]
fn blt<S: SpanSink + ?Sized>(
    cells: &CellList,
    sink: &mut S,
    y: i32,
    height: i32,
    xmin: i32,
    xmax: i32,
    unbounded: bool,
    samples_x: i32,
) {
    let mut b = BoxI::new(xmin, y, xmin, y + height);
    let mut cover = cells.carried_height() * samples_x * 2;

    for cell in cells.iter().filter(|c| c.is_touched()) {
        let x = cell.x;
        debug_assert!(x >= xmin && x < xmax);

        if x > b.x1 && (unbounded || cover != 0) {
            b.x2 = x;
            sink.span(&b, cover);
        }
        b.x1 = x;
        cover += cell.covered_height * samples_x * 2;

        if cell.uncovered_area != 0 {
            let area = cover - cell.uncovered_area;
            b.x2 = x + 1;
            if unbounded || area != 0 {
                sink.span(&b, area);
            }
            b.x1 = x + 1;
        }
    }

    b.x2 = xmax;
    if b.x2 > b.x1 && (unbounded || cover != 0) {
        sink.span(&b, cover);
    }
}

// ============================================================================
// RowSamples
// ============================================================================

/// Per-pixel sample counts for one row, used by the mask-row renderer.
struct RowSamples {
    counts: SmallVec<[i32; EMBEDDED_ROW]>,
    x1: i32,
    grid: SampleGrid,
}

impl RowSamples {
    fn new(x1: i32, x2: i32, grid: SampleGrid) -> Self {
        Self {
            counts: SmallVec::from_elem(0, (x2 - x1).max(0) as usize),
            x1,
            grid,
        }
    }

    fn clear(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    /// Pixel index and sample offset of `x`, clamped to the row.
    fn locate(&self, x: i32) -> (usize, i32) {
        let (ix, fx) = self.grid.split_x(x);
        let ix = ix - self.x1;
        if ix < 0 {
            (0, 0)
        } else if ix as usize >= self.counts.len() {
            (self.counts.len(), 0)
        } else {
            (ix as usize, fx)
        }
    }

    fn accumulate(&mut self, x1: i32, x2: i32, rows: i32) {
        if x1 == x2 {
            return;
        }
        let sx = self.grid.samples_x();
        let (lix, lfx) = self.locate(x1);
        let (rix, rfx) = self.locate(x2);
        if lix == rix {
            if lix < self.counts.len() {
                self.counts[lix] += (rfx - lfx) * rows;
            }
            return;
        }
        self.counts[lix] += (sx - lfx) * rows;
        for c in &mut self.counts[lix + 1..rix] {
            *c += sx * rows;
        }
        if rfx != 0 {
            self.counts[rix] += rfx * rows;
        }
    }
}

impl CoverageAccumulator for RowSamples {
    fn add_subspan(&mut self, x1: i32, x2: i32) {
        self.accumulate(x1, x2, 1);
    }

    fn add_span(&mut self, x1: i32, x2: i32) {
        let sy = self.grid.samples_y();
        self.accumulate(x1, x2, sy);
    }
}

//! Sparse per-row coverage cells.
//!
//! A row is described by a short x-sorted list of cells. Each cell carries
//! two accumulators:
//! - `covered_height`: signed sample-row count of spans starting (+) or
//!   ending (-) in this pixel; it carries full coverage into every pixel to
//!   its right
//! - `uncovered_area`: twice the signed count of samples in this pixel that
//!   lie left of a span boundary, subtracted from the carried coverage
//!
//! Lookups go through a cursor that only moves right between rewinds, so a
//! row's worth of sorted queries costs one pass over the list.

use smallvec::SmallVec;

use crate::error::RasterError;
use crate::grid::SampleGrid;

const CELL_HEAD: u32 = 0;
const CELL_TAIL: u32 = 1;
const EMBEDDED_CELLS: usize = 256;

/// Receiver of the horizontal spans found by the active-list walk.
///
/// Both span kinds are in grid x units. A subspan covers one sample row;
/// a full span covers a whole pixel row of `samples_y` sample rows.
pub trait CoverageAccumulator {
    /// Called before each sample row, since x queries restart from the left.
    fn rewind(&mut self) {}

    fn add_subspan(&mut self, x1: i32, x2: i32);

    fn add_span(&mut self, x1: i32, x2: i32);
}

// ============================================================================
// Cell
// ============================================================================

/// Coverage accumulator for one pixel column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub next: u32,
    pub x: i32,
    pub uncovered_area: i32,
    pub covered_height: i32,
}

impl Cell {
    fn new(x: i32, next: u32) -> Self {
        Self {
            next,
            x,
            uncovered_area: 0,
            covered_height: 0,
        }
    }

    /// True when the cell changes coverage at all.
    #[inline]
    pub fn is_touched(&self) -> bool {
        self.covered_height != 0 || self.uncovered_area != 0
    }
}

// ============================================================================
// CellList
// ============================================================================

/// Cells for pixel columns `x1..x2`, plus head (x = MIN) and tail
/// (x = MAX) sentinels. Coverage left of `x1` lands on the head and is
/// carried into the whole row; coverage at or right of `x2` is dropped on
/// the tail.
pub struct CellList {
    cells: SmallVec<[Cell; EMBEDDED_CELLS]>,
    cursor: u32,
    x1: i32,
    x2: i32,
    grid: SampleGrid,
}

impl CellList {
    pub fn new(x1: i32, x2: i32, grid: SampleGrid) -> Result<Self, RasterError> {
        let width = (x2 as i64 - x1 as i64).max(0) as usize;
        let want = width + 3;
        let mut cells: SmallVec<[Cell; EMBEDDED_CELLS]> = SmallVec::new();
        cells
            .try_reserve_exact(want)
            .map_err(|_| RasterError::oom("cells", want))?;
        cells.push(Cell::new(i32::MIN, CELL_TAIL));
        cells.push(Cell::new(i32::MAX, u32::MAX));
        Ok(Self {
            cells,
            cursor: CELL_HEAD,
            x1,
            x2,
            grid,
        })
    }

    /// Move the cursor back to the head.
    #[inline]
    pub fn rewind(&mut self) {
        self.cursor = CELL_HEAD;
    }

    /// Drop every cell and clear the carried coverage.
    pub fn reset(&mut self) {
        self.rewind();
        self.cells.truncate(2);
        let head = &mut self.cells[CELL_HEAD as usize];
        head.next = CELL_TAIL;
        head.covered_height = 0;
        head.uncovered_area = 0;
        let tail = &mut self.cells[CELL_TAIL as usize];
        tail.covered_height = 0;
        tail.uncovered_area = 0;
    }

    /// Coverage carried in from the left of `x1`, in sample rows.
    #[inline]
    pub fn carried_height(&self) -> i32 {
        self.cells[CELL_HEAD as usize].covered_height
    }

    /// Number of allocated cells, sentinels excluded.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len() - 2
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cells in ascending x, sentinels excluded.
    pub fn iter(&self) -> Cells<'_> {
        Cells {
            cells: &self.cells,
            at: self.cells[CELL_HEAD as usize].next,
        }
    }

    /// Cell for pixel `x`, allocating it if needed.
    ///
    /// `x` must not be left of the previous query since the last
    /// [`rewind`](Self::rewind).
    pub fn find(&mut self, x: i32) -> &mut Cell {
        let i = self.find_index(x);
        &mut self.cells[i as usize]
    }

    fn find_index(&mut self, x: i32) -> u32 {
        if x >= self.x2 {
            return CELL_TAIL;
        }
        if x < self.x1 {
            return CELL_HEAD;
        }

        let mut at = self.cursor;
        if self.cells[at as usize].x == x {
            return at;
        }
        debug_assert!(self.cells[at as usize].x < x, "cell cursor moved left");

        loop {
            let next = self.cells[at as usize].next;
            if self.cells[next as usize].x > x {
                break;
            }
            at = next;
        }
        if self.cells[at as usize].x != x {
            at = self.alloc_after(at, x);
        }
        self.cursor = at;
        at
    }

    fn alloc_after(&mut self, after: u32, x: i32) -> u32 {
        debug_assert!(self.cells.len() < self.cells.capacity());
        let ix = self.cells.len() as u32;
        let next = self.cells[after as usize].next;
        self.cells.push(Cell::new(x, next));
        self.cells[after as usize].next = ix;
        ix
    }

    /// Accumulate a boundary pair at `x1` (+) and `x2` (-), each weighted
    /// by `height` sample rows.
    fn add_boundaries(&mut self, x1: i32, x2: i32, height: i32) {
        let (ix1, fx1) = self.grid.split_x(x1);
        let (ix2, fx2) = self.grid.split_x(x2);
        if ix1 != ix2 {
            self.accumulate(ix1, 2 * fx1 * height, height);
            self.accumulate(ix2, -2 * fx2 * height, -height);
        } else {
            self.accumulate(ix1, 2 * (fx1 - fx2) * height, 0);
        }
    }

    /// Add to the cell for pixel `x`. Anything at or right of `x2` is
    /// dropped instead of piling up on the tail.
    #[inline]
    fn accumulate(&mut self, x: i32, area: i32, height: i32) {
        let i = self.find_index(x);
        if i == CELL_TAIL {
            return;
        }
        let c = &mut self.cells[i as usize];
        c.uncovered_area += area;
        c.covered_height += height;
    }
}

impl CoverageAccumulator for CellList {
    fn rewind(&mut self) {
        CellList::rewind(self);
    }

    fn add_subspan(&mut self, x1: i32, x2: i32) {
        if x1 == x2 {
            return;
        }
        self.add_boundaries(x1, x2, 1);
    }

    fn add_span(&mut self, x1: i32, x2: i32) {
        let h = self.grid.samples_y();
        self.add_boundaries(x1, x2, h);
    }
}

/// Iterator over the cells of a [`CellList`].
pub struct Cells<'a> {
    cells: &'a [Cell],
    at: u32,
}

impl<'a> Iterator for Cells<'a> {
    type Item = &'a Cell;

    fn next(&mut self) -> Option<&'a Cell> {
        if self.at == CELL_TAIL {
            return None;
        }
        let c = &self.cells[self.at as usize];
        self.at = c.next;
        Some(c)
    }
}

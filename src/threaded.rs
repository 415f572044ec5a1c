//! Band partitioning and parallel execution.
//!
//! A job's extents are cut into horizontal bands of equal height. Each band
//! gets its own [`Tor`](crate::tor::Tor) and box batch, both built on the
//! calling thread so an allocation failure aborts before anything is drawn.
//! Then all bands are swept concurrently on the caller's pool. Band
//! boundaries are pixel rows, so bands never write the same pixel.

use rayon::prelude::*;
use rayon::ThreadPool;
use smallvec::SmallVec;

use crate::basics::BoxI;
use crate::error::RasterError;
use crate::grid::SampleGrid;
use crate::span_sink::SpanSink;

/// A box with a fractional coverage, as handed to a thread-safe compositor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpacityBox {
    pub b: BoxI,
    pub alpha: f32,
}

/// Boxes buffered per worker before a flush.
pub const THREAD_MAX_BOXES: usize = 8192 / std::mem::size_of::<OpacityBox>();

/// A compositor that accepts batches of boxes from any worker.
pub trait BoxCompositor: Sync {
    fn composite_opacity_boxes(&self, boxes: &[OpacityBox]);
}

/// Span sink that batches boxes for a [`BoxCompositor`].
pub struct ThreadBoxes<'c> {
    compositor: &'c dyn BoxCompositor,
    boxes: Vec<OpacityBox>,
    grid: SampleGrid,
}

impl<'c> ThreadBoxes<'c> {
    /// Batch into `boxes`, which must hold [`THREAD_MAX_BOXES`] without
    /// growing; see [`batch_buffers`].
    pub fn new(compositor: &'c dyn BoxCompositor, grid: SampleGrid, mut boxes: Vec<OpacityBox>) -> Self {
        debug_assert!(boxes.capacity() >= THREAD_MAX_BOXES);
        boxes.clear();
        Self {
            compositor,
            boxes,
            grid,
        }
    }

    /// Send whatever is buffered.
    pub fn flush(&mut self) {
        if !self.boxes.is_empty() {
            self.compositor.composite_opacity_boxes(&self.boxes);
            self.boxes.clear();
        }
    }
}

impl SpanSink for ThreadBoxes<'_> {
    fn span(&mut self, b: &BoxI, coverage: i32) {
        if self.boxes.len() == THREAD_MAX_BOXES {
            self.flush();
        }
        self.boxes.push(OpacityBox {
            b: *b,
            alpha: self.grid.area_to_float(coverage),
        });
    }
}

impl Drop for ThreadBoxes<'_> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// One empty batch buffer per worker, reserved up front.
pub fn batch_buffers(n: usize) -> Result<Vec<Vec<OpacityBox>>, RasterError> {
    let mut buffers = Vec::new();
    buffers
        .try_reserve_exact(n)
        .map_err(|_| RasterError::oom("batch buffers", n))?;
    for _ in 0..n {
        let mut boxes = Vec::new();
        boxes
            .try_reserve_exact(THREAD_MAX_BOXES)
            .map_err(|_| RasterError::oom("batched boxes", THREAD_MAX_BOXES))?;
        buffers.push(boxes);
    }
    Ok(buffers)
}

/// Cut `extents` into at most `n` bands of `ceil(height / n)` rows. Empty
/// bands are dropped.
pub fn partition_rows(extents: &BoxI, n: usize) -> SmallVec<[BoxI; 16]> {
    let mut bands = SmallVec::new();
    if extents.is_empty() {
        return bands;
    }
    let n = n.max(1) as i32;
    let h = (extents.height() + n - 1) / n;
    let mut y = extents.y1;
    while y < extents.y2 {
        let y2 = (y + h).min(extents.y2);
        bands.push(BoxI::new(extents.x1, y, extents.x2, y2));
        y = y2;
    }
    bands
}

/// Run `work` over every job, on `pool` when given.
pub fn run_bands<T, F>(pool: Option<&ThreadPool>, jobs: Vec<T>, work: F)
where
    T: Send,
    F: Fn(T) + Sync + Send,
{
    match pool {
        Some(pool) if jobs.len() > 1 => {
            log::debug!("sweeping {} bands on {} threads", jobs.len(), pool.current_num_threads());
            pool.install(|| jobs.into_par_iter().for_each(&work));
        }
        _ => jobs.into_iter().for_each(work),
    }
}

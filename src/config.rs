//! Explicit rasterizer configuration.

use std::fmt;
use std::sync::Arc;

use rayon::ThreadPool;

use crate::grid::SampleGrid;

/// Default smallest band area handed to one worker, in pixels.
pub const DEFAULT_MIN_AREA_PER_THREAD: i64 = 128 * 32;
/// Default extent below which the span converter declines.
pub const DEFAULT_SMALL_EXTENT_FALLBACK: i32 = 32;
/// Default widest mask rendered through the direct row path.
pub const DEFAULT_INPLACE_ROW_LIMIT: i32 = 128;

/// Settings shared by every entry point.
///
/// ```
/// use trapezoid_raster::{RasterConfig, SampleGrid};
///
/// let config = RasterConfig::new()
///     .with_grid(SampleGrid::new(4, 4).unwrap())
///     .with_max_threads(1);
/// assert_eq!(config.grid.samples_per_pixel(), 16);
/// ```
#[derive(Clone)]
pub struct RasterConfig {
    pub grid: SampleGrid,
    /// When false every entry point returns `RasterError::Disabled`.
    pub precise: bool,
    /// Caller-owned worker pool; `None` keeps everything on the calling
    /// thread.
    pub threads: Option<Arc<ThreadPool>>,
    /// Upper bound on bands. Zero means the pool's thread count.
    pub max_threads: usize,
    pub min_area_per_thread: i64,
    /// The span converter declines when both extent dimensions are below
    /// this. Zero disables the check.
    pub small_extent_fallback: i32,
    pub inplace_row_limit: i32,
}

impl RasterConfig {
    pub fn new() -> Self {
        Self {
            grid: SampleGrid::DEFAULT,
            precise: true,
            threads: None,
            max_threads: 0,
            min_area_per_thread: DEFAULT_MIN_AREA_PER_THREAD,
            small_extent_fallback: DEFAULT_SMALL_EXTENT_FALLBACK,
            inplace_row_limit: DEFAULT_INPLACE_ROW_LIMIT,
        }
    }

    pub fn with_grid(mut self, grid: SampleGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_precise(mut self, precise: bool) -> Self {
        self.precise = precise;
        self
    }

    pub fn with_threads(mut self, pool: Arc<ThreadPool>) -> Self {
        self.threads = Some(pool);
        self
    }

    pub fn with_max_threads(mut self, n: usize) -> Self {
        self.max_threads = n;
        self
    }

    pub fn with_min_area_per_thread(mut self, area: i64) -> Self {
        self.min_area_per_thread = area.max(1);
        self
    }

    pub fn with_small_extent_fallback(mut self, limit: i32) -> Self {
        self.small_extent_fallback = limit;
        self
    }

    pub fn with_inplace_row_limit(mut self, limit: i32) -> Self {
        self.inplace_row_limit = limit;
        self
    }

    /// Number of bands to split a `width` x `height` job into: bounded by
    /// the pool, the thread cap, the per-thread area and one row per band.
    pub fn thread_count(&self, width: i32, height: i32) -> usize {
        let Some(pool) = &self.threads else {
            return 1;
        };
        if width <= 0 || height <= 0 {
            return 1;
        }
        let mut n = pool.current_num_threads();
        if self.max_threads > 0 {
            n = n.min(self.max_threads);
        }
        let area = width as i64 * height as i64;
        let by_area = (area / self.min_area_per_thread.max(1)).max(1) as usize;
        n.min(by_area).min(height as usize).max(1)
    }
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RasterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RasterConfig")
            .field("grid", &self.grid)
            .field("precise", &self.precise)
            .field(
                "threads",
                &self.threads.as_ref().map(|p| p.current_num_threads()),
            )
            .field("max_threads", &self.max_threads)
            .field("min_area_per_thread", &self.min_area_per_thread)
            .field("small_extent_fallback", &self.small_extent_fallback)
            .field("inplace_row_limit", &self.inplace_row_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::ThreadPoolBuilder;

    fn pool(n: usize) -> Arc<ThreadPool> {
        Arc::new(ThreadPoolBuilder::new().num_threads(n).build().unwrap())
    }

    #[test]
    fn test_defaults() {
        let c = RasterConfig::default();
        assert_eq!(c.grid, SampleGrid::DEFAULT);
        assert!(c.precise);
        assert!(c.threads.is_none());
        assert_eq!(c.thread_count(4096, 4096), 1);
    }

    #[test]
    fn test_thread_count_policy() {
        let c = RasterConfig::new().with_threads(pool(4));
        assert_eq!(c.thread_count(1024, 1024), 4);
        // Too small to be worth splitting.
        assert_eq!(c.thread_count(64, 32), 1);
        // Area allows two bands.
        assert_eq!(c.thread_count(128, 64), 2);
        // Never more bands than rows.
        let c = c.with_min_area_per_thread(1);
        assert_eq!(c.thread_count(1000, 3), 3);
        let c = c.with_max_threads(2);
        assert_eq!(c.thread_count(1000, 1000), 2);
    }
}

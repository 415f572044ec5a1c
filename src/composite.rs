//! Public entry points.
//!
//! Three ways to turn trapezoids into pixels:
//!
//! - [`span_composite`] streams `(box, opacity)` pairs into a caller
//!   compositor
//! - [`mask_composite`] renders an 8-bit alpha mask and hands it to the
//!   caller's generic composite step
//! - [`inplace_composite`] writes straight into a8 or 32-bit surfaces
//!   for a solid source
//!
//! plus [`triangles_mask`] and [`tristrip_mask`] for closed outlines.
//!
//! Every path reserves all of its storage before touching a pixel. An
//! `Err` therefore always means nothing was drawn and the caller should
//! use another path.

use smallvec::SmallVec;

use crate::basics::{
    fixed_integer_ceil, fixed_integer_floor, points_bounds, trapezoids_bounds, BoxI, PointFixed,
    Trapezoid, Triangle,
};
use crate::config::RasterConfig;
use crate::error::RasterError;
use crate::grid::SampleGrid;
use crate::pixfmt_a8::{A8Op, InplaceA8, MaskWriter};
use crate::pixfmt_rgb32::{InplaceRgb32, Rgb32Op};
use crate::region::ClipRegion;
use crate::rendering_buffer::RowAccessor;
use crate::span_sink::{Clipped, Damage, Damaged, SpanSink};
use crate::threaded::{
    batch_buffers, partition_rows, run_bands, BoxCompositor, OpacityBox, ThreadBoxes,
};
use crate::tor::Tor;

// ============================================================================
// Request types
// ============================================================================

/// Compositing operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Clear,
    Src,
    Over,
    In,
    OutReverse,
    Add,
}

impl Op {
    /// True when zero coverage leaves the destination unchanged, so empty
    /// spans can be skipped.
    #[inline]
    pub fn is_bounded(self) -> bool {
        matches!(self, Op::Over | Op::OutReverse | Op::Add)
    }
}

/// Result of a call that did not need a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    /// Geometry or clipping left nothing to draw.
    Nothing,
}

/// What the operation composites with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Premultiplied `0xAARRGGBB`.
    Solid(u32),
    /// Any non-solid picture.
    Pattern,
}

/// Pixel layout of an in-place destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    A8,
    X8r8g8b8,
    A8r8g8b8,
}

impl Format {
    pub fn bpp(self) -> usize {
        match self {
            Format::A8 => 1,
            Format::X8r8g8b8 | Format::A8r8g8b8 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeRequest {
    pub op: Op,
    /// A mask format was requested: overlapping trapezoids share one mask.
    /// Without it, several trapezoids are drawn one by one.
    pub mask: bool,
    /// Every edge is axis aligned.
    pub rectilinear: bool,
}

impl CompositeRequest {
    pub fn new(op: Op) -> Self {
        Self {
            op,
            mask: true,
            rectilinear: false,
        }
    }

    pub fn without_mask(mut self) -> Self {
        self.mask = false;
        self
    }

    pub fn rectilinear(mut self, rectilinear: bool) -> Self {
        self.rectilinear = rectilinear;
        self
    }
}

/// Destination state the rasterizer needs to know about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drawable {
    pub clip: ClipRegion,
    /// Uniform pixel value when the destination is known to be cleared.
    pub clear: Option<u32>,
}

impl Drawable {
    pub fn new(clip: ClipRegion) -> Self {
        Self { clip, clear: None }
    }

    pub fn cleared_to(mut self, value: u32) -> Self {
        self.clear = Some(value);
        self
    }
}

/// Pixels that can be written in place.
pub struct Surface<'a> {
    pub format: Format,
    pub pixels: RowAccessor<'a>,
    pub drawable: Drawable,
}

impl<'a> Surface<'a> {
    /// Surface clipped to its own size.
    pub fn new(format: Format, pixels: RowAccessor<'a>) -> Self {
        debug_assert_eq!(pixels.bpp(), format.bpp());
        let clip = ClipRegion::new(pixels.bounds());
        Self {
            format,
            pixels,
            drawable: Drawable::new(clip),
        }
    }
}

// ============================================================================
// Span compositor
// ============================================================================

/// Caller-side compositor fed by [`span_composite`].
pub trait CompositeSpans {
    /// Can `op` be applied over a `width` x `height` area? Called with a
    /// zero size before the extents are known.
    fn check(&self, _op: Op, _width: i32, _height: i32) -> bool {
        true
    }

    /// Prepare to receive boxes for `op` within `extents`.
    fn begin(&mut self, op: Op, extents: &BoxI) -> bool;

    fn composite_box(&mut self, b: &BoxI, opacity: f32);

    fn composite_boxes(&mut self, boxes: &[BoxI], opacity: f32) {
        for b in boxes {
            self.composite_box(b, opacity);
        }
    }

    /// Thread-safe entry point used for banded rendering, if any.
    fn thread_boxes(&self) -> Option<&dyn BoxCompositor> {
        None
    }

    fn done(&mut self) {}
}

struct SpanAdapter<'c, C: ?Sized> {
    compositor: &'c mut C,
    grid: SampleGrid,
}

impl<C: CompositeSpans + ?Sized> SpanSink for SpanAdapter<'_, C> {
    #[inline]
    fn span(&mut self, b: &BoxI, coverage: i32) {
        self.compositor
            .composite_box(b, self.grid.area_to_float(coverage));
    }
}

/// Rasterize `traps` and stream the result to `compositor`.
///
/// Declines with [`RasterError::Unsupported`] when the compositor cannot
/// handle the operator or when the job is too small to be worth it.
pub fn span_composite<C: CompositeSpans + ?Sized>(
    compositor: &mut C,
    req: &CompositeRequest,
    dst: &Drawable,
    traps: &[Trapezoid],
    damage: Option<&mut Damage>,
    config: &RasterConfig,
) -> Result<Outcome, RasterError> {
    if !config.precise {
        return Err(RasterError::Disabled);
    }
    if !compositor.check(req.op, 0, 0) {
        log::debug!("span composite: compositor rejects {:?}", req.op);
        return Err(RasterError::Unsupported("operator not handled by compositor"));
    }

    let Some(bounds) = trapezoids_bounds(traps) else {
        log::debug!("span composite: empty bounds");
        return Ok(Outcome::Nothing);
    };
    let limit = config.small_extent_fallback;
    if bounds.width() < limit && bounds.height() < limit {
        log::debug!("span composite: extents {:?} below {}", bounds, limit);
        return Err(RasterError::Unsupported("extents too small"));
    }

    let Some(extents) = dst.clip.extents().intersect(&bounds) else {
        log::debug!("span composite: clipped out");
        return Ok(Outcome::Nothing);
    };
    if !compositor.check(req.op, extents.width(), extents.height()) {
        return Err(RasterError::Unsupported("operator not handled by compositor"));
    }

    let was_clear = dst.clear == Some(0);
    let op = match req.op {
        Op::Over | Op::Add if was_clear => Op::Src,
        Op::In if was_clear => return Ok(Outcome::Nothing),
        op => op,
    };
    if op != req.op {
        log::debug!("span composite: {:?} on zero-cleared destination becomes {:?}", req.op, op);
    }
    let unbounded = !was_clear && req.mask && !op.is_bounded();

    let grid = config.grid;
    let threaded = !req.rectilinear && damage.is_none() && compositor.thread_boxes().is_some();
    let num_threads = if threaded {
        config.thread_count(extents.width(), extents.height())
    } else {
        1
    };
    let bands = partition_rows(&extents, num_threads);
    let mut tors = build_bands(&bands, traps, 0, 0, grid)?;
    log::debug!(
        "span composite: {:?} over {:?}, {} traps, {} bands, unbounded={}",
        op,
        extents,
        traps.len(),
        tors.len(),
        unbounded
    );

    let buffers = if tors.len() > 1 {
        batch_buffers(tors.len())?
    } else {
        Vec::new()
    };

    if !compositor.begin(op, &extents) {
        return Err(RasterError::Unsupported("compositor refused extents"));
    }

    let clip = &dst.clip;
    if tors.len() == 1 {
        let Some(tor) = tors.pop() else {
            return Ok(Outcome::Nothing);
        };
        let adapter = SpanAdapter {
            compositor: &mut *compositor,
            grid,
        };
        match (clip.is_complex(), damage) {
            (false, None) => tor.render(&mut { adapter }, unbounded),
            (true, None) => tor.render(&mut Clipped::new(clip, adapter), unbounded),
            (false, Some(d)) => tor.render(&mut Damaged::new(d, adapter), unbounded),
            (true, Some(d)) => {
                tor.render(&mut Clipped::new(clip, Damaged::new(d, adapter)), unbounded)
            }
        };
    } else if let Some(boxes) = compositor.thread_boxes() {
        let complex = clip.is_complex();
        let jobs: Vec<(Tor, Vec<OpacityBox>)> = tors.into_iter().zip(buffers).collect();
        run_bands(config.threads.as_deref(), jobs, |(tor, batch)| {
            let sink = ThreadBoxes::new(boxes, grid, batch);
            if complex {
                tor.render(&mut Clipped::new(clip, sink), unbounded);
            } else {
                tor.render(&mut { sink }, unbounded);
            }
        });
    }

    compositor.done();
    Ok(Outcome::Rendered)
}

/// One rasterizer per band, with the trapezoids that reach it.
///
/// `dx`, `dy` shift trapezoids from destination to band coordinates, in
/// pixels.
fn build_bands(
    bands: &[BoxI],
    traps: &[Trapezoid],
    dx: i32,
    dy: i32,
    grid: SampleGrid,
) -> Result<Vec<Tor>, RasterError> {
    let mut tors = Vec::new();
    tors.try_reserve_exact(bands.len())
        .map_err(|_| RasterError::oom("bands", bands.len()))?;
    for band in bands {
        let mut tor = Tor::new(*band, 2 * traps.len(), grid)?;
        for t in traps {
            if fixed_integer_floor(t.top) + dy >= band.y2
                || fixed_integer_ceil(t.bottom) + dy <= band.y1
            {
                continue;
            }
            tor.add_fixed_trapezoid(t, dx * grid.samples_x(), dy * grid.samples_y());
        }
        tors.push(tor);
    }
    Ok(tors)
}

/// Render each band's rasterizer into its rows of `rows`, concurrently
/// when there is more than one.
fn render_bands<F>(tors: Vec<Tor>, bands: &[BoxI], rows: &mut RowAccessor<'_>, config: &RasterConfig, render: F)
where
    F: Fn(Tor, &mut RowAccessor<'_>) + Sync + Send,
{
    if tors.len() == 1 {
        for tor in tors {
            render(tor, rows);
        }
        return;
    }
    let ranges: SmallVec<[(i32, i32); 16]> = bands.iter().map(|b| (b.y1, b.y2)).collect();
    let parts = rows.split_bands(&ranges);
    let jobs: Vec<(Tor, RowAccessor<'_>)> = tors.into_iter().zip(parts).collect();
    run_bands(config.threads.as_deref(), jobs, |(tor, mut part)| {
        render(tor, &mut part)
    });
}

// ============================================================================
// Alpha masks
// ============================================================================

/// 8-bit coverage mask positioned in destination coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlphaMask {
    extents: BoxI,
    stride: usize,
    data: Vec<u8>,
}

impl AlphaMask {
    fn new(extents: BoxI) -> Result<Self, RasterError> {
        let stride = (extents.width() as usize + 3) & !3;
        let len = stride * extents.height() as usize;
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| RasterError::oom("mask bytes", len))?;
        data.resize(len, 0);
        Ok(Self {
            extents,
            stride,
            data,
        })
    }

    /// Destination area the mask covers.
    #[inline]
    pub fn extents(&self) -> &BoxI {
        &self.extents
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.extents.width() as usize
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.extents.height() as usize
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Alpha at destination pixel `(x, y)`, zero outside the mask.
    pub fn alpha_at(&self, x: i32, y: i32) -> u8 {
        if !self.extents.contains(x, y) {
            return 0;
        }
        let (lx, ly) = ((x - self.extents.x1) as usize, (y - self.extents.y1) as usize);
        self.data[ly * self.stride + lx]
    }

    /// Sum of all alpha values.
    pub fn total(&self) -> u64 {
        (0..self.height())
            .flat_map(|y| self.data[y * self.stride..y * self.stride + self.width()].iter())
            .map(|&a| a as u64)
            .sum()
    }

    fn rows_mut(&mut self) -> RowAccessor<'_> {
        let (w, h) = (self.width(), self.height());
        RowAccessor::new(&mut self.data, w, h, self.stride, 1)
    }
}

/// Rasterize `traps` into a mask and pass it to `composite`, the caller's
/// generic composite step (which applies `req.op`).
///
/// Without a mask format, several trapezoids each get their own mask.
pub fn mask_composite<F: FnMut(&AlphaMask)>(
    req: &CompositeRequest,
    dst: &Drawable,
    traps: &[Trapezoid],
    config: &RasterConfig,
    mut composite: F,
) -> Result<Outcome, RasterError> {
    if !config.precise {
        return Err(RasterError::Disabled);
    }

    if !req.mask && traps.len() > 1 {
        log::debug!("mask composite: {} traps one by one", traps.len());
        let mut masks = Vec::new();
        for t in traps {
            if let Some(m) = rasterize_mask(req, dst, std::slice::from_ref(t), config)? {
                masks.push(m);
            }
        }
        if masks.is_empty() {
            return Ok(Outcome::Nothing);
        }
        masks.iter().for_each(&mut composite);
        return Ok(Outcome::Rendered);
    }

    match rasterize_mask(req, dst, traps, config)? {
        Some(mask) => {
            composite(&mask);
            Ok(Outcome::Rendered)
        }
        None => Ok(Outcome::Nothing),
    }
}

fn rasterize_mask(
    req: &CompositeRequest,
    dst: &Drawable,
    traps: &[Trapezoid],
    config: &RasterConfig,
) -> Result<Option<AlphaMask>, RasterError> {
    let Some(bounds) = trapezoids_bounds(traps) else {
        return Ok(None);
    };
    let Some(extents) = dst.clip.extents().intersect(&bounds) else {
        return Ok(None);
    };
    let (w, h) = (extents.width(), extents.height());
    let mut mask = AlphaMask::new(extents)?;

    let grid = config.grid;
    let local = BoxI::new(0, 0, w, h);
    let num_threads = if req.rectilinear {
        1
    } else {
        config.thread_count(w, h)
    };
    let bands = partition_rows(&local, num_threads);
    let tors = build_bands(&bands, traps, -extents.x1, -extents.y1, grid)?;
    let narrow = w <= config.inplace_row_limit;
    log::debug!(
        "mask composite: {}x{} mask at ({}, {}), {} bands, direct rows={}",
        w,
        h,
        extents.x1,
        extents.y1,
        tors.len(),
        narrow
    );

    let mut rows = mask.rows_mut();
    render_bands(tors, &bands, &mut rows, config, |tor, part| {
        if narrow {
            tor.render_mask(part);
        } else {
            tor.render(&mut MaskWriter::new(part, grid), true);
        }
    });
    Ok(Some(mask))
}

// ============================================================================
// In place
// ============================================================================

/// Composite a solid source through `traps` directly into `surface`.
///
/// Handles a8 destinations with Src, In and Add, and 32-bit destinations
/// with Src, Over, Add and OutReverse. Anything else, and any non-solid
/// source, is declined.
pub fn inplace_composite(
    req: &CompositeRequest,
    src: Source,
    surface: &mut Surface<'_>,
    traps: &[Trapezoid],
    config: &RasterConfig,
) -> Result<Outcome, RasterError> {
    if !config.precise {
        return Err(RasterError::Disabled);
    }
    let Source::Solid(color) = src else {
        log::debug!("inplace: non-solid source");
        return Err(RasterError::Unsupported("non-solid source"));
    };

    let clear = surface.drawable.clear;
    let target = match surface.format {
        Format::A8 => {
            let (op, unbounded) = match req.op {
                Op::Add => {
                    let op = if clear == Some(0) { A8Op::Src } else { A8Op::Add };
                    if color >> 24 == 0 {
                        return Ok(Outcome::Nothing);
                    }
                    (op, clear == Some(0))
                }
                Op::In => {
                    if clear == Some(0) {
                        return Ok(Outcome::Nothing);
                    }
                    let op = if clear == Some(0xff) { A8Op::Src } else { A8Op::In };
                    (op, true)
                }
                Op::Src => (A8Op::Src, true),
                _ => return Err(RasterError::Unsupported("operator on a8")),
            };
            Target::A8 {
                op,
                opacity: (color >> 24) as u8,
                unbounded,
            }
        }
        Format::X8r8g8b8 | Format::A8r8g8b8 => {
            let op = match req.op {
                Op::Src => Rgb32Op::Lerp,
                Op::Over if color >> 24 == 0xff || clear == Some(0) => Rgb32Op::Lerp,
                Op::Over => Rgb32Op::Over,
                Op::Add => Rgb32Op::Add,
                Op::OutReverse => Rgb32Op::OutReverse,
                _ => return Err(RasterError::Unsupported("operator on 32-bit")),
            };
            Target::Rgb32 { op, color }
        }
    };
    log::debug!("inplace: {:?} {:?} as {:?}", surface.format, req.op, target);

    let surface_box = surface.pixels.bounds();
    let clip_extents = match surface.drawable.clip.extents().intersect(&surface_box) {
        Some(b) => b,
        None => return Ok(Outcome::Nothing),
    };
    let grid = config.grid;

    // Reserve everything first: one rasterizer per trapezoid when drawing
    // them individually, otherwise one per band.
    let (tors, bands) = if !req.mask && traps.len() > 1 {
        let mut tors = Vec::new();
        for t in traps {
            let Some(b) = trapezoids_bounds(std::slice::from_ref(t)) else {
                continue;
            };
            let Some(extents) = clip_extents.intersect(&b) else {
                continue;
            };
            tors.extend(build_bands(&[extents], std::slice::from_ref(t), 0, 0, grid)?);
        }
        (tors, None)
    } else {
        let Some(b) = trapezoids_bounds(traps) else {
            return Ok(Outcome::Nothing);
        };
        let Some(extents) = clip_extents.intersect(&b) else {
            return Ok(Outcome::Nothing);
        };
        let n = config.thread_count(extents.width(), extents.height());
        let bands = partition_rows(&extents, n);
        (build_bands(&bands, traps, 0, 0, grid)?, Some(bands))
    };
    if tors.is_empty() {
        return Ok(Outcome::Nothing);
    }

    let clip = &surface.drawable.clip;
    match bands {
        Some(bands) => render_bands(tors, &bands, &mut surface.pixels, config, |tor, rows| {
            target.render(tor, rows, clip, grid)
        }),
        None => {
            for tor in tors {
                target.render(tor, &mut surface.pixels, clip, grid);
            }
        }
    }
    Ok(Outcome::Rendered)
}

#[derive(Debug, Clone, Copy)]
enum Target {
    A8 { op: A8Op, opacity: u8, unbounded: bool },
    Rgb32 { op: Rgb32Op, color: u32 },
}

impl Target {
    fn render(self, tor: Tor, rows: &mut RowAccessor<'_>, clip: &ClipRegion, grid: SampleGrid) {
        match self {
            Target::A8 {
                op,
                opacity,
                unbounded,
            } => render_clipped(tor, InplaceA8::new(rows, op, opacity, grid), clip, unbounded),
            Target::Rgb32 { op, color } => {
                render_clipped(tor, InplaceRgb32::new(rows, op, color, grid), clip, false)
            }
        }
    }
}

fn render_clipped<S: SpanSink>(tor: Tor, sink: S, clip: &ClipRegion, unbounded: bool) {
    if clip.is_complex() {
        tor.render(&mut Clipped::new(clip, sink), unbounded);
    } else {
        tor.render(&mut { sink }, unbounded);
    }
}

// ============================================================================
// Triangles
// ============================================================================

/// Rasterize independent triangles into one mask (nonzero winding) and
/// pass it to `composite`.
pub fn triangles_mask<F: FnMut(&AlphaMask)>(
    dst: &Drawable,
    tris: &[Triangle],
    config: &RasterConfig,
    composite: F,
) -> Result<Outcome, RasterError> {
    let bounds = points_bounds(tris.iter().flat_map(|t| [&t.p1, &t.p2, &t.p3]));
    outline_mask(dst, bounds, 3 * tris.len(), config, composite, |tor, p| {
        for t in tris {
            let (a, b, c) = (p(t.p1), p(t.p2), p(t.p3));
            tor.add_line(a, b);
            tor.add_line(b, c);
            tor.add_line(c, a);
        }
    })
}

/// Rasterize a triangle strip as one closed outline and pass the mask to
/// `composite`. Fewer than three points draw nothing.
pub fn tristrip_mask<F: FnMut(&AlphaMask)>(
    dst: &Drawable,
    points: &[PointFixed],
    config: &RasterConfig,
    composite: F,
) -> Result<Outcome, RasterError> {
    if points.len() < 3 {
        return Ok(Outcome::Nothing);
    }
    let bounds = points_bounds(points);
    outline_mask(dst, bounds, 2 * points.len(), config, composite, |tor, p| {
        let count = points.len();
        let (mut cw, mut ccw) = (0, 1);
        tor.add_line(p(points[ccw]), p(points[cw]));
        let mut n = 2;
        loop {
            if n >= count {
                break;
            }
            tor.add_line(p(points[cw]), p(points[n]));
            cw = n;
            n += 1;
            if n >= count {
                break;
            }
            tor.add_line(p(points[n]), p(points[ccw]));
            ccw = n;
            n += 1;
        }
        tor.add_line(p(points[cw]), p(points[ccw]));
    })
}

fn outline_mask<F, A>(
    dst: &Drawable,
    bounds: Option<BoxI>,
    num_edges: usize,
    config: &RasterConfig,
    mut composite: F,
    add: A,
) -> Result<Outcome, RasterError>
where
    F: FnMut(&AlphaMask),
    A: FnOnce(&mut Tor, &dyn Fn(PointFixed) -> PointFixed),
{
    if !config.precise {
        return Err(RasterError::Disabled);
    }
    let Some(bounds) = bounds else {
        return Ok(Outcome::Nothing);
    };
    let Some(extents) = dst.clip.extents().intersect(&bounds) else {
        return Ok(Outcome::Nothing);
    };
    let (w, h) = (extents.width(), extents.height());
    let mut mask = AlphaMask::new(extents)?;
    let grid = config.grid;
    let mut tor = Tor::new(BoxI::new(0, 0, w, h), num_edges, grid)?;

    let (dx, dy) = (-extents.x1 * grid.samples_x(), -extents.y1 * grid.samples_y());
    add(&mut tor, &|pt| grid.project_point(pt, dx, dy));
    log::debug!("outline mask: {}x{} with {} edges", w, h, tor.num_edges());

    let mut rows = mask.rows_mut();
    if w <= config.inplace_row_limit {
        tor.render_mask(&mut rows);
    } else {
        tor.render(&mut MaskWriter::new(&mut rows, grid), true);
    }
    composite(&mask);
    Ok(Outcome::Rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basics::{fixed_from_f64, fixed_from_int};

    #[derive(Default)]
    struct Recorder {
        begun: Option<(Op, BoxI)>,
        boxes: Vec<(BoxI, f32)>,
        done: bool,
    }

    impl CompositeSpans for Recorder {
        fn begin(&mut self, op: Op, extents: &BoxI) -> bool {
            self.begun = Some((op, *extents));
            true
        }

        fn composite_box(&mut self, b: &BoxI, opacity: f32) {
            self.boxes.push((*b, opacity));
        }

        fn done(&mut self) {
            self.done = true;
        }
    }

    fn rect(x1: i32, y1: i32, x2: i32, y2: i32) -> Trapezoid {
        Trapezoid::rect(
            fixed_from_int(x1),
            fixed_from_int(y1),
            fixed_from_int(x2),
            fixed_from_int(y2),
        )
    }

    fn screen() -> Drawable {
        Drawable::new(ClipRegion::from_size(200, 200))
    }

    #[test]
    fn test_op_bounded() {
        assert!(Op::Over.is_bounded());
        assert!(Op::Add.is_bounded());
        assert!(Op::OutReverse.is_bounded());
        assert!(!Op::Src.is_bounded());
        assert!(!Op::In.is_bounded());
    }

    #[test]
    fn test_span_composite_rect() {
        let mut rec = Recorder::default();
        let out = span_composite(
            &mut rec,
            &CompositeRequest::new(Op::Over),
            &screen(),
            &[rect(10, 10, 50, 50)],
            None,
            &RasterConfig::default(),
        );
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(rec.begun, Some((Op::Over, BoxI::new(10, 10, 50, 50))));
        assert!(rec.done);
        let area: f64 = rec.boxes.iter().map(|(b, o)| b.area() as f64 * *o as f64).sum();
        assert_eq!(area, 1600.0);
    }

    #[test]
    fn test_span_composite_small_extent_declines() {
        let mut rec = Recorder::default();
        let out = span_composite(
            &mut rec,
            &CompositeRequest::new(Op::Over),
            &screen(),
            &[rect(0, 0, 8, 8)],
            None,
            &RasterConfig::default(),
        );
        assert_eq!(out, Err(RasterError::Unsupported("extents too small")));
        assert!(rec.begun.is_none());
    }

    #[test]
    fn test_span_composite_rewrites_on_clear() {
        let mut rec = Recorder::default();
        let dst = screen().cleared_to(0);
        let out = span_composite(
            &mut rec,
            &CompositeRequest::new(Op::Add),
            &dst,
            &[rect(0, 0, 40, 40)],
            None,
            &RasterConfig::default(),
        );
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(rec.begun.map(|b| b.0), Some(Op::Src));

        let mut rec = Recorder::default();
        let out = span_composite(
            &mut rec,
            &CompositeRequest::new(Op::In),
            &dst,
            &[rect(0, 0, 40, 40)],
            None,
            &RasterConfig::default(),
        );
        assert_eq!(out, Ok(Outcome::Nothing));
        assert!(rec.boxes.is_empty());
    }

    #[test]
    fn test_span_composite_nonzero_clear_keeps_op() {
        let apex = Trapezoid::new(
            0,
            fixed_from_int(40),
            crate::basics::LineFixed::new(PointFixed::from_ints(20, 0), PointFixed::from_ints(0, 40)),
            crate::basics::LineFixed::new(PointFixed::from_ints(20, 0), PointFixed::from_ints(40, 40)),
        );
        let white = screen().cleared_to(0xffff_ffff);
        let config = RasterConfig::default();

        let mut rec = Recorder::default();
        let out = span_composite(&mut rec, &CompositeRequest::new(Op::In), &white, &[apex], None, &config);
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(rec.begun.map(|b| b.0), Some(Op::In));
        // Still unbounded: every pixel of the extents is reported.
        let covered: i64 = rec.boxes.iter().map(|(b, _)| b.area()).sum();
        assert_eq!(covered, 40 * 40);
        assert!(rec.boxes.iter().any(|(_, o)| *o == 0.0));

        let mut rec = Recorder::default();
        let out = span_composite(&mut rec, &CompositeRequest::new(Op::Over), &white, &[apex], None, &config);
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(rec.begun.map(|b| b.0), Some(Op::Over));

        let black = screen().cleared_to(0);
        let mut rec = Recorder::default();
        let out = span_composite(&mut rec, &CompositeRequest::new(Op::Over), &black, &[apex], None, &config);
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(rec.begun.map(|b| b.0), Some(Op::Src));
    }

    #[test]
    fn test_span_composite_disabled() {
        let mut rec = Recorder::default();
        let out = span_composite(
            &mut rec,
            &CompositeRequest::new(Op::Over),
            &screen(),
            &[rect(0, 0, 40, 40)],
            None,
            &RasterConfig::default().with_precise(false),
        );
        assert_eq!(out, Err(RasterError::Disabled));
    }

    #[test]
    fn test_span_composite_unbounded_src() {
        let mut rec = Recorder::default();
        let t = Trapezoid::new(
            0,
            fixed_from_int(40),
            crate::basics::LineFixed::new(PointFixed::from_ints(20, 0), PointFixed::from_ints(0, 40)),
            crate::basics::LineFixed::new(PointFixed::from_ints(20, 0), PointFixed::from_ints(40, 40)),
        );
        span_composite(
            &mut rec,
            &CompositeRequest::new(Op::Src),
            &screen(),
            &[t],
            None,
            &RasterConfig::default(),
        )
        .unwrap();
        let covered: i64 = rec.boxes.iter().map(|(b, _)| b.area()).sum();
        assert_eq!(covered, 40 * 40);
        assert!(rec.boxes.iter().any(|(_, o)| *o == 0.0));
    }

    #[test]
    fn test_span_composite_damage() {
        let mut rec = Recorder::default();
        let mut damage = Damage::new();
        span_composite(
            &mut rec,
            &CompositeRequest::new(Op::Over),
            &screen(),
            &[rect(5, 5, 45, 45)],
            Some(&mut damage),
            &RasterConfig::default(),
        )
        .unwrap();
        assert_eq!(*damage.extents(), BoxI::new(5, 5, 45, 45));
        assert_eq!(damage.boxes().len(), rec.boxes.len());
    }

    #[test]
    fn test_mask_composite_fractional() {
        let mut masks = Vec::new();
        let t = Trapezoid::rect(
            fixed_from_f64(1.5),
            fixed_from_int(1),
            fixed_from_f64(3.5),
            fixed_from_int(3),
        );
        let out = mask_composite(
            &CompositeRequest::new(Op::Over),
            &screen(),
            &[t],
            &RasterConfig::default(),
            |m| masks.push(m.clone()),
        );
        assert_eq!(out, Ok(Outcome::Rendered));
        let m = &masks[0];
        assert_eq!(*m.extents(), BoxI::new(1, 1, 4, 3));
        assert_eq!(m.alpha_at(2, 2), 255);
        let edge = m.alpha_at(1, 1);
        assert!((120..=136).contains(&edge), "edge alpha {edge}");
        assert_eq!(m.alpha_at(0, 0), 0);
    }

    #[test]
    fn test_mask_composite_individual() {
        let mut count = 0;
        let out = mask_composite(
            &CompositeRequest::new(Op::Add).without_mask(),
            &screen(),
            &[rect(0, 0, 4, 4), rect(10, 10, 12, 12), rect(300, 300, 310, 310)],
            &RasterConfig::default(),
            |_| count += 1,
        );
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(count, 2);
    }

    #[test]
    fn test_mask_composite_nothing() {
        let out = mask_composite(
            &CompositeRequest::new(Op::Over),
            &screen(),
            &[rect(500, 500, 510, 510)],
            &RasterConfig::default(),
            |_| panic!("no mask expected"),
        );
        assert_eq!(out, Ok(Outcome::Nothing));
    }

    #[test]
    fn test_inplace_a8_src() {
        let mut buf = vec![7u8; 16];
        let mut surface = Surface::new(Format::A8, RowAccessor::new(&mut buf, 4, 4, 4, 1));
        let out = inplace_composite(
            &CompositeRequest::new(Op::Src),
            Source::Solid(0xff00_0000),
            &mut surface,
            &[rect(1, 1, 3, 3)],
            &RasterConfig::default(),
        );
        assert_eq!(out, Ok(Outcome::Rendered));
        drop(surface);
        assert_eq!(
            buf,
            vec![7, 7, 7, 7, 7, 255, 255, 7, 7, 255, 255, 7, 7, 7, 7, 7]
        );
    }

    #[test]
    fn test_inplace_rejects_pattern_and_ops() {
        let mut buf = vec![0u8; 16];
        let mut surface = Surface::new(Format::A8, RowAccessor::new(&mut buf, 4, 4, 4, 1));
        let req = CompositeRequest::new(Op::Src);
        let cfg = RasterConfig::default();
        assert!(inplace_composite(&req, Source::Pattern, &mut surface, &[rect(0, 0, 1, 1)], &cfg).is_err());
        let over = CompositeRequest::new(Op::Over);
        assert_eq!(
            inplace_composite(&over, Source::Solid(0xff00_0000), &mut surface, &[rect(0, 0, 1, 1)], &cfg),
            Err(RasterError::Unsupported("operator on a8"))
        );
    }

    #[test]
    fn test_tristrip_outline() {
        let pts = [
            PointFixed::from_ints(0, 0),
            PointFixed::from_ints(0, 4),
            PointFixed::from_ints(4, 0),
            PointFixed::from_ints(4, 4),
        ];
        let mut total = 0;
        let out = tristrip_mask(&screen(), &pts, &RasterConfig::default(), |m| total = m.total());
        assert_eq!(out, Ok(Outcome::Rendered));
        assert_eq!(total, 16 * 255);
        assert_eq!(
            tristrip_mask(&screen(), &pts[..2], &RasterConfig::default(), |_| {}),
            Ok(Outcome::Nothing)
        );
    }

    #[test]
    fn test_triangles_mask() {
        let tris = [Triangle::new(
            PointFixed::from_ints(0, 0),
            PointFixed::from_ints(8, 0),
            PointFixed::from_ints(0, 8),
        )];
        let mut total = 0;
        triangles_mask(&screen(), &tris, &RasterConfig::default(), |m| total = m.total()).unwrap();
        // Half of 64 pixels, within sampling error.
        let expect = 32 * 255;
        assert!((total as i64 - expect).abs() < 255, "total {total}");
    }
}

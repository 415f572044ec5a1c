//! # trapezoid-raster
//!
//! Precise antialiased rasterization of 16.16 fixed-point trapezoids,
//! triangles and triangle strips.
//!
//! Geometry is projected onto a sub-pixel sample grid (17x15 by default)
//! and swept top to bottom. Each pixel gets an exact count of the samples
//! inside the shape under the nonzero winding rule, reported as boxes of
//! uniform coverage.
//!
//! ## Architecture
//!
//! 1. **Polygon** ([`polygon`]): edge arena and per-row start buckets
//! 2. **Active list** ([`active_list`]): x-sorted edges crossing the sweep
//! 3. **Cell list** ([`cell_list`]): per-pixel coverage of the current row
//! 4. **Sweep** ([`tor`]): bulk skip, full-row step or subsampling, then
//!    box emission to a [`SpanSink`]
//! 5. **Backends**: caller compositors, alpha masks, in-place a8 and
//!    32-bit surfaces ([`composite`])
//!
//! Large jobs can be split into row bands and swept on a caller-owned
//! rayon pool ([`threaded`]).
//!
//! ```
//! use trapezoid_raster::{
//!     fixed_from_int, mask_composite, ClipRegion, CompositeRequest, Drawable, Op, Outcome,
//!     RasterConfig, Trapezoid,
//! };
//!
//! let square = Trapezoid::rect(
//!     fixed_from_int(2),
//!     fixed_from_int(2),
//!     fixed_from_int(6),
//!     fixed_from_int(6),
//! );
//! let dst = Drawable::new(ClipRegion::from_size(16, 16));
//! let mut total = 0;
//! let out = mask_composite(
//!     &CompositeRequest::new(Op::Over),
//!     &dst,
//!     &[square],
//!     &RasterConfig::default(),
//!     |mask| total = mask.total(),
//! );
//! assert_eq!(out, Ok(Outcome::Rendered));
//! assert_eq!(total, 16 * 255);
//! ```

// Foundation
pub mod basics;
pub mod color;
pub mod error;
pub mod grid;

// Rasterizer
pub mod active_list;
pub mod cell_list;
pub mod polygon;
pub mod tor;

// Output
pub mod pixfmt_a8;
pub mod pixfmt_rgb32;
pub mod region;
pub mod rendering_buffer;
pub mod span_sink;

// Entry points
pub mod composite;
pub mod config;
pub mod threaded;

pub use basics::{
    fixed_from_f64, fixed_from_int, BoxI, Fixed, LineFixed, PointFixed, Trapezoid, Triangle,
};
pub use composite::{
    inplace_composite, mask_composite, span_composite, triangles_mask, tristrip_mask, AlphaMask,
    CompositeRequest, CompositeSpans, Drawable, Format, Op, Outcome, Source, Surface,
};
pub use config::RasterConfig;
pub use error::RasterError;
pub use grid::SampleGrid;
pub use region::ClipRegion;
pub use rendering_buffer::RowAccessor;
pub use span_sink::{Damage, SpanSink};
pub use threaded::{BoxCompositor, OpacityBox};
pub use tor::{SweepStats, Tor};

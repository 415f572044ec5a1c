//! In-place operators against the mask path.

use trapezoid_raster::color::{mul_4x8_8, mul_8_8, over};
use trapezoid_raster::{
    fixed_from_f64, fixed_from_int, inplace_composite, mask_composite, AlphaMask, ClipRegion,
    CompositeRequest, Drawable, Format, LineFixed, Op, Outcome, PointFixed, RasterConfig,
    RasterError, RowAccessor, Source, Surface, Trapezoid,
};

const W: usize = 48;
const H: usize = 40;

fn pt(x: f64, y: f64) -> PointFixed {
    PointFixed::new(fixed_from_f64(x), fixed_from_f64(y))
}

fn wedge() -> Trapezoid {
    Trapezoid::new(
        fixed_from_f64(2.4),
        fixed_from_f64(35.8),
        LineFixed::new(pt(20.0, 0.0), pt(3.5, 40.0)),
        LineFixed::new(pt(21.0, 0.0), pt(44.25, 40.0)),
    )
}

fn mask_of(t: &Trapezoid) -> AlphaMask {
    let mut out = None;
    mask_composite(
        &CompositeRequest::new(Op::Over),
        &Drawable::new(ClipRegion::from_size(W as i32, H as i32)),
        std::slice::from_ref(t),
        &RasterConfig::default(),
        |m| out = Some(m.clone()),
    )
    .unwrap();
    out.unwrap()
}

fn a8(buf: &mut [u8]) -> Surface<'_> {
    Surface::new(Format::A8, RowAccessor::new(buf, W, H, W, 1))
}

fn rgb32(buf: &mut [u8]) -> Surface<'_> {
    Surface::new(Format::A8r8g8b8, RowAccessor::new(buf, W, H, W * 4, 4))
}

fn words(buf: &[u8]) -> Vec<u32> {
    buf.chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[test]
fn test_a8_add_accumulates_mask() {
    let t = wedge();
    let mask = mask_of(&t);
    let mut buf = vec![0u8; W * H];
    let req = CompositeRequest::new(Op::Add);
    for _ in 0..2 {
        let r = inplace_composite(&req, Source::Solid(0xff00_0000), &mut a8(&mut buf), &[t], &RasterConfig::default());
        assert_eq!(r, Ok(Outcome::Rendered));
    }
    for y in 0..H {
        for x in 0..W {
            let a = mask.alpha_at(x as i32, y as i32);
            assert_eq!(buf[y * W + x], a.saturating_add(a), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_a8_in_clears_outside_shape() {
    let t = wedge();
    let mask = mask_of(&t);
    let mut buf = vec![200u8; W * H];
    let r = inplace_composite(
        &CompositeRequest::new(Op::In),
        Source::Solid(0xff00_0000),
        &mut a8(&mut buf),
        &[t],
        &RasterConfig::default(),
    );
    assert_eq!(r, Ok(Outcome::Rendered));
    let e = *mask.extents();
    for y in e.y1..e.y2 {
        for x in e.x1..e.x2 {
            let a = mask.alpha_at(x, y);
            let expect = match a {
                0 => 0,
                255 => 200,
                a => mul_8_8(200, a),
            };
            assert_eq!(buf[y as usize * W + x as usize], expect, "pixel ({x}, {y})");
        }
    }
    // Outside the extents nothing changes.
    assert_eq!(buf[W * H - 1], 200);
}

#[test]
fn test_a8_clear_rewrites() {
    let t = wedge();
    let config = RasterConfig::default();

    // In on a zero-cleared destination has nothing to do.
    let mut buf = vec![0u8; W * H];
    let mut s = a8(&mut buf);
    s.drawable.clear = Some(0);
    let r = inplace_composite(&CompositeRequest::new(Op::In), Source::Solid(0xff00_0000), &mut s, &[t], &config);
    assert_eq!(r, Ok(Outcome::Nothing));

    // Transparent add does nothing either.
    let r = inplace_composite(&CompositeRequest::new(Op::Add), Source::Solid(0x00ff_ffff), &mut a8(&mut buf), &[t], &config);
    assert_eq!(r, Ok(Outcome::Nothing));
    assert!(buf.iter().all(|&v| v == 0));

    // In on a 0xff-cleared destination writes the mask.
    let mut buf = vec![0xffu8; W * H];
    let mut s = a8(&mut buf);
    s.drawable.clear = Some(0xff);
    inplace_composite(&CompositeRequest::new(Op::In), Source::Solid(0xff00_0000), &mut s, &[t], &config).unwrap();
    drop(s);
    let mask = mask_of(&t);
    let e = *mask.extents();
    for y in e.y1..e.y2 {
        for x in e.x1..e.x2 {
            assert_eq!(buf[y as usize * W + x as usize], mask.alpha_at(x, y));
        }
    }
}

#[test]
fn test_rgb32_over_matches_mask() {
    let t = wedge();
    let mask = mask_of(&t);
    let color = 0x8040_2010;
    let dst = 0xff30_6090u32;
    let mut buf: Vec<u8> = std::iter::repeat(dst.to_ne_bytes()).take(W * H).flatten().collect();
    let r = inplace_composite(
        &CompositeRequest::new(Op::Over),
        Source::Solid(color),
        &mut rgb32(&mut buf),
        &[t],
        &RasterConfig::default(),
    );
    assert_eq!(r, Ok(Outcome::Rendered));

    let out = words(&buf);
    for y in 0..H {
        for x in 0..W {
            let expect = match mask.alpha_at(x as i32, y as i32) {
                0 => dst,
                255 => over(color, dst),
                a => over(mul_4x8_8(color, a), dst),
            };
            assert_eq!(out[y * W + x], expect, "pixel ({x}, {y})");
        }
    }
}

#[test]
fn test_rgb32_opaque_over_is_lerp() {
    let t = Trapezoid::rect(fixed_from_int(4), fixed_from_int(4), fixed_from_int(12), fixed_from_int(12));
    let mut buf = vec![0u8; W * H * 4];
    inplace_composite(
        &CompositeRequest::new(Op::Over),
        Source::Solid(0xff11_2233),
        &mut rgb32(&mut buf),
        &[t],
        &RasterConfig::default(),
    )
    .unwrap();
    let out = words(&buf);
    assert_eq!(out[5 * W + 5], 0xff11_2233);
    assert_eq!(out[3 * W + 3], 0);
    assert_eq!(out.iter().filter(|&&v| v != 0).count(), 64);
}

#[test]
fn test_inplace_declines() {
    let t = wedge();
    let config = RasterConfig::default();
    let mut buf = vec![0u8; W * H * 4];
    let r = inplace_composite(&CompositeRequest::new(Op::Over), Source::Pattern, &mut rgb32(&mut buf), &[t], &config);
    assert_eq!(r, Err(RasterError::Unsupported("non-solid source")));
    let r = inplace_composite(&CompositeRequest::new(Op::In), Source::Solid(0xff00_0000), &mut rgb32(&mut buf), &[t], &config);
    assert!(matches!(r, Err(e) if e.is_fallback()));
    let r = inplace_composite(
        &CompositeRequest::new(Op::Src),
        Source::Solid(0xff00_0000),
        &mut rgb32(&mut buf),
        &[t],
        &config.clone().with_precise(false),
    );
    assert_eq!(r, Err(RasterError::Disabled));
    assert!(buf.iter().all(|&v| v == 0));
}

#[test]
fn test_individual_traps_accumulate() {
    // Without a mask the overlapping halves are added one after the other.
    let a = Trapezoid::rect(fixed_from_int(0), fixed_from_int(0), fixed_from_int(8), fixed_from_int(4));
    let b = Trapezoid::rect(fixed_from_int(4), fixed_from_int(0), fixed_from_int(12), fixed_from_int(4));
    let mut buf = vec![0u8; W * H];
    inplace_composite(
        &CompositeRequest::new(Op::Add).without_mask(),
        Source::Solid(0x6000_0000),
        &mut a8(&mut buf),
        &[a, b],
        &RasterConfig::default(),
    )
    .unwrap();
    assert_eq!(buf[0], 0x60);
    assert_eq!(buf[5], 0xc0);
    assert_eq!(buf[10], 0x60);

    // With a mask they are one shape.
    let mut buf = vec![0u8; W * H];
    inplace_composite(
        &CompositeRequest::new(Op::Add),
        Source::Solid(0x6000_0000),
        &mut a8(&mut buf),
        &[a, b],
        &RasterConfig::default(),
    )
    .unwrap();
    assert_eq!(buf[5], 0x60);
}

//! 8-bit channel arithmetic on single values and packed 32-bit pixels.
//!
//! Packed pixels are `0xAARRGGBB` in native endianness, premultiplied.

/// `a * b / 255`, rounded.
#[inline]
pub fn mul_8_8(a: u8, b: u8) -> u8 {
    let t = a as u32 * b as u32 + 0x7f;
    (((t >> 8) + t) >> 8) as u8
}

/// Scale all four channels of `x` by `a / 255`.
#[inline]
pub fn mul_4x8_8(x: u32, a: u8) -> u32 {
    let a = a as u32;
    let mut rb = (x & 0x00ff_00ff) * a + 0x007f_007f;
    rb = ((rb + ((rb >> 8) & 0x00ff_00ff)) >> 8) & 0x00ff_00ff;
    let mut ag = ((x >> 8) & 0x00ff_00ff) * a + 0x007f_007f;
    ag = (ag + ((ag >> 8) & 0x00ff_00ff)) & 0xff00_ff00;
    rb | ag
}

/// Per-channel saturating add.
#[inline]
pub fn add_4x8(x: u32, y: u32) -> u32 {
    let mut out = 0;
    for shift in [0, 8, 16, 24] {
        let s = ((x >> shift) & 0xff) + ((y >> shift) & 0xff);
        out |= s.min(0xff) << shift;
    }
    out
}

/// `src * a + dst * (255 - a)`, per channel.
#[inline]
pub fn lerp8x4(src: u32, a: u8, dst: u32) -> u32 {
    add_4x8(mul_4x8_8(src, a), mul_4x8_8(dst, 255 - a))
}

#[inline]
pub fn alpha(x: u32) -> u8 {
    (x >> 24) as u8
}

/// Porter-Duff over for premultiplied pixels.
#[inline]
pub fn over(src: u32, dst: u32) -> u32 {
    add_4x8(src, mul_4x8_8(dst, 255 - alpha(src)))
}

/// Destination scaled by the inverse of the source alpha.
#[inline]
pub fn out_reverse(src: u32, dst: u32) -> u32 {
    mul_4x8_8(dst, 255 - alpha(src))
}

//! Packed RGBA Colors
//!
//! Pixels and part colors are stored as a single `u32` with the red channel
//! in the lowest byte: `0xAABBGGRR`. An opaque red pixel is `0xFF0000FF`.
//!
//! The blend and tint helpers here are the only place pixel arithmetic
//! happens; texture allocations and bitmaps call into them.

use serde::{Deserialize, Serialize};

/// Packs four 8-bit channels into a pixel.
#[inline]
#[must_use]
pub const fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    (r as u32) | ((g as u32) << 8) | ((b as u32) << 16) | ((a as u32) << 24)
}

/// Unpacks a pixel into `[r, g, b, a]`.
#[inline]
#[must_use]
pub const fn unpack_rgba(pixel: u32) -> [u8; 4] {
    pixel.to_le_bytes()
}

#[inline]
#[must_use]
pub const fn alpha(pixel: u32) -> u8 {
    (pixel >> 24) as u8
}

/// Alpha-over blend of `src` on top of `dst` using truncating 8-bit integer
/// arithmetic:
///
/// ```text
/// c' = (srcA * src + dstA * dst * (255 - srcA) / 255) / 255
/// a' = srcA + dstA * (255 - srcA) / 255
/// ```
///
/// Color channels are not renormalized by the output alpha. A fully
/// transparent source leaves `dst` untouched and a fully opaque source
/// replaces it, both bit-exact.
#[inline]
#[must_use]
pub fn blend_over(dst: u32, src: u32) -> u32 {
    let src_a = u32::from(alpha(src));
    if src_a == 0 {
        return dst;
    }
    if src_a == 255 {
        return src;
    }

    let [sr, sg, sb, _] = unpack_rgba(src);
    let [dr, dg, db, da] = unpack_rgba(dst);
    let dst_a = u32::from(da);
    let uncovered = 255 - src_a;

    let mix = |s: u8, d: u8| -> u8 {
        let num = src_a * u32::from(s) + dst_a * u32::from(d) * uncovered / 255;
        (num / 255) as u8
    };

    let out_a = src_a + dst_a * uncovered / 255;
    pack_rgba(mix(sr, dr), mix(sg, dg), mix(sb, db), out_a as u8)
}

/// Multiplies the RGB channels of `pixel` by `tint`, keeping the pixel alpha.
#[inline]
#[must_use]
pub fn multiply_rgb(pixel: u32, tint: u32) -> u32 {
    let [r, g, b, a] = unpack_rgba(pixel);
    let [tr, tg, tb, _] = unpack_rgba(tint);
    let mul = |c: u8, t: u8| (u32::from(c) * u32::from(t) / 255) as u8;
    pack_rgba(mul(r, tr), mul(g, tg), mul(b, tb), a)
}

// ============================================================================
// RGB triplets
// ============================================================================

/// Opaque RGB color as stored in presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorRgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorRgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Extracts the RGB channels of a packed pixel, dropping alpha.
    #[must_use]
    pub const fn from_packed(pixel: u32) -> Self {
        let [r, g, b, _] = unpack_rgba(pixel);
        Self { r, g, b }
    }

    /// Packs into an opaque pixel.
    #[must_use]
    pub const fn to_packed(self) -> u32 {
        pack_rgba(self.r, self.g, self.b, 255)
    }
}

// ============================================================================
// HSV
// ============================================================================

/// Converts normalized RGB (`0.0..=1.0`) to HSV, all components in `0.0..=1.0`.
#[must_use]
pub fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let cmin = r.min(g).min(b);
    let cmax = r.max(g).max(b);
    let chroma = cmax - cmin;

    if chroma < 1e-9 || cmax <= 0.0 {
        return (0.0, 0.0, cmax.max(0.0));
    }

    let s = chroma / cmax;
    #[allow(clippy::float_cmp)]
    let mut h = if r == cmax {
        (if g < b { 6.0 } else { 0.0 }) + (g - b) / chroma
    } else if g == cmax {
        2.0 + (b - r) / chroma
    } else {
        4.0 + (r - g) / chroma
    };
    if h < 0.0 {
        h += 6.0;
    }

    (h / 6.0, s, cmax)
}

/// Converts HSV (all components `0.0..=1.0`) to 8-bit RGB.
#[must_use]
pub fn hsv_to_rgb(hue: f64, sat: f64, val: f64) -> ColorRgb {
    let scaled = hue * 6.0;
    let c = sat * val;
    let x = c * (1.0 - ((scaled % 2.0) - 1.0).abs());
    let m = val - c;

    let (r, g, b) = match (scaled % 6.0).floor() as i32 {
        0 => (c + m, x + m, m),
        1 => (x + m, c + m, m),
        2 => (m, c + m, x + m),
        3 => (m, x + m, c + m),
        4 => (x + m, m, c + m),
        5 => (c + m, m, x + m),
        _ => (m, m, m),
    };

    let to_u8 = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;
    ColorRgb::new(to_u8(r), to_u8(g), to_u8(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_puts_red_in_low_byte() {
        assert_eq!(pack_rgba(255, 0, 0, 255), 0xFF00_00FF);
        assert_eq!(unpack_rgba(0xFF00_00FF), [255, 0, 0, 255]);
    }

    #[test]
    fn blend_opaque_source_replaces() {
        let dst = pack_rgba(10, 20, 30, 40);
        let src = pack_rgba(255, 0, 0, 255);
        assert_eq!(blend_over(dst, src), src);
    }

    #[test]
    fn blend_transparent_source_keeps_destination() {
        let dst = pack_rgba(10, 20, 30, 40);
        assert_eq!(blend_over(dst, pack_rgba(200, 200, 200, 0)), dst);
    }

    #[test]
    fn blend_half_over_opaque() {
        let dst = pack_rgba(0, 0, 255, 255);
        let src = pack_rgba(255, 0, 0, 128);
        // r = 128*255/255, b = 255*255*127/255/255
        assert_eq!(unpack_rgba(blend_over(dst, src)), [128, 0, 127, 255]);
    }

    #[test]
    fn blend_over_transparent_destination_darkens() {
        let src = pack_rgba(200, 100, 50, 100);
        assert_eq!(unpack_rgba(blend_over(0, src)), [78, 39, 19, 100]);
    }

    #[test]
    fn blend_over_translucent_destination() {
        let dst = pack_rgba(0, 0, 255, 128);
        let src = pack_rgba(200, 100, 50, 100);
        // b = (100*50 + 128*255*155/255) / 255
        assert_eq!(unpack_rgba(blend_over(dst, src)), [78, 39, 97, 177]);
    }

    #[test]
    fn multiply_keeps_alpha() {
        let out = multiply_rgb(pack_rgba(255, 255, 255, 77), pack_rgba(255, 128, 0, 255));
        assert_eq!(unpack_rgba(out), [255, 128, 0, 77]);
    }

    #[test]
    fn hsv_round_trip_primaries() {
        let (h, s, v) = rgb_to_hsv(0.0, 1.0, 0.0);
        assert!((h - 1.0 / 3.0).abs() < 1e-9);
        assert!((s - 1.0).abs() < 1e-9);
        assert!((v - 1.0).abs() < 1e-9);
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), ColorRgb::new(255, 0, 0));
        assert_eq!(hsv_to_rgb(0.5, 0.0, 0.5), ColorRgb::new(128, 128, 128));
    }
}

// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Converts an `f32` to IEEE-754 binary16 format represented as the bits of a `u16`.
///
/// This implementation was adapted from Fabian Giesen's `float_to_half_fast3`()
/// function which can be found at <https://gist.github.com/rygorous/2156668#file-gistfile1-cpp-L285>
pub fn f32_to_f16(val: f32) -> u16 {
    const INF_32: u32 = 255 << 23;
    const INF_16: u32 = 31 << 23;
    const MAGIC: u32 = 15 << 23;
    const SIGN_MASK: u32 = 0x8000_0000_u32;
    const ROUND_MASK: u32 = !0xFFF_u32;

    let u = val.to_bits();
    let sign = u & SIGN_MASK;
    let u = u ^ sign;

    // Inf or NaN (all exponent bits set)
    let output: u16 = if u >= INF_32 {
        // NaN -> qNaN and Inf->Inf
        if u > INF_32 {
            0x7E00
        } else {
            0x7C00
        }
    } else {
        // (De)normalized number or zero
        let mut u = u & ROUND_MASK;
        u = (f32::from_bits(u) * f32::from_bits(MAGIC)).to_bits();
        u = u.overflowing_sub(ROUND_MASK).0;

        // Clamp to signed infinity if exponent overflowed
        if u > INF_16 {
            u = INF_16;
        }
        (u >> 13) as u16
    };
    output | (sign >> 16) as u16
}

/// Converts a 16-bit precision IEEE-754 binary16 float to a `f32`.
///
/// This implementation was adapted from Fabian Giesen's `half_to_float()`
/// function which can be found at <https://gist.github.com/rygorous/2156668#file-gistfile1-cpp-L574>
pub fn f16_to_f32(bits: u16) -> f32 {
    let bits = bits as u32;
    const MAGIC: u32 = 113 << 23;
    const SHIFTED_EXP: u32 = 0x7c00 << 13; // exponent mask after shift

    let mut o = (bits & 0x7fff) << 13; // exponent/mantissa bits
    let exp = SHIFTED_EXP & o; // just the exponent
    o += (127 - 15) << 23; // exponent adjust

    // handle exponent special cases
    if exp == SHIFTED_EXP {
        // Inf/NaN?
        o += (128 - 16) << 23; // extra exp adjust
    } else if exp == 0 {
        // Zero/Denormal?
        o += 1 << 23; // extra exp adjust
        o = (f32::from_bits(o) - f32::from_bits(MAGIC)).to_bits(); // normalize
    }

    f32::from_bits(o | ((bits & 0x8000) << 16)) // sign bit
}

/// Converts an `f32` to an unsigned small float with a 5-bit exponent and
/// `mantissa_bits` of mantissa, as used by the 11- and 10-bit channels of
/// packed HDR formats.
///
/// Negative values clamp to zero and finite values above the largest
/// representable one clamp to it. Mantissa bits are truncated.
pub fn f32_to_ufloat(val: f32, mantissa_bits: u32) -> u32 {
    let exp_shift = mantissa_bits;
    let mantissa_mask = (1 << mantissa_bits) - 1;
    if val.is_nan() {
        return (0x1f << exp_shift) | 1;
    }
    if val <= 0.0 {
        return 0;
    }
    if val.is_infinite() {
        return 0x1f << exp_shift;
    }
    let bits = val.to_bits();
    let exp = ((bits >> 23) & 0xff) as i32 - 127;
    let mantissa = bits & 0x7f_ffff;
    if exp > 15 {
        (0x1e << exp_shift) | mantissa_mask
    } else if exp < -14 {
        // Denormal: shift the implicit leading one into the mantissa.
        let shift = (23 - mantissa_bits as i32) + (-14 - exp);
        if shift >= 32 {
            0
        } else {
            (mantissa | 0x80_0000) >> shift
        }
    } else {
        (((exp + 15) as u32) << exp_shift) | (mantissa >> (23 - mantissa_bits))
    }
}

/// Inverse of [`f32_to_ufloat`].
pub fn ufloat_to_f32(bits: u32, mantissa_bits: u32) -> f32 {
    let exp = (bits >> mantissa_bits) & 0x1f;
    let mantissa = bits & ((1 << mantissa_bits) - 1);
    let scale = (1u32 << mantissa_bits) as f32;
    match exp {
        0 => (mantissa as f32 / scale) * 2f32.powi(-14),
        0x1f if mantissa == 0 => f32::INFINITY,
        0x1f => f32::NAN,
        _ => 2f32.powi(exp as i32 - 15) * (1.0 + mantissa as f32 / scale),
    }
}

const RGB9E5_MANTISSA_BITS: i32 = 9;
const RGB9E5_EXP_BIAS: i32 = 15;

/// Largest value a shared-exponent channel holds: `511 / 512 * 2^16`.
const RGB9E5_MAX: f32 = 65408.0;

/// Packs red, green and blue into the shared-exponent layout of
/// `E5B9G9R9_UFLOAT_PACK32`: three 9-bit mantissas from bit 0 and a 5-bit
/// exponent in the top bits.
///
/// NaN and negative values become zero and large values clamp to the
/// largest representable one. Mantissas are rounded to nearest.
pub fn f32x3_to_rgb9e5(rgb: [f32; 3]) -> u32 {
    let clamped = rgb.map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, RGB9E5_MAX) });
    let max = clamped[0].max(clamped[1]).max(clamped[2]);

    // floor(log2(max)), with zero and denormals landing below the bias.
    let floor_log2 = ((max.to_bits() >> 23) & 0xff) as i32 - 127;
    let mut exp = floor_log2.max(-RGB9E5_EXP_BIAS - 1) + 1 + RGB9E5_EXP_BIAS;
    let scale = |exp: i32| 2f32.powi(exp - RGB9E5_EXP_BIAS - RGB9E5_MANTISSA_BITS);
    // Rounding the largest mantissa up can carry into the exponent.
    if (max / scale(exp) + 0.5).floor() as u32 == 1 << RGB9E5_MANTISSA_BITS {
        exp += 1;
    }

    let [r, g, b] = clamped.map(|v| ((v / scale(exp) + 0.5).floor() as u32).min(0x1ff));
    r | (g << 9) | (b << 18) | ((exp as u32) << 27)
}

/// Inverse of [`f32x3_to_rgb9e5`].
pub fn rgb9e5_to_f32x3(packed: u32) -> [f32; 3] {
    let exp = (packed >> 27) as i32;
    let scale = 2f32.powi(exp - RGB9E5_EXP_BIAS - RGB9E5_MANTISSA_BITS);
    [0, 9, 18].map(|shift| ((packed >> shift) & 0x1ff) as f32 * scale)
}

#[cfg(test)]
mod tests {
    use super::{
        f16_to_f32, f32_to_f16, f32_to_ufloat, f32x3_to_rgb9e5, rgb9e5_to_f32x3, ufloat_to_f32,
    };

    #[test]
    fn test_f32_to_f16_simple() {
        let input: f32 = std::f32::consts::PI;
        let output: u16 = f32_to_f16(input);
        assert_eq!(0x4248_u16, output); // 3.141
    }

    #[test]
    fn test_f32_to_f16_one() {
        assert_eq!(f32_to_f16(1.0), 0x3c00);
        assert_eq!(f32_to_f16(-1.0), 0xbc00);
        assert_eq!(f32_to_f16(0.0), 0);
    }

    #[test]
    fn test_f32_to_f16_nan_overflow() {
        // A signaling NaN with unset high bits but a low bit that could get accidentally masked
        // should get converted to a quiet NaN and not infinity.
        let input: f32 = f32::from_bits(0x7F800001_u32);
        assert!(input.is_nan());
        let output: u16 = f32_to_f16(input);
        assert_eq!(0x7E00, output);
    }

    #[test]
    fn test_f32_to_f16_exponent_overflow() {
        assert_eq!(f32_to_f16(1.701412e38), 0x7C00); // +inf
        assert_eq!(f32_to_f16(-1.701412e38), 0xFC00); // -inf
    }

    #[test]
    fn test_f16_to_f32_simple() {
        assert_eq!(f16_to_f32(0x4248), 3.140625);
        assert_eq!(f16_to_f32(0x3c00), 1.0);
    }

    #[test]
    fn ufloat_one_and_zero() {
        assert_eq!(f32_to_ufloat(1.0, 6), 15 << 6);
        assert_eq!(f32_to_ufloat(1.0, 5), 15 << 5);
        assert_eq!(f32_to_ufloat(0.0, 6), 0);
        assert_eq!(f32_to_ufloat(-3.0, 6), 0);
        assert_eq!(ufloat_to_f32(15 << 6, 6), 1.0);
        assert_eq!(ufloat_to_f32(0, 5), 0.0);
    }

    #[test]
    fn ufloat_clamps_large_values() {
        assert_eq!(f32_to_ufloat(1.0e9, 6), (0x1e << 6) | 0x3f);
        assert_eq!(ufloat_to_f32(f32_to_ufloat(0.5, 6), 6), 0.5);
    }

    #[test]
    fn rgb9e5_shares_the_largest_exponent() {
        // 1.0 has exponent 0, so the shared one is 0 + 1 + 15.
        let packed = f32x3_to_rgb9e5([1.0, 0.5, 0.0]);
        assert_eq!(packed, 256 | (128 << 9) | (16 << 27));
        assert_eq!(rgb9e5_to_f32x3(packed), [1.0, 0.5, 0.0]);
        assert_eq!(f32x3_to_rgb9e5([0.0; 3]), 0);
    }

    #[test]
    fn rgb9e5_clamps() {
        assert_eq!(f32x3_to_rgb9e5([-1.0, f32::NAN, 0.0]), 0);
        let max = f32x3_to_rgb9e5([1.0e9, 0.0, 0.0]);
        assert_eq!(max, 0x1ff | (31 << 27));
        assert_eq!(rgb9e5_to_f32x3(max)[0], 65408.0);
    }

    #[test]
    fn rgb9e5_mantissa_carry_bumps_the_exponent() {
        // 511.75 rounds to a 512 mantissa at exponent 24, so it's stored at 25.
        let packed = f32x3_to_rgb9e5([511.75, 0.0, 0.0]);
        assert_eq!(packed >> 27, 25);
        assert_eq!(rgb9e5_to_f32x3(packed)[0], 512.0);
    }
}

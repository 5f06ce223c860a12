// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! DCC fast-clear codes.
//!
//! A DCC fast clear fills the DCC surface with a one-byte code repeated over
//! every compression block. The code tells the hardware what the block
//! decodes to: all zeros, all ones, one of a few mixed patterns, the clear
//! color register, or the color stored in the first texel of the block
//! ("comp-to-single").

use crate::{pack_rgba, ChannelType, ClearColorValue, Format, FormatLayout, GfxLevel};

/// A DCC clear code, repeated in every byte of a 32-bit fill word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DccClearCode(pub u32);

impl DccClearCode {
    pub const CLEAR_0000: Self = Self(0x0000_0000);
    pub const GFX8_CLEAR_0001: Self = Self(0x4040_4040);
    pub const GFX8_CLEAR_1110: Self = Self(0x8080_8080);
    pub const GFX8_CLEAR_1111: Self = Self(0xc0c0_c0c0);
    pub const GFX8_CLEAR_REG: Self = Self(0x2020_2020);
    pub const GFX9_CLEAR_SINGLE: Self = Self(0x1010_1010);
    pub const GFX11_CLEAR_SINGLE: Self = Self(0x0101_0101);
    pub const GFX11_CLEAR_1111_UNORM: Self = Self(0x0202_0202);
    pub const GFX11_CLEAR_1111_FP16: Self = Self(0x0404_0404);
    pub const GFX11_CLEAR_1111_FP32: Self = Self(0x0606_0606);
    pub const GFX11_CLEAR_0001_UNORM: Self = Self(0x0808_0808);
    pub const GFX11_CLEAR_1110_UNORM: Self = Self(0x0a0a_0a0a);
    /// Marks blocks as uncompressed.
    pub const UNCOMPRESSED: Self = Self(0xffff_ffff);

    pub fn byte(self) -> u8 {
        self.0 as u8
    }
}

/// Image properties the DCC code derivation depends on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DccImageInfo {
    /// Format of the view being cleared.
    pub format: Format,
    /// The image is also viewed with the opposite signedness.
    pub sign_reinterpret: bool,
    /// The image can store the clear color in the first texel of a block.
    pub comp_to_single: bool,
}

/// Result of a successful DCC code derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DccFastClear {
    pub code: DccClearCode,
    /// A fast-clear eliminate pass must run before the image is sampled.
    pub needs_eliminate: bool,
}

/// What one DCC byte decodes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DccDecoded {
    /// The block holds plain texel data.
    Uncompressed,
    /// Every texel of the block equals this texel; only the first
    /// `block_size` bytes are meaningful.
    Texel([u8; 16]),
    /// Every texel equals the clear color register.
    ClearRegister,
    /// Every texel equals the first texel of the block.
    SingleFromBlock,
}

/// DCC encoding strategy of a hardware generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DccEncoder {
    Gen8,
    Gen9,
    Gen10,
    Gen11,
}

impl DccEncoder {
    pub fn for_gfx_level(gfx_level: GfxLevel) -> Self {
        match gfx_level {
            GfxLevel::Gfx8 => Self::Gen8,
            GfxLevel::Gfx9 => Self::Gen9,
            GfxLevel::Gfx10 | GfxLevel::Gfx10_3 => Self::Gen10,
            GfxLevel::Gfx11 => Self::Gen11,
        }
    }

    fn gfx_level(self) -> GfxLevel {
        match self {
            Self::Gen8 => GfxLevel::Gfx8,
            Self::Gen9 => GfxLevel::Gfx9,
            Self::Gen10 => GfxLevel::Gfx10,
            Self::Gen11 => GfxLevel::Gfx11,
        }
    }

    /// The comp-to-single code of this generation.
    pub fn single_code(self) -> DccClearCode {
        match self {
            Self::Gen11 => DccClearCode::GFX11_CLEAR_SINGLE,
            _ => DccClearCode::GFX9_CLEAR_SINGLE,
        }
    }

    /// Derives the DCC code that clears `image` to `color`.
    ///
    /// Before GFX11 a code always exists, falling back to the clear color
    /// register (which needs an eliminate pass) or to comp-to-single. On
    /// GFX11 `None` means the color can't be fast cleared with DCC.
    pub fn encode(self, image: &DccImageInfo, color: &ClearColorValue) -> Option<DccFastClear> {
        match self {
            Self::Gen11 => gfx11_code(image, color).map(|code| DccFastClear {
                code,
                needs_eliminate: false,
            }),
            _ => Some(self.gfx8_code(image, color)),
        }
    }

    fn gfx8_code(self, image: &DccImageInfo, color: &ClearColorValue) -> DccFastClear {
        // Comp-to-single clears don't need an eliminate pass.
        let fallback = if image.comp_to_single {
            DccFastClear {
                code: DccClearCode::GFX9_CLEAR_SINGLE,
                needs_eliminate: false,
            }
        } else {
            DccFastClear {
                code: DccClearCode::GFX8_CLEAR_REG,
                needs_eliminate: true,
            }
        };

        let format = image.format;
        let desc = format.desc();
        let Some(extra_channel) = self.extra_channel(format) else {
            return fallback;
        };

        let mut values = [false; 4];
        let mut main_value = false;
        let mut extra_value = false;
        let mut has_color = false;
        let mut has_alpha = false;

        for i in 0..4 {
            let Some(index) = desc.swizzle[i].channel() else {
                continue;
            };
            // Indexed by component rather than by swizzled channel; every
            // format this runs on has equally typed channels.
            let channel = &desc.channels[i];
            match channel.ty {
                ChannelType::Sint => {
                    let max = ((1_i64 << (channel.size - 1)) - 1) as i32;
                    let v = color.as_int32()[i];
                    values[i] = v != 0;
                    if v != 0 && v.min(max) != max {
                        return fallback;
                    }
                }
                ChannelType::Uint => {
                    let max = channel.mask().min(u32::MAX as u128) as u32;
                    let v = color.as_uint32()[i];
                    values[i] = v != 0;
                    if v != 0 && v.min(max) != max {
                        return fallback;
                    }
                }
                _ => {
                    let v = color.as_float32()[i];
                    values[i] = v != 0.0;
                    if v != 0.0 && v != 1.0 {
                        return fallback;
                    }
                }
            }

            if Some(index) == extra_channel {
                extra_value = values[i];
                has_alpha = true;
            } else {
                main_value = values[i];
                has_color = true;
            }
        }

        // If alpha isn't present, make it the same as color, and vice versa.
        if !has_alpha {
            extra_value = main_value;
        } else if !has_color {
            main_value = extra_value;
        }

        for i in 0..4 {
            let Some(index) = desc.swizzle[i].channel() else {
                continue;
            };
            if values[i] != main_value && Some(index) != extra_channel {
                return fallback;
            }
        }

        // Only DCC clear code 0000 is allowed for signed<->unsigned formats.
        if (main_value || extra_value) && image.sign_reinterpret {
            return fallback;
        }

        let code = match (main_value, extra_value) {
            (true, true) => DccClearCode::GFX8_CLEAR_1111,
            (true, false) => DccClearCode::GFX8_CLEAR_1110,
            (false, true) => DccClearCode::GFX8_CLEAR_0001,
            (false, false) => DccClearCode::CLEAR_0000,
        };
        DccFastClear {
            code,
            needs_eliminate: false,
        }
    }

    /// The channel the pre-GFX11 codes treat as alpha.
    ///
    /// The outer `None` means the format can't use the 0/1 codes at all;
    /// `Some(None)` means it has no alpha channel.
    fn extra_channel(self, format: Format) -> Option<Option<usize>> {
        let desc = format.desc();
        match format {
            Format::B10G11R11UfloatPack32
            | Format::R5G6B5UnormPack16
            | Format::B5G6R5UnormPack16 => Some(None),
            _ if desc.layout == FormatLayout::Plain => {
                if format.alpha_is_on_msb(self.gfx_level()) {
                    Some(Some(desc.nr_channels as usize - 1))
                } else {
                    Some(Some(0))
                }
            }
            _ => None,
        }
    }

    /// What a DCC byte written with one of this generation's codes decodes to.
    pub fn decode(self, format: Format, byte: u8) -> DccDecoded {
        let code = DccClearCode(u32::from_ne_bytes([byte; 4]));
        if code == DccClearCode::UNCOMPRESSED {
            return DccDecoded::Uncompressed;
        }
        if code == DccClearCode::CLEAR_0000 {
            return DccDecoded::Texel([0; 16]);
        }
        if code == self.single_code() {
            return DccDecoded::SingleFromBlock;
        }
        match self {
            Self::Gen11 => gfx11_decode(format, code),
            _ => {
                if code == DccClearCode::GFX8_CLEAR_REG {
                    return DccDecoded::ClearRegister;
                }
                let Some(extra_channel) = self.extra_channel(format) else {
                    return DccDecoded::Uncompressed;
                };
                let (main, extra) = match code {
                    DccClearCode::GFX8_CLEAR_1111 => (true, true),
                    DccClearCode::GFX8_CLEAR_1110 => (true, false),
                    DccClearCode::GFX8_CLEAR_0001 => (false, true),
                    _ => return DccDecoded::Uncompressed,
                };
                let mut packed = 0_u128;
                for (c, channel) in format.desc().active_channels().iter().enumerate() {
                    let one = if Some(c) == extra_channel { extra } else { main };
                    if one {
                        packed |= channel.one_bits() << channel.shift;
                    }
                }
                DccDecoded::Texel(packed.to_le_bytes())
            }
        }
    }
}

/// Range of bits covered by the channels the swizzle reads.
fn used_bit_range(format: Format) -> (u32, u32) {
    let desc = format.desc();
    let mut start_bit = u32::MAX;
    let mut end_bit = 0;
    for swizzle in desc.swizzle {
        let Some(c) = swizzle.channel() else {
            continue;
        };
        let channel = &desc.channels[c];
        start_bit = start_bit.min(channel.shift);
        end_bit = end_bit.max(channel.shift + channel.size);
    }
    (start_bit, end_bit)
}

fn gfx11_code(image: &DccImageInfo, color: &ClearColorValue) -> Option<DccClearCode> {
    let format = image.format;
    let desc = format.desc();

    // 8bpp and 16bpp fast DCC clears don't work.
    if desc.block_bits <= 16 {
        return None;
    }

    let ub = pack_rgba(format, color);

    // The exponent bits sit outside the channels, so only zero is a clean
    // pattern.
    if format == Format::E5B9G9R9UfloatPack32 {
        if ub[..4] == [0; 4] {
            return Some(DccClearCode::CLEAR_0000);
        }
        return image.comp_to_single.then_some(DccClearCode::GFX11_CLEAR_SINGLE);
    }

    let (start_bit, end_bit) = used_bit_range(format);
    let us = |i: usize| u16::from_le_bytes([ub[2 * i], ub[2 * i + 1]]);
    let ui = |i: usize| u32::from_le_bytes([ub[4 * i], ub[4 * i + 1], ub[4 * i + 2], ub[4 * i + 3]]);

    // Check the cases where all components or bits are either all 0 or all 1.
    let mut all_bits_are_0 = true;
    let mut all_bits_are_1 = true;
    for i in start_bit..end_bit {
        let bit = ub[(i / 8) as usize] & (1 << (i % 8)) != 0;
        all_bits_are_0 &= !bit;
        all_bits_are_1 &= bit;
    }
    let all_words_are_fp16_1 = start_bit % 16 == 0
        && end_bit % 16 == 0
        && (start_bit / 16..end_bit / 16).all(|i| us(i as usize) == 0x3c00);
    let all_words_are_fp32_1 = start_bit % 32 == 0
        && end_bit % 32 == 0
        && (start_bit / 32..end_bit / 32).all(|i| ui(i as usize) == 0x3f80_0000);

    if all_bits_are_0 {
        return Some(DccClearCode::CLEAR_0000);
    }
    if all_bits_are_1 {
        return Some(DccClearCode::GFX11_CLEAR_1111_UNORM);
    }
    if all_words_are_fp16_1 {
        return Some(DccClearCode::GFX11_CLEAR_1111_FP16);
    }
    if all_words_are_fp32_1 {
        return Some(DccClearCode::GFX11_CLEAR_1111_FP32);
    }

    let first_size = desc.channels[0].size;
    match (desc.nr_channels, first_size) {
        (2, 8) => {
            if ub[0] == 0x00 && ub[1] == 0xff {
                return Some(DccClearCode::GFX11_CLEAR_0001_UNORM);
            } else if ub[0] == 0xff && ub[1] == 0x00 {
                return Some(DccClearCode::GFX11_CLEAR_1110_UNORM);
            }
        }
        (4, 8) => {
            if ub[..4] == [0x00, 0x00, 0x00, 0xff] {
                return Some(DccClearCode::GFX11_CLEAR_0001_UNORM);
            } else if ub[..4] == [0xff, 0xff, 0xff, 0x00] {
                return Some(DccClearCode::GFX11_CLEAR_1110_UNORM);
            }
        }
        (4, 16) => {
            let words = [us(0), us(1), us(2), us(3)];
            if words == [0x0000, 0x0000, 0x0000, 0xffff] {
                return Some(DccClearCode::GFX11_CLEAR_0001_UNORM);
            } else if words == [0xffff, 0xffff, 0xffff, 0x0000] {
                return Some(DccClearCode::GFX11_CLEAR_1110_UNORM);
            }
        }
        _ => {}
    }

    image.comp_to_single.then_some(DccClearCode::GFX11_CLEAR_SINGLE)
}

fn gfx11_decode(format: Format, code: DccClearCode) -> DccDecoded {
    let desc = format.desc();
    let (start_bit, end_bit) = used_bit_range(format);
    if start_bit >= end_bit {
        return DccDecoded::Uncompressed;
    }
    let used = if end_bit - start_bit >= 128 {
        u128::MAX
    } else {
        ((1_u128 << (end_bit - start_bit)) - 1) << start_bit
    };
    let repeat = |word: u128, bits: u32| {
        let mut packed = 0_u128;
        let mut shift = start_bit;
        while shift < end_bit {
            packed |= word << shift;
            shift += bits;
        }
        packed
    };
    let packed = match code {
        DccClearCode::GFX11_CLEAR_1111_UNORM => used,
        DccClearCode::GFX11_CLEAR_1111_FP16 => repeat(0x3c00, 16),
        DccClearCode::GFX11_CLEAR_1111_FP32 => repeat(0x3f80_0000, 32),
        DccClearCode::GFX11_CLEAR_0001_UNORM | DccClearCode::GFX11_CLEAR_1110_UNORM => {
            let zero_one = code == DccClearCode::GFX11_CLEAR_0001_UNORM;
            let (lo, hi) = if zero_one { (0, 1) } else { (1, 0) };
            match (desc.nr_channels, desc.channels[0].size) {
                (2, 8) => lo * 0xff | (hi * 0xff) << 8,
                (4, 8) => lo * 0x00ff_ffff | (hi * 0xff) << 24,
                (4, 16) => lo * 0xffff_ffff_ffff | (hi * 0xffff) << 48,
                _ => return DccDecoded::Uncompressed,
            }
        }
        _ => return DccDecoded::Uncompressed,
    };
    DccDecoded::Texel(packed.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(format: Format) -> DccImageInfo {
        DccImageInfo {
            format,
            sign_reinterpret: false,
            comp_to_single: false,
        }
    }

    const PRE_GFX11: [DccEncoder; 3] = [DccEncoder::Gen8, DccEncoder::Gen9, DccEncoder::Gen10];

    #[test]
    fn gfx8_canonical_colors() {
        let black = ClearColorValue::float32([0.0; 4]);
        let white = ClearColorValue::float32([1.0; 4]);
        let opaque_black = ClearColorValue::float32([0.0, 0.0, 0.0, 1.0]);
        let transparent_white = ClearColorValue::float32([1.0, 1.0, 1.0, 0.0]);
        let cases = [
            (black, DccClearCode::CLEAR_0000),
            (white, DccClearCode::GFX8_CLEAR_1111),
            (opaque_black, DccClearCode::GFX8_CLEAR_0001),
            (transparent_white, DccClearCode::GFX8_CLEAR_1110),
        ];
        for encoder in PRE_GFX11 {
            for format in [
                Format::R8G8B8A8Unorm,
                Format::B8G8R8A8Unorm,
                Format::R16G16B16A16Sfloat,
                Format::R32G32B32A32Sfloat,
                Format::A2B10G10R10UnormPack32,
            ] {
                for (color, code) in cases {
                    let clear = encoder.encode(&info(format), &color).unwrap();
                    assert_eq!(clear.code, code, "{encoder:?} {format:?} {color:?}");
                    assert!(!clear.needs_eliminate);
                }
            }
        }
    }

    #[test]
    fn gfx8_non_binary_colors_use_the_register() {
        let grey = ClearColorValue::float32([0.5, 0.5, 0.5, 1.0]);
        for encoder in PRE_GFX11 {
            let clear = encoder.encode(&info(Format::R8G8B8A8Unorm), &grey).unwrap();
            assert_eq!(clear.code, DccClearCode::GFX8_CLEAR_REG);
            assert!(clear.needs_eliminate);

            let single = DccImageInfo {
                comp_to_single: true,
                ..info(Format::R8G8B8A8Unorm)
            };
            let clear = encoder.encode(&single, &grey).unwrap();
            assert_eq!(clear.code, DccClearCode::GFX9_CLEAR_SINGLE);
            assert!(!clear.needs_eliminate);
        }
    }

    #[test]
    fn shared_exponent_uses_the_register_or_zero() {
        let format = Format::E5B9G9R9UfloatPack32;
        let white = ClearColorValue::float32([1.0; 4]);
        for encoder in PRE_GFX11 {
            let clear = encoder.encode(&info(format), &white).unwrap();
            assert_eq!(clear.code, DccClearCode::GFX8_CLEAR_REG);
            assert!(clear.needs_eliminate);
            assert_eq!(
                encoder.decode(format, clear.code.0 as u8),
                DccDecoded::ClearRegister
            );
        }

        let gfx11 = DccEncoder::Gen11;
        let black = ClearColorValue::float32([0.0; 4]);
        assert_eq!(
            gfx11.encode(&info(format), &black).map(|clear| clear.code),
            Some(DccClearCode::CLEAR_0000)
        );
        assert_eq!(gfx11.encode(&info(format), &white), None);
        let single = DccImageInfo {
            comp_to_single: true,
            ..info(format)
        };
        assert_eq!(
            gfx11.encode(&single, &white).map(|clear| clear.code),
            Some(DccClearCode::GFX11_CLEAR_SINGLE)
        );
    }

    #[test]
    fn gfx8_integer_formats_use_channel_max() {
        let encoder = DccEncoder::Gen9;
        let max = ClearColorValue::uint32([255, 255, 255, 255]);
        let above = ClearColorValue::uint32([1000, 1000, 1000, 1000]);
        let partial = ClearColorValue::uint32([1, 1, 1, 1]);
        let f = info(Format::R8G8B8A8Uint);
        assert_eq!(encoder.encode(&f, &max).unwrap().code, DccClearCode::GFX8_CLEAR_1111);
        assert_eq!(encoder.encode(&f, &above).unwrap().code, DccClearCode::GFX8_CLEAR_1111);
        assert_eq!(encoder.encode(&f, &partial).unwrap().code, DccClearCode::GFX8_CLEAR_REG);

        let f = info(Format::R8G8B8A8Sint);
        let smax = ClearColorValue::int32([127, 127, 127, 0]);
        assert_eq!(encoder.encode(&f, &smax).unwrap().code, DccClearCode::GFX8_CLEAR_1110);
        let negative = ClearColorValue::int32([-1, 0, 0, 0]);
        assert_eq!(encoder.encode(&f, &negative).unwrap().code, DccClearCode::GFX8_CLEAR_REG);
    }

    #[test]
    fn gfx8_mixed_color_channels_fall_back() {
        let red = ClearColorValue::float32([1.0, 0.0, 0.0, 1.0]);
        let clear = DccEncoder::Gen8.encode(&info(Format::R8G8B8A8Unorm), &red).unwrap();
        assert_eq!(clear.code, DccClearCode::GFX8_CLEAR_REG);
    }

    #[test]
    fn gfx8_formats_without_alpha() {
        let white = ClearColorValue::float32([1.0, 1.0, 1.0, 0.0]);
        for format in [Format::R5G6B5UnormPack16, Format::B10G11R11UfloatPack32] {
            let clear = DccEncoder::Gen8.encode(&info(format), &white).unwrap();
            assert_eq!(clear.code, DccClearCode::GFX8_CLEAR_1111, "{format:?}");
        }
    }

    #[test]
    fn sign_reinterpretation_only_allows_zero() {
        let f = DccImageInfo {
            sign_reinterpret: true,
            ..info(Format::R8G8B8A8Unorm)
        };
        let white = ClearColorValue::float32([1.0; 4]);
        let black = ClearColorValue::float32([0.0; 4]);
        for encoder in PRE_GFX11 {
            assert_eq!(encoder.encode(&f, &white).unwrap().code, DccClearCode::GFX8_CLEAR_REG);
            assert_eq!(encoder.encode(&f, &black).unwrap().code, DccClearCode::CLEAR_0000);
        }
    }

    #[test]
    fn gfx11_canonical_colors() {
        let gen = DccEncoder::Gen11;
        let white = ClearColorValue::float32([1.0; 4]);
        let black = ClearColorValue::float32([0.0; 4]);
        let cases = [
            (Format::R8G8B8A8Unorm, DccClearCode::GFX11_CLEAR_1111_UNORM),
            (Format::R16G16B16A16Unorm, DccClearCode::GFX11_CLEAR_1111_UNORM),
            (Format::R16G16B16A16Sfloat, DccClearCode::GFX11_CLEAR_1111_FP16),
            (Format::R32G32B32A32Sfloat, DccClearCode::GFX11_CLEAR_1111_FP32),
            (Format::R32Sfloat, DccClearCode::GFX11_CLEAR_1111_FP32),
        ];
        for (format, code) in cases {
            let clear = gen.encode(&info(format), &white).unwrap();
            assert_eq!(clear.code, code, "{format:?}");
            assert!(!clear.needs_eliminate);
            assert_eq!(
                gen.encode(&info(format), &black).unwrap().code,
                DccClearCode::CLEAR_0000
            );
        }
    }

    #[test]
    fn gfx11_mixed_patterns() {
        let gen = DccEncoder::Gen11;
        let opaque_black = ClearColorValue::float32([0.0, 0.0, 0.0, 1.0]);
        let transparent_white = ClearColorValue::float32([1.0, 1.0, 1.0, 0.0]);
        for format in [Format::R8G8B8A8Unorm, Format::R16G16B16A16Unorm] {
            assert_eq!(
                gen.encode(&info(format), &opaque_black).unwrap().code,
                DccClearCode::GFX11_CLEAR_0001_UNORM
            );
            assert_eq!(
                gen.encode(&info(format), &transparent_white).unwrap().code,
                DccClearCode::GFX11_CLEAR_1110_UNORM
            );
        }
    }

    #[test]
    fn gfx11_rejects_small_formats_and_unrepresentable_colors() {
        let gen = DccEncoder::Gen11;
        let white = ClearColorValue::float32([1.0; 4]);
        assert!(gen.encode(&info(Format::R8G8Unorm), &white).is_none());
        assert!(gen.encode(&info(Format::R5G6B5UnormPack16), &white).is_none());

        let grey = ClearColorValue::float32([0.5, 0.5, 0.5, 1.0]);
        assert!(gen.encode(&info(Format::R8G8B8A8Unorm), &grey).is_none());
        let single = DccImageInfo {
            comp_to_single: true,
            ..info(Format::R8G8B8A8Unorm)
        };
        let clear = gen.encode(&single, &grey).unwrap();
        assert_eq!(clear.code, DccClearCode::GFX11_CLEAR_SINGLE);
    }

    #[test]
    fn non_binary_colors_never_get_a_pattern_code() {
        let colors = [
            ClearColorValue::float32([0.25, 0.0, 0.0, 0.0]),
            ClearColorValue::float32([1.0, 1.0, 1.0, 0.75]),
            ClearColorValue::float32([2.0, 2.0, 2.0, 2.0]),
        ];
        let pattern_codes = [
            DccClearCode::CLEAR_0000,
            DccClearCode::GFX8_CLEAR_0001,
            DccClearCode::GFX8_CLEAR_1110,
            DccClearCode::GFX8_CLEAR_1111,
        ];
        for encoder in PRE_GFX11 {
            for color in colors {
                let clear = encoder.encode(&info(Format::R32G32B32A32Sfloat), &color).unwrap();
                assert!(!pattern_codes.contains(&clear.code), "{encoder:?} {color:?}");
            }
        }
    }

    #[test]
    fn decoded_codes_match_packed_colors() {
        let colors = [
            ClearColorValue::float32([0.0; 4]),
            ClearColorValue::float32([1.0; 4]),
            ClearColorValue::float32([0.0, 0.0, 0.0, 1.0]),
            ClearColorValue::float32([1.0, 1.0, 1.0, 0.0]),
        ];
        let formats = [
            Format::R8G8B8A8Unorm,
            Format::B8G8R8A8Unorm,
            Format::R16G16B16A16Unorm,
            Format::R16G16B16A16Sfloat,
            Format::R32G32B32A32Sfloat,
        ];
        for encoder in [DccEncoder::Gen8, DccEncoder::Gen10, DccEncoder::Gen11] {
            for format in formats {
                for color in colors {
                    let Some(clear) = encoder.encode(&info(format), &color) else {
                        continue;
                    };
                    let size = format.block_size() as usize;
                    match encoder.decode(format, clear.code.byte()) {
                        DccDecoded::Texel(texel) => assert_eq!(
                            texel[..size],
                            pack_rgba(format, &color)[..size],
                            "{encoder:?} {format:?} {color:?}"
                        ),
                        other => panic!("{encoder:?} {format:?} {color:?} decoded to {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn single_and_register_codes_decode() {
        assert_eq!(
            DccEncoder::Gen10.decode(Format::R8G8B8A8Unorm, 0x10),
            DccDecoded::SingleFromBlock
        );
        assert_eq!(
            DccEncoder::Gen11.decode(Format::R8G8B8A8Unorm, 0x01),
            DccDecoded::SingleFromBlock
        );
        assert_eq!(
            DccEncoder::Gen9.decode(Format::R8G8B8A8Unorm, 0x20),
            DccDecoded::ClearRegister
        );
        assert_eq!(
            DccEncoder::Gen9.decode(Format::R8G8B8A8Unorm, 0xff),
            DccDecoded::Uncompressed
        );
    }
}

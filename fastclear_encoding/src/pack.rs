// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packing clear colors into texel and register bit patterns.

use crate::{
    f16_to_f32, f32_to_f16, f32_to_ufloat, f32x3_to_rgb9e5, rgb9e5_to_f32x3, ufloat_to_f32,
    Channel, ChannelType, ClearColorValue, Format, FormatLayout,
};

/// Packs `value` into one texel of `format`, the way a shader export or an
/// image store would write it.
///
/// The texel occupies the first [`Format::block_size`] bytes of the result;
/// the remaining bytes are zero.
pub fn pack_rgba(format: Format, value: &ClearColorValue) -> [u8; 16] {
    if format == Format::E5B9G9R9UfloatPack32 {
        let [r, g, b, _] = value.as_float32();
        return (f32x3_to_rgb9e5([r, g, b]) as u128).to_le_bytes();
    }
    let desc = format.desc();
    let mut packed = 0_u128;
    for (c, channel) in desc.active_channels().iter().enumerate() {
        let Some(component) = desc.swizzle.iter().position(|s| s.channel() == Some(c)) else {
            continue;
        };
        let bits = pack_channel(channel, value, component) & channel.mask();
        packed |= bits << channel.shift;
    }
    packed.to_le_bytes()
}

fn pack_channel(channel: &Channel, value: &ClearColorValue, component: usize) -> u128 {
    let f = value.as_float32()[component];
    match channel.ty {
        ChannelType::Void => 0,
        ChannelType::Unorm => {
            let max = channel.mask() as f32;
            if f.is_nan() || f <= 0.0 {
                0
            } else if f >= 1.0 {
                channel.mask()
            } else {
                (f * max).round_ties_even() as u128
            }
        }
        ChannelType::Snorm => {
            let max = channel.one_bits() as f32;
            let f = if f.is_nan() { 0.0 } else { f.clamp(-1.0, 1.0) };
            (f * max).round_ties_even() as i64 as u128
        }
        ChannelType::Uint => {
            let max = channel.mask().min(u32::MAX as u128) as u32;
            value.as_uint32()[component].min(max) as u128
        }
        ChannelType::Sint => {
            let max = channel.one_bits() as i64;
            let min = -max - 1;
            (value.as_int32()[component] as i64).clamp(min, max) as u128
        }
        ChannelType::Float => match channel.size {
            32 => f.to_bits() as u128,
            16 => f32_to_f16(f) as u128,
            _ => unreachable!("unsupported float channel size {}", channel.size),
        },
        ChannelType::UFloat => f32_to_ufloat(f, channel.size - 5) as u128,
    }
}

/// Reads one texel of `format` back into a clear value.
///
/// Normalized and float channels come back as floats, integer channels as
/// integers. Components the format doesn't store read as 0, or as 1 for
/// alpha.
pub fn unpack_rgba(format: Format, texel: &[u8]) -> ClearColorValue {
    let desc = format.desc();
    let mut bytes = [0_u8; 16];
    let len = texel.len().min(16);
    bytes[..len].copy_from_slice(&texel[..len]);
    let packed = u128::from_le_bytes(bytes);

    if format == Format::E5B9G9R9UfloatPack32 {
        let [r, g, b] = rgb9e5_to_f32x3(packed as u32);
        return ClearColorValue::float32([r, g, b, 1.0]);
    }

    let mut out = [0_u32; 4];
    for (component, swizzle) in desc.swizzle.iter().enumerate() {
        let Some(c) = swizzle.channel() else {
            let integer = desc
                .active_channels()
                .first()
                .is_some_and(|ch| ch.ty.is_pure_integer());
            out[component] = match (swizzle, integer) {
                (crate::Swizzle::One, true) => 1,
                (crate::Swizzle::One, false) => 1.0_f32.to_bits(),
                _ => 0,
            };
            continue;
        };
        let channel = &desc.channels[c];
        let raw = (packed >> channel.shift) & channel.mask();
        out[component] = match channel.ty {
            ChannelType::Void => 0,
            ChannelType::Unorm => (raw as f32 / channel.mask() as f32).to_bits(),
            ChannelType::Snorm => {
                let signed = sign_extend(raw, channel.size);
                (signed as f32 / channel.one_bits() as f32)
                    .max(-1.0)
                    .to_bits()
            }
            ChannelType::Uint => raw as u32,
            ChannelType::Sint => sign_extend(raw, channel.size) as i32 as u32,
            ChannelType::Float => match channel.size {
                32 => raw as u32,
                16 => f16_to_f32(raw as u16).to_bits(),
                _ => unreachable!("unsupported float channel size {}", channel.size),
            },
            ChannelType::UFloat => ufloat_to_f32(raw as u32, channel.size - 5).to_bits(),
        };
    }
    ClearColorValue::uint32(out)
}

fn sign_extend(raw: u128, size: u32) -> i64 {
    let shift = 64 - size;
    ((raw as u64) << shift) as i64 >> shift
}

/// Packs a clear color into the two 32-bit words of the clear color register.
///
/// Returns `None` for formats the register can't represent: non-plain
/// layouts, block sizes that aren't a power of two, and 128-bit formats
/// whose red, green and blue components differ.
pub fn pack_clear_color(format: Format, value: &ClearColorValue) -> Option<[u32; 2]> {
    let desc = format.desc();

    if format == Format::B10G11R11UfloatPack32 {
        let [r, g, b, _] = value.as_float32();
        let packed = f32_to_ufloat(r, 6) | (f32_to_ufloat(g, 6) << 11) | (f32_to_ufloat(b, 5) << 22);
        return Some([packed, 0]);
    }

    if format == Format::E5B9G9R9UfloatPack32 {
        let [r, g, b, _] = value.as_float32();
        return Some([f32x3_to_rgb9e5([r, g, b]), 0]);
    }

    if desc.layout != FormatLayout::Plain {
        log::warn!("failed to fast clear for non-plain format {format:?}");
        return None;
    }

    if !desc.block_bits.is_power_of_two() {
        log::warn!("failed to fast clear for NPOT format {format:?}");
        return None;
    }

    if desc.block_bits > 64 {
        // Every channel of a 128-bit format is 32 bits wide and alpha comes
        // last, so only the red, green and blue words need to agree.
        let words = value.as_uint32();
        if words[1] != words[0] || words[2] != words[0] {
            return None;
        }
        return Some([words[0], words[3]]);
    }

    let mut clear_val = 0_u64;
    for (component, swizzle) in desc.swizzle.iter().enumerate() {
        let Some(c) = swizzle.channel() else {
            continue;
        };
        let channel = &desc.channels[c];
        let mask = channel.mask() as u64;

        let v = if channel.ty.is_pure_integer() {
            value.as_uint32()[component] as u64 & mask
        } else if channel.ty.is_normalized() {
            let mut f = value.as_float32()[component].min(1.0);
            if channel.ty == ChannelType::Unorm {
                f = f.max(0.0) * mask as f32;
            } else {
                f = f.max(-1.0) * channel.one_bits() as f32;
            }
            // The hardware rounds before conversion.
            if f > 0.0 {
                f += 0.5;
            } else {
                f -= 0.5;
            }
            f as i64 as u64
        } else if channel.ty == ChannelType::Float {
            let f = value.as_float32()[component];
            match channel.size {
                32 => f.to_bits() as u64,
                16 => f32_to_f16(f) as u64,
                _ => {
                    log::warn!("failed to fast clear for unhandled float size in format {format:?}");
                    return None;
                }
            }
        } else {
            log::warn!("failed to fast clear for unhandled component type in format {format:?}");
            return None;
        };
        clear_val |= (v & mask) << channel.shift;
    }

    Some([clear_val as u32, (clear_val >> 32) as u32])
}

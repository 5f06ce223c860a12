// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterization of the clear rectangle.
//!
//! The clear draws cover the scissor rectangle exactly, so rasterizing them
//! reduces to filling that rectangle on every layer the draw instances
//! select.

use std::ops::Range;

use fastclear_encoding::{pack_rgba, Channel, ChannelType, ClearColorValue};

use super::CpuImage;

/// A pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ClearRect {
    fn pixels(self, image: &CpuImage<'_>) -> impl Iterator<Item = (u32, u32)> {
        let x_end = (self.x + self.width).min(image.width);
        let y_end = (self.y + self.height).min(image.height);
        let x0 = self.x;
        (self.y..y_end).flat_map(move |y| (x0..x_end).map(move |x| (x, y)))
    }
}

/// Writes `color` to every sample of `rect` on `layers`.
pub fn fill_color_rect(
    image: &CpuImage<'_>,
    rect: ClearRect,
    layers: Range<u32>,
    color: &ClearColorValue,
) {
    let texel = pack_rgba(image.format, color);
    for layer in layers {
        for (x, y) in rect.pixels(image) {
            for sample in 0..image.samples {
                image.write(x, y, layer, sample, &texel);
            }
        }
    }
}

fn encode_depth(channel: &Channel, depth: f32) -> u128 {
    match channel.ty {
        ChannelType::Float => depth.to_bits() as u128,
        _ => {
            let max = channel.mask() as f64;
            (depth.clamp(0.0, 1.0) as f64 * max).round() as u128
        }
    }
}

/// Writes the depth and/or stencil of every sample of `rect` on `layers`.
///
/// Aspects passed as `None` keep their current value.
pub fn fill_depth_stencil_rect(
    image: &CpuImage<'_>,
    rect: ClearRect,
    layers: Range<u32>,
    depth: Option<f32>,
    stencil: Option<u8>,
) {
    let (depth_channel, stencil_channel) = image.format.depth_stencil_channels();
    let mut mask = 0_u128;
    let mut value = 0_u128;
    if let (Some(channel), Some(depth)) = (depth_channel, depth) {
        mask |= channel.mask() << channel.shift;
        value |= encode_depth(&channel, depth) << channel.shift;
    }
    if let (Some(channel), Some(stencil)) = (stencil_channel, stencil) {
        mask |= channel.mask() << channel.shift;
        value |= (stencil as u128) << channel.shift;
    }
    if mask == 0 {
        return;
    }
    for layer in layers {
        for (x, y) in rect.pixels(image) {
            for sample in 0..image.samples {
                let old = u128::from_le_bytes(image.read(x, y, layer, sample));
                let new = (old & !mask) | value;
                image.write(x, y, layer, sample, &new.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use fastclear_encoding::{ClearColorValue, Format};

    use super::{fill_color_rect, fill_depth_stencil_rect, ClearRect};
    use crate::cpu::CpuImage;

    #[test]
    fn color_rect_is_clipped() {
        let data = RefCell::new(vec![0_u8; 4 * 4 * 2]);
        let image = CpuImage {
            data: &data,
            offset: 0,
            width: 4,
            height: 4,
            layers: 1,
            samples: 1,
            format: Format::R16Uint,
        };
        let rect = ClearRect {
            x: 2,
            y: 1,
            width: 8,
            height: 2,
        };
        fill_color_rect(&image, rect, 0..1, &ClearColorValue::uint32([0x1234, 0, 0, 0]));
        for y in 0..4 {
            for x in 0..4 {
                let inside = x >= 2 && (1..3).contains(&y);
                let expected = if inside { [0x34, 0x12] } else { [0, 0] };
                assert_eq!(image.read(x, y, 0, 0)[..2], expected);
            }
        }
    }

    #[test]
    fn stencil_only_keeps_depth() {
        let data = RefCell::new(vec![0_u8; 2 * 2 * 2 * 8]);
        let image = CpuImage {
            data: &data,
            offset: 0,
            width: 2,
            height: 2,
            layers: 1,
            samples: 2,
            format: Format::D32SfloatS8Uint,
        };
        let all = ClearRect {
            x: 0,
            y: 0,
            width: 2,
            height: 2,
        };
        fill_depth_stencil_rect(&image, all, 0..1, Some(0.5), Some(1));
        fill_depth_stencil_rect(&image, all, 0..1, None, Some(5));
        let texel = image.read(1, 1, 0, 1);
        assert_eq!(texel[..4], 0.5_f32.to_bits().to_le_bytes());
        assert_eq!(texel[4], 5);
    }

    #[test]
    fn unorm_depth_is_rounded() {
        let data = RefCell::new(vec![0_u8; 2]);
        let image = CpuImage {
            data: &data,
            offset: 0,
            width: 1,
            height: 1,
            layers: 1,
            samples: 1,
            format: Format::D16Unorm,
        };
        let rect = ClearRect {
            x: 0,
            y: 0,
            width: 1,
            height: 1,
        };
        fill_depth_stencil_rect(&image, rect, 0..1, Some(1.0), None);
        assert_eq!(image.read(0, 0, 0, 0)[..2], [0xff, 0xff]);
        fill_depth_stencil_rect(&image, rect, 0..1, Some(0.5), None);
        assert_eq!(image.read(0, 0, 0, 0)[..2], 0x8000_u16.to_le_bytes());
    }
}

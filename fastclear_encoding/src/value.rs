// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use bytemuck::{Pod, Zeroable};

bitflags::bitflags! {
    /// Aspects of an image touched by a clear.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct AspectFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

/// A clear color.
///
/// The same 16 bytes are read as floats, signed or unsigned integers
/// depending on the format being cleared, so the value is stored as raw bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct ClearColorValue {
    bits: [u32; 4],
}

impl ClearColorValue {
    pub const ZERO: Self = Self { bits: [0; 4] };

    pub fn float32(v: [f32; 4]) -> Self {
        Self {
            bits: v.map(f32::to_bits),
        }
    }

    pub fn uint32(v: [u32; 4]) -> Self {
        Self { bits: v }
    }

    pub fn int32(v: [i32; 4]) -> Self {
        Self {
            bits: v.map(|x| x as u32),
        }
    }

    pub fn as_float32(&self) -> [f32; 4] {
        self.bits.map(f32::from_bits)
    }

    pub fn as_uint32(&self) -> [u32; 4] {
        self.bits
    }

    pub fn as_int32(&self) -> [i32; 4] {
        self.bits.map(|x| x as i32)
    }
}

/// A depth/stencil clear value.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClearDepthStencilValue {
    pub depth: f32,
    pub stencil: u32,
}

impl ClearDepthStencilValue {
    pub fn new(depth: f32, stencil: u32) -> Self {
        Self { depth, stencil }
    }
}

#[cfg(test)]
mod tests {
    use super::ClearColorValue;

    #[test]
    fn views_share_bits() {
        let v = ClearColorValue::float32([1.0, 0.0, -0.0, 0.5]);
        assert_eq!(v.as_uint32(), [0x3f80_0000, 0, 0x8000_0000, 0x3f00_0000]);
        let v = ClearColorValue::int32([-1, 0, 1, i32::MIN]);
        assert_eq!(v.as_uint32(), [u32::MAX, 0, 1, 0x8000_0000]);
        assert_eq!(v.as_int32(), [-1, 0, 1, i32::MIN]);
    }
}

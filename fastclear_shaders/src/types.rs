// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types shared between the shader descriptions and the code recording them.

use bytemuck::{Pod, Zeroable};

/// The type of resource bound to a slot of a clear kernel.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BindType {
    /// A storage buffer with read/write access.
    StorageBuffer,
    /// A storage image with write access.
    StorageImage,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

bitflags::bitflags! {
    /// Stages a push constant range is visible to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
    }
}

impl From<ShaderStage> for ShaderStages {
    fn from(stage: ShaderStage) -> Self {
        match stage {
            ShaderStage::Vertex => Self::VERTEX,
            ShaderStage::Fragment => Self::FRAGMENT,
            ShaderStage::Compute => Self::COMPUTE,
        }
    }
}

/// Push constants of the color clear fragment shader.
#[derive(Copy, Clone, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct ColorClearPush {
    /// Raw bits of the clear color.
    pub color: [u32; 4],
}

/// Push constants of the depth clear shaders.
#[derive(Copy, Clone, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct DepthClearPush {
    pub depth: f32,
}

/// Push constants of the HTILE mask kernel.
#[derive(Copy, Clone, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct HtileMaskPush {
    /// The new HTILE word, already masked.
    pub value: u32,
    /// Bits of the old word to keep.
    pub inverse_mask: u32,
}

impl HtileMaskPush {
    pub fn new(value: u32, mask: u32) -> Self {
        Self {
            value: value & mask,
            inverse_mask: !mask,
        }
    }
}

/// Push constants of the DCC comp-to-single kernel.
#[derive(Copy, Clone, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct CompToSinglePush {
    /// DCC block width in texels.
    pub block_width: u32,
    /// DCC block height in texels.
    pub block_height: u32,
    /// Texel value, as the storage format's unsigned components.
    pub color: [u32; 4],
}

/// Push constants of the compute image clear kernel.
#[derive(Copy, Clone, Debug, Default, Zeroable, Pod)]
#[repr(C)]
pub struct ClearImagePush {
    pub color: [u32; 4],
    /// Layer (or depth slice) to clear.
    pub slice: u32,
}

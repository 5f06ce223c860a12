// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Metadata describing the small shaders used by GPU clears.
//!
//! Clears never need arbitrary shader code. Every shader they use is one of a
//! handful of fixed shapes ([`ShaderShape`]): a rectangle vertex stage, a
//! fragment stage exporting a push-constant color or depth, and three compute
//! kernels. A pipeline backend turns a shape into a compiled shader; this
//! crate only describes the shapes, their resource bindings and the layout of
//! their push constants.
//!
//! With the `cpu` feature, the [`cpu`] module provides reference
//! implementations of every kernel that operate on byte memory.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    missing_debug_implementations,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod types;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use types::{
    BindType, ClearImagePush, ColorClearPush, CompToSinglePush, DepthClearPush, HtileMaskPush,
    ShaderStage, ShaderStages,
};

/// Invocations per workgroup of the HTILE mask kernel.
pub const HTILE_MASK_WG_SIZE: u32 = 64;
/// Bytes of HTILE each invocation of the mask kernel covers.
pub const HTILE_MASK_BYTES_PER_INVOCATION: u64 = 16;
/// Workgroup size of the 2D image kernels.
pub const IMAGE_WG_SIZE: [u32; 3] = [8, 8, 1];

/// One of the fixed shader shapes used by clears.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderShape {
    /// Emits a rectangle covering the viewport, on the layer given by the
    /// instance index plus the base instance.
    ///
    /// When `depth_from_push_constant` is set, the vertex `z` is read from a
    /// 4 byte vertex push constant; otherwise it is 0 and the depth comes
    /// from the fragment stage.
    RectVertices { depth_from_push_constant: bool },
    /// Writes the 16 byte push-constant color to color output `location`.
    ColorOutput { location: u32 },
    /// Writes the 4 byte push-constant depth to the depth output.
    DepthOutput,
    /// Masked read-modify-write over an HTILE buffer.
    ///
    /// Each invocation loads 16 bytes and stores `(old & inverse_mask) | value`.
    HtileMask,
    /// Stores the push-constant color into the first texel of every DCC
    /// block of a storage image.
    DccCompToSingle { msaa: bool },
    /// Stores the push-constant color into every texel of one layer of a
    /// storage image.
    ClearImage,
}

/// Description of one compiled clear shader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClearShader {
    pub name: &'static str,
    pub stage: ShaderStage,
    pub shape: ShaderShape,
    pub workgroup_size: [u32; 3],
    /// Size in bytes of the push constant range the shader reads.
    pub push_constant_size: u32,
    pub bindings: &'static [BindType],
}

impl ShaderShape {
    pub fn stage(self) -> ShaderStage {
        match self {
            Self::RectVertices { .. } => ShaderStage::Vertex,
            Self::ColorOutput { .. } | Self::DepthOutput => ShaderStage::Fragment,
            Self::HtileMask | Self::DccCompToSingle { .. } | Self::ClearImage => {
                ShaderStage::Compute
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RectVertices {
                depth_from_push_constant: true,
            } => "meta_clear_depth_vs",
            Self::RectVertices {
                depth_from_push_constant: false,
            } => "meta_clear_rect_vs",
            Self::ColorOutput { .. } => "meta_clear_color_fs",
            Self::DepthOutput => "meta_clear_depth_fs",
            Self::HtileMask => "meta_clear_htile_mask",
            Self::DccCompToSingle { msaa: false } => "meta_clear_dcc_comp_to_single",
            Self::DccCompToSingle { msaa: true } => "meta_clear_dcc_comp_to_single_ms",
            Self::ClearImage => "meta_cleari",
        }
    }

    /// Size in bytes of the push constant range the shader reads.
    pub fn push_constant_size(self) -> u32 {
        let size = match self {
            Self::RectVertices {
                depth_from_push_constant: false,
            } => 0,
            Self::RectVertices {
                depth_from_push_constant: true,
            }
            | Self::DepthOutput => size_of::<DepthClearPush>(),
            Self::ColorOutput { .. } => size_of::<ColorClearPush>(),
            Self::HtileMask => size_of::<HtileMaskPush>(),
            Self::DccCompToSingle { .. } => size_of::<CompToSinglePush>(),
            Self::ClearImage => size_of::<ClearImagePush>(),
        };
        size as u32
    }

    /// The shader this shape describes.
    pub fn shader(self) -> ClearShader {
        const NONE: &[BindType] = &[];
        const BUFFER: &[BindType] = &[BindType::StorageBuffer];
        const IMAGE: &[BindType] = &[BindType::StorageImage];
        let (workgroup_size, bindings) = match self {
            Self::RectVertices { .. } | Self::ColorOutput { .. } | Self::DepthOutput => {
                ([0; 3], NONE)
            }
            Self::HtileMask => ([HTILE_MASK_WG_SIZE, 1, 1], BUFFER),
            Self::DccCompToSingle { .. } | Self::ClearImage => (IMAGE_WG_SIZE, IMAGE),
        };
        ClearShader {
            name: self.name(),
            stage: self.stage(),
            shape: self,
            workgroup_size,
            push_constant_size: self.push_constant_size(),
            bindings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_constant_sizes() {
        assert_eq!(ShaderShape::ColorOutput { location: 3 }.shader().push_constant_size, 16);
        assert_eq!(ShaderShape::DepthOutput.shader().push_constant_size, 4);
        assert_eq!(ShaderShape::HtileMask.shader().push_constant_size, 8);
        assert_eq!(
            ShaderShape::DccCompToSingle { msaa: false }
                .shader()
                .push_constant_size,
            24
        );
        assert_eq!(ShaderShape::ClearImage.shader().push_constant_size, 20);
        assert_eq!(
            ShaderShape::RectVertices {
                depth_from_push_constant: false
            }
            .shader()
            .push_constant_size,
            0
        );
    }

    #[test]
    fn compute_shapes_bind_one_resource() {
        for shape in [
            ShaderShape::HtileMask,
            ShaderShape::DccCompToSingle { msaa: true },
            ShaderShape::ClearImage,
        ] {
            let shader = shape.shader();
            assert_eq!(shader.stage, ShaderStage::Compute);
            assert_eq!(shader.bindings.len(), 1);
            assert!(shader.workgroup_size.iter().all(|&n| n > 0));
        }
        assert_eq!(ShaderShape::HtileMask.shader().workgroup_size, [64, 1, 1]);
    }
}

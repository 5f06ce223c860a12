// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fastclear records clears of GPU color and depth/stencil surfaces, taking
//! the fast path whenever the surface's compression metadata allows it.
//!
//! A fast clear never writes texels. It rewrites the HTILE, DCC or CMASK
//! metadata next to them so that every tile decodes to the clear value,
//! which is a small fraction of the memory traffic of drawing over the
//! whole surface. Whether that is legal depends on the image, its layout,
//! the clear rectangle and the clear value itself; when it isn't, the clear
//! is drawn (or, for images that can't be rendered to, written with a
//! compute shader).
//!
//! Clears are recorded into a [`CommandBuffer`] as a flat list of
//! [`Command`]s. Pipelines come from a [`PipelineCompiler`] and are cached
//! per [`Device`]. The [`reference`] module executes recordings on the CPU,
//! decoding compressed metadata the way the hardware samples it.
//!
//! ```
//! use std::sync::Arc;
//! use fastclear::{
//!     ClearColorValue, Device, DeviceOptions, Format, ImageCreateInfo, ImageLayout,
//!     QueueFamily, ReferenceCompiler, SubresourceRange,
//! };
//!
//! let device = Device::new(Arc::new(ReferenceCompiler::new()), DeviceOptions::default())?;
//! let image = device.create_image(ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 256, 256));
//! let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
//! cmd.init_image_metadata(&image);
//! cmd.clear_color_image(
//!     &image,
//!     ImageLayout::TransferDstOptimal,
//!     &ClearColorValue::float32([1.0; 4]),
//!     &[SubresourceRange::whole(&image, fastclear::AspectFlags::COLOR)],
//! );
//! let recording = cmd.finish()?;
//! // The clear only filled metadata.
//! assert_eq!(recording.draw_count(), 0);
//! # Ok::<(), fastclear::Error>(())
//! ```

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
#![allow(
    missing_docs,
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    clippy::shadow_unrelated,
    reason = "Deferred"
)]

mod clear;
mod cmd_buffer;
mod device;
mod eligibility;
mod fast_clear;
mod flush;
mod image;
mod layout;
mod pipeline_cache;
mod recording;
mod slow_clear;
mod surface;

pub mod reference;

use thiserror::Error;

pub use fastclear_encoding::{
    AspectFlags, ClearColorValue, ClearDepthStencilValue, Format, GfxLevel, HtileLayout,
};

pub use clear::{ClearAttachment, ClearRect, ClearValue};
pub use cmd_buffer::{
    CommandBuffer, InheritanceInfo, LoadOp, RenderingAttachment, RenderingInfo,
};
pub use device::{Device, DeviceOptions};
pub use flush::{AccessFlags, FlushBits};
pub use image::{
    ClearStorage, ClearTracking, Extent3d, Image, ImageCreateInfo, ImageType, ImageUsage,
    ImageView, LevelLayout, SubresourceRange,
};
pub use layout::{
    layout_can_fast_clear, layout_dcc_compressed, layout_is_htile_compressed,
    queue_family_mask, ImageLayout, QueueFamily, QueueMask, SharingMode,
};
pub use pipeline_cache::{
    ClearPipelineCache, CompareOp, ComputePipelineDesc, DepthStencilState,
    GraphicsPipelineDesc, PipelineCompiler, PipelineDesc, PipelineKey, StencilOp,
};
pub use recording::{
    BufferRange, Command, Descriptor, DispatchSize, FillPath, PipelineBindPoint, PipelineHandle,
    Recording, Rect2D, RenderTargets, ResourceId, Viewport,
};
pub use reference::{ReferenceCompiler, ReferenceEngine};
pub use surface::{MetaLevel, MetaSurface, MetaUnit, META_TILE_SIZE};

/// Errors that can occur while recording clears.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("out of host memory")]
    OutOfHostMemory,
    #[error("out of device memory")]
    OutOfDeviceMemory,
    /// The pipeline compiler rejected a clear pipeline.
    #[error("Failed to create pipeline '{label}': {reason}")]
    PipelineCreation { label: String, reason: String },
    /// A recording referenced a pipeline the engine doesn't know.
    #[error("Unknown pipeline handle")]
    UnknownPipeline,
    /// A recording used a resource whose memory isn't bound.
    #[error("Resource {0:?} is not available but used by a recording")]
    UnavailableBuffer(ResourceId),
}

pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

static_assertions::assert_impl_all!(Device: Send, Sync);
static_assertions::assert_impl_all!(ClearPipelineCache: Send, Sync);
static_assertions::assert_impl_all!(Image: Send, Sync);

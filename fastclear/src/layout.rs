// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Which image layouts keep compressed metadata valid.
//!
//! A fast clear only writes metadata, so it is legal only in layouts where
//! every later consumer on the queues sharing the image reads through that
//! metadata.

use fastclear_encoding::GfxLevel;

use crate::{Image, ImageUsage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageLayout {
    Undefined,
    General,
    ColorAttachmentOptimal,
    DepthStencilAttachmentOptimal,
    DepthStencilReadOnlyOptimal,
    DepthAttachmentStencilReadOnlyOptimal,
    DepthReadOnlyStencilAttachmentOptimal,
    DepthAttachmentOptimal,
    DepthReadOnlyOptimal,
    StencilAttachmentOptimal,
    StencilReadOnlyOptimal,
    AttachmentOptimal,
    ReadOnlyOptimal,
    ShaderReadOnlyOptimal,
    TransferSrcOptimal,
    TransferDstOptimal,
    PresentSrc,
}

/// Kind of queue a command buffer is recorded for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QueueFamily {
    Graphics,
    Compute,
    Transfer,
}

bitflags::bitflags! {
    /// Set of queue families that may access an image.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct QueueMask: u32 {
        const GRAPHICS = 1 << 0;
        const COMPUTE = 1 << 1;
        const TRANSFER = 1 << 2;
    }
}

impl From<QueueFamily> for QueueMask {
    fn from(family: QueueFamily) -> Self {
        match family {
            QueueFamily::Graphics => Self::GRAPHICS,
            QueueFamily::Compute => Self::COMPUTE,
            QueueFamily::Transfer => Self::TRANSFER,
        }
    }
}

/// How queue families share an image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SharingMode {
    /// Owned by one queue family at a time.
    #[default]
    Exclusive,
    /// Accessed by the given families without ownership transfers.
    Concurrent(QueueMask),
}

/// Queue families that may access `image` while it is used on `family`.
pub fn queue_family_mask(image: &Image, family: QueueFamily) -> QueueMask {
    match image.info().sharing {
        SharingMode::Exclusive => family.into(),
        SharingMode::Concurrent(mask) => mask | family.into(),
    }
}

/// Whether HTILE is compressed in `layout`.
pub fn layout_is_htile_compressed(image: &Image, layout: ImageLayout, queues: QueueMask) -> bool {
    if !image.has_htile() {
        return false;
    }
    let graphics_only = queues == QueueMask::GRAPHICS;
    match layout {
        ImageLayout::Undefined | ImageLayout::PresentSrc => false,
        ImageLayout::General => {
            image.is_tc_compatible_htile()
                && graphics_only
                && !image.info().usage.contains(ImageUsage::STORAGE)
        }
        ImageLayout::TransferSrcOptimal | ImageLayout::TransferDstOptimal => graphics_only,
        _ => image.is_tc_compatible_htile() || graphics_only,
    }
}

/// Whether DCC of `level` is compressed in `layout`.
pub fn layout_dcc_compressed(
    image: &Image,
    level: u32,
    layout: ImageLayout,
    queues: QueueMask,
) -> bool {
    if !image.dcc_enabled(level) {
        return false;
    }
    if layout == ImageLayout::Undefined {
        return false;
    }
    // Before GFX10, compute and transfer writes can't keep DCC compressed.
    if image.gfx_level() < GfxLevel::Gfx10 && queues != QueueMask::GRAPHICS {
        return false;
    }
    if layout == ImageLayout::General && image.gfx_level() < GfxLevel::Gfx10 {
        return !image.info().usage.contains(ImageUsage::STORAGE);
    }
    true
}

/// Whether a color image in `layout` may be fast cleared.
pub fn layout_can_fast_clear(
    image: &Image,
    level: u32,
    layout: ImageLayout,
    queues: QueueMask,
) -> bool {
    if image.dcc_enabled(level) && !layout_dcc_compressed(image, level, layout, queues) {
        return false;
    }
    if !image.info().usage.intersects(ImageUsage::WRITE) {
        return false;
    }
    if !matches!(
        layout,
        ImageLayout::ColorAttachmentOptimal
            | ImageLayout::AttachmentOptimal
            | ImageLayout::TransferDstOptimal
    ) {
        return false;
    }
    // Only the graphics queue can run a fast-clear eliminate, so images
    // shared with other queues need clears that never require one.
    queues == QueueMask::GRAPHICS || image.supports_comp_to_single()
}

#[cfg(test)]
mod tests {
    use fastclear_encoding::{Format, GfxLevel};

    use super::*;
    use crate::{Device, DeviceOptions, ImageCreateInfo, ReferenceCompiler};
    use std::sync::Arc;

    fn device(gfx_level: GfxLevel) -> Device {
        let options = DeviceOptions {
            gfx_level,
            ..DeviceOptions::default()
        };
        Device::new(Arc::new(ReferenceCompiler::new()), options).unwrap()
    }

    #[test]
    fn attachment_layouts_allow_fast_clears() {
        let device = device(GfxLevel::Gfx10_3);
        let image = device.create_image(ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64));
        let queues = queue_family_mask(&image, QueueFamily::Graphics);
        assert!(layout_can_fast_clear(&image, 0, ImageLayout::ColorAttachmentOptimal, queues));
        assert!(layout_can_fast_clear(&image, 0, ImageLayout::TransferDstOptimal, queues));
        assert!(!layout_can_fast_clear(&image, 0, ImageLayout::General, queues));
        assert!(!layout_can_fast_clear(&image, 0, ImageLayout::Undefined, queues));
    }

    #[test]
    fn concurrent_sharing_needs_comp_to_single() {
        let device = device(GfxLevel::Gfx10_3);
        let mut info = ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64);
        info.sharing = SharingMode::Concurrent(QueueMask::GRAPHICS | QueueMask::COMPUTE);
        let image = device.create_image(info);
        let queues = queue_family_mask(&image, QueueFamily::Graphics);
        assert_eq!(queues, QueueMask::GRAPHICS | QueueMask::COMPUTE);
        assert!(!image.supports_comp_to_single());
        assert!(!layout_can_fast_clear(&image, 0, ImageLayout::ColorAttachmentOptimal, queues));
    }

    #[test]
    fn htile_compression_per_layout() {
        let device = device(GfxLevel::Gfx10_3);
        let mut info = ImageCreateInfo::new_2d(Format::D32SfloatS8Uint, 64, 64);
        info.usage = ImageUsage::DEPTH_STENCIL_ATTACHMENT | ImageUsage::TRANSFER_DST;
        let image = device.create_image(info);
        assert!(!image.is_tc_compatible_htile());
        let graphics = QueueMask::GRAPHICS;
        assert!(layout_is_htile_compressed(
            &image,
            ImageLayout::DepthStencilAttachmentOptimal,
            graphics
        ));
        assert!(!layout_is_htile_compressed(&image, ImageLayout::General, graphics));
        assert!(!layout_is_htile_compressed(
            &image,
            ImageLayout::TransferDstOptimal,
            QueueMask::COMPUTE
        ));
    }
}

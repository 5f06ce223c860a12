// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Images, their compression metadata and views onto them.

use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};

use fastclear_encoding::{
    AspectFlags, ClearDepthStencilValue, Format, GfxLevel, HtileLayout,
};
use smallvec::SmallVec;

use crate::surface::{dcc_block_extent, MemoryLayout, MetaSurface, MetaUnit, META_TILE_SIZE};
use crate::{DeviceOptions, ResourceId, SharingMode};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ImageUsage: u32 {
        const TRANSFER_SRC = 1 << 0;
        const TRANSFER_DST = 1 << 1;
        const SAMPLED = 1 << 2;
        const STORAGE = 1 << 3;
        const COLOR_ATTACHMENT = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        const INPUT_ATTACHMENT = 1 << 6;

        /// Usages through which the device writes the image.
        const WRITE = Self::TRANSFER_DST.bits()
            | Self::STORAGE.bits()
            | Self::COLOR_ATTACHMENT.bits()
            | Self::DEPTH_STENCIL_ATTACHMENT.bits();
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageType {
    D1,
    #[default]
    D2,
    D3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent3d {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3d {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// The extent of mip level `level`.
    pub fn minify(self, level: u32) -> Self {
        let minify = |v: u32| (v >> level.min(31)).max(1);
        Self {
            width: minify(self.width),
            height: minify(self.height),
            depth: minify(self.depth),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageCreateInfo {
    pub image_type: ImageType,
    pub format: Format,
    pub extent: Extent3d,
    pub mip_levels: u32,
    pub array_layers: u32,
    pub samples: u32,
    pub usage: ImageUsage,
    pub sharing: SharingMode,
    /// Other formats the image may be viewed with.
    pub view_formats: Vec<Format>,
}

impl ImageCreateInfo {
    /// A single-level, single-layer, single-sample 2D image usable as an
    /// attachment, a sampled image and a transfer destination.
    pub fn new_2d(format: Format, width: u32, height: u32) -> Self {
        let attachment = if format.is_depth_or_stencil() {
            ImageUsage::DEPTH_STENCIL_ATTACHMENT
        } else {
            ImageUsage::COLOR_ATTACHMENT
        };
        Self {
            image_type: ImageType::D2,
            format,
            extent: Extent3d::new(width, height, 1),
            mip_levels: 1,
            array_layers: 1,
            samples: 1,
            usage: attachment | ImageUsage::SAMPLED | ImageUsage::TRANSFER_DST,
            sharing: SharingMode::Exclusive,
            view_formats: Vec::new(),
        }
    }
}

/// Placement of the texels of one mip level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelLayout {
    pub offset: u64,
    pub width: u32,
    pub height: u32,
    /// Array layers, or depth slices of a 3D image.
    pub layers: u32,
    pub slice_size: u64,
}

/// Where the clear color of a fast-cleared color image lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClearStorage {
    /// The image can't be fast cleared.
    None,
    /// A per-level clear value register, saved in image memory.
    Register,
    /// The first texel of every DCC block; there is no register.
    CompToSingle,
}

/// CPU-side record of what the fast clears recorded so far did to a level.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ClearTracking {
    /// Packed clear color register value.
    pub color: Option<[u32; 2]>,
    pub depth_stencil: Option<ClearDepthStencilValue>,
    /// A fast-clear eliminate must run before the level is read.
    pub fce_pending: bool,
    pub dcc_compressed: bool,
}

#[derive(Debug)]
struct HtileInfo {
    surface: MetaSurface,
    layout: HtileLayout,
    tc_compatible: bool,
}

#[derive(Debug)]
struct DccInfo {
    surface: MetaSurface,
    sign_reinterpret: bool,
}

/// An image together with the compression metadata the clear paths use.
///
/// The clear-state bookkeeping is updated by whichever command buffer is
/// recording against the image. Recording into the same image from two
/// threads at once without external synchronization is a usage error; the
/// interior lock only keeps the bookkeeping itself consistent.
#[derive(Debug)]
pub struct Image {
    id: ResourceId,
    info: ImageCreateInfo,
    gfx_level: GfxLevel,
    levels: SmallVec<[LevelLayout; 4]>,
    size: u64,
    htile: Option<HtileInfo>,
    dcc: Option<DccInfo>,
    cmask: Option<MetaSurface>,
    num_meta_levels: u32,
    clear_storage: ClearStorage,
    clear_value_offset: Option<u64>,
    fce_pred_offset: Option<u64>,
    dcc_pred_offset: Option<u64>,
    support_fast_clear: bool,
    tracking: Mutex<SmallVec<[ClearTracking; 4]>>,
}

/// Whether the image's formats all compress the same way, and whether any of
/// them reads the data with the opposite signedness.
fn dcc_view_formats(format: Format, view_formats: &[Format]) -> Option<bool> {
    let desc = format.desc();
    let signed = |f: Format| f.desc().channels[0].ty.is_signed();
    let mut sign_reinterpret = false;
    for &view_format in view_formats {
        let view_desc = view_format.desc();
        if view_desc.block_bits != desc.block_bits || view_desc.nr_channels != desc.nr_channels {
            return None;
        }
        sign_reinterpret |= signed(view_format) != signed(format);
    }
    Some(sign_reinterpret)
}

impl Image {
    pub(crate) fn new(info: ImageCreateInfo, options: &DeviceOptions) -> Self {
        assert!(info.samples.is_power_of_two());
        assert!(info.mip_levels >= 1 && info.array_layers >= 1);
        let gfx_level = options.gfx_level;
        let format = info.format;
        let block_size = format.block_size().max(1);

        let mut memory = MemoryLayout::default();
        let mut levels = SmallVec::new();
        let mut extents: SmallVec<[(u32, u32); 4]> = SmallVec::new();
        for level in 0..info.mip_levels {
            let extent = info.extent.minify(level);
            let layers = match info.image_type {
                ImageType::D3 => extent.depth,
                _ => info.array_layers,
            };
            let slice_size =
                extent.width as u64 * extent.height as u64 * info.samples as u64 * block_size as u64;
            let offset = memory.alloc(slice_size * layers as u64, 256);
            levels.push(LevelLayout {
                offset,
                width: extent.width,
                height: extent.height,
                layers,
                slice_size,
            });
            extents.push((extent.width, extent.height));
        }

        // Level 0 always has metadata; tail levels keep it while they are
        // at least one tile wide and high.
        let num_meta_levels = 1 + extents[1..]
            .iter()
            .take_while(|(w, h)| *w >= META_TILE_SIZE && *h >= META_TILE_SIZE)
            .count() as u32;

        let metadata_allowed = info.image_type == ImageType::D2;
        let layers = info.array_layers;

        let mut htile = None;
        let mut dcc = None;
        let mut cmask = None;
        if metadata_allowed
            && format.is_depth_or_stencil()
            && info.usage.contains(ImageUsage::DEPTH_STENCIL_ATTACHMENT)
        {
            let vrs = options.attachment_vrs
                && gfx_level == GfxLevel::Gfx10_3
                && format.has_depth();
            let layout = HtileLayout::new(format.has_stencil() || vrs, vrs);
            let tc_compatible = info
                .usage
                .intersects(ImageUsage::SAMPLED | ImageUsage::INPUT_ATTACHMENT);
            htile = Some(HtileInfo {
                surface: memory.alloc_meta(MetaUnit::Htile, &extents, num_meta_levels, layers),
                layout,
                tc_compatible,
            });
        } else if metadata_allowed
            && format.is_color()
            && format.is_renderable(gfx_level)
            && info.usage.contains(ImageUsage::COLOR_ATTACHMENT)
        {
            let storage_blocks_dcc =
                gfx_level < GfxLevel::Gfx10 && info.usage.contains(ImageUsage::STORAGE);
            let msaa_blocks_dcc = info.samples > 1 && gfx_level < GfxLevel::Gfx10;
            let view_formats = dcc_view_formats(format, &info.view_formats);
            if let (false, false, Some(sign_reinterpret)) =
                (storage_blocks_dcc, msaa_blocks_dcc, view_formats)
            {
                let (width, height) = dcc_block_extent(block_size);
                dcc = Some(DccInfo {
                    surface: memory.alloc_meta(
                        MetaUnit::Dcc { width, height },
                        &extents,
                        num_meta_levels,
                        layers,
                    ),
                    sign_reinterpret,
                });
            }
            let cmask_useful =
                info.samples > 1 || (gfx_level < GfxLevel::Gfx10 && dcc.is_none());
            if cmask_useful && info.mip_levels == 1 {
                cmask = Some(memory.alloc_meta(MetaUnit::Cmask, &extents[..1], 1, layers));
            }
        }

        let has_color_meta = dcc.is_some() || cmask.is_some();
        let clear_storage = if dcc.is_some() && options.comp_to_single && gfx_level >= GfxLevel::Gfx10
        {
            ClearStorage::CompToSingle
        } else if has_color_meta || htile.is_some() {
            ClearStorage::Register
        } else {
            ClearStorage::None
        };
        let mip_bytes = 8 * info.mip_levels as u64;
        let clear_value_offset = (clear_storage == ClearStorage::Register)
            .then(|| memory.alloc(mip_bytes, 8));
        let fce_pred_offset = has_color_meta.then(|| memory.alloc(mip_bytes, 8));
        let dcc_pred_offset = dcc.is_some().then(|| memory.alloc(mip_bytes, 8));

        let support_fast_clear = htile.is_some() || has_color_meta;
        let tracking = Mutex::new(
            (0..info.mip_levels)
                .map(|_| ClearTracking::default())
                .collect(),
        );

        Self {
            id: ResourceId::next(),
            gfx_level,
            levels,
            size: memory.size(),
            htile,
            dcc,
            cmask,
            num_meta_levels,
            clear_storage,
            clear_value_offset,
            fce_pred_offset,
            dcc_pred_offset,
            support_fast_clear,
            tracking,
            info,
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn info(&self) -> &ImageCreateInfo {
        &self.info
    }

    pub fn format(&self) -> Format {
        self.info.format
    }

    pub fn samples(&self) -> u32 {
        self.info.samples
    }

    pub fn mip_levels(&self) -> u32 {
        self.info.mip_levels
    }

    pub fn array_layers(&self) -> u32 {
        self.info.array_layers
    }

    pub fn extent(&self) -> Extent3d {
        self.info.extent
    }

    pub fn gfx_level(&self) -> GfxLevel {
        self.gfx_level
    }

    /// Bytes of memory the image needs, metadata included.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn level_layout(&self, level: u32) -> &LevelLayout {
        &self.levels[level as usize]
    }

    pub fn num_meta_levels(&self) -> u32 {
        self.num_meta_levels
    }

    pub fn has_htile(&self) -> bool {
        self.htile.is_some()
    }

    pub fn htile_enabled(&self, level: u32) -> bool {
        self.has_htile() && level < self.num_meta_levels
    }

    pub fn htile_layout(&self) -> Option<HtileLayout> {
        self.htile.as_ref().map(|htile| htile.layout)
    }

    pub fn htile_surface(&self) -> Option<&MetaSurface> {
        self.htile.as_ref().map(|htile| &htile.surface)
    }

    /// HTILE the texture unit reads directly, without a decompression pass.
    pub fn is_tc_compatible_htile(&self) -> bool {
        self.htile.as_ref().is_some_and(|htile| htile.tc_compatible)
    }

    pub fn has_dcc(&self) -> bool {
        self.dcc.is_some()
    }

    pub fn dcc_enabled(&self, level: u32) -> bool {
        self.has_dcc() && level < self.num_meta_levels
    }

    pub fn dcc_surface(&self) -> Option<&MetaSurface> {
        self.dcc.as_ref().map(|dcc| &dcc.surface)
    }

    /// The image is also viewed with the opposite signedness.
    pub fn dcc_sign_reinterpret(&self) -> bool {
        self.dcc.as_ref().is_some_and(|dcc| dcc.sign_reinterpret)
    }

    pub fn has_cmask(&self) -> bool {
        self.cmask.is_some()
    }

    pub fn cmask_surface(&self) -> Option<&MetaSurface> {
        self.cmask.as_ref()
    }

    pub fn clear_storage(&self) -> ClearStorage {
        self.clear_storage
    }

    pub fn supports_comp_to_single(&self) -> bool {
        self.clear_storage == ClearStorage::CompToSingle
    }

    pub fn has_clear_value(&self) -> bool {
        self.clear_value_offset.is_some()
    }

    /// Offset of the saved clear value of `level`: two color words, or the
    /// stencil then the depth of a depth/stencil image.
    pub fn clear_value_offset(&self, level: u32) -> Option<u64> {
        self.clear_value_offset.map(|offset| offset + 8 * level as u64)
    }

    /// Offset of the 64-bit fast-clear eliminate predicate of `level`.
    pub fn fce_pred_offset(&self, level: u32) -> Option<u64> {
        self.fce_pred_offset.map(|offset| offset + 8 * level as u64)
    }

    /// Offset of the 64-bit DCC compressed predicate of `level`.
    pub fn dcc_pred_offset(&self, level: u32) -> Option<u64> {
        self.dcc_pred_offset.map(|offset| offset + 8 * level as u64)
    }

    pub fn supports_fast_clear(&self) -> bool {
        self.support_fast_clear
    }

    /// Shader writes land in L2 where the color and depth blocks read them.
    pub fn is_l2_coherent(&self) -> bool {
        self.gfx_level >= GfxLevel::Gfx9
    }

    /// The bookkeeping of `level`.
    pub fn tracking(&self, level: u32) -> ClearTracking {
        let tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
        tracking[level as usize]
    }

    pub(crate) fn update_tracking(&self, levels: Range<u32>, f: impl Fn(&mut ClearTracking)) {
        let mut tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
        for level in levels {
            if let Some(entry) = tracking.get_mut(level as usize) {
                f(entry);
            }
        }
    }
}

/// A contiguous block of mip levels and array layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub aspects: AspectFlags,
    pub base_mip_level: u32,
    pub level_count: u32,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl SubresourceRange {
    /// Every level and layer of `image`.
    pub fn whole(image: &Image, aspects: AspectFlags) -> Self {
        Self {
            aspects,
            base_mip_level: 0,
            level_count: image.mip_levels(),
            base_array_layer: 0,
            layer_count: image.array_layers(),
        }
    }

    pub fn levels(&self) -> Range<u32> {
        self.base_mip_level..self.base_mip_level + self.level_count
    }

    pub fn layers(&self) -> Range<u32> {
        self.base_array_layer..self.base_array_layer + self.layer_count
    }
}

/// A typed window onto a sub-range of an [`Image`].
#[derive(Clone, Debug)]
pub struct ImageView {
    image: Arc<Image>,
    format: Format,
    range: SubresourceRange,
    support_fast_clear: bool,
    disable_compression: bool,
}

impl ImageView {
    pub(crate) fn new(
        image: &Arc<Image>,
        format: Format,
        range: SubresourceRange,
        disable_compression: bool,
        options: &DeviceOptions,
    ) -> Self {
        let all_layers = image.info().image_type == ImageType::D3
            || (range.base_array_layer == 0 && range.layer_count == image.array_layers());
        let support_fast_clear = image.supports_fast_clear()
            && all_layers
            && !disable_compression
            && !options.disable_fast_clears;
        Self {
            image: image.clone(),
            format,
            range,
            support_fast_clear,
            disable_compression,
        }
    }

    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn range(&self) -> &SubresourceRange {
        &self.range
    }

    pub fn aspects(&self) -> AspectFlags {
        self.range.aspects
    }

    pub fn base_mip_level(&self) -> u32 {
        self.range.base_mip_level
    }

    pub fn level_count(&self) -> u32 {
        self.range.level_count
    }

    pub fn base_array_layer(&self) -> u32 {
        self.range.base_array_layer
    }

    pub fn layer_count(&self) -> u32 {
        self.range.layer_count
    }

    pub fn supports_fast_clear(&self) -> bool {
        self.support_fast_clear
    }

    /// Writes through the view bypass compression.
    pub fn compression_disabled(&self) -> bool {
        self.disable_compression
    }
}

#[cfg(test)]
mod tests {
    use fastclear_encoding::{Format, GfxLevel, HtileLayout};

    use super::*;
    use crate::DeviceOptions;

    fn options(gfx_level: GfxLevel) -> DeviceOptions {
        DeviceOptions {
            gfx_level,
            ..DeviceOptions::default()
        }
    }

    #[test]
    fn color_metadata_per_generation() {
        let info = ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 256, 256);
        let gfx8 = Image::new(info.clone(), &options(GfxLevel::Gfx8));
        assert!(gfx8.has_dcc());
        assert!(!gfx8.has_cmask());
        assert_eq!(gfx8.clear_storage(), ClearStorage::Register);

        let mut msaa = info.clone();
        msaa.samples = 4;
        let gfx8_msaa = Image::new(msaa.clone(), &options(GfxLevel::Gfx8));
        assert!(!gfx8_msaa.has_dcc());
        assert!(gfx8_msaa.has_cmask());
        let gfx10_msaa = Image::new(msaa, &options(GfxLevel::Gfx10));
        assert!(gfx10_msaa.has_dcc());
        assert!(gfx10_msaa.has_cmask());

        let mut storage = info.clone();
        storage.usage |= ImageUsage::STORAGE;
        let gfx9_storage = Image::new(storage, &options(GfxLevel::Gfx9));
        assert!(!gfx9_storage.has_dcc());
        assert!(gfx9_storage.has_cmask());

        let comp_to_single = DeviceOptions {
            comp_to_single: true,
            ..options(GfxLevel::Gfx10_3)
        };
        let image = Image::new(info, &comp_to_single);
        assert!(image.supports_comp_to_single());
        assert!(!image.has_clear_value());
        assert!(image.clear_value_offset(0).is_none());
    }

    #[test]
    fn sign_reinterpretation_from_view_formats() {
        let mut info = ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64);
        info.view_formats = vec![Format::R8G8B8A8Snorm];
        let image = Image::new(info.clone(), &options(GfxLevel::Gfx10));
        assert!(image.dcc_sign_reinterpret());

        info.view_formats = vec![Format::R32Uint];
        let image = Image::new(info, &options(GfxLevel::Gfx10));
        assert!(!image.has_dcc());
    }

    #[test]
    fn depth_metadata() {
        let info = ImageCreateInfo::new_2d(Format::D32Sfloat, 64, 64);
        let image = Image::new(info.clone(), &options(GfxLevel::Gfx10_3));
        assert_eq!(image.htile_layout(), Some(HtileLayout::DepthOnly));
        assert!(image.is_tc_compatible_htile());

        let vrs = DeviceOptions {
            attachment_vrs: true,
            ..options(GfxLevel::Gfx10_3)
        };
        let image = Image::new(info, &vrs);
        assert_eq!(
            image.htile_layout(),
            Some(HtileLayout::DepthStencil { vrs: true })
        );

        let info = ImageCreateInfo::new_2d(Format::D24UnormS8Uint, 64, 64);
        let image = Image::new(info, &options(GfxLevel::Gfx9));
        assert_eq!(
            image.htile_layout(),
            Some(HtileLayout::DepthStencil { vrs: false })
        );
        assert!(image.has_clear_value());
    }

    #[test]
    fn meta_levels_stop_at_small_mips() {
        let mut info = ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64);
        info.mip_levels = 7;
        let image = Image::new(info, &options(GfxLevel::Gfx10));
        // 64, 32, 16 and 8 keep metadata; 4, 2 and 1 don't.
        assert_eq!(image.num_meta_levels(), 4);
        assert!(image.dcc_enabled(3));
        assert!(!image.dcc_enabled(4));
        assert!(!image.has_cmask());
    }

    #[test]
    fn view_fast_clear_support() {
        let mut info = ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64);
        info.array_layers = 4;
        let options = options(GfxLevel::Gfx10);
        let image = Arc::new(Image::new(info, &options));
        let all = SubresourceRange::whole(&image, AspectFlags::COLOR);
        let view = ImageView::new(&image, image.format(), all, false, &options);
        assert!(view.supports_fast_clear());

        let partial = SubresourceRange {
            layer_count: 2,
            ..all
        };
        let view = ImageView::new(&image, image.format(), partial, false, &options);
        assert!(!view.supports_fast_clear());

        let disabled = DeviceOptions {
            disable_fast_clears: true,
            ..options
        };
        let view = ImageView::new(&image, image.format(), all, false, &disabled);
        assert!(!view.supports_fast_clear());
    }
}

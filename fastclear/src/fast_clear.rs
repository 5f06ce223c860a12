// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fast clears: rewriting HTILE, DCC and CMASK instead of texels.
//!
//! Every operation here returns the flushes that make its metadata writes
//! visible to the blocks reading them next. The callers decide whether those
//! are applied right away or batched with other clears.

use std::sync::Arc;

use fastclear_encoding::{
    cmask_fast_clear_value, htile_fast_clear_value, htile_initial_value, htile_mask,
    pack_clear_color, AspectFlags, ClearColorValue, ClearDepthStencilValue, DccClearCode,
    DccImageInfo, Format,
};
use fastclear_shaders::{
    CompToSinglePush, HtileMaskPush, ShaderStages, HTILE_MASK_BYTES_PER_INVOCATION,
    HTILE_MASK_WG_SIZE,
};

use crate::cmd_buffer::MetaSaveFlags;
use crate::flush::{dst_access_flush, src_access_flush};
use crate::surface::dcc_block_extent;
use crate::{
    AccessFlags, BufferRange, CommandBuffer, Descriptor, DispatchSize, FillPath, FlushBits,
    GfxLevel, Image, ImageView, PipelineBindPoint, PipelineKey, SubresourceRange,
};

/// Fills at least this large are done with a compute shader instead of the
/// DMA engine.
const FILL_COMPUTE_THRESHOLD: u64 = 4096;

/// Uncompressed storage format with the given texel size.
fn storage_format(texel_size: u32) -> Format {
    match texel_size {
        1 => Format::R8Uint,
        2 => Format::R16Uint,
        4 => Format::R32Uint,
        8 => Format::R32G32Uint,
        16 => Format::R32G32B32A32Uint,
        _ => unreachable!("no storage format with {texel_size} byte texels"),
    }
}

fn range_with_aspects(view: &ImageView, aspects: AspectFlags) -> SubresourceRange {
    SubresourceRange {
        aspects,
        ..*view.range()
    }
}

impl CommandBuffer<'_> {
    /// Adds the flushes that order a fast clear after earlier attachment
    /// writes, unless `pre_flush` shows they were already added.
    fn fast_clear_pre_flush(
        &mut self,
        image: &Image,
        src: AccessFlags,
        dst: AccessFlags,
        pre_flush: Option<&mut FlushBits>,
    ) {
        let Some(pre_flush) = pre_flush else {
            return;
        };
        let bits = src_access_flush(src, Some(image)) | dst_access_flush(dst, Some(image));
        self.flush_bits |= bits & !*pre_flush;
        *pre_flush |= self.flush_bits;
    }

    fn fast_clear_post_flush(&mut self, flush: FlushBits, post_flush: Option<&mut FlushBits>) {
        match post_flush {
            Some(post_flush) => *post_flush |= flush,
            None => self.flush_bits |= flush,
        }
    }

    /// Clears `view` to `color` through its DCC or CMASK.
    ///
    /// Eligibility must have been checked with
    /// [`CommandBuffer::can_fast_clear_color`].
    pub(crate) fn fast_clear_color(
        &mut self,
        view: &ImageView,
        color: &ClearColorValue,
        pre_flush: Option<&mut FlushBits>,
        post_flush: Option<&mut FlushBits>,
    ) {
        let image = view.image();
        self.fast_clear_pre_flush(
            image,
            AccessFlags::COLOR_ATTACHMENT_WRITE,
            AccessFlags::SHADER_WRITE,
            pre_flush,
        );

        // Images without a clear color register don't need the packed color.
        let packed = pack_clear_color(view.format(), color).unwrap_or([0, 0]);
        let cmask_value = cmask_fast_clear_value(image.has_dcc(), image.samples());
        let range = range_with_aspects(view, AspectFlags::COLOR);
        let mut flush = FlushBits::empty();
        let needs_eliminate;

        if image.dcc_enabled(view.base_mip_level()) {
            let encoder = self.device.dcc_encoder();
            let info = DccImageInfo {
                format: view.format(),
                sign_reinterpret: image.dcc_sign_reinterpret(),
                comp_to_single: image.supports_comp_to_single(),
            };
            let Some(clear) = encoder.encode(&info, color) else {
                unreachable!("fast clear of a color without a DCC code");
            };

            if image.has_cmask() {
                flush = self.clear_cmask(image, &range, cmask_value);
            }
            needs_eliminate = clear.needs_eliminate;
            flush |= self.clear_dcc(image, &range, clear.code);

            if clear.code == encoder.single_code() {
                let single = if image.format().block_size() == 16 {
                    color.as_uint32()
                } else {
                    [packed[0], packed[1], 0, 0]
                };
                flush |= self.comp_to_single(image, &range, single);
            }
        } else {
            flush = self.clear_cmask(image, &range, cmask_value);
            // Clearing CMASK alone always needs an eliminate.
            needs_eliminate = true;
        }

        self.fast_clear_post_flush(flush, post_flush);
        self.update_fce_metadata(image, &range, needs_eliminate);
        self.update_color_clear_metadata(image, &range, packed);
    }

    /// Clears `aspects` of `view` to `value` through HTILE.
    ///
    /// Eligibility must have been checked with
    /// [`CommandBuffer::can_fast_clear_depth`].
    pub(crate) fn fast_clear_depth(
        &mut self,
        view: &ImageView,
        value: ClearDepthStencilValue,
        aspects: AspectFlags,
        pre_flush: Option<&mut FlushBits>,
        post_flush: Option<&mut FlushBits>,
    ) {
        let image = view.image();
        let Some(layout) = image.htile_layout() else {
            unreachable!("fast depth clear of an image without HTILE");
        };
        let clear_word = htile_fast_clear_value(value.depth, layout);

        self.fast_clear_pre_flush(
            image,
            AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
            AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE,
            pre_flush,
        );

        let range = range_with_aspects(view, aspects);
        let flush = self.clear_htile(image, &range, clear_word);

        if image.format().has_stencil() && aspects != AspectFlags::DEPTH | AspectFlags::STENCIL {
            // The masked write reads HTILE back, so it has to land before
            // the depth block touches the other aspect.
            self.flush_bits |= flush;
        }

        self.update_ds_clear_metadata(image, &range, value);
        self.fast_clear_post_flush(flush, post_flush);
    }

    /// Writes `value` to the HTILE words of `range`, keeping the bits of
    /// aspects outside `range.aspects`.
    pub(crate) fn clear_htile(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        value: u32,
    ) -> FlushBits {
        let (Some(htile), Some(layout)) = (image.htile_surface(), image.htile_layout()) else {
            return FlushBits::empty();
        };
        let mask = htile_mask(layout, range.aspects);

        let whole = range.base_mip_level == 0
            && range.level_count == image.mip_levels()
            && range.base_array_layer == 0
            && range.layer_count == image.array_layers();
        let pieces = if whole {
            smallvec::smallvec![(htile.offset, htile.size)]
        } else {
            htile.level_ranges(range)
        };

        let mut flush = FlushBits::empty();
        for (offset, size) in pieces {
            flush |= if mask == u32::MAX {
                self.fill_meta(image, offset, size, value)
            } else {
                self.clear_htile_mask(image, offset, size, value, mask)
            };
        }
        flush
    }

    /// Read-modify-write of an HTILE byte range with a compute shader.
    fn clear_htile_mask(
        &mut self,
        image: &Image,
        offset: u64,
        size: u64,
        value: u32,
        mask: u32,
    ) -> FlushBits {
        let blocks = size.div_ceil(HTILE_MASK_WG_SIZE as u64 * HTILE_MASK_BYTES_PER_INVOCATION);

        let mut cmd = self.meta_save(
            MetaSaveFlags::COMPUTE_PIPELINE | MetaSaveFlags::CONSTANTS | MetaSaveFlags::DESCRIPTORS,
        );
        let Some(pipeline) = cmd.pipeline(PipelineKey::HtileMask) else {
            return FlushBits::empty();
        };
        cmd.bind_pipeline(PipelineBindPoint::Compute, pipeline);
        cmd.push_descriptor(
            PipelineBindPoint::Compute,
            Descriptor::StorageBuffer(BufferRange {
                buffer: image.id(),
                offset,
                size,
            }),
        );
        cmd.push_constants(
            ShaderStages::COMPUTE,
            0,
            bytemuck::bytes_of(&HtileMaskPush::new(value, mask)),
        );
        cmd.dispatch(DispatchSize::Workgroups([blocks as u32, 1, 1]));

        FlushBits::CS_PARTIAL_FLUSH | src_access_flush(AccessFlags::SHADER_WRITE, Some(image))
    }

    /// Fills a metadata byte range with a repeated word.
    pub(crate) fn fill_meta(&mut self, image: &Image, offset: u64, size: u64, value: u32) -> FlushBits {
        let range = BufferRange {
            buffer: image.id(),
            offset,
            size,
        };
        if size >= FILL_COMPUTE_THRESHOLD {
            self.fill_buffer(range, value, FillPath::Compute);
            FlushBits::CS_PARTIAL_FLUSH | src_access_flush(AccessFlags::SHADER_WRITE, Some(image))
        } else {
            self.fill_buffer(range, value, FillPath::CpDma);
            FlushBits::empty()
        }
    }

    pub(crate) fn clear_dcc(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        code: DccClearCode,
    ) -> FlushBits {
        let Some(dcc) = image.dcc_surface() else {
            return FlushBits::empty();
        };
        // DCC is compressed from here on, whatever the code.
        self.update_dcc_metadata(image, range, true);

        let mut flush = FlushBits::empty();
        for (offset, size) in dcc.level_ranges(range) {
            flush |= self.fill_meta(image, offset, size, code.0);
        }
        flush
    }

    pub(crate) fn clear_cmask(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        value: u32,
    ) -> FlushBits {
        let Some(cmask) = image.cmask_surface() else {
            return FlushBits::empty();
        };
        let (offset, size) = if image.gfx_level() >= GfxLevel::Gfx9 {
            // Layers are interleaved; only whole-image clears get here.
            (cmask.offset, cmask.size)
        } else {
            let level = cmask.levels[0];
            (
                level.offset + level.slice_size * range.base_array_layer as u64,
                level.slice_size * range.layer_count as u64,
            )
        };
        self.fill_meta(image, offset, size, value)
    }

    /// Stores `color` into the first texel of every DCC block of `range`.
    fn comp_to_single(
        &mut self,
        image: &Arc<Image>,
        range: &SubresourceRange,
        color: [u32; 4],
    ) -> FlushBits {
        let texel_size = image.format().block_size();
        let format = storage_format(texel_size);
        let (block_width, block_height) = dcc_block_extent(texel_size);

        let mut cmd = self.meta_save(
            MetaSaveFlags::DESCRIPTORS | MetaSaveFlags::COMPUTE_PIPELINE | MetaSaveFlags::CONSTANTS,
        );
        let Some(pipeline) = cmd.pipeline(PipelineKey::CompToSingle {
            msaa: image.samples() > 1,
        }) else {
            return FlushBits::empty();
        };
        cmd.bind_pipeline(PipelineBindPoint::Compute, pipeline);

        let device = cmd.device;
        for level in range.levels() {
            if !image.dcc_enabled(level) {
                continue;
            }
            let extent = image.extent().minify(level);
            let view = device.create_uncompressed_view(
                image,
                format,
                SubresourceRange {
                    aspects: AspectFlags::COLOR,
                    base_mip_level: level,
                    level_count: 1,
                    base_array_layer: range.base_array_layer,
                    layer_count: range.layer_count,
                },
            );
            cmd.push_descriptor(PipelineBindPoint::Compute, Descriptor::StorageImage(view));
            let push = CompToSinglePush {
                block_width,
                block_height,
                color,
            };
            cmd.push_constants(ShaderStages::COMPUTE, 0, bytemuck::bytes_of(&push));
            cmd.dispatch(DispatchSize::Invocations([
                extent.width.div_ceil(block_width),
                extent.height.div_ceil(block_height),
                range.layer_count,
            ]));
        }

        FlushBits::CS_PARTIAL_FLUSH | src_access_flush(AccessFlags::SHADER_WRITE, Some(image))
    }

    /// Saves the cleared depth and/or stencil of `range` to its levels'
    /// clear value registers.
    pub(crate) fn update_ds_clear_metadata(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        value: ClearDepthStencilValue,
    ) {
        let aspects = range.aspects;
        image.update_tracking(range.levels(), |tracking| {
            let mut saved = tracking.depth_stencil.unwrap_or_default();
            if aspects.contains(AspectFlags::DEPTH) {
                saved.depth = value.depth;
            }
            if aspects.contains(AspectFlags::STENCIL) {
                saved.stencil = value.stencil;
            }
            tracking.depth_stencil = Some(saved);
        });

        let Some(base) = image.clear_value_offset(range.base_mip_level) else {
            return;
        };
        let depth = value.depth.to_bits();
        if aspects == AspectFlags::DEPTH | AspectFlags::STENCIL {
            let data = (0..range.level_count)
                .flat_map(|_| [value.stencil, depth])
                .collect::<Vec<_>>();
            self.write_data(image.id(), base, data);
        } else {
            let (field, word) = if aspects.contains(AspectFlags::DEPTH) {
                (4, depth)
            } else {
                (0, value.stencil)
            };
            for level in 0..range.level_count as u64 {
                self.write_data(image.id(), base + 8 * level + field, vec![word]);
            }
        }
    }

    /// Saves the packed clear color to the clear value registers of `range`.
    pub(crate) fn update_color_clear_metadata(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        packed: [u32; 2],
    ) {
        let Some(base) = image.clear_value_offset(range.base_mip_level) else {
            return;
        };
        let data = (0..range.level_count)
            .flat_map(|_| packed)
            .collect::<Vec<_>>();
        self.write_data(image.id(), base, data);
        image.update_tracking(range.levels(), |tracking| tracking.color = Some(packed));
    }

    /// Records whether the levels of `range` need a fast-clear eliminate.
    pub(crate) fn update_fce_metadata(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        value: bool,
    ) {
        if let Some(offset) = image.fce_pred_offset(range.base_mip_level) {
            let data = (0..range.level_count)
                .flat_map(|_| [value as u32, 0])
                .collect::<Vec<_>>();
            self.write_data(image.id(), offset, data);
        }
        image.update_tracking(range.levels(), |tracking| tracking.fce_pending = value);
    }

    /// Records whether DCC of the levels of `range` holds compressed data.
    pub(crate) fn update_dcc_metadata(
        &mut self,
        image: &Image,
        range: &SubresourceRange,
        value: bool,
    ) {
        if let Some(offset) = image.dcc_pred_offset(range.base_mip_level) {
            let data = (0..range.level_count)
                .flat_map(|_| [value as u32, 0])
                .collect::<Vec<_>>();
            self.write_data(image.id(), offset, data);
        }
        image.update_tracking(range.levels(), |tracking| tracking.dcc_compressed = value);
    }

    /// Puts the metadata of a freshly created image into its expanded,
    /// uncompressed state.
    ///
    /// Must be recorded before any clear of the image; the contents of
    /// uninitialized metadata are undefined.
    pub fn init_image_metadata(&mut self, image: &Arc<Image>) {
        let range = SubresourceRange::whole(image, image.format().aspects());
        let mut flush = FlushBits::empty();

        if let (Some(htile), Some(layout)) = (image.htile_surface(), image.htile_layout()) {
            flush |= self.fill_meta(image, htile.offset, htile.size, htile_initial_value(layout));
        }
        if let Some(dcc) = image.dcc_surface() {
            flush |= self.fill_meta(image, dcc.offset, dcc.size, DccClearCode::UNCOMPRESSED.0);
            self.update_dcc_metadata(image, &range, false);
        }
        if let Some(cmask) = image.cmask_surface() {
            flush |= self.fill_meta(image, cmask.offset, cmask.size, 0xffff_ffff);
        }
        if image.fce_pred_offset(0).is_some() {
            self.update_fce_metadata(image, &range, false);
        }
        log::debug!("initialized metadata of image {:?}", image.id());
        self.flush_bits |= flush;
    }
}

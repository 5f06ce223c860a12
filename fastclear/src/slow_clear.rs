// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Slow clears, which write every texel: rectangle draws inside a rendering,
//! or compute image stores for images that can't be rendered to.

use std::sync::Arc;

use fastclear_encoding::{AspectFlags, ClearDepthStencilValue, Format};
use fastclear_shaders::{ClearImagePush, ColorClearPush, DepthClearPush, ShaderStages};

use crate::{
    ClearAttachment, ClearRect, CommandBuffer, Descriptor, DispatchSize, Image, ImageType,
    PipelineBindPoint, PipelineKey, SubresourceRange, Viewport,
};

fn clear_viewport(rect: &ClearRect) -> Viewport {
    Viewport {
        x: rect.rect.x as f32,
        y: rect.rect.y as f32,
        width: rect.rect.width as f32,
        height: rect.rect.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

impl CommandBuffer<'_> {
    /// Draws `att`'s color over `rect` of the current rendering.
    pub(crate) fn emit_color_clear(
        &mut self,
        att: &ClearAttachment,
        rect: &ClearRect,
        view_mask: u32,
    ) {
        let Some(render) = &self.render else {
            return;
        };
        let Some(color_att) = render.color.get(att.color_attachment as usize) else {
            return;
        };
        // Inherited renderings only know the declared formats.
        let (samples, format) = match &color_att.view {
            Some(view) => (view.image().samples(), view.format()),
            None => (render.max_samples, color_att.format),
        };
        let Some(fs_key) = format.meta_fs_key() else {
            unreachable!("color clear of non-color format {format:?}");
        };

        let key = PipelineKey::Color {
            samples_log2: samples.trailing_zeros(),
            attachment: att.color_attachment,
            fs_key,
        };
        let Some(pipeline) = self.pipeline(key) else {
            return;
        };

        let push = ColorClearPush {
            color: att.value.color().as_uint32(),
        };
        self.push_constants(ShaderStages::FRAGMENT, 0, bytemuck::bytes_of(&push));
        self.bind_pipeline(PipelineBindPoint::Graphics, pipeline);
        self.set_viewport(clear_viewport(rect));
        self.set_scissor(rect.rect);
        self.emit_rect_draws(rect, view_mask);
    }

    /// Draws depth and/or stencil over `rect` of the current rendering.
    ///
    /// With `fast`, the depth block may record the clear in HTILE, so the
    /// clear value registers are updated as well.
    pub(crate) fn emit_depthstencil_clear(
        &mut self,
        value: ClearDepthStencilValue,
        aspects: AspectFlags,
        rect: &ClearRect,
        view_mask: u32,
        fast: bool,
    ) {
        let Some(render) = &self.render else {
            return;
        };
        let view = render.ds.view.clone();
        let samples = view
            .as_ref()
            .map_or(render.max_samples, |view| view.image().samples());
        let depth = if aspects.contains(AspectFlags::DEPTH) {
            value.depth
        } else {
            1.0
        };

        let unrestricted = self.device.options().depth_range_unrestricted;
        // Unrestricted depth must bypass the viewport clamp, so it's written
        // by the fragment stage.
        let stages = if unrestricted {
            ShaderStages::FRAGMENT
        } else {
            ShaderStages::VERTEX
        };
        self.push_constants(stages, 0, bytemuck::bytes_of(&DepthClearPush { depth }));

        let prev_reference = self.stencil_reference();
        if aspects.contains(AspectFlags::STENCIL) {
            self.set_stencil_reference(value.stencil);
        }

        let key = PipelineKey::DepthStencil {
            aspects,
            unrestricted,
            fast,
            samples_log2: samples.trailing_zeros(),
        };
        if let Some(pipeline) = self.pipeline(key) {
            self.bind_pipeline(PipelineBindPoint::Graphics, pipeline);
            if let (true, Some(view)) = (fast, &view) {
                let range = SubresourceRange {
                    aspects,
                    ..*view.range()
                };
                self.update_ds_clear_metadata(view.image(), &range, value);
            }
            self.set_viewport(clear_viewport(rect));
            self.set_scissor(rect.rect);
            self.emit_rect_draws(rect, view_mask);
        }

        if aspects.contains(AspectFlags::STENCIL) {
            self.set_stencil_reference(prev_reference);
        }
    }

    /// One draw per view of `view_mask`, or one instanced draw over the
    /// rectangle's layers.
    fn emit_rect_draws(&mut self, rect: &ClearRect, view_mask: u32) {
        if view_mask == 0 {
            self.draw(3, rect.layer_count, 0, rect.base_array_layer);
            return;
        }
        let mut mask = view_mask;
        while mask != 0 {
            let view = mask.trailing_zeros();
            self.draw(3, 1, 0, view);
            mask &= mask - 1;
        }
    }

    /// Stores `color` into every texel of `layer_count` layers (or depth
    /// slices) of one level, one dispatch per layer.
    ///
    /// With `disable_compression` the stores bypass DCC, leaving it for the
    /// caller to mark uncompressed.
    #[allow(clippy::too_many_arguments, reason = "Internal helper")]
    pub(crate) fn clear_image_compute(
        &mut self,
        image: &Arc<Image>,
        format: Format,
        level: u32,
        base_layer: u32,
        layer_count: u32,
        color: [u32; 4],
        disable_compression: bool,
    ) {
        let Some(pipeline) = self.pipeline(PipelineKey::ClearImage) else {
            return;
        };
        self.bind_pipeline(PipelineBindPoint::Compute, pipeline);

        let extent = image.extent().minify(level);
        let is_3d = image.info().image_type == ImageType::D3;
        let device = self.device;
        for layer in 0..layer_count {
            // 3D images are bound whole and cleared slice by slice.
            let (view_layer, slice) = if is_3d {
                (0, layer)
            } else {
                (base_layer + layer, 0)
            };
            let range = SubresourceRange {
                aspects: AspectFlags::COLOR,
                base_mip_level: level,
                level_count: 1,
                base_array_layer: view_layer,
                layer_count: 1,
            };
            let view = if disable_compression {
                device.create_uncompressed_view(image, format, range)
            } else {
                device.create_view_with_format(image, format, range)
            };
            self.push_descriptor(PipelineBindPoint::Compute, Descriptor::StorageImage(view));
            let push = ClearImagePush { color, slice };
            self.push_constants(ShaderStages::COMPUTE, 0, bytemuck::bytes_of(&push));
            self.dispatch(DispatchSize::Invocations([extent.width, extent.height, 1]));
        }
    }
}

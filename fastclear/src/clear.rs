// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clear entry points, and the dispatch of each clear to the fast or the
//! slow path.

use std::sync::Arc;

use fastclear_encoding::{
    f32x3_to_rgb9e5, AspectFlags, ClearColorValue, ClearDepthStencilValue, DccClearCode, Format,
};

use crate::cmd_buffer::MetaSaveFlags;
use crate::{
    layout_dcc_compressed, queue_family_mask, CommandBuffer, FlushBits, Image, ImageLayout,
    ImageType, LoadOp, QueueFamily, Rect2D, RenderingAttachment, RenderingInfo, SubresourceRange,
};

/// A color or depth/stencil clear value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClearValue {
    Color(ClearColorValue),
    DepthStencil(ClearDepthStencilValue),
}

impl ClearValue {
    /// The color, or zero for a depth/stencil value.
    pub fn color(&self) -> ClearColorValue {
        match self {
            Self::Color(color) => *color,
            Self::DepthStencil(_) => ClearColorValue::ZERO,
        }
    }

    /// The depth/stencil value, or zero for a color.
    pub fn depth_stencil(&self) -> ClearDepthStencilValue {
        match self {
            Self::Color(_) => ClearDepthStencilValue::default(),
            Self::DepthStencil(value) => *value,
        }
    }
}

impl From<ClearColorValue> for ClearValue {
    fn from(color: ClearColorValue) -> Self {
        Self::Color(color)
    }
}

impl From<ClearDepthStencilValue> for ClearValue {
    fn from(value: ClearDepthStencilValue) -> Self {
        Self::DepthStencil(value)
    }
}

/// One attachment of the current rendering to clear.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearAttachment {
    /// [`AspectFlags::COLOR`], or any of depth and stencil.
    pub aspects: AspectFlags,
    /// Index of the color attachment; ignored for depth/stencil.
    pub color_attachment: u32,
    pub value: ClearValue,
}

/// A rectangle on a range of layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClearRect {
    pub rect: Rect2D,
    pub base_array_layer: u32,
    pub layer_count: u32,
}

impl CommandBuffer<'_> {
    /// Clears one attachment of the current rendering over `rect`, on the
    /// fast path when possible.
    ///
    /// Flushes needed before the clear are added to the command buffer unless
    /// `pre_flush` already holds them. Flushes needed after a fast clear are
    /// accumulated in `post_flush`, or added to the command buffer without it.
    pub(crate) fn emit_clear(
        &mut self,
        att: &ClearAttachment,
        rect: &ClearRect,
        mut pre_flush: Option<&mut FlushBits>,
        mut post_flush: Option<&mut FlushBits>,
        view_mask: u32,
    ) {
        let Some(render) = &self.render else {
            return;
        };

        if att.aspects.contains(AspectFlags::COLOR) {
            let Some(color_att) = render.color.get(att.color_attachment as usize) else {
                return;
            };
            if color_att.format == Format::Undefined {
                return;
            }
            let view = color_att.view.clone();
            let layout = color_att.layout;
            let color = att.value.color();

            match &view {
                Some(view)
                    if self.can_fast_clear_color(Some(view), layout, rect, &color, view_mask) =>
                {
                    log::trace!("fast clear of color attachment {}", att.color_attachment);
                    self.fast_clear_color(view, &color, pre_flush, post_flush);
                }
                _ => {
                    log::trace!("slow clear of color attachment {}", att.color_attachment);
                    self.emit_color_clear(att, rect, view_mask);
                }
            }
            return;
        }

        let ds = &render.ds;
        if ds.format == Format::Undefined {
            return;
        }
        let view = ds.view.clone();
        let (layout, stencil_layout) = (ds.layout, ds.stencil_layout);
        let value = att.value.depth_stencil();
        let aspects = att.aspects;
        assert!(aspects.intersects(AspectFlags::DEPTH | AspectFlags::STENCIL));

        // Aspects transitioned to different layouts are judged separately,
        // each against its own layout and clear value.
        let (fast_depth, fast_stencil) = if aspects == AspectFlags::DEPTH | AspectFlags::STENCIL
            && layout != stencil_layout
        {
            (
                self.can_fast_clear_depth(
                    view.as_ref(),
                    layout,
                    AspectFlags::DEPTH,
                    rect,
                    value,
                    view_mask,
                ),
                self.can_fast_clear_depth(
                    view.as_ref(),
                    stencil_layout,
                    AspectFlags::STENCIL,
                    rect,
                    value,
                    view_mask,
                ),
            )
        } else {
            let layout = if aspects.contains(AspectFlags::DEPTH) {
                layout
            } else {
                stencil_layout
            };
            let fast = self.can_fast_clear_depth(view.as_ref(), layout, aspects, rect, value, view_mask);
            (fast, fast)
        };
        log::trace!(
            "clear of {aspects:?}: depth {}, stencil {}",
            if fast_depth { "fast" } else { "slow" },
            if fast_stencil { "fast" } else { "slow" },
        );

        match (&view, fast_depth, fast_stencil) {
            (Some(view), true, true) => {
                self.fast_clear_depth(view, value, aspects, pre_flush, post_flush);
            }
            (None, _, _) | (_, false, false) => {
                self.emit_depthstencil_clear(value, aspects, rect, view_mask, false);
            }
            (Some(view), fast_depth, fast_stencil) => {
                for (aspect, fast) in [
                    (AspectFlags::DEPTH, fast_depth),
                    (AspectFlags::STENCIL, fast_stencil),
                ] {
                    if fast {
                        self.fast_clear_depth(
                            view,
                            value,
                            aspect,
                            pre_flush.as_deref_mut(),
                            post_flush.as_deref_mut(),
                        );
                    } else {
                        self.emit_depthstencil_clear(value, aspect, rect, view_mask, false);
                    }
                }
            }
        }
    }

    /// Performs the load-op clears of a rendering that just began.
    pub(crate) fn clear_rendering(&mut self, info: &RenderingInfo) {
        let is_clear = |att: &RenderingAttachment| att.load_op == LoadOp::Clear;
        let needs_clear = info
            .color_attachments
            .iter()
            .flatten()
            .chain(&info.depth_attachment)
            .chain(&info.stencil_attachment)
            .any(is_clear);
        if !needs_clear {
            return;
        }

        let mut pre_flush = FlushBits::empty();
        let mut post_flush = FlushBits::empty();
        let rect = ClearRect {
            rect: info.area,
            base_array_layer: 0,
            layer_count: info.layer_count,
        };
        let mut cmd = self.meta_save(
            MetaSaveFlags::GRAPHICS_PIPELINE
                | MetaSaveFlags::CONSTANTS
                | MetaSaveFlags::SUSPEND_PREDICATING,
        );

        for (i, att) in info.color_attachments.iter().enumerate() {
            let Some(att) = att.as_ref().filter(|att| att.load_op == LoadOp::Clear) else {
                continue;
            };
            let clear = ClearAttachment {
                aspects: AspectFlags::COLOR,
                color_attachment: i as u32,
                value: att.clear_value,
            };
            cmd.emit_clear(
                &clear,
                &rect,
                Some(&mut pre_flush),
                Some(&mut post_flush),
                info.view_mask,
            );
        }

        let mut aspects = AspectFlags::empty();
        let mut value = ClearDepthStencilValue::default();
        if let Some(att) = info.depth_attachment.as_ref().filter(|att| att.load_op == LoadOp::Clear) {
            aspects |= AspectFlags::DEPTH;
            value.depth = att.clear_value.depth_stencil().depth;
        }
        if let Some(att) = info.stencil_attachment.as_ref().filter(|att| att.load_op == LoadOp::Clear) {
            aspects |= AspectFlags::STENCIL;
            value.stencil = att.clear_value.depth_stencil().stencil;
        }
        if !aspects.is_empty() {
            let clear = ClearAttachment {
                aspects,
                color_attachment: 0,
                value: ClearValue::DepthStencil(value),
            };
            cmd.emit_clear(
                &clear,
                &rect,
                Some(&mut pre_flush),
                Some(&mut post_flush),
                info.view_mask,
            );
        }

        drop(cmd);
        self.flush_bits |= post_flush;
    }

    /// Clears regions of attachments of the current rendering.
    ///
    /// Does nothing outside a rendering.
    pub fn clear_attachments(&mut self, attachments: &[ClearAttachment], rects: &[ClearRect]) {
        let Some(render) = &self.render else {
            return;
        };
        let view_mask = render.view_mask;

        let mut pre_flush = FlushBits::empty();
        let mut post_flush = FlushBits::empty();
        let mut cmd = self.meta_save(MetaSaveFlags::GRAPHICS_PIPELINE | MetaSaveFlags::CONSTANTS);
        for att in attachments {
            for rect in rects {
                cmd.emit_clear(
                    att,
                    rect,
                    Some(&mut pre_flush),
                    Some(&mut post_flush),
                    view_mask,
                );
            }
        }
        drop(cmd);
        self.flush_bits |= post_flush;
    }

    /// Clears ranges of a color image outside of rendering.
    pub fn clear_color_image(
        &mut self,
        image: &Arc<Image>,
        layout: ImageLayout,
        color: &ClearColorValue,
        ranges: &[SubresourceRange],
    ) {
        let gfx_level = image.gfx_level();
        let cs = self.queue() == QueueFamily::Compute || !image.format().is_renderable(gfx_level);
        let mut flags = MetaSaveFlags::CONSTANTS | MetaSaveFlags::SUSPEND_PREDICATING;
        if cs {
            flags |= MetaSaveFlags::COMPUTE_PIPELINE | MetaSaveFlags::DESCRIPTORS;
        } else {
            flags |= MetaSaveFlags::GRAPHICS_PIPELINE;
        }

        let mut format = image.format();
        let mut color = *color;
        let mut disable_compression = false;
        if format == Format::E5B9G9R9UfloatPack32 {
            let supported = if cs {
                format.is_storable()
            } else {
                format.is_renderable(gfx_level)
            };
            if !supported {
                // Written as the 32-bit word it packs into.
                let [r, g, b, _] = color.as_float32();
                color = ClearColorValue::uint32([f32x3_to_rgb9e5([r, g, b]), 0, 0, 0]);
                format = Format::R32Uint;
                // Compressed stores would encode DCC for the substituted format.
                let queues = queue_family_mask(image, self.queue());
                disable_compression = cs
                    && ranges.iter().any(|range| {
                        layout_dcc_compressed(image, range.base_mip_level, layout, queues)
                    });
            }
        }
        if format == Format::R4G4UnormPack8 {
            // Cleared as the byte it packs into.
            let ubyte = |f: f32| (f.clamp(0.0, 1.0) * 255.0).round() as u32;
            let [r, g, _, _] = color.as_float32();
            let packed = ((ubyte(r) >> 4) << 4) | ((ubyte(g) >> 4) & 0xf);
            color = ClearColorValue::uint32([packed, 0, 0, 0]);
            format = Format::R8Uint;
        }

        let mut cmd = self.meta_save(flags);
        for range in ranges {
            cmd.clear_image_range(
                image,
                layout,
                format,
                &ClearValue::Color(color),
                range,
                cs,
                disable_compression,
            );
        }

        if disable_compression {
            let mut flush = FlushBits::empty();
            for range in ranges {
                if image.dcc_enabled(range.base_mip_level) {
                    flush |= cmd.clear_dcc(image, range, DccClearCode::UNCOMPRESSED);
                }
            }
            cmd.flush_bits |= flush;
        }
    }

    /// Clears ranges of a depth/stencil image outside of rendering.
    pub fn clear_depth_stencil_image(
        &mut self,
        image: &Arc<Image>,
        layout: ImageLayout,
        value: &ClearDepthStencilValue,
        ranges: &[SubresourceRange],
    ) {
        let mut cmd = self.meta_save(
            MetaSaveFlags::GRAPHICS_PIPELINE
                | MetaSaveFlags::CONSTANTS
                | MetaSaveFlags::SUSPEND_PREDICATING,
        );
        for range in ranges {
            cmd.clear_image_range(
                image,
                layout,
                image.format(),
                &ClearValue::DepthStencil(*value),
                range,
                false,
                false,
            );
        }
    }

    #[allow(clippy::too_many_arguments, reason = "Internal helper")]
    fn clear_image_range(
        &mut self,
        image: &Arc<Image>,
        layout: ImageLayout,
        format: Format,
        value: &ClearValue,
        range: &SubresourceRange,
        cs: bool,
        disable_compression: bool,
    ) {
        if !cs && self.fast_clear_range(image, format, layout, range, value) {
            return;
        }

        for level in range.levels() {
            let extent = image.extent().minify(level);
            let layer_count = if image.info().image_type == ImageType::D3 {
                extent.depth
            } else {
                range.layer_count
            };
            if cs {
                self.clear_image_compute(
                    image,
                    format,
                    level,
                    range.base_array_layer,
                    layer_count,
                    value.color().as_uint32(),
                    disable_compression,
                );
            } else {
                debug_assert!(!disable_compression);
                self.clear_image_layer(image, layout, format, range, level, layer_count, value);
            }
        }
    }

    /// Tries to clear a whole range with one fast clear.
    fn fast_clear_range(
        &mut self,
        image: &Arc<Image>,
        format: Format,
        layout: ImageLayout,
        range: &SubresourceRange,
        value: &ClearValue,
    ) -> bool {
        let view = self.device.create_view_with_format(image, format, *range);
        let extent = image.extent().minify(range.base_mip_level);
        let rect = ClearRect {
            rect: Rect2D::from_extent(extent.width, extent.height),
            base_array_layer: range.base_array_layer,
            layer_count: range.layer_count,
        };

        if format.is_color() {
            let color = value.color();
            if self.can_fast_clear_color(Some(&view), layout, &rect, &color, 0) {
                self.fast_clear_color(&view, &color, None, None);
                return true;
            }
        } else {
            let value = value.depth_stencil();
            if self.can_fast_clear_depth(Some(&view), layout, range.aspects, &rect, value, 0) {
                self.fast_clear_depth(&view, value, range.aspects, None, None);
                return true;
            }
        }
        false
    }

    /// Clears `layer_count` layers of one level by rendering to them.
    #[allow(clippy::too_many_arguments, reason = "Internal helper")]
    fn clear_image_layer(
        &mut self,
        image: &Arc<Image>,
        layout: ImageLayout,
        format: Format,
        range: &SubresourceRange,
        level: u32,
        layer_count: u32,
        value: &ClearValue,
    ) {
        let extent = image.extent().minify(level);
        let view = self.device.create_view_with_format(
            image,
            format,
            SubresourceRange {
                aspects: range.aspects,
                base_mip_level: level,
                level_count: 1,
                base_array_layer: range.base_array_layer,
                layer_count,
            },
        );
        let area = Rect2D::from_extent(extent.width, extent.height);

        let attachment = RenderingAttachment::load(view, layout);
        let image_aspects = image.format().aspects();
        let mut info = RenderingInfo {
            area,
            layer_count,
            ..RenderingInfo::default()
        };
        if image_aspects.contains(AspectFlags::COLOR) {
            info.color_attachments.push(Some(attachment));
        } else {
            if image_aspects.contains(AspectFlags::DEPTH) {
                info.depth_attachment = Some(attachment.clone());
            }
            if image_aspects.contains(AspectFlags::STENCIL) {
                info.stencil_attachment = Some(attachment);
            }
        }

        let saved_render = self.render.take();
        self.begin_rendering(&info);
        let clear = ClearAttachment {
            aspects: range.aspects,
            color_attachment: 0,
            value: *value,
        };
        let rect = ClearRect {
            rect: area,
            base_array_layer: 0,
            layer_count,
        };
        self.emit_clear(&clear, &rect, None, None, 0);
        self.end_rendering();
        self.render = saved_render;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fastclear_encoding::{
        f32x3_to_rgb9e5, AspectFlags, ClearColorValue, ClearDepthStencilValue, DccClearCode,
        Format,
    };

    use super::{ClearAttachment, ClearRect, ClearValue};
    use crate::{
        Command, Device, DeviceOptions, FillPath, ImageCreateInfo, ImageLayout, ImageUsage,
        QueueFamily, Rect2D, ReferenceCompiler, RenderingAttachment, RenderingInfo,
        SubresourceRange,
    };

    fn device(options: DeviceOptions) -> Device {
        Device::new(Arc::new(ReferenceCompiler::new()), options).unwrap()
    }

    #[test]
    fn attachment_load_op_clear_is_fast() {
        let device = device(DeviceOptions::default());
        let image = device.create_image(ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64));
        let view = device.create_view(&image, SubresourceRange::whole(&image, AspectFlags::COLOR));
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(64, 64),
            layer_count: 1,
            color_attachments: vec![Some(RenderingAttachment::clear(
                view,
                ImageLayout::ColorAttachmentOptimal,
                ClearValue::Color(ClearColorValue::float32([0.0; 4])),
            ))],
            ..RenderingInfo::default()
        });
        cmd.end_rendering();
        let recording = cmd.finish().unwrap();
        assert_eq!(recording.draw_count(), 0);
        let dcc = image.dcc_surface().unwrap();
        assert!(recording
            .fills()
            .any(|(range, value)| range.offset == dcc.offset && value == 0));
    }

    #[test]
    fn partial_rect_is_drawn() {
        let device = device(DeviceOptions::default());
        let image = device.create_image(ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64));
        let view = device.create_view(&image, SubresourceRange::whole(&image, AspectFlags::COLOR));
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(64, 64),
            layer_count: 1,
            color_attachments: vec![Some(RenderingAttachment::load(
                view,
                ImageLayout::ColorAttachmentOptimal,
            ))],
            ..RenderingInfo::default()
        });
        cmd.clear_attachments(
            &[ClearAttachment {
                aspects: AspectFlags::COLOR,
                color_attachment: 0,
                value: ClearValue::Color(ClearColorValue::float32([1.0; 4])),
            }],
            &[ClearRect {
                rect: Rect2D::new(8, 8, 16, 16),
                base_array_layer: 0,
                layer_count: 1,
            }],
        );
        cmd.end_rendering();
        let commands = cmd.finish().unwrap().into_commands();
        assert!(commands.contains_scissor(Rect2D::new(8, 8, 16, 16)));
        let draws: Vec<_> = commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::Draw {
                    vertex_count,
                    instance_count,
                    first_instance,
                    ..
                } => Some((*vertex_count, *instance_count, *first_instance)),
                _ => None,
            })
            .collect();
        assert_eq!(draws, [(3, 1, 0)]);
    }

    trait CommandsExt {
        fn contains_scissor(&self, rect: Rect2D) -> bool;
    }

    impl CommandsExt for Vec<Command> {
        fn contains_scissor(&self, rect: Rect2D) -> bool {
            self.iter()
                .any(|cmd| matches!(cmd, Command::SetScissor(r) if *r == rect))
        }
    }

    #[test]
    fn multiview_draws_once_per_view() {
        let device = device(DeviceOptions::default());
        let mut info = ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 32, 32);
        info.array_layers = 4;
        let image = device.create_image(info);
        let view = device.create_view(&image, SubresourceRange::whole(&image, AspectFlags::COLOR));
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        // Views 0 and 2 only, so the layers aren't all covered.
        cmd.begin_rendering(&RenderingInfo {
            area: Rect2D::from_extent(32, 32),
            layer_count: 1,
            view_mask: 0b101,
            color_attachments: vec![Some(RenderingAttachment::clear(
                view,
                ImageLayout::ColorAttachmentOptimal,
                ClearValue::Color(ClearColorValue::float32([0.25; 4])),
            ))],
            ..RenderingInfo::default()
        });
        let commands = cmd.finish().unwrap().into_commands();
        let first_instances: Vec<_> = commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::Draw {
                    instance_count: 1,
                    first_instance,
                    ..
                } => Some(*first_instance),
                _ => None,
            })
            .collect();
        assert_eq!(first_instances, [0, 2]);
    }

    #[test]
    fn non_renderable_images_clear_on_compute() {
        let device = device(DeviceOptions::default());
        let mut info = ImageCreateInfo::new_2d(Format::R4G4UnormPack8, 16, 16);
        info.array_layers = 3;
        info.usage = ImageUsage::TRANSFER_DST | ImageUsage::SAMPLED;
        let image = device.create_image(info);
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.clear_color_image(
            &image,
            ImageLayout::TransferDstOptimal,
            &ClearColorValue::float32([1.0, 0.0, 0.0, 1.0]),
            &[SubresourceRange::whole(&image, AspectFlags::COLOR)],
        );
        let recording = cmd.finish().unwrap();
        assert_eq!(recording.dispatch_count(), 3);
        assert_eq!(recording.draw_count(), 0);
        let formats: Vec<_> = recording
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::PushDescriptor(_, crate::Descriptor::StorageImage(view)) => {
                    Some(view.format())
                }
                _ => None,
            })
            .collect();
        assert_eq!(formats, [Format::R8Uint; 3]);
    }

    #[test]
    fn shared_exponent_compute_clear_stores_uncompressed() {
        let device = device(DeviceOptions::default());
        let image = device.create_image(ImageCreateInfo::new_2d(
            Format::E5B9G9R9UfloatPack32,
            64,
            64,
        ));
        assert!(image.has_dcc());
        let mut cmd = device.create_command_buffer(QueueFamily::Compute);
        cmd.clear_color_image(
            &image,
            ImageLayout::TransferDstOptimal,
            &ClearColorValue::float32([1.0, 0.5, 0.0, 1.0]),
            &[SubresourceRange::whole(&image, AspectFlags::COLOR)],
        );
        let recording = cmd.finish().unwrap();
        assert_eq!(recording.draw_count(), 0);
        assert_eq!(recording.dispatch_count(), 1);

        let mut views = recording.commands.iter().filter_map(|cmd| match cmd {
            Command::PushDescriptor(_, crate::Descriptor::StorageImage(view)) => Some(view),
            _ => None,
        });
        let view = views.next().unwrap();
        assert_eq!(view.format(), Format::R32Uint);
        assert!(view.compression_disabled());
        assert!(views.next().is_none());

        // DCC is marked uncompressed after the stores.
        let dispatch = recording
            .commands
            .iter()
            .position(|cmd| matches!(cmd, Command::Dispatch(_)))
            .unwrap();
        let dcc = image.dcc_surface().unwrap();
        assert!(recording.commands[dispatch..].iter().any(|cmd| matches!(
            cmd,
            Command::FillBuffer { range, value, .. }
                if range.offset == dcc.offset && *value == DccClearCode::UNCOMPRESSED.0
        )));
    }

    #[test]
    fn shared_exponent_renders_where_supported() {
        let device = device(DeviceOptions::default());
        let image = device.create_image(ImageCreateInfo::new_2d(
            Format::E5B9G9R9UfloatPack32,
            64,
            64,
        ));
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.init_image_metadata(&image);
        cmd.clear_color_image(
            &image,
            ImageLayout::TransferDstOptimal,
            &ClearColorValue::float32([0.25, 0.25, 0.25, 1.0]),
            &[SubresourceRange::whole(&image, AspectFlags::COLOR)],
        );
        let recording = cmd.finish().unwrap();
        assert_eq!(recording.dispatch_count(), 0);
        assert_eq!(recording.draw_count(), 0);
        let tracking = image.tracking(0);
        assert_eq!(tracking.color, Some([f32x3_to_rgb9e5([0.25; 3]), 0]));
        assert!(tracking.fce_pending);
    }

    #[test]
    fn depth_image_clear_fills_htile() {
        let device = device(DeviceOptions::default());
        let image = device.create_image(ImageCreateInfo::new_2d(Format::D32Sfloat, 128, 128));
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.clear_depth_stencil_image(
            &image,
            ImageLayout::TransferDstOptimal,
            &ClearDepthStencilValue::new(0.0, 0),
            &[SubresourceRange::whole(&image, AspectFlags::DEPTH)],
        );
        let recording = cmd.finish().unwrap();
        let htile = image.htile_surface().unwrap();
        assert_eq!(recording.draw_count(), 0);
        assert!(recording.commands.iter().any(|cmd| matches!(
            cmd,
            Command::FillBuffer { range, path: FillPath::CpDma, .. }
                if range.offset == htile.offset && range.size == htile.size
        )));
        assert_eq!(
            image.tracking(0).depth_stencil,
            Some(ClearDepthStencilValue::new(0.0, 0))
        );
    }

    #[test]
    fn clear_attachments_outside_rendering_is_ignored() {
        let device = device(DeviceOptions::default());
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.clear_attachments(
            &[ClearAttachment {
                aspects: AspectFlags::COLOR,
                color_attachment: 0,
                value: ClearValue::Color(ClearColorValue::ZERO),
            }],
            &[ClearRect {
                rect: Rect2D::from_extent(4, 4),
                base_array_layer: 0,
                layer_count: 1,
            }],
        );
        assert!(cmd.finish().unwrap().commands.is_empty());
    }
}

// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Command buffers and the state clears save and restore around themselves.

use std::ops::{Deref, DerefMut};

use fastclear_encoding::Format;
use fastclear_shaders::ShaderStages;

use crate::{
    BufferRange, ClearValue, Command, Descriptor, Device, DispatchSize, Error, FillPath,
    FlushBits, ImageLayout, ImageView, PipelineBindPoint, PipelineHandle, PipelineKey,
    QueueFamily, Recording, Rect2D, RenderTargets, ResourceId, Result, Viewport,
};

/// Size of the push constant storage shared by every stage.
pub const MAX_PUSH_CONSTANTS_SIZE: usize = 128;

bitflags::bitflags! {
    /// State a meta operation saves on entry and restores on exit.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub(crate) struct MetaSaveFlags: u32 {
        const GRAPHICS_PIPELINE = 1 << 0;
        const COMPUTE_PIPELINE = 1 << 1;
        const CONSTANTS = 1 << 2;
        const DESCRIPTORS = 1 << 3;
        /// Disable conditional rendering for the duration of the operation.
        const SUSPEND_PREDICATING = 1 << 4;
    }
}

/// What happens to an attachment's contents when rendering begins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadOp {
    #[default]
    Load,
    Clear,
    DontCare,
}

#[derive(Clone, Debug)]
pub struct RenderingAttachment {
    pub view: ImageView,
    pub layout: ImageLayout,
    pub load_op: LoadOp,
    pub clear_value: ClearValue,
}

impl RenderingAttachment {
    /// An attachment whose contents are preserved.
    pub fn load(view: ImageView, layout: ImageLayout) -> Self {
        Self {
            view,
            layout,
            load_op: LoadOp::Load,
            clear_value: ClearValue::Color(Default::default()),
        }
    }

    /// An attachment cleared to `clear_value` when rendering begins.
    pub fn clear(view: ImageView, layout: ImageLayout, clear_value: ClearValue) -> Self {
        Self {
            view,
            layout,
            load_op: LoadOp::Clear,
            clear_value,
        }
    }
}

/// Attachments and area of a render pass instance.
#[derive(Clone, Debug, Default)]
pub struct RenderingInfo {
    pub area: Rect2D,
    pub layer_count: u32,
    pub view_mask: u32,
    pub color_attachments: Vec<Option<RenderingAttachment>>,
    pub depth_attachment: Option<RenderingAttachment>,
    pub stencil_attachment: Option<RenderingAttachment>,
}

/// Rendering state a secondary command buffer inherits from its primary.
///
/// Only formats are known, not the views themselves.
#[derive(Clone, Debug)]
pub struct InheritanceInfo {
    pub color_formats: Vec<Format>,
    /// [`Format::Undefined`] when there is no depth/stencil attachment.
    pub depth_stencil_format: Format,
    pub samples: u32,
    pub view_mask: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct ColorAttachmentState {
    pub(crate) format: Format,
    pub(crate) view: Option<ImageView>,
    pub(crate) layout: ImageLayout,
}

#[derive(Clone, Debug)]
pub(crate) struct DepthStencilAttachmentState {
    pub(crate) format: Format,
    pub(crate) view: Option<ImageView>,
    pub(crate) layout: ImageLayout,
    pub(crate) stencil_layout: ImageLayout,
}

#[derive(Clone, Debug)]
pub(crate) struct RenderState {
    pub(crate) view_mask: u32,
    pub(crate) max_samples: u32,
    pub(crate) color: Vec<ColorAttachmentState>,
    pub(crate) ds: DepthStencilAttachmentState,
    /// Rendering began in another command buffer.
    pub(crate) inherited: bool,
}

/// State bound through the recording commands.
#[derive(Clone, Debug)]
struct BoundState {
    graphics_pipeline: Option<PipelineHandle>,
    compute_pipeline: Option<PipelineHandle>,
    push_constants: [u8; MAX_PUSH_CONSTANTS_SIZE],
    compute_descriptor: Option<Descriptor>,
    /// Bumped on every compute descriptor push.
    descriptor_generation: u64,
    stencil_reference: u32,
    predicating: bool,
}

impl Default for BoundState {
    fn default() -> Self {
        Self {
            graphics_pipeline: None,
            compute_pipeline: None,
            push_constants: [0; MAX_PUSH_CONSTANTS_SIZE],
            compute_descriptor: None,
            descriptor_generation: 0,
            stencil_reference: 0,
            predicating: false,
        }
    }
}

/// Records clears for one queue.
///
/// Errors don't interrupt recording. The first one is kept and reported by
/// [`CommandBuffer::finish`]; the clear that hit it is skipped.
#[derive(Debug)]
pub struct CommandBuffer<'d> {
    pub(crate) device: &'d Device,
    queue: QueueFamily,
    recording: Recording,
    /// Flushes applied before the next draw or dispatch.
    pub(crate) flush_bits: FlushBits,
    bound: BoundState,
    pub(crate) render: Option<RenderState>,
    error: Option<Error>,
}

impl<'d> CommandBuffer<'d> {
    pub(crate) fn new(device: &'d Device, queue: QueueFamily) -> Self {
        Self {
            device,
            queue,
            recording: Recording::default(),
            flush_bits: FlushBits::empty(),
            bound: BoundState::default(),
            render: None,
            error: None,
        }
    }

    pub fn device(&self) -> &'d Device {
        self.device
    }

    pub fn queue(&self) -> QueueFamily {
        self.queue
    }

    /// Flushes that will be applied before the next draw or dispatch.
    pub fn pending_flush_bits(&self) -> FlushBits {
        self.flush_bits
    }

    /// The first error hit while recording, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Commands recorded so far.
    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    pub fn stencil_reference(&self) -> u32 {
        self.bound.stencil_reference
    }

    /// Ends recording.
    ///
    /// Returns the first error hit while recording instead of the commands.
    pub fn finish(mut self) -> Result<Recording> {
        if let Some(err) = self.error {
            return Err(err);
        }
        self.emit_cache_flush();
        Ok(self.recording)
    }

    pub(crate) fn set_error(&mut self, err: Error) {
        if self.error.is_none() {
            log::warn!("command buffer entered the error state: {err}");
            self.error = Some(err);
        }
    }

    /// The pipeline for `key`; on failure the command buffer enters the error
    /// state.
    pub(crate) fn pipeline(&mut self, key: PipelineKey) -> Option<PipelineHandle> {
        match self.device.pipeline(key) {
            Ok(handle) => Some(handle),
            Err(err) => {
                self.set_error(err);
                None
            }
        }
    }

    pub(crate) fn emit_cache_flush(&mut self) {
        if !self.flush_bits.is_empty() {
            self.recording.push(Command::Flush(self.flush_bits));
            self.flush_bits = FlushBits::empty();
        }
    }

    pub(crate) fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: PipelineHandle) {
        let bound = match bind_point {
            PipelineBindPoint::Graphics => &mut self.bound.graphics_pipeline,
            PipelineBindPoint::Compute => &mut self.bound.compute_pipeline,
        };
        if *bound == Some(pipeline) {
            return;
        }
        *bound = Some(pipeline);
        self.recording
            .push(Command::BindPipeline(bind_point, pipeline));
    }

    pub(crate) fn push_constants(&mut self, stages: ShaderStages, offset: u32, data: &[u8]) {
        let start = offset as usize;
        self.bound.push_constants[start..start + data.len()].copy_from_slice(data);
        self.recording.push_constants(stages, offset, data);
    }

    pub(crate) fn push_descriptor(&mut self, bind_point: PipelineBindPoint, descriptor: Descriptor) {
        if bind_point == PipelineBindPoint::Compute {
            self.bound.compute_descriptor = Some(descriptor.clone());
            self.bound.descriptor_generation += 1;
        }
        self.recording
            .push(Command::PushDescriptor(bind_point, descriptor));
    }

    pub(crate) fn set_viewport(&mut self, viewport: Viewport) {
        self.recording.push(Command::SetViewport(viewport));
    }

    pub(crate) fn set_scissor(&mut self, scissor: Rect2D) {
        self.recording.push(Command::SetScissor(scissor));
    }

    pub fn set_stencil_reference(&mut self, reference: u32) {
        self.bound.stencil_reference = reference;
        self.recording.push(Command::SetStencilReference(reference));
    }

    /// Enables or disables conditional rendering of the following commands.
    pub fn set_predication(&mut self, enabled: bool) {
        self.bound.predicating = enabled;
        self.recording.push(Command::SetPredication(enabled));
    }

    pub(crate) fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.emit_cache_flush();
        self.recording
            .draw(vertex_count, instance_count, first_vertex, first_instance);
    }

    pub(crate) fn dispatch(&mut self, size: DispatchSize) {
        self.emit_cache_flush();
        self.recording.dispatch(size);
    }

    pub(crate) fn fill_buffer(&mut self, range: BufferRange, value: u32, path: FillPath) {
        if path == FillPath::Compute {
            self.emit_cache_flush();
        }
        self.recording.fill_buffer(range, value, path);
    }

    pub(crate) fn write_data(&mut self, buffer: ResourceId, offset: u64, data: Vec<u32>) {
        self.recording.write_data(buffer, offset, data);
    }

    /// Saves the state selected by `flags`; it is restored when the returned
    /// scope is dropped.
    pub(crate) fn meta_save(&mut self, flags: MetaSaveFlags) -> MetaScope<'_, 'd> {
        let saved = self.bound.clone();
        if flags.contains(MetaSaveFlags::SUSPEND_PREDICATING) && self.bound.predicating {
            self.recording.push(Command::SetPredication(false));
            self.bound.predicating = false;
        }
        MetaScope {
            cmd: self,
            flags,
            saved,
        }
    }

    fn meta_restore(&mut self, flags: MetaSaveFlags, saved: &BoundState) {
        if flags.contains(MetaSaveFlags::GRAPHICS_PIPELINE) {
            if let Some(pipeline) = saved.graphics_pipeline {
                self.bind_pipeline(PipelineBindPoint::Graphics, pipeline);
            }
        }
        if flags.contains(MetaSaveFlags::COMPUTE_PIPELINE) {
            if let Some(pipeline) = saved.compute_pipeline {
                self.bind_pipeline(PipelineBindPoint::Compute, pipeline);
            }
        }
        if flags.contains(MetaSaveFlags::DESCRIPTORS)
            && saved.descriptor_generation != self.bound.descriptor_generation
        {
            if let Some(descriptor) = &saved.compute_descriptor {
                self.push_descriptor(PipelineBindPoint::Compute, descriptor.clone());
            }
        }
        if flags.contains(MetaSaveFlags::CONSTANTS)
            && saved.push_constants != self.bound.push_constants
        {
            self.push_constants(ShaderStages::all(), 0, &saved.push_constants);
        }
        if flags.contains(MetaSaveFlags::SUSPEND_PREDICATING) && saved.predicating {
            self.recording.push(Command::SetPredication(true));
            self.bound.predicating = true;
        }
    }

    /// Begins a render pass instance, clearing the attachments whose load op
    /// is [`LoadOp::Clear`].
    pub fn begin_rendering(&mut self, info: &RenderingInfo) {
        let color: Vec<ColorAttachmentState> = info
            .color_attachments
            .iter()
            .map(|att| match att {
                Some(att) => ColorAttachmentState {
                    format: att.view.format(),
                    view: Some(att.view.clone()),
                    layout: att.layout,
                },
                None => ColorAttachmentState {
                    format: Format::Undefined,
                    view: None,
                    layout: ImageLayout::Undefined,
                },
            })
            .collect();
        let ds_view = info
            .depth_attachment
            .as_ref()
            .or(info.stencil_attachment.as_ref())
            .map(|att| att.view.clone());
        let depth_layout = info.depth_attachment.as_ref().map(|att| att.layout);
        let stencil_layout = info.stencil_attachment.as_ref().map(|att| att.layout);
        let ds = DepthStencilAttachmentState {
            format: ds_view.as_ref().map_or(Format::Undefined, ImageView::format),
            layout: depth_layout
                .or(stencil_layout)
                .unwrap_or(ImageLayout::Undefined),
            stencil_layout: stencil_layout
                .or(depth_layout)
                .unwrap_or(ImageLayout::Undefined),
            view: ds_view,
        };
        let max_samples = color
            .iter()
            .filter_map(|att| att.view.as_ref())
            .chain(ds.view.as_ref())
            .map(|view| view.image().samples())
            .max()
            .unwrap_or(1);

        self.recording.push(Command::BeginRendering(RenderTargets {
            area: info.area,
            layer_count: info.layer_count,
            view_mask: info.view_mask,
            color: color.iter().map(|att| att.view.clone()).collect(),
            depth: info.depth_attachment.as_ref().map(|att| att.view.clone()),
            stencil: info.stencil_attachment.as_ref().map(|att| att.view.clone()),
        }));
        self.render = Some(RenderState {
            view_mask: info.view_mask,
            max_samples,
            color,
            ds,
            inherited: false,
        });
        self.clear_rendering(info);
    }

    /// Continues a render pass instance begun by another command buffer.
    pub fn begin_inherited_rendering(&mut self, info: &InheritanceInfo) {
        let layout = |format: Format| {
            if format == Format::Undefined {
                ImageLayout::Undefined
            } else {
                ImageLayout::AttachmentOptimal
            }
        };
        self.render = Some(RenderState {
            view_mask: info.view_mask,
            max_samples: info.samples.max(1),
            color: info
                .color_formats
                .iter()
                .map(|&format| ColorAttachmentState {
                    format,
                    view: None,
                    layout: layout(format),
                })
                .collect(),
            ds: DepthStencilAttachmentState {
                format: info.depth_stencil_format,
                view: None,
                layout: layout(info.depth_stencil_format),
                stencil_layout: layout(info.depth_stencil_format),
            },
            inherited: true,
        });
    }

    pub fn end_rendering(&mut self) {
        if let Some(render) = self.render.take() {
            if !render.inherited {
                self.recording.push(Command::EndRendering);
            }
        }
    }
}

/// Restores the state saved by [`CommandBuffer::meta_save`] when dropped.
pub(crate) struct MetaScope<'a, 'd> {
    cmd: &'a mut CommandBuffer<'d>,
    flags: MetaSaveFlags,
    saved: BoundState,
}

impl<'d> Deref for MetaScope<'_, 'd> {
    type Target = CommandBuffer<'d>;

    fn deref(&self) -> &Self::Target {
        self.cmd
    }
}

impl DerefMut for MetaScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cmd
    }
}

impl Drop for MetaScope<'_, '_> {
    fn drop(&mut self) {
        self.cmd.meta_restore(self.flags, &self.saved);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fastclear_shaders::ShaderStages;

    use super::MetaSaveFlags;
    use crate::{
        Command, Device, DeviceOptions, Error, PipelineBindPoint, PipelineKey, QueueFamily,
        ReferenceCompiler,
    };

    fn device() -> Device {
        Device::new(Arc::new(ReferenceCompiler::new()), DeviceOptions::default()).unwrap()
    }

    #[test]
    fn meta_scope_restores_pipeline_and_constants() {
        let device = device();
        let user = device.pipeline(PipelineKey::ClearImage).unwrap();
        let meta = device.pipeline(PipelineKey::HtileMask).unwrap();
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.bind_pipeline(PipelineBindPoint::Compute, user);
        cmd.push_constants(ShaderStages::COMPUTE, 0, &[1, 2, 3, 4]);
        cmd.set_predication(true);
        {
            let mut scope = cmd.meta_save(
                MetaSaveFlags::COMPUTE_PIPELINE
                    | MetaSaveFlags::CONSTANTS
                    | MetaSaveFlags::SUSPEND_PREDICATING,
            );
            scope.bind_pipeline(PipelineBindPoint::Compute, meta);
            scope.push_constants(ShaderStages::COMPUTE, 0, &[9; 8]);
        }
        let commands = cmd.finish().unwrap().into_commands();
        assert!(matches!(commands[3], Command::SetPredication(false)));
        let tail = &commands[commands.len() - 3..];
        assert!(matches!(
            tail[0],
            Command::BindPipeline(PipelineBindPoint::Compute, p) if p == user
        ));
        match &tail[1] {
            Command::PushConstants { offset, data, .. } => {
                assert_eq!(*offset, 0);
                assert_eq!(data[..8], [1, 2, 3, 4, 0, 0, 0, 0]);
            }
            other => panic!("expected push constants, got {other:?}"),
        }
        assert!(matches!(tail[2], Command::SetPredication(true)));
    }

    #[test]
    fn first_error_sticks() {
        let compiler = Arc::new(ReferenceCompiler::new());
        let device = Device::new(compiler.clone(), DeviceOptions::default()).unwrap();
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        compiler.fail_with(Some(Error::OutOfDeviceMemory));
        assert!(cmd.pipeline(PipelineKey::HtileMask).is_none());
        compiler.fail_with(Some(Error::OutOfHostMemory));
        assert!(cmd.pipeline(PipelineKey::ClearImage).is_none());
        assert_eq!(cmd.error(), Some(&Error::OutOfDeviceMemory));
        assert_eq!(cmd.finish().unwrap_err(), Error::OutOfDeviceMemory);
    }
}

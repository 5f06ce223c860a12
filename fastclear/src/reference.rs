// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU execution of recordings.
//!
//! [`ReferenceCompiler`] hands out handles for pipeline descriptions and
//! remembers them. [`ReferenceEngine`] runs a [`Recording`] against byte
//! memory with the kernels of [`fastclear_shaders::cpu`], and reads texels
//! back through the compression metadata the way the texture units decode
//! them. Images cleared along different paths can then be compared texel by
//! texel.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytemuck::Pod;
use fastclear_encoding::{
    unpack_rgba, Channel, ChannelType, ClearColorValue, ClearDepthStencilValue, DccDecoded,
    DccEncoder,
};
use fastclear_shaders::cpu::{self, CpuBinding, CpuImage};
use fastclear_shaders::{ColorClearPush, DepthClearPush, ShaderShape};

use crate::cmd_buffer::MAX_PUSH_CONSTANTS_SIZE;
use crate::{
    Command, ComputePipelineDesc, Descriptor, DispatchSize, Error, GraphicsPipelineDesc, Image,
    ImageType, ImageView, MetaSurface, MetaUnit, PipelineBindPoint, PipelineCompiler,
    PipelineDesc, PipelineHandle, Recording, Rect2D, RenderTargets, ResourceId, Result, StencilOp,
    META_TILE_SIZE,
};

/// A [`PipelineCompiler`] that only records what it was asked to build.
#[derive(Debug, Default)]
pub struct ReferenceCompiler {
    pipelines: Mutex<Vec<PipelineDesc>>,
    delay: Duration,
    failure: Mutex<Option<Error>>,
}

impl ReferenceCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every creation take at least `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Makes every following creation fail with `error`, or succeed again
    /// when `None`.
    pub fn fail_with(&self, error: Option<Error>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    /// Number of pipelines created so far.
    pub fn created(&self) -> usize {
        self.pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// The description `handle` was created from.
    pub fn desc(&self, handle: PipelineHandle) -> Option<PipelineDesc> {
        let index = usize::try_from(handle.0.get() - 1).ok()?;
        self.pipelines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }

    fn create(&self, desc: PipelineDesc) -> Result<PipelineHandle> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if let Some(error) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(error);
        }
        let mut pipelines = self.pipelines.lock().unwrap_or_else(PoisonError::into_inner);
        pipelines.push(desc);
        // Handles are 1-based indices into the description list.
        let id = NonZeroU64::new(pipelines.len() as u64).unwrap_or(NonZeroU64::MIN);
        Ok(PipelineHandle(id))
    }
}

impl PipelineCompiler for ReferenceCompiler {
    fn create_graphics_pipeline(&self, desc: &GraphicsPipelineDesc) -> Result<PipelineHandle> {
        self.create(PipelineDesc::Graphics(desc.clone()))
    }

    fn create_compute_pipeline(&self, desc: &ComputePipelineDesc) -> Result<PipelineHandle> {
        self.create(PipelineDesc::Compute(desc.clone()))
    }
}

fn read_u32(memory: &[u8], offset: u64) -> u32 {
    let offset = offset as usize;
    memory
        .get(offset..offset + 4)
        .map_or(0, |b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn write_u32(memory: &mut [u8], offset: u64, value: u32) {
    let offset = offset as usize;
    if let Some(dst) = memory.get_mut(offset..offset + 4) {
        dst.copy_from_slice(&value.to_le_bytes());
    }
}

fn decode_depth(channel: &Channel, bits: u128) -> f32 {
    match channel.ty {
        ChannelType::Float => f32::from_bits(bits as u32),
        _ => (bits as f64 / channel.mask() as f64) as f32,
    }
}

/// Memory bound to one image: texels, metadata and clear registers.
struct BoundImage {
    image: Arc<Image>,
    memory: RefCell<Vec<u8>>,
}

impl BoundImage {
    /// Every layer of `level`, in the image's own format.
    fn level(&self, level: u32) -> CpuImage<'_> {
        let layout = self.image.level_layout(level);
        CpuImage {
            data: &self.memory,
            offset: layout.offset as usize,
            width: layout.width,
            height: layout.height,
            layers: layout.layers,
            samples: self.image.samples(),
            format: self.image.format(),
        }
    }

    /// The texels `view` binds, in the view's format.
    fn view(&self, view: &ImageView) -> CpuImage<'_> {
        let level = view.base_mip_level();
        let layout = self.image.level_layout(level);
        let (base, layers) = if self.image.info().image_type == ImageType::D3 {
            (0, layout.layers)
        } else {
            (view.base_array_layer(), view.layer_count())
        };
        CpuImage {
            offset: (layout.offset + base as u64 * layout.slice_size) as usize,
            layers,
            format: view.format(),
            ..self.level(level)
        }
    }

    /// Image layers `view` covers.
    fn view_layers(&self, view: &ImageView) -> Range<u32> {
        if self.image.info().image_type == ImageType::D3 {
            0..self.image.level_layout(view.base_mip_level()).layers
        } else {
            view.range().layers()
        }
    }

    fn word(&self, offset: u64) -> u32 {
        read_u32(&self.memory.borrow(), offset)
    }

    fn set_word(&self, offset: u64, value: u32) {
        write_u32(&mut self.memory.borrow_mut(), offset, value);
    }

    /// The clear color register of `level`, as a texel.
    fn color_register(&self, level: u32) -> [u8; 16] {
        let Some(offset) = self.image.clear_value_offset(level) else {
            return [0; 16];
        };
        let (lo, hi) = (self.word(offset), self.word(offset + 4));
        // 128-bit formats keep one word for red, green and blue.
        let words = if self.image.format().block_size() == 16 {
            [lo, lo, lo, hi]
        } else {
            [lo, hi, 0, 0]
        };
        let mut texel = [0; 16];
        for (dst, word) in texel.chunks_exact_mut(4).zip(words) {
            dst.copy_from_slice(&word.to_le_bytes());
        }
        texel
    }

    fn ds_register(&self, level: u32) -> ClearDepthStencilValue {
        let Some(offset) = self.image.clear_value_offset(level) else {
            return ClearDepthStencilValue::default();
        };
        ClearDepthStencilValue::new(f32::from_bits(self.word(offset + 4)), self.word(offset))
    }

    /// The metadata surface whose units decide the color of `level`.
    fn color_meta(&self, level: u32) -> Option<&MetaSurface> {
        let image = &self.image;
        if image.has_dcc() {
            return image.dcc_surface().filter(|_| image.dcc_enabled(level));
        }
        image.cmask_surface()
    }

    /// The texel the metadata decodes a pixel to, or `None` when it comes
    /// from memory.
    fn decoded_color(&self, level: u32, layer: u32, x: u32, y: u32) -> Option<[u8; 16]> {
        let surface = self.color_meta(level)?;
        let (offset, shift) = surface.unit_offset(level, layer, x, y)?;
        let byte = self.memory.borrow().get(offset as usize).copied()?;
        match surface.unit {
            MetaUnit::Dcc { width, height } => {
                let encoder = DccEncoder::for_gfx_level(self.image.gfx_level());
                match encoder.decode(self.image.format(), byte) {
                    DccDecoded::Uncompressed => None,
                    DccDecoded::Texel(texel) => Some(texel),
                    DccDecoded::ClearRegister => Some(self.color_register(level)),
                    DccDecoded::SingleFromBlock => Some(self.level(level).read(
                        x / width * width,
                        y / height * height,
                        layer,
                        0,
                    )),
                }
            }
            MetaUnit::Cmask => ((byte >> shift) & 0xf == 0).then(|| self.color_register(level)),
            MetaUnit::Htile => None,
        }
    }

    /// Writes out the texels the color metadata of `layers` holds and marks
    /// those units uncompressed.
    fn expand_color(&self, level: u32, layers: Range<u32>) {
        let Some(surface) = self.color_meta(level) else {
            return;
        };
        let target = self.level(level);
        let (uw, uh) = surface.unit_extent();
        for layer in layers {
            for y in (0..target.height).step_by(uh as usize) {
                for x in (0..target.width).step_by(uw as usize) {
                    let Some(texel) = self.decoded_color(level, layer, x, y) else {
                        continue;
                    };
                    for py in y..(y + uh).min(target.height) {
                        for px in x..(x + uw).min(target.width) {
                            for sample in 0..target.samples {
                                target.write(px, py, layer, sample, &texel);
                            }
                        }
                    }
                    let Some((offset, shift)) = surface.unit_offset(level, layer, x, y) else {
                        continue;
                    };
                    let mut memory = self.memory.borrow_mut();
                    if let Some(byte) = memory.get_mut(offset as usize) {
                        *byte = match surface.unit {
                            MetaUnit::Cmask => *byte | (0xf_u8 << shift),
                            _ => 0xff,
                        };
                    }
                }
            }
        }
    }

    /// Writes out the cleared depth and stencil of the HTILE tiles of
    /// `layers` and marks them expanded.
    fn expand_htile(&self, level: u32, layers: Range<u32>) {
        let image = &self.image;
        let (Some(htile), Some(layout)) = (image.htile_surface(), image.htile_layout()) else {
            return;
        };
        if !image.htile_enabled(level) {
            return;
        }
        let target = self.level(level);
        let register = self.ds_register(level);
        for layer in layers {
            for y in (0..target.height).step_by(META_TILE_SIZE as usize) {
                for x in (0..target.width).step_by(META_TILE_SIZE as usize) {
                    let Some((offset, _)) = htile.unit_offset(level, layer, x, y) else {
                        continue;
                    };
                    let word = self.word(offset);
                    let depth = layout.depth_cleared(word).then_some(register.depth);
                    let stencil = layout
                        .stencil_cleared(word)
                        .then_some(register.stencil as u8);
                    if depth.is_none() && stencil.is_none() {
                        continue;
                    }
                    let tile = cpu::ClearRect {
                        x,
                        y,
                        width: META_TILE_SIZE,
                        height: META_TILE_SIZE,
                    };
                    cpu::fill_depth_stencil_rect(&target, tile, layer..layer + 1, depth, stencil);
                    let mut expanded = word;
                    if depth.is_some() {
                        expanded = layout.expand_depth(expanded);
                    }
                    if stencil.is_some() {
                        expanded = layout.expand_stencil(expanded);
                    }
                    self.set_word(offset, expanded);
                }
            }
        }
    }
}

/// State bound by the commands executed so far.
struct ExecState {
    graphics: Option<GraphicsPipelineDesc>,
    compute: Option<ComputePipelineDesc>,
    push_constants: [u8; MAX_PUSH_CONSTANTS_SIZE],
    descriptor: Option<Descriptor>,
    scissor: Rect2D,
    stencil_reference: u32,
    targets: Option<RenderTargets>,
}

impl ExecState {
    fn new() -> Self {
        Self {
            graphics: None,
            compute: None,
            push_constants: [0; MAX_PUSH_CONSTANTS_SIZE],
            descriptor: None,
            scissor: Rect2D::default(),
            stencil_reference: 0,
            targets: None,
        }
    }

    fn push(&mut self, offset: u32, data: &[u8]) {
        let start = (offset as usize).min(MAX_PUSH_CONSTANTS_SIZE);
        let end = (start + data.len()).min(MAX_PUSH_CONSTANTS_SIZE);
        self.push_constants[start..end].copy_from_slice(&data[..end - start]);
    }

    fn push_typed<T: Pod>(&self) -> T {
        bytemuck::pod_read_unaligned(&self.push_constants[..size_of::<T>()])
    }

    fn scissor_rect(&self) -> cpu::ClearRect {
        let Rect2D {
            x,
            y,
            width,
            height,
        } = self.scissor;
        cpu::ClearRect {
            x: x.max(0) as u32,
            y: y.max(0) as u32,
            width,
            height,
        }
    }
}

/// Executes [`Recording`]s on the CPU.
pub struct ReferenceEngine {
    compiler: Arc<ReferenceCompiler>,
    images: HashMap<ResourceId, BoundImage>,
}

impl fmt::Debug for ReferenceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceEngine")
            .field("images", &self.images.len())
            .finish_non_exhaustive()
    }
}

impl ReferenceEngine {
    /// Creates an engine resolving pipeline handles through `compiler`.
    pub fn new(compiler: Arc<ReferenceCompiler>) -> Self {
        Self {
            compiler,
            images: HashMap::new(),
        }
    }

    /// Allocates zeroed memory for `image`.
    pub fn bind_image(&mut self, image: &Arc<Image>) {
        self.images.insert(
            image.id(),
            BoundImage {
                image: image.clone(),
                memory: RefCell::new(vec![0; image.size() as usize]),
            },
        );
    }

    /// Raw memory of a bound image, metadata included.
    pub fn memory(&self, id: ResourceId) -> Option<Vec<u8>> {
        self.images.get(&id).map(|bound| bound.memory.borrow().clone())
    }

    fn bound(&self, id: ResourceId) -> Result<&BoundImage> {
        self.images.get(&id).ok_or(Error::UnavailableBuffer(id))
    }

    /// Executes every command of `recording` in order.
    pub fn run(&self, recording: &Recording) -> Result<()> {
        let mut state = ExecState::new();
        for command in &recording.commands {
            match command {
                Command::FillBuffer { range, value, .. } => {
                    let bound = self.bound(range.buffer)?;
                    let mut memory = bound.memory.borrow_mut();
                    let start = (range.offset as usize).min(memory.len());
                    let end = ((range.offset + range.size) as usize).min(memory.len());
                    let bytes = value.to_le_bytes();
                    for chunk in memory[start..end].chunks_mut(4) {
                        chunk.copy_from_slice(&bytes[..chunk.len()]);
                    }
                }
                Command::WriteData {
                    buffer,
                    offset,
                    data,
                } => {
                    let bound = self.bound(*buffer)?;
                    for (i, word) in data.iter().enumerate() {
                        bound.set_word(offset + 4 * i as u64, *word);
                    }
                }
                // Execution is already in order.
                Command::Flush(_) | Command::SetViewport(_) => {}
                // Predicates always pass.
                Command::SetPredication(_) => {}
                Command::BindPipeline(bind_point, handle) => {
                    match (bind_point, self.compiler.desc(*handle)) {
                        (PipelineBindPoint::Graphics, Some(PipelineDesc::Graphics(desc))) => {
                            state.graphics = Some(desc);
                        }
                        (PipelineBindPoint::Compute, Some(PipelineDesc::Compute(desc))) => {
                            state.compute = Some(desc);
                        }
                        _ => return Err(Error::UnknownPipeline),
                    }
                }
                Command::PushConstants { offset, data, .. } => state.push(*offset, data),
                Command::PushDescriptor(_, descriptor) => {
                    state.descriptor = Some(descriptor.clone());
                }
                Command::SetScissor(scissor) => state.scissor = *scissor,
                Command::SetStencilReference(reference) => state.stencil_reference = *reference,
                Command::BeginRendering(targets) => state.targets = Some(targets.clone()),
                Command::EndRendering => state.targets = None,
                Command::Draw {
                    instance_count,
                    first_instance,
                    ..
                } => {
                    let layers = *first_instance..first_instance + instance_count;
                    self.draw(&state, layers)?;
                }
                Command::Dispatch(size) => self.dispatch(&state, *size)?,
            }
        }
        Ok(())
    }

    fn draw(&self, state: &ExecState, layers: Range<u32>) -> Result<()> {
        let desc = state.graphics.as_ref().ok_or(Error::UnknownPipeline)?;
        let Some(targets) = &state.targets else {
            log::warn!("skipping draw outside of rendering");
            return Ok(());
        };
        let rect = state.scissor_rect();
        if let Some(ShaderShape::ColorOutput { location }) =
            desc.fragment.as_ref().map(|fs| fs.shape)
        {
            let Some(view) = targets.color.get(location as usize).and_then(Option::as_ref) else {
                return Ok(());
            };
            let push: ColorClearPush = state.push_typed();
            let bound = self.bound(view.image().id())?;
            bound.expand_color(view.base_mip_level(), bound.view_layers(view));
            cpu::fill_color_rect(
                &bound.view(view),
                rect,
                layers,
                &ClearColorValue::uint32(push.color),
            );
            return Ok(());
        }

        let ds = &desc.depth_stencil;
        let Some(view) = targets.depth.as_ref().or(targets.stencil.as_ref()) else {
            return Ok(());
        };
        let depth = (ds.depth_write && targets.depth.is_some())
            .then(|| state.push_typed::<DepthClearPush>().depth);
        let stencil = (ds.stencil_test
            && ds.stencil_pass_op == StencilOp::Replace
            && targets.stencil.is_some())
        .then_some((state.stencil_reference & ds.stencil_write_mask) as u8);
        let bound = self.bound(view.image().id())?;
        bound.expand_htile(view.base_mip_level(), bound.view_layers(view));
        cpu::fill_depth_stencil_rect(&bound.view(view), rect, layers, depth, stencil);
        Ok(())
    }

    fn dispatch(&self, state: &ExecState, size: DispatchSize) -> Result<()> {
        let shader = &state.compute.as_ref().ok_or(Error::UnknownPipeline)?.shader;
        let workgroups = match size {
            DispatchSize::Workgroups(workgroups) => workgroups,
            DispatchSize::Invocations(invocations) => {
                [0, 1, 2].map(|i| invocations[i].div_ceil(shader.workgroup_size[i].max(1)))
            }
        };
        let push = CpuBinding::Buffer(&state.push_constants);
        match (shader.shape, &state.descriptor) {
            (ShaderShape::HtileMask, Some(Descriptor::StorageBuffer(range))) => {
                let bound = self.bound(range.buffer)?;
                let resources = [
                    push,
                    CpuBinding::BufferRange {
                        data: &bound.memory,
                        offset: range.offset as usize,
                        size: range.size as usize,
                    },
                ];
                cpu::htile_mask(workgroups, &resources);
            }
            (ShaderShape::DccCompToSingle { .. }, Some(Descriptor::StorageImage(view))) => {
                let bound = self.bound(view.image().id())?;
                let resources = [push, CpuBinding::Image(bound.view(view))];
                cpu::dcc_comp_to_single(workgroups, &resources);
            }
            (ShaderShape::ClearImage, Some(Descriptor::StorageImage(view))) => {
                let bound = self.bound(view.image().id())?;
                if !view.compression_disabled() {
                    bound.expand_color(view.base_mip_level(), bound.view_layers(view));
                }
                let resources = [push, CpuBinding::Image(bound.view(view))];
                cpu::clear_image(workgroups, &resources);
            }
            (shape, _) => log::warn!("skipping dispatch of {shape:?} without its descriptor"),
        }
        Ok(())
    }

    /// Reads one sample of a color image, decoding its metadata.
    pub fn read_color(
        &self,
        image: &Image,
        level: u32,
        layer: u32,
        x: u32,
        y: u32,
        sample: u32,
    ) -> Result<ClearColorValue> {
        let bound = self.bound(image.id())?;
        let texel = bound
            .decoded_color(level, layer, x, y)
            .unwrap_or_else(|| bound.level(level).read(x, y, layer, sample));
        Ok(unpack_rgba(image.format(), &texel))
    }

    /// Reads one sample of a depth/stencil image, decoding its HTILE.
    pub fn read_depth_stencil(
        &self,
        image: &Image,
        level: u32,
        layer: u32,
        x: u32,
        y: u32,
        sample: u32,
    ) -> Result<ClearDepthStencilValue> {
        let bound = self.bound(image.id())?;
        let raw = u128::from_le_bytes(bound.level(level).read(x, y, layer, sample));
        let (depth_channel, stencil_channel) = image.format().depth_stencil_channels();
        let mut value = ClearDepthStencilValue::new(
            depth_channel.map_or(0.0, |ch| decode_depth(&ch, (raw >> ch.shift) & ch.mask())),
            stencil_channel.map_or(0, |ch| ((raw >> ch.shift) & ch.mask()) as u32),
        );
        if let (Some(htile), Some(layout)) = (image.htile_surface(), image.htile_layout()) {
            let word = htile
                .unit_offset(level, layer, x, y)
                .filter(|_| image.htile_enabled(level))
                .map(|(offset, _)| bound.word(offset));
            if let Some(word) = word {
                let register = bound.ds_register(level);
                if layout.depth_cleared(word) {
                    value.depth = register.depth;
                }
                if layout.stencil_cleared(word) {
                    value.stencil = register.stencil & 0xff;
                }
            }
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fastclear_encoding::{AspectFlags, ClearColorValue, Format};

    use super::{ReferenceCompiler, ReferenceEngine};
    use crate::{
        BufferRange, Command, Device, DeviceOptions, Error, FillPath, ImageCreateInfo,
        PipelineDesc, PipelineKey, QueueFamily, Recording, ResourceId,
    };

    fn device() -> (Arc<ReferenceCompiler>, Device) {
        let compiler = Arc::new(ReferenceCompiler::new());
        let device = Device::new(compiler.clone(), DeviceOptions::default()).unwrap();
        (compiler, device)
    }

    #[test]
    fn handles_resolve_to_their_descriptions() {
        let (compiler, device) = device();
        let handle = device.pipeline(PipelineKey::HtileMask).unwrap();
        let desc = compiler.desc(handle).unwrap();
        assert!(matches!(desc, PipelineDesc::Compute(_)));
        assert_eq!(desc.label(), "clear_htile_mask");
        assert_eq!(compiler.created(), 1);
    }

    #[test]
    fn unbound_memory_is_an_error() {
        let (compiler, _) = device();
        let engine = ReferenceEngine::new(compiler);
        let buffer = ResourceId::next();
        let mut recording = Recording::default();
        recording.fill_buffer(
            BufferRange {
                buffer,
                offset: 0,
                size: 4,
            },
            0,
            FillPath::CpDma,
        );
        assert_eq!(engine.run(&recording), Err(Error::UnavailableBuffer(buffer)));
    }

    #[test]
    fn unknown_pipeline_is_an_error() {
        let (compiler, _) = device();
        let engine = ReferenceEngine::new(compiler);
        let mut recording = Recording::default();
        recording.push(Command::BindPipeline(
            crate::PipelineBindPoint::Compute,
            crate::PipelineHandle(std::num::NonZeroU64::MIN.saturating_add(41)),
        ));
        assert_eq!(engine.run(&recording), Err(Error::UnknownPipeline));
    }

    #[test]
    fn fills_and_writes_reach_memory() {
        let (compiler, device) = device();
        let image = device.create_image(ImageCreateInfo::new_2d(Format::R32Uint, 4, 4));
        let mut engine = ReferenceEngine::new(compiler);
        engine.bind_image(&image);
        let mut recording = Recording::default();
        let range = BufferRange {
            buffer: image.id(),
            offset: 0,
            size: 16,
        };
        recording.fill_buffer(range, 0x0102_0304, FillPath::Compute);
        recording.write_data(image.id(), 4, vec![7]);
        engine.run(&recording).unwrap();
        let memory = engine.memory(image.id()).unwrap();
        assert_eq!(memory[..4], [4, 3, 2, 1]);
        assert_eq!(memory[4..8], [7, 0, 0, 0]);
        let texel = engine.read_color(&image, 0, 0, 2, 0, 0).unwrap();
        assert_eq!(texel.as_uint32()[0], 0x0102_0304);
    }

    #[test]
    fn fast_cleared_dcc_reads_the_clear_color() {
        let (compiler, device) = device();
        let image = device.create_image(ImageCreateInfo::new_2d(Format::R8G8B8A8Unorm, 64, 64));
        let mut engine = ReferenceEngine::new(compiler);
        engine.bind_image(&image);
        let mut cmd = device.create_command_buffer(QueueFamily::Graphics);
        cmd.init_image_metadata(&image);
        cmd.clear_color_image(
            &image,
            crate::ImageLayout::TransferDstOptimal,
            &ClearColorValue::float32([0.0, 0.0, 0.0, 1.0]),
            &[crate::SubresourceRange::whole(&image, AspectFlags::COLOR)],
        );
        let recording = cmd.finish().unwrap();
        assert_eq!(recording.draw_count(), 0);
        engine.run(&recording).unwrap();
        // No texel was written.
        let memory = engine.memory(image.id()).unwrap();
        let level = image.level_layout(0);
        assert!(memory[level.offset as usize..(level.offset + level.slice_size) as usize]
            .iter()
            .all(|b| *b == 0));
        for (x, y) in [(0, 0), (17, 33), (63, 63)] {
            let color = engine.read_color(&image, 0, 0, x, y, 0).unwrap();
            assert_eq!(color.as_float32(), [0.0, 0.0, 0.0, 1.0]);
        }
    }
}

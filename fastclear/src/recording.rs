// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use fastclear_shaders::ShaderStages;

use crate::{FlushBits, ImageView};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub NonZeroU64);

impl ResourceId {
    pub fn next() -> Self {
        // We initialize with 1 so that the conversion below succeeds
        static ID_COUNTER: AtomicU64 = AtomicU64::new(1);
        let id = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(id).unwrap_or(NonZeroU64::MIN))
    }
}

/// Handle of a pipeline created by a [`PipelineCompiler`](crate::PipelineCompiler).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PipelineHandle(pub NonZeroU64);

/// A byte range of the memory bound to a resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferRange {
    pub buffer: ResourceId,
    pub offset: u64,
    pub size: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The rectangle at the origin with the given extent.
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// How a buffer fill is carried out.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillPath {
    /// Through the command processor's DMA engine.
    CpDma,
    /// With a compute shader.
    Compute,
}

/// A resource bound through a push descriptor.
#[derive(Clone, Debug)]
pub enum Descriptor {
    StorageBuffer(BufferRange),
    StorageImage(ImageView),
}

/// Attachments of a render pass instance, as seen by the draws inside it.
#[derive(Clone, Debug, Default)]
pub struct RenderTargets {
    pub area: Rect2D,
    pub layer_count: u32,
    pub view_mask: u32,
    pub color: Vec<Option<ImageView>>,
    pub depth: Option<ImageView>,
    pub stencil: Option<ImageView>,
}

/// Size of a compute dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchSize {
    Workgroups([u32; 3]),
    /// An exact invocation count, not rounded up to whole workgroups.
    Invocations([u32; 3]),
}

/// List of [`Command`]s for an engine to execute in order.
#[derive(Clone, Debug, Default)]
pub struct Recording {
    pub commands: Vec<Command>,
}

/// Single command inside a [`Recording`] to get executed by an engine.
#[derive(Clone, Debug)]
pub enum Command {
    /// Fills a buffer range with a repeated 32-bit word.
    FillBuffer {
        range: BufferRange,
        value: u32,
        path: FillPath,
    },
    /// Writes dwords at an offset of a buffer.
    WriteData {
        buffer: ResourceId,
        offset: u64,
        data: Vec<u32>,
    },
    /// Cache flushes and waits, applied before the next command.
    Flush(FlushBits),
    BindPipeline(PipelineBindPoint, PipelineHandle),
    PushConstants {
        stages: ShaderStages,
        offset: u32,
        data: Vec<u8>,
    },
    PushDescriptor(PipelineBindPoint, Descriptor),
    SetViewport(Viewport),
    SetScissor(Rect2D),
    SetStencilReference(u32),
    /// Enables or disables conditional rendering.
    SetPredication(bool),
    BeginRendering(RenderTargets),
    EndRendering,
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    Dispatch(DispatchSize),
}

impl Recording {
    /// Appends a [`Command`] to the back of the [`Recording`].
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn fill_buffer(&mut self, range: BufferRange, value: u32, path: FillPath) {
        self.push(Command::FillBuffer { range, value, path });
    }

    pub fn write_data(&mut self, buffer: ResourceId, offset: u64, data: impl Into<Vec<u32>>) {
        self.push(Command::WriteData {
            buffer,
            offset,
            data: data.into(),
        });
    }

    pub fn push_constants(&mut self, stages: ShaderStages, offset: u32, data: &[u8]) {
        self.push(Command::PushConstants {
            stages,
            offset,
            data: data.to_vec(),
        });
    }

    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    ) {
        self.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    pub fn dispatch(&mut self, size: DispatchSize) {
        self.push(Command::Dispatch(size));
    }

    /// Returns a [`Vec`] containing the [`Command`]s in the [`Recording`].
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    /// Iterates over the buffer fills, in recording order.
    pub fn fills(&self) -> impl Iterator<Item = (BufferRange, u32)> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            Command::FillBuffer { range, value, .. } => Some((*range, *value)),
            _ => None,
        })
    }

    /// Number of draws recorded.
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::Draw { .. }))
            .count()
    }

    /// Number of compute dispatches recorded.
    pub fn dispatch_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::Dispatch(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceId;

    #[test]
    fn resource_ids_are_unique() {
        let a = ResourceId::next();
        let b = ResourceId::next();
        assert_ne!(a, b);
    }
}

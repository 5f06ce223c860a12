// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU implementations of the clear kernels.
//!
//! These operate on byte memory shaped the way the GPU sees it and exist to
//! test the recording side against. They aren't meant as a CPU fallback.

mod clear_image;
mod comp_to_single;
mod htile_mask;
mod rect;

pub use clear_image::clear_image;
pub use comp_to_single::dcc_comp_to_single;
pub use htile_mask::htile_mask;
pub use rect::{fill_color_rect, fill_depth_stencil_rect, ClearRect};

use std::cell::{RefCell, RefMut};

use bytemuck::Pod;
use fastclear_encoding::Format;

#[derive(Clone, Copy)]
pub enum CpuBinding<'a> {
    /// Read-only bytes, used for push constants.
    Buffer(&'a [u8]),
    /// A byte range of a larger allocation.
    BufferRange {
        data: &'a RefCell<Vec<u8>>,
        offset: usize,
        size: usize,
    },
    Image(CpuImage<'a>),
}

impl CpuBinding<'_> {
    /// Reads a `T` from the start of a read-only buffer.
    ///
    /// Push constant storage has no alignment guarantee, so the value is copied.
    pub fn as_typed<T: Pod>(&self) -> T {
        match self {
            CpuBinding::Buffer(b) => bytemuck::pod_read_unaligned(&b[..size_of::<T>()]),
            _ => panic!("resource type mismatch"),
        }
    }

    /// The bytes of a buffer range.
    ///
    /// The range is clamped to the allocation, the way robust buffer access
    /// drops out-of-bounds accesses.
    pub fn as_range_mut(&self) -> RefMut<'_, [u8]> {
        match self {
            CpuBinding::BufferRange { data, offset, size } => {
                RefMut::map(data.borrow_mut(), |buf| {
                    let start = (*offset).min(buf.len());
                    let end = offset.saturating_add(*size).min(buf.len());
                    &mut buf[start..end]
                })
            }
            _ => panic!("resource type mismatch"),
        }
    }

    pub fn as_image(&self) -> &CpuImage<'_> {
        match self {
            CpuBinding::Image(image) => image,
            _ => panic!("resource type mismatch"),
        }
    }
}

/// One mip level of an image, bound to CPU kernels.
///
/// Texels are stored layer by layer, then row by row, with the samples of a
/// pixel next to each other.
#[derive(Clone, Copy)]
pub struct CpuImage<'a> {
    pub data: &'a RefCell<Vec<u8>>,
    /// Byte offset of the first texel of `layer 0`.
    pub offset: usize,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub samples: u32,
    /// Format texels are read and written in.
    pub format: Format,
}

impl CpuImage<'_> {
    pub fn texel_size(&self) -> usize {
        self.format.block_size() as usize
    }

    /// Byte offset of a texel, or `None` when it lies outside the level.
    pub fn texel_offset(&self, x: u32, y: u32, layer: u32, sample: u32) -> Option<usize> {
        if x >= self.width || y >= self.height || layer >= self.layers || sample >= self.samples {
            return None;
        }
        let index = ((layer as usize * self.height as usize + y as usize) * self.width as usize
            + x as usize)
            * self.samples as usize
            + sample as usize;
        Some(self.offset + index * self.texel_size())
    }

    /// Writes the first [`Self::texel_size`] bytes of `texel`.
    ///
    /// Writes outside the level are dropped.
    pub fn write(&self, x: u32, y: u32, layer: u32, sample: u32, texel: &[u8]) {
        let Some(offset) = self.texel_offset(x, y, layer, sample) else {
            return;
        };
        let size = self.texel_size();
        let mut data = self.data.borrow_mut();
        if let Some(dst) = data.get_mut(offset..offset + size) {
            dst.copy_from_slice(&texel[..size]);
        }
    }

    /// Reads one texel; bytes past [`Self::texel_size`] are zero.
    ///
    /// Reads outside the level return zero.
    pub fn read(&self, x: u32, y: u32, layer: u32, sample: u32) -> [u8; 16] {
        let mut texel = [0; 16];
        let Some(offset) = self.texel_offset(x, y, layer, sample) else {
            return texel;
        };
        let size = self.texel_size();
        let data = self.data.borrow();
        if let Some(src) = data.get(offset..offset + size) {
            texel[..size].copy_from_slice(src);
        }
        texel
    }
}

/// Iterates over every invocation id of a dispatch.
fn invocations(workgroups: [u32; 3], size: [u32; 3]) -> impl Iterator<Item = [u32; 3]> {
    let [nx, ny, nz] = [0, 1, 2].map(|i| workgroups[i] * size[i]);
    (0..nz).flat_map(move |z| (0..ny).flat_map(move |y| (0..nx).map(move |x| [x, y, z])))
}

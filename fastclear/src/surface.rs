// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Placement of texel data and compression metadata in image memory.
//!
//! This is a deliberately simple model. Every surface is stored level-major:
//! level 0 of every layer, then level 1 of every layer, and so on. Each
//! metadata surface has one unit per tile or block of a layer:
//!
//! - HTILE: one dword per 8x8 pixel tile,
//! - DCC: one byte per 256-byte compression block,
//! - CMASK: one nibble per 8x8 pixel tile, base level only.
//!
//! Slices are padded to a whole number of dwords so fills never split a word.

use smallvec::SmallVec;

use crate::SubresourceRange;

/// Side of the square pixel tile tracked by one HTILE or CMASK unit.
pub const META_TILE_SIZE: u32 = 8;

const SURFACE_ALIGNMENT: u64 = 256;

/// Placement of one level of a metadata surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MetaLevel {
    /// Absolute offset of layer 0 of the level.
    pub offset: u64,
    /// Size of all layers of the level; zero when the level has no metadata.
    pub size: u64,
    /// Size of one layer of the level.
    pub slice_size: u64,
    /// Units per row of the level.
    pub pitch: u32,
}

/// What one unit of a metadata surface covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetaUnit {
    /// A dword per tile.
    Htile,
    /// A byte per block of `width` x `height` pixels.
    Dcc { width: u32, height: u32 },
    /// A nibble per tile.
    Cmask,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaSurface {
    pub offset: u64,
    pub size: u64,
    pub unit: MetaUnit,
    pub levels: SmallVec<[MetaLevel; 4]>,
}

impl MetaSurface {
    /// Pixel extent covered by one unit.
    pub fn unit_extent(&self) -> (u32, u32) {
        match self.unit {
            MetaUnit::Htile | MetaUnit::Cmask => (META_TILE_SIZE, META_TILE_SIZE),
            MetaUnit::Dcc { width, height } => (width, height),
        }
    }

    /// Byte offset of the unit covering a pixel, and the bit shift of the
    /// unit within that byte (only non-zero for CMASK).
    pub fn unit_offset(&self, level: u32, layer: u32, x: u32, y: u32) -> Option<(u64, u32)> {
        let meta = self.levels.get(level as usize)?;
        if meta.size == 0 {
            return None;
        }
        let (uw, uh) = self.unit_extent();
        let index = (y / uh) as u64 * meta.pitch as u64 + (x / uw) as u64;
        let base = meta.offset + layer as u64 * meta.slice_size;
        Some(match self.unit {
            MetaUnit::Htile => (base + index * 4, 0),
            MetaUnit::Dcc { .. } => (base + index, 0),
            MetaUnit::Cmask => (base + index / 2, (index % 2) as u32 * 4),
        })
    }

    /// Byte ranges holding `range`, one per level, skipping levels without
    /// metadata.
    pub fn level_ranges(&self, range: &SubresourceRange) -> SmallVec<[(u64, u64); 4]> {
        let mut ranges = SmallVec::new();
        for level in range.levels() {
            let Some(meta) = self.levels.get(level as usize) else {
                continue;
            };
            let size = meta.slice_size * range.layer_count as u64;
            if size == 0 {
                continue;
            }
            ranges.push((
                meta.offset + meta.slice_size * range.base_array_layer as u64,
                size,
            ));
        }
        ranges
    }
}

/// Unit counts of one level, in units per row and rows.
fn unit_grid(width: u32, height: u32, unit: (u32, u32)) -> (u32, u32) {
    (width.div_ceil(unit.0), height.div_ceil(unit.1))
}

fn align(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Hands out offsets in an image's memory.
#[derive(Debug, Default)]
pub(crate) struct MemoryLayout {
    cursor: u64,
}

impl MemoryLayout {
    pub(crate) fn alloc(&mut self, size: u64, alignment: u64) -> u64 {
        let offset = align(self.cursor, alignment);
        self.cursor = offset + size;
        offset
    }

    pub(crate) fn size(&self) -> u64 {
        self.cursor
    }

    /// Places a metadata surface for `extents` (the width and height of every
    /// level), of which the first `meta_levels` carry metadata.
    pub(crate) fn alloc_meta(
        &mut self,
        unit: MetaUnit,
        extents: &[(u32, u32)],
        meta_levels: u32,
        layers: u32,
    ) -> MetaSurface {
        let mut surface = MetaSurface {
            offset: align(self.cursor, SURFACE_ALIGNMENT),
            size: 0,
            unit,
            levels: SmallVec::new(),
        };
        let unit_extent = surface.unit_extent();
        let mut cursor = surface.offset;
        for (level, &(width, height)) in extents.iter().enumerate() {
            if level as u32 >= meta_levels {
                surface.levels.push(MetaLevel {
                    offset: cursor,
                    ..MetaLevel::default()
                });
                continue;
            }
            let (pitch, rows) = unit_grid(width, height, unit_extent);
            let units = pitch as u64 * rows as u64;
            let bytes = match unit {
                MetaUnit::Htile => units * 4,
                MetaUnit::Dcc { .. } => units,
                MetaUnit::Cmask => units.div_ceil(2),
            };
            let slice_size = align(bytes, 4);
            surface.levels.push(MetaLevel {
                offset: cursor,
                size: slice_size * layers as u64,
                slice_size,
                pitch,
            });
            cursor += slice_size * layers as u64;
        }
        surface.size = cursor - surface.offset;
        self.cursor = cursor;
        surface
    }
}

/// Pixel extent of one DCC compression block for a texel size in bytes.
pub fn dcc_block_extent(texel_size: u32) -> (u32, u32) {
    match texel_size {
        1 => (16, 16),
        2 => (16, 8),
        4 => (8, 8),
        8 => (8, 4),
        16 => (4, 4),
        _ => unreachable!("unsupported texel size {texel_size}"),
    }
}

#[cfg(test)]
mod tests {
    use fastclear_encoding::AspectFlags;

    use super::*;

    #[test]
    fn htile_levels_are_level_major() {
        let mut memory = MemoryLayout::default();
        memory.alloc(1000, 256);
        let extents = [(64, 64), (32, 32), (16, 16), (8, 8), (4, 4)];
        let htile = memory.alloc_meta(MetaUnit::Htile, &extents, 4, 3);
        assert_eq!(htile.offset, 1024);
        assert_eq!(htile.levels[0].slice_size, 64 * 4);
        assert_eq!(htile.levels[1].offset, 1024 + 64 * 4 * 3);
        assert_eq!(htile.levels[3].slice_size, 4);
        assert_eq!(htile.levels[4].size, 0);
        assert_eq!(htile.size, (64 + 16 + 4 + 1) * 4 * 3);
        assert_eq!(htile.unit_offset(1, 2, 9, 17), Some((htile.levels[1].offset + 2 * 64 + (2 * 4 + 1) * 4, 0)));
        assert_eq!(htile.unit_offset(4, 0, 0, 0), None);
    }

    #[test]
    fn level_ranges_skip_levels_without_metadata() {
        let mut memory = MemoryLayout::default();
        let extents = [(32, 32), (16, 16), (8, 8)];
        let dcc = memory.alloc_meta(MetaUnit::Dcc { width: 8, height: 8 }, &extents, 2, 2);
        let range = SubresourceRange {
            aspects: AspectFlags::COLOR,
            base_mip_level: 0,
            level_count: 3,
            base_array_layer: 1,
            layer_count: 1,
        };
        let ranges = dcc.level_ranges(&range);
        assert_eq!(ranges.len(), 2);
        assert_eq!(ranges[0], (dcc.levels[0].offset + 16, 16));
        assert_eq!(ranges[1], (dcc.levels[1].offset + 4, 4));
    }

    #[test]
    fn cmask_nibbles() {
        let mut memory = MemoryLayout::default();
        let cmask = memory.alloc_meta(MetaUnit::Cmask, &[(24, 8)], 1, 1);
        assert_eq!(cmask.levels[0].slice_size, 4);
        assert_eq!(cmask.unit_offset(0, 0, 0, 0), Some((0, 0)));
        assert_eq!(cmask.unit_offset(0, 0, 8, 0), Some((0, 4)));
        assert_eq!(cmask.unit_offset(0, 0, 16, 7), Some((1, 0)));
    }
}

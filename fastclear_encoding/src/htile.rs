// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! HTILE words.
//!
//! Every 8x8 tile of a depth/stencil surface has one 32-bit HTILE word. Its
//! layout depends on whether the word also tracks stencil:
//!
//! ```text
//! Z only:
//! |31     18|17      4|3     0|
//! +---------+---------+-------+
//! |  Max Z  |  Min Z  | ZMask |
//!
//! Z and stencil (SR1 and SR0 hold VRS rates when VRS is stored in HTILE):
//! |31       12|11 10|9    8|7   6|5   4|3     0|
//! +-----------+-----+------+-----+-----+-------+
//! |  Z Range  |     | SMem | SR1 | SR0 | ZMask |
//! ```
//!
//! A zero `ZMask` marks a depth-cleared tile and a zero `SMem` a
//! stencil-cleared one; `0xf` and `0x3` respectively mark expanded tiles.

use crate::AspectFlags;

/// Largest 14-bit depth value.
const MAX_ZVAL: f32 = 0x3fff as f32;

/// Bits of a shared HTILE word that belong to depth.
pub const HTILE_DEPTH_MASK: u32 = 0xffff_fc0f;
/// Bits of a shared HTILE word that belong to stencil.
pub const HTILE_STENCIL_MASK: u32 = 0x0000_03f0;

/// Which bit layout an HTILE surface uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HtileLayout {
    /// Stencil isn't tracked; the whole word belongs to depth.
    DepthOnly,
    /// Depth and stencil share the word.
    DepthStencil {
        /// The stencil result fields carry variable-rate shading rates.
        vrs: bool,
    },
}

impl HtileLayout {
    pub fn new(has_stencil: bool, has_vrs: bool) -> Self {
        if has_stencil {
            Self::DepthStencil { vrs: has_vrs }
        } else {
            Self::DepthOnly
        }
    }

    pub fn has_stencil(self) -> bool {
        matches!(self, Self::DepthStencil { .. })
    }

    /// Whether the tile's depth decodes to the clear value.
    pub fn depth_cleared(self, raw: u32) -> bool {
        raw & 0xf == 0
    }

    /// Whether the tile's stencil decodes to the clear value.
    pub fn stencil_cleared(self, raw: u32) -> bool {
        match self {
            Self::DepthOnly => false,
            Self::DepthStencil { .. } => HtileZStencil::from_raw(raw).smem == 0,
        }
    }

    /// Marks the tile's depth as expanded.
    pub fn expand_depth(self, raw: u32) -> u32 {
        raw | 0xf
    }

    /// Marks the tile's stencil as expanded.
    pub fn expand_stencil(self, raw: u32) -> u32 {
        match self {
            Self::DepthOnly => raw,
            Self::DepthStencil { .. } => {
                let mut word = HtileZStencil::from_raw(raw);
                word.smem = 0x3;
                word.to_raw()
            }
        }
    }
}

/// HTILE word of a surface without stencil metadata.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HtileZOnly {
    pub zmax: u16,
    pub zmin: u16,
    pub zmask: u8,
}

impl HtileZOnly {
    pub fn to_raw(self) -> u32 {
        ((self.zmax as u32 & 0x3fff) << 18)
            | ((self.zmin as u32 & 0x3fff) << 4)
            | (self.zmask as u32 & 0xf)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self {
            zmax: ((raw >> 18) & 0x3fff) as u16,
            zmin: ((raw >> 4) & 0x3fff) as u16,
            zmask: (raw & 0xf) as u8,
        }
    }
}

/// HTILE word shared by depth and stencil.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HtileZStencil {
    /// Max Z in the upper 14 bits, a 6-bit delta to min Z below it.
    pub zrange: u32,
    pub smem: u8,
    pub sresults: u8,
    pub zmask: u8,
}

impl HtileZStencil {
    pub fn to_raw(self) -> u32 {
        ((self.zrange & 0xfffff) << 12)
            | ((self.smem as u32 & 0x3) << 8)
            | ((self.sresults as u32 & 0xf) << 4)
            | (self.zmask as u32 & 0xf)
    }

    pub fn from_raw(raw: u32) -> Self {
        Self {
            zrange: (raw >> 12) & 0xfffff,
            smem: ((raw >> 8) & 0x3) as u8,
            sresults: ((raw >> 4) & 0xf) as u8,
            zmask: (raw & 0xf) as u8,
        }
    }

    pub fn zmax(self) -> u16 {
        ((self.zrange >> 6) & 0x3fff) as u16
    }

    pub fn delta(self) -> u8 {
        (self.zrange & 0x3f) as u8
    }
}

/// HTILE word that marks every tile as cleared to `depth`.
///
/// `depth` is expected in `[0, 1]`; other values give a well-defined but
/// meaningless word.
pub fn htile_fast_clear_value(depth: f32, layout: HtileLayout) -> u32 {
    // `as` saturates, so out-of-range depths stay within the field.
    let z = (depth * MAX_ZVAL).round() as u32 as u16;
    match layout {
        HtileLayout::DepthOnly => HtileZOnly {
            zmax: z,
            zmin: z,
            zmask: 0,
        }
        .to_raw(),
        HtileLayout::DepthStencil { vrs } => {
            let delta = 0;
            HtileZStencil {
                zrange: ((z as u32) << 6) | delta,
                smem: 0,
                // SR0 and SR1 both 0x3, unless they hold VRS rates.
                sresults: if vrs { 0x3 } else { 0xf },
                zmask: 0,
            }
            .to_raw()
        }
    }
}

/// Bits of the HTILE word a clear of `aspects` may modify.
pub fn htile_mask(layout: HtileLayout, aspects: AspectFlags) -> u32 {
    match layout {
        HtileLayout::DepthOnly => u32::MAX,
        HtileLayout::DepthStencil { .. } => {
            let mut mask = 0;
            if aspects.contains(AspectFlags::DEPTH) {
                mask |= HTILE_DEPTH_MASK;
            }
            if aspects.contains(AspectFlags::STENCIL) {
                mask |= HTILE_STENCIL_MASK;
            }
            mask
        }
    }
}

/// HTILE word of a freshly initialized, fully expanded surface.
pub fn htile_initial_value(layout: HtileLayout) -> u32 {
    match layout {
        HtileLayout::DepthOnly => 0xfffc_000f,
        HtileLayout::DepthStencil { vrs: false } => 0xffff_f3ff,
        // Same as above, with the VRS rates set to 1x1.
        HtileLayout::DepthStencil { vrs: true } => 0xffff_f33f,
    }
}

// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Hardware generation of the graphics block.
///
/// Generations are ordered, so `level >= GfxLevel::Gfx10` reads the way the
/// hardware documentation does.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GfxLevel {
    Gfx8,
    Gfx9,
    Gfx10,
    Gfx10_3,
    Gfx11,
}

impl GfxLevel {
    /// Every supported generation, oldest first.
    pub const ALL: [Self; 5] = [
        Self::Gfx8,
        Self::Gfx9,
        Self::Gfx10,
        Self::Gfx10_3,
        Self::Gfx11,
    ];
}

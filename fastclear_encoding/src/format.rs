// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel formats and their channel descriptions.

use crate::{AspectFlags, GfxLevel};

/// Numeric interpretation of one channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelType {
    /// Padding; the channel carries no data.
    Void,
    Unorm,
    Snorm,
    Uint,
    Sint,
    Float,
    /// Unsigned small float with a 5-bit exponent.
    UFloat,
}

impl ChannelType {
    pub fn is_pure_integer(self) -> bool {
        matches!(self, Self::Uint | Self::Sint)
    }

    pub fn is_normalized(self) -> bool {
        matches!(self, Self::Unorm | Self::Snorm)
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::Snorm | Self::Sint | Self::Float)
    }
}

/// One channel of a format, in memory order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Channel {
    pub ty: ChannelType,
    /// Width in bits.
    pub size: u32,
    /// Offset in bits from the start of the block.
    pub shift: u32,
}

impl Channel {
    const VOID: Self = Self::new(ChannelType::Void, 0, 0);

    const fn new(ty: ChannelType, size: u32, shift: u32) -> Self {
        Self { ty, size, shift }
    }

    /// Mask of the bits this channel occupies, right-aligned.
    pub fn mask(&self) -> u128 {
        if self.size == 0 {
            0
        } else {
            (1u128 << self.size) - 1
        }
    }

    /// The raw bits this channel holds for the value 1.0, or for the largest
    /// representable integer on integer channels.
    pub fn one_bits(&self) -> u128 {
        match self.ty {
            ChannelType::Void => 0,
            ChannelType::Unorm | ChannelType::Uint => self.mask(),
            ChannelType::Snorm | ChannelType::Sint => (1u128 << (self.size - 1)) - 1,
            ChannelType::Float => match self.size {
                16 => 0x3c00,
                32 => 0x3f80_0000,
                _ => unreachable!("unsupported float channel size {}", self.size),
            },
            ChannelType::UFloat => 15 << (self.size - 5),
        }
    }
}

/// Where an RGBA component comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Swizzle {
    X,
    Y,
    Z,
    W,
    Zero,
    One,
    None,
}

impl Swizzle {
    /// Index of the memory-order channel this swizzle selects.
    pub fn channel(self) -> Option<usize> {
        match self {
            Self::X => Some(0),
            Self::Y => Some(1),
            Self::Z => Some(2),
            Self::W => Some(3),
            Self::Zero | Self::One | Self::None => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormatLayout {
    /// Every channel is a plain bit field.
    Plain,
    /// Channels need special packing.
    Other,
}

/// Channel layout of a format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormatDesc {
    pub block_bits: u32,
    pub layout: FormatLayout,
    pub nr_channels: u32,
    /// Channels in memory order, least significant first.
    pub channels: [Channel; 4],
    /// For each of R, G, B and A, the channel it reads.
    pub swizzle: [Swizzle; 4],
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ColorSwap {
    Std,
    Alt,
    StdRev,
    AltRev,
}

impl FormatDesc {
    /// The channels that carry data.
    pub fn active_channels(&self) -> &[Channel] {
        &self.channels[..self.nr_channels as usize]
    }

    fn has_swizzle(&self, component: usize, swizzle: Swizzle) -> bool {
        self.swizzle[component] == swizzle
    }

    /// Component ordering as seen by the color block.
    fn color_swap(&self) -> Option<ColorSwap> {
        use Swizzle::{None as No, W, X, Y, Z};
        match self.nr_channels {
            1 => {
                if self.has_swizzle(0, X) {
                    Some(ColorSwap::Std)
                } else if self.has_swizzle(3, X) {
                    Some(ColorSwap::AltRev)
                } else {
                    None
                }
            }
            2 => {
                if (self.has_swizzle(0, X) && self.has_swizzle(1, Y))
                    || (self.has_swizzle(0, X) && self.has_swizzle(1, No))
                    || (self.has_swizzle(0, No) && self.has_swizzle(1, Y))
                {
                    Some(ColorSwap::Std)
                } else if (self.has_swizzle(0, Y) && self.has_swizzle(1, X))
                    || (self.has_swizzle(0, Y) && self.has_swizzle(1, No))
                    || (self.has_swizzle(0, No) && self.has_swizzle(1, X))
                {
                    Some(ColorSwap::StdRev)
                } else if self.has_swizzle(0, X) && self.has_swizzle(3, Y) {
                    Some(ColorSwap::Alt)
                } else if self.has_swizzle(0, Y) && self.has_swizzle(3, X) {
                    Some(ColorSwap::AltRev)
                } else {
                    None
                }
            }
            3 => {
                if self.has_swizzle(0, X) {
                    Some(ColorSwap::Std)
                } else if self.has_swizzle(0, Z) {
                    Some(ColorSwap::StdRev)
                } else {
                    None
                }
            }
            4 => {
                // The first and last channels may be padding.
                if self.has_swizzle(1, Y) && self.has_swizzle(2, Z) {
                    Some(ColorSwap::Std)
                } else if self.has_swizzle(1, Z) && self.has_swizzle(2, Y) {
                    Some(ColorSwap::StdRev)
                } else if self.has_swizzle(1, Y) && self.has_swizzle(2, X) {
                    Some(ColorSwap::Alt)
                } else if self.has_swizzle(1, Z) && self.has_swizzle(2, W) {
                    Some(ColorSwap::AltRev)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

/// Formats understood by the clear paths.
///
/// Packed formats are named after their most significant component first,
/// so `R5G6B5UnormPack16` stores blue in the low bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Undefined,
    R4G4UnormPack8,
    R8Unorm,
    R8Uint,
    R8Sint,
    R8G8Unorm,
    R5G6B5UnormPack16,
    B5G6R5UnormPack16,
    R16Uint,
    R16Sfloat,
    R8G8B8A8Unorm,
    R8G8B8A8Snorm,
    R8G8B8A8Uint,
    R8G8B8A8Sint,
    B8G8R8A8Unorm,
    A2B10G10R10UnormPack32,
    B10G11R11UfloatPack32,
    E5B9G9R9UfloatPack32,
    R32Uint,
    R32Sint,
    R32Sfloat,
    R16G16B16A16Unorm,
    R16G16B16A16Snorm,
    R16G16B16A16Uint,
    R16G16B16A16Sint,
    R16G16B16A16Sfloat,
    R32G32Uint,
    R32G32Sfloat,
    R32G32B32A32Uint,
    R32G32B32A32Sint,
    R32G32B32A32Sfloat,
    D16Unorm,
    D32Sfloat,
    D24UnormS8Uint,
    D32SfloatS8Uint,
    S8Uint,
}

fn plain(
    block_bits: u32,
    nr_channels: u32,
    channels: [Channel; 4],
    swizzle: [Swizzle; 4],
) -> FormatDesc {
    FormatDesc {
        block_bits,
        layout: FormatLayout::Plain,
        nr_channels,
        channels,
        swizzle,
    }
}

/// `n` identical channels of `size` bits each, packed from bit zero.
fn uniform(ty: ChannelType, size: u32, n: u32) -> FormatDesc {
    use Swizzle::{One, Zero, W, X, Y, Z};
    let c = |i: u32| {
        if i < n {
            Channel::new(ty, size, i * size)
        } else {
            Channel::VOID
        }
    };
    let swizzle = match n {
        1 => [X, Zero, Zero, One],
        2 => [X, Y, Zero, One],
        3 => [X, Y, Z, One],
        _ => [X, Y, Z, W],
    };
    plain(size * n, n, [c(0), c(1), c(2), c(3)], swizzle)
}

impl Format {
    pub fn desc(self) -> FormatDesc {
        use ChannelType::*;
        use Swizzle::{None as No, One, Zero, W, X, Y, Z};
        let ch = Channel::new;
        let void = Channel::VOID;
        match self {
            Self::Undefined => plain(0, 0, [void; 4], [No; 4]),
            Self::R4G4UnormPack8 => plain(
                8,
                2,
                [ch(Unorm, 4, 0), ch(Unorm, 4, 4), void, void],
                [Y, X, Zero, One],
            ),
            Self::R8Unorm => uniform(Unorm, 8, 1),
            Self::R8Uint => uniform(Uint, 8, 1),
            Self::R8Sint => uniform(Sint, 8, 1),
            Self::R8G8Unorm => uniform(Unorm, 8, 2),
            Self::R5G6B5UnormPack16 => plain(
                16,
                3,
                [ch(Unorm, 5, 0), ch(Unorm, 6, 5), ch(Unorm, 5, 11), void],
                [Z, Y, X, One],
            ),
            Self::B5G6R5UnormPack16 => plain(
                16,
                3,
                [ch(Unorm, 5, 0), ch(Unorm, 6, 5), ch(Unorm, 5, 11), void],
                [X, Y, Z, One],
            ),
            Self::R16Uint => uniform(Uint, 16, 1),
            Self::R16Sfloat => uniform(Float, 16, 1),
            Self::R8G8B8A8Unorm => uniform(Unorm, 8, 4),
            Self::R8G8B8A8Snorm => uniform(Snorm, 8, 4),
            Self::R8G8B8A8Uint => uniform(Uint, 8, 4),
            Self::R8G8B8A8Sint => uniform(Sint, 8, 4),
            Self::B8G8R8A8Unorm => FormatDesc {
                swizzle: [Z, Y, X, W],
                ..uniform(Unorm, 8, 4)
            },
            Self::A2B10G10R10UnormPack32 => plain(
                32,
                4,
                [
                    ch(Unorm, 10, 0),
                    ch(Unorm, 10, 10),
                    ch(Unorm, 10, 20),
                    ch(Unorm, 2, 30),
                ],
                [X, Y, Z, W],
            ),
            Self::B10G11R11UfloatPack32 => FormatDesc {
                block_bits: 32,
                layout: FormatLayout::Other,
                nr_channels: 3,
                channels: [ch(UFloat, 11, 0), ch(UFloat, 11, 11), ch(UFloat, 10, 22), void],
                swizzle: [X, Y, Z, One],
            },
            // The shared exponent in the top five bits isn't a channel of
            // its own; packing goes through `f32x3_to_rgb9e5`.
            Self::E5B9G9R9UfloatPack32 => FormatDesc {
                block_bits: 32,
                layout: FormatLayout::Other,
                nr_channels: 3,
                channels: [ch(UFloat, 9, 0), ch(UFloat, 9, 9), ch(UFloat, 9, 18), void],
                swizzle: [X, Y, Z, One],
            },
            Self::R32Uint => uniform(Uint, 32, 1),
            Self::R32Sint => uniform(Sint, 32, 1),
            Self::R32Sfloat => uniform(Float, 32, 1),
            Self::R16G16B16A16Unorm => uniform(Unorm, 16, 4),
            Self::R16G16B16A16Snorm => uniform(Snorm, 16, 4),
            Self::R16G16B16A16Uint => uniform(Uint, 16, 4),
            Self::R16G16B16A16Sint => uniform(Sint, 16, 4),
            Self::R16G16B16A16Sfloat => uniform(Float, 16, 4),
            Self::R32G32Uint => uniform(Uint, 32, 2),
            Self::R32G32Sfloat => uniform(Float, 32, 2),
            Self::R32G32B32A32Uint => uniform(Uint, 32, 4),
            Self::R32G32B32A32Sint => uniform(Sint, 32, 4),
            Self::R32G32B32A32Sfloat => uniform(Float, 32, 4),
            Self::D16Unorm => plain(16, 1, [ch(Unorm, 16, 0), void, void, void], [X, No, No, No]),
            Self::D32Sfloat => plain(32, 1, [ch(Float, 32, 0), void, void, void], [X, No, No, No]),
            Self::D24UnormS8Uint => plain(
                32,
                2,
                [ch(Unorm, 24, 0), ch(Uint, 8, 24), void, void],
                [X, Y, No, No],
            ),
            Self::D32SfloatS8Uint => plain(
                64,
                2,
                [ch(Float, 32, 0), ch(Uint, 8, 32), void, void],
                [X, Y, No, No],
            ),
            Self::S8Uint => plain(8, 1, [ch(Uint, 8, 0), void, void, void], [No, X, No, No]),
        }
    }

    /// Size of one texel block in bytes.
    pub fn block_size(self) -> u32 {
        self.desc().block_bits / 8
    }

    pub fn has_depth(self) -> bool {
        matches!(
            self,
            Self::D16Unorm | Self::D32Sfloat | Self::D24UnormS8Uint | Self::D32SfloatS8Uint
        )
    }

    pub fn has_stencil(self) -> bool {
        matches!(
            self,
            Self::D24UnormS8Uint | Self::D32SfloatS8Uint | Self::S8Uint
        )
    }

    pub fn is_depth_or_stencil(self) -> bool {
        self.has_depth() || self.has_stencil()
    }

    pub fn is_color(self) -> bool {
        self != Self::Undefined && !self.is_depth_or_stencil()
    }

    pub fn aspects(self) -> AspectFlags {
        let mut aspects = AspectFlags::empty();
        if self.is_color() {
            aspects |= AspectFlags::COLOR;
        }
        if self.has_depth() {
            aspects |= AspectFlags::DEPTH;
        }
        if self.has_stencil() {
            aspects |= AspectFlags::STENCIL;
        }
        aspects
    }

    /// Whether the format can be bound as a color or depth/stencil attachment.
    pub fn is_renderable(self, gfx_level: GfxLevel) -> bool {
        match self {
            Self::Undefined | Self::R4G4UnormPack8 => false,
            Self::E5B9G9R9UfloatPack32 => gfx_level >= GfxLevel::Gfx10_3,
            _ => true,
        }
    }

    /// Whether compute shaders can store to an image of this format.
    pub fn is_storable(self) -> bool {
        self.is_color() && !matches!(self, Self::R4G4UnormPack8 | Self::E5B9G9R9UfloatPack32)
    }

    /// The depth channel and the stencil channel, in that order, when present.
    pub fn depth_stencil_channels(self) -> (Option<Channel>, Option<Channel>) {
        let desc = self.desc();
        match self {
            Self::D16Unorm | Self::D32Sfloat => (Some(desc.channels[0]), None),
            Self::D24UnormS8Uint | Self::D32SfloatS8Uint => {
                (Some(desc.channels[0]), Some(desc.channels[1]))
            }
            Self::S8Uint => (None, Some(desc.channels[0])),
            _ => (None, None),
        }
    }

    /// Whether the color block sees alpha in the most significant channel.
    pub fn alpha_is_on_msb(self, gfx_level: GfxLevel) -> bool {
        if gfx_level >= GfxLevel::Gfx11 {
            return false;
        }
        let desc = self.desc();
        // Formats with a single channel treat it as alpha when it is read from X.
        if gfx_level >= GfxLevel::Gfx10 && desc.nr_channels == 1 {
            return desc.swizzle[3] == Swizzle::X;
        }
        matches!(desc.color_swap(), Some(ColorSwap::Std | ColorSwap::Alt))
    }

    /// Key of the fragment shader output class used to clear this format,
    /// or `None` for formats that aren't color.
    pub fn meta_fs_key(self) -> Option<MetaFsKey> {
        let key = match self {
            Self::Undefined
            | Self::D16Unorm
            | Self::D32Sfloat
            | Self::D24UnormS8Uint
            | Self::D32SfloatS8Uint
            | Self::S8Uint => return None,
            Self::R32Uint | Self::R32Sint | Self::R32Sfloat => MetaFsKey::Float32R,
            Self::R32G32Uint | Self::R32G32Sfloat => MetaFsKey::Float32Gr,
            Self::R32G32B32A32Uint | Self::R32G32B32A32Sint | Self::R32G32B32A32Sfloat => {
                MetaFsKey::Float32Abgr
            }
            Self::R16G16B16A16Unorm => MetaFsKey::Unorm16Abgr,
            Self::R16G16B16A16Snorm => MetaFsKey::Snorm16Abgr,
            Self::R16Uint | Self::R16G16B16A16Uint => MetaFsKey::Uint16Abgr,
            Self::R16G16B16A16Sint => MetaFsKey::Sint16Abgr,
            Self::R8Uint | Self::R8G8B8A8Uint => MetaFsKey::Uint8Abgr,
            Self::R8Sint | Self::R8G8B8A8Sint => MetaFsKey::Sint8Abgr,
            Self::R4G4UnormPack8
            | Self::R8Unorm
            | Self::R8G8Unorm
            | Self::R5G6B5UnormPack16
            | Self::B5G6R5UnormPack16
            | Self::R16Sfloat
            | Self::R8G8B8A8Unorm
            | Self::R8G8B8A8Snorm
            | Self::B8G8R8A8Unorm
            | Self::A2B10G10R10UnormPack32
            | Self::B10G11R11UfloatPack32
            | Self::E5B9G9R9UfloatPack32
            | Self::R16G16B16A16Sfloat => MetaFsKey::Fp16Abgr,
        };
        Some(key)
    }
}

pub const NUM_META_FS_KEYS: usize = 10;

/// How a clear fragment shader exports its color.
///
/// Formats with the same key share a clear pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetaFsKey {
    Float32R,
    Float32Gr,
    Fp16Abgr,
    Unorm16Abgr,
    Snorm16Abgr,
    Uint16Abgr,
    Sint16Abgr,
    Float32Abgr,
    Uint8Abgr,
    Sint8Abgr,
}

impl MetaFsKey {
    pub const ALL: [Self; NUM_META_FS_KEYS] = [
        Self::Float32R,
        Self::Float32Gr,
        Self::Fp16Abgr,
        Self::Unorm16Abgr,
        Self::Snorm16Abgr,
        Self::Uint16Abgr,
        Self::Sint16Abgr,
        Self::Float32Abgr,
        Self::Uint8Abgr,
        Self::Sint8Abgr,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// A representative format used when building the pipeline for this key.
    pub fn exemplar(self) -> Format {
        match self {
            Self::Float32R => Format::R32Sfloat,
            Self::Float32Gr => Format::R32G32Sfloat,
            Self::Fp16Abgr => Format::R8G8B8A8Unorm,
            Self::Unorm16Abgr => Format::R16G16B16A16Unorm,
            Self::Snorm16Abgr => Format::R16G16B16A16Snorm,
            Self::Uint16Abgr => Format::R16G16B16A16Uint,
            Self::Sint16Abgr => Format::R16G16B16A16Sint,
            Self::Float32Abgr => Format::R32G32B32A32Sfloat,
            Self::Uint8Abgr => Format::R8G8B8A8Uint,
            Self::Sint8Abgr => Format::R8G8B8A8Sint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Format, MetaFsKey};
    use crate::GfxLevel;

    #[test]
    fn block_sizes() {
        assert_eq!(Format::R4G4UnormPack8.block_size(), 1);
        assert_eq!(Format::R5G6B5UnormPack16.block_size(), 2);
        assert_eq!(Format::B8G8R8A8Unorm.block_size(), 4);
        assert_eq!(Format::R16G16B16A16Sfloat.block_size(), 8);
        assert_eq!(Format::R32G32B32A32Uint.block_size(), 16);
        assert_eq!(Format::D32SfloatS8Uint.block_size(), 8);
    }

    #[test]
    fn alpha_position() {
        for gfx in [GfxLevel::Gfx8, GfxLevel::Gfx9, GfxLevel::Gfx10_3] {
            assert!(Format::R8G8B8A8Unorm.alpha_is_on_msb(gfx));
            assert!(Format::B8G8R8A8Unorm.alpha_is_on_msb(gfx));
            assert!(Format::A2B10G10R10UnormPack32.alpha_is_on_msb(gfx));
            assert!(!Format::R5G6B5UnormPack16.alpha_is_on_msb(gfx));
            assert!(!Format::R4G4UnormPack8.alpha_is_on_msb(gfx));
        }
        // Single channel formats read X as red from GFX10 on.
        assert!(Format::R8Unorm.alpha_is_on_msb(GfxLevel::Gfx9));
        assert!(!Format::R8Unorm.alpha_is_on_msb(GfxLevel::Gfx10));
        assert!(!Format::R8G8B8A8Unorm.alpha_is_on_msb(GfxLevel::Gfx11));
    }

    #[test]
    fn fs_key_exemplars_map_back() {
        for key in MetaFsKey::ALL {
            assert_eq!(key.exemplar().meta_fs_key(), Some(key));
        }
        assert_eq!(Format::D32Sfloat.meta_fs_key(), None);
    }

    #[test]
    fn shared_exponent_support() {
        let format = Format::E5B9G9R9UfloatPack32;
        assert_eq!(format.block_size(), 4);
        assert!(!format.is_storable());
        assert!(!format.is_renderable(GfxLevel::Gfx10));
        assert!(format.is_renderable(GfxLevel::Gfx10_3));
        assert!(!Format::R4G4UnormPack8.is_renderable(GfxLevel::Gfx11));
        assert!(Format::R32Uint.is_storable());
    }

    #[test]
    fn aspects() {
        assert!(Format::D32SfloatS8Uint.has_depth());
        assert!(Format::D32SfloatS8Uint.has_stencil());
        assert!(!Format::D16Unorm.has_stencil());
        assert!(Format::S8Uint.is_depth_or_stencil());
        assert!(!Format::Undefined.is_color());
        assert!(Format::R8Uint.is_color());
    }
}

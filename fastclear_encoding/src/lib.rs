// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Metadata encodings used by GPU fast clears.
//!
//! A fast clear never touches the texels of a surface. It rewrites the
//! compression metadata that sits next to them (HTILE for depth/stencil,
//! DCC and CMASK for color) so that every tile decodes to the clear value.
//! This crate computes those metadata words from a clear value, together
//! with the format descriptions and clear-color packing they depend on.
//!
//! Everything here is a pure function of its inputs.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
// Feel free to send a PR that solves one or more of these.
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    clippy::cast_possible_truncation,
    clippy::missing_assert_message,
    reason = "Deferred"
)]

mod cmask;
mod dcc;
mod format;
mod gfx;
mod htile;
mod math;
mod pack;
mod value;

pub use cmask::cmask_fast_clear_value;
pub use dcc::{DccClearCode, DccDecoded, DccEncoder, DccFastClear, DccImageInfo};
pub use format::{
    Channel, ChannelType, Format, FormatDesc, FormatLayout, MetaFsKey, Swizzle, NUM_META_FS_KEYS,
};
pub use gfx::GfxLevel;
pub use htile::{
    htile_fast_clear_value, htile_initial_value, htile_mask, HtileLayout, HtileZOnly,
    HtileZStencil, HTILE_DEPTH_MASK, HTILE_STENCIL_MASK,
};
pub use math::{
    f16_to_f32, f32_to_f16, f32_to_ufloat, f32x3_to_rgb9e5, rgb9e5_to_f32x3, ufloat_to_f32,
};
pub use pack::{pack_clear_color, pack_rgba, unpack_rgba};
pub use value::{AspectFlags, ClearColorValue, ClearDepthStencilValue};

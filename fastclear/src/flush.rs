// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cache flush bits and the access masks they are derived from.

use crate::Image;

bitflags::bitflags! {
    /// Cache flushes and pipeline waits a command buffer applies before its
    /// next draw or dispatch.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FlushBits: u32 {
        const INV_ICACHE = 1 << 0;
        const INV_SCACHE = 1 << 1;
        const INV_VCACHE = 1 << 2;
        const INV_L2 = 1 << 3;
        const WB_L2 = 1 << 4;
        const INV_L2_METADATA = 1 << 5;
        const FLUSH_AND_INV_CB_META = 1 << 6;
        const FLUSH_AND_INV_DB_META = 1 << 7;
        const FLUSH_AND_INV_DB = 1 << 8;
        const FLUSH_AND_INV_CB = 1 << 9;
        const VS_PARTIAL_FLUSH = 1 << 10;
        const PS_PARTIAL_FLUSH = 1 << 11;
        const CS_PARTIAL_FLUSH = 1 << 12;
    }
}

bitflags::bitflags! {
    /// Memory accesses a flush must make visible.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const SHADER_READ = 1 << 0;
        const SHADER_WRITE = 1 << 1;
        const COLOR_ATTACHMENT_WRITE = 1 << 2;
        const DEPTH_STENCIL_ATTACHMENT_WRITE = 1 << 3;
    }
}

/// Flushes that make writes of `access` to `image` available.
pub(crate) fn src_access_flush(access: AccessFlags, image: Option<&Image>) -> FlushBits {
    let l2_coherent = image.is_some_and(Image::is_l2_coherent);
    let mut bits = FlushBits::empty();
    if access.contains(AccessFlags::SHADER_WRITE) && !l2_coherent {
        bits |= FlushBits::WB_L2;
    }
    if access.contains(AccessFlags::COLOR_ATTACHMENT_WRITE) {
        bits |= FlushBits::FLUSH_AND_INV_CB;
        if image.map_or(true, |image| image.has_dcc() || image.has_cmask()) {
            bits |= FlushBits::FLUSH_AND_INV_CB_META;
        }
    }
    if access.contains(AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE) {
        bits |= FlushBits::FLUSH_AND_INV_DB;
        if image.map_or(true, Image::has_htile) {
            bits |= FlushBits::FLUSH_AND_INV_DB_META;
        }
    }
    bits
}

/// Invalidations that make available data visible to `access` on `image`.
pub(crate) fn dst_access_flush(access: AccessFlags, image: Option<&Image>) -> FlushBits {
    let l2_coherent = image.is_some_and(Image::is_l2_coherent);
    let mut bits = FlushBits::empty();
    if access.intersects(AccessFlags::SHADER_READ | AccessFlags::SHADER_WRITE) {
        bits |= FlushBits::INV_VCACHE;
        if !l2_coherent {
            bits |= FlushBits::INV_L2;
        }
    }
    if access.contains(AccessFlags::SHADER_READ) {
        bits |= FlushBits::INV_SCACHE;
        // Shader reads of compressed metadata go through the metadata cache.
        if image.is_some_and(|image| image.has_dcc() || image.has_htile()) {
            bits |= FlushBits::INV_L2_METADATA;
        }
    }
    bits
}

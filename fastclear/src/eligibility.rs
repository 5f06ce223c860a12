// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Whether a clear may take the fast path.

use fastclear_encoding::{
    pack_clear_color, AspectFlags, ClearColorValue, ClearDepthStencilValue, DccImageInfo,
    GfxLevel,
};

use crate::{
    layout_can_fast_clear, layout_is_htile_compressed, queue_family_mask, ClearRect,
    CommandBuffer, ImageLayout, ImageView, Rect2D,
};

/// The clear rectangle covers the whole base level of `view`.
fn covers_view(view: &ImageView, rect: &ClearRect) -> bool {
    let extent = view.image().extent().minify(view.base_mip_level());
    rect.rect == Rect2D::from_extent(extent.width, extent.height)
}

/// The clear reaches every layer of the image.
fn covers_layers(view: &ImageView, rect: &ClearRect, view_mask: u32) -> bool {
    let layers = view.image().array_layers();
    if view_mask != 0 {
        layers < 32 && view_mask == (1 << layers) - 1
    } else {
        rect.base_array_layer == 0 && rect.layer_count == layers
    }
}

impl CommandBuffer<'_> {
    /// Whether clearing `view` to `color` over `rect` can be done by only
    /// rewriting metadata.
    pub fn can_fast_clear_color(
        &self,
        view: Option<&ImageView>,
        layout: ImageLayout,
        rect: &ClearRect,
        color: &ClearColorValue,
        view_mask: u32,
    ) -> bool {
        let Some(view) = view.filter(|view| view.supports_fast_clear()) else {
            return false;
        };
        let image = view.image();
        let level = view.base_mip_level();

        if !layout_can_fast_clear(image, level, layout, queue_family_mask(image, self.queue())) {
            return false;
        }
        if !covers_view(view, rect) || !covers_layers(view, rect, view_mask) {
            return false;
        }

        if !image.supports_comp_to_single() {
            let Some(packed) = pack_clear_color(view.format(), color) else {
                return false;
            };
            // Without a register, only colors that pack to zero decode right.
            if !image.has_clear_value() && packed != [0, 0] {
                return false;
            }
        }

        if image.dcc_enabled(level) {
            let info = DccImageInfo {
                format: view.format(),
                sign_reinterpret: image.dcc_sign_reinterpret(),
                comp_to_single: image.supports_comp_to_single(),
            };
            if self.device.dcc_encoder().encode(&info, color).is_none() {
                return false;
            }

            if image.mip_levels() > 1 {
                let last_level = view.base_mip_level() + view.level_count() - 1;
                if image.gfx_level() >= GfxLevel::Gfx9 {
                    // Levels past the metadata ones are laid out interleaved.
                    if last_level >= image.num_meta_levels() {
                        return false;
                    }
                } else if let Some(dcc) = image.dcc_surface() {
                    let unaddressable = view
                        .range()
                        .levels()
                        .any(|l| dcc.levels.get(l as usize).map_or(true, |meta| meta.size == 0));
                    if unaddressable {
                        return false;
                    }
                }
            }
        }

        true
    }

    /// Whether clearing `aspects` of `view` to `value` over `rect` can be done
    /// by only rewriting HTILE.
    pub fn can_fast_clear_depth(
        &self,
        view: Option<&ImageView>,
        layout: ImageLayout,
        aspects: AspectFlags,
        rect: &ClearRect,
        value: ClearDepthStencilValue,
        view_mask: u32,
    ) -> bool {
        let Some(view) = view.filter(|view| view.supports_fast_clear()) else {
            return false;
        };
        let image = view.image();

        if !image.htile_enabled(view.base_mip_level()) {
            return false;
        }
        if !layout_is_htile_compressed(image, layout, queue_family_mask(image, self.queue())) {
            return false;
        }
        if !covers_view(view, rect) || !covers_layers(view, rect, view_mask) {
            return false;
        }

        // HTILE only encodes depths in [0, 1]. Others are only valid with
        // unrestricted depth ranges, and those are drawn.
        if aspects.contains(AspectFlags::DEPTH) && !(0.0..=1.0).contains(&value.depth) {
            return false;
        }

        // Texture units decoding HTILE only know the corner values.
        if image.is_tc_compatible_htile()
            && ((aspects.contains(AspectFlags::DEPTH) && value.depth != 0.0 && value.depth != 1.0)
                || (aspects.contains(AspectFlags::STENCIL) && value.stencil != 0))
        {
            return false;
        }

        if image.mip_levels() > 1 {
            let last_level = view.base_mip_level() + view.level_count() - 1;
            if last_level >= image.num_meta_levels() {
                return false;
            }
        }

        true
    }
}

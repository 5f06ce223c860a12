// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use fastclear_encoding::{pack_rgba, ClearColorValue};

use super::{invocations, CpuBinding, CpuImage};
use crate::{ClearImagePush, IMAGE_WG_SIZE};

fn clear_image_main(texel: &[u8; 16], slice: u32, global_id: [u32; 3], image: &CpuImage<'_>) {
    for sample in 0..image.samples {
        image.write(global_id[0], global_id[1], slice, sample, texel);
    }
}

/// Resources: push constants ([`ClearImagePush`]), the storage image.
pub fn clear_image(workgroups: [u32; 3], resources: &[CpuBinding<'_>]) {
    let push: ClearImagePush = resources[0].as_typed();
    let image = resources[1].as_image();
    let texel = pack_rgba(image.format, &ClearColorValue::uint32(push.color));
    for global_id in invocations(workgroups, IMAGE_WG_SIZE) {
        clear_image_main(&texel, push.slice, global_id, image);
    }
}

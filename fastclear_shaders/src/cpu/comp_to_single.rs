// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{invocations, CpuBinding, CpuImage};
use crate::{CompToSinglePush, IMAGE_WG_SIZE};

fn comp_to_single_main(push: &CompToSinglePush, global_id: [u32; 3], image: &CpuImage<'_>) {
    let x = global_id[0] * push.block_width;
    let y = global_id[1] * push.block_height;
    let texel: Vec<u8> = push.color.iter().flat_map(|c| c.to_le_bytes()).collect();
    // Only sample 0 holds the block's value.
    image.write(x, y, global_id[2], 0, &texel);
}

/// Resources: push constants ([`CompToSinglePush`]), the storage image.
///
/// The image is bound with an unsigned integer format of the same texel
/// size, so the color components are stored as raw bits.
pub fn dcc_comp_to_single(workgroups: [u32; 3], resources: &[CpuBinding<'_>]) {
    let push: CompToSinglePush = resources[0].as_typed();
    let image = resources[1].as_image();
    for global_id in invocations(workgroups, IMAGE_WG_SIZE) {
        comp_to_single_main(&push, global_id, image);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use fastclear_encoding::Format;

    use super::dcc_comp_to_single;
    use crate::cpu::{CpuBinding, CpuImage};
    use crate::CompToSinglePush;

    #[test]
    fn writes_first_texel_of_each_block() {
        let data = RefCell::new(vec![0_u8; 32 * 16 * 4]);
        let image = CpuImage {
            data: &data,
            offset: 0,
            width: 32,
            height: 16,
            layers: 1,
            samples: 1,
            format: Format::R32Uint,
        };
        let push = CompToSinglePush {
            block_width: 8,
            block_height: 8,
            color: [0xdead_beef, 0, 0, 0],
        };
        let resources = [
            CpuBinding::Buffer(bytemuck::bytes_of(&push)),
            CpuBinding::Image(image),
        ];
        dcc_comp_to_single([1, 1, 1], &resources);
        for y in 0..16 {
            for x in 0..32 {
                let texel = image.read(x, y, 0, 0);
                let expected: u32 = if x % 8 == 0 && y % 8 == 0 {
                    0xdead_beef
                } else {
                    0
                };
                assert_eq!(texel[..4], expected.to_le_bytes(), "texel ({x}, {y})");
            }
        }
    }

    #[test]
    fn only_sample_zero_is_written() {
        let data = RefCell::new(vec![0_u8; 8 * 8 * 4 * 8]);
        let image = CpuImage {
            data: &data,
            offset: 0,
            width: 8,
            height: 8,
            layers: 1,
            samples: 4,
            format: Format::R32G32Uint,
        };
        let push = CompToSinglePush {
            block_width: 8,
            block_height: 4,
            color: [1, 2, 3, 4],
        };
        let resources = [
            CpuBinding::Buffer(bytemuck::bytes_of(&push)),
            CpuBinding::Image(image),
        ];
        dcc_comp_to_single([1, 1, 1], &resources);
        assert_eq!(image.read(0, 4, 0, 0)[..8], [1, 0, 0, 0, 2, 0, 0, 0]);
        assert_eq!(image.read(0, 4, 0, 1), [0; 16]);
    }
}

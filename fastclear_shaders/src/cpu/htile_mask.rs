// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::{invocations, CpuBinding};
use crate::{HtileMaskPush, HTILE_MASK_BYTES_PER_INVOCATION, HTILE_MASK_WG_SIZE};

fn htile_mask_main(push: &HtileMaskPush, global_id: u32, htile: &mut [u8]) {
    let offset = global_id as usize * HTILE_MASK_BYTES_PER_INVOCATION as usize;
    for i in 0..4 {
        let start = offset + i * 4;
        let Some(dword) = htile.get_mut(start..start + 4) else {
            return;
        };
        let old = u32::from_le_bytes([dword[0], dword[1], dword[2], dword[3]]);
        let new = (old & push.inverse_mask) | push.value;
        dword.copy_from_slice(&new.to_le_bytes());
    }
}

/// Resources: push constants ([`HtileMaskPush`]), the HTILE range.
pub fn htile_mask(workgroups: [u32; 3], resources: &[CpuBinding<'_>]) {
    let push: HtileMaskPush = resources[0].as_typed();
    let mut htile = resources[1].as_range_mut();
    for [x, _, _] in invocations(workgroups, [HTILE_MASK_WG_SIZE, 1, 1]) {
        htile_mask_main(&push, x, &mut htile);
    }
}

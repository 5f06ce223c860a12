// Copyright 2025 the Fastclear Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Fill word for a CMASK fast clear.
///
/// Without DCC every tile nibble is set to "cleared". With DCC the CMASK only
/// tracks FMASK compression: multisampled images mark it expanded but
/// compressed, single-sampled ones mark it fully expanded.
pub fn cmask_fast_clear_value(has_dcc: bool, samples: u32) -> u32 {
    if !has_dcc {
        0
    } else if samples > 1 {
        0xcccc_cccc
    } else {
        0xffff_ffff
    }
}

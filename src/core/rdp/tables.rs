// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Precomputed lookup tables
//!
//! Every table is rebuilt from constants by [`Tables::new`], so two
//! contexts (or two `init` calls) always agree bit for bit.

/// Reciprocal table: base value per 6-bit normalized mantissa
const NORM_POINT_TABLE: [i32; 64] = [
    0x4000, 0x3f04, 0x3e10, 0x3d22, 0x3c3c, 0x3b5d, 0x3a83, 0x39b1, 0x38e4, 0x381c, 0x375a, 0x369d,
    0x35e5, 0x3532, 0x3483, 0x33d9, 0x3333, 0x3291, 0x31f4, 0x3159, 0x30c3, 0x3030, 0x2fa1, 0x2f15,
    0x2e8c, 0x2e06, 0x2d83, 0x2d03, 0x2c86, 0x2c0b, 0x2b93, 0x2b1e, 0x2aab, 0x2a3a, 0x29cc, 0x2960,
    0x28f6, 0x288e, 0x2828, 0x27c4, 0x2762, 0x2702, 0x26a4, 0x2648, 0x25ed, 0x2594, 0x253d, 0x24e7,
    0x2492, 0x243f, 0x23ee, 0x239e, 0x234f, 0x2302, 0x22b6, 0x226c, 0x2222, 0x21da, 0x2193, 0x214d,
    0x2108, 0x20c5, 0x2082, 0x2041,
];

/// Reciprocal table: slope per 6-bit normalized mantissa (10-bit, negative)
const NORM_SLOPE_TABLE: [i32; 64] = [
    0xf03, 0xf0b, 0xf11, 0xf19, 0xf20, 0xf25, 0xf2d, 0xf32, 0xf37, 0xf3d, 0xf42, 0xf47, 0xf4c,
    0xf50, 0xf55, 0xf59, 0xf5d, 0xf62, 0xf64, 0xf69, 0xf6c, 0xf70, 0xf73, 0xf76, 0xf79, 0xf7c,
    0xf7f, 0xf82, 0xf84, 0xf87, 0xf8a, 0xf8c, 0xf8e, 0xf91, 0xf93, 0xf95, 0xf97, 0xf99, 0xf9b,
    0xf9d, 0xf9f, 0xfa1, 0xfa3, 0xfa4, 0xfa6, 0xfa8, 0xfa9, 0xfaa, 0xfac, 0xfae, 0xfaf, 0xfb0,
    0xfb2, 0xfb3, 0xfb5, 0xfb5, 0xfb7, 0xfb8, 0xfb9, 0xfba, 0xfbc, 0xfbc, 0xfbe, 0xfbe,
];

/// 4x4 ordered dither matrix
pub const BAYER_MATRIX: [u8; 16] = [0, 4, 1, 5, 4, 0, 5, 1, 3, 7, 2, 6, 7, 3, 6, 2];

/// 4x4 "magic square" dither matrix
pub const MAGIC_MATRIX: [u8; 16] = [0, 6, 1, 7, 4, 2, 5, 3, 3, 5, 2, 4, 7, 1, 6, 0];

/// Depth decompression: shift and offset per 3-bit exponent
const Z_DEC_TABLE: [(u32, u32); 8] = [
    (6, 0x00000),
    (5, 0x20000),
    (4, 0x30000),
    (3, 0x38000),
    (2, 0x3c000),
    (1, 0x3e000),
    (0, 0x3f000),
    (0, 0x3f800),
];

/// Coverage facts for one 8-bit subpixel mask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CvMaskDerivative {
    /// Number of covered subpixels (0-8)
    pub cvg: u8,
    /// Top-left subpixel is covered
    pub cvbit: u8,
    /// Centroid offset, x (0-3)
    pub xoff: u8,
    /// Centroid offset, y (0-3)
    pub yoff: u8,
}

/// All lookup tables used by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tables {
    /// Index of the highest set bit among bits 7..1 (0 for 0 and 1)
    pub log2table: [i32; 256],
    /// 5-bit to 8-bit channel expansion
    pub replicated_rgba: [i32; 32],
    /// Wrap masks by mask width (width 0 means no mask: 0x3ff)
    pub maskbits_table: [i32; 16],
    /// `shift | (reciprocal << 4)` for every 15-bit W
    pub tcdiv_table: Vec<i32>,
    /// 9-bit combiner result clamped to 0..=255
    pub special_9bit_clamptable: [i32; 512],
    /// 9-bit operand sign-extended (0x180..0x1ff are negative)
    pub special_9bit_exttable: [i32; 512],
    /// 18-bit depth to 14-bit compressed depth (shifted into bits 15..2)
    pub z_com_table: Vec<u16>,
    /// 14-bit compressed depth to 18-bit depth
    pub z_complete_dec_table: Vec<u32>,
    /// Hardware blender divider, indexed by `(sum << 11) | numerator`
    pub bldiv_hwaccurate_table: Vec<u8>,
    /// Coverage facts per 8-bit subpixel mask
    pub cvarray: [CvMaskDerivative; 256],
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}

impl Tables {
    /// Build every table from constants
    pub fn new() -> Self {
        let mut log2table = [0i32; 256];
        for (i, entry) in log2table.iter_mut().enumerate().skip(2) {
            *entry = (1..=7).rev().find(|&k| (i >> k) & 1 != 0).unwrap_or(0);
        }

        let mut replicated_rgba = [0i32; 32];
        for (i, entry) in replicated_rgba.iter_mut().enumerate() {
            let i = i as i32;
            *entry = (i << 3) | ((i >> 2) & 7);
        }

        let mut maskbits_table = [0i32; 16];
        maskbits_table[0] = 0x3ff;
        for (i, entry) in maskbits_table.iter_mut().enumerate().skip(1) {
            *entry = (0xffff >> (16 - i)) & 0x3ff;
        }

        let mut special_9bit_clamptable = [0i32; 512];
        let mut special_9bit_exttable = [0i32; 512];
        for i in 0..512 {
            special_9bit_clamptable[i] = match (i >> 7) & 3 {
                0 | 1 => (i & 0xff) as i32,
                2 => 0xff,
                _ => 0,
            };
            let i = i as i32;
            special_9bit_exttable[i as usize] = if (i & 0x180) == 0x180 {
                i | !0x1ff
            } else {
                i & 0x1ff
            };
        }

        Self {
            log2table,
            replicated_rgba,
            maskbits_table,
            tcdiv_table: build_tcdiv_table(),
            special_9bit_clamptable,
            special_9bit_exttable,
            z_com_table: build_z_com_table(),
            z_complete_dec_table: build_z_dec_table(),
            bldiv_hwaccurate_table: build_bldiv_table(),
            cvarray: build_cvarray(),
        }
    }
}

/// Reciprocal of every 15-bit W: normalize, look up the mantissa's base
/// and slope, interpolate over the next 8 bits
fn build_tcdiv_table() -> Vec<i32> {
    (0..0x8000i32)
        .map(|i| {
            let mut k = 1;
            while k <= 14 && (i << k) & 0x8000 == 0 {
                k += 1;
            }
            let shift = k - 1;
            let normout = (i << shift) & 0x3fff;
            let wnorm = (normout & 0xff) << 2;
            let normout = (normout >> 8) as usize;

            let point = NORM_POINT_TABLE[normout];
            let slope = (NORM_SLOPE_TABLE[normout] | !0x3ff) + 1;

            let tlu_rcp = (((slope * wnorm) >> 10) + point) & 0x7fff;
            shift | (tlu_rcp << 4)
        })
        .collect()
}

/// Floating-point style depth compression: 3-bit exponent from the count
/// of leading ones, 11-bit mantissa
fn build_z_com_table() -> Vec<u16> {
    (0..0x40000u32)
        .map(|z| {
            let altmem = match (z >> 11) & 0x7f {
                0x00..=0x3f => (z >> 4) & 0x1ffc,
                0x40..=0x5f => ((z >> 3) & 0x1ffc) | 0x2000,
                0x60..=0x6f => ((z >> 2) & 0x1ffc) | 0x4000,
                0x70..=0x77 => ((z >> 1) & 0x1ffc) | 0x6000,
                0x78..=0x7b => (z & 0x1ffc) | 0x8000,
                0x7c..=0x7d => ((z << 1) & 0x1ffc) | 0xa000,
                0x7e => ((z << 2) & 0x1ffc) | 0xc000,
                _ => ((z << 2) & 0x1ffc) | 0xe000,
            };
            altmem as u16
        })
        .collect()
}

fn build_z_dec_table() -> Vec<u32> {
    (0..0x4000u32)
        .map(|i| {
            let (shift, add) = Z_DEC_TABLE[((i >> 11) & 7) as usize];
            let mantissa = i & 0x7ff;
            ((mantissa << shift) + add) & 0x3ffff
        })
        .collect()
}

/// Bit-serial divider of the blender: 8 quotient bits of
/// `n / (d + 1)` with the hardware's non-restoring carry chain
fn build_bldiv_table() -> Vec<u8> {
    (0..0x8000i32)
        .map(|i| {
            let d = (i >> 11) & 0xf;
            let n = i & 0x7ff;
            let invd = !d & 0xf;

            let mut ps = [0i32; 9];
            let mut res = 0i32;
            let temp = invd + (n >> 8) + 1;
            ps[0] = temp & 7;
            for k in 0..8 {
                let nbit = (n >> (7 - k)) & 1;
                let temp = if res & (0x100 >> k) != 0 {
                    invd + (ps[k] << 1) + nbit + 1
                } else {
                    d + (ps[k] << 1) + nbit
                };
                ps[k + 1] = temp & 7;
                if temp & 0x10 != 0 {
                    res |= 1 << (7 - k);
                }
            }
            res as u8
        })
        .collect()
}

/// Spread an 8-bit coverage mask onto the 4x4 subpixel grid
///
/// Bits land on alternating columns of each row: the RDP samples two
/// subpixels per subscanline, offset by one column between rows.
pub fn decompress_cvmask_frombyte(x: u8) -> u16 {
    let x = x as u16;
    (x & 1)
        | ((x & 2) << 4)
        | (x & 4)
        | ((x & 8) << 4)
        | ((x & 0x10) << 4)
        | ((x & 0x20) << 8)
        | ((x & 0x40) << 4)
        | ((x & 0x80) << 8)
}

fn build_cvarray() -> [CvMaskDerivative; 256] {
    const YARRAY: [u8; 16] = [0, 0, 1, 0, 2, 0, 1, 0, 3, 0, 1, 0, 2, 0, 1, 0];
    const XARRAY: [u8; 16] = [0, 3, 2, 2, 1, 1, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0];

    let mut cvarray = [CvMaskDerivative::default(); 256];
    for (i, entry) in cvarray.iter_mut().enumerate() {
        let mask = decompress_cvmask_frombyte(i as u8);

        let mut masky = 0usize;
        for k in 0..4 {
            if mask & (0xf000 >> (k << 2)) != 0 {
                masky |= 1 << k;
            }
        }
        let offy = YARRAY[masky];
        let maskx = (mask & (0xf000 >> (offy << 2))) >> ((offy ^ 3) << 2);

        *entry = CvMaskDerivative {
            cvg: (i as u8).count_ones() as u8,
            cvbit: ((i >> 7) & 1) as u8,
            xoff: XARRAY[maskx as usize],
            yoff: offy,
        };
    }
    cvarray
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_deterministic() {
        assert_eq!(Tables::new(), Tables::new());
    }

    #[test]
    fn test_log2table() {
        let t = Tables::new();
        assert_eq!(t.log2table[0], 0);
        assert_eq!(t.log2table[1], 0);
        assert_eq!(t.log2table[2], 1);
        assert_eq!(t.log2table[3], 1);
        assert_eq!(t.log2table[0x80], 7);
        assert_eq!(t.log2table[0xff], 7);
    }

    #[test]
    fn test_replicated_rgba() {
        let t = Tables::new();
        assert_eq!(t.replicated_rgba[0], 0);
        assert_eq!(t.replicated_rgba[31], 0xff);
        assert_eq!(t.replicated_rgba[16], 0x84);
    }

    #[test]
    fn test_maskbits() {
        let t = Tables::new();
        assert_eq!(t.maskbits_table[0], 0x3ff);
        assert_eq!(t.maskbits_table[1], 1);
        assert_eq!(t.maskbits_table[5], 0x1f);
        assert_eq!(t.maskbits_table[10], 0x3ff);
        assert_eq!(t.maskbits_table[15], 0x3ff);
    }

    #[test]
    fn test_tcdiv_table_extremes() {
        let t = Tables::new();
        // W = 0x4000: already normalized, reciprocal of 1.0
        assert_eq!(t.tcdiv_table[0x4000] & 0xf, 0);
        assert_eq!(t.tcdiv_table[0x4000] >> 4, 0x4000);
        // W = 1 normalizes by 14
        assert_eq!(t.tcdiv_table[1] & 0xf, 14);
        // W = 0 never normalizes
        assert_eq!(t.tcdiv_table[0] & 0xf, 14);
    }

    #[test]
    fn test_9bit_tables() {
        let t = Tables::new();
        assert_eq!(t.special_9bit_clamptable[0x0ff], 0xff);
        // 0x100..0x17f overflowed, 0x180..0x1ff went negative
        assert_eq!(t.special_9bit_clamptable[0x100], 0xff);
        assert_eq!(t.special_9bit_clamptable[0x17f], 0xff);
        assert_eq!(t.special_9bit_clamptable[0x180], 0x00);
        assert_eq!(t.special_9bit_clamptable[0x1ff], 0x00);
        assert_eq!(t.special_9bit_exttable[0x17f], 0x17f);
        assert_eq!(t.special_9bit_exttable[0x180], -0x80);
        assert_eq!(t.special_9bit_exttable[0x1ff], -1);
    }

    #[test]
    fn test_z_tables_round_trip_small_depths() {
        let t = Tables::new();
        // Exponent 0 keeps 11 mantissa bits above bit 6
        for z in [0u32, 0x40, 0x1000, 0x1ffc0] {
            let compressed = t.z_com_table[z as usize] as u32;
            assert_eq!(t.z_complete_dec_table[(compressed >> 2) as usize], z);
        }
        assert_eq!(t.z_com_table[0x3ffff], 0xfffc);
        assert_eq!(t.z_complete_dec_table[0x3fff], 0x3ffff);
    }

    #[test]
    fn test_bldiv_full_weight() {
        let t = Tables::new();
        // sum of weights 0x20 (d = 8), numerator 0x7f8 -> 0xff
        let idx = (8 << 11) | 0x7f8;
        assert_eq!(t.bldiv_hwaccurate_table[idx], 0xff);
    }

    #[test]
    fn test_cvarray() {
        let t = Tables::new();
        assert_eq!(t.cvarray[0xff].cvg, 8);
        assert_eq!(t.cvarray[0xff].cvbit, 1);
        assert_eq!(t.cvarray[0xff].xoff, 0);
        assert_eq!(t.cvarray[0xff].yoff, 0);
        assert_eq!(t.cvarray[0].cvg, 0);
        assert_eq!(t.cvarray[0x01].cvg, 1);
        assert_eq!(t.cvarray[0x01].cvbit, 0);
    }
}

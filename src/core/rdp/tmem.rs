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

//! Texture memory (TMEM)
//!
//! TMEM is 4KB organized as a 64-bit wide memory split into four 16-bit
//! banks. The low 2KB holds texels; the high 2KB holds the second half of
//! 32-bit and YUV texels, or the 256-entry TLUT (palette) at halfword
//! 0x400 replicated across the four banks.
//!
//! The store is modelled as a big-endian byte array: halfword `i` is bytes
//! `2i` and `2i + 1`. What remains of the hardware's interleave is the odd
//! row swap (rows with odd T exchange 32-bit halves of each 64-bit word)
//! and the bank sort below, which routes each of four addresses to the bank
//! its low two bits name.
//!
//! # References
//!
//! - [N64 RDP Command Summary](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)
//! - [N64brew: TMEM](https://n64brew.dev/wiki/Reality_Display_Processor/TMEM)

use serde::{Deserialize, Serialize};

use super::primitives::{FORMAT_YUV, PIXEL_SIZE_16BIT, PIXEL_SIZE_4BIT, PIXEL_SIZE_8BIT};
use super::Rdp;

/// TMEM size in bytes
pub const TMEM_SIZE: usize = 0x1000;

/// Halfword index where the TLUT starts
const TLUT_BASE: u32 = 0x400;

/// Texture memory contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tmem {
    bytes: Vec<u8>,
}

impl Default for Tmem {
    fn default() -> Self {
        Self::new()
    }
}

impl Tmem {
    /// Create a zeroed TMEM
    pub fn new() -> Self {
        Self {
            bytes: vec![0; TMEM_SIZE],
        }
    }

    /// Zero the whole memory
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Raw contents, byte 0 first
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Replace the contents from a byte slice (shorter slices leave the tail)
    pub fn load_bytes(&mut self, data: &[u8]) {
        let len = data.len().min(TMEM_SIZE);
        self.bytes[..len].copy_from_slice(&data[..len]);
    }

    /// Read the byte at `address` (12 bits)
    #[inline(always)]
    pub fn read8(&self, address: u32) -> u8 {
        self.bytes[(address & 0xfff) as usize]
    }

    /// Read the halfword at `index` (11 bits)
    #[inline(always)]
    pub fn read16(&self, index: u32) -> u16 {
        let base = ((index & 0x7ff) << 1) as usize;
        u16::from_be_bytes([self.bytes[base], self.bytes[base + 1]])
    }

    /// Write the byte at `address`
    #[inline(always)]
    pub fn write8(&mut self, address: u32, value: u8) {
        self.bytes[(address & 0xfff) as usize] = value;
    }

    /// Write the halfword at `index`
    #[inline(always)]
    pub fn write16(&mut self, index: u32, value: u16) {
        let base = ((index & 0x7ff) << 1) as usize;
        let [hi, lo] = value.to_be_bytes();
        self.bytes[base] = hi;
        self.bytes[base + 1] = lo;
    }

    /// Read TLUT entry `index`
    ///
    /// The TLUT is 256 entries replicated four times, one copy per bank,
    /// so `index` carries the bank in its low two bits (10 bits total).
    #[inline(always)]
    pub fn tlut(&self, index: u32) -> u16 {
        self.read16(TLUT_BASE + (index & 0x3ff))
    }
}

/// Pick the address among four whose low bits name `bank`
///
/// Returns 0 when no address falls in the bank.
pub(crate) fn sort_tmem_idx(addrs: [u32; 4], bank: u32) -> u32 {
    addrs
        .iter()
        .find(|&&addr| addr & 3 == bank)
        .map(|&addr| addr & 0x3ff)
        .unwrap_or(0)
}

/// Bank-sorted TMEM destinations for one 64-bit load word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TmemLoadIndex {
    /// Halfword index per bank
    pub idx: [u32; 4],
    /// 32-bit halves of the destination word are swapped
    pub bit3fl: bool,
    /// Destination lies in the upper half of TMEM
    pub hibit: bool,
}

/// Result of the copy-mode TMEM read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TmemCopyRead {
    /// Low-half shorts (0-3) and high-half shorts (4-7), in pixel order
    pub sortshort: [u32; 8],
    /// Upper-half flag of each byte address
    pub hibits: [bool; 6],
    /// Low four bits of each byte address
    pub lowbits: [u32; 6],
}

impl Rdp {
    /// Compute the TMEM halfword indices a load writes at `(s, t)`
    ///
    /// # Arguments
    ///
    /// * `s` - Tile-relative S in texels
    /// * `t` - Tile-relative T in rows
    /// * `tilenum` - Destination tile
    pub(crate) fn get_tmem_idx(&self, s: i32, t: i32, tilenum: usize) -> TmemLoadIndex {
        let tile = &self.tiles[tilenum];
        let tbase = ((tile.line.wrapping_mul(t) & 0x1ff) + tile.tmem) as u32;

        let sshorts = if tile.size == PIXEL_SIZE_8BIT || tile.format == FORMAT_YUV {
            s >> 1
        } else if tile.size >= PIXEL_SIZE_16BIT {
            s
        } else {
            s >> 2
        };
        let sshorts = (sshorts as u32) & 0x7ff;

        let bit3fl = ((sshorts & 2) != 0) ^ (t & 1 != 0);

        let tidx_a = ((tbase << 2) + sshorts) & 0x7fd;
        let hibit = tidx_a & 0x400 != 0;

        // Odd rows swap the two 32-bit halves of the 64-bit word
        let swap = if t & 1 != 0 { 2 } else { 0 };
        let addrs = [
            tidx_a ^ swap,
            ((tidx_a + 1) & 0x7ff) ^ swap,
            ((tidx_a + 2) & 0x7ff) ^ swap,
            ((tidx_a + 3) & 0x7ff) ^ swap,
        ];

        TmemLoadIndex {
            idx: [
                sort_tmem_idx(addrs, 0),
                sort_tmem_idx(addrs, 1),
                sort_tmem_idx(addrs, 2),
                sort_tmem_idx(addrs, 3),
            ],
            bit3fl,
            hibit,
        }
    }

    /// Form an 8-bit palette index from a TMEM short
    ///
    /// 4-bit textures take the nibble at `nybbleoffset` and the tile's
    /// palette as the high nibble; 8-bit textures take both nibbles of the
    /// byte selected by bit 1 of the offset.
    pub(crate) fn compute_color_index(&self, readshort: u32, nybbleoffset: u32, tilenum: usize) -> u32 {
        let tile = &self.tiles[tilenum];
        let (lowshift, hinib) = if tile.size == PIXEL_SIZE_4BIT {
            ((nybbleoffset ^ 3) << 2, tile.palette as u32)
        } else {
            let lowshift = ((nybbleoffset & 2) ^ 2) << 2;
            let hinib = if lowshift != 0 {
                (readshort >> 12) & 0xf
            } else {
                (readshort >> 4) & 0xf
            };
            (lowshift, hinib)
        };
        ((hinib & 0xf) << 4) | ((readshort >> lowshift) & 0xf)
    }

    /// Read four consecutive texels in copy mode
    ///
    /// # Arguments
    ///
    /// * `s`, `s1`, `s2`, `s3` - Masked S of the four pixels
    /// * `t` - Masked T
    /// * `tilenum` - Source tile
    pub(crate) fn read_tmem_copy(
        &self,
        s: [i32; 4],
        t: i32,
        tilenum: usize,
    ) -> TmemCopyRead {
        let tile = &self.tiles[tilenum];
        let tbase = ((tile.line.wrapping_mul(t) & 0x1ff) + tile.tmem) as u32;

        let shift_bytes = |s: i32| -> u32 {
            let bytes = if tile.size == PIXEL_SIZE_8BIT || tile.format == FORMAT_YUV {
                s << 1
            } else if tile.size >= PIXEL_SIZE_16BIT {
                s << 2
            } else {
                s
            };
            (bytes as u32) & 0x1fff
        };
        let shbytes = shift_bytes(s[0]);
        let shbytes1 = shift_bytes(s[1]);
        let shbytes2 = shift_bytes(s[2]);
        let shbytes3 = shift_bytes(s[3]);

        let tbase = tbase << 4;
        let mut tidx_a = (tbase + shbytes) & 0x1fff;
        let mut tidx_bhi = (tbase + shbytes1) & 0x1fff;
        let mut tidx_c = (tbase + shbytes2) & 0x1fff;
        let mut tidx_dhi = (tbase + shbytes3) & 0x1fff;

        // YUV pulls chroma for pixel pairs from twice the luma stride
        let (mut tidx_blow, mut tidx_dlow) = if tile.format == FORMAT_YUV {
            let delta = shbytes1.wrapping_sub(shbytes);
            let blow = tidx_a.wrapping_add(delta << 1) & 0x1fff;
            let dlow = blow.wrapping_add(shbytes3).wrapping_sub(shbytes) & 0x1fff;
            (blow, dlow)
        } else {
            (tidx_bhi, tidx_dhi)
        };

        if t & 1 != 0 {
            tidx_a ^= 8;
            tidx_blow ^= 8;
            tidx_bhi ^= 8;
            tidx_c ^= 8;
            tidx_dlow ^= 8;
            tidx_dhi ^= 8;
        }

        let byte_addrs = [tidx_a, tidx_blow, tidx_bhi, tidx_c, tidx_dlow, tidx_dhi];
        let hibits = byte_addrs.map(|addr| addr & 0x1000 != 0);
        let lowbits = byte_addrs.map(|addr| addr & 0xf);

        let tidx_a = tidx_a >> 2;
        let tidx_blow = tidx_blow >> 2;
        let tidx_bhi = tidx_bhi >> 2;
        let tidx_c = tidx_c >> 2;
        let tidx_dlow = tidx_dlow >> 2;
        let tidx_dhi = tidx_dhi >> 2;

        let low_addrs = [tidx_a, tidx_blow, tidx_c, tidx_dlow];
        let banks = [0, 1, 2, 3].map(|bank| self.tmem.read16(sort_tmem_idx(low_addrs, bank)) as u32);

        let mut sortshort = [0u32; 8];
        sortshort[0] = banks[(lowbits[0] >> 2) as usize];
        sortshort[1] = banks[(lowbits[1] >> 2) as usize];
        sortshort[2] = banks[(lowbits[3] >> 2) as usize];
        sortshort[3] = banks[(lowbits[4] >> 2) as usize];

        let high_idx = if self.other_modes.en_tlut {
            let c0 = self.compute_color_index(sortshort[0], lowbits[0] & 3, tilenum);
            let c1 = self.compute_color_index(sortshort[1], lowbits[1] & 3, tilenum);
            let c2 = self.compute_color_index(sortshort[2], lowbits[3] & 3, tilenum);
            let c3 = self.compute_color_index(sortshort[3], lowbits[4] & 3, tilenum);
            [c0 << 2, (c1 << 2) | 1, (c2 << 2) | 2, (c3 << 2) | 3]
        } else {
            let high_addrs = [tidx_a, tidx_bhi, tidx_c, tidx_dhi];
            [0, 1, 2, 3].map(|bank| sort_tmem_idx(high_addrs, bank))
        };

        let high = high_idx.map(|idx| self.tmem.read16(idx | 0x400) as u32);

        if self.other_modes.en_tlut {
            sortshort[4..8].copy_from_slice(&high);
        } else {
            sortshort[4] = high[(lowbits[0] >> 2) as usize];
            sortshort[5] = high[(lowbits[2] >> 2) as usize];
            sortshort[6] = high[(lowbits[3] >> 2) as usize];
            sortshort[7] = high[(lowbits[5] >> 2) as usize];
        }

        TmemCopyRead {
            sortshort,
            hibits,
            lowbits,
        }
    }
}

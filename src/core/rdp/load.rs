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

//! Texture loading pipeline
//!
//! `Load Tile`, `Load Block` and `Load TLUT` walk RDRAM one span at a time
//! and scatter each 64-bit RDRAM word into TMEM through the same bank
//! addressing the texel fetch uses, so a texture loaded with a given tile
//! reads back through that tile unchanged.
//!
//! How a word lands in TMEM depends on the tile format:
//!
//! - YUV: even bytes go to the lower half, odd bytes to the upper half
//! - RGBA32: the red/green halfword goes low, blue/alpha goes high
//! - everything else: whole halfwords, with odd rows swapped in pairs

use super::primitives::{FORMAT_RGBA, FORMAT_YUV, PIXEL_SIZE_16BIT, PIXEL_SIZE_32BIT, PIXEL_SIZE_4BIT, PIXEL_SIZE_8BIT};
use super::Rdp;

/// How a 64-bit RDRAM word is split across the TMEM halves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TmemFormatting {
    /// Even bytes low, odd bytes high
    Yuv,
    /// 16-bit halves of each texel split low/high
    Rgba32,
    /// Four halfwords written as-is
    Plain,
}

/// Four copies of one halfword
#[inline(always)]
fn replicate_short(short: u64) -> u64 {
    (short << 48) | (short << 32) | (short << 16) | short
}

/// Assemble the 64 bits starting at byte `offset` (0-7) of four words
fn load_qword(r: [u32; 4], offset: u32, ltlut: bool) -> u64 {
    let [r0, r1, r2, r3] = r.map(u64::from);
    match offset & 7 {
        0 if ltlut => replicate_short(r0 >> 16),
        0 => (r0 << 32) | r1,
        1 => (r0 << 40) | (r1 << 8) | (r2 >> 24),
        2 if ltlut => replicate_short(r0 & 0xffff),
        2 => (r0 << 48) | (r1 << 16) | (r2 >> 16),
        3 => (r0 << 56) | (r1 << 24) | (r2 >> 8),
        4 if ltlut => replicate_short(r1 >> 16),
        4 => (r1 << 32) | r2,
        5 => (r1 << 40) | (r2 << 8) | (r3 >> 24),
        6 if ltlut => replicate_short(r1 & 0xffff),
        6 => (r1 << 48) | (r2 << 16) | (r3 >> 16),
        _ => (r1 << 56) | (r2 << 24) | (r3 >> 8),
    }
}

impl Rdp {
    /// Copy the spans set up by the load edge walker into TMEM
    ///
    /// # Arguments
    ///
    /// * `start`, `end` - First and last scanline (inclusive)
    /// * `tilenum` - Tile whose layout receives the data
    /// * `coord_quad` - Coordinates are in 1/4 texels (`Load Block`, `Load TLUT`)
    /// * `ltlut` - Palette load: each halfword is replicated to all four banks
    pub(crate) fn loading_pipeline(&mut self, start: i32, end: i32, tilenum: usize, coord_quad: bool, ltlut: bool) {
        if end > start && ltlut {
            self.crash("TLUT load spans more than one line");
            return;
        }

        let tile = self.tiles[tilenum];
        let formatting = if tile.format == FORMAT_YUV {
            TmemFormatting::Yuv
        } else if tile.format == FORMAT_RGBA && tile.size == PIXEL_SIZE_32BIT {
            TmemFormatting::Rgba32
        } else {
            TmemFormatting::Plain
        };

        let (tiadvance, spanadvance) = match self.ti.size {
            PIXEL_SIZE_4BIT => {
                self.crash("4-bit texture image load");
                return;
            }
            PIXEL_SIZE_8BIT => (8, 8),
            PIXEL_SIZE_16BIT if ltlut => (2, 1),
            PIXEL_SIZE_16BIT => (8, 4),
            _ => (8, 2),
        };

        let dsinc = self.deltas.ds;
        let dtinc = self.deltas.dt;

        for i in start..=end {
            let span = self.spans[i.clamp(0, self.spans.len() as i32 - 1) as usize];
            let xstart = span.lx;
            let xend = span.unscrx;
            let mut s = span.s;
            let mut t = span.t;

            let ti_index = self.ti.width.wrapping_mul(i).wrapping_add(xend);
            let mut tiptr = self.ti.address.wrapping_add(((ti_index << self.ti.size) >> 1) as u32);

            let length = (xstart - xend + 1) & 0xfff;

            if let Some(trace) = self.trace.as_mut() {
                trace.write_rdram(tiptr >> 2, length as u32);
            }
            log::trace!("load span {}: RDRAM 0x{:06x}, {} pixels", i, tiptr, length);

            for _ in (0..length).step_by(spanadvance) {
                let sss = (s >> 16) & 0xffff;
                let sst = (t >> 16) & 0xffff;
                let (sss, sst) = self.tc_pipeline_load(sss, sst, tilenum, coord_quad);
                let dswap = sst & 1 != 0;
                let index = self.get_tmem_idx(sss, sst, tilenum);

                let readidx32 = (tiptr >> 2) & !1;
                let words = [0, 1, 2, 3].map(|k| self.rdram.read_u32(readidx32.wrapping_add(k)));
                let loadqword = load_qword(words, tiptr, ltlut);

                self.write_tmem_qword(formatting, loadqword, index.idx, index.bit3fl, index.hibit, dswap);

                s = s.wrapping_add(dsinc) & !0x1f;
                t = t.wrapping_add(dtinc) & !0x1f;
                tiptr = tiptr.wrapping_add(tiadvance);
            }
        }
    }

    /// Scatter one 64-bit RDRAM word into the four TMEM banks
    fn write_tmem_qword(
        &mut self,
        formatting: TmemFormatting,
        loadqword: u64,
        idx: [u32; 4],
        bit3fl: bool,
        hibit: bool,
        dswap: bool,
    ) {
        let q = loadqword;
        match formatting {
            TmemFormatting::Yuv | TmemFormatting::Rgba32 => {
                let (readval0, readval1) = if formatting == TmemFormatting::Yuv {
                    let byte = |shift: u32| ((q >> shift) & 0xff) as u32;
                    (
                        (byte(56) << 24) | (byte(40) << 16) | (byte(24) << 8) | byte(8),
                        (byte(48) << 24) | (byte(32) << 16) | (byte(16) << 8) | byte(0),
                    )
                } else {
                    (
                        (((q >> 48) << 16) | ((q >> 16) & 0xffff)) as u32,
                        ((((q >> 32) & 0xffff) << 16) | (q & 0xffff)) as u32,
                    )
                };
                let (a, b) = if bit3fl { (idx[2], idx[3]) } else { (idx[0], idx[1]) };
                self.tmem.write16(a, (readval0 >> 16) as u16);
                self.tmem.write16(b, readval0 as u16);
                self.tmem.write16(a | 0x400, (readval1 >> 16) as u16);
                self.tmem.write16(b | 0x400, readval1 as u16);
            }
            TmemFormatting::Plain => {
                let high = if hibit { 0x400 } else { 0 };
                let shorts = if !dswap {
                    [q >> 48, q >> 32, q >> 16, q]
                } else {
                    [q >> 16, q, q >> 48, q >> 32]
                };
                for (&index, &short) in idx.iter().zip(shorts.iter()) {
                    self.tmem.write16(index | high, short as u16);
                }
            }
        }
    }
}

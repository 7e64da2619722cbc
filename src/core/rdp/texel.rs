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

//! Texel fetch
//!
//! Decodes TMEM contents into [`Color`] lanes for every tile format. Each
//! fetch reads one texel, or a 2x2 quad for the bilinear filter:
//!
//! ```text
//!   c0 (s0, t0)   c1 (s1, t0)
//!   c2 (s0, t1)   c3 (s1, t1)
//! ```
//!
//! Rows with odd T are stored with the 32-bit halves of each 64-bit TMEM
//! word exchanged, so the byte address of a texel on an odd row is XORed
//! with 4 (and the halfword index with 2).
//!
//! YUV textures keep chroma in the low half of TMEM and luma in the high
//! half. For the quad fetch, chroma is shared by pixel pairs and comes from
//! twice the S step.
//!
//! With the TLUT enabled the fetched value is a palette index. The four
//! palette copies sit in separate banks, one per quad texel, and the
//! entry is decoded as RGBA 5551 or IA 88 depending on the TLUT type.
//!
//! # References
//!
//! - [N64brew: Texture formats](https://n64brew.dev/wiki/Reality_Display_Processor/TMEM)

use super::primitives::{Color, TexelType};
use super::Rdp;

/// Byte address swap for rows with odd T
#[inline(always)]
fn byte_swap(t: i32) -> u32 {
    if t & 1 != 0 {
        4
    } else {
        0
    }
}

/// Halfword index swap for rows with odd T
#[inline(always)]
fn word_swap(t: i32) -> u32 {
    if t & 1 != 0 {
        2
    } else {
        0
    }
}

/// How an index-extraction case reads TMEM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PaletteRead {
    /// 4-bit index plus tile palette
    Nibble,
    /// High nibble of a byte plus tile palette
    HighNibble,
    /// 8-bit index
    Byte,
    /// Top 8 bits of a halfword
    Short,
}

impl PaletteRead {
    /// Read kind and S step multiplier for a `tlutswitch` case
    fn from_switch(tlutswitch: u32) -> (Self, i32) {
        match tlutswitch {
            0..=2 => (Self::Nibble, 1),
            3 => (Self::HighNibble, 2),
            4..=6 => (Self::Byte, 1),
            8..=10 | 12..=14 => (Self::Short, 1),
            _ => (Self::Byte, 2),
        }
    }
}

impl Rdp {
    #[inline(always)]
    fn tile_base(&self, tilenum: usize, row: i32) -> u32 {
        let tile = &self.tiles[tilenum];
        (tile.line.wrapping_mul(row)).wrapping_add(tile.tmem) as u32
    }

    #[inline(always)]
    fn rgba16_color(&self, c: u16) -> Color {
        let rep = &self.tables.replicated_rgba;
        Color::new(
            rep[((c >> 11) & 0x1f) as usize],
            rep[((c >> 6) & 0x1f) as usize],
            rep[((c >> 1) & 0x1f) as usize],
            if c & 1 != 0 { 0xff } else { 0 },
        )
    }

    /// Read the 4-bit texel at `s` on the row starting at `tbase`
    #[inline(always)]
    fn read_nibble(&self, tbase: u32, s: i32, t: i32, mask: u32) -> u32 {
        let taddr = ((tbase << 4).wrapping_add(s as u32) >> 1) ^ byte_swap(t);
        let byteval = self.tmem.read8(taddr & mask) as u32;
        if s & 1 != 0 {
            byteval & 0xf
        } else {
            byteval >> 4
        }
    }

    #[inline(always)]
    fn read_byte(&self, tbase: u32, s: i32, t: i32, mask: u32) -> u32 {
        let taddr = (tbase << 3).wrapping_add(s as u32) ^ byte_swap(t);
        self.tmem.read8(taddr & mask) as u32
    }

    #[inline(always)]
    fn read_short(&self, tbase: u32, s: i32, t: i32, mask: u32) -> u16 {
        let taddr = (tbase << 2).wrapping_add(s as u32) ^ word_swap(t);
        self.tmem.read16(taddr & mask)
    }

    /// Decode one texel without the TLUT
    ///
    /// # Arguments
    ///
    /// * `kind` - Decoder selected by the tile
    /// * `tbase` - Row start in 64-bit TMEM words
    /// * `s` - Texel column
    /// * `t` - Texel row (only its parity matters here)
    /// * `palette` - Tile palette, used by 4-bit color-indexed textures
    fn decode_texel(&self, kind: TexelType, tbase: u32, s: i32, t: i32, palette: i32) -> Color {
        use TexelType::*;
        match kind {
            Rgba4 | I4 => {
                let c = self.read_nibble(tbase, s, t, 0xfff) as i32;
                Color::splat(c | (c << 4))
            }
            Rgba8 | Ci8 | I8 => Color::splat(self.read_byte(tbase, s, t, 0xfff) as i32),
            Rgba16 => self.rgba16_color(self.read_short(tbase, s, t, 0x7ff)),
            Rgba32 => {
                let taddr = (tbase << 2).wrapping_add(s as u32) ^ word_swap(t);
                let taddr = taddr & 0x3ff;
                let rg = self.tmem.read16(taddr) as i32;
                let ba = self.tmem.read16(taddr | 0x400) as i32;
                Color::new(rg >> 8, rg & 0xff, ba >> 8, ba & 0xff)
            }
            Yuv4 => {
                let save = self.read_byte(tbase, s, t, 0x7ff) as i32 & 0xf0;
                let save = save | (save >> 4);
                let u = save - 0x80;
                Color::new(u, u, save, save)
            }
            Yuv8 => {
                let save = self.read_byte(tbase, s, t, 0x7ff) as i32;
                let u = save - 0x80;
                Color::new(u, u, save, save)
            }
            Yuv16 | Yuv32 => {
                let taddr = (tbase << 3).wrapping_add(s as u32);
                let taddrlow = ((taddr >> 1) ^ word_swap(t)) & 0x3ff;
                let taddr = (taddr ^ byte_swap(t)) & 0x7ff;
                let c = self.tmem.read16(taddrlow) as i32;
                let y = self.tmem.read8(taddr | 0x800) as i32;
                Color::new((c >> 8) - 0x80, (c & 0xff) - 0x80, y, y)
            }
            Ci4 => {
                let p = self.read_nibble(tbase, s, t, 0xfff) as i32;
                Color::splat(((palette << 4) | p) & 0xff)
            }
            Ci16 | Ci32 | Ia32 | I16 | I32 => {
                let c = self.read_short(tbase, s, t, 0x7ff) as i32;
                Color::new(c >> 8, c & 0xff, c >> 8, if c & 1 != 0 { 0xff } else { 0 })
            }
            Ia4 => {
                let p = self.read_nibble(tbase, s, t, 0xfff) as i32;
                let i = p & 0xe;
                let i = (i << 4) | (i << 1) | (i >> 2);
                Color::new(i, i, i, if p & 1 != 0 { 0xff } else { 0 })
            }
            Ia8 => {
                let p = self.read_byte(tbase, s, t, 0xfff) as i32;
                let i = (p & 0xf0) | ((p & 0xf0) >> 4);
                Color::new(i, i, i, ((p & 0xf) << 4) | (p & 0xf))
            }
            Ia16 => {
                let c = self.read_short(tbase, s, t, 0x7ff) as i32;
                Color::new(c >> 8, c >> 8, c >> 8, c & 0xff)
            }
        }
    }

    /// Fetch a single texel without the TLUT
    ///
    /// # Arguments
    ///
    /// * `s` - Masked, tile-relative S
    /// * `t` - Masked, tile-relative T (only the low 8 bits address a row)
    /// * `tilenum` - Tile to sample
    pub(crate) fn fetch_texel(&self, s: i32, t: i32, tilenum: usize) -> Color {
        let tile = &self.tiles[tilenum];
        let tbase = self.tile_base(tilenum, t & 0xff);
        self.decode_texel(tile.f.notlutswitch, tbase, s, t, tile.palette)
    }

    /// Fetch a 2x2 quad without the TLUT
    ///
    /// # Arguments
    ///
    /// * `s0`, `t0` - Top-left texel
    /// * `sdiff`, `tdiff` - Step to the neighbouring column and row
    /// * `tilenum` - Tile to sample
    /// * `unequaluppers` - The RG and BA lanes fall in different triangles
    ///   of the quad (YUV only)
    ///
    /// # Returns
    ///
    /// Texels in order top-left, top-right, bottom-left, bottom-right
    pub(crate) fn fetch_texel_quadro(
        &self,
        s0: i32,
        sdiff: i32,
        t0: i32,
        tdiff: i32,
        tilenum: usize,
        unequaluppers: bool,
    ) -> [Color; 4] {
        use TexelType::*;

        let tile = &self.tiles[tilenum];
        let tbase0 = self.tile_base(tilenum, t0 & 0xff);
        let t1 = (t0 & 0xff) + tdiff;
        let tbase2 = self.tile_base(tilenum, t1);
        let s1 = s0.wrapping_add(sdiff);

        match tile.f.notlutswitch {
            Yuv4 | Yuv8 => {
                // Chroma pairs: the right column is two steps away
                let s1c = s1.wrapping_add(sdiff);
                let read = |tbase: u32, s: i32, t: i32| -> i32 {
                    let v = self.read_byte(tbase, s, t, 0x7ff) as i32;
                    if tile.f.notlutswitch == Yuv4 {
                        (v & 0xf0) | ((v & 0xf0) >> 4)
                    } else {
                        v
                    }
                };
                let save = [
                    read(tbase0, s0, t0),
                    read(tbase0, s1c, t0),
                    read(tbase2, s0, t1),
                    read(tbase2, s1c, t1),
                ];
                let mut colors = save.map(|v| Color::new(v - 0x80, v - 0x80, v, v));
                if unequaluppers {
                    for (i, color) in colors.iter_mut().enumerate() {
                        color.b = save[3 - i];
                        color.a = save[3 - i];
                    }
                }
                colors
            }
            Yuv16 | Yuv32 => {
                let taddr = [
                    (tbase0 << 3).wrapping_add(s0 as u32),
                    (tbase0 << 3).wrapping_add(s1 as u32),
                    (tbase2 << 3).wrapping_add(s0 as u32),
                    (tbase2 << 3).wrapping_add(s1 as u32),
                ];
                let rows = [t0, t0, t1, t1];
                let mut colors = [Color::default(); 4];
                for i in 0..4 {
                    // Right column chroma comes from one step further
                    let low = if i & 1 != 0 {
                        taddr[i].wrapping_add(sdiff as u32)
                    } else {
                        taddr[i]
                    };
                    let low = ((low >> 1) ^ word_swap(rows[i])) & 0x3ff;
                    let c = self.tmem.read16(low) as i32;
                    let y = self.tmem.read8(((taddr[i] ^ byte_swap(rows[i])) & 0x7ff) | 0x800) as i32;
                    colors[i] = Color::new((c >> 8) - 0x80, (c & 0xff) - 0x80, y, y);
                }
                colors
            }
            kind => [
                self.decode_texel(kind, tbase0, s0, t0, tile.palette),
                self.decode_texel(kind, tbase0, s1, t0, tile.palette),
                self.decode_texel(kind, tbase2, s0, t1, tile.palette),
                self.decode_texel(kind, tbase2, s1, t1, tile.palette),
            ],
        }
    }

    /// Read the bank-0 TLUT index of one texel (low two bits clear)
    fn palette_index(&self, read: PaletteRead, tbase: u32, s: i32, t: i32, tpal: u32) -> u32 {
        match read {
            PaletteRead::Nibble => (tpal | self.read_nibble(tbase, s, t, 0x7ff)) << 2,
            PaletteRead::HighNibble => (tpal | (self.read_byte(tbase, s, t, 0x7ff) >> 4)) << 2,
            PaletteRead::Byte => self.read_byte(tbase, s, t, 0x7ff) << 2,
            PaletteRead::Short => ((self.read_short(tbase, s, t, 0x3ff) as u32) >> 6) & !3,
        }
    }

    /// Look up four TLUT entries and decode them
    ///
    /// When the RG and BA lanes fall in different triangles of the quad,
    /// the BA lanes are taken from the diagonally opposite texel.
    fn decode_tlut_quad(&self, taddr: [u32; 4], isupper: bool, isupperrg: bool) -> [Color; 4] {
        // Upper-triangle RG reads use the swapped bank pair
        let xor = if isupperrg { 3 } else { 0 };
        let c = taddr.map(|addr| self.tmem.tlut(addr ^ xor));

        let mut colors = [Color::default(); 4];
        for i in 0..4 {
            let rg = c[i];
            let ba = if isupper == isupperrg { c[i] } else { c[3 - i] };
            colors[i] = if !self.other_modes.tlut_type {
                let rep = &self.tables.replicated_rgba;
                Color::new(
                    rep[((rg >> 11) & 0x1f) as usize],
                    rep[((rg >> 6) & 0x1f) as usize],
                    rep[((ba >> 1) & 0x1f) as usize],
                    if ba & 1 != 0 { 0xff } else { 0 },
                )
            } else {
                let i = (rg >> 8) as i32;
                Color::new(i, i, (ba >> 8) as i32, (ba & 0xff) as i32)
            };
        }
        colors
    }

    /// Fetch a 2x2 quad through the TLUT
    ///
    /// # Arguments
    ///
    /// * `s0`, `t0` - Top-left texel
    /// * `sdiff`, `tdiff` - Step to the neighbouring column and row
    /// * `tilenum` - Tile to sample
    /// * `isupper` - BA lanes sample the upper triangle
    /// * `isupperrg` - RG lanes sample the upper triangle
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn fetch_texel_entlut_quadro(
        &self,
        s0: i32,
        sdiff: i32,
        t0: i32,
        tdiff: i32,
        tilenum: usize,
        isupper: bool,
        isupperrg: bool,
    ) -> [Color; 4] {
        let tile = &self.tiles[tilenum];
        let tbase0 = self.tile_base(tilenum, t0 & 0xff);
        let t1 = (t0 & 0xff) + tdiff;
        let tbase2 = self.tile_base(tilenum, t1);
        let tpal = (tile.palette as u32 & 0xf) << 4;

        let (read, step) = PaletteRead::from_switch(tile.f.tlutswitch);
        let s1 = s0.wrapping_add(sdiff * step);

        let taddr = [
            self.palette_index(read, tbase0, s0, t0, tpal),
            self.palette_index(read, tbase0, s1, t0, tpal) + 1,
            self.palette_index(read, tbase2, s0, t1, tpal) + 2,
            self.palette_index(read, tbase2, s1, t1, tpal) + 3,
        ];
        self.decode_tlut_quad(taddr, isupper, isupperrg)
    }

    /// Fetch one texel through the TLUT, replicated to all four banks
    ///
    /// Used for point sampling; every bank reads the same palette entry so
    /// the result matches the quad layout of the bilinear path.
    pub(crate) fn fetch_texel_entlut_quadro_nearest(
        &self,
        s0: i32,
        t0: i32,
        tilenum: usize,
        isupper: bool,
        isupperrg: bool,
    ) -> [Color; 4] {
        let tile = &self.tiles[tilenum];
        let tbase0 = self.tile_base(tilenum, t0);
        let tpal = (tile.palette as u32 & 0xf) << 4;

        let (read, _) = PaletteRead::from_switch(tile.f.tlutswitch);
        let base = self.palette_index(read, tbase0, s0, t0, tpal);
        self.decode_tlut_quad([base, base + 1, base + 2, base + 3], isupper, isupperrg)
    }

    /// Fetch eight bytes of texels for copy mode
    ///
    /// # Arguments
    ///
    /// * `sss`, `sst` - Texture coordinate from the divider
    /// * `tilenum` - Tile to copy from
    ///
    /// # Returns
    ///
    /// `(hidword, lowdword)`: the first two and last two 16-bit shorts
    pub(crate) fn fetch_qword_copy(&self, sss: i32, sst: i32, tilenum: usize) -> (u32, u32) {
        let tile = &self.tiles[tilenum];
        let (tformat, tsize) = if self.other_modes.en_tlut {
            let format = if self.other_modes.tlut_type {
                super::primitives::FORMAT_IA
            } else {
                super::primitives::FORMAT_RGBA
            };
            (format, super::primitives::PIXEL_SIZE_16BIT)
        } else {
            (tile.format, tile.size)
        };

        let (s, t) = self.tc_pipeline_copy(sss, sst, tilenum);
        let read = self.read_tmem_copy(s, t, tilenum);

        let largetex = tformat == super::primitives::FORMAT_YUV
            || (tformat == super::primitives::FORMAT_RGBA
                && tsize == super::primitives::PIXEL_SIZE_32BIT);

        let shorts = if self.other_modes.en_tlut {
            [read.sortshort[4], read.sortshort[5], read.sortshort[6], read.sortshort[7]]
        } else if largetex {
            [read.sortshort[0], read.sortshort[1], read.sortshort[2], read.sortshort[3]]
        } else {
            [
                read.sortshort[if read.hibits[0] { 4 } else { 0 }],
                read.sortshort[if read.hibits[1] { 5 } else { 1 }],
                read.sortshort[if read.hibits[3] { 6 } else { 2 }],
                read.sortshort[if read.hibits[4] { 7 } else { 3 }],
            ]
        };

        let hidword = (shorts[0] << 16) | (shorts[1] & 0xffff);
        let lowdword = (shorts[2] << 16) | (shorts[3] & 0xffff);
        (hidword, lowdword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use crate::core::rdp::tmem::TMEM_SIZE as TMEM_BYTES;
    use crate::core::rdp::primitives::*;
    use proptest::prelude::*;

    fn rdp_with_tile(format: u32, size: u32, line: i32) -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.format = format;
        tile.size = size;
        tile.line = line;
        tile.calculate_tile_derivs();
        rdp
    }

    #[test]
    fn test_fetch_rgba16() {
        let mut rdp = rdp_with_tile(FORMAT_RGBA, PIXEL_SIZE_16BIT, 4);
        // Red, fully opaque
        rdp.tmem.write16(1, 0xf801);
        let c = rdp.fetch_texel(1, 0, 0);
        assert_eq!(c, Color::new(0xff, 0, 0, 0xff));
    }

    #[test]
    fn test_odd_rows_are_dword_swapped() {
        let mut rdp = rdp_with_tile(FORMAT_I, PIXEL_SIZE_8BIT, 1);
        // Row 1 starts at byte 8; texel 0 lives in the other 32-bit half
        rdp.tmem.write8(8 + 4, 0x5a);
        assert_eq!(rdp.fetch_texel(0, 1, 0), Color::splat(0x5a));
        rdp.tmem.write8(0, 0x33);
        assert_eq!(rdp.fetch_texel(0, 0, 0), Color::splat(0x33));
    }

    #[test]
    fn test_fetch_i4_nibbles() {
        let mut rdp = rdp_with_tile(FORMAT_I, PIXEL_SIZE_4BIT, 1);
        rdp.tmem.write8(0, 0x7c);
        assert_eq!(rdp.fetch_texel(0, 0, 0), Color::splat(0x77));
        assert_eq!(rdp.fetch_texel(1, 0, 0), Color::splat(0xcc));
    }

    #[test]
    fn test_fetch_ia4_and_ia8() {
        let mut rdp = rdp_with_tile(FORMAT_IA, PIXEL_SIZE_4BIT, 1);
        rdp.tmem.write8(0, 0xf0);
        // High nibble 0xf: intensity 0xe replicated, alpha bit set
        assert_eq!(rdp.fetch_texel(0, 0, 0), Color::new(0xff, 0xff, 0xff, 0xff));
        assert_eq!(rdp.fetch_texel(1, 0, 0), Color::new(0, 0, 0, 0));

        let mut rdp = rdp_with_tile(FORMAT_IA, PIXEL_SIZE_8BIT, 1);
        rdp.tmem.write8(0, 0x84);
        assert_eq!(rdp.fetch_texel(0, 0, 0), Color::new(0x88, 0x88, 0x88, 0x44));
    }

    #[test]
    fn test_fetch_rgba32_uses_both_halves() {
        let mut rdp = rdp_with_tile(FORMAT_RGBA, PIXEL_SIZE_32BIT, 2);
        rdp.tmem.write16(0, 0x1122);
        rdp.tmem.write16(0x400, 0x3344);
        assert_eq!(rdp.fetch_texel(0, 0, 0), Color::new(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_fetch_ci4_includes_palette() {
        let mut rdp = rdp_with_tile(FORMAT_CI, PIXEL_SIZE_4BIT, 1);
        rdp.tiles[0].palette = 3;
        rdp.tmem.write8(0, 0x50);
        assert_eq!(rdp.fetch_texel(0, 0, 0), Color::splat(0x35));
    }

    #[test]
    fn test_fetch_yuv16() {
        let mut rdp = rdp_with_tile(FORMAT_YUV, PIXEL_SIZE_16BIT, 1);
        rdp.tmem.write16(0, 0x90a0);
        rdp.tmem.write8(0x800, 0x40);
        let c = rdp.fetch_texel(0, 0, 0);
        assert_eq!(c, Color::new(0x10, 0x20, 0x40, 0x40));
    }

    #[test]
    fn test_tlut_quad_rgba() {
        let mut rdp = rdp_with_tile(FORMAT_CI, PIXEL_SIZE_8BIT, 1);
        rdp.other_modes.en_tlut = true;
        // Index 2 in every bank: green, opaque
        for bank in 0..4 {
            rdp.tmem.write16(0x400 + (2 << 2) + bank, 0x07c1);
        }
        rdp.tmem.write8(0, 2);
        rdp.tmem.write8(1, 2);
        let quad = rdp.fetch_texel_entlut_quadro_nearest(0, 0, 0, false, false);
        for c in quad {
            assert_eq!(c, Color::new(0, 0xff, 0, 0xff));
        }
    }

    #[test]
    fn test_tlut_quad_ia_swaps_ba_lanes() {
        let mut rdp = rdp_with_tile(FORMAT_CI, PIXEL_SIZE_8BIT, 1);
        rdp.other_modes.en_tlut = true;
        rdp.other_modes.tlut_type = true;
        for bank in 0..4 {
            rdp.tmem.write16(0x400 + (1 << 2) + bank, 0x1000 * (bank as u16 + 1) + bank as u16);
        }
        rdp.tmem.write8(0, 1);
        let quad = rdp.fetch_texel_entlut_quadro_nearest(0, 0, 0, true, false);
        // RG from the own bank, BA from the opposite bank
        assert_eq!(quad[0], Color::new(0x10, 0x10, 0x40, 3));
        assert_eq!(quad[3], Color::new(0x40, 0x40, 0x10, 0));
    }

    proptest! {
        #[test]
        fn prop_quad_matches_single_fetches(
            data in proptest::collection::vec(any::<u8>(), TMEM_BYTES),
            format in prop_oneof![Just(FORMAT_RGBA), Just(FORMAT_CI), Just(FORMAT_IA), Just(FORMAT_I)],
            size in 0u32..4,
            s0 in 0i32..64,
            t0 in 0i32..0xfe,
        ) {
            let mut rdp = rdp_with_tile(format, size, 2);
            rdp.tiles[0].palette = 5;
            rdp.tmem.load_bytes(&data);

            let quad = rdp.fetch_texel_quadro(s0, 1, t0, 1, 0, false);
            prop_assert_eq!(quad[0], rdp.fetch_texel(s0, t0, 0));
            prop_assert_eq!(quad[1], rdp.fetch_texel(s0 + 1, t0, 0));
            prop_assert_eq!(quad[2], rdp.fetch_texel(s0, t0 + 1, 0));
            prop_assert_eq!(quad[3], rdp.fetch_texel(s0 + 1, t0 + 1, 0));
        }

        /// YUV quads share chroma per pixel pair, so the right column takes
        /// its chroma from two steps over and only its luma from one step
        #[test]
        fn prop_yuv_quad_right_column_uses_next_chroma_pair(
            data in proptest::collection::vec(any::<u8>(), TMEM_BYTES),
            size in 0u32..4,
            s0 in 0i32..64,
            t0 in 0i32..0xfe,
        ) {
            let mut rdp = rdp_with_tile(FORMAT_YUV, size, 2);
            rdp.tmem.load_bytes(&data);

            let quad = rdp.fetch_texel_quadro(s0, 1, t0, 1, 0, false);
            prop_assert_eq!(quad[0], rdp.fetch_texel(s0, t0, 0));
            prop_assert_eq!(quad[2], rdp.fetch_texel(s0, t0 + 1, 0));
            for (lane, t) in [(1, t0), (3, t0 + 1)] {
                let chroma = rdp.fetch_texel(s0 + 2, t, 0);
                let luma = if size < PIXEL_SIZE_16BIT {
                    chroma
                } else {
                    rdp.fetch_texel(s0 + 1, t, 0)
                };
                prop_assert_eq!(quad[lane], Color::new(chroma.r, chroma.g, luma.b, luma.a));
            }
        }

        #[test]
        fn prop_tlut_quad_matches_single_fetches(
            data in proptest::collection::vec(any::<u8>(), TMEM_BYTES),
            format in 0u32..8,
            size in 0u32..4,
            tlut_type in any::<bool>(),
            s0 in 0i32..64,
            t0 in 0i32..0xfe,
        ) {
            let mut rdp = rdp_with_tile(format, size, 2);
            rdp.other_modes.en_tlut = true;
            rdp.other_modes.tlut_type = tlut_type;
            rdp.tiles[0].palette = 9;
            rdp.tmem.load_bytes(&data);

            // YUV cases index every other texel
            let step = if format == FORMAT_YUV { 2 } else { 1 };
            let quad = rdp.fetch_texel_entlut_quadro(s0, 1, t0, 1, 0, false, false);
            let texels = [(s0, t0), (s0 + step, t0), (s0, t0 + 1), (s0 + step, t0 + 1)];
            for (lane, (s, t)) in texels.into_iter().enumerate() {
                let single = rdp.fetch_texel_entlut_quadro_nearest(s, t, 0, false, false);
                prop_assert_eq!(quad[lane], single[lane]);
            }
        }
    }
}

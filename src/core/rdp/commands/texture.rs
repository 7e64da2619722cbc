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

//! Texture commands
//!
//! Tile descriptors, TMEM loads and textured rectangles. The load
//! commands and the rectangles are turned into edge-walker words and run
//! through the same walkers as triangles.
//!
//! # Commands
//!
//! - 0x24: Texture Rectangle
//! - 0x25: Texture Rectangle Flip
//! - 0x30: Load TLUT
//! - 0x32: Set Tile Size
//! - 0x33: Load Block
//! - 0x34: Load Tile
//! - 0x35: Set Tile
//! - 0x3D: Set Texture Image
//!
//! # References
//!
//! - [N64brew: RDP Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)

use crate::core::rdp::primitives::TextureImage;
use crate::core::rdp::registers::CycleType;
use crate::core::rdp::{sign16, Rdp};

/// Tile selected by bits 56-58 of a command
#[inline(always)]
fn tile_index(w1: u32) -> usize {
    ((w1 >> 24) & 7) as usize
}

/// Rectangle bounds `(sl, tl, sh, th)` of a tile or load command
#[inline(always)]
fn tile_bounds(words: &[u32; 2]) -> (i32, i32, i32, i32) {
    (
        ((words[0] >> 12) & 0xfff) as i32,
        (words[0] & 0xfff) as i32,
        ((words[1] >> 12) & 0xfff) as i32,
        (words[1] & 0xfff) as i32,
    )
}

impl Rdp {
    /// 0x35 - Set Tile
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x35 | format (53-55) | size (51-52) | line (41-49) | tmem (32-40)
    /// w1: tile (24-26) | palette (20-23) | ct mt mask_t shift_t (10-19)
    ///   | cs ms mask_s shift_s (0-9)
    /// ```
    pub fn set_tile(&mut self, words: &[u32; 2]) {
        let tilenum = tile_index(words[1]);
        let tile = &mut self.tiles[tilenum];

        tile.format = (words[0] >> 21) & 7;
        tile.size = (words[0] >> 19) & 3;
        tile.line = ((words[0] >> 9) & 0x1ff) as i32;
        tile.tmem = (words[0] & 0x1ff) as i32;
        tile.palette = ((words[1] >> 20) & 0xf) as i32;
        tile.ct = (words[1] >> 19) & 1 != 0;
        tile.mt = (words[1] >> 18) & 1 != 0;
        tile.mask_t = ((words[1] >> 14) & 0xf) as i32;
        tile.shift_t = ((words[1] >> 10) & 0xf) as i32;
        tile.cs = (words[1] >> 9) & 1 != 0;
        tile.ms = (words[1] >> 8) & 1 != 0;
        tile.mask_s = ((words[1] >> 4) & 0xf) as i32;
        tile.shift_s = (words[1] & 0xf) as i32;

        tile.calculate_tile_derivs();
        log::debug!("tile {}: {:?}", tilenum, tile);
    }

    /// 0x32 - Set Tile Size
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x32 | SL (44-55) | TL (32-43)
    /// w1: tile (24-26) | SH (12-23) | TH (0-11)
    /// ```
    ///
    /// Bounds are 10.2 fixed point.
    pub fn set_tile_size(&mut self, words: &[u32; 2]) {
        let tilenum = tile_index(words[1]);
        let (sl, tl, sh, th) = tile_bounds(words);
        let tile = &mut self.tiles[tilenum];
        tile.sl = sl;
        tile.tl = tl;
        tile.sh = sh;
        tile.th = th;
        tile.calculate_clamp_diffs();
    }

    /// 0x3D - Set Texture Image
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x3D | format (53-55) | size (51-52) | width - 1 (32-41)
    /// w1: RDRAM address
    /// ```
    pub fn set_texture_image(&mut self, words: &[u32; 2]) {
        self.ti = TextureImage {
            format: (words[0] >> 21) & 7,
            size: (words[0] >> 19) & 3,
            width: ((words[0] & 0x3ff) + 1) as i32,
            address: words[1] & 0x00ff_ffff,
        };
        log::debug!(
            "texture image at {:#08x}: format {} size {} width {}",
            self.ti.address,
            self.ti.format,
            self.ti.size,
            self.ti.width
        );
    }

    /// 0x33 - Load Block
    ///
    /// Loads a run of texels as one scanline. `dxt` is the per-line T
    /// increment: TMEM rows advance whenever its accumulator carries.
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x33 | SL (44-55) | TL (32-43)
    /// w1: tile (24-26) | SH (12-23) | DxT (0-11)
    /// ```
    pub fn load_block(&mut self, words: &[u32; 2]) {
        let tilenum = tile_index(words[1]);
        let (sl, tl, sh, dxt) = tile_bounds(words);
        {
            let tile = &mut self.tiles[tilenum];
            tile.sl = sl;
            tile.tl = tl;
            tile.sh = sh;
            tile.th = dxt;
            tile.calculate_clamp_diffs();
        }

        let tlclamped = tl & 0x3ff;
        let size = self.ti.size as i32;

        let lewdata = [
            (words[0] & 0xff00_0000) as i32 | (0x10 << 19) | ((tilenum as i32) << 16) | ((tlclamped << 2) | 3),
            (((tlclamped << 2) | 3) << 16) | (tlclamped << 2),
            sh << 16,
            sl << 16,
            sh << 16,
            ((sl << 3) << 16) | (tl << 3),
            (dxt & 0xff) << 8,
            ((0x80 >> size) << 16) | (dxt >> 8),
            0x20,
            0x20,
        ];

        self.edgewalker_for_loads(&lewdata);
    }

    /// 0x34 - Load Tile
    ///
    /// Loads a rectangle of the texture image, one TMEM line per row.
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x34 | SL (44-55) | TL (32-43)
    /// w1: tile (24-26) | SH (12-23) | TH (0-11)
    /// ```
    pub fn load_tile(&mut self, words: &[u32; 2]) {
        self.load_rectangle(words);
    }

    /// 0x30 - Load TLUT
    ///
    /// Loads palette entries into the upper half of TMEM, each 16-bit
    /// entry replicated across the four banks. Layout as Load Tile.
    pub fn load_tlut(&mut self, words: &[u32; 2]) {
        self.load_rectangle(words);
    }

    /// Shared walker setup of Load Tile and Load TLUT
    fn load_rectangle(&mut self, words: &[u32; 2]) {
        let tilenum = tile_index(words[1]);
        let (sl, tl, sh, th) = tile_bounds(words);
        {
            let tile = &mut self.tiles[tilenum];
            tile.sl = sl;
            tile.tl = tl;
            tile.sh = sh;
            tile.th = th;
            tile.calculate_clamp_diffs();
        }

        let size = self.ti.size as i32;

        let lewdata = [
            (words[0] & 0xff00_0000) as i32 | (0x10 << 19) | ((tilenum as i32) << 16) | (th | 3),
            ((th | 3) << 16) | tl,
            ((sh >> 2) << 16) | ((sh & 3) << 14),
            ((sl >> 2) << 16) | ((sl & 3) << 14),
            ((sh >> 2) << 16) | ((sh & 3) << 14),
            ((sl << 3) << 16) | (tl << 3),
            0,
            (0x200 >> size) << 16,
            0x20,
            0x20,
        ];

        self.edgewalker_for_loads(&lewdata);
    }

    /// 0x24 - Texture Rectangle
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x24 | XL (44-55) | YL (32-43)
    /// w1: tile (24-26) | XH (12-23) | YH (0-11)
    /// w2: S (16-31, s10.5) | T (0-15, s10.5)
    /// w3: DsDx (16-31, s5.10) | DtDy (0-15, s5.10)
    /// ```
    pub fn texture_rect(&mut self, words: &[u32; 4]) {
        let ew = self.texture_rect_edges(words, 0x24);
        self.edgewalker_for_prims(&ew);
    }

    /// 0x25 - Texture Rectangle Flip
    ///
    /// As [`Rdp::texture_rect`] with S and T swapped: S steps down the
    /// rectangle and T across it.
    pub fn texture_rect_flip(&mut self, words: &[u32; 4]) {
        let ew = self.texture_rect_edges(words, 0x25);
        self.edgewalker_for_prims(&ew);
    }

    /// Edge-walker words of an axis-aligned textured rectangle
    fn texture_rect_edges(&self, words: &[u32; 4], opcode: i32) -> [i32; 44] {
        let xl = ((words[0] >> 12) & 0xfff) as i32;
        let mut yl = (words[0] & 0xfff) as i32;
        let tilenum = tile_index(words[1]) as i32;
        let xh = ((words[1] >> 12) & 0xfff) as i32;
        let yh = (words[1] & 0xfff) as i32;

        let s = ((words[2] >> 16) & 0xffff) as i32;
        let t = (words[2] & 0xffff) as i32;
        let dsdx = sign16(((words[3] >> 16) & 0xffff) as i32);
        let dtdy = sign16((words[3] & 0xffff) as i32);

        if matches!(self.other_modes.cycle_type, CycleType::Fill | CycleType::Copy) {
            yl |= 3;
        }

        let xlint = (xl >> 2) & 0x3ff;
        let xhint = (xh >> 2) & 0x3ff;

        let mut ew = [0i32; 44];
        ew[0] = (opcode << 24) | ((0x80 | tilenum) << 16) | yl;
        ew[1] = (yl << 16) | yh;
        ew[2] = (xlint << 16) | ((xl & 3) << 14);
        ew[4] = (xhint << 16) | ((xh & 3) << 14);
        ew[6] = (xlint << 16) | ((xl & 3) << 14);

        ew[24] = (s << 16) | t;
        if opcode == 0x24 {
            ew[26] = (dsdx >> 5) << 16;
            ew[30] = ((dsdx & 0x1f) << 11) << 16;
            ew[32] = (dtdy >> 5) & 0xffff;
            ew[34] = (dtdy >> 5) & 0xffff;
            ew[36] = (dtdy & 0x1f) << 11;
            ew[38] = (dtdy & 0x1f) << 11;
        } else {
            ew[26] = (dtdy >> 5) & 0xffff;
            ew[30] = (dtdy & 0x1f) << 11;
            ew[32] = (dsdx >> 5) << 16;
            ew[34] = (dsdx >> 5) << 16;
            ew[36] = (dsdx & 0x1f) << 27;
            ew[38] = (dsdx & 0x1f) << 27;
        }
        ew
    }
}

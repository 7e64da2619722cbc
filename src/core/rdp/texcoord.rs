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

//! Texture coordinate unit
//!
//! Turns interpolated S/T/W into tile-relative texel coordinates:
//! perspective divide, shift, clamp, mask/mirror, and the level-of-detail
//! estimate that selects mip tiles and the LOD fraction.
//!
//! Coordinates leave the divider as 17-bit values with two overflow flags
//! above them (bit 17 underflow, bit 18 overflow). The LOD is the largest
//! texel-space step to the next pixel or the next scanline, in 10.5 fixed
//! point.
//!
//! # References
//!
//! - [N64brew: RDP texture coordinates](https://n64brew.dev/wiki/Reality_Display_Processor/Pipeline)

use super::primitives::SpanSigs;
use super::tables::Tables;
use super::{sign, sign16, Rdp};

/// Interpolated texture attributes of one pixel (s15.16)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Stw {
    pub s: i32,
    pub t: i32,
    pub w: i32,
}

impl Stw {
    pub fn new(s: i32, t: i32, w: i32) -> Self {
        Self { s, t, w }
    }

    /// Integer parts after stepping `k` increments
    #[inline(always)]
    fn stepped(&self, inc: &Stw, k: i32) -> (i32, i32, i32) {
        (
            self.s.wrapping_add(inc.s.wrapping_mul(k)) >> 16,
            self.t.wrapping_add(inc.t.wrapping_mul(k)) >> 16,
            self.w.wrapping_add(inc.w.wrapping_mul(k)) >> 16,
        )
    }
}

/// Outputs of the LOD classifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LodSignals {
    /// Mip level relative to the primitive tile
    pub l_tile: i32,
    /// LOD below one texel per pixel
    pub magnify: bool,
    /// LOD beyond the last available level
    pub distant: bool,
    /// Interpolation fraction between levels (9 bits with sharpen)
    pub lod_frac: i32,
}

/// Coordinate without perspective: the integer part, sign-extended to 17
/// bits
pub(crate) fn tcdiv_nopersp(ss: i32, st: i32, _sw: i32) -> (i32, i32) {
    (sign16(ss) & 0x1ffff, sign16(st) & 0x1ffff)
}

/// Perspective divide `S/W`, `T/W` through the reciprocal table
///
/// Results outside the 17-bit range keep their low bits and raise bit 17
/// (underflow) or bit 18 (overflow). W at or below zero always flags
/// overflow.
pub(crate) fn tcdiv_persp(tables: &Tables, ss: i32, st: i32, sw: i32) -> (i32, i32) {
    let w_carry = sign16(sw) <= 0;
    let sw = sw & 0x7fff;

    let entry = tables.tcdiv_table[sw as usize];
    let tlu_rcp = entry >> 4;
    let shift = entry & 0xf;

    let sprod = sign16(ss).wrapping_mul(tlu_rcp);
    let tprod = sign16(st).wrapping_mul(tlu_rcp);

    let tempmask = ((1 << 30) - 1) & -((1 << 29) >> shift);

    let outofbounds_s = sprod & tempmask;
    let outofbounds_t = tprod & tempmask;

    let (sprod, tprod, temps, tempt) = if shift != 0xe {
        let shift_value = 13 - shift;
        let sprod = sprod >> shift_value;
        let tprod = tprod >> shift_value;
        (sprod, tprod, sprod, tprod)
    } else {
        (sprod, tprod, sprod << 1, tprod << 1)
    };

    let overunder = |outofbounds: i32, prod: i32| -> i32 {
        let mut flags = 0;
        if outofbounds != tempmask && outofbounds != 0 {
            flags = if prod & (1 << 29) == 0 { 2 << 17 } else { 1 << 17 };
        }
        if w_carry {
            flags |= 2 << 17;
        }
        flags
    };

    (
        (temps & 0x1ffff) | overunder(outofbounds_s, sprod),
        (tempt & 0x1ffff) | overunder(outofbounds_t, tprod),
    )
}

/// Combine the S and T steps between two coordinates into a 15-bit LOD
///
/// The larger of both steps and `previous` wins; bit 14 flags a step
/// that overflowed the LOD range.
pub(crate) fn tclod_4x17_to_15(scurr: i32, snext: i32, tcurr: i32, tnext: i32, previous: i32) -> i32 {
    let delta = |next: i32, curr: i32| -> i32 {
        let d = sign(next, 17) - sign(curr, 17);
        if d & 0x20000 != 0 {
            !d & 0x1ffff
        } else {
            d
        }
    };

    let dels = delta(snext, scurr).max(delta(tnext, tcurr)).max(previous);
    let mut lod = dels & 0x7fff;
    if dels & 0x1c000 != 0 {
        lod |= 0x4000;
    }
    lod
}

/// Saturate a divided coordinate to the 16-bit LOD input range
fn tcclamp_one(coord: i32) -> i32 {
    if coord & 0x40000 != 0 {
        0x7fff
    } else if coord & 0x20000 != 0 {
        0x8000
    } else {
        match coord & 0x18000 {
            0x8000 => 0x7fff,
            0x10000 => 0x8000,
            _ => coord & 0xffff,
        }
    }
}

/// Saturate both divided coordinates ahead of the texture pipeline
pub(crate) fn tclod_tcclamp(sss: i32, sst: i32) -> (i32, i32) {
    (tcclamp_one(sss), tcclamp_one(sst))
}

/// Any coordinate flagged out of range disables the LOD computation
#[inline(always)]
fn any_lodclamp(coords: &[i32]) -> bool {
    coords.iter().any(|&c| c & 0x60000 != 0)
}

impl Rdp {
    // ===== Divide =====

    /// Divide through the mode's selected divider
    #[inline(always)]
    pub(crate) fn tcdiv(&self, ss: i32, st: i32, sw: i32) -> (i32, i32) {
        if self.other_modes.persp_tex_en {
            tcdiv_persp(&self.tables, ss, st, sw)
        } else {
            tcdiv_nopersp(ss, st, sw)
        }
    }

    // ===== Shift / clamp / mask =====

    /// Apply the tile's coordinate shift to one axis
    fn tcshift_axis(coord: i32, shifter: i32) -> i32 {
        if shifter < 11 {
            sign16(coord) >> shifter
        } else {
            sign16(coord << (16 - shifter))
        }
    }

    /// Shift S and T, and flag coordinates at or past the tile's high bound
    ///
    /// # Returns
    ///
    /// `(s, t, maxs, maxt)`
    pub(crate) fn tcshift_cycle(&self, s: i32, t: i32, tilenum: usize) -> (i32, i32, bool, bool) {
        let tile = &self.tiles[tilenum];
        let s = Self::tcshift_axis(s, tile.shift_s);
        let t = Self::tcshift_axis(t, tile.shift_t);
        (s, t, (s >> 3) >= tile.sh, (t >> 3) >= tile.th)
    }

    /// Shift S and T for copy mode (no bound flags)
    pub(crate) fn tcshift_copy(&self, s: i32, t: i32, tilenum: usize) -> (i32, i32) {
        let tile = &self.tiles[tilenum];
        (
            Self::tcshift_axis(s, tile.shift_s),
            Self::tcshift_axis(t, tile.shift_t),
        )
    }

    /// Clamp tile-relative 10.5 coordinates to the tile and drop the
    /// fraction
    ///
    /// A clamped coordinate also zeroes its fraction so the filter does not
    /// blend past the edge.
    ///
    /// # Returns
    ///
    /// `(s, t, sfrac, tfrac)`
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tcclamp_cycle(
        &self,
        s: i32,
        t: i32,
        sfrac: i32,
        tfrac: i32,
        maxs: bool,
        maxt: bool,
        tilenum: usize,
    ) -> (i32, i32, i32, i32) {
        let f = &self.tiles[tilenum].f;
        let clamp_axis = |coord: i32, frac: i32, enabled: bool, max: bool, diff: i32| {
            if !enabled {
                (coord >> 5, frac)
            } else if max {
                (diff, 0)
            } else if coord & 0x10000 == 0 {
                (coord >> 5, frac)
            } else {
                (0, 0)
            }
        };
        let (s, sfrac) = clamp_axis(s, sfrac, f.clampens, maxs, f.clampdiffs);
        let (t, tfrac) = clamp_axis(t, tfrac, f.clampent, maxt, f.clampdifft);
        (s, t, sfrac, tfrac)
    }

    /// [`Rdp::tcclamp_cycle`] without fractions, for point sampling
    pub(crate) fn tcclamp_cycle_light(&self, s: i32, t: i32, maxs: bool, maxt: bool, tilenum: usize) -> (i32, i32) {
        let (s, t, _, _) = self.tcclamp_cycle(s, t, 0, 0, maxs, maxt, tilenum);
        (s, t)
    }

    /// Wrap or mirror one coordinate
    #[inline(always)]
    fn mask_axis(&self, coord: i32, mask: i32, mirror: bool, clamped: i32) -> i32 {
        if mask == 0 {
            return coord;
        }
        let mut coord = coord;
        if mirror {
            let wrap = (coord >> clamped) & 1;
            coord ^= -wrap;
        }
        coord & self.tables.maskbits_table[mask as usize]
    }

    /// Wrap or mirror S and T by the tile's masks
    pub(crate) fn tcmask(&self, s: i32, t: i32, tilenum: usize) -> (i32, i32) {
        let tile = &self.tiles[tilenum];
        (
            self.mask_axis(s, tile.mask_s, tile.ms, tile.f.masksclamped),
            self.mask_axis(t, tile.mask_t, tile.mt, tile.f.masktclamped),
        )
    }

    /// Wrap or mirror the top-left texel of a quad and derive the step to
    /// its neighbour
    ///
    /// The step is normally 1; it reverses inside a mirrored copy, becomes
    /// 0 on the mirror seam, and jumps back to 0 at a wrap.
    ///
    /// # Returns
    ///
    /// `(s, sdiff, t, tdiff)`
    pub(crate) fn tcmask_coupled(&self, s: i32, t: i32, tilenum: usize) -> (i32, i32, i32, i32) {
        let tile = &self.tiles[tilenum];

        let couple = |coord: i32, mask: i32, mirror: bool, clamped: i32, wrapmask: i32| {
            if mask == 0 {
                return (coord, 1);
            }
            let maskbits = self.tables.maskbits_table[mask as usize];
            if mirror {
                let wrap = (coord >> clamped) & 1;
                let coord = (coord ^ -wrap) & maskbits;
                let diff = if ((coord - wrap) & maskbits) == maskbits {
                    0
                } else {
                    1 - (wrap << 1)
                };
                (coord, diff)
            } else {
                let coord = coord & maskbits;
                let diff = if coord == maskbits { -(coord & wrapmask) } else { 1 };
                (coord, diff)
            }
        };

        // The T step is applied to an 8-bit row number
        let (s, sdiff) = couple(s, tile.mask_s, tile.ms, tile.f.masksclamped, !0);
        let (t, tdiff) = couple(t, tile.mask_t, tile.mt, tile.f.masktclamped, 0xff);
        (s, sdiff, t, tdiff)
    }

    /// Wrap or mirror four consecutive copy-mode S values and T
    pub(crate) fn tcmask_copy(&self, s: [i32; 4], t: i32, tilenum: usize) -> ([i32; 4], i32) {
        let tile = &self.tiles[tilenum];
        let s = s.map(|c| self.mask_axis(c, tile.mask_s, tile.ms, tile.f.masksclamped));
        let t = self.mask_axis(t, tile.mask_t, tile.mt, tile.f.masktclamped);
        (s, t)
    }

    /// Copy-mode coordinate pipeline: shift, tile-relative, integer texel,
    /// then four S values and mask
    pub(crate) fn tc_pipeline_copy(&self, sss: i32, sst: i32, tilenum: usize) -> ([i32; 4], i32) {
        let tile = &self.tiles[tilenum];
        let (ss0, st) = self.tcshift_copy(sss, sst, tilenum);
        let ss0 = (ss0 - (tile.sl << 3)) >> 5;
        let st = (st - (tile.tl << 3)) >> 5;
        self.tcmask_copy([ss0, ss0 + 1, ss0 + 2, ss0 + 3], st, tilenum)
    }

    /// Load coordinate pipeline: tile-relative texel coordinate
    ///
    /// TLUT and block loads keep two more fraction bits (`coord_quad`).
    pub(crate) fn tc_pipeline_load(&self, sss: i32, sst: i32, tilenum: usize, coord_quad: bool) -> (i32, i32) {
        let tile = &self.tiles[tilenum];
        let sss = sign16(sss) - (tile.sl << 3);
        let sst = sign16(sst) - (tile.tl << 3);
        let shift = if coord_quad { 3 } else { 5 };
        (sss >> shift, sst >> shift)
    }

    // ===== Level of detail =====

    /// Classify a LOD into a mip level, magnification and distance, and
    /// compute the LOD fraction
    pub(crate) fn lodfrac_lodtile_signals(&self, lodclamp: bool, lod: i32) -> LodSignals {
        let sharpen = self.other_modes.sharpen_tex_en;
        let detail = self.other_modes.detail_tex_en;

        if lod & 0x4000 != 0 || lodclamp {
            return LodSignals {
                l_tile: 7,
                magnify: false,
                distant: true,
                lod_frac: 0xff,
            };
        }

        if lod < 32 {
            let distant = self.max_level == 0;
            let lod_frac = if !sharpen && !detail {
                if distant {
                    0xff
                } else {
                    0
                }
            } else {
                // Below the minimum level the fraction holds at it
                let base = if lod < self.min_level { self.min_level } else { lod };
                let lf = base << 3;
                if sharpen {
                    lf | 0x100
                } else {
                    lf
                }
            };
            return LodSignals {
                l_tile: 0,
                magnify: true,
                distant,
                lod_frac,
            };
        }

        let l_tile = self.tables.log2table[((lod >> 5) & 0xff) as usize];
        let distant = if self.max_level != 0 {
            lod & 0x6000 != 0 || l_tile >= self.max_level
        } else {
            true
        };
        let lod_frac = if !sharpen && !detail && distant {
            0xff
        } else {
            ((lod << 3) >> l_tile) & 0xff
        };
        LodSignals {
            l_tile,
            magnify: false,
            distant,
            lod_frac,
        }
    }

    /// Tile for a single texel per cycle
    fn lod_tile_single(&self, prim_tile: usize, sig: &LodSignals) -> Option<usize> {
        if !self.other_modes.tex_lod_en {
            return None;
        }
        let l_tile = if sig.distant { self.max_level } else { sig.l_tile };
        let detail_step = if !self.other_modes.detail_tex_en || sig.magnify { 0 } else { 1 };
        Some((prim_tile as i32 + l_tile + detail_step) as usize & 7)
    }

    /// Tiles for the two texels of a 2-cycle pixel
    fn lod_tiles_pair(&self, prim_tile: usize, sig: &LodSignals) -> Option<(usize, usize)> {
        if !self.other_modes.tex_lod_en {
            return None;
        }
        let l_tile = if sig.distant { self.max_level } else { sig.l_tile };
        let base = prim_tile as i32 + l_tile;
        let pair = if !self.other_modes.detail_tex_en {
            let t1 = base as usize & 7;
            let t2 = if !(sig.distant || (!self.other_modes.sharpen_tex_en && sig.magnify)) {
                (t1 + 1) & 7
            } else {
                t1
            };
            (t1, t2)
        } else {
            let t1 = if !sig.magnify { base + 1 } else { base } as usize & 7;
            let t2 = if !sig.distant && !sig.magnify {
                (base + 2) as usize & 7
            } else {
                (base + 1) as usize & 7
            };
            (t1, t2)
        };
        Some(pair)
    }

    /// Step one pixel and one scanline from the current pixel, divide both
    fn next_and_vertical(&self, cur: &Stw, inc: &Stw) -> ((i32, i32), (i32, i32)) {
        let (ns, nt, nw) = cur.stepped(inc, 1);
        let dy = Stw::new(self.deltas.dsdy, self.deltas.dtdy, self.deltas.dwdy);
        let (ys, yt, yw) = cur.stepped(&dy, 1);
        (self.tcdiv(ns, nt, nw), self.tcdiv(ys, yt, yw))
    }

    /// LOD from the current coordinate to the next pixel and the next
    /// scanline
    fn lod_2cycle(&self, init: (i32, i32), next: (i32, i32), vert: (i32, i32)) -> LodSignals {
        let lodclamp = any_lodclamp(&[init.1, next.1, init.0, next.0, vert.0, vert.1]);
        let lod = if !lodclamp {
            let lod = tclod_4x17_to_15(init.0, next.0, init.1, next.1, 0);
            tclod_4x17_to_15(init.0, vert.0, init.1, vert.1, lod)
        } else {
            0
        };
        self.lodfrac_lodtile_signals(lodclamp, lod)
    }

    /// LOD from the next pixel to the far pixel
    fn lod_1cycle(&self, next: (i32, i32), far: (i32, i32)) -> LodSignals {
        let lodclamp = any_lodclamp(&[far.1, next.1, far.0, next.0]);
        let lod = if !lodclamp {
            tclod_4x17_to_15(next.0, far.0, next.1, far.1, 0)
        } else {
            0
        };
        self.lodfrac_lodtile_signals(lodclamp, lod)
    }

    /// 2-cycle LOD for the current pixel, `next` already divided
    ///
    /// # Arguments
    ///
    /// * `sss`, `sst` - Divided coordinate, clamped in place
    /// * `next` - Divided coordinate of the next pixel
    /// * `cur`, `inc` - Interpolated attributes and their per-pixel step
    /// * `prim_tile` - Primitive tile
    /// * `t1`, `t2` - Tiles for the two cycles, updated when LOD is on
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tclod_2cycle_current(
        &mut self,
        sss: &mut i32,
        sst: &mut i32,
        next: (i32, i32),
        cur: &Stw,
        prim_tile: usize,
        t1: &mut usize,
        t2: &mut usize,
    ) {
        let init = (*sss, *sst);
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if self.derivs.dolod {
            let dy = Stw::new(self.deltas.dsdy, self.deltas.dtdy, self.deltas.dwdy);
            let (ys, yt, yw) = cur.stepped(&dy, 1);
            let vert = self.tcdiv(ys, yt, yw);
            let sig = self.lod_2cycle(init, next, vert);
            self.lod_frac = sig.lod_frac;
            if let Some(pair) = self.lod_tiles_pair(prim_tile, &sig) {
                (*t1, *t2) = pair;
            }
        }
    }

    /// 2-cycle LOD for the first pixel of a span
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tclod_2cycle_current_simple(
        &mut self,
        sss: &mut i32,
        sst: &mut i32,
        cur: &Stw,
        inc: &Stw,
        prim_tile: usize,
        t1: &mut usize,
        t2: &mut usize,
    ) {
        let init = (*sss, *sst);
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if self.derivs.dolod {
            let (next, vert) = self.next_and_vertical(cur, inc);
            let sig = self.lod_2cycle(init, next, vert);
            self.lod_frac = sig.lod_frac;
            if let Some(pair) = self.lod_tiles_pair(prim_tile, &sig) {
                (*t1, *t2) = pair;
            }
        }
    }

    /// 2-cycle LOD when only texel 0 is sampled
    pub(crate) fn tclod_2cycle_current_notexel1(
        &mut self,
        sss: &mut i32,
        sst: &mut i32,
        cur: &Stw,
        inc: &Stw,
        prim_tile: usize,
        t1: &mut usize,
    ) {
        let init = (*sss, *sst);
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if self.derivs.dolod {
            let (next, vert) = self.next_and_vertical(cur, inc);
            let sig = self.lod_2cycle(init, next, vert);
            self.lod_frac = sig.lod_frac;
            if let Some(tile) = self.lod_tile_single(prim_tile, &sig) {
                *t1 = tile;
            }
        }
    }

    /// 2-cycle LOD for the prefetched next pixel
    ///
    /// # Returns
    ///
    /// The LOD fraction to use once that pixel becomes current, if LOD is
    /// on
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tclod_2cycle_next(
        &self,
        sss: &mut i32,
        sst: &mut i32,
        cur: &Stw,
        inc: &Stw,
        prim_tile: usize,
        t1: &mut usize,
        t2: &mut usize,
    ) -> Option<i32> {
        let init = (*sss, *sst);
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if !self.derivs.dolod {
            return None;
        }
        let (next, vert) = self.next_and_vertical(cur, inc);
        let sig = self.lod_2cycle(init, next, vert);
        if let Some(pair) = self.lod_tiles_pair(prim_tile, &sig) {
            (*t1, *t2) = pair;
        }
        Some(sig.lod_frac)
    }

    /// Attributes two pixels ahead, or one behind near the end of a span
    fn far_coord(cur: &Stw, inc: &Stw, sigs: &SpanSigs) -> (i32, i32, i32) {
        if !(sigs.preendspan && sigs.longspan) && !(sigs.endspan && sigs.midspan) {
            cur.stepped(inc, 2)
        } else {
            cur.stepped(inc, -1)
        }
    }

    /// 1-cycle LOD for the first pixel of a span, `next` already divided
    ///
    /// At the end of a long span the far sample comes from the start of
    /// the next scanline.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tclod_1cycle_current(
        &mut self,
        sss: &mut i32,
        sst: &mut i32,
        next: (i32, i32),
        cur: &Stw,
        inc: &Stw,
        scanline: usize,
        prim_tile: usize,
        t1: &mut usize,
        sigs: &SpanSigs,
    ) {
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if !self.derivs.dolod {
            return;
        }

        let nextspan = &self.spans[scanline + 1];
        let (fars, fart, farsw) = if nextspan.validline {
            if !sigs.endspan || !sigs.longspan {
                Self::far_coord(cur, inc, sigs)
            } else {
                let ns = Stw::new(nextspan.s, nextspan.t, nextspan.w);
                ns.stepped(inc, 1)
            }
        } else {
            cur.stepped(inc, 2)
        };
        let far = self.tcdiv(fars, fart, farsw);

        let sig = self.lod_1cycle(next, far);
        self.lod_frac = sig.lod_frac;
        if let Some(tile) = self.lod_tile_single(prim_tile, &sig) {
            *t1 = tile;
        }
    }

    /// 1-cycle LOD when texel 1 is not needed
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tclod_1cycle_current_simple(
        &mut self,
        sss: &mut i32,
        sst: &mut i32,
        cur: &Stw,
        inc: &Stw,
        scanline: usize,
        prim_tile: usize,
        t1: &mut usize,
        sigs: &SpanSigs,
    ) {
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if !self.derivs.dolod {
            return;
        }

        let nextspan = &self.spans[scanline + 1];
        let (next, far) = if nextspan.validline {
            if !sigs.endspan || !sigs.longspan {
                (cur.stepped(inc, 1), Self::far_coord(cur, inc, sigs))
            } else {
                let ns = Stw::new(nextspan.s, nextspan.t, nextspan.w);
                (ns.stepped(inc, 0), ns.stepped(inc, 1))
            }
        } else {
            (cur.stepped(inc, 1), cur.stepped(inc, 2))
        };
        let next = self.tcdiv(next.0, next.1, next.2);
        let far = self.tcdiv(far.0, far.1, far.2);

        let sig = self.lod_1cycle(next, far);
        self.lod_frac = sig.lod_frac;
        if let Some(tile) = self.lod_tile_single(prim_tile, &sig) {
            *t1 = tile;
        }
    }

    /// 1-cycle LOD for the prefetched next pixel
    ///
    /// # Returns
    ///
    /// The LOD fraction to use once that pixel becomes current, if LOD is
    /// on
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn tclod_1cycle_next(
        &self,
        sss: &mut i32,
        sst: &mut i32,
        cur: &Stw,
        inc: &Stw,
        scanline: usize,
        prim_tile: usize,
        t1: &mut usize,
        sigs: &SpanSigs,
    ) -> Option<i32> {
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if !self.derivs.dolod {
            return None;
        }

        let nextspan = &self.spans[scanline + 1];
        let ns = Stw::new(nextspan.s, nextspan.t, nextspan.w);
        let (next, far) = if nextspan.validline {
            if !sigs.nextspan {
                if !sigs.endspan || !sigs.longspan {
                    (cur.stepped(inc, 1), Self::far_coord(cur, inc, sigs))
                } else {
                    (ns.stepped(inc, 0), ns.stepped(inc, 1))
                }
            } else if sigs.longspan {
                (ns.stepped(inc, 1), ns.stepped(inc, 2))
            } else if sigs.midspan {
                (ns.stepped(inc, 0), ns.stepped(inc, 1))
            } else if sigs.onelessthanmid {
                (cur.stepped(inc, 1), cur.stepped(inc, -1))
            } else {
                (cur.stepped(inc, 1), cur.stepped(inc, 2))
            }
        } else {
            (cur.stepped(inc, 1), cur.stepped(inc, 2))
        };
        let next = self.tcdiv(next.0, next.1, next.2);
        let far = self.tcdiv(far.0, far.1, far.2);

        let sig = self.lod_1cycle(next, far);
        if let Some(tile) = self.lod_tile_single(prim_tile, &sig) {
            *t1 = tile;
        }
        Some(sig.lod_frac)
    }

    /// Copy-mode tile selection
    ///
    /// Copy mode never computes a LOD fraction, but still picks a mip
    /// level when LOD is enabled.
    pub(crate) fn tclod_copy(
        &self,
        sss: &mut i32,
        sst: &mut i32,
        cur: &Stw,
        inc: &Stw,
        prim_tile: usize,
        t1: &mut usize,
    ) {
        (*sss, *sst) = tclod_tcclamp(*sss, *sst);

        if !self.other_modes.tex_lod_en {
            return;
        }

        let (ns, nt, nw) = cur.stepped(inc, 1);
        let (fs, ft, fw) = cur.stepped(inc, 2);
        let next = self.tcdiv(ns, nt, nw);
        let far = self.tcdiv(fs, ft, fw);

        let lodclamp = any_lodclamp(&[far.1, next.1, far.0, next.0]);
        let lod = if !lodclamp {
            tclod_4x17_to_15(next.0, far.0, next.1, far.1, 0)
        } else {
            0
        };

        let (l_tile, magnify) = if lod & 0x4000 != 0 || lodclamp {
            (self.max_level, false)
        } else if lod < 32 {
            (0, true)
        } else {
            let l_tile = self.tables.log2table[((lod >> 5) & 0xff) as usize];
            let distant = self.max_level == 0 || lod & 0x6000 != 0 || l_tile >= self.max_level;
            (if distant { self.max_level } else { l_tile }, false)
        };

        let detail_step = if !self.other_modes.detail_tex_en || magnify { 0 } else { 1 };
        *t1 = (prim_tile as i32 + l_tile + detail_step) as usize & 7;
    }

    // ===== Texel prefetch =====

    /// Divided coordinate of the next pixel in a 1-cycle span
    ///
    /// The last pixel of a long span prefetches from the start of the next
    /// scanline instead.
    pub(crate) fn get_texel1_1cycle(&self, cur: &Stw, inc: &Stw, scanline: usize, sigs: &SpanSigs) -> (i32, i32) {
        let nextspan = &self.spans[scanline + 1];
        let (s, t, w) = if !sigs.endspan || !sigs.longspan || !nextspan.validline {
            cur.stepped(inc, 1)
        } else {
            Stw::new(nextspan.s, nextspan.t, nextspan.w).stepped(inc, 0)
        };
        self.tcdiv(s, t, w)
    }

    /// Divided coordinate of the next pixel in a 2-cycle span
    pub(crate) fn get_nexttexel0_2cycle(&self, cur: &Stw, inc: &Stw) -> (i32, i32) {
        let (s, t, w) = cur.stepped(inc, 1);
        self.tcdiv(s, t, w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use proptest::prelude::*;

    #[test]
    fn test_tcdiv_nopersp_sign_extends() {
        assert_eq!(tcdiv_nopersp(0x0010, 0xfff0, 0), (0x10, 0x1fff0));
    }

    #[test]
    fn test_tcdiv_persp_unit_w() {
        let tables = Tables::new();
        // Largest W leaves the coordinate unchanged
        assert_eq!(tcdiv_persp(&tables, 0x0100, 0x0040, 0x7fff), (0x100, 0x40));
    }

    #[test]
    fn test_tcdiv_persp_negative_w_overflows() {
        let tables = Tables::new();
        let (s, t) = tcdiv_persp(&tables, 0x10, 0x10, 0x8000);
        assert_ne!(s & (2 << 17), 0);
        assert_ne!(t & (2 << 17), 0);
    }

    #[test]
    fn test_tcdiv_persp_unit_w_keeps_high_s_unflagged() {
        let tables = Tables::new();
        // An S with its top bit set sign-extends into 17 bits; no overflow
        for (ss, expected) in [(0x8000, 0x18000), (0xc000, 0x1c000), (0xfff0, 0x1fff0), (0xffff, 0x1ffff)] {
            let (s, t) = tcdiv_persp(&tables, ss, 0, 0x7fff);
            assert_eq!(s, expected, "s {ss:#x}");
            assert_eq!(s & (3 << 17), 0);
            assert_eq!(t, 0);
        }
    }

    #[test]
    fn test_tclod_tcclamp_saturates() {
        assert_eq!(tclod_tcclamp(0x40000, 0x20000), (0x7fff, 0x8000));
        assert_eq!(tclod_tcclamp(0x8000, 0x10000), (0x7fff, 0x8000));
        assert_eq!(tclod_tcclamp(0x1234, 0x18000), (0x1234, 0x8000));
    }

    #[test]
    fn test_tclod_4x17_to_15() {
        assert_eq!(tclod_4x17_to_15(0, 0x40, 0, 0x10, 0), 0x40);
        assert_eq!(tclod_4x17_to_15(0, 0x10, 0, 0x10, 0x80), 0x80);
        // A step of 1 << 14 is out of range
        assert_ne!(tclod_4x17_to_15(0, 0x4000, 0, 0, 0) & 0x4000, 0);
    }

    #[test]
    fn test_tcmask_mirror() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.mask_s = 3;
        tile.ms = true;
        tile.calculate_tile_derivs();

        // 8-texel mirror: 8..15 map back down 7..0
        assert_eq!(rdp.tcmask(5, 0, 0).0, 5);
        assert_eq!(rdp.tcmask(8, 0, 0).0, 7);
        assert_eq!(rdp.tcmask(15, 0, 0).0, 0);
    }

    #[test]
    fn test_tcmask_coupled_wrap_step() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.mask_s = 2;
        tile.mask_t = 2;
        tile.calculate_tile_derivs();

        let (s, sdiff, t, tdiff) = rdp.tcmask_coupled(3, 1, 0);
        assert_eq!((s, sdiff), (3, -3));
        assert_eq!((t, tdiff), (1, 1));
    }

    #[test]
    fn test_tcmask_coupled_mirror_seam() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.mask_s = 2;
        tile.ms = true;
        tile.calculate_tile_derivs();

        // Last texel before the seam repeats itself
        assert_eq!(rdp.tcmask_coupled(3, 0, 0).1, 0);
        // Inside the mirrored copy the step runs backwards
        assert_eq!(rdp.tcmask_coupled(5, 0, 0).1, -1);
    }

    #[test]
    fn test_tcclamp_cycle() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.cs = true;
        tile.sh = 7 << 2;
        tile.calculate_clamp_diffs();
        tile.calculate_tile_derivs();

        // Past the high bound: clamp and drop the fraction
        assert_eq!(rdp.tcclamp_cycle(0x200, 0x40, 0x1f, 3, true, false, 0), (7, 2, 0, 3));
        // Negative: clamp to zero
        assert_eq!(rdp.tcclamp_cycle(0x1ffe0, 0, 0x1f, 0, false, false, 0).0, 0);
    }

    #[test]
    fn test_tcshift() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.tiles[0].shift_s = 1;
        rdp.tiles[0].shift_t = 15;
        assert_eq!(rdp.tcshift_copy(0x40, 0x40, 0), (0x20, 0x80));
    }

    #[test]
    fn test_lod_signals_magnify() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.max_level = 2;
        let sig = rdp.lodfrac_lodtile_signals(false, 16);
        assert!(sig.magnify);
        assert!(!sig.distant);
        assert_eq!(sig.lod_frac, 0);
    }

    #[test]
    fn test_lod_signals_minify() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.max_level = 3;
        // LOD of 2.5 texels: level 1, fraction 0.25
        let sig = rdp.lodfrac_lodtile_signals(false, 0x50);
        assert_eq!(sig.l_tile, 1);
        assert!(!sig.distant);
        assert_eq!(sig.lod_frac, 0x40);
    }

    #[test]
    fn test_lod_signals_clamped() {
        let rdp = Rdp::new(&RdpConfig::default());
        let sig = rdp.lodfrac_lodtile_signals(true, 0);
        assert_eq!(sig, LodSignals { l_tile: 7, magnify: false, distant: true, lod_frac: 0xff });
    }

    proptest! {
        #[test]
        fn prop_tcclamp_keeps_in_range(s in 0i32..0x8000, t in 0i32..0x8000) {
            prop_assert_eq!(tclod_tcclamp(s, t), (s, t));
        }

        #[test]
        fn prop_tile_clamp_bounds_coordinates(
            sl in 0i32..0x400,
            span in 0i32..0xc00,
            tl in 0i32..0x400,
            tspan in 0i32..0xc00,
            s in 0i32..0x8000,
            t in 0i32..0x8000,
        ) {
            let mut rdp = Rdp::new(&RdpConfig::default());
            let tile = &mut rdp.tiles[0];
            tile.cs = true;
            tile.ct = true;
            tile.sl = sl;
            tile.sh = sl + span;
            tile.tl = tl;
            tile.th = tl + tspan;
            tile.calculate_clamp_diffs();
            tile.calculate_tile_derivs();
            let tile = rdp.tiles[0];

            let (sss, sst, maxs, maxt) = rdp.tcshift_cycle(s, t, 0);
            let rel_s = sss - (tile.sl << 3);
            let rel_t = sst - (tile.tl << 3);
            let clamped = rdp.tcclamp_cycle(rel_s, rel_t, rel_s & 0x1f, rel_t & 0x1f, maxs, maxt, 0);

            let expect = |abs: i32, rel: i32, high: i32, diff: i32| {
                if abs >> 3 >= high {
                    (diff, 0)
                } else if rel < 0 {
                    (0, 0)
                } else {
                    (rel >> 5, rel & 0x1f)
                }
            };
            let (es, esfrac) = expect(s, rel_s, tile.sh, tile.f.clampdiffs);
            let (et, etfrac) = expect(t, rel_t, tile.th, tile.f.clampdifft);
            prop_assert_eq!(clamped, (es, et, esfrac, etfrac));
            prop_assert_eq!(rdp.tcclamp_cycle_light(rel_s, rel_t, maxs, maxt, 0), (es, et));
        }

        #[test]
        fn prop_lod_never_below_previous(a in 0i32..0x1000, b in 0i32..0x1000, p in 0i32..0x4000) {
            prop_assert!(tclod_4x17_to_15(a, b, a, b, p) >= p);
        }
    }
}

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

//! Edge walkers
//!
//! The RDP rasterizes in two passes. The edge walker steps the three edges
//! of a primitive down the screen at four subscanlines per scanline,
//! clips them against the scissor and records, per scanline, the covered
//! x range and the attribute values at the major edge. The span renderers
//! then sweep each recorded scanline pixel by pixel.
//!
//! Edge-walker data is the command's raw word list widened to `i32`:
//!
//! | Words   | Contents                                         |
//! |---------|--------------------------------------------------|
//! | 0-7     | flags, tile, y bounds, x and dx/dy of each edge  |
//! | 8-23    | shade: value, d/dx, d/de, d/dy (hi/lo halves)    |
//! | 24-39   | texture s, t, w: value, d/dx, d/de, d/dy         |
//! | 40-43   | depth: value, d/dx, d/de, d/dy                   |
//!
//! Load commands reuse the walker with a ten-word layout that carries only
//! the rectangle and s/t.
//!
//! # References
//!
//! - [N64brew: RDP Triangle Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands#0x08_-_Non-Shaded_Triangle)

use super::primitives::{Span, SPAN_COUNT};
use super::registers::CycleType;
use super::zbuffer::normalize_dzpix;
use super::{sign, Rdp};

/// Upper halfword mask
const HI: i32 = 0xffff_0000u32 as i32;

/// Opcode of `Load TLUT`
const CMD_LOAD_TLUT: i32 = 0x30;
/// Opcode of `Load Block`
const CMD_LOAD_BLOCK: i32 = 0x33;

/// Attribute whose integer half is in the top of `hi` and fraction in the
/// top of `lo`
#[inline(always)]
fn upper_pair(hi: i32, lo: i32) -> i32 {
    (hi & HI) | ((lo >> 16) & 0xffff)
}

/// Attribute whose integer half is in the bottom of `hi` and fraction in
/// the bottom of `lo`
#[inline(always)]
fn lower_pair(hi: i32, lo: i32) -> i32 {
    ((hi << 16) & HI) | (lo & 0xffff)
}

/// Absolute value of a 16-bit slope, one's complement for negatives
#[inline(always)]
fn dz_magnitude(dz: i32) -> i32 {
    if dz & 0x8000 != 0 {
        !dz & 0x7fff
    } else {
        dz
    }
}

/// Interpolated attribute order used by the walker
const R: usize = 0;
const G: usize = 1;
const B: usize = 2;
const A: usize = 3;
const S: usize = 4;
const T: usize = 5;
const W: usize = 6;
const Z: usize = 7;

/// Per-attribute walker state
#[derive(Debug, Clone, Copy, Default)]
struct EdgeAttrs {
    /// Value at the major edge of the current scanline
    value: [i32; 8],
    /// Step along the major edge per scanline
    de: [i32; 8],
    /// Subpixel offset correction applied at span start
    diff: [i32; 8],
    /// Half of the x step, for the x-fraction correction
    dxh: [i32; 8],
}

impl EdgeAttrs {
    /// Store the start values of scanline `span`, corrected by the
    /// fractional x of the major edge
    fn adjust(&self, span: &mut Span, xfrac: i32) {
        let adjusted: [i32; 8] = std::array::from_fn(|i| {
            ((self.value[i] & !0x1ff)
                .wrapping_add(self.diff[i])
                .wrapping_sub(xfrac.wrapping_mul(self.dxh[i])))
                & !0x3ff
        });
        span.r = adjusted[R];
        span.g = adjusted[G];
        span.b = adjusted[B];
        span.a = adjusted[A];
        span.s = adjusted[S];
        span.t = adjusted[T];
        span.w = adjusted[W];
        span.z = adjusted[Z];
    }

    /// Step every attribute one scanline down the major edge
    fn step(&mut self) {
        for (value, de) in self.value.iter_mut().zip(self.de.iter()) {
            *value = value.wrapping_add(*de);
        }
    }
}

/// One edge clipped against the scissor, in 1/8 pixels
///
/// # Returns
///
/// `(clipped, under, over)`: the clipped coordinate (13 bits) and whether
/// the edge was left of the scissor's left or right of its right bound
#[inline(always)]
fn clip_edge(x: i32, clipxhshift: i32, clipxlshift: i32) -> (i32, bool, bool) {
    let stickybit = (((x >> 1) & 0x1fff) > 0) as i32;
    let xsc = ((x >> 13) & 0x1ffe) | stickybit;
    let under = (x & 0x800_0000) != 0 || xsc < clipxhshift;
    let xsc = if under {
        clipxhshift
    } else {
        ((x >> 13) & 0x3ffe) | stickybit
    };
    let over = (xsc & 0x2000) != 0 || (xsc & 0x1fff) >= clipxlshift;
    let xsc = if over { clipxlshift } else { xsc };
    (xsc & 0x1fff, under, over)
}

impl Rdp {
    /// Walk a triangle or rectangle and render it
    ///
    /// # Arguments
    ///
    /// * `ewdata` - Edge-walker words (see the module docs)
    pub(crate) fn edgewalker_for_prims(&mut self, ewdata: &[i32; 44]) {
        let flip = ewdata[0] & 0x80_0000 != 0;
        self.max_level = (ewdata[0] >> 19) & 7;
        let tilenum = ((ewdata[0] >> 16) & 7) as usize;

        let yl = sign(ewdata[0], 14);
        let ym = sign(ewdata[1] >> 16, 14);
        let yh = sign(ewdata[1], 14);

        let xl = sign(ewdata[2], 28);
        let xh = sign(ewdata[4], 28);
        let xm = sign(ewdata[6], 28);

        let dxldy = sign(ewdata[3], 30);
        let dxhdy = sign(ewdata[5], 30);
        let dxmdy = sign(ewdata[7], 30);

        // ===== Attribute unpacking =====

        let mut start = [0i32; 8];
        let mut dx = [0i32; 8];
        let mut de = [0i32; 8];
        let mut dy = [0i32; 8];

        start[R] = upper_pair(ewdata[8], ewdata[12]);
        start[G] = lower_pair(ewdata[8], ewdata[12]);
        start[B] = upper_pair(ewdata[9], ewdata[13]);
        start[A] = lower_pair(ewdata[9], ewdata[13]);
        dx[R] = upper_pair(ewdata[10], ewdata[14]);
        dx[G] = lower_pair(ewdata[10], ewdata[14]);
        dx[B] = upper_pair(ewdata[11], ewdata[15]);
        dx[A] = lower_pair(ewdata[11], ewdata[15]);
        de[R] = upper_pair(ewdata[16], ewdata[20]);
        de[G] = lower_pair(ewdata[16], ewdata[20]);
        de[B] = upper_pair(ewdata[17], ewdata[21]);
        de[A] = lower_pair(ewdata[17], ewdata[21]);
        dy[R] = upper_pair(ewdata[18], ewdata[22]);
        dy[G] = lower_pair(ewdata[18], ewdata[22]);
        dy[B] = upper_pair(ewdata[19], ewdata[23]);
        dy[A] = lower_pair(ewdata[19], ewdata[23]);

        start[S] = upper_pair(ewdata[24], ewdata[28]);
        start[T] = lower_pair(ewdata[24], ewdata[28]);
        start[W] = upper_pair(ewdata[25], ewdata[29]);
        dx[S] = upper_pair(ewdata[26], ewdata[30]);
        dx[T] = lower_pair(ewdata[26], ewdata[30]);
        dx[W] = upper_pair(ewdata[27], ewdata[31]);
        de[S] = upper_pair(ewdata[32], ewdata[36]);
        de[T] = lower_pair(ewdata[32], ewdata[36]);
        de[W] = upper_pair(ewdata[33], ewdata[37]);
        dy[S] = upper_pair(ewdata[34], ewdata[38]);
        dy[T] = lower_pair(ewdata[34], ewdata[38]);
        dy[W] = upper_pair(ewdata[35], ewdata[39]);

        start[Z] = ewdata[40];
        dx[Z] = ewdata[41];
        de[Z] = ewdata[42];
        dy[Z] = ewdata[43];

        // ===== Span deltas =====

        let d = &mut self.deltas;
        d.ds = dx[S] & !0x1f;
        d.dt = dx[T] & !0x1f;
        d.dw = dx[W] & !0x1f;
        d.dr = dx[R] & !0x1f;
        d.dg = dx[G] & !0x1f;
        d.db = dx[B] & !0x1f;
        d.da = dx[A] & !0x1f;
        d.dz = dx[Z];

        d.drdy = sign(dy[R] >> 14, 13);
        d.dgdy = sign(dy[G] >> 14, 13);
        d.dbdy = sign(dy[B] >> 14, 13);
        d.dady = sign(dy[A] >> 14, 13);
        d.dzdy = sign(dy[Z] >> 10, 22);
        d.cdr = sign(d.dr >> 14, 13);
        d.cdg = sign(d.dg >> 14, 13);
        d.cdb = sign(d.db >> 14, 13);
        d.cda = sign(d.da >> 14, 13);
        d.cdz = sign(d.dz >> 10, 22);

        d.dsdy = dy[S] & !0x7fff;
        d.dtdy = dy[T] & !0x7fff;
        d.dwdy = dy[W] & !0x7fff;

        let dzdy_dz = (dy[Z] >> 16) & 0xffff;
        let dzdx_dz = (dx[Z] >> 16) & 0xffff;
        d.dzpix = normalize_dzpix((dz_magnitude(dzdy_dz) + dz_magnitude(dzdx_dz)) & 0xffff);

        // ===== Edge setup =====

        let mut xleft_inc = (dxmdy >> 2) & !1;
        let xright_inc = (dxhdy >> 2) & !1;
        let mut xright = xh & !1;
        let mut xleft = xm & !1;

        let sign_dxhdy = ewdata[5] < 0;
        let do_offset = sign_dxhdy == flip;

        let mut attrs = EdgeAttrs {
            value: start,
            de,
            ..Default::default()
        };
        for i in 0..8 {
            if do_offset {
                // Three quarters of a scanline of (d/de - d/dy)
                let deh = de[i] >> 9;
                let dyh = dy[i] >> 9;
                attrs.diff[i] = (deh << 8)
                    .wrapping_add(deh << 7)
                    .wrapping_sub(dyh << 8)
                    .wrapping_sub(dyh << 7);
            }
            attrs.dxh[i] = (dx[i] >> 8) & !1;
        }

        // ===== Vertical limits =====

        let clip = self.clip;
        let ldflag = if sign_dxhdy != flip { 0 } else { 3 };

        let yl_inside = if yl & 0x2000 != 0 {
            true
        } else if yl & 0x1000 != 0 {
            false
        } else {
            (yl & 0xfff) < clip.yl
        };
        let yllimit = if yl_inside { yl } else { clip.yl };

        let mut ylfar = yllimit | 3;
        if (yl >> 2) > (ylfar >> 2) {
            ylfar += 4;
        } else if (0..1023).contains(&(yllimit >> 2)) {
            self.spans[((yllimit >> 2) + 1) as usize].validline = false;
        }

        let yh_inside = if yh & 0x2000 != 0 {
            false
        } else if yh & 0x1000 != 0 {
            true
        } else {
            yh >= clip.yh
        };
        let yhlimit = if yh_inside { yh } else { clip.yh };
        let yhclose = yhlimit & !3;

        let clipxlshift = clip.xl << 1;
        let clipxhshift = clip.xh << 1;

        // ===== Walk =====

        let mut far_x = 0;
        let mut near_x = 0;
        let mut allover = true;
        let mut allunder = true;
        let mut allinval = true;

        for k in (yh & !3)..=ylfar {
            if k == ym {
                xleft = xl & !1;
                xleft_inc = (dxldy >> 2) & !1;
            }

            let spix = (k & 3) as usize;
            let j = k >> 2;

            if k >= yhclose && j < SPAN_COUNT as i32 {
                let j = j as usize;
                let mut invaly = k < yhlimit || k >= yllimit;

                if spix == 0 {
                    // Left and right extents, seeded for max/min
                    (far_x, near_x) = if flip { (0, 0xfff) } else { (0xfff, 0) };
                    allover = true;
                    allunder = true;
                    allinval = true;
                }

                let (xrsc, rightunder, rightover) = clip_edge(xright, clipxhshift, clipxlshift);
                let (xlsc, leftunder, leftover) = clip_edge(xleft, clipxhshift, clipxlshift);
                let span = &mut self.spans[j];
                span.majorx[spix] = xrsc;
                span.minorx[spix] = xlsc;
                allover &= rightover && leftover;
                allunder &= rightunder && leftunder;

                let left_key = (xleft ^ (1 << 27)) & (0x3fff << 14);
                let right_key = (xright ^ (1 << 27)) & (0x3fff << 14);
                let curcross = if flip {
                    left_key < right_key
                } else {
                    right_key < left_key
                };

                invaly |= curcross;
                span.invalyscan[spix] = invaly;
                allinval &= invaly;

                if !invaly {
                    let minor = (xlsc >> 3) & 0xfff;
                    let major = (xrsc >> 3) & 0xfff;
                    if flip {
                        far_x = far_x.max(minor);
                        near_x = near_x.min(major);
                    } else {
                        far_x = far_x.min(minor);
                        near_x = near_x.max(major);
                    }
                }

                if spix == ldflag {
                    span.unscrx = sign(xright >> 16, 12);
                    attrs.adjust(span, (xright >> 8) & 0xff);
                }

                if spix == 3 {
                    span.lx = far_x;
                    span.rx = near_x;
                    let field_ok = !clip.field || clip.keep_odd == (j & 1 != 0);
                    span.validline = !allinval && !allover && !allunder && field_ok;
                }
            }

            if spix == 3 {
                attrs.step();
            }

            xleft = xleft.wrapping_add(xleft_inc);
            xright = xright.wrapping_add(xright_inc);
        }

        let start = yhlimit >> 2;
        let end = yllimit >> 2;
        log::trace!(
            "prim: tile {}, flip {}, scanlines {}..={}",
            tilenum,
            flip,
            start,
            end
        );

        match self.other_modes.cycle_type {
            CycleType::OneCycle => self.render_spans_1cycle(start, end, tilenum, flip),
            CycleType::TwoCycle => self.render_spans_2cycle(start, end, tilenum, flip),
            CycleType::Copy => self.render_spans_copy(start, end, tilenum, flip),
            CycleType::Fill => self.render_spans_fill(start, end, flip),
        }
    }

    /// Walk a load command's rectangle and copy it into TMEM
    ///
    /// # Arguments
    ///
    /// * `lewdata` - Load edge-walker words built by the load commands
    pub(crate) fn edgewalker_for_loads(&mut self, lewdata: &[i32; 10]) {
        let cmd_id = (lewdata[0] >> 24) & 0x3f;
        let ltlut = cmd_id == CMD_LOAD_TLUT;
        let coord_quad = ltlut || cmd_id == CMD_LOAD_BLOCK;
        self.max_level = 0;
        let tilenum = ((lewdata[0] >> 16) & 7) as usize;

        let yl = sign(lewdata[0], 14);
        let ym = sign(lewdata[1] >> 16, 14);
        let yh = sign(lewdata[1], 14);

        let xl = sign(lewdata[2], 28);
        let xh = sign(lewdata[3], 28);
        let xm = sign(lewdata[4], 28);

        let s = lewdata[5] & HI;
        let mut t = (lewdata[5] & 0xffff) << 16;
        let dsdx = (lewdata[7] & HI) | ((lewdata[6] >> 16) & 0xffff);
        let dtdx = ((lewdata[7] << 16) & HI) | (lewdata[6] & 0xffff);
        let dtde = (lewdata[9] & 0xffff) << 16;

        self.deltas.ds = dsdx & !0x1f;
        self.deltas.dt = dtdx & !0x1f;
        self.deltas.dw = 0;

        let xright = xh & !1;
        let mut xleft = xm & !1;
        let xend = xright >> 16;

        let mut maxxmx = 0;
        let mut minxhx = 0xfff;

        for k in (yh & !3)..=(yl | 3) {
            if k == ym {
                xleft = xl & !1;
            }

            let spix = k & 3;

            if k & !0xfff == 0 {
                let j = (k >> 2) as usize;
                let valid_y = !(k < yh || k >= yl);

                if spix == 0 {
                    maxxmx = 0;
                    minxhx = 0xfff;
                }

                let xrsc = (xright >> 13) & 0x7ffe;
                let xlsc = (xleft >> 13) & 0x7ffe;

                if valid_y {
                    maxxmx = maxxmx.max((xlsc >> 3) & 0xfff);
                    minxhx = minxhx.min((xrsc >> 3) & 0xfff);
                }

                let span = &mut self.spans[j];
                if spix == 0 {
                    span.unscrx = xend;
                    span.s = s & !0x3ff;
                    span.t = t & !0x3ff;
                }

                if spix == 3 {
                    span.lx = maxxmx;
                    span.rx = minxhx;
                }
            }

            if spix == 3 {
                t = t.wrapping_add(dtde);
            }
        }

        self.loading_pipeline(yh >> 2, yl >> 2, tilenum, coord_quad, ltlut);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use crate::core::rdp::primitives::{Scissor, PIXEL_SIZE_16BIT};
    use crate::core::rdp::registers::OtherModes;

    fn fill_rdp() -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.clip = Scissor {
            xh: 0,
            yh: 0,
            xl: 320 << 2,
            yl: 240 << 2,
            field: false,
            keep_odd: false,
        };
        rdp.other_modes = OtherModes::from_words(0x0030_0000, 0);
        rdp.deduce_derivatives();
        rdp.fb.size = PIXEL_SIZE_16BIT;
        rdp.fb.width = 320;
        rdp.fb.address = 0x1000;
        rdp.fill_color = 0xffff_ffff;
        rdp
    }

    /// Rectangle edge data: flip, left edge `x0`, right edge `x1`, rows
    /// `y0` to `y1` (10.2 fixed point)
    fn rect_ewdata(x0: i32, y0: i32, x1: i32, y1: i32) -> [i32; 44] {
        let mut ew = [0i32; 44];
        ew[0] = (0x3680 << 16) | y1;
        ew[1] = (y1 << 16) | y0;
        ew[2] = ((x1 >> 2) << 16) | ((x1 & 3) << 14);
        ew[4] = ((x0 >> 2) << 16) | ((x0 & 3) << 14);
        ew[6] = ew[2];
        ew
    }

    #[test]
    fn test_rectangle_spans() {
        let mut rdp = fill_rdp();
        rdp.edgewalker_for_prims(&rect_ewdata(0, 0, 4 << 2, (4 << 2) | 3));

        for y in 0..=4 {
            let span = rdp.spans[y];
            assert!(span.validline, "scanline {y}");
            assert_eq!(span.lx, 4);
            assert_eq!(span.rx, 0);
            assert_eq!(span.minorx, [32; 4]);
            assert_eq!(span.majorx, [0; 4]);
        }
        assert!(!rdp.spans[5].validline);
        assert_eq!(rdp.spans[4].invalyscan, [false, false, false, true]);
    }

    #[test]
    fn test_scissor_clips_right_edge() {
        let mut rdp = fill_rdp();
        rdp.clip.xl = 2 << 2;
        rdp.edgewalker_for_prims(&rect_ewdata(0, 0, 4 << 2, 3));

        let span = rdp.spans[0];
        assert_eq!(span.minorx, [16; 4]);
        assert_eq!(span.lx, 2);
    }

    #[test]
    fn test_field_skips_odd_lines() {
        let mut rdp = fill_rdp();
        rdp.clip.field = true;
        rdp.clip.keep_odd = false;
        rdp.edgewalker_for_prims(&rect_ewdata(0, 0, 4 << 2, (3 << 2) | 3));

        assert!(rdp.spans[0].validline);
        assert!(!rdp.spans[1].validline);
        assert!(rdp.spans[2].validline);
        assert!(!rdp.spans[3].validline);
        // Odd rows stay untouched in memory
        assert_eq!(rdp.rdram.read_u16((0x1000 >> 1) + 320), 0);
        assert_eq!(rdp.rdram.read_u16(0x1000 >> 1), 0xffff);
    }

    #[test]
    fn test_offset_correction_wraps_at_extreme_slopes() {
        let mut rdp = fill_rdp();
        let mut ew = rect_ewdata(0, 0, 4 << 2, 3);
        // Negative major slope with flip set enables the offset correction
        ew[5] = -1;
        ew[16] = 0x7fff_0000;
        ew[18] = 0x8000_0000u32 as i32;
        rdp.edgewalker_for_prims(&ew);

        assert!(rdp.spans[0].validline);
        assert_eq!(rdp.spans[0].r, 0xbfff_4000u32 as i32);
    }

    #[test]
    fn test_attribute_unpacking() {
        assert_eq!(upper_pair(0x1234_5678, 0x9abc_def0u32 as i32), 0x1234_9abc);
        assert_eq!(lower_pair(0x1234_5678, 0x9abc_def0u32 as i32), 0x5678_def0);
        assert_eq!(dz_magnitude(0xfffe), 1);
        assert_eq!(dz_magnitude(0x0040), 0x40);
    }
}

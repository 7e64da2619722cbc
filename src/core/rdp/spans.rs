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

//! Span renderers
//!
//! Walks the spans the edge walker produced and runs every covered pixel
//! through the pipeline for the active cycle type. Each cycle type has
//! variants that skip the texture stages the combiner never reads, selected
//! when the other modes are decoded.
//!
//! Attributes are interpolated in fixed point: color in 9.14 (`>> 14`
//! yields 9.2 for the coverage correction), depth in 22.10, texture
//! coordinates in s15.16.
//!
//! # References
//!
//! - [N64 RDP Command Summary](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)

use super::primitives::{SpanSigs, PIXEL_SIZE_16BIT, PIXEL_SIZE_32BIT, PIXEL_SIZE_4BIT, PIXEL_SIZE_8BIT, SPAN_COUNT};
use super::registers::{OneCycleRenderer, TwoCycleRenderer};
use super::tables::CvMaskDerivative;
use super::texcoord::Stw;
use super::zbuffer::dz_compress;
use super::Rdp;

/// Per-pixel increments shared by every span of a primitive
#[derive(Debug, Clone, Copy)]
struct SpanIncrements {
    r: i32,
    g: i32,
    b: i32,
    a: i32,
    z: i32,
    stw: Stw,
    x: i32,
}

/// Depth slope of the primitive and its 4-bit encoding
#[derive(Debug, Clone, Copy)]
struct DepthSlope {
    dzpix: u32,
    dzpixenc: u32,
}

/// Interpolator state of the pixel being rendered
#[derive(Debug, Clone, Copy)]
struct PixelWalk {
    r: i32,
    g: i32,
    b: i32,
    a: i32,
    z: i32,
    stw: Stw,
    x: i32,
    curpixel: u32,
    zbcur: u32,
    length: i32,
}

impl PixelWalk {
    /// Advance color, depth and position one pixel
    #[inline(always)]
    fn step_shade(&mut self, inc: &SpanIncrements) {
        self.r = self.r.wrapping_add(inc.r);
        self.g = self.g.wrapping_add(inc.g);
        self.b = self.b.wrapping_add(inc.b);
        self.a = self.a.wrapping_add(inc.a);
        self.z = self.z.wrapping_add(inc.z);
        self.x = self.x.wrapping_add(inc.x);
        self.curpixel = self.curpixel.wrapping_add(inc.x as u32);
        self.zbcur = self.zbcur.wrapping_add(inc.x as u32);
    }

    #[inline(always)]
    fn step_texture(&mut self, inc: &SpanIncrements) {
        self.stw.s = self.stw.s.wrapping_add(inc.stw.s);
        self.stw.t = self.stw.t.wrapping_add(inc.stw.t);
        self.stw.w = self.stw.w.wrapping_add(inc.stw.w);
    }

    /// Shade in 9.2 and depth in 22.0 for the coverage correction
    #[inline(always)]
    fn shade_and_depth(&self) -> (i32, i32, i32, i32, i32) {
        (
            self.r >> 14,
            self.g >> 14,
            self.b >> 14,
            self.a >> 14,
            (self.z >> 10) & 0x3fffff,
        )
    }

    /// Integer texture coordinate for the divider
    #[inline(always)]
    fn texture_coord(&self) -> (i32, i32, i32) {
        (self.stw.s >> 16, self.stw.t >> 16, self.stw.w >> 16)
    }

    fn sigs(&self) -> SpanSigs {
        SpanSigs {
            startspan: true,
            longspan: self.length > 7,
            midspan: self.length == 7,
            onelessthanmid: self.length == 6,
            ..SpanSigs::default()
        }
    }
}

/// Current dither values, kept across pixels when dithering is off
#[derive(Debug, Clone, Copy)]
struct DitherState {
    cdith: i32,
    adith: i32,
}

impl Default for DitherState {
    fn default() -> Self {
        Self { cdith: 7, adith: 0 }
    }
}

/// Scanlines a renderer may visit
#[inline(always)]
fn scanlines(start: i32, end: i32) -> std::ops::RangeInclusive<i32> {
    start.max(0)..=end.min(SPAN_COUNT as i32 - 1)
}

impl Rdp {
    // ===== Span setup =====

    /// Per-pixel increments in the walking direction
    ///
    /// With `z_source_sel` every pixel takes the primitive depth, so the
    /// depth increments are zeroed.
    fn span_increments(&mut self, flip: bool) -> (SpanIncrements, DepthSlope) {
        let d = self.deltas;
        let dir = if flip { 1 } else { -1 };
        let mut inc = SpanIncrements {
            r: d.dr.wrapping_mul(dir),
            g: d.dg.wrapping_mul(dir),
            b: d.db.wrapping_mul(dir),
            a: d.da.wrapping_mul(dir),
            z: d.dz.wrapping_mul(dir),
            stw: Stw::new(
                d.ds.wrapping_mul(dir),
                d.dt.wrapping_mul(dir),
                d.dw.wrapping_mul(dir),
            ),
            x: dir,
        };

        let dzpix = if self.other_modes.z_source_sel {
            inc.z = 0;
            self.deltas.cdz = 0;
            self.deltas.dzdy = 0;
            self.primitive_delta_z
        } else {
            d.dzpix as u32
        };

        (
            inc,
            DepthSlope {
                dzpix,
                dzpixenc: dz_compress(dzpix),
            },
        )
    }

    /// Load the interpolators for scanline `i` and compute its coverage
    ///
    /// Spans cut by the scissor start from the clipped x, so the
    /// attributes are pre-stepped by the clipped distance.
    fn begin_span(&mut self, i: i32, flip: bool, inc: &SpanIncrements) -> PixelWalk {
        let span = self.spans[i as usize];
        let z = if self.other_modes.z_source_sel {
            self.primitive_z as i32
        } else {
            span.z
        };

        let curpixel = self.fb.width.wrapping_mul(i).wrapping_add(span.rx) as u32;
        let (length, scdiff) = if flip {
            self.compute_cvg_flip(i as usize);
            (span.lx - span.rx, span.rx - span.unscrx)
        } else {
            self.compute_cvg_noflip(i as usize);
            (span.rx - span.lx, span.unscrx - span.rx)
        };

        let mut walk = PixelWalk {
            r: span.r,
            g: span.g,
            b: span.b,
            a: span.a,
            z,
            stw: Stw::new(span.s, span.t, span.w),
            x: span.rx,
            curpixel,
            zbcur: (self.zb_address >> 1).wrapping_add(curpixel),
            length,
        };

        if scdiff != 0 {
            walk.r = walk.r.wrapping_add(inc.r.wrapping_mul(scdiff));
            walk.g = walk.g.wrapping_add(inc.g.wrapping_mul(scdiff));
            walk.b = walk.b.wrapping_add(inc.b.wrapping_mul(scdiff));
            walk.a = walk.a.wrapping_add(inc.a.wrapping_mul(scdiff));
            walk.z = walk.z.wrapping_add(inc.z.wrapping_mul(scdiff));
            walk.stw.s = walk.stw.s.wrapping_add(inc.stw.s.wrapping_mul(scdiff));
            walk.stw.t = walk.stw.t.wrapping_add(inc.stw.t.wrapping_mul(scdiff));
            walk.stw.w = walk.stw.w.wrapping_add(inc.stw.w.wrapping_mul(scdiff));
        }

        log::trace!(
            "span {}: x {}..{} ({} pixels, prestep {})",
            i,
            span.rx,
            span.lx,
            length + 1,
            scdiff
        );
        walk
    }

    #[inline(always)]
    fn coverage_at(&self, x: i32) -> CvMaskDerivative {
        let mask = self.cvgbuf[x.clamp(0, SPAN_COUNT as i32 - 1) as usize];
        self.tables.cvarray[mask as usize]
    }

    // ===== Pixel back end =====

    /// Combine, depth test, blend and write one pixel (1-cycle)
    fn shade_pixel_1cycle(&mut self, walk: &PixelWalk, i: i32, dz: &DepthSlope, dither: &mut DitherState) {
        let cv = self.coverage_at(walk.x);
        let mut cvg = cv.cvg as u32;
        let (sr, sg, sb, sa, sz) = walk.shade_and_depth();
        let sz = self.rgbaz_correct_clip(cv.xoff as i32, cv.yoff as i32, sr, sg, sb, sa, sz, cvg);

        if let Some((cdith, adith)) = self.get_dither_noise(walk.x, i) {
            *dither = DitherState { cdith, adith };
        }

        self.combiner_1cycle(dither.adith, &mut cvg);

        let memcvg = self.fbread(walk.curpixel);
        let z = self.z_compare(walk.zbcur, sz, dz.dzpix, dz.dzpixenc, &mut cvg, memcvg);
        if !z.pass {
            return;
        }
        if let Some((r, g, b)) = self.blender_1cycle(dither.cdith, z.blend_en, z.prewrap, cvg, cv.cvbit as u32) {
            self.fbwrite(walk.curpixel, r as u32, g as u32, b as u32, z.blend_en, cvg, memcvg);
            if self.other_modes.z_update_en {
                self.z_store(walk.zbcur, sz, dz.dzpixenc);
            }
        }
    }

    /// Combine, depth test, blend and write one pixel (2-cycle)
    ///
    /// A pixel that fails the depth test still advances the blender's
    /// memory color.
    fn shade_pixel_2cycle(&mut self, walk: &PixelWalk, i: i32, dz: &DepthSlope, dither: &mut DitherState) {
        let cv = self.coverage_at(walk.x);
        let mut cvg = cv.cvg as u32;
        let (sr, sg, sb, sa, sz) = walk.shade_and_depth();
        let sz = self.rgbaz_correct_clip(cv.xoff as i32, cv.yoff as i32, sr, sg, sb, sa, sz, cvg);

        if let Some((cdith, adith)) = self.get_dither_noise(walk.x, i) {
            *dither = DitherState { cdith, adith };
        }

        self.combiner_2cycle(dither.adith, &mut cvg);

        let memcvg = self.fbread2(walk.curpixel);
        let z = self.z_compare(walk.zbcur, sz, dz.dzpix, dz.dzpixenc, &mut cvg, memcvg);
        if !z.pass {
            self.memory = self.pre_memory;
            return;
        }
        if let Some((r, g, b)) = self.blender_2cycle(dither.cdith, z.blend_en, z.prewrap, cvg, cv.cvbit as u32) {
            self.fbwrite(walk.curpixel, r as u32, g as u32, b as u32, z.blend_en, cvg, memcvg);
            if self.other_modes.z_update_en {
                self.z_store(walk.zbcur, sz, dz.dzpixenc);
            }
        }
    }

    // ===== 1-cycle =====

    /// Render spans `start..=end` in 1-cycle mode
    ///
    /// # Arguments
    ///
    /// * `start`, `end` - First and last scanline
    /// * `tilenum` - Primitive tile
    /// * `flip` - Major edge is on the right; pixels walk left to right
    pub(crate) fn render_spans_1cycle(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        match self.derivs.one_cycle {
            OneCycleRenderer::Complete => self.render_spans_1cycle_complete(start, end, tilenum, flip),
            OneCycleRenderer::NoTexel1 => self.render_spans_1cycle_notexel1(start, end, tilenum, flip),
            OneCycleRenderer::Blend => self.render_spans_1cycle_blend(start, end, flip),
        }
    }

    /// Texel1 holds the next pixel's texel, fetched one pixel ahead
    fn render_spans_1cycle_complete(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();
        let prim_tile = tilenum;
        let mut tile1 = tilenum;
        let mut newtile = tilenum;
        let mut prelodfrac = 0;

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);
            let mut sigs = walk.sigs();
            let length = walk.length;
            let scanline = i as usize;

            for j in 0..=length {
                let (ss, st, sw) = walk.texture_coord();
                sigs.endspan = j == length;
                sigs.preendspan = j == length - 1;

                let (news, newt) = self.get_texel1_1cycle(&walk.stw, &inc.stw, scanline, &sigs);

                if j != 0 {
                    self.texel0 = self.texel1;
                    self.lod_frac = prelodfrac;
                } else {
                    let (mut sss, mut sst) = self.tcdiv(ss, st, sw);
                    self.tclod_1cycle_current(
                        &mut sss,
                        &mut sst,
                        (news, newt),
                        &walk.stw,
                        &inc.stw,
                        scanline,
                        prim_tile,
                        &mut tile1,
                        &sigs,
                    );
                    let prev = self.texel0;
                    self.texel0 = self.texture_pipeline_cycle(&prev, sss, sst, tile1, 0);
                    sigs.startspan = false;
                }

                sigs.nextspan = sigs.endspan;
                sigs.endspan = sigs.preendspan;
                sigs.preendspan = j == length - 2;

                walk.step_texture(&inc);

                let (mut news, mut newt) = (news, newt);
                if let Some(frac) = self.tclod_1cycle_next(
                    &mut news,
                    &mut newt,
                    &walk.stw,
                    &inc.stw,
                    scanline,
                    prim_tile,
                    &mut newtile,
                    &sigs,
                ) {
                    prelodfrac = frac;
                }
                let prev = self.texel1;
                self.texel1 = self.texture_pipeline_cycle(&prev, news, newt, newtile, 0);

                self.shade_pixel_1cycle(&walk, i, &dz, &mut dither);
                walk.step_shade(&inc);
            }
        }
    }

    /// Texel0 only, sampled at every pixel
    fn render_spans_1cycle_notexel1(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();
        let prim_tile = tilenum;
        let mut tile1 = tilenum;

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);
            let mut sigs = walk.sigs();
            let length = walk.length;
            let scanline = i as usize;

            for j in 0..=length {
                let (ss, st, sw) = walk.texture_coord();
                sigs.endspan = j == length;
                sigs.preendspan = j == length - 1;

                let (mut sss, mut sst) = self.tcdiv(ss, st, sw);
                self.tclod_1cycle_current_simple(
                    &mut sss,
                    &mut sst,
                    &walk.stw,
                    &inc.stw,
                    scanline,
                    prim_tile,
                    &mut tile1,
                    &sigs,
                );
                let prev = self.texel0;
                self.texel0 = self.texture_pipeline_cycle(&prev, sss, sst, tile1, 0);

                self.shade_pixel_1cycle(&walk, i, &dz, &mut dither);

                walk.step_texture(&inc);
                walk.step_shade(&inc);
            }
        }
    }

    /// No texture: shade, constants and memory only
    fn render_spans_1cycle_blend(&mut self, start: i32, end: i32, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);
            for _ in 0..=walk.length {
                self.shade_pixel_1cycle(&walk, i, &dz, &mut dither);
                walk.step_shade(&inc);
            }
        }
    }

    // ===== 2-cycle =====

    /// Render spans `start..=end` in 2-cycle mode
    ///
    /// Arguments as for [`Rdp::render_spans_1cycle`].
    pub(crate) fn render_spans_2cycle(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        match self.derivs.two_cycle {
            TwoCycleRenderer::Complete => self.render_spans_2cycle_complete(start, end, tilenum, flip),
            TwoCycleRenderer::NoTexelNext => self.render_spans_2cycle_notexelnext(start, end, tilenum, flip),
            TwoCycleRenderer::NoTexel1 => self.render_spans_2cycle_notexel1(start, end, tilenum, flip),
            TwoCycleRenderer::Blend => self.render_spans_2cycle_blend(start, end, flip),
        }
    }

    /// Both texels of the next pixel are fetched one pixel ahead
    fn render_spans_2cycle_complete(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();
        let prim_tile = tilenum;
        let mut tile1 = tilenum;
        let mut tile2 = (tilenum + 1) & 7;
        let mut newtile1 = tile1;
        let mut newtile2 = tile2;
        let mut prelodfrac = 0;

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);

            for j in 0..=walk.length {
                let (ss, st, sw) = walk.texture_coord();
                let (news, newt) = self.get_nexttexel0_2cycle(&walk.stw, &inc.stw);

                if j == 0 {
                    let (mut sss, mut sst) = self.tcdiv(ss, st, sw);
                    self.tclod_2cycle_current(
                        &mut sss,
                        &mut sst,
                        (news, newt),
                        &walk.stw,
                        prim_tile,
                        &mut tile1,
                        &mut tile2,
                    );
                    let prev = self.texel0;
                    self.texel0 = self.texture_pipeline_cycle(&prev, sss, sst, tile1, 0);
                    let prev = self.texel0;
                    self.texel1 = self.texture_pipeline_cycle(&prev, sss, sst, tile2, 1);
                } else {
                    self.texel0 = self.nexttexel;
                    self.texel1 = self.nexttexel1;
                    self.lod_frac = prelodfrac;
                }

                walk.step_texture(&inc);

                let (mut news, mut newt) = (news, newt);
                if let Some(frac) = self.tclod_2cycle_next(
                    &mut news,
                    &mut newt,
                    &walk.stw,
                    &inc.stw,
                    prim_tile,
                    &mut newtile1,
                    &mut newtile2,
                ) {
                    prelodfrac = frac;
                }
                let prev = self.nexttexel;
                self.nexttexel = self.texture_pipeline_cycle(&prev, news, newt, newtile1, 0);
                let prev = self.nexttexel;
                self.nexttexel1 = self.texture_pipeline_cycle(&prev, news, newt, newtile2, 1);

                self.shade_pixel_2cycle(&walk, i, &dz, &mut dither);
                walk.step_shade(&inc);
            }
        }
    }

    /// Both texels, sampled at every pixel
    fn render_spans_2cycle_notexelnext(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();
        let prim_tile = tilenum;
        let mut tile1 = tilenum;
        let mut tile2 = (tilenum + 1) & 7;

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);

            for _ in 0..=walk.length {
                let (ss, st, sw) = walk.texture_coord();
                let (mut sss, mut sst) = self.tcdiv(ss, st, sw);
                self.tclod_2cycle_current_simple(
                    &mut sss,
                    &mut sst,
                    &walk.stw,
                    &inc.stw,
                    prim_tile,
                    &mut tile1,
                    &mut tile2,
                );
                let prev = self.texel0;
                self.texel0 = self.texture_pipeline_cycle(&prev, sss, sst, tile1, 0);
                let prev = self.texel0;
                self.texel1 = self.texture_pipeline_cycle(&prev, sss, sst, tile2, 1);

                self.shade_pixel_2cycle(&walk, i, &dz, &mut dither);

                walk.step_texture(&inc);
                walk.step_shade(&inc);
            }
        }
    }

    /// Texel0 only, sampled at every pixel
    fn render_spans_2cycle_notexel1(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();
        let prim_tile = tilenum;
        let mut tile1 = tilenum;

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);

            for _ in 0..=walk.length {
                let (ss, st, sw) = walk.texture_coord();
                let (mut sss, mut sst) = self.tcdiv(ss, st, sw);
                self.tclod_2cycle_current_notexel1(&mut sss, &mut sst, &walk.stw, &inc.stw, prim_tile, &mut tile1);
                let prev = self.texel0;
                self.texel0 = self.texture_pipeline_cycle(&prev, sss, sst, tile1, 0);

                self.shade_pixel_2cycle(&walk, i, &dz, &mut dither);

                walk.step_texture(&inc);
                walk.step_shade(&inc);
            }
        }
    }

    fn render_spans_2cycle_blend(&mut self, start: i32, end: i32, flip: bool) {
        let (inc, dz) = self.span_increments(flip);
        let mut dither = DitherState::default();

        for i in scanlines(start, end) {
            if !self.spans[i as usize].validline {
                continue;
            }
            let mut walk = self.begin_span(i, flip, &inc);
            for _ in 0..=walk.length {
                self.shade_pixel_2cycle(&walk, i, &dz, &mut dither);
                walk.step_shade(&inc);
            }
        }
    }

    // ===== Fill =====

    /// Render spans `start..=end` with the fill color
    ///
    /// Fill mode has no read or depth path: enabling image reads or depth
    /// compare crashes the pipeline before the span is written, depth
    /// update crashes it after.
    pub(crate) fn render_spans_fill(&mut self, start: i32, end: i32, flip: bool) {
        if self.fb.size == PIXEL_SIZE_4BIT {
            self.crash("fill mode with a 4-bit color image");
            return;
        }

        let modes = self.other_modes;
        let fastkill = modes.image_read_en || modes.z_compare_en;
        let slowkill = modes.z_update_en && !modes.z_source_sel && !fastkill;
        let xinc: i32 = if flip { 1 } else { -1 };

        for i in scanlines(start, end) {
            let span = self.spans[i as usize];
            if !span.validline {
                continue;
            }
            let mut curpixel = self.fb.width.wrapping_mul(i).wrapping_add(span.rx) as u32;
            let length = if flip { span.lx - span.rx } else { span.rx - span.lx };

            if fastkill && length >= 0 {
                if !self.warnings.fillmbitcrashes {
                    self.warnings.fillmbitcrashes = true;
                    log::warn!(
                        "fill mode with image read or z compare enabled (other modes {:#010x} {:#010x})",
                        modes.words[0],
                        modes.words[1]
                    );
                }
                self.pipeline_crashed = true;
                return;
            }

            for _ in 0..=length {
                self.fbfill(curpixel);
                curpixel = curpixel.wrapping_add(xinc as u32);
            }

            if slowkill && length >= 0 {
                if !self.warnings.fillmcrashes {
                    self.warnings.fillmcrashes = true;
                    log::warn!(
                        "fill mode with z update enabled (other modes {:#010x} {:#010x})",
                        modes.words[0],
                        modes.words[1]
                    );
                }
                self.pipeline_crashed = true;
                return;
            }
        }
    }

    // ===== Copy =====

    /// Alpha-compare mask over the eight bytes of a copied qword
    ///
    /// 16-bit pixels keep their alpha bit; 8-bit pixels compare against
    /// the blend alpha or a random threshold.
    fn copy_alpha_mask(&mut self, copyqword: u64) -> u32 {
        if !self.other_modes.alpha_compare_en {
            return 0xff;
        }

        match self.fb.size {
            PIXEL_SIZE_16BIT => {
                let mut mask = 0;
                for (shift, bits) in [(48, 0xc0), (32, 0x30), (16, 0x0c), (0, 0x03)] {
                    if (copyqword >> shift) & 1 != 0 {
                        mask |= bits;
                    }
                }
                mask
            }
            PIXEL_SIZE_8BIT => {
                let thresholds = if self.other_modes.dither_alpha_en {
                    let t = (self.noise_source.next_value() & 0xff) as u64;
                    [
                        t,
                        ((t & 3) << 6) | (t >> 2),
                        ((t & 0xf) << 4) | (t >> 4),
                        ((t & 0x3f) << 2) | (t >> 6),
                    ]
                } else {
                    [(self.blend.a & 0xff) as u64; 4]
                };

                let mut mask = 0;
                for ((shift, bits), threshold) in [(24, 0xc0), (16, 0x30), (8, 0x0c), (0, 0x03)]
                    .into_iter()
                    .zip(thresholds)
                {
                    if (copyqword >> shift) & 0xff >= threshold {
                        mask |= bits;
                    }
                }
                mask
            }
            _ => 0,
        }
    }

    /// Render spans `start..=end` by copying TMEM a qword at a time
    ///
    /// Writes are byte granular: each qword covers four 16-bit or eight
    /// 8-bit pixels, clipped to the end of the span.
    pub(crate) fn render_spans_copy(&mut self, start: i32, end: i32, tilenum: usize, flip: bool) {
        if self.fb.size == PIXEL_SIZE_32BIT {
            if !self.warnings.copymstrangecrashes {
                self.warnings.copymstrangecrashes = true;
                log::warn!("copy mode with a 32-bit color image");
            }
            self.pipeline_crashed = true;
            return;
        }

        let size = self.fb.size;
        let dir: i32 = if flip { 1 } else { -1 };
        let inc = Stw::new(
            self.deltas.ds.wrapping_mul(dir),
            self.deltas.dt.wrapping_mul(dir),
            self.deltas.dw.wrapping_mul(dir),
        );
        let (fbadvance, bytesperpixel) = if size == PIXEL_SIZE_4BIT {
            (8, 1)
        } else {
            (16 >> size, 1 << (size - 1))
        };
        let pixels_to_bytes = |pix: i32| -> i32 {
            if size != 0 {
                (pix << size) >> 1
            } else {
                pix
            }
        };
        let prim_tile = tilenum;
        let mut tile1 = tilenum;

        for i in scanlines(start, end) {
            let span = self.spans[i as usize];
            if !span.validline {
                continue;
            }

            let row = self.fb.width.wrapping_mul(i);
            let mut fbptr = self.fb.address.wrapping_add(pixels_to_bytes(row.wrapping_add(span.rx)) as u32);
            let fbendptr = self.fb.address.wrapping_add(pixels_to_bytes(row.wrapping_add(span.lx)) as u32);
            let length = if flip { span.lx - span.rx } else { span.rx - span.lx };
            let mut stw = Stw::new(span.s, span.t, span.w);

            log::trace!("copy span {}: {} pixels from tile {}", i, length + 1, tilenum);

            let mut j = 0;
            while j <= length {
                let (mut sss, mut sst) = self.tcdiv(stw.s >> 16, stw.t >> 16, stw.w >> 16);
                self.tclod_copy(&mut sss, &mut sst, &stw, &inc, prim_tile, &mut tile1);
                let (hidword, lowdword) = self.fetch_qword_copy(sss, sst, tile1);

                let copyqword = if size == PIXEL_SIZE_16BIT || size == PIXEL_SIZE_8BIT {
                    ((hidword as u64) << 32) | lowdword as u64
                } else {
                    0
                };
                let alphamask = self.copy_alpha_mask(copyqword);

                let remaining = if flip {
                    fbendptr.wrapping_sub(fbptr) as i32
                } else {
                    fbptr.wrapping_sub(fbendptr) as i32
                };
                let copywmask = (remaining + bytesperpixel).min(8);

                let mut address = fbptr;
                for k in (8 - copywmask.max(0)..8).rev() {
                    if alphamask & (1 << k) != 0 {
                        let value = ((copyqword >> (k << 3)) & 0xff) as u8;
                        self.rdram.pair_write8(address, value, if value & 1 != 0 { 3 } else { 0 });
                    }
                    address = address.wrapping_add(dir as u32);
                }

                stw.s = stw.s.wrapping_add(inc.s);
                stw.t = stw.t.wrapping_add(inc.t);
                stw.w = stw.w.wrapping_add(inc.w);
                fbptr = fbptr.wrapping_add((dir * 8) as u32);
                j += fbadvance;
            }
        }
    }
}

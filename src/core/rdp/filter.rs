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

//! Texture filter
//!
//! Runs one texel through the coordinate pipeline, fetches it (or its 2x2
//! neighbourhood) and filters:
//!
//! - Bilinear filtering is a 3-point triangle interpolation: the quad is
//!   split along its diagonal and only the three texels of the triangle
//!   holding the sample point contribute.
//! - With `mid_texel`, a sample exactly in the center averages all four.
//! - YUV textures filter chroma at half horizontal resolution, so RG and
//!   BA may fall in different triangles.
//! - Without bilinear filtering the texel goes through color conversion
//!   (YUV to RGB with the K0-K3 coefficients).
//! - In the second cycle, `convert_one` reuses the first cycle's texel as
//!   filter weights or conversion input.

use super::primitives::{Color, FORMAT_YUV};
use super::Rdp;

/// Interpolate one lane over the lower triangle (t0, t1, t2)
#[inline(always)]
fn lerp_lower(t0: i32, t1: i32, t2: i32, sfrac: i32, tfrac: i32) -> i32 {
    t0 + ((sfrac * (t1 - t0) + tfrac * (t2 - t0) + 0x10) >> 5)
}

/// Interpolate one lane over the upper triangle (t3, t2, t1)
#[inline(always)]
fn lerp_upper(t1: i32, t2: i32, t3: i32, invsf: i32, invtf: i32) -> i32 {
    t3 + ((invsf * (t2 - t3) + invtf * (t1 - t3) + 0x10) >> 5)
}

/// Four-texel average used for an exact center sample
#[inline(always)]
fn center(t0: i32, t1: i32, t2: i32, t3: i32) -> i32 {
    t3 + ((((t1 + t2) << 6) - (t3 << 7) + ((!t3 + t0) << 6) + 0xc0) >> 8)
}

/// Filter with the previous cycle's texel as weights
#[inline(always)]
fn convert_lerp(prev: &Color, a: i32, b: i32) -> i32 {
    prev.b + ((prev.r * a + prev.g * b + 0x80) >> 8)
}

impl Rdp {
    /// YUV to RGB conversion of one texel
    #[inline(always)]
    fn color_convert(&self, y: i32, u: i32, v: i32) -> Color {
        Color::new(
            y + ((self.k0_tf * v + 0x80) >> 8),
            y + ((self.k1_tf * u + self.k2_tf * v + 0x80) >> 8),
            y + ((self.k3_tf * u + 0x80) >> 8),
            y,
        )
    }

    /// Sample and filter one texel
    ///
    /// # Arguments
    ///
    /// * `prev` - Texel of the previous cycle, used by `convert_one`
    /// * `sss`, `sst` - Clamped output of the divider
    /// * `tilenum` - Tile to sample
    /// * `cycle` - 0 or 1
    ///
    /// # Returns
    ///
    /// Filtered texel, lanes masked to 9 bits
    pub(crate) fn texture_pipeline_cycle(&self, prev: &Color, sss: i32, sst: i32, tilenum: usize, cycle: usize) -> Color {
        let bilerp = if cycle != 0 {
            self.other_modes.bi_lerp1
        } else {
            self.other_modes.bi_lerp0
        };
        let convert = self.other_modes.convert_one && cycle != 0;
        let tile = &self.tiles[tilenum];

        let (sss1, sst1, maxs, maxt) = self.tcshift_cycle(sss, sst, tilenum);
        let sss1 = sss1 - (tile.sl << 3);
        let sst1 = sst1 - (tile.tl << 3);

        if !(self.other_modes.sample_type || self.other_modes.en_tlut) {
            let (s, t) = self.tcclamp_cycle_light(sss1, sst1, maxs, maxt, tilenum);
            let (s, t) = self.tcmask(s, t, tilenum);
            let t0 = self.fetch_texel(s, t, tilenum);

            return if bilerp {
                if !convert {
                    Color::new(t0.r & 0x1ff, t0.g & 0x1ff, t0.b, t0.a)
                } else {
                    Color::splat(prev.b)
                }
            } else {
                let t0 = if convert { *prev } else { t0 };
                let c = self.color_convert(t0.b, t0.r, t0.g);
                Color::new(c.r & 0x1ff, c.g & 0x1ff, c.b & 0x1ff, c.a)
            };
        }

        let (s, t, sfrac, tfrac) = self.tcclamp_cycle(sss1, sst1, sss1 & 0x1f, sst1 & 0x1f, maxs, maxt, tilenum);
        let (s, sdiff, t, tdiff) = self.tcmask_coupled(s, t, tilenum);

        let upper = (sfrac + tfrac) & 0x20 != 0;
        let (sfracrg, upperrg) = if tile.format == FORMAT_YUV {
            let sfracrg = (sfrac >> 1) | ((s & 1) << 4);
            (sfracrg, (sfracrg + tfrac) & 0x20 != 0)
        } else {
            (sfrac, upper)
        };

        let [t0, t1, t2, t3] = if !self.other_modes.sample_type {
            self.fetch_texel_entlut_quadro_nearest(s, t, tilenum, upper, upperrg)
        } else if self.other_modes.en_tlut {
            self.fetch_texel_entlut_quadro(s, sdiff, t, tdiff, tilenum, upper, upperrg)
        } else {
            self.fetch_texel_quadro(s, sdiff, t, tdiff, tilenum, upper != upperrg)
        };

        let tex = if bilerp {
            let (center_ba, center_rg) = if self.other_modes.mid_texel {
                (sfrac == 0x10 && tfrac == 0x10, sfracrg == 0x10 && tfrac == 0x10)
            } else {
                (false, false)
            };
            let invtf = 0x20 - tfrac;

            let filter = |lane: fn(&Color) -> i32, sf: i32, up: bool, mid: bool| -> i32 {
                let (l0, l1, l2, l3) = (lane(&t0), lane(&t1), lane(&t2), lane(&t3));
                match (mid, convert, up) {
                    (false, false, true) => lerp_upper(l1, l2, l3, 0x20 - sf, invtf),
                    (false, false, false) => lerp_lower(l0, l1, l2, sf, tfrac),
                    (false, true, true) => convert_lerp(prev, l2 - l3, l1 - l3),
                    (false, true, false) => convert_lerp(prev, l1 - l0, l2 - l0),
                    (true, false, _) => center(l0, l1, l2, l3),
                    (true, true, _) => {
                        prev.b
                            + ((prev.r * (l2 - l3) + prev.g * (l1 - l3) + ((!l3 + l0) << 6) + 0xc0) >> 8)
                    }
                }
            };

            Color::new(
                filter(|c| c.r, sfracrg, upperrg, center_rg),
                filter(|c| c.g, sfracrg, upperrg, center_rg),
                filter(|c| c.b, sfrac, upper, center_ba),
                filter(|c| c.a, sfrac, upper, center_ba),
            )
        } else {
            let (t0, t3) = if convert { (*prev, *prev) } else { (t0, t3) };
            // Chroma from the RG triangle, luma from the BA triangle
            let uv = if upperrg { t3 } else { t0 };
            let y = if upper { t3.b } else { t0.b };
            self.color_convert(y, uv.r, uv.g)
        };

        Color::new(tex.r & 0x1ff, tex.g & 0x1ff, tex.b & 0x1ff, tex.a & 0x1ff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use crate::core::rdp::primitives::*;

    fn rdp_i8(line: i32) -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.format = FORMAT_I;
        tile.size = PIXEL_SIZE_8BIT;
        tile.line = line;
        tile.sh = 63 << 2;
        tile.th = 63 << 2;
        tile.calculate_clamp_diffs();
        tile.calculate_tile_derivs();
        rdp.other_modes.bi_lerp0 = true;
        rdp
    }

    #[test]
    fn test_point_sample() {
        let mut rdp = rdp_i8(1);
        rdp.tmem.write8(2, 0x80);
        // S = 2.0 in 10.5
        let c = rdp.texture_pipeline_cycle(&Color::default(), 2 << 5, 0, 0, 0);
        assert_eq!(c, Color::splat(0x80));
    }

    #[test]
    fn test_bilinear_half_step() {
        let mut rdp = rdp_i8(1);
        rdp.other_modes.sample_type = true;
        rdp.tmem.write8(0, 0x00);
        rdp.tmem.write8(1, 0x40);
        // Row 1 sits in the swapped half of word 1
        rdp.tmem.write8(8 + 4, 0x00);
        rdp.tmem.write8(8 + 5, 0x40);

        // Halfway between texels 0 and 1
        let c = rdp.texture_pipeline_cycle(&Color::default(), 0x10, 0, 0, 0);
        assert_eq!(c, Color::splat(0x20));
    }

    #[test]
    fn test_center_sample_averages_quad() {
        let mut rdp = rdp_i8(1);
        rdp.other_modes.sample_type = true;
        rdp.other_modes.mid_texel = true;
        rdp.tmem.write8(0, 0x40);
        rdp.tmem.write8(1, 0x40);
        rdp.tmem.write8(8 + 4, 0x40);
        rdp.tmem.write8(8 + 5, 0x40);

        let c = rdp.texture_pipeline_cycle(&Color::default(), 0x10, 0x10, 0, 0);
        assert_eq!(c, Color::splat(0x40));
    }

    #[test]
    fn test_color_convert_without_filter() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let tile = &mut rdp.tiles[0];
        tile.format = FORMAT_YUV;
        tile.size = PIXEL_SIZE_16BIT;
        tile.line = 1;
        tile.calculate_tile_derivs();
        // Neutral chroma, luma 0x60
        rdp.tmem.write16(0, 0x8080);
        rdp.tmem.write8(0x800, 0x60);

        let c = rdp.texture_pipeline_cycle(&Color::default(), 0, 0, 0, 0);
        assert_eq!(c, Color::splat(0x60));
    }
}

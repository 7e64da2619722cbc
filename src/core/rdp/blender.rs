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

//! Blender
//!
//! Mixes the combiner output with the framebuffer color:
//!
//! ```text
//!   out = (P * A + M * B) / (A + B)
//! ```
//!
//! `A` and `B` are 5-bit alpha weights; the division runs through the
//! hardware's bit-serial divider unless `force_blend` skips it. When the
//! second weight is memory alpha, the weights are shifted by the depth
//! slope difference computed in the depth compare.

use super::primitives::Color;
use super::registers::{BlenderAlphaInput, BlenderColorInput, BlenderStage};
use super::Rdp;

impl Rdp {
    #[inline(always)]
    fn blender_color(&self, input: BlenderColorInput) -> Color {
        match input {
            BlenderColorInput::Pixel => self.pixel,
            BlenderColorInput::BlendedPixel => self.blended_pixel,
            BlenderColorInput::Memory => self.memory,
            BlenderColorInput::Blend => self.blend,
            BlenderColorInput::Fog => self.fog,
        }
    }

    #[inline(always)]
    fn blender_alpha(&self, input: BlenderAlphaInput) -> i32 {
        match input {
            BlenderAlphaInput::PixelAlpha => self.pixel.a,
            BlenderAlphaInput::FogAlpha => self.fog.a,
            BlenderAlphaInput::ShadeAlpha => self.shade.a,
            BlenderAlphaInput::InvPixelAlpha => self.inv_pixel.a,
            BlenderAlphaInput::MemoryAlpha => self.memory.a,
            BlenderAlphaInput::One => 0xff,
            BlenderAlphaInput::Zero => 0,
        }
    }

    /// Alpha test against the blend color alpha, or a random threshold
    /// with alpha dither
    pub(crate) fn alpha_compare(&mut self, comb_alpha: i32) -> bool {
        if !self.other_modes.alpha_compare_en {
            return true;
        }
        let threshold = if !self.other_modes.dither_alpha_en {
            self.blend.a
        } else {
            self.noise_source.next_value() & 0xff
        };
        comb_alpha >= threshold
    }

    /// Weighted sum of one blender stage, before division
    fn blend_sums(&self, stage: &BlenderStage, blend1a: i32, blend2a: i32) -> (i32, i32, i32) {
        let p = self.blender_color(stage.i1a);
        let m = self.blender_color(stage.i2a);
        (
            p.r * blend1a + m.r * blend2a,
            p.g * blend1a + m.g * blend2a,
            p.b * blend1a + m.b * blend2a,
        )
    }

    /// Full blend equation with the divider
    fn blender_equation(&self, cycle: usize, shifta: i32, shiftb: i32, special_bsel: bool) -> (i32, i32, i32) {
        let stage = self.blender[cycle];
        let mut blend1a = self.blender_alpha(stage.i1b) >> 3;
        let mut blend2a = self.blender_alpha(stage.i2b) >> 3;

        if special_bsel {
            blend1a = (blend1a >> shifta) & 0x3c;
            blend2a = (blend2a >> shiftb) | 3;
        }

        let (blr, blg, blb) = self.blend_sums(&stage, blend1a, blend2a + 1);

        if !self.other_modes.force_blend {
            let sum = (((blend1a & !3) + (blend2a & !3) + 4) << 9) as usize;
            let div = |v: i32| {
                self.tables.bldiv_hwaccurate_table[(sum | ((v >> 2) & 0x7ff) as usize) & 0x7fff] as i32
            };
            (div(blr), div(blg), div(blb))
        } else {
            ((blr >> 5) & 0xff, (blg >> 5) & 0xff, (blb >> 5) & 0xff)
        }
    }

    /// First cycle of the one-cycle blender, or second of two-cycle
    fn blender_equation_cycle0(&self) -> (i32, i32, i32) {
        self.blender_equation(0, self.blshifta, self.blshiftb, self.derivs.special_bsel0)
    }

    fn blender_equation_cycle1(&self) -> (i32, i32, i32) {
        self.blender_equation(1, self.blshifta, self.blshiftb, self.derivs.special_bsel1)
    }

    /// First two-cycle stage: no divide, shifters from the previous pixel
    fn blender_equation_cycle0_2(&self) -> (i32, i32, i32) {
        let stage = self.blender[0];
        let mut blend1a = self.blender_alpha(stage.i1b) >> 3;
        let mut blend2a = self.blender_alpha(stage.i2b) >> 3;

        if self.derivs.special_bsel0 {
            blend1a = (blend1a >> self.pastblshifta) & 0x3c;
            blend2a = (blend2a >> self.pastblshiftb) | 3;
        }

        let (r, g, b) = self.blend_sums(&stage, blend1a, blend2a + 1);
        ((r >> 5) & 0xff, (g >> 5) & 0xff, (b >> 5) & 0xff)
    }

    /// Pixel survives alpha compare and has coverage to draw
    fn blender_accepts(&self, cvg: u32, cvbit: u32) -> bool {
        if self.other_modes.antialias_en {
            cvg != 0
        } else {
            cvbit != 0
        }
    }

    /// One-cycle blend
    ///
    /// # Arguments
    ///
    /// * `dith` - Color dither value
    /// * `blend_en` - Depth compare allows blending
    /// * `prewrap` - Coverage overflowed
    /// * `cvg`, `cvbit` - Pixel coverage count and top-left bit
    ///
    /// # Returns
    ///
    /// The color to write, or `None` when the pixel is discarded
    pub(crate) fn blender_1cycle(
        &mut self,
        dith: i32,
        blend_en: bool,
        prewrap: bool,
        cvg: u32,
        cvbit: u32,
    ) -> Option<(i32, i32, i32)> {
        if !self.alpha_compare(self.pixel.a) || !self.blender_accepts(cvg, cvbit) {
            return None;
        }

        let stage = self.blender[0];
        let (mut r, mut g, mut b) = if !self.other_modes.color_on_cvg || prewrap {
            let dontblend = self.derivs.partialreject_1cycle && self.pixel.a >= 0xff;
            if !blend_en || dontblend {
                let p = self.blender_color(stage.i1a);
                (p.r, p.g, p.b)
            } else {
                self.inv_pixel.a = !self.blender_alpha(stage.i1b) & 0xff;
                self.blender_equation_cycle0()
            }
        } else {
            let m = self.blender_color(stage.i2a);
            (m.r, m.g, m.b)
        };

        self.rgb_dither(&mut r, &mut g, &mut b, dith);
        Some((r, g, b))
    }

    /// Two-cycle blend
    ///
    /// The first stage blends with the memory color of the previous pixel;
    /// the memory color then advances to this pixel's read.
    pub(crate) fn blender_2cycle(
        &mut self,
        dith: i32,
        blend_en: bool,
        prewrap: bool,
        cvg: u32,
        cvbit: u32,
    ) -> Option<(i32, i32, i32)> {
        if !self.alpha_compare(self.pixel.a) || !self.blender_accepts(cvg, cvbit) {
            self.memory = self.pre_memory;
            return None;
        }

        let first = self.blender[0];
        self.inv_pixel.a = !self.blender_alpha(first.i1b) & 0xff;
        let (r, g, b) = self.blender_equation_cycle0_2();
        self.memory = self.pre_memory;
        self.blended_pixel = Color::new(r, g, b, self.pixel.a);

        let second = self.blender[1];
        let (mut r, mut g, mut b) = if !self.other_modes.color_on_cvg || prewrap {
            let dontblend = self.derivs.partialreject_2cycle && self.pixel.a >= 0xff;
            if !blend_en || dontblend {
                let p = self.blender_color(second.i1a);
                (p.r, p.g, p.b)
            } else {
                self.inv_pixel.a = !self.blender_alpha(second.i1b) & 0xff;
                self.blender_equation_cycle1()
            }
        } else {
            let m = self.blender_color(second.i2a);
            (m.r, m.g, m.b)
        };

        self.rgb_dither(&mut r, &mut g, &mut b, dith);
        Some((r, g, b))
    }
}

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

//! Color combiner
//!
//! Evaluates `(A - B) * C + D` per channel, once per cycle. Operands are
//! 9-bit values sign-extended through the hardware's special table; the
//! RGB result keeps 8 fraction bits until the final cycle so the second
//! cycle (and chroma keying) see the unrounded value.
//!
//! After the last cycle the combiner also folds coverage into alpha
//! (`cvg_times_alpha`, `alpha_cvg_select`) and applies the alpha dither.

use super::primitives::Color;
use super::registers::{ColorReg, CombinerInput, CombinerStage};
use super::{sign, Rdp};

impl Rdp {
    /// Current value of a color register
    #[inline(always)]
    fn color_reg(&self, reg: ColorReg) -> Color {
        match reg {
            ColorReg::Combined => self.combined,
            ColorReg::Texel0 => self.texel0,
            ColorReg::Texel1 => self.texel1,
            ColorReg::Prim => self.prim,
            ColorReg::Shade => self.shade,
            ColorReg::Env => self.env,
            ColorReg::KeyCenter => self.key_center,
            ColorReg::KeyScale => self.key_scale,
        }
    }

    /// Resolve an operand to per-channel values
    #[inline(always)]
    pub(crate) fn combiner_operand(&self, input: CombinerInput) -> Color {
        match input {
            CombinerInput::Color(reg) => self.color_reg(reg),
            CombinerInput::Alpha(reg) => Color::splat(self.color_reg(reg).a),
            CombinerInput::Noise => Color::splat(self.noise),
            CombinerInput::LodFrac => Color::splat(self.lod_frac),
            CombinerInput::PrimLodFrac => Color::splat(self.primitive_lod_frac),
            CombinerInput::K4 => Color::splat(self.k4),
            CombinerInput::K5 => Color::splat(self.k5),
            CombinerInput::One => Color::splat(0x100),
            CombinerInput::Zero => Color::splat(0),
        }
    }

    #[inline(always)]
    fn ext9(&self, v: i32) -> i32 {
        self.tables.special_9bit_exttable[(v & 0x1ff) as usize]
    }

    #[inline(always)]
    fn clamp9(&self, v: i32) -> i32 {
        self.tables.special_9bit_clamptable[(v & 0x1ff) as usize]
    }

    /// `((A - B) * C + (D << 8) + 0.5)`, 17 bits
    #[inline(always)]
    fn color_combiner_equation(&self, a: i32, b: i32, c: i32, d: i32) -> i32 {
        let c = c | -(c & 0x100);
        ((self.ext9(a) - self.ext9(b)) * c + (self.ext9(d) << 8) + 0x80) & 0x1ffff
    }

    /// Alpha variant: rounded to 9 bits
    #[inline(always)]
    fn alpha_combiner_equation(&self, a: i32, b: i32, c: i32, d: i32) -> i32 {
        let c = c | -(c & 0x100);
        (((self.ext9(a) - self.ext9(b)) * c + (self.ext9(d) << 8) + 0x80) >> 8) & 0x1ff
    }

    /// Evaluate one stage into the combined register, RGB unshifted
    fn combine_stage(&mut self, stage: &CombinerStage) {
        let a = self.combiner_operand(stage.rgb_sub_a);
        let b = self.combiner_operand(stage.rgb_sub_b);
        let d = self.combiner_operand(stage.rgb_add);

        let mut out = Color::default();
        if stage.rgb_mul != CombinerInput::Zero {
            let c = self.combiner_operand(stage.rgb_mul);
            out.r = self.color_combiner_equation(a.r, b.r, c.r, d.r);
            out.g = self.color_combiner_equation(a.g, b.g, c.g, d.g);
            out.b = self.color_combiner_equation(a.b, b.b, c.b, d.b);
        } else {
            out.r = ((self.ext9(d.r) << 8) + 0x80) & 0x1ffff;
            out.g = ((self.ext9(d.g) << 8) + 0x80) & 0x1ffff;
            out.b = ((self.ext9(d.b) << 8) + 0x80) & 0x1ffff;
        }

        let da = self.combiner_operand(stage.alpha_add).a;
        out.a = if stage.alpha_mul != CombinerInput::Zero {
            let aa = self.combiner_operand(stage.alpha_sub_a).a;
            let ab = self.combiner_operand(stage.alpha_sub_b).a;
            let ac = self.combiner_operand(stage.alpha_mul).a;
            self.alpha_combiner_equation(aa, ab, ac, da)
        } else {
            self.ext9(da) & 0x1ff
        };

        self.combined = out;
    }

    /// Distance of one channel from the key center, scaled by the key width
    #[inline(always)]
    fn chroma_key(combined: i32, width: i32) -> i32 {
        let key = sign(combined, 17);
        if key >= 0 {
            (width << 4) - key
        } else {
            (width << 4) + key
        }
    }

    /// Final combiner cycle: produce the pixel color and fold coverage
    ///
    /// # Arguments
    ///
    /// * `adseed` - Alpha dither value
    /// * `cvg` - Pixel coverage, replaced by `cvg * alpha` when
    ///   `cvg_times_alpha` is set
    fn combiner_last_cycle(&mut self, stage: &CombinerStage, adseed: i32, cvg: &mut u32) {
        let key_en = self.other_modes.key_en;
        // Keying passes the A operand through unmodified
        let chromabypass = if key_en {
            Some(self.combiner_operand(stage.rgb_sub_a))
        } else {
            None
        };

        self.combine_stage(stage);

        self.pixel.a = self.clamp9(self.combined.a);
        if self.pixel.a == 0xff {
            self.pixel.a = 0x100;
        }

        match chromabypass {
            None => {
                self.combined.r >>= 8;
                self.combined.g >>= 8;
                self.combined.b >>= 8;
                self.pixel.r = self.clamp9(self.combined.r);
                self.pixel.g = self.clamp9(self.combined.g);
                self.pixel.b = self.clamp9(self.combined.b);
            }
            Some(bypass) => {
                let redkey = Self::chroma_key(self.combined.r, self.key_width.r);
                let greenkey = Self::chroma_key(self.combined.g, self.key_width.g);
                let bluekey = Self::chroma_key(self.combined.b, self.key_width.b);
                self.keyalpha = redkey.min(greenkey).min(bluekey).clamp(0, 0xff);

                self.pixel.r = self.clamp9(bypass.r);
                self.pixel.g = self.clamp9(bypass.g);
                self.pixel.b = self.clamp9(bypass.b);
                self.combined.r >>= 8;
                self.combined.g >>= 8;
                self.combined.b >>= 8;
            }
        }

        let mut temp = 0;
        if self.other_modes.cvg_times_alpha {
            temp = (self.pixel.a * *cvg as i32 + 4) >> 3;
            *cvg = ((temp >> 5) & 0xf) as u32;
        }

        if !self.other_modes.alpha_cvg_select {
            if !key_en {
                self.pixel.a += adseed;
                if self.pixel.a & 0x100 != 0 {
                    self.pixel.a = 0xff;
                }
            } else {
                self.pixel.a = self.keyalpha;
            }
        } else {
            self.pixel.a = if self.other_modes.cvg_times_alpha {
                temp
            } else {
                (*cvg as i32) << 5
            };
            if self.pixel.a > 0xff {
                self.pixel.a = 0xff;
            }
        }

        self.shade.a += adseed;
        if self.shade.a & 0x100 != 0 {
            self.shade.a = 0xff;
        }
    }

    /// One-cycle combine
    pub(crate) fn combiner_1cycle(&mut self, adseed: i32, cvg: &mut u32) {
        let stage = self.combine.stages[1];
        self.combiner_last_cycle(&stage, adseed, cvg);
    }

    /// Two-cycle combine
    ///
    /// The second cycle sees texel 1 as its texel 0 and the next pixel's
    /// texel 0 as its texel 1.
    pub(crate) fn combiner_2cycle(&mut self, adseed: i32, cvg: &mut u32) {
        let first = self.combine.stages[0];
        self.combine_stage(&first);
        self.combined.r >>= 8;
        self.combined.g >>= 8;
        self.combined.b >>= 8;

        self.texel0 = self.texel1;
        self.texel1 = self.nexttexel;

        let second = self.combine.stages[1];
        self.combiner_last_cycle(&second, adseed, cvg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use crate::core::rdp::registers::CombineModes;

    /// `(TEXEL0 - 0) * SHADE + 0` in both cycles
    const MODULATE: (u32, u32) = (0x0012_1824, 0xff33_ffff);

    #[test]
    fn test_modulate() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.combine = CombineModes::from_words(MODULATE.0, MODULATE.1);
        rdp.texel0 = Color::new(0xff, 0x80, 0x00, 0xff);
        rdp.shade = Color::new(0x80, 0xff, 0xff, 0x80);

        let mut cvg = 8;
        rdp.combiner_1cycle(0, &mut cvg);
        assert_eq!(rdp.pixel.r, 0x80);
        assert_eq!(rdp.pixel.g, 0x80);
        assert_eq!(rdp.pixel.b, 0x00);
        assert_eq!(rdp.pixel.a, 0x80);
        assert_eq!(cvg, 8);
    }

    #[test]
    fn test_shade_passthrough() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        // (0 - 0) * 0 + SHADE
        rdp.combine = CombineModes::from_words(0x00ff_ffff, 0xfffe_793c);
        rdp.shade = Color::new(0x12, 0x34, 0x56, 0x78);

        let mut cvg = 8;
        rdp.combiner_1cycle(0, &mut cvg);
        assert_eq!(rdp.pixel, Color::new(0x12, 0x34, 0x56, 0x78));
    }

    #[test]
    fn test_full_alpha_promotes_then_saturates() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.combine = CombineModes::from_words(MODULATE.0, MODULATE.1);
        rdp.texel0 = Color::splat(0x100);
        rdp.shade = Color::splat(0xff);

        let mut cvg = 8;
        rdp.combiner_1cycle(0, &mut cvg);
        assert_eq!(rdp.pixel.a, 0xff);
    }

    #[test]
    fn test_alpha_cvg_select() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.combine = CombineModes::from_words(MODULATE.0, MODULATE.1);
        rdp.other_modes.alpha_cvg_select = true;
        rdp.texel0 = Color::splat(0xff);
        rdp.shade = Color::splat(0xff);

        let mut cvg = 4;
        rdp.combiner_1cycle(0, &mut cvg);
        assert_eq!(rdp.pixel.a, 0x80);
    }

    #[test]
    fn test_cvg_times_alpha() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.combine = CombineModes::from_words(MODULATE.0, MODULATE.1);
        rdp.other_modes.cvg_times_alpha = true;
        rdp.texel0 = Color::splat(0x80);
        rdp.shade = Color::splat(0xff);

        let mut cvg = 8;
        rdp.combiner_1cycle(0, &mut cvg);
        // Half alpha halves the coverage
        assert_eq!(cvg, 4);
    }

    #[test]
    fn test_two_cycle_shifts_texels() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.combine = CombineModes::from_words(MODULATE.0, MODULATE.1);
        rdp.texel0 = Color::splat(0x10);
        rdp.texel1 = Color::splat(0x20);
        rdp.nexttexel = Color::splat(0x30);
        rdp.shade = Color::splat(0xff);

        let mut cvg = 8;
        rdp.combiner_2cycle(0, &mut cvg);
        assert_eq!(rdp.texel0, Color::splat(0x20));
        assert_eq!(rdp.texel1, Color::splat(0x30));
        assert_eq!(rdp.pixel.r, 0x20);
    }
}

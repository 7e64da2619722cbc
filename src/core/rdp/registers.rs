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

//! RDP mode registers
//!
//! `Set Other Modes` and `Set Combine Mode` configure the whole pixel
//! pipeline. This module decodes both into typed records and defines the
//! [`ModeDerivs`] cache: facts about the active configuration (which span
//! renderer is needed, whether the blender may short-circuit, which dither
//! routine runs) that are resolved once per configuration change instead
//! of once per pixel.
//!
//! # References
//!
//! - [N64brew: Reality Display Processor/Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)

use serde::{Deserialize, Serialize};

/// Pipeline cycle type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CycleType {
    /// One texture/combiner/blender pass per pixel
    #[default]
    OneCycle,
    /// Two passes per pixel
    TwoCycle,
    /// Texture memory copied straight to the framebuffer
    Copy,
    /// Fill color written straight to the framebuffer
    Fill,
}

impl CycleType {
    /// Decode the 2-bit field
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => CycleType::OneCycle,
            1 => CycleType::TwoCycle,
            2 => CycleType::Copy,
            _ => CycleType::Fill,
        }
    }
}

/// Depth compare mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ZMode {
    #[default]
    Opaque,
    Interpenetrating,
    Transparent,
    Decal,
}

impl ZMode {
    /// Decode the 2-bit field
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => ZMode::Opaque,
            1 => ZMode::Interpenetrating,
            2 => ZMode::Transparent,
            _ => ZMode::Decal,
        }
    }
}

/// Coverage value written back to the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CvgDest {
    #[default]
    Clamp,
    Wrap,
    Zap,
    Save,
}

impl CvgDest {
    /// Decode the 2-bit field
    pub fn from_bits(bits: u32) -> Self {
        match bits & 3 {
            0 => CvgDest::Clamp,
            1 => CvgDest::Wrap,
            2 => CvgDest::Zap,
            _ => CvgDest::Save,
        }
    }
}

/// Decoded `Set Other Modes` register
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherModes {
    /// Raw command words the fields were decoded from
    pub words: [u32; 2],

    pub cycle_type: CycleType,
    pub persp_tex_en: bool,
    pub detail_tex_en: bool,
    pub sharpen_tex_en: bool,
    pub tex_lod_en: bool,
    pub en_tlut: bool,
    /// TLUT entries are IA16 rather than RGBA16
    pub tlut_type: bool,
    /// Bilinear (true) or point (false) sampling
    pub sample_type: bool,
    pub mid_texel: bool,
    pub bi_lerp0: bool,
    pub bi_lerp1: bool,
    pub convert_one: bool,
    pub key_en: bool,
    pub rgb_dither_sel: u32,
    pub alpha_dither_sel: u32,
    pub blend_m1a_0: u32,
    pub blend_m1a_1: u32,
    pub blend_m1b_0: u32,
    pub blend_m1b_1: u32,
    pub blend_m2a_0: u32,
    pub blend_m2a_1: u32,
    pub blend_m2b_0: u32,
    pub blend_m2b_1: u32,
    pub force_blend: bool,
    pub alpha_cvg_select: bool,
    pub cvg_times_alpha: bool,
    pub z_mode: ZMode,
    pub cvg_dest: CvgDest,
    pub color_on_cvg: bool,
    pub image_read_en: bool,
    pub z_update_en: bool,
    pub z_compare_en: bool,
    pub antialias_en: bool,
    /// Use the primitive depth instead of the interpolated one
    pub z_source_sel: bool,
    pub dither_alpha_en: bool,
    pub alpha_compare_en: bool,
}

impl OtherModes {
    /// Decode both command words
    pub fn from_words(w0: u32, w1: u32) -> Self {
        Self {
            words: [w0, w1],
            cycle_type: CycleType::from_bits(w0 >> 20),
            persp_tex_en: w0 & 0x80000 != 0,
            detail_tex_en: w0 & 0x40000 != 0,
            sharpen_tex_en: w0 & 0x20000 != 0,
            tex_lod_en: w0 & 0x10000 != 0,
            en_tlut: w0 & 0x08000 != 0,
            tlut_type: w0 & 0x04000 != 0,
            sample_type: w0 & 0x02000 != 0,
            mid_texel: w0 & 0x01000 != 0,
            bi_lerp0: w0 & 0x00800 != 0,
            bi_lerp1: w0 & 0x00400 != 0,
            convert_one: w0 & 0x00200 != 0,
            key_en: w0 & 0x00100 != 0,
            rgb_dither_sel: (w0 >> 6) & 3,
            alpha_dither_sel: (w0 >> 4) & 3,
            blend_m1a_0: (w1 >> 30) & 3,
            blend_m1a_1: (w1 >> 28) & 3,
            blend_m1b_0: (w1 >> 26) & 3,
            blend_m1b_1: (w1 >> 24) & 3,
            blend_m2a_0: (w1 >> 22) & 3,
            blend_m2a_1: (w1 >> 20) & 3,
            blend_m2b_0: (w1 >> 18) & 3,
            blend_m2b_1: (w1 >> 16) & 3,
            force_blend: (w1 >> 14) & 1 != 0,
            alpha_cvg_select: (w1 >> 13) & 1 != 0,
            cvg_times_alpha: (w1 >> 12) & 1 != 0,
            z_mode: ZMode::from_bits(w1 >> 10),
            cvg_dest: CvgDest::from_bits(w1 >> 8),
            color_on_cvg: (w1 >> 7) & 1 != 0,
            image_read_en: (w1 >> 6) & 1 != 0,
            z_update_en: (w1 >> 5) & 1 != 0,
            z_compare_en: (w1 >> 4) & 1 != 0,
            antialias_en: (w1 >> 3) & 1 != 0,
            z_source_sel: (w1 >> 2) & 1 != 0,
            dither_alpha_en: (w1 >> 1) & 1 != 0,
            alpha_compare_en: w1 & 1 != 0,
        }
    }
}

/// Color registers the combiner can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorReg {
    Combined,
    Texel0,
    Texel1,
    Prim,
    Shade,
    Env,
    KeyCenter,
    KeyScale,
}

/// One combiner operand
///
/// `Color` reads each lane of the register into the matching channel;
/// `Alpha` broadcasts the register's alpha lane to every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombinerInput {
    Color(ColorReg),
    Alpha(ColorReg),
    Noise,
    LodFrac,
    PrimLodFrac,
    K4,
    K5,
    One,
    Zero,
}

impl CombinerInput {
    /// RGB "A" (subtrahend source), 4-bit selector
    pub fn rgb_sub_a(sel: u32) -> Self {
        use ColorReg::*;
        match sel & 0xf {
            0 => Self::Color(Combined),
            1 => Self::Color(Texel0),
            2 => Self::Color(Texel1),
            3 => Self::Color(Prim),
            4 => Self::Color(Shade),
            5 => Self::Color(Env),
            6 => Self::One,
            7 => Self::Noise,
            _ => Self::Zero,
        }
    }

    /// RGB "B", 4-bit selector
    pub fn rgb_sub_b(sel: u32) -> Self {
        use ColorReg::*;
        match sel & 0xf {
            0 => Self::Color(Combined),
            1 => Self::Color(Texel0),
            2 => Self::Color(Texel1),
            3 => Self::Color(Prim),
            4 => Self::Color(Shade),
            5 => Self::Color(Env),
            6 => Self::Color(KeyCenter),
            7 => Self::K4,
            _ => Self::Zero,
        }
    }

    /// RGB "C" (multiplier), 5-bit selector
    pub fn rgb_mul(sel: u32) -> Self {
        use ColorReg::*;
        match sel & 0x1f {
            0 => Self::Color(Combined),
            1 => Self::Color(Texel0),
            2 => Self::Color(Texel1),
            3 => Self::Color(Prim),
            4 => Self::Color(Shade),
            5 => Self::Color(Env),
            6 => Self::Color(KeyScale),
            7 => Self::Alpha(Combined),
            8 => Self::Alpha(Texel0),
            9 => Self::Alpha(Texel1),
            10 => Self::Alpha(Prim),
            11 => Self::Alpha(Shade),
            12 => Self::Alpha(Env),
            13 => Self::LodFrac,
            14 => Self::PrimLodFrac,
            15 => Self::K5,
            _ => Self::Zero,
        }
    }

    /// RGB "D" (addend), 3-bit selector
    pub fn rgb_add(sel: u32) -> Self {
        use ColorReg::*;
        match sel & 7 {
            0 => Self::Color(Combined),
            1 => Self::Color(Texel0),
            2 => Self::Color(Texel1),
            3 => Self::Color(Prim),
            4 => Self::Color(Shade),
            5 => Self::Color(Env),
            6 => Self::One,
            _ => Self::Zero,
        }
    }

    /// Alpha "A", "B" and "D", 3-bit selector
    pub fn alpha_sub_or_add(sel: u32) -> Self {
        use ColorReg::*;
        match sel & 7 {
            0 => Self::Alpha(Combined),
            1 => Self::Alpha(Texel0),
            2 => Self::Alpha(Texel1),
            3 => Self::Alpha(Prim),
            4 => Self::Alpha(Shade),
            5 => Self::Alpha(Env),
            6 => Self::One,
            _ => Self::Zero,
        }
    }

    /// Alpha "C", 3-bit selector
    pub fn alpha_mul(sel: u32) -> Self {
        use ColorReg::*;
        match sel & 7 {
            0 => Self::LodFrac,
            1 => Self::Alpha(Texel0),
            2 => Self::Alpha(Texel1),
            3 => Self::Alpha(Prim),
            4 => Self::Alpha(Shade),
            5 => Self::Alpha(Env),
            6 => Self::PrimLodFrac,
            _ => Self::Zero,
        }
    }

    /// Operand reads `reg` on any lane
    pub fn reads(self, reg: ColorReg) -> bool {
        matches!(self, Self::Color(r) | Self::Alpha(r) if r == reg)
    }
}

/// Operands of one combiner cycle: `(A - B) * C + D`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinerStage {
    pub rgb_sub_a: CombinerInput,
    pub rgb_sub_b: CombinerInput,
    pub rgb_mul: CombinerInput,
    pub rgb_add: CombinerInput,
    pub alpha_sub_a: CombinerInput,
    pub alpha_sub_b: CombinerInput,
    pub alpha_mul: CombinerInput,
    pub alpha_add: CombinerInput,
}

impl CombinerStage {
    /// Build a stage from `[A, B, C, D]` selectors for RGB and alpha
    pub fn from_selectors(rgb: [u32; 4], alpha: [u32; 4]) -> Self {
        Self {
            rgb_sub_a: CombinerInput::rgb_sub_a(rgb[0]),
            rgb_sub_b: CombinerInput::rgb_sub_b(rgb[1]),
            rgb_mul: CombinerInput::rgb_mul(rgb[2]),
            rgb_add: CombinerInput::rgb_add(rgb[3]),
            alpha_sub_a: CombinerInput::alpha_sub_or_add(alpha[0]),
            alpha_sub_b: CombinerInput::alpha_sub_or_add(alpha[1]),
            alpha_mul: CombinerInput::alpha_mul(alpha[2]),
            alpha_add: CombinerInput::alpha_sub_or_add(alpha[3]),
        }
    }

    /// Any operand of this stage reads `reg`
    pub fn uses(&self, reg: ColorReg) -> bool {
        [
            self.rgb_sub_a,
            self.rgb_sub_b,
            self.rgb_mul,
            self.rgb_add,
            self.alpha_sub_a,
            self.alpha_sub_b,
            self.alpha_mul,
            self.alpha_add,
        ]
        .iter()
        .any(|input| input.reads(reg))
    }

    /// Either multiplier is the LOD fraction
    pub fn uses_lod_frac(&self) -> bool {
        self.rgb_mul == CombinerInput::LodFrac || self.alpha_mul == CombinerInput::LodFrac
    }
}

/// Decoded `Set Combine Mode` register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineModes {
    /// Raw command words the stages were decoded from
    pub words: [u32; 2],
    pub stages: [CombinerStage; 2],
}

impl Default for CombineModes {
    fn default() -> Self {
        Self::from_words(0, 0)
    }
}

impl CombineModes {
    /// Decode both command words
    pub fn from_words(w0: u32, w1: u32) -> Self {
        let sub_a_rgb0 = (w0 >> 20) & 0xf;
        let mul_rgb0 = (w0 >> 15) & 0x1f;
        let sub_a_a0 = (w0 >> 12) & 7;
        let mul_a0 = (w0 >> 9) & 7;
        let sub_a_rgb1 = (w0 >> 5) & 0xf;
        let mul_rgb1 = w0 & 0x1f;

        let sub_b_rgb0 = (w1 >> 28) & 0xf;
        let sub_b_rgb1 = (w1 >> 24) & 0xf;
        let sub_a_a1 = (w1 >> 21) & 7;
        let mul_a1 = (w1 >> 18) & 7;
        let add_rgb0 = (w1 >> 15) & 7;
        let sub_b_a0 = (w1 >> 12) & 7;
        let add_a0 = (w1 >> 9) & 7;
        let add_rgb1 = (w1 >> 6) & 7;
        let sub_b_a1 = (w1 >> 3) & 7;
        let add_a1 = w1 & 7;

        Self {
            words: [w0, w1],
            stages: [
                CombinerStage::from_selectors(
                    [sub_a_rgb0, sub_b_rgb0, mul_rgb0, add_rgb0],
                    [sub_a_a0, sub_b_a0, mul_a0, add_a0],
                ),
                CombinerStage::from_selectors(
                    [sub_a_rgb1, sub_b_rgb1, mul_rgb1, add_rgb1],
                    [sub_a_a1, sub_b_a1, mul_a1, add_a1],
                ),
            ],
        }
    }
}

/// Color operand of the blender ("P" and "M" terms)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlenderColorInput {
    /// Combiner output (first cycle)
    Pixel,
    /// First blender cycle output (second cycle)
    BlendedPixel,
    Memory,
    Blend,
    Fog,
}

/// Alpha operand of the blender ("A" and "B" terms)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlenderAlphaInput {
    PixelAlpha,
    FogAlpha,
    ShadeAlpha,
    InvPixelAlpha,
    MemoryAlpha,
    /// Constant 0xff
    One,
    Zero,
}

/// Operands of one blender cycle: `(P * A + M * B) / (A + B)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlenderStage {
    pub i1a: BlenderColorInput,
    pub i1b: BlenderAlphaInput,
    pub i2a: BlenderColorInput,
    pub i2b: BlenderAlphaInput,
}

impl BlenderStage {
    /// Decode one cycle's four 2-bit selectors
    pub fn from_selectors(cycle: usize, m1a: u32, m1b: u32, m2a: u32, m2b: u32) -> Self {
        Self {
            i1a: Self::color_input(cycle, m1a),
            i1b: match m1b & 3 {
                0 => BlenderAlphaInput::PixelAlpha,
                1 => BlenderAlphaInput::FogAlpha,
                2 => BlenderAlphaInput::ShadeAlpha,
                _ => BlenderAlphaInput::Zero,
            },
            i2a: Self::color_input(cycle, m2a),
            i2b: match m2b & 3 {
                0 => BlenderAlphaInput::InvPixelAlpha,
                1 => BlenderAlphaInput::MemoryAlpha,
                2 => BlenderAlphaInput::One,
                _ => BlenderAlphaInput::Zero,
            },
        }
    }

    fn color_input(cycle: usize, sel: u32) -> BlenderColorInput {
        match sel & 3 {
            0 if cycle == 0 => BlenderColorInput::Pixel,
            0 => BlenderColorInput::BlendedPixel,
            1 => BlenderColorInput::Memory,
            2 => BlenderColorInput::Blend,
            _ => BlenderColorInput::Fog,
        }
    }
}

/// Span renderer for one-cycle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OneCycleRenderer {
    /// No texture read by the combiner
    #[default]
    Blend,
    /// Texel0 (or the LOD fraction) only
    NoTexel1,
    /// Texel1 read too: pipelined lookahead of the next pixel's texel
    Complete,
}

/// Span renderer for two-cycle mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TwoCycleRenderer {
    /// No texture read by either cycle
    #[default]
    Blend,
    /// Only texel0 in the first cycle (or the LOD fraction)
    NoTexel1,
    /// Both texels, but the next pixel's texel is not needed
    NoTexelNext,
    /// Second cycle reads texel1: full lookahead
    Complete,
}

/// Which dither/noise generator runs per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DitherNoise {
    /// Matrix dither plus a fresh noise value
    #[default]
    Complete,
    /// Matrix dither only
    DitherOnly,
    /// Neither RGB nor alpha dither active
    Nothing,
}

/// Facts derived from the active other-modes and combine registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeDerivs {
    /// Texture LOD must be computed
    pub dolod: bool,
    /// One-cycle blend is skipped for fully opaque pixels
    pub partialreject_1cycle: bool,
    /// Two-cycle second blend is skipped for fully opaque pixels
    pub partialreject_2cycle: bool,
    /// First blender cycle weights by memory alpha
    pub special_bsel0: bool,
    /// Second blender cycle weights by memory alpha
    pub special_bsel1: bool,
    /// `(rgb_dither_sel << 2) | alpha_dither_sel`
    pub rgb_alpha_dither: u32,
    /// Per-pixel blender shifters must track the depth slope
    pub realblendershiftersneeded: bool,
    /// Shifters from the previous pixel are needed (two-cycle)
    pub interpixelblendershiftersneeded: bool,
    /// RGB dither is applied (selector 3 disables it)
    pub rgb_dither: bool,
    pub one_cycle: OneCycleRenderer,
    pub two_cycle: TwoCycleRenderer,
    pub dither_noise: DitherNoise,
}

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
//! RDP (Reality Display Processor) pixel pipeline
//!
//! This module implements the pixel pipeline of the N64 RDP: the part of the
//! chip that turns triangle, rectangle and load commands into the exact
//! color and depth values written to RDRAM. Each hardware stage lives in its
//! own file and adds an `impl Rdp` block:
//!
//! - `edgewalker` / `load`: scanline setup for primitives and texture loads
//! - `texcoord`: perspective divide, LOD, tile shift/clamp/mask
//! - `tmem` / `texel`: bank-interleaved TMEM addressing and texel decoding
//! - `filter`: bilinear, three-point and YUV conversion filtering
//! - `combiner` / `blender`: the two programmable color stages
//! - `coverage` / `dither` / `zbuffer` / `framebuffer`: the pixel back end
//! - `spans`: per-cycle-type span renderers that drive the stages
//! - `commands`: command decoding and the [`Rdp::execute`] dispatcher
//!
//! # Fixed point
//!
//! Every stage works on wrapping integer arithmetic with hardware-exact
//! truncation. Helpers [`sign`] and [`sign16`] sign-extend packed fields.
//!
//! # References
//!
//! - [N64brew: Reality Display Processor](https://n64brew.dev/wiki/Reality_Display_Processor)
//! - [N64brew: RDP Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)

// Module declarations
mod blender;
mod combiner;
pub mod commands;
mod coverage;
mod dither;
mod edgewalker;
mod filter;
mod framebuffer;
mod load;
pub mod memory;
pub mod primitives;
pub mod registers;
mod spans;
pub mod state;
pub mod tables;
mod texcoord;
mod texel;
pub mod tmem;
mod zbuffer;
#[cfg(test)]
mod tests;

// Public re-exports
pub use memory::{LcgNoise, LogTraceSink, NoiseSource, Rdram, TraceSink, VecRdram};
pub use primitives::*;
pub use registers::*;
pub use state::RdpState;
pub use tables::Tables;
pub use tmem::Tmem;

use crate::core::config::RdpConfig;

/// Sign-extend the low 16 bits
#[inline(always)]
pub(crate) fn sign16(x: i32) -> i32 {
    x as i16 as i32
}

/// Sign-extend the low `bits` bits
#[inline(always)]
pub(crate) fn sign(x: i32, bits: u32) -> i32 {
    let mask = ((1u32 << bits) - 1) as i32;
    let top = 1i32 << (bits - 1);
    (x & mask) | (x & top).wrapping_neg()
}

/// RDP state: one render context
///
/// Owns every register, the tile descriptors, TMEM, the span buffer and the
/// lookup tables. Console memory, the noise generator and the optional
/// trace hook are boxed collaborators, so a context is `Send` and several
/// contexts can run independently.
///
/// # Examples
///
/// ```
/// use rdpx::core::config::RdpConfig;
/// use rdpx::core::rdp::Rdp;
///
/// let mut rdp = Rdp::new(&RdpConfig::default());
/// rdp.init();
/// assert!(!rdp.pipeline_crashed());
/// ```
pub struct Rdp {
    // ===== Mode registers =====
    /// Decoded `Set Other Modes`
    pub(crate) other_modes: OtherModes,

    /// Decoded `Set Combine Mode`
    pub(crate) combine: CombineModes,

    /// Blender operands for both cycles, resolved from the other modes
    pub(crate) blender: [BlenderStage; 2],

    /// Facts derived from the modes, refreshed on every mode change
    pub(crate) derivs: ModeDerivs,

    // ===== Texture state =====
    /// Tile descriptors
    pub(crate) tiles: [Tile; 8],

    /// Texture memory
    pub(crate) tmem: Tmem,

    /// Source image for load commands
    pub(crate) ti: TextureImage,

    /// Highest mip level of the primitive being drawn
    pub(crate) max_level: i32,

    /// Minimum LOD clamp (`Set Prim Color`)
    pub(crate) min_level: i32,

    // ===== Rasterizer hand-off =====
    /// One entry per scanline plus a trailing sentinel
    ///
    /// The LOD logic peeks at `scanline + 1`; the sentinel keeps that
    /// access inside the buffer for the last scanline.
    pub(crate) spans: Vec<Span>,

    /// Per-pixel increments of the current primitive
    pub(crate) deltas: SpanDeltas,

    /// Coverage masks of the scanline being rendered
    pub(crate) cvgbuf: Vec<u8>,

    // ===== Per-pixel registers =====
    pub(crate) combined: Color,
    pub(crate) texel0: Color,
    pub(crate) texel1: Color,
    pub(crate) nexttexel: Color,
    pub(crate) nexttexel1: Color,
    pub(crate) shade: Color,
    pub(crate) pixel: Color,
    pub(crate) inv_pixel: Color,
    pub(crate) blended_pixel: Color,
    pub(crate) memory: Color,
    pub(crate) pre_memory: Color,

    /// Combiner noise input
    pub(crate) noise: i32,

    /// LOD fraction of the current pixel
    pub(crate) lod_frac: i32,

    /// Alpha produced by the chroma key
    pub(crate) keyalpha: i32,

    // ===== Command-loaded registers =====
    pub(crate) prim: Color,
    pub(crate) env: Color,
    pub(crate) blend: Color,
    pub(crate) fog: Color,
    pub(crate) key_center: Color,
    pub(crate) key_scale: Color,
    /// Chroma key widths (12 bits per channel)
    pub(crate) key_width: Color,

    pub(crate) primitive_lod_frac: i32,
    pub(crate) fill_color: u32,

    /// Depth used when `z_source_sel` is set (already in 15.16 form)
    pub(crate) primitive_z: u32,
    pub(crate) primitive_delta_z: u32,

    /// YUV conversion constants, stored as `(k << 1) + 1`
    pub(crate) k0_tf: i32,
    pub(crate) k1_tf: i32,
    pub(crate) k2_tf: i32,
    pub(crate) k3_tf: i32,
    pub(crate) k4: i32,
    pub(crate) k5: i32,

    /// Render target
    pub(crate) fb: ColorImage,

    /// Z buffer byte address
    pub(crate) zb_address: u32,

    /// Scissor box
    pub(crate) clip: Scissor,

    /// Scissor restored by [`Rdp::init`]
    default_clip: Scissor,

    // ===== Blender shifters =====
    pub(crate) blshifta: i32,
    pub(crate) blshiftb: i32,
    pub(crate) pastblshifta: i32,
    pub(crate) pastblshiftb: i32,
    /// Depth slope exponent read from memory for the previous pixel
    pub(crate) pastrawdzmem: u32,

    // ===== Diagnostics =====
    /// Sticky fault flag, cleared only by [`Rdp::init`]
    pub(crate) pipeline_crashed: bool,

    pub(crate) warnings: OneTimeWarnings,

    // ===== Tables and collaborators =====
    pub(crate) tables: Tables,
    pub(crate) rdram: Box<dyn Rdram + Send>,
    pub(crate) noise_source: Box<dyn NoiseSource + Send>,
    pub(crate) trace: Option<Box<dyn TraceSink + Send>>,
}

impl Rdp {
    /// Create a context with the built-in RDRAM store and noise generator
    ///
    /// # Arguments
    ///
    /// * `config` - Host configuration (RDRAM size, noise seed, scissor)
    ///
    /// # Returns
    ///
    /// A fully initialized context
    pub fn new(config: &RdpConfig) -> Self {
        let mut rdp = Self::with_collaborators(
            config,
            Box::new(VecRdram::new(config.rdram_size)),
            Box::new(LcgNoise::new(config.noise_seed)),
        );
        if config.trace_loads {
            rdp.trace = Some(Box::new(LogTraceSink));
        }
        rdp
    }

    /// Create a context around host-provided memory and noise
    pub fn with_collaborators(
        config: &RdpConfig,
        rdram: Box<dyn Rdram + Send>,
        noise_source: Box<dyn NoiseSource + Send>,
    ) -> Self {
        let default_clip = match config.scissor {
            Some([xh, yh, xl, yl]) => Scissor {
                xh: (xh & 0xfff) as i32,
                yh: (yh & 0xfff) as i32,
                xl: (xl & 0xfff) as i32,
                yl: (yl & 0xfff) as i32,
                field: false,
                keep_odd: false,
            },
            None => Scissor::default(),
        };

        let mut rdp = Self {
            other_modes: OtherModes::default(),
            combine: CombineModes::default(),
            blender: [
                BlenderStage::from_selectors(0, 0, 0, 0, 0),
                BlenderStage::from_selectors(1, 0, 0, 0, 0),
            ],
            derivs: ModeDerivs::default(),
            tiles: [Tile::default(); 8],
            tmem: Tmem::new(),
            ti: TextureImage::default(),
            max_level: 0,
            min_level: 0,
            spans: vec![Span::default(); SPAN_COUNT + 1],
            deltas: SpanDeltas::default(),
            cvgbuf: vec![0; SPAN_COUNT],
            combined: Color::default(),
            texel0: Color::default(),
            texel1: Color::default(),
            nexttexel: Color::default(),
            nexttexel1: Color::default(),
            shade: Color::default(),
            pixel: Color::default(),
            inv_pixel: Color::default(),
            blended_pixel: Color::default(),
            memory: Color::default(),
            pre_memory: Color::default(),
            noise: 0,
            lod_frac: 0,
            keyalpha: 0,
            prim: Color::default(),
            env: Color::default(),
            blend: Color::default(),
            fog: Color::default(),
            key_center: Color::default(),
            key_scale: Color::default(),
            key_width: Color::default(),
            primitive_lod_frac: 0,
            fill_color: 0,
            primitive_z: 0,
            primitive_delta_z: 0,
            k0_tf: 0,
            k1_tf: 0,
            k2_tf: 0,
            k3_tf: 0,
            k4: 0,
            k5: 0,
            fb: ColorImage::default(),
            zb_address: 0,
            clip: default_clip,
            default_clip,
            blshifta: 0,
            blshiftb: 0,
            pastblshifta: 0,
            pastblshiftb: 0,
            pastrawdzmem: 0,
            pipeline_crashed: false,
            warnings: OneTimeWarnings::default(),
            tables: Tables::new(),
            rdram,
            noise_source,
            trace: None,
        };
        rdp.init();
        rdp
    }

    /// Reset the context to its power-on state
    ///
    /// Clears every register, tile, TMEM, span and flag, rebuilds the
    /// lookup tables and reapplies all-zero other modes. Console memory and
    /// the collaborators are left alone. Calling this twice in a row is the
    /// same as calling it once.
    pub fn init(&mut self) {
        self.other_modes = OtherModes::from_words(0, 0);
        self.combine = CombineModes::default();
        self.deduce_derivatives();

        self.tmem.clear();
        self.tiles = [Tile::default(); 8];
        for tile in self.tiles.iter_mut() {
            tile.calculate_tile_derivs();
            tile.calculate_clamp_diffs();
        }
        self.ti = TextureImage::default();
        self.max_level = 0;
        self.min_level = 0;

        self.spans.fill(Span::default());
        self.deltas = SpanDeltas::default();
        self.cvgbuf.fill(0);

        self.combined = Color::default();
        self.texel0 = Color::default();
        self.texel1 = Color::default();
        self.nexttexel = Color::default();
        self.nexttexel1 = Color::default();
        self.shade = Color::default();
        self.pixel = Color::default();
        self.inv_pixel = Color::default();
        self.blended_pixel = Color::default();
        self.memory = Color::default();
        self.pre_memory = Color::default();
        self.noise = 0;
        self.lod_frac = 0;
        self.keyalpha = 0;

        self.prim = Color::default();
        self.env = Color::default();
        self.blend = Color::default();
        self.fog = Color::default();
        self.key_center = Color::default();
        self.key_scale = Color::default();
        self.key_width = Color::default();
        self.primitive_lod_frac = 0;
        self.fill_color = 0;
        self.primitive_z = 0;
        self.primitive_delta_z = 0;
        self.k0_tf = 0;
        self.k1_tf = 0;
        self.k2_tf = 0;
        self.k3_tf = 0;
        self.k4 = 0;
        self.k5 = 0;
        self.fb = ColorImage::default();
        self.zb_address = 0;
        self.clip = self.default_clip;

        self.blshifta = 0;
        self.blshiftb = 0;
        self.pastblshifta = 0;
        self.pastblshiftb = 0;
        self.pastrawdzmem = 0;

        self.pipeline_crashed = false;
        self.warnings = OneTimeWarnings::default();

        self.tables = Tables::new();

        log::debug!("RDP initialized");
    }

    /// A command hit an unsupported configuration since the last init
    pub fn pipeline_crashed(&self) -> bool {
        self.pipeline_crashed
    }

    /// Console memory as seen by the RDP
    pub fn rdram(&self) -> &dyn Rdram {
        self.rdram.as_ref()
    }

    /// Mutable console memory, for hosts that upload textures directly
    pub fn rdram_mut(&mut self) -> &mut dyn Rdram {
        self.rdram.as_mut()
    }

    /// Texture memory
    pub fn tmem(&self) -> &Tmem {
        &self.tmem
    }

    /// Tile descriptor `index` (0-7)
    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index & 7]
    }

    /// Active other modes
    pub fn other_modes(&self) -> &OtherModes {
        &self.other_modes
    }

    /// Cached facts about the active modes
    pub fn mode_derivs(&self) -> &ModeDerivs {
        &self.derivs
    }

    /// Active render target
    pub fn color_image(&self) -> &ColorImage {
        &self.fb
    }

    /// Precomputed lookup tables
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Install or remove the load trace hook
    pub fn set_trace_sink(&mut self, sink: Option<Box<dyn TraceSink + Send>>) {
        self.trace = sink;
    }

    /// Recompute every fact derived from the other modes and combine mode
    ///
    /// Runs after each command that changes either register; nothing reads
    /// a stale value.
    pub fn deduce_derivatives(&mut self) {
        let om = &self.other_modes;
        let one_cycle = om.cycle_type == CycleType::OneCycle;
        let two_cycle = om.cycle_type == CycleType::TwoCycle;

        self.blender = [
            BlenderStage::from_selectors(0, om.blend_m1a_0, om.blend_m1b_0, om.blend_m2a_0, om.blend_m2b_0),
            BlenderStage::from_selectors(1, om.blend_m1a_1, om.blend_m1b_1, om.blend_m2a_1, om.blend_m2b_1),
        ];

        let partialreject = |stage: &BlenderStage| {
            stage.i2b == BlenderAlphaInput::InvPixelAlpha && stage.i1b == BlenderAlphaInput::PixelAlpha
        };
        let special_bsel0 = self.blender[0].i2b == BlenderAlphaInput::MemoryAlpha;
        let special_bsel1 = self.blender[1].i2b == BlenderAlphaInput::MemoryAlpha;

        let rgb_alpha_dither = (om.rgb_dither_sel << 2) | om.alpha_dither_sel;

        let [cc0, cc1] = &self.combine.stages;
        let texel0_used_in_cc0 = cc0.uses(ColorReg::Texel0);
        let texel0_used_in_cc1 = cc1.uses(ColorReg::Texel0);
        let texel1_used_in_cc0 = cc0.uses(ColorReg::Texel1);
        let texel1_used_in_cc1 = cc1.uses(ColorReg::Texel1);
        let lodfrac_used_in_cc0 = cc0.uses_lod_frac();
        let lodfrac_used_in_cc1 = cc1.uses_lod_frac();

        let one_cycle_renderer = if texel1_used_in_cc1 {
            OneCycleRenderer::Complete
        } else if texel0_used_in_cc1 || lodfrac_used_in_cc1 {
            OneCycleRenderer::NoTexel1
        } else {
            OneCycleRenderer::Blend
        };

        let two_cycle_renderer = if texel1_used_in_cc1 {
            TwoCycleRenderer::Complete
        } else if texel1_used_in_cc0 || texel0_used_in_cc1 {
            TwoCycleRenderer::NoTexelNext
        } else if texel0_used_in_cc0 || lodfrac_used_in_cc0 || lodfrac_used_in_cc1 {
            TwoCycleRenderer::NoTexel1
        } else {
            TwoCycleRenderer::Blend
        };

        let lodfracused = (two_cycle && (lodfrac_used_in_cc0 || lodfrac_used_in_cc1))
            || (one_cycle && lodfrac_used_in_cc1);

        let noise_in_cc = (one_cycle && cc1.rgb_sub_a == CombinerInput::Noise)
            || (two_cycle && (cc0.rgb_sub_a == CombinerInput::Noise || cc1.rgb_sub_a == CombinerInput::Noise));
        let dither_noise = if noise_in_cc || om.alpha_dither_sel == 2 {
            DitherNoise::Complete
        } else if rgb_alpha_dither != 0xf {
            DitherNoise::DitherOnly
        } else {
            DitherNoise::Nothing
        };

        self.derivs = ModeDerivs {
            dolod: om.tex_lod_en || lodfracused,
            partialreject_1cycle: partialreject(&self.blender[0]),
            partialreject_2cycle: partialreject(&self.blender[1]),
            special_bsel0,
            special_bsel1,
            rgb_alpha_dither,
            realblendershiftersneeded: (special_bsel0 && one_cycle) || (special_bsel1 && two_cycle),
            interpixelblendershiftersneeded: special_bsel0 && two_cycle,
            rgb_dither: om.rgb_dither_sel != 3,
            one_cycle: one_cycle_renderer,
            two_cycle: two_cycle_renderer,
            dither_noise,
        };
    }

    /// Raise the crash flag; the first crash since init is logged
    pub(crate) fn crash(&mut self, reason: &str) {
        if !self.pipeline_crashed {
            log::warn!("RDP pipeline crashed: {}", reason);
        }
        self.pipeline_crashed = true;
    }
}

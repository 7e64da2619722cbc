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

//! Mode and register commands
//!
//! Commands that load the pipeline configuration and the constant
//! registers the combiner and blender read.
//!
//! # Commands
//!
//! - 0x2A: Set Key GB
//! - 0x2B: Set Key R
//! - 0x2C: Set Convert
//! - 0x2D: Set Scissor
//! - 0x2E: Set Prim Depth
//! - 0x2F: Set Other Modes
//! - 0x37: Set Fill Color
//! - 0x38: Set Fog Color
//! - 0x39: Set Blend Color
//! - 0x3A: Set Prim Color
//! - 0x3B: Set Env Color
//! - 0x3C: Set Combine Mode
//! - 0x3E: Set Mask Image
//! - 0x3F: Set Color Image
//!
//! # References
//!
//! - [N64brew: RDP Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)

use crate::core::rdp::primitives::{Color, ColorImage, Scissor};
use crate::core::rdp::registers::{CombineModes, OtherModes};
use crate::core::rdp::{sign, Rdp};

/// Mask of a 24-bit RDRAM address
const ADDRESS_MASK: u32 = 0x00ff_ffff;

impl Rdp {
    /// 0x2F - Set Other Modes
    ///
    /// Replaces the whole pipeline configuration and rederives every
    /// cached selection from it.
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x2F | cycle type (52-53) | texture and dither flags (32-51)
    /// w1: blender selectors (16-31) | coverage, z and alpha flags (0-15)
    /// ```
    pub fn set_other_modes(&mut self, words: &[u32; 2]) {
        self.other_modes = OtherModes::from_words(words[0], words[1]);
        self.deduce_derivatives();
        log::debug!(
            "other modes {:#010x} {:#010x}: {:?}, 1-cycle {:?}, 2-cycle {:?}",
            words[0],
            words[1],
            self.other_modes.cycle_type,
            self.derivs.one_cycle,
            self.derivs.two_cycle
        );
    }

    /// 0x3C - Set Combine Mode
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x3C | a0 rgb (4) | c0 rgb (5) | a0 alpha (3) | c0 alpha (3)
    ///          | a1 rgb (4) | c1 rgb (5)
    /// w1: b0 rgb (4) | b1 rgb (4) | a1 alpha (3) | c1 alpha (3)
    ///   | d0 rgb (3) | b0 alpha (3) | d0 alpha (3) | d1 rgb (3)
    ///   | b1 alpha (3) | d1 alpha (3)
    /// ```
    pub fn set_combine(&mut self, words: &[u32; 2]) {
        self.combine = CombineModes::from_words(words[0], words[1]);
        self.deduce_derivatives();
        log::debug!("combine {:#010x} {:#010x}", words[0], words[1]);
    }

    /// 0x37 - Set Fill Color
    ///
    /// The 32-bit pattern is written as is: two 16-bit pixels or one
    /// 32-bit pixel.
    pub fn set_fill_color(&mut self, words: &[u32; 2]) {
        self.fill_color = words[1];
    }

    /// 0x38 - Set Fog Color (RGBA8888 in w1)
    pub fn set_fog_color(&mut self, words: &[u32; 2]) {
        self.fog = Color::from_rgba32(words[1]);
    }

    /// 0x39 - Set Blend Color (RGBA8888 in w1)
    pub fn set_blend_color(&mut self, words: &[u32; 2]) {
        self.blend = Color::from_rgba32(words[1]);
    }

    /// 0x3A - Set Prim Color
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x3A | min level (8-12) | primitive LOD fraction (0-7)
    /// w1: RGBA8888
    /// ```
    pub fn set_prim_color(&mut self, words: &[u32; 2]) {
        self.min_level = ((words[0] >> 8) & 0x1f) as i32;
        self.primitive_lod_frac = (words[0] & 0xff) as i32;
        self.prim = Color::from_rgba32(words[1]);
    }

    /// 0x3B - Set Env Color (RGBA8888 in w1)
    pub fn set_env_color(&mut self, words: &[u32; 2]) {
        self.env = Color::from_rgba32(words[1]);
    }

    /// 0x2A - Set Key GB
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x2A | width G (12-23) | width B (0-11)
    /// w1: center G | scale G | center B | scale B
    /// ```
    pub fn set_key_gb(&mut self, words: &[u32; 2]) {
        self.key_width.g = ((words[0] >> 12) & 0xfff) as i32;
        self.key_width.b = (words[0] & 0xfff) as i32;
        self.key_center.g = ((words[1] >> 24) & 0xff) as i32;
        self.key_scale.g = ((words[1] >> 16) & 0xff) as i32;
        self.key_center.b = ((words[1] >> 8) & 0xff) as i32;
        self.key_scale.b = (words[1] & 0xff) as i32;
    }

    /// 0x2B - Set Key R
    ///
    /// # Command Format
    ///
    /// ```text
    /// w1: width R (16-27) | center R (8-15) | scale R (0-7)
    /// ```
    pub fn set_key_r(&mut self, words: &[u32; 2]) {
        self.key_width.r = ((words[1] >> 16) & 0xfff) as i32;
        self.key_center.r = ((words[1] >> 8) & 0xff) as i32;
        self.key_scale.r = (words[1] & 0xff) as i32;
    }

    /// 0x2C - Set Convert
    ///
    /// Loads the YUV conversion constants. K0-K3 are stored pre-scaled
    /// for the filter (`2k + 1`); K4 and K5 feed the combiner as is.
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x2C | K0 (45-53) | K1 (36-44) | K2 high (32-35)
    /// w1: K2 low (27-31) | K3 (18-26) | K4 (9-17) | K5 (0-8)
    /// ```
    pub fn set_convert(&mut self, words: &[u32; 2]) {
        let k0 = ((words[0] >> 13) & 0x1ff) as i32;
        let k1 = ((words[0] >> 4) & 0x1ff) as i32;
        let k2 = (((words[0] & 0xf) << 5) | ((words[1] >> 27) & 0x1f)) as i32;
        let k3 = ((words[1] >> 18) & 0x1ff) as i32;

        self.k0_tf = (sign(k0, 9) << 1) + 1;
        self.k1_tf = (sign(k1, 9) << 1) + 1;
        self.k2_tf = (sign(k2, 9) << 1) + 1;
        self.k3_tf = (sign(k3, 9) << 1) + 1;
        self.k4 = ((words[1] >> 9) & 0x1ff) as i32;
        self.k5 = (words[1] & 0x1ff) as i32;
    }

    /// 0x2E - Set Prim Depth
    ///
    /// # Command Format
    ///
    /// ```text
    /// w1: depth (16-30) | delta depth (0-15)
    /// ```
    pub fn set_prim_depth(&mut self, words: &[u32; 2]) {
        self.primitive_z = words[1] & (0x7fff << 16);
        self.primitive_delta_z = words[1] & 0xffff;
    }

    /// 0x2D - Set Scissor
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x2D | XH (12-23) | YH (0-11)
    /// w1: field (25) | odd (24) | XL (12-23) | YL (0-11)
    /// ```
    ///
    /// Coordinates are 10.2 fixed point.
    pub fn set_scissor(&mut self, words: &[u32; 2]) {
        self.clip = Scissor {
            xh: ((words[0] >> 12) & 0xfff) as i32,
            yh: (words[0] & 0xfff) as i32,
            xl: ((words[1] >> 12) & 0xfff) as i32,
            yl: (words[1] & 0xfff) as i32,
            field: (words[1] >> 25) & 1 != 0,
            keep_odd: (words[1] >> 24) & 1 != 0,
        };
        log::debug!("scissor {:?}", self.clip);
    }

    /// 0x3E - Set Mask Image (z buffer address in w1)
    pub fn set_mask_image(&mut self, words: &[u32; 2]) {
        self.zb_address = words[1] & ADDRESS_MASK;
    }

    /// 0x3F - Set Color Image
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x3F | format (53-55) | size (51-52) | width - 1 (32-41)
    /// w1: RDRAM address
    /// ```
    pub fn set_color_image(&mut self, words: &[u32; 2]) {
        self.fb = ColorImage {
            format: (words[0] >> 21) & 7,
            size: (words[0] >> 19) & 3,
            width: ((words[0] & 0x3ff) + 1) as i32,
            address: words[1] & ADDRESS_MASK,
        };
        log::debug!(
            "color image at {:#08x}: format {} size {} width {}",
            self.fb.address,
            self.fb.format,
            self.fb.size,
            self.fb.width
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::RdpConfig;
    use crate::core::rdp::primitives::{Color, PIXEL_SIZE_16BIT, FORMAT_RGBA};
    use crate::core::rdp::registers::CycleType;
    use crate::core::rdp::Rdp;

    fn rdp() -> Rdp {
        Rdp::new(&RdpConfig::default())
    }

    #[test]
    fn test_set_convert_scales_constants() {
        let mut rdp = rdp();
        // K0 = 0x1ff (-1), K1 = 1, K2 = 0x100 (-256), K3 = 2, K4 = 3, K5 = 4
        let k2 = 0x100u32;
        let w0 = 0x2c00_0000 | (0x1ff << 13) | (1 << 4) | (k2 >> 5);
        let w1 = ((k2 & 0x1f) << 27) | (2 << 18) | (3 << 9) | 4;
        rdp.set_convert(&[w0, w1]);

        assert_eq!(rdp.k0_tf, -1);
        assert_eq!(rdp.k1_tf, 3);
        assert_eq!(rdp.k2_tf, -511);
        assert_eq!(rdp.k3_tf, 5);
        assert_eq!(rdp.k4, 3);
        assert_eq!(rdp.k5, 4);
    }

    #[test]
    fn test_set_prim_depth_masks_fields() {
        let mut rdp = rdp();
        rdp.set_prim_depth(&[0x2e00_0000, 0xffff_1234]);
        assert_eq!(rdp.primitive_z, 0x7fff_0000);
        assert_eq!(rdp.primitive_delta_z, 0x1234);
    }

    #[test]
    fn test_set_prim_color_loads_lod_fields() {
        let mut rdp = rdp();
        rdp.set_prim_color(&[0x3a00_0580, 0x1122_3344]);
        assert_eq!(rdp.min_level, 5);
        assert_eq!(rdp.primitive_lod_frac, 0x80);
        assert_eq!(rdp.prim, Color::new(0x11, 0x22, 0x33, 0x44));
    }

    #[test]
    fn test_set_keys() {
        let mut rdp = rdp();
        rdp.set_key_gb(&[0x2a12_3456, 0x1020_3040]);
        rdp.set_key_r(&[0x2b00_0000, 0x0abc_5060]);

        assert_eq!(rdp.key_width, Color::new(0xabc, 0x123, 0x456, 0));
        assert_eq!(rdp.key_center, Color::new(0x50, 0x10, 0x30, 0));
        assert_eq!(rdp.key_scale, Color::new(0x60, 0x20, 0x40, 0));
    }

    #[test]
    fn test_set_scissor_fields() {
        let mut rdp = rdp();
        rdp.set_scissor(&[0x2d00_4008, 0x0350_03c0]);
        assert_eq!(rdp.clip.xh, 4);
        assert_eq!(rdp.clip.yh, 8);
        assert_eq!(rdp.clip.xl, 0x500);
        assert_eq!(rdp.clip.yl, 0x3c0);
        assert!(rdp.clip.field);
        assert!(rdp.clip.keep_odd);
    }

    #[test]
    fn test_set_color_image() {
        let mut rdp = rdp();
        rdp.set_color_image(&[0x3f10_013f, 0x8010_0000]);
        assert_eq!(rdp.fb.format, FORMAT_RGBA);
        assert_eq!(rdp.fb.size, PIXEL_SIZE_16BIT);
        assert_eq!(rdp.fb.width, 320);
        assert_eq!(rdp.fb.address, 0x10_0000);
    }

    #[test]
    fn test_set_other_modes_rederives() {
        let mut rdp = rdp();
        rdp.set_other_modes(&[0x2f30_0000, 0]);
        assert_eq!(rdp.other_modes().cycle_type, CycleType::Fill);

        rdp.set_other_modes(&[0x2f10_0000, 0]);
        assert_eq!(rdp.other_modes().cycle_type, CycleType::TwoCycle);
    }

    #[test]
    fn test_set_combine_switches_renderer() {
        use crate::core::rdp::registers::OneCycleRenderer;

        let mut rdp = rdp();
        rdp.set_other_modes(&[0x2f00_0000, 0]);

        // D = shade in both cycles, everything else zero
        rdp.set_combine(&[0x3cff_ffff, 0xfffe_793c]);
        assert_eq!(rdp.mode_derivs().one_cycle, OneCycleRenderer::Blend);

        // D = texel0
        rdp.set_combine(&[0x3cff_ffff, 0xfffc_f279]);
        assert_eq!(rdp.mode_derivs().one_cycle, OneCycleRenderer::NoTexel1);
    }
}

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
//! Framebuffer access
//!
//! Reads and writes of the color image for each pixel size. 16-bit RGBA
//! pixels keep their coverage in the low color bit plus the two hidden
//! bits; 32-bit pixels keep it in bits 7..5 of the alpha byte.
//!
//! # References
//!
//! - [N64brew: RDP framebuffer](https://n64brew.dev/wiki/Reality_Display_Processor/Pipeline)

use super::primitives::{
    Color, FORMAT_RGBA, PIXEL_SIZE_16BIT, PIXEL_SIZE_32BIT, PIXEL_SIZE_4BIT, PIXEL_SIZE_8BIT,
};
use super::registers::CvgDest;
use super::Rdp;

#[inline(always)]
fn rgba16_hi(w: u32) -> i32 {
    ((w >> 8) & 0xf8) as i32
}

#[inline(always)]
fn rgba16_med(w: u32) -> i32 {
    ((w & 0x7c0) >> 3) as i32
}

#[inline(always)]
fn rgba16_low(w: u32) -> i32 {
    ((w & 0x3e) << 2) as i32
}

impl Rdp {
    /// Memory color and coverage of the framebuffer pixel `curpixel`
    fn read_framebuffer(&self, curpixel: u32) -> (Color, u32) {
        let image_read_en = self.other_modes.image_read_en;
        match self.fb.size {
            PIXEL_SIZE_4BIT => (Color::new(0, 0, 0, 0xe0), 7),
            PIXEL_SIZE_8BIT => {
                let mem = self.rdram.read_u8(self.fb.address.wrapping_add(curpixel)) as i32;
                (Color::new(mem, mem, mem, 0xe0), 7)
            }
            PIXEL_SIZE_16BIT => {
                let addr = (self.fb.address >> 1).wrapping_add(curpixel);
                let (fword, hbyte) = if image_read_en {
                    self.rdram.pair_read16(addr)
                } else {
                    (self.rdram.read_u16(addr), 0)
                };
                let fword = fword as u32;
                let mut color = if self.fb.format == FORMAT_RGBA {
                    Color::new(rgba16_hi(fword), rgba16_med(fword), rgba16_low(fword), 0)
                } else {
                    Color::splat((fword >> 8) as i32)
                };
                if !image_read_en {
                    color.a = 0xe0;
                    return (color, 7);
                }
                let lowbits = if self.fb.format == FORMAT_RGBA {
                    ((fword & 1) << 2) | hbyte as u32
                } else {
                    (fword >> 5) & 7
                };
                color.a = (lowbits << 5) as i32;
                (color, lowbits)
            }
            _ => {
                let mem = self.rdram.read_u32((self.fb.address >> 2).wrapping_add(curpixel));
                let mut color = Color::new(
                    ((mem >> 24) & 0xff) as i32,
                    ((mem >> 16) & 0xff) as i32,
                    ((mem >> 8) & 0xff) as i32,
                    0xe0,
                );
                if image_read_en {
                    color.a = (mem & 0xe0) as i32;
                    (color, (mem >> 5) & 7)
                } else {
                    (color, 7)
                }
            }
        }
    }

    /// Read pixel `curpixel` into the memory color (one-cycle)
    ///
    /// # Returns
    ///
    /// Coverage stored with the pixel
    pub(crate) fn fbread(&mut self, curpixel: u32) -> u32 {
        let (color, memcvg) = self.read_framebuffer(curpixel);
        self.memory = color;
        memcvg
    }

    /// Read pixel `curpixel` into the pre-memory color (two-cycle)
    pub(crate) fn fbread2(&mut self, curpixel: u32) -> u32 {
        let (color, memcvg) = self.read_framebuffer(curpixel);
        self.pre_memory = color;
        memcvg
    }

    /// Coverage written back with a pixel, per the coverage destination
    pub(crate) fn finalize_spanalpha(&self, blend_en: bool, cvg: u32, memcvg: u32) -> u32 {
        let cvg = cvg as i32;
        let memcvg = memcvg as i32;
        let finalcvg = match self.other_modes.cvg_dest {
            CvgDest::Clamp => {
                let sum = if blend_en { cvg + memcvg } else { cvg - 1 };
                if sum & 8 == 0 {
                    sum & 7
                } else {
                    7
                }
            }
            CvgDest::Wrap => (cvg + memcvg) & 7,
            CvgDest::Zap => 7,
            CvgDest::Save => memcvg,
        };
        finalcvg as u32
    }

    /// Write a blended pixel
    ///
    /// # Arguments
    ///
    /// * `curpixel` - Pixel index within the color image
    /// * `r`, `g`, `b` - 8-bit color
    /// * `blend_en` - The pixel was blended with memory
    /// * `cvg` - Pixel coverage
    /// * `memcvg` - Coverage read back from memory
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn fbwrite(
        &mut self,
        curpixel: u32,
        r: u32,
        g: u32,
        b: u32,
        blend_en: bool,
        cvg: u32,
        memcvg: u32,
    ) {
        match self.fb.size {
            PIXEL_SIZE_4BIT => {
                let fb = self.fb.address.wrapping_add(curpixel);
                self.rdram.write_u8(fb, 0);
            }
            PIXEL_SIZE_8BIT => {
                let fb = self.fb.address.wrapping_add(curpixel);
                let value = (r & 0xff) as u8;
                self.rdram.pair_write8(fb, value, if r & 1 != 0 { 3 } else { 0 });
            }
            PIXEL_SIZE_16BIT => {
                let fb = (self.fb.address >> 1).wrapping_add(curpixel);
                let mut finalcvg = self.finalize_spanalpha(blend_en, cvg, memcvg);
                let finalcolor = if self.fb.format == FORMAT_RGBA {
                    ((r & !7) << 8) | ((g & !7) << 3) | ((b & !7) >> 2)
                } else {
                    let color = (r << 8) | (finalcvg << 5);
                    finalcvg = 0;
                    color
                };
                let rval = (finalcolor | (finalcvg >> 2)) as u16;
                self.rdram.pair_write16(fb, rval, (finalcvg & 3) as u8);
            }
            _ => {
                let fb = (self.fb.address >> 2).wrapping_add(curpixel);
                let finalcvg = self.finalize_spanalpha(blend_en, cvg, memcvg);
                let finalcolor = (r << 24) | (g << 16) | (b << 8) | (finalcvg << 5);
                self.rdram
                    .pair_write32(fb, finalcolor, if g & 1 != 0 { 3 } else { 0 }, 0);
            }
        }
    }

    /// Write the fill color at pixel `curpixel`
    ///
    /// 4-bit color images crash the pipeline.
    pub(crate) fn fbfill(&mut self, curpixel: u32) {
        let fill = self.fill_color;
        match self.fb.size {
            PIXEL_SIZE_4BIT => {
                self.pipeline_crashed = true;
            }
            PIXEL_SIZE_8BIT => {
                let fb = self.fb.address.wrapping_add(curpixel);
                let value = (fill >> (((fb & 3) ^ 3) << 3)) & 0xff;
                let hval = (((value & 1) << 1) | (value & 1)) as u8;
                self.rdram.pair_write8(fb, value as u8, hval);
            }
            PIXEL_SIZE_16BIT => {
                let fb = (self.fb.address >> 1).wrapping_add(curpixel);
                let value = if fb & 1 != 0 { fill & 0xffff } else { fill >> 16 };
                let hval = (((value & 1) << 1) | (value & 1)) as u8;
                self.rdram.pair_write16(fb, value as u16, hval);
            }
            PIXEL_SIZE_32BIT => {
                let fb = (self.fb.address >> 2).wrapping_add(curpixel);
                self.rdram.pair_write32(
                    fb,
                    fill,
                    if fill & 0x10000 != 0 { 3 } else { 0 },
                    if fill & 1 != 0 { 3 } else { 0 },
                );
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use crate::core::rdp::primitives::FORMAT_I;
    use crate::core::rdp::registers::OtherModes;

    fn rdp_with_fb(format: u32, size: u32) -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.fb.format = format;
        rdp.fb.size = size;
        rdp.fb.width = 32;
        rdp.fb.address = 0x1000;
        rdp
    }

    #[test]
    fn test_fill_16bit_alternates_halves() {
        let mut rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_16BIT);
        rdp.fill_color = 0xf801_07c1;
        rdp.fbfill(0);
        rdp.fbfill(1);
        assert_eq!(rdp.rdram.pair_read16(0x800), (0xf801, 3));
        assert_eq!(rdp.rdram.pair_read16(0x801), (0x07c1, 3));
    }

    #[test]
    fn test_fill_32bit() {
        let mut rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_32BIT);
        rdp.fill_color = 0x1234_5601;
        rdp.fbfill(2);
        assert_eq!(rdp.rdram.read_u32(0x402), 0x1234_5601);
        assert_eq!(rdp.rdram.read_hidden(0x805), 3);
    }

    #[test]
    fn test_fill_8bit_picks_byte_lane() {
        let mut rdp = rdp_with_fb(FORMAT_I, PIXEL_SIZE_8BIT);
        rdp.fill_color = 0x1122_3344;
        for px in 0..4 {
            rdp.fbfill(px);
        }
        assert_eq!(rdp.rdram.read_u32(0x400), 0x1122_3344);
    }

    #[test]
    fn test_fill_4bit_crashes() {
        let mut rdp = rdp_with_fb(FORMAT_I, PIXEL_SIZE_4BIT);
        rdp.fbfill(0);
        assert!(rdp.pipeline_crashed);
    }

    #[test]
    fn test_write_16bit_rgba_packs_coverage() {
        let mut rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_16BIT);
        rdp.other_modes.cvg_dest = CvgDest::Zap;
        rdp.fbwrite(0, 0xff, 0x00, 0x80, false, 8, 0);
        // R=31, G=0, B=16, coverage 7 -> low bit 1, hidden 3
        assert_eq!(rdp.rdram.pair_read16(0x800), (0xf821, 3));
    }

    #[test]
    fn test_write_then_read_16bit() {
        let mut rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_16BIT);
        rdp.other_modes = OtherModes::from_words(0, 0x0000_0340);
        assert!(rdp.other_modes.image_read_en);
        assert_eq!(rdp.other_modes.cvg_dest, CvgDest::Save);

        rdp.rdram.pair_write16(0x800 + 5, 0x07c1, 2);
        let memcvg = rdp.fbread(5);
        assert_eq!(memcvg, 6);
        assert_eq!(rdp.memory, Color::new(0, 0xf8, 0, 6 << 5));
    }

    #[test]
    fn test_read_without_image_read_reports_full_coverage() {
        let mut rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_32BIT);
        rdp.rdram.write_u32(0x400, 0xaabb_cc00);
        assert_eq!(rdp.fbread2(0), 7);
        assert_eq!(rdp.pre_memory, Color::new(0xaa, 0xbb, 0xcc, 0xe0));
    }

    #[test]
    fn test_write_32bit() {
        let mut rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_32BIT);
        rdp.other_modes.cvg_dest = CvgDest::Wrap;
        rdp.fbwrite(1, 0x10, 0x21, 0x30, true, 3, 2);
        assert_eq!(rdp.rdram.read_u32(0x401), 0x1021_30a0);
        assert_eq!(rdp.rdram.read_hidden(0x802), 3);
    }

    #[test]
    fn test_clamp_coverage() {
        let rdp = rdp_with_fb(FORMAT_RGBA, PIXEL_SIZE_16BIT);
        assert_eq!(rdp.finalize_spanalpha(false, 8, 0), 7);
        assert_eq!(rdp.finalize_spanalpha(false, 3, 0), 2);
        assert_eq!(rdp.finalize_spanalpha(true, 5, 6), 7);
        assert_eq!(rdp.finalize_spanalpha(true, 2, 3), 5);
    }
}

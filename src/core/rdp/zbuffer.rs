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
//! Depth buffer
//!
//! Depth is stored as a 14-bit float (3-bit exponent, 11-bit mantissa) in
//! the top of each 16-bit z-buffer halfword, with a 4-bit encoded depth
//! slope split between the two low bits and the two hidden bits. The
//! compare also produces the blender shifters used when the blender weights
//! by memory alpha.
//!
//! # References
//!
//! - [N64brew: RDP depth buffer](https://n64brew.dev/wiki/Reality_Display_Processor/Pipeline)

use super::registers::ZMode;
use super::Rdp;

/// Largest 18-bit depth
const Z_MAX: u32 = 0x3ffff;

/// Round a depth slope sum up to a power of two
///
/// Slopes with either of the top two bits set saturate at 0x8000; a zero
/// slope becomes 1.
pub(crate) fn normalize_dzpix(sum: i32) -> i32 {
    if sum & 0xc000 != 0 {
        return 0x8000;
    }
    if sum & 0xffff == 0 {
        return 1;
    }
    if sum == 1 {
        return 3;
    }
    let mut count = 0x2000;
    while count > 0 {
        if sum & count != 0 {
            return count << 1;
        }
        count >>= 1;
    }
    0
}

/// Encode a power-of-two slope as its 4-bit exponent
pub(crate) fn dz_compress(value: u32) -> u32 {
    let mut j = 0;
    if value & 0xff00 != 0 {
        j |= 8;
    }
    if value & 0xf0f0 != 0 {
        j |= 4;
    }
    if value & 0xcccc != 0 {
        j |= 2;
    }
    if value & 0xaaaa != 0 {
        j |= 1;
    }
    j
}

/// Decode a 4-bit slope exponent
#[inline(always)]
pub(crate) fn dz_decompress(compressed: u32) -> u32 {
    1 << (compressed & 0xf)
}

/// Shifter pair for memory-alpha blending from the slope exponents
#[inline(always)]
fn blender_shifts(dzpixenc: u32, rawdzmem: u32) -> (i32, i32) {
    let a = (dzpixenc as i32 - rawdzmem as i32).clamp(0, 4);
    let b = (rawdzmem as i32 - dzpixenc as i32).clamp(0, 4);
    (a, b)
}

/// Outcome of a depth compare
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ZResult {
    /// The pixel proceeds to the blender
    pub pass: bool,
    /// The blender may mix with memory (antialiased edge)
    pub blend_en: bool,
    /// Pixel and memory coverage overflow 8
    pub prewrap: bool,
}

impl Rdp {
    /// Compare the pixel depth against the z buffer
    ///
    /// # Arguments
    ///
    /// * `zcur` - Halfword index of the z-buffer entry
    /// * `sz` - Pixel depth (18 bits)
    /// * `dzpix` - Pixel depth slope
    /// * `dzpixenc` - `dz_compress(dzpix)`
    /// * `cvg` - Pixel coverage, rescaled by interpenetration
    /// * `memcvg` - Coverage read back from the framebuffer
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn z_compare(
        &mut self,
        zcur: u32,
        sz: u32,
        dzpix: u32,
        dzpixenc: u32,
        cvg: &mut u32,
        memcvg: u32,
    ) -> ZResult {
        let overflow = (memcvg + *cvg) & 8 != 0;
        let force_blend = self.other_modes.force_blend;

        if !self.other_modes.z_compare_en {
            if self.derivs.realblendershiftersneeded {
                self.blshifta = 0;
                self.blshiftb = if dzpixenc < 0xb { 4 } else { 0xf - dzpixenc as i32 };
            }
            if self.derivs.interpixelblendershiftersneeded {
                self.pastblshifta = 0;
                self.pastblshiftb = if dzpixenc < 0xb { 4 } else { 0xf - dzpixenc as i32 };
            }
            return ZResult {
                pass: true,
                blend_en: force_blend || (!overflow && self.other_modes.antialias_en),
                prewrap: overflow,
            };
        }

        let sz = sz & Z_MAX;
        let (zval, hval) = self.rdram.pair_read16(zcur);
        let zval = zval as u32;
        let oz = self.tables.z_complete_dec_table[((zval >> 2) & 0x3fff) as usize];
        let rawdzmem = ((zval & 3) << 2) | hval as u32;
        let mut dzmem = dz_decompress(rawdzmem);

        if self.derivs.realblendershiftersneeded {
            (self.blshifta, self.blshiftb) = blender_shifts(dzpixenc, rawdzmem);
        }
        if self.derivs.interpixelblendershiftersneeded {
            (self.pastblshifta, self.pastblshiftb) = blender_shifts(dzpixenc, self.pastrawdzmem);
        }
        self.pastrawdzmem = rawdzmem;

        // Low-precision memory depths get a wider slope
        let precision_factor = (zval >> 13) & 0xf;
        let mut force_coplanar = false;
        if precision_factor < 3 {
            if dzmem != 0x8000 {
                let dzmemmodifier = 16 >> precision_factor;
                dzmem = (dzmem << 1).max(dzmemmodifier);
            } else {
                force_coplanar = true;
                dzmem <<= 1;
            }
        }
        if dzmem > 0x8000 {
            dzmem = 0xffff;
        }

        let dznotshift = dzmem.max(dzpix);
        let dznew = dznotshift << 3;

        let farther = force_coplanar || sz + dznew >= oz;
        let blend_en = force_blend || (!overflow && self.other_modes.antialias_en && farther);

        let infront = sz < oz;
        let nearer = force_coplanar || sz as i32 - dznew as i32 <= oz as i32;
        let max = oz == Z_MAX;

        let pass = match self.other_modes.z_mode {
            ZMode::Opaque => max || if overflow { infront } else { nearer },
            ZMode::Interpenetrating => {
                if !infront || !farther || !overflow {
                    max || if overflow { infront } else { nearer }
                } else {
                    let dzenc = dz_compress(dznotshift & 0xffff);
                    let cvgcoeff = ((oz >> dzenc).wrapping_sub(sz >> dzenc)) & 0xf;
                    *cvg = ((cvgcoeff * *cvg) >> 3) & 0xf;
                    true
                }
            }
            ZMode::Transparent => infront || max,
            ZMode::Decal => farther && nearer && !max,
        };

        ZResult {
            pass,
            blend_en,
            prewrap: overflow,
        }
    }

    /// Write the pixel depth and slope to the z buffer
    pub(crate) fn z_store(&mut self, zcur: u32, z: u32, dzpixenc: u32) {
        let zval = self.tables.z_com_table[(z & Z_MAX) as usize] | (dzpixenc >> 2) as u16;
        let hval = (dzpixenc & 3) as u8;
        self.rdram.pair_write16(zcur, zval, hval);
    }

    /// Centroid-correct shade and depth for partially covered pixels
    ///
    /// Loads the shade register and returns the clamped 18-bit depth.
    ///
    /// # Arguments
    ///
    /// * `offx`, `offy` - Centroid offset of the covered subpixels
    /// * `r`, `g`, `b`, `a` - Shade in 9.2 fixed point
    /// * `z` - Depth in 19.3 fixed point
    /// * `cvg` - Number of covered subpixels
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn rgbaz_correct_clip(
        &mut self,
        offx: i32,
        offy: i32,
        r: i32,
        g: i32,
        b: i32,
        a: i32,
        z: i32,
        cvg: u32,
    ) -> u32 {
        let d = &self.deltas;
        let (r, g, b, a, sz) = if cvg == 8 {
            (r >> 2, g >> 2, b >> 2, a >> 2, z >> 3)
        } else {
            let summand_r = offx * d.cdr + offy * d.drdy;
            let summand_g = offx * d.cdg + offy * d.dgdy;
            let summand_b = offx * d.cdb + offy * d.dbdy;
            let summand_a = offx * d.cda + offy * d.dady;
            let summand_z = offx * d.cdz + offy * d.dzdy;
            (
                ((r << 2) + summand_r) >> 4,
                ((g << 2) + summand_g) >> 4,
                ((b << 2) + summand_b) >> 4,
                ((a << 2) + summand_a) >> 4,
                ((z << 2) + summand_z) >> 5,
            )
        };

        let clamp = &self.tables.special_9bit_clamptable;
        self.shade.r = clamp[(r & 0x1ff) as usize];
        self.shade.g = clamp[(g & 0x1ff) as usize];
        self.shade.b = clamp[(b & 0x1ff) as usize];
        self.shade.a = clamp[(a & 0x1ff) as usize];

        match (sz & 0x60000) >> 17 {
            0 | 1 => (sz & 0x3ffff) as u32,
            2 => Z_MAX,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;
    use crate::core::rdp::registers::OtherModes;

    fn rdp_with_z(z_mode: ZMode) -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.other_modes.z_compare_en = true;
        rdp.other_modes.z_mode = z_mode;
        rdp.deduce_derivatives();
        rdp
    }

    #[test]
    fn test_normalize_dzpix() {
        assert_eq!(normalize_dzpix(0), 1);
        assert_eq!(normalize_dzpix(1), 3);
        assert_eq!(normalize_dzpix(2), 4);
        assert_eq!(normalize_dzpix(0x0500), 0x0800);
        assert_eq!(normalize_dzpix(0x4000), 0x8000);
    }

    #[test]
    fn test_dz_compress_is_log2() {
        for k in 0..16 {
            assert_eq!(dz_compress(1 << k), k);
            assert_eq!(dz_decompress(k), 1 << k);
        }
    }

    #[test]
    fn test_store_then_compare_nearer() {
        let mut rdp = rdp_with_z(ZMode::Opaque);
        rdp.z_store(0x100, 0x20000, 0);

        let mut cvg = 8;
        let nearer = rdp.z_compare(0x100, 0x1f000, 1, 0, &mut cvg, 0);
        assert!(nearer.pass);

        let farther = rdp.z_compare(0x100, 0x30000, 1, 0, &mut cvg, 0);
        assert!(!farther.pass);
    }

    #[test]
    fn test_cleared_buffer_always_passes() {
        let mut rdp = rdp_with_z(ZMode::Opaque);
        // 0xfffc decodes to the far plane
        rdp.rdram.pair_write16(0x40, 0xfffc, 3);
        let mut cvg = 8;
        assert!(rdp.z_compare(0x40, 0x3fff0, 1, 0, &mut cvg, 0).pass);
    }

    #[test]
    fn test_decal_requires_coplanar() {
        let mut rdp = rdp_with_z(ZMode::Decal);
        rdp.z_store(0x10, 0x10000, 0);
        let mut cvg = 8;
        assert!(rdp.z_compare(0x10, 0x10000, 1, 0, &mut cvg, 0).pass);
        assert!(!rdp.z_compare(0x10, 0x08000, 1, 0, &mut cvg, 0).pass);
    }

    #[test]
    fn test_compare_disabled_passes_and_blends_with_aa() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.other_modes = OtherModes::from_words(0, 0x0000_0008);
        rdp.deduce_derivatives();
        let mut cvg = 4;
        let res = rdp.z_compare(0, 0, 1, 0, &mut cvg, 3);
        assert!(res.pass);
        assert!(res.blend_en);
        assert!(!res.prewrap);

        let res = rdp.z_compare(0, 0, 1, 0, &mut cvg, 7);
        assert!(res.prewrap);
        assert!(!res.blend_en);
    }

    #[test]
    fn test_z_store_layout() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.z_store(3, 0x3ffff, 0xb);
        let (zval, hval) = rdp.rdram.pair_read16(3);
        assert_eq!(zval & 3, 0xb >> 2);
        assert_eq!(hval, 0xb & 3);
        assert_eq!(rdp.tables.z_complete_dec_table[(zval >> 2) as usize & 0x3fff], 0x3ffff);
    }

    #[test]
    fn test_full_coverage_skips_centroid_correction() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.deltas.cdr = 0x100;
        let z = rdp.rgbaz_correct_clip(3, 3, 0x80 << 2, 0, 0, 0xff << 2, 0x1000 << 3, 8);
        assert_eq!(rdp.shade.r, 0x80);
        assert_eq!(rdp.shade.a, 0xff);
        assert_eq!(z, 0x1000);
    }

    #[test]
    fn test_depth_clamps() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        // Bit 18 set: overflow clamps to the far plane
        assert_eq!(rdp.rgbaz_correct_clip(0, 0, 0, 0, 0, 0, 0x40000 << 3, 8), 0x3ffff);
        // Negative depth clamps to zero
        assert_eq!(rdp.rgbaz_correct_clip(0, 0, 0, 0, 0, 0, -8, 8), 0);
    }
}

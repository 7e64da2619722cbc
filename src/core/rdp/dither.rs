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

//! Dithering and noise
//!
//! Each pixel gets a color dither value (`cdith`) and an alpha dither
//! value (`adith`). The color dither picks between rounding each 8-bit
//! channel down to 5 bits or up to the next 5-bit step; the alpha dither
//! is added to alpha in the combiner.
//!
//! | `rgb_dither_sel` | color source      | | `alpha_dither_sel` | alpha source |
//! |------------------|-------------------|-|--------------------|--------------|
//! | 0                | magic square      | | 0                  | same pattern |
//! | 1                | Bayer matrix      | | 1                  | inverted     |
//! | 2                | noise             | | 2                  | noise        |
//! | 3                | none              | | 3                  | none         |

use super::registers::DitherNoise;
use super::tables::{BAYER_MATRIX, MAGIC_MATRIX};
use super::Rdp;

/// Round one channel up when its low bits exceed the dither threshold
#[inline(always)]
fn dither_channel(c: i32, comp: i32) -> i32 {
    let rounded = if c > 247 { 255 } else { (c & 0xf8) + 8 };
    let replacesign = (comp - (c & 7)) >> 31;
    c + ((rounded - c) & replacesign)
}

impl Rdp {
    /// Compute the dither values for pixel `(x, y)`
    ///
    /// Also draws a fresh combiner noise value when the mode reads it.
    ///
    /// # Returns
    ///
    /// `Some((cdith, adith))`, or `None` when dithering is off and the
    /// caller keeps its defaults
    pub(crate) fn get_dither_noise(&mut self, x: i32, y: i32) -> Option<(i32, i32)> {
        match self.derivs.dither_noise {
            DitherNoise::Nothing => return None,
            DitherNoise::Complete => {
                self.noise = ((self.noise_source.next_value() & 7) << 6) | 0x20;
            }
            DitherNoise::DitherOnly => {}
        }

        let dithindex = (((y & 3) << 2) | (x & 3)) as usize;
        let magic = MAGIC_MATRIX[dithindex] as i32;
        let bayer = BAYER_MATRIX[dithindex] as i32;
        let noise_alpha = (self.noise >> 6) & 7;

        let cdith = match self.other_modes.rgb_dither_sel {
            0 => magic,
            1 => bayer,
            2 => self.noise_source.next_value(),
            _ => 7,
        };

        // The alpha pattern follows the color matrix, except that noise
        // color pairs with the magic square and no color dither with Bayer
        let pattern = match self.other_modes.rgb_dither_sel {
            0 | 2 => magic,
            _ => bayer,
        };
        let adith = match self.other_modes.alpha_dither_sel {
            0 => pattern,
            1 => !pattern & 7,
            2 => noise_alpha,
            _ => 0,
        };

        Some((cdith, adith))
    }

    /// Dither an 8-bit color toward the 5-bit framebuffer grid
    ///
    /// With noise dither each channel takes its own 3 bits of `dith`.
    pub(crate) fn rgb_dither(&self, r: &mut i32, g: &mut i32, b: &mut i32, dith: i32) {
        if !self.derivs.rgb_dither {
            return;
        }

        let (rcomp, gcomp, bcomp) = if self.other_modes.rgb_dither_sel != 2 {
            (dith, dith, dith)
        } else {
            (dith & 7, (dith >> 3) & 7, (dith >> 6) & 7)
        };

        *r = dither_channel(*r, rcomp);
        *g = dither_channel(*g, gcomp);
        *b = dither_channel(*b, bcomp);
    }
}

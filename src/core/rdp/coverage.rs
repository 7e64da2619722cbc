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

//! Coverage
//!
//! Builds the 8-bit coverage mask of every pixel on a scanline from the
//! edge walker's four subscanlines. Each subscanline contributes two
//! sample points per pixel, offset by one subpixel between even and odd
//! subscanlines:
//!
//! ```text
//!   subscanline 0: . X . X      bits 7, 5
//!   subscanline 1: X . X .      bits 6, 4
//!   subscanline 2: . X . X      bits 3, 1
//!   subscanline 3: X . X .      bits 2, 0
//! ```

use super::primitives::SPAN_COUNT;
use super::Rdp;

/// Samples of a right edge at subpixel `x` covered by the primitive
#[inline(always)]
fn rightcvghex(x: i32, fmask: u8) -> u8 {
    let covered = ((x & 7) + 1) >> 1;
    (0xf0u32 >> covered) as u8 & fmask
}

/// Samples of a left edge at subpixel `x` covered by the primitive
#[inline(always)]
fn leftcvghex(x: i32, fmask: u8) -> u8 {
    let covered = ((x & 7) + 1) >> 1;
    (0xfu32 >> covered) as u8 & fmask
}

#[inline(always)]
fn pixel_index(x: i32) -> usize {
    x.clamp(0, SPAN_COUNT as i32 - 1) as usize
}

impl Rdp {
    /// Coverage of `scanline` for a primitive whose major edge is on the
    /// right
    pub(crate) fn compute_cvg_flip(&mut self, scanline: usize) {
        self.compute_cvg(scanline, true);
    }

    /// Coverage of `scanline` for a primitive whose major edge is on the
    /// left
    pub(crate) fn compute_cvg_noflip(&mut self, scanline: usize) {
        self.compute_cvg(scanline, false);
    }

    fn compute_cvg(&mut self, scanline: usize, flip: bool) {
        let span = self.spans[scanline];
        let (purgestart, purgeend) = if flip {
            (span.rx, span.lx)
        } else {
            (span.lx, span.rx)
        };
        if purgeend < purgestart {
            return;
        }
        let purgestart = pixel_index(purgestart);
        let purgeend = pixel_index(purgeend);
        let cvgbuf = &mut self.cvgbuf;

        cvgbuf[purgestart..=purgeend].fill(0xff);

        for i in 0..4 {
            let fmask: u8 = 0xa >> (i & 1);
            let maskshift = ((i as i32 - 2) & 4) as u32;
            let clear = !(fmask << maskshift);

            if span.invalyscan[i] {
                cvgbuf[purgestart..=purgeend].iter_mut().for_each(|c| *c &= clear);
                continue;
            }

            let minorcur = span.minorx[i];
            let majorcur = span.majorx[i];
            let minorint = minorcur >> 3;
            let majorint = majorcur >> 3;

            // Outside the edges: no samples on this subscanline
            let (inner_left, inner_right, left_edge, right_edge) = if flip {
                (majorint, minorint, majorcur, minorcur)
            } else {
                (minorint, majorint, minorcur, majorcur)
            };
            for k in purgestart as i32..=inner_left.min(purgeend as i32) {
                cvgbuf[pixel_index(k)] &= clear;
            }
            for k in inner_right.max(purgestart as i32)..=purgeend as i32 {
                cvgbuf[pixel_index(k)] &= clear;
            }

            if inner_right > inner_left {
                cvgbuf[pixel_index(inner_right)] |= rightcvghex(right_edge, fmask) << maskshift;
                cvgbuf[pixel_index(inner_left)] |= leftcvghex(left_edge, fmask) << maskshift;
            } else if inner_right == inner_left {
                let samecvg = rightcvghex(right_edge, fmask) & leftcvghex(left_edge, fmask);
                cvgbuf[pixel_index(inner_left)] |= samecvg << maskshift;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;

    fn full_span(lx: i32, rx: i32, left: i32, right: i32) -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let span = &mut rdp.spans[0];
        span.lx = lx;
        span.rx = rx;
        span.validline = true;
        span.minorx = [left; 4];
        span.majorx = [right; 4];
        rdp
    }

    #[test]
    fn test_interior_pixels_fully_covered() {
        // Edges on pixel boundaries at x = 2 and x = 6
        let mut rdp = full_span(2, 6, 2 << 3, 6 << 3);
        rdp.compute_cvg_noflip(0);
        for x in 3..6 {
            assert_eq!(rdp.cvgbuf[x], 0xff, "pixel {x}");
        }
        assert_eq!(rdp.cvgbuf[6], 0);
    }

    #[test]
    fn test_half_pixel_edge() {
        // Left edge in the middle of pixel 2
        let mut rdp = full_span(2, 6, (2 << 3) | 4, 6 << 3);
        rdp.compute_cvg_noflip(0);
        // Right-hand sample of each subscanline pair only
        assert_eq!(rdp.cvgbuf[2].count_ones(), 4);
    }

    #[test]
    fn test_invalid_subscanlines_clear_bits() {
        let mut rdp = full_span(2, 6, 2 << 3, 6 << 3);
        rdp.spans[0].invalyscan = [true, true, false, false];
        rdp.compute_cvg_noflip(0);
        assert_eq!(rdp.cvgbuf[4], 0x0f);
    }

    #[test]
    fn test_flip_mirrors_noflip() {
        let mut rdp = full_span(6, 2, 6 << 3, 2 << 3);
        rdp.compute_cvg_flip(0);
        for x in 3..6 {
            assert_eq!(rdp.cvgbuf[x], 0xff);
        }
    }

    #[test]
    fn test_edge_hex() {
        assert_eq!(rightcvghex(0, 0xa), 0);
        assert_eq!(rightcvghex(7, 0xa), 0xa);
        assert_eq!(leftcvghex(0, 0xa), 0xa);
        assert_eq!(leftcvghex(7, 0x5), 0);
    }
}

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

//! Primitive commands
//!
//! Triangles and fill rectangles. Both are converted to the 44-word
//! edge-walker layout; attribute groups a command does not carry are left
//! zero.
//!
//! # Commands
//!
//! - 0x08-0x0F: Triangle (bit 2 shade, bit 1 texture, bit 0 z-buffer)
//! - 0x36: Fill Rectangle
//!
//! # References
//!
//! - [N64brew: RDP Triangle Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands#0x08_-_Non-Shaded_Triangle)

use crate::core::rdp::registers::CycleType;
use crate::core::rdp::Rdp;

/// Edge coefficient words of every triangle
pub const TRIANGLE_EDGE_WORDS: usize = 8;
/// Shade coefficient words (r, g, b, a with their slopes)
pub const TRIANGLE_SHADE_WORDS: usize = 16;
/// Texture coefficient words (s, t, w with their slopes)
pub const TRIANGLE_TEXTURE_WORDS: usize = 16;
/// Depth coefficient words
pub const TRIANGLE_Z_WORDS: usize = 4;

/// Attribute groups present in a triangle opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriangleKind {
    pub shade: bool,
    pub texture: bool,
    pub zbuffer: bool,
}

impl TriangleKind {
    /// Decode the low three opcode bits
    pub fn from_opcode(opcode: u32) -> Self {
        Self {
            shade: opcode & 4 != 0,
            texture: opcode & 2 != 0,
            zbuffer: opcode & 1 != 0,
        }
    }

    /// Command length in 32-bit words
    pub fn word_count(self) -> usize {
        let mut len = TRIANGLE_EDGE_WORDS;
        if self.shade {
            len += TRIANGLE_SHADE_WORDS;
        }
        if self.texture {
            len += TRIANGLE_TEXTURE_WORDS;
        }
        if self.zbuffer {
            len += TRIANGLE_Z_WORDS;
        }
        len
    }
}

impl Rdp {
    /// 0x08-0x0F - Triangle
    ///
    /// The opcode's low bits select which coefficient groups follow the
    /// edges, in the order shade, texture, depth.
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: opcode | left major (55) | level (51-53) | tile (48-50) | YL (32-45)
    /// w1: YM (16-29) | YH (0-13)
    /// w2-w7: XL, DxLDy, XH, DxHDy, XM, DxMDy (s15.16)
    /// shade:   16 words, r g b a with d/dx, d/de, d/dy
    /// texture: 16 words, s t w with d/dx, d/de, d/dy
    /// depth:   4 words, z with d/dx, d/de, d/dy
    /// ```
    ///
    /// A slice shorter than the opcode requires is ignored with a warning.
    pub fn triangle(&mut self, words: &[u32]) {
        let Some(&w0) = words.first() else {
            return;
        };
        let kind = TriangleKind::from_opcode((w0 >> 24) & 0x3f);
        let needed = kind.word_count();
        if words.len() < needed {
            log::warn!("triangle {:#04x} needs {} words, got {}", (w0 >> 24) & 0x3f, needed, words.len());
            return;
        }

        let mut ew = [0i32; 44];
        let mut src = words.iter().map(|&w| w as i32);
        let mut fill = |range: std::ops::Range<usize>| {
            for slot in &mut ew[range] {
                *slot = src.next().unwrap_or(0);
            }
        };

        fill(0..8);
        if kind.shade {
            fill(8..24);
        }
        if kind.texture {
            fill(24..40);
        }
        if kind.zbuffer {
            fill(40..44);
        }

        self.edgewalker_for_prims(&ew);
    }

    /// 0x36 - Fill Rectangle
    ///
    /// # Command Format
    ///
    /// ```text
    /// w0: 0x36 | XL (44-55) | YL (32-43)
    /// w1: XH (12-23) | YH (0-11)
    /// ```
    ///
    /// In fill and copy modes the bottom edge is inclusive.
    pub fn fill_rect(&mut self, words: &[u32; 2]) {
        let xl = ((words[0] >> 12) & 0xfff) as i32;
        let mut yl = (words[0] & 0xfff) as i32;
        let xh = ((words[1] >> 12) & 0xfff) as i32;
        let yh = (words[1] & 0xfff) as i32;

        if matches!(self.other_modes.cycle_type, CycleType::Fill | CycleType::Copy) {
            yl |= 3;
        }

        let xlint = (xl >> 2) & 0x3ff;
        let xhint = (xh >> 2) & 0x3ff;

        let mut ew = [0i32; 44];
        ew[0] = (0x3680 << 16) | yl;
        ew[1] = (yl << 16) | yh;
        ew[2] = (xlint << 16) | ((xl & 3) << 14);
        ew[4] = (xhint << 16) | ((xh & 3) << 14);
        ew[6] = (xlint << 16) | ((xl & 3) << 14);

        log::trace!("fill rect ({}, {}) - ({}, {})", xh >> 2, yh >> 2, xl >> 2, yl >> 2);
        self.edgewalker_for_prims(&ew);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_word_counts() {
        assert_eq!(TriangleKind::from_opcode(0x08).word_count(), 8);
        assert_eq!(TriangleKind::from_opcode(0x09).word_count(), 12);
        assert_eq!(TriangleKind::from_opcode(0x0a).word_count(), 24);
        assert_eq!(TriangleKind::from_opcode(0x0c).word_count(), 24);
        assert_eq!(TriangleKind::from_opcode(0x0e).word_count(), 40);
        assert_eq!(TriangleKind::from_opcode(0x0f).word_count(), 44);
    }

    #[test]
    fn test_triangle_kind_bits() {
        let kind = TriangleKind::from_opcode(0x0d);
        assert!(kind.shade);
        assert!(!kind.texture);
        assert!(kind.zbuffer);
    }
}

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

//! RDP data types
//!
//! Plain register records shared by every pipeline stage: the four-lane
//! [`Color`], the eight [`Tile`] descriptors, per-scanline [`Span`] data and
//! the image descriptors programmed by the `Set * Image` commands.

use serde::{Deserialize, Serialize};

/// Pixel size field: 4 bits per pixel
pub const PIXEL_SIZE_4BIT: u32 = 0;
/// Pixel size field: 8 bits per pixel
pub const PIXEL_SIZE_8BIT: u32 = 1;
/// Pixel size field: 16 bits per pixel
pub const PIXEL_SIZE_16BIT: u32 = 2;
/// Pixel size field: 32 bits per pixel
pub const PIXEL_SIZE_32BIT: u32 = 3;

/// Image format field: RGBA
pub const FORMAT_RGBA: u32 = 0;
/// Image format field: YUV
pub const FORMAT_YUV: u32 = 1;
/// Image format field: color index
pub const FORMAT_CI: u32 = 2;
/// Image format field: intensity + alpha
pub const FORMAT_IA: u32 = 3;
/// Image format field: intensity
pub const FORMAT_I: u32 = 4;

/// Number of scanlines the span buffer can hold
pub const SPAN_COUNT: usize = 1024;

/// Four-lane color register
///
/// Lanes are wider than 8 bits so combiner intermediates (9-bit signed
/// operands, 17-bit products) fit without a separate type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
}

impl Color {
    /// Create a color from four lanes
    pub const fn new(r: i32, g: i32, b: i32, a: i32) -> Self {
        Self { r, g, b, a }
    }

    /// Unpack an RGBA8888 command word (R in the top byte)
    pub const fn from_rgba32(word: u32) -> Self {
        Self {
            r: ((word >> 24) & 0xff) as i32,
            g: ((word >> 16) & 0xff) as i32,
            b: ((word >> 8) & 0xff) as i32,
            a: (word & 0xff) as i32,
        }
    }

    /// Same value on every lane
    pub const fn splat(v: i32) -> Self {
        Self {
            r: v,
            g: v,
            b: v,
            a: v,
        }
    }
}

/// Texel decoder selected by a tile's format and size
///
/// Formats 5-7 are not valid on hardware; the RDP decodes them as
/// intensity textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TexelType {
    #[default]
    Rgba4,
    Rgba8,
    Rgba16,
    Rgba32,
    Yuv4,
    Yuv8,
    Yuv16,
    Yuv32,
    Ci4,
    Ci8,
    Ci16,
    Ci32,
    Ia4,
    Ia8,
    Ia16,
    Ia32,
    I4,
    I8,
    I16,
    I32,
}

impl TexelType {
    /// Decoder for a tile `format` (3 bits) and `size` (2 bits)
    pub fn from_format(format: u32, size: u32) -> Self {
        use TexelType::*;
        const TABLE: [[TexelType; 4]; 5] = [
            [Rgba4, Rgba8, Rgba16, Rgba32],
            [Yuv4, Yuv8, Yuv16, Yuv32],
            [Ci4, Ci8, Ci16, Ci32],
            [Ia4, Ia8, Ia16, Ia32],
            [I4, I8, I16, I32],
        ];
        let row = if format < 5 { format as usize } else { 4 };
        TABLE[row][(size & 3) as usize]
    }
}

/// Cached values derived from a tile's raw fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDerivs {
    /// Clamp threshold in S: `(sh >> 2) - (sl >> 2)`, 10 bits
    pub clampdiffs: i32,
    /// Clamp threshold in T
    pub clampdifft: i32,
    /// S is clamped (explicit clamp, or no mask)
    pub clampens: bool,
    /// T is clamped
    pub clampent: bool,
    /// S mask width capped at 10 bits
    pub masksclamped: i32,
    /// T mask width capped at 10 bits
    pub masktclamped: i32,
    /// Decoder used when the TLUT is disabled
    pub notlutswitch: TexelType,
    /// Index-extraction case (0-15) used when the TLUT is enabled
    pub tlutswitch: u32,
}

/// Texture tile descriptor (`Set Tile` / `Set Tile Size`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Image format (3 bits)
    pub format: u32,
    /// Texel size (2 bits)
    pub size: u32,
    /// Row stride in 64-bit TMEM words
    pub line: i32,
    /// Base address in 64-bit TMEM words
    pub tmem: i32,
    /// Palette number for 4-bit color-indexed textures
    pub palette: i32,
    /// Clamp enable, T
    pub ct: bool,
    /// Mirror enable, T
    pub mt: bool,
    /// Clamp enable, S
    pub cs: bool,
    /// Mirror enable, S
    pub ms: bool,
    /// Wrap mask width, T
    pub mask_t: i32,
    /// Coordinate shift, T
    pub shift_t: i32,
    /// Wrap mask width, S
    pub mask_s: i32,
    /// Coordinate shift, S
    pub shift_s: i32,
    /// Low S bound (10.2)
    pub sl: i32,
    /// Low T bound (10.2)
    pub tl: i32,
    /// High S bound (10.2)
    pub sh: i32,
    /// High T bound (10.2)
    pub th: i32,
    /// Cached derivatives, kept in sync by the tile commands
    pub f: TileDerivs,
}

impl Tile {
    /// Recompute clamp thresholds after the bounds change
    pub fn calculate_clamp_diffs(&mut self) {
        self.f.clampdiffs = ((self.sh >> 2) - (self.sl >> 2)) & 0x3ff;
        self.f.clampdifft = ((self.th >> 2) - (self.tl >> 2)) & 0x3ff;
    }

    /// Recompute clamp/mask/decoder selection after the format changes
    pub fn calculate_tile_derivs(&mut self) {
        self.f.clampens = self.cs || self.mask_s == 0;
        self.f.clampent = self.ct || self.mask_t == 0;
        self.f.masksclamped = self.mask_s.min(10);
        self.f.masktclamped = self.mask_t.min(10);
        self.f.notlutswitch = TexelType::from_format(self.format, self.size);
        self.f.tlutswitch = if self.format < 5 {
            (self.size << 2) | ((self.format + 2) & 3)
        } else {
            (self.size << 2) | 2
        };
    }
}

/// One scanline handed from the edge walker to the span renderers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Span {
    /// Pixel the span renderer stops at
    pub lx: i32,
    /// Pixel the span renderer starts from
    pub rx: i32,
    /// Unscissored major-edge x, used to pre-step attributes
    pub unscrx: i32,
    /// Scanline has at least one valid subscanline
    pub validline: bool,
    pub r: i32,
    pub g: i32,
    pub b: i32,
    pub a: i32,
    pub s: i32,
    pub t: i32,
    pub w: i32,
    pub z: i32,
    /// Major edge x per subscanline, in 1/8 pixels
    pub majorx: [i32; 4],
    /// Minor edge x per subscanline, in 1/8 pixels
    pub minorx: [i32; 4],
    /// Subscanline is outside the primitive or the scissor
    pub invalyscan: [bool; 4],
}

/// Attribute increments shared by every span of a primitive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanDeltas {
    pub ds: i32,
    pub dt: i32,
    pub dw: i32,
    pub dr: i32,
    pub dg: i32,
    pub db: i32,
    pub da: i32,
    pub dz: i32,
    /// Normalized per-pixel depth slope
    pub dzpix: i32,

    pub drdy: i32,
    pub dgdy: i32,
    pub dbdy: i32,
    pub dady: i32,
    pub dzdy: i32,
    /// Coverage correction slopes (x direction)
    pub cdr: i32,
    pub cdg: i32,
    pub cdb: i32,
    pub cda: i32,
    pub cdz: i32,

    pub dsdy: i32,
    pub dtdy: i32,
    pub dwdy: i32,
}

/// Position of the current pixel within its span, used by the LOD logic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanSigs {
    pub startspan: bool,
    pub endspan: bool,
    pub preendspan: bool,
    pub nextspan: bool,
    pub midspan: bool,
    pub longspan: bool,
    pub onelessthanmid: bool,
}

/// Source image for texture loads (`Set Texture Image`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureImage {
    pub format: u32,
    pub size: u32,
    /// Width in pixels (field + 1)
    pub width: i32,
    /// RDRAM byte address
    pub address: u32,
}

/// Render target (`Set Color Image`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorImage {
    pub format: u32,
    pub size: u32,
    /// Width in pixels (field + 1)
    pub width: i32,
    /// RDRAM byte address
    pub address: u32,
}

/// Scissor box (`Set Scissor`), 10.2 fixed point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scissor {
    pub xh: i32,
    pub yh: i32,
    pub xl: i32,
    pub yl: i32,
    /// Interlaced rendering: only every other scanline is drawn
    pub field: bool,
    /// With `field`, draw odd rather than even scanlines
    pub keep_odd: bool,
}

/// Advisory conditions that are logged at most once per context
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OneTimeWarnings {
    pub copymstrangecrashes: bool,
    pub fillmcrashes: bool,
    pub fillmbitcrashes: bool,
    pub syncfullcrash: bool,
}

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

//! Unit tests for texture loads
//!
//! A 16x16 RGBA16 texture at 0x200000 goes through Load Tile or Load
//! Block and is read back from TMEM or copied out to the color image.

use crate::core::config::RdpConfig;
use crate::core::rdp::{Color, Rdp};

const TEXTURE: u32 = 0x20_0000;

/// RGBA16 texel with a distinct color at every (s, t)
fn texel(s: u32, t: u32) -> u16 {
    (((s * 2) << 11) | ((t * 2) << 6) | (((s + t) & 0x1f) << 1) | 1) as u16
}

fn upload_texture(rdp: &mut Rdp) {
    for t in 0..16 {
        for s in 0..16 {
            rdp.rdram_mut().write_u16((TEXTURE >> 1) + t * 16 + s, texel(s, t));
        }
    }
}

/// RGBA16 texture image of width 16, tile 0 with a 4-word line at TMEM 0
fn textured_rdp() -> Rdp {
    let mut rdp = Rdp::new(&RdpConfig::default());
    upload_texture(&mut rdp);
    rdp.execute(&[0x3d10_000f, TEXTURE]).unwrap();
    rdp.execute(&[0x3510_0800, 0x0000_0000]).unwrap();
    rdp
}

#[test]
fn test_load_tile_rows() {
    let mut rdp = textured_rdp();
    rdp.execute(&[0x3400_0000, 0x0003_c03c]).unwrap();
    assert!(!rdp.pipeline_crashed());

    let tile = rdp.tile(0);
    assert_eq!((tile.sl, tile.tl, tile.sh, tile.th), (0, 0, 60, 60));

    for s in 0..16 {
        assert_eq!(rdp.tmem().read16(s), texel(s, 0), "row 0, s {}", s);
    }
    // Odd rows have their 32-bit halves swapped
    for s in 0..16 {
        assert_eq!(rdp.tmem().read16(16 + (s ^ 2)), texel(s, 1), "row 1, s {}", s);
    }
    for s in 0..16 {
        assert_eq!(rdp.tmem().read16(15 * 16 + (s ^ 2)), texel(s, 15), "row 15, s {}", s);
    }
}

/// RGBA5551 expanded to 8 bits per channel
fn decoded(v: u16) -> Color {
    let expand = |c: u16| (((c << 3) | (c >> 2)) & 0xff) as i32;
    Color::new(
        expand((v >> 11) & 0x1f),
        expand((v >> 6) & 0x1f),
        expand((v >> 1) & 0x1f),
        if v & 1 != 0 { 0xff } else { 0 },
    )
}

#[test]
fn test_point_sample_after_load() {
    let mut rdp = textured_rdp();
    rdp.execute(&[0x3400_0000, 0x0003_c03c]).unwrap();

    assert_eq!(rdp.fetch_texel(0, 0, 0), decoded(texel(0, 0)));
    assert_eq!(rdp.fetch_texel(5, 0, 0), decoded(texel(5, 0)));
    assert_eq!(rdp.fetch_texel(3, 1, 0), decoded(texel(3, 1)));
    assert_eq!(rdp.fetch_texel(15, 15, 0), decoded(texel(15, 15)));
}

#[test]
fn test_load_tile_partial_rectangle() {
    let mut rdp = textured_rdp();
    // Rows 0-1, columns 4-7 of the image
    rdp.execute(&[0x3401_0000, 0x0001_c004]).unwrap();

    for s in 0..4 {
        assert_eq!(rdp.tmem().read16(s), texel(s + 4, 0));
    }
    for s in 0..4 {
        assert_eq!(rdp.tmem().read16(16 + (s ^ 2)), texel(s + 4, 1));
    }
    // Nothing past the loaded width
    assert_eq!(rdp.tmem().read16(4), 0);
}

#[test]
fn test_load_block_first_line() {
    let mut rdp = textured_rdp();
    // 256 texels, dxt = 2048 / 4 words per line
    rdp.execute(&[0x3300_0000, 0x000f_f200]).unwrap();
    assert!(!rdp.pipeline_crashed());

    let tile = rdp.tile(0);
    assert_eq!(tile.sh, 255);
    assert_eq!(tile.th, 0x200);

    for s in 0..16 {
        assert_eq!(rdp.tmem().read16(s), texel(s, 0));
    }
}

#[test]
fn test_load_then_copy_rectangle() {
    let mut rdp = textured_rdp();
    rdp.execute(&[0x3400_0000, 0x0003_c03c]).unwrap();

    // 320x240 scissor, copy mode, 16-bit color image at 0x100000
    rdp.execute(&[0x2d00_0000, 0x0050_03c0]).unwrap();
    rdp.execute(&[0x2f20_0000, 0x0000_0000]).unwrap();
    rdp.execute(&[0x3f10_013f, 0x0010_0000]).unwrap();
    // (0, 0) - (15, 15), four texels per step
    rdp.execute(&[0x2403_c03c, 0x0000_0000, 0x0000_0000, 0x1000_0400])
        .unwrap();

    let pixel = |x: u32, y: u32| (0x10_0000 >> 1) + y * 320 + x;
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(rdp.rdram().read_u16(pixel(x, y)), texel(x, y), "pixel ({}, {})", x, y);
        }
    }
    assert_eq!(rdp.rdram().read_u16(pixel(16, 0)), 0);
    assert_eq!(rdp.rdram().read_u16(pixel(0, 16)), 0);
}

#[test]
fn test_load_4bit_image_crashes() {
    let mut rdp = Rdp::new(&RdpConfig::default());
    rdp.execute(&[0x3d00_000f, TEXTURE]).unwrap();
    assert!(rdp.execute(&[0x3400_0000, 0x0003_c03c]).is_err());
    assert!(rdp.pipeline_crashed());
}

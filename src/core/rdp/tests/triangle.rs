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

//! Unit tests for triangle commands and the z-buffer

use crate::core::config::RdpConfig;
use crate::core::rdp::Rdp;

const ZBUFFER: u32 = 0x20_0000;

fn pixel(x: u32, y: u32) -> u32 {
    (0x10_0000 >> 1) + y * 320 + x
}

fn depth(x: u32, y: u32) -> u32 {
    (ZBUFFER >> 1) + y * 320 + x
}

/// Flat 16x16 square as a Z-buffered triangle (opcode 0x09) at depth `z`
///
/// `z` is the 18-bit pixel depth.
fn square(z: u32) -> [u32; 12] {
    [
        0x0980_0040,
        0x0040_0000,
        16 << 16,
        0,
        0,
        0,
        16 << 16,
        0,
        z << 13,
        0,
        0,
        0,
    ]
}

/// One-cycle, combiner outputs PRIM, opaque z test with update, z buffer
/// cleared to the far plane
fn depth_rdp() -> Rdp {
    let mut rdp = Rdp::new(&RdpConfig::default());
    for y in 0..20 {
        for x in 0..20 {
            rdp.rdram_mut().write_u16(depth(x, y), 0xfffc);
        }
    }

    let setup: [[u32; 2]; 5] = [
        [0x2d00_0000, 0x0050_03c0],
        [0x2f00_00f0, 0x0000_0030],
        [0x3cff_ffff, 0xfffd_f6fb],
        [0x3f10_013f, 0x0010_0000],
        [0x3e00_0000, ZBUFFER],
    ];
    for words in &setup {
        rdp.execute(words).unwrap();
    }
    rdp
}

fn draw(rdp: &mut Rdp, color: u32, z: u32) {
    rdp.execute(&[0x3a00_0000, color]).unwrap();
    rdp.execute(&square(z)).unwrap();
}

#[test]
fn test_triangle_fills_square() {
    let mut rdp = depth_rdp();
    draw(&mut rdp, 0xff00_00ff, 0x1000);
    assert!(!rdp.pipeline_crashed());

    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(rdp.rdram().read_u16(pixel(x, y)), 0xf801, "pixel ({}, {})", x, y);
            assert_ne!(rdp.rdram().read_u16(depth(x, y)), 0xfffc);
        }
    }
    // Right and bottom edges are exclusive
    assert_eq!(rdp.rdram().read_u16(pixel(16, 0)), 0);
    assert_eq!(rdp.rdram().read_u16(pixel(0, 16)), 0);
    assert_eq!(rdp.rdram().read_u16(depth(16, 0)), 0xfffc);
}

#[test]
fn test_farther_triangle_is_hidden() {
    let mut rdp = depth_rdp();
    draw(&mut rdp, 0xff00_00ff, 0x1000);
    let stored = rdp.rdram().read_u16(depth(5, 5));

    draw(&mut rdp, 0x0000_ffff, 0x3_0000);
    assert_eq!(rdp.rdram().read_u16(pixel(5, 5)), 0xf801);
    assert_eq!(rdp.rdram().read_u16(depth(5, 5)), stored);
}

#[test]
fn test_nearer_triangle_overwrites() {
    let mut rdp = depth_rdp();
    draw(&mut rdp, 0xff00_00ff, 0x1000);
    let stored = rdp.rdram().read_u16(depth(5, 5));

    draw(&mut rdp, 0x00ff_00ff, 0x0800);
    assert_eq!(rdp.rdram().read_u16(pixel(5, 5)), 0x07c1);
    assert!(rdp.rdram().read_u16(depth(5, 5)) < stored);
}

#[test]
fn test_short_triangle_is_rejected() {
    let mut rdp = depth_rdp();
    let words = square(0x1000);
    assert!(rdp.execute(&words[..8]).is_err());
    assert_eq!(rdp.rdram().read_u16(pixel(0, 0)), 0);
}

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

//! Unit tests for Fill Rectangle

use crate::core::config::RdpConfig;
use crate::core::error::RdpError;
use crate::core::rdp::Rdp;

/// Halfword index of the 16-bit color image at 0x100000
fn pixel16(x: u32, y: u32) -> u32 {
    (0x10_0000 >> 1) + y * 320 + x
}

/// 320x240 scissor, fill mode, 16-bit RGBA color image at 0x100000
fn fill_mode_rdp() -> Rdp {
    let mut rdp = Rdp::new(&RdpConfig::default());
    rdp.execute(&[0x2d00_0000, 0x0050_03c0]).unwrap();
    rdp.execute(&[0x2f30_0000, 0x0000_0000]).unwrap();
    rdp.execute(&[0x3f10_013f, 0x0010_0000]).unwrap();
    rdp
}

#[test]
fn test_fill_16bit_inclusive_edges() {
    let mut rdp = fill_mode_rdp();
    rdp.execute(&[0x3700_0000, 0xf801_f801]).unwrap();
    // (0, 0) - (4, 4): fill mode covers both edges
    rdp.execute(&[0x3601_0010, 0x0000_0000]).unwrap();

    for y in 0..=4 {
        for x in 0..=4 {
            assert_eq!(rdp.rdram().read_u16(pixel16(x, y)), 0xf801, "pixel ({}, {})", x, y);
            assert_eq!(rdp.rdram().read_hidden(pixel16(x, y)), 3);
        }
    }
    assert_eq!(rdp.rdram().read_u16(pixel16(5, 0)), 0);
    assert_eq!(rdp.rdram().read_u16(pixel16(0, 5)), 0);
    assert!(!rdp.pipeline_crashed());
}

#[test]
fn test_fill_16bit_alternates_halves() {
    let mut rdp = fill_mode_rdp();
    rdp.execute(&[0x3700_0000, 0x1234_5678]).unwrap();
    rdp.execute(&[0x3600_c000, 0x0000_0000]).unwrap();

    // Even pixels take the upper half of the fill color
    assert_eq!(rdp.rdram().read_u16(pixel16(0, 0)), 0x1234);
    assert_eq!(rdp.rdram().read_u16(pixel16(1, 0)), 0x5678);
    assert_eq!(rdp.rdram().read_u16(pixel16(2, 0)), 0x1234);
    assert_eq!(rdp.rdram().read_u16(pixel16(3, 0)), 0x5678);
    assert_eq!(rdp.rdram().read_hidden(pixel16(0, 0)), 0);
    assert_eq!(rdp.rdram().read_u16(pixel16(4, 0)), 0);
}

#[test]
fn test_fill_32bit() {
    let mut rdp = fill_mode_rdp();
    rdp.execute(&[0x3f18_013f, 0x0010_0000]).unwrap();
    rdp.execute(&[0x3700_0000, 0x1234_5679]).unwrap();
    rdp.execute(&[0x3600_8008, 0x0000_0000]).unwrap();

    for y in 0..=2 {
        for x in 0..=2 {
            let index = (0x10_0000 >> 2) + y * 320 + x;
            assert_eq!(rdp.rdram().read_u32(index), 0x1234_5679);
            assert_eq!(rdp.rdram().read_hidden(index << 1), 0);
            assert_eq!(rdp.rdram().read_hidden((index << 1) + 1), 3);
        }
    }
    assert_eq!(rdp.rdram().read_u32((0x10_0000 >> 2) + 3), 0);
}

#[test]
fn test_fill_with_z_compare_crashes() {
    let mut rdp = fill_mode_rdp();
    rdp.execute(&[0x2f30_0000, 0x0000_0010]).unwrap();
    rdp.execute(&[0x3700_0000, 0xffff_ffff]).unwrap();

    let result = rdp.execute(&[0x3601_0010, 0x0000_0000]);
    assert!(matches!(result, Err(RdpError::PipelineCrashed(0x36))));
    assert!(rdp.pipeline_crashed());
    assert_eq!(rdp.rdram().read_u16(pixel16(0, 0)), 0);

    // The flag is sticky but later commands report their own outcome
    assert!(rdp.execute(&[0x2700_0000, 0x0000_0000]).is_ok());
    assert!(rdp.pipeline_crashed());
}

#[test]
fn test_fill_clipped_by_scissor() {
    let mut rdp = fill_mode_rdp();
    // Scissor (0, 0) - (2, 2)
    rdp.execute(&[0x2d00_0000, 0x0000_8008]).unwrap();
    rdp.execute(&[0x3700_0000, 0xf801_f801]).unwrap();
    rdp.execute(&[0x3601_0010, 0x0000_0000]).unwrap();

    assert_eq!(rdp.rdram().read_u16(pixel16(0, 0)), 0xf801);
    assert_eq!(rdp.rdram().read_u16(pixel16(1, 1)), 0xf801);
    assert_eq!(rdp.rdram().read_u16(pixel16(4, 0)), 0);
    assert_eq!(rdp.rdram().read_u16(pixel16(0, 4)), 0);
    assert_eq!(rdp.rdram().read_u16(pixel16(4, 4)), 0);
}

#[test]
fn test_fill_rect_outside_scissor_writes_nothing() {
    let mut rdp = fill_mode_rdp();
    rdp.execute(&[0x2d00_0000, 0x0000_8008]).unwrap();
    rdp.execute(&[0x3700_0000, 0xffff_ffff]).unwrap();
    // (8, 8) - (12, 12)
    rdp.execute(&[0x3603_0030, 0x0002_0020]).unwrap();

    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(rdp.rdram().read_u16(pixel16(x, y)), 0);
        }
    }
}

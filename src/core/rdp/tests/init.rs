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

//! Unit tests for RDP construction and mode derivation

use crate::core::config::RdpConfig;
use crate::core::rdp::{
    sign, sign16, CombineModes, DitherNoise, OneCycleRenderer, OtherModes, Rdp, TwoCycleRenderer,
};

#[test]
fn test_sign_extension() {
    assert_eq!(sign16(0x8000), -0x8000);
    assert_eq!(sign16(0x1_7fff), 0x7fff);
    assert_eq!(sign(0x2000, 14), -0x2000);
    assert_eq!(sign(0x1fff, 14), 0x1fff);
    assert_eq!(sign(0x0800_0000, 28), -0x0800_0000);
    assert_eq!(sign(-1, 17), -1);
}

#[test]
fn test_default_derivs() {
    let rdp = Rdp::new(&RdpConfig::default());
    // All-zero combine: alpha multiplier 0 is the LOD fraction
    assert_eq!(rdp.derivs.one_cycle, OneCycleRenderer::NoTexel1);
    assert_eq!(rdp.derivs.two_cycle, TwoCycleRenderer::NoTexel1);
    assert!(rdp.derivs.dolod);
    // Blender 0 with all-zero selectors: pixel * pixel alpha + pixel * inv alpha
    assert!(rdp.derivs.partialreject_1cycle);
    assert!(!rdp.derivs.special_bsel0);
    // Magic-square RGB and alpha dither
    assert_eq!(rdp.derivs.dither_noise, DitherNoise::DitherOnly);
}

#[test]
fn test_renderer_selection() {
    let mut rdp = Rdp::new(&RdpConfig::default());
    // Cycle 1: (TEXEL1 - 0) * SHADE + 0
    rdp.combine = CombineModes::from_words(0x00ff_fe44, 0xffff_ffff);
    rdp.deduce_derivatives();
    assert_eq!(rdp.derivs.one_cycle, OneCycleRenderer::Complete);
    assert_eq!(rdp.derivs.two_cycle, TwoCycleRenderer::Complete);

    // Cycle 1: (TEXEL0 - 0) * SHADE + 0
    rdp.combine = CombineModes::from_words(0x00ff_fe24, 0xffff_ffff);
    rdp.deduce_derivatives();
    assert_eq!(rdp.derivs.one_cycle, OneCycleRenderer::NoTexel1);
    assert_eq!(rdp.derivs.two_cycle, TwoCycleRenderer::NoTexelNext);
}

#[test]
fn test_noise_and_dither_off() {
    let mut rdp = Rdp::new(&RdpConfig::default());
    rdp.other_modes.rgb_dither_sel = 3;
    rdp.other_modes.alpha_dither_sel = 3;
    rdp.deduce_derivatives();
    assert_eq!(rdp.derivs.dither_noise, DitherNoise::Nothing);
    assert!(!rdp.derivs.rgb_dither);

    rdp.other_modes.alpha_dither_sel = 2;
    rdp.deduce_derivatives();
    assert_eq!(rdp.derivs.dither_noise, DitherNoise::Complete);
}

#[test]
fn test_memory_alpha_shifters() {
    let mut rdp = Rdp::new(&RdpConfig::default());
    // Two-cycle, cycle 0 weights by memory alpha
    rdp.other_modes = OtherModes::from_words(0x0010_0000, 0x0004_0000);
    rdp.deduce_derivatives();
    assert!(rdp.derivs.special_bsel0);
    assert!(rdp.derivs.interpixelblendershiftersneeded);
    assert!(!rdp.derivs.realblendershiftersneeded);
}

#[test]
fn test_scissor_from_config() {
    let config = RdpConfig {
        scissor: Some([0, 0, 320 << 2, 240 << 2]),
        ..Default::default()
    };
    let mut rdp = Rdp::new(&config);
    assert_eq!(rdp.clip.xl, 320 << 2);
    rdp.clip.xl = 0;
    rdp.init();
    assert_eq!(rdp.clip.yl, 240 << 2);
}

#[test]
fn test_init_is_idempotent() {
    let mut rdp = Rdp::new(&RdpConfig::default());
    rdp.execute(&[0x3510_0800, 0x0300_0000]).unwrap();
    rdp.execute(&[0x3700_0000, 0x1234_5678]).unwrap();
    rdp.tmem.write16(7, 0xbeef);

    rdp.init();
    let first = rdp.snapshot();
    let first_tables = rdp.tables().clone();
    rdp.init();

    assert_eq!(rdp.snapshot(), first);
    assert_eq!(*rdp.tables(), first_tables);
    assert_eq!(first.fill_color, 0);
    assert!(rdp.tmem().as_bytes().iter().all(|&b| b == 0));
    assert_eq!(rdp.tile(3).line, 0);
}

#[test]
fn test_init_clears_crash() {
    let mut rdp = Rdp::new(&RdpConfig::default());
    rdp.pipeline_crashed = true;
    rdp.init();
    assert!(!rdp.pipeline_crashed());
}

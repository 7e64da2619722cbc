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

//! Register state snapshots
//!
//! [`RdpState`] captures everything the command stream has loaded into the
//! RDP: modes, tiles, TMEM, images and constant registers. Restoring a
//! snapshot reapplies it and recomputes every derived cache, so a restored
//! context renders exactly like the one the snapshot came from.
//!
//! Per-pixel intermediates (span buffer, texel pipeline, blender memory)
//! are not part of a snapshot; they do not survive a command boundary.

use serde::{Deserialize, Serialize};

use super::primitives::{Color, ColorImage, Scissor, TextureImage, Tile};
use super::registers::{CombineModes, OtherModes};
use super::tmem::Tmem;
use super::Rdp;
use crate::core::error::Result;

/// Serializable copy of the command-driven RDP state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RdpState {
    /// Raw `Set Other Modes` words
    pub other_modes: [u32; 2],
    /// Raw `Set Combine` words
    pub combine: [u32; 2],
    pub tiles: [Tile; 8],
    pub tmem: Tmem,
    pub texture_image: TextureImage,
    pub color_image: ColorImage,
    pub z_image: u32,
    pub scissor: Scissor,

    pub prim_color: Color,
    pub env_color: Color,
    pub blend_color: Color,
    pub fog_color: Color,
    pub key_center: Color,
    pub key_scale: Color,
    pub key_width: Color,

    pub fill_color: u32,
    pub primitive_z: u32,
    pub primitive_delta_z: u32,
    pub primitive_lod_frac: i32,
    pub min_level: i32,
    /// Filter conversion constants K0-K3, pre-scaled
    pub convert_tf: [i32; 4],
    /// Combiner constants K4 and K5
    pub convert_k45: [i32; 2],
}

impl RdpState {
    /// Encode with bincode's standard configuration
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(self, bincode::config::standard())?)
    }

    /// Decode a snapshot written by [`RdpState::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (state, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(state)
    }
}

impl Rdp {
    /// Capture the command-driven state
    pub fn snapshot(&self) -> RdpState {
        RdpState {
            other_modes: self.other_modes.words,
            combine: self.combine.words,
            tiles: self.tiles,
            tmem: self.tmem.clone(),
            texture_image: self.ti,
            color_image: self.fb,
            z_image: self.zb_address,
            scissor: self.clip,
            prim_color: self.prim,
            env_color: self.env,
            blend_color: self.blend,
            fog_color: self.fog,
            key_center: self.key_center,
            key_scale: self.key_scale,
            key_width: self.key_width,
            fill_color: self.fill_color,
            primitive_z: self.primitive_z,
            primitive_delta_z: self.primitive_delta_z,
            primitive_lod_frac: self.primitive_lod_frac,
            min_level: self.min_level,
            convert_tf: [self.k0_tf, self.k1_tf, self.k2_tf, self.k3_tf],
            convert_k45: [self.k4, self.k5],
        }
    }

    /// Load a snapshot and rederive the mode and tile caches
    ///
    /// The crash flag and one-time warnings are left as they are.
    pub fn restore(&mut self, state: &RdpState) {
        self.other_modes = OtherModes::from_words(state.other_modes[0], state.other_modes[1]);
        self.combine = CombineModes::from_words(state.combine[0], state.combine[1]);
        self.deduce_derivatives();

        self.tiles = state.tiles;
        for tile in self.tiles.iter_mut() {
            tile.calculate_tile_derivs();
            tile.calculate_clamp_diffs();
        }
        self.tmem = state.tmem.clone();

        self.ti = state.texture_image;
        self.fb = state.color_image;
        self.zb_address = state.z_image;
        self.clip = state.scissor;

        self.prim = state.prim_color;
        self.env = state.env_color;
        self.blend = state.blend_color;
        self.fog = state.fog_color;
        self.key_center = state.key_center;
        self.key_scale = state.key_scale;
        self.key_width = state.key_width;

        self.fill_color = state.fill_color;
        self.primitive_z = state.primitive_z;
        self.primitive_delta_z = state.primitive_delta_z;
        self.primitive_lod_frac = state.primitive_lod_frac;
        self.min_level = state.min_level;
        [self.k0_tf, self.k1_tf, self.k2_tf, self.k3_tf] = state.convert_tf;
        [self.k4, self.k5] = state.convert_k45;

        log::debug!("RDP state restored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;

    fn configured_rdp() -> Rdp {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.set_other_modes(&[0x2f10_0000, 0x0c08_0008]);
        rdp.set_combine(&[0x3cff_ffff, 0xfffc_f279]);
        rdp.set_tile(&[0x3510_0800, 0x0104_8150]);
        rdp.set_tile_size(&[0x3200_0000, 0x0103_c03c]);
        rdp.set_prim_color(&[0x3a00_0210, 0x8040_2010]);
        rdp.set_convert(&[0x2c00_0000 | (0x1ff << 13), 0x0000_0204]);
        rdp.set_color_image(&[0x3f10_013f, 0x0010_0000]);
        rdp.set_mask_image(&[0x3e00_0000, 0x0020_0000]);
        rdp.tmem.write16(0x12, 0xbeef);
        rdp
    }

    #[test]
    fn test_snapshot_bytes_round_trip() {
        let rdp = configured_rdp();
        let state = rdp.snapshot();
        let bytes = state.to_bytes().unwrap();
        assert_eq!(RdpState::from_bytes(&bytes).unwrap(), state);
    }

    #[test]
    fn test_restore_rebuilds_derived_state() {
        let source = configured_rdp();
        let state = source.snapshot();

        let mut target = Rdp::new(&RdpConfig::default());
        target.restore(&state);

        assert_eq!(target.other_modes(), source.other_modes());
        assert_eq!(target.mode_derivs(), source.mode_derivs());
        assert_eq!(target.tile(1), source.tile(1));
        assert_eq!(target.tmem().read16(0x12), 0xbeef);
        assert_eq!(target.snapshot(), state);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        assert!(RdpState::from_bytes(&[0xff, 0xff]).is_err());
    }
}

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

//! RDP command set
//!
//! Each command has a typed entry point on [`Rdp`] taking its words as a
//! fixed-size array. [`Rdp::execute`] decodes the opcode from the first
//! word and forwards to the matching entry point; [`Rdp::process_list`]
//! walks a packed command list.
//!
//! Hardware faults are not errors for the entry points: they raise the
//! crash flag and the command stops. The dispatcher reports the command
//! that raised it as [`RdpError::PipelineCrashed`].
//!
//! # References
//!
//! - [N64brew: RDP Commands](https://n64brew.dev/wiki/Reality_Display_Processor/Commands)

mod modes;
mod primitive;
mod sync;
mod texture;

pub use primitive::{
    TriangleKind, TRIANGLE_EDGE_WORDS, TRIANGLE_SHADE_WORDS, TRIANGLE_TEXTURE_WORDS, TRIANGLE_Z_WORDS,
};

use crate::core::error::{RdpError, Result};
use crate::core::rdp::Rdp;

/// Opcode field of a command's first word
#[inline(always)]
pub fn opcode(w0: u32) -> u8 {
    ((w0 >> 24) & 0x3f) as u8
}

/// Command names, indexed by opcode; `None` for unassigned opcodes
const COMMAND_NAMES: [Option<&str>; 64] = {
    let mut names = [None; 64];
    names[0x00] = Some("No-op");
    names[0x08] = Some("Triangle");
    names[0x09] = Some("Triangle Z");
    names[0x0a] = Some("Triangle Texture");
    names[0x0b] = Some("Triangle Texture Z");
    names[0x0c] = Some("Triangle Shade");
    names[0x0d] = Some("Triangle Shade Z");
    names[0x0e] = Some("Triangle Shade Texture");
    names[0x0f] = Some("Triangle Shade Texture Z");
    names[0x24] = Some("Texture Rectangle");
    names[0x25] = Some("Texture Rectangle Flip");
    names[0x26] = Some("Sync Load");
    names[0x27] = Some("Sync Pipe");
    names[0x28] = Some("Sync Tile");
    names[0x29] = Some("Sync Full");
    names[0x2a] = Some("Set Key GB");
    names[0x2b] = Some("Set Key R");
    names[0x2c] = Some("Set Convert");
    names[0x2d] = Some("Set Scissor");
    names[0x2e] = Some("Set Prim Depth");
    names[0x2f] = Some("Set Other Modes");
    names[0x30] = Some("Load TLUT");
    names[0x32] = Some("Set Tile Size");
    names[0x33] = Some("Load Block");
    names[0x34] = Some("Load Tile");
    names[0x35] = Some("Set Tile");
    names[0x36] = Some("Fill Rectangle");
    names[0x37] = Some("Set Fill Color");
    names[0x38] = Some("Set Fog Color");
    names[0x39] = Some("Set Blend Color");
    names[0x3a] = Some("Set Prim Color");
    names[0x3b] = Some("Set Env Color");
    names[0x3c] = Some("Set Combine");
    names[0x3d] = Some("Set Texture Image");
    names[0x3e] = Some("Set Mask Image");
    names[0x3f] = Some("Set Color Image");
    names
};

/// Human-readable name of a command opcode
pub fn command_name(opcode: u8) -> Option<&'static str> {
    COMMAND_NAMES[(opcode & 0x3f) as usize]
}

/// Length in 32-bit words of the command whose first word is `w0`
///
/// # Returns
///
/// The word count, or `None` when the opcode is not a command
pub fn command_length(w0: u32) -> Option<usize> {
    let op = opcode(w0);
    command_name(op)?;
    Some(match op {
        0x08..=0x0f => TriangleKind::from_opcode(op as u32).word_count(),
        0x24 | 0x25 => 4,
        _ => 2,
    })
}

/// First `N` words of a command whose length was already checked
#[inline]
fn fixed<const N: usize>(op: u8, words: &[u32]) -> Result<&[u32; N]> {
    words
        .get(..N)
        .and_then(|w| w.try_into().ok())
        .ok_or(RdpError::InvalidCommandLength {
            opcode: op,
            expected: N,
            actual: words.len(),
        })
}

impl Rdp {
    /// Execute one command
    ///
    /// # Arguments
    ///
    /// * `words` - The command, first word holding the opcode. Words past
    ///   the command's length are ignored.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the command ran to completion
    /// - `Err(RdpError::InvalidOpcode)` for unassigned opcodes
    /// - `Err(RdpError::InvalidCommandLength)` if `words` is too short
    /// - `Err(RdpError::PipelineCrashed)` if this command raised the crash
    ///   flag. The flag itself stays set until [`Rdp::init`].
    pub fn execute(&mut self, words: &[u32]) -> Result<()> {
        let Some(&w0) = words.first() else {
            return Err(RdpError::InvalidCommandLength {
                opcode: 0,
                expected: 2,
                actual: 0,
            });
        };
        let op = opcode(w0);
        let expected = command_length(w0).ok_or(RdpError::InvalidOpcode(op))?;
        if words.len() < expected {
            return Err(RdpError::InvalidCommandLength {
                opcode: op,
                expected,
                actual: words.len(),
            });
        }

        log::trace!("{} {:08x?}", command_name(op).unwrap_or("?"), &words[..expected]);

        let was_crashed = self.pipeline_crashed;
        self.pipeline_crashed = false;
        let result = self.dispatch(op, &words[..expected]);
        let crashed = self.pipeline_crashed;
        self.pipeline_crashed |= was_crashed;

        result?;
        if crashed {
            return Err(RdpError::PipelineCrashed(op));
        }
        Ok(())
    }

    /// Execute a packed list of commands
    ///
    /// Stops at the first command that fails to decode. A crashing command
    /// does not stop the list: later commands run as they would on
    /// hardware, and the crash stays visible through
    /// [`Rdp::pipeline_crashed`].
    ///
    /// # Returns
    ///
    /// The number of commands executed
    pub fn process_list(&mut self, mut words: &[u32]) -> Result<usize> {
        let mut count = 0;
        while let Some(&w0) = words.first() {
            let len = command_length(w0).ok_or(RdpError::InvalidOpcode(opcode(w0)))?;
            match self.execute(words) {
                Ok(()) | Err(RdpError::PipelineCrashed(_)) => {}
                Err(e) => return Err(e),
            }
            words = &words[len..];
            count += 1;
        }
        Ok(count)
    }

    fn dispatch(&mut self, op: u8, words: &[u32]) -> Result<()> {
        match op {
            0x00 => self.noop(fixed(op, words)?),
            0x08..=0x0f => self.triangle(words),
            0x24 => self.texture_rect(fixed(op, words)?),
            0x25 => self.texture_rect_flip(fixed(op, words)?),
            0x26 => self.sync_load(fixed(op, words)?),
            0x27 => self.sync_pipe(fixed(op, words)?),
            0x28 => self.sync_tile(fixed(op, words)?),
            0x29 => self.sync_full(fixed(op, words)?),
            0x2a => self.set_key_gb(fixed(op, words)?),
            0x2b => self.set_key_r(fixed(op, words)?),
            0x2c => self.set_convert(fixed(op, words)?),
            0x2d => self.set_scissor(fixed(op, words)?),
            0x2e => self.set_prim_depth(fixed(op, words)?),
            0x2f => self.set_other_modes(fixed(op, words)?),
            0x30 => self.load_tlut(fixed(op, words)?),
            0x32 => self.set_tile_size(fixed(op, words)?),
            0x33 => self.load_block(fixed(op, words)?),
            0x34 => self.load_tile(fixed(op, words)?),
            0x35 => self.set_tile(fixed(op, words)?),
            0x36 => self.fill_rect(fixed(op, words)?),
            0x37 => self.set_fill_color(fixed(op, words)?),
            0x38 => self.set_fog_color(fixed(op, words)?),
            0x39 => self.set_blend_color(fixed(op, words)?),
            0x3a => self.set_prim_color(fixed(op, words)?),
            0x3b => self.set_env_color(fixed(op, words)?),
            0x3c => self.set_combine(fixed(op, words)?),
            0x3d => self.set_texture_image(fixed(op, words)?),
            0x3e => self.set_mask_image(fixed(op, words)?),
            0x3f => self.set_color_image(fixed(op, words)?),
            _ => return Err(RdpError::InvalidOpcode(op)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::RdpConfig;

    #[test]
    fn test_command_lengths() {
        assert_eq!(command_length(0x0800_0000), Some(8));
        assert_eq!(command_length(0x0f00_0000), Some(44));
        assert_eq!(command_length(0x2400_0000), Some(4));
        assert_eq!(command_length(0x3600_0000), Some(2));
        // Upper opcode bits are ignored
        assert_eq!(command_length(0xef00_0000), Some(2));
        assert_eq!(command_length(0x0100_0000), None);
        assert_eq!(command_length(0x3100_0000), None);
    }

    #[test]
    fn test_execute_rejects_unknown_opcode() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        assert!(matches!(rdp.execute(&[0x0100_0000, 0]), Err(RdpError::InvalidOpcode(0x01))));
    }

    #[test]
    fn test_execute_rejects_short_command() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let err = rdp.execute(&[0x2400_0000, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            RdpError::InvalidCommandLength {
                opcode: 0x24,
                expected: 4,
                actual: 3
            }
        ));
        assert!(rdp.execute(&[]).is_err());
    }

    #[test]
    fn test_execute_reports_crashing_command_only() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        // 4-bit texture image, then Load Tile
        rdp.execute(&[0x3d00_000f, 0x0020_0000]).unwrap();
        let err = rdp.execute(&[0x3400_0000, 0x0003_c03c]).unwrap_err();
        assert!(matches!(err, RdpError::PipelineCrashed(0x34)));

        // The flag is sticky but later commands succeed
        rdp.execute(&[0x3700_0000, 0x1234_5678]).unwrap();
        assert!(rdp.pipeline_crashed());

        rdp.init();
        assert!(!rdp.pipeline_crashed());
    }

    #[test]
    fn test_process_list_counts_commands() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        let list = [
            0x2f30_0000, 0x0000_0000, // fill mode
            0x3f10_013f, 0x0010_0000, // 16-bit color image, 320 wide
            0x3700_0000, 0xffff_ffff, // fill color
            0x2700_0000, 0x0000_0000, // sync pipe
        ];
        assert_eq!(rdp.process_list(&list).unwrap(), 4);
        assert_eq!(rdp.color_image().width, 320);
        assert_eq!(rdp.fill_color, 0xffff_ffff);
    }

    #[test]
    fn test_command_names() {
        assert_eq!(command_name(0x36), Some("Fill Rectangle"));
        assert_eq!(command_name(0x31), None);
    }
}

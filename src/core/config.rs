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

//! Host configuration
//!
//! Settings that shape an [`Rdp`](crate::core::rdp::Rdp) instance but are
//! not part of the command stream: the size of the built-in RDRAM store,
//! the dither noise seed and an optional power-on scissor box.
//!
//! Configuration is read from TOML, with environment overrides loaded
//! through `dotenvy`:
//!
//! | Variable           | Field        |
//! |--------------------|--------------|
//! | `RDPX_NOISE_SEED`  | `noise_seed` |
//! | `RDPX_RDRAM_SIZE`  | `rdram_size` |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{RdpError, Result};

/// Default RDRAM size (8MB, expansion pak installed)
pub const DEFAULT_RDRAM_SIZE: usize = 0x80_0000;

/// RDP host configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RdpConfig {
    /// Size in bytes of the built-in RDRAM store (power of two)
    pub rdram_size: usize,

    /// Seed for the built-in dither noise generator
    pub noise_seed: u32,

    /// Log every RDRAM span read by the load pipeline
    pub trace_loads: bool,

    /// Scissor applied at power-on: xh, yh, xl, yl in 10.2 fixed point
    pub scissor: Option<[u32; 4]>,
}

impl Default for RdpConfig {
    fn default() -> Self {
        Self {
            rdram_size: DEFAULT_RDRAM_SIZE,
            noise_seed: 0,
            trace_loads: false,
            scissor: None,
        }
    }
}

impl RdpConfig {
    /// Load configuration from a TOML file
    ///
    /// A missing file is not an error; defaults are returned instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Defaults overlaid with `.env` / process environment values
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay `RDPX_*` environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        // A missing .env is the common case
        let _ = dotenvy::dotenv();

        if let Ok(seed) = std::env::var("RDPX_NOISE_SEED") {
            self.noise_seed = parse_number(&seed)
                .ok_or_else(|| RdpError::Config(format!("bad RDPX_NOISE_SEED: {}", seed)))?;
        }

        if let Ok(size) = std::env::var("RDPX_RDRAM_SIZE") {
            self.rdram_size = parse_number(&size)
                .ok_or_else(|| RdpError::Config(format!("bad RDPX_RDRAM_SIZE: {}", size)))?
                as usize;
        }

        self.validate()
    }

    /// Check invariants the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        if !self.rdram_size.is_power_of_two() || self.rdram_size < 0x1000 {
            return Err(RdpError::Config(format!(
                "rdram_size must be a power of two >= 4KB, got 0x{:x}",
                self.rdram_size
            )));
        }
        Ok(())
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal number
fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

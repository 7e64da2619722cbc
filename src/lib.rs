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

//! RDPX - A cycle-faithful N64 Reality Display Processor pixel pipeline
//!
//! This library reproduces, bit for bit, the pixels and depth values the
//! RDP writes to RDRAM: edge walking, texture coordinate and LOD
//! derivation, TMEM addressing, texel fetch and filtering, the color
//! combiner, the blender, coverage, dithering and the z-buffer.
//!
//! # Example
//!
//! ```
//! use rdpx::core::config::RdpConfig;
//! use rdpx::core::rdp::Rdp;
//!
//! let mut rdp = Rdp::new(&RdpConfig::default());
//!
//! // 320x240 scissor, fill mode, 16-bit color image at 0x100000
//! rdp.execute(&[0x2d00_0000, 0x0050_03c0]).unwrap();
//! rdp.execute(&[0x2f30_0000, 0x0000_0000]).unwrap();
//! rdp.execute(&[0x3f10_013f, 0x0010_0000]).unwrap();
//! rdp.execute(&[0x3700_0000, 0xf801_f801]).unwrap();
//! rdp.execute(&[0x3601_0010, 0x0000_0000]).unwrap();
//!
//! assert!(!rdp.pipeline_crashed());
//! ```

pub mod core;

pub use core::error::{RdpError, Result};

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

//! Error types for the RDP core
//!
//! Hardware faults (unsupported load sizes, fill mode on a 4-bit color
//! image, ...) are not errors at this level. They raise the pipeline
//! crash flag and the offending command stops. [`RdpError`] covers what
//! the host gets wrong: malformed command words, unknown opcodes and
//! configuration problems.

use thiserror::Error;

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, RdpError>;

/// Errors surfaced to the host
#[derive(Debug, Error)]
pub enum RdpError {
    /// A command slice is shorter than its opcode requires
    #[error("command 0x{opcode:02x} needs {expected} words, got {actual}")]
    InvalidCommandLength {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    /// The opcode does not name an RDP command
    #[error("invalid RDP opcode 0x{0:02x}")]
    InvalidOpcode(u8),

    /// The command left the pipeline in the crashed state
    #[error("RDP pipeline crashed while executing command 0x{0:02x}")]
    PipelineCrashed(u8),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure while reading or writing host files
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML configuration
    #[error("failed to parse config: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// Configuration could not be serialized
    #[error("failed to serialize config: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// State snapshot could not be encoded
    #[error("failed to encode state: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// State snapshot could not be decoded
    #[error("failed to decode state: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

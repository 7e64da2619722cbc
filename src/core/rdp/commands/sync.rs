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

//! Synchronization commands
//!
//! The pipeline here runs each command to completion before the next, so
//! the pipe, tile and load syncs have nothing to wait for.
//!
//! # Commands
//!
//! - 0x00: No-op
//! - 0x26: Sync Load
//! - 0x27: Sync Pipe
//! - 0x28: Sync Tile
//! - 0x29: Sync Full

use crate::core::rdp::Rdp;

impl Rdp {
    /// 0x00 - No-op
    pub fn noop(&mut self, _words: &[u32; 2]) {}

    /// 0x26 - Sync Load
    pub fn sync_load(&mut self, _words: &[u32; 2]) {}

    /// 0x27 - Sync Pipe
    pub fn sync_pipe(&mut self, _words: &[u32; 2]) {}

    /// 0x28 - Sync Tile
    pub fn sync_tile(&mut self, _words: &[u32; 2]) {}

    /// 0x29 - Sync Full
    ///
    /// On hardware this raises the DP interrupt. The core has no interrupt
    /// line; the host is expected to signal completion itself, which is
    /// logged the first time.
    pub fn sync_full(&mut self, _words: &[u32; 2]) {
        if !self.warnings.syncfullcrash {
            self.warnings.syncfullcrash = true;
            log::warn!("sync full: DP interrupt is left to the host");
        }
        log::trace!("sync full");
    }
}

#[cfg(test)]
mod tests {
    use crate::core::config::RdpConfig;
    use crate::core::rdp::Rdp;

    #[test]
    fn test_sync_full_warns_once_and_keeps_state() {
        let mut rdp = Rdp::new(&RdpConfig::default());
        rdp.sync_full(&[0x2900_0000, 0]);
        rdp.sync_full(&[0x2900_0000, 0]);
        assert!(rdp.warnings.syncfullcrash);
        assert!(!rdp.pipeline_crashed());
    }
}

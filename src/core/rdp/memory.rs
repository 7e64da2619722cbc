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

//! External collaborators of the pixel pipeline
//!
//! The RDP does not own console memory, the dither noise generator or any
//! debugging hooks. Each is reached through a small trait so hosts can plug
//! in their own RDRAM model, while tests use the in-crate [`VecRdram`] and
//! [`LcgNoise`].
//!
//! # RDRAM addressing
//!
//! RDRAM is big-endian. Byte address `a` is the most significant byte of
//! word `a >> 2` when `a & 3 == 0`; halfword index `h` is the upper half
//! of word `h >> 1` when `h` is even. Each halfword carries two extra
//! "hidden" bits (the ninth bit of each byte on real hardware), which the
//! RDP uses for coverage and depth precision.
//!
//! # References
//!
//! - [N64brew: RDRAM](https://n64brew.dev/wiki/RDRAM)

/// Byte-addressable console memory as seen by the RDP
///
/// Implementations own bounds and mirroring: an out-of-range access must
/// not panic. Reads outside the store return 0 and writes are dropped.
pub trait Rdram {
    /// Read the byte at `address`
    fn read_u8(&self, address: u32) -> u8;

    /// Read the halfword at halfword `index`
    fn read_u16(&self, index: u32) -> u16;

    /// Read the word at word `index`
    fn read_u32(&self, index: u32) -> u32;

    /// Write the byte at `address`
    fn write_u8(&mut self, address: u32, value: u8);

    /// Write the halfword at halfword `index`
    fn write_u16(&mut self, index: u32, value: u16);

    /// Write the word at word `index`
    fn write_u32(&mut self, index: u32, value: u32);

    /// Read the two hidden bits attached to halfword `index`
    fn read_hidden(&self, index: u32) -> u8;

    /// Write the two hidden bits attached to halfword `index`
    fn write_hidden(&mut self, index: u32, value: u8);

    /// Read a halfword together with its hidden bits
    fn pair_read16(&self, index: u32) -> (u16, u8) {
        (self.read_u16(index), self.read_hidden(index))
    }

    /// Write a halfword together with its hidden bits
    fn pair_write16(&mut self, index: u32, value: u16, hidden: u8) {
        self.write_u16(index, value);
        self.write_hidden(index, hidden);
    }

    /// Write a word and the hidden bits of both of its halfwords
    fn pair_write32(&mut self, index: u32, value: u32, hidden_hi: u8, hidden_lo: u8) {
        self.write_u32(index, value);
        self.write_hidden(index << 1, hidden_hi);
        self.write_hidden((index << 1) + 1, hidden_lo);
    }

    /// Write a byte; odd bytes also carry the hidden bits of their halfword
    fn pair_write8(&mut self, address: u32, value: u8, hidden: u8) {
        self.write_u8(address, value);
        if address & 1 != 0 {
            self.write_hidden(address >> 1, hidden);
        }
    }
}

/// RDRAM backed by a word vector
///
/// The size must be a power of two; addresses wrap at the store size the
/// way the RDP's 24-bit address bus folds onto installed memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VecRdram {
    words: Vec<u32>,
    hidden: Vec<u8>,
    byte_mask: u32,
}

impl VecRdram {
    /// Create a zeroed store of `size` bytes
    ///
    /// # Arguments
    ///
    /// * `size` - Store size in bytes, rounded up to a power of two (min 4KB)
    pub fn new(size: usize) -> Self {
        let size = size.max(0x1000).next_power_of_two();
        Self {
            words: vec![0; size >> 2],
            hidden: vec![0; size >> 1],
            byte_mask: (size - 1) as u32,
        }
    }

    /// Size of the store in bytes
    pub fn size(&self) -> usize {
        self.words.len() << 2
    }

    /// Copy a byte slice into memory starting at `address`
    pub fn load_bytes(&mut self, address: u32, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.write_u8(address.wrapping_add(i as u32), byte);
        }
    }

    /// Copy `len` bytes out of memory starting at `address`
    pub fn dump_bytes(&self, address: u32, len: usize) -> Vec<u8> {
        (0..len)
            .map(|i| self.read_u8(address.wrapping_add(i as u32)))
            .collect()
    }

    #[inline(always)]
    fn word_index(&self, index: u32) -> usize {
        (index & (self.byte_mask >> 2)) as usize
    }

    #[inline(always)]
    fn half_index(&self, index: u32) -> usize {
        (index & (self.byte_mask >> 1)) as usize
    }
}

impl Rdram for VecRdram {
    fn read_u8(&self, address: u32) -> u8 {
        let address = address & self.byte_mask;
        let word = self.words[(address >> 2) as usize];
        (word >> (((address & 3) ^ 3) << 3)) as u8
    }

    fn read_u16(&self, index: u32) -> u16 {
        let index = self.half_index(index) as u32;
        let word = self.words[(index >> 1) as usize];
        (word >> (((index & 1) ^ 1) << 4)) as u16
    }

    fn read_u32(&self, index: u32) -> u32 {
        self.words[self.word_index(index)]
    }

    fn write_u8(&mut self, address: u32, value: u8) {
        let address = address & self.byte_mask;
        let shift = ((address & 3) ^ 3) << 3;
        let word = &mut self.words[(address >> 2) as usize];
        *word = (*word & !(0xff << shift)) | ((value as u32) << shift);
    }

    fn write_u16(&mut self, index: u32, value: u16) {
        let index = self.half_index(index) as u32;
        let shift = ((index & 1) ^ 1) << 4;
        let word = &mut self.words[(index >> 1) as usize];
        *word = (*word & !(0xffff << shift)) | ((value as u32) << shift);
    }

    fn write_u32(&mut self, index: u32, value: u32) {
        let index = self.word_index(index);
        self.words[index] = value;
    }

    fn read_hidden(&self, index: u32) -> u8 {
        self.hidden[self.half_index(index)]
    }

    fn write_hidden(&mut self, index: u32, value: u8) {
        let index = self.half_index(index);
        self.hidden[index] = value & 3;
    }
}

/// Pseudo-random source for dither noise and alpha-compare thresholds
pub trait NoiseSource {
    /// Next value in the stream (only the low 15 bits are meaningful)
    fn next_value(&mut self) -> i32;
}

/// Linear congruential generator matching the classic MSVC `rand()`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcgNoise {
    seed: u32,
}

impl LcgNoise {
    /// Create a generator from a seed
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl NoiseSource for LcgNoise {
    fn next_value(&mut self) -> i32 {
        self.seed = self.seed.wrapping_mul(0x343fd).wrapping_add(0x269ec3);
        ((self.seed >> 16) & 0x7fff) as i32
    }
}

/// Notification hook for RDRAM regions read by load commands
pub trait TraceSink {
    /// `address` is a word index, `length` the span length in pixels
    fn write_rdram(&mut self, address: u32, length: u32);
}

/// Trace sink that reports every load span through `log::debug!`
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTraceSink;

impl TraceSink for LogTraceSink {
    fn write_rdram(&mut self, address: u32, length: u32) {
        log::debug!(
            "RDP load span: RDRAM 0x{:06x}, {} pixels",
            address << 2,
            length
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order_is_big_endian() {
        let mut ram = VecRdram::new(0x1000);
        ram.write_u32(0, 0x1122_3344);

        assert_eq!(ram.read_u8(0), 0x11);
        assert_eq!(ram.read_u8(3), 0x44);
        assert_eq!(ram.read_u16(0), 0x1122);
        assert_eq!(ram.read_u16(1), 0x3344);
    }

    #[test]
    fn test_halfword_write_preserves_neighbour() {
        let mut ram = VecRdram::new(0x1000);
        ram.write_u32(1, 0xaaaa_bbbb);
        ram.write_u16(3, 0x1234);
        assert_eq!(ram.read_u32(1), 0xaaaa_1234);

        ram.write_u8(4, 0x55);
        assert_eq!(ram.read_u32(1), 0x55aa_1234);
    }

    #[test]
    fn test_addresses_wrap_at_store_size() {
        let mut ram = VecRdram::new(0x1000);
        ram.write_u8(0x1000, 0x7f);
        assert_eq!(ram.read_u8(0), 0x7f);
        assert_eq!(ram.read_u32(0x400), 0x7f00_0000);
    }

    #[test]
    fn test_hidden_bits() {
        let mut ram = VecRdram::new(0x1000);
        ram.pair_write16(5, 0xbeef, 3);
        assert_eq!(ram.pair_read16(5), (0xbeef, 3));

        ram.pair_write32(4, 0x0102_0304, 1, 2);
        assert_eq!(ram.read_hidden(8), 1);
        assert_eq!(ram.read_hidden(9), 2);

        // Even bytes leave the hidden bits alone
        ram.pair_write8(20, 0xff, 3);
        assert_eq!(ram.read_hidden(10), 0);
        ram.pair_write8(21, 0xff, 3);
        assert_eq!(ram.read_hidden(10), 3);
    }

    #[test]
    fn test_load_and_dump_bytes() {
        let mut ram = VecRdram::new(0x1000);
        ram.load_bytes(0x10, &[1, 2, 3, 4, 5]);
        assert_eq!(ram.dump_bytes(0x10, 5), vec![1, 2, 3, 4, 5]);
        assert_eq!(ram.read_u32(4), 0x0102_0304);
    }

    #[test]
    fn test_lcg_is_deterministic() {
        let mut a = LcgNoise::new(99);
        let mut b = LcgNoise::new(99);
        for _ in 0..16 {
            let v = a.next_value();
            assert_eq!(v, b.next_value());
            assert!((0..=0x7fff).contains(&v));
        }
    }

    #[test]
    fn test_lcg_first_value() {
        // seed 0 -> 0x269ec3 -> (0x269ec3 >> 16) & 0x7fff = 0x26
        let mut lcg = LcgNoise::new(0);
        assert_eq!(lcg.next_value(), 0x26);
    }
}

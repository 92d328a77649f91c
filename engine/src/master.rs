//! # Bit-Bang SPI Master
//!
//! Drives a [`SerialSlave`] edge by edge the way a mode-0 host controller
//! would: MOSI changes with the falling clock (or with chip-select assertion
//! for the first bit) and MISO is sampled just before each rising edge, i.e.
//! from the slave's output after the preceding falling edge.
//!
//! ```text
//! CS   ‾‾\________________________________/‾‾
//! SCK  ____/‾\_/‾\_/‾\_ ... _/‾\_/‾\__________
//! MOSI    b0  b1  b2          bn-2 bn-1
//! MISO  ▲ sampled before each rising edge
//! ```
//!
//! Words are at most 64 bits and go out MSB first.

use crate::config::{EngineConfig, FrameLayout, Polarity};
use crate::frame::Transaction;
use crate::traits::SerialSlave;

/// Mode-0 master used to exercise engines and boards
#[derive(Debug, Clone)]
pub struct BitBangMaster {
    chip_select: Polarity,
    clocks: u64,
}

impl BitBangMaster {
    /// Create a master driving chip-select with `chip_select` polarity
    pub const fn new(chip_select: Polarity) -> Self {
        Self {
            chip_select,
            clocks: 0,
        }
    }

    /// Master matching an engine configuration
    pub const fn for_config(config: &EngineConfig) -> Self {
        Self::new(config.chip_select)
    }

    /// Clock cycles issued so far
    #[inline]
    pub const fn clocks(&self) -> u64 {
        self.clocks
    }

    /// Shift one word in a single chip-select assertion
    ///
    /// Returns the `bits` sampled on MISO, first sample in the MSB.
    pub fn transfer<S: SerialSlave + ?Sized>(&mut self, slave: &mut S, word: u64, bits: u8) -> u64 {
        let miso = slave.edge(self.chip_select.active_level(), false, msb(word, bits));
        let (sampled, _) = self.shift(slave, word, bits, miso);
        self.deselect(slave);
        sampled
    }

    /// Run one frame and return the data phase sampled on MISO
    pub fn frame<S: SerialSlave + ?Sized>(
        &mut self,
        slave: &mut S,
        layout: &FrameLayout,
        txn: &Transaction,
    ) -> u32 {
        let sampled = self.transfer(slave, txn.to_word(layout), layout.frame_len());
        sampled as u32 & layout.data_mask()
    }

    /// Write `data` to `address`; returns the value read back in the same frame
    pub fn write<S: SerialSlave + ?Sized>(
        &mut self,
        slave: &mut S,
        layout: &FrameLayout,
        address: u8,
        data: u32,
    ) -> u32 {
        self.frame(slave, layout, &Transaction::write(address, data))
    }

    /// Read `address`
    pub fn read<S: SerialSlave + ?Sized>(
        &mut self,
        slave: &mut S,
        layout: &FrameLayout,
        address: u8,
    ) -> u32 {
        self.frame(slave, layout, &Transaction::read(address))
    }

    /// Shift the first `clocks` bits of a `bits`-wide word, then release
    /// chip-select early
    pub fn abort_after<S: SerialSlave + ?Sized>(
        &mut self,
        slave: &mut S,
        word: u64,
        bits: u8,
        clocks: u8,
    ) -> u64 {
        let clocks = clocks.min(bits);
        self.transfer(slave, word >> (bits - clocks), clocks)
    }

    /// Shift several `bits`-wide words back to back in one assertion
    ///
    /// One idle clock separates consecutive words. Sampled words are written
    /// to `out` as far as it reaches.
    pub fn burst<S: SerialSlave + ?Sized>(
        &mut self,
        slave: &mut S,
        words: &[u64],
        bits: u8,
        out: &mut [u64],
    ) {
        let Some(&first) = words.first() else {
            return;
        };
        let active = self.chip_select.active_level();
        let mut miso = slave.edge(active, false, msb(first, bits));
        for (n, &word) in words.iter().enumerate() {
            if n > 0 {
                slave.edge(active, true, false);
                miso = slave.edge(active, false, msb(word, bits));
                self.clocks += 1;
            }
            let (sampled, next) = self.shift(slave, word, bits, miso);
            miso = next;
            if let Some(slot) = out.get_mut(n) {
                *slot = sampled;
            }
        }
        self.deselect(slave);
    }

    /// Toggle the clock with chip-select released
    pub fn idle<S: SerialSlave + ?Sized>(&mut self, slave: &mut S, clocks: u32, data_in: bool) {
        let idle = self.chip_select.idle_level();
        for _ in 0..clocks {
            slave.edge(idle, true, data_in);
            slave.edge(idle, false, data_in);
            self.clocks += 1;
        }
    }

    fn shift<S: SerialSlave + ?Sized>(
        &mut self,
        slave: &mut S,
        word: u64,
        bits: u8,
        mut miso: bool,
    ) -> (u64, bool) {
        let active = self.chip_select.active_level();
        let mut sampled = 0u64;
        for i in (0..bits).rev() {
            sampled = (sampled << 1) | miso as u64;
            slave.edge(active, true, (word >> i) & 1 != 0);
            let next = i > 0 && (word >> (i - 1)) & 1 != 0;
            miso = slave.edge(active, false, next);
            self.clocks += 1;
        }
        (sampled, miso)
    }

    fn deselect<S: SerialSlave + ?Sized>(&mut self, slave: &mut S) {
        slave.edge(self.chip_select.idle_level(), false, false);
    }
}

/// First bit of a `bits`-wide word
#[inline]
fn msb(word: u64, bits: u8) -> bool {
    bits > 0 && (word >> (bits - 1)) & 1 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every edge and echoes MOSI back delayed by one edge
    struct Recorder {
        edges: heapless::Vec<(bool, bool, bool), 160>,
        last: bool,
    }

    impl SerialSlave for Recorder {
        fn edge(&mut self, chip_select: bool, clock: bool, data_in: bool) -> bool {
            self.edges.push((chip_select, clock, data_in)).unwrap();
            let out = self.last;
            self.last = data_in;
            out
        }
    }

    fn recorder() -> Recorder {
        Recorder {
            edges: heapless::Vec::new(),
            last: false,
        }
    }

    #[test]
    fn test_transfer_edge_sequence() {
        let mut master = BitBangMaster::new(Polarity::ActiveLow);
        let mut slave = recorder();
        master.transfer(&mut slave, 0b101, 3);

        assert_eq!(
            slave.edges.as_slice(),
            &[
                (false, false, true),
                (false, true, true),
                (false, false, false),
                (false, true, false),
                (false, false, true),
                (false, true, true),
                (false, false, false),
                (true, false, false),
            ]
        );
        assert_eq!(master.clocks(), 3);
    }

    #[test]
    fn test_abort_after_sends_leading_bits() {
        let mut master = BitBangMaster::new(Polarity::ActiveHigh);
        let mut slave = recorder();
        master.abort_after(&mut slave, 0b1100_0000, 8, 2);
        let rising: heapless::Vec<bool, 8> = slave
            .edges
            .iter()
            .filter(|(_, clk, _)| *clk)
            .map(|(_, _, d)| *d)
            .collect();
        assert_eq!(rising.as_slice(), &[true, true]);
        assert_eq!(slave.edges.last(), Some(&(false, false, false)));
    }

    #[test]
    fn test_burst_inserts_guard_clock() {
        let mut master = BitBangMaster::new(Polarity::ActiveLow);
        let mut slave = recorder();
        let mut out = [0u64; 2];
        master.burst(&mut slave, &[0b11, 0b10], 2, &mut out);
        assert_eq!(master.clocks(), 5);
        // chip-select stays asserted until the end
        let asserted = slave.edges.iter().filter(|(cs, _, _)| !*cs).count();
        assert_eq!(asserted, slave.edges.len() - 1);
    }
}

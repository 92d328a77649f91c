//! Downstream device models
//!
//! The chips behind the relays are all plain shift registers as far as the
//! serial bus can tell: they shift on the rising clock while selected, show
//! their MSB on the serial output and copy the shifted word into the output
//! latch when the select drops (the rising edge of LE). An aborted frame
//! releases the select without latching.

use mirny_engine::SerialDevice;

/// Bits in one PLL register write
pub const PLL_WIDTH: u8 = 32;

/// Bits in one attenuator word
pub const ATTENUATOR_WIDTH: u8 = 8;

/// Bits in one Almazny shift register
pub const ALMAZNY_WIDTH: u8 = 8;

/// N-bit shift register with serial output and an output latch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRegisterDevice {
    width: u8,
    shift: u64,
    latched: u64,
    latch_count: u32,
    select: bool,
    clock: bool,
}

impl ShiftRegisterDevice {
    /// Create a device `width` bits wide (at most 64)
    pub const fn new(width: u8) -> Self {
        Self {
            width: if width > 64 { 64 } else { width },
            shift: 0,
            latched: 0,
            latch_count: 0,
            select: false,
            clock: false,
        }
    }

    /// PLL model
    pub const fn pll() -> Self {
        Self::new(PLL_WIDTH)
    }

    /// Attenuator model
    pub const fn attenuator() -> Self {
        Self::new(ATTENUATOR_WIDTH)
    }

    /// One shift register of the Almazny mezzanine
    pub const fn almazny() -> Self {
        Self::new(ALMAZNY_WIDTH)
    }

    /// Register width in bits
    #[inline]
    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Word currently in the shift register
    #[inline]
    pub const fn shifted(&self) -> u64 {
        self.shift
    }

    /// Word captured by the last latch
    #[inline]
    pub const fn latched(&self) -> u64 {
        self.latched
    }

    /// Number of latch events seen
    #[inline]
    pub const fn latch_count(&self) -> u32 {
        self.latch_count
    }

    /// Whether the device's select is asserted
    #[inline]
    pub const fn is_selected(&self) -> bool {
        self.select
    }

    /// Preload the shift register, e.g. with readback data
    pub fn load(&mut self, word: u64) {
        self.shift = word & self.mask();
    }

    /// Level on the serial output
    #[inline]
    pub const fn serial_out(&self) -> bool {
        self.width > 0 && (self.shift >> (self.width - 1)) & 1 != 0
    }

    const fn mask(&self) -> u64 {
        if self.width >= 64 {
            u64::MAX
        } else {
            (1u64 << self.width) - 1
        }
    }
}

impl SerialDevice for ShiftRegisterDevice {
    fn clock(&mut self, select: bool, clock: bool, data_in: bool) -> bool {
        if select && clock && !self.clock {
            self.shift = ((self.shift << 1) | data_in as u64) & self.mask();
        }
        if self.select && !select {
            self.latched = self.shift;
            self.latch_count += 1;
        }
        self.select = select;
        self.clock = clock;
        self.serial_out()
    }

    fn abort(&mut self) {
        self.select = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift_in(device: &mut ShiftRegisterDevice, word: u64, bits: u8) {
        for i in (0..bits).rev() {
            let bit = (word >> i) & 1 != 0;
            device.clock(true, true, bit);
            device.clock(true, false, bit);
        }
    }

    #[test]
    fn test_latches_when_select_drops() {
        let mut device = ShiftRegisterDevice::attenuator();
        shift_in(&mut device, 0xA5, 8);
        assert_eq!(device.shifted(), 0xA5);
        assert_eq!(device.latched(), 0);

        device.clock(false, false, false);
        assert_eq!(device.latched(), 0xA5);
        assert_eq!(device.latch_count(), 1);
    }

    #[test]
    fn test_abort_skips_latch() {
        let mut device = ShiftRegisterDevice::attenuator();
        shift_in(&mut device, 0x0F, 5);
        device.abort();
        device.clock(false, false, false);
        assert_eq!(device.latch_count(), 0);
        assert_eq!(device.latched(), 0);
        assert!(!device.is_selected());
    }

    #[test]
    fn test_keeps_last_width_bits() {
        let mut device = ShiftRegisterDevice::almazny();
        shift_in(&mut device, 0x12_34, 16);
        device.clock(false, false, false);
        assert_eq!(device.latched(), 0x34);
    }

    #[test]
    fn test_ignores_clock_while_deselected() {
        let mut device = ShiftRegisterDevice::pll();
        device.clock(false, true, true);
        device.clock(false, false, true);
        assert_eq!(device.shifted(), 0);
        assert_eq!(device.latch_count(), 0);
    }

    #[test]
    fn test_serial_out_is_msb() {
        let mut device = ShiftRegisterDevice::pll();
        device.load(0x8000_0001);
        assert!(device.serial_out());
        assert!(!device.clock(true, true, false));
        device.clock(true, false, false);
        shift_in(&mut device, 0, 30);
        assert!(device.serial_out());
    }
}

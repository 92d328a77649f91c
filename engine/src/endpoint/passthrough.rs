//! Pass-through relay to a downstream SPI device
//!
//! The relay forwards the serial clock at all times. Data-in is gated by the
//! local select unless the relay is in fan-out mode. The local select is
//! registered: it only changes at the read-request instant (and drops when
//! the frame ends), so address bits shifting past a matching pattern never
//! glitch the device's select line.
//!
//! An aborted frame drops the select too, but flags the abort so the device
//! discards its partial word instead of latching it.

use super::Cycle;
use crate::traits::SerialDevice;

/// Relay endpoint for one downstream device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PassThroughEndpoint {
    fan_out: bool,
    local_select: bool,
    clock: bool,
    data_in: bool,
    device_out: bool,
    aborted: bool,
}

impl PassThroughEndpoint {
    /// Relay whose data-in is masked outside its data phase
    pub const fn new() -> Self {
        Self {
            fan_out: false,
            local_select: false,
            clock: false,
            data_in: false,
            device_out: false,
            aborted: false,
        }
    }

    /// Relay that forwards data-in unconditionally
    ///
    /// Used where several devices share one data line and must all see it.
    pub const fn fan_out() -> Self {
        let mut relay = Self::new();
        relay.fan_out = true;
        relay
    }

    /// Whether data-in is forwarded unconditionally
    #[inline]
    pub const fn is_fan_out(&self) -> bool {
        self.fan_out
    }

    /// Local chip-select, asserted during the matched data phase
    #[inline]
    pub const fn local_select(&self) -> bool {
        self.local_select
    }

    /// Latch-enable line of the device (inverse of the local select)
    ///
    /// Its rising edge at the end of the data phase latches the shifted word.
    #[inline]
    pub const fn latch_enable(&self) -> bool {
        !self.local_select
    }

    /// Serial clock forwarded to the device
    #[inline]
    pub const fn serial_clock(&self) -> bool {
        self.clock
    }

    /// Serial data-in forwarded to the device
    #[inline]
    pub const fn serial_data_in(&self) -> bool {
        self.data_in
    }

    /// Last level reported on the device's serial output
    #[inline]
    pub const fn serial_data_out(&self) -> bool {
        self.device_out
    }

    /// Feed the device's serial output back into the relay
    #[inline]
    pub fn set_serial_data_out(&mut self, level: bool) {
        self.device_out = level;
    }

    /// Whether the selected frame was aborted and the device not yet told
    #[inline]
    pub const fn abort_pending(&self) -> bool {
        self.aborted
    }

    /// Consume a pending abort
    pub fn take_abort(&mut self) -> bool {
        core::mem::take(&mut self.aborted)
    }

    /// Clock a device model with the relayed lines and capture its output
    pub fn drive<D: SerialDevice + ?Sized>(&mut self, device: &mut D) {
        if self.take_abort() {
            device.abort();
        }
        self.device_out = device.clock(self.local_select, self.clock, self.data_in);
    }

    /// Level driven onto the engine's output line while selected
    #[inline]
    pub const fn output(&self) -> Option<bool> {
        if self.local_select {
            Some(self.device_out)
        } else {
            None
        }
    }

    pub(super) fn on_transaction(&mut self, cycle: &Cycle, selected: bool) {
        match *cycle {
            Cycle::AddressKnown { .. } => {
                self.local_select = selected;
                self.aborted = false;
            }
            Cycle::Release => self.local_select = false,
            Cycle::Abort => {
                self.aborted = self.local_select;
                self.local_select = false;
            }
            Cycle::Lines { clock, data_in } => {
                self.clock = clock;
                self.data_in = data_in && (self.fan_out || self.local_select);
            }
            Cycle::Commit(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_latches_at_address_known() {
        let mut relay = PassThroughEndpoint::new();
        relay.on_transaction(&Cycle::AddressKnown { address: 4 }, true);
        assert!(relay.local_select());
        assert!(!relay.latch_enable());

        relay.on_transaction(&Cycle::Release, false);
        assert!(!relay.local_select());
        assert!(relay.latch_enable());
    }

    /// Counts latch and abort notifications
    #[derive(Default)]
    struct Latch {
        select: bool,
        latches: u32,
        aborts: u32,
    }

    impl SerialDevice for Latch {
        fn clock(&mut self, select: bool, _clock: bool, _data_in: bool) -> bool {
            if self.select && !select {
                self.latches += 1;
            }
            self.select = select;
            false
        }

        fn abort(&mut self) {
            self.aborts += 1;
            self.select = false;
        }
    }

    #[test]
    fn test_abort_suppresses_device_latch() {
        let mut relay = PassThroughEndpoint::new();
        let mut device = Latch::default();
        relay.on_transaction(&Cycle::AddressKnown { address: 4 }, true);
        relay.drive(&mut device);
        assert!(device.select);

        relay.on_transaction(&Cycle::Abort, false);
        assert!(!relay.local_select());
        assert!(relay.abort_pending());
        relay.drive(&mut device);
        assert_eq!((device.latches, device.aborts), (0, 1));
        assert!(!relay.abort_pending());

        // a completed frame still latches
        relay.on_transaction(&Cycle::AddressKnown { address: 4 }, true);
        relay.drive(&mut device);
        relay.on_transaction(&Cycle::Release, false);
        relay.drive(&mut device);
        assert_eq!((device.latches, device.aborts), (1, 1));
    }

    #[test]
    fn test_abort_of_unselected_relay_is_not_flagged() {
        let mut relay = PassThroughEndpoint::new();
        relay.on_transaction(&Cycle::Abort, false);
        assert!(!relay.abort_pending());
    }

    #[test]
    fn test_data_in_masked_until_selected() {
        let mut relay = PassThroughEndpoint::new();
        let lines = Cycle::Lines {
            clock: true,
            data_in: true,
        };
        relay.on_transaction(&lines, false);
        assert!(relay.serial_clock());
        assert!(!relay.serial_data_in());

        relay.on_transaction(&Cycle::AddressKnown { address: 4 }, true);
        relay.on_transaction(&lines, false);
        assert!(relay.serial_data_in());
    }

    #[test]
    fn test_fan_out_forwards_data_in() {
        let mut relay = PassThroughEndpoint::fan_out();
        relay.on_transaction(
            &Cycle::Lines {
                clock: false,
                data_in: true,
            },
            false,
        );
        assert!(relay.serial_data_in());
        assert!(!relay.local_select());
    }

    #[test]
    fn test_output_only_while_selected() {
        let mut relay = PassThroughEndpoint::new();
        relay.set_serial_data_out(true);
        assert_eq!(relay.output(), None);
        relay.on_transaction(&Cycle::AddressKnown { address: 4 }, true);
        assert_eq!(relay.output(), Some(true));
    }

    #[test]
    fn test_unrelated_address_does_not_select() {
        let mut relay = PassThroughEndpoint::new();
        relay.on_transaction(&Cycle::AddressKnown { address: 9 }, false);
        assert!(!relay.local_select());
    }
}

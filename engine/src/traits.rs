//! # Serial Line Abstractions
//!
//! Two seams separate the engine from the world around it:
//!
//! - **SerialSlave**: anything a bus master can clock edge by edge (the engine
//!   itself, or a whole board built around it)
//! - **SerialDevice**: a downstream chip sitting behind a pass-through relay
//!
//! ```text
//! BitBangMaster ──CS/SCK/SDI──► SerialSlave ──select/SCK/SDI──► SerialDevice
//!               ◄────SDO──────              ◄──────SDO─────────
//! ```

/// A synchronous-serial slave driven one line update at a time
pub trait SerialSlave {
    /// Present the line levels after one edge and return the slave's output
    ///
    /// Levels are raw: `chip_select` is the electrical level, interpreted by
    /// the slave's configured polarity. The returned bit is the output after
    /// the edge, which a mode-0 master samples at the next rising clock.
    fn edge(&mut self, chip_select: bool, clock: bool, data_in: bool) -> bool;
}

/// A downstream device clocked through a pass-through relay
pub trait SerialDevice {
    /// Present the relayed lines and return the device's serial output
    ///
    /// `select` is true while the relay's local chip-select is asserted. The
    /// device latches its word on the falling transition of `select`.
    fn clock(&mut self, select: bool, clock: bool, data_in: bool) -> bool;

    /// The frame in progress was aborted
    ///
    /// Called before the next `clock`, which presents `select` already
    /// released. The device must not latch the partial word.
    fn abort(&mut self) {}
}

impl<T: SerialDevice + ?Sized> SerialDevice for &mut T {
    fn clock(&mut self, select: bool, clock: bool, data_in: bool) -> bool {
        (**self).clock(select, clock, data_in)
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

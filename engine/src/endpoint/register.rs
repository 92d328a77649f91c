//! Configuration and status registers

use serde::{Deserialize, Serialize};

use super::Cycle;

/// Access kind of a register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Reads the external status source, ignores writes
    ReadOnly,
    /// Stores writes, reads the external status source
    WriteOnly,
    /// Stores writes and reads them back
    ReadWrite,
}

/// An internal register endpoint
///
/// The stored value changes only on a write-commit (or through [`write`]
/// from the surrounding system). The value shifted out during a frame is the
/// one latched at the read-request instant, before that frame's own commit.
///
/// [`write`]: RegisterEndpoint::write
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterEndpoint {
    width: u8,
    access: Access,
    stored: u32,
    status: u32,
}

impl RegisterEndpoint {
    /// Create a register of `width` bits; all bits start cleared
    pub const fn new(width: u8, access: Access) -> Self {
        Self {
            width,
            access,
            stored: 0,
            status: 0,
        }
    }

    /// Status register driven by the surrounding system
    pub const fn read_only(width: u8) -> Self {
        Self::new(width, Access::ReadOnly)
    }

    /// Configuration register without read-back
    pub const fn write_only(width: u8) -> Self {
        Self::new(width, Access::WriteOnly)
    }

    /// Configuration register with read-back
    pub const fn read_write(width: u8) -> Self {
        Self::new(width, Access::ReadWrite)
    }

    /// Register width in bits
    #[inline]
    pub const fn width(&self) -> u8 {
        self.width
    }

    /// Access kind
    #[inline]
    pub const fn access(&self) -> Access {
        self.access
    }

    /// Bits covered by the register
    #[inline]
    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    /// Value presented on a read
    pub const fn read(&self) -> u32 {
        match self.access {
            Access::ReadWrite => self.stored,
            Access::ReadOnly | Access::WriteOnly => self.status,
        }
    }

    /// Committed configuration value
    #[inline]
    pub const fn stored(&self) -> u32 {
        self.stored
    }

    /// Commit a value, truncated to the register width
    ///
    /// Ignored for read-only registers.
    pub fn write(&mut self, value: u32) {
        if self.access != Access::ReadOnly {
            self.stored = value & self.mask();
        }
    }

    /// Update the external status source
    pub fn set_status(&mut self, value: u32) {
        self.status = value & self.mask();
    }

    pub(super) fn on_transaction(&mut self, cycle: &Cycle, selected: bool) -> Option<u32> {
        if !selected {
            return None;
        }
        match cycle {
            Cycle::AddressKnown { .. } => Some(self.read()),
            Cycle::Commit(txn) if txn.write_enable => {
                self.write(txn.data);
                None
            }
            _ => None,
        }
    }
}

//! # Engine Configuration
//!
//! Every historical protocol revision differs only in frame widths, the
//! chip-select polarity and whether several frames may share one chip-select
//! assertion. These are captured once in an [`EngineConfig`] so the shift
//! engine never branches on a revision number.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::{ADDRESS_WIDTH, MAX_DATA_WIDTH};

/// Active level of the chip-select line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    /// Line low selects the engine (CSN)
    ActiveLow,
    /// Line high selects the engine
    ActiveHigh,
}

impl Polarity {
    /// Whether `level` on the line means "selected"
    #[inline]
    pub const fn is_active(self, level: bool) -> bool {
        match self {
            Polarity::ActiveLow => !level,
            Polarity::ActiveHigh => level,
        }
    }

    /// Line level that selects the engine
    #[inline]
    pub const fn active_level(self) -> bool {
        matches!(self, Polarity::ActiveHigh)
    }

    /// Line level that deselects the engine
    #[inline]
    pub const fn idle_level(self) -> bool {
        !self.active_level()
    }
}

/// How frames are delimited inside one chip-select assertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Framing {
    /// One frame per assertion; extra clocks only reach pass-through devices
    Single,
    /// Back-to-back frames separated by exactly one idle clock
    Continuous,
}

/// Field widths of one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameLayout {
    /// Address field width in bits
    pub address_width: u8,
    /// Data field width in bits
    pub data_width: u8,
}

impl FrameLayout {
    /// Canonical layout: 7-bit address, write-enable, 16-bit data
    pub const CANONICAL: Self = Self {
        address_width: ADDRESS_WIDTH,
        data_width: 16,
    };

    /// Create a layout, rejecting widths the shift chain cannot hold
    pub const fn new(address_width: u8, data_width: u8) -> Result<Self, ConfigError> {
        let layout = Self {
            address_width,
            data_width,
        };
        match layout.validate() {
            Ok(()) => Ok(layout),
            Err(e) => Err(e),
        }
    }

    /// Check the widths against the shift chain limits
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.address_width == 0
            || self.address_width > ADDRESS_WIDTH
            || self.data_width == 0
            || self.data_width > MAX_DATA_WIDTH
        {
            return Err(ConfigError::InvalidLayout {
                address_width: self.address_width,
                data_width: self.data_width,
            });
        }
        Ok(())
    }

    /// Clocks in one complete frame (address + write-enable + data)
    #[inline]
    pub const fn frame_len(&self) -> u8 {
        self.address_width + 1 + self.data_width
    }

    /// Bits of the address field
    #[inline]
    pub const fn address_mask(&self) -> u8 {
        ((1u16 << self.address_width) - 1) as u8
    }

    /// Bits of the data field
    #[inline]
    pub const fn data_mask(&self) -> u32 {
        if self.data_width >= 32 {
            u32::MAX
        } else {
            (1u32 << self.data_width) - 1
        }
    }
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::CANONICAL
    }
}

/// Known protocol revisions of the carrier gateware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ProtocolRevision {
    /// Single frame per active-low chip-select
    Rev0 = 0,
    /// Back-to-back frames within one active-low chip-select
    Rev1Streaming = 1,
    /// Single frame per active-high chip-select
    Rev2ActiveHigh = 2,
}

impl ProtocolRevision {
    /// Resolve the revision into an engine configuration
    pub const fn config(self) -> EngineConfig {
        match self {
            ProtocolRevision::Rev0 => EngineConfig {
                layout: FrameLayout::CANONICAL,
                chip_select: Polarity::ActiveLow,
                framing: Framing::Single,
            },
            ProtocolRevision::Rev1Streaming => EngineConfig {
                layout: FrameLayout::CANONICAL,
                chip_select: Polarity::ActiveLow,
                framing: Framing::Continuous,
            },
            ProtocolRevision::Rev2ActiveHigh => EngineConfig {
                layout: FrameLayout::CANONICAL,
                chip_select: Polarity::ActiveHigh,
                framing: Framing::Single,
            },
        }
    }
}

impl TryFrom<u8> for ProtocolRevision {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Rev0),
            1 => Ok(Self::Rev1Streaming),
            2 => Ok(Self::Rev2ActiveHigh),
            other => Err(ConfigError::UnknownRevision(other)),
        }
    }
}

/// Configuration of one engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineConfig {
    /// Frame field widths
    pub layout: FrameLayout,
    /// Chip-select active level
    pub chip_select: Polarity,
    /// Frame delimiting within one chip-select assertion
    pub framing: Framing,
}

impl EngineConfig {
    /// Check the configuration before building an engine
    pub const fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()
    }

    /// Same configuration with another chip-select polarity
    pub const fn with_chip_select(mut self, chip_select: Polarity) -> Self {
        self.chip_select = chip_select;
        self
    }

    /// Same configuration with another framing mode
    pub const fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }

    /// Same configuration with another data width
    pub const fn with_data_width(mut self, data_width: u8) -> Self {
        self.layout.data_width = data_width;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        ProtocolRevision::Rev0.config()
    }
}

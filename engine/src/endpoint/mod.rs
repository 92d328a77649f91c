//! # Endpoint Abstractions
//!
//! Every target behind the router is one variant of [`Endpoint`] and sees the
//! bus through the same contract: [`Endpoint::on_transaction`] is called for
//! each [`Cycle`] with a flag telling whether the endpoint's binding matches
//! the current address, and [`Endpoint::output`] reports whether it drives the
//! shared output line.
//!
//! ```text
//! ┌─────────────┬──────────────────────┬──────────────────────────────┐
//! │ Kind        │ AddressKnown         │ Lines / Release / Abort      │
//! ├─────────────┼──────────────────────┼──────────────────────────────┤
//! │ Register    │ returns read value   │ ignored                      │
//! │ PassThrough │ latches local select │ relays SCK/SDI, drops select │
//! │ Group       │ + records sub-target │ + latch strobe on release    │
//! └─────────────┴──────────────────────┴──────────────────────────────┘
//! ```

pub mod group;
pub mod passthrough;
pub mod register;

pub use group::{GroupEndpoint, GROUP_SIZE};
pub use passthrough::PassThroughEndpoint;
pub use register::{Access, RegisterEndpoint};

use crate::config::FrameLayout;
use crate::error::ConfigError;
use crate::frame::Transaction;

/// Bus activity presented to every endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Cycle {
    /// Address and write-enable just became known (read-request instant)
    AddressKnown {
        /// Captured address
        address: u8,
    },
    /// Terminal edge of a frame
    Commit(Transaction),
    /// The frame ended: chip-select released, or a packed frame reached its terminal edge
    Release,
    /// Chip-select released before the terminal edge; nothing may latch
    Abort,
    /// Serial lines after this edge, sent on every edge
    Lines {
        /// Serial clock level
        clock: bool,
        /// Raw serial data-in level
        data_in: bool,
    },
}

/// Discriminant of an [`Endpoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndpointKind {
    /// Internal register
    Register,
    /// Downstream device relay
    PassThrough,
    /// Four sub-targets behind one relay
    Group,
}

/// A target owned by the router
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    /// Configuration or status register
    Register(RegisterEndpoint),
    /// Relay to one downstream SPI device
    PassThrough(PassThroughEndpoint),
    /// Auxiliary group (Almazny)
    Group(GroupEndpoint),
}

impl Endpoint {
    /// Which kind of endpoint this is
    pub const fn kind(&self) -> EndpointKind {
        match self {
            Endpoint::Register(_) => EndpointKind::Register,
            Endpoint::PassThrough(_) => EndpointKind::PassThrough,
            Endpoint::Group(_) => EndpointKind::Group,
        }
    }

    /// Present one bus cycle
    ///
    /// `selected` is true when the endpoint's binding matches the cycle's
    /// address. Returns the value to load into the output chain when the
    /// endpoint answers a read-request.
    pub fn on_transaction(&mut self, cycle: &Cycle, selected: bool) -> Option<u32> {
        match self {
            Endpoint::Register(reg) => reg.on_transaction(cycle, selected),
            Endpoint::PassThrough(relay) => {
                relay.on_transaction(cycle, selected);
                None
            }
            Endpoint::Group(group) => {
                group.on_transaction(cycle, selected);
                None
            }
        }
    }

    /// Level this endpoint drives onto the output line, if it is the driver
    pub const fn output(&self) -> Option<bool> {
        match self {
            Endpoint::Register(_) => None,
            Endpoint::PassThrough(relay) => relay.output(),
            Endpoint::Group(group) => group.link().output(),
        }
    }

    /// Check that the endpoint can live under `mask` in `layout`
    pub(crate) fn validate(&self, mask: u8, layout: &FrameLayout) -> Result<(), ConfigError> {
        match self {
            Endpoint::Register(reg) if reg.width() == 0 || reg.width() > layout.data_width => {
                Err(ConfigError::WidthTooLarge {
                    width: reg.width(),
                    data_width: layout.data_width,
                })
            }
            Endpoint::Group(_) if mask & group::INDEX_MASK != 0 => {
                Err(ConfigError::GroupMask { mask })
            }
            _ => Ok(()),
        }
    }

    /// The register, if this is one
    pub fn as_register(&self) -> Option<&RegisterEndpoint> {
        match self {
            Endpoint::Register(reg) => Some(reg),
            _ => None,
        }
    }

    /// Mutable access to the register, if this is one
    pub fn as_register_mut(&mut self) -> Option<&mut RegisterEndpoint> {
        match self {
            Endpoint::Register(reg) => Some(reg),
            _ => None,
        }
    }

    /// The relay, if this is a pass-through endpoint
    pub fn as_pass_through(&self) -> Option<&PassThroughEndpoint> {
        match self {
            Endpoint::PassThrough(relay) => Some(relay),
            _ => None,
        }
    }

    /// Mutable access to the relay, if this is a pass-through endpoint
    pub fn as_pass_through_mut(&mut self) -> Option<&mut PassThroughEndpoint> {
        match self {
            Endpoint::PassThrough(relay) => Some(relay),
            _ => None,
        }
    }

    /// The group, if this is one
    pub fn as_group(&self) -> Option<&GroupEndpoint> {
        match self {
            Endpoint::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Mutable access to the group, if this is one
    pub fn as_group_mut(&mut self) -> Option<&mut GroupEndpoint> {
        match self {
            Endpoint::Group(group) => Some(group),
            _ => None,
        }
    }
}

impl From<RegisterEndpoint> for Endpoint {
    fn from(reg: RegisterEndpoint) -> Self {
        Endpoint::Register(reg)
    }
}

impl From<PassThroughEndpoint> for Endpoint {
    fn from(relay: PassThroughEndpoint) -> Self {
        Endpoint::PassThrough(relay)
    }
}

impl From<GroupEndpoint> for Endpoint {
    fn from(group: GroupEndpoint) -> Self {
        Endpoint::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_downcast() {
        let mut ep = Endpoint::from(RegisterEndpoint::read_write(8));
        assert_eq!(ep.kind(), EndpointKind::Register);
        assert!(ep.as_register_mut().is_some());
        assert!(ep.as_pass_through().is_none());

        let ep = Endpoint::from(GroupEndpoint::new());
        assert_eq!(ep.kind(), EndpointKind::Group);
        assert!(ep.as_group().is_some());
    }

    #[test]
    fn test_validate_register_width() {
        let layout = FrameLayout::CANONICAL;
        let wide = Endpoint::from(RegisterEndpoint::read_write(17));
        assert_eq!(
            wide.validate(0x0F, &layout),
            Err(ConfigError::WidthTooLarge {
                width: 17,
                data_width: 16
            })
        );
        assert!(Endpoint::from(RegisterEndpoint::read_write(16))
            .validate(0x0F, &layout)
            .is_ok());
    }

    #[test]
    fn test_validate_group_mask() {
        let layout = FrameLayout::CANONICAL;
        let group = Endpoint::from(GroupEndpoint::new());
        assert_eq!(
            group.validate(0x0F, &layout),
            Err(ConfigError::GroupMask { mask: 0x0F })
        );
        assert!(group.validate(0x0C, &layout).is_ok());
    }

    #[test]
    fn test_register_answers_read_request_only_when_selected() {
        let mut ep = Endpoint::from(RegisterEndpoint::read_write(16));
        ep.as_register_mut().unwrap().write(0x55);
        let cycle = Cycle::AddressKnown { address: 0 };
        assert_eq!(ep.on_transaction(&cycle, false), None);
        assert_eq!(ep.on_transaction(&cycle, true), Some(0x55));
        assert_eq!(ep.output(), None);
    }
}

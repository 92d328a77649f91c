//! Error types for engine configuration and register snapshots
//!
//! The wire protocol carries no acknowledgment, so nothing that happens on the
//! serial lines is an error: short frames are dropped and unmatched addresses
//! read as zero. The only fallible steps are building the address map before
//! the first edge and moving register state in or out of a snapshot.

use thiserror::Error;

/// Errors raised while building the engine or its address map
///
/// All of these are fatal configuration mistakes. They are reported before
/// any clock edge is processed and are never produced at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// The new binding's masked range intersects an existing one
    #[error("binding {pattern:#04x}/{mask:#04x} overlaps {other_pattern:#04x}/{other_mask:#04x}")]
    Overlap {
        /// Pattern of the rejected binding (already masked)
        pattern: u8,
        /// Mask of the rejected binding
        mask: u8,
        /// Pattern of the binding it collides with
        other_pattern: u8,
        /// Mask of the binding it collides with
        other_mask: u8,
    },
    /// Pattern or mask has bits outside the address field
    #[error("binding {pattern:#04x}/{mask:#04x} does not fit a {width}-bit address")]
    AddressOutOfRange {
        /// Requested pattern
        pattern: u8,
        /// Requested mask
        mask: u8,
        /// Address width of the frame layout
        width: u8,
    },
    /// No room left in the fixed-capacity binding table
    #[error("address map is full ({capacity} bindings)")]
    RegistryFull {
        /// Capacity of the binding table
        capacity: usize,
    },
    /// A register is wider than the data phase (or zero bits wide)
    #[error("register width {width} does not fit a {data_width}-bit data phase")]
    WidthTooLarge {
        /// Register width in bits
        width: u8,
        /// Data width of the frame layout
        data_width: u8,
    },
    /// A group binding must leave the two sub-target bits unmasked
    #[error("group mask {mask:#04x} masks the sub-target index bits")]
    GroupMask {
        /// Offending mask
        mask: u8,
    },
    /// Bindings cannot change once the engine has seen a clock edge
    #[error("address map is sealed after the first clock edge")]
    Sealed,
    /// Address or data width outside what the shift chain supports
    #[error("unsupported frame layout: {address_width}-bit address, {data_width}-bit data")]
    InvalidLayout {
        /// Requested address width
        address_width: u8,
        /// Requested data width
        data_width: u8,
    },
    /// Unknown protocol revision number
    #[error("unknown protocol revision {0}")]
    UnknownRevision(u8),
}

/// Errors while capturing or restoring a register snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotError {
    /// Output buffer cannot hold the encoded snapshot
    #[error("snapshot buffer too small")]
    BufferTooSmall,
    /// Encoding failed for another reason
    #[error("snapshot encoding failed")]
    Serialization,
    /// Bytes are not a valid snapshot
    #[error("snapshot decoding failed")]
    Deserialization,
    /// The snapshot was taken from an engine with another configuration
    #[error("snapshot was taken under a different engine configuration")]
    ConfigMismatch,
    /// The snapshot names a register pattern the address map does not have
    #[error("no writable register bound at {pattern:#04x}")]
    UnknownBinding {
        /// Pattern recorded in the snapshot
        pattern: u8,
    },
}

//! # Register Snapshots
//!
//! Captures the committed value of every writable register so a host can
//! checkpoint a board and bring it back later. Snapshots are encoded with
//! `postcard`, which keeps them small enough for a soft core's flash page.
//!
//! ```text
//! ┌──────────────┬────────┬───────────────────────────────┐
//! │ EngineConfig │ count  │ (pattern, value) × count      │
//! └──────────────┴────────┴───────────────────────────────┘
//! ```

use heapless::Vec;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::SnapshotError;
use crate::MAX_BINDINGS;

/// Upper bound on an encoded snapshot, in bytes
pub const MAX_SNAPSHOT_SIZE: usize = 8 + MAX_BINDINGS * 6;

/// Stored value of one register, keyed by its binding pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegisterState {
    /// Pattern of the register's binding
    pub pattern: u8,
    /// Committed value
    pub value: u32,
}

/// Register state of one engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Configuration of the engine the snapshot was taken from
    pub config: EngineConfig,
    /// Writable registers in binding order
    pub registers: Vec<RegisterState, MAX_BINDINGS>,
}

impl Snapshot {
    /// Empty snapshot for an engine with `config`
    pub const fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registers: Vec::new(),
        }
    }

    /// Serialize the snapshot into `buffer` using postcard
    pub fn serialize<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a [u8], SnapshotError> {
        match postcard::to_slice(self, buffer) {
            Ok(bytes) => Ok(bytes),
            Err(postcard::Error::SerializeBufferFull) => Err(SnapshotError::BufferTooSmall),
            Err(_) => Err(SnapshotError::Serialization),
        }
    }

    /// Deserialize a snapshot from bytes
    pub fn deserialize(data: &[u8]) -> Result<Self, SnapshotError> {
        postcard::from_bytes(data).map_err(|_| SnapshotError::Deserialization)
    }

    /// Stored value recorded for `pattern`
    pub fn value(&self, pattern: u8) -> Option<u32> {
        self.registers
            .iter()
            .find(|r| r.pattern == pattern)
            .map(|r| r.value)
    }
}

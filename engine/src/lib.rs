//! # Mirny Protocol Engine
//!
//! This crate models the serial control plane of the Mirny synthesizer carrier:
//!
//! - **Frame Engine**: MSB-first, SPI mode 0 deserializer/serializer
//! - **Address Router**: masked address bindings, checked disjoint at registration
//! - **Endpoints**: registers, pass-through relays and the Almazny group
//!
//! ## Architecture
//!
//! ```text
//!  CS/SCK/SDI ──► ShiftState ──► Router ──► Endpoint (register, relay, group)
//!                     ▲                          │
//!                     └──── output chain ◄───────┘
//!        SDO ◄────────┘
//! ```
//!
//! ## Frame Format
//!
//! ```text
//! ┌───────────┬────┬──────────────────────┐
//! │  Address  │ WE │         Data         │
//! │  7 bits   │ 1  │  N bits (N <= 32)    │
//! └───────────┴────┴──────────────────────┘
//! ```
//!
//! The engine advances once per clock edge passed to [`Engine::on_clock_edge`].
//! Every edge is computed from the prior state and committed at once, so a read
//! issued in the same frame as a write always observes the old value.

#![cfg_attr(not(feature = "std"), no_std)]

pub mod config;
pub mod endpoint;
pub mod engine;
pub mod error;
pub mod frame;
pub mod master;
pub mod router;
pub mod snapshot;
pub mod traits;

// Re-export main types for convenience
pub use config::{EngineConfig, FrameLayout, Framing, Polarity, ProtocolRevision};
pub use endpoint::{
    Access, Endpoint, EndpointKind, GroupEndpoint, PassThroughEndpoint, RegisterEndpoint,
};
pub use engine::{Engine, EngineStats};
pub use error::{ConfigError, SnapshotError};
pub use frame::{FrameEvent, Phase, ShiftState, Transaction};
pub use master::BitBangMaster;
pub use router::{Binding, Router};
pub use snapshot::Snapshot;
pub use traits::{SerialDevice, SerialSlave};

/// Library version for protocol compatibility checks
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Width of the address field on the wire
pub const ADDRESS_WIDTH: u8 = 7;

/// Widest data phase the shift chain can hold
pub const MAX_DATA_WIDTH: u8 = 32;

/// Maximum number of address bindings a router can hold
pub const MAX_BINDINGS: usize = 16;

/// Protocol revision reported in bits 3:2 of the canonical board status register
pub const PROTO_REV: u8 = 0;

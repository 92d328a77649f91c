//! # Mirny Board Model
//!
//! Host-side model of the Mirny carrier built on `mirny-engine`. It provides:
//!
//! - Board assembly with the canonical address map
//! - Shift-register models of the PLLs, attenuators and the Almazny mezzanine
//! - JSON board descriptions
//! - Register snapshots for save / restore
//!
//! ## Wiring
//!
//! ```text
//! ┌────────────┐  CS/SCK/SDI  ┌──────────────────────────────────────────┐
//! │   Master   │─────────────►│                  Board                   │
//! │ (bit-bang) │◄─────────────│  Engine ──► relays ──► PLL ×4            │
//! └────────────┘     SDO      │                    ──► attenuator ×4     │
//!                             │         ──► group  ──► Almazny ×4        │
//!                             └──────────────────────────────────────────┘
//! ```
//!
//! ```ignore
//! let mut board = Board::from_json(r#"{"mezzanine":"Almazny"}"#)?;
//! let mut master = board.master();
//! let layout = board.engine().config().layout;
//! master.write(&mut board, &layout, CONFIG, 0x0F0);
//! ```

pub mod board;
pub mod config;
pub mod devices;
pub mod error;

pub use board::{
    status_word, Board, ATTENUATOR_BASE, CHANNELS, CONFIG, DECODE_MASK, GROUP_MASK,
    MEZZANINE_BASE, PLL_BASE, PROTO_REV_MASK, RF_SWITCH, STATUS,
};
pub use config::{BoardConfig, MezzanineMode};
pub use devices::ShiftRegisterDevice;
pub use error::{BoardError, Result};

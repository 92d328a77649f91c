//! # Board Description
//!
//! A board is described by its protocol revision, an optional explicit engine
//! configuration overriding it, the mezzanine fitted on the 12..15 decode and
//! the status word exposed in register 0.
//!
//! ```json
//! {
//!   "revision": "Rev1Streaming",
//!   "mezzanine": "Almazny",
//!   "status": 3
//! }
//! ```

use mirny_engine::{EngineConfig, ProtocolRevision};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What sits behind addresses 12..15
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MezzanineMode {
    /// Almazny: four latched shift registers behind one shared link
    Almazny,
    /// Four independent downstream devices, one relay each
    PassThrough,
}

/// Description of one Mirny board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Gateware protocol revision
    pub revision: ProtocolRevision,
    /// Explicit engine configuration, replacing the revision's
    pub protocol: Option<EngineConfig>,
    /// Mezzanine wiring
    pub mezzanine: MezzanineMode,
    /// Value read from the status register
    pub status: u16,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            revision: ProtocolRevision::Rev0,
            protocol: None,
            mezzanine: MezzanineMode::Almazny,
            status: 0,
        }
    }
}

impl BoardConfig {
    /// Board running the given protocol revision
    pub fn for_revision(revision: ProtocolRevision) -> Self {
        Self {
            revision,
            ..Self::default()
        }
    }

    /// Same board with another mezzanine
    pub fn with_mezzanine(mut self, mezzanine: MezzanineMode) -> Self {
        self.mezzanine = mezzanine;
        self
    }

    /// Engine configuration the board runs with
    pub fn engine_config(&self) -> EngineConfig {
        self.protocol.unwrap_or_else(|| self.revision.config())
    }

    /// Parse and validate a JSON board description
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.engine_config().validate()?;
        Ok(config)
    }

    /// Render the description as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

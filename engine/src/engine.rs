//! # Protocol Engine
//!
//! Ties the shift state to the router. The engine advances strictly in
//! lock-step with the serial clock passed to [`Engine::on_clock_edge`]; there
//! is no internal concurrency and nothing blocks.
//!
//! ## Edge Handling
//!
//! ```text
//! chip-select released ── Abort if in flight, else Release ──► reset shift state
//! rising clock ─────────── sample data-in
//! falling clock ────────── advance: ReadRequest → load output chain
//!                                    Complete    → write-commit
//!                                                  (+ Release when continuous)
//!                                    Restart     → next frame
//! every edge ───────────── relay lines to pass-through endpoints
//! ```
//!
//! The next state of each edge is computed from the prior state before any
//! endpoint sees it; the output level is taken after the edge has committed.

use log::{debug, trace};

use crate::config::{EngineConfig, Framing};
use crate::endpoint::{
    Access, Cycle, Endpoint, GroupEndpoint, PassThroughEndpoint, RegisterEndpoint,
};
use crate::error::{ConfigError, SnapshotError};
use crate::frame::{FrameEvent, ShiftState};
use crate::router::Router;
use crate::snapshot::{RegisterState, Snapshot};
use crate::traits::SerialSlave;

/// Counters about frames seen by the engine
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EngineStats {
    /// Frames that reached their terminal edge
    pub frames_completed: u32,
    /// Frames cut short by chip-select release
    pub frames_aborted: u32,
    /// Completed frames with write-enable set that reached a binding
    pub writes_committed: u32,
    /// Frames whose address matched no binding
    pub unmatched_frames: u32,
}

/// Serial control-plane engine
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    router: Router,
    shift: ShiftState,
    /// Chip-select was active on the previous edge
    active: bool,
    /// Clock level on the previous edge
    clock: bool,
    /// Bindings are frozen once the first edge has been seen
    sealed: bool,
    stats: EngineStats,
}

impl Engine {
    /// Create an engine with an empty address map
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            router: Router::new(config.layout),
            shift: ShiftState::new(&config.layout),
            active: false,
            clock: false,
            sealed: false,
            stats: EngineStats::default(),
        })
    }

    /// Bind an endpoint to the addresses with `address & mask == pattern`
    ///
    /// Fails if the range intersects an existing binding, or once the engine
    /// has processed its first edge.
    pub fn register_endpoint(
        &mut self,
        pattern: u8,
        mask: u8,
        endpoint: impl Into<Endpoint>,
    ) -> Result<(), ConfigError> {
        if self.sealed {
            return Err(ConfigError::Sealed);
        }
        self.router.register(pattern, mask, endpoint.into())
    }

    /// Process one update of the serial lines and return the output level
    ///
    /// `chip_select` is the raw line level; the configured polarity decides
    /// whether it selects the engine.
    pub fn on_clock_edge(&mut self, chip_select: bool, clock: bool, data_in: bool) -> bool {
        self.sealed = true;
        let active = self.config.chip_select.is_active(chip_select);
        let rising = !self.clock && clock;
        let falling = self.clock && !clock;
        self.clock = clock;

        if !active {
            if self.active {
                self.end_assertion();
            }
        } else {
            if rising {
                self.shift.sample(data_in);
            }
            if falling {
                self.falling_edge();
            }
        }
        self.active = active;

        self.router.dispatch(&Cycle::Lines { clock, data_in });
        self.data_out()
    }

    fn falling_edge(&mut self) {
        let layout = self.config.layout;
        match self.shift.advance(&layout, self.config.framing) {
            FrameEvent::None => {}
            FrameEvent::ReadRequest { address, .. } => {
                let value = self.router.dispatch(&Cycle::AddressKnown { address });
                self.shift.load(value.unwrap_or(0), &layout);
            }
            FrameEvent::Complete(txn) => {
                self.stats.frames_completed += 1;
                if self.router.resolve(txn.address).is_none() {
                    self.stats.unmatched_frames += 1;
                    debug!("frame to unbound address {:#04x} dropped", txn.address);
                } else if txn.write_enable {
                    self.stats.writes_committed += 1;
                }
                trace!(
                    "frame {:#04x} we={} data={:#x}",
                    txn.address,
                    txn.write_enable,
                    txn.data
                );
                self.router.dispatch(&Cycle::Commit(txn));
                if self.config.framing == Framing::Continuous {
                    // packed frames: relays see exactly one data phase
                    self.router.dispatch(&Cycle::Release);
                }
            }
            FrameEvent::Restart => trace!("guard clock consumed"),
        }
    }

    /// Chip-select released: drop any partial frame and return to idle
    fn end_assertion(&mut self) {
        if self.shift.in_flight() {
            self.stats.frames_aborted += 1;
            debug!(
                "frame aborted with {} edges left",
                self.shift.counter() + 1
            );
            self.router.dispatch(&Cycle::Abort);
        } else {
            self.router.dispatch(&Cycle::Release);
        }
        self.shift.reset(&self.config.layout);
    }

    /// Output line level after the last edge
    ///
    /// A selected relay drives its device's output; otherwise the MSB of the
    /// output chain is presented. Low while deselected.
    pub fn data_out(&self) -> bool {
        if !self.active {
            return false;
        }
        self.router
            .output()
            .unwrap_or_else(|| self.shift.output_bit(&self.config.layout))
    }

    /// Whether chip-select was active on the last edge
    #[inline]
    pub const fn is_selected(&self) -> bool {
        self.active
    }

    /// Engine configuration
    #[inline]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frame counters
    #[inline]
    pub const fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Current shift state
    #[inline]
    pub const fn shift_state(&self) -> &ShiftState {
        &self.shift
    }

    /// Address map
    #[inline]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Endpoint bound at `address`
    pub fn endpoint(&self, address: u8) -> Option<&Endpoint> {
        self.router.endpoint(address)
    }

    /// Mutable endpoint bound at `address`
    pub fn endpoint_mut(&mut self, address: u8) -> Option<&mut Endpoint> {
        self.router.endpoint_mut(address)
    }

    /// Register bound at `address`
    pub fn register_at(&self, address: u8) -> Option<&RegisterEndpoint> {
        self.endpoint(address).and_then(Endpoint::as_register)
    }

    /// Mutable register bound at `address`
    pub fn register_at_mut(&mut self, address: u8) -> Option<&mut RegisterEndpoint> {
        self.endpoint_mut(address).and_then(Endpoint::as_register_mut)
    }

    /// Relay bound at `address`
    pub fn pass_through_at(&self, address: u8) -> Option<&PassThroughEndpoint> {
        self.endpoint(address).and_then(Endpoint::as_pass_through)
    }

    /// Mutable relay bound at `address`
    pub fn pass_through_at_mut(&mut self, address: u8) -> Option<&mut PassThroughEndpoint> {
        self.endpoint_mut(address)
            .and_then(Endpoint::as_pass_through_mut)
    }

    /// Group bound at `address`
    pub fn group_at(&self, address: u8) -> Option<&GroupEndpoint> {
        self.endpoint(address).and_then(Endpoint::as_group)
    }

    /// Mutable group bound at `address`
    pub fn group_at_mut(&mut self, address: u8) -> Option<&mut GroupEndpoint> {
        self.endpoint_mut(address).and_then(Endpoint::as_group_mut)
    }

    /// Capture the stored value of every writable register
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new(self.config);
        for binding in self.router.bindings() {
            if let Some(reg) = binding.endpoint().as_register() {
                if reg.access() != Access::ReadOnly {
                    // capacity matches the binding table, cannot overflow
                    let _ = snapshot.registers.push(RegisterState {
                        pattern: binding.pattern(),
                        value: reg.stored(),
                    });
                }
            }
        }
        snapshot
    }

    /// Re-apply a snapshot's register values
    ///
    /// Nothing is written unless the snapshot was taken under the same
    /// configuration and every entry names a writable register.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if snapshot.config != self.config {
            return Err(SnapshotError::ConfigMismatch);
        }
        for state in &snapshot.registers {
            let writable = self
                .router
                .bindings()
                .iter()
                .filter(|b| b.pattern() == state.pattern)
                .filter_map(|b| b.endpoint().as_register())
                .any(|reg| reg.access() != Access::ReadOnly);
            if !writable {
                return Err(SnapshotError::UnknownBinding {
                    pattern: state.pattern,
                });
            }
        }
        for state in &snapshot.registers {
            for binding in self.router.bindings_mut() {
                if binding.pattern() == state.pattern {
                    if let Some(reg) = binding.endpoint_mut().as_register_mut() {
                        reg.write(state.value);
                    }
                }
            }
        }
        debug!("restored {} registers", snapshot.registers.len());
        Ok(())
    }
}

impl SerialSlave for Engine {
    fn edge(&mut self, chip_select: bool, clock: bool, data_in: bool) -> bool {
        self.on_clock_edge(chip_select, clock, data_in)
    }
}

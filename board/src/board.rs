//! # Canonical Mirny Board
//!
//! Builds the engine's address map the way the carrier is wired and hangs a
//! device model off every relay. The address decode covers the low nibble;
//! the upper three address bits are ignored.
//!
//! ```text
//! ┌─────────┬──────────────────────────────────────────────┐
//! │ Address │ Target                                       │
//! ├─────────┼──────────────────────────────────────────────┤
//! │ 0       │ status register (RO, 16 bit, proto rev 3:2)  │
//! │ 1       │ config register (RW, 12 bit)                 │
//! │ 2       │ RF-switch register (RW, 4 bit)               │
//! │ 3       │ unassigned, reads 0                          │
//! │ 4..7    │ PLL relay, one per channel                   │
//! │ 8..11   │ attenuator relay, one per channel            │
//! │ 12..15  │ Almazny group, or one mezzanine relay each   │
//! └─────────┴──────────────────────────────────────────────┘
//! ```

use log::{debug, info};
use mirny_engine::{
    BitBangMaster, Engine, EndpointKind, EngineStats, GroupEndpoint, PassThroughEndpoint,
    RegisterEndpoint, SerialDevice, SerialSlave, Snapshot, PROTO_REV,
};

use crate::config::{BoardConfig, MezzanineMode};
use crate::devices::ShiftRegisterDevice;
use crate::error::{BoardError, Result};

/// RF channels on one board
pub const CHANNELS: usize = 4;

/// Address bits decoded for registers and single relays
pub const DECODE_MASK: u8 = 0x0F;

/// Decode of the Almazny group (index bits left open)
pub const GROUP_MASK: u8 = 0x0C;

/// Status register
pub const STATUS: u8 = 0;
/// Configuration register
pub const CONFIG: u8 = 1;
/// RF-switch register
pub const RF_SWITCH: u8 = 2;
/// First PLL relay
pub const PLL_BASE: u8 = 4;
/// First attenuator relay
pub const ATTENUATOR_BASE: u8 = 8;
/// Almazny group or first mezzanine relay
pub const MEZZANINE_BASE: u8 = 12;

/// Status register bits carrying the gateware protocol revision
pub const PROTO_REV_MASK: u16 = 0x000C;
const PROTO_REV_SHIFT: u16 = 2;

/// Status word as read from the board: `status` with the protocol revision
/// in bits 2..=3
pub fn status_word(status: u16) -> u16 {
    (status & !PROTO_REV_MASK) | ((u16::from(PROTO_REV) << PROTO_REV_SHIFT) & PROTO_REV_MASK)
}

/// An assembled board: engine, address map and downstream devices
#[derive(Debug, Clone)]
pub struct Board {
    config: BoardConfig,
    engine: Engine,
    plls: [ShiftRegisterDevice; CHANNELS],
    attenuators: [ShiftRegisterDevice; CHANNELS],
    mezzanine: [ShiftRegisterDevice; CHANNELS],
}

impl Board {
    /// Assemble a board from its description
    pub fn new(config: BoardConfig) -> Result<Self> {
        let mut engine = Engine::new(config.engine_config())?;

        engine.register_endpoint(STATUS, DECODE_MASK, RegisterEndpoint::read_only(16))?;
        engine.register_endpoint(CONFIG, DECODE_MASK, RegisterEndpoint::read_write(12))?;
        engine.register_endpoint(RF_SWITCH, DECODE_MASK, RegisterEndpoint::read_write(4))?;
        for channel in 0..CHANNELS as u8 {
            engine.register_endpoint(PLL_BASE + channel, DECODE_MASK, PassThroughEndpoint::new())?;
            engine.register_endpoint(
                ATTENUATOR_BASE + channel,
                DECODE_MASK,
                PassThroughEndpoint::new(),
            )?;
        }
        match config.mezzanine {
            MezzanineMode::Almazny => {
                engine.register_endpoint(MEZZANINE_BASE, GROUP_MASK, GroupEndpoint::new())?;
            }
            MezzanineMode::PassThrough => {
                for channel in 0..CHANNELS as u8 {
                    engine.register_endpoint(
                        MEZZANINE_BASE + channel,
                        DECODE_MASK,
                        PassThroughEndpoint::new(),
                    )?;
                }
            }
        }
        if let Some(status) = engine.register_at_mut(STATUS) {
            status.set_status(u32::from(status_word(config.status)));
        }

        info!(
            "Mirny board assembled: {:?}, {:?} mezzanine, {} bindings",
            config.revision,
            config.mezzanine,
            engine.router().len()
        );

        Ok(Self {
            config,
            engine,
            plls: core::array::from_fn(|_| ShiftRegisterDevice::pll()),
            attenuators: core::array::from_fn(|_| ShiftRegisterDevice::attenuator()),
            mezzanine: core::array::from_fn(|_| ShiftRegisterDevice::almazny()),
        })
    }

    /// Assemble a board from a JSON description
    pub fn from_json(json: &str) -> Result<Self> {
        Self::new(BoardConfig::from_json(json)?)
    }

    /// Clock the board through one line update and return its serial output
    pub fn edge(&mut self, chip_select: bool, clock: bool, data_in: bool) -> bool {
        self.engine.on_clock_edge(chip_select, clock, data_in);

        for (channel, device) in self.plls.iter_mut().enumerate() {
            relay(&mut self.engine, PLL_BASE + channel as u8, device);
        }
        for (channel, device) in self.attenuators.iter_mut().enumerate() {
            relay(&mut self.engine, ATTENUATOR_BASE + channel as u8, device);
        }
        match self.config.mezzanine {
            MezzanineMode::Almazny => almazny(&mut self.engine, &mut self.mezzanine),
            MezzanineMode::PassThrough => {
                for (channel, device) in self.mezzanine.iter_mut().enumerate() {
                    relay(&mut self.engine, MEZZANINE_BASE + channel as u8, device);
                }
            }
        }

        self.engine.data_out()
    }

    /// Master matching the board's chip-select polarity
    pub fn master(&self) -> BitBangMaster {
        BitBangMaster::for_config(self.engine.config())
    }

    /// Board description
    #[inline]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Underlying protocol engine
    #[inline]
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Frame counters of the engine
    #[inline]
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Register bound at `address`
    pub fn register(&self, address: u8) -> Result<&RegisterEndpoint> {
        self.engine
            .register_at(address)
            .ok_or(BoardError::WrongKind {
                address,
                expected: EndpointKind::Register,
            })
    }

    /// Change the word read from the status register
    ///
    /// The protocol revision bits are always overlaid.
    pub fn set_status(&mut self, status: u16) {
        self.config.status = status;
        if let Some(reg) = self.engine.register_at_mut(STATUS) {
            reg.set_status(u32::from(status_word(status)));
        }
    }

    /// Relay in front of a channel's PLL
    pub fn pll_relay(&self, channel: usize) -> Result<&PassThroughEndpoint> {
        let address = channel_address(PLL_BASE, channel)?;
        self.engine
            .pass_through_at(address)
            .ok_or(BoardError::WrongKind {
                address,
                expected: EndpointKind::PassThrough,
            })
    }

    /// The Almazny group endpoint
    pub fn almazny(&self) -> Result<&GroupEndpoint> {
        self.engine
            .group_at(MEZZANINE_BASE)
            .ok_or(BoardError::WrongKind {
                address: MEZZANINE_BASE,
                expected: EndpointKind::Group,
            })
    }

    /// PLL model of a channel
    pub fn pll(&self, channel: usize) -> Result<&ShiftRegisterDevice> {
        self.plls.get(channel).ok_or(BoardError::UnknownChannel(channel))
    }

    /// Mutable PLL model of a channel
    pub fn pll_mut(&mut self, channel: usize) -> Result<&mut ShiftRegisterDevice> {
        self.plls
            .get_mut(channel)
            .ok_or(BoardError::UnknownChannel(channel))
    }

    /// Attenuator model of a channel
    pub fn attenuator(&self, channel: usize) -> Result<&ShiftRegisterDevice> {
        self.attenuators
            .get(channel)
            .ok_or(BoardError::UnknownChannel(channel))
    }

    /// Mutable attenuator model of a channel
    pub fn attenuator_mut(&mut self, channel: usize) -> Result<&mut ShiftRegisterDevice> {
        self.attenuators
            .get_mut(channel)
            .ok_or(BoardError::UnknownChannel(channel))
    }

    /// Mezzanine shift register (Almazny sub-target or relayed device)
    pub fn mezzanine(&self, index: usize) -> Result<&ShiftRegisterDevice> {
        self.mezzanine
            .get(index)
            .ok_or(BoardError::UnknownChannel(index))
    }

    /// Encode the writable registers into `buffer`
    pub fn save<'a>(&self, buffer: &'a mut [u8]) -> Result<&'a [u8]> {
        let snapshot = self.engine.snapshot();
        let bytes = snapshot.serialize(buffer)?;
        debug!(
            "saved {} registers in {} bytes",
            snapshot.registers.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Restore register values saved with [`Board::save`]
    pub fn load(&mut self, bytes: &[u8]) -> Result<()> {
        let snapshot = Snapshot::deserialize(bytes)?;
        self.engine.restore(&snapshot)?;
        Ok(())
    }
}

impl SerialSlave for Board {
    fn edge(&mut self, chip_select: bool, clock: bool, data_in: bool) -> bool {
        Board::edge(self, chip_select, clock, data_in)
    }
}

fn channel_address(base: u8, channel: usize) -> Result<u8> {
    if channel < CHANNELS {
        Ok(base + channel as u8)
    } else {
        Err(BoardError::UnknownChannel(channel))
    }
}

/// Clock one device through the relay bound at `address`
fn relay(engine: &mut Engine, address: u8, device: &mut ShiftRegisterDevice) {
    let Some(relay) = engine.pass_through_at_mut(address) else {
        return;
    };
    if relay.abort_pending() {
        debug!("frame to device at {:#04x} aborted", address);
    }
    let latches = device.latch_count();
    relay.drive(device);
    if device.latch_count() != latches {
        debug!("device at {:#04x} latched {:#x}", address, device.latched());
    }
}

/// Clock the Almazny registers from the group link
///
/// All four share clock and data; each shifts while its latch line is low
/// and latches on the line's rising edge.
fn almazny(engine: &mut Engine, devices: &mut [ShiftRegisterDevice; CHANNELS]) {
    let Some(group) = engine.group_at_mut(MEZZANINE_BASE) else {
        return;
    };
    let clock = group.link().serial_clock();
    let data_in = group.link().serial_data_in();
    let latches = group.latches();
    let index = usize::from(group.last_index());

    if group.link_mut().take_abort() {
        debug!("almazny frame to register {} aborted", index);
        for device in devices.iter_mut() {
            device.abort();
        }
    }

    let mut output = false;
    for (i, (device, latch)) in devices.iter_mut().zip(latches).enumerate() {
        let level = device.clock(!latch, clock, data_in);
        if i == index {
            output = level;
        }
    }
    group.link_mut().set_serial_data_out(output);

    for (i, device) in devices.iter().enumerate() {
        if group.take_strobe(i) {
            debug!("almazny register {} strobed, latched {:#04x}", i, device.latched());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirny_engine::ProtocolRevision;

    #[test]
    fn test_canonical_map_is_total() {
        let board = Board::new(BoardConfig::default()).unwrap();
        let router = board.engine().router();
        for address in 0..=0x7Fu8 {
            let expected = usize::from(address & DECODE_MASK != 3);
            assert_eq!(router.match_count(address), expected, "address {address:#04x}");
        }
        assert_eq!(router.len(), 3 + 2 * CHANNELS + 1);
    }

    #[test]
    fn test_pass_through_mezzanine_map() {
        let config = BoardConfig::default().with_mezzanine(MezzanineMode::PassThrough);
        let board = Board::new(config).unwrap();
        assert_eq!(board.engine().router().len(), 3 + 3 * CHANNELS);
        assert!(matches!(
            board.almazny(),
            Err(BoardError::WrongKind {
                address: MEZZANINE_BASE,
                expected: EndpointKind::Group
            })
        ));
    }

    #[test]
    fn test_channel_bounds() {
        let board = Board::new(BoardConfig::default()).unwrap();
        assert!(board.pll(3).is_ok());
        assert!(matches!(board.pll(4), Err(BoardError::UnknownChannel(4))));
        assert!(matches!(
            board.pll_relay(7),
            Err(BoardError::UnknownChannel(7))
        ));
    }

    #[test]
    fn test_narrow_layout_rejects_status_register() {
        let config = BoardConfig {
            protocol: Some(ProtocolRevision::Rev0.config().with_data_width(8)),
            ..BoardConfig::default()
        };
        assert!(matches!(Board::new(config), Err(BoardError::Config(_))));
    }

    #[test]
    fn test_status_word() {
        let mut board = Board::new(BoardConfig {
            status: 0x0C03,
            ..BoardConfig::default()
        })
        .unwrap();
        assert_eq!(board.register(STATUS).unwrap().read(), 0x0C03);
        board.set_status(0x0001);
        assert_eq!(board.register(STATUS).unwrap().read(), 0x0001);
        board.set_status(0xFFFF);
        assert_eq!(
            board.register(STATUS).unwrap().read(),
            u32::from(0xFFF3 | (u16::from(PROTO_REV) << 2))
        );
        assert!(matches!(
            board.register(PLL_BASE),
            Err(BoardError::WrongKind { address: 4, .. })
        ));
    }
}

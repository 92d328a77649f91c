//! # Frame Deserializer/Serializer
//!
//! Bit-level shift engine. Input is sampled on the rising clock edge; the state
//! machine advances and the output chain shifts on the falling edge (SPI mode 0).
//!
//! ## Edge Timeline (canonical 7 + 1 + 16 layout)
//!
//! ```text
//! falling edge │ 1 .. 7      │ 8              │ 9 .. 23        │ 24
//! counter      │ 23 .. 17    │ 16             │ 15 .. 1        │ 0
//! action       │ shift addr  │ latch WE,      │ shift data in, │ shift last bit,
//!              │             │ read-request,  │ shift read     │ write-commit
//!              │             │ load out chain │ data out       │
//! ```
//!
//! The read-request strictly precedes the write-commit inside a frame, so the
//! value shifted out is always the one from before the frame's own write.

use serde::{Deserialize, Serialize};

use crate::config::{FrameLayout, Framing};

/// One decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Transaction {
    /// Target address
    pub address: u8,
    /// Whether the target should commit `data`
    pub write_enable: bool,
    /// Data phase bits, MSB first on the wire
    pub data: u32,
}

impl Transaction {
    /// Read transaction (write-enable clear, data ignored by the target)
    pub const fn read(address: u8) -> Self {
        Self {
            address,
            write_enable: false,
            data: 0,
        }
    }

    /// Write transaction
    pub const fn write(address: u8, data: u32) -> Self {
        Self {
            address,
            write_enable: true,
            data,
        }
    }

    /// Bits of this frame as one word, first bit on the wire in the MSB
    ///
    /// The word is `layout.frame_len()` bits wide; fields wider than the
    /// layout are truncated.
    pub const fn to_word(&self, layout: &FrameLayout) -> u64 {
        let address = (self.address & layout.address_mask()) as u64;
        let data = (self.data & layout.data_mask()) as u64;
        (address << (layout.data_width + 1)) | ((self.write_enable as u64) << layout.data_width) | data
    }
}

/// Position inside the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Shifting in address bits
    Address,
    /// Shifting data in and read-back data out
    Data,
    /// Frame committed; further clocks only reach pass-through devices
    Done,
    /// Frame committed in continuous mode; the next falling edge restarts
    Guard,
}

/// What a falling edge produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameEvent {
    /// Nothing for the router
    None,
    /// Address and write-enable are known; the output chain wants a read value
    ReadRequest {
        /// Captured address
        address: u8,
        /// Captured write-enable bit
        write_enable: bool,
    },
    /// Terminal edge of a frame
    Complete(Transaction),
    /// The guard clock elapsed and a new frame starts in the same assertion
    Restart,
}

/// Shift state of the deserializer
///
/// Advanced once per clock edge while chip-select is asserted and reset to
/// [`ShiftState::new`] whenever it is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ShiftState {
    /// Falling edges left in the frame
    counter: u8,
    phase: Phase,
    address: u8,
    write_enable: bool,
    /// Full-duplex data chain: read value shifts out of the MSB while
    /// incoming bits enter at the LSB
    chain: u32,
    /// Bit sampled on the last rising edge
    sampled: bool,
    /// A rising edge has been seen in the current frame
    started: bool,
}

impl ShiftState {
    /// Initial state for `layout`
    pub const fn new(layout: &FrameLayout) -> Self {
        Self {
            counter: layout.frame_len() - 1,
            phase: Phase::Address,
            address: 0,
            write_enable: false,
            chain: 0,
            sampled: false,
            started: false,
        }
    }

    /// Return to the initial state
    pub fn reset(&mut self, layout: &FrameLayout) {
        *self = Self::new(layout);
    }

    /// Rising edge: capture the data-in line
    #[inline]
    pub fn sample(&mut self, bit: bool) {
        self.sampled = bit;
        self.started = true;
    }

    /// Falling edge: advance the frame by one bit
    pub fn advance(&mut self, layout: &FrameLayout, framing: Framing) -> FrameEvent {
        let bit = self.sampled;
        match self.phase {
            Phase::Address if self.counter == layout.data_width => {
                self.write_enable = bit;
                self.phase = Phase::Data;
                self.counter -= 1;
                FrameEvent::ReadRequest {
                    address: self.address,
                    write_enable: bit,
                }
            }
            Phase::Address => {
                self.address = ((self.address << 1) | bit as u8) & layout.address_mask();
                self.counter -= 1;
                FrameEvent::None
            }
            Phase::Data => {
                self.chain = ((self.chain << 1) | bit as u32) & layout.data_mask();
                if self.counter > 0 {
                    self.counter -= 1;
                    return FrameEvent::None;
                }
                self.phase = match framing {
                    Framing::Single => Phase::Done,
                    Framing::Continuous => Phase::Guard,
                };
                FrameEvent::Complete(Transaction {
                    address: self.address,
                    write_enable: self.write_enable,
                    data: self.chain,
                })
            }
            Phase::Done => FrameEvent::None,
            Phase::Guard => {
                self.reset(layout);
                FrameEvent::Restart
            }
        }
    }

    /// Load the read value into the output chain
    #[inline]
    pub fn load(&mut self, value: u32, layout: &FrameLayout) {
        self.chain = value & layout.data_mask();
    }

    /// Bit currently presented on the output line
    #[inline]
    pub const fn output_bit(&self, layout: &FrameLayout) -> bool {
        (self.chain >> (layout.data_width - 1)) & 1 != 0
    }

    /// Whether a frame was started but not committed
    #[inline]
    pub const fn in_flight(&self) -> bool {
        self.started && matches!(self.phase, Phase::Address | Phase::Data)
    }

    /// Falling edges left in the frame
    #[inline]
    pub const fn counter(&self) -> u8 {
        self.counter
    }

    /// Current phase
    #[inline]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Address bits captured so far
    #[inline]
    pub const fn address(&self) -> u8 {
        self.address
    }

    /// Captured write-enable bit (valid from the data phase on)
    #[inline]
    pub const fn write_enable(&self) -> bool {
        self.write_enable
    }

    /// Contents of the data chain
    #[inline]
    pub const fn chain(&self) -> u32 {
        self.chain
    }
}

//! COMM register group
//!
//! Holds up to three bytes of I2C or SPI traffic that the chip relays to
//! its GPIO pins after `STCOMM`. Each byte is framed by a four bit control
//! code before (`ICOM`) and after (`FCOM`) it.

use crate::ParameterError;
use crate::frame::DATA_LEN;
use crate::util::field;

/// Number of bytes a COMM register group carries
pub const COMM_WORDS: usize = 3;

/// I2C write address of an ADG728 multiplexer with both address pins low
pub const ADG728_ADDRESS: u8 = 0b1001_1000;
/// Switches of one ADG728
pub const MUX_CHANNELS: u8 = 8;
/// ADG728 multiplexers on the GPIO I2C bus, at address pins 0 and 1
pub const MUX_COUNT: u8 = 2;

/// Control code sent before a byte (`ICOM`, I2C master write)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Icom {
    /// Generate a start condition
    Start = 0x6,
    /// Generate a stop condition
    Stop = 0x1,
    /// Send the byte without start or stop
    Blank = 0x0,
    /// Release the bus and skip the byte
    #[default]
    NoTransmit = 0x7,
}
impl Icom {
    /// Decode the control nibble, unknown codes read back as [Icom::NoTransmit]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x6 => Icom::Start,
            0x1 => Icom::Stop,
            0x0 => Icom::Blank,
            _ => Icom::NoTransmit,
        }
    }
}

/// Control code after a byte (`FCOM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fcom {
    /// Master acknowledge
    Ack,
    /// Master no acknowledge
    #[default]
    Nack,
    /// Master no acknowledge followed by a stop condition
    NackStop,
    /// Any other nibble, such as the slave acknowledge status the chip
    /// writes back after `STCOMM`
    Other(u8),
}
impl Fcom {
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x0F {
            0x0 => Fcom::Ack,
            0x8 => Fcom::Nack,
            0x9 => Fcom::NackStop,
            other => Fcom::Other(other),
        }
    }
    pub const fn bits(&self) -> u8 {
        match self {
            Fcom::Ack => 0x0,
            Fcom::Nack => 0x8,
            Fcom::NackStop => 0x9,
            Fcom::Other(bits) => *bits & 0x0F,
        }
    }
}

/// One byte of pass-through traffic with its control codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommWord {
    pub icom: Icom,
    pub data: u8,
    pub fcom: Fcom,
}
impl CommWord {
    pub const fn new(icom: Icom, data: u8, fcom: Fcom) -> Self {
        Self { icom, data, fcom }
    }
}

/// The six bytes of a COMM register group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommRegister([u8; DATA_LEN]);

impl CommRegister {
    /// Register that relays nothing
    pub fn idle() -> Self {
        Self::from_words([CommWord::default(); COMM_WORDS])
    }
    pub fn from_words(words: [CommWord; COMM_WORDS]) -> Self {
        let mut bytes = [0; DATA_LEN];
        for (pair, word) in bytes.chunks_exact_mut(2).zip(words) {
            pair[0] = (word.icom as u8) << 4 | word.data >> 4;
            pair[1] = (word.data & 0x0F) << 4 | word.fcom.bits();
        }
        Self(bytes)
    }
    /// Write `switches` to the ADG728 at address pins `address` (`A1 A0`)
    ///
    /// Bit `n` of `switches` closes switch `n + 1`.
    pub fn mux_write(address: u8, switches: u8) -> Result<Self, ParameterError> {
        if address > 0b11 {
            return Err(ParameterError::MuxAddress(address));
        }
        Ok(Self::from_words([
            CommWord::new(Icom::Start, ADG728_ADDRESS | address << 1, Fcom::Ack),
            CommWord::new(Icom::Blank, switches, Fcom::Ack),
            CommWord::new(Icom::Stop, 0x00, Fcom::Ack),
        ]))
    }
    /// Close switch `channel` (1..=8) of one multiplexer and open the others
    pub fn mux_select(address: u8, channel: u8) -> Result<Self, ParameterError> {
        if !(1..=MUX_CHANNELS).contains(&channel) {
            return Err(ParameterError::MuxChannel(channel));
        }
        Self::mux_write(address, 1 << (channel - 1))
    }
    /// Open every switch of one multiplexer
    pub fn mux_reset(address: u8) -> Result<Self, ParameterError> {
        Self::mux_write(address, 0)
    }
    pub const fn from_bytes(bytes: [u8; DATA_LEN]) -> Self {
        Self(bytes)
    }
    pub const fn bytes(&self) -> [u8; DATA_LEN] {
        self.0
    }
    /// Decode the three words
    pub fn words(&self) -> [CommWord; COMM_WORDS] {
        core::array::from_fn(|i| {
            let (high, low) = (self.0[2 * i], self.0[2 * i + 1]);
            CommWord {
                icom: Icom::from_bits(field(high, 4, 4)),
                data: field(high, 0, 4) << 4 | field(low, 4, 4),
                fcom: Fcom::from_bits(field(low, 0, 4)),
            }
        })
    }
}
impl Default for CommRegister {
    fn default() -> Self {
        Self::idle()
    }
}

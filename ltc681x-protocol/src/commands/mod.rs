//! Command catalog
//!
//! Commands are 11 bit opcodes, sent as two bytes with the five most
//! significant bits cleared. Fixed opcodes live in [CommandCode], opcodes
//! carrying run-time parameters (conversion mode, channel selection, ...)
//! are folded together by the functions in [adc].

pub mod adc;

use core::fmt::Display;

/// An 11 bit command opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u16);
impl Opcode {
    /// Mask of the significant opcode bits
    pub const MASK: u16 = 0x07FF;

    /// Create an opcode from the two command bytes
    ///
    /// Bits above the 11 opcode bits are cleared.
    pub const fn from_bytes(high: u8, low: u8) -> Self {
        Self(u16::from_be_bytes([high, low]) & Self::MASK)
    }
    pub const fn raw(self) -> u16 {
        self.0
    }
    /// The two command bytes, high byte first
    pub const fn to_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}
impl From<CommandCode> for Opcode {
    fn from(value: CommandCode) -> Self {
        Self(value as u16)
    }
}
impl Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match CommandCode::from_opcode(*self) {
            Some(code) => write!(f, "{code:?} ({:#05X})", self.0),
            None => write!(f, "{:#05X}", self.0),
        }
    }
}

/// Commands with a fixed opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CommandCode {
    /// Write configuration register group A (`WRCFGA`)
    WriteConfigA = 0x001,
    /// Write configuration register group B (`WRCFGB`), LTC6812/LTC6813 only
    WriteConfigB = 0x024,
    /// Read configuration register group A (`RDCFGA`)
    ReadConfigA = 0x002,
    /// Read configuration register group B (`RDCFGB`), LTC6812/LTC6813 only
    ReadConfigB = 0x026,
    /// Read cell voltage register group A (`RDCVA`)
    ReadCellA = 0x004,
    /// Read cell voltage register group B (`RDCVB`)
    ReadCellB = 0x006,
    /// Read cell voltage register group C (`RDCVC`)
    ReadCellC = 0x008,
    /// Read cell voltage register group D (`RDCVD`)
    ReadCellD = 0x00A,
    /// Read cell voltage register group E (`RDCVE`)
    ReadCellE = 0x009,
    /// Read cell voltage register group F (`RDCVF`)
    ReadCellF = 0x00B,
    /// Read auxiliary register group A (`RDAUXA`)
    ReadAuxA = 0x00C,
    /// Read auxiliary register group B (`RDAUXB`)
    ReadAuxB = 0x00E,
    /// Read auxiliary register group C (`RDAUXC`)
    ReadAuxC = 0x00D,
    /// Read auxiliary register group D (`RDAUXD`)
    ReadAuxD = 0x00F,
    /// Read status register group A (`RDSTATA`)
    ReadStatusA = 0x010,
    /// Read status register group B (`RDSTATB`)
    ReadStatusB = 0x012,
    /// Clear cell voltage registers (`CLRCELL`)
    ClearCells = 0x711,
    /// Clear auxiliary registers (`CLRAUX`)
    ClearAux = 0x712,
    /// Clear status registers (`CLRSTAT`)
    ClearStatus = 0x713,
    /// Poll ADC conversion status (`PLADC`)
    PollAdc = 0x714,
    /// Diagnose the multiplexer and poll status (`DIAGN`)
    DiagnoseMux = 0x715,
    /// Write COMM register group (`WRCOMM`)
    WriteComm = 0x721,
    /// Read COMM register group (`RDCOMM`)
    ReadComm = 0x722,
    /// Start I2C/SPI communication (`STCOMM`)
    StartComm = 0x723,
}
impl CommandCode {
    const ALL: [CommandCode; 24] = [
        CommandCode::WriteConfigA,
        CommandCode::WriteConfigB,
        CommandCode::ReadConfigA,
        CommandCode::ReadConfigB,
        CommandCode::ReadCellA,
        CommandCode::ReadCellB,
        CommandCode::ReadCellC,
        CommandCode::ReadCellD,
        CommandCode::ReadCellE,
        CommandCode::ReadCellF,
        CommandCode::ReadAuxA,
        CommandCode::ReadAuxB,
        CommandCode::ReadAuxC,
        CommandCode::ReadAuxD,
        CommandCode::ReadStatusA,
        CommandCode::ReadStatusB,
        CommandCode::ClearCells,
        CommandCode::ClearAux,
        CommandCode::ClearStatus,
        CommandCode::PollAdc,
        CommandCode::DiagnoseMux,
        CommandCode::WriteComm,
        CommandCode::ReadComm,
        CommandCode::StartComm,
    ];

    /// Look up the fixed command for an opcode
    pub fn from_opcode(opcode: Opcode) -> Option<CommandCode> {
        Self::ALL
            .into_iter()
            .find(|code| *code as u16 == opcode.raw())
    }
    pub fn opcode(self) -> Opcode {
        self.into()
    }
}

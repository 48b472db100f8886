//! Conversion and self-test commands
//!
//! These opcodes carry the conversion mode, the discharge permit and a
//! channel selection. The two mode bits are split across both command
//! bytes: `MD[1]` is bit 0 of the high byte, `MD[0]` bit 7 of the low byte.

use super::Opcode;
use crate::ParameterError;

/// ADC conversion mode (`MD`)
///
/// The sample rate of each mode depends on the `ADCOPT` bit of the
/// configuration register, both rates are given as `ADCOPT=0 / ADCOPT=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdcMode {
    /// 422Hz / 1kHz
    Hz422 = 0,
    /// 27kHz / 14kHz
    Fast = 1,
    /// 7kHz / 3kHz
    #[default]
    Normal = 2,
    /// 26Hz / 2kHz
    Filtered = 3,
}

/// Cell channels converted by `ADCV` and `ADOW` (`CH`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CellSelection {
    #[default]
    All = 0,
    /// Cells 1, 7 and 13
    Cells1And7 = 1,
    /// Cells 2, 8 and 14
    Cells2And8 = 2,
    /// Cells 3, 9 and 15
    Cells3And9 = 3,
    /// Cells 4, 10 and 16
    Cells4And10 = 4,
    /// Cells 5, 11 and 17
    Cells5And11 = 5,
    /// Cells 6, 12 and 18
    Cells6And12 = 6,
}

/// GPIO channels converted by `ADAX` (`CHG`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AuxSelection {
    /// All GPIOs and the second reference
    #[default]
    All = 0,
    /// GPIO 1 (and GPIO 6 on LTC6812/LTC6813)
    Gpio1 = 1,
    /// GPIO 2 (and GPIO 7)
    Gpio2 = 2,
    /// GPIO 3 (and GPIO 8)
    Gpio3 = 3,
    /// GPIO 4 (and GPIO 9)
    Gpio4 = 4,
    Gpio5 = 5,
    /// Second reference `VREF2`
    SecondReference = 6,
}

/// Status channels converted by `ADSTAT` (`CHST`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusSelection {
    #[default]
    All = 0,
    SumOfCells = 1,
    InternalTemperature = 2,
    AnalogSupply = 3,
    DigitalSupply = 4,
}

/// Digital self-test pattern (`ST`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelfTest {
    One = 1,
    Two = 2,
}

/// Current source used by the open wire conversion (`PUP`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenWirePull {
    PullDown = 0,
    PullUp = 1,
}

macro_rules! selector_from_u8 {
    ($name:ident, $error:ident, [$($value:literal => $variant:ident),+ $(,)?]) => {
        impl TryFrom<u8> for $name {
            type Error = ParameterError;
            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok($name::$variant),)+
                    _ => Err(ParameterError::$error(value)),
                }
            }
        }
    };
}
selector_from_u8!(AdcMode, ModeOutOfRange, [0 => Hz422, 1 => Fast, 2 => Normal, 3 => Filtered]);
selector_from_u8!(CellSelection, ChannelOutOfRange, [
    0 => All,
    1 => Cells1And7,
    2 => Cells2And8,
    3 => Cells3And9,
    4 => Cells4And10,
    5 => Cells5And11,
    6 => Cells6And12,
]);
selector_from_u8!(AuxSelection, ChannelOutOfRange, [
    0 => All,
    1 => Gpio1,
    2 => Gpio2,
    3 => Gpio3,
    4 => Gpio4,
    5 => Gpio5,
    6 => SecondReference,
]);
selector_from_u8!(StatusSelection, ChannelOutOfRange, [
    0 => All,
    1 => SumOfCells,
    2 => InternalTemperature,
    3 => AnalogSupply,
    4 => DigitalSupply,
]);
selector_from_u8!(SelfTest, ChannelOutOfRange, [1 => One, 2 => Two]);

/// Fold the mode bits into a conversion opcode
const fn conversion(high: u8, low: u8, mode: AdcMode) -> Opcode {
    let md = mode as u8;
    Opcode::from_bytes(high | (md >> 1), ((md & 0x01) << 7) | low)
}

const fn dcp(permitted: bool) -> u8 {
    (permitted as u8) << 4
}

/// Start cell voltage conversion (`ADCV`)
pub const fn adcv(mode: AdcMode, discharge_permitted: bool, cells: CellSelection) -> Opcode {
    conversion(0x02, 0x60 | dcp(discharge_permitted) | cells as u8, mode)
}

/// Start GPIO conversion (`ADAX`)
pub const fn adax(mode: AdcMode, channels: AuxSelection) -> Opcode {
    conversion(0x04, 0x60 | channels as u8, mode)
}

/// Start status group conversion (`ADSTAT`)
pub const fn adstat(mode: AdcMode, channels: StatusSelection) -> Opcode {
    conversion(0x04, 0x68 | channels as u8, mode)
}

/// Start combined cell voltage and sum of cells conversion (`ADCVSC`)
pub const fn adcvsc(mode: AdcMode, discharge_permitted: bool) -> Opcode {
    conversion(0x04, 0x67 | dcp(discharge_permitted), mode)
}

/// Start combined cell voltage and GPIO 1/2 conversion (`ADCVAX`)
pub const fn adcvax(mode: AdcMode, discharge_permitted: bool) -> Opcode {
    conversion(0x04, 0x6F | dcp(discharge_permitted), mode)
}

/// Start cell voltage self-test (`CVST`)
pub const fn cvst(mode: AdcMode, test: SelfTest) -> Opcode {
    conversion(0x02, ((test as u8) << 5) | 0x07, mode)
}

/// Start GPIO self-test (`AXST`)
pub const fn axst(mode: AdcMode, test: SelfTest) -> Opcode {
    conversion(0x04, ((test as u8) << 5) | 0x07, mode)
}

/// Start status group self-test (`STATST`)
pub const fn statst(mode: AdcMode, test: SelfTest) -> Opcode {
    conversion(0x04, ((test as u8) << 5) | 0x0F, mode)
}

/// Start open wire conversion (`ADOW`)
pub const fn adow(
    mode: AdcMode,
    pull: OpenWirePull,
    discharge_permitted: bool,
    cells: CellSelection,
) -> Opcode {
    conversion(
        0x02,
        0x28 | ((pull as u8) << 6) | dcp(discharge_permitted) | cells as u8,
        mode,
    )
}

/// Start overlap cell measurement (`ADOL`)
pub const fn adol(mode: AdcMode, discharge_permitted: bool) -> Opcode {
    conversion(0x02, 0x01 | dcp(discharge_permitted), mode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adcv() {
        assert_eq!(adcv(AdcMode::Normal, false, CellSelection::All).raw(), 0x360);
        assert_eq!(adcv(AdcMode::Fast, false, CellSelection::All).raw(), 0x2E0);
        assert_eq!(adcv(AdcMode::Hz422, true, CellSelection::Cells3And9).raw(), 0x273);
        assert_eq!(adcv(AdcMode::Filtered, true, CellSelection::All).raw(), 0x3F0);
    }
    #[test]
    fn test_aux_and_status() {
        assert_eq!(adax(AdcMode::Normal, AuxSelection::All).raw(), 0x560);
        assert_eq!(adax(AdcMode::Fast, AuxSelection::SecondReference).raw(), 0x4E6);
        assert_eq!(adstat(AdcMode::Normal, StatusSelection::All).raw(), 0x568);
        assert_eq!(
            adstat(AdcMode::Hz422, StatusSelection::DigitalSupply).raw(),
            0x46C
        );
    }
    #[test]
    fn test_combined_conversions() {
        assert_eq!(adcvsc(AdcMode::Normal, false).raw(), 0x567);
        assert_eq!(adcvax(AdcMode::Normal, true).raw(), 0x57F);
    }
    #[test]
    fn test_diagnostic_conversions() {
        assert_eq!(cvst(AdcMode::Normal, SelfTest::One).raw(), 0x327);
        assert_eq!(axst(AdcMode::Normal, SelfTest::Two).raw(), 0x547);
        assert_eq!(statst(AdcMode::Fast, SelfTest::One).raw(), 0x4AF);
        assert_eq!(
            adow(AdcMode::Normal, OpenWirePull::PullUp, false, CellSelection::All).raw(),
            0x368
        );
        assert_eq!(adol(AdcMode::Normal, false).raw(), 0x301);
    }
    #[test]
    fn test_selectors_reject_out_of_range() {
        assert_eq!(CellSelection::try_from(6), Ok(CellSelection::Cells6And12));
        assert_eq!(
            CellSelection::try_from(7),
            Err(ParameterError::ChannelOutOfRange(7))
        );
        assert_eq!(AuxSelection::try_from(6), Ok(AuxSelection::SecondReference));
        assert!(AuxSelection::try_from(9).is_err());
        assert!(StatusSelection::try_from(5).is_err());
        assert!(SelfTest::try_from(0).is_err());
        assert_eq!(AdcMode::try_from(4), Err(ParameterError::ModeOutOfRange(4)));
    }
}

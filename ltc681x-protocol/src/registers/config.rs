//! Configuration register groups (`CFGRA`, `CFGRB`)
//!
//! Thresholds are expressed in the cell voltage code unit (100µV per LSB).
//! Every setter only touches the bits of its own field.

use crate::ParameterError;
use crate::frame::DATA_LEN;
use crate::util::{field, flag, set_field, set_flag, split_u12};

/// Number of GPIO pins configured through `CFGRA`
pub const CONFIG_A_GPIOS: u8 = 5;
/// Number of discharge switches configured through `CFGRA`
pub const CONFIG_A_CELLS: u8 = 12;
/// Highest cell with a discharge switch in `CFGRB`
pub const CONFIG_B_LAST_CELL: u8 = 18;
/// Highest GPIO configured through `CFGRB`
pub const CONFIG_B_LAST_GPIO: u8 = 9;

/// Discharge timeout (`DCTO`)
///
/// Once it expires the chip clears all discharge bits on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DischargeTimeout {
    #[default]
    Disabled = 0x0,
    HalfMinute = 0x1,
    Minutes1 = 0x2,
    Minutes2 = 0x3,
    Minutes3 = 0x4,
    Minutes4 = 0x5,
    Minutes5 = 0x6,
    Minutes10 = 0x7,
    Minutes15 = 0x8,
    Minutes20 = 0x9,
    Minutes30 = 0xA,
    Minutes40 = 0xB,
    Minutes60 = 0xC,
    Minutes75 = 0xD,
    Minutes90 = 0xE,
    Minutes120 = 0xF,
}
impl DischargeTimeout {
    const ALL: [DischargeTimeout; 16] = [
        DischargeTimeout::Disabled,
        DischargeTimeout::HalfMinute,
        DischargeTimeout::Minutes1,
        DischargeTimeout::Minutes2,
        DischargeTimeout::Minutes3,
        DischargeTimeout::Minutes4,
        DischargeTimeout::Minutes5,
        DischargeTimeout::Minutes10,
        DischargeTimeout::Minutes15,
        DischargeTimeout::Minutes20,
        DischargeTimeout::Minutes30,
        DischargeTimeout::Minutes40,
        DischargeTimeout::Minutes60,
        DischargeTimeout::Minutes75,
        DischargeTimeout::Minutes90,
        DischargeTimeout::Minutes120,
    ];
    /// Decode the 4 bit `DCTO` field
    pub fn from_bits(bits: u8) -> Self {
        Self::ALL[(bits & 0x0F) as usize]
    }
    /// Timeout in seconds, `None` when disabled
    pub fn seconds(self) -> Option<u32> {
        const SECONDS: [u32; 16] = [
            0, 30, 60, 120, 180, 240, 300, 600, 900, 1200, 1800, 2400, 3600, 4500, 5400, 7200,
        ];
        match self {
            DischargeTimeout::Disabled => None,
            timeout => Some(SECONDS[timeout as usize]),
        }
    }
}

/// Under voltage threshold code to register value
fn uv_raw(threshold: u16) -> Result<u16, ParameterError> {
    match threshold / 16 {
        0 => Err(ParameterError::ThresholdOutOfRange(threshold)),
        steps => Ok(steps - 1),
    }
}

/// Configuration register group A
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigA([u8; DATA_LEN]);

impl ConfigA {
    pub const fn from_bytes(bytes: [u8; DATA_LEN]) -> Self {
        Self(bytes)
    }
    pub const fn bytes(&self) -> [u8; DATA_LEN] {
        self.0
    }

    /// Reference stays powered between conversions (`REFON`)
    pub fn reference_on(&self) -> bool {
        flag(self.0[0], 2)
    }
    pub fn set_reference_on(&mut self, on: bool) {
        set_flag(&mut self.0[0], 2, on);
    }
    /// Discharge timer enable pin state (`DTEN`), read only
    pub fn discharge_timer_enabled(&self) -> bool {
        flag(self.0[0], 1)
    }
    /// ADC mode option (`ADCOPT`)
    pub fn adc_option(&self) -> bool {
        flag(self.0[0], 0)
    }
    pub fn set_adc_option(&mut self, on: bool) {
        set_flag(&mut self.0[0], 0, on);
    }

    /// GPIO pull-down states of GPIO 1 to 5 as a bit mask (bit 0 = GPIO 1)
    ///
    /// A set bit switches the pull-down off, which is needed to read the pin.
    pub fn gpio_pulls(&self) -> u8 {
        field(self.0[0], 3, 5)
    }
    pub fn set_gpio_pulls(&mut self, mask: u8) {
        set_field(&mut self.0[0], 3, 5, mask);
    }
    /// Set the pull-down state of a single GPIO (1 to 5)
    pub fn set_gpio_pull(&mut self, gpio: u8, pull_down_off: bool) -> Result<(), ParameterError> {
        if !(1..=CONFIG_A_GPIOS).contains(&gpio) {
            return Err(ParameterError::GpioOutOfRange(gpio));
        }
        set_flag(&mut self.0[0], gpio + 2, pull_down_off);
        Ok(())
    }

    /// Under voltage comparison threshold (`VUV`)
    ///
    /// The register holds `threshold / 16 - 1`, so the decoded value is the
    /// threshold the chip actually compares against. An all ones field
    /// decodes to 65536, one step above what [ConfigA::set_under_voltage]
    /// accepts.
    pub fn under_voltage(&self) -> u32 {
        let raw = self.0[1] as u32 | (field(self.0[2], 0, 4) as u32) << 8;
        (raw + 1) * 16
    }
    pub fn set_under_voltage(&mut self, threshold: u16) -> Result<(), ParameterError> {
        let (low, high) = split_u12(uv_raw(threshold)?);
        self.0[1] = low;
        set_field(&mut self.0[2], 0, 4, high);
        Ok(())
    }
    /// Over voltage comparison threshold (`VOV`)
    ///
    /// The register holds `threshold / 16`.
    pub fn over_voltage(&self) -> u16 {
        let raw = (self.0[3] as u16) << 4 | field(self.0[2], 4, 4) as u16;
        raw * 16
    }
    pub fn set_over_voltage(&mut self, threshold: u16) {
        let raw = threshold / 16;
        self.0[3] = (raw >> 4) as u8;
        set_field(&mut self.0[2], 4, 4, (raw & 0x0F) as u8);
    }

    /// Discharge switches of cells 1 to 12 as a bit mask (bit 0 = cell 1)
    pub fn discharge(&self) -> u16 {
        self.0[4] as u16 | (field(self.0[5], 0, 4) as u16) << 8
    }
    pub fn set_discharge(&mut self, mask: u16) {
        self.0[4] = (mask & 0xFF) as u8;
        set_field(&mut self.0[5], 0, 4, (mask >> 8) as u8);
    }
    /// Switch the discharge of a single cell (1 to 12)
    pub fn set_cell_discharge(&mut self, cell: u8, on: bool) -> Result<(), ParameterError> {
        match cell {
            1..=8 => set_flag(&mut self.0[4], cell - 1, on),
            9..=CONFIG_A_CELLS => set_flag(&mut self.0[5], cell - 9, on),
            _ => return Err(ParameterError::CellOutOfRange(cell)),
        }
        Ok(())
    }

    /// Discharge timeout (`DCTO`)
    pub fn discharge_timeout(&self) -> DischargeTimeout {
        DischargeTimeout::from_bits(field(self.0[5], 4, 4))
    }
    pub fn set_discharge_timeout(&mut self, timeout: DischargeTimeout) {
        set_field(&mut self.0[5], 4, 4, timeout as u8);
    }
}

/// Digital redundancy path selection of `CFGRB` (`PS`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathSelect {
    /// Redundancy applied to all ADCs in sequence
    #[default]
    All = 0,
    Adc1 = 1,
    Adc2 = 2,
    Adc3 = 3,
}

/// Configuration register group B (LTC6812, LTC6813)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigB([u8; DATA_LEN]);

impl ConfigB {
    pub const fn from_bytes(bytes: [u8; DATA_LEN]) -> Self {
        Self(bytes)
    }
    pub const fn bytes(&self) -> [u8; DATA_LEN] {
        self.0
    }

    /// GPIO pull-down states of GPIO 6 to 9 as a bit mask (bit 0 = GPIO 6)
    pub fn gpio_pulls(&self) -> u8 {
        field(self.0[0], 0, 4)
    }
    pub fn set_gpio_pulls(&mut self, mask: u8) {
        set_field(&mut self.0[0], 0, 4, mask);
    }
    /// Set the pull-down state of a single GPIO (6 to 9)
    pub fn set_gpio_pull(&mut self, gpio: u8, pull_down_off: bool) -> Result<(), ParameterError> {
        if !(CONFIG_A_GPIOS + 1..=CONFIG_B_LAST_GPIO).contains(&gpio) {
            return Err(ParameterError::GpioOutOfRange(gpio));
        }
        set_flag(&mut self.0[0], gpio - 6, pull_down_off);
        Ok(())
    }

    /// Discharge switches of cells 13 to 18 as a bit mask (bit 0 = cell 13)
    pub fn discharge(&self) -> u8 {
        field(self.0[0], 4, 4) | field(self.0[1], 0, 2) << 4
    }
    pub fn set_discharge(&mut self, mask: u8) {
        set_field(&mut self.0[0], 4, 4, mask);
        set_field(&mut self.0[1], 0, 2, mask >> 4);
    }
    /// Switch the discharge of a single cell (13 to 18)
    pub fn set_cell_discharge(&mut self, cell: u8, on: bool) -> Result<(), ParameterError> {
        match cell {
            13..=16 => set_flag(&mut self.0[0], cell - 9, on),
            17..=CONFIG_B_LAST_CELL => set_flag(&mut self.0[1], cell - 17, on),
            _ => return Err(ParameterError::CellOutOfRange(cell)),
        }
        Ok(())
    }
    /// GPIO 9 pull-down used as discharge switch (`DCC0`)
    pub fn gpio9_discharge(&self) -> bool {
        flag(self.0[1], 2)
    }
    pub fn set_gpio9_discharge(&mut self, on: bool) {
        set_flag(&mut self.0[1], 2, on);
    }
    /// Discharge timer monitor (`DTMEN`)
    pub fn discharge_timer_monitor(&self) -> bool {
        flag(self.0[1], 3)
    }
    pub fn set_discharge_timer_monitor(&mut self, on: bool) {
        set_flag(&mut self.0[1], 3, on);
    }
    /// Digital redundancy path selection (`PS`)
    pub fn path_select(&self) -> PathSelect {
        match field(self.0[1], 4, 2) {
            1 => PathSelect::Adc1,
            2 => PathSelect::Adc2,
            3 => PathSelect::Adc3,
            _ => PathSelect::All,
        }
    }
    pub fn set_path_select(&mut self, path: PathSelect) {
        set_field(&mut self.0[1], 4, 2, path as u8);
    }
    /// Force digital redundancy failure (`FDRF`)
    pub fn force_redundancy_failure(&self) -> bool {
        flag(self.0[1], 6)
    }
    pub fn set_force_redundancy_failure(&mut self, on: bool) {
        set_flag(&mut self.0[1], 6, on);
    }
}

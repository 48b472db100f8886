//! Chain configuration inputs
//!
//! Values a startup layer supplies before the first transaction. With the
//! `serde` feature they can be loaded from any serde data format.

use fugit::HertzU32;

use crate::conversion::DEFAULT_POLL_LIMIT;
use crate::link::LinkTiming;
use crate::registers::config::DischargeTimeout;

/// Initial configuration register contents, applied to every chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ChipSettings {
    /// Keep the reference powered between conversions
    pub reference_on: bool,
    /// Select the alternative ADC sample rates
    pub adc_option: bool,
    /// GPIO pull-downs switched off, bit 0 = GPIO 1
    pub gpio_pulls: u16,
    /// Under voltage threshold, 100µV per LSB
    pub under_voltage: u16,
    /// Over voltage threshold, 100µV per LSB
    pub over_voltage: u16,
    pub discharge_timeout: DischargeTimeout,
    /// Discharge switches turned on, bit 0 = cell 1
    pub discharge: u32,
}
impl Default for ChipSettings {
    fn default() -> Self {
        Self {
            reference_on: true,
            adc_option: false,
            gpio_pulls: 0b1_1000,
            under_voltage: 30000,
            over_voltage: 41000,
            discharge_timeout: DischargeTimeout::Disabled,
            discharge: 0,
        }
    }
}

/// Bus link parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LinkSettings {
    /// SPI clock rate in Hz
    pub clock_hz: u32,
    /// Maximum number of bytes clocked while polling a conversion
    pub poll_limit: u32,
}
impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            clock_hz: 1_000_000,
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }
}
impl From<LinkSettings> for LinkTiming {
    fn from(value: LinkSettings) -> Self {
        LinkTiming {
            clock: HertzU32::from_raw(value.clock_hz),
            poll_limit: value.poll_limit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    pub chip: ChipSettings,
    pub link: LinkSettings,
}

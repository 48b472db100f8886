//! Datatypes and units

use core::fmt::Display;

/// Raw ADC code with 100µV per LSB, as used for cell and GPIO voltages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VoltageCode(pub u16);
impl VoltageCode {
    pub const fn micro_volts(self) -> u32 {
        self.0 as u32 * 100
    }
    pub const fn milli_volts(self) -> u16 {
        self.0 / 10
    }
}
impl Display for VoltageCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:04}V", self.0 / 10_000, self.0 % 10_000)
    }
}

/// Millivolt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MilliVolt(pub u32);
impl Display for MilliVolt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}mV", self.0)
    }
}

/// Temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Temperature {
    /// d°C (dezi degree Celsius) (0.1°C)
    d_celsius: i32,
}
impl Temperature {
    pub const fn from_deci_celsius(d_celsius: i32) -> Self {
        Self { d_celsius }
    }
    pub const fn deci_celsius(self) -> i32 {
        self.d_celsius
    }
}
impl Display for Temperature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.d_celsius < 0 { "-" } else { "" };
        let abs = self.d_celsius.unsigned_abs();
        write!(f, "{sign}{}.{}°C", abs / 10, abs % 10)
    }
}

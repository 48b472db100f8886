//! Register model of a daisy chain
//!
//! [Chain] holds everything the controller knows about every chip: the
//! configuration it wants to write, what the chips last sent back, the
//! decoded measurements and the PEC mismatch counts.

pub mod comm;
pub mod config;
pub mod counters;

use log::debug;

use crate::ParameterError;
use crate::frame::{MAX_CHAIN_LEN, RegisterGroup};
use crate::settings::ChipSettings;
use crate::topology::ChainTopology;
use crate::types::{MilliVolt, Temperature, VoltageCode};
use crate::util::{field, flag};
use comm::CommRegister;
use config::{CONFIG_A_CELLS, ConfigA, ConfigB};
use counters::{PecCounters, RegisterKind};

/// Highest number of cell voltage codes of any chip of the family
pub const MAX_CELLS: usize = 18;
/// Number of auxiliary code slots (four groups of three)
pub const AUX_SLOTS: usize = 12;

/// Channels and register groups present on a chip variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterShape {
    pub name: &'static str,
    pub cells: usize,
    /// GPIO inputs plus the second reference
    pub aux_channels: usize,
    pub cell_groups: usize,
    pub aux_groups: usize,
    pub status_groups: usize,
    /// Configuration register group B is present
    pub config_b: bool,
}
impl RegisterShape {
    pub const LTC6811: RegisterShape = RegisterShape {
        name: "LTC6811",
        cells: 12,
        aux_channels: 6,
        cell_groups: 4,
        aux_groups: 2,
        status_groups: 2,
        config_b: false,
    };
    pub const LTC6812: RegisterShape = RegisterShape {
        name: "LTC6812",
        cells: 15,
        aux_channels: 10,
        cell_groups: 5,
        aux_groups: 4,
        status_groups: 2,
        config_b: true,
    };
    pub const LTC6813: RegisterShape = RegisterShape {
        name: "LTC6813",
        cells: 18,
        aux_channels: 10,
        cell_groups: 6,
        aux_groups: 4,
        status_groups: 2,
        config_b: true,
    };
}

/// A register group the controller writes and reads back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteRegister<T> {
    pub(crate) tx: T,
    pub(crate) rx: RegisterGroup,
    pub(crate) pec_mismatch: bool,
}
impl<T: Default> Default for WriteRegister<T> {
    fn default() -> Self {
        Self {
            tx: T::default(),
            rx: RegisterGroup::default(),
            pec_mismatch: false,
        }
    }
}
impl<T> WriteRegister<T> {
    /// Contents sent by the next write
    pub fn pending(&self) -> &T {
        &self.tx
    }
    /// Group as received by the last read
    pub fn received(&self) -> &RegisterGroup {
        &self.rx
    }
    /// The last read failed its PEC check
    pub fn pec_mismatch(&self) -> bool {
        self.pec_mismatch
    }
}

/// Cell voltage codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellRegisters {
    pub(crate) codes: [u16; MAX_CELLS],
    pub(crate) pec_mismatch: [bool; 6],
}
impl CellRegisters {
    /// PEC mismatch flag of cell register group `group` (A = 0)
    pub fn pec_mismatch(&self, group: usize) -> bool {
        self.pec_mismatch.get(group).copied().unwrap_or(false)
    }
}

/// GPIO and second reference codes
///
/// Slots are `GPIO1..=GPIO5`, `VREF2`, `GPIO6..=GPIO9`, two reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuxRegisters {
    pub(crate) codes: [u16; AUX_SLOTS],
    pub(crate) pec_mismatch: [bool; 4],
}
impl AuxRegisters {
    pub fn pec_mismatch(&self, group: usize) -> bool {
        self.pec_mismatch.get(group).copied().unwrap_or(false)
    }
    /// Second reference voltage
    pub fn reference(&self) -> VoltageCode {
        VoltageCode(self.codes[5])
    }
}

/// Status register groups A and B
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRegisters {
    /// Sum of cells, internal temperature, analog and digital supply
    pub(crate) codes: [u16; 4],
    /// Under and over voltage flags of cells 1 to 12
    pub(crate) cell_flags: [u8; 3],
    pub(crate) mux_fail: bool,
    pub(crate) thermal_shutdown: bool,
    pub(crate) revision: u8,
    pub(crate) pec_mismatch: [bool; 2],
}
impl StatusRegisters {
    pub fn codes(&self) -> &[u16; 4] {
        &self.codes
    }
    /// Voltage across all cells of the chip
    ///
    /// The code is scaled by 20 against the cell code unit, so each LSB is 2mV.
    pub fn sum_of_cells(&self) -> MilliVolt {
        MilliVolt(self.codes[0] as u32 * 2)
    }
    /// Die temperature (`ITMP * 100µV / 7.5mV/K - 273°C`)
    pub fn internal_temperature(&self) -> Temperature {
        Temperature::from_deci_celsius(self.codes[1] as i32 * 2 / 15 - 2730)
    }
    pub fn analog_supply(&self) -> VoltageCode {
        VoltageCode(self.codes[2])
    }
    pub fn digital_supply(&self) -> VoltageCode {
        VoltageCode(self.codes[3])
    }
    /// Under voltage flag of cell `cell` (1 to 12)
    pub fn under_voltage(&self, cell: usize) -> bool {
        self.cell_flag(cell, 0)
    }
    /// Over voltage flag of cell `cell` (1 to 12)
    pub fn over_voltage(&self, cell: usize) -> bool {
        self.cell_flag(cell, 1)
    }
    fn cell_flag(&self, cell: usize, offset: u8) -> bool {
        match cell.checked_sub(1) {
            Some(i) if i < 12 => flag(self.cell_flags[i / 4], 2 * (i % 4) as u8 + offset),
            _ => false,
        }
    }
    /// Multiplexer self test failed (`MUXFAIL`)
    pub fn mux_fail(&self) -> bool {
        self.mux_fail
    }
    /// Thermal shutdown occurred (`THSD`)
    pub fn thermal_shutdown(&self) -> bool {
        self.thermal_shutdown
    }
    /// Silicon revision (`REV`)
    pub fn revision(&self) -> u8 {
        self.revision
    }
    pub fn pec_mismatch(&self, group: usize) -> bool {
        self.pec_mismatch.get(group).copied().unwrap_or(false)
    }

    pub(crate) fn decode_b(&mut self, data: &[u8; 6]) {
        self.codes[3] = u16::from_le_bytes([data[0], data[1]]);
        self.cell_flags.copy_from_slice(&data[2..5]);
        self.thermal_shutdown = flag(data[5], 0);
        self.mux_fail = flag(data[5], 1);
        self.revision = field(data[5], 4, 4);
    }
}

/// State of one chip in the chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chip {
    pub(crate) shape: RegisterShape,
    pub(crate) config_a: WriteRegister<ConfigA>,
    pub(crate) config_b: WriteRegister<ConfigB>,
    pub(crate) cells: CellRegisters,
    pub(crate) aux: AuxRegisters,
    pub(crate) status: StatusRegisters,
    pub(crate) comm: WriteRegister<CommRegister>,
    pub(crate) pec_counters: PecCounters,
}

impl Chip {
    pub fn new(shape: RegisterShape) -> Self {
        Self {
            shape,
            config_a: WriteRegister::default(),
            config_b: WriteRegister::default(),
            cells: CellRegisters::default(),
            aux: AuxRegisters::default(),
            status: StatusRegisters::default(),
            comm: WriteRegister::default(),
            pec_counters: PecCounters::default(),
        }
    }
    pub fn shape(&self) -> &RegisterShape {
        &self.shape
    }
    /// Cell voltage codes, one per cell of the chip variant
    pub fn cell_codes(&self) -> &[u16] {
        &self.cells.codes[..self.shape.cells]
    }
    /// Cell voltage of cell `cell` (1 based)
    pub fn cell_voltage(&self, cell: usize) -> Option<VoltageCode> {
        self.cell_codes()
            .get(cell.checked_sub(1)?)
            .map(|code| VoltageCode(*code))
    }
    pub fn cells(&self) -> &CellRegisters {
        &self.cells
    }
    /// GPIO and reference codes, one per auxiliary channel of the chip variant
    pub fn aux_codes(&self) -> &[u16] {
        &self.aux.codes[..self.shape.aux_channels]
    }
    pub fn aux(&self) -> &AuxRegisters {
        &self.aux
    }
    pub fn status(&self) -> &StatusRegisters {
        &self.status
    }
    pub fn pec_counters(&self) -> &PecCounters {
        &self.pec_counters
    }

    pub fn config_a(&self) -> &ConfigA {
        &self.config_a.tx
    }
    pub fn config_a_mut(&mut self) -> &mut ConfigA {
        &mut self.config_a.tx
    }
    pub fn config_b(&self) -> &ConfigB {
        &self.config_b.tx
    }
    pub fn config_b_mut(&mut self) -> &mut ConfigB {
        &mut self.config_b.tx
    }
    /// Configuration register group A as last read back
    pub fn received_config_a(&self) -> ConfigA {
        ConfigA::from_bytes(self.config_a.rx.data)
    }
    /// Configuration register group B as last read back
    pub fn received_config_b(&self) -> ConfigB {
        ConfigB::from_bytes(self.config_b.rx.data)
    }
    pub fn config_a_register(&self) -> &WriteRegister<ConfigA> {
        &self.config_a
    }
    pub fn config_b_register(&self) -> &WriteRegister<ConfigB> {
        &self.config_b
    }

    pub fn comm(&self) -> &CommRegister {
        &self.comm.tx
    }
    pub fn comm_mut(&mut self) -> &mut CommRegister {
        &mut self.comm.tx
    }
    /// COMM register group as last read back
    pub fn received_comm(&self) -> CommRegister {
        CommRegister::from_bytes(self.comm.rx.data)
    }
    pub fn comm_register(&self) -> &WriteRegister<CommRegister> {
        &self.comm
    }

    /// Switch the discharge of cell `cell` (1 based)
    pub fn set_cell_discharge(&mut self, cell: u8, on: bool) -> Result<(), ParameterError> {
        if cell == 0 || cell as usize > self.shape.cells {
            return Err(ParameterError::CellOutOfRange(cell));
        }
        if cell <= CONFIG_A_CELLS {
            self.config_a.tx.set_cell_discharge(cell, on)
        } else {
            self.config_b.tx.set_cell_discharge(cell, on)
        }
    }
    /// Clear every discharge switch
    pub fn clear_discharge(&mut self) {
        self.config_a.tx.set_discharge(0);
        self.config_b.tx.set_discharge(0);
        self.config_b.tx.set_gpio9_discharge(false);
    }

    /// PEC mismatch flag of the last read of `kind`
    pub fn pec_mismatch(&self, kind: RegisterKind) -> bool {
        match kind {
            RegisterKind::ConfigA => self.config_a.pec_mismatch,
            RegisterKind::ConfigB => self.config_b.pec_mismatch,
            RegisterKind::Cell(group) => self.cells.pec_mismatch(group),
            RegisterKind::Aux(group) => self.aux.pec_mismatch(group),
            RegisterKind::Status(group) => self.status.pec_mismatch(group),
            RegisterKind::Comm => self.comm.pec_mismatch,
        }
    }
}

/// Build the configuration register contents for `settings`
///
/// Fails without side effects when a value doesn't fit `shape`.
fn configuration(
    settings: &ChipSettings,
    shape: &RegisterShape,
) -> Result<(ConfigA, ConfigB), ParameterError> {
    let highest_gpio = if shape.config_b { 9 } else { 5 };
    if settings.gpio_pulls >> highest_gpio != 0 {
        let gpio = 16 - settings.gpio_pulls.leading_zeros() as u8;
        return Err(ParameterError::GpioOutOfRange(gpio));
    }
    if settings.discharge >> shape.cells != 0 {
        let cell = 32 - settings.discharge.leading_zeros() as u8;
        return Err(ParameterError::CellOutOfRange(cell));
    }

    let mut a = ConfigA::default();
    a.set_reference_on(settings.reference_on);
    a.set_adc_option(settings.adc_option);
    a.set_gpio_pulls((settings.gpio_pulls & 0x1F) as u8);
    a.set_under_voltage(settings.under_voltage)?;
    a.set_over_voltage(settings.over_voltage);
    a.set_discharge((settings.discharge & 0x0FFF) as u16);
    a.set_discharge_timeout(settings.discharge_timeout);

    let mut b = ConfigB::default();
    if shape.config_b {
        b.set_gpio_pulls((settings.gpio_pulls >> 5) as u8);
        b.set_discharge((settings.discharge >> 12) as u8);
    }
    Ok((a, b))
}

/// All chips of a daisy chain of `N`
#[derive(Debug, Clone)]
pub struct Chain<const N: usize> {
    pub(crate) chips: [Chip; N],
    pub(crate) topology: ChainTopology<N>,
    shape: RegisterShape,
}

impl<const N: usize> Chain<N> {
    /// Chain of `N` chips of the same variant, none of them wired in reverse
    pub fn new(shape: RegisterShape) -> Self {
        Self::with_topology(shape, ChainTopology::new())
    }
    pub fn with_topology(shape: RegisterShape, topology: ChainTopology<N>) -> Self {
        const { assert!(N >= 1 && N <= MAX_CHAIN_LEN, "Unsupported chain length") };
        Self {
            chips: [Chip::new(shape); N],
            topology,
            shape,
        }
    }
    pub const fn len(&self) -> usize {
        N
    }
    pub const fn is_empty(&self) -> bool {
        false
    }
    pub fn shape(&self) -> &RegisterShape {
        &self.shape
    }
    pub fn topology(&self) -> &ChainTopology<N> {
        &self.topology
    }
    pub fn is_reversed(&self, index: usize) -> bool {
        self.topology.is_reversed(index)
    }
    pub fn chip(&self, index: usize) -> Option<&Chip> {
        self.chips.get(index)
    }
    pub fn chip_mut(&mut self, index: usize) -> Option<&mut Chip> {
        self.chips.get_mut(index)
    }
    pub fn chips(&self) -> &[Chip; N] {
        &self.chips
    }
    pub fn iter(&self) -> impl Iterator<Item = &Chip> {
        self.chips.iter()
    }

    /// Replace the configuration of every chip with `settings`
    pub fn configure(&mut self, settings: &ChipSettings) -> Result<(), ParameterError> {
        let (a, b) = configuration(settings, &self.shape)?;
        debug!(
            "Configuring {N} {} chips: {:02X?} {:02X?}",
            self.shape.name,
            a.bytes(),
            b.bytes()
        );
        for chip in self.chips.iter_mut() {
            chip.config_a.tx = a;
            chip.config_b.tx = b;
        }
        Ok(())
    }
    /// Turn on the discharge of cell `cell` (1 based) on every chip
    pub fn set_discharge(&mut self, cell: u8) -> Result<(), ParameterError> {
        for chip in self.chips.iter_mut() {
            chip.set_cell_discharge(cell, true)?;
        }
        Ok(())
    }
    /// Turn off every discharge switch on every chip
    pub fn clear_discharge(&mut self) {
        for chip in self.chips.iter_mut() {
            chip.clear_discharge();
        }
    }
    /// Zero the PEC mismatch counters of every chip
    pub fn reset_pec_counters(&mut self) {
        for chip in self.chips.iter_mut() {
            chip.pec_counters.reset();
        }
    }

    /// Count the mismatch flag of `kind` on every chip
    pub(crate) fn record_mismatches(&mut self, kind: RegisterKind) {
        for chip in self.chips.iter_mut() {
            if chip.pec_mismatch(kind) {
                chip.pec_counters.record(kind);
            }
        }
    }
}

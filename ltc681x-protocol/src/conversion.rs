//! Conversion start, completion polling and register clearing

use embedded_hal::delay::DelayNs;
use fugit::MicrosDurationU32;
use log::{debug, warn};
use zerocopy::IntoBytes;

use crate::commands::CommandCode;
use crate::commands::adc::{
    self, AdcMode, AuxSelection, CellSelection, OpenWirePull, SelfTest, StatusSelection,
};
use crate::frame::CommandFrame;
use crate::transport::Transport;
use crate::{Error, Ltc681x};

/// Default number of bytes clocked before a conversion is given up on
pub const DEFAULT_POLL_LIMIT: u32 = 20_000;
/// Time accounted per polled byte
pub const POLL_STEP_US: u32 = 10;

/// Result of polling for the end of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Conversion done, with the approximate time it took
    Complete(MicrosDurationU32),
    /// The poll limit was reached without the chips reporting completion
    TimedOut,
}

impl<T: Transport, D: DelayNs, const N: usize> Ltc681x<T, D, N> {
    /// Start a cell voltage conversion (`ADCV`)
    pub fn start_cell_conversion(
        &mut self,
        mode: AdcMode,
        discharge_permitted: bool,
        cells: CellSelection,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adcv(mode, discharge_permitted, cells))
    }
    /// Start a GPIO conversion (`ADAX`)
    pub fn start_aux_conversion(
        &mut self,
        mode: AdcMode,
        channels: AuxSelection,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adax(mode, channels))
    }
    /// Start a status group conversion (`ADSTAT`)
    pub fn start_status_conversion(
        &mut self,
        mode: AdcMode,
        channels: StatusSelection,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adstat(mode, channels))
    }
    /// Start a cell voltage and sum of cells conversion (`ADCVSC`)
    pub fn start_cell_and_sum_conversion(
        &mut self,
        mode: AdcMode,
        discharge_permitted: bool,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adcvsc(mode, discharge_permitted))
    }
    /// Start a cell voltage and GPIO 1/2 conversion (`ADCVAX`)
    pub fn start_cell_and_gpio_conversion(
        &mut self,
        mode: AdcMode,
        discharge_permitted: bool,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adcvax(mode, discharge_permitted))
    }
    /// Start an open wire check conversion (`ADOW`)
    pub fn start_open_wire_conversion(
        &mut self,
        mode: AdcMode,
        pull: OpenWirePull,
        discharge_permitted: bool,
        cells: CellSelection,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adow(mode, pull, discharge_permitted, cells))
    }
    /// Start an overlap measurement of cell 7 (and 13) (`ADOL`)
    pub fn start_overlap_conversion(
        &mut self,
        mode: AdcMode,
        discharge_permitted: bool,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::adol(mode, discharge_permitted))
    }
    /// Start the digital filter self test of the cell registers (`CVST`)
    pub fn start_cell_self_test(
        &mut self,
        mode: AdcMode,
        test: SelfTest,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::cvst(mode, test))
    }
    /// Start the digital filter self test of the auxiliary registers (`AXST`)
    pub fn start_aux_self_test(
        &mut self,
        mode: AdcMode,
        test: SelfTest,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::axst(mode, test))
    }
    /// Start the digital filter self test of the status registers (`STATST`)
    pub fn start_status_self_test(
        &mut self,
        mode: AdcMode,
        test: SelfTest,
    ) -> Result<(), Error<T::Error>> {
        self.send_command(adc::statst(mode, test))
    }
    /// Start the multiplexer self test (`DIAGN`)
    ///
    /// The result shows up as [StatusRegisters::mux_fail](crate::registers::StatusRegisters::mux_fail)
    /// after the next status group B read.
    pub fn diagnose_mux(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(CommandCode::DiagnoseMux.opcode())
    }

    /// Reset every cell voltage register to `0xFF` (`CLRCELL`)
    pub fn clear_cells(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(CommandCode::ClearCells.opcode())
    }
    /// Reset every auxiliary register to `0xFF` (`CLRAUX`)
    pub fn clear_aux(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(CommandCode::ClearAux.opcode())
    }
    /// Reset the status registers to `0xFF` (`CLRSTAT`)
    pub fn clear_status(&mut self) -> Result<(), Error<T::Error>> {
        self.send_command(CommandCode::ClearStatus.opcode())
    }

    /// Wait for the running conversion to finish (`PLADC`)
    ///
    /// The chips hold the data line low until every one of them is done.
    /// Single filler bytes are clocked until a non-zero byte comes back, at
    /// most [LinkTiming::poll_limit](crate::LinkTiming::poll_limit) of them.
    pub fn poll_conversion(&mut self) -> Result<PollOutcome, Error<T::Error>> {
        let frame = CommandFrame::new(CommandCode::PollAdc.opcode());
        let limit = self.timing.poll_limit;
        let polled = self
            .transport
            .transmit_and_poll(frame.as_bytes(), limit, |byte| byte != 0)
            .map_err(Error::Transport)?;
        match polled {
            Some(count) => {
                let elapsed = MicrosDurationU32::from_ticks(count.saturating_mul(POLL_STEP_US));
                debug!("Conversion complete after {}µs", elapsed.to_micros());
                Ok(PollOutcome::Complete(elapsed))
            }
            None => {
                warn!("Conversion not complete after polling {limit} bytes");
                Ok(PollOutcome::TimedOut)
            }
        }
    }
}

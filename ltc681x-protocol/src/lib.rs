//! Protocol stack for daisy chains of LTC6811, LTC6812 and LTC6813 battery
//! stack monitors
//!
//! [Ltc681x] drives a [Chain] over any [Transport]: it frames commands,
//! protects payloads with the PEC, orders per chip data for the daisy chain
//! and decodes the responses into the register model, counting every PEC
//! mismatch.
//!
//! ```ignore
//! let chain = Chain::<4>::new(RegisterShape::LTC6811);
//! let mut bms = Ltc681x::new(SpiTransport::new(spi, cs), delay, chain, settings.link.into());
//! bms.chain_mut().configure(&settings.chip)?;
//! bms.wake_from_sleep()?;
//! bms.write_config_a()?;
//! bms.start_cell_conversion(AdcMode::Normal, false, CellSelection::All)?;
//! if let PollOutcome::Complete(elapsed) = bms.poll_conversion()? {
//!     let report = bms.read_cells()?;
//! }
//! ```
#![cfg_attr(not(test), no_std)]
use core::fmt::{Debug, Display};

use embedded_hal::delay::DelayNs;
use log::debug;
use zerocopy::IntoBytes;

pub mod commands;
pub mod conversion;
pub mod frame;
pub mod link;
pub mod measurement;
pub mod pec;
pub mod registers;
pub mod settings;
#[cfg(test)]
mod sim;
pub mod topology;
pub mod transport;
pub mod types;
mod util;

pub use commands::adc::{AdcMode, AuxSelection, CellSelection, StatusSelection};
pub use commands::{CommandCode, Opcode};
pub use conversion::PollOutcome;
pub use frame::FrameError;
pub use link::{LinkState, LinkTiming};
pub use measurement::{AuxGroup, CellGroup, PecReport, StatusGroup};
pub use registers::{Chain, Chip, RegisterShape};
pub use settings::Settings;
pub use topology::ChainTopology;
pub use transport::{SpiTransport, Transport};

use crate::frame::{CommandFrame, DATA_LEN, MAX_WRITE_FRAME_LEN, RegisterGroup, encode_write};
use crate::registers::comm::{COMM_WORDS, CommRegister, MUX_CHANNELS, MUX_COUNT};
use crate::registers::counters::RegisterKind;

/// Number of clock bytes needed to shift one byte out of the COMM register
const COMM_CLOCKS_PER_BYTE: usize = 3;

/// Daisy chain controller
///
/// Owns the bus, the delay source and the register model. Every operation
/// is one blocking transaction.
pub struct Ltc681x<T, D, const N: usize> {
    transport: T,
    delay: D,
    chain: Chain<N>,
    timing: LinkTiming,
}

impl<T: Transport, D: DelayNs, const N: usize> Ltc681x<T, D, N> {
    pub fn new(transport: T, delay: D, chain: Chain<N>, timing: LinkTiming) -> Self {
        Ltc681x {
            transport,
            delay,
            chain,
            timing,
        }
    }
    /// Give back the bus and the delay source
    pub fn release(self) -> (T, D) {
        (self.transport, self.delay)
    }
    pub fn chain(&self) -> &Chain<N> {
        &self.chain
    }
    pub fn chain_mut(&mut self) -> &mut Chain<N> {
        &mut self.chain
    }
    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    /// Send a command without payload
    pub fn send_command(&mut self, opcode: Opcode) -> Result<(), Error<T::Error>> {
        debug!("Command {opcode}");
        let frame = CommandFrame::new(opcode);
        self.transport
            .transmit(frame.as_bytes())
            .map_err(Error::Transport)
    }

    /// Send a command followed by one payload per chip (logical order)
    fn write(
        &mut self,
        opcode: Opcode,
        payloads: &[[u8; DATA_LEN]; N],
    ) -> Result<(), Error<T::Error>> {
        debug!("Write {opcode} to {N} chips");
        let mut buf = [0u8; MAX_WRITE_FRAME_LEN];
        let frame = encode_write(opcode, payloads, &self.chain.topology, &mut buf)?;
        self.transport.transmit(frame).map_err(Error::Transport)
    }

    /// Send a read command and receive one register group per position
    fn read(&mut self, opcode: Opcode) -> Result<[RegisterGroup; N], Error<T::Error>> {
        debug!("Read {opcode} from {N} chips");
        let frame = CommandFrame::new(opcode);
        let mut groups = [RegisterGroup::default(); N];
        self.transport
            .transmit_and_receive(frame.as_bytes(), groups.as_mut_bytes())
            .map_err(Error::Transport)?;
        Ok(groups)
    }

    /// Write configuration register group A of every chip
    pub fn write_config_a(&mut self) -> Result<(), Error<T::Error>> {
        let payloads = core::array::from_fn(|i| self.chain.chips[i].config_a().bytes());
        self.write(CommandCode::WriteConfigA.opcode(), &payloads)
    }
    /// Write configuration register group B of every chip (LTC6812, LTC6813)
    pub fn write_config_b(&mut self) -> Result<(), Error<T::Error>> {
        self.require_config_b()?;
        let payloads = core::array::from_fn(|i| self.chain.chips[i].config_b().bytes());
        self.write(CommandCode::WriteConfigB.opcode(), &payloads)
    }
    /// Read back configuration register group A of every chip
    pub fn read_config_a(&mut self) -> Result<PecReport, Error<T::Error>> {
        self.read_readback(CommandCode::ReadConfigA, RegisterKind::ConfigA)
    }
    /// Read back configuration register group B of every chip (LTC6812, LTC6813)
    pub fn read_config_b(&mut self) -> Result<PecReport, Error<T::Error>> {
        self.require_config_b()?;
        self.read_readback(CommandCode::ReadConfigB, RegisterKind::ConfigB)
    }
    fn require_config_b(&self) -> Result<(), Error<T::Error>> {
        if self.chain.shape().config_b {
            Ok(())
        } else {
            Err(ParameterError::RegisterGroupUnavailable.into())
        }
    }
    fn read_readback(
        &mut self,
        command: CommandCode,
        kind: RegisterKind,
    ) -> Result<PecReport, Error<T::Error>> {
        let groups = self.read(command.opcode())?;
        let report = measurement::parse_readback(&mut self.chain, kind, groups.as_bytes())?;
        self.chain.record_mismatches(kind);
        Ok(report)
    }

    /// Read every cell voltage register group of the chip variant
    pub fn read_cells(&mut self) -> Result<PecReport, Error<T::Error>> {
        let mut report = PecReport::default();
        for group in CellGroup::available(self.chain.shape()) {
            report = report.merge(self.read_cell_group(*group)?);
        }
        Ok(report)
    }
    /// Read a single cell voltage register group
    pub fn read_cell_group(&mut self, group: CellGroup) -> Result<PecReport, Error<T::Error>> {
        group.check(self.chain.shape())?;
        let groups = self.read(group.opcode())?;
        let report = measurement::parse_cells(&mut self.chain, group, groups.as_bytes())?;
        self.chain.record_mismatches(RegisterKind::Cell(group.index()));
        Ok(report)
    }

    /// Read every auxiliary register group of the chip variant
    pub fn read_aux(&mut self) -> Result<PecReport, Error<T::Error>> {
        let mut report = PecReport::default();
        for group in AuxGroup::available(self.chain.shape()) {
            report = report.merge(self.read_aux_group(*group)?);
        }
        Ok(report)
    }
    /// Read a single auxiliary register group
    pub fn read_aux_group(&mut self, group: AuxGroup) -> Result<PecReport, Error<T::Error>> {
        group.check(self.chain.shape())?;
        let groups = self.read(group.opcode())?;
        let report = measurement::parse_aux(&mut self.chain, group, groups.as_bytes())?;
        self.chain.record_mismatches(RegisterKind::Aux(group.index()));
        Ok(report)
    }

    /// Read both status register groups
    pub fn read_status(&mut self) -> Result<PecReport, Error<T::Error>> {
        let mut report = PecReport::default();
        for group in StatusGroup::available(self.chain.shape()) {
            report = report.merge(self.read_status_group(*group)?);
        }
        Ok(report)
    }
    /// Read a single status register group
    pub fn read_status_group(&mut self, group: StatusGroup) -> Result<PecReport, Error<T::Error>> {
        group.check(self.chain.shape())?;
        let groups = self.read(group.opcode())?;
        let report = measurement::parse_status(&mut self.chain, group, groups.as_bytes())?;
        self.chain.record_mismatches(RegisterKind::Status(group.index()));
        Ok(report)
    }

    /// Write the COMM register group of every chip
    pub fn write_comm(&mut self) -> Result<(), Error<T::Error>> {
        let payloads = core::array::from_fn(|i| self.chain.chips[i].comm().bytes());
        self.write(CommandCode::WriteComm.opcode(), &payloads)
    }
    /// Read back the COMM register group of every chip
    pub fn read_comm(&mut self) -> Result<PecReport, Error<T::Error>> {
        self.read_readback(CommandCode::ReadComm, RegisterKind::Comm)
    }
    /// Relay the first `bytes` words of every COMM register group
    ///
    /// Sends `STCOMM` and clocks the bus for as long as the chips need to
    /// shift the bytes out on their GPIOs.
    pub fn start_comm(&mut self, bytes: usize) -> Result<(), Error<T::Error>> {
        if !(1..=COMM_WORDS).contains(&bytes) {
            return Err(ParameterError::CommLength(bytes).into());
        }
        debug!("Command {}, relaying {bytes} bytes", Opcode::from(CommandCode::StartComm));
        let frame = CommandFrame::new(CommandCode::StartComm.opcode());
        let mut clocks = [0u8; COMM_WORDS * COMM_CLOCKS_PER_BYTE];
        self.transport
            .transmit_and_receive(frame.as_bytes(), &mut clocks[..bytes * COMM_CLOCKS_PER_BYTE])
            .map_err(Error::Transport)
    }

    /// Relay `register` through the COMM group of every chip
    ///
    /// Loads it into every chip, then writes, relays all three words and
    /// reads back, waking the chain before each step. The chips' view of the
    /// transfer ends up in [Chip::received_comm].
    pub fn relay_comm(&mut self, register: CommRegister) -> Result<PecReport, Error<T::Error>> {
        for chip in self.chain.chips.iter_mut() {
            *chip.comm_mut() = register;
        }
        self.wake_from_sleep()?;
        self.write_comm()?;
        self.wake_from_idle()?;
        self.start_comm(COMM_WORDS)?;
        self.wake_from_idle()?;
        self.read_comm()
    }
    /// Open every switch of both thermistor multiplexers
    pub fn reset_muxes(&mut self) -> Result<PecReport, Error<T::Error>> {
        let mut report = PecReport::default();
        for address in 0..MUX_COUNT {
            report = report.merge(self.relay_comm(CommRegister::mux_reset(address)?)?);
        }
        Ok(report)
    }
    /// Route thermistor `channel` (1..=16) to the multiplexer outputs
    ///
    /// Channels 1 to 8 are on the first multiplexer, 9 to 16 on the second.
    /// Both are reset first so only one switch is ever closed.
    pub fn select_mux_channel(&mut self, channel: u8) -> Result<PecReport, Error<T::Error>> {
        if !(1..=MUX_COUNT * MUX_CHANNELS).contains(&channel) {
            return Err(ParameterError::MuxChannel(channel).into());
        }
        let index = channel - 1;
        let register = CommRegister::mux_select(index / MUX_CHANNELS, index % MUX_CHANNELS + 1)?;
        debug!("Selecting multiplexer channel {channel}");
        let report = self.reset_muxes()?;
        Ok(report.merge(self.relay_comm(register)?))
    }
}

/// Arguments rejected before any byte is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParameterError {
    /// Conversion mode selector out of range
    ModeOutOfRange(u8),
    /// Channel selector out of range
    ChannelOutOfRange(u8),
    /// Wiring reversal flags put two chips at the same position
    WiringTopology,
    /// Cell doesn't exist on the chip
    CellOutOfRange(u8),
    /// GPIO doesn't exist on the chip
    GpioOutOfRange(u8),
    /// Register group doesn't exist on the chip
    RegisterGroupUnavailable,
    /// Threshold can't be represented
    ThresholdOutOfRange(u16),
    /// Number of COMM bytes to relay out of range
    CommLength(usize),
    /// Multiplexer channel out of range
    MuxChannel(u8),
    /// Multiplexer address pins out of range
    MuxAddress(u8),
}
impl Display for ParameterError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParameterError::ModeOutOfRange(v) => write!(f, "Conversion mode {v} out of range"),
            ParameterError::ChannelOutOfRange(v) => write!(f, "Channel selector {v} out of range"),
            ParameterError::WiringTopology => {
                write!(f, "Wiring reversal maps two chips to one position")
            }
            ParameterError::CellOutOfRange(v) => write!(f, "Cell {v} out of range"),
            ParameterError::GpioOutOfRange(v) => write!(f, "GPIO {v} out of range"),
            ParameterError::RegisterGroupUnavailable => {
                write!(f, "Register group not present on this chip")
            }
            ParameterError::ThresholdOutOfRange(v) => write!(f, "Threshold {v} out of range"),
            ParameterError::CommLength(v) => write!(f, "Can't relay {v} COMM bytes"),
            ParameterError::MuxChannel(v) => write!(f, "Multiplexer channel {v} out of range"),
            ParameterError::MuxAddress(v) => write!(f, "Multiplexer address {v} out of range"),
        }
    }
}
impl core::error::Error for ParameterError {}

#[derive(Debug)]
#[non_exhaustive]
pub enum Error<T> {
    /// Transport layer error
    Transport(T),
    /// Invalid argument, nothing was sent
    InvalidParameter(ParameterError),
    /// Response length doesn't match the chain
    ChainShape { expected: usize, received: usize },
    /// Internal error
    ///
    /// Encountered a error while assembling a frame.
    Internal,
}

impl<T: Debug> Display for Error<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "Transport error: {e:?}"),
            Error::InvalidParameter(e) => write!(f, "Invalid parameter: {e}"),
            Error::ChainShape { expected, received } => write!(
                f,
                "Chain shape mismatch: expected {expected} bytes, received {received}"
            ),
            Error::Internal => write!(f, "Internal error"),
        }
    }
}
impl<T: core::error::Error + 'static> core::error::Error for Error<T> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}
impl<T> From<ParameterError> for Error<T> {
    fn from(value: ParameterError) -> Self {
        Self::InvalidParameter(value)
    }
}
impl<T> From<FrameError> for Error<T> {
    fn from(value: FrameError) -> Self {
        match value {
            FrameError::ChainShape { expected, received } => {
                Error::ChainShape { expected, received }
            }
            FrameError::BufferTooSmall { .. } => Error::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::adc::{AdcMode, CellSelection};
    use crate::registers::comm::{CommWord, Fcom, Icom};
    use crate::settings::ChipSettings;
    use crate::sim::{Corruption, RecordingDelay, SimulatedChain, init_logger};

    fn controller<const N: usize>(
        shape: RegisterShape,
        topology: ChainTopology<N>,
    ) -> Ltc681x<SimulatedChain<N>, RecordingDelay, N> {
        init_logger();
        let mut chain = Chain::with_topology(shape, topology);
        chain.configure(&ChipSettings::default()).unwrap();
        Ltc681x::new(
            SimulatedChain::new(shape),
            RecordingDelay::default(),
            chain,
            LinkTiming::default(),
        )
    }

    #[test]
    fn test_config_round_trip_under_any_topology() {
        for flags in [
            [false, false, false, false],
            [true, true, true, true],
            [true, false, false, true],
            [false, true, true, false],
        ] {
            let topology = ChainTopology::from_flags(flags).unwrap();
            let mut bms = controller(RegisterShape::LTC6811, topology);
            for index in 0..4 {
                let chip = bms.chain_mut().chip_mut(index).unwrap();
                chip.set_cell_discharge(index as u8 + 1, true).unwrap();
            }
            bms.write_config_a().unwrap();
            let report = bms.read_config_a().unwrap();
            assert!(report.is_clean());
            for chip in bms.chain().iter() {
                assert_eq!(chip.received_config_a(), *chip.config_a(), "{flags:?}");
            }
            // Every chip got its own payload
            for index in 0..4 {
                let position = topology.position(index);
                assert_eq!(
                    bms.transport.config_a(position),
                    bms.chain().chip(index).unwrap().config_a().bytes()
                );
            }
        }
    }
    #[test]
    fn test_read_cells_of_every_group() {
        let mut bms = controller(RegisterShape::LTC6813, ChainTopology::<2>::new());
        bms.transport.set_cells(1, core::array::from_fn(|i| 30000 + i as u16));
        let report = bms.read_cells().unwrap();
        assert!(report.is_clean());
        assert_eq!(bms.transport.reads(), 6);
        let chip = bms.chain().chip(1).unwrap();
        assert_eq!(chip.cell_codes()[0], 30000);
        assert_eq!(chip.cell_codes()[17], 30017);
        assert_eq!(bms.chain().chip(0).unwrap().cell_codes(), &[0; 18]);
    }
    #[test]
    fn test_corrupted_reads_count_once_per_read() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<3>::new());
        bms.transport.corrupt(Corruption {
            opcode: CommandCode::ReadCellB.opcode(),
            position: 2,
            byte: 3,
        });
        for read in 1..=5 {
            let report = bms.read_cells().unwrap();
            assert_eq!(report.mismatches, 1);
            let counters = bms.chain().chip(2).unwrap().pec_counters();
            assert_eq!(counters.cell, [0, read, 0, 0, 0, 0]);
            assert_eq!(counters.total, read);
        }
        let _ = bms.read_status().unwrap();
        let _ = bms.read_aux().unwrap();
        let _ = bms.read_config_a().unwrap();
        let counters = *bms.chain().chip(2).unwrap().pec_counters();
        assert_eq!(counters.total, 5);
        assert_eq!(counters.config, 0);
        assert_eq!(counters.aux, [0; 4]);
        assert_eq!(counters.status, [0; 2]);
        assert_eq!(bms.chain().chip(0).unwrap().pec_counters().total, 0);
        assert_eq!(bms.chain().chip(1).unwrap().pec_counters().total, 0);

        bms.chain_mut().reset_pec_counters();
        for chip in bms.chain().iter() {
            assert_eq!(chip.pec_counters(), &Default::default());
        }
    }
    #[test]
    fn test_single_group_read_counts_only_that_group() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<2>::new());
        bms.transport.corrupt(Corruption {
            opcode: CommandCode::ReadStatusB.opcode(),
            position: 0,
            byte: 5,
        });
        let report = bms.read_status_group(StatusGroup::A).unwrap();
        assert!(report.is_clean());
        let report = bms.read_status_group(StatusGroup::B).unwrap();
        assert_eq!(report.mismatches, 1);
        let counters = bms.chain().chip(0).unwrap().pec_counters();
        assert_eq!(counters.status, [0, 1]);
    }
    #[test]
    fn test_unavailable_groups_send_nothing() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<2>::new());
        assert!(matches!(
            bms.read_cell_group(CellGroup::E),
            Err(Error::InvalidParameter(ParameterError::RegisterGroupUnavailable))
        ));
        assert!(matches!(
            bms.read_aux_group(AuxGroup::C),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(bms.write_config_b(), Err(Error::InvalidParameter(_))));
        assert!(matches!(bms.read_config_b(), Err(Error::InvalidParameter(_))));
        assert!(matches!(bms.start_comm(0), Err(Error::InvalidParameter(_))));
        assert!(matches!(bms.start_comm(4), Err(Error::InvalidParameter(_))));
        assert_eq!(bms.transport.bytes_sent(), 0);
    }
    #[test]
    fn test_config_b_on_ltc6813() {
        let mut bms = controller(RegisterShape::LTC6813, ChainTopology::<2>::new());
        bms.chain_mut().set_discharge(18).unwrap();
        bms.write_config_b().unwrap();
        let report = bms.read_config_b().unwrap();
        assert!(report.is_clean());
        for chip in bms.chain().iter() {
            assert_eq!(chip.received_config_b().discharge(), 0b10_0000);
        }
    }
    #[test]
    fn test_comm_round_trip() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<2>::new());
        let register = CommRegister::from_words([
            CommWord::new(Icom::Start, 0xE0, Fcom::Nack),
            CommWord::new(Icom::Blank, 0x09, Fcom::NackStop),
            CommWord::default(),
        ]);
        *bms.chain_mut().chip_mut(1).unwrap().comm_mut() = register;
        bms.write_comm().unwrap();
        bms.start_comm(2).unwrap();
        assert_eq!(bms.transport.last_filler(), 6);
        let report = bms.read_comm().unwrap();
        assert!(report.is_clean());
        assert_eq!(bms.chain().chip(1).unwrap().received_comm(), register);
        assert_eq!(
            bms.chain().chip(0).unwrap().received_comm(),
            CommRegister::idle()
        );
    }
    #[test]
    fn test_select_mux_channel() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<2>::new());
        let report = bms.select_mux_channel(12).unwrap();
        assert!(report.is_clean());
        // Two resets then the selection, each one a write, start and read
        assert_eq!(bms.transport.reads(), 3);
        let expected = CommRegister::mux_select(1, 4).unwrap();
        assert_eq!(expected.bytes(), [0x69, 0xA0, 0x00, 0x80, 0x10, 0x00]);
        for chip in bms.chain().iter() {
            assert_eq!(chip.received_comm(), expected);
        }
        assert_eq!(&bms.transport.filler_bursts()[..6], &[300, 300, 1, 1, 1, 1]);
    }
    #[test]
    fn test_mux_channel_out_of_range_sends_nothing() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<2>::new());
        for channel in [0, 17] {
            assert!(matches!(
                bms.select_mux_channel(channel),
                Err(Error::InvalidParameter(ParameterError::MuxChannel(c))) if c == channel
            ));
        }
        assert_eq!(bms.transport.bytes_sent(), 0);
    }
    #[test]
    fn test_error_source() {
        use core::error::Error as _;
        let error = Error::Transport(core::fmt::Error);
        assert!(error.source().is_some());
        let error = Error::<core::fmt::Error>::Internal;
        assert!(error.source().is_none());
    }
    #[test]
    fn test_conversion_then_read() {
        let mut bms = controller(RegisterShape::LTC6811, ChainTopology::<1>::new());
        bms.transport.set_cells(0, [33000; 18]);
        bms.start_cell_conversion(AdcMode::Normal, false, CellSelection::All)
            .unwrap();
        assert_eq!(
            bms.transport.last_command(),
            Some(commands::adc::adcv(AdcMode::Normal, false, CellSelection::All))
        );
        assert!(matches!(bms.poll_conversion().unwrap(), PollOutcome::Complete(_)));
        let _ = bms.read_cells().unwrap();
        assert!(bms.chain().chip(0).unwrap().cell_codes().iter().all(|c| *c == 33000));
    }
    #[test]
    fn test_release() {
        let bms = controller(RegisterShape::LTC6811, ChainTopology::<1>::new());
        let (transport, _delay) = bms.release();
        assert_eq!(transport.bytes_sent(), 0);
    }
}

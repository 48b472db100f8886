//! Simulated daisy chain for tests
//!
//! Answers frames the way a chain of chips does: write payloads are shifted
//! through so the first one ends up at the farthest position, read responses
//! come back nearest position first.

use std::sync::Once;
use std::vec::Vec;

use core::convert::Infallible;
use embedded_hal::delay::DelayNs;
use log::{trace, warn};

use crate::commands::{CommandCode, Opcode};
use crate::frame::{COMMAND_LEN, DATA_LEN, GROUP_LEN, RegisterGroup};
use crate::measurement::{AuxGroup, CellGroup};
use crate::pec::calculate_pec;
use crate::registers::RegisterShape;
use crate::transport::Transport;
use zerocopy::IntoBytes;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        simple_logger::init_with_level(log::Level::Debug).unwrap();
    });
}

/// Registers of one simulated chip
#[derive(Debug, Clone, Copy, Default)]
struct SimChip {
    config_a: [u8; DATA_LEN],
    config_b: [u8; DATA_LEN],
    comm: [u8; DATA_LEN],
    cells: [u16; 18],
    aux: [u16; 12],
    status: [[u8; DATA_LEN]; 2],
}

/// Flip one bit of a data byte in every response to `opcode`
#[derive(Debug, Clone, Copy)]
pub struct Corruption {
    pub opcode: Opcode,
    pub position: usize,
    pub byte: usize,
}

pub struct SimulatedChain<const N: usize> {
    shape: RegisterShape,
    /// Indexed by position
    chips: [SimChip; N],
    corruption: Option<Corruption>,
    /// Zero bytes returned before the conversion is done, `None` for never
    conversion_time: Option<u32>,
    bytes_sent: usize,
    reads: usize,
    polled: u32,
    last_command: Option<Opcode>,
    last_filler: usize,
    filler_bursts: Vec<usize>,
}

impl<const N: usize> SimulatedChain<N> {
    pub fn new(shape: RegisterShape) -> Self {
        Self {
            shape,
            chips: [SimChip::default(); N],
            corruption: None,
            conversion_time: Some(100),
            bytes_sent: 0,
            reads: 0,
            polled: 0,
            last_command: None,
            last_filler: 0,
            filler_bursts: Vec::new(),
        }
    }
    pub fn config_a(&self, position: usize) -> [u8; DATA_LEN] {
        self.chips[position].config_a
    }
    pub fn set_cells(&mut self, position: usize, codes: [u16; 18]) {
        self.chips[position].cells = codes;
    }
    pub fn corrupt(&mut self, corruption: Corruption) {
        self.corruption = Some(corruption);
    }
    pub fn set_conversion_time(&mut self, bytes: Option<u32>) {
        self.conversion_time = bytes;
    }
    /// Bytes the controller clocked out, fillers included
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }
    /// Number of read commands answered
    pub fn reads(&self) -> usize {
        self.reads
    }
    /// Bytes clocked by the last poll
    pub fn polled(&self) -> u32 {
        self.polled
    }
    pub fn last_command(&self) -> Option<Opcode> {
        self.last_command
    }
    /// Bytes clocked after the command of the last read transaction
    pub fn last_filler(&self) -> usize {
        self.last_filler
    }
    pub fn filler_bursts(&self) -> &[usize] {
        &self.filler_bursts
    }

    fn command(&mut self, bytes: &[u8]) -> Option<Opcode> {
        let opcode = Opcode::from_bytes(bytes[0], bytes[1]);
        let pec = u16::from_be_bytes([bytes[2], bytes[3]]);
        if calculate_pec(&bytes[..2]) != pec {
            warn!("Simulated chain dropped command with bad PEC {bytes:02X?}");
            return None;
        }
        self.last_command = Some(opcode);
        Some(opcode)
    }

    fn register_mut(&mut self, opcode: Opcode, position: usize) -> Option<&mut [u8; DATA_LEN]> {
        let chip = &mut self.chips[position];
        match CommandCode::from_opcode(opcode)? {
            CommandCode::WriteConfigA => Some(&mut chip.config_a),
            CommandCode::WriteConfigB if self.shape.config_b => Some(&mut chip.config_b),
            CommandCode::WriteComm => Some(&mut chip.comm),
            _ => None,
        }
    }

    fn register(&self, opcode: Opcode, position: usize) -> Option<[u8; DATA_LEN]> {
        let chip = &self.chips[position];
        let codes = |codes: &[u16]| {
            let mut data = [0; DATA_LEN];
            for (bytes, code) in data.chunks_exact_mut(2).zip(codes) {
                bytes.copy_from_slice(&code.to_le_bytes());
            }
            data
        };
        if let Some(g) = CellGroup::available(&self.shape)
            .iter()
            .position(|group| group.opcode() == opcode)
        {
            return Some(codes(&chip.cells[g * 3..g * 3 + 3]));
        }
        if let Some(g) = AuxGroup::available(&self.shape)
            .iter()
            .position(|group| group.opcode() == opcode)
        {
            return Some(codes(&chip.aux[g * 3..g * 3 + 3]));
        }
        match CommandCode::from_opcode(opcode)? {
            CommandCode::ReadConfigA => Some(chip.config_a),
            CommandCode::ReadConfigB if self.shape.config_b => Some(chip.config_b),
            CommandCode::ReadComm => Some(chip.comm),
            CommandCode::ReadStatusA => Some(chip.status[0]),
            CommandCode::ReadStatusB => Some(chip.status[1]),
            _ => None,
        }
    }

    fn execute(&mut self, opcode: Opcode) {
        for chip in self.chips.iter_mut() {
            match CommandCode::from_opcode(opcode) {
                Some(CommandCode::ClearCells) => chip.cells = [0xFFFF; 18],
                Some(CommandCode::ClearAux) => chip.aux = [0xFFFF; 12],
                Some(CommandCode::ClearStatus) => chip.status = [[0xFF; DATA_LEN]; 2],
                _ => {}
            }
        }
    }
}

impl<const N: usize> Transport for SimulatedChain<N> {
    type Error = Infallible;

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Infallible> {
        self.bytes_sent += bytes.len();
        trace!("Simulated chain received {bytes:02X?}");
        let Some(opcode) = self.command(bytes) else {
            return Ok(());
        };
        let payload = &bytes[COMMAND_LEN..];
        if payload.is_empty() {
            self.execute(opcode);
            return Ok(());
        }
        // The first group shifted in travels to the farthest position
        for (chunk, group) in payload.chunks_exact(GROUP_LEN).enumerate() {
            let position = N - 1 - chunk;
            let data: [u8; DATA_LEN] = group[..DATA_LEN].try_into().unwrap();
            let pec = u16::from_be_bytes([group[6], group[7]]);
            if calculate_pec(&data) != pec {
                warn!("Simulated chip at position {position} dropped payload with bad PEC");
                continue;
            }
            if let Some(register) = self.register_mut(opcode, position) {
                *register = data;
            }
        }
        Ok(())
    }

    fn transmit_and_receive(
        &mut self,
        bytes_out: &[u8],
        bytes_in: &mut [u8],
    ) -> Result<(), Infallible> {
        self.bytes_sent += bytes_out.len() + bytes_in.len();
        self.last_filler = bytes_in.len();
        bytes_in.fill(0xFF);
        let Some(opcode) = self.command(bytes_out) else {
            return Ok(());
        };
        if self.register(opcode, 0).is_none() {
            return Ok(());
        }
        self.reads += 1;
        for (position, chunk) in bytes_in.chunks_exact_mut(GROUP_LEN).enumerate().take(N) {
            let Some(data) = self.register(opcode, position) else {
                continue;
            };
            let mut group = RegisterGroup::new(data);
            if let Some(corruption) = self.corruption {
                if corruption.opcode == opcode && corruption.position == position {
                    group.data[corruption.byte] ^= 0x01;
                }
            }
            chunk.copy_from_slice(group.as_bytes());
        }
        Ok(())
    }

    fn clock_filler(&mut self, count: usize) -> Result<(), Infallible> {
        self.bytes_sent += count;
        self.filler_bursts.push(count);
        Ok(())
    }

    fn transmit_and_poll<F: FnMut(u8) -> bool>(
        &mut self,
        bytes_out: &[u8],
        limit: u32,
        mut done: F,
    ) -> Result<Option<u32>, Infallible> {
        self.bytes_sent += bytes_out.len();
        self.polled = 0;
        if self.command(bytes_out).is_none() {
            return Ok(None);
        }
        for count in 0..limit {
            self.polled += 1;
            self.bytes_sent += 1;
            let ready = self.conversion_time.is_some_and(|time| count >= time);
            if done(if ready { 0xFF } else { 0x00 }) {
                return Ok(Some(count));
            }
        }
        Ok(None)
    }
}

/// Delay that only adds up the requested time
#[derive(Debug, Default)]
pub struct RecordingDelay {
    total_ns: u64,
}
impl RecordingDelay {
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1000
    }
}
impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}

use core::fmt::Display;

use log::trace;
use zerocopy::byteorder::big_endian::U16 as U16Be;
use zerocopy::byteorder::little_endian::U16 as U16Le;
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::commands::Opcode;
use crate::pec::calculate_pec;
use crate::topology::ChainTopology;

/// Size of a command frame (opcode and PEC) in bytes
pub const COMMAND_LEN: usize = 4;
/// Number of data bytes in a register group
pub const DATA_LEN: usize = 6;
/// Size of a register group on the wire (data and PEC) in bytes
pub const GROUP_LEN: usize = DATA_LEN + 2;
/// Longest supported daisy chain
pub const MAX_CHAIN_LEN: usize = 32;
/// Size of the largest write frame
pub const MAX_WRITE_FRAME_LEN: usize = write_frame_len(MAX_CHAIN_LEN);

/// Size of a write frame for a chain of `chips`
pub const fn write_frame_len(chips: usize) -> usize {
    COMMAND_LEN + GROUP_LEN * chips
}

/// Size of a read response for a chain of `chips`
pub const fn response_len(chips: usize) -> usize {
    GROUP_LEN * chips
}

/// Errors encountered while assembling or splitting frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// The output buffer can't hold the frame
    BufferTooSmall { required: usize, available: usize },
    /// A response doesn't hold exactly one register group per chip
    ChainShape { expected: usize, received: usize },
}
impl Display for FrameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FrameError::BufferTooSmall {
                required,
                available,
            } => write!(f, "Frame buffer too small ({available} < {required})"),
            FrameError::ChainShape { expected, received } => write!(
                f,
                "Response of {received} bytes doesn't match chain ({expected} bytes expected)"
            ),
        }
    }
}

/// Command opcode followed by its PEC
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct CommandFrame {
    opcode: U16Be,
    pec: U16Be,
}
impl CommandFrame {
    pub fn new(opcode: Opcode) -> Self {
        let bytes = opcode.to_bytes();
        Self {
            opcode: U16Be::new(opcode.raw()),
            pec: U16Be::new(calculate_pec(&bytes)),
        }
    }
    pub fn opcode(&self) -> Opcode {
        let [high, low] = self.opcode.get().to_be_bytes();
        Opcode::from_bytes(high, low)
    }
    /// Check the PEC against the opcode bytes
    pub fn pec_matches(&self) -> bool {
        calculate_pec(self.opcode.as_bytes()) == self.pec.get()
    }
}

/// Six data bytes followed by their PEC, as sent or received per chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RegisterGroup {
    pub data: [u8; DATA_LEN],
    pub pec: U16Be,
}
impl RegisterGroup {
    /// Create a group with a freshly calculated PEC
    pub fn new(data: [u8; DATA_LEN]) -> Self {
        Self {
            data,
            pec: U16Be::new(calculate_pec(&data)),
        }
    }
    /// Check the received PEC against the data bytes
    pub fn pec_matches(&self) -> bool {
        calculate_pec(&self.data) == self.pec.get()
    }
    /// The data bytes as three little endian 16 bit codes
    pub fn codes(&self) -> [u16; 3] {
        let mut codes = [0; 3];
        // Six bytes always hold exactly three codes
        if let Ok(words) = <[U16Le; 3]>::ref_from_bytes(&self.data) {
            for (code, word) in codes.iter_mut().zip(words) {
                *code = word.get();
            }
        }
        codes
    }
}
impl Default for RegisterGroup {
    fn default() -> Self {
        Self::new_zeroed()
    }
}

/// Assemble a write frame into `buf`
///
/// `payloads` are indexed by logical chip and are placed in the frame in
/// the order given by [ChainTopology::write_order], each followed by its PEC.
///
/// Returns the used part of `buf`, or [FrameError::BufferTooSmall].
pub fn encode_write<'b, const N: usize>(
    opcode: Opcode,
    payloads: &[[u8; DATA_LEN]; N],
    topology: &ChainTopology<N>,
    buf: &'b mut [u8],
) -> Result<&'b [u8], FrameError> {
    let len = write_frame_len(N);
    if buf.len() < len {
        return Err(FrameError::BufferTooSmall {
            required: len,
            available: buf.len(),
        });
    }
    let frame = &mut buf[..len];
    let (command, payload) = frame.split_at_mut(COMMAND_LEN);
    command.copy_from_slice(CommandFrame::new(opcode).as_bytes());

    let shape_error = FrameError::ChainShape {
        expected: response_len(N),
        received: payload.len(),
    };
    let groups = <[RegisterGroup]>::mut_from_bytes(payload).map_err(|_| shape_error)?;
    for (group, chip) in groups.iter_mut().zip(topology.write_order()) {
        *group = RegisterGroup::new(payloads[chip]);
    }
    trace!("Write frame {opcode}: {:02X?}", &frame[..]);
    Ok(frame)
}

/// Split a read response into the register group of each position
///
/// Returns [FrameError::ChainShape] unless `raw` holds exactly one group per chip.
pub fn split_response<const N: usize>(raw: &[u8]) -> Result<&[RegisterGroup; N], FrameError> {
    let shape_error = FrameError::ChainShape {
        expected: response_len(N),
        received: raw.len(),
    };
    let groups = <[RegisterGroup]>::ref_from_bytes(raw).map_err(|_| shape_error)?;
    groups.try_into().map_err(|_| shape_error)
}

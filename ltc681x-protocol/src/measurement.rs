//! Decoding of read responses into the register model
//!
//! Every chip's group is checked against its PEC. A mismatch raises the
//! group's flag and is reported, the data is stored regardless.

use log::{trace, warn};

use crate::ParameterError;
use crate::commands::{CommandCode, Opcode};
use crate::frame::{FrameError, RegisterGroup, split_response};
use crate::registers::counters::RegisterKind;
use crate::registers::{Chain, Chip, RegisterShape};

/// Outcome of the PEC checks of one or more read responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[must_use]
pub struct PecReport {
    /// Number of register groups that failed their PEC check
    pub mismatches: usize,
}
impl PecReport {
    pub fn is_clean(&self) -> bool {
        self.mismatches == 0
    }
    pub(crate) fn merge(self, other: PecReport) -> PecReport {
        PecReport {
            mismatches: self.mismatches + other.mismatches,
        }
    }
}

macro_rules! register_groups {
    ($(#[$meta:meta])* $name:ident, $available:ident, [$($variant:ident => $command:ident),+ $(,)?]) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Zero based group index (A = 0)
            pub fn index(self) -> usize {
                self as usize
            }
            pub fn opcode(self) -> Opcode {
                match self {
                    $($name::$variant => CommandCode::$command.opcode()),+
                }
            }
            /// Groups present on a chip variant
            pub fn available(shape: &RegisterShape) -> &'static [$name] {
                Self::ALL.get(..shape.$available).unwrap_or(Self::ALL)
            }
            /// Check the group exists on the chip variant
            pub fn check(self, shape: &RegisterShape) -> Result<(), ParameterError> {
                if self.index() < shape.$available {
                    Ok(())
                } else {
                    Err(ParameterError::RegisterGroupUnavailable)
                }
            }
        }
    };
}

register_groups!(
    /// Cell voltage register groups
    CellGroup, cell_groups, [
    A => ReadCellA,
    B => ReadCellB,
    C => ReadCellC,
    D => ReadCellD,
    E => ReadCellE,
    F => ReadCellF,
]);
register_groups!(
    /// Auxiliary register groups
    AuxGroup, aux_groups, [
    A => ReadAuxA,
    B => ReadAuxB,
    C => ReadAuxC,
    D => ReadAuxD,
]);
register_groups!(
    /// Status register groups
    StatusGroup, status_groups, [
    A => ReadStatusA,
    B => ReadStatusB,
]);

/// Walk the response group of every position and hand it to the chip behind it
fn decode<const N: usize>(
    chain: &mut Chain<N>,
    kind: RegisterKind,
    raw: &[u8],
    mut store: impl FnMut(&mut Chip, &RegisterGroup, bool),
) -> Result<PecReport, FrameError> {
    let groups = split_response::<N>(raw)?;
    trace!("Response {kind:?}: {raw:02X?}");
    let mut report = PecReport::default();
    for (position, group) in groups.iter().enumerate() {
        let index = chain.topology.chip_at(position);
        let mismatch = !group.pec_matches();
        if mismatch {
            warn!("PEC mismatch on chip {index} (position {position}), {kind:?}");
            report.mismatches += 1;
        }
        store(&mut chain.chips[index], group, mismatch);
    }
    Ok(report)
}

/// Store a cell voltage register group response
pub fn parse_cells<const N: usize>(
    chain: &mut Chain<N>,
    group: CellGroup,
    raw: &[u8],
) -> Result<PecReport, FrameError> {
    let g = group.index();
    decode(chain, RegisterKind::Cell(g), raw, |chip, data, mismatch| {
        chip.cells.codes[g * 3..g * 3 + 3].copy_from_slice(&data.codes());
        chip.cells.pec_mismatch[g] = mismatch;
    })
}

/// Store an auxiliary register group response
pub fn parse_aux<const N: usize>(
    chain: &mut Chain<N>,
    group: AuxGroup,
    raw: &[u8],
) -> Result<PecReport, FrameError> {
    let g = group.index();
    decode(chain, RegisterKind::Aux(g), raw, |chip, data, mismatch| {
        chip.aux.codes[g * 3..g * 3 + 3].copy_from_slice(&data.codes());
        chip.aux.pec_mismatch[g] = mismatch;
    })
}

/// Store a status register group response
pub fn parse_status<const N: usize>(
    chain: &mut Chain<N>,
    group: StatusGroup,
    raw: &[u8],
) -> Result<PecReport, FrameError> {
    let g = group.index();
    decode(chain, RegisterKind::Status(g), raw, |chip, data, mismatch| {
        match group {
            StatusGroup::A => chip.status.codes[..3].copy_from_slice(&data.codes()),
            StatusGroup::B => chip.status.decode_b(&data.data),
        }
        chip.status.pec_mismatch[g] = mismatch;
    })
}

/// Store a read back of a configuration or COMM register group
///
/// `kind` must be [RegisterKind::ConfigA], [RegisterKind::ConfigB] or
/// [RegisterKind::Comm].
pub fn parse_readback<const N: usize>(
    chain: &mut Chain<N>,
    kind: RegisterKind,
    raw: &[u8],
) -> Result<PecReport, FrameError> {
    decode(chain, kind, raw, |chip, data, mismatch| {
        let (rx, flag) = match kind {
            RegisterKind::ConfigA => (&mut chip.config_a.rx, &mut chip.config_a.pec_mismatch),
            RegisterKind::ConfigB => (&mut chip.config_b.rx, &mut chip.config_b.pec_mismatch),
            _ => (&mut chip.comm.rx, &mut chip.comm.pec_mismatch),
        };
        *rx = *data;
        *flag = mismatch;
    })
}

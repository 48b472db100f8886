//! PEC mismatch counters

use core::fmt::Display;

/// Register type a PEC mismatch is counted against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    ConfigA,
    ConfigB,
    /// Cell voltage register group (`0..6`)
    Cell(usize),
    /// Auxiliary register group (`0..4`)
    Aux(usize),
    /// Status register group (`0..2`)
    Status(usize),
    /// COMM register group, only counted in the total
    Comm,
}

/// Cumulative PEC mismatch counts of one chip
///
/// Counts saturate and only go back to zero through [PecCounters::reset].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PecCounters {
    pub total: u32,
    pub config: u32,
    pub cell: [u32; 6],
    pub aux: [u32; 4],
    pub status: [u32; 2],
}

impl PecCounters {
    /// Count one mismatching register group
    pub fn record(&mut self, kind: RegisterKind) {
        self.total = self.total.saturating_add(1);
        let counter = match kind {
            RegisterKind::ConfigA | RegisterKind::ConfigB => &mut self.config,
            RegisterKind::Cell(group) => &mut self.cell[group],
            RegisterKind::Aux(group) => &mut self.aux[group],
            RegisterKind::Status(group) => &mut self.status[group],
            RegisterKind::Comm => return,
        };
        *counter = counter.saturating_add(1);
    }
    pub fn reset(&mut self) {
        *self = Self::default();
    }
    pub fn cell_total(&self) -> u32 {
        self.cell.iter().fold(0, |sum, c| sum.saturating_add(*c))
    }
    pub fn aux_total(&self) -> u32 {
        self.aux.iter().fold(0, |sum, c| sum.saturating_add(*c))
    }
    pub fn status_total(&self) -> u32 {
        self.status.iter().fold(0, |sum, c| sum.saturating_add(*c))
    }
}
impl Display for PecCounters {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{} PEC errors (config {}, cell {:?}, aux {:?}, status {:?})",
            self.total, self.config, self.cell, self.aux, self.status
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record() {
        let mut counters = PecCounters::default();
        counters.record(RegisterKind::Cell(2));
        counters.record(RegisterKind::Cell(2));
        counters.record(RegisterKind::Status(1));
        counters.record(RegisterKind::Comm);
        assert_eq!(counters.total, 4);
        assert_eq!(counters.cell, [0, 0, 2, 0, 0, 0]);
        assert_eq!(counters.status, [0, 1]);
        assert_eq!(counters.cell_total(), 2);
        assert_eq!(counters.aux_total(), 0);
        assert_eq!(counters.config, 0);

        counters.reset();
        assert_eq!(counters, PecCounters::default());
    }
    #[test]
    fn test_saturation() {
        let mut counters = PecCounters {
            total: u32::MAX,
            config: u32::MAX,
            ..Default::default()
        };
        counters.record(RegisterKind::ConfigB);
        assert_eq!(counters.total, u32::MAX);
        assert_eq!(counters.config, u32::MAX);
    }
    #[test]
    fn test_display() {
        let mut counters = PecCounters::default();
        counters.record(RegisterKind::Aux(0));
        assert_eq!(
            format!("{counters}"),
            "1 PEC errors (config 0, cell [0, 0, 0, 0, 0, 0], aux [1, 0, 0, 0], status [0, 0])"
        );
    }
}

//! Mapping between logical chip indices and shift register positions
//!
//! Position `0` is the chip physically closest to the controller. A chip
//! whose isoSPI ports are wired in the reverse direction sits at the mirrored
//! position `N - 1 - index`.

use crate::ParameterError;

/// Physical placement of the chips in a chain of `N`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainTopology<const N: usize> {
    reversed: [bool; N],
    /// Logical chip index for every position
    by_position: [usize; N],
}

impl<const N: usize> ChainTopology<N> {
    /// Topology without any reversed chip
    pub fn new() -> Self {
        Self {
            reversed: [false; N],
            by_position: core::array::from_fn(|i| i),
        }
    }
    /// Build a topology from the per chip wiring reversal flags
    ///
    /// Returns [ParameterError::WiringTopology] when two chips would end
    /// up at the same position.
    pub fn from_flags(reversed: [bool; N]) -> Result<Self, ParameterError> {
        let mut by_position = [usize::MAX; N];
        for (index, reversed) in reversed.iter().enumerate() {
            let position = if *reversed { N - 1 - index } else { index };
            if by_position[position] != usize::MAX {
                return Err(ParameterError::WiringTopology);
            }
            by_position[position] = index;
        }
        Ok(Self {
            reversed,
            by_position,
        })
    }
    pub fn is_reversed(&self, index: usize) -> bool {
        self.reversed[index]
    }
    /// Position of the chip with logical `index`
    pub fn position(&self, index: usize) -> usize {
        if self.reversed[index] {
            N - 1 - index
        } else {
            index
        }
    }
    /// Logical index of the chip at `position`
    pub fn chip_at(&self, position: usize) -> usize {
        self.by_position[position]
    }
    /// Logical chip indices in the order their payloads are sent in a write frame
    ///
    /// The first payload shifted out travels furthest, so the farthest
    /// position comes first.
    pub fn write_order(&self) -> impl Iterator<Item = usize> + '_ {
        (0..N).rev().map(|position| self.chip_at(position))
    }
    /// Logical chip indices in the order their groups arrive in a read response
    pub fn read_order(&self) -> impl Iterator<Item = usize> + '_ {
        (0..N).map(|position| self.chip_at(position))
    }
}
impl<const N: usize> Default for ChainTopology<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_chain() {
        let topology = ChainTopology::<4>::new();
        assert!(topology.write_order().eq([3, 2, 1, 0]));
        assert!(topology.read_order().eq([0, 1, 2, 3]));
    }
    #[test]
    fn test_fully_reversed_chain() {
        let topology = ChainTopology::from_flags([true; 4]).unwrap();
        assert_eq!(topology.position(0), 3);
        assert_eq!(topology.chip_at(0), 3);
        assert!(topology.write_order().eq([0, 1, 2, 3]));
        assert!(topology.read_order().eq([3, 2, 1, 0]));
    }
    #[test]
    fn test_mixed_chain() {
        let topology = ChainTopology::from_flags([true, false, true]).unwrap();
        assert_eq!(topology.position(0), 2);
        assert_eq!(topology.position(1), 1);
        assert_eq!(topology.position(2), 0);
        for index in 0..3 {
            assert_eq!(topology.chip_at(topology.position(index)), index);
        }
    }
    #[test]
    fn test_middle_chip_of_odd_chain_stays() {
        let topology = ChainTopology::from_flags([false, true, false]).unwrap();
        assert!(topology.is_reversed(1));
        assert_eq!(topology.position(1), 1);
    }
    #[test]
    fn test_colliding_positions_rejected() {
        assert_eq!(
            ChainTopology::from_flags([true, false, false]),
            Err(ParameterError::WiringTopology)
        );
        assert_eq!(
            ChainTopology::from_flags([false, true, false, false]),
            Err(ParameterError::WiringTopology)
        );
    }
}

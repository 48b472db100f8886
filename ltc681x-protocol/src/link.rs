//! isoSPI link wake up
//!
//! Each chip's isoSPI port powers down after a few milliseconds without
//! traffic (idle), and its core after a few seconds (sleep). A chip that
//! isn't awake misses or corrupts the next command, so every transaction
//! has to be preceded by the wake sequence matching the time since the
//! last one.

use embedded_hal::delay::DelayNs;
use fugit::HertzU32;
use log::debug;

use crate::conversion::DEFAULT_POLL_LIMIT;
use crate::transport::Transport;
use crate::{Error, Ltc681x};

/// Time the link has to be active to wake a sleeping chip
const SLEEP_WAKE_US: u32 = 300;
/// Pause after waking each sleeping chip
const SLEEP_WAKE_PAUSE_US: u32 = 10;

/// Power state of the link since the last transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Link powered down, core still up
    Idle,
    /// Core powered down
    Sleep,
}

/// Bus timing parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// SPI clock rate
    pub clock: HertzU32,
    /// Maximum number of bytes clocked while polling a conversion
    pub poll_limit: u32,
}
impl LinkTiming {
    pub const fn new(clock: HertzU32) -> Self {
        Self {
            clock,
            poll_limit: DEFAULT_POLL_LIMIT,
        }
    }
    /// Filler bytes clocked per chip to wake it from sleep
    ///
    /// One byte per clock cycle of the wake time, at least one.
    pub fn sleep_wake_bytes(&self) -> usize {
        let bytes = self.clock.raw() as u64 * SLEEP_WAKE_US as u64 / 1_000_000;
        (bytes as usize).max(1)
    }
}
impl Default for LinkTiming {
    fn default() -> Self {
        Self::new(HertzU32::MHz(1))
    }
}

impl<T: Transport, D: DelayNs, const N: usize> Ltc681x<T, D, N> {
    /// Wake the chain after a short pause
    ///
    /// One filler byte per chip, each in its own chip select window. Every
    /// chip select edge wakes the next port down the chain.
    pub fn wake_from_idle(&mut self) -> Result<(), Error<T::Error>> {
        debug!("Waking {N} chips from idle");
        for _ in 0..N {
            self.transport.clock_filler(1).map_err(Error::Transport)?;
        }
        Ok(())
    }
    /// Wake the chain after a long pause
    ///
    /// Blocks for about `N * (300µs + 10µs)`.
    pub fn wake_from_sleep(&mut self) -> Result<(), Error<T::Error>> {
        let bytes = self.timing.sleep_wake_bytes();
        debug!("Waking {N} chips from sleep, {bytes} bytes each");
        for _ in 0..N {
            self.transport
                .clock_filler(bytes)
                .map_err(Error::Transport)?;
            self.delay.delay_us(SLEEP_WAKE_PAUSE_US);
        }
        Ok(())
    }
    /// Run the wake sequence for `state`
    pub fn wake(&mut self, state: LinkState) -> Result<(), Error<T::Error>> {
        match state {
            LinkState::Idle => self.wake_from_idle(),
            LinkState::Sleep => self.wake_from_sleep(),
        }
    }
}

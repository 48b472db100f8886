//! Bus transactions
//!
//! The protocol needs very little from the physical link: shifting a frame
//! out, shifting a response in, and clocking filler bytes. Every method is
//! one chip select window; transactions never interleave because every call
//! takes `&mut self`.

use core::fmt::{Debug, Display};

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiBus;

/// Byte clocked while the controller has nothing to send
pub const FILLER: u8 = 0xFF;

/// A synchronous full-duplex byte link to the first chip of the chain
pub trait Transport {
    type Error: Debug;

    /// Shift `bytes` out, discarding whatever comes back
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Shift `bytes_out` out, then clock [FILLER] bytes to fill `bytes_in`
    fn transmit_and_receive(
        &mut self,
        bytes_out: &[u8],
        bytes_in: &mut [u8],
    ) -> Result<(), Self::Error>;

    /// Clock `count` [FILLER] bytes
    fn clock_filler(&mut self, count: usize) -> Result<(), Self::Error>;

    /// Shift `bytes_out` out, then clock single [FILLER] bytes until `done`
    /// accepts a received byte, at most `limit` times
    ///
    /// Returns the number of bytes clocked before the accepted one, or `None`
    /// when `limit` was reached.
    fn transmit_and_poll<F: FnMut(u8) -> bool>(
        &mut self,
        bytes_out: &[u8],
        limit: u32,
        done: F,
    ) -> Result<Option<u32>, Self::Error>;
}

/// Errors of a [SpiTransport]
#[derive(Debug)]
pub enum SpiTransportError<S, P> {
    Spi(S),
    ChipSelect(P),
}
impl<S: Debug, P: Debug> Display for SpiTransportError<S, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SpiTransportError::Spi(e) => write!(f, "SPI error: {e:?}"),
            SpiTransportError::ChipSelect(e) => write!(f, "Chip select error: {e:?}"),
        }
    }
}
impl<S: Debug, P: Debug> core::error::Error for SpiTransportError<S, P> {}

/// [Transport] over an SPI bus with a dedicated chip select line
///
/// Chip select is asserted (low) for the duration of each transaction and
/// released again on every exit path.
pub struct SpiTransport<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI: SpiBus, CS: OutputPin> SpiTransport<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        SpiTransport { spi, cs }
    }
    /// Give back the bus and the chip select pin
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn selected<R>(
        &mut self,
        transaction: impl FnOnce(&mut SPI) -> Result<R, SPI::Error>,
    ) -> Result<R, SpiTransportError<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(SpiTransportError::ChipSelect)?;
        let result = transaction(&mut self.spi).and_then(|r| self.spi.flush().map(|_| r));
        let deselect = self.cs.set_high().map_err(SpiTransportError::ChipSelect);
        let r = result.map_err(SpiTransportError::Spi)?;
        deselect?;
        Ok(r)
    }
}

impl<SPI: SpiBus, CS: OutputPin> Transport for SpiTransport<SPI, CS> {
    type Error = SpiTransportError<SPI::Error, CS::Error>;

    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.selected(|spi| spi.write(bytes))
    }

    fn transmit_and_receive(
        &mut self,
        bytes_out: &[u8],
        bytes_in: &mut [u8],
    ) -> Result<(), Self::Error> {
        bytes_in.fill(FILLER);
        self.selected(|spi| {
            spi.write(bytes_out)?;
            spi.transfer_in_place(bytes_in)
        })
    }

    fn clock_filler(&mut self, count: usize) -> Result<(), Self::Error> {
        const CHUNK: [u8; 64] = [FILLER; 64];
        self.selected(|spi| {
            let mut remaining = count;
            while remaining > 0 {
                let len = remaining.min(CHUNK.len());
                spi.write(&CHUNK[..len])?;
                remaining -= len;
            }
            Ok(())
        })
    }

    fn transmit_and_poll<F: FnMut(u8) -> bool>(
        &mut self,
        bytes_out: &[u8],
        limit: u32,
        mut done: F,
    ) -> Result<Option<u32>, Self::Error> {
        self.selected(|spi| {
            spi.write(bytes_out)?;
            for count in 0..limit {
                let mut byte = [FILLER];
                spi.transfer_in_place(&mut byte)?;
                if done(byte[0]) {
                    return Ok(Some(count));
                }
            }
            Ok(None)
        })
    }
}

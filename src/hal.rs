//! `embedded-hal` 1.0 and `embedded-io` 0.7 trait implementations.
//!
//! Enable the `embedded-hal` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! ft260 = { version = "0.1", features = ["embedded-hal"] }
//! ```
//!
//! # Provided implementations
//!
//! | Trait | Type | Notes |
//! |-------|------|-------|
//! | `embedded_hal::i2c::I2c` | [`I2cSession`] | 7-bit addressing |
//! | `embedded_io::Read` | [`UartSession`] | Blocks until data arrives |
//! | `embedded_io::Write` | [`UartSession`] | |
//!
//! # Transaction framing
//!
//! Each operation of an `I2c::transaction` becomes one FT260 call. The
//! first operation starts the bus, an operation that changes direction
//! issues a repeated start, and the last one ends with a stop. The FT260
//! has no combined "repeated start and stop" flag; a final operation that
//! changes direction uses `StartAndStop`, which the chip turns into a
//! repeated start while it still holds the bus.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, Operation};

use crate::driver::Ft260Driver;
use crate::error::Error;
use crate::i2c::I2cSession;
use crate::types::I2cFlag;
use crate::uart::UartSession;

// ---- Error conversion ----

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::TransferFailed {
                bus_status: Some(status),
                ..
            } => {
                if status.address_nack() {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
                } else if status.data_nack() {
                    ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)
                } else if status.arbitration_lost() {
                    ErrorKind::ArbitrationLoss
                } else if status.bus_busy() {
                    ErrorKind::Bus
                } else {
                    ErrorKind::Other
                }
            }
            Error::ShortTransfer { .. } => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            _ => ErrorKind::Other,
        }
    }
}

impl embedded_io::Error for Error {
    fn kind(&self) -> embedded_io::ErrorKind {
        match self {
            Error::ShortTransfer { .. } => embedded_io::ErrorKind::WriteZero,
            Error::InvalidArgument(_) => embedded_io::ErrorKind::InvalidInput,
            _ => embedded_io::ErrorKind::Other,
        }
    }
}

// ---- embedded-hal I2C ----

/// Flag for one operation of a transaction.
fn transaction_flag(first: bool, direction_change: bool, last: bool) -> I2cFlag {
    match (first, direction_change, last) {
        (true, _, true) => I2cFlag::StartAndStop,
        (true, _, false) => I2cFlag::Start,
        (false, true, true) => I2cFlag::StartAndStop,
        (false, true, false) => I2cFlag::RepeatedStart,
        (false, false, true) => I2cFlag::Stop,
        (false, false, false) => I2cFlag::None,
    }
}

impl<D: Ft260Driver> embedded_hal::i2c::ErrorType for I2cSession<D> {
    type Error = Error;
}

impl<D: Ft260Driver> embedded_hal::i2c::I2c for I2cSession<D> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let last = operations.len().saturating_sub(1);
        let mut prev_read: Option<bool> = None;

        for (i, op) in operations.iter_mut().enumerate() {
            let is_read = matches!(op, Operation::Read(_));
            let changed = prev_read.is_some_and(|p| p != is_read);
            let flag = transaction_flag(i == 0, changed, i == last);

            match op {
                Operation::Write(data) => {
                    let result = self.write(address, flag, data).into_result()?;
                    if result.transferred < data.len() {
                        return Err(Error::ShortTransfer {
                            op: "I2C write",
                            requested: data.len(),
                            transferred: result.transferred,
                        });
                    }
                }
                Operation::Read(buf) => {
                    let result = self.read(address, flag, buf.len()).into_result()?;
                    if result.transferred < buf.len() {
                        return Err(Error::ShortTransfer {
                            op: "I2C read",
                            requested: buf.len(),
                            transferred: result.transferred,
                        });
                    }
                    buf.copy_from_slice(&result.payload);
                }
            }
            prev_read = Some(is_read);
        }
        Ok(())
    }
}

// ---- embedded-io for UartSession ----

impl<D: Ft260Driver> embedded_io::ErrorType for UartSession<D> {
    type Error = Error;
}

impl<D: Ft260Driver> embedded_io::Read for UartSession<D> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        self.read_blocking(buf)
    }
}

impl<D: Ft260Driver> embedded_io::Write for UartSession<D> {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        UartSession::write(self, buf)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_operation_is_start_and_stop() {
        assert_eq!(transaction_flag(true, false, true), I2cFlag::StartAndStop);
    }

    #[test]
    fn write_then_read_uses_start_then_restart() {
        assert_eq!(transaction_flag(true, false, false), I2cFlag::Start);
        assert_eq!(transaction_flag(false, true, true), I2cFlag::StartAndStop);
    }

    #[test]
    fn same_direction_continues_bus() {
        assert_eq!(transaction_flag(false, false, false), I2cFlag::None);
        assert_eq!(transaction_flag(false, false, true), I2cFlag::Stop);
        assert_eq!(transaction_flag(false, true, false), I2cFlag::RepeatedStart);
    }

    #[cfg(feature = "mock")]
    #[test]
    fn write_read_through_embedded_hal() {
        use embedded_hal::i2c::I2c;

        use crate::constants::{FT260_PID, FT260_VID};
        use crate::mock::{MockDriver, MockSlave};
        use crate::{I2cConfig, Library};

        let mock = MockDriver::ft260();
        mock.add_slave(0x48, MockSlave::with_read_data(&[0x12, 0x34]));
        let mut i2c = Library::new(mock.clone())
            .open_i2c(FT260_VID, FT260_PID, I2cConfig::default())
            .unwrap();

        let mut buf = [0u8; 2];
        i2c.write_read(0x48, &[0x00], &mut buf).unwrap();
        assert_eq!(buf, [0x12, 0x34]);
        assert_eq!(mock.slave_written(0x48), vec![0x00]);
    }

    #[cfg(feature = "mock")]
    #[test]
    fn address_nack_maps_to_no_acknowledge() {
        use embedded_hal::i2c::{Error as _, I2c};

        use crate::constants::{FT260_PID, FT260_VID};
        use crate::mock::MockDriver;
        use crate::{I2cConfig, Library};

        let mut i2c = Library::new(MockDriver::ft260())
            .open_i2c(FT260_VID, FT260_PID, I2cConfig::default())
            .unwrap();
        let err = I2c::write(&mut i2c, 0x10, &[0x01]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)
        );
    }
}

//! Session layer over the FT260 USB-to-I2C/UART bridge driver.
//!
//! The FT260's I2C and UART engines are driven through the vendor library
//! (LibFT260). This crate wraps its entry points in typed sessions: a
//! [`Library`] context opens a device by VID/PID as either an
//! [`I2cSession`] or a [`UartSession`], each owning one driver handle that
//! is released exactly once.
//!
//! # Quick Start
//!
//! ```
//! use ft260::mock::{MockDriver, MockSlave};
//! use ft260::{I2cConfig, I2cFlag, Library, TransferRecord, FT260_PID, FT260_VID};
//!
//! let mock = MockDriver::ft260();
//! mock.add_slave(0x50, MockSlave::with_read_data(&[0xDE, 0xAD, 0xBE, 0xEF]));
//!
//! let lib = Library::new(mock);
//! let mut i2c = lib
//!     .open_i2c(FT260_VID, FT260_PID, I2cConfig::new(100))?
//!     .with_logger(|r: &TransferRecord| println!("{r}"));
//!
//! let read = i2c.read(0x50, I2cFlag::StartAndStop, 4).into_result()?;
//! assert_eq!(read.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
//! # Ok::<(), ft260::Error>(())
//! ```
//!
//! # Features
//!
//! - **`mock`** (default): [`mock::MockDriver`], a simulated FT260.
//! - **`libft260`**: [`ffi::VendorDriver`], linking the vendor library.
//!   Set `LIBFT260_DIR` to the directory holding it.
//! - **`embedded-hal`**: `embedded_hal::i2c::I2c` for [`I2cSession`] and
//!   `embedded_io::{Read, Write}` for [`UartSession`].

pub mod constants;
pub mod discovery;
pub mod driver;
pub mod error;
#[cfg(feature = "libft260")]
pub mod ffi;
#[cfg(feature = "embedded-hal")]
pub mod hal;
pub mod i2c;
pub mod logger;
#[cfg(feature = "mock")]
pub mod mock;
pub mod session;
pub mod types;
pub mod uart;

// ---- Convenience re-exports ----

pub use constants::{FT260_PID, FT260_VID};
pub use discovery::DevicePath;
pub use driver::Ft260Driver;
pub use error::{Error, InitStep, Result};
pub use i2c::{I2cConfig, I2cSession, TransferResult};
pub use logger::{LogTransferLogger, TransferKind, TransferLogger, TransferRecord};
pub use session::{DeviceSession, Library};
pub use types::*;
pub use uart::{CancelToken, UartPayload, UartSession, UartSettings};

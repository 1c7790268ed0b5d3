//! I2C master sessions.
//!
//! An [`I2cSession`] is a device session initialised as I2C master. Reads
//! and writes address one slave at a time; bus framing (START, STOP,
//! repeated START) is chosen per call with an [`I2cFlag`].
//!
//! # Example
//!
//! ```
//! use ft260::mock::{MockDriver, MockSlave};
//! use ft260::{I2cConfig, I2cFlag, Library, FT260_PID, FT260_VID};
//!
//! let mock = MockDriver::ft260();
//! mock.add_slave(0x48, MockSlave::with_read_data(&[0x19, 0x80]));
//!
//! let lib = Library::new(mock);
//! let mut i2c = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::new(400))?;
//!
//! // Select register 0, then read it back with a repeated start
//! i2c.write(0x48, I2cFlag::Start, &[0x00]).into_result()?;
//! let temp = i2c.read(0x48, I2cFlag::StartAndStop, 2).into_result()?;
//! assert_eq!(temp.payload, vec![0x19, 0x80]);
//! # Ok::<(), ft260::Error>(())
//! ```

use log::{debug, error, info, warn};

use crate::constants::{DEFAULT_I2C_CLOCK_KHZ, MAX_I2C_CLOCK_KHZ, MIN_I2C_CLOCK_KHZ};
use crate::driver::Ft260Driver;
use crate::error::{Error, InitStep, Result};
use crate::logger::{TransferKind, TransferLogger, TransferRecord};
use crate::session::{DeviceSession, SharedDriver};
use crate::types::{I2cBusStatus, I2cFlag, OperatingMode, Status};

/// I2C master configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    /// Bus clock in kHz. 100 and 400 are the common values.
    pub clock_khz: u32,
}

impl Default for I2cConfig {
    fn default() -> Self {
        Self {
            clock_khz: DEFAULT_I2C_CLOCK_KHZ,
        }
    }
}

impl I2cConfig {
    /// Configuration with the given bus clock.
    pub fn new(clock_khz: u32) -> Self {
        Self { clock_khz }
    }

    fn validate(&self) -> Result<()> {
        check_clock(self.clock_khz)
    }
}

fn check_clock(clock_khz: u32) -> Result<()> {
    if (MIN_I2C_CLOCK_KHZ..=MAX_I2C_CLOCK_KHZ).contains(&clock_khz) {
        Ok(())
    } else {
        Err(Error::InvalidArgument("I2C clock must be between 60 and 3400 kHz"))
    }
}

/// Outcome of one I2C read or write.
///
/// Produced for every call, successful or not. Check [`status`](Self::status)
/// and [`transferred`](Self::transferred): the driver may accept fewer
/// bytes than requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    /// Write or read.
    pub kind: TransferKind,
    /// Driver status of the transfer call.
    pub status: Status,
    /// Bytes actually moved across the bus.
    pub transferred: usize,
    /// The transferred bytes, exactly `transferred` long.
    pub payload: Vec<u8>,
    /// Controller status queried after the call.
    pub device_status: I2cBusStatus,
}

impl TransferResult {
    /// Whether the driver reported success.
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// Convert a failed transfer into [`Error::TransferFailed`].
    pub fn into_result(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(Error::TransferFailed {
                op: match self.kind {
                    TransferKind::Write => "I2C write",
                    TransferKind::Read => "I2C read",
                },
                status: self.status,
                bus_status: Some(self.device_status),
            })
        }
    }
}

/// A device session running as I2C master.
pub struct I2cSession<D: Ft260Driver> {
    session: DeviceSession<D>,
    clock_khz: u32,
    logger: Option<Box<dyn TransferLogger>>,
}

impl<D: Ft260Driver> std::fmt::Debug for I2cSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("I2cSession")
            .field("session", &self.session)
            .field("clock_khz", &self.clock_khz)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl<D: Ft260Driver> I2cSession<D> {
    pub(crate) fn open(
        driver: SharedDriver<D>,
        vid: u16,
        pid: u16,
        config: I2cConfig,
    ) -> Result<Self> {
        config.validate()?;

        let primary = OperatingMode::I2c.interface_index();
        let session = DeviceSession::open(driver.clone(), vid, pid, primary, OperatingMode::I2c)
            .map_err(|status| {
                error!("open {vid:04x}:{pid:04x} failed: {status}");
                Error::OpenFailed {
                    interface: primary,
                    status,
                }
            })?;
        info!("open {vid:04x}:{pid:04x} OK");

        let session = match init_master(session, config.clock_khz) {
            Ok(session) => session,
            Err((session, initial)) => {
                // Composite devices put I2C and UART on different interfaces;
                // retry once on the other one.
                warn!("I2C init failed on interface {primary}: {initial}, retrying");
                if let Err(e) = session.close() {
                    warn!("closing before retry: {e}");
                }

                let fallback = OperatingMode::Uart.interface_index();
                let session = DeviceSession::open(driver, vid, pid, fallback, OperatingMode::I2c)
                    .map_err(|status| {
                        error!("reopen on interface {fallback} failed: {status}");
                        Error::ReinitFailed {
                            initial,
                            fallback: status,
                        }
                    })?;
                info!("reopen on interface {fallback} OK");

                init_master(session, config.clock_khz).map_err(|(session, status)| {
                    error!("I2C init failed: {status}");
                    drop(session);
                    Error::ReinitFailed {
                        initial,
                        fallback: status,
                    }
                })?
            }
        };
        info!("I2C init OK at {} kHz", config.clock_khz);

        Ok(Self {
            session,
            clock_khz: config.clock_khz,
            logger: None,
        })
    }

    /// Current bus clock in kHz.
    pub fn clock_khz(&self) -> u32 {
        self.clock_khz
    }

    /// Interface index the session ended up on.
    pub fn interface(&self) -> u32 {
        self.session.interface()
    }

    /// Reset the I2C master and re-initialise it at `clock_khz`.
    pub fn set_clock(&mut self, clock_khz: u32) -> Result<()> {
        check_clock(clock_khz)?;
        let reset = self.session.call(|d, h| d.i2c_master_reset(h));
        if !reset.is_ok() {
            debug!("I2C master reset: {reset}");
        }
        self.session
            .configure(InitStep::I2cMasterInit, |d, h| d.i2c_master_init(h, clock_khz))?;
        info!("I2C init OK at {clock_khz} kHz");
        self.clock_khz = clock_khz;
        Ok(())
    }

    /// Install or remove the transfer logger. Replaces any previous one.
    pub fn set_logger(&mut self, logger: Option<Box<dyn TransferLogger>>) {
        self.logger = logger;
    }

    /// Builder form of [`set_logger`](Self::set_logger).
    pub fn with_logger(mut self, logger: impl TransferLogger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    /// Write `data` to the slave at `address`.
    ///
    /// The controller status is queried afterwards whether or not the
    /// write succeeded.
    pub fn write(&mut self, address: u8, flag: I2cFlag, data: &[u8]) -> TransferResult {
        let (status, accepted) = self
            .session
            .call(|d, h| d.i2c_master_write(h, address, flag, data));
        let transferred = accepted.min(data.len());
        let device_status = self.bus_status();
        if !status.is_ok() {
            warn!("I2C write to {address:#x} failed: {status}");
        }

        let result = TransferResult {
            kind: TransferKind::Write,
            status,
            transferred,
            payload: data[..transferred].to_vec(),
            device_status,
        };
        self.notify(address, flag, &result);
        result
    }

    /// Read `len` bytes from the slave at `address`.
    pub fn read(&mut self, address: u8, flag: I2cFlag, len: usize) -> TransferResult {
        let mut buf = vec![0u8; len];
        let (status, received) = self
            .session
            .call(|d, h| d.i2c_master_read(h, address, flag, &mut buf));
        let transferred = received.min(len);
        buf.truncate(transferred);
        let device_status = self.bus_status();
        if !status.is_ok() {
            warn!("I2C read from {address:#x} failed: {status}");
        }

        let result = TransferResult {
            kind: TransferKind::Read,
            status,
            transferred,
            payload: buf,
            device_status,
        };
        self.notify(address, flag, &result);
        result
    }

    /// Close the session.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }

    fn bus_status(&mut self) -> I2cBusStatus {
        let (status, raw) = self.session.call(|d, h| d.i2c_master_status(h));
        if status.is_ok() {
            I2cBusStatus::from_raw(raw)
        } else {
            debug!("I2C status query failed: {status}");
            I2cBusStatus::default()
        }
    }

    fn notify(&mut self, address: u8, flag: I2cFlag, result: &TransferResult) {
        let Some(logger) = self.logger.as_mut() else {
            return;
        };
        if !result.is_ok() || result.transferred == 0 {
            return;
        }
        logger.on_transfer(&TransferRecord {
            kind: result.kind,
            address,
            data: result.payload.clone(),
            flag,
            device_status: result.device_status,
        });
    }
}

/// Initialise the I2C master, handing the session back on failure so the
/// caller decides whether to retry.
fn init_master<D: Ft260Driver>(
    mut session: DeviceSession<D>,
    clock_khz: u32,
) -> std::result::Result<DeviceSession<D>, (DeviceSession<D>, Status)> {
    let status = session.call(|d, h| d.i2c_master_init(h, clock_khz));
    if status.is_ok() {
        Ok(session)
    } else {
        Err((session, status))
    }
}

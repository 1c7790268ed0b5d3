//! Device sessions and the library context.
//!
//! [`Library`] owns a driver backend and is the entry point for opening
//! devices. Each successful open yields a [`DeviceSession`] that owns one
//! driver handle; the I2C and UART façades wrap a session and add the
//! mode-specific configuration and transfers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::{debug, warn};

use crate::discovery::{self, DevicePath};
use crate::error::{Error, InitStep, Result};
use crate::driver::Ft260Driver;
use crate::i2c::{I2cConfig, I2cSession};
use crate::types::{OperatingMode, Status};
use crate::uart::{UartSession, UartSettings};

pub(crate) type SharedDriver<D> = Arc<Mutex<D>>;

/// Lock the driver, recovering it if another thread panicked mid-call.
fn lock<D>(driver: &Mutex<D>) -> MutexGuard<'_, D> {
    driver.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Context object binding a driver backend.
///
/// All sessions opened from one `Library` share its driver; calls into the
/// driver are serialised.
///
/// # Example
///
/// ```
/// use ft260::mock::MockDriver;
/// use ft260::{I2cConfig, I2cFlag, Library, FT260_PID, FT260_VID};
///
/// let lib = Library::new(MockDriver::ft260());
/// let mut i2c = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default())?;
/// let result = i2c.write(0x50, I2cFlag::StartAndStop, &[0x00, 0x01]);
/// assert!(result.is_ok());
/// # Ok::<(), ft260::Error>(())
/// ```
pub struct Library<D: Ft260Driver> {
    driver: SharedDriver<D>,
}

impl<D: Ft260Driver> Clone for Library<D> {
    fn clone(&self) -> Self {
        Self {
            driver: Arc::clone(&self.driver),
        }
    }
}

impl<D: Ft260Driver> std::fmt::Debug for Library<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library").finish_non_exhaustive()
    }
}

impl<D: Ft260Driver> Library<D> {
    /// Wrap a driver backend.
    pub fn new(driver: D) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
        }
    }

    /// List the device paths known to the driver.
    ///
    /// Entries whose path lookup fails are skipped with a warning.
    pub fn device_paths(&self) -> Result<Vec<String>> {
        let mut driver = lock(&self.driver);
        let (status, count) = driver.create_device_list();
        if !status.is_ok() {
            return Err(Error::Enumeration(status));
        }

        let mut paths = Vec::with_capacity(count as usize);
        for index in 0..count {
            let (status, path) = driver.device_path(index);
            if !status.is_ok() {
                warn!("device path lookup for index {index} failed: {status}");
                continue;
            }
            debug!("index {index}: {path}");
            paths.push(path);
        }
        Ok(paths)
    }

    /// Find the driver paths belonging to `vid`/`pid`.
    pub fn find_device_in_paths(&self, vid: u16, pid: u16) -> Result<Vec<DevicePath>> {
        let paths = self.device_paths()?;
        Ok(discovery::match_paths(paths, vid, pid))
    }

    /// Open a device as I2C master.
    ///
    /// Falls back to the UART interface index once if I2C initialisation
    /// fails on the first interface.
    pub fn open_i2c(&self, vid: u16, pid: u16, config: I2cConfig) -> Result<I2cSession<D>> {
        I2cSession::open(Arc::clone(&self.driver), vid, pid, config)
    }

    /// Open a device as UART and apply `settings`.
    pub fn open_uart(&self, vid: u16, pid: u16, settings: UartSettings) -> Result<UartSession<D>> {
        UartSession::open(Arc::clone(&self.driver), vid, pid, settings)
    }
}

#[cfg(feature = "libft260")]
impl Library<crate::ffi::VendorDriver> {
    /// Library bound to the linked LibFT260.
    pub fn vendor() -> Self {
        Self::new(crate::ffi::VendorDriver::new())
    }
}

/// One open device handle.
///
/// The handle is released exactly once: by [`close`](Self::close), or on
/// drop if the session was never closed explicitly.
pub struct DeviceSession<D: Ft260Driver> {
    driver: SharedDriver<D>,
    handle: D::Handle,
    mode: OperatingMode,
    interface: u32,
    open: bool,
}

impl<D: Ft260Driver> std::fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("handle", &self.handle)
            .field("mode", &self.mode)
            .field("interface", &self.interface)
            .finish()
    }
}

impl<D: Ft260Driver> DeviceSession<D> {
    /// Open `vid`/`pid` on `interface`. Returns the driver status on failure.
    pub(crate) fn open(
        driver: SharedDriver<D>,
        vid: u16,
        pid: u16,
        interface: u32,
        mode: OperatingMode,
    ) -> std::result::Result<Self, Status> {
        let (status, handle) = lock(&driver).open_by_vid_pid(vid, pid, interface);
        let handle = match (status, handle) {
            (Status::Ok, Some(handle)) => handle,
            (Status::Ok, None) => return Err(Status::InvalidHandle),
            (status, _) => return Err(status),
        };
        debug!("opened {vid:04x}:{pid:04x} interface {interface} as {mode:?}: {handle:?}");
        Ok(Self {
            driver,
            handle,
            mode,
            interface,
            open: true,
        })
    }

    /// The mode this session was opened in.
    pub fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// The interface index the handle was opened on.
    pub fn interface(&self) -> u32 {
        self.interface
    }

    /// Run one driver call against this session's handle.
    pub(crate) fn call<T>(&mut self, f: impl FnOnce(&mut D, D::Handle) -> T) -> T {
        let mut driver = lock(&self.driver);
        f(&mut *driver, self.handle)
    }

    /// Run a configuration call, mapping a non-OK status to
    /// [`Error::InitFailed`].
    pub(crate) fn configure(
        &mut self,
        step: InitStep,
        f: impl FnOnce(&mut D, D::Handle) -> Status,
    ) -> Result<()> {
        let status = self.call(f);
        if status.is_ok() {
            debug!("{step} OK");
            Ok(())
        } else {
            warn!("{step} failed: {status}");
            Err(Error::InitFailed { step, status })
        }
    }

    /// Release the handle.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;
        let status = lock(&self.driver).close(self.handle);
        status.ok_then(()).map_err(Error::CloseFailed)?;
        debug!("closed {:?}", self.handle);
        Ok(())
    }
}

impl<D: Ft260Driver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("closing {:?} on drop: {e}", self.handle);
        }
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::constants::{FT260_PID, FT260_VID};
    use crate::mock::{MockDriver, MockOp};

    #[test]
    fn device_paths_lists_every_interface() {
        let lib = Library::new(MockDriver::ft260());
        let paths = lib.device_paths().unwrap();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].contains("vid_0403&pid_6030&mi_00"));
        assert!(paths[1].contains("vid_0403&pid_6030&mi_01"));
    }

    #[test]
    fn device_list_failure_is_enumeration_error() {
        let mock = MockDriver::ft260();
        mock.fail(MockOp::CreateDeviceList, Status::DeviceManagerError);
        let lib = Library::new(mock);
        match lib.device_paths() {
            Err(Error::Enumeration(Status::DeviceManagerError)) => {}
            other => panic!("expected enumeration error, got {other:?}"),
        }
    }

    #[test]
    fn session_closes_exactly_once() {
        let mock = MockDriver::ft260();
        let driver = Arc::new(Mutex::new(mock.clone()));
        let session =
            DeviceSession::open(driver, FT260_VID, FT260_PID, 0, OperatingMode::I2c).unwrap();
        assert_eq!(mock.open_handles(), 1);
        session.close().unwrap();
        assert_eq!(mock.open_handles(), 0);
        assert_eq!(mock.count(MockOp::Close), 1);
    }

    #[test]
    fn dropped_session_releases_handle() {
        let mock = MockDriver::ft260();
        let driver = Arc::new(Mutex::new(mock.clone()));
        {
            let _session =
                DeviceSession::open(driver, FT260_VID, FT260_PID, 1, OperatingMode::Uart).unwrap();
            assert_eq!(mock.open_handles(), 1);
        }
        assert_eq!(mock.open_handles(), 0);
        assert_eq!(mock.count(MockOp::Close), 1);
    }

    #[test]
    fn open_reports_driver_status() {
        let driver = Arc::new(Mutex::new(MockDriver::new()));
        let err = DeviceSession::open(driver, 0x1234, 0x5678, 0, OperatingMode::I2c).unwrap_err();
        assert_eq!(err, Status::DeviceNotFound);
    }
}

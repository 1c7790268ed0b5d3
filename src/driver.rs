//! The vendor driver boundary.
//!
//! [`Ft260Driver`] lists the entry points of the FT260 vendor library that
//! this crate calls. Every method maps to exactly one vendor call and
//! returns the raw [`Status`] the driver reported; interpretation of the
//! status happens in the session layer.
//!
//! Two backends exist: [`VendorDriver`](crate::ffi::VendorDriver), which
//! links against LibFT260 (feature `libft260`), and
//! [`MockDriver`](crate::mock::MockDriver), a simulated device (feature
//! `mock`).

use crate::types::{
    DataBits, FlowControl, GpioAFunction, I2cFlag, Parity, Status, StopBits, UartConfig,
};

/// Entry points of the FT260 vendor driver.
///
/// Methods take `&mut self` because backends may keep per-device state;
/// the [`Library`](crate::Library) serialises all calls behind a mutex.
pub trait Ft260Driver {
    /// Opaque handle identifying one open device interface.
    type Handle: Copy + std::fmt::Debug;

    // ---- Enumeration ----

    /// Build the driver's device list and return the number of entries.
    fn create_device_list(&mut self) -> (Status, u32);

    /// Device path of the entry at `index` in the device list.
    fn device_path(&mut self, index: u32) -> (Status, String);

    // ---- Lifecycle ----

    /// Open the first device matching `vid`/`pid` on the given interface.
    fn open_by_vid_pid(
        &mut self,
        vid: u16,
        pid: u16,
        interface: u32,
    ) -> (Status, Option<Self::Handle>);

    /// Release a handle.
    fn close(&mut self, handle: Self::Handle) -> Status;

    // ---- I2C master ----

    /// Initialise the I2C master at `clock_khz`.
    fn i2c_master_init(&mut self, handle: Self::Handle, clock_khz: u32) -> Status;

    /// Reset the I2C master.
    fn i2c_master_reset(&mut self, handle: Self::Handle) -> Status;

    /// Write `data` to `address`. Returns the number of bytes accepted.
    fn i2c_master_write(
        &mut self,
        handle: Self::Handle,
        address: u8,
        flag: I2cFlag,
        data: &[u8],
    ) -> (Status, usize);

    /// Read up to `buf.len()` bytes from `address`. Returns the number of
    /// bytes received.
    fn i2c_master_read(
        &mut self,
        handle: Self::Handle,
        address: u8,
        flag: I2cFlag,
        buf: &mut [u8],
    ) -> (Status, usize);

    /// I2C controller status byte.
    fn i2c_master_status(&mut self, handle: Self::Handle) -> (Status, u8);

    // ---- UART ----

    /// Initialise the UART block.
    fn uart_init(&mut self, handle: Self::Handle) -> Status;

    /// Read back the current UART configuration.
    fn uart_config(&mut self, handle: Self::Handle) -> (Status, UartConfig);

    /// Set the flow control mode.
    fn uart_set_flow_control(&mut self, handle: Self::Handle, mode: FlowControl) -> Status;

    /// Set the baud rate.
    fn uart_set_baud_rate(&mut self, handle: Self::Handle, baud: u32) -> Status;

    /// Set data bits, stop bits and parity.
    fn uart_set_data_characteristics(
        &mut self,
        handle: Self::Handle,
        data_bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) -> Status;

    /// Clear any break condition.
    fn uart_set_break_off(&mut self, handle: Self::Handle) -> Status;

    /// Write `data`. Returns the number of bytes written.
    fn uart_write(&mut self, handle: Self::Handle, data: &[u8]) -> (Status, usize);

    /// Read up to `buf.len()` bytes. Returns the number of bytes read.
    fn uart_read(&mut self, handle: Self::Handle, buf: &mut [u8]) -> (Status, usize);

    /// Number of bytes waiting in the receive queue.
    fn uart_queue_status(&mut self, handle: Self::Handle) -> (Status, usize);

    // ---- GPIO ----

    /// Select the function of the GPIOA pin.
    fn select_gpio_a_function(&mut self, handle: Self::Handle, function: GpioAFunction) -> Status;
}

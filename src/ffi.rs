//! Backend linking the vendor LibFT260 library.
//!
//! Enabled with the `libft260` feature. The build script adds
//! `LIBFT260_DIR` to the native search path; the library itself must be
//! installed separately.

use std::ffi::c_void;
use std::ptr;

use crate::constants::{DEVICE_PATH_LEN, I2C_READ_TIMEOUT_MS};
use crate::driver::Ft260Driver;
use crate::types::{
    DataBits, FlowControl, GpioAFunction, I2cFlag, Parity, Status, StopBits, UartConfig,
};

type Ft260Status = u32;
type Ft260Handle = *mut c_void;

#[link(name = "LibFT260")]
extern "system" {
    fn FT260_CreateDeviceList(num_devs: *mut u32) -> Ft260Status;
    fn FT260_GetDevicePath(path: *mut u16, buffer_len: u32, index: u32) -> Ft260Status;
    fn FT260_OpenByVidPid(vid: u16, pid: u16, index: u32, handle: *mut Ft260Handle) -> Ft260Status;
    fn FT260_Close(handle: Ft260Handle) -> Ft260Status;

    fn FT260_I2CMaster_Init(handle: Ft260Handle, kbps: u32) -> Ft260Status;
    fn FT260_I2CMaster_Reset(handle: Ft260Handle) -> Ft260Status;
    fn FT260_I2CMaster_Write(
        handle: Ft260Handle,
        address: u8,
        flag: u32,
        buffer: *const c_void,
        bytes_to_write: u32,
        bytes_written: *mut u32,
    ) -> Ft260Status;
    fn FT260_I2CMaster_Read(
        handle: Ft260Handle,
        address: u8,
        flag: u32,
        buffer: *mut c_void,
        bytes_to_read: u32,
        bytes_returned: *mut u32,
        wait_ms: u32,
    ) -> Ft260Status;
    fn FT260_I2CMaster_GetStatus(handle: Ft260Handle, status: *mut u8) -> Ft260Status;

    fn FT260_UART_Init(handle: Ft260Handle) -> Ft260Status;
    fn FT260_UART_GetConfig(handle: Ft260Handle, config: *mut UartConfig) -> Ft260Status;
    fn FT260_UART_SetFlowControl(handle: Ft260Handle, mode: u32) -> Ft260Status;
    fn FT260_UART_SetBaudRate(handle: Ft260Handle, baud: u32) -> Ft260Status;
    fn FT260_UART_SetDataCharacteristics(
        handle: Ft260Handle,
        data_bits: u32,
        stop_bits: u32,
        parity: u32,
    ) -> Ft260Status;
    fn FT260_UART_SetBreakOff(handle: Ft260Handle) -> Ft260Status;
    fn FT260_UART_Write(
        handle: Ft260Handle,
        buffer: *const c_void,
        buffer_len: u32,
        bytes_to_write: u32,
        bytes_written: *mut u32,
    ) -> Ft260Status;
    fn FT260_UART_Read(
        handle: Ft260Handle,
        buffer: *mut c_void,
        buffer_len: u32,
        bytes_to_read: u32,
        bytes_read: *mut u32,
    ) -> Ft260Status;
    fn FT260_UART_GetQueueStatus(handle: Ft260Handle, available: *mut u32) -> Ft260Status;

    fn FT260_SelectGpioAFunction(handle: Ft260Handle, function: u32) -> Ft260Status;
}

/// Handle returned by LibFT260.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawHandle(Ft260Handle);

// The vendor handle is an opaque token; LibFT260 does not tie it to the
// thread that opened it.
unsafe impl Send for RawHandle {}

/// Driver calling into the linked LibFT260.
#[derive(Debug, Default)]
pub struct VendorDriver {
    _private: (),
}

impl VendorDriver {
    /// Bind the linked library.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Clamp a buffer length to the 32-bit length the library takes.
fn len32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

impl Ft260Driver for VendorDriver {
    type Handle = RawHandle;

    fn create_device_list(&mut self) -> (Status, u32) {
        let mut count = 0u32;
        let status = unsafe { FT260_CreateDeviceList(&mut count) };
        (Status::from_raw(status), count)
    }

    fn device_path(&mut self, index: u32) -> (Status, String) {
        let mut buf = [0u16; DEVICE_PATH_LEN];
        let status = unsafe { FT260_GetDevicePath(buf.as_mut_ptr(), len32(buf.len()), index) };
        let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
        (Status::from_raw(status), String::from_utf16_lossy(&buf[..end]))
    }

    fn open_by_vid_pid(
        &mut self,
        vid: u16,
        pid: u16,
        interface: u32,
    ) -> (Status, Option<RawHandle>) {
        let mut handle: Ft260Handle = ptr::null_mut();
        let status = unsafe { FT260_OpenByVidPid(vid, pid, interface, &mut handle) };
        let status = Status::from_raw(status);
        if status.is_ok() && !handle.is_null() {
            (status, Some(RawHandle(handle)))
        } else {
            (status, None)
        }
    }

    fn close(&mut self, handle: RawHandle) -> Status {
        Status::from_raw(unsafe { FT260_Close(handle.0) })
    }

    fn i2c_master_init(&mut self, handle: RawHandle, clock_khz: u32) -> Status {
        Status::from_raw(unsafe { FT260_I2CMaster_Init(handle.0, clock_khz) })
    }

    fn i2c_master_reset(&mut self, handle: RawHandle) -> Status {
        Status::from_raw(unsafe { FT260_I2CMaster_Reset(handle.0) })
    }

    fn i2c_master_write(
        &mut self,
        handle: RawHandle,
        address: u8,
        flag: I2cFlag,
        data: &[u8],
    ) -> (Status, usize) {
        let mut written = 0u32;
        let status = unsafe {
            FT260_I2CMaster_Write(
                handle.0,
                address,
                flag.wire_value(),
                data.as_ptr().cast(),
                len32(data.len()),
                &mut written,
            )
        };
        (Status::from_raw(status), written as usize)
    }

    fn i2c_master_read(
        &mut self,
        handle: RawHandle,
        address: u8,
        flag: I2cFlag,
        buf: &mut [u8],
    ) -> (Status, usize) {
        let mut read = 0u32;
        let status = unsafe {
            FT260_I2CMaster_Read(
                handle.0,
                address,
                flag.wire_value(),
                buf.as_mut_ptr().cast(),
                len32(buf.len()),
                &mut read,
                I2C_READ_TIMEOUT_MS,
            )
        };
        (Status::from_raw(status), read as usize)
    }

    fn i2c_master_status(&mut self, handle: RawHandle) -> (Status, u8) {
        let mut raw = 0u8;
        let status = unsafe { FT260_I2CMaster_GetStatus(handle.0, &mut raw) };
        (Status::from_raw(status), raw)
    }

    fn uart_init(&mut self, handle: RawHandle) -> Status {
        Status::from_raw(unsafe { FT260_UART_Init(handle.0) })
    }

    fn uart_config(&mut self, handle: RawHandle) -> (Status, UartConfig) {
        let mut config = UartConfig::default();
        let status = unsafe { FT260_UART_GetConfig(handle.0, &mut config) };
        (Status::from_raw(status), config)
    }

    fn uart_set_flow_control(&mut self, handle: RawHandle, mode: FlowControl) -> Status {
        Status::from_raw(unsafe { FT260_UART_SetFlowControl(handle.0, mode.wire_value().into()) })
    }

    fn uart_set_baud_rate(&mut self, handle: RawHandle, baud: u32) -> Status {
        Status::from_raw(unsafe { FT260_UART_SetBaudRate(handle.0, baud) })
    }

    fn uart_set_data_characteristics(
        &mut self,
        handle: RawHandle,
        data_bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) -> Status {
        Status::from_raw(unsafe {
            FT260_UART_SetDataCharacteristics(
                handle.0,
                data_bits.wire_value().into(),
                stop_bits.wire_value().into(),
                parity.wire_value().into(),
            )
        })
    }

    fn uart_set_break_off(&mut self, handle: RawHandle) -> Status {
        Status::from_raw(unsafe { FT260_UART_SetBreakOff(handle.0) })
    }

    fn uart_write(&mut self, handle: RawHandle, data: &[u8]) -> (Status, usize) {
        let mut written = 0u32;
        let len = len32(data.len());
        let status =
            unsafe { FT260_UART_Write(handle.0, data.as_ptr().cast(), len, len, &mut written) };
        (Status::from_raw(status), written as usize)
    }

    fn uart_read(&mut self, handle: RawHandle, buf: &mut [u8]) -> (Status, usize) {
        let mut read = 0u32;
        let len = len32(buf.len());
        let status =
            unsafe { FT260_UART_Read(handle.0, buf.as_mut_ptr().cast(), len, len, &mut read) };
        (Status::from_raw(status), read as usize)
    }

    fn uart_queue_status(&mut self, handle: RawHandle) -> (Status, usize) {
        let mut available = 0u32;
        let status = unsafe { FT260_UART_GetQueueStatus(handle.0, &mut available) };
        (Status::from_raw(status), available as usize)
    }

    fn select_gpio_a_function(&mut self, handle: RawHandle, function: GpioAFunction) -> Status {
        let status = unsafe { FT260_SelectGpioAFunction(handle.0, function.wire_value().into()) };
        Status::from_raw(status)
    }
}

//! Simulated FT260 driver.
//!
//! [`MockDriver`] stands in for the vendor library in tests and demos. It
//! models devices with one or two interfaces, I2C slaves with scripted read
//! data, a UART receive queue and a transmit log. Failures are injected per
//! driver call with [`MockDriver::fail`] and friends, and every call is
//! journalled so tests can assert on call order and counts.
//!
//! The driver is a cheap handle to shared state: clone it before handing it
//! to a [`Library`](crate::Library) and keep the clone to inspect and script
//! the device.
//!
//! # Example
//!
//! ```
//! use ft260::mock::{MockDriver, MockOp, MockSlave};
//! use ft260::{I2cConfig, I2cFlag, Library, Status, FT260_PID, FT260_VID};
//!
//! let mock = MockDriver::ft260();
//! mock.add_slave(0x50, MockSlave::with_read_data(&[0xDE, 0xAD]));
//! mock.fail_on_interface(MockOp::I2cInit, 0, Status::IncorrectInterface);
//!
//! let lib = Library::new(mock.clone());
//! let mut i2c = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default())?;
//! assert_eq!(i2c.interface(), 1);
//! assert_eq!(i2c.read(0x50, I2cFlag::StartAndStop, 2).payload, vec![0xDE, 0xAD]);
//! # Ok::<(), ft260::Error>(())
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::constants::{FT260_PID, FT260_VID};
use crate::driver::Ft260Driver;
use crate::types::{
    DataBits, FlowControl, GpioAFunction, I2cFlag, Parity, Status, StopBits, UartConfig,
};

/// Bus status reported after a transfer to an absent slave: error, address
/// NACK, controller idle.
const ADDRESS_NACK_STATUS: u8 = 0x26;

/// Driver calls, for fault injection and the call journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    CreateDeviceList,
    DevicePath,
    Open,
    Close,
    I2cInit,
    I2cReset,
    I2cWrite,
    I2cRead,
    I2cStatus,
    UartInit,
    UartConfig,
    UartFlowControl,
    UartBaudRate,
    UartDataCharacteristics,
    UartBreakOff,
    UartWrite,
    UartRead,
    UartQueueStatus,
    GpioFunction,
}

/// One journalled driver call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockCall {
    /// The call.
    pub op: MockOp,
    /// Interface the call targeted, where one applies.
    pub interface: Option<u32>,
}

/// A simulated USB device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    /// Vendor ID.
    pub vid: u16,
    /// Product ID.
    pub pid: u16,
    /// Interface indices the device exposes.
    pub interfaces: Vec<u32>,
}

impl MockDevice {
    /// Composite FT260 with I2C on interface 0 and UART on interface 1.
    pub fn ft260() -> Self {
        Self {
            vid: FT260_VID,
            pid: FT260_PID,
            interfaces: vec![0, 1],
        }
    }

    fn paths(&self, instance: usize) -> Vec<String> {
        let base = format!("vid_{:04x}&pid_{:04x}", self.vid, self.pid);
        if self.interfaces.len() > 1 {
            self.interfaces
                .iter()
                .map(|i| format!(r"\\?\hid#{base}&mi_{i:02x}#7&{instance:x}&0&000{i}"))
                .collect()
        } else {
            vec![format!(r"\\?\hid#{base}#6&{instance:x}&0&0000")]
        }
    }
}

/// A simulated I2C slave.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockSlave {
    read_data: VecDeque<u8>,
    written: Vec<u8>,
    accept_limit: Option<usize>,
}

impl MockSlave {
    /// Slave that returns `data` to reads, in order.
    pub fn with_read_data(data: &[u8]) -> Self {
        Self {
            read_data: data.iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Accept at most `n` bytes per write.
    pub fn accept_at_most(mut self, n: usize) -> Self {
        self.accept_limit = Some(n);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    op: MockOp,
    interface: Option<u32>,
    status: Status,
    remaining: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct OpenHandle {
    interface: u32,
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    next_handle: u32,
    handles: HashMap<u32, OpenHandle>,
    faults: Vec<Fault>,
    journal: Vec<MockCall>,
    slaves: HashMap<u8, MockSlave>,
    bus_status: u8,
    last_bus_status: u8,
    i2c_clock_khz: Option<u32>,
    uart: UartConfig,
    uart_rx: VecDeque<u8>,
    uart_tx: Vec<u8>,
    gpio_a: Option<GpioAFunction>,
}

impl MockState {
    /// Journal the call and return an injected failure, if one applies.
    fn enter(&mut self, op: MockOp, interface: Option<u32>) -> Option<Status> {
        self.journal.push(MockCall { op, interface });
        let fault = self.faults.iter_mut().find(|f| {
            f.op == op
                && f.remaining != Some(0)
                && (f.interface.is_none() || f.interface == interface)
        })?;
        if let Some(n) = fault.remaining.as_mut() {
            *n -= 1;
        }
        Some(fault.status)
    }

    /// Journal a call against `handle`, failing fast for unknown handles.
    fn enter_handle(&mut self, op: MockOp, handle: u32) -> Option<Status> {
        let Some(open) = self.handles.get(&handle).copied() else {
            self.journal.push(MockCall { op, interface: None });
            return Some(Status::InvalidHandle);
        };
        self.enter(op, Some(open.interface))
    }

    fn paths(&self) -> Vec<String> {
        self.devices
            .iter()
            .enumerate()
            .flat_map(|(n, d)| d.paths(n))
            .collect()
    }
}

/// Simulated FT260 driver.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// A driver with no devices attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver with one composite FT260 attached.
    pub fn ft260() -> Self {
        Self::new().with_device(MockDevice::ft260())
    }

    /// Attach another device.
    pub fn with_device(self, device: MockDevice) -> Self {
        self.state().devices.push(device);
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- Scripting ----

    /// Make every call of `op` fail with `status`.
    pub fn fail(&self, op: MockOp, status: Status) {
        self.push_fault(op, None, status, None);
    }

    /// Make calls of `op` on `interface` fail with `status`.
    pub fn fail_on_interface(&self, op: MockOp, interface: u32, status: Status) {
        self.push_fault(op, Some(interface), status, None);
    }

    /// Make the next `times` calls of `op` fail with `status`.
    pub fn fail_times(&self, op: MockOp, status: Status, times: usize) {
        self.push_fault(op, None, status, Some(times));
    }

    /// Remove all injected failures.
    pub fn clear_faults(&self) {
        self.state().faults.clear();
    }

    fn push_fault(
        &self,
        op: MockOp,
        interface: Option<u32>,
        status: Status,
        remaining: Option<usize>,
    ) {
        self.state().faults.push(Fault {
            op,
            interface,
            status,
            remaining,
        });
    }

    /// Attach an I2C slave at `address`, replacing any existing one.
    pub fn add_slave(&self, address: u8, slave: MockSlave) {
        self.state().slaves.insert(address, slave);
    }

    /// Queue more read data on the slave at `address`.
    pub fn queue_slave_data(&self, address: u8, data: &[u8]) {
        self.state()
            .slaves
            .entry(address)
            .or_default()
            .read_data
            .extend(data.iter().copied());
    }

    /// Controller status reported after successful transfers.
    pub fn set_bus_status(&self, raw: u8) {
        self.state().bus_status = raw;
    }

    /// Append bytes to the UART receive queue.
    pub fn push_uart_rx(&self, data: &[u8]) {
        self.state().uart_rx.extend(data.iter().copied());
    }

    // ---- Inspection ----

    /// Every call made so far.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().journal.clone()
    }

    /// Number of calls of `op` made so far.
    pub fn count(&self, op: MockOp) -> usize {
        self.state().journal.iter().filter(|c| c.op == op).count()
    }

    /// Number of open attempts on `interface`.
    pub fn opens_on(&self, interface: u32) -> usize {
        self.state()
            .journal
            .iter()
            .filter(|c| c.op == MockOp::Open && c.interface == Some(interface))
            .count()
    }

    /// Number of handles currently open.
    pub fn open_handles(&self) -> usize {
        self.state().handles.len()
    }

    /// All bytes written to the slave at `address`.
    pub fn slave_written(&self, address: u8) -> Vec<u8> {
        self.state()
            .slaves
            .get(&address)
            .map(|s| s.written.clone())
            .unwrap_or_default()
    }

    /// I2C clock set by the last successful init.
    pub fn i2c_clock_khz(&self) -> Option<u32> {
        self.state().i2c_clock_khz
    }

    /// Current UART configuration of the simulated chip.
    pub fn uart_config(&self) -> UartConfig {
        self.state().uart
    }

    /// GPIOA function selected, if any.
    pub fn gpio_a(&self) -> Option<GpioAFunction> {
        self.state().gpio_a
    }

    /// All bytes transmitted on the UART.
    pub fn uart_tx(&self) -> Vec<u8> {
        self.state().uart_tx.clone()
    }
}

impl Ft260Driver for MockDriver {
    type Handle = u32;

    fn create_device_list(&mut self) -> (Status, u32) {
        let mut state = self.state();
        if let Some(status) = state.enter(MockOp::CreateDeviceList, None) {
            return (status, 0);
        }
        (Status::Ok, state.paths().len() as u32)
    }

    fn device_path(&mut self, index: u32) -> (Status, String) {
        let mut state = self.state();
        if let Some(status) = state.enter(MockOp::DevicePath, None) {
            return (status, String::new());
        }
        match state.paths().into_iter().nth(index as usize) {
            Some(path) => (Status::Ok, path),
            None => (Status::InvalidParameter, String::new()),
        }
    }

    fn open_by_vid_pid(&mut self, vid: u16, pid: u16, interface: u32) -> (Status, Option<u32>) {
        let mut state = self.state();
        if let Some(status) = state.enter(MockOp::Open, Some(interface)) {
            return (status, None);
        }
        let present = state
            .devices
            .iter()
            .any(|d| d.vid == vid && d.pid == pid && d.interfaces.contains(&interface));
        if !present {
            return (Status::DeviceNotFound, None);
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.handles.insert(handle, OpenHandle { interface });
        (Status::Ok, Some(handle))
    }

    fn close(&mut self, handle: u32) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::Close, handle) {
            return status;
        }
        state.handles.remove(&handle);
        Status::Ok
    }

    fn i2c_master_init(&mut self, handle: u32, clock_khz: u32) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::I2cInit, handle) {
            return status;
        }
        state.i2c_clock_khz = Some(clock_khz);
        Status::Ok
    }

    fn i2c_master_reset(&mut self, handle: u32) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::I2cReset, handle) {
            return status;
        }
        state.last_bus_status = state.bus_status;
        Status::Ok
    }

    fn i2c_master_write(
        &mut self,
        handle: u32,
        address: u8,
        _flag: I2cFlag,
        data: &[u8],
    ) -> (Status, usize) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::I2cWrite, handle) {
            return (status, 0);
        }
        let bus_status = state.bus_status;
        let Some(slave) = state.slaves.get_mut(&address) else {
            state.last_bus_status = ADDRESS_NACK_STATUS;
            return (Status::OtherError, 0);
        };
        let accepted = slave.accept_limit.map_or(data.len(), |n| n.min(data.len()));
        slave.written.extend_from_slice(&data[..accepted]);
        state.last_bus_status = bus_status;
        (Status::Ok, accepted)
    }

    fn i2c_master_read(
        &mut self,
        handle: u32,
        address: u8,
        _flag: I2cFlag,
        buf: &mut [u8],
    ) -> (Status, usize) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::I2cRead, handle) {
            return (status, 0);
        }
        let bus_status = state.bus_status;
        let Some(slave) = state.slaves.get_mut(&address) else {
            state.last_bus_status = ADDRESS_NACK_STATUS;
            return (Status::OtherError, 0);
        };
        let mut n = 0;
        while n < buf.len() {
            match slave.read_data.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        state.last_bus_status = bus_status;
        (Status::Ok, n)
    }

    fn i2c_master_status(&mut self, handle: u32) -> (Status, u8) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::I2cStatus, handle) {
            return (status, 0);
        }
        (Status::Ok, state.last_bus_status)
    }

    fn uart_init(&mut self, handle: u32) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartInit, handle) {
            return status;
        }
        state.uart = UartConfig::default();
        Status::Ok
    }

    fn uart_config(&mut self, handle: u32) -> (Status, UartConfig) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartConfig, handle) {
            return (status, UartConfig::default());
        }
        (Status::Ok, state.uart)
    }

    fn uart_set_flow_control(&mut self, handle: u32, mode: FlowControl) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartFlowControl, handle) {
            return status;
        }
        state.uart.flow_ctrl = mode.wire_value();
        Status::Ok
    }

    fn uart_set_baud_rate(&mut self, handle: u32, baud: u32) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartBaudRate, handle) {
            return status;
        }
        state.uart.baud_rate = baud;
        Status::Ok
    }

    fn uart_set_data_characteristics(
        &mut self,
        handle: u32,
        data_bits: DataBits,
        stop_bits: StopBits,
        parity: Parity,
    ) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartDataCharacteristics, handle) {
            return status;
        }
        state.uart.data_bit = data_bits.wire_value();
        state.uart.stop_bit = stop_bits.wire_value();
        state.uart.parity = parity.wire_value();
        Status::Ok
    }

    fn uart_set_break_off(&mut self, handle: u32) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartBreakOff, handle) {
            return status;
        }
        state.uart.breaking = 0;
        Status::Ok
    }

    fn uart_write(&mut self, handle: u32, data: &[u8]) -> (Status, usize) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartWrite, handle) {
            return (status, 0);
        }
        state.uart_tx.extend_from_slice(data);
        (Status::Ok, data.len())
    }

    fn uart_read(&mut self, handle: u32, buf: &mut [u8]) -> (Status, usize) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartRead, handle) {
            return (status, 0);
        }
        let n = buf.len().min(state.uart_rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.uart_rx.drain(..n)) {
            *slot = byte;
        }
        (Status::Ok, n)
    }

    fn uart_queue_status(&mut self, handle: u32) -> (Status, usize) {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::UartQueueStatus, handle) {
            return (status, 0);
        }
        (Status::Ok, state.uart_rx.len())
    }

    fn select_gpio_a_function(&mut self, handle: u32, function: GpioAFunction) -> Status {
        let mut state = self.state();
        if let Some(status) = state.enter_handle(MockOp::GpioFunction, handle) {
            return status;
        }
        state.gpio_a = Some(function);
        Status::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_handle_fails_fast() {
        let mut mock = MockDriver::ft260();
        assert_eq!(mock.close(42), Status::InvalidHandle);
        assert_eq!(
            mock.i2c_master_write(42, 0x50, I2cFlag::None, &[1]),
            (Status::InvalidHandle, 0)
        );
        assert_eq!(mock.uart_queue_status(7).0, Status::InvalidHandle);
    }

    #[test]
    fn handle_is_invalid_after_close() {
        let mut mock = MockDriver::ft260();
        let (status, handle) = mock.open_by_vid_pid(FT260_VID, FT260_PID, 0);
        assert_eq!(status, Status::Ok);
        let handle = handle.unwrap();
        assert_eq!(mock.close(handle), Status::Ok);
        assert_eq!(mock.close(handle), Status::InvalidHandle);
        assert_eq!(mock.i2c_master_init(handle, 100), Status::InvalidHandle);
    }

    #[test]
    fn single_interface_device_has_plain_path() {
        let mut mock = MockDriver::new().with_device(MockDevice {
            vid: FT260_VID,
            pid: FT260_PID,
            interfaces: vec![0],
        });
        assert_eq!(mock.create_device_list(), (Status::Ok, 1));
        let (_, path) = mock.device_path(0);
        assert!(path.contains("vid_0403&pid_6030#"));
        assert_eq!(mock.open_by_vid_pid(FT260_VID, FT260_PID, 1).0, Status::DeviceNotFound);
    }

    #[test]
    fn fail_times_expires() {
        let mut mock = MockDriver::ft260();
        mock.fail_times(MockOp::CreateDeviceList, Status::IoError, 1);
        assert_eq!(mock.create_device_list().0, Status::IoError);
        assert_eq!(mock.create_device_list().0, Status::Ok);
    }

    #[test]
    fn uart_read_drains_queue() {
        let mut mock = MockDriver::ft260();
        let handle = mock.open_by_vid_pid(FT260_VID, FT260_PID, 1).1.unwrap();
        mock.push_uart_rx(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(mock.uart_read(handle, &mut buf), (Status::Ok, 4));
        assert_eq!(&buf, b"abcd");
        assert_eq!(mock.uart_queue_status(handle), (Status::Ok, 2));
    }
}

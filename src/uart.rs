//! UART sessions.
//!
//! A [`UartSession`] is a device session with the UART block initialised
//! and configured from [`UartSettings`]. Data moves through
//! [`write`](UartSession::write) and the polling reads
//! [`read_available`](UartSession::read_available) and
//! [`read_loop`](UartSession::read_loop). `UartSession` also implements
//! [`std::io::Read`] and [`std::io::Write`].

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::constants::{DEFAULT_BAUD_RATE, MAX_BAUD_RATE, MIN_BAUD_RATE, UART_READ_CHUNK};
use crate::driver::Ft260Driver;
use crate::error::{Error, InitStep, Result};
use crate::session::{DeviceSession, SharedDriver};
use crate::types::{
    DataBits, FlowControl, GpioAFunction, OperatingMode, Parity, StopBits, UartConfig,
};

/// First sleep after an empty poll.
const POLL_INTERVAL_MIN: Duration = Duration::from_millis(1);

/// Longest sleep between polls of an idle receive queue.
const POLL_INTERVAL_MAX: Duration = Duration::from_millis(20);

/// Serial settings applied when a UART session is opened.
///
/// The defaults (9600 8N1, XON/XOFF, GPIOA as TX_ACTIVE) suit an RS-485
/// half-duplex console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartSettings {
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Flow control mode.
    pub flow_control: FlowControl,
    /// Data bits.
    pub data_bits: DataBits,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Parity.
    pub parity: Parity,
    /// GPIOA pin function.
    pub gpio_a: GpioAFunction,
}

impl Default for UartSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            flow_control: FlowControl::default(),
            data_bits: DataBits::default(),
            stop_bits: StopBits::default(),
            parity: Parity::default(),
            gpio_a: GpioAFunction::default(),
        }
    }
}

impl UartSettings {
    /// Set the baud rate.
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the flow control mode.
    pub fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Set data bits, stop bits and parity.
    pub fn line(mut self, data_bits: DataBits, stop_bits: StopBits, parity: Parity) -> Self {
        self.data_bits = data_bits;
        self.stop_bits = stop_bits;
        self.parity = parity;
        self
    }

    /// Set the GPIOA pin function.
    pub fn gpio_a(mut self, function: GpioAFunction) -> Self {
        self.gpio_a = function;
        self
    }

    fn validate(&self) -> Result<()> {
        if (MIN_BAUD_RATE..=MAX_BAUD_RATE).contains(&self.baud_rate) {
            Ok(())
        } else {
            Err(Error::InvalidArgument("baud rate must be between 1200 and 12000000"))
        }
    }
}

/// A chunk of received UART data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UartPayload {
    /// Valid UTF-8.
    Text(String),
    /// Anything else.
    Binary(Vec<u8>),
}

impl UartPayload {
    /// Classify raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(e) => Self::Binary(e.into_bytes()),
        }
    }

    /// The raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// Number of bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cancellation flag for [`UartSession::read_loop`].
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// New, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// A device session running as UART.
pub struct UartSession<D: Ft260Driver> {
    session: DeviceSession<D>,
    settings: UartSettings,
    config: Option<UartConfig>,
    // Incomplete UTF-8 sequence held back from the last chunk.
    pending: Vec<u8>,
}

impl<D: Ft260Driver> std::fmt::Debug for UartSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UartSession")
            .field("session", &self.session)
            .field("settings", &self.settings)
            .field("config", &self.config)
            .field("pending", &self.pending)
            .finish()
    }
}

impl<D: Ft260Driver> UartSession<D> {
    pub(crate) fn open(
        driver: SharedDriver<D>,
        vid: u16,
        pid: u16,
        settings: UartSettings,
    ) -> Result<Self> {
        settings.validate()?;

        let interface = OperatingMode::Uart.interface_index();
        let mut session = DeviceSession::open(driver, vid, pid, interface, OperatingMode::Uart)
            .map_err(|status| {
                warn!("open {vid:04x}:{pid:04x} failed: {status}");
                Error::OpenFailed { interface, status }
            })?;
        info!("open {vid:04x}:{pid:04x} OK");

        // Any failure below drops the session, which closes the handle.
        session.configure(InitStep::UartInit, |d, h| d.uart_init(h))?;
        session.configure(InitStep::GpioFunction, |d, h| {
            d.select_gpio_a_function(h, settings.gpio_a)
        })?;
        session.configure(InitStep::FlowControl, |d, h| {
            d.uart_set_flow_control(h, settings.flow_control)
        })?;
        session.configure(InitStep::BaudRate, |d, h| {
            d.uart_set_baud_rate(h, settings.baud_rate)
        })?;
        session.configure(InitStep::DataCharacteristics, |d, h| {
            d.uart_set_data_characteristics(
                h,
                settings.data_bits,
                settings.stop_bits,
                settings.parity,
            )
        })?;
        session.configure(InitStep::BreakOff, |d, h| d.uart_set_break_off(h))?;

        let (status, readback) = session.call(|d, h| d.uart_config(h));
        let config = if status.is_ok() {
            info!("UART config {readback}");
            Some(readback)
        } else {
            warn!("UART config read-back failed: {status}");
            None
        };

        Ok(Self {
            session,
            settings,
            config,
            pending: Vec::new(),
        })
    }

    /// Settings applied at open.
    pub fn settings(&self) -> &UartSettings {
        &self.settings
    }

    /// Configuration read back from the chip at open, if the read-back
    /// succeeded.
    pub fn config(&self) -> Option<UartConfig> {
        self.config
    }

    /// Transmit `data`. Returns the number of bytes the driver wrote.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        let (status, written) = self.session.call(|d, h| d.uart_write(h, data));
        if !status.is_ok() {
            warn!("UART write failed: {status}");
            return Err(Error::TransferFailed {
                op: "UART write",
                status,
                bus_status: None,
            });
        }
        Ok(written.min(data.len()))
    }

    /// Interactive transmit loop.
    ///
    /// Prompts on `output`, transmits each line read from `input` without
    /// its line terminator, and reports the outcome on `output`. Returns
    /// the total number of bytes written once `input` reaches EOF.
    pub fn write_lines<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        mut output: W,
    ) -> Result<usize> {
        let mut total = 0;
        let mut line = String::new();
        loop {
            output.write_all(b"> ")?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                return Ok(total);
            }
            let text = line.trim_end_matches(['\r', '\n']);

            match self.write(text.as_bytes()) {
                Ok(written) => {
                    total += written;
                    writeln!(output, "Write bytes : {written}")?;
                }
                Err(Error::TransferFailed { status, .. }) => {
                    writeln!(output, "UART Write NG : {status}")?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Poll the receive queue once.
    ///
    /// Returns `None` if the queue is empty, otherwise up to
    /// [`UART_READ_CHUNK`] bytes. A multi-byte character cut off by the
    /// chunk size is held back and delivered with the next chunk.
    pub fn read_available(&mut self) -> Result<Option<UartPayload>> {
        let available = self.queue_depth()?;
        if available == 0 {
            return Ok(None);
        }
        self.read_chunk(available)
    }

    /// Poll the receive queue until `cancel` is set, handing every chunk to
    /// `sink`.
    ///
    /// Polls that deliver nothing back off from 1 ms up to 20 ms. Failed
    /// reads are logged and polling continues; a failed queue query ends
    /// the loop.
    pub fn read_loop(
        &mut self,
        cancel: &CancelToken,
        mut sink: impl FnMut(UartPayload),
    ) -> Result<()> {
        let mut idle = POLL_INTERVAL_MIN;
        while !cancel.is_cancelled() {
            let available = self.queue_depth()?;
            if available == 0 {
                thread::sleep(idle);
                idle = (idle * 2).min(POLL_INTERVAL_MAX);
                continue;
            }

            match self.read_chunk(available) {
                Ok(Some(payload)) => {
                    idle = POLL_INTERVAL_MIN;
                    sink(payload);
                    continue;
                }
                Ok(None) => {}
                Err(e) => warn!("{e}"),
            }
            thread::sleep(idle);
            idle = (idle * 2).min(POLL_INTERVAL_MAX);
        }
        debug!("UART read loop cancelled");
        Ok(())
    }

    /// Block until at least one byte arrives, then fill as much of `buf` as
    /// is available.
    pub fn read_blocking(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.pending.is_empty() {
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            return Ok(n);
        }
        let mut idle = POLL_INTERVAL_MIN;
        loop {
            let available = self.queue_depth()?;
            if available == 0 {
                thread::sleep(idle);
                idle = (idle * 2).min(POLL_INTERVAL_MAX);
                continue;
            }
            let want = available.min(buf.len());
            let (status, read) = self.session.call(|d, h| d.uart_read(h, &mut buf[..want]));
            if !status.is_ok() {
                return Err(Error::TransferFailed {
                    op: "UART read",
                    status,
                    bus_status: None,
                });
            }
            if read > 0 {
                return Ok(read.min(want));
            }
            thread::sleep(idle);
            idle = (idle * 2).min(POLL_INTERVAL_MAX);
        }
    }

    /// Close the session.
    pub fn close(self) -> Result<()> {
        self.session.close()
    }

    fn queue_depth(&mut self) -> Result<usize> {
        let (status, available) = self.session.call(|d, h| d.uart_queue_status(h));
        status.ok_then(available).map_err(|status| Error::TransferFailed {
            op: "UART queue status",
            status,
            bus_status: None,
        })
    }

    fn read_chunk(&mut self, available: usize) -> Result<Option<UartPayload>> {
        debug!("{available} bytes available");
        let mut buf = vec![0u8; available.min(UART_READ_CHUNK)];
        let (status, read) = self.session.call(|d, h| d.uart_read(h, &mut buf));
        if !status.is_ok() {
            return Err(Error::TransferFailed {
                op: "UART read",
                status,
                bus_status: None,
            });
        }
        buf.truncate(read.min(buf.len()));
        debug!("read {} bytes", buf.len());

        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(&buf);
        // Truncated character at the end: finish it with the next chunk.
        let truncated_at = std::str::from_utf8(&bytes)
            .err()
            .filter(|e| e.error_len().is_none())
            .map(|e| e.valid_up_to());
        if let Some(at) = truncated_at {
            self.pending = bytes.split_off(at);
        }
        if bytes.is_empty() {
            Ok(None)
        } else {
            Ok(Some(UartPayload::from_bytes(bytes)))
        }
    }
}

// ---- std::io trait implementations ----

impl<D: Ft260Driver> io::Read for UartSession<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_blocking(buf).map_err(io::Error::other)
    }
}

impl<D: Ft260Driver> io::Write for UartSession<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        UartSession::write(self, buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

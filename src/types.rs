//! Type definitions shared across the FT260 driver boundary.
//!
//! These types model the vendor library's enumerations: status codes, I2C
//! bus framing flags, UART line settings and the GPIOA pin function, plus
//! the two status records the chip reports back.

use std::fmt;

/// Status code returned by every vendor driver call.
///
/// Zero means success. Codes the library does not know about are kept
/// verbatim in [`Status::Unknown`] so they can still be surfaced to the
/// caller and the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// The call succeeded.
    Ok,
    /// The handle is not valid (closed or never opened).
    InvalidHandle,
    /// No device matched the request.
    DeviceNotFound,
    /// The device is not opened.
    DeviceNotOpened,
    /// The device could not be opened.
    DeviceOpenFail,
    /// The device could not be closed.
    DeviceCloseFail,
    /// The operation does not match the opened interface.
    IncorrectInterface,
    /// The chip is strapped for a mode that does not allow the operation.
    IncorrectChipMode,
    /// The OS device manager reported an error.
    DeviceManagerError,
    /// The I/O request is still pending.
    IoPending,
    /// The USB transfer failed.
    IoError,
    /// A buffer was too small or too large.
    BufferSizeError,
    /// An argument was out of range.
    InvalidParameter,
    /// Unclassified driver error.
    OtherError,
    /// A code outside the known set.
    Unknown(u32),
}

impl Status {
    /// Decode a raw status value returned by the driver.
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Ok,
            1 => Self::InvalidHandle,
            2 => Self::DeviceNotFound,
            3 => Self::DeviceNotOpened,
            4 => Self::DeviceOpenFail,
            5 => Self::DeviceCloseFail,
            6 => Self::IncorrectInterface,
            7 => Self::IncorrectChipMode,
            8 => Self::DeviceManagerError,
            9 => Self::IoPending,
            10 => Self::IoError,
            11 => Self::BufferSizeError,
            12 => Self::InvalidParameter,
            13 => Self::OtherError,
            other => Self::Unknown(other),
        }
    }

    /// Raw value as seen on the driver boundary.
    pub fn raw(self) -> u32 {
        match self {
            Self::Ok => 0,
            Self::InvalidHandle => 1,
            Self::DeviceNotFound => 2,
            Self::DeviceNotOpened => 3,
            Self::DeviceOpenFail => 4,
            Self::DeviceCloseFail => 5,
            Self::IncorrectInterface => 6,
            Self::IncorrectChipMode => 7,
            Self::DeviceManagerError => 8,
            Self::IoPending => 9,
            Self::IoError => 10,
            Self::BufferSizeError => 11,
            Self::InvalidParameter => 12,
            Self::OtherError => 13,
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether this is the success sentinel.
    #[inline]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// Turn the status into a `Result`, yielding `value` on success.
    pub fn ok_then<T>(self, value: T) -> std::result::Result<T, Status> {
        if self.is_ok() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    /// Vendor name of the status code.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ok => "FT260_OK",
            Self::InvalidHandle => "FT260_INVALID_HANDLE",
            Self::DeviceNotFound => "FT260_DEVICE_NOT_FOUND",
            Self::DeviceNotOpened => "FT260_DEVICE_NOT_OPENED",
            Self::DeviceOpenFail => "FT260_DEVICE_OPEN_FAIL",
            Self::DeviceCloseFail => "FT260_DEVICE_CLOSE_FAIL",
            Self::IncorrectInterface => "FT260_INCORRECT_INTERFACE",
            Self::IncorrectChipMode => "FT260_INCORRECT_CHIP_MODE",
            Self::DeviceManagerError => "FT260_DEVICE_MANAGER_ERROR",
            Self::IoPending => "FT260_IO_PENDING",
            Self::IoError => "FT260_IO_ERROR",
            Self::BufferSizeError => "FT260_BUFFER_SIZE_ERROR",
            Self::InvalidParameter => "FT260_INVALID_PARAMETER",
            Self::OtherError => "FT260_OTHER_ERROR",
            Self::Unknown(_) => "FT260_UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(raw) => write!(f, "FT260_UNKNOWN({raw})"),
            other => f.write_str(other.name()),
        }
    }
}

/// I2C bus framing for a single read or write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum I2cFlag {
    /// No START or STOP; continue a transaction already holding the bus.
    #[default]
    None,
    /// Repeated START before the transfer, keep the bus afterwards.
    RepeatedStart,
    /// START before and STOP after the transfer.
    StartAndStop,
    /// START before the transfer, keep the bus afterwards.
    Start,
    /// STOP after the transfer.
    Stop,
}

impl I2cFlag {
    /// All five flags.
    pub const ALL: [I2cFlag; 5] = [
        Self::None,
        Self::RepeatedStart,
        Self::StartAndStop,
        Self::Start,
        Self::Stop,
    ];

    /// Value passed to the vendor I2C read/write calls.
    pub fn wire_value(self) -> u32 {
        match self {
            Self::None => 0x00,
            Self::Start => 0x02,
            Self::RepeatedStart => 0x03,
            Self::Stop => 0x04,
            Self::StartAndStop => 0x06,
        }
    }

    /// Human-readable name used in transfer records.
    pub fn name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::RepeatedStart => "Repeated start",
            Self::StartAndStop => "Start&stop",
            Self::Start => "Start",
            Self::Stop => "Stop",
        }
    }
}

impl fmt::Display for I2cFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The mode a device session is opened in.
///
/// Composite FT260 devices expose I2C and UART as separate USB interfaces,
/// so the mode decides which interface index is requested at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatingMode {
    /// I2C master on interface 0.
    I2c,
    /// UART on interface 1.
    Uart,
}

impl OperatingMode {
    /// Interface index passed to the open-by-VID/PID call.
    pub fn interface_index(self) -> u32 {
        match self {
            Self::I2c => 0,
            Self::Uart => 1,
        }
    }
}

/// UART flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FlowControl {
    /// UART disabled.
    Off,
    /// Hardware RTS/CTS.
    RtsCts,
    /// Hardware DTR/DSR.
    DtrDsr,
    /// Software XON/XOFF.
    #[default]
    XonXoff,
    /// No flow control.
    None,
}

impl FlowControl {
    /// Vendor encoding.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::RtsCts => 1,
            Self::DtrDsr => 2,
            Self::XonXoff => 3,
            Self::None => 4,
        }
    }
}

/// Number of UART data bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataBits {
    /// 7 data bits.
    Seven,
    /// 8 data bits.
    #[default]
    Eight,
}

impl DataBits {
    /// Vendor encoding.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Seven => 7,
            Self::Eight => 8,
        }
    }
}

/// Number of UART stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StopBits {
    /// 1 stop bit.
    #[default]
    One,
    /// 2 stop bits.
    Two,
}

impl StopBits {
    /// Vendor encoding.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::One => 0,
            Self::Two => 2,
        }
    }
}

/// UART parity mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
    /// Mark parity (always 1).
    Mark,
    /// Space parity (always 0).
    Space,
}

impl Parity {
    /// Vendor encoding.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Odd => 1,
            Self::Even => 2,
            Self::Mark => 3,
            Self::Space => 4,
        }
    }
}

/// Function assigned to the GPIOA pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GpioAFunction {
    /// Plain GPIO.
    Gpio,
    /// Driven while the UART transmits; enables an RS-485 driver.
    #[default]
    TxActive,
    /// Blinks while the UART transmits.
    TxLed,
}

impl GpioAFunction {
    /// Vendor encoding.
    pub fn wire_value(self) -> u8 {
        match self {
            Self::Gpio => 0,
            Self::TxActive => 3,
            Self::TxLed => 4,
        }
    }
}

/// UART configuration as read back from the chip.
///
/// Layout matches the vendor `UartConfig` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UartConfig {
    /// Flow control mode ([`FlowControl::wire_value`]).
    pub flow_ctrl: u8,
    /// Baud rate in bits per second.
    pub baud_rate: u32,
    /// Data bits ([`DataBits::wire_value`]).
    pub data_bit: u8,
    /// Parity ([`Parity::wire_value`]).
    pub parity: u8,
    /// Stop bits ([`StopBits::wire_value`]).
    pub stop_bit: u8,
    /// Non-zero while a break condition is asserted.
    pub breaking: u8,
}

impl fmt::Display for UartConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "baud:{}, ctrl:{}, data_bit:{}, stop_bit:{}, parity:{}, breaking:{}",
            self.baud_rate, self.flow_ctrl, self.data_bit, self.stop_bit, self.parity, self.breaking
        )
    }
}

/// I2C controller status byte.
///
/// Queried after every I2C transfer. It reflects bus-level conditions such
/// as a NACK that the transfer status code alone does not capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct I2cBusStatus {
    raw: u8,
}

impl I2cBusStatus {
    /// Create from the raw status byte.
    pub fn from_raw(raw: u8) -> Self {
        Self { raw }
    }

    /// Raw status byte.
    pub fn raw(self) -> u8 {
        self.raw
    }

    /// Controller is busy with a transaction.
    pub fn controller_busy(self) -> bool {
        self.raw & 0x01 != 0
    }

    /// The last transaction ended in error.
    pub fn error(self) -> bool {
        self.raw & 0x02 != 0
    }

    /// The slave did not acknowledge its address.
    pub fn address_nack(self) -> bool {
        self.raw & 0x04 != 0
    }

    /// The slave did not acknowledge a data byte.
    pub fn data_nack(self) -> bool {
        self.raw & 0x08 != 0
    }

    /// Bus arbitration was lost.
    pub fn arbitration_lost(self) -> bool {
        self.raw & 0x10 != 0
    }

    /// Controller is idle.
    pub fn controller_idle(self) -> bool {
        self.raw & 0x20 != 0
    }

    /// Another master holds the bus.
    pub fn bus_busy(self) -> bool {
        self.raw & 0x40 != 0
    }
}

impl fmt::Display for I2cBusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.raw)
    }
}

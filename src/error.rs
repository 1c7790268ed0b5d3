//! Error types for the ft260 crate.

use std::fmt;

use crate::types::{I2cBusStatus, Status};

/// Configuration step performed while opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InitStep {
    /// I2C master initialisation.
    I2cMasterInit,
    /// UART initialisation.
    UartInit,
    /// GPIOA pin function selection.
    GpioFunction,
    /// UART flow control.
    FlowControl,
    /// UART baud rate.
    BaudRate,
    /// UART data bits, stop bits and parity.
    DataCharacteristics,
    /// Clearing the UART break condition.
    BreakOff,
}

impl fmt::Display for InitStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::I2cMasterInit => "I2C master init",
            Self::UartInit => "UART init",
            Self::GpioFunction => "GPIOA function select",
            Self::FlowControl => "UART flow control",
            Self::BaudRate => "UART baud rate",
            Self::DataCharacteristics => "UART data characteristics",
            Self::BreakOff => "UART break off",
        })
    }
}

/// The error type for FT260 operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening the device on the given interface failed.
    #[error("open on interface {interface} failed: {status}")]
    OpenFailed {
        /// Interface index requested.
        interface: u32,
        /// Driver status.
        status: Status,
    },

    /// A configuration step after a successful open failed.
    #[error("{step} failed: {status}")]
    InitFailed {
        /// The step that failed.
        step: InitStep,
        /// Driver status.
        status: Status,
    },

    /// I2C initialisation failed and so did the fallback interface.
    #[error("I2C init failed ({initial}) and fallback interface failed ({fallback})")]
    ReinitFailed {
        /// Status of the first I2C master init.
        initial: Status,
        /// Status of the fallback open or init.
        fallback: Status,
    },

    /// A read or write returned a non-OK status.
    #[error("{op} failed: {status}")]
    TransferFailed {
        /// The operation, e.g. `"I2C write"`.
        op: &'static str,
        /// Driver status.
        status: Status,
        /// I2C controller status queried after the transfer, if any.
        bus_status: Option<I2cBusStatus>,
    },

    /// A transfer moved fewer bytes than an all-or-nothing caller needs.
    #[error("{op} moved {transferred} of {requested} bytes")]
    ShortTransfer {
        /// The operation.
        op: &'static str,
        /// Bytes requested.
        requested: usize,
        /// Bytes actually moved.
        transferred: usize,
    },

    /// Closing the handle failed.
    #[error("close failed: {0}")]
    CloseFailed(Status),

    /// Building or walking the device list failed.
    #[error("device enumeration failed: {0}")]
    Enumeration(Status),

    /// Invalid argument(s) were provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// An error from the nusb USB layer.
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    /// Console I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Driver status carried by this error, if any.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::OpenFailed { status, .. }
            | Self::InitFailed { status, .. }
            | Self::TransferFailed { status, .. } => Some(*status),
            Self::ReinitFailed { fallback, .. } => Some(*fallback),
            Self::CloseFailed(status) | Self::Enumeration(status) => Some(*status),
            Self::ShortTransfer { .. } | Self::InvalidArgument(_) | Self::Usb(_) | Self::Io(_) => {
                None
            }
        }
    }
}

/// A specialized `Result` type for FT260 operations.
pub type Result<T> = std::result::Result<T, Error>;

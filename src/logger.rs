//! Transfer observers.
//!
//! An I2C session can carry one [`TransferLogger`]. After each I2C transfer
//! that succeeded and moved at least one byte, the logger receives a
//! [`TransferRecord`].

use std::fmt;

use crate::types::{I2cBusStatus, I2cFlag};

/// Direction of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    /// Host to slave.
    Write,
    /// Slave to host.
    Read,
}

impl TransferKind {
    /// Record tag, `"Write"` or `"Read"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Write => "Write",
            Self::Read => "Read",
        }
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One completed I2C transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRecord {
    /// Write or read.
    pub kind: TransferKind,
    /// 7-bit slave address.
    pub address: u8,
    /// Bytes actually transferred.
    pub data: Vec<u8>,
    /// Bus framing used for the call.
    pub flag: I2cFlag,
    /// Controller status queried after the call.
    pub device_status: I2cBusStatus,
}

impl TransferRecord {
    /// Slave address as lowercase hex, e.g. `0x50`.
    pub fn address_hex(&self) -> String {
        format!("{:#x}", self.address)
    }

    /// Transferred bytes as `0x`-prefixed hex, each followed by a space.
    pub fn hex_dump(&self) -> String {
        hex_dump(&self.data)
    }

    /// Name of the flag used for the call.
    pub fn flag_name(&self) -> &'static str {
        self.flag.name()
    }
}

impl fmt::Display for TransferRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}] {} status={}",
            self.kind,
            self.address_hex(),
            self.hex_dump(),
            self.flag_name(),
            self.device_status.raw()
        )
    }
}

/// Format bytes as `0x`-prefixed lowercase hex without padding, each byte
/// followed by one space: `[0xde, 0x0a]` becomes `"0xde 0xa "`.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 5);
    for byte in bytes {
        out.push_str(&format!("{byte:#x} "));
    }
    out
}

/// Observer for completed I2C transfers.
///
/// Implemented for any `FnMut(&TransferRecord) + Send` closure.
pub trait TransferLogger: Send {
    /// Called once per qualifying transfer.
    fn on_transfer(&mut self, record: &TransferRecord);
}

impl<F> TransferLogger for F
where
    F: FnMut(&TransferRecord) + Send,
{
    fn on_transfer(&mut self, record: &TransferRecord) {
        self(record)
    }
}

/// Logger forwarding records to the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogTransferLogger {
    level: log::Level,
}

impl LogTransferLogger {
    /// Log records at `level`.
    pub fn new(level: log::Level) -> Self {
        Self { level }
    }
}

impl Default for LogTransferLogger {
    fn default() -> Self {
        Self::new(log::Level::Info)
    }
}

impl TransferLogger for LogTransferLogger {
    fn on_transfer(&mut self, record: &TransferRecord) {
        log::log!(target: "ft260::transfer", self.level, "{record}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(data: &[u8]) -> TransferRecord {
        TransferRecord {
            kind: TransferKind::Read,
            address: 0x50,
            data: data.to_vec(),
            flag: I2cFlag::StartAndStop,
            device_status: I2cBusStatus::from_raw(0x20),
        }
    }

    #[test]
    fn hex_dump_matches_console_format() {
        assert_eq!(hex_dump(&[0xDE, 0xAD, 0xBE, 0xEF]), "0xde 0xad 0xbe 0xef ");
        assert_eq!(hex_dump(&[0x00, 0x0A]), "0x0 0xa ");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn record_fields() {
        let r = record(&[0x01]);
        assert_eq!(r.address_hex(), "0x50");
        assert_eq!(r.flag_name(), "Start&stop");
        assert_eq!(r.kind.as_str(), "Read");
        assert_eq!(r.to_string(), "Read 0x50 [0x1 ] Start&stop status=32");
    }

    #[test]
    fn closures_are_loggers() {
        let mut seen = Vec::new();
        {
            let mut logger = |r: &TransferRecord| seen.push(r.hex_dump());
            logger.on_transfer(&record(&[0xAB]));
            logger.on_transfer(&record(&[0xCD, 0xEF]));
        }
        assert_eq!(seen, vec!["0xab ", "0xcd 0xef "]);
    }
}

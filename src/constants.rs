//! FT260 identifiers and limits.

// ---- USB identifiers ----

/// FTDI vendor ID.
pub const FT260_VID: u16 = 0x0403;

/// FT260 product ID.
pub const FT260_PID: u16 = 0x6030;

// ---- I2C ----

/// Default I2C clock in kHz (standard mode).
pub const DEFAULT_I2C_CLOCK_KHZ: u32 = 100;

/// Slowest I2C clock the FT260 supports, in kHz.
pub const MIN_I2C_CLOCK_KHZ: u32 = 60;

/// Fastest I2C clock the FT260 supports, in kHz.
pub const MAX_I2C_CLOCK_KHZ: u32 = 3400;

/// Timeout handed to the vendor I2C read call, in milliseconds.
pub const I2C_READ_TIMEOUT_MS: u32 = 5000;

// ---- UART ----

/// Default UART baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Lowest UART baud rate the FT260 supports.
pub const MIN_BAUD_RATE: u32 = 1200;

/// Highest UART baud rate the FT260 supports.
pub const MAX_BAUD_RATE: u32 = 12_000_000;

/// Largest chunk pulled from the UART receive queue per read.
pub const UART_READ_CHUNK: usize = 50;

// ---- Device paths ----

/// Length of the buffer used for device path lookups, in UTF-16 units.
pub const DEVICE_PATH_LEN: usize = 128;

/// Path suffix marking interface 0 of a composite device.
pub const COMPOSITE_SUFFIX: &str = "&mi_00";

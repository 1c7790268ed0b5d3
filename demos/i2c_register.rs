//! Read a register block from an I2C EEPROM through an FT260.
//!
//! Sets the EEPROM's address pointer with a `Start` write, then reads it
//! back with `StartAndStop`. Every transfer is logged through the `log`
//! facade; run with `RUST_LOG=ft260=debug` to see them.
//!
//! # Wiring
//!
//! | FT260 Pin | I2C Signal | Notes |
//! |-----------|-----------|-------|
//! | SCL (DIO5) | SCL      | Pull-up to 3.3V via 4.7k |
//! | SDA (DIO6) | SDA      | Pull-up to 3.3V via 4.7k |
//!
//! # Usage
//!
//! ```sh
//! LIBFT260_DIR=/path/to/libft260 cargo run --example i2c_register --features libft260
//! ```

use ft260::{I2cConfig, I2cFlag, Library, LogTransferLogger, FT260_PID, FT260_VID};

/// 24C02-style EEPROM address.
const EEPROM_ADDR: u8 = 0x50;

/// Bytes to dump from word address 0.
const DUMP_LEN: usize = 16;

fn main() -> Result<(), ft260::Error> {
    env_logger::init();

    let lib = Library::vendor();
    for dev in lib.find_device_in_paths(FT260_VID, FT260_PID)? {
        println!("{} composite={}", dev.path, dev.composite);
    }

    let mut i2c = lib
        .open_i2c(FT260_VID, FT260_PID, I2cConfig::new(100))?
        .with_logger(LogTransferLogger::new(log::Level::Info));
    println!("I2C master at {} kHz on interface {}", i2c.clock_khz(), i2c.interface());

    i2c.write(EEPROM_ADDR, I2cFlag::Start, &[0x00]).into_result()?;
    let read = i2c
        .read(EEPROM_ADDR, I2cFlag::StartAndStop, DUMP_LEN)
        .into_result()?;

    print!("0x00:");
    for byte in &read.payload {
        print!(" {byte:02X}");
    }
    println!();
    println!("bus status: {:#04x}", read.device_status.raw());

    i2c.close()
}

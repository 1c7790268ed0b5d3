//! List connected FT260 devices.
//!
//! Enumerates USB devices with nusb and runs the result through the same
//! path matcher the vendor driver's device list goes through, so no vendor
//! library is needed.
//!
//! Usage: cargo run --example find_all

use ft260::discovery;
use ft260::{FT260_PID, FT260_VID};

fn main() -> Result<(), ft260::Error> {
    env_logger::init();

    let paths = discovery::usb_paths(FT260_VID, FT260_PID)?;
    let devices = discovery::match_paths(paths, FT260_VID, FT260_PID);

    if devices.is_empty() {
        println!("No FT260 devices found.");
        return Ok(());
    }

    for dev in &devices {
        match dev.interface() {
            Some(num) => println!("{} (composite, interface {num})", dev.path),
            None => println!("{} (single interface)", dev.path),
        }
    }

    Ok(())
}

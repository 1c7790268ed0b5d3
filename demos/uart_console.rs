//! Minimal serial console over the FT260 UART.
//!
//! `write` mode sends each line typed on stdin. `read` mode prints incoming
//! data until Enter is pressed.
//!
//! # Usage
//!
//! ```sh
//! LIBFT260_DIR=/path/to/libft260 cargo run --example uart_console --features libft260 -- write
//! LIBFT260_DIR=/path/to/libft260 cargo run --example uart_console --features libft260 -- read
//! ```

use std::io::{self, BufRead};
use std::thread;

use ft260::{CancelToken, Library, UartPayload, UartSettings, FT260_PID, FT260_VID};

fn main() -> Result<(), ft260::Error> {
    env_logger::init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "write".to_string());
    let lib = Library::vendor();
    let mut uart = lib.open_uart(FT260_VID, FT260_PID, UartSettings::default().baud_rate(115_200))?;
    if let Some(config) = uart.config() {
        println!("UART {config}");
    }

    match mode.as_str() {
        "read" => {
            let cancel = CancelToken::new();
            let stop = cancel.clone();
            thread::spawn(move || {
                let mut line = String::new();
                let _ = io::stdin().lock().read_line(&mut line);
                stop.cancel();
            });

            println!("Reading, press Enter to stop.");
            uart.read_loop(&cancel, |payload| match payload {
                UartPayload::Text(text) => print!("{text}"),
                UartPayload::Binary(bytes) => println!("{}", ft260::logger::hex_dump(&bytes)),
            })?;
        }
        _ => {
            let total = uart.write_lines(io::stdin().lock(), io::stdout())?;
            println!("\n{total} bytes sent");
        }
    }

    uart.close()
}

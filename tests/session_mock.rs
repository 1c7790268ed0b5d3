//! End-to-end session tests against the simulated FT260.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use ft260::mock::{MockDriver, MockOp, MockSlave};
use ft260::{
    CancelToken, Error, FlowControl, GpioAFunction, I2cConfig, I2cFlag, InitStep, Library,
    Status, TransferKind, TransferRecord, UartPayload, UartSettings, FT260_PID, FT260_VID,
};

fn recording_logger() -> (Arc<Mutex<Vec<TransferRecord>>>, impl FnMut(&TransferRecord) + Send) {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    (records, move |r: &TransferRecord| sink.lock().unwrap().push(r.clone()))
}

#[test]
fn i2c_write_reports_and_logs() {
    let mock = MockDriver::ft260();
    mock.add_slave(0x50, MockSlave::default());
    let lib = Library::new(mock.clone());
    let (records, logger) = recording_logger();
    let mut i2c = lib
        .open_i2c(0x0403, 0x6030, I2cConfig::new(100))
        .unwrap()
        .with_logger(logger);

    let result = i2c.write(0x50, I2cFlag::StartAndStop, &[0x00, 0x01]);
    assert_eq!(result.status, Status::Ok);
    assert_eq!(result.transferred, 2);
    assert_eq!(result.payload, vec![0x00, 0x01]);
    assert_eq!(result.device_status.raw(), 0);

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, TransferKind::Write);
    assert_eq!(records[0].address_hex(), "0x50");
    assert_eq!(records[0].hex_dump(), "0x0 0x1 ");
    assert_eq!(records[0].flag_name(), "Start&stop");
    assert_eq!(records[0].device_status.raw(), 0);
}

#[test]
fn i2c_read_reports_and_logs() {
    let mock = MockDriver::ft260();
    mock.add_slave(0x50, MockSlave::with_read_data(&[0xDE, 0xAD, 0xBE, 0xEF]));
    let lib = Library::new(mock);
    let (records, logger) = recording_logger();
    let mut i2c = lib
        .open_i2c(FT260_VID, FT260_PID, I2cConfig::new(100))
        .unwrap()
        .with_logger(logger);

    let result = i2c.read(0x50, I2cFlag::StartAndStop, 4);
    assert_eq!(result.status, Status::Ok);
    assert_eq!(result.transferred, 4);
    assert_eq!(result.payload, vec![0xDE, 0xAD, 0xBE, 0xEF]);
    assert_eq!(result.device_status.raw(), 0);

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind.as_str(), "Read");
    assert_eq!(records[0].hex_dump(), "0xde 0xad 0xbe 0xef ");
}

#[test]
fn device_status_is_reported_and_logged() {
    let mock = MockDriver::ft260();
    mock.add_slave(0x50, MockSlave::default());
    mock.queue_slave_data(0x50, &[0x42]);
    mock.set_bus_status(0x20);
    let (records, logger) = recording_logger();
    let mut i2c = Library::new(mock)
        .open_i2c(FT260_VID, FT260_PID, I2cConfig::default())
        .unwrap()
        .with_logger(logger);

    let write = i2c.write(0x50, I2cFlag::Start, &[0x00]);
    assert!(write.is_ok());
    assert_eq!(write.device_status.raw(), 0x20);
    assert!(write.device_status.controller_idle());

    let read = i2c.read(0x50, I2cFlag::StartAndStop, 1);
    assert!(read.is_ok());
    assert_eq!(read.payload, vec![0x42]);
    assert_eq!(read.device_status.raw(), 0x20);

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].device_status.raw(), 0x20);
    assert_eq!(records[1].device_status.raw(), 0x20);
    assert_eq!(records[1].to_string(), "Read 0x50 [0x42 ] Start&stop status=32");
}

#[test]
fn open_succeeds_once_faults_are_cleared() {
    let mock = MockDriver::ft260();
    mock.fail(MockOp::Open, Status::DeviceOpenFail);
    let lib = Library::new(mock.clone());
    assert!(matches!(
        lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()),
        Err(Error::OpenFailed {
            status: Status::DeviceOpenFail,
            ..
        })
    ));

    mock.clear_faults();
    let i2c = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()).unwrap();
    assert_eq!(i2c.interface(), 0);
}

#[test]
fn short_read_returns_only_received_bytes() {
    let mock = MockDriver::ft260();
    mock.add_slave(0x50, MockSlave::with_read_data(&[0x11, 0x22]));
    let mut i2c = Library::new(mock)
        .open_i2c(FT260_VID, FT260_PID, I2cConfig::default())
        .unwrap();

    let result = i2c.read(0x50, I2cFlag::StartAndStop, 8);
    assert!(result.is_ok());
    assert_eq!(result.transferred, 2);
    assert_eq!(result.payload, vec![0x11, 0x22]);
}

#[test]
fn zero_length_read_is_empty() {
    let mock = MockDriver::ft260();
    mock.add_slave(0x50, MockSlave::with_read_data(&[0x11]));
    let mut i2c = Library::new(mock)
        .open_i2c(FT260_VID, FT260_PID, I2cConfig::default())
        .unwrap();

    let result = i2c.read(0x50, I2cFlag::StartAndStop, 0);
    assert!(result.is_ok());
    assert_eq!(result.transferred, 0);
    assert!(result.payload.is_empty());
}

#[test]
fn missing_device_fails_without_panicking() {
    let lib = Library::new(MockDriver::new());
    for _ in 0..2 {
        match lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()) {
            Err(Error::OpenFailed { interface, status }) => {
                assert_eq!(interface, 0);
                assert_eq!(status, Status::DeviceNotFound);
            }
            other => panic!("expected open failure, got {other:?}"),
        }
    }
    assert!(matches!(
        lib.open_uart(FT260_VID, FT260_PID, UartSettings::default()),
        Err(Error::OpenFailed { interface: 1, .. })
    ));
}

#[test]
fn unreachable_fallback_fails_the_same_way_twice() {
    let mock = MockDriver::ft260();
    mock.fail(MockOp::I2cInit, Status::IoError);
    let lib = Library::new(mock.clone());

    let first = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()).unwrap_err();
    let second = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()).unwrap_err();
    assert!(matches!(first, Error::ReinitFailed { .. }));
    assert_eq!(first.to_string(), second.to_string());

    // One primary attempt and exactly one fallback per open.
    assert_eq!(mock.opens_on(0), 2);
    assert_eq!(mock.opens_on(1), 2);
    assert_eq!(mock.open_handles(), 0);
}

#[test]
fn fallback_reopen_failure_is_reinit_failed() {
    let mock = MockDriver::ft260();
    mock.fail_on_interface(MockOp::I2cInit, 0, Status::IncorrectInterface);
    mock.fail_on_interface(MockOp::Open, 1, Status::DeviceOpenFail);
    let lib = Library::new(mock.clone());

    match lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()) {
        Err(Error::ReinitFailed { initial, fallback }) => {
            assert_eq!(initial, Status::IncorrectInterface);
            assert_eq!(fallback, Status::DeviceOpenFail);
        }
        other => panic!("expected reinit failure, got {other:?}"),
    }
    assert_eq!(mock.open_handles(), 0);
}

#[test]
fn invalid_clock_never_touches_the_driver() {
    let mock = MockDriver::ft260();
    let lib = Library::new(mock.clone());
    assert!(matches!(
        lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::new(10)),
        Err(Error::InvalidArgument(_))
    ));
    assert!(mock.calls().is_empty());
}

#[test]
fn find_device_in_paths_flags_composite_interface() {
    let lib = Library::new(MockDriver::ft260());
    let found = lib.find_device_in_paths(FT260_VID, FT260_PID).unwrap();
    assert_eq!(found.len(), 2);
    assert!(found[0].composite);
    assert!(!found[1].composite);
    assert!(lib.find_device_in_paths(0x0403, 0x6001).unwrap().is_empty());
}

#[test]
fn uart_open_applies_settings_in_order() {
    let mock = MockDriver::ft260();
    let lib = Library::new(mock.clone());
    let uart = lib
        .open_uart(FT260_VID, FT260_PID, UartSettings::default().baud_rate(115_200))
        .unwrap();

    let ops: Vec<MockOp> = mock.calls().iter().map(|c| c.op).collect();
    assert_eq!(
        ops,
        vec![
            MockOp::Open,
            MockOp::UartInit,
            MockOp::GpioFunction,
            MockOp::UartFlowControl,
            MockOp::UartBaudRate,
            MockOp::UartDataCharacteristics,
            MockOp::UartBreakOff,
            MockOp::UartConfig,
        ]
    );
    assert_eq!(mock.gpio_a(), Some(GpioAFunction::TxActive));

    let config = uart.config().unwrap();
    assert_eq!(config.baud_rate, 115_200);
    assert_eq!(config.flow_ctrl, FlowControl::XonXoff.wire_value());
    assert_eq!(config.data_bit, 8);
    assert_eq!(config.stop_bit, 0);
    assert_eq!(config.parity, 0);
    assert_eq!(config.breaking, 0);
}

#[test]
fn uart_config_step_failure_closes_handle() {
    let mock = MockDriver::ft260();
    mock.fail(MockOp::UartBaudRate, Status::InvalidParameter);
    let lib = Library::new(mock.clone());

    match lib.open_uart(FT260_VID, FT260_PID, UartSettings::default()) {
        Err(Error::InitFailed { step, status }) => {
            assert_eq!(step, InitStep::BaudRate);
            assert_eq!(status, Status::InvalidParameter);
        }
        other => panic!("expected init failure, got {other:?}"),
    }
    assert_eq!(mock.open_handles(), 0);
    assert_eq!(mock.count(MockOp::UartDataCharacteristics), 0);
}

#[test]
fn uart_config_readback_failure_is_not_fatal() {
    let mock = MockDriver::ft260();
    mock.fail(MockOp::UartConfig, Status::IoError);
    let uart = Library::new(mock)
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();
    assert!(uart.config().is_none());
}

#[test]
fn uart_write_lines_transmits_each_line() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();

    let input = b"hello\r\nworld\n".as_slice();
    let mut output = Vec::new();
    let total = uart.write_lines(input, &mut output).unwrap();

    assert_eq!(total, 10);
    assert_eq!(mock.uart_tx(), b"helloworld".to_vec());
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "> Write bytes : 5\n> Write bytes : 5\n> "
    );
}

#[test]
fn uart_write_lines_reports_failures_and_continues() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();
    mock.fail_times(MockOp::UartWrite, Status::IoError, 1);

    let mut output = Vec::new();
    let total = uart.write_lines(b"a\nbc\n".as_slice(), &mut output).unwrap();
    assert_eq!(total, 2);
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "> UART Write NG : FT260_IO_ERROR\n> Write bytes : 2\n> "
    );
}

#[test]
fn uart_read_available_caps_chunk() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();

    assert_eq!(uart.read_available().unwrap(), None);

    mock.push_uart_rx(&[b'x'; 80]);
    let first = uart.read_available().unwrap().unwrap();
    assert_eq!(first.len(), 50);
    let second = uart.read_available().unwrap().unwrap();
    assert_eq!(second.len(), 30);
    assert_eq!(uart.read_available().unwrap(), None);
}

#[test]
fn uart_read_loop_separates_binary_and_stops_on_cancel() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();

    let cancel = CancelToken::new();
    let stopper = cancel.clone();
    let feeder = mock.clone();
    let handle = thread::spawn(move || {
        feeder.push_uart_rx(b"ok");
        thread::sleep(Duration::from_millis(50));
        feeder.push_uart_rx(&[0xFF, 0x00, 0xFE]);
        thread::sleep(Duration::from_millis(50));
        stopper.cancel();
    });

    let mut received = Vec::new();
    uart.read_loop(&cancel, |p| received.push(p)).unwrap();
    handle.join().unwrap();

    assert_eq!(
        received,
        vec![
            UartPayload::Text("ok".into()),
            UartPayload::Binary(vec![0xFF, 0x00, 0xFE]),
        ]
    );
}

#[test]
fn uart_text_split_across_chunks_stays_text() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();

    // 49 ASCII bytes then a two-byte character straddling the 50-byte chunk.
    let text = format!("{}\u{e9}", "a".repeat(49));
    mock.push_uart_rx(text.as_bytes());

    let first = uart.read_available().unwrap().unwrap();
    assert_eq!(first, UartPayload::Text("a".repeat(49)));
    let second = uart.read_available().unwrap().unwrap();
    assert_eq!(second, UartPayload::Text("\u{e9}".into()));
    assert_eq!(uart.read_available().unwrap(), None);
}

#[test]
fn uart_truncated_character_followed_by_garbage_is_binary() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();

    mock.push_uart_rx(&[b'o', b'k', 0xC3]);
    assert_eq!(uart.read_available().unwrap(), Some(UartPayload::Text("ok".into())));

    mock.push_uart_rx(b"A");
    assert_eq!(
        uart.read_available().unwrap(),
        Some(UartPayload::Binary(vec![0xC3, b'A']))
    );
}

#[test]
fn uart_read_loop_backs_off_on_failed_reads() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();
    mock.push_uart_rx(b"stuck");
    mock.fail(MockOp::UartRead, Status::IoError);

    let cancel = CancelToken::new();
    let stopper = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(60));
        stopper.cancel();
    });

    let mut received = Vec::new();
    uart.read_loop(&cancel, |p| received.push(p)).unwrap();
    handle.join().unwrap();

    assert!(received.is_empty());
    let reads = mock.count(MockOp::UartRead);
    assert!(reads > 0);
    assert!(reads < 20, "read retried {reads} times in 60 ms");
}

#[test]
fn uart_read_loop_ends_on_queue_failure() {
    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();
    mock.fail(MockOp::UartQueueStatus, Status::IoError);

    let err = uart.read_loop(&CancelToken::new(), |_| {}).unwrap_err();
    assert!(matches!(
        err,
        Error::TransferFailed {
            op: "UART queue status",
            status: Status::IoError,
            ..
        }
    ));
}

#[test]
fn uart_std_io_round_trip() {
    use std::io::{Read, Write};

    let mock = MockDriver::ft260();
    let mut uart = Library::new(mock.clone())
        .open_uart(FT260_VID, FT260_PID, UartSettings::default())
        .unwrap();

    uart.write_all(b"ping").unwrap();
    assert_eq!(mock.uart_tx(), b"ping".to_vec());

    mock.push_uart_rx(b"pong");
    let mut buf = [0u8; 8];
    let n = uart.read(&mut buf).unwrap();
    assert_eq!(&buf[..n], b"pong");
}

#[test]
fn sessions_share_one_library() {
    let mock = MockDriver::ft260();
    let lib = Library::new(mock.clone());
    let i2c = lib.open_i2c(FT260_VID, FT260_PID, I2cConfig::default()).unwrap();
    let uart = lib.open_uart(FT260_VID, FT260_PID, UartSettings::default()).unwrap();
    assert_eq!(mock.open_handles(), 2);

    i2c.close().unwrap();
    uart.close().unwrap();
    assert_eq!(mock.open_handles(), 0);
}

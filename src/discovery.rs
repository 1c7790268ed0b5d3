//! Device discovery and path matching.
//!
//! The vendor driver identifies devices by path strings that embed the
//! vendor and product ID as `vid_XXXX&pid_YYYY`. Interface 0 of a composite
//! device carries an additional `&mi_00`. [`match_paths`] filters any list
//! of such paths; [`Library::find_device_in_paths`](crate::Library::find_device_in_paths)
//! feeds it the driver's own device list, and [`usb_paths`] builds
//! equivalent paths from a plain USB enumeration so presence can be checked
//! without the vendor library.

use log::debug;
use nusb::MaybeFuture;

use crate::constants::COMPOSITE_SUFFIX;
use crate::error::Result;

/// A device path that matched a VID/PID search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePath {
    /// The full path as reported.
    pub path: String,
    /// Whether the path belongs to interface 0 of a composite device.
    pub composite: bool,
}

impl DevicePath {
    /// Interface number from the path's `&mi_NN` marker.
    ///
    /// `None` for a device exposing a single interface.
    pub fn interface(&self) -> Option<u8> {
        let lower = self.path.to_ascii_lowercase();
        let start = lower.find("&mi_")? + 4;
        let digits = lower.get(start..start + 2)?;
        u8::from_str_radix(digits, 16).ok()
    }
}

/// The `vid_XXXX&pid_YYYY` search pattern for a VID/PID pair.
pub fn path_pattern(vid: u16, pid: u16) -> String {
    format!("vid_{vid:04x}&pid_{pid:04x}")
}

/// Keep the paths that contain the pattern for `vid`/`pid`.
///
/// Matching ignores ASCII case. Paths are returned in their original form.
///
/// # Example
///
/// ```
/// use ft260::discovery::match_paths;
///
/// let paths = vec![
///     r"\\?\hid#vid_0403&pid_6030&mi_00#7&1c2c0b3&0&0000".to_string(),
///     r"\\?\hid#vid_046d&pid_c52b&mi_01#8&2a3b4c5&0&0000".to_string(),
/// ];
/// let found = match_paths(paths, 0x0403, 0x6030);
/// assert_eq!(found.len(), 1);
/// assert!(found[0].composite);
/// ```
pub fn match_paths<I>(paths: I, vid: u16, pid: u16) -> Vec<DevicePath>
where
    I: IntoIterator<Item = String>,
{
    let pattern = path_pattern(vid, pid);
    let composite_pattern = format!("{pattern}{COMPOSITE_SUFFIX}");
    debug!("searching for {pattern} in paths");

    paths
        .into_iter()
        .filter_map(|path| {
            let lower = path.to_ascii_lowercase();
            if !lower.contains(&pattern) {
                return None;
            }
            let composite = lower.contains(&composite_pattern);
            if composite {
                debug!("composite FT260 device found on path {path}");
            } else {
                debug!("non-composite FT260 device found on path {path}");
            }
            Some(DevicePath { path, composite })
        })
        .collect()
}

/// Build a driver-style path for one USB interface.
///
/// `&mi_NN` is only added for devices exposing more than one interface,
/// the way the OS names composite HID devices.
fn synth_path(bus: &str, address: u8, vid: u16, pid: u16, interface: Option<u8>) -> String {
    let mut path = format!("{bus}-{address}#{}", path_pattern(vid, pid));
    if let Some(num) = interface {
        path.push_str(&format!("&mi_{num:02x}"));
    }
    path
}

/// Enumerate connected USB devices matching `vid`/`pid` and return one
/// synthesised path per interface.
///
/// The result can be passed through [`match_paths`] like a driver list.
///
/// # Example
///
/// ```no_run
/// use ft260::{discovery, FT260_PID, FT260_VID};
///
/// let paths = discovery::usb_paths(FT260_VID, FT260_PID)?;
/// for dev in discovery::match_paths(paths, FT260_VID, FT260_PID) {
///     println!("{} composite={}", dev.path, dev.composite);
/// }
/// # Ok::<(), ft260::Error>(())
/// ```
pub fn usb_paths(vid: u16, pid: u16) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for dev in nusb::list_devices()
        .wait()?
        .filter(|d| d.vendor_id() == vid && d.product_id() == pid)
    {
        let interfaces: Vec<u8> = dev.interfaces().map(|i| i.interface_number()).collect();
        if interfaces.len() > 1 {
            for num in interfaces {
                paths.push(synth_path(dev.bus_id(), dev.device_address(), vid, pid, Some(num)));
            }
        } else {
            paths.push(synth_path(dev.bus_id(), dev.device_address(), vid, pid, None));
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_is_lowercase_padded_hex() {
        assert_eq!(path_pattern(0x0403, 0x6030), "vid_0403&pid_6030");
        assert_eq!(path_pattern(0xABCD, 0x1), "vid_abcd&pid_0001");
    }

    #[test]
    fn matches_composite_and_plain_paths() {
        let paths = vec![
            r"\\?\hid#vid_0403&pid_6030&mi_00#7&1c2c0b3&0&0000".to_string(),
            r"\\?\hid#vid_0403&pid_6030&mi_01#7&1c2c0b3&0&0001".to_string(),
            r"\\?\hid#vid_0403&pid_6030#6&2bd3&0&0000".to_string(),
            r"\\?\hid#vid_0403&pid_6001#1&aaa&0&0000".to_string(),
        ];
        let found = match_paths(paths, 0x0403, 0x6030);
        assert_eq!(found.len(), 3);
        assert!(found[0].composite);
        assert!(!found[1].composite);
        assert!(!found[2].composite);
    }

    #[test]
    fn matching_ignores_case() {
        let paths = vec![r"\\?\HID#VID_0403&PID_6030&MI_00#7&1C2C".to_string()];
        let found = match_paths(paths, 0x0403, 0x6030);
        assert_eq!(found.len(), 1);
        assert!(found[0].composite);
        assert_eq!(found[0].path, r"\\?\HID#VID_0403&PID_6030&MI_00#7&1C2C");
    }

    #[test]
    fn no_match_is_empty() {
        let paths = vec!["usb#vid_1234&pid_5678".to_string()];
        assert!(match_paths(paths, 0x0403, 0x6030).is_empty());
        assert!(match_paths(Vec::new(), 0x0403, 0x6030).is_empty());
    }

    #[test]
    fn synthesised_paths_feed_the_matcher() {
        let paths = vec![
            synth_path("1", 7, 0x0403, 0x6030, Some(0)),
            synth_path("1", 7, 0x0403, 0x6030, Some(1)),
            synth_path("2", 3, 0x0403, 0x6030, None),
        ];
        assert_eq!(paths[0], "1-7#vid_0403&pid_6030&mi_00");
        assert_eq!(paths[2], "2-3#vid_0403&pid_6030");

        let found = match_paths(paths, 0x0403, 0x6030);
        assert_eq!(
            found.iter().map(|d| d.composite).collect::<Vec<_>>(),
            vec![true, false, false]
        );
        assert_eq!(
            found.iter().map(DevicePath::interface).collect::<Vec<_>>(),
            vec![Some(0), Some(1), None]
        );
    }

    #[test]
    fn interface_is_read_from_driver_paths() {
        let dev = DevicePath {
            path: r"\\?\HID#VID_0403&PID_6030&MI_01#7&1C2C".to_string(),
            composite: false,
        };
        assert_eq!(dev.interface(), Some(1));
    }
}

//! Endpoint discovery: serial port selection and network host validation
//!
//! Serial ports are enumerated through `serialport`. Selection is pure and
//! works on [`PortInfo`] lists so it can be exercised without hardware.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serialport::{SerialPortInfo, SerialPortType};

use ledlink_core::prelude::*;

/// Description keywords that suggest a USB-serial bridge on a controller board
const USB_SERIAL_KEYWORDS: &[&str] = &["usb", "cp210", "ch340", "silicon", "esp"];

/// Dial-in device prefix (macOS); carries call-waiting semantics
const DIAL_IN_PREFIX: &str = "/dev/tty.";

/// Call-out device prefix (macOS); preferred for exclusive outbound control
const CALL_OUT_PREFIX: &str = "/dev/cu.";

/// A serial port visible to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// OS device path (e.g. `/dev/ttyUSB0`, `/dev/cu.usbserial-10`, `COM5`)
    pub device: String,

    /// Human-readable description (USB product/manufacturer when known)
    #[serde(default)]
    pub description: String,

    /// Hardware identifier (`USB VID:PID=...` for USB devices)
    #[serde(default)]
    pub hwid: String,
}

impl PortInfo {
    pub fn new(device: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            description: description.into(),
            hwid: String::new(),
        }
    }

    /// Whether the description names a known USB-serial bridge
    pub fn looks_like_usb_serial(&self) -> bool {
        let desc = self.description.to_lowercase();
        USB_SERIAL_KEYWORDS.iter().any(|k| desc.contains(k))
    }

    fn is_call_out(&self) -> bool {
        self.device.starts_with(CALL_OUT_PREFIX)
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (description, hwid) = match &info.port_type {
            SerialPortType::UsbPort(usb) => {
                let description = [usb.manufacturer.as_deref(), usb.product.as_deref()]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                let mut hwid = format!("USB VID:PID={:04X}:{:04X}", usb.vid, usb.pid);
                if let Some(serial) = &usb.serial_number {
                    hwid.push_str(&format!(" SER={}", serial));
                }
                let description = if description.is_empty() {
                    "USB Serial".to_string()
                } else {
                    description
                };
                (description, hwid)
            }
            SerialPortType::BluetoothPort => ("Bluetooth".to_string(), String::new()),
            SerialPortType::PciPort => ("PCI".to_string(), String::new()),
            SerialPortType::Unknown => (String::new(), String::new()),
        };

        Self {
            device: info.port_name,
            description,
            hwid,
        }
    }
}

// ─────────────────────────────────────────────────────────
// Enumeration
// ─────────────────────────────────────────────────────────

/// Enumerate serial ports attached to this host
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()
        .map_err(|e| Error::transport(format!("Failed to enumerate serial ports: {}", e)))?;
    debug!("Enumerated {} serial ports", ports.len());
    Ok(ports.into_iter().map(PortInfo::from).collect())
}

/// Ports for display: normalized, de-duplicated, call-out names first, then by path
pub fn list_ports() -> Result<Vec<PortInfo>> {
    Ok(display_ports(&available_ports()?))
}

/// Normalize and de-duplicate a port list for display
pub fn display_ports(ports: &[PortInfo]) -> Vec<PortInfo> {
    let devices: Vec<&str> = ports.iter().map(|p| p.device.as_str()).collect();
    let mut seen = HashSet::new();
    let mut out: Vec<PortInfo> = ports
        .iter()
        .filter_map(|p| {
            let device = normalize_port(&p.device, &devices);
            seen.insert(device.clone()).then(|| PortInfo {
                device,
                ..p.clone()
            })
        })
        .collect();

    out.sort_by(|a, b| {
        (!a.is_call_out(), &a.device).cmp(&(!b.is_call_out(), &b.device))
    });
    out
}

// ─────────────────────────────────────────────────────────
// Selection
// ─────────────────────────────────────────────────────────

/// Prefer the call-out form of a dial-in device path when both exist.
///
/// Applied even when the dial-in name was requested explicitly.
pub fn normalize_port(device: &str, available: &[&str]) -> String {
    if let Some(name) = device.strip_prefix(DIAL_IN_PREFIX) {
        let call_out = format!("{}{}", CALL_OUT_PREFIX, name);
        if available.iter().any(|d| *d == call_out) {
            return call_out;
        }
    }
    device.to_string()
}

/// Pick the serial port to open.
///
/// With `preferred`, the (normalized) name must match an enumerated device,
/// ignoring case. Without it, the first call-out entry whose description looks
/// like a USB-serial bridge wins, else the first port.
pub fn pick_port(ports: &[PortInfo], preferred: Option<&str>) -> Result<String> {
    if ports.is_empty() {
        return Err(Error::endpoint_not_found(
            "No serial ports found. Plug in the device.",
        ));
    }

    let devices: Vec<&str> = ports.iter().map(|p| p.device.as_str()).collect();

    if let Some(preferred) = preferred.map(str::trim).filter(|p| !p.is_empty()) {
        let wanted = normalize_port(preferred, &devices);
        if wanted != preferred {
            info!("Using call-out port {} instead of {}", wanted, preferred);
        }
        return ports
            .iter()
            .find(|p| p.device.eq_ignore_ascii_case(&wanted))
            .map(|p| p.device.clone())
            .ok_or_else(|| {
                Error::endpoint_not_found(format!(
                    "Requested port {} not found. Available: {}",
                    wanted,
                    devices.join(", ")
                ))
            });
    }

    let mut ordered: Vec<&PortInfo> = ports.iter().collect();
    // Stable sort keeps enumeration order within each group
    ordered.sort_by_key(|p| !p.is_call_out());

    let chosen = ordered
        .iter()
        .find(|p| p.looks_like_usb_serial())
        .or_else(|| ordered.first())
        .map(|p| p.device.as_str())
        .unwrap_or_default();

    Ok(normalize_port(chosen, &devices))
}

/// Enumerate and pick in one step
pub fn resolve_serial_port(preferred: Option<&str>) -> Result<String> {
    let ports = available_ports()?;
    let chosen = pick_port(&ports, preferred)?;
    info!("Resolved serial port: {}", chosen);
    Ok(chosen)
}

/// Validate a network host; no discovery is attempted
pub fn resolve_host(host: Option<&str>) -> Result<String> {
    match host.map(str::trim) {
        Some(h) if !h.is_empty() => Ok(h.to_string()),
        _ => Err(Error::endpoint_not_found("No Wi-Fi host provided.")),
    }
}

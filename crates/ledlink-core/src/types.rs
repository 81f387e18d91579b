//! Domain types shared by the link layer and its callers

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─────────────────────────────────────────────────────────────────
// Colors
// ─────────────────────────────────────────────────────────────────

/// A single pixel color as the firmware sees it (no channel reordering)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

// ─────────────────────────────────────────────────────────────────
// Device Info
// ─────────────────────────────────────────────────────────────────

/// Result of an `INFO` exchange.
///
/// Parsing is best-effort: every field is optional, and `raw` keeps the
/// response line even when nothing else could be extracted from it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub num_leds: Option<usize>,
    pub brightness: Option<u8>,
    pub raw: Option<String>,
}

impl DeviceInfo {
    /// Info carrying only the raw response text
    pub fn raw_only(raw: impl Into<String>) -> Self {
        Self {
            num_leds: None,
            brightness: None,
            raw: Some(raw.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Transport Kind
// ─────────────────────────────────────────────────────────────────

/// Physical medium used to reach the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent USB serial session
    #[default]
    Serial,
    /// Stateless HTTP request per command
    Wifi,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Serial => "serial",
            TransportKind::Wifi => "wifi",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "serial" | "usb" => Ok(TransportKind::Serial),
            "wifi" | "http" | "network" => Ok(TransportKind::Wifi),
            other => Err(Error::invalid_argument(format!(
                "unknown transport '{}' (expected serial or wifi)",
                other
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Timeout Diagnostics
// ─────────────────────────────────────────────────────────────────

/// What the wire showed before a command deadline expired.
///
/// Only used to make timeout errors actionable; none of it is protocol state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeoutDiagnostics {
    /// Last complete line read while waiting
    pub last_line: Option<String>,
    /// Last line that was neither `OK` nor `ERR` on this connection
    pub last_non_terminal: Option<String>,
    /// Bytes still unread (or without a line terminator) at the deadline
    pub raw_tail: Vec<u8>,
}

impl TimeoutDiagnostics {
    pub fn is_empty(&self) -> bool {
        self.last_line.is_none() && self.last_non_terminal.is_none() && self.raw_tail.is_empty()
    }
}

impl fmt::Display for TimeoutDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }

        let mut detail = Vec::new();
        if let Some(line) = &self.last_line {
            detail.push(format!("last_line={:?}", line));
        }
        if let Some(line) = &self.last_non_terminal {
            detail.push(format!("last_non_ok={:?}", line));
        }
        if !self.raw_tail.is_empty() {
            detail.push(format!(
                "raw_tail={:?}",
                String::from_utf8_lossy(&self.raw_tail)
            ));
        }
        write!(f, " ({})", detail.join(", "))
    }
}

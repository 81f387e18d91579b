//! ASCII line protocol spoken by the LED controller firmware
//!
//! Requests are a verb plus space-separated decimal arguments. Responses are
//! a single line starting with `OK` (optionally followed by data) or `ERR`
//! (optionally followed by a reason). Anything else on the wire, such as the
//! boot banner, is unsolicited noise.

use std::fmt::Write as _;

use ledlink_core::prelude::*;
use ledlink_core::{DeviceInfo, Rgb};

/// Line terminator appended to every command sent over a stream transport
pub const LINE_TERMINATOR: &str = "\r\n";

/// Banner the firmware prints once it has finished booting
pub const READY_BANNER: &str = "READY";

/// Hex digits per LED in a `FRAME` payload
pub const HEX_DIGITS_PER_LED: usize = 6;

// ─────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────

/// Commands understood by the firmware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Liveness check
    Ping,
    /// Query LED count and brightness
    Info,
    /// Set global brightness (0-255)
    Brightness(u8),
    /// Turn every LED off
    Clear,
    /// Set every LED to one color
    Fill(Rgb),
    /// Set one LED and show immediately
    Set { index: usize, color: Rgb },
    /// Set one LED in the back-buffer only
    SetBuffered { index: usize, color: Rgb },
    /// Flush the back-buffer
    Show,
    /// Replace the whole strip in one command
    Frame(Vec<Rgb>),
}

impl DeviceCommand {
    /// Build the command text (verb and arguments, no terminator)
    pub fn text(&self) -> String {
        match self {
            DeviceCommand::Ping => "PING".to_string(),
            DeviceCommand::Info => "INFO".to_string(),
            DeviceCommand::Brightness(value) => format!("BRIGHT {}", value),
            DeviceCommand::Clear => "CLEAR".to_string(),
            DeviceCommand::Fill(c) => format!("FILL {} {} {}", c.r, c.g, c.b),
            DeviceCommand::Set { index, color: c } => {
                format!("SET {} {} {} {}", index, c.r, c.g, c.b)
            }
            DeviceCommand::SetBuffered { index, color: c } => {
                format!("SETN {} {} {} {}", index, c.r, c.g, c.b)
            }
            DeviceCommand::Show => "SHOW".to_string(),
            DeviceCommand::Frame(colors) => format!("FRAME {}", encode_frame_hex(colors)),
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            DeviceCommand::Ping => "ping",
            DeviceCommand::Info => "info",
            DeviceCommand::Brightness(_) => "brightness",
            DeviceCommand::Clear => "clear",
            DeviceCommand::Fill(_) => "fill",
            DeviceCommand::Set { .. } => "set pixel",
            DeviceCommand::SetBuffered { .. } => "set buffered pixel",
            DeviceCommand::Show => "show",
            DeviceCommand::Frame(_) => "bulk frame",
        }
    }
}

/// Terminate a command for a line-oriented stream
pub fn encode_line(command: &str) -> String {
    format!("{}{}", command.trim(), LINE_TERMINATOR)
}

// ─────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────

/// A classified response line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Success, with any trailing data
    Ok(String),
    /// Refusal, with the firmware's reason
    Err(String),
    /// Not a response at all (boot banner, debug print, garbage)
    Unsolicited(String),
}

impl Response {
    /// Whether this line ends a request/response exchange
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Response::Unsolicited(_))
    }
}

/// Classify a response line
pub fn decode(line: &str) -> Response {
    let trimmed = line.trim();
    if let Some(rest) = trimmed.strip_prefix("OK") {
        Response::Ok(rest.trim().to_string())
    } else if let Some(rest) = trimmed.strip_prefix("ERR") {
        Response::Err(rest.trim().to_string())
    } else {
        Response::Unsolicited(trimmed.to_string())
    }
}

/// Whether a line is `OK`/`ERR` and therefore ends an exchange
pub fn is_terminal_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("OK") || trimmed.starts_with("ERR")
}

/// Interpret a command acknowledgement.
///
/// `OK` yields its trailing data, `ERR` becomes [`Error::DeviceRejected`].
/// An ack must be one or the other, so anything else is a transport fault.
pub fn expect_ok(command: &str, line: &str) -> Result<String> {
    match decode(line) {
        Response::Ok(rest) => Ok(rest),
        Response::Err(reason) => Err(Error::rejected(command, reason)),
        Response::Unsolicited(text) => Err(Error::transport(format!(
            "expected OK/ERR for {:?}, got {:?}",
            command, text
        ))),
    }
}

// ─────────────────────────────────────────────────────────
// INFO payload
// ─────────────────────────────────────────────────────────

/// Parse an `INFO` response such as `OK NUM_LEDS 35 BRIGHT 20`.
///
/// Fields are recognized anywhere in the line. If any recognized field has a
/// malformed value, the result carries only the raw line.
pub fn parse_info(line: &str) -> DeviceInfo {
    let raw = line.trim();
    if !matches!(decode(raw), Response::Ok(_)) {
        return DeviceInfo::raw_only(raw);
    }

    let tokens: Vec<&str> = raw.split_whitespace().collect();
    let mut info = DeviceInfo::raw_only(raw);

    for (i, token) in tokens.iter().enumerate() {
        let Some(value) = tokens.get(i + 1) else {
            break;
        };
        match *token {
            "NUM_LEDS" => match value.parse::<usize>() {
                Ok(n) => info.num_leds = Some(n),
                Err(_) => return DeviceInfo::raw_only(raw),
            },
            "BRIGHT" => match value.parse::<u8>() {
                Ok(b) => info.brightness = Some(b),
                Err(_) => return DeviceInfo::raw_only(raw),
            },
            _ => {}
        }
    }

    info
}

// ─────────────────────────────────────────────────────────
// FRAME payload
// ─────────────────────────────────────────────────────────

/// Encode colors as the `FRAME` payload: `RRGGBB` per LED, uppercase, no separators
pub fn encode_frame_hex(colors: &[Rgb]) -> String {
    let mut hex = String::with_capacity(colors.len() * HEX_DIGITS_PER_LED);
    for c in colors {
        // Writing into a String cannot fail
        let _ = write!(hex, "{:02X}{:02X}{:02X}", c.r, c.g, c.b);
    }
    hex
}

/// Decode a `FRAME` payload back into colors (either hex case accepted)
pub fn decode_frame_hex(hex: &str) -> Result<Vec<Rgb>> {
    let hex = hex.trim();
    if hex.len() % HEX_DIGITS_PER_LED != 0 {
        return Err(Error::invalid_argument(format!(
            "frame hex length {} is not a multiple of {}",
            hex.len(),
            HEX_DIGITS_PER_LED
        )));
    }
    if !hex.is_ascii() {
        return Err(Error::invalid_argument("frame hex must be ASCII"));
    }

    let channel = |s: &str| {
        u8::from_str_radix(s, 16)
            .map_err(|_| Error::invalid_argument(format!("invalid hex byte {:?} in frame", s)))
    };

    (0..hex.len())
        .step_by(HEX_DIGITS_PER_LED)
        .map(|at| {
            Ok(Rgb::new(
                channel(&hex[at..at + 2])?,
                channel(&hex[at + 2..at + 4])?,
                channel(&hex[at + 4..at + 6])?,
            ))
        })
        .collect()
}

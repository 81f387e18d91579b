//! Tunables for the link layer
//!
//! Defaults match the stock controller firmware (115200 baud, ~2 s boot after
//! the USB bridge resets the board, a few seconds per command).

use std::time::Duration;

/// Serial session tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub baud_rate: u32,
    /// Per-read timeout; bounds how long a single read blocks
    pub read_timeout: Duration,
    /// Pause after deasserting DTR/RTS
    pub line_settle: Duration,
    /// Pause for the reset that opening the port triggers
    pub boot_delay: Duration,
    /// Upper bound on waiting for the `READY` banner
    pub ready_timeout: Duration,
    /// Deadline for an `OK`/`ERR` line after each command
    pub command_timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(300),
            line_settle: Duration::from_millis(100),
            boot_delay: Duration::from_millis(2500),
            ready_timeout: Duration::from_millis(2000),
            command_timeout: Duration::from_secs(6),
        }
    }
}

/// HTTP transport tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSettings {
    /// Per-attempt request timeout
    pub request_timeout: Duration,
    /// Extra attempts after a network-level failure
    pub retries: u32,
    /// Fixed delay between attempts
    pub retry_delay: Duration,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(3500),
            retries: 1,
            retry_delay: Duration::from_millis(50),
        }
    }
}

/// Changed-pixel count at which one `FRAME` beats per-pixel `SETN`s plus `SHOW`
pub const DEFAULT_BULK_FRAME_THRESHOLD: usize = 16;

/// Everything the link controller needs to open and drive a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub serial: SerialSettings,
    pub network: NetworkSettings,
    pub bulk_frame_threshold: usize,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            serial: SerialSettings::default(),
            network: NetworkSettings::default(),
            bulk_frame_threshold: DEFAULT_BULK_FRAME_THRESHOLD,
        }
    }
}

impl LinkSettings {
    /// Deadline handed to `Transport::send` for the given medium
    pub fn command_timeout(&self, kind: ledlink_core::TransportKind) -> Duration {
        match kind {
            ledlink_core::TransportKind::Serial => self.serial.command_timeout,
            ledlink_core::TransportKind::Wifi => self.network.request_timeout,
        }
    }
}

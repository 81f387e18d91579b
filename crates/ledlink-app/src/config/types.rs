//! Configuration types for ledlink
//!
//! Defines `Settings` (`.ledlink/config.toml`) and its sections. Durations are
//! stored as milliseconds so the file stays plain TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use ledlink_core::TransportKind;
use ledlink_device::{LinkSettings, NetworkSettings, SerialSettings, DEFAULT_BULK_FRAME_THRESHOLD};

use crate::color::ColorOrder;

/// Application settings (.ledlink/config.toml)
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub output: OutputSettings,
}

impl Settings {
    /// Tunables for the link layer
    pub fn link_settings(&self) -> LinkSettings {
        LinkSettings {
            serial: SerialSettings {
                baud_rate: self.serial.baud_rate,
                read_timeout: Duration::from_millis(self.serial.read_timeout_ms),
                line_settle: Duration::from_millis(self.serial.line_settle_ms),
                boot_delay: Duration::from_millis(self.serial.boot_delay_ms),
                ready_timeout: Duration::from_millis(self.serial.ready_timeout_ms),
                command_timeout: Duration::from_millis(self.serial.command_timeout_ms),
            },
            network: NetworkSettings {
                request_timeout: Duration::from_millis(self.network.request_timeout_ms),
                retries: self.network.retries,
                retry_delay: Duration::from_millis(self.network.retry_delay_ms),
            },
            bulk_frame_threshold: self.link.bulk_frame_threshold,
        }
    }

    /// Endpoint configured for `kind`, if any
    pub fn endpoint(&self, kind: TransportKind) -> Option<&str> {
        match kind {
            TransportKind::Serial => self.serial.port.as_deref(),
            TransportKind::Wifi => self.network.host.as_deref(),
        }
    }
}

/// Serial transport settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SerialConfig {
    /// Device path; auto-detected when unset
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_line_settle_ms")]
    pub line_settle_ms: u64,

    /// Wait for the reset triggered by opening the port
    #[serde(default = "default_boot_delay_ms")]
    pub boot_delay_ms: u64,

    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            line_settle_ms: default_line_settle_ms(),
            boot_delay_ms: default_boot_delay_ms(),
            ready_timeout_ms: default_ready_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    300
}

fn default_line_settle_ms() -> u64 {
    100
}

fn default_boot_delay_ms() -> u64 {
    2500
}

fn default_ready_timeout_ms() -> u64 {
    2000
}

fn default_command_timeout_ms() -> u64 {
    6000
}

/// Wi-Fi (HTTP) transport settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Controller address on the LAN
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_retries")]
    pub retries: u32,

    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: None,
            request_timeout_ms: default_request_timeout_ms(),
            retries: default_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    3500
}

fn default_retries() -> u32 {
    1
}

fn default_retry_delay_ms() -> u64 {
    50
}

/// Link behavior settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LinkConfig {
    /// Medium used when none is given on the command line
    #[serde(default)]
    pub transport: TransportKind,

    /// Changed-pixel count at which a single FRAME is sent
    #[serde(default = "default_bulk_frame_threshold")]
    pub bulk_frame_threshold: usize,

    #[serde(default)]
    pub color_order: ColorOrder,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            bulk_frame_threshold: default_bulk_frame_threshold(),
            color_order: ColorOrder::default(),
        }
    }
}

fn default_bulk_frame_threshold() -> usize {
    DEFAULT_BULK_FRAME_THRESHOLD
}

/// Output settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OutputSettings {
    /// Print results as JSON instead of text
    #[serde(default)]
    pub json: bool,
}

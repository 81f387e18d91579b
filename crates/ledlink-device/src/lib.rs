//! # ledlink-device - Controller Link Layer
//!
//! Talks to an LED strip controller over USB serial or Wi-Fi (HTTP), turning
//! intents such as "show this frame" into exchanges of the firmware's ASCII
//! line protocol.
//!
//! ## Public API
//!
//! ### Link Controller (`link`)
//! - [`LinkController`] - Owns the connection; serializes every command
//! - [`ConnectOutcome`], [`LinkStatus`] - Results reported to callers
//!
//! ### Transports (`transport`)
//! - [`Transport`] - Send one command line, get one response line
//! - [`Connector`] - Opens a transport for a [`ledlink_core::TransportKind`]
//! - [`DeviceConnector`] - Real serial ports and Wi-Fi hosts
//!
//! ### Protocol (`protocol`)
//! - [`DeviceCommand`] - Commands the firmware understands
//! - [`decode`], [`parse_info`], [`encode_frame_hex`], [`decode_frame_hex`]
//!
//! ### Discovery (`ports`)
//! - [`list_ports`], [`pick_port`], [`PortInfo`]

pub mod link;
pub mod ports;
pub mod protocol;
pub mod settings;
pub mod shadow;
pub mod transport;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use link::{ConnectOutcome, LinkController, LinkStatus};
pub use ports::{list_ports, pick_port, resolve_host, resolve_serial_port, PortInfo};
pub use protocol::{
    decode, decode_frame_hex, encode_frame_hex, expect_ok, parse_info, DeviceCommand, Response,
};
pub use settings::{LinkSettings, NetworkSettings, SerialSettings, DEFAULT_BULK_FRAME_THRESHOLD};
pub use shadow::ShadowFrame;
pub use transport::{
    Connector, DeviceConnector, DeviceTransport, HttpTransport, SerialTransport, Transport,
};

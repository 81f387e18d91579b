//! Transports carrying the line protocol to the controller
//!
//! Two media share one capability set:
//! - [`SerialTransport`] - a persistent USB serial session
//! - [`HttpTransport`] - one HTTP request per command, no session
//!
//! The link controller only sees [`Transport`]; [`DeviceConnector`] builds the
//! right one for a [`TransportKind`].

pub mod http;
pub mod serial;

use std::future::Future;
use std::time::Duration;

use ledlink_core::prelude::*;
use ledlink_core::TransportKind;

use crate::ports::{resolve_host, resolve_serial_port};
use crate::settings::LinkSettings;

pub use http::HttpTransport;
pub use serial::SerialTransport;

/// An open link to the controller
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Send one command and return the response line
    ///
    /// The returned line is the raw response; callers classify it with
    /// [`crate::protocol::decode`].
    async fn send(&mut self, command: &str, timeout: Duration) -> Result<String>;

    /// Release the underlying handle. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;

    /// Endpoint this transport talks to (device path or host)
    fn identity(&self) -> &str;

    /// Medium of this transport
    fn kind(&self) -> TransportKind;
}

/// Opens transports for the link controller
pub trait Connector: Send + Sync {
    type Transport: Transport + Send;

    /// Resolve `endpoint` for `kind` and open a transport to it.
    ///
    /// For serial this includes the boot-settle delays and the best-effort
    /// `READY` handshake.
    fn open(
        &self,
        kind: TransportKind,
        endpoint: Option<&str>,
    ) -> impl Future<Output = Result<Self::Transport>> + Send;
}

// ─────────────────────────────────────────────────────────
// Production transports
// ─────────────────────────────────────────────────────────

/// Either of the real transports
#[derive(Debug)]
pub enum DeviceTransport {
    Serial(SerialTransport),
    Http(HttpTransport),
}

impl Transport for DeviceTransport {
    async fn send(&mut self, command: &str, timeout: Duration) -> Result<String> {
        match self {
            DeviceTransport::Serial(t) => Transport::send(t, command, timeout).await,
            DeviceTransport::Http(t) => Transport::send(t, command, timeout).await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            DeviceTransport::Serial(t) => Transport::close(t).await,
            DeviceTransport::Http(t) => Transport::close(t).await,
        }
    }

    fn identity(&self) -> &str {
        match self {
            DeviceTransport::Serial(t) => Transport::identity(t),
            DeviceTransport::Http(t) => Transport::identity(t),
        }
    }

    fn kind(&self) -> TransportKind {
        match self {
            DeviceTransport::Serial(t) => Transport::kind(t),
            DeviceTransport::Http(t) => Transport::kind(t),
        }
    }
}

/// Connector for real hardware: serial ports and Wi-Fi hosts
#[derive(Debug, Clone, Default)]
pub struct DeviceConnector {
    settings: LinkSettings,
}

impl DeviceConnector {
    pub fn new(settings: LinkSettings) -> Self {
        Self { settings }
    }
}

impl Connector for DeviceConnector {
    type Transport = DeviceTransport;

    async fn open(&self, kind: TransportKind, endpoint: Option<&str>) -> Result<DeviceTransport> {
        match kind {
            TransportKind::Serial => {
                let preferred = endpoint.map(str::to_string);
                let path = tokio::task::spawn_blocking(move || {
                    resolve_serial_port(preferred.as_deref())
                })
                .await
                .map_err(|e| Error::transport(format!("Port enumeration task failed: {}", e)))??;

                let transport = SerialTransport::open(&path, &self.settings.serial).await?;
                Ok(DeviceTransport::Serial(transport))
            }
            TransportKind::Wifi => {
                let host = resolve_host(endpoint)?;
                let transport = HttpTransport::new(host, &self.settings.network)?;
                Ok(DeviceTransport::Http(transport))
            }
        }
    }
}

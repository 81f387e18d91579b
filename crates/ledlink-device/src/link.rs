//! Link controller: the one owner of the connection to the controller
//!
//! Every operation takes the state lock for its whole duration, so commands
//! from concurrent callers reach the wire strictly one after another. Frame
//! updates are diffed against a [`ShadowFrame`] and sent either as one bulk
//! `FRAME` or as `SETN`s followed by `SHOW`.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use ledlink_core::prelude::*;
use ledlink_core::{DeviceInfo, Rgb, TransportKind};

use crate::protocol::{decode, expect_ok, parse_info, DeviceCommand, Response};
use crate::settings::LinkSettings;
use crate::shadow::ShadowFrame;
use crate::transport::{Connector, DeviceConnector, Transport};

/// Result of a successful [`LinkController::connect`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectOutcome {
    pub transport: TransportKind,
    /// Resolved device path or host
    pub endpoint: String,
    /// `INFO` queried right after connecting, if it succeeded
    pub info: Option<DeviceInfo>,
    /// Why `info` is missing
    pub warning: Option<String>,
}

/// Snapshot reported by [`LinkController::status`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatus {
    pub connected: bool,
    pub transport: Option<TransportKind>,
    pub endpoint: Option<String>,
    pub info: Option<DeviceInfo>,
}

/// Everything owned by one connection
#[derive(Debug)]
struct LinkState<T> {
    transport: Option<T>,
    shadow: ShadowFrame,
    supports_bulk_frame: bool,
    last_info: Option<DeviceInfo>,
}

impl<T> Default for LinkState<T> {
    fn default() -> Self {
        Self {
            transport: None,
            shadow: ShadowFrame::new(),
            supports_bulk_frame: true,
            last_info: None,
        }
    }
}

impl<T: Transport> LinkState<T> {
    fn transport(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(Error::NotConnected)
    }

    fn known_led_count(&self) -> Option<usize> {
        self.last_info.as_ref().and_then(|info| info.num_leds)
    }

    /// Close and forget the transport, along with everything learned through it
    async fn shut_down(&mut self) -> Result<()> {
        let closed = match self.transport.take() {
            Some(mut transport) => {
                info!("Closing {} link to {}", transport.kind(), transport.identity());
                transport.close().await
            }
            None => Ok(()),
        };
        *self = Self::default();
        closed
    }
}

/// Owns the active transport and turns intents into protocol exchanges
pub struct LinkController<C: Connector = DeviceConnector> {
    connector: C,
    settings: LinkSettings,
    state: Mutex<LinkState<C::Transport>>,
}

impl LinkController<DeviceConnector> {
    /// Controller for real serial ports and Wi-Fi hosts
    pub fn for_hardware(settings: LinkSettings) -> Self {
        Self::new(DeviceConnector::new(settings.clone()), settings)
    }
}

impl<C: Connector> LinkController<C> {
    pub fn new(connector: C, settings: LinkSettings) -> Self {
        Self {
            connector,
            settings,
            state: Mutex::new(LinkState::default()),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────

    /// Open a link, replacing any existing one.
    ///
    /// Serial links tolerate a failed `PING` (the board may still be booting);
    /// network links must answer it. `INFO` is best-effort: its failure becomes
    /// the outcome's warning.
    pub async fn connect(
        &self,
        kind: TransportKind,
        endpoint: Option<&str>,
    ) -> Result<ConnectOutcome> {
        let mut state = self.state.lock().await;

        if let Err(e) = state.shut_down().await {
            warn!("Failed to close previous link: {}", e);
        }

        info!("Connecting over {} to {}", kind, endpoint.unwrap_or("<auto>"));
        let mut transport = self.connector.open(kind, endpoint).await?;
        let timeout = self.settings.command_timeout(kind);

        if let Err(e) = send_command(&mut transport, &DeviceCommand::Ping, timeout).await {
            match kind {
                TransportKind::Serial => warn!("PING after open failed, continuing: {}", e),
                TransportKind::Wifi => {
                    if let Err(close_err) = transport.close().await {
                        debug!("Close after failed PING also failed: {}", close_err);
                    }
                    return Err(e);
                }
            }
        }

        let endpoint = transport.identity().to_string();
        state.transport = Some(transport);

        let queried = query_info(state.transport()?, timeout).await;
        let (info, warning) = match queried {
            Ok(info) => {
                state.last_info = Some(info.clone());
                (Some(info), None)
            }
            Err(e) => {
                warn!("Connected to {}, but INFO failed: {}", endpoint, e);
                (None, Some(format!("Connected, but INFO failed: {}", e)))
            }
        };

        info!("Connected over {} to {}", kind, endpoint);
        Ok(ConnectOutcome {
            transport: kind,
            endpoint,
            info,
            warning,
        })
    }

    /// Close the link. Disconnecting twice is a no-op.
    pub async fn disconnect(&self) -> Result<()> {
        self.state.lock().await.shut_down().await
    }

    pub async fn status(&self) -> LinkStatus {
        let state = self.state.lock().await;
        match &state.transport {
            Some(transport) => LinkStatus {
                connected: true,
                transport: Some(transport.kind()),
                endpoint: Some(transport.identity().to_string()),
                info: state.last_info.clone(),
            },
            None => LinkStatus::default(),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────

    pub async fn ping(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.command(&mut state, &DeviceCommand::Ping).await?;
        Ok(())
    }

    /// Query the controller. An unclassifiable answer yields a raw-only
    /// [`DeviceInfo`]; an `ERR` is a rejection.
    pub async fn info(&self) -> Result<DeviceInfo> {
        let mut state = self.state.lock().await;
        let transport = state.transport()?;
        let timeout = self.settings.command_timeout(transport.kind());
        let info = query_info(transport, timeout).await?;
        state.last_info = Some(info.clone());
        Ok(info)
    }

    pub async fn set_brightness(&self, value: u8) -> Result<()> {
        let mut state = self.state.lock().await;
        self.command(&mut state, &DeviceCommand::Brightness(value)).await?;
        state.last_info.get_or_insert_with(DeviceInfo::default).brightness = Some(value);
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        self.uniform(DeviceCommand::Clear, Rgb::BLACK).await
    }

    pub async fn fill(&self, color: Rgb) -> Result<()> {
        self.uniform(DeviceCommand::Fill(color), color).await
    }

    /// Set one LED. `immediate` shows it right away (`SET`); otherwise it
    /// waits in the back-buffer for [`show`](Self::show) (`SETN`).
    pub async fn set_pixel(&self, index: usize, color: Rgb, immediate: bool) -> Result<()> {
        let command = if immediate {
            DeviceCommand::Set { index, color }
        } else {
            DeviceCommand::SetBuffered { index, color }
        };

        let mut state = self.state.lock().await;
        state.transport()?;

        // Unknown until acknowledged, even if this future is dropped mid-write
        let previous = std::mem::take(&mut state.shadow);
        self.command(&mut state, &command).await?;
        state.shadow = previous;
        state.shadow.record_pixel(index, color);
        Ok(())
    }

    pub async fn show(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.command(&mut state, &DeviceCommand::Show).await?;
        Ok(())
    }

    /// Make the strip display `frame`, sending only what changed.
    ///
    /// At or above the bulk threshold one `FRAME` carries the whole frame. If
    /// that fails the connection stops using `FRAME` and the same call falls
    /// back to `SETN`s plus `SHOW`. The shadow is unknown from the first write
    /// until the last one is acknowledged, so a failed or cancelled update
    /// makes the next call resend every pixel.
    pub async fn set_frame(&self, frame: &[Rgb]) -> Result<()> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let transport = state.transport.as_mut().ok_or(Error::NotConnected)?;
        let timeout = self.settings.command_timeout(transport.kind());

        let changed = state.shadow.changed_indices(frame);
        if changed.is_empty() {
            trace!("Frame unchanged, nothing to send");
            return Ok(());
        }

        state.shadow.invalidate();

        if state.supports_bulk_frame && changed.len() >= self.settings.bulk_frame_threshold {
            debug!(
                "{} of {} LEDs changed, sending bulk FRAME",
                changed.len(),
                frame.len()
            );
            let command = DeviceCommand::Frame(frame.to_vec());
            match send_command(transport, &command, timeout).await {
                Ok(_) => {
                    state.shadow.replace(frame);
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "Bulk FRAME failed, using per-pixel updates for this connection: {}",
                        e
                    );
                    state.supports_bulk_frame = false;
                }
            }
        }

        debug!(
            "{} of {} LEDs changed, sending SETN + SHOW",
            changed.len(),
            frame.len()
        );
        write_pixels(transport, frame, &changed, timeout).await?;
        state.shadow.replace(frame);
        Ok(())
    }

    /// Send a uniform write and record it in the shadow
    async fn uniform(&self, command: DeviceCommand, color: Rgb) -> Result<()> {
        let mut state = self.state.lock().await;
        state.transport()?;

        let previous = std::mem::take(&mut state.shadow);
        self.command(&mut state, &command).await?;
        let num_leds = state.known_led_count();
        state.shadow = previous;
        state.shadow.fill(color, num_leds);
        Ok(())
    }

    async fn command(
        &self,
        state: &mut LinkState<C::Transport>,
        command: &DeviceCommand,
    ) -> Result<String> {
        let transport = state.transport()?;
        let timeout = self.settings.command_timeout(transport.kind());
        send_command(transport, command, timeout).await
    }
}

impl<C: Connector> std::fmt::Debug for LinkController<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkController")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// One command/ack exchange
async fn send_command<T: Transport>(
    transport: &mut T,
    command: &DeviceCommand,
    timeout: Duration,
) -> Result<String> {
    let text = command.text();
    trace!("Sending {} command", command.description());
    let line = transport.send(&text, timeout).await?;
    expect_ok(&text, &line)
}

/// `SETN` each changed index in ascending order, then `SHOW`
async fn write_pixels<T: Transport>(
    transport: &mut T,
    frame: &[Rgb],
    changed: &[usize],
    timeout: Duration,
) -> Result<()> {
    for &index in changed {
        let command = DeviceCommand::SetBuffered {
            index,
            color: frame[index],
        };
        send_command(transport, &command, timeout).await?;
    }
    send_command(transport, &DeviceCommand::Show, timeout).await?;
    Ok(())
}

async fn query_info<T: Transport>(transport: &mut T, timeout: Duration) -> Result<DeviceInfo> {
    let text = DeviceCommand::Info.text();
    let line = transport.send(&text, timeout).await?;
    match decode(&line) {
        Response::Err(reason) => Err(Error::rejected(text, reason)),
        _ => Ok(parse_info(&line)),
    }
}

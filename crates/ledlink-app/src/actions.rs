//! Actions: one user intent each, executed against a connected link

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use ledlink_core::prelude::*;
use ledlink_core::{DeviceInfo, Rgb};
use ledlink_device::{Connector, LinkController, LinkStatus, PortInfo};

use crate::color::ColorOrder;

/// Pause between demo colors
pub const DEMO_STEP: Duration = Duration::from_millis(600);

/// Something the user asked the controller to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Status,
    Info,
    Ping,
    Brightness(u8),
    Clear,
    Fill(Rgb),
    SetPixel { index: usize, color: Rgb, buffered: bool },
    Frame(Vec<Rgb>),
    /// Red, green, blue, then clear
    Demo { step: Duration },
}

impl Action {
    /// Short name for logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Action::Status => "status",
            Action::Info => "info",
            Action::Ping => "ping",
            Action::Brightness(_) => "brightness",
            Action::Clear => "clear",
            Action::Fill(_) => "fill",
            Action::SetPixel { .. } => "set",
            Action::Frame(_) => "frame",
            Action::Demo { .. } => "demo",
        }
    }
}

/// What an action produced, printable as text or JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Report {
    Ports { ports: Vec<PortInfo> },
    Status { status: LinkStatus },
    Info { info: DeviceInfo },
    Done { action: &'static str },
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Ports { ports } if ports.is_empty() => write!(f, "No serial ports found."),
            Report::Ports { ports } => {
                for (i, port) in ports.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{}", port.device)?;
                    if !port.description.is_empty() {
                        write!(f, "  {}", port.description)?;
                    }
                    if !port.hwid.is_empty() {
                        write!(f, "  [{}]", port.hwid)?;
                    }
                }
                Ok(())
            }
            Report::Status { status } => {
                if !status.connected {
                    return write!(f, "disconnected");
                }
                write!(
                    f,
                    "connected via {} to {}",
                    status
                        .transport
                        .map(|t| t.to_string())
                        .unwrap_or_default(),
                    status.endpoint.as_deref().unwrap_or("?")
                )?;
                if let Some(info) = &status.info {
                    write!(f, "\n{}", InfoText(info))?;
                }
                Ok(())
            }
            Report::Info { info } => write!(f, "{}", InfoText(info)),
            Report::Done { action } => write!(f, "{}: OK", action),
        }
    }
}

struct InfoText<'a>(&'a DeviceInfo);

impl fmt::Display for InfoText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.0;
        match (info.num_leds, info.brightness) {
            (None, None) => write!(f, "raw: {}", info.raw.as_deref().unwrap_or("")),
            (leds, bright) => {
                let show = |v: Option<String>| v.unwrap_or_else(|| "?".to_string());
                write!(
                    f,
                    "leds: {}  brightness: {}",
                    show(leds.map(|n| n.to_string())),
                    show(bright.map(|b| b.to_string()))
                )
            }
        }
    }
}

/// Run `action` on a connected link, reordering colors for the strip's wiring
pub async fn execute<C: Connector>(
    link: &LinkController<C>,
    action: Action,
    order: ColorOrder,
) -> Result<Report> {
    let name = action.name();
    debug!("Executing {}", name);

    match action {
        Action::Status => {
            return Ok(Report::Status {
                status: link.status().await,
            })
        }
        Action::Info => {
            return Ok(Report::Info {
                info: link.info().await?,
            })
        }
        Action::Ping => link.ping().await?,
        Action::Brightness(value) => link.set_brightness(value).await?,
        Action::Clear => link.clear().await?,
        Action::Fill(color) => link.fill(order.apply(color)).await?,
        Action::SetPixel {
            index,
            color,
            buffered,
        } => link.set_pixel(index, order.apply(color), !buffered).await?,
        Action::Frame(frame) => link.set_frame(&order.apply_all(&frame)).await?,
        Action::Demo { step } => run_demo(link, order, step).await?,
    }

    Ok(Report::Done { action: name })
}

async fn run_demo<C: Connector>(
    link: &LinkController<C>,
    order: ColorOrder,
    step: Duration,
) -> Result<()> {
    for color in [Rgb::new(255, 0, 0), Rgb::new(0, 255, 0), Rgb::new(0, 0, 255)] {
        info!("Demo: fill {:?}", color);
        link.fill(order.apply(color)).await?;
        tokio::time::sleep(step).await;
    }
    link.clear().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledlink_core::TransportKind;
    use ledlink_device::test_utils::{FakeConnector, FakeHandle};
    use ledlink_device::LinkSettings;

    async fn connected(num_leds: usize) -> (LinkController<FakeConnector>, FakeHandle) {
        let connector = FakeConnector::new(num_leds);
        let handle = connector.handle();
        let link = LinkController::new(connector, LinkSettings::default());
        link.connect(TransportKind::Serial, None).await.unwrap();
        handle.take_wire();
        (link, handle)
    }

    #[tokio::test]
    async fn test_fill_applies_color_order() {
        let (link, handle) = connected(4).await;

        execute(&link, Action::Fill(Rgb::new(255, 0, 0)), ColorOrder::Brg)
            .await
            .unwrap();

        assert_eq!(handle.wire(), vec!["FILL 0 255 0"]);
    }

    #[tokio::test]
    async fn test_set_pixel_buffered_uses_setn() {
        let (link, handle) = connected(4).await;

        let report = execute(
            &link,
            Action::SetPixel {
                index: 1,
                color: Rgb::new(1, 2, 3),
                buffered: true,
            },
            ColorOrder::Rgb,
        )
        .await
        .unwrap();

        assert_eq!(report, Report::Done { action: "set" });
        assert_eq!(handle.wire(), vec!["SETN 1 1 2 3"]);
    }

    #[tokio::test]
    async fn test_info_report() {
        let (link, _handle) = connected(35).await;

        let report = execute(&link, Action::Info, ColorOrder::Rgb).await.unwrap();

        assert_eq!(report.to_string(), "leds: 35  brightness: 20");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"], "info");
        assert_eq!(json["info"]["num_leds"], 35);
    }

    #[tokio::test]
    async fn test_rejection_propagates() {
        let (link, handle) = connected(4).await;
        handle.respond_with("ERR bad index");

        let err = execute(&link, Action::Ping, ColorOrder::Rgb)
            .await
            .unwrap_err();
        assert_eq!(err.rejection_reason(), Some("bad index"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demo_cycles_then_clears() {
        let (link, handle) = connected(4).await;

        execute(&link, Action::Demo { step: DEMO_STEP }, ColorOrder::Rgb)
            .await
            .unwrap();

        assert_eq!(
            handle.wire(),
            vec!["FILL 255 0 0", "FILL 0 255 0", "FILL 0 0 255", "CLEAR"]
        );
    }

    #[test]
    fn test_status_text() {
        let report = Report::Status {
            status: LinkStatus::default(),
        };
        assert_eq!(report.to_string(), "disconnected");
    }

    #[test]
    fn test_ports_text() {
        let mut port = PortInfo::new("/dev/ttyUSB0", "CP2102");
        port.hwid = "USB VID:PID=10C4:EA60".to_string();
        let report = Report::Ports { ports: vec![port] };
        assert_eq!(
            report.to_string(),
            "/dev/ttyUSB0  CP2102  [USB VID:PID=10C4:EA60]"
        );
        assert_eq!(
            Report::Ports { ports: vec![] }.to_string(),
            "No serial ports found."
        );
    }
}

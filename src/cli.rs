//! Command-line arguments

use std::time::Duration;

use clap::{Parser, Subcommand};

use ledlink_app::{parse_frame_arg, Action, ColorOrder, Settings};
use ledlink_core::prelude::*;
use ledlink_core::{Rgb, TransportKind};

/// ledlink - Drive an LED strip controller over USB serial or Wi-Fi
#[derive(Parser, Debug)]
#[command(name = "ledlink")]
#[command(about = "Drive an LED strip controller over USB serial or Wi-Fi", long_about = None)]
pub struct Args {
    /// Transport: serial or wifi (default from config)
    #[arg(long, short = 't', global = true)]
    pub transport: Option<TransportKind>,

    /// Serial device path (auto-detected when omitted)
    #[arg(long, short = 'p', global = true)]
    pub port: Option<String>,

    /// Controller host for the wifi transport
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Channel order of the strip: rgb, rbg, grb, gbr, brg, bgr
    #[arg(long, global = true)]
    pub color_order: Option<ColorOrder>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List serial ports
    Ports,
    /// Connect and report the link status
    Status,
    /// Query LED count and brightness
    Info,
    /// Check that the controller answers
    Ping,
    /// Set global brightness
    Brightness { value: u8 },
    /// Turn every LED off
    Clear,
    /// Set every LED to one color
    Fill { r: u8, g: u8, b: u8 },
    /// Set one LED
    Set {
        index: usize,
        r: u8,
        g: u8,
        b: u8,
        /// Write to the back-buffer without showing
        #[arg(long)]
        buffered: bool,
    },
    /// Show a whole frame: RRGGBB hex, or @file with hex or JSON triples
    Frame { frame: String },
    /// Cycle red, green, blue, then clear
    Demo {
        /// Milliseconds per color
        #[arg(long, default_value_t = 600)]
        step_ms: u64,
    },
    /// Write a default .ledlink/config.toml
    Init,
}

impl Command {
    /// The link action behind this command; `None` for commands that need no link
    pub fn to_action(&self) -> Result<Option<Action>> {
        let action = match self {
            Command::Ports | Command::Init => return Ok(None),
            Command::Status => Action::Status,
            Command::Info => Action::Info,
            Command::Ping => Action::Ping,
            Command::Brightness { value } => Action::Brightness(*value),
            Command::Clear => Action::Clear,
            Command::Fill { r, g, b } => Action::Fill(Rgb::new(*r, *g, *b)),
            Command::Set {
                index,
                r,
                g,
                b,
                buffered,
            } => Action::SetPixel {
                index: *index,
                color: Rgb::new(*r, *g, *b),
                buffered: *buffered,
            },
            Command::Frame { frame } => Action::Frame(parse_frame_arg(frame)?),
            Command::Demo { step_ms } => Action::Demo {
                step: Duration::from_millis(*step_ms),
            },
        };
        Ok(Some(action))
    }
}

/// Where and how to talk, after merging flags over settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub transport: TransportKind,
    pub endpoint: Option<String>,
    pub order: ColorOrder,
    pub json: bool,
}

impl Args {
    /// Flags win over environment and config file
    pub fn resolve(&self, settings: &Settings) -> Invocation {
        let transport = self.transport.unwrap_or(settings.link.transport);
        let flag_endpoint = match transport {
            TransportKind::Serial => self.port.clone(),
            TransportKind::Wifi => self.host.clone(),
        };

        Invocation {
            transport,
            endpoint: flag_endpoint.or_else(|| settings.endpoint(transport).map(str::to_string)),
            order: self.color_order.unwrap_or(settings.link.color_order),
            json: self.json || settings.output.json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_fill_with_globals() {
        let args = parse(&[
            "ledlink",
            "fill",
            "255",
            "0",
            "0",
            "--transport",
            "wifi",
            "--host",
            "10.0.0.2",
        ]);
        assert_eq!(args.transport, Some(TransportKind::Wifi));
        assert_eq!(args.host.as_deref(), Some("10.0.0.2"));
        assert_eq!(
            args.command.to_action().unwrap(),
            Some(Action::Fill(Rgb::new(255, 0, 0)))
        );
    }

    #[test]
    fn test_parse_rejects_out_of_range_channel() {
        assert!(Args::try_parse_from(["ledlink", "fill", "256", "0", "0"]).is_err());
        assert!(Args::try_parse_from(["ledlink", "-t", "bluetooth", "ping"]).is_err());
    }

    #[test]
    fn test_set_buffered() {
        let args = parse(&["ledlink", "set", "3", "1", "2", "3", "--buffered"]);
        assert_eq!(
            args.command.to_action().unwrap(),
            Some(Action::SetPixel {
                index: 3,
                color: Rgb::new(1, 2, 3),
                buffered: true
            })
        );
    }

    #[test]
    fn test_ports_needs_no_link() {
        assert_eq!(parse(&["ledlink", "ports"]).command.to_action().unwrap(), None);
    }

    #[test]
    fn test_bad_frame_is_invalid_argument() {
        let args = parse(&["ledlink", "frame", "FFF"]);
        assert!(matches!(
            args.command.to_action(),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_resolve_prefers_flags() {
        let mut settings = Settings::default();
        settings.serial.port = Some("/dev/ttyUSB0".to_string());
        settings.network.host = Some("192.168.1.120".to_string());

        let inv = parse(&["ledlink", "ping"]).resolve(&settings);
        assert_eq!(inv.transport, TransportKind::Serial);
        assert_eq!(inv.endpoint.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(inv.order, ColorOrder::Brg);

        let inv =
            parse(&["ledlink", "-t", "wifi", "--color-order", "rgb", "ping"]).resolve(&settings);
        assert_eq!(inv.endpoint.as_deref(), Some("192.168.1.120"));
        assert_eq!(inv.order, ColorOrder::Rgb);

        let inv = parse(&["ledlink", "--port", "/dev/cu.X", "ping"]).resolve(&settings);
        assert_eq!(inv.endpoint.as_deref(), Some("/dev/cu.X"));
    }
}

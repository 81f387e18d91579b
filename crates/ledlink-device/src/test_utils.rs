//! Test utilities for the link layer
//!
//! [`FakeConnector`] hands out [`FakeTransport`]s wired to one shared
//! [`FakeDevice`]: an in-memory controller that answers like the stock
//! firmware, records every command put on the wire, and can be told to fail.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ledlink_core::prelude::*;
use ledlink_core::{Rgb, TimeoutDiagnostics, TransportKind};

use crate::ports::{pick_port, resolve_host, PortInfo};
use crate::protocol::decode_frame_hex;
use crate::transport::{Connector, Transport};

/// In-memory controller firmware
#[derive(Debug, Clone)]
pub struct FakeFirmware {
    pub num_leds: usize,
    pub brightness: u8,
    /// Back-buffer written by `SETN`
    pub buffer: Vec<Rgb>,
    /// What the strip shows
    pub shown: Vec<Rgb>,
    /// Whether `FRAME` is understood; older firmware lacks it
    pub supports_frame: bool,
}

impl FakeFirmware {
    pub fn new(num_leds: usize) -> Self {
        Self {
            num_leds,
            brightness: 20,
            buffer: vec![Rgb::BLACK; num_leds],
            shown: vec![Rgb::BLACK; num_leds],
            supports_frame: true,
        }
    }

    /// Answer one command line the way the firmware does
    pub fn handle(&mut self, line: &str) -> String {
        let line = line.trim().to_uppercase();
        let mut parts = line.split_whitespace();
        let verb = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let nums: Option<Vec<i64>> = args.iter().map(|a| a.parse().ok()).collect();

        match (verb, nums.as_deref()) {
            ("PING", _) if args.is_empty() => "OK".to_string(),
            ("INFO", _) if args.is_empty() => {
                format!("OK NUM_LEDS {} BRIGHT {}", self.num_leds, self.brightness)
            }
            ("BRIGHT", Some([b])) => {
                self.brightness = clamp8(*b);
                "OK".to_string()
            }
            ("CLEAR", _) if args.is_empty() => {
                self.buffer = vec![Rgb::BLACK; self.num_leds];
                self.show()
            }
            ("FILL", Some([r, g, b])) => {
                self.buffer = vec![rgb(*r, *g, *b); self.num_leds];
                self.show()
            }
            ("SET" | "SETN", Some([i, r, g, b])) => {
                match usize::try_from(*i).ok().filter(|i| *i < self.num_leds) {
                    Some(i) => {
                        self.buffer[i] = rgb(*r, *g, *b);
                        if verb == "SET" {
                            self.show()
                        } else {
                            "OK".to_string()
                        }
                    }
                    None => "ERR index out of range".to_string(),
                }
            }
            ("SHOW", _) if args.is_empty() => self.show(),
            ("FRAME", _) if self.supports_frame => match args.as_slice() {
                [hex] => match decode_frame_hex(hex) {
                    Ok(colors) if colors.len() == self.num_leds => {
                        self.buffer = colors;
                        self.show()
                    }
                    _ => "ERR bad frame".to_string(),
                },
                _ => "ERR usage: FRAME <hex>".to_string(),
            },
            _ => "ERR unknown command".to_string(),
        }
    }

    fn show(&mut self) -> String {
        self.shown = self.buffer.clone();
        "OK".to_string()
    }
}

fn clamp8(v: i64) -> u8 {
    v.clamp(0, 255) as u8
}

fn rgb(r: i64, g: i64, b: i64) -> Rgb {
    Rgb::new(clamp8(r), clamp8(g), clamp8(b))
}

/// Shared state behind every fake transport of one [`FakeConnector`]
#[derive(Debug)]
pub struct FakeDevice {
    pub firmware: FakeFirmware,
    /// Commands in the order they reached the wire
    pub wire: Vec<String>,
    /// Serial ports the fake host enumerates
    pub ports: Vec<PortInfo>,
    /// Verbs that fail with a transport error instead of reaching the firmware
    pub failing_verbs: HashSet<String>,
    /// Verbs the firmware never answers
    pub silent_verbs: HashSet<String>,
    /// Replace the firmware's answer with this line for every command
    pub canned_response: Option<String>,
    /// Simulated per-command latency
    pub latency: Option<Duration>,
    /// Endpoints opened, in order
    pub opened: Vec<String>,
    pub close_calls: usize,
}

impl FakeDevice {
    fn new(num_leds: usize) -> Self {
        Self {
            firmware: FakeFirmware::new(num_leds),
            wire: Vec::new(),
            ports: vec![PortInfo::new("/dev/ttyUSB0", "CP2102 USB to UART Bridge")],
            failing_verbs: HashSet::new(),
            silent_verbs: HashSet::new(),
            canned_response: None,
            latency: None,
            opened: Vec::new(),
            close_calls: 0,
        }
    }
}

/// Handle to a [`FakeDevice`] for arranging and inspecting a test
#[derive(Debug, Clone)]
pub struct FakeHandle(Arc<Mutex<FakeDevice>>);

impl FakeHandle {
    pub fn device(&self) -> MutexGuard<'_, FakeDevice> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Commands sent so far
    pub fn wire(&self) -> Vec<String> {
        self.device().wire.clone()
    }

    /// Commands sent so far, then forget them
    pub fn take_wire(&self) -> Vec<String> {
        std::mem::take(&mut self.device().wire)
    }

    /// Number of wire commands starting with `verb`
    pub fn count(&self, verb: &str) -> usize {
        self.device()
            .wire
            .iter()
            .filter(|line| line.split_whitespace().next() == Some(verb))
            .count()
    }

    pub fn shown(&self) -> Vec<Rgb> {
        self.device().firmware.shown.clone()
    }

    pub fn fail_verb(&self, verb: &str) {
        self.device().failing_verbs.insert(verb.to_string());
    }

    pub fn silence_verb(&self, verb: &str) {
        self.device().silent_verbs.insert(verb.to_string());
    }

    pub fn set_ports(&self, ports: Vec<PortInfo>) {
        self.device().ports = ports;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.device().latency = Some(latency);
    }

    pub fn respond_with(&self, line: &str) {
        self.device().canned_response = Some(line.to_string());
    }

    pub fn without_frame_support(&self) {
        self.device().firmware.supports_frame = false;
    }
}

/// Connector that opens [`FakeTransport`]s
#[derive(Debug, Clone)]
pub struct FakeConnector {
    handle: FakeHandle,
}

impl FakeConnector {
    /// A fake host with one USB serial port and a strip of `num_leds`
    pub fn new(num_leds: usize) -> Self {
        Self {
            handle: FakeHandle(Arc::new(Mutex::new(FakeDevice::new(num_leds)))),
        }
    }

    pub fn handle(&self) -> FakeHandle {
        self.handle.clone()
    }
}

impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn open(&self, kind: TransportKind, endpoint: Option<&str>) -> Result<FakeTransport> {
        let identity = match kind {
            TransportKind::Serial => {
                let ports = self.handle.device().ports.clone();
                pick_port(&ports, endpoint)?
            }
            TransportKind::Wifi => resolve_host(endpoint)?,
        };

        self.handle.device().opened.push(identity.clone());
        Ok(FakeTransport {
            identity,
            kind,
            open: true,
            handle: self.handle.clone(),
        })
    }
}

/// Transport answering from the shared [`FakeDevice`]
#[derive(Debug)]
pub struct FakeTransport {
    identity: String,
    kind: TransportKind,
    open: bool,
    handle: FakeHandle,
}

impl Transport for FakeTransport {
    async fn send(&mut self, command: &str, _timeout: Duration) -> Result<String> {
        if !self.open {
            return Err(Error::NotConnected);
        }

        let verb = command.split_whitespace().next().unwrap_or_default().to_string();
        let latency = {
            let mut device = self.handle.device();
            device.wire.push(command.trim().to_string());
            device.latency
        };

        // Give concurrent callers a chance to interleave
        match latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }

        let mut device = self.handle.device();
        if device.failing_verbs.contains(&verb) {
            return Err(Error::transport(format!("simulated failure for {:?}", command)));
        }
        if device.silent_verbs.contains(&verb) {
            return Err(Error::timeout(command, TimeoutDiagnostics::default()));
        }
        if let Some(line) = device.canned_response.clone() {
            return Ok(line);
        }
        Ok(device.firmware.handle(command))
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.handle.device().close_calls += 1;
        }
        Ok(())
    }

    fn identity(&self) -> &str {
        &self.identity
    }

    fn kind(&self) -> TransportKind {
        self.kind
    }
}

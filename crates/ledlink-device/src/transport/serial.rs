//! Persistent serial session to the controller
//!
//! Opening the port usually resets the microcontroller, so `open` deasserts
//! the control lines, waits out the boot, and listens for the `READY` banner.
//! All port I/O is blocking and runs on tokio's blocking pool.

use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, SerialPort};

use ledlink_core::prelude::*;
use ledlink_core::{TimeoutDiagnostics, TransportKind};

use super::Transport;
use crate::protocol::{encode_line, is_terminal_line, READY_BANNER};
use crate::settings::SerialSettings;

/// Read buffer size for a single port read
const READ_CHUNK: usize = 256;

// ─────────────────────────────────────────────────────────
// Byte-level port access
// ─────────────────────────────────────────────────────────

/// The handful of port operations the line exchange needs
pub(crate) trait LineIo {
    /// Drop anything the OS has buffered from the device
    fn discard_input(&mut self) -> io::Result<()>;

    /// Write and flush a complete command line
    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read whatever is available; `Ok(0)` when the read timed out
    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Drain bytes already buffered without waiting for more
    fn read_pending(&mut self) -> io::Result<Vec<u8>>;
}

impl LineIo for Box<dyn SerialPort> {
    fn discard_input(&mut self) -> io::Result<()> {
        self.clear(ClearBuffer::Input).map_err(io::Error::from)
    }

    fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }

    fn read_pending(&mut self) -> io::Result<Vec<u8>> {
        let available = self.bytes_to_read().map_err(io::Error::from)? as usize;
        let mut tail = vec![0u8; available];
        if available > 0 {
            let n = self.read(&mut tail)?;
            tail.truncate(n);
        }
        Ok(tail)
    }
}

// ─────────────────────────────────────────────────────────
// Line exchange
// ─────────────────────────────────────────────────────────

/// Line framing and per-connection diagnostics over a [`LineIo`]
pub(crate) struct SerialLink<P> {
    io: P,
    /// Bytes read past the last complete line
    partial: Vec<u8>,
    /// Last non-`OK`/`ERR` line seen on this connection
    last_non_terminal: Option<String>,
}

impl<P: LineIo> SerialLink<P> {
    pub(crate) fn new(io: P) -> Self {
        Self {
            io,
            partial: Vec::new(),
            last_non_terminal: None,
        }
    }

    /// Read the next complete, non-empty line, or `None` once `deadline` passes
    fn read_line(&mut self, deadline: Instant) -> io::Result<Option<String>> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = self.partial.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw).trim().to_string();
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(line));
            }

            if Instant::now() >= deadline {
                return Ok(None);
            }

            let n = self.io.read_chunk(&mut buf)?;
            self.partial.extend_from_slice(&buf[..n]);
        }
    }

    /// Discard stale input, write `command`, and wait for its `OK`/`ERR` line
    pub(crate) fn exchange(&mut self, command: &str, timeout: Duration) -> Result<String> {
        if let Err(e) = self.io.discard_input() {
            debug!("Could not discard stale serial input: {}", e);
        }
        self.partial.clear();

        self.io
            .write_line(encode_line(command).as_bytes())
            .map_err(|e| Error::transport(format!("Failed to write {:?}: {}", command, e)))?;

        let deadline = Instant::now() + timeout;
        let mut last_line = None;

        while let Some(line) = self
            .read_line(deadline)
            .map_err(|e| Error::transport(format!("Failed to read serial response: {}", e)))?
        {
            if is_terminal_line(&line) {
                return Ok(line);
            }
            trace!("Skipping non-terminal line: {:?}", line);
            self.last_non_terminal = Some(line.clone());
            last_line = Some(line);
        }

        let mut raw_tail = std::mem::take(&mut self.partial);
        match self.io.read_pending() {
            Ok(rest) => raw_tail.extend(rest),
            Err(e) => debug!("Could not read trailing serial bytes: {}", e),
        }

        Err(Error::timeout(
            command,
            TimeoutDiagnostics {
                last_line,
                last_non_terminal: self.last_non_terminal.clone(),
                raw_tail,
            },
        ))
    }

    /// Wait up to `timeout` for the firmware's `READY` banner
    pub(crate) fn wait_for_ready(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.read_line(deadline) {
                Ok(Some(line)) if line == READY_BANNER => return true,
                Ok(Some(line)) => trace!("Boot output: {:?}", line),
                Ok(None) => return false,
                Err(e) => {
                    debug!("Read failed while waiting for READY: {}", e);
                    return false;
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────
// Transport
// ─────────────────────────────────────────────────────────

type SharedLink = Arc<Mutex<SerialLink<Box<dyn SerialPort>>>>;

/// A USB serial session to the controller
pub struct SerialTransport {
    path: String,
    link: Option<SharedLink>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("open", &self.link.is_some())
            .finish()
    }
}

impl SerialTransport {
    /// Open `path`, ride out the boot reset, and wait for `READY` (best-effort)
    pub async fn open(path: &str, settings: &SerialSettings) -> Result<Self> {
        info!("Opening serial port {} at {} baud", path, settings.baud_rate);

        let port_path = path.to_string();
        let baud = settings.baud_rate;
        let read_timeout = settings.read_timeout;
        let port = blocking(move || open_port(&port_path, baud, read_timeout)).await?;

        // Opening the port typically resets the board; let it settle and boot.
        tokio::time::sleep(settings.line_settle).await;
        tokio::time::sleep(settings.boot_delay).await;

        let link = Arc::new(Mutex::new(SerialLink::new(port)));
        let ready_timeout = settings.ready_timeout;
        let handshake = Arc::clone(&link);
        let ready = blocking(move || {
            let mut guard = lock(&handshake)?;
            if let Err(e) = guard.io.discard_input() {
                debug!("Could not discard boot output: {}", e);
            }
            Ok(guard.wait_for_ready(ready_timeout))
        })
        .await?;

        if ready {
            info!("Controller on {} reported READY", path);
        } else {
            warn!(
                "No READY banner from {} within {:?}; continuing",
                path, ready_timeout
            );
        }

        Ok(Self {
            path: path.to_string(),
            link: Some(link),
        })
    }
}

impl Transport for SerialTransport {
    async fn send(&mut self, command: &str, timeout: Duration) -> Result<String> {
        let link = self.link.clone().ok_or(Error::NotConnected)?;
        let command = command.trim().to_string();

        debug!("serial {} -> {}", self.path, command);
        let response = blocking(move || {
            let mut guard = lock(&link)?;
            guard.exchange(&command, timeout)
        })
        .await?;
        debug!("serial {} <- {}", self.path, response);

        Ok(response)
    }

    async fn close(&mut self) -> Result<()> {
        if self.link.take().is_some() {
            info!("Closed serial port {}", self.path);
        }
        Ok(())
    }

    fn identity(&self) -> &str {
        &self.path
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Serial
    }
}

fn open_port(path: &str, baud: u32, read_timeout: Duration) -> Result<Box<dyn SerialPort>> {
    let mut port = serialport::new(path, baud)
        .timeout(read_timeout)
        .open()
        .map_err(|e| match e.kind {
            serialport::ErrorKind::NoDevice => {
                Error::endpoint_not_found(format!("Serial port {} is gone: {}", path, e))
            }
            _ => Error::transport(format!("Failed to open serial port {}: {}", path, e)),
        })?;

    // Keep the board out of reset/bootloader mode
    if let Err(e) = port.write_data_terminal_ready(false) {
        warn!("Could not deassert DTR on {}: {}", path, e);
    }
    if let Err(e) = port.write_request_to_send(false) {
        warn!("Could not deassert RTS on {}: {}", path, e);
    }

    Ok(port)
}

fn lock(link: &SharedLink) -> Result<std::sync::MutexGuard<'_, SerialLink<Box<dyn SerialPort>>>> {
    link.lock()
        .map_err(|_| Error::transport("serial link poisoned by an earlier panic"))
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::transport(format!("Serial I/O task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted port: each read returns the next chunk, then times out
    #[derive(Default)]
    struct FakeIo {
        reads: VecDeque<Vec<u8>>,
        tail: Vec<u8>,
        written: Vec<u8>,
        discards: usize,
    }

    impl FakeIo {
        fn with_reads(chunks: &[&str]) -> Self {
            Self {
                reads: chunks.iter().map(|c| c.as_bytes().to_vec()).collect(),
                ..Default::default()
            }
        }
    }

    impl LineIo for FakeIo {
        fn discard_input(&mut self) -> io::Result<()> {
            self.discards += 1;
            Ok(())
        }

        fn write_line(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.written.extend_from_slice(bytes);
            Ok(())
        }

        fn read_chunk(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => {
                    std::thread::sleep(Duration::from_millis(1));
                    Ok(0)
                }
            }
        }

        fn read_pending(&mut self) -> io::Result<Vec<u8>> {
            Ok(std::mem::take(&mut self.tail))
        }
    }

    const SHORT: Duration = Duration::from_millis(40);

    #[test]
    fn test_exchange_skips_noise_until_ok() {
        let mut link = SerialLink::new(FakeIo::with_reads(&["READY\r\n", "OK\r\n"]));

        let response = link.exchange("PING", SHORT).unwrap();

        assert_eq!(response, "OK");
        assert_eq!(link.io.written, b"PING\r\n");
        assert_eq!(link.io.discards, 1);
        assert_eq!(link.last_non_terminal.as_deref(), Some("READY"));
    }

    #[test]
    fn test_exchange_returns_err_line() {
        let mut link = SerialLink::new(FakeIo::with_reads(&["ERR bad index\n"]));
        let response = link.exchange("SET 99 0 0 0", SHORT).unwrap();
        assert_eq!(response, "ERR bad index");
    }

    #[test]
    fn test_exchange_joins_split_lines() {
        let mut link = SerialLink::new(FakeIo::with_reads(&[
            "O",
            "K NUM_LEDS",
            " 15 BRIGHT 32\r\n",
        ]));
        let response = link.exchange("INFO", SHORT).unwrap();
        assert_eq!(response, "OK NUM_LEDS 15 BRIGHT 32");
    }

    #[test]
    fn test_exchange_drops_stale_partial_input() {
        let mut link = SerialLink::new(FakeIo::with_reads(&["ERR busy\n"]));
        link.partial.extend_from_slice(b"OK\n");

        let response = link.exchange("SHOW", SHORT).unwrap();
        assert_eq!(response, "ERR busy");
    }

    #[test]
    fn test_exchange_timeout_carries_diagnostics() {
        let mut io = FakeIo::with_reads(&["rst:0x1 (POWERON_RESET)\r\n", "ets Jun"]);
        io.tail = b" 8 2016".to_vec();
        let mut link = SerialLink::new(io);

        let err = link.exchange("PING", SHORT).unwrap_err();

        match err {
            Error::Timeout {
                command,
                diagnostics,
            } => {
                assert_eq!(command, "PING");
                assert_eq!(
                    diagnostics.last_line.as_deref(),
                    Some("rst:0x1 (POWERON_RESET)")
                );
                assert_eq!(
                    diagnostics.last_non_terminal.as_deref(),
                    Some("rst:0x1 (POWERON_RESET)")
                );
                assert_eq!(diagnostics.raw_tail, b"ets Jun 8 2016");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_without_output_has_empty_diagnostics() {
        let mut link = SerialLink::new(FakeIo::default());
        let err = link.exchange("INFO", SHORT).unwrap_err();
        assert_eq!(err.to_string(), "No OK/ERR response for \"INFO\"");
    }

    #[test]
    fn test_last_non_terminal_survives_across_exchanges() {
        let mut link = SerialLink::new(FakeIo::with_reads(&["debug: led 3\n", "OK\n"]));
        link.exchange("SHOW", SHORT).unwrap();

        let err = link.exchange("PING", SHORT).unwrap_err();
        match err {
            Error::Timeout { diagnostics, .. } => {
                assert_eq!(diagnostics.last_line, None);
                assert_eq!(diagnostics.last_non_terminal.as_deref(), Some("debug: led 3"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_for_ready() {
        let mut link = SerialLink::new(FakeIo::with_reads(&["boot...\n", "READY\r\n"]));
        assert!(link.wait_for_ready(SHORT));

        let mut link = SerialLink::new(FakeIo::with_reads(&["boot...\n"]));
        assert!(!link.wait_for_ready(SHORT));
    }
}

//! Stateless HTTP transport for controllers on the LAN
//!
//! Every command is one `GET http://<host>/cmd?q=<command>`. There is no
//! session: "connected" only means a host has been accepted. The firmware's
//! answer is the response body, whatever the HTTP status says.

use std::time::Duration;

use reqwest::StatusCode;
use url::Url;

use ledlink_core::prelude::*;
use ledlink_core::{TimeoutDiagnostics, TransportKind};

use super::Transport;
use crate::settings::NetworkSettings;

/// Path the firmware serves the command endpoint on
pub const COMMAND_PATH: &str = "/cmd";

/// Query parameter carrying the command text
pub const COMMAND_PARAM: &str = "q";

/// One-request-per-command transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    host: String,
    client: reqwest::Client,
    retries: u32,
    retry_delay: Duration,
}

impl HttpTransport {
    pub fn new(host: impl Into<String>, settings: &NetworkSettings) -> Result<Self> {
        let host = host.into();
        // Validate early so a bad host fails connect, not the first command
        command_url(&host, "PING")?;

        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            host,
            client,
            retries: settings.retries,
            retry_delay: settings.retry_delay,
        })
    }
}

impl Transport for HttpTransport {
    async fn send(&mut self, command: &str, timeout: Duration) -> Result<String> {
        if self.host.is_empty() {
            return Err(Error::NotConnected);
        }
        let command = command.trim();
        let url = command_url(&self.host, command)?;
        let attempts = self.retries + 1;
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!("http {} -> {} (attempt {}/{})", self.host, command, attempt, attempts);

            let result = async {
                let response = self.client.get(url.clone()).timeout(timeout).send().await?;
                let status = response.status();
                let body = response.text().await?;
                Ok::<_, reqwest::Error>((status, body))
            }
            .await;

            match result {
                Ok((status, body)) => {
                    let response = interpret_body(command, status, &body)?;
                    debug!("http {} <- {}", self.host, response);
                    return Ok(response);
                }
                Err(e) => {
                    let err = if e.is_timeout() {
                        Error::timeout(command, TimeoutDiagnostics::default())
                    } else {
                        Error::transport(format!(
                            "Failed to reach controller at {}: {}",
                            self.host, e
                        ))
                    };
                    warn!("Attempt {}/{} for {:?} failed: {}", attempt, attempts, command, err);
                    last_error = Some(err);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::transport(format!("Failed to send command {:?}", command))))
    }

    async fn close(&mut self) -> Result<()> {
        if !self.host.is_empty() {
            info!("Forgetting Wi-Fi host {}", self.host);
            self.host.clear();
        }
        Ok(())
    }

    fn identity(&self) -> &str {
        &self.host
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Wifi
    }
}

/// Build the command URL, form-encoding the command text
pub fn command_url(host: &str, command: &str) -> Result<Url> {
    let mut url = Url::parse(&format!("http://{}{}", host, COMMAND_PATH))
        .map_err(|e| Error::endpoint_not_found(format!("Invalid Wi-Fi host {:?}: {}", host, e)))?;
    url.query_pairs_mut().append_pair(COMMAND_PARAM, command.trim());
    Ok(url)
}

/// Turn an HTTP reply into the firmware's response line.
///
/// A non-empty body is the answer even on an error status (the firmware
/// reports `ERR ...` with a 4xx/5xx). An empty body is a transport fault.
fn interpret_body(command: &str, status: StatusCode, body: &str) -> Result<String> {
    let body = body.trim();
    if !body.is_empty() {
        if !status.is_success() {
            debug!("HTTP {} for {:?} carried body {:?}", status.as_u16(), command, body);
        }
        return Ok(body.to_string());
    }

    if status.is_success() {
        Err(Error::transport(format!("Empty response for {:?}", command)))
    } else {
        Err(Error::transport(format!(
            "HTTP {} for {:?}",
            status.as_u16(),
            command
        )))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP response; yields the request head it received
    async fn serve_once(
        status: &'static str,
        body: &'static str,
    ) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let reply = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&head).to_string());
        });

        (addr.to_string(), rx)
    }

    /// Accept connections forever, counting them. Connection `n` gets
    /// `script[n]` as a 200 body; an empty entry, or anything past the end
    /// of the script, is dropped without a reply.
    async fn serve_script(script: &'static [&'static str]) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let body = script.get(n).copied().unwrap_or_default();
                if body.is_empty() {
                    drop(socket);
                    continue;
                }

                let mut head = Vec::new();
                let mut buf = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => head.extend_from_slice(&buf[..n]),
                    }
                }
                let reply = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (addr.to_string(), accepted)
    }

    fn fast_settings() -> NetworkSettings {
        NetworkSettings {
            request_timeout: Duration::from_secs(2),
            retries: 1,
            retry_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_command_url_form_encodes() {
        let url = command_url("192.168.1.120", "SET 1 255 0 0").unwrap();
        assert_eq!(url.as_str(), "http://192.168.1.120/cmd?q=SET+1+255+0+0");
    }

    #[test]
    fn test_command_url_rejects_garbage_host() {
        assert!(command_url("bad host/", "PING").is_err());
    }

    #[test]
    fn test_interpret_body() {
        assert_eq!(
            interpret_body("PING", StatusCode::OK, "OK\n").unwrap(),
            "OK"
        );
        assert_eq!(
            interpret_body("FRAME 00", StatusCode::BAD_REQUEST, "ERR unknown command").unwrap(),
            "ERR unknown command"
        );

        let err = interpret_body("PING", StatusCode::OK, "  ").unwrap_err();
        assert!(err.to_string().contains("Empty response"));

        let err = interpret_body("PING", StatusCode::SERVICE_UNAVAILABLE, "").unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_send_uses_query_parameter() {
        let (host, request) = serve_once("200 OK", "OK").await;
        let mut transport = HttpTransport::new(host, &fast_settings()).unwrap();

        let response = transport
            .send("FILL 255 0 0", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response, "OK");
        let head = request.await.unwrap();
        assert!(head.starts_with("GET /cmd?q=FILL+255+0+0 "));
    }

    #[tokio::test]
    async fn test_error_status_with_body_is_a_response() {
        let (host, _request) = serve_once("400 Bad Request", "ERR bad index").await;
        let mut transport = HttpTransport::new(host, &fast_settings()).unwrap();

        let response = transport
            .send("SET 99 0 0 0", Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(response, "ERR bad index");
    }

    #[tokio::test]
    async fn test_empty_success_body_is_transport_failure() {
        let (host, _request) = serve_once("200 OK", "").await;
        let mut transport = HttpTransport::new(host, &fast_settings()).unwrap();

        let err = transport
            .send("PING", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransportFailure { .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_after_retries() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let host = listener.local_addr().unwrap().to_string();
        drop(listener);

        let mut transport = HttpTransport::new(host.clone(), &fast_settings()).unwrap();
        let err = transport
            .send("PING", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransportFailure { .. }));
        assert!(err.to_string().contains(&host));
    }

    #[tokio::test]
    async fn test_dropped_connection_is_retried() {
        let (host, accepted) = serve_script(&["", "OK"]).await;
        let mut transport = HttpTransport::new(host, &fast_settings()).unwrap();

        let response = transport
            .send("PING", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response, "OK");
        assert_eq!(accepted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded_by_retries() {
        let (host, accepted) = serve_script(&[]).await;
        let settings = NetworkSettings {
            retries: 2,
            ..fast_settings()
        };
        let mut transport = HttpTransport::new(host, &settings).unwrap();

        let err = transport
            .send("PING", Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::TransportFailure { .. }));
        assert_eq!(accepted.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_err_body_is_not_retried() {
        let (host, accepted) = serve_script(&["ERR bad index", "OK"]).await;
        let mut transport = HttpTransport::new(host, &fast_settings()).unwrap();

        let response = transport
            .send("SET 99 0 0 0", Duration::from_secs(2))
            .await
            .unwrap();

        assert_eq!(response, "ERR bad index");
        assert_eq!(accepted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_closed_transport_is_not_connected() {
        let mut transport = HttpTransport::new("10.0.0.7", &fast_settings()).unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(transport.identity(), "");
        let err = transport
            .send("PING", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }
}

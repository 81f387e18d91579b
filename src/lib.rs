//! ledlink Library
//!
//! Command-line front end over the controller link layer.

pub mod cli;

use serde::Serialize;

use ledlink_app::{execute, Action, Report};
use ledlink_core::prelude::*;
use ledlink_device::{ConnectOutcome, Connector, LinkController, PortInfo};

pub use cli::{Args, Command, Invocation};

/// Everything one invocation printed
#[derive(Debug, Clone, Serialize)]
pub struct Output {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectOutcome>,
    #[serde(flatten)]
    pub report: Report,
}

impl Output {
    /// Text or pretty JSON
    pub fn render(&self, json: bool) -> Result<String> {
        if json {
            return Ok(serde_json::to_string_pretty(self)?);
        }
        Ok(self.report.to_string())
    }
}

/// Port listing; needs no connection
pub fn ports_output(ports: Vec<PortInfo>) -> Output {
    Output {
        connection: None,
        report: Report::Ports { ports },
    }
}

/// Connect, run one action, disconnect.
///
/// The link is closed even when the action fails; the action's error wins.
pub async fn run_action<C: Connector>(
    link: &LinkController<C>,
    invocation: &Invocation,
    action: Action,
) -> Result<Output> {
    let outcome = link
        .connect(invocation.transport, invocation.endpoint.as_deref())
        .await
        .with_context(|| format!("Failed to connect over {}", invocation.transport))?;
    if let Some(warning) = &outcome.warning {
        warn!("{}", warning);
    }

    let result = execute(link, action, invocation.order).await;

    if let Err(e) = link.disconnect().await {
        warn!("Failed to close link: {}", e);
    }

    Ok(Output {
        connection: Some(outcome),
        report: result?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_output_json_is_flat() {
        let output = ports_output(vec![PortInfo::new("/dev/ttyUSB0", "CP2102")]);

        let json: serde_json::Value = serde_json::from_str(&output.render(true).unwrap()).unwrap();
        assert_eq!(json["result"], "ports");
        assert_eq!(json["ports"][0]["device"], "/dev/ttyUSB0");
        assert!(json.get("connection").is_none());
    }

    #[test]
    fn test_text_output() {
        let output = Output {
            connection: None,
            report: Report::Done { action: "clear" },
        };
        assert_eq!(output.render(false).unwrap(), "clear: OK");
    }
}

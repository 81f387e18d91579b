//! ledlink - Drive an LED strip controller over USB serial or Wi-Fi
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;

use ledlink::{ports_output, run_action, Args, Command};
use ledlink_app::{init_config_dir, load_settings};
use ledlink_device::LinkController;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if let Err(e) = ledlink_core::logging::init() {
        eprintln!("File logging disabled: {}", e);
    }

    let project_path = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    if args.command == Command::Init {
        init_config_dir(&project_path)?;
        println!("Wrote {}", project_path.join(".ledlink/config.toml").display());
        return Ok(());
    }

    let settings = load_settings(&project_path);
    let invocation = args.resolve(&settings);

    let output = match args.command.to_action()? {
        None => ports_output(ledlink_device::list_ports()?),
        Some(action) => {
            let link = LinkController::for_hardware(settings.link_settings());
            match run_action(&link, &invocation, action).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!("Command failed: {}", e);
                    eprintln!(
                        "Logs: {}",
                        ledlink_core::logging::log_directory().display()
                    );
                    return Err(match e.hint() {
                        Some(hint) => eyre!("{}\nHint: {}", e, hint),
                        None => eyre!(e),
                    });
                }
            }
        }
    };

    if let Some(warning) = output.connection.as_ref().and_then(|c| c.warning.as_ref()) {
        eprintln!("Warning: {}", warning);
    }
    println!("{}", output.render(invocation.json)?);
    Ok(())
}

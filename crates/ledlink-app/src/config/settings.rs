//! Settings parser for .ledlink/config.toml

use std::path::Path;

use ledlink_core::prelude::*;

use super::types::Settings;
use crate::color::ColorOrder;

const CONFIG_FILENAME: &str = "config.toml";
const LEDLINK_DIR: &str = ".ledlink";

/// Serial device path override
pub const ENV_PORT: &str = "LED_PORT";
/// Wi-Fi host override
pub const ENV_WIFI_HOST: &str = "LED_WIFI_HOST";
/// Channel order override
pub const ENV_COLOR_ORDER: &str = "LED_COLOR_ORDER";

/// Load settings from .ledlink/config.toml, then apply environment overrides
pub fn load_settings(project_path: &Path) -> Settings {
    let mut settings = load_settings_file(project_path);
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings
}

/// Load settings from .ledlink/config.toml only
///
/// A missing, unreadable or malformed file yields defaults.
pub fn load_settings_file(project_path: &Path) -> Settings {
    let config_path = project_path.join(LEDLINK_DIR).join(CONFIG_FILENAME);

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Settings::default();
    }

    match std::fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(settings) => {
                debug!("Loaded settings from {:?}", config_path);
                settings
            }
            Err(e) => {
                warn!("Failed to parse {:?}: {}", config_path, e);
                Settings::default()
            }
        },
        Err(e) => {
            warn!("Failed to read {:?}: {}", config_path, e);
            Settings::default()
        }
    }
}

/// Overlay `LED_PORT`, `LED_WIFI_HOST` and `LED_COLOR_ORDER`.
///
/// Empty values are ignored. An unknown color order is logged and falls back
/// to the default order.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| {
        lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    if let Some(port) = var(ENV_PORT) {
        debug!("{} overrides serial port: {}", ENV_PORT, port);
        settings.serial.port = Some(port);
    }

    if let Some(host) = var(ENV_WIFI_HOST) {
        debug!("{} overrides Wi-Fi host: {}", ENV_WIFI_HOST, host);
        settings.network.host = Some(host);
    }

    if let Some(order) = var(ENV_COLOR_ORDER) {
        settings.link.color_order = match order.parse::<ColorOrder>() {
            Ok(order) => order,
            Err(e) => {
                warn!("Ignoring {}: {}", ENV_COLOR_ORDER, e);
                ColorOrder::default()
            }
        };
    }
}

/// Create default config file in .ledlink/ directory
pub fn init_config_dir(project_path: &Path) -> Result<()> {
    let ledlink_dir = project_path.join(LEDLINK_DIR);

    if !ledlink_dir.exists() {
        std::fs::create_dir_all(&ledlink_dir)
            .map_err(|e| Error::config(format!("Failed to create .ledlink dir: {}", e)))?;
    }

    let config_path = ledlink_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let default_content = r#"# ledlink configuration
# Environment overrides: LED_PORT, LED_WIFI_HOST, LED_COLOR_ORDER

[link]
transport = "serial"        # "serial" or "wifi"
bulk_frame_threshold = 16   # Changed LEDs at which one FRAME replaces SETN + SHOW
color_order = "brg"         # rgb, rbg, grb, gbr, brg, bgr

[serial]
# port = "/dev/cu.usbserial-10"   # Leave unset to auto-detect
baud_rate = 115200
read_timeout_ms = 300
line_settle_ms = 100
boot_delay_ms = 2500        # Opening the port resets the board
ready_timeout_ms = 2000
command_timeout_ms = 6000

[network]
# host = "192.168.1.120"
request_timeout_ms = 3500
retries = 1
retry_delay_ms = 50

[output]
json = false
"#;
        std::fs::write(&config_path, default_content)
            .map_err(|e| Error::config(format!("Failed to write config.toml: {}", e)))?;
        info!("Wrote default config to {:?}", config_path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledlink_core::TransportKind;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_settings_defaults() {
        let temp = tempdir().unwrap();
        let settings = load_settings_file(temp.path());
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings_custom() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".ledlink");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            r#"
[link]
transport = "wifi"
color_order = "rgb"

[network]
host = "10.0.0.5"
"#,
        )
        .unwrap();

        let settings = load_settings_file(temp.path());
        assert_eq!(settings.link.transport, TransportKind::Wifi);
        assert_eq!(settings.link.color_order, ColorOrder::Rgb);
        assert_eq!(settings.network.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(settings.network.retries, 1);
    }

    #[test]
    fn test_load_settings_invalid_toml() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".ledlink");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[link\ntransport = ").unwrap();

        assert_eq!(load_settings_file(temp.path()), Settings::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        apply_env_overrides(
            &mut settings,
            env(&[
                ("LED_PORT", "/dev/ttyACM0"),
                ("LED_WIFI_HOST", " 192.168.4.1 "),
                ("LED_COLOR_ORDER", "GRB"),
            ]),
        );

        assert_eq!(settings.serial.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(settings.network.host.as_deref(), Some("192.168.4.1"));
        assert_eq!(settings.link.color_order, ColorOrder::Grb);
    }

    #[test]
    fn test_env_overrides_ignore_empty_and_bad_values() {
        let mut settings = Settings::default();
        settings.serial.port = Some("/dev/ttyUSB0".to_string());
        settings.link.color_order = ColorOrder::Rgb;

        apply_env_overrides(
            &mut settings,
            env(&[("LED_PORT", "  "), ("LED_COLOR_ORDER", "purple")]),
        );

        assert_eq!(settings.serial.port.as_deref(), Some("/dev/ttyUSB0"));
        assert_eq!(settings.link.color_order, ColorOrder::Brg);
    }

    #[test]
    fn test_init_config_dir() {
        let temp = tempdir().unwrap();
        init_config_dir(temp.path()).unwrap();

        let path = temp.path().join(".ledlink").join("config.toml");
        assert!(path.exists());

        // The commented default file parses back to defaults
        assert_eq!(load_settings_file(temp.path()), Settings::default());
    }

    #[test]
    fn test_init_config_dir_idempotent() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join(".ledlink");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[output]\njson = true\n").unwrap();

        init_config_dir(temp.path()).unwrap();

        assert!(load_settings_file(temp.path()).output.json);
    }
}

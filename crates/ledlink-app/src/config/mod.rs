//! Configuration file parsing for ledlink
//!
//! Supports:
//! - `.ledlink/config.toml` - Global settings
//! - `LED_PORT`, `LED_WIFI_HOST`, `LED_COLOR_ORDER` - Environment overrides

pub mod settings;
pub mod types;

pub use settings::{
    apply_env_overrides, init_config_dir, load_settings, load_settings_file, ENV_COLOR_ORDER,
    ENV_PORT, ENV_WIFI_HOST,
};
pub use types::*;

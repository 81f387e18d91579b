//! # ledlink-app - Configuration and Actions
//!
//! Loads `.ledlink/config.toml`, maps user intents to link operations and
//! reorders colors for the strip's channel wiring.
//!
//! ## Public API
//!
//! - [`Settings`], [`load_settings`], [`init_config_dir`] - Configuration
//! - [`Action`], [`Report`], [`execute`] - One user intent against a link
//! - [`ColorOrder`] - Channel reordering for wiring variants
//! - [`parse_frame_arg`] - Frames from hex, JSON or files

pub mod actions;
pub mod color;
pub mod config;
pub mod frame;

pub use actions::{execute, Action, Report, DEMO_STEP};
pub use color::ColorOrder;
pub use config::{init_config_dir, load_settings, Settings};
pub use frame::{parse_frame_arg, parse_frame_text};

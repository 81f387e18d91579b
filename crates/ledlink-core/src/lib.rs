//! # ledlink-core - Core Domain Types
//!
//! Foundation crate for ledlink. Provides the domain types spoken by the LED
//! controller link, the error taxonomy, and logging bootstrap.
//!
//! ## Public API
//!
//! ### Domain Types (`types`)
//! - [`Rgb`] - A pixel color in firmware channel order
//! - [`DeviceInfo`] - Best-effort parse of an `INFO` response
//! - [`TransportKind`] - Serial or Wi-Fi (HTTP) medium
//! - [`TimeoutDiagnostics`] - Wire evidence attached to timeout errors
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Error enum with per-call `recoverable` classification and hints
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! ```rust
//! use ledlink_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod types;

/// Prelude for common imports used throughout all ledlink crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use types::{DeviceInfo, Rgb, TimeoutDiagnostics, TransportKind};

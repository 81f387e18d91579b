//! Channel order of the strip's wiring
//!
//! Strips disagree on which data byte drives which die. Colors are written in
//! plain RGB by callers and reordered here before they reach the link.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ledlink_core::prelude::*;
use ledlink_core::Rgb;

/// Which source channel feeds each of the three bytes sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorOrder {
    Rgb,
    Rbg,
    Grb,
    Gbr,
    #[default]
    Brg,
    Bgr,
}

impl ColorOrder {
    pub const ALL: [ColorOrder; 6] = [
        ColorOrder::Rgb,
        ColorOrder::Rbg,
        ColorOrder::Grb,
        ColorOrder::Gbr,
        ColorOrder::Brg,
        ColorOrder::Bgr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColorOrder::Rgb => "rgb",
            ColorOrder::Rbg => "rbg",
            ColorOrder::Grb => "grb",
            ColorOrder::Gbr => "gbr",
            ColorOrder::Brg => "brg",
            ColorOrder::Bgr => "bgr",
        }
    }

    /// Source channel index (0 = r, 1 = g, 2 = b) for each device byte
    fn indices(&self) -> [usize; 3] {
        match self {
            ColorOrder::Rgb => [0, 1, 2],
            ColorOrder::Rbg => [0, 2, 1],
            ColorOrder::Grb => [1, 0, 2],
            ColorOrder::Gbr => [1, 2, 0],
            ColorOrder::Brg => [2, 0, 1],
            ColorOrder::Bgr => [2, 1, 0],
        }
    }

    /// Reorder one color into device byte order
    pub fn apply(&self, color: Rgb) -> Rgb {
        let channels = [color.r, color.g, color.b];
        let [a, b, c] = self.indices();
        Rgb::new(channels[a], channels[b], channels[c])
    }

    pub fn apply_all(&self, colors: &[Rgb]) -> Vec<Rgb> {
        colors.iter().map(|c| self.apply(*c)).collect()
    }
}

impl fmt::Display for ColorOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ColorOrder::ALL
            .into_iter()
            .find(|order| order.as_str() == wanted)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "unknown color order {:?} (expected one of rgb, rbg, grb, gbr, brg, bgr)",
                    s
                ))
            })
    }
}

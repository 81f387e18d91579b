//! What the strip is believed to display
//!
//! The cache is either unknown or holds the last frame confirmed written.
//! Anything that might have left the device in a half-written state makes it
//! unknown again.

use ledlink_core::Rgb;

/// Host-side copy of the LED colors currently live on the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowFrame {
    pixels: Option<Vec<Rgb>>,
}

impl ShadowFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.pixels.is_some()
    }

    pub fn pixels(&self) -> Option<&[Rgb]> {
        self.pixels.as_deref()
    }

    /// Indices of `frame` that differ from the cache.
    ///
    /// An unknown cache, or one of a different length, reports every index.
    pub fn changed_indices(&self, frame: &[Rgb]) -> Vec<usize> {
        match &self.pixels {
            Some(current) if current.len() == frame.len() => frame
                .iter()
                .zip(current)
                .enumerate()
                .filter(|(_, (new, old))| new != old)
                .map(|(i, _)| i)
                .collect(),
            _ => (0..frame.len()).collect(),
        }
    }

    /// Remember `frame` as the live content
    pub fn replace(&mut self, frame: &[Rgb]) {
        self.pixels = Some(frame.to_vec());
    }

    /// Record a single confirmed pixel write.
    ///
    /// An index past the cached length means the cache was wrong about the
    /// strip, so it is dropped.
    pub fn record_pixel(&mut self, index: usize, color: Rgb) {
        if let Some(pixels) = &mut self.pixels {
            match pixels.get_mut(index) {
                Some(slot) => *slot = color,
                None => self.pixels = None,
            }
        }
    }

    /// Record a uniform write (`FILL` or `CLEAR`).
    ///
    /// An unknown cache becomes known only when the LED count is.
    pub fn fill(&mut self, color: Rgb, num_leds: Option<usize>) {
        let len = match (&self.pixels, num_leds) {
            (Some(pixels), _) => pixels.len(),
            (None, Some(n)) => n,
            (None, None) => return,
        };
        self.pixels = Some(vec![color; len]);
    }

    pub fn invalidate(&mut self) {
        self.pixels = None;
    }
}

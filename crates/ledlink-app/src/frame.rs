//! Frame sources for the command line
//!
//! A frame is given inline as `FRAME` hex, or as `@path` naming a file that
//! holds either hex or a JSON array of `[r, g, b]` triples.

use std::path::Path;

use ledlink_core::prelude::*;
use ledlink_core::Rgb;
use ledlink_device::decode_frame_hex;

/// Parse a frame argument (`<hex>` or `@<file>`)
pub fn parse_frame_arg(arg: &str) -> Result<Vec<Rgb>> {
    match arg.trim().strip_prefix('@') {
        Some(path) => load_frame_file(Path::new(path)),
        None => parse_frame_text(arg),
    }
}

pub fn load_frame_file(path: &Path) -> Result<Vec<Rgb>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::invalid_argument(format!("Failed to read frame file {:?}: {}", path, e))
    })?;
    debug!("Loaded frame file {:?} ({} bytes)", path, content.len());
    parse_frame_text(&content)
}

/// Hex (whitespace allowed anywhere) or a JSON array of triples
pub fn parse_frame_text(text: &str) -> Result<Vec<Rgb>> {
    let text = text.trim();
    if text.starts_with('[') {
        let triples: Vec<Vec<i64>> = serde_json::from_str(text)?;
        return triples
            .iter()
            .enumerate()
            .map(|(i, triple)| triple_to_rgb(i, triple))
            .collect();
    }

    let hex: String = text.split_whitespace().collect();
    decode_frame_hex(&hex)
}

fn triple_to_rgb(index: usize, triple: &[i64]) -> Result<Rgb> {
    let channel = |v: i64| {
        u8::try_from(v).map_err(|_| {
            Error::invalid_argument(format!(
                "LED {}: channel value {} outside 0-255",
                index, v
            ))
        })
    };
    match triple {
        [r, g, b] => Ok(Rgb::new(channel(*r)?, channel(*g)?, channel(*b)?)),
        _ => Err(Error::invalid_argument(format!(
            "LED {}: expected [r, g, b], got {} values",
            index,
            triple.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_inline_hex() {
        let frame = parse_frame_arg("FF0000 00ff00").unwrap();
        assert_eq!(frame, vec![Rgb::new(255, 0, 0), Rgb::new(0, 255, 0)]);
    }

    #[test]
    fn test_json_triples() {
        let frame = parse_frame_text("[[1, 2, 3], [255, 255, 255]]").unwrap();
        assert_eq!(frame, vec![Rgb::new(1, 2, 3), Rgb::new(255, 255, 255)]);
    }

    #[test]
    fn test_json_rejects_bad_triples() {
        assert!(parse_frame_text("[[1, 2]]").is_err());
        assert!(parse_frame_text("[[1, 2, 300]]").is_err());
        assert!(matches!(parse_frame_text("[[1, 2,"), Err(Error::Json(_))));
    }

    #[test]
    fn test_frame_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("frame.hex");
        std::fs::write(&path, "0000FF\n0000FF\n").unwrap();

        let frame = parse_frame_arg(&format!("@{}", path.display())).unwrap();
        assert_eq!(frame, vec![Rgb::new(0, 0, 255); 2]);
    }

    #[test]
    fn test_missing_frame_file() {
        let err = parse_frame_arg("@/nonexistent/frame.hex").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}

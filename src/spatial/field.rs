//! Load numeric fields from plain-text matrices
//!
//! Format: one row per line, values separated by whitespace. Blank lines
//! and anything after `#` are ignored. Row `y`, column `x` becomes the
//! value at cell `(x, y)`, so a `width x height` grid needs `height` rows of
//! `width` values.

use std::path::Path;

use crate::core::error::{Result, SimError};
use crate::spatial::layer::PropertyLayer;

/// Classic capacity ceiling for generated landscapes
pub const DEFAULT_PEAK_CAPACITY: f64 = 4.0;

/// Parse a matrix without checking its overall shape
pub fn parse_matrix(content: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    for (i, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| SimError::FieldParse {
                    line: i + 1,
                    token: token.to_string(),
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a matrix and require exactly `height` rows of `width` values
pub fn field_from_str(name: &str, content: &str, width: usize, height: usize) -> Result<PropertyLayer> {
    let rows = parse_matrix(content)?;
    let columns = rows.first().map_or(0, Vec::len);
    let ragged = rows.iter().find(|r| r.len() != width).map(Vec::len);

    if rows.len() != height || columns != width || ragged.is_some() {
        return Err(SimError::DimensionMismatch {
            context: format!("field {}", name),
            expected: (height, width),
            found: (rows.len(), ragged.unwrap_or(columns)),
        });
    }
    PropertyLayer::from_rows(name, rows)
}

/// Load a field file from disk
pub fn load_field(name: &str, path: &Path, width: usize, height: usize) -> Result<PropertyLayer> {
    let content = std::fs::read_to_string(path)?;
    let layer = field_from_str(name, &content, width, height)?;
    tracing::info!(
        "Loaded field {} ({}x{}) from {}",
        name,
        width,
        height,
        path.display()
    );
    Ok(layer)
}

/// Two-hill capacity landscape
///
/// Peaks sit at 30%/70% of each axis. Capacity falls by one unit per ring of
/// width `min(width, height) / 10` (at least one cell) and bottoms out at 0.
pub fn two_peaks(name: &str, width: usize, height: usize, peak: f64) -> PropertyLayer {
    let peaks = [
        (width as f64 * 0.3, height as f64 * 0.7),
        (width as f64 * 0.7, height as f64 * 0.3),
    ];
    let ring = (width.min(height) as f64 / 10.0).max(1.0);

    PropertyLayer::from_fn(name, width, height, |pos| {
        let d = peaks
            .iter()
            .map(|&(px, py)| ((pos.x as f64 - px).powi(2) + (pos.y as f64 - py).powi(2)).sqrt())
            .fold(f64::INFINITY, f64::min);
        (peak - (d / ring).floor()).max(0.0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pos;

    #[test]
    fn test_parse_with_comments_and_blank_lines() {
        let text = "# capacity map\n1 2 3\n\n4 5.5 6  # trailing\n";
        let layer = field_from_str("sugar", text, 3, 2).unwrap();
        assert_eq!(layer.get(Pos::new(1, 1)).unwrap(), 5.5);
        assert_eq!(layer.get(Pos::new(2, 0)).unwrap(), 3.0);
    }

    #[test]
    fn test_shape_mismatch_is_fatal() {
        let text = "1 2 3\n4 5 6\n";
        let err = field_from_str("sugar", text, 2, 3).unwrap_err();
        match err {
            SimError::DimensionMismatch { expected, found, .. } => {
                assert_eq!(expected, (3, 2));
                assert_eq!(found, (2, 3));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_ragged_row_is_mismatch() {
        let text = "1 2 3\n4 5\n";
        assert!(matches!(
            field_from_str("sugar", text, 3, 2),
            Err(SimError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_bad_token() {
        let err = field_from_str("sugar", "1 2\n3 x\n", 2, 2).unwrap_err();
        match err {
            SimError::FieldParse { line, token } => {
                assert_eq!(line, 2);
                assert_eq!(token, "x");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_two_peaks_shape_and_range() {
        let layer = two_peaks("capacity", 50, 40, DEFAULT_PEAK_CAPACITY);
        assert_eq!(layer.shape(), (40, 50));
        assert_eq!(layer.max(), Some(DEFAULT_PEAK_CAPACITY));
        assert!(layer.iter().all(|(_, v)| (0.0..=DEFAULT_PEAK_CAPACITY).contains(&v)));
        assert_eq!(layer.get(Pos::new(15, 28)).unwrap(), DEFAULT_PEAK_CAPACITY);
    }
}

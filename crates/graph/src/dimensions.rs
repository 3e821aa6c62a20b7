//! Matrix dimension metadata.
//!
//! Dimensions are informational: partitioning works from the edges alone.
//! [`check_dimensions`] is an optional pre-check layered on top.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder stored when a file carries no size line.
pub const UNKNOWN_DIMENSIONS: &str = "unknown";

const BANNER: &str = "%%MatrixMarket";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub rows: u32,
    pub cols: u32,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    #[error("malformed dimensions '{0}': expected RxC or R:C")]
    Malformed(String),

    #[error("dimension mismatch: {rows} rows vs {cols} columns")]
    NotSquare { rows: u32, cols: u32 },

    #[error("node {node} exceeds declared size {rows}")]
    NodeOutOfBounds { node: u32, rows: u32 },
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

impl FromStr for Dimensions {
    type Err = DimensionError;

    /// Accepts both `RxC` and `R:C`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (r, c) = trimmed
            .split_once('x')
            .or_else(|| trimmed.split_once(':'))
            .ok_or_else(|| DimensionError::Malformed(s.to_string()))?;
        let rows = r.trim().parse().map_err(|_| DimensionError::Malformed(s.to_string()))?;
        let cols = c.trim().parse().map_err(|_| DimensionError::Malformed(s.to_string()))?;
        Ok(Self { rows, cols })
    }
}

impl Dimensions {
    /// Read `rows cols` from the leading tokens of a size line.
    pub fn from_size_line(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let rows = tokens.next()?.parse().ok()?;
        let cols = tokens.next()?.parse().ok()?;
        Some(Self { rows, cols })
    }
}

pub(crate) fn has_banner(line: &str) -> bool {
    line.trim_start().starts_with(BANNER)
}

/// Size declared after a `%%MatrixMarket` banner, if any.
pub fn banner_dimensions(content: &str) -> Option<Dimensions> {
    let mut lines = content.lines();
    lines.find(|l| has_banner(l))?;
    let size_line = lines.find(|l| {
        let t = l.trim_start();
        !t.is_empty() && !t.starts_with('%')
    })?;
    Dimensions::from_size_line(size_line)
}

/// Dimension string stored with a job: `RxC`, or `unknown`.
pub fn parse_dimensions(content: &str) -> String {
    banner_dimensions(content)
        .map(|d| d.to_string())
        .unwrap_or_else(|| UNKNOWN_DIMENSIONS.to_string())
}

/// Validate stored metadata against the parsed graph.
///
/// `unknown` passes, since there is nothing to compare against.
pub fn check_dimensions(stored: &str, max_node: u32) -> Result<(), DimensionError> {
    if stored.trim() == UNKNOWN_DIMENSIONS {
        return Ok(());
    }
    let dims: Dimensions = stored.parse()?;
    if dims.rows != dims.cols {
        return Err(DimensionError::NotSquare { rows: dims.rows, cols: dims.cols });
    }
    if max_node > dims.rows {
        return Err(DimensionError::NodeOutOfBounds { node: max_node, rows: dims.rows });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MTX: &str = "%%MatrixMarket matrix coordinate pattern symmetric\n% comment\n5 5 3\n1 2\n2 3\n4 5\n";

    #[test]
    fn test_parse_dimensions_after_banner() {
        assert_eq!(parse_dimensions(MTX), "5x5");
    }

    #[test]
    fn test_parse_dimensions_without_banner() {
        assert_eq!(parse_dimensions("1 2\n2 3\n"), UNKNOWN_DIMENSIONS);
        assert_eq!(parse_dimensions("%%MatrixMarket matrix\n% only comments\n"), UNKNOWN_DIMENSIONS);
    }

    #[test]
    fn test_both_separators_accepted() {
        assert_eq!("4x6".parse::<Dimensions>().unwrap(), Dimensions { rows: 4, cols: 6 });
        assert_eq!("4:6".parse::<Dimensions>().unwrap(), Dimensions { rows: 4, cols: 6 });
        assert!(matches!("4-6".parse::<Dimensions>(), Err(DimensionError::Malformed(_))));
    }

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions("5x5", 5).is_ok());
        assert!(check_dimensions("5:5", 3).is_ok());
        assert!(check_dimensions(UNKNOWN_DIMENSIONS, 99).is_ok());
        assert_eq!(
            check_dimensions("5x4", 2),
            Err(DimensionError::NotSquare { rows: 5, cols: 4 })
        );
        assert_eq!(
            check_dimensions("3x3", 7),
            Err(DimensionError::NodeOutOfBounds { node: 7, rows: 3 })
        );
    }
}

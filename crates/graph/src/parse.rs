//! Edge-list parsing.
//!
//! Accepts plain `from to` lines and MatrixMarket coordinate files. Lines
//! starting with `%` are comments. After a `%%MatrixMarket` banner the first
//! non-comment line is the size line and is not an edge.

use thiserror::Error;

use crate::dimensions::{has_banner, Dimensions};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected at least two node ids")]
    MissingColumn { line: usize },

    #[error("line {line}: '{token}' is not a node id")]
    InvalidNode { line: usize, token: String },

    #[error("line {line}: node ids are 1-based, got {value}")]
    NonPositiveNode { line: usize, value: i64 },

    #[error("line {line}: malformed MatrixMarket size line")]
    InvalidSizeLine { line: usize },
}

/// Parsed edges plus what the file declared about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeList {
    /// Edges in file order, self-loops removed.
    pub edges: Vec<(u32, u32)>,
    /// Highest node id seen, self-loops included.
    pub max_node: u32,
    /// Size line of a MatrixMarket file.
    pub declared: Option<Dimensions>,
    /// Number of self-loop lines that were ignored.
    pub self_loops: usize,
}

impl EdgeList {
    /// Nodes the graph must cover: the declared rows or the highest id seen.
    pub fn node_count(&self) -> u32 {
        let declared = self.declared.map(|d| d.rows).unwrap_or(0);
        self.max_node.max(declared)
    }
}

fn parse_node(token: &str, line: usize) -> Result<u32, ParseError> {
    let value: i64 = token.parse().map_err(|_| ParseError::InvalidNode {
        line,
        token: token.to_string(),
    })?;
    if value <= 0 {
        return Err(ParseError::NonPositiveNode { line, value });
    }
    u32::try_from(value).map_err(|_| ParseError::InvalidNode {
        line,
        token: token.to_string(),
    })
}

pub fn parse_edges(content: &str) -> Result<EdgeList, ParseError> {
    let mut list = EdgeList::default();
    let mut expect_size_line = false;

    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('%') {
            if has_banner(line) && list.edges.is_empty() && list.declared.is_none() {
                expect_size_line = true;
            }
            continue;
        }
        if expect_size_line {
            expect_size_line = false;
            let dims = Dimensions::from_size_line(line)
                .ok_or(ParseError::InvalidSizeLine { line: line_no })?;
            list.declared = Some(dims);
            continue;
        }

        let mut tokens = line.split_whitespace();
        let (from, to) = match (tokens.next(), tokens.next()) {
            (Some(a), Some(b)) => (parse_node(a, line_no)?, parse_node(b, line_no)?),
            _ => return Err(ParseError::MissingColumn { line: line_no }),
        };
        list.max_node = list.max_node.max(from).max(to);
        if from == to {
            list.self_loops += 1;
            continue;
        }
        list.edges.push((from, to));
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_edge_list() {
        let list = parse_edges("1 2\n2 3\n\n4 5\n").unwrap();
        assert_eq!(list.edges, vec![(1, 2), (2, 3), (4, 5)]);
        assert_eq!(list.max_node, 5);
        assert_eq!(list.declared, None);
    }

    #[test]
    fn test_matrix_market_size_line_is_not_an_edge() {
        let content = "%%MatrixMarket matrix coordinate real general\n% generated\n6 6 2\n1 2 0.5\n3 4 1.0\n";
        let list = parse_edges(content).unwrap();
        assert_eq!(list.edges, vec![(1, 2), (3, 4)]);
        assert_eq!(list.declared, Some(Dimensions { rows: 6, cols: 6 }));
        assert_eq!(list.node_count(), 6);
    }

    #[test]
    fn test_self_loop_is_ignored() {
        let list = parse_edges("1 2\n2 2\n").unwrap();
        assert_eq!(list.edges, vec![(1, 2)]);
        assert_eq!(list.self_loops, 1);
        assert_eq!(list.max_node, 2);
    }

    #[test]
    fn test_crlf_line_endings() {
        let list = parse_edges("1 2\r\n2 3\r\n").unwrap();
        assert_eq!(list.edges, vec![(1, 2), (2, 3)]);
    }

    #[test]
    fn test_single_column_is_rejected() {
        assert_eq!(parse_edges("1 2\n3\n"), Err(ParseError::MissingColumn { line: 2 }));
    }

    #[test]
    fn test_zero_and_negative_ids_are_rejected() {
        assert_eq!(
            parse_edges("0 1\n"),
            Err(ParseError::NonPositiveNode { line: 1, value: 0 })
        );
        assert_eq!(
            parse_edges("% c\n1 -4\n"),
            Err(ParseError::NonPositiveNode { line: 2, value: -4 })
        );
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(matches!(
            parse_edges("1 two\n"),
            Err(ParseError::InvalidNode { line: 1, .. })
        ));
    }

    #[test]
    fn test_bad_size_line() {
        assert_eq!(
            parse_edges("%%MatrixMarket matrix\nrows cols\n1 2\n"),
            Err(ParseError::InvalidSizeLine { line: 2 })
        );
    }
}

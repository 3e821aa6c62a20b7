use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dimensions::{check_dimensions, DimensionError};
use crate::encode::{encode, EncodedComponent};
use crate::parse::{parse_edges, ParseError};
use crate::partition::{Graph, GraphError};

/// Knobs for turning a job's content into tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionOptions {
    /// Components with fewer nodes are not scheduled. 1 keeps everything.
    #[serde(default = "default_min_component_size")]
    pub min_component_size: usize,
    /// Run the dimension pre-check before partitioning.
    #[serde(default)]
    pub check_dimensions: bool,
    /// Refuse graphs larger than this many nodes.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: u32,
}

fn default_min_component_size() -> usize { 1 }
fn default_max_nodes() -> u32 { 1_000_000 }

impl Default for PartitionOptions {
    fn default() -> Self {
        Self {
            min_component_size: default_min_component_size(),
            check_dimensions: false,
            max_nodes: default_max_nodes(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecomposeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Dimensions(#[from] DimensionError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("graph has {count} nodes, limit is {limit}")]
    TooManyNodes { count: u32, limit: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub node_count: u32,
    pub edge_count: usize,
    pub components: Vec<EncodedComponent>,
    /// Nodes left out by `min_component_size`.
    pub skipped_nodes: usize,
}

/// Parse `content` and split it into encoded components.
///
/// `dimensions` is the metadata stored with the job; it is only consulted
/// when `options.check_dimensions` is set.
pub fn decompose(
    content: &str,
    dimensions: &str,
    options: &PartitionOptions,
) -> Result<Decomposition, DecomposeError> {
    let list = parse_edges(content)?;
    if options.check_dimensions {
        check_dimensions(dimensions, list.max_node)?;
    }

    let node_count = list.node_count();
    let limit = options.max_nodes.min(i32::MAX as u32);
    if node_count > limit {
        return Err(DecomposeError::TooManyNodes { count: node_count, limit });
    }

    let mut graph = Graph::new(node_count);
    for &(from, to) in &list.edges {
        graph.add_edge(from, to)?;
    }
    let edge_count = graph.edge_count();

    let mut components = Vec::new();
    let mut skipped_nodes = 0;
    for component in graph.by_ref() {
        if component.len() < options.min_component_size {
            skipped_nodes += component.len();
            continue;
        }
        components.push(encode(&component)?);
    }

    if skipped_nodes > 0 {
        warn!(
            skipped_nodes,
            min_component_size = options.min_component_size,
            "partition: nodes in small components were not scheduled"
        );
    }
    debug!(node_count, edge_count, components = components.len(), "partition: graph decomposed");

    Ok(Decomposition {
        node_count,
        edge_count,
        components,
        skipped_nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::decode_edges;

    #[test]
    fn test_decompose_scenario() {
        let d = decompose("1 2\n2 3\n4 5\n", "unknown", &PartitionOptions::default()).unwrap();
        assert_eq!(d.node_count, 5);
        assert_eq!(d.components.len(), 2);
        assert_eq!(
            decode_edges(&d.components[0].mapping, &d.components[0].edges).unwrap(),
            vec![(1, 2), (2, 3)]
        );
        assert_eq!(d.components[1].mapping, vec![4, 5]);
    }

    #[test]
    fn test_declared_rows_add_isolated_nodes() {
        let content = "%%MatrixMarket matrix coordinate pattern general\n4 4 1\n1 2\n";
        let d = decompose(content, "4x4", &PartitionOptions::default()).unwrap();
        let sizes: Vec<_> = d.components.iter().map(|c| c.node_count).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
    }

    #[test]
    fn test_min_component_size_reports_skipped_nodes() {
        let options = PartitionOptions { min_component_size: 2, ..Default::default() };
        let d = decompose("1 2\n4 4\n", "unknown", &options).unwrap();
        assert_eq!(d.components.len(), 1);
        assert_eq!(d.skipped_nodes, 2);
    }

    #[test]
    fn test_dimension_check_is_opt_in() {
        let mismatched = "3:4";
        assert!(decompose("1 2\n", mismatched, &PartitionOptions::default()).is_ok());

        let strict = PartitionOptions { check_dimensions: true, ..Default::default() };
        assert!(matches!(
            decompose("1 2\n", mismatched, &strict),
            Err(DecomposeError::Dimensions(DimensionError::NotSquare { .. }))
        ));
    }

    #[test]
    fn test_node_limit() {
        let options = PartitionOptions { max_nodes: 10, ..Default::default() };
        assert_eq!(
            decompose("1 11\n", "unknown", &options),
            Err(DecomposeError::TooManyNodes { count: 11, limit: 10 })
        );
    }

    #[test]
    fn test_default_limit_refuses_one_huge_id() {
        assert_eq!(
            decompose("1 10000000\n", "unknown", &PartitionOptions::default()),
            Err(DecomposeError::TooManyNodes { count: 10_000_000, limit: 1_000_000 })
        );
    }

    #[test]
    fn test_empty_content_has_no_components() {
        let d = decompose("% nothing here\n", "unknown", &PartitionOptions::default()).unwrap();
        assert_eq!(d.node_count, 0);
        assert!(d.components.is_empty());
    }

    #[test]
    fn test_parse_error_propagates() {
        assert!(matches!(
            decompose("1\n", "unknown", &PartitionOptions::default()),
            Err(DecomposeError::Parse(ParseError::MissingColumn { line: 1 }))
        ));
    }
}

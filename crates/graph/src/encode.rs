use std::collections::HashMap;

use graphsplit_core::NewTask;
use serde::Serialize;

use crate::partition::{Component, GraphError};

/// A component in local coordinates, ready to persist as a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedComponent {
    pub node_count: i32,
    /// `mapping[i]` is the original id of local node `i`.
    pub mapping: Vec<i32>,
    /// Flat `(parent, child)` pairs of 1-based local indices.
    pub edges: Vec<i32>,
}

fn to_i32(id: u32) -> Result<i32, GraphError> {
    i32::try_from(id).map_err(|_| GraphError::IdOverflow(id))
}

pub fn encode(component: &Component) -> Result<EncodedComponent, GraphError> {
    let mut local: HashMap<u32, i32> = HashMap::with_capacity(component.nodes.len());
    let mut mapping = Vec::with_capacity(component.nodes.len());
    for (i, &node) in component.nodes.iter().enumerate() {
        mapping.push(to_i32(node)?);
        local.insert(node, i as i32 + 1);
    }

    let mut edges = Vec::with_capacity(component.edges.len() * 2);
    for (parent, child) in &component.edges {
        for node in [parent, child] {
            let idx = local.get(node).copied().ok_or(GraphError::NodeOutOfRange {
                node: *node,
                node_count: component.nodes.len() as u32,
            })?;
            edges.push(idx);
        }
    }

    Ok(EncodedComponent {
        node_count: mapping.len() as i32,
        mapping,
        edges,
    })
}

/// Translate local edges back to original node ids.
pub fn decode_edges(mapping: &[i32], edges: &[i32]) -> Result<Vec<(i32, i32)>, GraphError> {
    if edges.len() % 2 != 0 {
        return Err(GraphError::OddEdgeList(edges.len()));
    }
    let lookup = |index: i32| -> Result<i32, GraphError> {
        if index < 1 || index as usize > mapping.len() {
            return Err(GraphError::BadLocalIndex { index, node_count: mapping.len() });
        }
        Ok(mapping[index as usize - 1])
    };
    edges
        .chunks_exact(2)
        .map(|pair| Ok((lookup(pair[0])?, lookup(pair[1])?)))
        .collect()
}

impl From<EncodedComponent> for NewTask {
    fn from(c: EncodedComponent) -> Self {
        NewTask {
            node_count: c.node_count,
            mapping: c.mapping,
            edges: c.edges,
        }
    }
}

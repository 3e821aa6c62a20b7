//! Connected components by depth-first traversal.
//!
//! [`Graph`] hands out components lazily. A scan cursor walks node ids
//! `1..=n` once; every unvisited node it meets seeds one traversal. The
//! sequence is finite and cannot be restarted, and the total work over all
//! calls is O(N + E).

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("node {node} outside 1..={node_count}")]
    NodeOutOfRange { node: u32, node_count: u32 },

    #[error("node id {0} does not fit a stored integer")]
    IdOverflow(u32),

    #[error("local edge index {index} outside 1..={node_count}")]
    BadLocalIndex { index: i32, node_count: usize },

    #[error("edge list has odd length {0}")]
    OddEdgeList(usize),
}

/// A maximal connected set of nodes plus the edges met while traversing it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Component {
    /// Original node ids in discovery order.
    pub nodes: Vec<u32>,
    /// `(parent, child)` pairs in the order first reached.
    pub edges: Vec<(u32, u32)>,
}

impl Component {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Undirected graph over nodes `1..=node_count`.
pub struct Graph {
    node_count: u32,
    /// Only nodes with edges have an entry. Entries are `(neighbor, edge index)`.
    adj: HashMap<u32, Vec<(u32, usize)>>,
    pairs: HashSet<(u32, u32)>,
    recorded: Vec<bool>,
    visited: Vec<bool>,
    cursor: usize,
}

impl Graph {
    pub fn new(node_count: u32) -> Self {
        let slots = node_count as usize + 1;
        Self {
            node_count,
            adj: HashMap::new(),
            pairs: HashSet::new(),
            recorded: Vec::new(),
            visited: vec![false; slots],
            cursor: 1,
        }
    }

    pub fn node_count(&self) -> u32 {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.recorded.len()
    }

    /// Register an undirected edge.
    ///
    /// Returns `Ok(false)` for self-loops and repeats of a known edge, which
    /// leave the graph unchanged.
    pub fn add_edge(&mut self, u: u32, v: u32) -> Result<bool, GraphError> {
        for node in [u, v] {
            if node == 0 || node > self.node_count {
                return Err(GraphError::NodeOutOfRange { node, node_count: self.node_count });
            }
        }
        if u == v {
            return Ok(false);
        }
        if !self.pairs.insert((u.min(v), u.max(v))) {
            return Ok(false);
        }
        let edge = self.recorded.len();
        self.recorded.push(false);
        self.adj.entry(u).or_default().push((v, edge));
        self.adj.entry(v).or_default().push((u, edge));
        Ok(true)
    }

    /// Next component, or `None` once every node has been visited.
    pub fn next_component(&mut self) -> Option<Component> {
        while self.cursor <= self.node_count as usize {
            let start = self.cursor;
            self.cursor += 1;
            if !self.visited[start] {
                return Some(self.traverse(start));
            }
        }
        None
    }

    // Iterative form of the recursive DFS: each frame is (node, next neighbor slot).
    fn traverse(&mut self, start: usize) -> Component {
        let mut component = Component::default();
        self.visited[start] = true;
        component.nodes.push(start as u32);
        let mut stack = vec![(start, 0usize)];

        while let Some(&(v, next)) = stack.last() {
            let Some(&(to, edge)) = self.adj.get(&(v as u32)).and_then(|n| n.get(next)) else {
                stack.pop();
                continue;
            };
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }
            if self.recorded[edge] {
                continue;
            }
            self.recorded[edge] = true;
            component.edges.push((v as u32, to));
            if !self.visited[to as usize] {
                self.visited[to as usize] = true;
                component.nodes.push(to);
                stack.push((to as usize, 0));
            }
        }

        component
    }
}

impl Iterator for Graph {
    type Item = Component;

    fn next(&mut self) -> Option<Component> {
        self.next_component()
    }
}

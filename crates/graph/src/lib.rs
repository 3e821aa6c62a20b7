//! Graph partitioning: edge-list parsing, connected components, and the
//! local encoding stored with each task.

pub mod decompose;
pub mod dimensions;
pub mod encode;
pub mod parse;
pub mod partition;

pub use decompose::{decompose, DecomposeError, Decomposition, PartitionOptions};
pub use dimensions::{check_dimensions, parse_dimensions, DimensionError, Dimensions, UNKNOWN_DIMENSIONS};
pub use encode::{decode_edges, encode, EncodedComponent};
pub use parse::{parse_edges, EdgeList, ParseError};
pub use partition::{Component, Graph, GraphError};

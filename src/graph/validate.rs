//! Graph validation
//!
//! Runs once at load time, before any node executes. A graph that fails any
//! check here is never partially run.
//!
//! Checks:
//! - VEDA-010: node ids unique
//! - VEDA-011: node id format ([A-Za-z0-9_-]+)
//! - VEDA-012: edge endpoints reference existing nodes
//! - VEDA-013: at least one start node
//! - VEDA-014: no unknown node types

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::error::VedaError;

use super::{Graph, NodeType};

static NODE_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid regex"));

/// Validate a graph document. On success the graph is safe to execute.
pub fn validate(graph: &Graph) -> Result<(), VedaError> {
    let mut seen: FxHashSet<&str> = FxHashSet::default();

    for node in &graph.nodes {
        if !NODE_ID_PATTERN.is_match(&node.id) {
            return Err(VedaError::InvalidNodeId {
                id: node.id.clone(),
            });
        }
        if !seen.insert(node.id.as_str()) {
            return Err(VedaError::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
        if node.kind == NodeType::Unknown {
            return Err(VedaError::UnknownNodeType {
                id: node.id.clone(),
            });
        }
    }

    for edge in &graph.edges {
        for endpoint in [&edge.source, &edge.target] {
            if !seen.contains(endpoint.as_str()) {
                return Err(VedaError::EdgeUnknownNode {
                    edge_source: edge.source.clone(),
                    target: edge.target.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
    }

    if graph.start_node().is_none() {
        return Err(VedaError::NoStartNode {
            graph: graph.name.clone(),
        });
    }

    Ok(())
}

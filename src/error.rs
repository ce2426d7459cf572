//! Error types with stable codes and fix suggestions
//!
//! Error code ranges:
//! - VEDA-001-009: Graph document errors (parse, IO)
//! - VEDA-010-019: Graph validation errors (config class)
//! - VEDA-020-029: Execution errors
//! - VEDA-030-039: Tool collaborator errors
//! - VEDA-040-049: LLM collaborator errors
//! - VEDA-050-059: Output persistence errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, VedaError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// A tool collaborator failure.
///
/// Returned by [`ToolInvoker`](crate::tools::ToolInvoker) implementations;
/// the executor folds these into [`VedaError::NodeExecution`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("VEDA-030: Tool '{name}' not found")]
    NotFound { name: String },

    #[error("VEDA-031: Tool '{name}' is disabled")]
    Disabled { name: String },

    #[error("VEDA-032: Tool '{name}' failed: {reason}")]
    Execution { name: String, reason: String },
}

/// An LLM collaborator failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("VEDA-040: Model '{model}' is not available")]
    ModelUnavailable { model: String },

    #[error("VEDA-041: Prompt template '{name}' error: {reason}")]
    Template { name: String, reason: String },

    #[error("VEDA-042: LLM request failed: {reason}")]
    Request { reason: String },
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum VedaError {
    // ═══════════════════════════════════════════
    // GRAPH DOCUMENT ERRORS (001-009)
    // ═══════════════════════════════════════════
    #[error("VEDA-001: Failed to parse graph document: {0}")]
    GraphParse(#[from] serde_json::Error),

    #[error("VEDA-002: IO error: {0}")]
    Io(#[from] std::io::Error),

    // ═══════════════════════════════════════════
    // VALIDATION ERRORS (010-019): config class,
    // detected before any node executes
    // ═══════════════════════════════════════════
    #[error("VEDA-010: Duplicate node id '{id}'")]
    DuplicateNodeId { id: String },

    #[error("VEDA-011: Invalid node id '{id}' (use letters, digits, '_' or '-')")]
    InvalidNodeId { id: String },

    #[error("VEDA-012: Edge '{edge_source}' -> '{target}' references unknown node '{missing}'")]
    EdgeUnknownNode {
        // Named `edge_source` because thiserror reserves a field named
        // `source` for the std::error::Error source chain.
        edge_source: String,
        target: String,
        missing: String,
    },

    #[error("VEDA-013: Graph '{graph}' has no start node")]
    NoStartNode { graph: String },

    #[error("VEDA-014: Node '{id}' has unknown type")]
    UnknownNodeType { id: String },

    // ═══════════════════════════════════════════
    // EXECUTION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("VEDA-020: Node '{node_id}' failed: {reason}")]
    NodeExecution { node_id: String, reason: String },

    #[error("VEDA-021: No edge out of '{node_id}' matched and no fallback edge exists")]
    BranchUnresolved { node_id: String },

    #[error("VEDA-022: Step guard tripped after {limit} node visits (cyclic or runaway graph)")]
    CycleExceeded { limit: u32 },

    // ═══════════════════════════════════════════
    // OUTPUT ERRORS (050-059)
    // ═══════════════════════════════════════════
    #[error("VEDA-050: Failed to persist run output: {reason}")]
    Output { reason: String },
}

impl VedaError {
    /// True for errors detected at graph load/validation time, before any
    /// node has executed.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            VedaError::GraphParse(_)
                | VedaError::DuplicateNodeId { .. }
                | VedaError::InvalidNodeId { .. }
                | VedaError::EdgeUnknownNode { .. }
                | VedaError::NoStartNode { .. }
                | VedaError::UnknownNodeType { .. }
        )
    }
}

impl FixSuggestion for VedaError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            VedaError::GraphParse(_) => Some("Check the graph JSON against `veda template` output"),
            VedaError::Io(_) => Some("Check file path and permissions"),
            VedaError::DuplicateNodeId { .. } => Some("Give every node a unique id"),
            VedaError::InvalidNodeId { .. } => {
                Some("Node ids must match [A-Za-z0-9_-]+ and be non-empty")
            }
            VedaError::EdgeUnknownNode { .. } => {
                Some("Every edge source/target must name an existing node id")
            }
            VedaError::NoStartNode { .. } => Some("Add a node with \"type\": \"start\""),
            VedaError::UnknownNodeType { .. } => {
                Some("Node type must be one of: start, tool, llm, branch, merge, end")
            }
            VedaError::NodeExecution { .. } => {
                Some("Check the tool/LLM collaborator configuration for this node")
            }
            VedaError::BranchUnresolved { .. } => {
                Some("Add an unconditioned fallback edge or broaden a condition")
            }
            VedaError::CycleExceeded { .. } => {
                Some("Break the cycle or raise the step limit if the graph is legitimately long")
            }
            VedaError::Output { .. } => Some("Check the output directory exists and is writable"),
        }
    }
}

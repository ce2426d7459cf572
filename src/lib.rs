//! veda - a typed workflow-graph executor for research summarization runs
//!
//! A workflow is a JSON graph of typed nodes (start, tool, llm, branch,
//! merge, end) joined by edges that may carry condition expressions. A run
//! seeds an [`ExecutionContext`] with the input files' aggregated text, walks
//! the graph strictly sequentially, and persists the final context and
//! summary as a JSON record.
//!
//! ```no_run
//! use std::sync::Arc;
//! use veda::{
//!     GraphExecutor, MockLlmInvoker, RunRequest, TextAggregator, ToolRegistry,
//!     WorkflowRunner,
//! };
//! use veda::sink::{FileOutputSink, LogStatusReporter};
//!
//! # async fn demo() {
//! let tools: Arc<ToolRegistry> = Arc::new(ToolRegistry::with_builtins());
//! let runner = WorkflowRunner::new(
//!     GraphExecutor::new(tools.clone(), Arc::new(MockLlmInvoker::new())),
//!     TextAggregator::new(tools),
//!     Arc::new(FileOutputSink::new("data")),
//!     Arc::new(LogStatusReporter),
//! );
//! let result = runner.run(&veda::graph::template(), RunRequest {
//!     project: "research".into(),
//!     date: "2026-08-29".into(),
//!     ..Default::default()
//! }).await;
//! println!("{}", result.status);
//! # }
//! ```

pub mod aggregate;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod graph;
pub mod llm;
pub mod path;
pub mod runner;
pub mod sink;
pub mod tools;

pub use aggregate::TextAggregator;
pub use config::EngineConfig;
pub use context::{ContextSeed, ExecutionContext};
pub use error::{FixSuggestion, LlmError, Result, ToolError, VedaError};
pub use executor::{GraphExecutor, RunReport, DEFAULT_STEP_LIMIT};
pub use graph::{Edge, Graph, Node, NodeType};
pub use llm::{LlmInvoker, LlmSummary, MockLlmInvoker, OpenAiInvoker, PromptLibrary};
pub use runner::{RunRequest, RunResult, WorkflowRunner};
pub use sink::{
    FileOutputSink, LogStatusReporter, OutputRecord, OutputSink, RunStatus, StatusReporter,
};
pub use tools::{MockToolInvoker, Tool, ToolInvoker, ToolRegistry};

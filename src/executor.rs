//! Graph execution
//!
//! The executor walks a validated graph strictly sequentially: exactly one
//! node is active at a time, and edge selection after each node decides the
//! single successor. Tool and LLM work is delegated through the
//! [`ToolInvoker`] and [`LlmInvoker`] seams so the executor itself never
//! performs IO beyond what those collaborators do.
//!
//! Termination:
//! - an `end` node, or any node with zero outgoing edges, ends the run
//!   successfully
//! - a node failure ends the run with that error and the partial context
//! - the step guard trips after `step_limit` node visits, so a cyclic graph
//!   reports [`VedaError::CycleExceeded`] instead of hanging

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::condition;
use crate::context::{ExecutionContext, KEY_AGGREGATED_TEXT, KEY_CUSTOM_PROMPT, KEY_SUMMARY};
use crate::error::VedaError;
use crate::graph::{validate, Edge, Graph, Node, NodeType};
use crate::llm::{LlmInvoker, SummarizeRequest, DEFAULT_TEMPLATE};
use crate::tools::ToolInvoker;

/// Node visits allowed per run before the step guard trips.
pub const DEFAULT_STEP_LIMIT: u32 = 1000;

/// Outcome of one run. The context is returned whether the run succeeded or
/// not, so a failed run still exposes everything computed before the failure.
#[derive(Debug)]
pub struct RunReport {
    pub context: ExecutionContext,
    pub outcome: Result<(), VedaError>,
    /// Node visits performed.
    pub steps: u32,
    pub duration: Duration,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Sequential graph executor.
pub struct GraphExecutor {
    tools: Arc<dyn ToolInvoker>,
    llm: Arc<dyn LlmInvoker>,
    step_limit: u32,
}

impl GraphExecutor {
    pub fn new(tools: Arc<dyn ToolInvoker>, llm: Arc<dyn LlmInvoker>) -> Self {
        Self {
            tools,
            llm,
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }

    pub fn with_step_limit(mut self, step_limit: u32) -> Self {
        self.step_limit = step_limit;
        self
    }

    /// Run the graph to completion over the given context.
    #[instrument(skip(self, graph, ctx), fields(graph = %graph.name))]
    pub async fn execute(&self, graph: &Graph, ctx: ExecutionContext) -> RunReport {
        let started = Instant::now();
        let mut ctx = ctx;
        let mut steps = 0u32;

        // Validation runs even for pre-built Graph values so a hand-assembled
        // graph gets the same guarantees as one from Graph::from_json.
        if let Err(e) = validate(graph) {
            return RunReport {
                context: ctx,
                outcome: Err(e),
                steps,
                duration: started.elapsed(),
            };
        }

        // validate guarantees a start node exists
        let mut current = match graph.start_node() {
            Some(node) => node,
            None => {
                return RunReport {
                    context: ctx,
                    outcome: Err(VedaError::NoStartNode {
                        graph: graph.name.clone(),
                    }),
                    steps,
                    duration: started.elapsed(),
                }
            }
        };

        let outcome = loop {
            if steps >= self.step_limit {
                break Err(VedaError::CycleExceeded {
                    limit: self.step_limit,
                });
            }
            steps += 1;
            debug!(node = %current.id, kind = ?current.kind, step = steps, "visiting");

            if let Err(e) = self.run_node(current, graph, &mut ctx).await {
                break Err(e);
            }

            if current.kind == NodeType::End {
                break Ok(());
            }
            match select_edge(graph, current, &ctx) {
                Selection::Next(edge) => {
                    // validate guarantees the target exists
                    match graph.node(&edge.target) {
                        Some(node) => current = node,
                        None => {
                            break Err(VedaError::EdgeUnknownNode {
                                edge_source: edge.source.clone(),
                                target: edge.target.clone(),
                                missing: edge.target.clone(),
                            })
                        }
                    }
                }
                Selection::Terminal => break Ok(()),
                Selection::Unresolved => {
                    break Err(VedaError::BranchUnresolved {
                        node_id: current.id.clone(),
                    })
                }
            }
        };

        if let Err(ref e) = outcome {
            warn!(error = %e, steps, "run failed");
        }
        RunReport {
            context: ctx,
            outcome,
            steps,
            duration: started.elapsed(),
        }
    }

    async fn run_node(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &mut ExecutionContext,
    ) -> Result<(), VedaError> {
        match node.kind {
            // Start, branch, merge and end nodes compute nothing; branches
            // act purely through edge selection and merges are pass-through
            // joins in a sequential walk.
            NodeType::Start | NodeType::Branch | NodeType::Merge | NodeType::End => Ok(()),
            NodeType::Tool => self.run_tool_node(node, ctx).await,
            NodeType::Llm => self.run_llm_node(node, graph, ctx).await,
            NodeType::Unknown => Err(VedaError::UnknownNodeType {
                id: node.id.clone(),
            }),
        }
    }

    async fn run_tool_node(&self, node: &Node, ctx: &mut ExecutionContext) -> Result<(), VedaError> {
        let tool_name = node.tool_name.as_deref().ok_or_else(|| VedaError::NodeExecution {
            node_id: node.id.clone(),
            reason: "tool node has no tool_name".to_string(),
        })?;
        let payload = if node.input_map.is_empty() {
            ctx.snapshot()
        } else {
            let mut fields = Map::new();
            for (field, path) in &node.input_map {
                fields.insert(field.clone(), ctx.resolve_path(path));
            }
            Value::Object(fields)
        };
        let result = self
            .tools
            .invoke(tool_name, payload)
            .await
            .map_err(|e| VedaError::NodeExecution {
                node_id: node.id.clone(),
                reason: e.to_string(),
            })?;
        ctx.set(node.output_key.clone(), result);
        Ok(())
    }

    async fn run_llm_node(
        &self,
        node: &Node,
        graph: &Graph,
        ctx: &mut ExecutionContext,
    ) -> Result<(), VedaError> {
        // Node params override the graph-level defaults.
        let template = node
            .params
            .get("prompt_template")
            .and_then(Value::as_str)
            .or(graph.prompt_template.as_deref())
            .unwrap_or(DEFAULT_TEMPLATE);
        let model = node
            .params
            .get("llm_model")
            .and_then(Value::as_str)
            .or(graph.llm_model.as_deref());

        let content = match node.input_map.get("content") {
            Some(path) => match ctx.resolve_path(path) {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            },
            None => ctx.get_str(KEY_AGGREGATED_TEXT).unwrap_or_default().to_string(),
        };
        let custom_prompt = ctx.get_str(KEY_CUSTOM_PROMPT).map(str::to_string);

        let summary = self
            .llm
            .summarize(SummarizeRequest {
                content: &content,
                template,
                model,
                custom_prompt: custom_prompt.as_deref(),
            })
            .await
            .map_err(|e| VedaError::NodeExecution {
                node_id: node.id.clone(),
                reason: e.to_string(),
            })?;

        ctx.set(node.output_key.clone(), Value::String(summary.text.clone()));
        ctx.set(KEY_SUMMARY, Value::String(summary.text));
        ctx.push_llm_meta(summary.metadata);
        Ok(())
    }
}

enum Selection<'a> {
    Next(&'a Edge),
    Terminal,
    Unresolved,
}

/// Pick the successor edge. Conditioned edges are tried in declaration
/// order and the first true condition wins; an unconditioned edge is the
/// fallback when no condition matched, regardless of where it is declared.
/// No outgoing edges means the run terminates here; outgoing edges with no
/// match and no fallback is an unresolved branch.
fn select_edge<'a>(graph: &'a Graph, node: &'a Node, ctx: &ExecutionContext) -> Selection<'a> {
    let mut fallback = None;
    let mut saw_edge = false;
    for edge in graph.outgoing(&node.id) {
        saw_edge = true;
        match &edge.condition {
            None => {
                if fallback.is_none() {
                    fallback = Some(edge);
                }
            }
            Some(expr) => {
                if condition::evaluate(expr, ctx) {
                    debug!(from = %edge.source, to = %edge.target, "condition matched");
                    return Selection::Next(edge);
                }
            }
        }
    }
    match (fallback, saw_edge) {
        (Some(edge), _) => {
            debug!(from = %edge.source, to = %edge.target, "fallback edge taken");
            Selection::Next(edge)
        }
        (None, true) => Selection::Unresolved,
        (None, false) => Selection::Terminal,
    }
}

//! Run orchestration
//!
//! [`WorkflowRunner`] owns one run end to end: status goes pending, then
//! running, the input files are aggregated, the context is seeded, the graph
//! executes, and the record is persisted. The terminal status is `success`
//! only when both execution and persistence succeed.

use std::sync::Arc;

use chrono::Utc;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::aggregate::TextAggregator;
use crate::context::{ContextSeed, ExecutionContext, KEY_SUMMARY};
use crate::executor::{GraphExecutor, RunReport};
use crate::graph::Graph;
use crate::sink::{OutputRecord, OutputSink, RunOutput, RunStatus, StatusReporter};

/// One run's inputs.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    pub project: String,
    pub date: String,
    /// Caller-provided workflow id; generated when absent.
    pub wf_id: Option<String>,
    pub files: Vec<String>,
    pub custom_prompt: Option<String>,
}

/// What the runner hands back. `output_path` is set when the record was
/// persisted; the report carries the context either way.
pub struct RunResult {
    pub wf_id: String,
    pub status: RunStatus,
    pub output_path: Option<String>,
    pub report: RunReport,
}

pub struct WorkflowRunner {
    executor: GraphExecutor,
    aggregator: TextAggregator,
    sink: Arc<dyn OutputSink>,
    status: Arc<dyn StatusReporter>,
}

impl WorkflowRunner {
    pub fn new(
        executor: GraphExecutor,
        aggregator: TextAggregator,
        sink: Arc<dyn OutputSink>,
        status: Arc<dyn StatusReporter>,
    ) -> Self {
        Self {
            executor,
            aggregator,
            sink,
            status,
        }
    }

    #[instrument(skip(self, graph, request), fields(graph = %graph.name, project = %request.project))]
    pub async fn run(&self, graph: &Graph, request: RunRequest) -> RunResult {
        let wf_id = request
            .wf_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        self.status.report(&wf_id, RunStatus::Pending, None).await;
        self.status.report(&wf_id, RunStatus::Running, None).await;

        let aggregated_text = self.aggregator.aggregate(&request.files).await;
        let ctx = ExecutionContext::seeded(ContextSeed {
            project: request.project.clone(),
            date: request.date.clone(),
            wf_id: wf_id.clone(),
            custom_prompt: request.custom_prompt.clone(),
            files: request.files.clone(),
            aggregated_text,
        });

        let mut report = self.executor.execute(graph, ctx).await;

        match report.outcome {
            Ok(()) => {
                let record = OutputRecord {
                    wf_id: wf_id.clone(),
                    created_at: Utc::now(),
                    output: RunOutput {
                        summary: report
                            .context
                            .get_str(KEY_SUMMARY)
                            .unwrap_or_default()
                            .to_string(),
                        context: report.context.snapshot(),
                        execution_time: report.duration.as_secs_f64(),
                    },
                };
                match self
                    .sink
                    .persist(&request.project, &request.date, &record)
                    .await
                {
                    Ok(path) => {
                        self.status
                            .report(&wf_id, RunStatus::Success, Some(&path))
                            .await;
                        RunResult {
                            wf_id,
                            status: RunStatus::Success,
                            output_path: Some(path),
                            report,
                        }
                    }
                    Err(e) => {
                        // An unpersisted run is a failed run.
                        let msg = e.to_string();
                        self.status
                            .report(&wf_id, RunStatus::Failed, Some(&msg))
                            .await;
                        report.outcome = Err(e);
                        RunResult {
                            wf_id,
                            status: RunStatus::Failed,
                            output_path: None,
                            report,
                        }
                    }
                }
            }
            Err(ref e) => {
                let msg = e.to_string();
                self.persist_debug_snapshot(&request, &report, &msg).await;
                self.status
                    .report(&wf_id, RunStatus::Failed, Some(&msg))
                    .await;
                RunResult {
                    wf_id,
                    status: RunStatus::Failed,
                    output_path: None,
                    report,
                }
            }
        }
    }

    /// Failed runs leave a debug snapshot behind when possible. A sink
    /// failure here only warns; the run is already failed.
    async fn persist_debug_snapshot(&self, request: &RunRequest, report: &RunReport, error: &str) {
        let snapshot = serde_json::json!({
            "error": error,
            "steps": report.steps,
            "context": report.context.snapshot(),
        });
        if let Err(e) = self
            .sink
            .persist_debug(&request.project, &request.date, &snapshot)
            .await
        {
            warn!(error = %e, "debug snapshot not written");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VedaError;
    use crate::graph;
    use crate::llm::MockLlmInvoker;
    use crate::sink::{MemoryOutputSink, MemoryStatusReporter};
    use crate::tools::{MockToolInvoker, ToolRegistry};
    use serde_json::json;

    fn runner_with(
        tools: Arc<dyn crate::tools::ToolInvoker>,
        sink: Arc<MemoryOutputSink>,
        status: Arc<MemoryStatusReporter>,
    ) -> WorkflowRunner {
        WorkflowRunner::new(
            GraphExecutor::new(tools.clone(), Arc::new(MockLlmInvoker::new())),
            TextAggregator::new(tools),
            sink,
            status,
        )
    }

    #[tokio::test]
    async fn lifecycle_pending_running_success() {
        let sink = Arc::new(MemoryOutputSink::new());
        let status = Arc::new(MemoryStatusReporter::new());
        let runner = runner_with(
            Arc::new(ToolRegistry::with_builtins()),
            sink.clone(),
            status.clone(),
        );

        let result = runner
            .run(
                &graph::template(),
                RunRequest {
                    project: "research".into(),
                    date: "2026-08-29".into(),
                    wf_id: Some("wf-fixed".into()),
                    files: vec![],
                    custom_prompt: None,
                },
            )
            .await;

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(result.wf_id, "wf-fixed");
        assert!(result.output_path.is_some());
        assert_eq!(
            status.statuses().await,
            vec![RunStatus::Pending, RunStatus::Running, RunStatus::Success]
        );
        let records = sink.records.lock().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].wf_id, "wf-fixed");
        assert!(records[0].output.execution_time >= 0.0);
    }

    #[tokio::test]
    async fn empty_input_skips_the_llm_via_the_gate() {
        // The template graph branches around the LLM when no text was
        // extracted, so the summary stays empty.
        let sink = Arc::new(MemoryOutputSink::new());
        let status = Arc::new(MemoryStatusReporter::new());
        let runner = runner_with(
            Arc::new(ToolRegistry::with_builtins()),
            sink.clone(),
            status,
        );
        let result = runner
            .run(
                &graph::template(),
                RunRequest {
                    project: "p".into(),
                    date: "2026-08-29".into(),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(result.status, RunStatus::Success);
        let records = sink.records.lock().await;
        assert_eq!(records[0].output.summary, "");
    }

    #[tokio::test]
    async fn generated_wf_id_when_absent() {
        let sink = Arc::new(MemoryOutputSink::new());
        let status = Arc::new(MemoryStatusReporter::new());
        let runner = runner_with(
            Arc::new(ToolRegistry::with_builtins()),
            sink,
            status,
        );
        let result = runner
            .run(
                &graph::template(),
                RunRequest {
                    project: "p".into(),
                    date: "d".into(),
                    ..Default::default()
                },
            )
            .await;
        assert!(Uuid::parse_str(&result.wf_id).is_ok());
    }

    #[tokio::test]
    async fn execution_failure_reports_failed_with_message() {
        let g: Graph = serde_json::from_value(json!({
            "name": "t",
            "nodes": [
                {"id": "s", "type": "start"},
                {"id": "t1", "type": "tool", "tool_name": "no_such_tool"},
                {"id": "e", "type": "end"}
            ],
            "edges": [
                {"source": "s", "target": "t1"},
                {"source": "t1", "target": "e"}
            ]
        }))
        .unwrap();
        let sink = Arc::new(MemoryOutputSink::new());
        let status = Arc::new(MemoryStatusReporter::new());
        let runner = runner_with(Arc::new(MockToolInvoker::new()), sink.clone(), status.clone());
        let result = runner
            .run(
                &g,
                RunRequest {
                    project: "p".into(),
                    date: "d".into(),
                    ..Default::default()
                },
            )
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.output_path.is_none());
        let transitions = status.transitions.lock().await;
        let (_, last_status, last_msg) = transitions.last().unwrap().clone();
        assert_eq!(last_status, RunStatus::Failed);
        assert!(!last_msg.unwrap().is_empty());
        // the failure left a debug snapshot, not a normal record
        assert!(sink.records.lock().await.is_empty());
        assert_eq!(sink.debug_snapshots.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn persist_failure_turns_a_successful_run_failed() {
        let sink = Arc::new(MemoryOutputSink::failing());
        let status = Arc::new(MemoryStatusReporter::new());
        let runner = runner_with(
            Arc::new(ToolRegistry::with_builtins()),
            sink,
            status.clone(),
        );
        let result = runner
            .run(
                &graph::template(),
                RunRequest {
                    project: "p".into(),
                    date: "d".into(),
                    ..Default::default()
                },
            )
            .await;
        assert_eq!(result.status, RunStatus::Failed);
        assert!(matches!(result.report.outcome, Err(VedaError::Output { .. })));
        assert_eq!(status.statuses().await.last(), Some(&RunStatus::Failed));
    }
}

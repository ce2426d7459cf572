//! Run output persistence and status reporting
//!
//! Two seams surround the runner: [`StatusReporter`] receives lifecycle
//! transitions (infallible, reporting can never fail a run) and
//! [`OutputSink`] persists the final record (fallible, a run whose output
//! cannot be written is a failed run). The file sink lays records out
//! per project and date:
//!
//! ```text
//! <base>/<project>/<date>/outputs/output_YYYYMMDD_HHMMSS.json
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::VedaError;

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Payload section of the persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub summary: String,
    /// Full context snapshot at run end.
    pub context: Value,
    /// Wall-clock run time in seconds.
    pub execution_time: f64,
}

/// The persisted record for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord {
    pub wf_id: String,
    pub created_at: DateTime<Utc>,
    pub output: RunOutput,
}

/// Receives run lifecycle transitions. Implementations must not fail; a
/// status report is advisory and never affects the run outcome.
#[async_trait]
pub trait StatusReporter: Send + Sync {
    async fn report(&self, wf_id: &str, status: RunStatus, message: Option<&str>);
}

/// Persists run records. Returns a locator for the written record (the file
/// path for the file sink).
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn persist(
        &self,
        project: &str,
        date: &str,
        record: &OutputRecord,
    ) -> Result<String, VedaError>;

    /// Persist a debug snapshot alongside the regular output. Failures here
    /// are the caller's to swallow.
    async fn persist_debug(
        &self,
        project: &str,
        date: &str,
        snapshot: &Value,
    ) -> Result<String, VedaError>;
}

/// Logs every transition at info level.
#[derive(Default)]
pub struct LogStatusReporter;

#[async_trait]
impl StatusReporter for LogStatusReporter {
    async fn report(&self, wf_id: &str, status: RunStatus, message: Option<&str>) {
        match message {
            Some(msg) => info!(wf_id, %status, msg, "workflow status"),
            None => info!(wf_id, %status, "workflow status"),
        }
    }
}

/// Writes records under a base directory, one tree per project and date.
pub struct FileOutputSink {
    base: PathBuf,
}

impl FileOutputSink {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn outputs_dir(&self, project: &str, date: &str) -> PathBuf {
        self.base.join(project).join(date).join("outputs")
    }

    async fn write_json(&self, path: &Path, body: &Value) -> Result<(), VedaError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| VedaError::Output {
                    reason: format!("create {}: {e}", parent.display()),
                })?;
        }
        let body = serde_json::to_string_pretty(body).map_err(|e| VedaError::Output {
            reason: e.to_string(),
        })?;
        tokio::fs::write(path, body)
            .await
            .map_err(|e| VedaError::Output {
                reason: format!("write {}: {e}", path.display()),
            })
    }
}

#[async_trait]
impl OutputSink for FileOutputSink {
    async fn persist(
        &self,
        project: &str,
        date: &str,
        record: &OutputRecord,
    ) -> Result<String, VedaError> {
        let stamp = record.created_at.format("%Y%m%d_%H%M%S");
        let path = self
            .outputs_dir(project, date)
            .join(format!("output_{stamp}.json"));
        let body = serde_json::to_value(record).map_err(|e| VedaError::Output {
            reason: e.to_string(),
        })?;
        self.write_json(&path, &body).await?;
        debug!(path = %path.display(), "output written");
        Ok(path.display().to_string())
    }

    async fn persist_debug(
        &self,
        project: &str,
        date: &str,
        snapshot: &Value,
    ) -> Result<String, VedaError> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let path = self
            .outputs_dir(project, date)
            .join(format!("debug_{stamp}.json"));
        self.write_json(&path, snapshot).await?;
        Ok(path.display().to_string())
    }
}

/// In-memory sink for tests.
#[derive(Default)]
pub struct MemoryOutputSink {
    pub records: Mutex<Vec<OutputRecord>>,
    pub debug_snapshots: Mutex<Vec<Value>>,
    pub fail_persist: bool,
}

impl MemoryOutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_persist: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl OutputSink for MemoryOutputSink {
    async fn persist(
        &self,
        _project: &str,
        _date: &str,
        record: &OutputRecord,
    ) -> Result<String, VedaError> {
        if self.fail_persist {
            return Err(VedaError::Output {
                reason: "memory sink configured to fail".to_string(),
            });
        }
        self.records.lock().await.push(record.clone());
        Ok(format!("memory:{}", record.wf_id))
    }

    async fn persist_debug(
        &self,
        _project: &str,
        _date: &str,
        snapshot: &Value,
    ) -> Result<String, VedaError> {
        self.debug_snapshots.lock().await.push(snapshot.clone());
        Ok("memory:debug".to_string())
    }
}

/// Records every transition for assertions.
#[derive(Default)]
pub struct MemoryStatusReporter {
    pub transitions: Mutex<Vec<(String, RunStatus, Option<String>)>>,
}

impl MemoryStatusReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn statuses(&self) -> Vec<RunStatus> {
        self.transitions.lock().await.iter().map(|t| t.1).collect()
    }
}

#[async_trait]
impl StatusReporter for MemoryStatusReporter {
    async fn report(&self, wf_id: &str, status: RunStatus, message: Option<&str>) {
        self.transitions
            .lock()
            .await
            .push((wf_id.to_string(), status, message.map(str::to_string)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record() -> OutputRecord {
        OutputRecord {
            wf_id: "wf-42".into(),
            created_at: Utc.with_ymd_and_hms(2026, 8, 29, 10, 30, 0).unwrap(),
            output: RunOutput {
                summary: "done".into(),
                context: json!({"k": "v"}),
                execution_time: 1.25,
            },
        }
    }

    #[tokio::test]
    async fn file_sink_lays_out_project_date_tree() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileOutputSink::new(dir.path());
        let path = sink.persist("research", "2026-08-29", &record()).await.unwrap();
        assert!(path.ends_with("output_20260829_103000.json"));
        assert!(path.contains("research"));
        assert!(path.contains("2026-08-29"));
        assert!(path.contains("outputs"));

        let body: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(body["wf_id"], json!("wf-42"));
        assert_eq!(body["output"]["summary"], json!("done"));
        assert_eq!(body["output"]["execution_time"], json!(1.25));
        assert_eq!(body["output"]["context"]["k"], json!("v"));
    }

    #[tokio::test]
    async fn debug_snapshot_gets_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileOutputSink::new(dir.path());
        let path = sink
            .persist_debug("p", "2026-08-29", &json!({"trace": []}))
            .await
            .unwrap();
        assert!(path.contains("debug_"));
        assert!(std::path::Path::new(&path).exists());
    }

    #[tokio::test]
    async fn unwritable_base_is_an_output_error() {
        let sink = FileOutputSink::new("/proc/veda-definitely-unwritable");
        let err = sink.persist("p", "d", &record()).await.unwrap_err();
        assert!(matches!(err, VedaError::Output { .. }));
    }

    #[tokio::test]
    async fn memory_reporter_preserves_order() {
        let reporter = MemoryStatusReporter::new();
        reporter.report("wf", RunStatus::Pending, None).await;
        reporter.report("wf", RunStatus::Running, None).await;
        reporter.report("wf", RunStatus::Success, Some("ok")).await;
        assert_eq!(
            reporter.statuses().await,
            vec![RunStatus::Pending, RunStatus::Running, RunStatus::Success]
        );
    }
}

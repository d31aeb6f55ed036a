//! `_TXR_LOGGER`: writes a job's `value` to stdout or appends it to a file.
//!
//! Declared options: `{"type": "'STDOUT' | 'FILE'"}`.
//! Provided options: `{"type": "FILE", "value": ..., "path": "/var/log/txr.log"}`.
//! When `value` is absent the previous job's output is logged instead.

use std::path::Path;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use txr_core::types::Job;

use crate::error::{PluginError, Result, ValidationError};
use crate::executor::{Executor, PluginKind};
use crate::options::{required_str, AllowList};

const TYPE_OPTION: &str = "type";
const STDOUT: &str = "STDOUT";
const FILE: &str = "FILE";

pub struct LoggerExecutor;

#[async_trait]
impl Executor for LoggerExecutor {
    fn kind(&self) -> PluginKind {
        PluginKind::Logger
    }

    fn validate(&self, declared: &Value, provided: &Value) -> std::result::Result<(), ValidationError> {
        let target = AllowList::from_declared(declared, TYPE_OPTION)?.check(provided, TYPE_OPTION)?;
        if target == FILE {
            required_str(provided, "path")?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        _declared: &Value,
        job: &Job,
        previous: Option<&Value>,
    ) -> Result<Option<Value>> {
        let value = job
            .options
            .get("value")
            .filter(|v| !v.is_null())
            .or(previous);
        let message = format!("Job {} execution successful: {}", job.id, display(value));

        match job.options.get(TYPE_OPTION).and_then(Value::as_str) {
            Some(FILE) => {
                let path = required_str(&job.options, "path")
                    .map_err(|e| PluginError::ExecutionFailed(e.to_string()))?;
                let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
                append_line(Path::new(path), &format!("{stamp} {message}")).await?;
                debug!(job_id = %job.id, path, "log line appended");
            }
            Some(STDOUT) | None => {
                let mut stdout = tokio::io::stdout();
                stdout.write_all(format!("{message}\n").as_bytes()).await?;
                stdout.flush().await?;
            }
            Some(other) => {
                return Err(PluginError::ExecutionFailed(format!(
                    "unsupported log target: {other}"
                )))
            }
        }

        Ok(Some(Value::String(message)))
    }
}

/// Strings are written bare; everything else as compact JSON.
fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(format!("{line}\n").as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(options: Value) -> Job {
        Job {
            id: "job-1".into(),
            seq_id: "seq-1".into(),
            to: None,
            job_type: "jt-1".into(),
            options,
            trace_id: None,
        }
    }

    fn declared() -> Value {
        json!({"type": "'STDOUT' | 'FILE'"})
    }

    #[test]
    fn validate_checks_type_and_path() {
        let logger = LoggerExecutor;
        assert!(logger.validate(&declared(), &json!({"type": "STDOUT", "value": 1})).is_ok());
        assert!(logger
            .validate(&declared(), &json!({"type": "FILE", "path": "/tmp/x.log"}))
            .is_ok());
        assert_eq!(
            logger.validate(&declared(), &json!({"type": "FILE"})),
            Err(ValidationError::MissingOption { option: "path".into() })
        );
        assert!(matches!(
            logger.validate(&declared(), &json!({"type": "EMAIL"})),
            Err(ValidationError::NotAllowed { .. })
        ));
    }

    #[tokio::test]
    async fn stdout_returns_message() {
        let out = LoggerExecutor
            .execute(&declared(), &job(json!({"type": "STDOUT", "value": "hello"})), None)
            .await
            .unwrap();
        assert_eq!(out, Some(json!("Job job-1 execution successful: hello")));
    }

    #[tokio::test]
    async fn file_creates_parents_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/logs/txr.log");
        let options = json!({"type": "FILE", "path": path.to_str().unwrap(), "value": {"n": 1}});

        LoggerExecutor.execute(&declared(), &job(options.clone()), None).await.unwrap();
        LoggerExecutor.execute(&declared(), &job(options), None).await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert!(line.ends_with(r#"Job job-1 execution successful: {"n":1}"#), "{line}");
        }
    }

    #[tokio::test]
    async fn falls_back_to_previous_output() {
        let previous = json!([{"id": 7}]);
        let out = LoggerExecutor
            .execute(&declared(), &job(json!({"type": "STDOUT"})), Some(&previous))
            .await
            .unwrap();
        assert_eq!(out, Some(json!(r#"Job job-1 execution successful: [{"id":7}]"#)));
    }
}

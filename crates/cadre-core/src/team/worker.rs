//! Worker contract
//!
//! A worker is anything that can take a task's metadata as keyword arguments
//! and produce a JSON result. Concrete LLM-backed agents live outside this
//! crate; the two workers here are deterministic stand-ins used by the CLI
//! and by tests.

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::types::Metadata;

/// A team member the orchestrator can delegate tasks to
#[async_trait]
pub trait Worker: Send + Sync {
    /// Display name, used in logs
    fn name(&self) -> &str;

    /// Execute one task. `args` is the task's metadata, forwarded verbatim.
    async fn execute(&self, args: &Metadata) -> anyhow::Result<Value>;

    /// One-time setup, called lazily before the first goal runs.
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Release resources. Called when the owning team is closed or dropped.
    fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Returns the arguments it was called with
#[derive(Debug, Clone)]
pub struct EchoWorker {
    name: String,
}

impl EchoWorker {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Worker for EchoWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, args: &Metadata) -> anyhow::Result<Value> {
        Ok(json!({
            "worker": self.name,
            "task_args": args,
        }))
    }
}

/// Always fails with the configured message
#[derive(Debug, Clone)]
pub struct FailingWorker {
    name: String,
    message: String,
}

impl FailingWorker {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl Worker for FailingWorker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _args: &Metadata) -> anyhow::Result<Value> {
        Err(anyhow!("{}", self.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::metadata;

    #[tokio::test]
    async fn test_echo_worker_returns_args() {
        let worker = EchoWorker::new("echo-1");
        let args = metadata(json!({"platform": "instagram"}));
        let result = worker.execute(&args).await.unwrap();

        assert_eq!(result["worker"], json!("echo-1"));
        assert_eq!(result["task_args"]["platform"], json!("instagram"));
    }

    #[tokio::test]
    async fn test_failing_worker() {
        let worker = FailingWorker::new("flaky", "quota exceeded");
        let err = worker.execute(&Metadata::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert!(worker.initialize().await.is_ok());
        assert_eq!(worker.name(), "flaky");
    }
}

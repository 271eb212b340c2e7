//! Durable step ledger and retried step execution.
//!
//! Each pipeline job runs as an ordered sequence of named steps. The ledger
//! records every completed step with its serialized output, keyed by job id,
//! so a restarted job replays completed steps instead of re-executing their
//! side effects. Steps that have not completed run under a start timeout with
//! a bounded number of attempts and exponential backoff between them.

use crate::error::{Result, ViddexError};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS pipeline_steps (
        job_id TEXT NOT NULL,
        step TEXT NOT NULL,
        output TEXT NOT NULL,
        completed_at TEXT NOT NULL,
        PRIMARY KEY (job_id, step)
    );
"#;

/// SQLite-backed record of completed pipeline steps.
pub struct StepLedger {
    conn: Mutex<Connection>,
}

impl StepLedger {
    /// Open (or create) the ledger at a database path.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ViddexError::VideoStore(format!("Failed to acquire lock: {}", e)))
    }

    /// The recorded output of a completed step, if any.
    pub fn completed_output(&self, job_id: &str, step: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let output = conn
            .query_row(
                "SELECT output FROM pipeline_steps WHERE job_id = ?1 AND step = ?2",
                params![job_id, step],
                |row| row.get(0),
            )
            .optional()?;
        Ok(output)
    }

    /// Record a step's completion with its serialized output.
    pub fn record(&self, job_id: &str, step: &str, output: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO pipeline_steps (job_id, step, output, completed_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![job_id, step, output, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Forget all recorded steps for a job. Returns the number removed.
    pub fn clear_job(&self, job_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM pipeline_steps WHERE job_id = ?1",
            params![job_id],
        )?;
        Ok(removed)
    }
}

/// Runs named steps durably: replay if already completed, otherwise execute
/// with a start timeout and bounded retries.
#[derive(Clone)]
pub struct StepRunner {
    ledger: Arc<StepLedger>,
    retries: u32,
    timeout: Duration,
}

impl StepRunner {
    pub fn new(ledger: Arc<StepLedger>, retries: u32, timeout: Duration) -> Self {
        Self {
            ledger,
            retries: retries.max(1),
            timeout,
        }
    }

    /// The underlying ledger.
    pub fn ledger(&self) -> &StepLedger {
        &self.ledger
    }

    /// Run one named step of a job.
    ///
    /// A step recorded as completed returns its recorded output without
    /// executing. Otherwise the operation runs under the start timeout; on
    /// error it is retried with exponential backoff until the attempt budget
    /// is exhausted, at which point the last error is wrapped and returned.
    /// The output is recorded only after the operation succeeds, so a crash
    /// mid-step re-runs that step on resume.
    pub async fn run<T, F, Fut>(&self, job_id: &str, step: &str, operation: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(output) = self.ledger.completed_output(job_id, step)? {
            debug!(job_id, step, "Step already completed, replaying output");
            return Ok(serde_json::from_str(&output)?);
        }

        let mut delay = Duration::from_secs(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match tokio::time::timeout(self.timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ViddexError::StepTimeout(step.to_string())),
            };

            match result {
                Ok(value) => {
                    self.ledger
                        .record(job_id, step, &serde_json::to_string(&value)?)?;
                    debug!(job_id, step, attempt, "Step completed");
                    return Ok(value);
                }
                Err(e) if attempt < self.retries => {
                    warn!(job_id, step, attempt, error = %e, "Step failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => {
                    return Err(ViddexError::StepExhausted {
                        step: step.to_string(),
                        attempts: attempt,
                        source: Box::new(e),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn runner() -> StepRunner {
        StepRunner::new(
            Arc::new(StepLedger::in_memory().unwrap()),
            3,
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_step_runs_once_and_replays() {
        let runner = runner();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let first: u32 = runner
            .run("job1", "count", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await
            .unwrap();
        assert_eq!(first, 7);

        // Second run replays the recorded output without executing
        let second: u32 = runner
            .run("job1", "count", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await
            .unwrap();
        assert_eq!(second, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_steps_are_scoped_by_job() {
        let runner = runner();

        let a: String = runner
            .run("job1", "name", || async { Ok("a".to_string()) })
            .await
            .unwrap();
        let b: String = runner
            .run("job2", "name", || async { Ok("b".to_string()) })
            .await
            .unwrap();

        assert_eq!(a, "a");
        assert_eq!(b, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let runner = runner();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let value: u32 = runner
            .run("job1", "flaky", || async move {
                let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if call < 3 {
                    Err(ViddexError::SearchIndex("transient".to_string()))
                } else {
                    Ok(call)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_wraps_last_error() {
        let runner = runner();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let err = runner
            .run::<u32, _, _>("job1", "doomed", || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ViddexError::SearchIndex("still broken".to_string()))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match err {
            ViddexError::StepExhausted { step, attempts, source } => {
                assert_eq!(step, "doomed");
                assert_eq!(attempts, 3);
                assert!(source.to_string().contains("still broken"));
            }
            other => panic!("unexpected error: {}", other),
        }

        // A failed step was never recorded and runs again
        let value: u32 = runner
            .run("job1", "doomed", || async { Ok(1) })
            .await
            .unwrap();
        assert_eq!(value, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_as_failure() {
        let runner = StepRunner::new(
            Arc::new(StepLedger::in_memory().unwrap()),
            1,
            Duration::from_secs(5),
        );

        let err = runner
            .run::<u32, _, _>("job1", "slow", || async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(1)
            })
            .await
            .unwrap_err();

        match err {
            ViddexError::StepExhausted { source, .. } => {
                assert!(matches!(*source, ViddexError::StepTimeout(_)));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_clear_job_allows_rerun() {
        let runner = runner();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let step = || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        runner.run("job1", "once", step).await.unwrap();
        runner.ledger().clear_job("job1").unwrap();
        runner.run("job1", "once", step).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}

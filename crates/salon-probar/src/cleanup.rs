//! Best-effort cleanup
//!
//! Teardown after a test (archive a course, delete an appointment, cancel a
//! membership) should not hide the test's own result, yet its failures must
//! not vanish either. [`BestEffortCleanup`] runs every registered step, logs
//! each failure and returns a [`CleanupReport`]. A caller that wants a strict
//! teardown calls [`CleanupReport::into_result`].
//!
//! ```ignore
//! let report = BestEffortCleanup::new()
//!     .step("archive course", archive_course(&gateway, &course_id))
//!     .step("delete appointment", delete_appointment(&gateway, &appointment_id))
//!     .run()
//!     .await;
//! report.into_result()?;
//! ```

use crate::result::{SalonError, SalonResult};
use futures::future::BoxFuture;
use std::future::Future;
use tracing::{info, warn};

/// Ordered list of named teardown steps
#[derive(Default)]
pub struct BestEffortCleanup<'a> {
    steps: Vec<(String, BoxFuture<'a, SalonResult<()>>)>,
}

impl std::fmt::Debug for BestEffortCleanup<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.steps.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("BestEffortCleanup")
            .field("steps", &names)
            .finish()
    }
}

impl<'a> BestEffortCleanup<'a> {
    /// Create an empty cleanup
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step; it does not start until [`run`](Self::run)
    #[must_use]
    pub fn step<T, F>(mut self, name: impl Into<String>, step: F) -> Self
    where
        F: Future<Output = SalonResult<T>> + Send + 'a,
        T: 'a,
    {
        self.steps
            .push((name.into(), Box::pin(async move { step.await.map(|_| ()) })));
        self
    }

    /// Number of registered steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if no step is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in registration order, whatever the earlier ones did
    pub async fn run(self) -> CleanupReport {
        let mut report = CleanupReport::default();
        for (name, step) in self.steps {
            match step.await {
                Ok(()) => {
                    info!(step = %name, "cleanup step done");
                    report.succeeded.push(name);
                }
                Err(e) => {
                    warn!(step = %name, error = %e, "cleanup step failed");
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }
}

/// Outcome of a [`BestEffortCleanup`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Steps that succeeded, in order
    pub succeeded: Vec<String>,
    /// Failed steps with their error messages, in order
    pub failed: Vec<(String, String)>,
}

impl CleanupReport {
    /// Check if every step succeeded
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the failed steps
    #[must_use]
    pub fn failed_steps(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Turn failures into [`SalonError::Cleanup`]
    pub fn into_result(self) -> SalonResult<()> {
        let Some((_, first_error)) = self.failed.first().cloned() else {
            return Ok(());
        };
        Err(SalonError::Cleanup {
            failed: self.failed.into_iter().map(|(name, _)| name).collect(),
            first_error,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    async fn record(
        log: Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        fail: bool,
    ) -> SalonResult<u64> {
        log.lock().unwrap().push(name);
        if fail {
            Err(SalonError::Http {
                operation: name.to_string(),
                status: 500,
                body: "<empty>".into(),
            })
        } else {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_later_steps() {
        let log = recorder();
        let report = BestEffortCleanup::new()
            .step("archive course", record(log.clone(), "archive", false))
            .step("delete appointment", record(log.clone(), "delete", true))
            .step("cancel membership", record(log.clone(), "cancel", false))
            .run()
            .await;

        assert_eq!(*log.lock().unwrap(), vec!["archive", "delete", "cancel"]);
        assert!(!report.is_clean());
        assert_eq!(report.failed_steps(), vec!["delete appointment"]);
        assert_eq!(report.succeeded, vec!["archive course", "cancel membership"]);
    }

    #[tokio::test]
    async fn test_steps_are_lazy() {
        let log = recorder();
        let cleanup = BestEffortCleanup::new().step("archive", record(log.clone(), "archive", false));
        assert_eq!(cleanup.len(), 1);
        assert!(log.lock().unwrap().is_empty());
        drop(cleanup);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_into_result_strict() {
        let log = recorder();
        let err = BestEffortCleanup::new()
            .step("a", record(log.clone(), "a", true))
            .step("b", record(log.clone(), "b", true))
            .run()
            .await
            .into_result()
            .unwrap_err();
        match err {
            SalonError::Cleanup { failed, first_error } => {
                assert_eq!(failed, vec!["a".to_string(), "b".to_string()]);
                assert!(first_error.contains("HTTP 500"));
            }
            other => panic!("expected Cleanup, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_cleanup_is_clean() {
        let cleanup = BestEffortCleanup::new();
        assert!(cleanup.is_empty());
        assert!(cleanup.run().await.into_result().is_ok());
    }
}

//! Runner for side effects whose failure must not fail the caller.

use std::fmt::Display;
use std::future::Future;

/// Awaits `fut`, logging the outcome. Failures are reported at `warn` and
/// swallowed; the caller gets `None`.
pub async fn best_effort<F, T, E>(task: &'static str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => {
            tracing::debug!(task, "side effect completed");
            Some(value)
        }
        Err(err) => {
            tracing::warn!(task, error = %err, "side effect failed");
            None
        }
    }
}

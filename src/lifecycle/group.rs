//! Task group joining cooperating tasks under one cancellation scope.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::ServerError;

/// A set of tasks sharing a cancellable scope derived from a parent token.
///
/// The first task to fail cancels the scope so its siblings can wind down.
/// [`TaskGroup::join`] collects every error; it does not decide which of them
/// matter.
#[derive(Debug)]
pub struct TaskGroup {
    scope: CancellationToken,
    tasks: JoinSet<Result<(), ServerError>>,
}

impl TaskGroup {
    /// Create an empty group whose scope is a child of `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            scope: parent.child_token(),
            tasks: JoinSet::new(),
        }
    }

    /// Spawn a task that receives the group's scope.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn spawn<F, Fut>(&mut self, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), ServerError>> + Send + 'static,
    {
        let scope = self.scope.clone();
        let fut = task(scope.clone());
        self.tasks.spawn(async move {
            let result = fut.await;
            if result.is_err() {
                scope.cancel();
            }
            result
        });
    }

    /// Wait for every task to finish and return their errors in completion order.
    pub async fn join(mut self) -> Vec<ServerError> {
        let mut errors = Vec::new();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => errors.push(e),
                Err(e) => {
                    tracing::error!(error = %e, "Server task did not complete");
                    self.scope.cancel();
                    errors.push(ServerError::TaskFailed(e.to_string()));
                }
            }
        }
        self.scope.cancel();
        errors
    }
}

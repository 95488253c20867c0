use core::{any::Any, future::Future, num::NonZeroUsize, panic::AssertUnwindSafe};
use std::sync::Arc;

use anyhow::{ensure, Error as AnyhowError, Result};
use futures::FutureExt as _;
use log::debug;
use parking_lot::Mutex;
use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore},
    task::{JoinError, JoinSet},
};
use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Group of tasks that fails as a whole when any of its tasks fails.
///
/// - [`TaskGroup::spawn_limited`] admits at most `limit` tasks at a time.
/// - [`TaskGroup::spawn_unlimited`] bypasses the limit.
/// - The first error is kept and the group's [`CancellationToken`] is cancelled right after.
///   Tasks are not aborted. They are expected to check the token between steps.
/// - [`TaskGroup::wait`] waits for every spawned task and returns the first error.
pub struct TaskGroup {
    tasks: JoinSet<()>,
    permits: Arc<Semaphore>,
    cancellation: CancellationToken,
    first_error: Arc<Mutex<Option<AnyhowError>>>,
}

impl TaskGroup {
    /// Cancelling `parent` cancels the group. Failures in the group do not cancel `parent`.
    #[must_use]
    pub fn new(limit: NonZeroUsize, parent: &CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            permits: Arc::new(Semaphore::new(limit.get())),
            cancellation: parent.child_token(),
            first_error: Arc::default(),
        }
    }

    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Waits for a free slot and spawns `task` in it.
    ///
    /// Returns `false` without spawning if the group is cancelled first.
    pub async fn spawn_limited(
        &mut self,
        task: impl Future<Output = Result<()>> + Send + 'static,
    ) -> bool {
        let permit = tokio::select! {
            biased;

            () = self.cancellation.cancelled() => None,
            permit = Arc::clone(&self.permits).acquire_owned() => permit.ok(),
        };

        let Some(permit) = permit else {
            return false;
        };

        if self.cancellation.is_cancelled() {
            return false;
        }

        self.spawn(task, Some(permit));

        true
    }

    pub fn spawn_unlimited(&mut self, task: impl Future<Output = Result<()>> + Send + 'static) {
        self.spawn(task, None);
    }

    pub async fn wait(mut self) -> Result<()> {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(join_error) = result {
                record_error(
                    &self.first_error,
                    &self.cancellation,
                    join_error_into_error(join_error),
                );
            }
        }

        if let Some(error) = self.first_error.lock().take() {
            return Err(error);
        }

        ensure!(!self.cancellation.is_cancelled(), Error::Cancelled);

        Ok(())
    }

    fn spawn(
        &mut self,
        task: impl Future<Output = Result<()>> + Send + 'static,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        let first_error = Arc::clone(&self.first_error);
        let cancellation = self.cancellation.clone();

        self.tasks.spawn(async move {
            let error = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(Ok(())) => None,
                Ok(Err(error)) => Some(error),
                Err(payload) => Some(
                    Error::TaskPanicked {
                        message: panic_message(payload),
                    }
                    .into(),
                ),
            };

            if let Some(error) = error {
                record_error(&first_error, &cancellation, error);
            }

            // The slot is released only after the error is recorded and the group is cancelled,
            // so a task waiting for the slot cannot start after a failure.
            drop(permit);
        });
    }
}

fn record_error(
    first_error: &Mutex<Option<AnyhowError>>,
    cancellation: &CancellationToken,
    error: AnyhowError,
) {
    {
        let mut first_error = first_error.lock();

        if first_error.is_none() {
            *first_error = Some(error);
        } else {
            debug!("task group already failed, discarding subsequent error: {error:?}");
        }
    }

    cancellation.cancel();
}

fn join_error_into_error(join_error: JoinError) -> AnyhowError {
    match join_error.try_into_panic() {
        Ok(payload) => Error::TaskPanicked {
            message: panic_message(payload),
        }
        .into(),
        Err(_) => Error::Cancelled.into(),
    }
}

fn panic_message(payload: Box<dyn Any + Send + 'static>) -> String {
    let payload = match payload.downcast::<String>() {
        Ok(string) => return *string,
        Err(other) => other,
    };

    if let Ok(string) = payload.downcast::<&str>() {
        return (*string).to_owned();
    }

    "panic with payload of unknown type".to_owned()
}

// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded worker pool for per-item bulk work.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use herald_core::HeraldError;

/// Runs item tasks with at most `size` in flight.
///
/// A submission waits up to `submit_timeout` for a free worker and then
/// fails with [`HeraldError::Overloaded`].
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
    submit_timeout: Duration,
}

impl WorkerPool {
    pub fn new(size: usize, submit_timeout: Duration) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
            submit_timeout,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    async fn acquire(&self) -> Result<OwnedSemaphorePermit, HeraldError> {
        match tokio::time::timeout(
            self.submit_timeout,
            self.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(HeraldError::Cancelled),
            Err(_) => {
                warn!(
                    workers = self.size,
                    wait_ms = self.submit_timeout.as_millis() as u64,
                    "worker pool saturated"
                );
                Err(HeraldError::Overloaded(format!(
                    "all {} workers busy",
                    self.size
                )))
            }
        }
    }

    /// Wait for a worker, then run `task` on its own tokio task.
    pub async fn submit<F, T>(&self, task: F) -> Result<tokio::task::JoinHandle<T>, HeraldError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.acquire().await?;
        Ok(tokio::spawn(async move {
            let out = task.await;
            drop(permit);
            out
        }))
    }

    /// Stop handing out workers; pending submissions fail.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

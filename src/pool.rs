//! Bounded pool for blocking document work.
//!
//! Rendering, OCR, conversion, split and merge are CPU- or FFI-bound. Each
//! job runs on Tokio's blocking thread pool, but at most `size` jobs run at
//! once; the rest wait on a semaphore without occupying a thread. Request
//! handlers only suspend on [`WorkerPool::run`], so intake never stalls.

use crate::error::{Result, WorkbenchError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run one blocking job to completion. A panicking job becomes an
    /// `Internal` error instead of taking the caller down.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| WorkbenchError::Internal("worker pool closed".into()))?;
        debug!(available = self.permits.available_permits(), "Worker acquired");

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await
        .map_err(|e| WorkbenchError::Internal(format!("worker task failed: {e}")))?
    }
}

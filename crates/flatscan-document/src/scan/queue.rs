// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rectification queue: runs submitted tasks on the tokio runtime with a
// bound on how many rectify at once, and hands back a ticket per task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flatscan_core::config::ScanConfig;
use flatscan_core::error::FlatscanError;
use flatscan_core::geometry::{PixelSpace, Quadrilateral};
use flatscan_core::types::TaskId;
use tokio::sync::{Semaphore, oneshot};
use tracing::{debug, info, instrument, warn};

use crate::scan::task::{CancelHandle, RectificationResult, RectificationTask};

/// Concurrency-limited executor for [`RectificationTask`]s.
#[derive(Debug, Clone)]
pub struct RectificationQueue {
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl RectificationQueue {
    pub fn new(config: &ScanConfig) -> Self {
        let limit = config.max_concurrent_tasks.max(1);
        info!(limit, timeout = ?config.task_timeout(), "Rectification queue created");
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            timeout: config.task_timeout(),
        }
    }

    /// Permits not currently held by a running task.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Schedule `task` and return its ticket.
    ///
    /// The queue subscribes to the task's completion, so any completion
    /// registered beforehand is replaced. Must be called from within a tokio
    /// runtime.
    #[instrument(skip_all, fields(task_id = %task.id()))]
    pub fn submit(&self, mut task: RectificationTask) -> TaskTicket {
        let ticket = TaskTicket {
            task_id: task.id(),
            quad: task.quad(),
            cancel: task.cancel_handle(),
            receiver: task.subscribe(),
            timeout: self.timeout,
            submitted: Instant::now(),
        };

        let permits = Arc::clone(&self.permits);
        let cancel = task.cancel_handle();
        tokio::spawn(async move {
            // A task cancelled while queued finishes without a permit. Only a
            // closed semaphore fails to hand one out; the task still runs then.
            let _permit = tokio::select! {
                permit = permits.acquire_owned() => permit.ok(),
                () = cancel.cancelled() => None,
            };
            if let Err(e) = task.start().await {
                warn!(task_id = %task.id(), error = %e, "Queued task refused to start");
            }
        });

        debug!("Task submitted");
        ticket
    }
}

/// Handle to a submitted task.
#[derive(Debug)]
pub struct TaskTicket {
    task_id: TaskId,
    quad: Quadrilateral<PixelSpace>,
    cancel: CancelHandle,
    receiver: oneshot::Receiver<RectificationResult>,
    timeout: Option<Duration>,
    submitted: Instant,
}

impl TaskTicket {
    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Cancel the task. Has no effect once it has started rectifying.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the task, bounded by the queue's configured timeout if any.
    pub async fn wait(self) -> RectificationResult {
        match self.timeout {
            Some(limit) => self.wait_timeout(limit).await,
            None => {
                let Self {
                    task_id,
                    quad,
                    receiver,
                    submitted,
                    ..
                } = self;
                receiver.await.unwrap_or_else(|_| {
                    RectificationResult::failed(task_id, quad, abandoned(), submitted.elapsed())
                })
            }
        }
    }

    /// Wait at most `limit` for the task.
    ///
    /// On timeout this yields a failed result carrying `TimedOut`. The task
    /// keeps running and its eventual completion is discarded.
    #[instrument(skip(self), fields(task_id = %self.task_id))]
    pub async fn wait_timeout(self, limit: Duration) -> RectificationResult {
        let Self {
            task_id,
            quad,
            receiver,
            submitted,
            ..
        } = self;
        match tokio::time::timeout(limit, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                RectificationResult::failed(task_id, quad, abandoned(), submitted.elapsed())
            }
            Err(_) => {
                warn!(?limit, "Rectification timed out; late completion will be ignored");
                RectificationResult::failed(
                    task_id,
                    quad,
                    FlatscanError::TimedOut(limit),
                    submitted.elapsed(),
                )
            }
        }
    }
}

fn abandoned() -> FlatscanError {
    FlatscanError::Worker("task was dropped before completing".into())
}

// -- Tests --------------------------------------------------------------------

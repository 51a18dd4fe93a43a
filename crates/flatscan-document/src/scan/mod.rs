// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: perspective rectification, the run-once task that
// wraps it, and a queue for running tasks concurrently.

pub mod queue;
pub mod rectify;
pub mod task;

pub use queue::{RectificationQueue, TaskTicket};
pub use rectify::Rectifier;
pub use task::{CancelHandle, CompletionHandler, RectificationResult, RectificationTask};

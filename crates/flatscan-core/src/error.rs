// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for flatscan.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all flatscan operations.
///
/// Geometry preconditions (for example an aspect mismatch in
/// `Quadrilateral::fit_scale`) are reported as `None`, not through this type.
#[derive(Debug, Error)]
pub enum FlatscanError {
    // -- Rectification errors --
    #[error("image conversion failed: {0}")]
    ImageConversion(String),

    #[error("invalid quadrilateral: {0}")]
    InvalidQuadrilateral(String),

    #[error("perspective warp failed: {0}")]
    Warp(String),

    // -- Task lifecycle --
    #[error("rectification task was cancelled before it started")]
    Cancelled,

    #[error("rectification task has already been started")]
    AlreadyStarted,

    #[error("rectification task timed out after {0:?}")]
    TimedOut(Duration),

    #[error("rectification worker failed: {0}")]
    Worker(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FlatscanError {
    /// Whether the failure came from the rectification step itself (as
    /// opposed to the task being cancelled, timed out, or misused).
    pub fn is_rectification_failure(&self) -> bool {
        matches!(
            self,
            Self::ImageConversion(_) | Self::InvalidQuadrilateral(_) | Self::Warp(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, FlatscanError>;

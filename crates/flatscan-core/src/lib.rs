// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan: Core geometry, configuration, and error definitions shared
// across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod types;

pub use config::{ScanConfig, WarpInterpolation};
pub use error::FlatscanError;
pub use geometry::*;
pub use types::*;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// flatscan-document: Image-side processing for flatscan.
//
// Provides the scan image buffer (pixels plus orientation tag), the
// perspective rectifier that flattens a document quadrilateral into an
// upright rectangle, and asynchronous rectification tasks with a bounded
// queue to run them.

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `flatscan_document::Rectifier` etc.
pub use image::buffer::ScanImage;
pub use image::Orientation;
pub use scan::queue::{RectificationQueue, TaskTicket};
pub use scan::rectify::Rectifier;
pub use scan::task::{CancelHandle, RectificationResult, RectificationTask};

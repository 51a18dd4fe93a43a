// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: scan buffers and their orientation tags.

pub mod buffer;

pub use buffer::ScanImage;
pub use image::metadata::Orientation;

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry: space-tagged points, affine transforms, the document
// quadrilateral, and the transform pipeline between coordinate spaces.

pub mod pipeline;
pub mod point;
pub mod quad;
pub mod space;
pub mod transform;

pub use pipeline::{SpaceMapping, aspect_fit_rect, build_pipeline};
pub use point::{Point, Rect, Size};
pub use quad::Quadrilateral;
pub use space::{
    CartesianSpace, CoordinateSpace, DetectorSpace, DisplaySpace, FlippableSpace, PixelSpace,
};
pub use transform::AffineTransform;

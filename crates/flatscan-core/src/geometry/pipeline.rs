// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transform pipeline: maps one rectangular coordinate space onto another
// with an aspect-fill scale, an optional rotation, and a recentering
// translation. The same pipeline moves live detector quads into the preview
// and edited on-screen quads back toward source pixels.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::point::{Point, Rect, Size};
use super::quad::Quadrilateral;
use super::space::CoordinateSpace;
use super::transform::AffineTransform;

/// Build the ordered transform sequence mapping `source` onto `dest`.
///
/// 1. A uniform scale making `source` aspect-fill `dest`.
/// 2. A rotation by `rotation` radians (omitted when zero).
/// 3. A translation moving the center of the source bounds, *after* steps
///    1 and 2, onto the center of `dest`.
///
/// The order is load-bearing: the translation is measured on the already
/// scaled and rotated bounds.
pub fn build_pipeline(source: &Rect, dest: &Rect, rotation: f64) -> Vec<AffineTransform> {
    let scale = AffineTransform::aspect_fill_scale(source.size, dest.size);
    let mut transforms = vec![scale];
    let mut bounds = source.applying(&scale);

    if rotation != 0.0 {
        let rotate = AffineTransform::rotation(rotation);
        bounds = bounds.applying(&rotate);
        transforms.push(rotate);
    }

    transforms.push(AffineTransform::center_translation(&bounds, dest));
    trace!(steps = transforms.len(), rotation, "transform pipeline built");
    transforms
}

/// Largest rectangle with the aspect ratio of `aspect` that fits inside
/// `bounds`, centered. This is where an aspect-fit view draws an image.
pub fn aspect_fit_rect(aspect: Size, bounds: &Rect) -> Rect {
    if aspect.is_empty() || bounds.size.is_empty() {
        return Rect::new(bounds.mid_x(), bounds.mid_y(), 0.0, 0.0);
    }
    let factor = (bounds.width() / aspect.width).min(bounds.height() / aspect.height);
    let width = aspect.width * factor;
    let height = aspect.height * factor;
    Rect::new(
        bounds.mid_x() - width / 2.0,
        bounds.mid_y() - height / 2.0,
        width,
        height,
    )
}

/// An ordered transform sequence from space `Src` into space `Dst`.
///
/// This is the only way a point or quadrilateral changes space besides the
/// vertical flip between pixel and Cartesian conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceMapping<Src: CoordinateSpace, Dst: CoordinateSpace> {
    transforms: Vec<AffineTransform>,
    #[serde(skip)]
    spaces: PhantomData<(Src, Dst)>,
}

impl<Src: CoordinateSpace, Dst: CoordinateSpace> SpaceMapping<Src, Dst> {
    /// Wrap an explicit transform sequence, applied left to right.
    pub fn from_transforms(transforms: Vec<AffineTransform>) -> Self {
        Self {
            transforms,
            spaces: PhantomData,
        }
    }

    /// Map the rectangle `source` (in `Src`) onto `dest` (in `Dst`); see
    /// [`build_pipeline`].
    pub fn build(source: &Rect, dest: &Rect, rotation: f64) -> Self {
        Self::from_transforms(build_pipeline(source, dest, rotation))
    }

    pub fn transforms(&self) -> &[AffineTransform] {
        &self.transforms
    }

    /// The whole sequence collapsed into one transform.
    pub fn composed(&self) -> AffineTransform {
        AffineTransform::compose(&self.transforms)
    }

    pub fn apply_point(&self, point: Point<Src>) -> Point<Dst> {
        point.mapped_into(&self.composed())
    }

    pub fn apply_quad(&self, quad: &Quadrilateral<Src>) -> Quadrilateral<Dst> {
        let mut transforms = self.transforms.iter();
        let Some(first) = transforms.next() else {
            return quad.mapped_into(&AffineTransform::IDENTITY);
        };
        let in_target: Quadrilateral<Dst> = quad.mapped_into(first);
        in_target.apply_transforms(transforms.as_slice())
    }

    /// The mapping back from `Dst` to `Src`, or `None` if any step is
    /// singular.
    pub fn inverse(&self) -> Option<SpaceMapping<Dst, Src>> {
        let inverted = self
            .transforms
            .iter()
            .rev()
            .map(AffineTransform::inverted)
            .collect::<Option<Vec<_>>>()?;
        Some(SpaceMapping::from_transforms(inverted))
    }
}

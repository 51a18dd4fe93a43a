// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document quadrilateral: four role-named corners in one coordinate space.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::pipeline::SpaceMapping;
use super::point::{Point, Rect, Size};
use super::space::{CartesianSpace, CoordinateSpace, FlippableSpace, PixelSpace};
use super::transform::AffineTransform;

/// Four corners describing a (possibly non-rectangular) document boundary.
///
/// Every geometric operation returns a new value. The only in-place
/// operation is [`Quadrilateral::canonicalize`], which reassigns corner roles
/// and nothing else.
///
/// The shape is not required to be convex or simple; canonicalization only
/// decides which point plays which role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral<S: CoordinateSpace> {
    pub top_left: Point<S>,
    pub top_right: Point<S>,
    pub bottom_right: Point<S>,
    pub bottom_left: Point<S>,
}

impl<S: CoordinateSpace> Quadrilateral<S> {
    // -- Construction ---------------------------------------------------------

    pub fn new(
        top_left: Point<S>,
        top_right: Point<S>,
        bottom_right: Point<S>,
        bottom_left: Point<S>,
    ) -> Self {
        Self {
            top_left,
            top_right,
            bottom_right,
            bottom_left,
        }
    }

    /// Build from corners given in top-left, top-right, bottom-right,
    /// bottom-left order.
    pub fn from_corners(corners: [Point<S>; 4]) -> Self {
        let [top_left, top_right, bottom_right, bottom_left] = corners;
        Self::new(top_left, top_right, bottom_right, bottom_left)
    }

    /// Axis-aligned rectangle covering an image of `size`, inset by `margin`
    /// on every side. The margin is clamped to half the smaller dimension so
    /// the rectangle never turns inside out.
    pub fn inset(size: Size, margin: f64) -> Self {
        let margin = margin.max(0.0).min(size.width / 2.0).min(size.height / 2.0);
        Self::new(
            Point::new(margin, margin),
            Point::new(size.width - margin, margin),
            Point::new(size.width - margin, size.height - margin),
            Point::new(margin, size.height - margin),
        )
    }

    /// The full bounds of an image of `size`.
    pub fn full(size: Size) -> Self {
        Self::inset(size, 0.0)
    }

    /// Default boundary for a capture that came without a quadrilateral.
    ///
    /// If detection ran and found nothing, the user gets an inset rectangle
    /// to drag into place; if detection never ran, the whole image is used.
    pub fn fallback(size: Size, detection_attempted: bool, margin: f64) -> Self {
        if detection_attempted {
            Self::inset(size, margin)
        } else {
            Self::full(size)
        }
    }

    // -- Accessors ------------------------------------------------------------

    /// Corners in outline order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point<S>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Axis-aligned bounding box of the four corners.
    pub fn bounding_rect(&self) -> Rect {
        Rect::bounding(&self.corners().map(Point::as_tuple))
    }

    /// Enclosed area by the shoelace formula, walking the corners in
    /// outline order. Self-intersecting outlines give the net area.
    pub fn area(&self) -> f64 {
        let corners = self.corners();
        let mut twice_area = 0.0;
        for i in 0..corners.len() {
            let j = (i + 1) % corners.len();
            twice_area += corners[i].x * corners[j].y - corners[j].x * corners[i].y;
        }
        twice_area.abs() / 2.0
    }

    pub fn is_finite(&self) -> bool {
        self.corners().iter().all(|p| p.is_finite())
    }

    // -- Transforms (pure) ----------------------------------------------------

    /// Map every corner through `transform`, staying in the same space.
    pub fn applying(&self, transform: &AffineTransform) -> Self {
        Self::from_corners(self.corners().map(|p| p.applying(transform)))
    }

    /// Apply `transforms` in order (left to right) to every corner.
    pub fn apply_transforms(&self, transforms: &[AffineTransform]) -> Self {
        transforms
            .iter()
            .fold(*self, |quad, transform| quad.applying(transform))
    }

    /// Carry the quadrilateral into another space through a typed mapping.
    pub fn map_into<T: CoordinateSpace>(&self, mapping: &SpaceMapping<S, T>) -> Quadrilateral<T> {
        mapping.apply_quad(self)
    }

    pub(crate) fn mapped_into<T: CoordinateSpace>(
        &self,
        transform: &AffineTransform,
    ) -> Quadrilateral<T> {
        Quadrilateral::from_corners(self.corners().map(|p| p.mapped_into(transform)))
    }

    // -- Canonicalization -----------------------------------------------------

    /// Reassign corner roles from the points' positions.
    ///
    /// The two points with the smallest Y become `top_left`/`top_right`
    /// (ordered by X), the remaining two become `bottom_left`/`bottom_right`
    /// (ordered by X). Both sorts are stable, so ties keep their current
    /// outline order; no further tie-break is applied.
    pub fn canonicalize(&mut self) {
        let mut points = self.corners();
        points.sort_by(|p, q| compare(p.y, q.y));

        let mut top = [points[0], points[1]];
        let mut bottom = [points[2], points[3]];
        top.sort_by(|p, q| compare(p.x, q.x));
        bottom.sort_by(|p, q| compare(p.x, q.x));

        self.top_left = top[0];
        self.top_right = top[1];
        self.bottom_left = bottom[0];
        self.bottom_right = bottom[1];
    }

    /// Value-returning form of [`Quadrilateral::canonicalize`].
    pub fn canonicalized(mut self) -> Self {
        self.canonicalize();
        self
    }

    // -- Fit scaling ----------------------------------------------------------

    /// Map a quadrilateral drawn against an image of `from_size` onto an
    /// image of `to_size`, optionally rotated by `rotation` radians.
    ///
    /// Without rotation the two sizes must have exactly the same aspect
    /// ratio; with rotation they must match crosswise (a quarter-turn family
    /// relationship). Mismatches return `None`: this never corrects aspect.
    ///
    /// With rotation, the scaled quad is rotated and then translated so the
    /// center of the scaled, rotated `from_size` bounds sits on the center of
    /// the `to_size` bounds.
    pub fn fit_scale<T: CoordinateSpace>(
        &self,
        from_size: Size,
        to_size: Size,
        rotation: f64,
    ) -> Option<Quadrilateral<T>> {
        let oriented_from = if rotation == 0.0 {
            if from_size.width / to_size.width != from_size.height / to_size.height {
                debug!(
                    space = S::NAME,
                    ?from_size,
                    ?to_size,
                    "fit_scale rejected: aspect ratios differ"
                );
                return None;
            }
            from_size
        } else {
            if from_size.height / to_size.width != from_size.width / to_size.height {
                debug!(
                    space = S::NAME,
                    ?from_size,
                    ?to_size,
                    rotation,
                    "fit_scale rejected: sizes are not related by the rotation"
                );
                return None;
            }
            from_size.swapped()
        };

        let factor = to_size.width / oriented_from.width;
        let scale = AffineTransform::uniform_scale(factor);
        let mut transform = scale;

        if rotation != 0.0 {
            let rotate = AffineTransform::rotation(rotation);
            let from_bounds = Rect::from_size(from_size).applying(&scale).applying(&rotate);
            let to_bounds = Rect::from_size(to_size);
            let recenter = AffineTransform::center_translation(&from_bounds, &to_bounds);
            transform = transform.then(&rotate).then(&recenter);
        }

        Some(self.mapped_into(&transform))
    }
}

impl<S: FlippableSpace> Quadrilateral<S> {
    /// Mirror every corner vertically (`y -> height - y`) into the partner
    /// space. Corner roles are carried over unchanged; call
    /// [`Quadrilateral::canonicalize`] afterwards if roles must reflect the
    /// new orientation.
    pub fn flip_vertical(&self, height: f64) -> Quadrilateral<S::Flipped> {
        Quadrilateral::new(
            self.top_left.flip_vertical(height),
            self.top_right.flip_vertical(height),
            self.bottom_right.flip_vertical(height),
            self.bottom_left.flip_vertical(height),
        )
    }
}

impl Quadrilateral<PixelSpace> {
    /// Convert from the top-left-origin, Y-down image convention to a
    /// bottom-left-origin, Y-up convention for an image `height` tall.
    pub fn to_origin_at_bottom_left(&self, height: f64) -> Quadrilateral<CartesianSpace> {
        self.flip_vertical(height)
    }
}

fn compare(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

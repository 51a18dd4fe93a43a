// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Points, sizes, and rectangles.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use super::space::{CoordinateSpace, FlippableSpace};
use super::transform::AffineTransform;

/// A 2D point in coordinate space `S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Point<S> {
    pub const fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    /// Map the point through `transform`, staying in the same space.
    pub fn applying(self, transform: &AffineTransform) -> Self {
        let (x, y) = transform.apply(self.x, self.y);
        Self::new(x, y)
    }

    /// Re-express the point in another space after mapping it through
    /// `transform`. Callers name the target space; nothing else changes it.
    pub(crate) fn mapped_into<T: CoordinateSpace>(self, transform: &AffineTransform) -> Point<T> {
        let (x, y) = transform.apply(self.x, self.y);
        Point::new(x, y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to `other`.
    pub fn distance_to(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn as_tuple(self) -> (f64, f64) {
        (self.x, self.y)
    }
}

impl<S: FlippableSpace> Point<S> {
    /// Mirror the vertical axis: `y -> height - y`.
    pub fn flip_vertical(self, height: f64) -> Point<S::Flipped> {
        Point::new(self.x, height - self.y)
    }
}

impl<S: CoordinateSpace> Default for Point<S> {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Width and height of an image or view.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Pixel dimensions as floating-point size.
    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(f64::from(width), f64::from(height))
    }

    /// The same size with width and height exchanged.
    pub fn swapped(self) -> Self {
        Self::new(self.height, self.width)
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn aspect_ratio(self) -> f64 {
        self.width / self.height
    }
}

/// An axis-aligned rectangle given by its minimum corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub size: Size,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            size: Size::new(width, height),
        }
    }

    /// A rectangle of `size` anchored at the origin.
    pub const fn from_size(size: Size) -> Self {
        Self { x: 0.0, y: 0.0, size }
    }

    /// Smallest rectangle containing every point in `points`.
    /// Returns the zero rectangle for an empty slice.
    pub fn bounding(points: &[(f64, f64)]) -> Self {
        let Some(&(first_x, first_y)) = points.first() else {
            return Self::default();
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first_x, first_y, first_x, first_y);
        for &(x, y) in &points[1..] {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn width(&self) -> f64 {
        self.size.width
    }

    pub fn height(&self) -> f64 {
        self.size.height
    }

    pub fn min_x(&self) -> f64 {
        self.x
    }

    pub fn min_y(&self) -> f64 {
        self.y
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.size.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.size.height
    }

    pub fn mid_x(&self) -> f64 {
        self.x + self.size.width / 2.0
    }

    pub fn mid_y(&self) -> f64 {
        self.y + self.size.height / 2.0
    }

    /// Corners in top-left, top-right, bottom-right, bottom-left order
    /// (for a Y-down space).
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_x(), self.min_y()),
            (self.max_x(), self.min_y()),
            (self.max_x(), self.max_y()),
            (self.min_x(), self.max_y()),
        ]
    }

    /// Bounding box of this rectangle after mapping its corners through
    /// `transform`.
    pub fn applying(&self, transform: &AffineTransform) -> Self {
        let mapped = self.corners().map(|(x, y)| transform.apply(x, y));
        Self::bounding(&mapped)
    }
}

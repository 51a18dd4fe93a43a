// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 2D affine transforms (scale, rotation, translation) and their composition.

use serde::{Deserialize, Serialize};

use super::point::{Rect, Size};

/// A 2D affine map.
///
/// A point `(x, y)` is mapped to
///
/// ```text
/// x' = a * x + c * y + tx
/// y' = b * x + d * y + ty
/// ```
///
/// Composition is explicit and ordered: `first.then(&second)` applies
/// `first` and then `second`. Sequences are always applied left to right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    // -- Construction ---------------------------------------------------------

    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub const fn uniform_scale(factor: f64) -> Self {
        Self::scale(factor, factor)
    }

    /// Rotation by `radians` about the origin. Positive angles turn the +X
    /// axis toward +Y.
    pub fn rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self::new(cos, sin, -sin, cos, 0.0, 0.0)
    }

    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// Uniform scale that makes `from` cover `into` entirely (aspect fill):
    /// the larger of the two per-axis ratios.
    pub fn aspect_fill_scale(from: Size, into: Size) -> Self {
        let factor = (into.width / from.width).max(into.height / from.height);
        Self::uniform_scale(factor)
    }

    /// Translation moving the center of `from` onto the center of `to`.
    pub fn center_translation(from: &Rect, to: &Rect) -> Self {
        Self::translation(to.mid_x() - from.mid_x(), to.mid_y() - from.mid_y())
    }

    // -- Algebra --------------------------------------------------------------

    /// Map a coordinate pair.
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.tx,
            self.b * x + self.d * y + self.ty,
        )
    }

    /// The transform equivalent to applying `self` and then `next`.
    pub fn then(&self, next: &Self) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            tx: self.tx * next.a + self.ty * next.c + next.tx,
            ty: self.tx * next.b + self.ty * next.d + next.ty,
        }
    }

    /// Collapse a sequence into one transform, applying entries left to right.
    pub fn compose(sequence: &[Self]) -> Self {
        sequence
            .iter()
            .fold(Self::IDENTITY, |acc, next| acc.then(next))
    }

    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// The inverse map, or `None` when the transform collapses the plane.
    pub fn inverted(&self) -> Option<Self> {
        let det = self.determinant();
        if !det.is_finite() || det.abs() < f64::EPSILON {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(self.tx * a + self.ty * c),
            ty: -(self.tx * b + self.ty * d),
        })
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

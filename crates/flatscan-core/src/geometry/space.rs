// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Coordinate space markers. Points and quadrilaterals carry their space as a
// zero-sized type parameter so that crossing from one space to another has to
// go through an explicit conversion.

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

/// A named coordinate system (origin corner, axis directions, units).
pub trait CoordinateSpace:
    Debug + Clone + Copy + PartialEq + Default + Send + Sync + 'static
{
    /// Human-readable name used in log fields.
    const NAME: &'static str;
}

/// A space whose vertical axis can be mirrored into a partner space by
/// `y -> height - y`. Mirroring twice returns to the original space.
pub trait FlippableSpace: CoordinateSpace {
    type Flipped: FlippableSpace<Flipped = Self>;
}

/// Space in which the external rectangle detector reports candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectorSpace;

/// Space of the on-screen preview / editing view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DisplaySpace;

/// Source-image pixels: origin at the top-left corner, Y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelSpace;

/// Source-image pixels with the origin at the bottom-left corner and Y
/// growing upward, the convention the perspective warp is set up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CartesianSpace;

impl CoordinateSpace for DetectorSpace {
    const NAME: &'static str = "detector";
}

impl CoordinateSpace for DisplaySpace {
    const NAME: &'static str = "display";
}

impl CoordinateSpace for PixelSpace {
    const NAME: &'static str = "pixel";
}

impl CoordinateSpace for CartesianSpace {
    const NAME: &'static str = "cartesian";
}

impl FlippableSpace for PixelSpace {
    type Flipped = CartesianSpace;
}

impl FlippableSpace for CartesianSpace {
    type Flipped = PixelSpace;
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: warps the region inside a document
// quadrilateral onto an axis-aligned rectangle.

use flatscan_core::config::{ScanConfig, WarpInterpolation};
use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::geometry::{CartesianSpace, PixelSpace, Point, Quadrilateral};
use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use crate::image::ScanImage;

/// Flattens the area inside a quadrilateral into an upright rectangle.
///
/// The output size is the bounding box of the quadrilateral after it has
/// been moved to a bottom-left origin and canonicalized, so the aspect ratio
/// of the result is fixed by the quadrilateral itself.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    config: ScanConfig,
}

impl Rectifier {
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Rectify `image` using `quad`, given in the upright image's pixel
    /// space (top-left origin, Y down).
    ///
    /// ## Pipeline
    ///
    /// 1. Bake the orientation tag into an RGBA copy of the pixels
    /// 2. Move the quad to a bottom-left origin and canonicalize it there
    /// 3. Map its corners onto the corners of its own bounding box with a
    ///    projective warp
    /// 4. Materialize the warp at full size, or at a reduced scale when the
    ///    full size exceeds the pixel budget or cannot be allocated
    /// 5. Return the result tagged upright
    ///
    /// Failures are terminal for this attempt; nothing is retried.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn rectify(
        &self,
        image: &ScanImage,
        quad: &Quadrilateral<PixelSpace>,
    ) -> Result<ScanImage> {
        if image.is_empty() {
            return Err(FlatscanError::ImageConversion(format!(
                "cannot render a {}x{} image",
                image.width(),
                image.height()
            )));
        }
        if !quad.is_finite() {
            return Err(FlatscanError::InvalidQuadrilateral(format!(
                "non-finite corner in {quad:?}"
            )));
        }

        let source = image.to_upright_rgba8();
        let image_height = f64::from(source.height());

        let mut cartesian = quad.to_origin_at_bottom_left(image_height);
        cartesian.canonicalize();
        debug!(
            top_left = ?cartesian.top_left.as_tuple(),
            top_right = ?cartesian.top_right.as_tuple(),
            bottom_right = ?cartesian.bottom_right.as_tuple(),
            bottom_left = ?cartesian.bottom_left.as_tuple(),
            "Quadrilateral canonicalized at bottom-left origin"
        );

        let plan = WarpPlan::new(&cartesian, image_height)?;
        let output = match plan.render(&source, plan.width, plan.height, &self.config) {
            Ok(output) => output,
            Err(err) => {
                warn!(
                    error = %err,
                    width = plan.width,
                    height = plan.height,
                    "Full-size warp could not be materialized; rendering reduced"
                );
                let (width, height) = plan.reduced_size(self.config.max_output_pixels);
                plan.render(&source, width, height, &self.config)?
            }
        };

        info!(
            out_w = output.width(),
            out_h = output.height(),
            "Perspective rectification applied"
        );
        Ok(ScanImage::from_dynamic(DynamicImage::ImageRgba8(output)))
    }
}

/// Per-axis scale of the retry after a within-budget allocation failure.
const ALLOCATION_RETRY_SCALE: f64 = 0.5;

/// Everything the warp needs besides the pixels: where the four source
/// corners are and how large the flattened rectangle is.
#[derive(Debug, Clone, Copy)]
struct WarpPlan {
    /// Source corners in pixel space, in output top-left, top-right,
    /// bottom-right, bottom-left order.
    source_corners: [(f32, f32); 4],
    /// Flattened width at full resolution.
    width: u32,
    /// Flattened height at full resolution.
    height: u32,
}

impl WarpPlan {
    /// Plan the warp for a canonicalized bottom-left-origin quad over an
    /// image `image_height` pixels tall.
    fn new(cartesian: &Quadrilateral<CartesianSpace>, image_height: f64) -> Result<Self> {
        let bounds = cartesian.bounding_rect();
        if bounds.width() < f64::EPSILON || bounds.height() < f64::EPSILON {
            return Err(FlatscanError::InvalidQuadrilateral(format!(
                "quadrilateral has no extent ({} x {})",
                bounds.width(),
                bounds.height()
            )));
        }
        let width = pixel_extent(bounds.width())?;
        let height = pixel_extent(bounds.height())?;

        // With Y up, the canonical "bottom" corners are the visually upper
        // edge of the document, so they map to the output's first row.
        // Roles carry over unchanged through the flip back to pixel space.
        let pixel = cartesian.flip_vertical(image_height);
        let as_f32 = |p: Point<PixelSpace>| (p.x as f32, p.y as f32);
        let source_corners = [
            as_f32(pixel.bottom_left),
            as_f32(pixel.bottom_right),
            as_f32(pixel.top_right),
            as_f32(pixel.top_left),
        ];

        Ok(Self {
            source_corners,
            width,
            height,
        })
    }

    /// Size for the reduced render.
    ///
    /// Over budget, this is the uniformly scaled size that fits `budget`.
    /// Within budget the full size could not be allocated, so each axis is
    /// halved instead. When the short axis bottoms out at one pixel the long
    /// axis is cut to whatever still fits.
    fn reduced_size(&self, budget: u64) -> (u32, u32) {
        let budget = budget.max(1) as f64;
        let (full_w, full_h) = (f64::from(self.width), f64::from(self.height));
        let full = full_w * full_h;
        let factor = if full > budget {
            (budget / full).sqrt()
        } else {
            ALLOCATION_RETRY_SCALE
        };

        let mut width = (full_w * factor).floor().max(1.0);
        let mut height = (full_h * factor).floor().max(1.0);
        if width * height > budget {
            if width <= height {
                height = (budget / width).floor().max(1.0);
            } else {
                width = (budget / height).floor().max(1.0);
            }
        }
        (width as u32, height as u32)
    }

    /// Render the warp into a `width` x `height` buffer.
    fn render(
        &self,
        source: &RgbaImage,
        width: u32,
        height: u32,
        config: &ScanConfig,
    ) -> Result<RgbaImage> {
        let pixels = u64::from(width) * u64::from(height);
        if pixels > config.max_output_pixels {
            return Err(FlatscanError::Warp(format!(
                "{width}x{height} output exceeds the {} pixel budget",
                config.max_output_pixels
            )));
        }

        let (w, h) = (width as f32, height as f32);
        let dest = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let projection = Projection::from_control_points(self.source_corners, dest)
            .ok_or_else(|| {
                FlatscanError::InvalidQuadrilateral(
                    "corners do not define a projective mapping".into(),
                )
            })?;

        let mut output = allocate(width, height)?;
        let [r, g, b, a] = config.fill_color;
        warp_into(
            source,
            &projection,
            interpolation(config.interpolation),
            Rgba([r, g, b, a]),
            &mut output,
        );
        Ok(output)
    }
}

/// Round a positive extent to a whole pixel count, at least one.
fn pixel_extent(extent: f64) -> Result<u32> {
    let rounded = extent.round().max(1.0);
    if !rounded.is_finite() || rounded > f64::from(u32::MAX) {
        return Err(FlatscanError::Warp(format!(
            "extent {extent} cannot be represented as an image dimension"
        )));
    }
    Ok(rounded as u32)
}

/// Allocate a zeroed RGBA buffer without aborting on allocation failure.
fn allocate(width: u32, height: u32) -> Result<RgbaImage> {
    let len = u64::from(width) * u64::from(height) * 4;
    let len = usize::try_from(len).map_err(|_| {
        FlatscanError::Warp(format!("{width}x{height} buffer exceeds the address space"))
    })?;
    let mut data: Vec<u8> = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|err| FlatscanError::Warp(format!("cannot allocate {len} bytes: {err}")))?;
    data.resize(len, 0);
    RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        FlatscanError::Warp(format!("buffer does not fit a {width}x{height} image"))
    })
}

fn interpolation(kind: WarpInterpolation) -> Interpolation {
    match kind {
        WarpInterpolation::Nearest => Interpolation::Nearest,
        WarpInterpolation::Bilinear => Interpolation::Bilinear,
        WarpInterpolation::Bicubic => Interpolation::Bicubic,
    }
}

// -- Tests --------------------------------------------------------------------

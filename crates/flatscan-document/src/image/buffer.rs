// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan image buffer: decoded pixels plus the orientation tag the capture
// device attached to them.

use std::fmt;

use flatscan_core::error::{FlatscanError, Result};
use flatscan_core::geometry::Size;
use image::metadata::Orientation;
use image::{DynamicImage, RgbaImage};
use tracing::{debug, instrument};

/// A captured (or rectified) image.
///
/// The stored pixels may be sideways or mirrored; `orientation` says how to
/// turn them upright. Quadrilaterals in pixel space always refer to the
/// upright image, whose dimensions are [`ScanImage::oriented_size`].
#[derive(Clone)]
pub struct ScanImage {
    /// The stored pixels.
    image: DynamicImage,
    /// How the stored pixels must be transformed to display upright.
    orientation: Orientation,
}

impl ScanImage {
    // -- Construction ---------------------------------------------------------

    /// Wrap already-upright pixels.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::with_orientation(image, Orientation::NoTransforms)
    }

    /// Wrap pixels that still need `orientation` applied to display upright.
    pub fn with_orientation(image: DynamicImage, orientation: Orientation) -> Self {
        Self { image, orientation }
    }

    /// Build from tightly packed RGBA8 bytes.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        let buffer = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            FlatscanError::ImageConversion(format!(
                "{len} bytes cannot hold a {width}x{height} RGBA image"
            ))
        })?;
        Ok(Self::from_dynamic(DynamicImage::ImageRgba8(buffer)))
    }

    // -- Accessors ------------------------------------------------------------

    /// Stored width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Stored height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Whether the stored pixels already display upright.
    pub fn is_upright(&self) -> bool {
        self.orientation == Orientation::NoTransforms
    }

    /// Size of the image once displayed upright.
    pub fn oriented_size(&self) -> Size {
        let stored = Size::from_pixels(self.width(), self.height());
        if swaps_axes(self.orientation) {
            stored.swapped()
        } else {
            stored
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Borrow the stored pixels.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the image and return the stored pixels.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Orientation ----------------------------------------------------------

    /// Bake the orientation tag into the pixels, leaving an upright image
    /// tagged `NoTransforms`.
    #[instrument(skip(self), fields(orientation = ?self.orientation))]
    pub fn upright(self) -> Self {
        if self.is_upright() {
            return self;
        }
        let Self {
            mut image,
            orientation,
        } = self;
        image.apply_orientation(orientation);
        debug!(
            width = image.width(),
            height = image.height(),
            "Orientation applied to pixels"
        );
        Self::from_dynamic(image)
    }

    /// Upright RGBA8 copy of the pixels, the form the warp samples from.
    pub(crate) fn to_upright_rgba8(&self) -> RgbaImage {
        let rgba = self.image.to_rgba8();
        if self.is_upright() {
            return rgba;
        }
        let mut oriented = DynamicImage::ImageRgba8(rgba);
        oriented.apply_orientation(self.orientation);
        oriented.into_rgba8()
    }

    /// Rotate the upright image clockwise by `turns` quarter turns
    /// (negative turns rotate counter-clockwise). The result is upright.
    #[instrument(skip(self))]
    pub fn rotate_quarter_turns(self, turns: i32) -> Self {
        let upright = self.upright();
        let rotated = match turns.rem_euclid(4) {
            1 => upright.image.rotate90(),
            2 => upright.image.rotate180(),
            3 => upright.image.rotate270(),
            _ => return upright,
        };
        debug!(
            width = rotated.width(),
            height = rotated.height(),
            "Quarter-turn rotation applied"
        );
        Self::from_dynamic(rotated)
    }
}

impl fmt::Debug for ScanImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("color", &self.image.color())
            .field("orientation", &self.orientation)
            .finish()
    }
}

fn swaps_axes(orientation: Orientation) -> bool {
    matches!(
        orientation,
        Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn marked_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]));
        // Red marker in the stored top-left corner.
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn oriented_size_swaps_for_quarter_turns() {
        let image = ScanImage::with_orientation(marked_image(300, 200), Orientation::Rotate90);
        assert_eq!(image.oriented_size(), Size::new(200.0, 300.0));
        assert!(!image.is_upright());

        let flipped =
            ScanImage::with_orientation(marked_image(300, 200), Orientation::FlipVertical);
        assert_eq!(flipped.oriented_size(), Size::new(300.0, 200.0));
    }

    #[test]
    fn upright_bakes_rotation_into_pixels() {
        let image = ScanImage::with_orientation(marked_image(3, 2), Orientation::Rotate90);
        let upright = image.upright();
        assert!(upright.is_upright());
        assert_eq!((upright.width(), upright.height()), (2, 3));
        // Clockwise quarter turn moves the stored top-left to the top-right.
        let rgba = upright.as_dynamic().to_rgba8();
        assert_eq!(rgba.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn upright_rgba_copy_matches_upright() {
        let image = ScanImage::with_orientation(marked_image(4, 2), Orientation::Rotate270);
        let copy = image.to_upright_rgba8();
        let baked = image.upright().as_dynamic().to_rgba8();
        assert_eq!(copy, baked);
    }

    #[test]
    fn from_rgba8_rejects_short_buffers() {
        let err = ScanImage::from_rgba8(4, 4, vec![0; 10]).unwrap_err();
        assert!(matches!(err, FlatscanError::ImageConversion(_)));

        let ok = ScanImage::from_rgba8(2, 2, vec![7; 16]).expect("exact length");
        assert_eq!(ok.oriented_size(), Size::new(2.0, 2.0));
    }

    #[test]
    fn quarter_turns_wrap_around() {
        let image = ScanImage::from_dynamic(marked_image(5, 3));
        assert_eq!(image.clone().rotate_quarter_turns(1).width(), 3);
        assert_eq!(image.clone().rotate_quarter_turns(4).width(), 5);
        assert_eq!(image.clone().rotate_quarter_turns(-1).width(), 3);
        assert_eq!(image.rotate_quarter_turns(2).height(), 3);
    }

    #[test]
    fn debug_output_omits_pixels() {
        let image = ScanImage::from_dynamic(marked_image(2, 2));
        let text = format!("{image:?}");
        assert!(text.contains("width: 2"));
        assert!(text.len() < 200);
    }
}

// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the flatscan-document crate. Measures the
// perspective rectifier on a synthetic capture, upright and sideways.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgba, RgbaImage};

use flatscan_core::geometry::{PixelSpace, Point, Quadrilateral};
use flatscan_document::{Orientation, Rectifier, ScanImage};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// A 640x480 capture: dark background with a lighter page whose corners are
/// slightly skewed, plus the quadrilateral around that page.
fn synthetic_capture() -> (DynamicImage, Quadrilateral<PixelSpace>) {
    let img = RgbaImage::from_fn(640, 480, |x, y| {
        if (80..560).contains(&x) && (60..420).contains(&y) {
            Rgba([235, 235, 230, 255])
        } else {
            Rgba([30, 30, 30, 255])
        }
    });
    let quad = Quadrilateral::new(
        Point::new(84.0, 58.0),
        Point::new(562.0, 66.0),
        Point::new(555.0, 421.0),
        Point::new(78.0, 414.0),
    );
    (DynamicImage::ImageRgba8(img), quad)
}

fn bench_rectify(c: &mut Criterion) {
    let (dynamic, quad) = synthetic_capture();
    let rectifier = Rectifier::default();

    let upright = ScanImage::from_dynamic(dynamic.clone());
    c.bench_function("rectify (640x480 upright)", |b| {
        b.iter(|| {
            let result = rectifier.rectify(black_box(&upright), black_box(&quad));
            black_box(result.ok());
        });
    });

    // Stored a quarter turn counter-clockwise, tagged to display upright.
    let sideways = ScanImage::with_orientation(dynamic.rotate270(), Orientation::Rotate90);
    c.bench_function("rectify (640x480 rotate90 tag)", |b| {
        b.iter(|| {
            let result = rectifier.rectify(black_box(&sideways), black_box(&quad));
            black_box(result.ok());
        });
    });
}

criterion_group!(benches, bench_rectify);
criterion_main!(benches);

//! Arrow annotation rendering onto screenshots
//!
//! Draws an arrow pointing at each callout target plus a label placard near
//! the arrow tail, color-coded by the callout's success flag. Glyph
//! rasterization is out of scope (no font loading); the placard marks the
//! spot, the narrative report carries the text.

use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use tracing::debug;

use tagwatch_core::{Annotator, ArrowDirection, Callout, MonitorError, Result};

const ARROW_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
const SUCCESS_BORDER: Rgba<u8> = Rgba([0, 150, 0, 255]);
const FAILURE_BORDER: Rgba<u8> = Rgba([200, 0, 0, 255]);
const PLACARD_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Arrow length from tail to target, in pixels.
const ARROW_OFFSET: i64 = 80;
/// Arrowhead side length, in pixels.
const HEAD_LENGTH: f64 = 15.0;
/// Arrowhead half-angle, radians.
const HEAD_ANGLE: f64 = std::f64::consts::PI / 6.0;
/// Estimated glyph advance used to size placards.
const CHAR_WIDTH: i64 = 8;
const PLACARD_HEIGHT: i64 = 20;
const PLACARD_BORDER: i64 = 2;

/// Screenshot annotator drawing arrows and label placards.
#[derive(Debug, Clone, Default)]
pub struct ArrowAnnotator;

impl Annotator for ArrowAnnotator {
    fn annotate(&self, screenshot: &Path, callouts: &[Callout]) -> Result<PathBuf> {
        let mut img = image::open(screenshot)
            .map_err(|e| MonitorError::Annotation(e.to_string()))?
            .to_rgba8();

        for callout in callouts {
            draw_callout(&mut img, callout);
        }

        let out = annotated_path(screenshot);
        img.save(&out).map_err(|e| MonitorError::Annotation(e.to_string()))?;
        debug!("Annotated screenshot saved: {}", out.display());
        Ok(out)
    }
}

/// `shot.png` -> `shot_annotated.png`, beside the original.
fn annotated_path(screenshot: &Path) -> PathBuf {
    let stem = screenshot
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "screenshot".to_string());
    screenshot.with_file_name(format!("{stem}_annotated.png"))
}

fn draw_callout(img: &mut RgbaImage, callout: &Callout) {
    let (tx, ty) = (callout.x, callout.y);
    let (sx, sy) = match callout.direction {
        ArrowDirection::Left => (tx - ARROW_OFFSET, ty),
        ArrowDirection::Right => (tx + ARROW_OFFSET, ty),
        ArrowDirection::Top => (tx, ty - ARROW_OFFSET),
        ArrowDirection::Bottom => (tx, ty + ARROW_OFFSET),
    };

    draw_line(img, (sx, sy), (tx, ty), ARROW_COLOR);
    draw_arrowhead(img, (sx, sy), (tx, ty));
    draw_placard(img, callout, (sx, sy));
}

/// Bresenham line, thickened by one pixel on each side.
fn draw_line(img: &mut RgbaImage, from: (i64, i64), to: (i64, i64), color: Rgba<u8>) {
    let (mut x, mut y) = from;
    let (x1, y1) = to;
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        for ox in -1..=1 {
            for oy in -1..=1 {
                put_pixel_checked(img, x + ox, y + oy, color);
            }
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Filled triangular arrowhead at the target end of the shaft.
fn draw_arrowhead(img: &mut RgbaImage, from: (i64, i64), to: (i64, i64)) {
    let angle = ((to.1 - from.1) as f64).atan2((to.0 - from.0) as f64);
    let tip = (to.0 as f64, to.1 as f64);
    let left = (
        tip.0 - HEAD_LENGTH * (angle - HEAD_ANGLE).cos(),
        tip.1 - HEAD_LENGTH * (angle - HEAD_ANGLE).sin(),
    );
    let right = (
        tip.0 - HEAD_LENGTH * (angle + HEAD_ANGLE).cos(),
        tip.1 - HEAD_LENGTH * (angle + HEAD_ANGLE).sin(),
    );

    fill_triangle(img, tip, left, right, ARROW_COLOR);
}

/// Scanline-free triangle fill: test every pixel of the bounding box
/// against the three edge functions. Arrowheads are tiny, so this is cheap.
fn fill_triangle(
    img: &mut RgbaImage,
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    color: Rgba<u8>,
) {
    let min_x = a.0.min(b.0).min(c.0).floor() as i64;
    let max_x = a.0.max(b.0).max(c.0).ceil() as i64;
    let min_y = a.1.min(b.1).min(c.1).floor() as i64;
    let max_y = a.1.max(b.1).max(c.1).ceil() as i64;

    let edge = |p: (f64, f64), q: (f64, f64), x: f64, y: f64| {
        (q.0 - p.0) * (y - p.1) - (q.1 - p.1) * (x - p.0)
    };

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let (fx, fy) = (x as f64 + 0.5, y as f64 + 0.5);
            let w0 = edge(a, b, fx, fy);
            let w1 = edge(b, c, fx, fy);
            let w2 = edge(c, a, fx, fy);
            let inside = (w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0)
                || (w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0);
            if inside {
                put_pixel_checked(img, x, y, color);
            }
        }
    }
}

/// Label placard near the arrow tail: filled box sized to the label, with
/// a border colored by the success flag.
fn draw_placard(img: &mut RgbaImage, callout: &Callout, tail: (i64, i64)) {
    let width = callout.label.chars().count() as i64 * CHAR_WIDTH + 2 * PLACARD_BORDER + 8;
    let height = PLACARD_HEIGHT;

    // Keep the placard clear of the shaft: above-left of the tail, nudged
    // to the side the arrow comes from.
    let (x0, y0) = match callout.direction {
        ArrowDirection::Right | ArrowDirection::Bottom => (tail.0 + 4, tail.1 - height - 4),
        ArrowDirection::Left | ArrowDirection::Top => (tail.0 - width - 4, tail.1 - height - 4),
    };

    let border = if callout.success { SUCCESS_BORDER } else { FAILURE_BORDER };

    for y in y0..y0 + height {
        for x in x0..x0 + width {
            let on_border = x - x0 < PLACARD_BORDER
                || x0 + width - 1 - x < PLACARD_BORDER
                || y - y0 < PLACARD_BORDER
                || y0 + height - 1 - y < PLACARD_BORDER;
            put_pixel_checked(img, x, y, if on_border { border } else { PLACARD_FILL });
        }
    }
}

fn put_pixel_checked(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

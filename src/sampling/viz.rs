//! Spectrogram visualization helpers
//!
//! Renders 2-D amplitude planes as heatmap PNGs. Sampling emits a composite
//! image stacking source, real target and synthesized target vertically so
//! the three spectrograms can be compared at a glance.

use std::path::Path;

use anyhow::{bail, Context, Result};
use image::{Rgb, RgbImage};
use tch::{Kind, Tensor};

/// Linear interpolation between two colors.
fn interpolate_color(c1: Rgb<u8>, c2: Rgb<u8>, t: f64) -> Rgb<u8> {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t) as u8;
    Rgb([
        lerp(c1.0[0], c2.0[0]),
        lerp(c1.0[1], c2.0[1]),
        lerp(c1.0[2], c2.0[2]),
    ])
}

/// Map a normalized amplitude in [0, 1] onto a black-blue-cyan-yellow-red
/// heatmap ramp.
pub fn heatmap_color(value: f64) -> Rgb<u8> {
    let v = value.clamp(0.0, 1.0);

    if v < 0.25 {
        interpolate_color(Rgb([0, 0, 0]), Rgb([0, 0, 255]), v / 0.25)
    } else if v < 0.5 {
        interpolate_color(Rgb([0, 0, 255]), Rgb([0, 255, 255]), (v - 0.25) / 0.25)
    } else if v < 0.75 {
        interpolate_color(Rgb([0, 255, 255]), Rgb([255, 255, 0]), (v - 0.5) / 0.25)
    } else {
        interpolate_color(Rgb([255, 255, 0]), Rgb([255, 0, 0]), (v - 0.75) / 0.25)
    }
}

/// Render one 2-D spectrogram plane as a heatmap image.
///
/// Amplitudes are min-max normalized per plane; a constant plane renders
/// as a uniform image instead of dividing by zero.
pub fn specgram_to_image(plane: &Tensor) -> Result<RgbImage> {
    let (h, w) = plane
        .size2()
        .context("spectrogram plane must be 2-dimensional")?;

    let flat: Vec<f64> = Vec::try_from(plane.reshape([-1]).to_kind(Kind::Double))
        .context("failed to extract spectrogram values")?;

    let min = flat.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = flat.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let mut img = RgbImage::new(w as u32, h as u32);
    for y in 0..h as usize {
        for x in 0..w as usize {
            let v = flat[y * w as usize + x];
            let norm = if range > 0.0 { (v - min) / range } else { 0.0 };
            img.put_pixel(x as u32, y as u32, heatmap_color(norm));
        }
    }

    Ok(img)
}

/// Write a vertically stacked composite of several planes to a PNG file.
pub fn write_composite(planes: &[Tensor], path: &Path) -> Result<()> {
    if planes.is_empty() {
        bail!("composite requires at least one plane");
    }

    let rendered = planes
        .iter()
        .map(specgram_to_image)
        .collect::<Result<Vec<_>>>()?;

    let width = rendered[0].width();
    if rendered.iter().any(|img| img.width() != width) {
        bail!("composite planes must share a common width");
    }
    let total_height: u32 = rendered.iter().map(|img| img.height()).sum();

    let mut composite = RgbImage::new(width, total_height);
    let mut offset = 0;
    for img in &rendered {
        for (x, y, pixel) in img.enumerate_pixels() {
            composite.put_pixel(x, offset + y, *pixel);
        }
        offset += img.height();
    }

    composite
        .save(path)
        .with_context(|| format!("failed to write composite image {}", path.display()))?;
    Ok(())
}

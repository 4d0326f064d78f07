//! Conversion of signed-intensity arrays into premultiplied pixmaps.
//!
//! Stimulus arrays hold values in `[-1, 1]`: `-1` maps to black (or fully
//! transparent for masks), `+1` to full intensity.

use anyhow::{Context, Result, ensure};
use ndarray::{Array2, Array3, Axis};
use tiny_skia::{ColorU8, Pixmap};

pub fn signed_to_u8(v: f64) -> u8 {
    ((v.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8
}

fn blank(width: usize, height: usize) -> Result<Pixmap> {
    Pixmap::new(width as u32, height as u32)
        .with_context(|| format!("cannot allocate {width}x{height} pixmap"))
}

/// RGB texture (`rows x cols x 3`) with its mask as alpha. Colour values are
/// scaled by `contrast` before conversion.
pub fn rgb_pixmap(texture: &Array3<f64>, mask: &Array2<f64>, contrast: f64) -> Result<Pixmap> {
    let (rows, cols, channels) = texture.dim();
    ensure!(channels == 3, "texture has {channels} channels, expected 3");
    ensure!(
        mask.dim() == (rows, cols),
        "mask {:?} does not match texture {rows}x{cols}",
        mask.dim()
    );

    let mut pm = blank(cols, rows)?;
    let pixels = pm.pixels_mut();
    for (px, (lane, alpha)) in pixels.iter_mut().zip(texture.lanes(Axis(2)).into_iter().zip(mask.iter())) {
        let [r, g, b] = [lane[0], lane[1], lane[2]].map(|v| signed_to_u8(v * contrast));
        *px = ColorU8::from_rgba(r, g, b, signed_to_u8(*alpha)).premultiply();
    }
    Ok(pm)
}

/// Grey-level image with a mask as alpha.
pub fn gray_pixmap(values: &Array2<f64>, mask: &Array2<f64>, contrast: f64) -> Result<Pixmap> {
    let (rows, cols) = values.dim();
    ensure!(
        mask.dim() == (rows, cols),
        "mask {:?} does not match image {rows}x{cols}",
        mask.dim()
    );

    let mut pm = blank(cols, rows)?;
    for (px, (v, a)) in pm.pixels_mut().iter_mut().zip(values.iter().zip(mask.iter())) {
        let level = signed_to_u8(v * contrast);
        *px = ColorU8::from_rgba(level, level, level, signed_to_u8(*a)).premultiply();
    }
    Ok(pm)
}

use ndarray::{Array2, Array3, Axis};
use std::f64::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Red = 0,
    Green = 1,
    Blue = 2,
}

/// Sinusoidal grating on a `res x res` grid.
///
/// `cycles` is the number of periods across the grid. At `ori_deg = 0` the
/// intensity varies along the columns.
pub fn make_grating(res: usize, cycles: f64, ori_deg: f64, phase_deg: f64, contrast: f64) -> Array2<f64> {
    let step = if res == 0 { 0.0 } else { cycles * TAU / res as f64 };
    let (sin_o, cos_o) = (-ori_deg.to_radians()).sin_cos();
    let phase = phase_deg.to_radians();
    Array2::from_shape_fn((res, res), |(i, j)| {
        let x = i as f64 * step;
        let y = j as f64 * step;
        contrast * (x * sin_o + y * cos_o + phase).sin()
    })
}

/// RGB texture that is black everywhere except `channel`, which carries the grating.
pub fn anaglyph_texture(grating: &Array2<f64>, channel: ColorChannel) -> Array3<f64> {
    let (rows, cols) = grating.dim();
    let mut texture = Array3::from_elem((rows, cols, 3), -1.0);
    texture
        .index_axis_mut(Axis(2), channel as usize)
        .assign(grating);
    texture
}

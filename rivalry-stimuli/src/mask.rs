use ndarray::Array2;
use std::f64::consts::PI;

fn centred(i: usize, n: usize) -> f64 {
    (2 * i + 1) as f64 / n as f64 - 1.0
}

/// Distance of every pixel centre from the middle of an `n x n` grid,
/// normalised so the inscribed circle has radius 1.
pub fn radial_matrix(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| centred(i, n).hypot(centred(j, n)))
}

pub fn circle_mask(n: usize) -> Array2<f64> {
    radial_matrix(n).mapv(|r| if r < 1.0 { 1.0 } else { -1.0 })
}

/// Circular mask with a raised-cosine edge.
///
/// `fringe_width` is the fraction of the radius given to the ramp.
pub fn raised_cosine_mask(n: usize, fringe_width: f64) -> Array2<f64> {
    let fringe = fringe_width.clamp(0.0, 1.0);
    let inner = 1.0 - fringe;
    radial_matrix(n).mapv(|r| {
        if r >= 1.0 {
            -1.0
        } else if r <= inner || fringe == 0.0 {
            1.0
        } else {
            // half-cosine from +1 at the ramp start to -1 at the rim
            (PI * (r - inner) / fringe).cos()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radial_matrix_is_symmetric() {
        let r = radial_matrix(8);
        assert_eq!(r.dim(), (8, 8));
        assert!((r[[0, 0]] - r[[7, 7]]).abs() < 1e-12);
        assert!((r[[0, 3]] - r[[3, 0]]).abs() < 1e-12);
        assert!(r[[3, 3]] < 0.2);
    }

    #[test]
    fn raised_cosine_is_opaque_inside_and_clear_outside() {
        let m = raised_cosine_mask(64, 0.1);
        assert_eq!(m[[32, 32]], 1.0);
        assert_eq!(m[[0, 0]], -1.0);
        assert!(m.iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn raised_cosine_ramp_decreases_with_radius() {
        let n = 200;
        let m = raised_cosine_mask(n, 0.5);
        let row = n / 2;
        let values: Vec<f64> = (row..n).map(|j| m[[row, j]]).collect();
        assert!(values.windows(2).all(|w| w[1] <= w[0] + 1e-12));
        assert!(values.iter().any(|v| *v > -1.0 && *v < 1.0));
    }

    #[test]
    fn zero_fringe_is_a_hard_circle() {
        assert_eq!(raised_cosine_mask(16, 0.0), circle_mask(16));
    }
}

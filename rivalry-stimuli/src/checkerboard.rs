use crate::error::StimulusError;
use crate::mask::raised_cosine_mask;
use crate::positive;
use ndarray::Array2;

/// Fringe of the mask put around a checkerboard
const BOARD_MASK_FRINGE: f64 = 0.2;

/// `side_len x side_len` board of alternating `-1` / `+1`, `-1` in the top-left corner.
pub fn checker_pattern(side_len: usize) -> Array2<i32> {
    Array2::from_shape_fn((side_len, side_len), |(i, j)| {
        if (i + j) % 2 == 0 { -1 } else { 1 }
    })
}

/// Repeats every element `factor` times along both axes.
pub fn upscale<T: Clone>(array: &Array2<T>, factor: usize) -> Array2<T> {
    if factor <= 1 {
        return array.clone();
    }
    let (rows, cols) = array.dim();
    Array2::from_shape_fn((rows * factor, cols * factor), |(i, j)| {
        array[[i / factor, j / factor]].clone()
    })
}

/// Integer repeat needed for `side_len` cells to cover `size` pixels
pub fn upscale_factor(size: f64, side_len: usize) -> usize {
    (size / side_len as f64).ceil().max(1.0) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckerBoard {
    pub side_len: usize,
    pub size: f64,
    pub inverted: bool,
}

impl CheckerBoard {
    pub fn new(side_len: usize, size: f64) -> Result<Self, StimulusError> {
        positive("checkerboard side length", side_len as f64)?;
        positive("checkerboard size", size)?;
        Ok(Self {
            side_len,
            size,
            inverted: false,
        })
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Upscaled board and its raised-cosine mask.
    pub fn arrays(&self) -> (Array2<i32>, Array2<f64>) {
        let board = upscale(
            &checker_pattern(self.side_len),
            upscale_factor(self.size, self.side_len),
        );
        let mask = raised_cosine_mask(board.nrows(), BOARD_MASK_FRINGE);
        let board = if self.inverted { board.mapv(|v| -v) } else { board };
        (board, mask)
    }
}

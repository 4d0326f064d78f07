use crate::checkerboard::{checker_pattern, upscale, upscale_factor};
use crate::error::StimulusError;
use crate::positive;
use ndarray::{Array1, Array2, s};

pub type Segment = ((f64, f64), (f64, f64));

/// Two-line cross, optionally rotated, centred on `pos`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cross {
    pub width: f64,
    pub height: f64,
    pub ori_deg: f64,
    pub pos: (f64, f64),
}

impl Cross {
    pub fn new(width: f64) -> Self {
        Self {
            width,
            height: width,
            ori_deg: 0.0,
            pos: (0.0, 0.0),
        }
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = height;
        self
    }

    pub fn with_ori(mut self, ori_deg: f64) -> Self {
        self.ori_deg = ori_deg;
        self
    }

    pub fn at(mut self, pos: (f64, f64)) -> Self {
        self.pos = pos;
        self
    }

    /// End points of the two bars, the first one horizontal at zero orientation.
    pub fn segments(&self) -> [Segment; 2] {
        let (sin, cos) = self.ori_deg.to_radians().sin_cos();
        let (hw, hh) = (self.width / 2.0, self.height / 2.0);
        let (px, py) = self.pos;
        let offset = |dx: f64, dy: f64| (px + dx, py + dy);
        [
            (offset(-cos * hw, sin * hh), offset(cos * hw, -sin * hh)),
            (offset(sin * hw, cos * hh), offset(-sin * hw, -cos * hh)),
        ]
    }
}

/// Checkerboard with a blanked centre disk and a plus-shaped cross image.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckerBoardCross {
    pub size: f64,
    pub side_len: usize,
    pub n_blocks: usize,
    pub inverted: bool,
    pub ratio_inner_circle: f64,
}

impl CheckerBoardCross {
    pub fn new(size: f64, side_len: usize, n_blocks: usize) -> Result<Self, StimulusError> {
        positive("checkerboard cross size", size)?;
        positive("checkerboard side length", side_len as f64)?;
        if side_len % 2 != n_blocks % 2 {
            return Err(StimulusError::ParityMismatch { side_len, n_blocks });
        }
        if n_blocks > side_len {
            return Err(StimulusError::TooManyBlocks { side_len, n_blocks });
        }
        Ok(Self {
            size,
            side_len,
            n_blocks,
            inverted: false,
            ratio_inner_circle: 1.5,
        })
    }

    /// Default layout: 16 cells per side, a two-cell wide cross
    pub fn with_size(size: f64) -> Result<Self, StimulusError> {
        Self::new(size, 16, 2)
    }

    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Upscaled board (centre disk forced to `-1`) and cross image.
    pub fn arrays(&self) -> (Array2<i32>, Array2<f64>) {
        let mut board = checker_pattern(self.side_len);
        let mut cross = Array2::from_elem((self.side_len, self.side_len), -1.0);

        let low = self.side_len / 2 - self.n_blocks / 2;
        let high = low + self.n_blocks;
        cross.slice_mut(s![low..high, ..]).fill(1.0);
        cross.slice_mut(s![.., low..high]).fill(1.0);

        let factor = upscale_factor(self.size, self.side_len);
        board = upscale(&board, factor);
        let cross = upscale(&cross, factor);

        let n = board.nrows();
        let coords = Array1::<f64>::linspace(-1.0, 1.0, n);
        for ((i, j), v) in board.indexed_iter_mut() {
            if coords[j].powi(2) + coords[i].powi(2) < self.ratio_inner_circle {
                *v = -1;
            }
        }

        let board = if self.inverted { board.mapv(|v| -v) } else { board };
        (board, cross)
    }
}

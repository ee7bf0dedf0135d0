//! Canvas sizing, grid cells, and placement positions.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Errors from grid-size parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("invalid grid size {value:?}: expected ROWSxCOLS, e.g. 3x3")]
    Malformed { value: String },

    #[error("invalid grid size {value:?}: rows and columns must be at least 1")]
    Empty { value: String },
}

/// Grid dimensions parsed from `"RxC"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: u32,
    pub cols: u32,
}

impl GridSize {
    pub fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn cell_count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    /// Every `(row, col)` in row-major order.
    pub fn positions(&self) -> Vec<(u32, u32)> {
        (0..self.rows)
            .flat_map(|r| (0..self.cols).map(move |c| (r, c)))
            .collect()
    }
}

impl FromStr for GridSize {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || GridError::Malformed {
            value: s.to_string(),
        };
        let (rows, cols) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(malformed)?;
        let rows: u32 = rows.trim().parse().map_err(|_| malformed())?;
        let cols: u32 = cols.trim().parse().map_err(|_| malformed())?;
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty {
                value: s.to_string(),
            });
        }
        Ok(Self { rows, cols })
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The canvas to compose on before an optional 90° CCW rotation.
    ///
    /// With rotation the width and height are swapped so the rotated output
    /// ends up at the configured `target` size.
    pub fn pre_rotation(target: Canvas, rotate_ccw_90: bool) -> Self {
        if rotate_ccw_90 {
            Self::new(target.height, target.width)
        } else {
            target
        }
    }
}

/// One rectangular region of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCell {
    pub row: u32,
    pub col: u32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A canvas split into equal cells (integer division; remainder pixels stay black).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub size: GridSize,
    pub canvas: Canvas,
    pub cell_width: u32,
    pub cell_height: u32,
}

impl GridLayout {
    pub fn new(size: GridSize, canvas: Canvas) -> Self {
        Self {
            size,
            canvas,
            cell_width: canvas.width / size.cols.max(1),
            cell_height: canvas.height / size.rows.max(1),
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> GridCell {
        GridCell {
            row,
            col,
            x: col * self.cell_width,
            y: row * self.cell_height,
            width: self.cell_width,
            height: self.cell_height,
        }
    }
}

/// FIFO cycle of grid positions, local to one composite run.
///
/// Positions are popped from the front and pushed back, so once every cell
/// has been used the same order repeats. Nothing prevents two simultaneous
/// events from landing on the same cell when there are more events than cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionPool {
    queue: VecDeque<(u32, u32)>,
}

impl PositionPool {
    /// All positions shuffled once with `rng`.
    pub fn shuffled<R: Rng + ?Sized>(size: GridSize, rng: &mut R) -> Self {
        let mut positions = size.positions();
        positions.shuffle(rng);
        Self {
            queue: positions.into(),
        }
    }

    /// Take the front position and re-append it.
    pub fn next_position(&mut self) -> Option<(u32, u32)> {
        let position = self.queue.pop_front()?;
        self.queue.push_back(position);
        Some(position)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

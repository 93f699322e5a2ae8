use ndarray::{Array2, ArrayView2, s};

use crate::error::ForecastError;

/// Fixed-length trailing slice of scaled observations (W rows x F features).
///
/// A window is never mutated in place; [`Window::advance`] returns the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    rows: Array2<f64>,
}

impl Window {
    pub fn new(rows: Array2<f64>) -> Result<Self, ForecastError> {
        if rows.nrows() == 0 || rows.ncols() == 0 {
            return Err(ForecastError::EmptyWindow);
        }
        Ok(Self { rows })
    }

    /// The most recent `size` rows of `history`.
    pub fn from_history(history: &Array2<f64>, size: usize) -> Result<Self, ForecastError> {
        if size == 0 {
            return Err(ForecastError::EmptyWindow);
        }
        let available = history.nrows();
        if available < size {
            return Err(ForecastError::InsufficientData {
                needed: size,
                available,
            });
        }
        Self::new(history.slice(s![available - size.., ..]).to_owned())
    }

    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.rows.ncols()
    }

    pub fn rows(&self) -> ArrayView2<'_, f64> {
        self.rows.view()
    }

    /// Drops the oldest row and appends `[prediction, 0, .., 0]`.
    ///
    /// Auxiliary features of the appended row are zero because their future
    /// values are unknown. Forecast accuracy degrades with the horizon as a result.
    pub fn advance(&self, prediction: f64) -> Window {
        let len = self.len();
        let mut next = Array2::zeros(self.rows.raw_dim());
        next.slice_mut(s![..len - 1, ..])
            .assign(&self.rows.slice(s![1.., ..]));
        next[[len - 1, 0]] = prediction;
        Window { rows: next }
    }
}

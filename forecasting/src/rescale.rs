use market_data::{Scaler, ScalerError};
use ndarray::{Array2, s};

/// Places each value in column 0 of a zero-filled (n x width) matrix.
///
/// This is the layout the scalers were fitted against: predicted value in
/// feature 0, zeros in the remaining `width - 1` features.
pub fn pad_to_width(values: &[f64], width: usize) -> Array2<f64> {
    let mut padded = Array2::zeros((values.len(), width));
    if width > 0 {
        for (row, value) in values.iter().enumerate() {
            padded[[row, 0]] = *value;
        }
    }
    padded
}

/// Maps scaled feature-0 values back to price units.
pub fn rescale(scaler: &Scaler, values: &[f64], width: usize) -> Result<Vec<f64>, ScalerError> {
    let restored = scaler.inverse_transform(&pad_to_width(values, width))?;
    Ok(restored.slice(s![.., 0]).to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn pads_with_zeros_after_column_zero() {
        assert_eq!(
            pad_to_width(&[0.5, 0.25], 3),
            array![[0.5, 0.0, 0.0], [0.25, 0.0, 0.0]]
        );
    }

    #[test]
    fn rescales_column_zero_only() {
        let scaler = Scaler::MinMax {
            data_min: vec![100.0, 0.0, 50.0],
            data_max: vec![200.0, 1000.0, 60.0],
            feature_range: (0.0, 1.0),
        };
        let prices = rescale(&scaler, &[0.0, 0.5, 1.0], 3).unwrap();
        for (got, want) in prices.iter().zip([100.0, 150.0, 200.0]) {
            assert!((got - want).abs() < 1e-9, "{} != {}", got, want);
        }
        assert_eq!(prices.len(), 3);
    }

    #[test]
    fn width_must_match_scaler() {
        let scaler = Scaler::Standard {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 1.0],
        };
        assert_eq!(
            rescale(&scaler, &[1.0], 3).unwrap_err(),
            ScalerError::Width { expected: 2, actual: 3 }
        );
    }

    #[test]
    fn empty_input_rescales_to_empty() {
        let scaler = Scaler::Standard {
            mean: vec![5.0],
            scale: vec![2.0],
        };
        assert!(rescale(&scaler, &[], 1).unwrap().is_empty());
    }
}

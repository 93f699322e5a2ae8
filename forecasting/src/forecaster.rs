use log::debug;

use crate::error::{ForecastError, ModelError};
use crate::model::Predictor;
use crate::window::Window;

/// Iterative multi-step forecast.
///
/// Each step predicts one value from the current window, records it, and
/// slides the window forward with that prediction as the newest row (see
/// [`Window::advance`]). Errors from the predictor stop the loop and are
/// returned with the 1-based step that failed.
pub fn forecast<P: Predictor + ?Sized>(
    predictor: &mut P,
    window: Window,
    horizon: usize,
) -> Result<Vec<f64>, ForecastError> {
    let mut output = Vec::with_capacity(horizon);
    let mut current = window;

    for step in 1..=horizon {
        let prediction = predictor
            .predict(&current)
            .and_then(|p| {
                if p.is_finite() {
                    Ok(p)
                } else {
                    Err(ModelError::NonFinite(p))
                }
            })
            .map_err(|source| ForecastError::Inference { step, source })?;

        output.push(prediction);
        current = current.advance(prediction);
    }

    debug!("Forecast {} steps", output.len());
    Ok(output)
}

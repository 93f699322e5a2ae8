//! Iterative multi-step forecasting over pre-trained window models.

pub mod error;
pub mod evaluation;
pub mod forecaster;
pub mod model;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod rescale;
pub mod window;

pub use error::{ForecastError, ModelError};
pub use forecaster::forecast;
pub use model::{FnPredictor, LinearWindowModel, ModelKind, Predictor, with_model};
pub use rescale::rescale;
pub use window::Window;

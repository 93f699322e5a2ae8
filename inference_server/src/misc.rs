use serde::{Deserialize, Serialize};

/// `days` arrives as a number from most clients and as a string from HTML
/// number inputs. Some clients send whole numbers as `5.0`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Days {
    Number(i64),
    Float(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub days: Option<Days>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSummary {
    pub country: String,
    #[serde(rename = "GRSI", skip_serializing_if = "Option::is_none")]
    pub grsi: Option<f64>,
    #[serde(rename = "country_GRSI", skip_serializing_if = "Option::is_none")]
    pub country_grsi: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictResponse {
    pub company: String,
    pub low_likely: Option<f64>,
    pub high_likely: Option<f64>,
    pub forecast: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plot_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskSummary>,
}

#[derive(Debug, Deserialize)]
pub struct CompanyQuery {
    pub company: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GrsiQuery {
    pub company: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

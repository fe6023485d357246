use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::i18n::Localizer;

/// Current conditions for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub city: String,
    /// Degrees Celsius, in the number form the provider sent.
    pub temp: serde_json::Number,
    pub description: String,
}

/// Why a provider call produced no report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("response body is not JSON")]
    InvalidJson,

    #[error("response has no numeric main.temp")]
    InvalidResponse,
}

impl FetchError {
    /// User-facing message for this failure.
    pub fn localize(&self, i18n: &dyn Localizer) -> String {
        match self {
            FetchError::Request(reason) => {
                let params = [("reason", reason.clone())];
                i18n.t("runtime.weather.errors.request", &params)
            }
            FetchError::Status(status) => {
                let params = [("status", status.to_string())];
                i18n.t("runtime.weather.errors.status", &params)
            }
            FetchError::InvalidJson => i18n.t("runtime.weather.errors.invalid_json", &[]),
            FetchError::InvalidResponse => i18n.t("runtime.weather.errors.invalid_response", &[]),
        }
    }
}

/// Uniform `{ok, ...}` shape returned by the tools.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResponse {
    Weather(WeatherReport),
    Message(String),
    Error(String),
}

impl ToolResponse {
    pub fn is_ok(&self) -> bool {
        !matches!(self, ToolResponse::Error(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            ToolResponse::Weather(report) => {
                let mut body = Map::new();
                body.insert("ok".into(), Value::Bool(true));
                body.insert("city".into(), Value::String(report.city.clone()));
                body.insert("temp".into(), Value::Number(report.temp.clone()));
                let description = report.description.clone();
                body.insert("description".into(), Value::String(description));
                Value::Object(body)
            }
            ToolResponse::Message(message) => json!({ "ok": true, "message": message }),
            ToolResponse::Error(error) => json!({ "ok": false, "error": error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Catalog;

    #[test]
    fn weather_response_flattens_report() {
        let response = ToolResponse::Weather(WeatherReport {
            city: "Oslo".into(),
            temp: 5.into(),
            description: "snow".into(),
        });

        assert_eq!(
            response.to_json(),
            json!({"ok": true, "city": "Oslo", "temp": 5, "description": "snow"})
        );
    }

    #[test]
    fn error_response_has_ok_false() {
        let response = ToolResponse::Error("boom".into());

        assert!(!response.is_ok());
        assert_eq!(response.to_json(), json!({"ok": false, "error": "boom"}));
    }

    #[test]
    fn status_error_mentions_code() {
        let text = FetchError::Status(401).localize(&Catalog::english());
        assert!(text.contains("401"));
    }
}

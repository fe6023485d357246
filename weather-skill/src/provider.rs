use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::model::{FetchError, WeatherReport};

/// Per-request deadline; a timed-out call is a final failure.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(6);

/// Single GET against an OpenWeather-compatible "current weather" endpoint.
#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    http: Client,
}

impl WeatherFetcher {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client for weather requests")?;

        Ok(Self { http })
    }

    /// Use a caller-configured client (proxy settings, shared connection pool).
    /// The caller is responsible for setting a timeout.
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    pub async fn fetch(
        &self,
        endpoint: &str,
        api_key: &str,
        city: &str,
    ) -> Result<WeatherReport, FetchError> {
        debug!(%endpoint, %city, "requesting current weather");

        let res = self
            .http
            .get(endpoint)
            .query(&[
                ("q", city),
                ("appid", api_key),
                ("units", "metric"),
                ("lang", "en"),
            ])
            .send()
            .await
            .map_err(request_error)?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = res.text().await.map_err(request_error)?;

        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|_| FetchError::InvalidJson)?;

        let parsed: OwCurrentResponse = serde_json::from_value(payload)
            .map_err(|_| FetchError::InvalidResponse)?;

        let temp = parsed
            .main
            .and_then(|m| m.temp)
            .ok_or(FetchError::InvalidResponse)?;

        let description = parsed
            .weather
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|w| w.description)
            .unwrap_or_default();

        Ok(WeatherReport {
            city: city.to_string(),
            temp,
            description,
        })
    }
}

/// The request URL carries `appid`, so it is dropped from the error text.
fn request_error(err: reqwest::Error) -> FetchError {
    FetchError::Request(err.without_url().to_string())
}

#[derive(Debug, Deserialize)]
struct OwMain {
    #[serde(default)]
    temp: Option<serde_json::Number>,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    main: Option<OwMain>,
    #[serde(default)]
    weather: Option<Vec<OwWeather>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_endpoint_error_omits_api_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let http = Client::builder().no_proxy().build().unwrap();
        let err = WeatherFetcher::with_client(http)
            .fetch(&format!("http://{addr}/weather"), "SECRET-KEY", "Tokyo")
            .await
            .unwrap_err();

        let FetchError::Request(reason) = &err else {
            panic!("expected a request error, got {err:?}");
        };
        assert!(!reason.contains("SECRET-KEY"), "reason: {reason}");
        assert!(!err.to_string().contains("SECRET-KEY"));
    }

    #[test]
    fn response_without_main_parses_to_none() {
        let body = r#"{"weather": null, "name": "Tokyo"}"#;
        let parsed: OwCurrentResponse = serde_json::from_str(body).unwrap();

        assert!(parsed.main.is_none());
        assert!(parsed.weather.is_none());
    }
}

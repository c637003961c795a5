//! FRED (St. Louis Fed) macro data provider.
//!
//! Fetches observations from the `fred/series/observations` JSON endpoint.
//! There is no retry loop: a failed request is fatal for the macro stage and
//! surfaces to the caller as a [`DataError`].

use super::provider::{DataError, MacroProvider, Observation};
use crate::domain::MacroSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for FRED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FredConfig {
    pub base_url: String,
    /// Explicit credential. Takes precedence over `api_key_env`.
    pub api_key: Option<String>,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.stlouisfed.org/fred/series/observations".into(),
            api_key: None,
            api_key_env: "FRED_API_KEY".into(),
            timeout_secs: 30,
        }
    }
}

impl FredConfig {
    /// The API credential from config, falling back to the environment.
    pub fn resolve_api_key(&self) -> Result<String, DataError> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Ok(key.clone());
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(DataError::AuthenticationRequired(format!(
                "no FRED API key configured (set macro_data.api_key or ${})",
                self.api_key_env
            ))),
        }
    }
}

/// FRED observations response.
#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Vec<RawObservation>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

/// FRED error body (returned with 4xx statuses).
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error_message: String,
}

/// FRED data provider.
pub struct FredProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

impl FredProvider {
    pub fn new(config: &FredConfig) -> Result<Self, DataError> {
        let api_key = config.resolve_api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    /// Build the observations URL for a series.
    fn observations_url(&self, series: MacroSeries, start: NaiveDate) -> String {
        format!(
            "{}?series_id={}&api_key={}&file_type=json&observation_start={}",
            self.base_url,
            series.fred_code(),
            self.api_key,
            start.format("%Y-%m-%d")
        )
    }

    /// Parse the observations array. FRED encodes missing values as ".".
    fn parse_response(
        series: MacroSeries,
        resp: ObservationsResponse,
    ) -> Result<Vec<Observation>, DataError> {
        let mut out = Vec::with_capacity(resp.observations.len());
        for raw in resp.observations {
            if raw.value.trim() == "." {
                continue;
            }
            let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d").map_err(|e| {
                DataError::ResponseFormatChanged(format!("bad date '{}': {e}", raw.date))
            })?;
            let value = raw.value.trim().parse::<f64>().map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "bad value '{}' for {}: {e}",
                    raw.value,
                    series.fred_code()
                ))
            })?;
            out.push(Observation { date, value });
        }

        if out.is_empty() {
            return Err(DataError::EmptySeries {
                series: series.fred_code().to_string(),
            });
        }
        out.sort_by_key(|o| o.date);
        Ok(out)
    }
}

impl MacroProvider for FredProvider {
    fn name(&self) -> &str {
        "fred"
    }

    fn fetch(&self, series: MacroSeries, start: NaiveDate) -> Result<Vec<Observation>, DataError> {
        let url = self.observations_url(series, start);
        debug!(series = series.fred_code(), "requesting FRED observations");

        let resp = self.client.get(&url).send().map_err(|e| {
            // Never echo the URL: it carries the credential.
            DataError::NetworkUnreachable(e.without_url().to_string())
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(DataError::AuthenticationRequired(format!(
                "FRED rejected the API key (HTTP {status})"
            )));
        }
        if status == reqwest::StatusCode::BAD_REQUEST {
            let message = resp
                .json::<ErrorResponse>()
                .map(|e| e.error_message)
                .unwrap_or_default();
            if message.contains("api_key") {
                return Err(DataError::AuthenticationRequired(message));
            }
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                series: series.fred_code().to_string(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                series: series.fred_code().to_string(),
            });
        }

        let body: ObservationsResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!(
                "failed to parse response for {}: {}",
                series.fred_code(),
                e.without_url()
            ))
        })?;

        let observations = Self::parse_response(series, body)?;
        info!(
            series = series.fred_code(),
            count = observations.len(),
            "fetched macro series"
        );
        Ok(observations)
    }
}

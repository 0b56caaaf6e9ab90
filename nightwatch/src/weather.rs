//! Hourly weather provider.
//!
//! The default provider is the Open-Meteo forecast API, queried for local
//! wall-clock timestamps in the observer's timezone so the series lines up
//! with the window labels.

use crate::config::Location;
use crate::{http_client, NightwatchError, NightwatchResult};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// One raw hourly sample from a weather provider.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlyPoint {
    /// Local wall-clock time of the sample
    pub timestamp: NaiveDateTime,
    /// Total cloud cover in percent, if reported
    pub cloud_cover: Option<f64>,
    /// Visibility in meters
    pub visibility: Option<f64>,
    /// Relative humidity in percent
    pub humidity: Option<f64>,
}

/// Source of an hourly weather series covering a date range.
pub trait WeatherProvider {
    fn hourly(
        &self,
        location: &Location,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> NightwatchResult<Vec<HourlyPoint>>;
}

/// Open-Meteo forecast client.
pub struct OpenMeteoClient {
    base_url: String,
}

impl OpenMeteoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    visibility: Vec<Option<f64>>,
    #[serde(default)]
    relative_humidity_2m: Vec<Option<f64>>,
}

impl WeatherProvider for OpenMeteoClient {
    fn hourly(
        &self,
        location: &Location,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> NightwatchResult<Vec<HourlyPoint>> {
        let client = http_client()?;
        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();
        let latitude = location.latitude.to_string();
        let longitude = location.longitude.to_string();

        log::debug!("Fetching hourly weather {start}..{end} from {}", self.base_url);
        let response = client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("hourly", "cloud_cover,visibility,relative_humidity_2m"),
                ("timezone", location.timezone.as_str()),
                ("start_date", start.as_str()),
                ("end_date", end.as_str()),
            ])
            .send()
            .map_err(|e| NightwatchError::ProviderUnavailable(format!("HTTP request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(NightwatchError::ProviderUnavailable(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response.text().map_err(|e| {
            NightwatchError::ProviderUnavailable(format!("Failed to read response: {e}"))
        })?;
        parse_forecast(&body)
    }
}

/// Parse an Open-Meteo hourly forecast body into points.
///
/// Optional columns shorter than `time` are padded with `None`. A timestamp
/// that does not parse is a `ParseFailure` for the whole series.
pub fn parse_forecast(body: &str) -> NightwatchResult<Vec<HourlyPoint>> {
    let response: ForecastResponse = serde_json::from_str(body)
        .map_err(|e| NightwatchError::ParseFailure(format!("Unexpected forecast shape: {e}")))?;
    let hourly = response.hourly;

    if hourly.cloud_cover.len() != hourly.time.len() {
        return Err(NightwatchError::ParseFailure(format!(
            "cloud_cover has {} entries for {} timestamps",
            hourly.cloud_cover.len(),
            hourly.time.len()
        )));
    }

    hourly
        .time
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let timestamp = NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).map_err(|e| {
                NightwatchError::ParseFailure(format!("Bad timestamp '{raw}': {e}"))
            })?;
            Ok(HourlyPoint {
                timestamp,
                cloud_cover: hourly.cloud_cover[i],
                visibility: hourly.visibility.get(i).copied().flatten(),
                humidity: hourly.relative_humidity_2m.get(i).copied().flatten(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forecast() {
        let body = r#"{
            "latitude": 40.76,
            "hourly": {
                "time": ["2025-01-02T18:00", "2025-01-02T19:00", "2025-01-02T20:00"],
                "cloud_cover": [20, null, 5],
                "visibility": [24140.0, 18000.0],
                "relative_humidity_2m": [81, 84, 88]
            }
        }"#;

        let points = parse_forecast(body).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].timestamp.to_string(), "2025-01-02 18:00:00");
        assert_eq!(points[0].cloud_cover, Some(20.0));
        assert_eq!(points[1].cloud_cover, None);
        assert_eq!(points[2].visibility, None);
        assert_eq!(points[2].humidity, Some(88.0));
    }

    #[test]
    fn test_parse_forecast_without_optional_columns() {
        let body = r#"{"hourly": {"time": ["2025-01-02T18:00"], "cloud_cover": [40]}}"#;
        let points = parse_forecast(body).unwrap();
        assert_eq!(points[0].visibility, None);
        assert_eq!(points[0].humidity, None);
    }

    #[test]
    fn test_parse_forecast_rejects_bad_shapes() {
        let missing = r#"{"error": true, "reason": "Latitude must be in range"}"#;
        assert!(matches!(
            parse_forecast(missing),
            Err(NightwatchError::ParseFailure(_))
        ));

        let mismatched = r#"{"hourly": {"time": ["2025-01-02T18:00"], "cloud_cover": []}}"#;
        assert!(parse_forecast(mismatched).is_err());

        let bad_time = r#"{"hourly": {"time": ["18:00"], "cloud_cover": [1]}}"#;
        assert!(parse_forecast(bad_time).is_err());
    }
}

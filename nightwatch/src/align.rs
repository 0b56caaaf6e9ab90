//! Alignment of a provider's hourly series onto the window labels.

use crate::weather::HourlyPoint;
use crate::window::{ObservationWindow, WINDOW_HOURS};
use crate::{NightwatchError, NightwatchResult};
use serde::Serialize;

/// One weather sample for a window hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherSample {
    pub hour: String,
    /// Cloud cover in whole percent; `None` means the provider sent no value
    pub cloud: Option<u8>,
    pub visibility: Option<f64>,
    pub humidity: Option<f64>,
}

/// Align `series` to `window`, or report why it could not be.
///
/// The series must contain the exact `{start_date}T18:00` timestamp. That
/// point and up to 12 following it are taken in order and paired with the
/// labels by position.
pub fn try_align(
    window: &ObservationWindow,
    series: &[HourlyPoint],
) -> NightwatchResult<Vec<WeatherSample>> {
    let start = window.local_start();
    let index = series
        .iter()
        .position(|p| p.timestamp == start)
        .ok_or_else(|| {
            NightwatchError::DataAlignmentMiss(format!(
                "{} not found in a series of {} points",
                start.format("%Y-%m-%dT%H:%M"),
                series.len()
            ))
        })?;

    Ok(series[index..]
        .iter()
        .take(WINDOW_HOURS)
        .zip(window.hour_labels.iter())
        .map(|(point, label)| WeatherSample {
            hour: label.clone(),
            cloud: point.cloud_cover.and_then(cloud_percent),
            visibility: point.visibility,
            humidity: point.humidity,
        })
        .collect())
}

/// Fail-soft alignment: an unaligned series is empty, never zero cloud.
pub fn align(window: &ObservationWindow, series: &[HourlyPoint]) -> Vec<WeatherSample> {
    try_align(window, series).unwrap_or_default()
}

/// Whole percent, clamped to 0..=100. NaN is no reading at all.
fn cloud_percent(value: f64) -> Option<u8> {
    if value.is_nan() {
        return None;
    }
    Some(value.clamp(0.0, 100.0).round() as u8)
}

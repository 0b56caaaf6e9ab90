//! TLE (Two-Line Element) handling module.
//!
//! TLE data for all active satellites is fetched from CelesTrak once and
//! cached on disk for 2 hours; lookups by NORAD ID read the cache.

use crate::{http_client, NightwatchError, NightwatchResult};
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::PathBuf;

const ACTIVE_SATELLITES_URL: &str =
    "https://celestrak.org/NORAD/elements/gp.php?GROUP=active&FORMAT=TLE";
const CACHE_FILE_NAME: &str = "tle_cache.txt";
const TIMESTAMP_FILE_NAME: &str = "tle_cache_timestamp.txt";
const CACHE_DURATION_HOURS: i64 = 2;

/// On-disk TLE cache.
#[derive(Debug, Clone)]
pub struct TleCache {
    dir: PathBuf,
}

impl TleCache {
    /// Cache under the platform's local data directory.
    pub fn in_data_dir() -> NightwatchResult<Self> {
        let data_dir = dirs::data_local_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| {
                NightwatchError::ProviderUnavailable(
                    "Could not determine cache directory".to_string(),
                )
            })?;
        Ok(Self::at(data_dir.join("nightwatch")))
    }

    pub fn at(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn cache_file_path(&self) -> PathBuf {
        self.dir.join(CACHE_FILE_NAME)
    }

    fn timestamp_file_path(&self) -> PathBuf {
        self.dir.join(TIMESTAMP_FILE_NAME)
    }

    /// Checks if the cache was written less than 2 hours before `now`.
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let timestamp = match fs::read_to_string(self.timestamp_file_path()) {
            Ok(s) => s,
            Err(_) => return false,
        };
        let cache_time = match timestamp
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0))
        {
            Some(t) => t,
            None => return false,
        };

        now.signed_duration_since(cache_time) < Duration::hours(CACHE_DURATION_HOURS)
    }

    /// Store a fresh copy of the catalogue and stamp it with `now`.
    fn store(&self, tle_data: &str, now: DateTime<Utc>) -> NightwatchResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            NightwatchError::ProviderUnavailable(format!("Failed to create cache directory: {e}"))
        })?;
        fs::write(self.cache_file_path(), tle_data).map_err(|e| {
            NightwatchError::ProviderUnavailable(format!("Failed to write cache file: {e}"))
        })?;
        fs::write(self.timestamp_file_path(), now.timestamp().to_string()).map_err(|e| {
            NightwatchError::ProviderUnavailable(format!("Failed to write timestamp file: {e}"))
        })
    }

    fn read(&self) -> NightwatchResult<String> {
        fs::read_to_string(self.cache_file_path()).map_err(|e| {
            NightwatchError::ProviderUnavailable(format!("Failed to read cache file: {e}"))
        })
    }

    /// Fetch the TLE for a satellite, refreshing the cache when stale or
    /// when the satellite is missing from it.
    ///
    /// # Arguments
    /// * `norad_id` - NORAD catalogue number of the satellite
    ///
    /// # Returns
    /// The three-line TLE (name, line 1, line 2) joined by newlines.
    ///
    /// # Errors
    /// - `ProviderUnavailable` if CelesTrak cannot be reached
    /// - `ParseFailure` if the satellite is not in the catalogue
    pub fn fetch_tle(&self, norad_id: u32) -> NightwatchResult<String> {
        let now = Utc::now();
        if self.is_valid(now) {
            match self.read().and_then(|data| parse_tle_from_cache(&data, norad_id)) {
                Ok(tle) => return Ok(tle),
                Err(e) => log::debug!("TLE cache miss for {norad_id}: {e}"),
            }
        }

        log::info!("Refreshing TLE cache in {}", self.dir.display());
        let tle_data = fetch_all_active_satellites()?;
        if let Err(e) = self.store(&tle_data, now) {
            // The fresh data is still usable without the cache.
            log::warn!("Could not write TLE cache: {e}");
        }
        parse_tle_from_cache(&tle_data, norad_id)
    }
}

/// Fetches all active satellites from CelesTrak.
fn fetch_all_active_satellites() -> NightwatchResult<String> {
    let client = http_client()?;
    let response = client
        .get(ACTIVE_SATELLITES_URL)
        .send()
        .map_err(|e| NightwatchError::ProviderUnavailable(format!("HTTP request failed: {e}")))?;

    if !response.status().is_success() {
        return Err(NightwatchError::ProviderUnavailable(format!(
            "HTTP error: {}",
            response.status()
        )));
    }

    response
        .text()
        .map_err(|e| NightwatchError::ProviderUnavailable(format!("Failed to read response: {e}")))
}

/// Parses a specific TLE from catalogue text by NORAD ID.
///
/// Entries are a name line followed by line 1 and line 2; blank lines may
/// appear between entries.
///
/// # Arguments
/// * `cache_data` - Catalogue text as served by CelesTrak
/// * `norad_id` - NORAD catalogue number to look up
///
/// # Errors
/// Returns `ParseFailure` if no entry carries `norad_id`.
pub fn parse_tle_from_cache(cache_data: &str, norad_id: u32) -> NightwatchResult<String> {
    let lines: Vec<&str> = cache_data
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();
    let norad_id_str = norad_id.to_string();

    for (i, line1) in lines.iter().enumerate() {
        if !line1.starts_with("1 ") || catalogue_number(line1) != Some(norad_id_str.as_str()) {
            continue;
        }
        let Some(line2) = lines.get(i + 1) else {
            break;
        };
        if !line2.starts_with("2 ") || catalogue_number(line2) != Some(norad_id_str.as_str()) {
            continue;
        }
        let name = i
            .checked_sub(1)
            .and_then(|n| lines.get(n))
            .filter(|l| !l.starts_with("1 ") && !l.starts_with("2 "))
            .copied()
            .unwrap_or("UNKNOWN");

        let tle = format!("{name}\n{line1}\n{line2}");
        validate_tle(&tle)?;
        return Ok(tle);
    }

    Err(NightwatchError::ParseFailure(format!(
        "TLE for NORAD ID {norad_id} not found in catalogue"
    )))
}

/// NORAD ID, columns 3-7 of either element line.
fn catalogue_number(line: &str) -> Option<&str> {
    line.get(2..7).map(str::trim)
}

/// Split a three-line TLE into its two element lines.
pub fn element_lines(tle: &str) -> NightwatchResult<(&str, &str)> {
    let mut line1 = None;
    let mut line2 = None;
    for line in tle.lines().map(|l| l.trim()) {
        if line.starts_with("1 ") {
            line1 = Some(line);
        } else if line.starts_with("2 ") {
            line2 = Some(line);
        }
    }

    let line1 =
        line1.ok_or_else(|| NightwatchError::ParseFailure("TLE line 1 not found".to_string()))?;
    let line2 =
        line2.ok_or_else(|| NightwatchError::ParseFailure("TLE line 2 not found".to_string()))?;
    Ok((line1, line2))
}

/// Validates that the text contains a name line and both element lines.
fn validate_tle(text: &str) -> NightwatchResult<()> {
    let count = text.lines().filter(|l| !l.trim().is_empty()).count();
    if count < 3 {
        return Err(NightwatchError::ParseFailure(format!(
            "Expected at least 3 lines in TLE, got {count}"
        )));
    }
    element_lines(text).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOGUE: &str = r#"ISS (ZARYA)
1 25544U 98067A   12345.67890123  .00001234  00000-0  12345-4 0  1234
2 25544  51.6450 123.4567 0001234 234.5678 123.4567 15.12345678 12345

ANOTHER SATELLITE
1 25551U 98067B   12345.67890123  .00001234  00000-0  12345-4 0  1234
2 25551  51.6450 123.4567 0001234 234.5678 123.4567 15.12345678 12345"#;

    #[test]
    fn test_validate_tle() {
        let tle_text = r#"ISS (ZARYA)
1 25544U 98067A   12345.67890123  .00001234  00000-0  12345-4 0  1234
2 25544  51.6450 123.4567 0001234 234.5678 123.4567 15.12345678 12345"#;

        assert!(validate_tle(tle_text).is_ok());
        assert!(validate_tle("Not a TLE").is_err());
    }

    #[test]
    fn test_parse_tle_from_cache() {
        let tle = parse_tle_from_cache(CATALOGUE, 25544).unwrap();
        assert!(tle.starts_with("ISS (ZARYA)\n"));
        assert!(tle.contains("1 25544U"));
        assert!(tle.contains("2 25544"));

        let tle2 = parse_tle_from_cache(CATALOGUE, 25551).unwrap();
        assert!(tle2.contains("ANOTHER SATELLITE"));
        assert!(tle2.contains("2 25551"));

        assert!(matches!(
            parse_tle_from_cache(CATALOGUE, 99999),
            Err(NightwatchError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_element_lines() {
        let tle = parse_tle_from_cache(CATALOGUE, 25544).unwrap();
        let (line1, line2) = element_lines(&tle).unwrap();
        assert!(line1.starts_with("1 25544U"));
        assert!(line2.starts_with("2 25544"));
        assert!(element_lines("ISS (ZARYA)").is_err());
    }

    #[test]
    fn test_cache_validity_window() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TleCache::at(dir.path().join("tle"));
        let now = Utc::now();
        assert!(!cache.is_valid(now));

        cache.store(CATALOGUE, now).unwrap();
        assert!(cache.is_valid(now));
        assert!(cache.is_valid(now + Duration::minutes(119)));
        assert!(!cache.is_valid(now + Duration::hours(3)));
        assert_eq!(cache.read().unwrap(), CATALOGUE);
    }

    #[test]
    fn test_fresh_cache_serves_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TleCache::at(dir.path().to_path_buf());
        cache.store(CATALOGUE, Utc::now()).unwrap();

        let tle = cache.fetch_tle(25551).unwrap();
        assert!(tle.contains("ANOTHER SATELLITE"));
    }
}

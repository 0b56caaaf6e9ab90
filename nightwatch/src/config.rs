// config.rs

use crate::ephemeris::{default_bodies, CelestialBody};
use crate::{NightwatchError, NightwatchResult};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

const APP_NAME: &str = "nightwatch";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "NIGHTWATCH_CONFIG";

pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";

fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return PathBuf::from(path);
    }
    let mut dir = dirs::config_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    dir.push(APP_NAME);
    dir.push(CONFIG_FILE_NAME);
    dir
}

/// Observer location on Earth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180, east positive)
    pub longitude: f64,
    /// Altitude in meters above sea level
    pub altitude: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    /// IANA zone name, e.g. "Europe/Istanbul"
    pub timezone: String,
}

impl Location {
    pub fn observer(&self) -> ObserverLocation {
        ObserverLocation {
            latitude: self.latitude,
            longitude: self.longitude,
            altitude: self.altitude,
        }
    }

    pub fn timezone(&self) -> NightwatchResult<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            NightwatchError::ConfigError(format!("Unknown timezone '{}': {e}", self.timezone))
        })
    }

    /// "40.76, 30.36" style label used in the report.
    pub fn coordinates(&self) -> String {
        format!("{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SatelliteTarget {
    pub name: String,
    pub norad_id: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub location: Location,
    pub bodies: Vec<CelestialBody>,
    pub satellites: Vec<SatelliteTarget>,
    /// Altitude a satellite must clear for a pass to count (degrees)
    pub pass_min_altitude_deg: f64,
    pub weather_url: String,
    pub reference_url: Option<String>,
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            location: Location {
                name: "Sakarya, Adapazarı".to_string(),
                latitude: 40.76,
                longitude: 30.36,
                altitude: 30.0,
                timezone: "Europe/Istanbul".to_string(),
            },
            bodies: default_bodies(),
            satellites: vec![SatelliteTarget {
                name: "ISS (ZARYA)".to_string(),
                norad_id: 25544,
            }],
            pass_min_altitude_deg: 10.0,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            reference_url: None,
            output_path: PathBuf::from("data.json"),
        }
    }
}

impl Config {
    /// Load from disk, or return default if missing
    pub fn load_or_default() -> NightwatchResult<Self> {
        let path = default_config_path();
        if path.exists() {
            Config::load_from(&path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> NightwatchResult<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            NightwatchError::ConfigError(format!("failed to read {}: {e}", path.display()))
        })?;
        let cfg: Config = serde_json::from_str(&raw).map_err(|e| {
            NightwatchError::ConfigError(format!("failed to parse {}: {e}", path.display()))
        })?;
        // Fail at startup rather than on every report.
        cfg.location.timezone()?;
        Ok(cfg)
    }

    /// Save current config to disk
    pub fn save(&self, path: &Path) -> NightwatchResult<()> {
        let serialized = serde_json::to_string_pretty(self)
            .map_err(|e| NightwatchError::ConfigError(format!("failed to serialize: {e}")))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                NightwatchError::ConfigError(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(path, serialized).map_err(|e| {
            NightwatchError::ConfigError(format!("failed to write {}: {e}", path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timezone_parses() {
        let cfg = Config::default();
        assert_eq!(cfg.location.timezone().unwrap(), chrono_tz::Europe::Istanbul);
        assert_eq!(cfg.location.coordinates(), "40.76, 30.36");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"location": {"name": "Greenwich", "latitude": 51.48, "longitude": 0.0,
                "altitude": 46.0, "timezone": "Europe/London"}}"#,
        )
        .unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.location.name, "Greenwich");
        assert_eq!(cfg.bodies.len(), default_bodies().len());
        assert_eq!(cfg.satellites[0].norad_id, 25544);
        assert_eq!(cfg.pass_min_altitude_deg, 10.0);
    }

    #[test]
    fn test_invalid_timezone_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut cfg = Config::default();
        cfg.location.timezone = "Mars/Olympus_Mons".to_string();
        cfg.save(&path).unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, NightwatchError::ConfigError(_)));
    }
}

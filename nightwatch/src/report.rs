//! Report assembly.
//!
//! Each step runs against its own provider and the resolved window only. A
//! failing step is logged and replaced by that field's default; the report
//! itself is always produced.

use crate::align::{try_align, WeatherSample};
use crate::config::Config;
use crate::ephemeris::Ephemeris;
use crate::events::{observe_body, RiseSetRecord};
use crate::passes::{assemble_passes, SatellitePass};
use crate::phase::MoonPhase;
use crate::reference::{ReferenceLists, ReferenceProvider, StaticReference};
use crate::satellite::SatelliteTracker;
use crate::weather::WeatherProvider;
use crate::window::ObservationWindow;
use crate::NightwatchResult;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Placeholder for a time that did not occur in the window.
pub const NO_TIME: &str = "--:--";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub start: String,
    pub end: String,
}

/// One celestial body as reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportObject {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rise: String,
    pub set: String,
    pub transit: String,
    pub visible: bool,
    /// "All night", "Until HH:MM", "From HH:MM", "HH:MM-HH:MM" or "Not up"
    pub status: String,
    pub max_altitude: Option<f64>,
    pub altitudes: Vec<f64>,
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassEntry {
    pub start: String,
    pub max_elev: f64,
    pub end: String,
}

/// The nightly report, serialized as-is to the output file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightlyReport {
    pub last_updated: String,
    pub location: String,
    pub coordinates: String,
    pub timeline: Timeline,
    pub moon_phase: MoonPhase,
    pub weather_hourly: Vec<WeatherSample>,
    pub objects: Vec<ReportObject>,
    pub iss_passes: Vec<PassEntry>,
    pub lists: ReferenceLists,
}

/// Runs every report step against its provider.
pub struct ReportAssembler<'a> {
    config: &'a Config,
    weather: &'a dyn WeatherProvider,
    ephemeris: &'a dyn Ephemeris,
    satellites: &'a dyn SatelliteTracker,
    reference: &'a dyn ReferenceProvider,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(
        config: &'a Config,
        weather: &'a dyn WeatherProvider,
        ephemeris: &'a dyn Ephemeris,
        satellites: &'a dyn SatelliteTracker,
        reference: &'a dyn ReferenceProvider,
    ) -> Self {
        Self {
            config,
            weather,
            ephemeris,
            satellites,
            reference,
        }
    }

    /// Build tonight's report for the zoned `now`.
    ///
    /// Steps run in a fixed order: window, weather, bodies, satellite passes,
    /// moon phase, reference lists.
    ///
    /// # Arguments
    /// * `now` - Current time in the location's zone; picks the night
    ///
    /// # Returns
    /// A complete report. A failing provider leaves its field at the default
    /// and is logged; it never aborts the report.
    pub fn assemble(&self, now: DateTime<Tz>) -> NightlyReport {
        let window = ObservationWindow::resolve(now);
        log::info!(
            "Assembling report for {} 18:00 -> {} 06:00 ({})",
            window.start_date,
            window.end_date,
            window.timezone
        );

        let weather_hourly = self.weather_step(&window);
        let objects = self.bodies_step(&window);
        let iss_passes = self.passes_step(&window);
        let moon_phase = self.phase_step(&window);
        let lists = self.lists_step();

        let local = |t: DateTime<Utc>| t.with_timezone(&window.timezone).to_rfc3339();
        NightlyReport {
            last_updated: now.to_rfc3339(),
            location: self.config.location.name.clone(),
            coordinates: self.config.location.coordinates(),
            timeline: Timeline {
                start: local(window.start_instant),
                end: local(window.end_instant),
            },
            moon_phase,
            weather_hourly,
            objects,
            iss_passes,
            lists,
        }
    }

    fn weather_step(&self, window: &ObservationWindow) -> Vec<WeatherSample> {
        // One extra day so the 06:00 end is covered whatever the provider's
        // day boundaries.
        let last_date = window.end_date.succ_opt().unwrap_or(window.end_date);
        let samples = self
            .weather
            .hourly(&self.config.location, window.start_date, last_date)
            .and_then(|series| try_align(window, &series));
        let samples = recover("weather", samples, Vec::new);
        log::info!("Weather: {} hourly samples", samples.len());
        samples
    }

    fn bodies_step(&self, window: &ObservationWindow) -> Vec<ReportObject> {
        let observer = self.config.location.observer();
        self.config
            .bodies
            .iter()
            .map(|body| {
                let record = recover(
                    &body.name,
                    observe_body(self.ephemeris, body, &observer, window),
                    || RiseSetRecord::empty(body),
                );
                report_object(&record, window)
            })
            .collect()
    }

    fn passes_step(&self, window: &ObservationWindow) -> Vec<PassEntry> {
        let observer = self.config.location.observer();
        let mut passes: Vec<SatellitePass> = Vec::new();
        for target in &self.config.satellites {
            let found = self
                .satellites
                .pass_events(target.norad_id, &observer, window)
                .map(|events| assemble_passes(&events));
            let found = recover(&target.name, found, Vec::new);
            log::info!("{}: {} passes", target.name, found.len());
            passes.extend(found);
        }
        passes.sort_by_key(|p| p.start_time);

        passes
            .iter()
            .map(|pass| PassEntry {
                start: window.format_local(pass.start_time),
                max_elev: round_tenth(pass.max_elevation),
                end: window.format_local(pass.end_time),
            })
            .collect()
    }

    fn phase_step(&self, window: &ObservationWindow) -> MoonPhase {
        let phase = self
            .ephemeris
            .moon_phase(window.midnight())
            .map(|m| MoonPhase::from_angle(m.phase_angle, m.illuminated_fraction));
        recover("moon phase", phase, MoonPhase::unknown)
    }

    fn lists_step(&self) -> ReferenceLists {
        recover("reference lists", self.reference.lists(), StaticReference::tables)
    }
}

/// Unwrap a step result, logging the error and substituting `fallback`.
fn recover<T>(step: &str, result: NightwatchResult<T>, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{step}: {e}; using defaults");
            fallback()
        }
    }
}

fn report_object(record: &RiseSetRecord, window: &ObservationWindow) -> ReportObject {
    let time = |t: Option<DateTime<Utc>>| {
        t.map(|t| window.format_local(t))
            .unwrap_or_else(|| NO_TIME.to_string())
    };
    let max_altitude = match record.transit {
        Some((_, altitude)) => Some(altitude),
        None => record.altitudes.iter().copied().reduce(f64::max),
    };

    ReportObject {
        name: record.body.name.clone(),
        kind: record.body.kind.label().to_string(),
        rise: time(record.rise),
        set: time(record.set),
        transit: time(record.transit.map(|(t, _)| t)),
        visible: record.visible(),
        status: status(record, window),
        max_altitude: max_altitude.map(round_tenth),
        altitudes: record.altitudes.clone(),
        distance_km: record.distance_km.map(f64::round),
    }
}

/// Whole-night summary of when the body is up.
fn status(record: &RiseSetRecord, window: &ObservationWindow) -> String {
    let local = |t: DateTime<Utc>| window.format_local(t);
    match (record.up_at_start, record.rise, record.set) {
        (true, _, None) => "All night".to_string(),
        (true, _, Some(set)) => format!("Until {}", local(set)),
        (false, Some(rise), _) if record.up_at_end => format!("From {}", local(rise)),
        (false, Some(rise), Some(set)) => format!("{}-{}", local(rise), local(set)),
        _ => "Not up".to_string(),
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

//! Satellite tracking.
//!
//! Positions come from SGP4 propagation of a cached TLE, rotated from TEME
//! into the observer's horizon frame with satkit. Passes are reported as a
//! rise / culminate / set event stream over the window.

use crate::config::ObserverLocation;
use crate::ephemeris::instant_at;
use crate::events::{find_culminations, find_risings_settings, HorizonEventKind};
use crate::passes::{PassEvent, PassEventKind};
use crate::tle::{element_lines, TleCache};
use crate::window::ObservationWindow;
use crate::{NightwatchError, NightwatchResult};
use chrono::{DateTime, Duration, Utc};
use satkit::{earth_orientation_params, frametransform, types::Vec3, ITRFCoord, Instant};
use sgp4::{Constants, Elements, Prediction};

/// Coarse sampling step for satellites.
pub const SATELLITE_SEARCH_STEP_MINUTES: i64 = 1;
/// Refinement tolerance for satellite rise, set and culmination.
pub const SATELLITE_REFINE_STEP_SECONDS: i64 = 1;

/// Source of pass events for a tracked object.
pub trait SatelliteTracker {
    fn pass_events(
        &self,
        norad_id: u32,
        observer: &ObserverLocation,
        window: &ObservationWindow,
    ) -> NightwatchResult<Vec<PassEvent>>;
}

/// A satellite ready for propagation.
pub struct Satellite {
    constants: Constants<'static>,
    epoch: DateTime<Utc>,
}

impl Satellite {
    /// Parse a three-line TLE.
    pub fn from_tle(tle: &str) -> NightwatchResult<Self> {
        let (line1, line2) = element_lines(tle)?;
        let elements = Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| NightwatchError::ParseFailure(format!("Failed to parse TLE: {e}")))?;

        let constants = Constants::from_elements(&elements).map_err(|e| {
            NightwatchError::ComputationError(format!("Failed to create constants: {e}"))
        })?;

        Ok(Self {
            constants,
            epoch: elements.datetime.and_utc(),
        })
    }

    /// Calculates the altitude and azimuth of the satellite at a given time.
    ///
    /// Returns `(altitude_degrees, azimuth_degrees)`; altitude is negative
    /// below the horizon, azimuth is clockwise from north.
    pub fn alt_az(
        &self,
        location: &ObserverLocation,
        timestamp: DateTime<Utc>,
    ) -> NightwatchResult<(f64, f64)> {
        // Minutes since TLE epoch (with fractional precision)
        let duration = timestamp.signed_duration_since(self.epoch);
        let minutes_since_epoch = duration.num_milliseconds() as f64 / 60_000.0;

        let prediction = self.constants.propagate(minutes_since_epoch).map_err(|e| {
            NightwatchError::ComputationError(format!("Propagation failed: {e}"))
        })?;

        teme_to_alt_az(prediction, location, timestamp)
    }
}

/// Converts a TEME position to topocentric altitude and azimuth.
fn teme_to_alt_az(
    prediction: Prediction,
    location: &ObserverLocation,
    timestamp: DateTime<Utc>,
) -> NightwatchResult<(f64, f64)> {
    let sat_pos = prediction.position;

    let instant = instant_at(timestamp);

    // satkit works in meters
    let observer =
        ITRFCoord::from_geodetic_deg(location.latitude, location.longitude, location.altitude);
    let pos_teme_m = Vec3::new(
        sat_pos[0] * 1000.0,
        sat_pos[1] * 1000.0,
        sat_pos[2] * 1000.0,
    );

    // qteme2itrf panics without Earth Orientation Parameters
    if earth_orientation_params::get(&instant).is_none() {
        return Err(NightwatchError::ComputationError(format!(
            "No Earth Orientation Parameters for {timestamp}"
        )));
    }
    let rot_matrix = frametransform::qteme2itrf(&instant).to_rotation_matrix();
    let pos_itrf_m = rot_matrix * pos_teme_m;

    let sat_itrf = ITRFCoord::from_slice(pos_itrf_m.as_slice()).map_err(|e| {
        NightwatchError::ComputationError(format!("Failed to create ITRFCoord: {e}"))
    })?;

    // Observer -> satellite in the observer's ENU frame
    let rel_itrf = sat_itrf.itrf - observer.itrf;
    let enu = observer.q_enu2itrf().conjugate() * rel_itrf;
    let (east, north, up) = (enu[0], enu[1], enu[2]);

    let horizontal_range = (east * east + north * north).sqrt();
    if (horizontal_range * horizontal_range + up * up).sqrt() < 1e-6 {
        return Err(NightwatchError::ComputationError(
            "Satellite is at observer location".to_string(),
        ));
    }

    let altitude = up.atan2(horizontal_range).to_degrees();
    let azimuth = east.atan2(north).to_degrees().rem_euclid(360.0);

    Ok((altitude, azimuth))
}

/// Make sure satkit has Earth Orientation Parameters covering `instants`.
///
/// Downloads and reloads the EOP table once if any instant is missing.
///
/// # Errors
/// `ProviderUnavailable` if the download fails or the fresh table still does
/// not cover the instants.
pub fn ensure_earth_orientation(instants: &[Instant]) -> NightwatchResult<()> {
    let covered = || instants.iter().all(|t| earth_orientation_params::get(t).is_some());
    ensure_earth_orientation_with(covered, || {
        earth_orientation_params::update().map_err(|e| e.to_string())
    })
}

fn ensure_earth_orientation_with<C, D>(mut covered: C, download: D) -> NightwatchResult<()>
where
    C: FnMut() -> bool,
    D: FnOnce() -> Result<(), String>,
{
    if covered() {
        return Ok(());
    }

    log::info!("Earth Orientation Parameters missing, downloading");
    download().map_err(|e| {
        NightwatchError::ProviderUnavailable(format!(
            "Failed to download Earth Orientation Parameters: {e}"
        ))
    })?;

    if covered() {
        Ok(())
    } else {
        Err(NightwatchError::ProviderUnavailable(
            "Earth Orientation Parameters do not cover the window".to_string(),
        ))
    }
}

/// Build the rise / culminate / set stream for an altitude function.
///
/// Rises and sets are crossings of `min_altitude_deg`. Passes cut by the
/// interval edges show up as a leading set or a trailing rise.
///
/// # Arguments
/// * `start` - Start of the search interval
/// * `end` - End of the search interval
/// * `min_altitude_deg` - Altitude a pass must clear, in degrees
/// * `altitude` - Satellite altitude in degrees at a given time
///
/// # Returns
/// Rise, culminate and set events sorted by time, each carrying the
/// altitude at its instant.
pub fn pass_events_from_altitude<F>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_altitude_deg: f64,
    mut altitude: F,
) -> NightwatchResult<Vec<PassEvent>>
where
    F: FnMut(DateTime<Utc>) -> NightwatchResult<f64>,
{
    let search_step = Duration::minutes(SATELLITE_SEARCH_STEP_MINUTES);
    let refine_step = Duration::seconds(SATELLITE_REFINE_STEP_SECONDS);

    let crossings = find_risings_settings(
        start,
        end,
        search_step,
        refine_step,
        min_altitude_deg,
        &mut altitude,
    )?;
    let up_at_start = altitude(start)? > min_altitude_deg;
    let culminations = find_culminations(
        start,
        end,
        &crossings,
        up_at_start,
        search_step,
        refine_step,
        &mut altitude,
    )?;

    let mut events = Vec::with_capacity(crossings.len() + culminations.len());
    for crossing in &crossings {
        events.push(PassEvent {
            instant: crossing.instant,
            kind: match crossing.kind {
                HorizonEventKind::Rise => PassEventKind::Rise,
                HorizonEventKind::Set => PassEventKind::Set,
            },
            altitude: altitude(crossing.instant)?,
        });
    }
    events.extend(culminations.into_iter().map(|(instant, alt)| PassEvent {
        instant,
        kind: PassEventKind::Culminate,
        altitude: alt,
    }));
    events.sort_by_key(|e| e.instant);

    Ok(events)
}

/// Tracker backed by CelesTrak TLEs and SGP4.
pub struct Sgp4Tracker {
    cache: TleCache,
    min_altitude_deg: f64,
}

impl Sgp4Tracker {
    pub fn new(cache: TleCache, min_altitude_deg: f64) -> Self {
        Self {
            cache,
            min_altitude_deg,
        }
    }
}

impl SatelliteTracker for Sgp4Tracker {
    fn pass_events(
        &self,
        norad_id: u32,
        observer: &ObserverLocation,
        window: &ObservationWindow,
    ) -> NightwatchResult<Vec<PassEvent>> {
        let tle = self.cache.fetch_tle(norad_id)?;
        let satellite = Satellite::from_tle(&tle)?;
        ensure_earth_orientation(&[
            instant_at(window.start_instant),
            instant_at(window.end_instant),
        ])?;

        let events = pass_events_from_altitude(
            window.start_instant,
            window.end_instant,
            self.min_altitude_deg,
            |t| Ok(satellite.alt_az(observer, t)?.0),
        )?;
        log::debug!("NORAD {norad_id}: {} pass events", events.len());
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::assemble_passes;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 15, 0, 0).unwrap()
    }

    /// Two six-minute passes peaking at 40° and 70°, plus the tail of one
    /// that was overhead when the window opened.
    fn synthetic_altitude(t: DateTime<Utc>) -> f64 {
        let peaks = [
            (t0() - Duration::minutes(1), 30.0),
            (t0() + Duration::minutes(95), 40.0),
            (t0() + Duration::minutes(190), 70.0),
        ];
        peaks
            .iter()
            .map(|(peak, height)| {
                let minutes = (t - *peak).num_seconds().abs() as f64 / 60.0;
                height - (height + 10.0) * minutes / 6.0
            })
            .fold(-10.0, f64::max)
    }

    #[test]
    fn test_pass_event_stream() {
        let start = t0();
        let end = start + Duration::hours(12);
        let events =
            pass_events_from_altitude(start, end, 10.0, |t| Ok(synthetic_altitude(t))).unwrap();

        let kinds: Vec<PassEventKind> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PassEventKind::Set,
                PassEventKind::Rise,
                PassEventKind::Culminate,
                PassEventKind::Set,
                PassEventKind::Rise,
                PassEventKind::Culminate,
                PassEventKind::Set,
            ]
        );
        assert!(events.windows(2).all(|w| w[0].instant <= w[1].instant));

        let culmination = events[2];
        assert!((culmination.instant - (start + Duration::minutes(95))).num_seconds().abs() <= 2);
        assert!((culmination.altitude - 40.0).abs() < 0.5);
    }

    #[test]
    fn test_event_stream_feeds_pass_machine() {
        let start = t0();
        let end = start + Duration::hours(12);
        let events =
            pass_events_from_altitude(start, end, 10.0, |t| Ok(synthetic_altitude(t))).unwrap();
        let passes = assemble_passes(&events);

        // The tail pass at the window start has no rise and is dropped.
        assert_eq!(passes.len(), 2);
        assert!((passes[0].max_elevation - 40.0).abs() < 0.5);
        assert!((passes[1].max_elevation - 70.0).abs() < 0.5);
        for pass in &passes {
            let minutes = (pass.end_time - pass.start_time).num_seconds() as f64 / 60.0;
            assert!(minutes > 2.0 && minutes < 12.0, "duration {minutes}");
        }
    }

    #[test]
    fn test_covered_window_skips_download() {
        let result = ensure_earth_orientation_with(|| true, || panic!("no download expected"));
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_orientation_data_is_downloaded() {
        let mut downloaded = false;
        let mut checks = 0;
        let result = ensure_earth_orientation_with(
            || {
                checks += 1;
                checks > 1
            },
            || {
                downloaded = true;
                Ok(())
            },
        );
        assert!(result.is_ok());
        assert!(downloaded);
        assert_eq!(checks, 2);
    }

    #[test]
    fn test_failed_download_is_provider_unavailable() {
        let err = ensure_earth_orientation_with(|| false, || Err("timed out".to_string()))
            .unwrap_err();
        assert!(matches!(err, NightwatchError::ProviderUnavailable(_)));
        assert!(err.to_string().contains("timed out"));

        let err = ensure_earth_orientation_with(|| false, || Ok(())).unwrap_err();
        assert!(matches!(err, NightwatchError::ProviderUnavailable(_)));
    }

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    #[test]
    fn test_constants_are_ready_after_parsing() {
        let satellite = Satellite::from_tle(ISS).unwrap();
        // Day 194.886 of 2020
        assert_eq!(
            satellite.epoch.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2020, 7, 12).unwrap()
        );

        for minutes in [0.0, 45.0, 90.0] {
            let prediction = satellite.constants.propagate(minutes).unwrap();
            let [x, y, z] = prediction.position;
            let radius = (x * x + y * y + z * z).sqrt();
            assert!(radius > 6_700.0 && radius < 6_850.0, "radius {radius}");
        }
    }

    #[test]
    fn test_bad_tle_is_rejected() {
        let err = Satellite::from_tle("NOT A SATELLITE\nfoo\nbar").err().unwrap();
        assert!(matches!(err, NightwatchError::ParseFailure(_)));
    }
}

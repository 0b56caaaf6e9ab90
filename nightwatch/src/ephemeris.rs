//! Ephemeris provider.
//!
//! `SatkitEphemeris` takes geocentric positions from satkit's low-precision
//! ephemerides and rotates them into the observer's horizon frame. The sun
//! and moon come from the Vallado series in `satkit::lpephem`, the planets
//! from its Keplerian elements relative to the Earth-Moon barycenter.

use crate::config::ObserverLocation;
use crate::{NightwatchError, NightwatchResult};
use chrono::{DateTime, Datelike, Timelike, Utc};
use satkit::lpephem::{self, heliocentric_pos};
use satkit::{frametransform, types::Vec3, ITRFCoord, Instant, SolarSystem};
use serde::{Deserialize, Serialize};

/// Mean obliquity of the ecliptic at J2000, degrees.
const J2000_OBLIQUITY_DEG: f64 = 23.439_291;

/// How a body is presented in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyKind {
    Star,
    Planet,
    Moon,
}

impl BodyKind {
    pub fn label(self) -> &'static str {
        match self {
            BodyKind::Star => "star",
            BodyKind::Planet => "planet",
            BodyKind::Moon => "moon",
        }
    }

    /// Altitude of the body's centre at rise/set, including refraction.
    pub fn horizon_deg(self) -> f64 {
        match self {
            // Upper limb on the horizon; the moon altitude is topocentric.
            BodyKind::Star | BodyKind::Moon => -0.8333,
            BodyKind::Planet => -0.5667,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialBody {
    pub name: String,
    pub kind: BodyKind,
    /// Identifier understood by the ephemeris provider
    pub ephemeris_id: String,
}

impl CelestialBody {
    pub fn new(name: &str, kind: BodyKind, ephemeris_id: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            ephemeris_id: ephemeris_id.to_string(),
        }
    }
}

/// The bodies reported when the config does not list its own.
pub fn default_bodies() -> Vec<CelestialBody> {
    vec![
        CelestialBody::new("Sun", BodyKind::Star, "sun"),
        CelestialBody::new("Moon", BodyKind::Moon, "moon"),
        CelestialBody::new("Mercury", BodyKind::Planet, "mercury"),
        CelestialBody::new("Venus", BodyKind::Planet, "venus"),
        CelestialBody::new("Mars", BodyKind::Planet, "mars"),
        CelestialBody::new("Jupiter", BodyKind::Planet, "jupiter"),
        CelestialBody::new("Saturn", BodyKind::Planet, "saturn"),
        CelestialBody::new("Uranus", BodyKind::Planet, "uranus"),
        CelestialBody::new("Neptune", BodyKind::Planet, "neptune"),
    ]
}

/// Position of a body as seen by the observer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApparentPosition {
    /// Degrees above the horizon (negative below)
    pub altitude: f64,
    /// Degrees clockwise from north
    pub azimuth: f64,
    pub distance_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoonIllumination {
    /// Moon minus sun ecliptic longitude, 0..360 (0 = new, 180 = full)
    pub phase_angle: f64,
    /// Illuminated fraction of the disc, 0..1
    pub illuminated_fraction: f64,
}

/// Almanac capability consumed by the report.
pub trait Ephemeris {
    fn apparent(
        &self,
        body_id: &str,
        observer: &ObserverLocation,
        at: DateTime<Utc>,
    ) -> NightwatchResult<ApparentPosition>;

    fn moon_phase(&self, at: DateTime<Utc>) -> NightwatchResult<MoonIllumination>;
}

/// Sun, moon and planets from satkit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SatkitEphemeris;

impl Ephemeris for SatkitEphemeris {
    fn apparent(
        &self,
        body_id: &str,
        observer: &ObserverLocation,
        at: DateTime<Utc>,
    ) -> NightwatchResult<ApparentPosition> {
        let instant = instant_at(at);
        let position_itrf =
            frametransform::qgcrf2itrf_approx(&instant) * geocentric_position(body_id, &instant)?;

        // Observer -> body in the observer's ENU frame
        let site =
            ITRFCoord::from_geodetic_deg(observer.latitude, observer.longitude, observer.altitude);
        let enu = site.q_enu2itrf().conjugate() * (position_itrf - site.itrf);
        let (east, north, up) = (enu[0], enu[1], enu[2]);

        Ok(ApparentPosition {
            altitude: up.atan2(east.hypot(north)).to_degrees(),
            azimuth: east.atan2(north).to_degrees().rem_euclid(360.0),
            distance_km: enu.norm() / 1000.0,
        })
    }

    fn moon_phase(&self, at: DateTime<Utc>) -> NightwatchResult<MoonIllumination> {
        let instant = instant_at(at);
        let sun = lpephem::sun::pos_gcrf(&instant);
        let moon = lpephem::moon::pos_gcrf(&instant);

        let phase_angle = (ecliptic_longitude(&moon) - ecliptic_longitude(&sun)).rem_euclid(360.0);
        let cos_elongation = moon.normalize().dot(&sun.normalize());

        Ok(MoonIllumination {
            phase_angle,
            illuminated_fraction: ((1.0 - cos_elongation) / 2.0).clamp(0.0, 1.0),
        })
    }
}

/// Convert a chrono UTC time to a satkit instant.
pub(crate) fn instant_at(at: DateTime<Utc>) -> Instant {
    let naive = at.naive_utc();
    Instant::from_datetime(
        naive.year(),
        naive.month() as i32,
        naive.day() as i32,
        naive.hour() as i32,
        naive.minute() as i32,
        naive.second() as f64 + naive.nanosecond() as f64 / 1e9,
    )
}

fn solar_system_body(body_id: &str) -> Option<SolarSystem> {
    let body = match body_id {
        "sun" => SolarSystem::Sun,
        "moon" => SolarSystem::Moon,
        "mercury" => SolarSystem::Mercury,
        "venus" => SolarSystem::Venus,
        "mars" => SolarSystem::Mars,
        "jupiter" => SolarSystem::Jupiter,
        "saturn" => SolarSystem::Saturn,
        "uranus" => SolarSystem::Uranus,
        "neptune" => SolarSystem::Neptune,
        "pluto" => SolarSystem::Pluto,
        _ => return None,
    };
    Some(body)
}

/// Geocentric GCRF position of a body, in meters.
pub(crate) fn geocentric_position(body_id: &str, instant: &Instant) -> NightwatchResult<Vec3> {
    let body = solar_system_body(body_id).ok_or_else(|| {
        NightwatchError::ComputationError(format!("Unsupported body '{body_id}'"))
    })?;

    match body {
        SolarSystem::Sun => Ok(lpephem::sun::pos_gcrf(instant)),
        SolarSystem::Moon => Ok(lpephem::moon::pos_gcrf(instant)),
        planet => {
            let heliocentric = |body: SolarSystem| {
                heliocentric_pos(body, instant).map_err(|e| {
                    NightwatchError::ComputationError(format!("No position for {body}: {e}"))
                })
            };
            Ok(heliocentric(planet)? - heliocentric(SolarSystem::EMB)?)
        }
    }
}

/// Ecliptic longitude of an equatorial vector, degrees 0..360.
fn ecliptic_longitude(v: &Vec3) -> f64 {
    let (sin_eps, cos_eps) = J2000_OBLIQUITY_DEG.to_radians().sin_cos();
    let y = v[1] * cos_eps + v[2] * sin_eps;
    y.atan2(v[0]).to_degrees().rem_euclid(360.0)
}

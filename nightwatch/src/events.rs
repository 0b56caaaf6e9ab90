//! Discrete event search over a sampled state function.
//!
//! The search walks the interval at a coarse step and bisects every bracket
//! in which the state changes, the same way rise and set times are refined
//! for satellite passes.

use crate::config::ObserverLocation;
use crate::ephemeris::{CelestialBody, Ephemeris};
use crate::window::ObservationWindow;
use crate::NightwatchResult;
use chrono::{DateTime, Duration, Utc};

/// Coarse sampling step for sun, moon and planets.
pub const BODY_COARSE_STEP_MINUTES: i64 = 10;
/// Bisection tolerance for sun, moon and planets.
pub const BODY_TOLERANCE_SECONDS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizonEventKind {
    Rise,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonEvent {
    pub instant: DateTime<Utc>,
    pub kind: HorizonEventKind,
}

/// Find every change of `state` in `[start, end]`.
///
/// # Arguments
/// * `start` - Start of the search interval
/// * `end` - End of the search interval
/// * `coarse_step` - Sampling step; transitions closer together than this may be missed
/// * `tolerance` - Width of the bracket at which bisection stops
/// * `state` - State function sampled over the interval
///
/// # Returns
/// `(instant, new_state)` pairs in strictly increasing time order, each
/// localised to within `tolerance`. An empty interval yields no transitions.
///
/// # Errors
/// The first error returned by `state`.
pub fn find_transitions<S, F>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    coarse_step: Duration,
    tolerance: Duration,
    mut state: F,
) -> NightwatchResult<Vec<(DateTime<Utc>, S)>>
where
    S: PartialEq + Copy,
    F: FnMut(DateTime<Utc>) -> NightwatchResult<S>,
{
    if end <= start || coarse_step <= Duration::zero() {
        return Ok(Vec::new());
    }
    let tolerance = tolerance.max(Duration::milliseconds(1));

    let mut transitions = Vec::new();
    let mut prev_time = start;
    let mut prev_state = state(start)?;

    loop {
        let time = (prev_time + coarse_step).min(end);
        let current = state(time)?;

        if current != prev_state {
            let mut low = prev_time;
            let mut high = time;
            let mut high_state = current;

            // Binary search for the change
            while high - low > tolerance {
                let mid = low + (high - low) / 2;
                let mid_state = state(mid)?;
                if mid_state == prev_state {
                    low = mid;
                } else {
                    high = mid;
                    high_state = mid_state;
                }
            }
            transitions.push((high, high_state));
        }

        if time >= end {
            break;
        }
        prev_time = time;
        prev_state = current;
    }

    Ok(transitions)
}

/// Rise and set times of an altitude function against a horizon.
///
/// Something already up at `start` reports only its set; something still up
/// at `end` reports only its rise.
pub fn find_risings_settings<F>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    coarse_step: Duration,
    tolerance: Duration,
    horizon_deg: f64,
    mut altitude: F,
) -> NightwatchResult<Vec<HorizonEvent>>
where
    F: FnMut(DateTime<Utc>) -> NightwatchResult<f64>,
{
    let transitions = find_transitions(start, end, coarse_step, tolerance, |t| {
        Ok(altitude(t)? > horizon_deg)
    })?;

    Ok(transitions
        .into_iter()
        .map(|(instant, above)| HorizonEvent {
            instant,
            kind: if above {
                HorizonEventKind::Rise
            } else {
                HorizonEventKind::Set
            },
        })
        .collect())
}

/// Find the maximum of `f` in `[start, end]`.
///
/// A coarse scan at `step` picks the best sample, then a golden section search
/// refines it within one step either side.
pub fn find_maximum<F>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
    mut f: F,
) -> NightwatchResult<(DateTime<Utc>, f64)>
where
    F: FnMut(DateTime<Utc>) -> NightwatchResult<f64>,
{
    let mut best_time = start;
    let mut best_value = f(start)?;
    if end <= start || step <= Duration::zero() {
        return Ok((best_time, best_value));
    }

    let mut current_time = start + step;
    while current_time < end {
        let value = f(current_time)?;
        if value > best_value {
            best_value = value;
            best_time = current_time;
        }
        current_time += step;
    }
    let end_value = f(end)?;
    if end_value > best_value {
        best_value = end_value;
        best_time = end;
    }

    // Golden section search for maximum
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut a = (best_time - step).max(start);
    let mut b = (best_time + step).min(end);

    let max_iterations = 60;
    let mut iterations = 0;
    while (b - a) > Duration::seconds(1) && iterations < max_iterations {
        iterations += 1;
        let span = (b - a).num_milliseconds() as f64 * inv_phi;
        let c = b - Duration::milliseconds(span as i64);
        let d = a + Duration::milliseconds(span as i64);
        if f(c)? > f(d)? {
            b = d;
        } else {
            a = c;
        }
    }

    // Final check at midpoint
    let midpoint = a + (b - a) / 2;
    let mid_value = f(midpoint)?;
    if mid_value > best_value {
        best_value = mid_value;
        best_time = midpoint;
    }

    Ok((best_time, best_value))
}

/// Culminations (altitude maxima) above the horizon.
///
/// Each above-horizon stretch between the events (or the interval edges) is
/// searched for its peak. A peak on the edge of the stretch is the body still
/// climbing or already descending and is not a culmination.
pub fn find_culminations<F>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    events: &[HorizonEvent],
    up_at_start: bool,
    coarse_step: Duration,
    tolerance: Duration,
    mut altitude: F,
) -> NightwatchResult<Vec<(DateTime<Utc>, f64)>>
where
    F: FnMut(DateTime<Utc>) -> NightwatchResult<f64>,
{
    let mut segments = Vec::new();
    let mut segment_start = if up_at_start { Some(start) } else { None };
    for event in events {
        match event.kind {
            HorizonEventKind::Rise => segment_start = Some(event.instant),
            HorizonEventKind::Set => {
                if let Some(from) = segment_start.take() {
                    segments.push((from, event.instant));
                }
            }
        }
    }
    if let Some(from) = segment_start {
        segments.push((from, end));
    }

    let mut culminations = Vec::new();
    for (from, to) in segments {
        let step = coarse_step.min((to - from) / 4).max(Duration::seconds(1));
        let (peak, value) = find_maximum(from, to, step, &mut altitude)?;
        if peak - from > tolerance && to - peak > tolerance {
            culminations.push((peak, value));
        }
    }
    Ok(culminations)
}

/// Everything detected for one body over the window.
#[derive(Debug, Clone, PartialEq)]
pub struct RiseSetRecord {
    pub body: CelestialBody,
    pub rise: Option<DateTime<Utc>>,
    pub set: Option<DateTime<Utc>>,
    /// Highest culmination in the window and its altitude
    pub transit: Option<(DateTime<Utc>, f64)>,
    /// Above the horizon when the window opens
    pub up_at_start: bool,
    /// Above the horizon when the window closes
    pub up_at_end: bool,
    /// Altitude at each window hour
    pub altitudes: Vec<f64>,
    /// Distance at local midnight
    pub distance_km: Option<f64>,
}

impl RiseSetRecord {
    /// A record with no events, used when the provider fails for the body.
    pub fn empty(body: &CelestialBody) -> Self {
        Self {
            body: body.clone(),
            rise: None,
            set: None,
            transit: None,
            up_at_start: false,
            up_at_end: false,
            altitudes: Vec::new(),
            distance_km: None,
        }
    }

    /// A rise or a set happened inside the window. A body that stays up the
    /// whole night is not `visible` by this rule; see `up_at_start`.
    pub fn visible(&self) -> bool {
        self.rise.is_some() || self.set.is_some()
    }
}

/// Detect rise, set and transit for a body over the window.
///
/// # Arguments
/// * `ephemeris` - Provider of the body's apparent position
/// * `body` - Body to observe; its kind picks the horizon altitude
/// * `observer` - Observer's geodetic location
/// * `window` - Resolved observation window
///
/// # Returns
/// The first rise and set, the highest culmination, whether the body is up at
/// either edge of the window, the 13 hourly altitudes and the distance at
/// local midnight.
///
/// # Errors
/// Any error from the ephemeris, typically `ComputationError` for a body it
/// does not know.
pub fn observe_body(
    ephemeris: &dyn Ephemeris,
    body: &CelestialBody,
    observer: &ObserverLocation,
    window: &ObservationWindow,
) -> NightwatchResult<RiseSetRecord> {
    let coarse_step = Duration::minutes(BODY_COARSE_STEP_MINUTES);
    let tolerance = Duration::seconds(BODY_TOLERANCE_SECONDS);
    let horizon = body.kind.horizon_deg();
    let altitude = |t: DateTime<Utc>| -> NightwatchResult<f64> {
        Ok(ephemeris.apparent(&body.ephemeris_id, observer, t)?.altitude)
    };

    let start = window.start_instant;
    let end = window.end_instant;
    let events = find_risings_settings(start, end, coarse_step, tolerance, horizon, altitude)?;
    log::debug!("{}: {} horizon events", body.name, events.len());

    let rise = events
        .iter()
        .find(|e| e.kind == HorizonEventKind::Rise)
        .map(|e| e.instant);
    let set = events
        .iter()
        .find(|e| e.kind == HorizonEventKind::Set)
        .map(|e| e.instant);

    let up_at_start = altitude(start)? > horizon;
    let up_at_end = altitude(end)? > horizon;
    let transit = find_culminations(
        start,
        end,
        &events,
        up_at_start,
        coarse_step,
        tolerance,
        altitude,
    )?
    .into_iter()
    .max_by(|a, b| a.1.total_cmp(&b.1));

    let altitudes = window
        .hour_instants()
        .into_iter()
        .map(|t| altitude(t).map(|alt| (alt * 10.0).round() / 10.0))
        .collect::<NightwatchResult<Vec<_>>>()?;

    let distance_km = ephemeris
        .apparent(&body.ephemeris_id, observer, window.midnight())?
        .distance_km;

    Ok(RiseSetRecord {
        body: body.clone(),
        rise,
        set,
        transit,
        up_at_start,
        up_at_end,
        altitudes,
        distance_km: Some(distance_km),
    })
}

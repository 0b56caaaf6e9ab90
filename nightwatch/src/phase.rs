//! Moon phase classification.

use serde::Serialize;

const BUCKET_WIDTH_DEG: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoonPhaseName {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

const PHASES: [MoonPhaseName; 8] = [
    MoonPhaseName::New,
    MoonPhaseName::WaxingCrescent,
    MoonPhaseName::FirstQuarter,
    MoonPhaseName::WaxingGibbous,
    MoonPhaseName::Full,
    MoonPhaseName::WaningGibbous,
    MoonPhaseName::LastQuarter,
    MoonPhaseName::WaningCrescent,
];

impl MoonPhaseName {
    pub fn label(self) -> &'static str {
        match self {
            MoonPhaseName::New => "New",
            MoonPhaseName::WaxingCrescent => "Waxing Crescent",
            MoonPhaseName::FirstQuarter => "First Quarter",
            MoonPhaseName::WaxingGibbous => "Waxing Gibbous",
            MoonPhaseName::Full => "Full",
            MoonPhaseName::WaningGibbous => "Waning Gibbous",
            MoonPhaseName::LastQuarter => "Last Quarter",
            MoonPhaseName::WaningCrescent => "Waning Crescent",
        }
    }

    /// Bucket for a phase angle in degrees.
    ///
    /// Buckets are 45° wide and centred on the named phase, so New covers
    /// [337.5, 360) and [0, 22.5). Any input is accepted; non-finite angles
    /// fall in New.
    pub fn classify(angle_deg: f64) -> Self {
        if !angle_deg.is_finite() {
            return MoonPhaseName::New;
        }
        let angle = angle_deg.rem_euclid(360.0);
        let index = ((angle + BUCKET_WIDTH_DEG / 2.0) / BUCKET_WIDTH_DEG).floor() as usize;
        PHASES[index % PHASES.len()]
    }
}

/// Moon phase as reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoonPhase {
    pub name: String,
    /// Illuminated percentage, 0..=100
    pub illumination: u8,
    /// Phase angle rounded to the degree, 0..360
    pub angle: u16,
}

impl MoonPhase {
    pub fn from_angle(angle_deg: f64, illuminated_fraction: f64) -> Self {
        let angle = if angle_deg.is_finite() {
            (angle_deg.rem_euclid(360.0).round() as u16) % 360
        } else {
            0
        };
        let illumination = if illuminated_fraction.is_finite() {
            (illuminated_fraction * 100.0).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        Self {
            name: MoonPhaseName::classify(angle_deg).label().to_string(),
            illumination,
            angle,
        }
    }

    /// Placeholder used when the phase cannot be computed.
    pub fn unknown() -> Self {
        Self {
            name: "Unknown".to_string(),
            illumination: 0,
            angle: 0,
        }
    }
}

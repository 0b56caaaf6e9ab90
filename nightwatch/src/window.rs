//! Night window resolution.
//!
//! "Tonight" is always the 13 wall-clock hours 18:00 → 06:00. Before local
//! noon the window is the one that started yesterday evening.

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone,
    Timelike, Utc,
};
use chrono_tz::Tz;

pub const WINDOW_START_HOUR: u32 = 18;
pub const WINDOW_END_HOUR: u32 = 6;
pub const WINDOW_HOURS: usize = 13;

/// Labels with an hour at or after noon belong to the start date.
const NOON: u32 = 12;

/// The resolved observation window for one night.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationWindow {
    /// Calendar date of the 18:00 start
    pub start_date: NaiveDate,
    /// Calendar date of the 06:00 end
    pub end_date: NaiveDate,
    pub start_instant: DateTime<Utc>,
    pub end_instant: DateTime<Utc>,
    /// "18:00", "19:00", ..., "06:00"
    pub hour_labels: Vec<String>,
    pub timezone: Tz,
}

/// The 13 window labels in order.
pub fn hour_labels() -> Vec<String> {
    (0..WINDOW_HOURS as u32)
        .map(|i| format!("{:02}:00", (WINDOW_START_HOUR + i) % 24))
        .collect()
}

impl ObservationWindow {
    /// Resolve tonight's window from a zoned "now".
    pub fn resolve(now: DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today = now.date_naive();
        let start_date = if now.hour() < NOON {
            today.pred_opt().unwrap_or(today)
        } else {
            today
        };
        let end_date = start_date.succ_opt().unwrap_or(start_date);

        Self {
            start_date,
            end_date,
            start_instant: local_to_utc(&tz, at_hour(start_date, WINDOW_START_HOUR)),
            end_instant: local_to_utc(&tz, at_hour(end_date, WINDOW_END_HOUR)),
            hour_labels: hour_labels(),
            timezone: tz,
        }
    }

    /// Local wall-clock start, the timestamp the weather series is keyed on.
    pub fn local_start(&self) -> NaiveDateTime {
        at_hour(self.start_date, WINDOW_START_HOUR)
    }

    /// Pair an "HH:MM" label with the start or end date and convert to UTC.
    pub fn instant_for_label(&self, label: &str) -> Option<DateTime<Utc>> {
        let time = NaiveTime::parse_from_str(label, "%H:%M").ok()?;
        let date = if time.hour() >= NOON {
            self.start_date
        } else {
            self.end_date
        };
        Some(local_to_utc(&self.timezone, date.and_time(time)))
    }

    /// The instant of every label, in window order.
    pub fn hour_instants(&self) -> Vec<DateTime<Utc>> {
        self.hour_labels
            .iter()
            .filter_map(|label| self.instant_for_label(label))
            .collect()
    }

    /// Local midnight between the two dates.
    pub fn midnight(&self) -> DateTime<Utc> {
        local_to_utc(&self.timezone, at_hour(self.end_date, 0))
    }

    /// Format an instant as local "HH:MM".
    pub fn format_local(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.timezone).format("%H:%M").to_string()
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start_instant && t <= self.end_instant
    }
}

fn at_hour(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(hour as i64)
}

/// Convert a local wall-clock time to UTC without failing on DST transitions.
///
/// Ambiguous times take the earlier instant. Times inside a spring-forward gap
/// are read with the offset in force at that wall-clock reading in UTC.
pub(crate) fn local_to_utc(tz: &Tz, naive: NaiveDateTime) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) => t.with_timezone(&Utc),
        LocalResult::Ambiguous(early, _) => early.with_timezone(&Utc),
        // Skipped by a forward jump: keep the offset in force before it,
        // which lands on the instant the clocks jumped.
        LocalResult::None => {
            let hour = Duration::hours(1);
            match tz.from_local_datetime(&(naive - hour)).earliest() {
                Some(before) => before.with_timezone(&Utc) + hour,
                None => {
                    let offset = tz.offset_from_utc_datetime(&naive).fix();
                    let utc = naive - Duration::seconds(offset.local_minus_utc() as i64);
                    DateTime::<Utc>::from_naive_utc_and_offset(utc, Utc)
                }
            }
        }
    }
}

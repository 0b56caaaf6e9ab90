//! Reference lists: sky-event calendar, deep-sky highlights and double stars.
//!
//! The built-in tables are literal data. A remote JSON feed with the same
//! shape can replace them; when it fails the report falls back to the
//! built-in tables.

use crate::{http_client, NightwatchError, NightwatchResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyEvent {
    /// Day or day range within the month, e.g. "3-4"
    pub date: String,
    /// Short month name, e.g. "Jan"
    pub month: String,
    pub title: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepSkyObject {
    pub name: String,
    /// Messier or NGC designation
    pub catalogue: String,
    pub kind: String,
    pub constellation: String,
    pub magnitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoubleStar {
    pub name: String,
    pub constellation: String,
    /// Separation in arcseconds
    pub separation: f64,
    /// Component magnitudes, e.g. "3.1 / 5.1"
    pub magnitudes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLists {
    pub events: Vec<SkyEvent>,
    pub deep_sky: Vec<DeepSkyObject>,
    pub double_stars: Vec<DoubleStar>,
}

pub trait ReferenceProvider {
    fn lists(&self) -> NightwatchResult<ReferenceLists>;
}

// (date, month, title, desc)
const EVENT_CALENDAR: &[(&str, &str, &str, &str)] = &[
    ("3-4", "Jan", "Quadrantid Meteor Shower", "The first major meteor shower of the year."),
    ("10", "Jan", "Jupiter at Opposition", "Visible all night at its brightest."),
    ("19", "Jan", "New Moon", "The darkest skies of the month for observing."),
    ("3", "Mar", "Total Lunar Eclipse", "Visible from East Asia, the Pacific and the Americas."),
    ("22-23", "Apr", "Lyrid Meteor Shower", "Best after midnight, up to 20 meteors an hour."),
    ("6", "May", "Eta Aquariid Meteor Shower", "Debris of Halley's Comet, best before dawn."),
    ("12", "Aug", "Total Solar Eclipse", "Totality across Greenland, Iceland and northern Spain."),
    ("12-13", "Aug", "Perseid Meteor Shower", "Rich shower in warm summer skies."),
    ("21", "Oct", "Orionid Meteor Shower", "Fast meteors from Halley's Comet."),
    ("17", "Nov", "Leonid Meteor Shower", "Radiant rises around midnight."),
    ("13-14", "Dec", "Geminid Meteor Shower", "The strongest shower of the year."),
];

// (name, catalogue, kind, constellation, magnitude)
const DEEP_SKY: &[(&str, &str, &str, &str, f64)] = &[
    ("Orion Nebula", "M42", "Nebula", "Orion", 4.0),
    ("Andromeda Galaxy", "M31", "Galaxy", "Andromeda", 3.4),
    ("Pleiades", "M45", "Open cluster", "Taurus", 1.6),
    ("Double Cluster", "NGC 869/884", "Open cluster", "Perseus", 3.7),
    ("Hercules Cluster", "M13", "Globular cluster", "Hercules", 5.8),
    ("Ring Nebula", "M57", "Planetary nebula", "Lyra", 8.8),
    ("Whirlpool Galaxy", "M51", "Galaxy", "Canes Venatici", 8.4),
    ("Bode's Galaxy", "M81", "Galaxy", "Ursa Major", 6.9),
];

// (name, constellation, separation, magnitudes)
const DOUBLE_STARS: &[(&str, &str, f64, &str)] = &[
    ("Albireo", "Cygnus", 34.4, "3.1 / 5.1"),
    ("Mizar", "Ursa Major", 14.4, "2.2 / 3.9"),
    ("Almach", "Andromeda", 9.6, "2.3 / 5.0"),
    ("Rigel", "Orion", 9.5, "0.1 / 6.8"),
    ("Polaris", "Ursa Minor", 18.2, "2.0 / 9.1"),
    ("Epsilon Lyrae", "Lyra", 208.0, "4.7 / 4.6"),
];

/// Built-in tables.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticReference;

impl StaticReference {
    pub fn tables() -> ReferenceLists {
        ReferenceLists {
            events: EVENT_CALENDAR
                .iter()
                .map(|(date, month, title, desc)| SkyEvent {
                    date: date.to_string(),
                    month: month.to_string(),
                    title: title.to_string(),
                    desc: desc.to_string(),
                })
                .collect(),
            deep_sky: DEEP_SKY
                .iter()
                .map(|(name, catalogue, kind, constellation, magnitude)| DeepSkyObject {
                    name: name.to_string(),
                    catalogue: catalogue.to_string(),
                    kind: kind.to_string(),
                    constellation: constellation.to_string(),
                    magnitude: *magnitude,
                })
                .collect(),
            double_stars: DOUBLE_STARS
                .iter()
                .map(|(name, constellation, separation, magnitudes)| DoubleStar {
                    name: name.to_string(),
                    constellation: constellation.to_string(),
                    separation: *separation,
                    magnitudes: magnitudes.to_string(),
                })
                .collect(),
        }
    }
}

impl ReferenceProvider for StaticReference {
    fn lists(&self) -> NightwatchResult<ReferenceLists> {
        Ok(Self::tables())
    }
}

/// JSON feed with the `ReferenceLists` shape.
pub struct RemoteReference {
    url: String,
}

impl RemoteReference {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl ReferenceProvider for RemoteReference {
    fn lists(&self) -> NightwatchResult<ReferenceLists> {
        let client = http_client()?;
        log::debug!("Fetching reference lists from {}", self.url);
        let response = client
            .get(&self.url)
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
        parse_lists(&body)
    }
}

/// Parse a reference feed. Missing lists are empty; anything that is not an
/// object of lists is a `ParseFailure`.
pub fn parse_lists(body: &str) -> NightwatchResult<ReferenceLists> {
    #[derive(Deserialize)]
    struct Feed {
        #[serde(default)]
        events: Vec<SkyEvent>,
        #[serde(default)]
        deep_sky: Vec<DeepSkyObject>,
        #[serde(default)]
        double_stars: Vec<DoubleStar>,
    }

    let feed: Feed = serde_json::from_str(body)
        .map_err(|e| NightwatchError::ParseFailure(format!("Invalid reference feed: {e}")))?;
    Ok(ReferenceLists {
        events: feed.events,
        deep_sky: feed.deep_sky,
        double_stars: feed.double_stars,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_tables_are_populated() {
        let lists = StaticReference.lists().unwrap();
        assert!(!lists.events.is_empty());
        assert!(!lists.deep_sky.is_empty());
        assert!(!lists.double_stars.is_empty());
        assert_eq!(lists.events[0].title, "Quadrantid Meteor Shower");
        assert_eq!(lists.events[0].date, "3-4");
        assert!(lists.deep_sky.iter().any(|o| o.catalogue == "M42"));
    }

    #[test]
    fn test_parse_partial_feed() {
        let body = r#"{"events": [{"date": "10", "month": "Jan",
            "title": "Jupiter at Opposition", "desc": "All night"}]}"#;
        let lists = parse_lists(body).unwrap();
        assert_eq!(lists.events.len(), 1);
        assert!(lists.deep_sky.is_empty());
        assert!(lists.double_stars.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        assert!(matches!(
            parse_lists("<html>maintenance</html>"),
            Err(NightwatchError::ParseFailure(_))
        ));
        assert!(matches!(
            parse_lists(r#"{"events": "soon"}"#),
            Err(NightwatchError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_lists_serialize_with_fixed_keys() {
        let value = serde_json::to_value(ReferenceLists::default()).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 3);
        assert!(value.get("events").is_some());
        assert!(value.get("deep_sky").is_some());
        assert!(value.get("double_stars").is_some());
    }
}

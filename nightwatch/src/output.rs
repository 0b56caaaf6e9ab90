//! JSON output sink.

use crate::report::NightlyReport;
use crate::{NightwatchError, NightwatchResult};
use std::fs;
use std::path::Path;

/// Write the report as pretty JSON.
///
/// The file is written next to `path` first and renamed into place, so a
/// reader never sees a half-written report.
pub fn write_report(path: &Path, report: &NightlyReport) -> NightwatchResult<()> {
    let serialized = serde_json::to_string_pretty(report)
        .map_err(|e| NightwatchError::OutputError(format!("failed to serialize report: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            NightwatchError::OutputError(format!("failed to create {}: {e}", parent.display()))
        })?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = Path::new(&tmp_name);

    fs::write(tmp_path, serialized).map_err(|e| {
        NightwatchError::OutputError(format!("failed to write {}: {e}", tmp_path.display()))
    })?;
    fs::rename(tmp_path, path).map_err(|e| {
        NightwatchError::OutputError(format!("failed to replace {}: {e}", path.display()))
    })?;

    log::info!("Report written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::MoonPhase;
    use crate::reference::ReferenceLists;
    use crate::report::Timeline;

    fn report() -> NightlyReport {
        NightlyReport {
            last_updated: "2025-01-02T20:00:00+03:00".to_string(),
            location: "Sakarya, Adapazarı".to_string(),
            coordinates: "40.76, 30.36".to_string(),
            timeline: Timeline {
                start: "2025-01-02T18:00:00+03:00".to_string(),
                end: "2025-01-03T06:00:00+03:00".to_string(),
            },
            moon_phase: MoonPhase::unknown(),
            weather_hourly: Vec::new(),
            objects: Vec::new(),
            iss_passes: Vec::new(),
            lists: ReferenceLists::default(),
        }
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        write_report(&path, &report()).unwrap();
        let mut second = report();
        second.location = "Greenwich".to_string();
        write_report(&path, &second).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["location"], "Greenwich");
        assert_eq!(value["moon_phase"]["name"], "Unknown");
        assert_eq!(value["weather_hourly"], serde_json::json!([]));
        assert!(!dir.path().join("nested").join("data.json.tmp").exists());
    }

    #[test]
    fn test_unwritable_target_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let err = write_report(&blocker.join("data.json"), &report()).unwrap_err();
        assert!(matches!(err, NightwatchError::OutputError(_)));
    }
}

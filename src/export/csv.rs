use chrono::NaiveDate;
use csv::{Reader, Writer};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::load::TrainingLoadTracker;
use crate::training_plan::TrainingPlan;

/// One session per row, in plan order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRow {
    pub week: u32,
    pub phase: String,
    pub session_id: String,
    pub date: NaiveDate,
    pub weekday: String,
    pub session_type: String,
    pub title: String,
    pub zone: String,
    pub distance_km: Decimal,
    pub duration_minutes: u32,
    pub pace: String,
    pub hr_max_percent: String,
    pub status: String,
    pub key_session: bool,
    pub note: Option<String>,
}

/// Daily load as stored in a load history file
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadRow {
    pub date: NaiveDate,
    pub load: f64,
}

/// Flatten a plan into CSV rows
pub fn plan_rows(plan: &TrainingPlan) -> Vec<PlanRow> {
    plan.weeks
        .iter()
        .flat_map(|week| {
            week.sessions.iter().map(move |session| PlanRow {
                week: week.index,
                phase: week.phase.to_string(),
                session_id: session.id.clone(),
                date: session.date,
                weekday: session.weekday.to_string(),
                session_type: session.session_type.to_string(),
                title: session.title.clone(),
                zone: session.zone.to_string(),
                distance_km: session.target_distance_km,
                duration_minutes: session.target_duration_minutes,
                pace: session.pace.to_string(),
                hr_max_percent: format!("{}-{}%", session.hr_max_percent.0, session.hr_max_percent.1),
                status: session.status.to_string(),
                key_session: session.key_session,
                note: session.adaptation_note.clone(),
            })
        })
        .collect()
}

/// Export plan sessions to CSV (suitable for spreadsheets)
pub fn export_plan_sessions<P: AsRef<Path>>(plan: &TrainingPlan, output_path: P) -> Result<()> {
    let mut writer = Writer::from_path(&output_path)?;
    let rows = plan_rows(plan);
    for row in &rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    debug!(
        path = %output_path.as_ref().display(),
        rows = rows.len(),
        "Plan exported to CSV"
    );
    Ok(())
}

/// Export the tracker's daily loads
pub fn export_load_history<P: AsRef<Path>>(tracker: &TrainingLoadTracker, output_path: P) -> Result<()> {
    let mut writer = Writer::from_path(output_path)?;
    for (date, load) in tracker.history() {
        writer.serialize(LoadRow {
            date: *date,
            load: *load,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// Build a tracker from a `date,load` CSV file
///
/// Rows for the same date accumulate; negative loads are rejected.
pub fn import_load_history<P: AsRef<Path>>(input_path: P) -> Result<TrainingLoadTracker> {
    let mut reader = Reader::from_path(input_path)?;
    let mut tracker = TrainingLoadTracker::new();
    for row in reader.deserialize() {
        let row: LoadRow = row?;
        tracker.record(row.date, row.load)?;
    }
    Ok(tracker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AthleteProfile, RaceDistance};
    use crate::training_plan::PlanGenerator;
    use chrono::{Duration, Weekday};
    use tempfile::NamedTempFile;

    fn create_test_plan() -> TrainingPlan {
        let mut athlete = AthleteProfile::new("Test Runner", RaceDistance::TenK);
        athlete.set_target(RaceDistance::TenK, Some(45)).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        PlanGenerator::new()
            .generate(
                &athlete,
                start,
                start + Duration::days(56),
                3,
                &[Weekday::Tue, Weekday::Thu, Weekday::Sun],
            )
            .unwrap()
    }

    #[test]
    fn test_export_plan_sessions() {
        let plan = create_test_plan();
        let temp_file = NamedTempFile::new().unwrap();

        export_plan_sessions(&plan, temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("week,phase,session_id,date"));
        assert_eq!(lines.count(), 24);
        assert!(content.contains("W1_S1,2024-03-05,Tue"));
        assert!(content.contains("planned"));
    }

    #[test]
    fn test_load_history_round_trip() {
        let mut tracker = TrainingLoadTracker::new();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        tracker.record(day, 42.0).unwrap();
        tracker.record(day + Duration::days(2), 63.5).unwrap();

        let temp_file = NamedTempFile::new().unwrap();
        export_load_history(&tracker, temp_file.path()).unwrap();
        let imported = import_load_history(temp_file.path()).unwrap();

        assert_eq!(imported.history(), tracker.history());
    }

    #[test]
    fn test_import_rejects_negative_load() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "date,load\n2024-03-04,-3.0\n").unwrap();
        assert!(import_load_history(temp_file.path()).is_err());
    }
}

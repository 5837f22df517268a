use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::{RecoveryError, Result};
use crate::recovery::{Baselines, DailyMetrics, SubjectiveReport};

/// Share of a day's feedback impact carried into the following days
pub const FEEDBACK_DECAY: [f64; 2] = [1.0, 0.7];

/// Baseline window settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineWindow {
    /// Trailing days considered, excluding the current day
    pub days: u16,
    /// Readings required before a baseline counts as established
    pub min_readings: u16,
}

impl Default for BaselineWindow {
    fn default() -> Self {
        Self {
            days: 28,
            min_readings: 7,
        }
    }
}

/// Append-only, date-indexed history of scored days
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsHistory {
    records: BTreeMap<NaiveDate, DailyMetrics>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a day; a second record for the same date is rejected
    pub fn append(&mut self, metrics: DailyMetrics) -> Result<()> {
        let date = metrics.date();
        if self.records.contains_key(&date) {
            return Err(RecoveryError::DuplicateEntry { date }.into());
        }
        self.records.insert(date, metrics);
        Ok(())
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DailyMetrics> {
        self.records.get(&date)
    }

    pub fn latest(&self) -> Option<&DailyMetrics> {
        self.records.values().next_back()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DailyMetrics> {
        self.records.values()
    }

    /// Days in `[as_of - days, as_of)`
    fn trailing(&self, as_of: NaiveDate, days: u16) -> impl Iterator<Item = &DailyMetrics> {
        let start = as_of - Duration::days(i64::from(days));
        self.records.range(start..as_of).map(|(_, m)| m)
    }

    /// Feedback tag impact carried into `as_of` from the previous days
    ///
    /// Yesterday's tags count in full, the day before at 70%. The day's own
    /// report is already part of its feeling sub-score.
    pub fn feedback_carryover(&self, as_of: NaiveDate) -> f64 {
        let carried = FEEDBACK_DECAY
            .iter()
            .enumerate()
            .filter_map(|(i, decay)| {
                let date = as_of - Duration::days(i as i64 + 1);
                let report = self.records.get(&date)?.subjective()?;
                Some(report.tag_impact() * decay)
            })
            .sum::<f64>();

        if carried != 0.0 {
            debug!(%as_of, carried, "Feedback carried over");
        }
        carried
    }

    /// Most recent reports, newest first, within the carry-over window
    pub fn recent_feedback(&self, as_of: NaiveDate) -> impl Iterator<Item = (NaiveDate, &SubjectiveReport)> {
        let start = as_of - Duration::days(FEEDBACK_DECAY.len() as i64);
        self.records
            .range(start..as_of)
            .rev()
            .filter_map(|(date, m)| m.subjective().map(|s| (*date, s)))
    }

    /// Rolling HRV and resting-HR baselines for scoring `as_of`
    ///
    /// Each baseline stays None until the window holds at least
    /// `min_readings` values for that signal.
    pub fn baselines(&self, as_of: NaiveDate, window: &BaselineWindow) -> Baselines {
        let hrv: Vec<f64> = self
            .trailing(as_of, window.days)
            .filter_map(DailyMetrics::hrv_ms)
            .collect();
        let resting_hr: Vec<f64> = self
            .trailing(as_of, window.days)
            .filter_map(|m| m.resting_hr().map(f64::from))
            .collect();

        let established = |values: &[f64]| -> Option<f64> {
            if values.len() >= usize::from(window.min_readings.max(1)) {
                Some(values.iter().mean())
            } else {
                None
            }
        };

        let baselines = Baselines {
            hrv_ms: established(&hrv),
            resting_hr: established(&resting_hr),
        };

        debug!(
            %as_of,
            hrv_readings = hrv.len(),
            rhr_readings = resting_hr.len(),
            ?baselines,
            "Baselines computed"
        );

        baselines
    }
}

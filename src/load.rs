//! Acute:chronic workload ratio (ACWR)
//!
//! Acute load is the sum of session loads over the trailing 7 days; chronic
//! load is the average weekly load over the trailing 28 days. Both windows end
//! on, and include, the reference date.
//!
//! The ratio is only reported once the history reaches back to the first
//! day of the chronic window. Record zero loads for rest days when tracking
//! starts on a day without a session.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::error::{CoachError, Result};
use crate::models::IntensityZone;

pub const ACUTE_WINDOW_DAYS: i64 = 7;
pub const CHRONIC_WINDOW_DAYS: i64 = 28;

/// Max HR assumed when an activity carries none
pub const DEFAULT_MAX_HR: u16 = 190;

/// Load produced by a session: minutes times the zone factor
pub fn session_load(duration_minutes: u32, zone: IntensityZone) -> f64 {
    f64::from(duration_minutes) * zone.load_factor()
}

/// What the watch reported for a finished activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub duration_minutes: u32,
    pub avg_hr: Option<u16>,
    /// Athlete's max HR
    pub max_hr: Option<u16>,
    pub avg_pace_sec_per_km: Option<u32>,
}

impl ActivitySummary {
    pub fn new(duration_minutes: u32) -> Self {
        Self {
            duration_minutes,
            ..Self::default()
        }
    }

    pub fn with_heart_rate(mut self, avg_hr: u16, max_hr: Option<u16>) -> Self {
        self.avg_hr = Some(avg_hr);
        self.max_hr = max_hr;
        self
    }

    pub fn with_pace(mut self, sec_per_km: u32) -> Self {
        self.avg_pace_sec_per_km = Some(sec_per_km);
        self
    }

    /// Intensity factor from average HR as a share of max HR, else from pace
    ///
    /// | avg/max HR | pace (min/km) | factor |
    /// |------------|---------------|--------|
    /// | < 60%      | 5:30 or slower | 0.5   |
    /// | < 75%      | 5:00-5:30     | 1.0    |
    /// | < 85%      | 4:30-5:00     | 1.5    |
    /// | 85% and up | under 4:30    | 2.0    |
    pub fn intensity_factor(&self) -> Option<f64> {
        if let Some(avg_hr) = self.avg_hr.filter(|hr| *hr > 0) {
            let max_hr = self.max_hr.filter(|hr| *hr > 0).unwrap_or(DEFAULT_MAX_HR);
            let intensity = f64::from(avg_hr) / f64::from(max_hr);
            let factor = if intensity < 0.60 {
                0.5
            } else if intensity < 0.75 {
                1.0
            } else if intensity < 0.85 {
                1.5
            } else {
                2.0
            };
            return Some(factor);
        }

        let pace = self.avg_pace_sec_per_km.filter(|p| *p > 0)?;
        Some(match pace {
            0..=269 => 2.0,
            270..=299 => 1.5,
            300..=329 => 1.0,
            _ => 0.5,
        })
    }
}

/// Load of a finished activity, rounded to 0.1
///
/// None when neither heart rate nor pace was recorded.
pub fn activity_load(activity: &ActivitySummary) -> Option<f64> {
    let factor = activity.intensity_factor()?;
    let load = f64::from(activity.duration_minutes) * factor;
    Some((load * 10.0).round() / 10.0)
}

/// ACWR over a date-ordered load history
///
/// Returns None while the history does not yet cover the whole chronic
/// window, or when the chronic load is zero; the load signal is then
/// unavailable.
pub fn acwr(history: &BTreeMap<NaiveDate, f64>, as_of: NaiveDate) -> Option<f64> {
    let chronic_start = as_of - Duration::days(CHRONIC_WINDOW_DAYS - 1);
    match history.keys().next() {
        Some(first) if *first <= chronic_start => {}
        _ => return None,
    }

    let acute = window_sum(history, as_of, ACUTE_WINDOW_DAYS);
    let chronic = window_sum(history, as_of, CHRONIC_WINDOW_DAYS) / 4.0;

    if chronic <= 0.0 {
        None
    } else {
        Some(acute / chronic)
    }
}

fn window_sum(history: &BTreeMap<NaiveDate, f64>, as_of: NaiveDate, days: i64) -> f64 {
    let start = as_of - Duration::days(days - 1);
    history.range(start..=as_of).map(|(_, load)| load).sum()
}

/// Interpretation of an ACWR value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadStatus {
    Undertrained,
    Optimal,
    Caution,
    Overload,
}

impl LoadStatus {
    /// Classify a ratio
    ///
    /// - below 0.8: undertrained
    /// - 0.8 to 1.3: optimal
    /// - up to 1.5: caution
    /// - above 1.5: overload
    pub fn from_acwr(ratio: f64) -> Self {
        if ratio < 0.8 {
            LoadStatus::Undertrained
        } else if ratio <= 1.3 {
            LoadStatus::Optimal
        } else if ratio <= 1.5 {
            LoadStatus::Caution
        } else {
            LoadStatus::Overload
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            LoadStatus::Undertrained => "Load below usual; room to build",
            LoadStatus::Optimal => "Load in the optimal band",
            LoadStatus::Caution => "Load rising quickly; watch fatigue",
            LoadStatus::Overload => "Load spike; elevated injury risk",
        }
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Undertrained => write!(f, "Undertrained"),
            LoadStatus::Optimal => write!(f, "Optimal"),
            LoadStatus::Caution => write!(f, "Caution"),
            LoadStatus::Overload => write!(f, "Overload"),
        }
    }
}

/// Snapshot of the load windows on a date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub date: NaiveDate,
    pub acute: f64,
    pub chronic: f64,
    pub acwr: Option<f64>,
    pub status: Option<LoadStatus>,
}

/// Daily load history of completed sessions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingLoadTracker {
    daily: BTreeMap<NaiveDate, f64>,
}

impl TrainingLoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a completed session's load; several sessions on one day accumulate
    pub fn record(&mut self, date: NaiveDate, load: f64) -> Result<()> {
        if !load.is_finite() || load < 0.0 {
            return Err(CoachError::Validation(format!(
                "Session load must be a non-negative number, got {}",
                load
            )));
        }
        *self.daily.entry(date).or_insert(0.0) += load;
        debug!(%date, load, "Load recorded");
        Ok(())
    }

    pub fn load_on(&self, date: NaiveDate) -> f64 {
        self.daily.get(&date).copied().unwrap_or(0.0)
    }

    pub fn acute_load(&self, as_of: NaiveDate) -> f64 {
        window_sum(&self.daily, as_of, ACUTE_WINDOW_DAYS)
    }

    /// Average weekly load over the chronic window
    pub fn chronic_load(&self, as_of: NaiveDate) -> f64 {
        window_sum(&self.daily, as_of, CHRONIC_WINDOW_DAYS) / 4.0
    }

    pub fn acwr(&self, as_of: NaiveDate) -> Option<f64> {
        acwr(&self.daily, as_of)
    }

    pub fn summary(&self, as_of: NaiveDate) -> LoadSummary {
        let ratio = self.acwr(as_of);
        let summary = LoadSummary {
            date: as_of,
            acute: self.acute_load(as_of),
            chronic: self.chronic_load(as_of),
            acwr: ratio,
            status: ratio.map(LoadStatus::from_acwr),
        };
        info!(
            date = %as_of,
            acute = summary.acute,
            chronic = summary.chronic,
            acwr = ?summary.acwr,
            "Training load summary"
        );
        summary
    }

    pub fn history(&self) -> &BTreeMap<NaiveDate, f64> {
        &self.daily
    }
}

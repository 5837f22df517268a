//! Recovery score calculation
//!
//! Reduces the day's physiological signals to a single 0-100 readiness score
//! that drives session adaptation.
//!
//! # Inputs
//!
//! Each input is first turned into a sub-score clipped to 0-100:
//!
//! - **Sleep** (35%): the device sleep score when present, otherwise derived
//!   from duration (8 h earns full credit) and subjective quality.
//! - **HRV** (25%): today's RMSSD relative to the personal rolling baseline.
//!   Readings at or above baseline earn full credit.
//! - **Training load** (20%): inverse of the acute:chronic workload ratio.
//!   Anything up to 1.3 is in the optimal band and earns full credit; credit
//!   falls linearly to zero at 2.0.
//! - **Resting heart rate** (10%): baseline over today's value, so an
//!   elevated morning pulse lowers the score.
//! - **Feeling** (10%): the 1-5 rating mapped onto 0-100, moved by feedback
//!   tags such as heavy legs or illness.
//!
//! # Adjustments
//!
//! Two corrections are added to the weighted score before rounding:
//!
//! - **Residual fatigue**: an activity done earlier on the scored day costs
//!   5 to 20 points by load, fading linearly over 48 h to no less than 30%
//!   of the penalty.
//! - **Carried feedback**: tags reported on the two previous days, at 100%
//!   and 70% of their impact (see `MetricsHistory::feedback_carryover`).
//!
//! # Missing data
//!
//! An unavailable input is left out and the remaining weights are scaled up
//! proportionally. HRV and resting HR count as unavailable until enough
//! history exists to establish a baseline. With no inputs at all the
//! calculator refuses to produce a score.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{CoachError, RecoveryError, Result};
use crate::models::AthleteProfile;

/// Subjective sleep quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl SleepQuality {
    fn score(&self) -> f64 {
        match self {
            SleepQuality::Poor => 40.0,
            SleepQuality::Fair => 60.0,
            SleepQuality::Good => 80.0,
            SleepQuality::Excellent => 100.0,
        }
    }
}

impl fmt::Display for SleepQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SleepQuality::Poor => write!(f, "Poor"),
            SleepQuality::Fair => write!(f, "Fair"),
            SleepQuality::Good => write!(f, "Good"),
            SleepQuality::Excellent => write!(f, "Excellent"),
        }
    }
}

/// Last night's sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepData {
    pub total_hours: f64,
    pub quality: SleepQuality,
    /// Device sleep score; some platforms report above 100
    pub device_score: Option<u16>,
}

impl SleepData {
    /// Hours of sleep that earn full duration credit
    pub const TARGET_HOURS: f64 = 8.0;

    pub fn new(total_hours: f64, quality: SleepQuality, device_score: Option<u16>) -> Result<Self> {
        if !(0.0..=24.0).contains(&total_hours) {
            return Err(CoachError::Validation(format!(
                "Sleep duration {}h outside 0-24h",
                total_hours
            )));
        }
        Ok(Self {
            total_hours,
            quality,
            device_score,
        })
    }

    /// Sleep sub-score in 0-100
    pub fn score(&self) -> f64 {
        match self.device_score {
            Some(score) => f64::from(score).min(100.0),
            None => {
                let duration = (self.total_hours / Self::TARGET_HOURS).min(1.0) * 100.0;
                clip(0.7 * duration + 0.3 * self.quality.score())
            }
        }
    }
}

/// Free-form feedback an athlete can attach to the daily check-in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackTag {
    HeavyLegs,
    Sick,
    Fatigue,
    Soreness,
    BadDay,
    Rain,
    Heat,
    Cold,
    LightLegs,
    GoodForm,
    WellRested,
    Motivated,
    GoodDay,
}

impl FeedbackTag {
    /// Points added to the feeling sub-score
    pub fn impact(&self) -> f64 {
        match self {
            FeedbackTag::HeavyLegs => -10.0,
            FeedbackTag::Sick => -15.0,
            FeedbackTag::Fatigue => -12.0,
            FeedbackTag::Soreness => -8.0,
            FeedbackTag::BadDay => -5.0,
            FeedbackTag::Rain => -2.0,
            FeedbackTag::Heat => -5.0,
            FeedbackTag::Cold => -3.0,
            FeedbackTag::LightLegs => 10.0,
            FeedbackTag::GoodForm => 8.0,
            FeedbackTag::WellRested => 8.0,
            FeedbackTag::Motivated => 6.0,
            FeedbackTag::GoodDay => 5.0,
        }
    }
}

impl std::str::FromStr for FeedbackTag {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', ' '], "_").as_str() {
            "heavy_legs" => Ok(FeedbackTag::HeavyLegs),
            "sick" | "ill" => Ok(FeedbackTag::Sick),
            "fatigue" | "tired" => Ok(FeedbackTag::Fatigue),
            "soreness" | "sore" | "pain" => Ok(FeedbackTag::Soreness),
            "bad_day" => Ok(FeedbackTag::BadDay),
            "rain" => Ok(FeedbackTag::Rain),
            "heat" => Ok(FeedbackTag::Heat),
            "cold" => Ok(FeedbackTag::Cold),
            "light_legs" => Ok(FeedbackTag::LightLegs),
            "good_form" => Ok(FeedbackTag::GoodForm),
            "well_rested" => Ok(FeedbackTag::WellRested),
            "motivated" => Ok(FeedbackTag::Motivated),
            "good_day" => Ok(FeedbackTag::GoodDay),
            _ => Err(CoachError::Validation(format!("Unknown feedback tag: {}", s))),
        }
    }
}

/// Athlete's own assessment of the day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectiveReport {
    /// 1 (awful) to 5 (great)
    pub rating: Option<u8>,
    #[serde(default)]
    pub tags: Vec<FeedbackTag>,
}

impl SubjectiveReport {
    pub fn new(rating: Option<u8>, tags: Vec<FeedbackTag>) -> Result<Self> {
        if let Some(r) = rating {
            if !(1..=5).contains(&r) {
                return Err(CoachError::Validation(format!(
                    "Feeling rating {} outside 1-5",
                    r
                )));
            }
        }
        Ok(Self { rating, tags })
    }

    /// Feeling sub-score, None when neither a rating nor tags were given
    ///
    /// Tags alone are applied to a neutral 50.
    pub fn score(&self) -> Option<f64> {
        if self.rating.is_none() && self.tags.is_empty() {
            return None;
        }
        let base = self
            .rating
            .map(|r| f64::from(r.clamp(1, 5) - 1) / 4.0 * 100.0)
            .unwrap_or(50.0);
        Some(clip(base + self.tag_impact()))
    }

    /// Sum of the tag impacts
    pub fn tag_impact(&self) -> f64 {
        self.tags.iter().map(FeedbackTag::impact).sum()
    }

    /// Illness, soreness, or heavy legs combined with fatigue rule out training
    pub fn forces_rest(&self) -> bool {
        let has = |tag: FeedbackTag| self.tags.contains(&tag);
        has(FeedbackTag::Sick)
            || has(FeedbackTag::Soreness)
            || (has(FeedbackTag::HeavyLegs) && has(FeedbackTag::Fatigue))
    }
}

/// Activity already completed on the scored day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub load: f64,
    pub hours_since: f64,
}

impl RecentActivity {
    const FADE_HOURS: f64 = 48.0;
    const MIN_TIME_FACTOR: f64 = 0.3;

    /// Points taken off the recovery score, zero or negative
    pub fn penalty(&self) -> f64 {
        if !self.load.is_finite() || self.load < 0.0 || !self.hours_since.is_finite() {
            return 0.0;
        }
        let base = if self.load < 30.0 {
            -5.0
        } else if self.load < 60.0 {
            -10.0
        } else if self.load < 100.0 {
            -15.0
        } else {
            -20.0
        };
        let time_factor = (1.0 - self.hours_since.max(0.0) / Self::FADE_HOURS).max(Self::MIN_TIME_FACTOR);
        base * time_factor
    }
}

/// Unscored daily record as delivered by the wearable collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub date: NaiveDate,
    pub sleep: Option<SleepData>,
    pub hrv_ms: Option<f64>,
    pub resting_hr: Option<u16>,
    pub subjective: Option<SubjectiveReport>,
    /// ACWR observed on this date
    pub acwr: Option<f64>,
    #[serde(default)]
    pub recent_activity: Option<RecentActivity>,
}

impl RawMetrics {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            sleep: None,
            hrv_ms: None,
            resting_hr: None,
            subjective: None,
            acwr: None,
            recent_activity: None,
        }
    }
}

/// Personal baselines; None until enough history exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Baselines {
    pub hrv_ms: Option<f64>,
    pub resting_hr: Option<f64>,
}

impl Baselines {
    /// Fill a missing resting-HR baseline from the athlete profile
    pub fn or_profile(mut self, profile: &AthleteProfile) -> Self {
        if self.resting_hr.is_none() {
            self.resting_hr = profile.resting_hr.map(f64::from);
        }
        self
    }
}

/// Relative weight of each input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryWeights {
    pub sleep: f64,
    pub hrv: f64,
    pub load: f64,
    pub resting_hr: f64,
    pub feeling: f64,
}

impl Default for RecoveryWeights {
    fn default() -> Self {
        Self {
            sleep: 0.35,
            hrv: 0.25,
            load: 0.20,
            resting_hr: 0.10,
            feeling: 0.10,
        }
    }
}

impl RecoveryWeights {
    fn as_array(&self) -> [f64; 5] {
        [self.sleep, self.hrv, self.load, self.resting_hr, self.feeling]
    }

    /// Weights must be non-negative and sum to 1
    pub fn validate(&self) -> std::result::Result<(), RecoveryError> {
        let weights = self.as_array();
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecoveryError::InvalidWeights {
                reason: "weights must be finite and non-negative".to_string(),
            });
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(RecoveryError::InvalidWeights {
                reason: format!("weights sum to {:.3}, expected 1.0", total),
            });
        }
        Ok(())
    }
}

/// Normalized sub-scores, each in 0-100 or absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecoveryInputs {
    pub sleep: Option<f64>,
    pub hrv: Option<f64>,
    pub load: Option<f64>,
    pub resting_hr: Option<f64>,
    pub feeling: Option<f64>,
}

impl RecoveryInputs {
    pub const COUNT: usize = 5;

    /// Normalize raw signals against baselines
    pub fn from_raw(raw: &RawMetrics, baselines: &Baselines) -> Self {
        Self {
            sleep: raw.sleep.as_ref().map(SleepData::score),
            hrv: match (raw.hrv_ms, baselines.hrv_ms) {
                (Some(hrv), Some(baseline)) => hrv_subscore(hrv, baseline),
                _ => None,
            },
            load: raw.acwr.and_then(load_subscore),
            resting_hr: match (raw.resting_hr, baselines.resting_hr) {
                (Some(rhr), Some(baseline)) => resting_hr_subscore(f64::from(rhr), baseline),
                _ => None,
            },
            feeling: raw.subjective.as_ref().and_then(SubjectiveReport::score),
        }
    }

    fn as_array(&self) -> [Option<f64>; 5] {
        [self.sleep, self.hrv, self.load, self.resting_hr, self.feeling]
    }

    /// Inputs holding a finite sub-score
    pub fn available(&self) -> usize {
        self.as_array().iter().flatten().filter(|s| s.is_finite()).count()
    }

    /// Share of inputs present, 0.0-1.0
    pub fn completeness(&self) -> f64 {
        self.available() as f64 / Self::COUNT as f64
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

fn usable(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// HRV relative to baseline; None for non-positive or non-finite values
pub fn hrv_subscore(hrv_ms: f64, baseline_ms: f64) -> Option<f64> {
    if !usable(hrv_ms) || !usable(baseline_ms) {
        return None;
    }
    Some(clip(hrv_ms / baseline_ms * 100.0))
}

/// Baseline over today's resting HR; a higher pulse scores lower
pub fn resting_hr_subscore(resting_hr: f64, baseline: f64) -> Option<f64> {
    if !usable(resting_hr) || !usable(baseline) {
        return None;
    }
    Some(clip(baseline / resting_hr * 100.0))
}

/// Full credit through the optimal ACWR band, zero at 2.0
///
/// None for a negative or non-finite ratio.
pub fn load_subscore(acwr: f64) -> Option<f64> {
    const OPTIMAL_MAX: f64 = 1.3;
    const CEILING: f64 = 2.0;

    if !acwr.is_finite() || acwr < 0.0 {
        return None;
    }
    if acwr <= OPTIMAL_MAX {
        Some(100.0)
    } else {
        Some(clip((CEILING - acwr) / (CEILING - OPTIMAL_MAX) * 100.0))
    }
}

/// One day's metrics with its score fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyMetrics {
    date: NaiveDate,
    sleep: Option<SleepData>,
    hrv_ms: Option<f64>,
    resting_hr: Option<u16>,
    subjective: Option<SubjectiveReport>,
    acwr: Option<f64>,
    recovery_score: Option<u8>,
    completeness: f64,
    /// Residual fatigue plus carried feedback, in points
    #[serde(default)]
    adjustment: f64,
}

impl DailyMetrics {
    /// Record for a caller that already holds a score
    pub fn with_score(date: NaiveDate, score: u8) -> Self {
        Self {
            date,
            sleep: None,
            hrv_ms: None,
            resting_hr: None,
            subjective: None,
            acwr: None,
            recovery_score: Some(score),
            completeness: 1.0,
            adjustment: 0.0,
        }
    }

    /// Attach the day's subjective report (kept for forced-rest checks)
    pub fn with_subjective(mut self, report: SubjectiveReport) -> Self {
        self.subjective = Some(report);
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn sleep(&self) -> Option<&SleepData> {
        self.sleep.as_ref()
    }

    pub fn hrv_ms(&self) -> Option<f64> {
        self.hrv_ms
    }

    pub fn resting_hr(&self) -> Option<u16> {
        self.resting_hr
    }

    pub fn subjective(&self) -> Option<&SubjectiveReport> {
        self.subjective.as_ref()
    }

    pub fn acwr(&self) -> Option<f64> {
        self.acwr
    }

    /// None when every input was missing
    pub fn recovery_score(&self) -> Option<u8> {
        self.recovery_score
    }

    pub fn completeness(&self) -> f64 {
        self.completeness
    }

    pub fn adjustment(&self) -> f64 {
        self.adjustment
    }
}

/// Weighted recovery score calculator
#[derive(Debug, Clone)]
pub struct RecoveryCalculator {
    weights: RecoveryWeights,
}

impl Default for RecoveryCalculator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecoveryCalculator {
    pub fn new() -> Self {
        Self {
            weights: RecoveryWeights::default(),
        }
    }

    pub fn with_weights(weights: RecoveryWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &RecoveryWeights {
        &self.weights
    }

    /// Weighted mean over the available inputs, before rounding
    pub fn weighted_score(&self, inputs: &RecoveryInputs) -> Option<f64> {
        let (weighted_sum, weight_total) = self
            .weights
            .as_array()
            .iter()
            .zip(inputs.as_array())
            .filter_map(|(w, s)| s.filter(|s| s.is_finite()).map(|s| (*w, clip(s))))
            .fold((0.0, 0.0), |(sum, total), (w, s)| (sum + w * s, total + w));

        if weight_total <= 0.0 {
            None
        } else {
            Some(clip(weighted_sum / weight_total))
        }
    }

    /// Recovery score in 0-100, rounded half away from zero
    pub fn calculate(&self, inputs: &RecoveryInputs) -> Result<u8> {
        let score = self.weighted_score(inputs).ok_or_else(|| RecoveryError::DataUnavailable {
            reason: "no sleep, HRV, load, resting HR or feeling data".to_string(),
        })?;

        debug!(
            sleep = ?inputs.sleep,
            hrv = ?inputs.hrv,
            load = ?inputs.load,
            resting_hr = ?inputs.resting_hr,
            feeling = ?inputs.feeling,
            score,
            "Recovery score computed"
        );

        Ok(score.round() as u8)
    }

    /// Score a raw record into an immutable `DailyMetrics`
    ///
    /// A day with no usable input keeps `recovery_score == None`; the
    /// adaptation engine reports that as `DataUnavailable`.
    pub fn score_metrics(&self, raw: RawMetrics, baselines: &Baselines) -> DailyMetrics {
        self.score_metrics_with(raw, baselines, 0.0)
    }

    /// Like `score_metrics`, adding feedback carried over from earlier days
    pub fn score_metrics_with(
        &self,
        raw: RawMetrics,
        baselines: &Baselines,
        carried_feedback: f64,
    ) -> DailyMetrics {
        let inputs = RecoveryInputs::from_raw(&raw, baselines);
        let fatigue = raw.recent_activity.as_ref().map_or(0.0, RecentActivity::penalty);
        let carried = if carried_feedback.is_finite() { carried_feedback } else { 0.0 };
        let adjustment = fatigue + carried;

        let recovery_score = self.weighted_score(&inputs).map(|score| {
            debug!(
                date = %raw.date,
                available = inputs.available(),
                score,
                fatigue,
                carried,
                "Daily metrics scored"
            );
            clip(score + adjustment).round() as u8
        });

        DailyMetrics {
            date: raw.date,
            sleep: raw.sleep,
            hrv_ms: raw.hrv_ms,
            resting_hr: raw.resting_hr,
            subjective: raw.subjective,
            acwr: raw.acwr,
            recovery_score,
            completeness: inputs.completeness(),
            adjustment,
        }
    }
}

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoachError, PlanError, Result};

/// Target race distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RaceDistance {
    FiveK,
    TenK,
    HalfMarathon,
    Marathon,
}

impl RaceDistance {
    /// Race distance in kilometres
    pub fn km(&self) -> Decimal {
        match self {
            RaceDistance::FiveK => dec!(5),
            RaceDistance::TenK => dec!(10),
            RaceDistance::HalfMarathon => dec!(21.0975),
            RaceDistance::Marathon => dec!(42.195),
        }
    }

    /// Fraction of VMA an athlete can hold for the whole race
    ///
    /// Longer races are run further below maximal aerobic speed:
    /// - 5K: 96%
    /// - 10K: 93%
    /// - Half marathon: 89%
    /// - Marathon: 82%
    pub fn vma_fraction(&self) -> Decimal {
        match self {
            RaceDistance::FiveK => dec!(0.96),
            RaceDistance::TenK => dec!(0.93),
            RaceDistance::HalfMarathon => dec!(0.89),
            RaceDistance::Marathon => dec!(0.82),
        }
    }
}

impl fmt::Display for RaceDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceDistance::FiveK => write!(f, "5K"),
            RaceDistance::TenK => write!(f, "10K"),
            RaceDistance::HalfMarathon => write!(f, "Half Marathon"),
            RaceDistance::Marathon => write!(f, "Marathon"),
        }
    }
}

impl FromStr for RaceDistance {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "5k" => Ok(RaceDistance::FiveK),
            "10k" => Ok(RaceDistance::TenK),
            "half" | "halfmarathon" | "half-marathon" => Ok(RaceDistance::HalfMarathon),
            "marathon" => Ok(RaceDistance::Marathon),
            _ => Err(CoachError::Validation(format!("Unknown race distance: {}", s))),
        }
    }
}

/// Athlete profile
///
/// Plans refer to an athlete by `id` only. Edits go through the `set_*`
/// methods, which validate and bump `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteProfile {
    /// Unique athlete identifier
    pub id: String,

    /// Athlete's display name
    pub name: String,

    /// Date of birth for age-based calculations
    pub date_of_birth: Option<NaiveDate>,

    /// Weight in kilograms
    pub weight_kg: Option<Decimal>,

    /// Maximal aerobic speed in km/h
    pub vma_kmh: Option<Decimal>,

    /// Target race distance
    pub race_distance: RaceDistance,

    /// Target finish time in minutes
    pub target_time_minutes: Option<u32>,

    /// Resting heart rate
    pub resting_hr: Option<u16>,

    /// Measured maximum heart rate
    pub max_hr: Option<u16>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl AthleteProfile {
    pub fn new(name: impl Into<String>, race_distance: RaceDistance) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            date_of_birth: None,
            weight_kg: None,
            vma_kmh: None,
            race_distance,
            target_time_minutes: None,
            resting_hr: None,
            max_hr: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Age in whole years on the given date
    pub fn age_on(&self, date: NaiveDate) -> Option<u32> {
        let dob = self.date_of_birth?;
        let mut age = date.year() - dob.year();
        if (date.month(), date.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        u32::try_from(age).ok()
    }

    /// Measured max HR, else the 220 - age estimate
    pub fn max_heart_rate(&self, on: NaiveDate) -> Option<u16> {
        self.max_hr.or_else(|| {
            self.age_on(on)
                .and_then(|age| u16::try_from(220u32.saturating_sub(age)).ok())
        })
    }

    /// Goal race pace in seconds per km
    ///
    /// Taken from the target time when set, otherwise estimated from VMA
    /// and the race-distance fraction.
    pub fn goal_pace_sec_per_km(&self) -> Result<Decimal> {
        if let Some(minutes) = self.target_time_minutes {
            if minutes == 0 {
                return Err(CoachError::Validation("Target time must be positive".to_string()));
            }
            return Ok(Decimal::from(minutes) * dec!(60) / self.race_distance.km());
        }

        let vma = self.vma_kmh.ok_or_else(|| PlanError::MissingProfileData {
            field: "target_time_minutes or vma_kmh".to_string(),
        })?;
        let race_speed = vma * self.race_distance.vma_fraction();
        if race_speed <= Decimal::ZERO {
            return Err(CoachError::Validation(format!(
                "VMA must be positive, got {} km/h",
                vma
            )));
        }
        Ok(dec!(3600) / race_speed)
    }

    pub fn set_vma(&mut self, vma_kmh: Decimal) -> Result<()> {
        if vma_kmh < dec!(8) || vma_kmh > dec!(30) {
            return Err(CoachError::Validation(format!(
                "VMA {} km/h outside 8-30 km/h",
                vma_kmh
            )));
        }
        self.vma_kmh = Some(vma_kmh);
        self.touch();
        Ok(())
    }

    pub fn set_target(&mut self, race_distance: RaceDistance, target_time_minutes: Option<u32>) -> Result<()> {
        if target_time_minutes == Some(0) {
            return Err(CoachError::Validation("Target time must be positive".to_string()));
        }
        self.race_distance = race_distance;
        self.target_time_minutes = target_time_minutes;
        self.touch();
        Ok(())
    }

    pub fn set_heart_rate(&mut self, resting_hr: Option<u16>, max_hr: Option<u16>) -> Result<()> {
        if let Some(rhr) = resting_hr {
            if !(25..=120).contains(&rhr) {
                return Err(CoachError::Validation(format!("Resting HR {} bpm out of range", rhr)));
            }
        }
        if let Some(max) = max_hr {
            if !(100..=230).contains(&max) {
                return Err(CoachError::Validation(format!("Max HR {} bpm out of range", max)));
            }
        }
        if let (Some(rhr), Some(max)) = (resting_hr, max_hr) {
            if rhr >= max {
                return Err(CoachError::Validation(
                    "Resting HR must be below max HR".to_string(),
                ));
            }
        }
        self.resting_hr = resting_hr;
        self.max_hr = max_hr;
        self.touch();
        Ok(())
    }

    pub fn set_weight(&mut self, weight_kg: Decimal) -> Result<()> {
        if weight_kg <= Decimal::ZERO {
            return Err(CoachError::Validation("Weight must be positive".to_string()));
        }
        self.weight_kg = Some(weight_kg);
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Kind of running session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionType {
    LongRun,
    Threshold,
    VmaInterval,
    Fartlek,
    EasyEndurance,
    Recovery,
    Rest,
}

impl SessionType {
    /// VMA intervals and threshold work count toward the sequencing guard
    pub fn is_high_intensity(&self) -> bool {
        matches!(self, SessionType::VmaInterval | SessionType::Threshold)
    }

    pub fn default_zone(&self) -> IntensityZone {
        match self {
            SessionType::LongRun | SessionType::EasyEndurance => IntensityZone::Endurance,
            SessionType::Threshold => IntensityZone::Threshold,
            SessionType::VmaInterval => IntensityZone::Vma,
            SessionType::Fartlek => IntensityZone::Tempo,
            SessionType::Recovery | SessionType::Rest => IntensityZone::Recovery,
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionType::LongRun => write!(f, "Long run"),
            SessionType::Threshold => write!(f, "Threshold"),
            SessionType::VmaInterval => write!(f, "VMA intervals"),
            SessionType::Fartlek => write!(f, "Fartlek"),
            SessionType::EasyEndurance => write!(f, "Easy endurance"),
            SessionType::Recovery => write!(f, "Recovery run"),
            SessionType::Rest => write!(f, "Rest"),
        }
    }
}

/// Training intensity zone, ordered from easiest to hardest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntensityZone {
    Recovery,
    Endurance,
    Tempo,
    Threshold,
    Vma,
}

impl IntensityZone {
    pub const ALL: [IntensityZone; 5] = [
        IntensityZone::Recovery,
        IntensityZone::Endurance,
        IntensityZone::Tempo,
        IntensityZone::Threshold,
        IntensityZone::Vma,
    ];

    /// One zone easier; recovery stays recovery
    pub fn eased(&self) -> IntensityZone {
        match self {
            IntensityZone::Recovery | IntensityZone::Endurance => IntensityZone::Recovery,
            IntensityZone::Tempo => IntensityZone::Endurance,
            IntensityZone::Threshold => IntensityZone::Tempo,
            IntensityZone::Vma => IntensityZone::Threshold,
        }
    }

    /// Load units per minute spent in this zone
    pub fn load_factor(&self) -> f64 {
        match self {
            IntensityZone::Recovery => 0.5,
            IntensityZone::Endurance => 0.7,
            IntensityZone::Tempo => 1.0,
            IntensityZone::Threshold => 1.5,
            IntensityZone::Vma => 2.0,
        }
    }
}

impl fmt::Display for IntensityZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntensityZone::Recovery => write!(f, "Z1 Recovery"),
            IntensityZone::Endurance => write!(f, "Z2 Endurance"),
            IntensityZone::Tempo => write!(f, "Z3 Tempo"),
            IntensityZone::Threshold => write!(f, "Z4 Threshold"),
            IntensityZone::Vma => write!(f, "Z5 VMA"),
        }
    }
}

/// Lifecycle of a planned session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Planned,
    Maintained,
    Lightened,
    Replaced,
    Skipped,
    Completed,
}

impl SessionStatus {
    /// Completed and skipped sessions are final
    pub fn is_adaptable(&self) -> bool {
        !matches!(self, SessionStatus::Completed | SessionStatus::Skipped)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Planned => "planned",
            SessionStatus::Maintained => "maintained",
            SessionStatus::Lightened => "lightened",
            SessionStatus::Replaced => "replaced",
            SessionStatus::Skipped => "skipped",
            SessionStatus::Completed => "completed",
        };
        write!(f, "{}", label)
    }
}

/// Target pace range in seconds per km (fast end first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaceRange {
    pub fast_sec_per_km: u32,
    pub slow_sec_per_km: u32,
}

impl PaceRange {
    pub fn midpoint(&self) -> Decimal {
        Decimal::from(self.fast_sec_per_km + self.slow_sec_per_km) / dec!(2)
    }
}

impl fmt::Display for PaceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}/km",
            format_pace(self.fast_sec_per_km),
            format_pace(self.slow_sec_per_km)
        )
    }
}

/// Format seconds per km as `M:SS`
pub fn format_pace(sec_per_km: u32) -> String {
    format!("{}:{:02}", sec_per_km / 60, sec_per_km % 60)
}

/// A single planned run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Stable identifier, `W{week}_S{n}`
    pub id: String,
    pub week_index: u32,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub session_type: SessionType,
    pub zone: IntensityZone,
    pub title: String,
    pub target_distance_km: Decimal,
    pub target_duration_minutes: u32,
    pub pace: PaceRange,
    /// Target heart rate as (low, high) percent of max HR
    pub hr_max_percent: (u8, u8),
    pub status: SessionStatus,
    /// Long run or primary quality session of the week
    pub key_session: bool,
    /// Load recorded when the session was completed
    pub actual_load: Option<f64>,
    pub adaptation_note: Option<String>,
}

impl TrainingSession {
    pub fn is_high_intensity(&self) -> bool {
        self.session_type.is_high_intensity()
    }

    /// Load the session would produce if run as planned
    pub fn planned_load(&self) -> f64 {
        f64::from(self.target_duration_minutes) * self.zone.load_factor()
    }

    /// Target distance rounded for display
    pub fn distance_label(&self) -> String {
        format!("{:.1} km", self.target_distance_km.to_f64().unwrap_or_default())
    }
}

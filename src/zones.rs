use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{CoachError, PlanError, Result};
use crate::models::{AthleteProfile, IntensityZone, PaceRange};

/// Pace and heart-rate targets for one intensity zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceZone {
    pub zone: IntensityZone,
    pub pace: PaceRange,
    /// (low, high) percent of max heart rate
    pub hr_max_percent: (u8, u8),
}

/// Pace zones derived from a single goal pace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceZoneTable {
    pub goal_pace_sec_per_km: u32,
    pub zones: Vec<PaceZone>,
}

impl PaceZoneTable {
    /// Look up the targets for a zone
    pub fn zone(&self, zone: IntensityZone) -> Result<&PaceZone> {
        self.zones
            .iter()
            .find(|z| z.zone == zone)
            .ok_or_else(|| CoachError::Validation(format!("Pace zone {} missing from table", zone)))
    }
}

/// Heart rate band in beats per minute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartRateZone {
    pub zone: IntensityZone,
    pub min_bpm: u16,
    pub max_bpm: u16,
}

/// Zone calculation utilities
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Zone table as percentages of goal pace (slower = larger)
    ///
    /// - Z1 Recovery: 125-135% of goal pace, 60-70% HRmax
    /// - Z2 Endurance: 112-122%, 70-80% HRmax
    /// - Z3 Tempo: 104-108%, 80-87% HRmax
    /// - Z4 Threshold: 98-103%, 87-92% HRmax
    /// - Z5 VMA: 85-92%, 92-100% HRmax
    const ZONE_TABLE: [(IntensityZone, Decimal, Decimal, u8, u8); 5] = [
        (IntensityZone::Recovery, dec!(1.25), dec!(1.35), 60, 70),
        (IntensityZone::Endurance, dec!(1.12), dec!(1.22), 70, 80),
        (IntensityZone::Tempo, dec!(1.04), dec!(1.08), 80, 87),
        (IntensityZone::Threshold, dec!(0.98), dec!(1.03), 87, 92),
        (IntensityZone::Vma, dec!(0.85), dec!(0.92), 92, 100),
    ];

    /// Build the pace zone table for an athlete's goal pace
    pub fn pace_zones(profile: &AthleteProfile) -> Result<PaceZoneTable> {
        let goal = profile.goal_pace_sec_per_km()?;
        Self::pace_zones_for_goal(goal)
    }

    pub fn pace_zones_for_goal(goal_sec_per_km: Decimal) -> Result<PaceZoneTable> {
        if goal_sec_per_km <= Decimal::ZERO {
            return Err(CoachError::Validation(format!(
                "Goal pace must be positive, got {}",
                goal_sec_per_km
            )));
        }

        let mut zones = Vec::with_capacity(Self::ZONE_TABLE.len());
        for (zone, fast_pct, slow_pct, hr_low, hr_high) in Self::ZONE_TABLE {
            zones.push(PaceZone {
                zone,
                pace: PaceRange {
                    fast_sec_per_km: Self::whole_seconds(goal_sec_per_km * fast_pct)?,
                    slow_sec_per_km: Self::whole_seconds(goal_sec_per_km * slow_pct)?,
                },
                hr_max_percent: (hr_low, hr_high),
            });
        }

        Ok(PaceZoneTable {
            goal_pace_sec_per_km: Self::whole_seconds(goal_sec_per_km)?,
            zones,
        })
    }

    /// Heart rate zones in bpm
    ///
    /// Uses the Karvonen (heart-rate reserve) method when resting HR is
    /// known, otherwise straight percentages of max HR.
    pub fn heart_rate_zones(profile: &AthleteProfile, on: NaiveDate) -> Result<Vec<HeartRateZone>> {
        let max_hr = profile.max_heart_rate(on).ok_or_else(|| PlanError::MissingProfileData {
            field: "max_hr or date_of_birth".to_string(),
        })?;

        let bpm = |pct: u8| -> u16 {
            let pct = f64::from(pct) / 100.0;
            let value = match profile.resting_hr {
                Some(rest) if rest < max_hr => {
                    f64::from(rest) + f64::from(max_hr - rest) * pct
                }
                _ => f64::from(max_hr) * pct,
            };
            value.round() as u16
        };

        Ok(Self::ZONE_TABLE
            .iter()
            .map(|&(zone, _, _, low, high)| HeartRateZone {
                zone,
                min_bpm: bpm(low),
                max_bpm: bpm(high),
            })
            .collect())
    }

    fn whole_seconds(value: Decimal) -> Result<u32> {
        value
            .round()
            .to_u32()
            .ok_or_else(|| CoachError::Validation(format!("Pace {} out of range", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RaceDistance;

    #[test]
    fn test_pace_zones_scale_with_goal_pace() {
        let table = ZoneCalculator::pace_zones_for_goal(dec!(300)).unwrap();

        assert_eq!(table.goal_pace_sec_per_km, 300);
        let threshold = table.zone(IntensityZone::Threshold).unwrap();
        assert_eq!(threshold.pace.fast_sec_per_km, 294);
        assert_eq!(threshold.pace.slow_sec_per_km, 309);

        let recovery = table.zone(IntensityZone::Recovery).unwrap();
        assert_eq!(recovery.pace.fast_sec_per_km, 375);
        assert_eq!(recovery.hr_max_percent, (60, 70));
    }

    #[test]
    fn test_zones_get_slower_as_intensity_drops() {
        let table = ZoneCalculator::pace_zones_for_goal(dec!(280)).unwrap();
        let paces: Vec<u32> = IntensityZone::ALL
            .iter()
            .map(|z| table.zone(*z).unwrap().pace.fast_sec_per_km)
            .collect();

        for pair in paces.windows(2) {
            assert!(pair[0] > pair[1]);
        }
    }

    #[test]
    fn test_invalid_goal_pace() {
        assert!(ZoneCalculator::pace_zones_for_goal(dec!(0)).is_err());
    }

    #[test]
    fn test_karvonen_heart_rate_zones() {
        let mut athlete = AthleteProfile::new("HR", RaceDistance::TenK);
        athlete.set_heart_rate(Some(50), Some(190)).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let zones = ZoneCalculator::heart_rate_zones(&athlete, date).unwrap();
        assert_eq!(zones.len(), 5);
        // 50 + 140 * 0.60 = 134
        assert_eq!(zones[0].min_bpm, 134);
        assert_eq!(zones[4].max_bpm, 190);
    }

    #[test]
    fn test_max_hr_percentage_zones_without_resting_hr() {
        let mut athlete = AthleteProfile::new("HR", RaceDistance::TenK);
        athlete.set_heart_rate(None, Some(200)).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let zones = ZoneCalculator::heart_rate_zones(&athlete, date).unwrap();
        assert_eq!(zones[1].min_bpm, 140);
        assert_eq!(zones[1].max_bpm, 160);
    }

    #[test]
    fn test_heart_rate_zones_need_max_hr_or_age() {
        let athlete = AthleteProfile::new("HR", RaceDistance::TenK);
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(ZoneCalculator::heart_rate_zones(&athlete, date).is_err());
    }
}

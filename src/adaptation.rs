//! Session adaptation engine
//!
//! Turns the day's recovery score into an action on the next scheduled
//! session. The score picks a tier from a fixed range table; secondary
//! rules can then only make the decision more conservative:
//!
//! 1. an ACWR spike caps the action at `Lighten`
//! 2. a third consecutive high-intensity session turns `Maintain` into `Monitor`
//! 3. illness or pain reported by the athlete forces `Rest`
//!
//! Calendar conflicts never change the action; they only flag that the
//! session needs to move.
//!
//! The engine never mutates the session. Applying a recommendation is the
//! caller's job (see `TrainingPlan::apply_recommendation`).

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::calendar::{find_reschedule_date, CalendarContext, CalendarProvider};
use crate::error::{AdaptationError, RecoveryError, Result};
use crate::models::{SessionStatus, SessionType, TrainingSession};
use crate::recovery::{Baselines, DailyMetrics, RawMetrics, RecoveryCalculator};

/// Action on a session, ordered from most to least conservative
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptationAction {
    Rest,
    Replace,
    Lighten,
    Monitor,
    Maintain,
}

impl AdaptationAction {
    /// Session status after the action is applied
    pub fn resulting_status(&self) -> SessionStatus {
        match self {
            AdaptationAction::Maintain | AdaptationAction::Monitor => SessionStatus::Maintained,
            AdaptationAction::Lighten => SessionStatus::Lightened,
            AdaptationAction::Replace => SessionStatus::Replaced,
            AdaptationAction::Rest => SessionStatus::Skipped,
        }
    }
}

impl fmt::Display for AdaptationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdaptationAction::Rest => write!(f, "rest"),
            AdaptationAction::Replace => write!(f, "replace"),
            AdaptationAction::Lighten => write!(f, "lighten"),
            AdaptationAction::Monitor => write!(f, "monitor"),
            AdaptationAction::Maintain => write!(f, "maintain"),
        }
    }
}

/// Recovery tier derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecoveryTier {
    VeryLow,
    Low,
    Moderate,
    Good,
    Excellent,
}

/// Inclusive lower bound of each tier, highest first
const TIER_TABLE: [(u8, RecoveryTier); 5] = [
    (85, RecoveryTier::Excellent),
    (70, RecoveryTier::Good),
    (55, RecoveryTier::Moderate),
    (40, RecoveryTier::Low),
    (0, RecoveryTier::VeryLow),
];

impl RecoveryTier {
    pub fn from_score(score: u32) -> std::result::Result<Self, AdaptationError> {
        if score > 100 {
            return Err(AdaptationError::InvalidScore { score });
        }
        Ok(TIER_TABLE
            .iter()
            .find(|(lower, _)| score >= u32::from(*lower))
            .map(|(_, tier)| *tier)
            .unwrap_or(RecoveryTier::VeryLow))
    }

    pub fn action(&self) -> AdaptationAction {
        match self {
            RecoveryTier::Excellent => AdaptationAction::Maintain,
            RecoveryTier::Good => AdaptationAction::Monitor,
            RecoveryTier::Moderate => AdaptationAction::Lighten,
            RecoveryTier::Low => AdaptationAction::Replace,
            RecoveryTier::VeryLow => AdaptationAction::Rest,
        }
    }

    pub fn rationale(&self) -> &'static str {
        match self {
            RecoveryTier::Excellent => "Recovery excellent — proceed as planned.",
            RecoveryTier::Good => "Recovery good — maintain, watch trend.",
            RecoveryTier::Moderate => "Recovery moderate — reduce volume/intensity 20–30%.",
            RecoveryTier::Low => "Recovery low — substitute easy endurance for planned intensity.",
            RecoveryTier::VeryLow => "Recovery very low — full rest recommended.",
        }
    }
}

impl fmt::Display for RecoveryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryTier::Excellent => write!(f, "Excellent"),
            RecoveryTier::Good => write!(f, "Good"),
            RecoveryTier::Moderate => write!(f, "Moderate"),
            RecoveryTier::Low => write!(f, "Low"),
            RecoveryTier::VeryLow => write!(f, "Very low"),
        }
    }
}

/// Adaptation engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationConfig {
    /// ACWR above this caps the action at lighten
    pub acwr_spike_threshold: f64,

    /// Volume kept when a session is lightened
    pub lighten_factor: Decimal,

    /// Longest easy run substituted for a replaced session, in minutes
    pub replace_max_minutes: u32,

    /// Share of the planned duration kept by a replacement run
    pub replace_duration_factor: Decimal,

    /// Force rest when the athlete reports illness or pain
    pub honour_feedback_rest: bool,

    /// Days searched forward for a reschedule slot
    pub reschedule_search_days: u32,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            acwr_spike_threshold: 1.5,
            lighten_factor: dec!(0.75),
            replace_max_minutes: 40,
            replace_duration_factor: dec!(0.6),
            honour_feedback_rest: true,
            reschedule_search_days: 3,
        }
    }
}

impl AdaptationConfig {
    /// Minutes the session will take once the action is applied
    pub fn adapted_duration(&self, planned_minutes: u32, action: AdaptationAction) -> u32 {
        let scaled = |factor: Decimal| {
            (Decimal::from(planned_minutes) * factor)
                .round()
                .to_u32()
                .unwrap_or(planned_minutes)
        };
        match action {
            AdaptationAction::Maintain | AdaptationAction::Monitor => planned_minutes,
            AdaptationAction::Lighten => scaled(self.lighten_factor),
            AdaptationAction::Replace => scaled(self.replace_duration_factor).min(self.replace_max_minutes),
            AdaptationAction::Rest => 0,
        }
    }
}

/// Optional context around the session being adapted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptationContext {
    /// Free/busy for the session's scheduled day
    pub calendar: Option<CalendarContext>,
    /// Types of the preceding scheduled sessions, oldest first
    pub preceding_sessions: Vec<SessionType>,
}

impl AdaptationContext {
    pub fn with_calendar(mut self, calendar: CalendarContext) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_preceding(mut self, preceding: Vec<SessionType>) -> Self {
        self.preceding_sessions = preceding;
        self
    }

    fn last_two_high_intensity(&self) -> bool {
        let recent: Vec<_> = self.preceding_sessions.iter().rev().take(2).collect();
        recent.len() == 2 && recent.iter().all(|t| t.is_high_intensity())
    }
}

/// Engine output; never persisted by the core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationRecommendation {
    pub session_id: String,
    pub action: AdaptationAction,
    pub tier: RecoveryTier,
    pub recovery_score: u8,
    pub reason: String,
    /// One entry per secondary rule that fired
    pub notes: Vec<String>,
    pub reschedule_needed: bool,
    /// Share of recovery inputs that were available
    pub confidence: f64,
}

impl AdaptationRecommendation {
    /// Reason followed by any notes, for display
    pub fn summary(&self) -> String {
        if self.notes.is_empty() {
            self.reason.clone()
        } else {
            format!("{} {}", self.reason, self.notes.join(" "))
        }
    }
}

/// Rule-based session adapter
#[derive(Debug, Clone, Default)]
pub struct SessionAdapter {
    config: AdaptationConfig,
    calculator: RecoveryCalculator,
}

impl SessionAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AdaptationConfig, calculator: RecoveryCalculator) -> Self {
        Self { config, calculator }
    }

    pub fn config(&self) -> &AdaptationConfig {
        &self.config
    }

    /// Recommend an action for `session` given the day's metrics
    pub fn adapt(
        &self,
        session: &TrainingSession,
        metrics: &DailyMetrics,
        acwr: Option<f64>,
        context: &AdaptationContext,
    ) -> Result<AdaptationRecommendation> {
        let readapting = Self::check_adaptable(session)?;
        self.recommend(session, metrics, acwr, context, readapting)
    }

    fn recommend(
        &self,
        session: &TrainingSession,
        metrics: &DailyMetrics,
        acwr: Option<f64>,
        context: &AdaptationContext,
        readapting: bool,
    ) -> Result<AdaptationRecommendation> {
        let score = metrics
            .recovery_score()
            .ok_or_else(|| RecoveryError::DataUnavailable {
                reason: format!("no recovery score for {}", metrics.date()),
            })?;
        let tier = RecoveryTier::from_score(u32::from(score))?;

        let mut action = tier.action();
        let mut notes = Vec::new();
        if readapting {
            notes.push(format!(
                "Session was already {}: this replaces the earlier adjustment.",
                session.status
            ));
        }

        if let Some(ratio) = acwr {
            if ratio > self.config.acwr_spike_threshold {
                let capped = action.min(AdaptationAction::Lighten);
                if capped != action {
                    notes.push(format!(
                        "Training load spike (ACWR {:.2}): session lightened.",
                        ratio
                    ));
                    action = capped;
                }
            }
        }

        if session.is_high_intensity()
            && context.last_two_high_intensity()
            && action == AdaptationAction::Maintain
        {
            action = AdaptationAction::Monitor;
            notes.push("Third hard session in a row: monitor effort closely.".to_string());
        }

        if self.config.honour_feedback_rest
            && metrics.subjective().map_or(false, |s| s.forces_rest())
            && action != AdaptationAction::Rest
        {
            action = AdaptationAction::Rest;
            notes.push("Illness or pain reported: rest today.".to_string());
        }

        let reschedule_needed = self.needs_reschedule(session, action, context.calendar.as_ref());
        if reschedule_needed {
            notes.push(format!(
                "No free slot on {} for this session: reschedule needed.",
                session.date
            ));
        }

        info!(
            session = %session.id,
            score,
            tier = %tier,
            ?acwr,
            action = %action,
            reschedule_needed,
            "Session adapted"
        );

        Ok(AdaptationRecommendation {
            session_id: session.id.clone(),
            action,
            tier,
            recovery_score: score,
            reason: tier.rationale().to_string(),
            notes,
            reschedule_needed,
            confidence: metrics.completeness(),
        })
    }

    /// Score raw metrics and adapt in one call
    ///
    /// The session is checked before any scoring happens.
    pub fn adapt_raw(
        &self,
        session: &TrainingSession,
        raw: RawMetrics,
        baselines: &Baselines,
        context: &AdaptationContext,
    ) -> Result<AdaptationRecommendation> {
        let readapting = Self::check_adaptable(session)?;

        let acwr = raw.acwr;
        let metrics = self.calculator.score_metrics(raw, baselines);
        self.recommend(session, &metrics, acwr, context, readapting)
    }

    /// Next date within the search window with room for the adapted session
    ///
    /// Only meaningful when the recommendation flagged a reschedule.
    pub fn suggest_reschedule<P: CalendarProvider + ?Sized>(
        &self,
        recommendation: &AdaptationRecommendation,
        session: &TrainingSession,
        provider: &P,
    ) -> Option<NaiveDate> {
        if !recommendation.reschedule_needed {
            return None;
        }
        let minutes = self
            .config
            .adapted_duration(session.target_duration_minutes, recommendation.action);
        find_reschedule_date(provider, session.date, minutes, self.config.reschedule_search_days)
    }

    /// True when the session already carries an earlier adaptation
    fn check_adaptable(session: &TrainingSession) -> Result<bool> {
        if !session.status.is_adaptable() {
            return Err(AdaptationError::NotPlanned {
                session_id: session.id.clone(),
                status: session.status,
            }
            .into());
        }
        let readapting = session.status != SessionStatus::Planned;
        if readapting {
            warn!(
                session = %session.id,
                status = %session.status,
                "Adapting a session that was already adapted"
            );
        }
        Ok(readapting)
    }

    fn needs_reschedule(
        &self,
        session: &TrainingSession,
        action: AdaptationAction,
        calendar: Option<&CalendarContext>,
    ) -> bool {
        let Some(calendar) = calendar else {
            return false;
        };
        if action == AdaptationAction::Rest {
            return false;
        }
        if calendar.date != session.date {
            debug!(
                session = %session.id,
                calendar_date = %calendar.date,
                "Calendar context is for another day; ignored"
            );
            return false;
        }
        let minutes = self
            .config
            .adapted_duration(session.target_duration_minutes, action);
        !calendar.has_slot_for(minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::TimeSlot;
    use crate::error::CoachError;
    use crate::models::{IntensityZone, PaceRange};
    use crate::recovery::{FeedbackTag, SubjectiveReport};
    use chrono::{NaiveDate, NaiveTime, Weekday};
    use proptest::prelude::*;

    fn session_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 10).unwrap()
    }

    fn create_session(session_type: SessionType) -> TrainingSession {
        TrainingSession {
            id: "W3_S2".to_string(),
            week_index: 3,
            date: session_date(),
            weekday: Weekday::Tue,
            session_type,
            zone: session_type.default_zone(),
            title: session_type.to_string(),
            target_distance_km: dec!(10),
            target_duration_minutes: 60,
            pace: PaceRange {
                fast_sec_per_km: 290,
                slow_sec_per_km: 305,
            },
            hr_max_percent: (87, 92),
            status: SessionStatus::Planned,
            key_session: true,
            actual_load: None,
            adaptation_note: None,
        }
    }

    fn metrics(score: u8) -> DailyMetrics {
        DailyMetrics::with_score(session_date(), score)
    }

    fn adapt(score: u8, acwr: Option<f64>) -> AdaptationRecommendation {
        SessionAdapter::new()
            .adapt(
                &create_session(SessionType::EasyEndurance),
                &metrics(score),
                acwr,
                &AdaptationContext::default(),
            )
            .unwrap()
    }

    #[test]
    fn test_tier_boundaries() {
        let cases = [
            (100, RecoveryTier::Excellent),
            (85, RecoveryTier::Excellent),
            (84, RecoveryTier::Good),
            (70, RecoveryTier::Good),
            (69, RecoveryTier::Moderate),
            (55, RecoveryTier::Moderate),
            (54, RecoveryTier::Low),
            (40, RecoveryTier::Low),
            (39, RecoveryTier::VeryLow),
            (0, RecoveryTier::VeryLow),
        ];
        for (score, tier) in cases {
            assert_eq!(RecoveryTier::from_score(score).unwrap(), tier, "score {}", score);
        }
    }

    #[test]
    fn test_score_above_100_is_invalid() {
        assert!(matches!(
            RecoveryTier::from_score(101),
            Err(AdaptationError::InvalidScore { score: 101 })
        ));

        let result = SessionAdapter::new().adapt(
            &create_session(SessionType::Threshold),
            &metrics(150),
            None,
            &AdaptationContext::default(),
        );
        assert!(matches!(
            result,
            Err(CoachError::Adaptation(AdaptationError::InvalidScore { score: 150 }))
        ));
    }

    #[test]
    fn test_action_ordering() {
        assert!(AdaptationAction::Rest < AdaptationAction::Replace);
        assert!(AdaptationAction::Replace < AdaptationAction::Lighten);
        assert!(AdaptationAction::Lighten < AdaptationAction::Monitor);
        assert!(AdaptationAction::Monitor < AdaptationAction::Maintain);
    }

    #[test]
    fn test_primary_actions_and_rationale() {
        let rec = adapt(70, Some(1.2));
        assert_eq!(rec.action, AdaptationAction::Monitor);
        assert_eq!(rec.reason, "Recovery good — maintain, watch trend.");
        assert!(rec.notes.is_empty());

        let rec = adapt(30, Some(1.0));
        assert_eq!(rec.action, AdaptationAction::Rest);
        assert_eq!(rec.reason, "Recovery very low — full rest recommended.");
    }

    #[test]
    fn test_acwr_spike_caps_at_lighten() {
        let rec = adapt(72, Some(1.8));
        assert_eq!(rec.action, AdaptationAction::Lighten);
        assert_eq!(rec.tier, RecoveryTier::Good);
        assert_eq!(rec.notes.len(), 1);

        // exactly at the threshold is not a spike
        assert_eq!(adapt(90, Some(1.5)).action, AdaptationAction::Maintain);

        // a lower decision is left alone
        let rec = adapt(45, Some(2.2));
        assert_eq!(rec.action, AdaptationAction::Replace);
        assert!(rec.notes.is_empty());
    }

    #[test]
    fn test_absent_acwr_ignores_load_signal() {
        assert_eq!(adapt(95, None).action, AdaptationAction::Maintain);
    }

    #[test]
    fn test_sequencing_guard() {
        let adapter = SessionAdapter::new();
        let context = AdaptationContext::default()
            .with_preceding(vec![SessionType::VmaInterval, SessionType::Threshold]);

        let rec = adapter
            .adapt(&create_session(SessionType::Threshold), &metrics(90), None, &context)
            .unwrap();
        assert_eq!(rec.action, AdaptationAction::Monitor);

        // easy session after two hard ones is fine
        let rec = adapter
            .adapt(&create_session(SessionType::EasyEndurance), &metrics(90), None, &context)
            .unwrap();
        assert_eq!(rec.action, AdaptationAction::Maintain);

        // only one of the last two was hard
        let context = AdaptationContext::default().with_preceding(vec![
            SessionType::VmaInterval,
            SessionType::Threshold,
            SessionType::LongRun,
        ]);
        let rec = adapter
            .adapt(&create_session(SessionType::VmaInterval), &metrics(90), None, &context)
            .unwrap();
        assert_eq!(rec.action, AdaptationAction::Maintain);
    }

    #[test]
    fn test_feedback_forces_rest() {
        let report = SubjectiveReport::new(Some(4), vec![FeedbackTag::Sick]).unwrap();
        let metrics = metrics(88).with_subjective(report);

        let rec = SessionAdapter::new()
            .adapt(
                &create_session(SessionType::LongRun),
                &metrics,
                None,
                &AdaptationContext::default(),
            )
            .unwrap();
        assert_eq!(rec.action, AdaptationAction::Rest);
        assert_eq!(rec.tier, RecoveryTier::Excellent);
    }

    #[test]
    fn test_calendar_conflict_flags_reschedule() {
        let slot = TimeSlot::new(
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(7, 50, 0).unwrap(),
        )
        .unwrap();
        let context = AdaptationContext::default()
            .with_calendar(CalendarContext::new(session_date(), vec![slot]));
        let adapter = SessionAdapter::new();

        // 60 planned minutes do not fit in 50
        let rec = adapter
            .adapt(&create_session(SessionType::EasyEndurance), &metrics(90), None, &context)
            .unwrap();
        assert_eq!(rec.action, AdaptationAction::Maintain);
        assert!(rec.reschedule_needed);

        // lightened to 45 minutes it fits
        let rec = adapter
            .adapt(&create_session(SessionType::EasyEndurance), &metrics(60), None, &context)
            .unwrap();
        assert_eq!(rec.action, AdaptationAction::Lighten);
        assert!(!rec.reschedule_needed);

        let mut calendar = crate::calendar::StaticCalendar::new();
        calendar.add_slot(session_date() + chrono::Duration::days(2), slot);
        calendar.add_slot(
            session_date() + chrono::Duration::days(3),
            TimeSlot::new(NaiveTime::from_hms_opt(6, 0, 0).unwrap(), NaiveTime::from_hms_opt(8, 0, 0).unwrap()).unwrap(),
        );
        let session = create_session(SessionType::EasyEndurance);
        let flagged = adapter.adapt(&session, &metrics(90), None, &context).unwrap();
        assert_eq!(
            adapter.suggest_reschedule(&flagged, &session, &calendar),
            Some(session_date() + chrono::Duration::days(3))
        );
        assert_eq!(adapter.suggest_reschedule(&rec, &session, &calendar), None);

        // rest needs no slot
        let context = AdaptationContext::default()
            .with_calendar(CalendarContext::new(session_date(), vec![]));
        let rec = adapter
            .adapt(&create_session(SessionType::EasyEndurance), &metrics(20), None, &context)
            .unwrap();
        assert!(!rec.reschedule_needed);
    }

    #[test]
    fn test_not_planned_sessions_rejected() {
        let mut session = create_session(SessionType::Threshold);
        session.status = SessionStatus::Completed;

        let result = SessionAdapter::new().adapt(
            &session,
            &metrics(90),
            None,
            &AdaptationContext::default(),
        );
        assert!(matches!(
            result,
            Err(CoachError::Adaptation(AdaptationError::NotPlanned { .. }))
        ));

        // already-adapted sessions may be adapted again
        session.status = SessionStatus::Lightened;
        assert!(SessionAdapter::new()
            .adapt(&session, &metrics(90), None, &AdaptationContext::default())
            .is_ok());
    }

    #[test]
    fn test_missing_score_is_data_unavailable() {
        let calculator = RecoveryCalculator::new();
        let empty = calculator.score_metrics(RawMetrics::empty(session_date()), &Baselines::default());

        let result = SessionAdapter::new().adapt(
            &create_session(SessionType::Threshold),
            &empty,
            None,
            &AdaptationContext::default(),
        );
        assert!(matches!(
            result,
            Err(CoachError::Recovery(RecoveryError::DataUnavailable { .. }))
        ));
    }

    #[test]
    fn test_adapt_raw_one_shot() {
        let mut raw = RawMetrics::empty(session_date());
        raw.sleep = Some(crate::recovery::SleepData::new(5.0, crate::recovery::SleepQuality::Poor, None).unwrap());
        raw.acwr = Some(1.9);

        let rec = SessionAdapter::new()
            .adapt_raw(
                &create_session(SessionType::VmaInterval),
                raw,
                &Baselines::default(),
                &AdaptationContext::default(),
            )
            .unwrap();
        // sleep 0.7*62.5 + 0.3*40 = 55.75, load (2.0-1.9)/0.7*100 = 14.3
        // (0.35*55.75 + 0.20*14.29) / 0.55 = 40.68
        assert_eq!(rec.recovery_score, 41);
        assert_eq!(rec.action, AdaptationAction::Replace);
        assert!((rec.confidence - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_adapt_raw_checks_session_once() {
        let mut session = create_session(SessionType::Threshold);
        session.status = SessionStatus::Lightened;
        let mut raw = RawMetrics::empty(session_date());
        raw.acwr = Some(1.0);

        let rec = SessionAdapter::new()
            .adapt_raw(&session, raw.clone(), &Baselines::default(), &AdaptationContext::default())
            .unwrap();
        let readapt_notes = rec.notes.iter().filter(|n| n.contains("already lightened")).count();
        assert_eq!(readapt_notes, 1);

        session.status = SessionStatus::Skipped;
        let result = SessionAdapter::new().adapt_raw(
            &session,
            raw,
            &Baselines::default(),
            &AdaptationContext::default(),
        );
        assert!(matches!(
            result,
            Err(CoachError::Adaptation(AdaptationError::NotPlanned { .. }))
        ));
    }

    #[test]
    fn test_adapted_duration() {
        let config = AdaptationConfig::default();
        assert_eq!(config.adapted_duration(60, AdaptationAction::Maintain), 60);
        assert_eq!(config.adapted_duration(60, AdaptationAction::Lighten), 45);
        assert_eq!(config.adapted_duration(60, AdaptationAction::Replace), 36);
        assert_eq!(config.adapted_duration(100, AdaptationAction::Replace), 40);
        assert_eq!(config.adapted_duration(60, AdaptationAction::Rest), 0);
    }

    #[test]
    fn test_zone_of_test_session() {
        assert_eq!(create_session(SessionType::VmaInterval).zone, IntensityZone::Vma);
    }

    proptest! {
        #[test]
        fn test_acwr_spike_never_above_lighten(score in 70u8..=100, acwr in 1.5001f64..5.0) {
            let rec = adapt(score, Some(acwr));
            prop_assert!(rec.action <= AdaptationAction::Lighten);
        }

        #[test]
        fn test_adapt_is_idempotent(score in 0u8..=100, acwr in prop::option::of(0.0f64..3.0)) {
            let adapter = SessionAdapter::new();
            let session = create_session(SessionType::Threshold);
            let context = AdaptationContext::default()
                .with_preceding(vec![SessionType::VmaInterval, SessionType::Threshold]);

            let first = adapter.adapt(&session, &metrics(score), acwr, &context).unwrap();
            let second = adapter.adapt(&session, &metrics(score), acwr, &context).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn test_modulation_never_upgrades(
            score in 0u8..=100,
            acwr in prop::option::of(0.0f64..3.0),
            hard_streak in any::<bool>(),
        ) {
            let preceding = if hard_streak {
                vec![SessionType::VmaInterval, SessionType::Threshold]
            } else {
                vec![SessionType::EasyEndurance]
            };
            let context = AdaptationContext::default().with_preceding(preceding);
            let rec = SessionAdapter::new()
                .adapt(&create_session(SessionType::Threshold), &metrics(score), acwr, &context)
                .unwrap();
            let primary = RecoveryTier::from_score(u32::from(score)).unwrap().action();
            prop_assert!(rec.action <= primary);
        }
    }
}

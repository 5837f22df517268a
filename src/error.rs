//! Unified error hierarchy for coachrs
//!
//! Every failure the core can report is a local precondition violation
//! detected before any state changes. The top-level [`CoachError`] groups
//! them by component so callers can match on the area that failed.

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::SessionStatus;

/// Top-level error type for all coachrs operations
#[derive(Debug, Error)]
pub enum CoachError {
    /// Recovery scoring errors
    #[error("Recovery error: {0}")]
    Recovery(#[from] RecoveryError),

    /// Session adaptation errors
    #[error("Adaptation error: {0}")]
    Adaptation(#[from] AdaptationError),

    /// Plan generation and plan mutation errors
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Recovery score and metrics history errors
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Every recovery input was missing
    #[error("No recovery data available: {reason}")]
    DataUnavailable { reason: String },

    /// A second metrics record for a date already in the history
    #[error("Metrics already recorded for {date}")]
    DuplicateEntry { date: NaiveDate },

    /// Scoring weights are negative or do not sum to one
    #[error("Invalid recovery weights: {reason}")]
    InvalidWeights { reason: String },
}

/// Session adaptation errors
#[derive(Debug, Error)]
pub enum AdaptationError {
    /// Recovery score outside 0..=100
    #[error("Recovery score {score} is outside 0-100")]
    InvalidScore { score: u32 },

    /// Session is completed or skipped and cannot be adapted
    #[error("Session {session_id} is {status} and cannot be adapted")]
    NotPlanned {
        session_id: String,
        status: SessionStatus,
    },

    /// No session with the given id in the plan
    #[error("Session not found: {session_id}")]
    SessionNotFound { session_id: String },

    /// Mutation attempted on a plan whose race date has passed
    #[error("Plan for race on {race_date} is archived")]
    PlanArchived { race_date: NaiveDate },
}

/// Plan generation errors
#[derive(Debug, Error)]
pub enum PlanError {
    /// Race date not after start date, or too few weeks to periodize
    #[error("Invalid date range {start} -> {race}: {reason}")]
    InvalidDateRange {
        start: NaiveDate,
        race: NaiveDate,
        reason: String,
    },

    /// More sessions requested than preferred weekdays supplied
    #[error("{requested} sessions per week requested but only {available} preferred weekdays given")]
    InsufficientScheduleSlots { requested: u8, available: usize },

    /// Athlete profile lacks a field needed for pacing
    #[error("Missing athlete profile data: {field}")]
    MissingProfileData { field: String },
}

/// Result type alias for coachrs operations
pub type Result<T> = std::result::Result<T, CoachError>;

impl CoachError {
    /// Precondition failures are caller mistakes rather than system faults
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            CoachError::Adaptation(_)
                | CoachError::Plan(_)
                | CoachError::Validation(_)
                | CoachError::Recovery(RecoveryError::DuplicateEntry { .. })
        )
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoachError::Recovery(RecoveryError::DataUnavailable { .. }) => ErrorSeverity::Warning,
            CoachError::Recovery(RecoveryError::DuplicateEntry { .. }) => ErrorSeverity::Warning,
            CoachError::Adaptation(AdaptationError::NotPlanned { .. }) => ErrorSeverity::Info,
            CoachError::Adaptation(AdaptationError::PlanArchived { .. }) => ErrorSeverity::Info,
            CoachError::Validation(_) => ErrorSeverity::Warning,
            CoachError::Plan(_) => ErrorSeverity::Warning,
            CoachError::Configuration(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            CoachError::Recovery(RecoveryError::DataUnavailable { .. }) => {
                "No recovery data for today. Sync your wearable or log how you feel.".to_string()
            }
            CoachError::Plan(PlanError::InvalidDateRange { reason, .. }) => {
                format!("Cannot build a plan for these dates: {}", reason)
            }
            CoachError::Plan(PlanError::InsufficientScheduleSlots {
                requested,
                available,
            }) => {
                format!(
                    "Pick at least {} training days (currently {}).",
                    requested, available
                )
            }
            CoachError::Adaptation(AdaptationError::NotPlanned { session_id, status }) => {
                format!("Session {} is already {}.", session_id, status)
            }
            CoachError::Adaptation(AdaptationError::PlanArchived { race_date }) => {
                format!("The race on {} is over; this plan is read-only.", race_date)
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
    /// Informational message
    Info,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
            ErrorSeverity::Info => tracing::Level::INFO,
        }
    }
}

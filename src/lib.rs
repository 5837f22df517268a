// Library interface for coachrs modules
// This allows integration tests and the CLI to share the core

pub mod adaptation;
pub mod calendar;
pub mod config;
pub mod error;
pub mod export;
pub mod history;
pub mod load;
pub mod logging;
pub mod models;
pub mod recovery;
pub mod training_plan;
pub mod zones;

// Re-export commonly used types for convenience
pub use models::*;
pub use adaptation::{
    AdaptationAction, AdaptationConfig, AdaptationContext, AdaptationRecommendation,
    RecoveryTier, SessionAdapter,
};
pub use calendar::{CalendarContext, CalendarProvider, StaticCalendar, TimeSlot};
pub use config::CoachConfig;
pub use error::{CoachError, Result};
pub use history::{BaselineWindow, MetricsHistory};
pub use load::{ActivitySummary, LoadStatus, TrainingLoadTracker};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use recovery::{
    Baselines, DailyMetrics, FeedbackTag, RawMetrics, RecentActivity, RecoveryCalculator, SleepData,
    SleepQuality, SubjectiveReport,
};
pub use training_plan::{NextSession, Phase, PlanGenerator, PlanGeneratorConfig, TrainingPlan};
pub use zones::ZoneCalculator;

//! Plan and load-history export
//!
//! CSV for spreadsheets, JSON for round-tripping plans and metrics through the
//! CLI.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{CoachError, Result};
use crate::training_plan::TrainingPlan;

pub mod csv;
pub mod json;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = CoachError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(CoachError::Validation(format!("Unsupported export format: {}", s))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Csv => write!(f, "csv"),
            ExportFormat::Json => write!(f, "json"),
        }
    }
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }
}

/// Write a plan in the given format
pub fn export_plan<P: AsRef<Path>>(plan: &TrainingPlan, format: ExportFormat, output_path: P) -> Result<()> {
    match format {
        ExportFormat::Csv => csv::export_plan_sessions(plan, output_path),
        ExportFormat::Json => json::export_json(plan, output_path),
    }
}

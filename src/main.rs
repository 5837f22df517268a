use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate, Weekday};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use coachrs::adaptation::{AdaptationAction, AdaptationRecommendation};
use coachrs::export::{self, csv::export_load_history, csv::import_load_history, json, ExportFormat};
use coachrs::logging::init_logging;
use coachrs::recovery::RecoveryInputs;
use coachrs::{
    ActivitySummary, AthleteProfile, Baselines, CoachConfig, MetricsHistory, NextSession,
    RaceDistance, RawMetrics, TrainingLoadTracker, TrainingPlan,
};

/// coachrs - adaptive endurance training coach
///
/// Scores daily recovery from wearable data, tracks training load and adapts
/// the next session of a periodized running plan.
#[derive(Parser)]
#[command(name = "coachrs")]
#[command(version)]
#[command(about = "Adaptive endurance training coach", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an athlete profile
    Profile {
        /// Athlete name
        #[arg(short, long)]
        name: String,

        /// Race distance (5k, 10k, half, marathon)
        #[arg(short, long)]
        distance: RaceDistance,

        /// Target race time in minutes
        #[arg(short, long)]
        target: Option<u32>,

        /// VMA in km/h
        #[arg(long)]
        vma: Option<Decimal>,

        /// Resting heart rate
        #[arg(long)]
        resting_hr: Option<u16>,

        /// Maximum heart rate
        #[arg(long)]
        max_hr: Option<u16>,

        /// Output JSON file
        #[arg(short, long, default_value = "profile.json")]
        output: PathBuf,
    },

    /// Generate, show or export a training plan
    Plan {
        #[command(subcommand)]
        action: PlanCommands,
    },

    /// Compute the recovery score for a day of raw metrics
    Score {
        /// Raw metrics JSON file
        #[arg(short, long)]
        metrics: PathBuf,

        /// Athlete profile JSON (resting HR baseline fallback)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Metrics history JSON used for baselines
        #[arg(long)]
        history: Option<PathBuf>,

        /// Append the scored day to the history file
        #[arg(long, requires = "history")]
        append: bool,
    },

    /// Recommend an adaptation for the next planned session
    Adapt {
        /// Plan JSON file
        #[arg(long)]
        plan: PathBuf,

        /// Raw metrics JSON file for today
        #[arg(short, long)]
        metrics: PathBuf,

        /// Daily load history CSV (date,load)
        #[arg(short, long)]
        loads: Option<PathBuf>,

        /// Metrics history JSON used for baselines
        #[arg(long)]
        history: Option<PathBuf>,

        /// Athlete profile JSON (resting HR baseline fallback)
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Session to adapt (defaults to the next planned one)
        #[arg(short, long)]
        session: Option<String>,

        /// Apply the recommendation and save the plan
        #[arg(long)]
        apply: bool,
    },

    /// Log a completed session and update the load history
    Complete {
        /// Plan JSON file
        #[arg(long)]
        plan: PathBuf,

        /// Daily load history CSV (date,load); created if missing
        #[arg(short, long)]
        loads: PathBuf,

        /// Session to complete (defaults to the next planned one)
        #[arg(short, long)]
        session: Option<String>,

        /// Day the session was run (YYYY-MM-DD, default today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Activity duration in minutes (defaults to the session target)
        #[arg(short, long)]
        duration: Option<u32>,

        /// Average heart rate
        #[arg(long)]
        avg_hr: Option<u16>,

        /// Average pace in seconds per km
        #[arg(long)]
        pace: Option<u32>,

        /// Athlete profile JSON (max HR for intensity)
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum PlanCommands {
    /// Generate a plan up to race day
    Generate {
        /// Athlete profile JSON
        #[arg(short, long)]
        profile: PathBuf,

        /// First day of the plan (YYYY-MM-DD, default today)
        #[arg(short, long)]
        start: Option<NaiveDate>,

        /// Race day (YYYY-MM-DD)
        #[arg(short, long)]
        race: NaiveDate,

        /// Sessions per week
        #[arg(short = 'n', long, default_value = "4")]
        sessions: u8,

        /// Preferred training days in priority order (e.g. tue,thu,sat,sun)
        #[arg(short, long, value_delimiter = ',', required = true)]
        days: Vec<Weekday>,

        /// Output JSON file
        #[arg(short, long, default_value = "plan.json")]
        output: PathBuf,
    },

    /// Display a plan as a table
    Show {
        /// Plan JSON file
        #[arg(long)]
        plan: PathBuf,

        /// Only this week
        #[arg(short, long)]
        week: Option<u32>,
    },

    /// Export a plan to CSV or JSON
    Export {
        /// Plan JSON file
        #[arg(long)]
        plan: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (csv, json); guessed from the extension if omitted
        #[arg(short = 'f', long)]
        format: Option<ExportFormat>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the active configuration
    Show,
}

#[derive(Tabled)]
struct SessionRow {
    #[tabled(rename = "Week")]
    week: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Session")]
    title: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Distance")]
    distance: String,
    #[tabled(rename = "Duration")]
    duration: String,
    #[tabled(rename = "Pace")]
    pace: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => CoachConfig::load_from_file(path)?,
        None => CoachConfig::load_or_default(),
    };
    init_logging(&config.logging.clone().with_verbosity(cli.verbose))?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {:?}", config.logging.clone().with_verbosity(cli.verbose).level).dimmed());
    }

    match cli.command {
        Commands::Profile {
            name,
            distance,
            target,
            vma,
            resting_hr,
            max_hr,
            output,
        } => {
            let mut athlete = AthleteProfile::new(name, distance);
            athlete.set_target(distance, target)?;
            if let Some(vma) = vma {
                athlete.set_vma(vma)?;
            }
            athlete.set_heart_rate(resting_hr, max_hr)?;
            json::export_json(&athlete, &output)?;
            println!("{}", format!("✓ Profile {} saved to {}", athlete.id, output.display()).green());
        }

        Commands::Plan { action } => run_plan(action, &config)?,

        Commands::Score {
            metrics,
            profile,
            history,
            append,
        } => {
            let raw: RawMetrics = load_json(&metrics)?;
            let mut metrics_history = load_history(history.as_deref())?;
            let baselines = baselines_for(&raw, &metrics_history, profile.as_deref(), &config)?;

            let calculator = config.recovery_calculator()?;
            let inputs = RecoveryInputs::from_raw(&raw, &baselines);
            let carried = metrics_history.feedback_carryover(raw.date);
            for (date, report) in metrics_history.recent_feedback(raw.date) {
                if !report.tags.is_empty() {
                    println!("{}", format!("  Feedback from {}: {:?}", date, report.tags).dimmed());
                }
            }
            let scored = calculator.score_metrics_with(raw, &baselines, carried);

            println!("{}", format!("Recovery for {}", scored.date()).cyan().bold());
            print_subscore("Sleep", inputs.sleep);
            print_subscore("HRV", inputs.hrv);
            print_subscore("Load", inputs.load);
            print_subscore("Resting HR", inputs.resting_hr);
            print_subscore("Feeling", inputs.feeling);
            if scored.adjustment() != 0.0 {
                println!("  {:<11} {:>+5.1}", "Adjustment", scored.adjustment());
            }
            match scored.recovery_score() {
                Some(score) => println!(
                    "  Score: {} ({:.0}% of inputs)",
                    colour_score(score),
                    scored.completeness() * 100.0
                ),
                None => println!("  Score: {}", "unavailable (no inputs)".red()),
            }

            if append {
                if let Some(path) = history {
                    metrics_history.append(scored)?;
                    json::export_json(&metrics_history, &path)?;
                    println!("{}", format!("✓ History updated ({} days)", metrics_history.len()).green());
                }
            }
        }

        Commands::Adapt {
            plan,
            metrics,
            loads,
            history,
            profile,
            session,
            apply,
        } => {
            let mut training_plan: TrainingPlan = load_json(&plan)?;
            let mut raw: RawMetrics = load_json(&metrics)?;
            let today = raw.date;

            if raw.acwr.is_none() {
                if let Some(path) = loads {
                    let tracker: TrainingLoadTracker = import_load_history(&path)
                        .with_context(|| format!("Failed to read load history: {}", path.display()))?;
                    raw.acwr = tracker.summary(today).acwr;
                }
            }
            let acwr = raw.acwr;

            let session_id = match session {
                Some(id) => id,
                None => match training_plan.next_scheduled_session(today) {
                    NextSession::Scheduled(s) => s.id.clone(),
                    NextSession::OutOfSessions => {
                        println!("{}", "No planned sessions left in this plan".yellow());
                        return Ok(());
                    }
                },
            };
            let Some(target) = training_plan.session(&session_id).cloned() else {
                bail!("Session {} not found in {}", session_id, plan.display());
            };

            let metrics_history = load_history(history.as_deref())?;
            let baselines = baselines_for(&raw, &metrics_history, profile.as_deref(), &config)?;
            let context = training_plan.adaptation_context(&session_id, None)?;
            let adapter = config.session_adapter()?;
            let carried = metrics_history.feedback_carryover(today);
            let scored = config
                .recovery_calculator()?
                .score_metrics_with(raw, &baselines, carried);
            let recommendation = adapter.adapt(&target, &scored, acwr, &context)?;

            print_recommendation(&target.title, &recommendation, acwr);

            if apply {
                training_plan.apply_recommendation(&recommendation, adapter.config(), today)?;
                json::export_json(&training_plan, &plan)?;
                println!("{}", format!("✓ Plan updated: {}", plan.display()).green());
            }
        }

        Commands::Complete {
            plan,
            loads,
            session,
            date,
            duration,
            avg_hr,
            pace,
            profile,
        } => {
            let mut training_plan: TrainingPlan = load_json(&plan)?;
            let today = date.unwrap_or_else(|| Local::now().date_naive());
            let mut tracker = if loads.exists() {
                import_load_history(&loads)
                    .with_context(|| format!("Failed to read load history: {}", loads.display()))?
            } else {
                TrainingLoadTracker::new()
            };

            let session_id = match session {
                Some(id) => id,
                None => match training_plan.next_scheduled_session(today) {
                    NextSession::Scheduled(s) => s.id.clone(),
                    NextSession::OutOfSessions => {
                        println!("{}", "No planned sessions left in this plan".yellow());
                        return Ok(());
                    }
                },
            };
            let Some(target) = training_plan.session(&session_id).cloned() else {
                bail!("Session {} not found in {}", session_id, plan.display());
            };

            let max_hr = match profile {
                Some(path) => {
                    let athlete: AthleteProfile = load_json(&path)?;
                    athlete.max_heart_rate(today)
                }
                None => None,
            };
            let mut activity = ActivitySummary::new(duration.unwrap_or(target.target_duration_minutes));
            if let Some(hr) = avg_hr {
                activity = activity.with_heart_rate(hr, max_hr);
            }
            if let Some(sec) = pace {
                activity = activity.with_pace(sec);
            }

            let load = training_plan.complete_activity(&session_id, &activity, &mut tracker, today)?;
            json::export_json(&training_plan, &plan)?;
            export_load_history(&tracker, &loads)?;

            println!("{}", format!("✓ {} completed: load {:.1}", target.title, load).green());
            match tracker.summary(today).acwr {
                Some(ratio) => println!("  ACWR: {:.2}", ratio),
                None => println!("  ACWR: {}", "n/a (less than 28 days of history)".dimmed()),
            }
            println!("  Loads saved to: {}", loads.display());
        }

        Commands::Config { action } => match action {
            ConfigCommands::Init { force } => {
                let path = cli.config.unwrap_or_else(CoachConfig::default_config_path);
                if path.exists() && !force {
                    bail!("{} already exists (use --force to overwrite)", path.display());
                }
                let mut fresh = CoachConfig::default();
                fresh.save_to_file(&path)?;
                println!("{}", format!("✓ Configuration written to {}", path.display()).green());
            }
            ConfigCommands::Show => {
                let rendered = toml::to_string_pretty(&config)
                    .context("Failed to serialize configuration to TOML")?;
                println!("{}", rendered);
            }
        },
    }

    Ok(())
}

fn run_plan(action: PlanCommands, config: &CoachConfig) -> Result<()> {
    match action {
        PlanCommands::Generate {
            profile,
            start,
            race,
            sessions,
            days,
            output,
        } => {
            let athlete: AthleteProfile = load_json(&profile)?;
            let start = start.unwrap_or_else(|| Local::now().date_naive());
            let plan = config
                .plan_generator()?
                .generate(&athlete, start, race, sessions, &days)?;

            json::export_json(&plan, &output)?;
            let counts = plan.phase_counts();
            println!("{}", "✓ Training plan generated".green().bold());
            println!("  Weeks: {} (base {}, development {}, taper {})", plan.duration_weeks, counts.base, counts.development, counts.taper);
            println!("  Total volume: {} km", plan.total_volume_km());
            println!("  Saved to: {}", output.display());
        }

        PlanCommands::Show { plan, week } => {
            let plan: TrainingPlan = load_json(&plan)?;
            let rows: Vec<SessionRow> = plan
                .weeks
                .iter()
                .filter(|w| week.map_or(true, |n| w.index == n))
                .flat_map(|w| {
                    w.sessions.iter().map(move |s| SessionRow {
                        week: format!("{} {}", w.index, w.phase),
                        id: s.id.clone(),
                        date: format!("{} {}", s.weekday, s.date),
                        title: s.title.clone(),
                        zone: s.zone.to_string(),
                        distance: s.distance_label(),
                        duration: format!("{} min", s.target_duration_minutes),
                        pace: s.pace.to_string(),
                        status: s.status.to_string(),
                    })
                })
                .collect();

            if rows.is_empty() {
                println!("{}", "No sessions to show".yellow());
                return Ok(());
            }
            println!("{}", Table::new(rows).with(Style::rounded()));
            println!("  Completion: {}%", plan.completion_rate());
        }

        PlanCommands::Export {
            plan,
            output,
            format,
        } => {
            let training_plan: TrainingPlan = load_json(&plan)?;
            let format = format
                .or_else(|| ExportFormat::from_path(&output))
                .unwrap_or(ExportFormat::Csv);
            export::export_plan(&training_plan, format, &output)?;
            println!("{}", format!("✓ Plan exported as {} to {}", format, output.display()).yellow());
        }
    }
    Ok(())
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    json::import_json(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn load_history(path: Option<&Path>) -> Result<MetricsHistory> {
    match path {
        Some(p) if p.exists() => load_json(p),
        _ => Ok(MetricsHistory::new()),
    }
}

fn baselines_for(
    raw: &RawMetrics,
    history: &MetricsHistory,
    profile: Option<&Path>,
    config: &CoachConfig,
) -> Result<Baselines> {
    let baselines = history.baselines(raw.date, &config.recovery.baseline);
    Ok(match profile {
        Some(path) => {
            let athlete: AthleteProfile = load_json(path)?;
            baselines.or_profile(&athlete)
        }
        None => baselines,
    })
}

fn print_subscore(label: &str, value: Option<f64>) {
    match value {
        Some(v) => println!("  {:<11} {:>5.1}", label, v),
        None => println!("  {:<11} {}", label, "n/a".dimmed()),
    }
}

fn colour_score(score: u8) -> ColoredString {
    match score {
        70..=100 => score.to_string().green().bold(),
        55..=69 => score.to_string().yellow().bold(),
        40..=54 => score.to_string().truecolor(255, 140, 0).bold(),
        _ => score.to_string().red().bold(),
    }
}

fn print_recommendation(title: &str, rec: &AdaptationRecommendation, acwr: Option<f64>) {
    let action = match rec.action {
        AdaptationAction::Maintain | AdaptationAction::Monitor => rec.action.to_string().green(),
        AdaptationAction::Lighten => rec.action.to_string().yellow(),
        AdaptationAction::Replace | AdaptationAction::Rest => rec.action.to_string().red(),
    };

    println!("{}", format!("Session {}: {}", rec.session_id, title).cyan().bold());
    println!("  Recovery: {} ({})", colour_score(rec.recovery_score), rec.tier);
    match acwr {
        Some(ratio) => println!("  ACWR: {:.2}", ratio),
        None => println!("  ACWR: {}", "n/a".dimmed()),
    }
    println!("  Action: {}", action.bold());
    println!("  {}", rec.reason);
    for note in &rec.notes {
        println!("  • {}", note);
    }
    if rec.reschedule_needed {
        println!("  {}", "Reschedule needed: no free slot on the planned day".yellow());
    }
    println!("  Confidence: {:.0}%", rec.confidence * 100.0);
}

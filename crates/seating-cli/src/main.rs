//! `seating` CLI — query table availability and reservation conflicts for a
//! restaurant snapshot from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Free start times for a party of four (snapshot on stdin)
//! seating slots --date 2026-03-18 --guests 4 < bistro.json
//!
//! # Check a specific booking against a snapshot file
//! seating evaluate -i bistro.json --date 2026-03-18 --start 19:30 --guests 4
//!
//! # Pin a table and write the verdict to a file
//! seating evaluate -i bistro.json --date 2026-03-18 --start 19:30 --guests 4 --table t1 -o verdict.json
//!
//! # Every conflict among stored reservations, with resolution plans
//! seating conflicts -i bistro.json
//!
//! # Free gaps at one table
//! seating gaps -i bistro.json --date 2026-03-18 --table t3
//!
//! # Override engine settings from TOML
//! seating --config engine.toml slots -i bistro.json --date 2026-03-18 --guests 2
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Args, Parser, Subcommand};
use seating_engine::{
    AvailabilityService, BookingRequest, CombinedTableId, EngineConfig, ReservationId,
    ResolutionPlan, RestaurantSnapshot, TableAssignment, TableId,
};
use serde::Serialize;
use std::io::{self, Read};
use tracing::{debug, info};

#[derive(Parser)]
#[command(
    name = "seating",
    version,
    about = "Restaurant table availability and conflict resolution"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file overriding the snapshot's engine settings
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine decisions to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct Files {
    /// Snapshot JSON file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct Target {
    /// Table id
    #[arg(long, conflicts_with = "combined")]
    table: Option<String>,
    /// Combined table id
    #[arg(long)]
    combined: Option<String>,
}

impl Target {
    fn assignment(&self) -> Option<TableAssignment> {
        match (&self.table, &self.combined) {
            (Some(id), _) => Some(TableAssignment::Table(TableId::new(id.as_str()))),
            (None, Some(id)) => Some(TableAssignment::Combined(CombinedTableId::new(id.as_str()))),
            (None, None) => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List bookable start times for a party
    Slots {
        #[command(flatten)]
        files: Files,
        /// Service date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Party size
        #[arg(long)]
        guests: u32,
        /// Current instant, RFC 3339 (defaults to the system clock)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Check whether a booking can be accepted
    Evaluate {
        #[command(flatten)]
        files: Files,
        #[command(flatten)]
        target: Target,
        /// Service date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Start time (HH:MM)
        #[arg(long)]
        start: NaiveTime,
        /// End time (HH:MM); defaults to the policy's booking duration
        #[arg(long)]
        end: Option<NaiveTime>,
        /// Party size
        #[arg(long)]
        guests: u32,
        /// Re-evaluate an existing reservation (excluded from its own checks)
        #[arg(long)]
        reservation: Option<String>,
        /// Current instant, RFC 3339 (defaults to the system clock)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Conflicts among the snapshot's reservations, with resolution plans
    Conflicts {
        #[command(flatten)]
        files: Files,
    },
    /// Free gaps at one table during opening hours
    Gaps {
        #[command(flatten)]
        files: Files,
        #[command(flatten)]
        target: Target,
        /// Service date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
        /// Only report the first gap at least this many minutes long
        #[arg(long)]
        min_duration: Option<i64>,
    },
}

/// One conflicted reservation in `conflicts` output.
#[derive(Serialize)]
struct ReservationReport {
    reservation_id: ReservationId,
    plans: Vec<ResolutionPlan>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref().map(load_config).transpose()?;

    match cli.command {
        Commands::Slots {
            files,
            date,
            guests,
            now,
        } => {
            let snapshot = load_snapshot(files.input.as_deref(), config)?;
            let service = AvailabilityService::new(&snapshot).context("Invalid restaurant snapshot")?;
            let slots = service
                .get_available_slots(date, guests, now.unwrap_or_else(Utc::now))
                .with_context(|| format!("Cannot search slots for {guests} guests on {date}"))?;
            info!(%date, guests, slots = slots.len(), "slot search finished");
            write_json(files.output.as_deref(), &slots)?;
        }
        Commands::Evaluate {
            files,
            target,
            date,
            start,
            end,
            guests,
            reservation,
            now,
        } => {
            let snapshot = load_snapshot(files.input.as_deref(), config)?;
            let service = AvailabilityService::new(&snapshot).context("Invalid restaurant snapshot")?;
            let request = BookingRequest {
                reservation_id: reservation.map(ReservationId::new),
                date,
                start_time: start,
                end_time: end,
                guest_count: guests,
                assignment: target.assignment(),
            };
            let evaluation = service
                .evaluate_booking(&request, now.unwrap_or_else(Utc::now))
                .context("Booking rejected")?;
            debug!(accepted = evaluation.is_accepted(), "booking evaluated");
            write_json(files.output.as_deref(), &evaluation)?;
        }
        Commands::Conflicts { files } => {
            let snapshot = load_snapshot(files.input.as_deref(), config)?;
            let service = AvailabilityService::new(&snapshot).context("Invalid restaurant snapshot")?;
            let report: Vec<ReservationReport> = service
                .plan_existing()
                .into_iter()
                .map(|(reservation_id, plans)| ReservationReport {
                    reservation_id,
                    plans,
                })
                .collect();
            write_json(files.output.as_deref(), &report)?;
        }
        Commands::Gaps {
            files,
            target,
            date,
            min_duration,
        } => {
            let Some(assignment) = target.assignment() else {
                anyhow::bail!("gaps needs --table or --combined");
            };
            let snapshot = load_snapshot(files.input.as_deref(), config)?;
            let service = AvailabilityService::new(&snapshot).context("Invalid restaurant snapshot")?;
            let gaps = service
                .free_windows(&assignment, date, min_duration)
                .with_context(|| format!("Cannot compute gaps for {assignment}"))?;
            write_json(files.output.as_deref(), &gaps)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays valid JSON.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &str) -> Result<EngineConfig> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config: {}", path))?;
    let config: EngineConfig =
        toml::from_str(&text).with_context(|| format!("Failed to parse config: {}", path))?;
    config
        .validate()
        .with_context(|| format!("Invalid config: {}", path))?;
    Ok(config)
}

fn load_snapshot(path: Option<&str>, config: Option<EngineConfig>) -> Result<RestaurantSnapshot> {
    let json = read_input(path)?;
    let mut snapshot =
        RestaurantSnapshot::from_json(&json).context("Failed to parse restaurant snapshot")?;
    if let Some(config) = config {
        snapshot.config = config;
    }
    debug!(
        restaurant = %snapshot.restaurant_id,
        tables = snapshot.tables.len(),
        reservations = snapshot.reservations.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}

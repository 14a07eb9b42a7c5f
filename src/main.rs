use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

mod aggregate;
mod ingest;
mod models;
mod report;

use ingest::{IngestOptions, InvalidDayPolicy};
use models::{CanonicalRecord, DailyTotal, DepartmentTotal, GuestTotal, InsightFacts};

#[derive(Parser)]
#[command(name = "tipease-insights")]
#[command(about = "Normalize bilingual resort tipping CSVs and derive dashboard views", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct SourceArgs {
    /// Tipping data CSV (bilingual headers accepted)
    #[arg(long)]
    csv: PathBuf,
    /// Length of the observation window in days (15 or 30)
    #[arg(long, default_value_t = 15)]
    window_days: i64,
    /// Discard rows whose day cell does not parse instead of zero-filling
    #[arg(long)]
    drop_invalid_days: bool,
}

impl SourceArgs {
    fn load(&self) -> anyhow::Result<Vec<CanonicalRecord>> {
        let options = IngestOptions {
            window_days: self.window_days,
            invalid_day: if self.drop_invalid_days {
                InvalidDayPolicy::Drop
            } else {
                InvalidDayPolicy::ZeroFill
            },
        };
        Ok(ingest::normalize_path(&self.csv, options)?)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print KPI facts and the aggregate views
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 5)]
        top_guests: usize,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Write a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = 5)]
        top_guests: usize,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Print the most recent tips
    Log {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(long, default_value_t = report::RECENT_LOG_LIMIT)]
        limit: usize,
    },
}

/// Everything the presentation layer consumes, in one serializable bundle.
#[derive(Serialize)]
struct SummaryView {
    facts: InsightFacts,
    department_totals: Vec<DepartmentTotal>,
    daily_totals: Vec<DailyTotal>,
    guest_totals: Vec<GuestTotal>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Summary {
            source,
            top_guests,
            format,
        } => {
            let records = source.load()?;
            let view = SummaryView {
                facts: aggregate::insight_facts(&records),
                department_totals: aggregate::department_totals(&records),
                daily_totals: aggregate::daily_totals(&records),
                guest_totals: aggregate::guest_totals(&records, Some(top_guests)),
            };
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
                OutputFormat::Text => print_summary(&view),
            }
        }
        Commands::Report {
            source,
            top_guests,
            out,
        } => {
            let records = source.load()?;
            let report = report::build_report(&records, source.window_days, top_guests);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Log { source, limit } => {
            let records = source.load()?;
            let recent = aggregate::recent_log(&records, limit);
            if recent.is_empty() {
                println!("No tips recorded.");
                return Ok(());
            }
            for record in recent.iter() {
                println!(
                    "{} {} ${:.2} {} ({})",
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.guest,
                    record.tip,
                    record.department,
                    record.time_of_day
                );
            }
        }
    }

    Ok(())
}

fn print_summary(view: &SummaryView) {
    println!("Total tips: ${:.2}", view.facts.total_tips);
    println!("Unique guests: {}", view.facts.unique_guests);
    println!("Departments: {}", view.facts.department_count);
    println!("Average tip: ${:.2}", view.facts.average_tip);
    if let Some(day) = view.facts.peak_day {
        println!("Peak day: day {day}");
    }
    if let Some(top) = &view.facts.top_department {
        println!("Top department: {top}");
    }

    if view.department_totals.is_empty() {
        println!("\nNo tips recorded.");
        return;
    }

    println!("\nTips by department:");
    for total in view.department_totals.iter() {
        println!("- {}: ${:.2}", total.department, total.total);
    }

    println!("\nDaily totals:");
    for total in view.daily_totals.iter() {
        println!("- Day {}: ${:.2}", total.day, total.total);
    }

    println!("\nTop tippers:");
    for total in view.guest_totals.iter() {
        println!("- {}: ${:.2}", total.guest, total.total);
    }
}

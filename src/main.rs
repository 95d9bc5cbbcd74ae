use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use village_early_warning::extract::{self, TableSource, DEFAULT_TREND_WINDOW};
use village_early_warning::models::Stream;
use village_early_warning::notify::{
    AlertSink, FileReportSink, Notifier, ReportSink, SmsAlertSink, SpeechAlertSink,
};
use village_early_warning::{generate, report, risk};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_VILLAGE: &str = "Sample Village";

#[derive(Parser)]
#[command(name = "early-warning")]
#[command(about = "Village early disease warning from school, pharmacy, sanitation and water data", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score the latest readings and print the dashboard
    Status {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,
        /// Print the assessment as JSON instead
        #[arg(long)]
        json: bool,
    },
    /// Chart the trailing readings of one stream
    Trend {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value = "school")]
        stream: Stream,
        #[arg(long, default_value_t = DEFAULT_TREND_WINDOW)]
        window: usize,
    },
    /// Write a risk report regardless of score
    Report {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_VILLAGE)]
        village: String,
    },
    /// Re-evaluate on an interval, reporting and alerting as status changes
    Monitor {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value = "reports")]
        reports_dir: PathBuf,
        #[arg(long, default_value = DEFAULT_VILLAGE)]
        village: String,
        /// Number of cycles to run (0 runs until interrupted)
        #[arg(long, default_value_t = 1)]
        cycles: u64,
        #[arg(long, default_value_t = 60)]
        interval_secs: u64,
        /// Phone number for SMS alerts
        #[arg(long)]
        sms_to: Option<String>,
        /// Speak emergency alerts
        #[arg(long)]
        voice: bool,
    },
    /// Generate synthetic CSV tables with outbreak spikes
    Generate {
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        out_dir: PathBuf,
        #[arg(long, default_value_t = 20_000)]
        days: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 120)]
        spikes: usize,
    },
}

fn resolve_data_dir(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var("EARLY_WARNING_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn load_source(data_dir: Option<PathBuf>) -> anyhow::Result<TableSource> {
    let dir = resolve_data_dir(data_dir);
    TableSource::load_dir(&dir)
        .with_context(|| format!("failed to load indicator tables from {}", dir.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Status {
            data_dir,
            window,
            json,
        } => {
            let source = load_source(data_dir)?;
            let reading = extract::extract(&source).context("failed to extract indicators")?;
            let assessment = risk::assess(&reading)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&assessment)?);
                return Ok(());
            }

            let reasons = report::reasons(&reading, &assessment);
            let trend = extract::extract_trend(&source, Stream::School, window)?;
            print!(
                "{}",
                report::render_dashboard(&assessment, &reasons, Some((Stream::School, &trend[..])))
            );
        }
        Commands::Trend {
            data_dir,
            stream,
            window,
        } => {
            let source = load_source(data_dir)?;
            let values = extract::extract_trend(&source, stream, window)
                .with_context(|| format!("failed to read {stream} trend"))?;
            print!("{}", report::render_trend(stream, &values));
        }
        Commands::Report {
            data_dir,
            reports_dir,
            village,
        } => {
            let source = load_source(data_dir)?;
            let reading = extract::extract(&source).context("failed to extract indicators")?;
            let assessment = risk::assess(&reading)?;
            let reasons = report::reasons(&reading, &assessment)
                .iter()
                .map(|reason| format!("- {reason}"))
                .collect::<Vec<_>>()
                .join("\n");
            let mut sink = FileReportSink::new(&reports_dir, village);
            let report_id = sink.emit(&assessment, &reasons)?;
            println!(
                "Report written to {}.",
                reports_dir.join(report_id).display()
            );
        }
        Commands::Monitor {
            data_dir,
            reports_dir,
            village,
            cycles,
            interval_secs,
            sms_to,
            voice,
        } => {
            let dir = resolve_data_dir(data_dir);
            let mut alerts: Vec<Box<dyn AlertSink>> = Vec::new();
            if let Some(recipient) = sms_to {
                alerts.push(Box::new(SmsAlertSink::new(recipient)));
            }
            if voice {
                alerts.push(Box::new(SpeechAlertSink));
            }
            let mut notifier = Notifier::new(
                Box::new(FileReportSink::new(reports_dir, village)),
                alerts,
            );

            let mut cycle = 0u64;
            loop {
                cycle += 1;
                if let Err(err) = run_monitor_cycle(&mut notifier, &dir) {
                    error!(cycle, "evaluation failed, alerts suppressed: {err:#}");
                }

                if cycles != 0 && cycle >= cycles {
                    break;
                }
                thread::sleep(Duration::from_secs(interval_secs));
            }
            info!(cycles = cycle, last_status = ?notifier.last_status(), "monitor stopped");
        }
        Commands::Generate {
            out_dir,
            days,
            seed,
            spikes,
        } => {
            let config = generate::GeneratorConfig {
                days,
                seed,
                spikes,
                ..generate::GeneratorConfig::default()
            };
            let tables = generate::generate(&config)?;
            generate::write_tables(&tables, &out_dir)
                .with_context(|| format!("failed to write tables to {}", out_dir.display()))?;
            println!(
                "Generated {} days of data in {}.",
                tables.len(),
                out_dir.display()
            );
        }
    }

    Ok(())
}

fn run_monitor_cycle(notifier: &mut Notifier, dir: &std::path::Path) -> anyhow::Result<()> {
    // Reload every cycle so new rows appended to the tables are picked up.
    let source = TableSource::load_dir(dir)?;
    let outcome = notifier.run_cycle(&source)?;
    info!(
        score = outcome.assessment.score,
        status = %outcome.assessment.status,
        report = outcome.report_id.as_deref().unwrap_or("-"),
        alerted = outcome.alerted,
        "cycle complete"
    );
    println!(
        "{} score {} / 100, status {}",
        outcome.assessment.date, outcome.assessment.score, outcome.assessment.status
    );
    Ok(())
}

// tfsmith - plain-language AWS requests to reviewed Terraform
// Main entry point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing_subscriber::EnvFilter;

use tfsmith::config::load_settings;
use tfsmith::output::{write_artifacts, Artifacts};
use tfsmith::providers::{create_llm_provider, create_search_provider};
use tfsmith::refinement::{RefinementLoop, RunEvent, RunReport, Stage};
use tfsmith::research::QueryPlanner;
use tfsmith::{RunAborted, RunError};

/// Exit status of a run that hit the revision cap with open issues
const EXIT_CAPPED: u8 = 2;

#[derive(Parser)]
#[command(name = "tfsmith")]
#[command(version, about = "Generate reviewed Terraform for AWS from a plain-language request")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.tfsmith/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Research, generate and review a configuration
    Generate {
        /// What to build, e.g. "an EC2 instance and an RDS database"
        #[arg(trailing_var_arg = true, required = true)]
        request: Vec<String>,

        /// Where main.tf and second_last_main.tf are written
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Maximum number of revisions after the first candidate
        #[arg(long)]
        max_revisions: Option<u32>,

        /// Print the full run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the research queries for a request without calling any provider
    Plan {
        #[arg(trailing_var_arg = true, required = true)]
        request: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Generate {
            request,
            out_dir,
            max_revisions,
            json,
        } => {
            generate(
                &request.join(" "),
                cli.config.as_deref(),
                &out_dir,
                max_revisions,
                json,
            )
            .await
        }
        Commands::Plan { request } => plan(&request.join(" ")),
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_tracing(verbose: bool) -> Result<()> {
    tracing_log::LogTracer::init().context("Failed to bridge log records")?;

    let fallback = if verbose { "tfsmith=debug" } else { "tfsmith=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

async fn generate(
    request: &str,
    config: Option<&Path>,
    out_dir: &Path,
    max_revisions: Option<u32>,
    json: bool,
) -> Result<ExitCode> {
    let mut settings = load_settings(config)?;
    if let Some(max_revisions) = max_revisions {
        settings.refinement.max_revisions = max_revisions;
        settings.validate()?;
    }

    let llm = create_llm_provider(&settings)?;
    let search = create_search_provider(&settings)?;

    let (tx, rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(print_progress(rx, settings.refinement.max_revisions));

    let result = {
        let runner = RefinementLoop::from_settings(&settings, llm, search).with_events(tx);
        runner.run(request).await
    };
    // The sender went away with the runner, so the printer drains and exits
    let _ = progress.await;

    match result {
        Ok(report) => {
            let artifacts = write_artifacts(out_dir, &report.history)?;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialize run report")?
                );
            } else {
                print_summary(&report, &artifacts);
            }
            Ok(if report.is_approved() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_CAPPED)
            })
        }
        Err(RunError::Aborted(aborted)) => {
            report_abort(&aborted, out_dir)?;
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn plan(request: &str) -> Result<ExitCode> {
    let plan = QueryPlanner::new().plan_queries(request)?;

    let services: Vec<String> = plan.services.iter().map(|s| s.label()).collect();
    println!("{} {}", "Services:".bold(), services.join(", "));
    for (n, query) in plan.queries().iter().enumerate() {
        println!("  {}. {}", n + 1, query);
    }
    Ok(ExitCode::SUCCESS)
}

async fn print_progress(mut events: UnboundedReceiver<RunEvent>, max_revisions: u32) {
    while let Some(event) = events.recv().await {
        let line = match event {
            RunEvent::StageEntered { stage, revision } => match stage {
                Stage::Researching => format!("{} Researching", "▸".cyan().bold()),
                Stage::Generating if revision == 0 => format!("{} Generating", "▸".cyan().bold()),
                Stage::Generating => format!(
                    "{} Revising ({}/{})",
                    "▸".cyan().bold(),
                    revision,
                    max_revisions
                ),
                Stage::Reviewing => format!("{} Reviewing", "▸".cyan().bold()),
            },
            RunEvent::ResearchCompleted { snippets, degraded: false } => {
                format!("  {} {} research snippet(s)", "✓".green(), snippets)
            }
            RunEvent::ResearchCompleted { degraded: true, .. } => format!(
                "  {} No research available, continuing without it",
                "⚠".yellow()
            ),
            RunEvent::CandidateGenerated { bytes, .. } => {
                format!("  {} Candidate ready ({} bytes)", "✓".green(), bytes)
            }
            RunEvent::Reviewed { issues: 0, .. } => format!("  {} Approved", "✓".green()),
            RunEvent::Reviewed { issues, .. } => {
                format!("  {} {} issue(s) found", "⚠".yellow(), issues)
            }
            RunEvent::Finished { .. } => continue,
            RunEvent::Aborted { stage, reason, .. } => {
                format!("  {} Aborted while {}: {}", "✗".red().bold(), stage, reason)
            }
        };
        eprintln!("{}", line);
    }
}

fn print_summary(report: &RunReport, artifacts: &Artifacts) {
    if report.is_approved() {
        println!(
            "{} Approved after {} revision(s)",
            "✓".green().bold(),
            report.revision_count
        );
    } else {
        println!(
            "{} Revision cap reached after {} revision(s); open issues:",
            "⚠".yellow().bold(),
            report.revision_count
        );
        for issue in report.critique.issues() {
            println!("  • [{}] {}", issue.severity, issue.issue);
            println!("    {}", issue.fix.clone().dark_grey());
        }
    }

    if report.research_degraded {
        println!("{} Generated without research material", "⚠".yellow());
    }

    println!("Wrote {}", artifacts.main.display());
    if let Some(previous) = &artifacts.previous {
        println!("Wrote {} (previous candidate)", previous.display());
    }
}

fn report_abort(aborted: &RunAborted, out_dir: &Path) -> Result<()> {
    eprintln!("{} {}", "Error:".red().bold(), aborted);

    if let Some(note) = aborted.candidate_note() {
        let artifacts = write_artifacts(out_dir, &aborted.history)?;
        println!(
            "{} Wrote the {} to {}",
            "INCOMPLETE".red().bold(),
            note,
            artifacts.main.display()
        );
    } else {
        println!("{} No candidate was generated", "INCOMPLETE".red().bold());
    }
    Ok(())
}

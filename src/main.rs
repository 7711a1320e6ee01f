use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

use verdant_lib::backup::fs_helpers;
use verdant_lib::config::AnalysisConfig;
use verdant_lib::history::SIDEBAR_WINDOW;
use verdant_lib::models::{feature_title, format_measurement, Severity, SubjectHint};
use verdant_lib::pipeline::processor::{AnalysisOutcome, AnalysisRequest, HealthAnalyzer};
use verdant_lib::session::AnalysisSession;
use verdant_lib::{export, init_tracing};

#[derive(Parser)]
#[command(name = "verdant")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long, global = true, env = "VERDANT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one or more plant or soil photos in a single session.
    Analyze {
        /// Image files (PNG, JPEG, BMP or TIFF).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Subject of the photos: auto, plant or soil.
        #[arg(short, long, default_value = "auto")]
        subject: SubjectHint,

        /// Write the session history as CSV. A directory gets a timestamped file name.
        #[arg(short, long)]
        export: Option<PathBuf>,
    },

    /// List stored backup artifacts.
    Backups,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AnalysisConfig::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Analyze {
            files,
            subject,
            export,
        } => analyze(config, &files, subject, export.as_deref()),
        Commands::Backups => list_backups(&config),
    }
}

fn analyze(
    config: AnalysisConfig,
    files: &[PathBuf],
    hint: SubjectHint,
    export_path: Option<&Path>,
) -> anyhow::Result<()> {
    let analyzer = HealthAnalyzer::new(config);
    let session = AnalysisSession::new();
    let mut failed = 0usize;

    for path in files {
        let bytes =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let request = AnalysisRequest {
            image_bytes: &bytes,
            source_name: &name,
            hint,
        };
        match analyzer.analyze(&session, request) {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) => {
                failed += 1;
                println!("✗ {name}: {e}");
                println!("  next step: {:?}", e.corrective_action());
            }
        }
        println!();
    }

    print_summary(&analyzer, &session);

    if let Some(target) = export_path {
        let target = if target.is_dir() {
            target.join(export::export_file_name(chrono::Local::now().naive_local()))
        } else {
            target.to_path_buf()
        };
        export::export_to_path(&session.history().all(), &target)
            .with_context(|| format!("exporting history to {}", target.display()))?;
        println!("History exported to {}", target.display());
    }

    if failed == files.len() {
        bail!("no image could be analyzed");
    }
    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome) {
    let verdict = outcome.record.verdict();
    let marker = severity_marker(verdict.condition().severity());

    println!(
        "{marker} {} - {}: {} ({:.0}% confidence)",
        verdict.source_name(),
        verdict.subject_type().analysis_label(),
        verdict.condition(),
        verdict.confidence() * 100.0
    );
    for (key, value) in verdict.details().iter() {
        println!("  {:<26} {}", feature_title(key), format_measurement(value));
    }

    if outcome.low_confidence {
        println!(
            "  Low confidence result ({:.0}%). Consider uploading a clearer image.",
            verdict.confidence() * 100.0
        );
    } else {
        println!("  Recommendations:");
        for (i, rec) in outcome.record.recommendations().iter().enumerate() {
            println!("  {}. {rec}", i + 1);
        }
    }
}

fn severity_marker(severity: Severity) -> &'static str {
    match severity {
        Severity::Good => "✓",
        Severity::Warning => "!",
        Severity::Critical => "✗",
    }
}

fn print_summary(analyzer: &HealthAnalyzer, session: &AnalysisSession) {
    let stats = session.history().stats();
    println!(
        "Session: {} analyses ({} plant, {} soil), mean confidence {:.2}",
        stats.total, stats.plant, stats.soil, stats.mean_confidence
    );
    for record in session.history().recent(SIDEBAR_WINDOW).iter().rev() {
        let verdict = record.verdict();
        println!(
            "  {} {} - {} ({:.2})",
            verdict.timestamp_display(),
            verdict.source_name(),
            verdict.condition(),
            verdict.confidence()
        );
    }

    let status = analyzer.backup_manager().get_status();
    println!(
        "Backup: {} (last backup: {})",
        status.state,
        status.last_backup_display()
    );
    if let Some(err) = &status.last_error {
        println!("  last error: {err}");
    }
}

fn list_backups(config: &AnalysisConfig) -> anyhow::Result<()> {
    let root = &config.backup_dir;
    let ids = fs_helpers::list_artifacts(root)
        .with_context(|| format!("listing backups in {}", root.display()))?;

    if ids.is_empty() {
        println!("No backups in {}", root.display());
        return Ok(());
    }

    for id in &ids {
        match fs_helpers::read_sidecar(root, id) {
            Ok(sidecar) => {
                let marker = sidecar
                    .condition()
                    .map(|c| severity_marker(c.severity()))
                    .unwrap_or("?");
                println!(
                    "{marker} {id}  {}  {}  {:.2}  {}",
                    sidecar.analysis_type,
                    sidecar.condition,
                    sidecar.confidence,
                    sidecar.source_name
                );
            }
            Err(e) => println!("? {id}  (unreadable: {e})"),
        }
    }
    println!("{} artifact(s) in {}", ids.len(), root.display());
    Ok(())
}

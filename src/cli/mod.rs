//! # CLI Module
//!
//! Command-line interface for the authenticity scanner.
//!
//! ## Usage
//! ```bash
//! # Analyze one or more documents
//! authscan analyze invoice.pdf photo.jpg
//!
//! # Force the content type instead of guessing from the extension
//! authscan analyze upload.bin --content-type image/png
//!
//! # JSON output with custom label thresholds
//! authscan analyze photo.jpg --output json --verified-threshold 80
//!
//! # Run the HTTP service
//! authscan serve --port 8000
//! ```

use authenticity_scanner::core::aggregator::{AnalysisResult, Label};
use authenticity_scanner::core::config::{AnalyzerConfig, LabelThresholds};
use authenticity_scanner::core::loader::{AnalyzeRequest, DocumentFormat};
use authenticity_scanner::core::pipeline::{Analyzer, CancellationToken};
use authenticity_scanner::core::reporter::{explain, SignalLevel};
use authenticity_scanner::error::{ErrorResponse, LoadError, Result, ScannerError};
use authenticity_scanner::events::{AnalysisEvent, Event, EventChannel};
use authenticity_scanner::server;
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::{style, StyledObject, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

const OCTET_STREAM: &str = "application/octet-stream";

/// Document Authenticity Scanner - flag likely AI-generated images and PDFs
#[derive(Parser, Debug)]
#[command(name = "authscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze documents and print their verdicts
    Analyze {
        /// Files to analyze (PDF, JPG, PNG, WEBP)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Content type to use for every file instead of guessing
        #[arg(long)]
        content_type: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,

        /// Show per-feature findings and progress
        #[arg(short, long)]
        verbose: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Serve the analyzer over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Options shared by every command that builds an analyzer
#[derive(Args, Debug)]
struct SettingsArgs {
    /// JSON config file; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum score labelled "Verified"
    #[arg(long)]
    verified_threshold: Option<f64>,

    /// Minimum score labelled "Suspicious"
    #[arg(long)]
    suspicious_threshold: Option<f64>,
}

impl SettingsArgs {
    fn build_analyzer(&self) -> Result<Analyzer> {
        let mut config = match &self.config {
            Some(path) => AnalyzerConfig::from_json_file(path)?,
            None => AnalyzerConfig::default(),
        };

        let thresholds = LabelThresholds {
            verified: self.verified_threshold.unwrap_or(config.thresholds.verified),
            suspicious: self
                .suspicious_threshold
                .unwrap_or(config.thresholds.suspicious),
        };
        config = config.thresholds(thresholds);

        Analyzer::builder().config(config).build()
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// One line per file: score, label, path
    Minimal,
}

/// Outcome for one file in JSON output
#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorResponse>,
}

/// Run the CLI
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            files,
            content_type,
            output,
            verbose,
            settings,
        } => {
            let analyzer = settings.build_analyzer()?;
            run_analyze(&analyzer, &files, content_type.as_deref(), output, verbose)
        }
        Commands::Serve {
            host,
            port,
            settings,
        } => {
            let analyzer = Arc::new(settings.build_analyzer()?);
            run_serve(&host, port, analyzer)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn run_serve(host: &str, port: u16, analyzer: Arc<Analyzer>) -> Result<()> {
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| ScannerError::Config(format!("invalid listen address {host}:{port}: {e}")))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(addr, analyzer))
}

fn run_analyze(
    analyzer: &Analyzer,
    files: &[PathBuf],
    content_type: Option<&str>,
    output: OutputFormat,
    verbose: bool,
) -> Result<ExitCode> {
    let term = Term::stderr();
    let pretty = matches!(output, OutputFormat::Pretty);

    if pretty {
        term.write_line(&format!(
            "{} {}",
            style("Document Authenticity Scanner").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    // Progress bar only pays off for batches
    let progress = if pretty && files.len() > 1 {
        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();
    let verbose_clone = verbose && pretty;

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        for event in receiver.iter() {
            match event {
                Event::Analysis(AnalysisEvent::Started { filename, .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.set_message(filename);
                    }
                }
                Event::Analysis(AnalysisEvent::StageChanged { stage }) if verbose_clone => {
                    let line = format!("  {} {}", style("→").dim(), style(stage).dim());
                    match progress_clone {
                        Some(ref pb) => pb.println(line),
                        None => eprintln!("{line}"),
                    }
                }
                Event::Analysis(AnalysisEvent::Completed { .. })
                | Event::Analysis(AnalysisEvent::Failed { .. }) => {
                    if let Some(ref pb) = progress_clone {
                        pb.inc(1);
                    }
                }
                _ => {}
            }
        }
        if let Some(ref pb) = progress_clone {
            pb.finish_and_clear();
        }
    });

    let cancel = CancellationToken::new();
    let reports: Vec<FileReport> = files
        .iter()
        .map(|path| {
            let outcome = read_request(path, content_type, analyzer.config().max_upload_bytes)
                .and_then(|request| analyzer.analyze_with_events(&request, &sender, &cancel));
            match outcome {
                Ok(result) => FileReport {
                    path: path.clone(),
                    result: Some(result),
                    error: None,
                },
                Err(e) => FileReport {
                    path: path.clone(),
                    result: None,
                    error: Some(ErrorResponse::from(&e)),
                },
            }
        })
        .collect();

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &reports, verbose),
        OutputFormat::Json => print_json_results(&reports)?,
        OutputFormat::Minimal => print_minimal_results(&reports),
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Read `path` into a request, enforcing the upload limit before reading
fn read_request(path: &Path, content_type: Option<&str>, limit: u64) -> Result<AnalyzeRequest> {
    let size = fs::metadata(path)?.len();
    if size > limit {
        return Err(LoadError::TooLarge { size, limit }.into());
    }

    let bytes = fs::read(path)?;
    let content_type = match content_type {
        Some(ct) => ct.to_string(),
        None => DocumentFormat::from_path(path)
            .map(|f| f.mime_type().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    };
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(AnalyzeRequest::new(bytes, content_type, filename))
}

fn styled_label(label: Label) -> StyledObject<&'static str> {
    match label {
        Label::Verified => style(label.as_str()).green().bold(),
        Label::Suspicious => style(label.as_str()).yellow().bold(),
        Label::AiGenerated => style(label.as_str()).red().bold(),
    }
}

fn print_pretty_results(term: &Term, reports: &[FileReport], verbose: bool) {
    for report in reports {
        term.write_line(&format!("{}", style(report.path.display()).bold()))
            .ok();

        match (&report.result, &report.error) {
            (Some(result), _) => {
                let explanation = explain(result);
                term.write_line(&format!(
                    "  {} {} {}",
                    styled_label(result.label),
                    style(format!("{:.1}/100", result.score)).cyan(),
                    style(format!("(confidence {:.2})", result.confidence)).dim()
                ))
                .ok();
                term.write_line(&format!("  {}", explanation.summary)).ok();

                let threshold = if verbose {
                    SignalLevel::Low
                } else {
                    SignalLevel::Moderate
                };
                for finding in explanation.flagged(threshold) {
                    term.write_line(&format!(
                        "    {} {:<22} {:>5.1}%  {}",
                        match finding.level {
                            SignalLevel::High => style("●").red().to_string(),
                            SignalLevel::Moderate => style("●").yellow().to_string(),
                            SignalLevel::Low => style("○").dim().to_string(),
                        },
                        finding.kind.as_str(),
                        finding.percent,
                        style(&finding.description).dim()
                    ))
                    .ok();
                }

                if verbose {
                    let m = &result.metadata;
                    term.write_line(&format!(
                        "    {} {} {} {}x{}, EXIF fields: {}",
                        style("Document:").dim(),
                        m.format,
                        m.mode,
                        m.size[0],
                        m.size[1],
                        m.exif_fields
                    ))
                    .ok();
                    if let Some(device) = &m.capture_device {
                        let taken = m
                            .captured_at
                            .map(|t| format!(", taken {}", t.format("%Y-%m-%d %H:%M")))
                            .unwrap_or_default();
                        term.write_line(&format!(
                            "    {} {}{}",
                            style("Captured with:").dim(),
                            device,
                            taken
                        ))
                        .ok();
                    }
                    term.write_line(&format!(
                        "    {} {}",
                        style("Watermark:").dim(),
                        result.synthid.message
                    ))
                    .ok();
                }
            }
            (None, Some(error)) => {
                term.write_line(&format!("  {} {}", style("✗").red().bold(), error.detail))
                    .ok();
            }
            (None, None) => {}
        }
        term.write_line("").ok();
    }

    term.write_line(&format!(
        "{}",
        style("Scores are heuristic. Treat them as a prompt for review, not proof.").dim()
    ))
    .ok();
}

fn print_json_results(reports: &[FileReport]) -> Result<()> {
    let json = serde_json::to_string_pretty(reports)
        .map_err(|e| ScannerError::Config(format!("failed to serialize results: {e}")))?;
    println!("{json}");
    Ok(())
}

fn print_minimal_results(reports: &[FileReport]) {
    for report in reports {
        match (&report.result, &report.error) {
            (Some(result), _) => println!(
                "{:.1}\t{}\t{}",
                result.score,
                result.label,
                report.path.display()
            ),
            (None, Some(error)) => println!("error\t{}\t{}", error.detail, report.path.display()),
            (None, None) => {}
        }
    }
}

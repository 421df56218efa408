//! CLI binary for transcript-lens.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use transcript_lens::{
    write_json_report, AnalysisConfig, AnalysisOutcome, AnalysisProgressCallback, Analyzer,
    Catalog, Confidence, PointScale, ProgressCallback,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per document.
/// Documents may finish out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} files  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Analysing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            failures: AtomicUsize::new(0),
        })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_length(total_documents as u64);
        self.bar.reset_eta();
    }

    fn on_document_start(&self, file_name: &str) {
        self.bar.set_message(file_name.to_string());
    }

    fn on_document_complete(&self, file_name: &str, outcome: &AnalysisOutcome) {
        let line = if let Some(ref e) = outcome.error {
            self.failures.fetch_add(1, Ordering::SeqCst);
            format!("  {} {}  {}", red("✗"), file_name, red(e.label()))
        } else if outcome.success {
            format!(
                "  {} {}  {}",
                green("✓"),
                file_name,
                dim(&headline(outcome))
            )
        } else {
            format!("  {} {}  {}", yellow("·"), file_name, dim("inconclusive"))
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.failures.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} files identified  ({} unreadable)",
            if success_count == total_documents {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&success_count.to_string()),
            total_documents,
            if failed == 0 {
                failed.to_string()
            } else {
                red(&failed.to_string())
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Identify the institution of a transcript
  tlens transcript.pdf

  # Text and spreadsheet exports work too; images contribute their name only
  tlens grades.csv buet_transcript.png

  # Show extracted course lines
  tlens --courses transcript.txt

  # JSON for scripting, or a JSON report file
  tlens --json transcript.pdf > outcome.json
  tlens -o report.json scans/*.pdf

  # Use your own institution catalog
  tlens --catalog my_catalog.json transcript.pdf
  tlens --catalog my_catalog.json --list-institutions

CONFIDENCE:
  high     institution named in the document or its file name
  medium   inferred from grade-point increments (.67/.33, .7/.3, .75/.25)
  low      nothing diagnostic found; pick the institution manually

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium, used when --pdfium-lib is not set
  RUST_LOG                Override log filtering (e.g. transcript_lens=debug)
  TLENS_*                 Defaults for most flags (see --help)

SETUP:
  PDF input needs the pdfium shared library. Install it system-wide or
  point PDFIUM_LIB_PATH at it. Text, CSV and image inputs never need it.
"#;

/// Identify the institution, grading scale and courses of academic transcripts.
#[derive(Parser, Debug)]
#[command(
    name = "tlens",
    version,
    about = "Identify the institution, grading scale and courses of academic transcripts",
    long_about = "Analyse transcript files (PDF, text, CSV, or images by file name) and report \
the issuing institution, the grading-scale family inferred from the grade points, a synthesized \
letter → point scale, and best-effort course lines.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Transcript files to analyse.
    #[arg(required_unless_present = "list_institutions")]
    files: Vec<PathBuf>,

    /// Write a JSON report to this file.
    #[arg(short, long, env = "TLENS_OUTPUT")]
    output: Option<PathBuf>,

    /// Print outcomes as JSON on stdout.
    #[arg(long, env = "TLENS_JSON")]
    json: bool,

    /// Load the institution catalog from a JSON file instead of the built-in one.
    #[arg(long, env = "TLENS_CATALOG")]
    catalog: Option<PathBuf>,

    /// Print the catalog's institutions and scale families, then exit.
    #[arg(long)]
    list_institutions: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "TLENS_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library.
    #[arg(long, env = "TLENS_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// Skip lines shorter than this when looking for courses.
    #[arg(long, env = "TLENS_MIN_LINE_CHARS", default_value_t = 5)]
    min_line_chars: usize,

    /// Credit assumed for course lines without a usable credit value.
    #[arg(long, env = "TLENS_DEFAULT_CREDIT", default_value_t = 3.0)]
    default_credit: f64,

    /// Number of files analysed at once.
    #[arg(short, long, env = "TLENS_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Count a low-confidence scale-family guess as a detection.
    #[arg(long, env = "TLENS_ACCEPT_WEAK_SCALE")]
    accept_weak_scale: bool,

    /// Decode text files that are not valid UTF-8 lossily instead of failing.
    #[arg(long, env = "TLENS_LOSSY")]
    lossy: bool,

    /// Also print extracted course lines.
    #[arg(long, env = "TLENS_COURSES")]
    courses: bool,

    /// Disable progress bar.
    #[arg(long, env = "TLENS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "TLENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and results.
    #[arg(short, long, env = "TLENS_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.files.len() > 1;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Catalog ──────────────────────────────────────────────────────────
    let catalog = match cli.catalog {
        Some(ref path) => Catalog::load(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => Catalog::builtin(),
    };

    if cli.list_institutions {
        print_catalog(&catalog);
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let analyzer = Analyzer::new(Arc::new(catalog), config);

    // ── Run analysis ─────────────────────────────────────────────────────
    let outcomes = analyzer.analyze_many(&cli.files).await;

    if cli.json {
        let json = if outcomes.len() == 1 {
            serde_json::to_string_pretty(&outcomes[0])
        } else {
            serde_json::to_string_pretty(&outcomes)
        }
        .context("Failed to serialise outcomes")?;
        println!("{json}");
    } else {
        for outcome in &outcomes {
            print_outcome(outcome, analyzer.catalog(), cli.courses);
        }
    }

    if let Some(ref output_path) = cli.output {
        let written = if outcomes.len() == 1 {
            write_json_report(&outcomes[0], output_path).await
        } else {
            write_json_report(&outcomes, output_path).await
        };
        written.context("Failed to write report")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} outcomes  →  {}",
                green("✔"),
                outcomes.len(),
                bold(&output_path.display().to_string()),
            );
        }
    }

    Ok(())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .min_line_chars(cli.min_line_chars)
        .default_credit(cli.default_credit)
        .concurrency(cli.concurrency)
        .count_weak_scale_guess(cli.accept_weak_scale)
        .lossy_text(cli.lossy);

    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// One-line verdict used by the progress log.
fn headline(outcome: &AnalysisOutcome) -> String {
    match outcome.resolved_institution() {
        Some(key) => format!(
            "{} ({}, {})",
            key, outcome.detection.confidence, outcome.detection.method
        ),
        None if outcome.custom_scale.is_some() => "custom scale".to_string(),
        None => "scale family only".to_string(),
    }
}

fn confidence_colour(c: Confidence) -> String {
    match c {
        Confidence::High => green(c.as_str()),
        Confidence::Medium => yellow(c.as_str()),
        Confidence::Low => red(c.as_str()),
    }
}

fn print_outcome(outcome: &AnalysisOutcome, catalog: &Catalog, show_courses: bool) {
    println!("{}", bold(&outcome.file_name));

    if let Some(ref e) = outcome.error {
        println!("  {}  {}", red("error"), e);
        println!();
        return;
    }

    match outcome.resolved_institution() {
        Some(key) => {
            let name = catalog
                .get(key)
                .map(|i| i.display_name.as_str())
                .unwrap_or(key);
            println!("  Institution:   {}  {}", name, dim(&format!("[{key}]")));
        }
        None => println!("  Institution:   {}", dim("not identified")),
    }
    println!(
        "  Confidence:    {}  {}",
        confidence_colour(outcome.detection.confidence),
        dim(&format!("via {}", outcome.detection.method))
    );

    if let Some(ref family) = outcome.scale_family {
        let hint = match family.matched_point {
            Some(p) => format!("matched {p}"),
            None => "guess, no fingerprint seen".to_string(),
        };
        println!(
            "  Scale family:  {} ({})  {}",
            family.family_id,
            confidence_colour(family.confidence),
            dim(&hint)
        );
    }

    if !outcome.detected_grade_points.is_empty() {
        let points: Vec<String> = outcome
            .detected_grade_points
            .iter()
            .map(|p| format!("{p:.2}"))
            .collect();
        println!("  Grade points:  {}", points.join(", "));
    }
    if !outcome.detected_grades.is_empty() {
        println!("  Letters:       {}", outcome.detected_grades.join(", "));
    }

    if let Some(ref scale) = outcome.custom_scale {
        let pairs: Vec<String> = scale
            .grades
            .iter()
            .map(|g| format!("{}={:.2}", g.letter, g.point))
            .collect();
        println!("  {}:  {}", scale.short_name, pairs.join("  "));
        if !scale.corroborated_letters.is_empty() {
            println!(
                "                 {}",
                dim(&format!("seen in text: {}", scale.corroborated_letters.join(", ")))
            );
        }
    }

    if show_courses {
        let scale = outcome.selected_scale(catalog);
        println!("  Courses:       {}", outcome.courses.len());
        for c in &outcome.courses {
            let point = scale
                .and_then(|s| s.point_for(&c.grade))
                .map(|p| format!("{p:.2}"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "    {:<10} {:<32} {:>4.1}  {:<3} {}",
                c.code.as_deref().unwrap_or("-"),
                c.name.as_deref().unwrap_or("-"),
                c.credit,
                c.grade,
                dim(&point)
            );
        }
    }
    println!();
}

fn print_catalog(catalog: &Catalog) {
    println!("{}", bold("Institutions"));
    for inst in catalog.institutions() {
        println!(
            "  {} {:<8} {}  {}",
            cyan(&format!("{:<8}", inst.key)),
            inst.short_name,
            inst.display_name,
            dim(&format!("{} grades, ceiling {:.1}", inst.grades.len(), inst.scale_ceiling))
        );
    }

    println!();
    println!("{}", bold("Scale families (priority order)"));
    let fallback = catalog.fallback_family().map(|f| f.id.as_str());
    for family in catalog.scale_families() {
        let points: Vec<String> = family
            .fingerprint_points
            .iter()
            .map(|p| format!("{p}"))
            .collect();
        println!(
            "  {} [{}]  → {}{}",
            cyan(&format!("{:<10}", family.id)),
            points.join(", "),
            family.representative_institution_key,
            if fallback == Some(family.id.as_str()) {
                dim("  (fallback)")
            } else {
                String::new()
            }
        );
    }
}

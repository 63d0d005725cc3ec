//! Proceedings CLI tool
//!
//! Builds a conference proceedings volume from a working directory laid out
//! as the organizer CSV, front matter, acknowledgments, templates and papers.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, LevelFilter};

use proceedings::config::{BuildConfig, RendererKind};
use proceedings::{logging, pipeline};

/// Proceedings - Assemble a paginated conference proceedings volume
#[derive(Parser)]
#[command(name = "proceedings")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Build the volume in ./example with pdflatex
    proceedings

    # Build without a TeX installation
    proceedings --directory conf2026 --renderer builtin

    # Number the papers from page 101 and skip the 6\"x9\" variant
    proceedings --directory conf2026 --startpagenumber 101 --no-trim")]
struct Cli {
    /// Working directory
    #[arg(long, default_value = "example")]
    directory: PathBuf,

    /// Directory name for the front matter (exactly one PDF)
    #[arg(long, default_value = "front-matter")]
    frontmatter: String,

    /// Directory name for the acknowledgments (exactly one PDF)
    #[arg(long, default_value = "acknowledgments")]
    acknowledgments: String,

    /// Directory name for papers without headers
    #[arg(long, default_value = "papers-without-headers")]
    papers: String,

    /// Directory name for templates (blank page, LaTeX templates)
    #[arg(long, default_value = "templates")]
    templates: String,

    /// Directory name for the table of contents
    #[arg(long, default_value = "table-of-contents")]
    toc: String,

    /// Directory name for headers of papers
    #[arg(long, default_value = "headers")]
    headers: String,

    /// Directory name for papers with headers
    #[arg(long, default_value = "papers-with-headers")]
    papersfinal: String,

    /// Organizer CSV filename
    #[arg(long, default_value = "organizer.csv")]
    organizer: String,

    /// Maximum number of characters in a running header
    #[arg(long, default_value_t = 55)]
    maxheaderlength: usize,

    /// Output PDF filename
    #[arg(long, default_value = "proceedings.pdf")]
    output: String,

    /// Trim-size output PDF filename
    #[arg(long, default_value = "proceedings6by9.pdf")]
    output6by9: String,

    /// Skip the trim-size output
    #[arg(long)]
    no_trim: bool,

    /// Scale factor for the trim-size output, in (0, 1]
    #[arg(long, default_value_t = 0.95)]
    scale: f64,

    /// Printed page number of the first paper (odd)
    #[arg(long, default_value_t = 1)]
    startpagenumber: u32,

    /// Renderer for headers and table of contents: latex or builtin
    #[arg(long, default_value = "latex")]
    renderer: RendererKind,

    /// LaTeX program used by the latex renderer
    #[arg(long, default_value = "pdflatex")]
    latex: String,

    /// Seconds to wait for each LaTeX run
    #[arg(long, default_value_t = 120)]
    render_timeout: u64,

    /// Log per-document detail
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        if self.verbose {
            LevelFilter::Debug
        } else if self.quiet {
            LevelFilter::Warn
        } else {
            LevelFilter::Info
        }
    }

    fn into_config(self) -> BuildConfig {
        let defaults = BuildConfig::default();
        BuildConfig {
            directory: self.directory,
            front_matter_dir: self.frontmatter,
            acknowledgments_dir: self.acknowledgments,
            papers_dir: self.papers,
            templates_dir: self.templates,
            toc_dir: self.toc,
            headers_dir: self.headers,
            papers_final_dir: self.papersfinal,
            organizer: self.organizer,
            max_header_length: self.maxheaderlength,
            output: self.output,
            output_trimmed: (!self.no_trim).then_some(self.output6by9),
            scale: self.scale,
            start_page: self.startpagenumber,
            renderer: self.renderer,
            latex_program: self.latex,
            render_timeout: Duration::from_secs(self.render_timeout),
            ..defaults
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        // Once logging is up, stderr and master.log both get the message
        if log::log_enabled!(log::Level::Error) {
            error!("Error: {:#}", e);
        } else {
            eprintln!("Error: {:#}", e);
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let level = cli.log_level();
    let config = cli.into_config();

    let master_log = config.path(&config.master_log);
    logging::init(level, Some(&master_log)).context("Failed to set up logging")?;

    let args: Vec<String> = std::env::args().collect();
    logging::log_run_info(&args, config.working_dir());

    let summary = pipeline::run(&config)
        .with_context(|| format!("Building proceedings in {}", config.directory.display()))?;

    println!(
        "Created {} ({} papers, {} pages)",
        summary.output.display(),
        summary.papers,
        summary.total_pages
    );
    if let Some(trimmed) = &summary.trimmed_output {
        println!("Created {}", trimmed.display());
    }

    Ok(())
}

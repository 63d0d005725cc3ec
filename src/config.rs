//! Build configuration
//!
//! Every setting of a run has a default matching the conventional working
//! directory layout; the CLI overrides them one flag at a time.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Which renderer produces header and table-of-contents PDFs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RendererKind {
    /// Fill LaTeX templates and run an external program
    #[default]
    Latex,
    /// Draw pages directly, no TeX installation needed
    Builtin,
}

impl FromStr for RendererKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latex" => Ok(Self::Latex),
            "builtin" => Ok(Self::Builtin),
            _ => Err(format!("Invalid renderer: {s}. Must be one of: latex, builtin")),
        }
    }
}

/// Settings for one proceedings build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Working directory; every other path is relative to it
    pub directory: PathBuf,
    pub front_matter_dir: String,
    pub acknowledgments_dir: String,
    pub papers_dir: String,
    pub templates_dir: String,
    pub toc_dir: String,
    pub headers_dir: String,
    pub papers_final_dir: String,
    pub organizer: String,
    pub max_header_length: usize,
    pub output: String,
    /// Trim-size output; `None` skips the trim transform
    pub output_trimmed: Option<String>,
    pub scale: f64,
    pub start_page: u32,
    pub renderer: RendererKind,
    /// Typesetting program for the LaTeX renderer
    pub latex_program: String,
    pub render_timeout: Duration,
    pub master_log: String,
    pub render_log: String,
    pub directory_log: String,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("example"),
            front_matter_dir: "front-matter".to_string(),
            acknowledgments_dir: "acknowledgments".to_string(),
            papers_dir: "papers-without-headers".to_string(),
            templates_dir: "templates".to_string(),
            toc_dir: "table-of-contents".to_string(),
            headers_dir: "headers".to_string(),
            papers_final_dir: "papers-with-headers".to_string(),
            organizer: "organizer.csv".to_string(),
            max_header_length: 55,
            output: "proceedings.pdf".to_string(),
            output_trimmed: Some("proceedings6by9.pdf".to_string()),
            scale: 0.95,
            start_page: 1,
            renderer: RendererKind::default(),
            latex_program: "pdflatex".to_string(),
            render_timeout: Duration::from_secs(120),
            master_log: "master.log".to_string(),
            render_log: "pdflatex.log".to_string(),
            directory_log: "directory.log".to_string(),
        }
    }
}

impl BuildConfig {
    /// Check value ranges. Paths are checked when the build starts.
    pub fn validate(&self) -> Result<()> {
        if !(self.scale > 0.0 && self.scale <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "scale factor must be in (0, 1], got {}",
                self.scale
            )));
        }
        if self.start_page == 0 || self.start_page % 2 == 0 {
            return Err(Error::InvalidConfig(format!(
                "start page number must be odd and at least 1, got {}",
                self.start_page
            )));
        }
        if self.max_header_length == 0 {
            return Err(Error::InvalidConfig(
                "maximum header length must be at least 1".to_string(),
            ));
        }
        if self.render_timeout.is_zero() {
            return Err(Error::InvalidConfig(
                "render timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// `name` resolved against the working directory
    pub fn path(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }

    pub fn organizer_path(&self) -> PathBuf {
        self.path(&self.organizer)
    }

    pub fn templates_path(&self) -> PathBuf {
        self.path(&self.templates_dir)
    }

    /// The single blank page used as filler
    pub fn blank_page_path(&self) -> PathBuf {
        self.templates_path().join("blank.pdf")
    }

    pub fn papers_path(&self) -> PathBuf {
        self.path(&self.papers_dir)
    }

    pub fn output_path(&self) -> PathBuf {
        self.path(&self.output)
    }

    pub fn trimmed_output_path(&self) -> Option<PathBuf> {
        self.output_trimmed.as_deref().map(|name| self.path(name))
    }

    pub fn working_dir(&self) -> &Path {
        &self.directory
    }
}

//! Renderer that fills LaTeX templates and runs an external typesetter

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::{header_stem, Renderer, TOC_STEM};
use crate::error::{Error, Result};
use crate::overlay::{toc_substitutions, HeaderOverlay, TocEntry};
use crate::template::{self, Template};

/// How often a running typesetter is checked for completion
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Tokens each template needs for the rendered output to carry any data
const HEADER_TOKENS: [&str; 3] = [template::AUTHORS, template::TITLE, template::INSERT_PAGES];
const TOC_TOKENS: [&str; 1] = [template::INSERT_TOC_ENTRIES];

/// Runs `pdflatex` (or a compatible program) on filled-in templates
#[derive(Debug, Clone)]
pub struct LatexRenderer {
    header_template: Template,
    toc_template: Template,
    program: String,
    timeout: Duration,
    log_path: PathBuf,
}

impl LatexRenderer {
    /// Load `headers.tex` and `table-of-contents.tex` from `templates_dir`.
    /// Typesetter output is appended to `log_path`.
    pub fn new(
        templates_dir: &Path,
        program: impl Into<String>,
        timeout: Duration,
        log_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let header_path = templates_dir.join("headers.tex");
        let toc_path = templates_dir.join(format!("{TOC_STEM}.tex"));
        let header_template = Template::load(&header_path)?;
        let toc_template = Template::load(&toc_path)?;

        for (path, template, tokens) in [
            (&header_path, &header_template, &HEADER_TOKENS[..]),
            (&toc_path, &toc_template, &TOC_TOKENS[..]),
        ] {
            for token in missing_tokens(template, tokens) {
                warn!("{} never mentions {}", path.display(), token);
            }
        }

        Ok(Self::from_templates(
            header_template,
            toc_template,
            program,
            timeout,
            log_path,
        ))
    }

    /// Build from templates already in memory
    pub fn from_templates(
        header_template: Template,
        toc_template: Template,
        program: impl Into<String>,
        timeout: Duration,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            header_template,
            toc_template,
            program: program.into(),
            timeout,
            log_path: log_path.into(),
        }
    }

    /// Write `source` to `<out_dir>/<stem>.tex`, typeset it and return the PDF path
    fn typeset(&self, source: &str, stem: &str, out_dir: &Path) -> Result<PathBuf> {
        let tex_path = out_dir.join(format!("{stem}.tex"));
        let pdf_path = out_dir.join(format!("{stem}.pdf"));
        std::fs::write(&tex_path, source)?;

        let status = self.run(&tex_path, out_dir, stem)?;

        if !pdf_path.is_file() {
            return Err(Error::RenderFailure {
                job: stem.to_string(),
                expected: pdf_path,
            });
        }
        if !status.success() {
            warn!(
                "{} exited with {} for {} but produced {}",
                self.program,
                status,
                stem,
                pdf_path.display()
            );
        }

        Ok(pdf_path)
    }

    /// Run the program and wait for it, killing it once the timeout expires
    fn run(&self, tex_path: &Path, out_dir: &Path, job: &str) -> Result<ExitStatus> {
        let log = self.open_log()?;
        let log_err = log.try_clone()?;

        debug!("Running {} on {}", self.program, tex_path.display());
        let mut child = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(out_dir)
            .arg(tex_path)
            .stdin(Stdio::null())
            .stdout(log)
            .stderr(log_err)
            .spawn()?;

        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // The process may exit between the check and the kill
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::RenderTimeout {
                    job: job.to_string(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    fn open_log(&self) -> Result<File> {
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?)
    }
}

/// The `tokens` that `template` does not contain
fn missing_tokens<'a>(template: &Template, tokens: &[&'a str]) -> Vec<&'a str> {
    tokens
        .iter()
        .copied()
        .filter(|token| !template.contains(token))
        .collect()
}

impl Renderer for LatexRenderer {
    fn render_header(&self, overlay: &HeaderOverlay, out_dir: &Path) -> Result<PathBuf> {
        let source = self.header_template.render(&overlay.substitutions());
        self.typeset(&source, &header_stem(overlay), out_dir)
    }

    fn render_toc(&self, entries: &[TocEntry], out_dir: &Path) -> Result<PathBuf> {
        let source = self.toc_template.render(&toc_substitutions(entries));
        self.typeset(&source, TOC_STEM, out_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn overlay() -> HeaderOverlay {
        HeaderOverlay {
            paper: 1,
            start_page_label: "1".to_string(),
            page_range_label: "1-2".to_string(),
            authors_text: "A. AUTHOR".to_string(),
            title_text: "A TITLE".to_string(),
            continuation_pages: 1,
        }
    }

    fn renderer(program: &str, dir: &TempDir, timeout: Duration) -> LatexRenderer {
        LatexRenderer::from_templates(
            Template::new("XXAuthorsXX XXTitleXX XXInsertPagesXX"),
            Template::new("XXInsertTocEntriesXX"),
            program,
            timeout,
            dir.path().join("pdflatex.log"),
        )
    }

    #[test]
    fn test_new_requires_templates() {
        let dir = TempDir::new().unwrap();
        let err = LatexRenderer::new(dir.path(), "pdflatex", Duration::from_secs(1), "log")
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_new_loads_templates_lacking_tokens() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("headers.tex"), "XXAuthorsXX only").unwrap();
        std::fs::write(dir.path().join("table-of-contents.tex"), "XXInsertTocEntriesXX").unwrap();

        let r = LatexRenderer::new(dir.path(), "pdflatex", Duration::from_secs(1), "log").unwrap();
        assert_eq!(
            missing_tokens(&r.header_template, &HEADER_TOKENS),
            vec![template::TITLE, template::INSERT_PAGES]
        );
        assert!(missing_tokens(&r.toc_template, &TOC_TOKENS).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_program_is_killed_at_timeout() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("slowtex");
        std::fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let r = renderer(script.to_str().unwrap(), &dir, Duration::from_millis(200));
        let started = Instant::now();
        let err = r.render_header(&overlay(), dir.path()).unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(3));
        match err {
            Error::RenderTimeout { job, timeout } => {
                assert_eq!(job, "headers0");
                assert_eq!(timeout, Duration::from_millis(200));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_output_is_render_failure() {
        let dir = TempDir::new().unwrap();
        // `true` accepts any arguments and writes nothing
        let r = renderer("true", &dir, Duration::from_secs(10));
        let err = r.render_header(&overlay(), dir.path()).unwrap_err();
        assert!(matches!(err, Error::RenderFailure { .. }));

        let tex = std::fs::read_to_string(dir.path().join("headers0.tex")).unwrap();
        assert!(tex.starts_with("A. AUTHOR A TITLE \\newpage"));
    }

    #[cfg(unix)]
    #[test]
    fn test_existing_output_is_returned() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("table-of-contents.pdf"), b"%PDF-1.5").unwrap();
        // A failing exit status with output present is only a warning
        let r = renderer("false", &dir, Duration::from_secs(10));
        let path = r.render_toc(&[], dir.path()).unwrap();
        assert_eq!(path, dir.path().join("table-of-contents.pdf"));
        assert!(dir.path().join("pdflatex.log").exists());
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let dir = TempDir::new().unwrap();
        let r = renderer("no-such-typesetter-program", &dir, Duration::from_secs(1));
        let err = r.render_toc(&[], dir.path()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}

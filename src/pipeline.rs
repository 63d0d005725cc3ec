//! One proceedings build, from the organizer file to the finished volume
//!
//! Every input is checked before anything is written. After that the run
//! renders and stamps the running headers, renders the table of contents,
//! assembles the volume and optionally produces the trim-size variant.

use std::fs;
use std::path::{Path, PathBuf};

use glob::{glob_with, MatchOptions, Pattern};
use log::{debug, info};

use crate::config::{BuildConfig, RendererKind};
use crate::error::{Error, Result};
use crate::logging;
use crate::manifest::{self, PaperEntry};
use crate::overlay;
use crate::pagination::{self, Placement};
use crate::pdf::{assemble, compose, count_pages, trim, AssembledVolume, PageDocument, VolumeSection};
use crate::render::{BuiltinRenderer, LatexRenderer, Renderer};

pub const FRONT_MATTER: &str = "front matter";
pub const ACKNOWLEDGMENTS: &str = "acknowledgments";
pub const TABLE_OF_CONTENTS: &str = "table of contents";
pub const PAPERS: &str = "papers";

/// What a successful build produced
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub papers: usize,
    /// Printed page ranges of the papers
    pub placements: Vec<Placement>,
    pub total_pages: usize,
    pub output: PathBuf,
    pub trimmed_output: Option<PathBuf>,
}

/// Inputs that passed validation
struct Inputs {
    entries: Vec<PaperEntry>,
    front_matter: PathBuf,
    acknowledgments: PathBuf,
    blank_page: PageDocument,
    renderer: Box<dyn Renderer>,
}

/// Build the proceedings described by `config`
pub fn run(config: &BuildConfig) -> Result<BuildSummary> {
    config.validate()?;

    let working_dir = config.working_dir();
    if !working_dir.is_dir() {
        return Err(Error::MissingDirectory(working_dir.to_path_buf()));
    }

    let directory_log = config.path(&config.directory_log);
    fs::write(&directory_log, "")?;
    logging::write_directory_log(&directory_log, working_dir, "Files before the build")?;

    let inputs = prepare(config)?;
    let summary = build(config, inputs)?;

    logging::write_directory_log(&directory_log, working_dir, "Files after the build")?;
    info!("Directory tree logged to {}", directory_log.display());
    info!("Typesetter output logged to {}", config.path(&config.render_log).display());

    Ok(summary)
}

/// Check every input and load what the build needs
fn prepare(config: &BuildConfig) -> Result<Inputs> {
    info!("Reading the organizer {}", config.organizer_path().display());
    let rows = manifest::load(&config.organizer_path())?;
    info!("{} papers listed", rows.len());

    info!(
        "Checking if any author or paper title headers are too long (limit {} characters)",
        config.max_header_length
    );
    manifest::validate_headers(&rows, config.max_header_length)?;

    let front_matter = find_single_pdf(&config.path(&config.front_matter_dir), FRONT_MATTER)?;
    let acknowledgments =
        find_single_pdf(&config.path(&config.acknowledgments_dir), ACKNOWLEDGMENTS)?;

    let templates = config.templates_path();
    if !templates.is_dir() {
        return Err(Error::MissingDirectory(templates));
    }
    let blank_path = config.blank_page_path();
    let blank_page = PageDocument::open(&blank_path)?;
    if blank_page.page_count() != 1 {
        return Err(Error::BlankPage {
            path: blank_path,
            found: blank_page.page_count(),
        });
    }

    let renderer: Box<dyn Renderer> = match config.renderer {
        RendererKind::Latex => Box::new(LatexRenderer::new(
            &templates,
            config.latex_program.as_str(),
            config.render_timeout,
            config.path(&config.render_log),
        )?),
        RendererKind::Builtin => Box::new(BuiltinRenderer::new()),
    };

    let papers_dir = config.papers_path();
    if !papers_dir.is_dir() {
        return Err(Error::MissingDirectory(papers_dir));
    }

    info!("Counting the pages of each paper");
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        let path = papers_dir.join(&row.filename);
        if !path.is_file() {
            return Err(Error::PaperNotFound {
                paper: row.index,
                filename: row.filename,
                dir: papers_dir,
            });
        }
        let page_count = count_pages(&path)?;
        debug!("\t{} ({}): {} pages", row.label, row.filename, page_count);
        entries.push(PaperEntry::from_row(row, page_count));
    }

    Ok(Inputs {
        entries,
        front_matter,
        acknowledgments,
        blank_page,
        renderer,
    })
}

/// Render, compose, assemble and write the volume
fn build(config: &BuildConfig, inputs: Inputs) -> Result<BuildSummary> {
    let Inputs {
        entries,
        front_matter,
        acknowledgments,
        blank_page,
        renderer,
    } = inputs;

    let counts: Vec<usize> = entries.iter().map(|e| e.page_count).collect();
    let placements = pagination::plan(&counts, config.start_page)?;
    if let Some(last) = pagination::last_page(&placements) {
        info!(
            "Papers occupy pages {}-{} with {} blank pages",
            config.start_page,
            last,
            pagination::blank_pages(&placements)
        );
    }
    for (entry, placement) in entries.iter().zip(&placements) {
        debug!(
            "\tpaper {}: pages {}{}",
            entry.index,
            placement.range.label(),
            if placement.blank_after { " + blank" } else { "" }
        );
    }

    info!("Creating the running headers and stamping them onto the papers");
    let headers_dir = ensure_empty_dir(&config.path(&config.headers_dir))?;
    let papers_final_dir = ensure_empty_dir(&config.path(&config.papers_final_dir))?;
    let papers_dir = config.papers_path();

    let mut papers = Vec::with_capacity(entries.len());
    for (entry, placement) in entries.iter().zip(&placements) {
        let header = overlay::generate(entry, &placement.range);
        let overlay_path = renderer.render_header(&header, &headers_dir)?;

        let content = PageDocument::open(&papers_dir.join(&entry.source_filename))?;
        let overlay = PageDocument::open(&overlay_path)?;
        let mut stamped = compose(content, overlay)?;
        stamped.save(&papers_final_dir.join(&entry.source_filename))?;
        papers.push(stamped);
    }

    info!("Creating the table of contents");
    let toc_dir = ensure_empty_dir(&config.path(&config.toc_dir))?;
    let toc_entries = overlay::toc_entries(&entries, &placements);
    let toc = PageDocument::open(&renderer.render_toc(&toc_entries, &toc_dir)?)?;

    info!("Creating the final proceedings pdf");
    info!("Input pdf files are concatenated in the following order.");
    info!("(Blank pages are automatically added if necessary.)");
    let sections = vec![
        VolumeSection::new(FRONT_MATTER, vec![PageDocument::open(&front_matter)?]),
        VolumeSection::new(ACKNOWLEDGMENTS, vec![PageDocument::open(&acknowledgments)?]),
        VolumeSection::new(TABLE_OF_CONTENTS, vec![toc]),
        VolumeSection::new(PAPERS, papers),
    ];
    let volume = assemble(sections, &blank_page)?;
    check_paper_offsets(&volume, &placements)?;

    let mut document = volume.document;
    let total_pages = document.page_count();
    let output = config.output_path();
    document.save(&output)?;
    info!("Wrote {} ({} pages)", output.display(), total_pages);

    let trimmed_output = match config.trimmed_output_path() {
        Some(path) => {
            info!("Creating the trim-size proceedings (scale {})", config.scale);
            let mut trimmed = trim(document, config.scale)?;
            trimmed.save(&path)?;
            info!("Wrote {}", path.display());
            Some(path)
        }
        None => None,
    };

    Ok(BuildSummary {
        papers: entries.len(),
        placements,
        total_pages,
        output,
        trimmed_output,
    })
}

/// Check that the assembled volume spaces the papers exactly as planned.
/// Offsets are measured from the first paper, since front matter shifts
/// physical positions but not printed numbers.
pub fn check_paper_offsets(volume: &AssembledVolume, placements: &[Placement]) -> Result<()> {
    let placed: Vec<u32> = volume.section(PAPERS).map(|p| p.slot.first_page).collect();
    let (Some(&first_physical), Some(first_planned)) = (placed.first(), placements.first()) else {
        return Ok(());
    };

    for (i, (physical, planned)) in placed.iter().zip(placements).enumerate() {
        let actual = physical - first_physical;
        let expected = planned.range.start_page - first_planned.range.start_page;
        if actual != expected {
            return Err(Error::ParityDisagreement {
                paper: i + 1,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// The only PDF in `dir`, matched case-insensitively
fn find_single_pdf(dir: &Path, section: &'static str) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }

    let pattern = format!("{}/*.pdf", Pattern::escape(&dir.to_string_lossy()));
    let options = MatchOptions {
        case_sensitive: false,
        ..Default::default()
    };
    let found: Vec<PathBuf> = glob_with(&pattern, options)?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file())
        .collect();

    match found.as_slice() {
        [single] => {
            info!("Using {} as {}", single.display(), section);
            Ok(single.clone())
        }
        _ => Err(Error::SectionMultiplicity {
            section,
            dir: dir.to_path_buf(),
            found: found.len(),
        }),
    }
}

/// Create `dir`, or remove everything inside it
fn ensure_empty_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_dir() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::letter;
    use tempfile::TempDir;

    #[test]
    fn test_find_single_pdf() {
        let dir = TempDir::new().unwrap();
        let err = find_single_pdf(dir.path(), FRONT_MATTER).unwrap_err();
        assert!(matches!(err, Error::SectionMultiplicity { found: 0, .. }));

        fs::write(dir.path().join("Front.PDF"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        let found = find_single_pdf(dir.path(), FRONT_MATTER).unwrap();
        assert_eq!(found, dir.path().join("Front.PDF"));

        fs::write(dir.path().join("second.pdf"), b"").unwrap();
        let err = find_single_pdf(dir.path(), FRONT_MATTER).unwrap_err();
        assert!(matches!(err, Error::SectionMultiplicity { found: 2, .. }));

        let missing = dir.path().join("nope");
        assert!(matches!(
            find_single_pdf(&missing, FRONT_MATTER).unwrap_err(),
            Error::MissingDirectory(_)
        ));
    }

    #[test]
    fn test_ensure_empty_dir() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("headers");
        ensure_empty_dir(&target).unwrap();
        fs::write(target.join("old.pdf"), b"").unwrap();

        ensure_empty_dir(&target).unwrap();
        assert!(target.is_dir());
        assert_eq!(fs::read_dir(&target).unwrap().count(), 0);
    }

    #[test]
    fn test_paper_offsets_match_plan() {
        let sections = vec![
            VolumeSection::new(FRONT_MATTER, vec![letter(3)]),
            VolumeSection::new(PAPERS, vec![letter(3), letter(4), letter(1)]),
        ];
        let volume = assemble(sections, &letter(1)).unwrap();
        let placements = pagination::plan(&[3, 4, 1], 1).unwrap();
        assert!(check_paper_offsets(&volume, &placements).is_ok());

        // A plan that disagrees about the second paper
        let wrong = pagination::plan(&[2, 4, 1], 1).unwrap();
        let err = check_paper_offsets(&volume, &wrong).unwrap_err();
        assert!(matches!(
            err,
            Error::ParityDisagreement {
                paper: 2,
                expected: 2,
                actual: 4
            }
        ));
    }
}

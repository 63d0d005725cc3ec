//! Run logs: the master log mirrored to stderr, and directory listings

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use glob::{glob, Pattern};
use log::{info, warn, LevelFilter};

use crate::error::{Error, Result};

/// Writes everything to stderr and, when open, to the master log file
struct Tee {
    file: Option<File>,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        if let Some(file) = self.file.as_mut() {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        if let Some(file) = self.file.as_mut() {
            file.flush()?;
        }
        Ok(())
    }
}

/// Install the global logger. Records go to stderr and, if `master_log` can
/// be created, to that file as well (truncated first). `RUST_LOG` overrides
/// `level`.
pub fn init(level: LevelFilter, master_log: Option<&Path>) -> Result<()> {
    let file = match master_log {
        Some(path) if path.parent().map_or(true, |p| p.as_os_str().is_empty() || p.is_dir()) => {
            Some(File::create(path)?)
        }
        _ => None,
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.as_str()))
        .format(|buf, record| {
            writeln!(
                buf,
                "{}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(Tee { file })))
        .try_init()
        .map_err(|e| Error::General(format!("Logger already initialised: {e}")))
}

/// Log where and how this run was started
pub fn log_run_info(args: &[String], working_dir: &Path) {
    info!(
        "Running on {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    info!("Command line: {}", args.join(" "));
    info!("Working directory: {}", working_dir.display());
}

/// Every file below `dir`, relative to it, sorted
pub fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*", Pattern::escape(&dir.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob(&pattern)? {
        match entry {
            Ok(path) if path.is_file() => {
                files.push(path.strip_prefix(dir).map(Path::to_path_buf).unwrap_or(path));
            }
            Ok(_) => {}
            Err(e) => warn!("Cannot list {}: {}", e.path().display(), e),
        }
    }
    files.sort();
    Ok(files)
}

/// Append a headed listing of every file under `working_dir` to `log_path`
pub fn write_directory_log(log_path: &Path, working_dir: &Path, heading: &str) -> Result<()> {
    let files = list_files(working_dir)?;

    let mut log = OpenOptions::new().create(true).append(true).open(log_path)?;
    writeln!(
        log,
        "{}: {} ({})",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        heading,
        working_dir.display()
    )?;
    for file in &files {
        writeln!(log, "    {}", file.display())?;
    }
    writeln!(log)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_list_files_recurses_and_sorts() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("papers")).unwrap();
        std::fs::write(dir.path().join("papers/b.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("organizer.csv"), b"").unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"").unwrap();

        let files = list_files(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![
                PathBuf::from("a.pdf"),
                PathBuf::from("organizer.csv"),
                PathBuf::from("papers/b.pdf"),
            ]
        );
    }

    #[test]
    fn test_directory_log_appends_sections() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("x.pdf"), b"").unwrap();
        let log = dir.path().join("directory.log");

        write_directory_log(&log, dir.path(), "Before").unwrap();
        write_directory_log(&log, dir.path(), "After").unwrap();

        let text = std::fs::read_to_string(&log).unwrap();
        assert!(text.contains("Before"));
        assert!(text.contains("After"));
        // The log itself shows up in the second listing
        assert_eq!(text.matches("    x.pdf").count(), 2);
        assert_eq!(text.matches("    directory.log").count(), 1);
    }
}

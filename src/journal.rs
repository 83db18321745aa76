//! Append-only ingestion journal.
//!
//! One line per significant event, prefixed with a timestamp and a status
//! tag. The file is only ever appended to and is not machine-parsed.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Status tag glyphs, matching the console output of the pipeline.
#[derive(Debug, Clone, Copy)]
pub enum Tag {
    /// Informational.
    Info,
    /// Content was adjusted (e.g. sanitizer changed the text).
    Adjusted,
    /// Success.
    Ok,
    /// Skipped with reason.
    Skip,
    /// Fatal.
    Fatal,
}

impl Tag {
    pub fn glyph(&self) -> &'static str {
        match self {
            Tag::Info => "i",
            Tag::Adjusted => "~",
            Tag::Ok => "✓",
            Tag::Skip => "!",
            Tag::Fatal => "x",
        }
    }
}

/// Writer handle for the journal file. Opening is lazy; a missing parent
/// directory is created on first write. Write failures are reported once
/// to stderr and do not interrupt the pipeline.
pub struct Journal {
    path: Option<PathBuf>,
    warned: std::cell::Cell<bool>,
}

impl Journal {
    pub fn new(path: Option<&Path>) -> Journal {
        Journal {
            path: path.map(Path::to_path_buf),
            warned: std::cell::Cell::new(false),
        }
    }

    /// Disabled journal (no file configured).
    pub fn disabled() -> Journal {
        Journal::new(None)
    }

    pub fn log(&self, tag: Tag, msg: &str) {
        let Some(path) = &self.path else {
            return;
        };
        let line = format!(
            "[{}] [{}] {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            tag.glyph(),
            msg
        );
        if let Err(e) = append_line(path, &line) {
            if !self.warned.get() {
                eprintln!("Warning: cannot write journal {}: {}", path.display(), e);
                self.warned.set(true);
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appends_tagged_lines() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("log").join("ingest_log.txt");
        let journal = Journal::new(Some(&path));
        journal.log(Tag::Ok, "first");
        journal.log(Tag::Skip, "second");

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[✓] first"));
        assert!(lines[1].contains("[!] second"));
    }

    #[test]
    fn test_disabled_journal_writes_nothing() {
        let journal = Journal::disabled();
        journal.log(Tag::Info, "goes nowhere");
    }
}

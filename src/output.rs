use std::fs;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::app::{MutationResult, ProgressEvent, ProgressSink, TasksResult, TreeResult};
use crate::chart::Figure;
use crate::error::EeError;
use crate::lister::Listing;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_listing(result: &Listing) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_tree(result: &TreeResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_mutation(result: &MutationResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_tasks(result: &TasksResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_figure(figure: &Figure) -> io::Result<()> {
        Self::print_json(figure)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Writes progress lines to stderr, keeping stdout for JSON.
pub struct StderrProgress;

impl ProgressSink for StderrProgress {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => eprintln!("{} ({:.1}s)", event.message, elapsed.as_secs_f64()),
            None => eprintln!("{}", event.message),
        }
    }
}

/// Write the figure as pretty JSON, replacing `path` atomically.
pub fn write_figure(figure: &Figure, path: &Utf8Path) -> Result<Utf8PathBuf, EeError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .map_err(|err| EeError::Filesystem(format!("{parent}: {err}")))?;

    let json = serde_json::to_vec_pretty(figure)
        .map_err(|err| EeError::Filesystem(err.to_string()))?;
    let mut temp = NamedTempFile::new_in(&parent)
        .map_err(|err| EeError::Filesystem(format!("{parent}: {err}")))?;
    temp.write_all(&json)
        .and_then(|_| temp.write_all(b"\n"))
        .map_err(|err| EeError::Filesystem(err.to_string()))?;
    temp.persist(path)
        .map_err(|err| EeError::Filesystem(format!("{path}: {}", err.error)))?;
    tracing::debug!(path = %path, "figure written");
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn figure_file_is_replaced_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("charts/figure.json")).unwrap();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "stale").unwrap();

        write_figure(&Figure::new(), &path).unwrap();
        let written: Figure = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Figure::new());
    }
}

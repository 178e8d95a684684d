//! Files relock regenerates: write only when the content actually changed

use crate::Result;
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};

/// Freshly rendered content for a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// What [`GeneratedFile::write_if_changed`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Unchanged,
    /// Written; `diff` is a unified diff against the previous content
    Changed { diff: String },
}

impl WriteOutcome {
    pub fn is_changed(&self) -> bool {
        matches!(self, WriteOutcome::Changed { .. })
    }
}

impl GeneratedFile {
    pub fn new<P: Into<PathBuf>>(path: P, content: String) -> Self {
        Self {
            path: path.into(),
            content,
        }
    }

    /// Content currently on disk; a missing file reads as `None`
    pub fn current(&self) -> Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_up_to_date(&self) -> Result<bool> {
        Ok(self.current()?.as_deref() == Some(self.content.as_str()))
    }

    pub fn write_if_changed(&self) -> Result<WriteOutcome> {
        let current = self.current()?;
        if current.as_deref() == Some(self.content.as_str()) {
            tracing::debug!(path = %self.path.display(), "unchanged");
            return Ok(WriteOutcome::Unchanged);
        }

        let diff = unified_diff(&self.path, current.as_deref().unwrap_or(""), &self.content);
        fs::write(&self.path, &self.content)?;
        tracing::info!(path = %self.path.display(), "wrote generated file");

        Ok(WriteOutcome::Changed { diff })
    }
}

fn unified_diff(path: &Path, old: &str, new: &str) -> String {
    let label = path.display().to_string();
    let diff = TextDiff::from_lines(old, new);
    let rendered = diff
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{}", label), &format!("b/{}", label))
        .to_string();
    rendered
}

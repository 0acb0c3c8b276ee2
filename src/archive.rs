use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;
use zip::ZipArchive;

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::GeneSeqError;

static SEQUENCE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.f(ast|n|a)?a$").expect("sequence suffix pattern is valid")
});

/// Selects archive members by name.
#[derive(Debug, Clone)]
pub struct ExtractionFilter {
    pattern: Regex,
}

impl ExtractionFilter {
    /// `.fa`, `.fna`, `.faa` and `.fasta`, any case.
    pub fn sequences() -> Self {
        Self {
            pattern: SEQUENCE_SUFFIX.clone(),
        }
    }

    pub fn with_pattern(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn matches(&self, member: &str) -> bool {
        self.pattern.is_match(member)
    }
}

impl Default for ExtractionFilter {
    fn default() -> Self {
        Self::sequences()
    }
}

/// Last path component of a member name; empty for directory entries.
pub fn member_basename(member: &str) -> &str {
    member.rsplit(['/', '\\']).next().unwrap_or_default()
}

/// Copies every member accepted by `filter` into `out_dir`, dropping the
/// member's directories. Returns the written paths in archive order.
pub fn extract_sequences(
    archive_path: &Path,
    out_dir: &Path,
    filter: &ExtractionFilter,
    sink: &dyn ProgressSink,
) -> Result<Vec<PathBuf>, GeneSeqError> {
    let file = fs::File::open(archive_path).map_err(|err| {
        GeneSeqError::Filesystem(format!("open zip {}: {err}", archive_path.display()))
    })?;
    let mut archive = ZipArchive::new(file)
        .map_err(|err| GeneSeqError::Archive(format!("{}: {err}", archive_path.display())))?;
    fs::create_dir_all(out_dir).map_err(|err| {
        GeneSeqError::Filesystem(format!("create {}: {err}", out_dir.display()))
    })?;

    let mut extracted = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| GeneSeqError::Archive(err.to_string()))?;
        let name = entry.name().to_string();
        if entry.is_dir() || !filter.matches(&name) {
            continue;
        }
        let filename = member_basename(&name);
        if filename.is_empty() {
            continue;
        }

        let target = out_dir.join(filename);
        let mut outfile = fs::File::create(&target).map_err(|err| {
            GeneSeqError::Filesystem(format!("create {}: {err}", target.display()))
        })?;
        io::copy(&mut entry, &mut outfile)
            .map_err(|err| GeneSeqError::Archive(format!("{name}: {err}")))?;
        debug!(member = %name, target = %target.display(), "archive.extract");

        sink.event(ProgressEvent {
            message: format!("Extracted {filename} to {}/", out_dir.display()),
            elapsed: None,
        });
        extracted.push(target);
    }
    Ok(extracted)
}

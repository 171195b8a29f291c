//! Coveralls job JSON, built from a JaCoCo document and the matching source files.

use serde::{Deserialize, Serialize};

use crate::crawl::{line_count, read_file};
use crate::digest::md5_hex;
use crate::source_index::{CoverageNode, SourceFile};

pub const DEFAULT_SERVICE_NAME: &str = "travis-ci";

/// Payload of the `json_file` part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverallsReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_token: Option<String>,
    pub service_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_job_id: Option<String>,
    pub source_files: Vec<SourceFileReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFileReport {
    /// Path relative to the source root, `/`-separated.
    pub name: String,
    /// Hex MD5 of the file's bytes.
    pub source_digest: String,
    /// One entry per line: `None` when the line has no coverage data, otherwise a hit count.
    pub coverage: Vec<Option<u32>>,
}

impl SourceFileReport {
    pub fn build(source: &SourceFile, node: &CoverageNode) -> std::io::Result<Self> {
        let content = read_file(&source.path)?;
        let lines = line_count(&source.path)?;
        Ok(Self {
            name: source.relative_name.clone(),
            source_digest: md5_hex(&content),
            coverage: line_hits(node, lines),
        })
    }
}

/// JaCoCo has no hit counts, so a line with any covered instruction counts as one hit.
/// Line records outside `1..=lines` are dropped.
pub fn line_hits(node: &CoverageNode, lines: usize) -> Vec<Option<u32>> {
    let mut coverage = vec![None; lines];
    for line in &node.lines {
        if let Some(slot) = line
            .number
            .checked_sub(1)
            .and_then(|index| coverage.get_mut(index))
        {
            *slot = Some(u32::from(line.covered_instructions > 0));
        }
    }
    coverage
}

impl CoverallsReport {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            repo_token: None,
            service_name: service_name.into(),
            service_job_id: None,
            source_files: Vec::new(),
        }
    }

    pub fn covered_lines(&self) -> usize {
        self.source_files
            .iter()
            .flat_map(|file| file.coverage.iter())
            .filter(|hits| matches!(hits, Some(n) if *n > 0))
            .count()
    }

    pub fn relevant_lines(&self) -> usize {
        self.source_files
            .iter()
            .flat_map(|file| file.coverage.iter())
            .filter(|hits| hits.is_some())
            .count()
    }
}

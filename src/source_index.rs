//! Correlates JaCoCo coverage nodes with source files on disk.
//!
//! A JaCoCo report nests `<sourcefile name="Foo.java">` inside `<package name="de/x/y">`.
//! The pair forms the node's *full name* (`de/x/y/Foo.java`), which is matched against the
//! tail of a source file's path relative to the source root.

use std::path::{Path, PathBuf};

use roxmltree::{Document, ParsingOptions};
use tracing::{debug, info};

use crate::error::CoverageError;

const SOURCE_FILE_TAG: &str = "sourcefile";
const LINE_TAG: &str = "line";

/// Per-line counters of a JaCoCo `<line>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCoverage {
    /// 1-based line number.
    pub number: usize,
    pub missed_instructions: u32,
    pub covered_instructions: u32,
    pub missed_branches: u32,
    pub covered_branches: u32,
}

/// One `<sourcefile>` element and the package it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageNode {
    /// `name` of the parent element; `None` when the parent carries no name.
    pub package: Option<String>,
    pub name: String,
    pub lines: Vec<LineCoverage>,
}

impl CoverageNode {
    /// `package/name`, or `None` for nodes that cannot be correlated.
    pub fn full_name(&self) -> Option<String> {
        self.package
            .as_deref()
            .map(|package| format!("{}/{}", package, self.name))
    }
}

/// Immutable, owned view of a coverage report in document order.
#[derive(Debug, Clone, Default)]
pub struct CoverageDocument {
    nodes: Vec<CoverageNode>,
}

impl CoverageDocument {
    pub fn from_nodes(nodes: Vec<CoverageNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[CoverageNode] {
        &self.nodes
    }

    /// Parses a JaCoCo XML report. DOCTYPE declarations are accepted, since JaCoCo emits one.
    pub fn parse(xml: &str) -> Result<Self, CoverageError> {
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let document = Document::parse_with_options(xml, options)?;

        let nodes = document
            .descendants()
            .filter(|node| node.has_tag_name(SOURCE_FILE_TAG))
            .filter_map(|node| {
                let name = node.attribute("name")?.to_string();
                let package = node
                    .parent_element()
                    .and_then(|parent| parent.attribute("name"))
                    .map(str::to_string);
                let lines = node
                    .children()
                    .filter(|child| child.has_tag_name(LINE_TAG))
                    .filter_map(|line| {
                        Some(LineCoverage {
                            number: line.attribute("nr")?.parse().ok()?,
                            missed_instructions: counter(line.attribute("mi")),
                            covered_instructions: counter(line.attribute("ci")),
                            missed_branches: counter(line.attribute("mb")),
                            covered_branches: counter(line.attribute("cb")),
                        })
                    })
                    .collect();
                Some(CoverageNode {
                    package,
                    name,
                    lines,
                })
            })
            .collect::<Vec<_>>();

        debug!(nodes = nodes.len(), "Parsed coverage document");
        Ok(Self { nodes })
    }

    /// Reads and parses the report at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoverageError> {
        let path = path.as_ref();
        info!(path = %path.display(), "Parsing coverage report");
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }
}

fn counter(raw: Option<&str>) -> u32 {
    raw.and_then(|value| value.parse().ok()).unwrap_or(0)
}

/// A source file found under the source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the source root, always `/`-separated.
    pub relative_name: String,
}

impl SourceFile {
    pub fn new(source_root: &Path, path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            relative_name: relative_name(source_root, path),
        }
    }

    /// Last path component, used as the multipart/report file name.
    pub fn base_name(&self) -> &str {
        self.relative_name
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_name)
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Strips `source_root` from `path` component-wise and normalizes separators to `/`.
///
/// A `path` outside `source_root` keeps all of its components.
pub fn relative_name(source_root: &Path, path: &Path) -> String {
    let root = PathBuf::from(normalize(source_root));
    let full = PathBuf::from(normalize(path));
    let stripped = full.strip_prefix(&root).unwrap_or(&full);
    normalize(stripped).trim_start_matches('/').to_string()
}

/// Finds the first node whose `package/name` is a suffix of the file's path below the root.
///
/// The suffix test runs against the relative name with a leading `/`, so default-package
/// nodes (`<package name="">`, full name `/Main.java`) match files directly under the root.
pub fn find_node<'d>(
    document: &'d CoverageDocument,
    source_root: &Path,
    source_file: &Path,
) -> Option<&'d CoverageNode> {
    let rooted = format!("/{}", relative_name(source_root, source_file));
    document.nodes.iter().find(|node| match node.full_name() {
        Some(full_name) => rooted.ends_with(&full_name),
        None => false,
    })
}

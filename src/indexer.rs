//! Directory scanner producing a vault's index and knowledge graph.
//!
//! A scan walks the vault root with children sorted by name, so identical
//! directory contents always produce identical output regardless of how the
//! OS enumerates entries. Per-file errors are logged and skipped; the index
//! is built to completion and swapped in by the caller, never patched
//! piecewise.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::graph::KnowledgeGraph;
use crate::models::{FileInfo, FileKind, VaultIndex};

/// Manager-level config file living in the vault root without a dot prefix;
/// excluded from the index by name.
const WORKSPACE_MANAGER_CONFIG: &str = "workspace_config.json";

/// Result of one full vault scan.
#[derive(Debug)]
pub struct ScanReport {
    pub index: VaultIndex,
    pub graph: KnowledgeGraph,
    /// Files that could not be read or decoded and were left out.
    pub skipped: usize,
}

/// Content extracted from a single document.
#[derive(Debug, Default, PartialEq)]
pub struct DocumentContent {
    pub tags: BTreeSet<String>,
    pub links: BTreeSet<String>,
    pub references: BTreeSet<String>,
    /// Targets of `![[...]]` embeds, unresolved.
    pub embeds: BTreeSet<String>,
}

pub struct Indexer {
    tag_re: Regex,
    link_re: Regex,
    reference_re: Regex,
}

impl Default for Indexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Indexer {
    pub fn new() -> Self {
        // The patterns are fixed; compilation cannot fail.
        Self {
            tag_re: Regex::new(r"#(\w+)").unwrap(),
            link_re: Regex::new(r"\[\[(.*?)\]\]").unwrap(),
            reference_re: Regex::new(r"@(\w+)").unwrap(),
        }
    }

    /// Scan the directory tree rooted at `root`.
    ///
    /// Pass one enumerates files (sorted, dot-entries skipped) and builds an
    /// image index keyed by file name. Pass two reads every document,
    /// extracts tags/links/references, resolves `![[...]]` embeds against
    /// the image index, and populates the graph.
    pub fn scan(&self, root: &Path) -> Result<ScanReport> {
        let mut files: Vec<(String, PathBuf)> = Vec::new();
        collect_files(root, root, &mut files)
            .with_context(|| format!("Failed to walk vault root {}", root.display()))?;

        // Vault-wide image index: file name -> relative path.
        let mut image_index: BTreeMap<String, String> = BTreeMap::new();
        for (rel, path) in &files {
            if FileKind::from_path(path) == FileKind::Image {
                if let Some(name) = path.file_name() {
                    image_index.insert(name.to_string_lossy().into_owned(), rel.clone());
                }
            }
        }

        let mut index = VaultIndex::default();
        let mut graph = KnowledgeGraph::new();
        let mut skipped = 0usize;

        for (rel, path) in &files {
            let metadata = match fs::metadata(path) {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!(file = %path.display(), error = %err, "skipping unreadable file");
                    skipped += 1;
                    continue;
                }
            };

            let kind = FileKind::from_path(path);
            let mut tags = Vec::new();
            let mut links = Vec::new();

            if kind == FileKind::Document {
                match fs::read_to_string(path) {
                    Ok(content) => {
                        let extracted = self.extract(&content);
                        for tag in &extracted.tags {
                            graph.add_tag(rel, tag);
                        }
                        for target in &extracted.links {
                            graph.add_link(rel, target);
                        }
                        for reference in &extracted.references {
                            graph.add_reference(rel, reference);
                        }
                        for embed in &extracted.embeds {
                            if let Some(image_rel) = image_index.get(embed.as_str()) {
                                graph.add_link(rel, image_rel);
                            }
                        }
                        tags = extracted.tags.into_iter().collect();
                        links = extracted.links.into_iter().collect();
                    }
                    Err(err) => {
                        warn!(file = %path.display(), error = %err, "skipping undecodable document");
                        skipped += 1;
                        continue;
                    }
                }
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| rel.clone());
            index.files.insert(
                rel.clone(),
                FileInfo {
                    name,
                    kind,
                    size: metadata.len(),
                    created: metadata.created().ok().map(DateTime::<Utc>::from),
                    modified: metadata
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now()),
                    tags,
                    links,
                },
            );
        }

        Ok(ScanReport {
            index,
            graph,
            skipped,
        })
    }

    /// Extract tags, links, references, and embeds from document text.
    ///
    /// A `[[...]]` immediately preceded by `!` is an embed, not a link.
    pub fn extract(&self, content: &str) -> DocumentContent {
        let mut extracted = DocumentContent::default();

        for capture in self.tag_re.captures_iter(content) {
            extracted.tags.insert(capture[1].to_string());
        }
        for capture in self.reference_re.captures_iter(content) {
            extracted.references.insert(capture[1].to_string());
        }
        for capture in self.link_re.captures_iter(content) {
            let whole = capture.get(0).expect("capture 0 always present");
            let target = capture[1].to_string();
            if target.is_empty() {
                continue;
            }
            let is_embed = whole.start() > 0 && content.as_bytes()[whole.start() - 1] == b'!';
            if is_embed {
                extracted.embeds.insert(target);
            } else {
                extracted.links.insert(target);
            }
        }

        extracted
    }
}

/// Recursively collect `(relative-path, absolute-path)` pairs, children
/// sorted by name. Dot-entries and the workspace manager config are skipped.
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<(String, PathBuf)>) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to enumerate {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name == WORKSPACE_MANAGER_CONFIG {
            continue;
        }
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            let rel = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((rel, path));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_extract_tags_links_references() {
        let indexer = Indexer::new();
        let extracted = indexer.extract("see [[b]] and [[notes/c.md]] #x #x reply @u");
        assert_eq!(
            extracted.links,
            ["b".to_string(), "notes/c.md".to_string()].into()
        );
        assert_eq!(extracted.tags, ["x".to_string()].into());
        assert_eq!(extracted.references, ["u".to_string()].into());
        assert!(extracted.embeds.is_empty());
    }

    #[test]
    fn test_extract_embed_is_not_a_link() {
        let indexer = Indexer::new();
        let extracted = indexer.extract("text ![[shot.png]] and [[b]]");
        assert_eq!(extracted.links, ["b".to_string()].into());
        assert_eq!(extracted.embeds, ["shot.png".to_string()].into());
    }

    #[test]
    fn test_extract_ignores_empty_link_target() {
        let indexer = Indexer::new();
        let extracted = indexer.extract("[[]] nothing here");
        assert!(extracted.links.is_empty());
    }

    #[test]
    fn test_scan_builds_index_and_graph() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a.md", "see [[b]] #x");
        write(temp.path(), "b.md", "reply @u");
        write(temp.path(), "code/app.py", "print('hi')");

        let report = Indexer::new().scan(temp.path()).unwrap();
        assert_eq!(report.skipped, 0);
        assert_eq!(report.index.len(), 3);
        assert_eq!(report.index.get("a.md").unwrap().kind, FileKind::Document);
        assert_eq!(report.index.get("code/app.py").unwrap().kind, FileKind::Code);

        assert_eq!(report.graph.get_links("a.md"), ["b".to_string()].into());
        assert_eq!(report.graph.get_backlinks("b"), ["a.md".to_string()].into());
        assert_eq!(report.graph.get_tags("a.md"), ["x".to_string()].into());
        assert_eq!(report.graph.get_references("b.md"), ["u".to_string()].into());
    }

    #[test]
    fn test_scan_skips_hidden_and_manager_config() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a.md", "hello");
        write(temp.path(), ".vault_config.json", "{}");
        write(temp.path(), ".workspace_Default.json", "{}");
        write(temp.path(), "workspace_config.json", "{}");
        write(temp.path(), ".git/HEAD", "ref: refs/heads/main");

        let report = Indexer::new().scan(temp.path()).unwrap();
        let paths: Vec<&String> = report.index.files.keys().collect();
        assert_eq!(paths, ["a.md"]);
    }

    #[test]
    fn test_scan_resolves_embeds_against_image_index() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a.md", "diagram: ![[shot.png]]");
        write(temp.path(), "assets/shot.png", "not really a png");

        let report = Indexer::new().scan(temp.path()).unwrap();
        assert_eq!(
            report.graph.get_links("a.md"),
            ["assets/shot.png".to_string()].into()
        );
    }

    #[test]
    fn test_scan_skips_undecodable_document_and_continues() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "a.md", "fine #ok");
        fs::write(temp.path().join("bad.md"), [0xff, 0xfe, 0x00, 0x01]).unwrap();

        let report = Indexer::new().scan(temp.path()).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(report.index.contains("a.md"));
        assert!(!report.index.contains("bad.md"));
    }

    #[test]
    fn test_scan_is_deterministic() {
        let temp = tempfile::tempdir().unwrap();
        write(temp.path(), "z.md", "[[a]] #last");
        write(temp.path(), "a.md", "[[z]] #first");
        write(temp.path(), "m/inner.md", "@ref");

        let indexer = Indexer::new();
        let first = indexer.scan(temp.path()).unwrap();
        let second = indexer.scan(temp.path()).unwrap();
        assert_eq!(first.index, second.index);
        assert_eq!(first.graph, second.graph);
    }
}

//! In-memory knowledge graph over a vault's files.
//!
//! Relations are adjacency sets keyed by string ids (the file's
//! vault-relative path, or the written link target), never by object
//! references, so the whole structure serializes cleanly and survives vault
//! reloads. `links` and `backlinks` are kept symmetric by construction.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Link, tag, reference, backlink, and fileset relations for one vault.
///
/// Every operation succeeds; unknown keys simply yield empty sets. Mutations
/// set the dirty flag, which consumers (the graph view) clear via
/// [`KnowledgeGraph::mark_clean`] once they have re-rendered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    links: BTreeMap<String, BTreeSet<String>>,
    backlinks: BTreeMap<String, BTreeSet<String>>,
    tags: BTreeMap<String, BTreeSet<String>>,
    references: BTreeMap<String, BTreeSet<String>>,
    filesets: BTreeMap<String, BTreeSet<String>>,
    #[serde(skip)]
    dirty: bool,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a link from `src` to `dst` and the mirror backlink. Idempotent.
    pub fn add_link(&mut self, src: &str, dst: &str) {
        self.links
            .entry(src.to_string())
            .or_default()
            .insert(dst.to_string());
        self.backlinks
            .entry(dst.to_string())
            .or_default()
            .insert(src.to_string());
        self.dirty = true;
    }

    /// Attach a tag to a file. Idempotent.
    pub fn add_tag(&mut self, file: &str, tag: &str) {
        self.tags
            .entry(file.to_string())
            .or_default()
            .insert(tag.to_string());
        self.dirty = true;
    }

    /// Attach an external reference to a file. Idempotent.
    pub fn add_reference(&mut self, file: &str, reference: &str) {
        self.references
            .entry(file.to_string())
            .or_default()
            .insert(reference.to_string());
        self.dirty = true;
    }

    /// Add a file to a named fileset, creating the set if needed.
    pub fn add_file_to_fileset(&mut self, fileset: &str, file: &str) {
        self.filesets
            .entry(fileset.to_string())
            .or_default()
            .insert(file.to_string());
        self.dirty = true;
    }

    /// Remove a file from a fileset. Unknown sets and members are ignored.
    pub fn remove_file_from_fileset(&mut self, fileset: &str, file: &str) {
        if let Some(files) = self.filesets.get_mut(fileset) {
            files.remove(file);
        }
        self.dirty = true;
    }

    /// Files and targets linking to `file`.
    pub fn get_backlinks(&self, file: &str) -> BTreeSet<String> {
        self.backlinks.get(file).cloned().unwrap_or_default()
    }

    /// Outgoing links for `file`.
    pub fn get_links(&self, file: &str) -> BTreeSet<String> {
        self.links.get(file).cloned().unwrap_or_default()
    }

    /// Tags attached to `file`.
    pub fn get_tags(&self, file: &str) -> BTreeSet<String> {
        self.tags.get(file).cloned().unwrap_or_default()
    }

    /// References attached to `file`.
    pub fn get_references(&self, file: &str) -> BTreeSet<String> {
        self.references.get(file).cloned().unwrap_or_default()
    }

    /// The file's whole neighbourhood: outgoing links, backlinks, tags, and
    /// references, as one set. This is what the AI context builder consumes.
    pub fn get_connected_nodes(&self, file: &str) -> BTreeSet<String> {
        let mut nodes = self.get_links(file);
        nodes.extend(self.get_backlinks(file));
        nodes.extend(self.get_tags(file));
        nodes.extend(self.get_references(file));
        nodes
    }

    /// Every file that carries at least one outgoing link.
    pub fn get_all_files(&self) -> BTreeSet<String> {
        self.links.keys().cloned().collect()
    }

    /// Every tag attached to any file.
    pub fn get_all_tags(&self) -> BTreeSet<String> {
        self.tags.values().flatten().cloned().collect()
    }

    /// Every reference attached to any file.
    pub fn get_all_references(&self) -> BTreeSet<String> {
        self.references.values().flatten().cloned().collect()
    }

    /// The full backlink relation.
    pub fn get_all_backlinks(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.backlinks
    }

    /// All fileset names.
    pub fn get_all_filesets(&self) -> BTreeSet<String> {
        self.filesets.keys().cloned().collect()
    }

    /// Members of a named fileset.
    pub fn get_fileset(&self, name: &str) -> BTreeSet<String> {
        self.filesets.get(name).cloned().unwrap_or_default()
    }

    /// Names of every fileset containing `file`.
    pub fn get_filesets_for_file(&self, file: &str) -> BTreeSet<String> {
        self.filesets
            .iter()
            .filter(|(_, files)| files.contains(file))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Drop every relation. Sets the dirty flag.
    pub fn clear(&mut self) {
        self.links.clear();
        self.backlinks.clear();
        self.tags.clear();
        self.references.clear();
        self.filesets.clear();
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force the dirty flag on. Used when this graph replaces another one
    /// wholesale, where no `add_*` call may have run.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

//! TOC (table of contents) synthesizer.
//!
//! Turns a flat, ordered list of manual documents into a navigation tree that
//! mirrors their directory hierarchy, then serializes it to the `toc.yml`
//! format the site generator reads. Used only when the author did not supply
//! a `toc.yml` of their own.
//!
//! Nodes live in an arena ([`TocTree`]) and refer to each other by
//! [`NodeId`]; children are owned root-to-leaf and the parent link is a plain
//! index used for lookups.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use doku_shared::{DokuError, Logger, Result};

use crate::fsops;
use crate::title::{document_title, title_case};

/// Extension of manual documents; only these acquire a link target.
pub const DOCUMENT_EXTENSION: &str = ".md";

/// Indentation added per tree level in the serialized output.
const INDENT: usize = 2;

/// Index of a node inside a [`TocTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A single navigation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocNode {
    /// Display title; empty only for the synthetic root.
    pub title: String,
    /// Link target, set only on nodes created from a document path.
    pub href: Option<String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl TocNode {
    fn new(title: String, parent: Option<NodeId>) -> Self {
        Self {
            title,
            href: None,
            children: Vec::new(),
            parent,
        }
    }

    /// Children in construction order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Where a document landed in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPlacement {
    pub node: NodeId,
    /// Link target the document overwrote, when two documents share a title.
    pub replaced: Option<String>,
}

/// Arena-backed navigation tree with a synthetic, untitled root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocTree {
    nodes: Vec<TocNode>,
}

impl Default for TocTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TocTree {
    pub fn new() -> Self {
        Self {
            nodes: vec![TocNode::new(String::new(), None)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &TocNode {
        &self.nodes[id.0]
    }

    /// Child of `parent` titled `title`.
    pub fn find_child(&self, parent: NodeId, title: &str) -> Option<NodeId> {
        self.node(parent)
            .children
            .iter()
            .copied()
            .find(|&child| self.node(child).title == title)
    }

    /// Titles from the top level down to `id`, for diagnostics.
    pub fn title_path(&self, id: NodeId) -> Vec<&str> {
        let mut titles = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root() {
                break;
            }
            let node = self.node(node_id);
            titles.push(node.title.as_str());
            current = node.parent;
        }
        titles.reverse();
        titles
    }

    /// Number of nodes excluding the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert one document, creating any missing directory nodes on the way.
    ///
    /// `path` is relative to the manual root with `/` separators. A document
    /// whose title matches an existing sibling reuses that node and takes over
    /// its link (last writer wins); the overwritten link is reported back.
    pub fn add_document(&mut self, path: &str, title: &str) -> Result<DocumentPlacement> {
        let path = normalize_document_path(path)?;
        if title.trim().is_empty() {
            return Err(DokuError::toc(format!("document {path} has an empty title")));
        }

        let parent = match path.rsplit_once('/') {
            Some((dir, _)) => self.resolve_dir(dir),
            None => self.root(),
        };

        let node = match self.find_child(parent, title) {
            Some(existing) => existing,
            None => self.add_child(parent, title.to_string()),
        };

        let mut replaced = None;
        if path.ends_with(DOCUMENT_EXTENSION) {
            let previous = self.nodes[node.0].href.replace(path.clone());
            replaced = previous.filter(|prev| *prev != path);
        }

        Ok(DocumentPlacement { node, replaced })
    }

    /// Directory node for `dir`, created lazily one missing segment at a time.
    fn resolve_dir(&mut self, dir: &str) -> NodeId {
        let (parent, name) = match dir.rsplit_once('/') {
            Some((outer, name)) => (self.resolve_dir(outer), name),
            None => (self.root(), dir),
        };

        let title = title_case(name);
        match self.find_child(parent, &title) {
            Some(existing) => existing,
            None => self.add_child(parent, title),
        }
    }

    fn add_child(&mut self, parent: NodeId, title: String) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TocNode::new(title, Some(parent)));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: NodeId, indent: usize) -> fmt::Result {
        let node = self.node(id);
        let pad = " ".repeat(indent);

        writeln!(f, "{pad}- name: {}", yaml_scalar(&node.title))?;
        if let Some(href) = &node.href {
            writeln!(f, "{pad}  href: {}", yaml_scalar(href))?;
        }
        if !node.children.is_empty() {
            writeln!(f, "{pad}  items:")?;
            for &child in &node.children {
                self.fmt_node(f, child, indent + INDENT)?;
            }
        }
        Ok(())
    }
}

/// Serializes to `toc.yml`: one `- name:` block per node, optional `href:`,
/// nested `items:` two spaces deeper per level.
impl fmt::Display for TocTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &child in &self.node(self.root()).children {
            self.fmt_node(f, child, 0)?;
        }
        Ok(())
    }
}

/// Build a tree from `(path, title)` pairs in the given order.
///
/// Title collisions are kept (last writer wins) but reported as warnings.
pub fn synthesize<'a, I>(documents: I, logger: &Logger) -> Result<TocTree>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut tree = TocTree::new();
    for (path, title) in documents {
        let placement = tree.add_document(path, title)?;
        if let Some(previous) = placement.replaced {
            logger.warning(format!(
                "Duplicate TOC title \"{}\": {path} replaces {previous}",
                tree.title_path(placement.node).join(" > ")
            ));
        }
    }
    debug!(nodes = tree.len(), "TOC synthesized");
    Ok(tree)
}

/// Synthesize the manual's TOC from document files under `manual_root` and
/// write it to `toc_path`.
#[instrument(skip_all, fields(documents = files.len()))]
pub fn write_manual_toc(
    manual_root: &Path,
    files: &[PathBuf],
    toc_path: &Path,
    logger: &Logger,
) -> Result<TocTree> {
    let mut documents = Vec::with_capacity(files.len());
    for file in files {
        let href = fsops::relative_slash_path(manual_root, file).ok_or_else(|| {
            DokuError::toc(format!(
                "{} is outside the manual root {}",
                file.display(),
                manual_root.display()
            ))
        })?;
        documents.push((href, document_title(file)?));
    }

    let tree = synthesize(
        documents.iter().map(|(href, title)| (href.as_str(), title.as_str())),
        logger,
    )?;
    fsops::write_text(toc_path, &tree.to_string(), logger)?;
    Ok(tree)
}

/// Validate a manual-relative path and normalize its separators.
fn normalize_document_path(path: &str) -> Result<String> {
    let normalized = path.replace('\\', "/");

    if normalized.trim().is_empty() {
        return Err(DokuError::toc("document path is empty"));
    }
    if normalized.starts_with('/') || Path::new(path).has_root() || has_drive_prefix(&normalized) {
        return Err(DokuError::toc(format!("document path {path} must be relative")));
    }
    if normalized
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(DokuError::toc(format!("document path {path} is malformed")));
    }

    Ok(normalized)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Quote a YAML scalar only when leaving it bare would change its meaning.
fn yaml_scalar(value: &str) -> String {
    let needs_quotes = value.contains(": ")
        || value.contains(" #")
        || value.ends_with(':')
        || value.starts_with(|c: char| "-?:,[]{}#&*!|>'\"%@`".contains(c) || c.is_whitespace())
        || value.ends_with(char::is_whitespace);

    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doku_shared::{LogLevel, Severity};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn logger() -> Logger {
        Logger::new(LogLevel::Verbose)
    }

    fn children_titles<'a>(tree: &'a TocTree, id: NodeId) -> Vec<&'a str> {
        tree.node(id)
            .children()
            .iter()
            .map(|&c| tree.node(c).title.as_str())
            .collect()
    }

    fn scenario() -> Vec<(&'static str, &'static str)> {
        vec![
            ("index.md", "Index"),
            ("guide/setup.md", "Setup"),
            ("guide/advanced/tuning.md", "Tuning"),
        ]
    }

    #[test]
    fn nested_directories_become_link_less_nodes() {
        let tree = synthesize(scenario(), &logger()).unwrap();

        assert_eq!(children_titles(&tree, tree.root()), vec!["Index", "Guide"]);

        let guide = tree.find_child(tree.root(), "Guide").unwrap();
        assert_eq!(tree.node(guide).href, None);
        assert_eq!(children_titles(&tree, guide), vec!["Setup", "Advanced"]);

        let advanced = tree.find_child(guide, "Advanced").unwrap();
        let tuning = tree.find_child(advanced, "Tuning").unwrap();
        assert_eq!(tree.node(tuning).href.as_deref(), Some("guide/advanced/tuning.md"));
        assert_eq!(tree.title_path(tuning), vec!["Guide", "Advanced", "Tuning"]);
    }

    #[test]
    fn serializes_with_two_space_indentation() {
        let tree = synthesize(scenario(), &logger()).unwrap();
        let expected = "\
- name: Index
  href: index.md
- name: Guide
  items:
  - name: Setup
    href: guide/setup.md
  - name: Advanced
    items:
    - name: Tuning
      href: guide/advanced/tuning.md
";
        assert_eq!(tree.to_string(), expected);
    }

    #[test]
    fn leaf_and_directory_counts() {
        let docs = vec![
            ("a/b/one.md", "One"),
            ("a/b/two.md", "Two"),
            ("a/three.md", "Three"),
            ("c/four.md", "Four"),
        ];
        let tree = synthesize(docs, &logger()).unwrap();

        let linked = (1..=tree.len())
            .filter(|&i| tree.node(NodeId(i)).href.is_some())
            .count();
        assert_eq!(linked, 4);
        // a, a/b, c
        assert_eq!(tree.len() - linked, 3);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let docs = vec![
            ("z/last.md", "Last"),
            ("a/first.md", "First"),
            ("z/deeper/x.md", "X"),
        ];
        let a = synthesize(docs.clone(), &logger()).unwrap();
        let b = synthesize(docs, &logger()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), b.to_string());
    }

    #[test]
    fn duplicate_titles_last_writer_wins_with_warning() {
        let log = logger();
        let docs = vec![("setup.md", "Setup"), ("setup-old.md", "Setup")];
        let tree = synthesize(docs, &log).unwrap();

        assert_eq!(tree.len(), 1);
        let node = tree.find_child(tree.root(), "Setup").unwrap();
        assert_eq!(tree.node(node).href.as_deref(), Some("setup-old.md"));

        let warnings: Vec<_> = log
            .records()
            .into_iter()
            .filter(|r| r.severity == Severity::Warning)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("setup-old.md replaces setup.md"));
    }

    #[test]
    fn document_and_directory_with_same_title_merge() {
        let docs = vec![("guide.md", "Guide"), ("guide/setup.md", "Setup")];
        let tree = synthesize(docs, &logger()).unwrap();

        assert_eq!(children_titles(&tree, tree.root()), vec!["Guide"]);
        let guide = tree.find_child(tree.root(), "Guide").unwrap();
        assert_eq!(tree.node(guide).href.as_deref(), Some("guide.md"));
        assert_eq!(children_titles(&tree, guide), vec!["Setup"]);
    }

    #[test]
    fn directory_nodes_never_gain_links_from_non_documents() {
        let mut tree = TocTree::new();
        let placement = tree.add_document("assets/diagram.svg", "Diagram").unwrap();
        assert_eq!(tree.node(placement.node).href, None);
        assert_eq!(placement.replaced, None);
    }

    #[test]
    fn backslashes_are_normalized() {
        let mut tree = TocTree::new();
        let placement = tree.add_document("guide\\setup.md", "Setup").unwrap();
        assert_eq!(tree.node(placement.node).href.as_deref(), Some("guide/setup.md"));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let mut tree = TocTree::new();
        for bad in ["", "/abs/file.md", "C:/docs/file.md", "a//b.md", "../up.md", "a/./b.md"] {
            let err = tree.add_document(bad, "Title").unwrap_err();
            assert!(matches!(err, DokuError::Toc { .. }), "{bad} should be rejected");
        }
        assert!(tree.add_document("ok.md", "  ").is_err());
        assert!(tree.is_empty());
    }

    #[test]
    fn special_characters_are_quoted() {
        let mut tree = TocTree::new();
        tree.add_document("faq.md", "FAQ: Common Questions").unwrap();
        tree.add_document("plain.md", "Plain Title").unwrap();
        assert_eq!(
            tree.to_string(),
            "- name: \"FAQ: Common Questions\"\n  href: faq.md\n- name: Plain Title\n  href: plain.md\n"
        );
    }

    #[test]
    fn write_manual_toc_reads_titles_from_disk() {
        let tmp = TempDir::new().unwrap();
        let manual = tmp.path().join("manual");
        std::fs::create_dir_all(manual.join("guide")).unwrap();
        std::fs::write(manual.join("index.md"), "# Welcome\n").unwrap();
        std::fs::write(manual.join("guide/getting-started.md"), "no heading\n").unwrap();

        let files = vec![manual.join("index.md"), manual.join("guide/getting-started.md")];
        let toc_path = manual.join("toc.yml");
        write_manual_toc(&manual, &files, &toc_path, &logger()).unwrap();

        let written = std::fs::read_to_string(&toc_path).unwrap();
        assert_eq!(
            written,
            "- name: Welcome\n  href: index.md\n- name: Guide\n  items:\n  - name: Getting Started\n    href: guide/getting-started.md\n"
        );
    }

    #[test]
    fn write_manual_toc_accepts_non_utf8_documents() {
        let tmp = TempDir::new().unwrap();
        let manual = tmp.path().join("manual");
        std::fs::create_dir_all(&manual).unwrap();
        let page = manual.join("café-notes.md");
        std::fs::write(&page, b"Caf\xe9 au lait.\n").unwrap();

        let toc_path = manual.join("toc.yml");
        write_manual_toc(&manual, &[page], &toc_path, &logger()).unwrap();

        let written = std::fs::read_to_string(&toc_path).unwrap();
        assert!(written.starts_with("- name: Café Notes\n"));
    }

    #[test]
    fn write_manual_toc_rejects_files_outside_root() {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("elsewhere.md");
        std::fs::write(&outside, "# X").unwrap();
        let err = write_manual_toc(
            &tmp.path().join("manual"),
            &[outside],
            &tmp.path().join("toc.yml"),
            &logger(),
        )
        .unwrap_err();
        assert!(matches!(err, DokuError::Toc { .. }));
    }
}

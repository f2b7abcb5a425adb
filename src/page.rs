//! Site entries: page/asset classification and page loading.
//!
//! Every path yielded by the site walk is classified exactly once into an
//! [`EntryKind`]. Only [`EntryKind::Page`] paths may be handed to [`Page::load`].

use crate::{
    error::{BuildError, Result},
    frontmatter,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Namespace prefix users may optionally write in `layouts:` entries.
const LAYOUT_PREFIX: &str = "layouts/";

/// What the build does with a site entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Rendered through the template engine.
    Page,
    /// Copied byte-for-byte.
    Asset,
}

/// Suffix rules deciding which files are pages and how their names are derived.
#[derive(Debug, Clone)]
pub struct PageRules {
    extensions: Vec<String>,
    compound_extensions: Vec<String>,
}

impl PageRules {
    pub fn new(extensions: &[String], compound_extensions: &[String]) -> Self {
        let mut compound_extensions = compound_extensions.to_vec();
        // Longest first, so `.html.tmpl` wins over a shorter overlapping suffix
        compound_extensions.sort_by_key(|ext| std::cmp::Reverse(ext.len()));
        Self {
            extensions: extensions.to_vec(),
            compound_extensions,
        }
    }

    /// Classify a path by its file name suffix.
    pub fn classify(&self, path: &Path) -> EntryKind {
        let is_page = file_name(path)
            .is_some_and(|name| self.extensions.iter().any(|ext| name.ends_with(ext.as_str())));

        if is_page {
            EntryKind::Page
        } else {
            EntryKind::Asset
        }
    }

    pub fn is_page(&self, path: &Path) -> bool {
        self.classify(path) == EntryKind::Page
    }

    /// File name without directories or extension.
    ///
    /// Known compound extensions are removed as a unit:
    /// `about.html.tmpl` → `about`, `logo.png` → `logo`.
    pub fn base_name(&self, path: &Path) -> String {
        let Some(name) = file_name(path) else {
            return String::new();
        };

        for ext in &self.compound_extensions {
            if let Some(stem) = name.strip_suffix(ext.as_str())
                && !stem.is_empty()
            {
                return stem.to_owned();
            }
        }

        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_owned())
    }
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

// ============================================================================
// Page
// ============================================================================

/// Recognized frontmatter keys of a page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFrontmatter {
    /// Layout chain; the first entry is the render entry point.
    pub layouts: Vec<String>,

    pub title: Option<String>,

    /// Any other keys, exposed to templates as `page.extra`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PageFrontmatter {
    /// Layout names with any `layouts/` prefix removed.
    pub fn layout_names(&self) -> Vec<&str> {
        self.layouts
            .iter()
            .map(|name| name.strip_prefix(LAYOUT_PREFIX).unwrap_or(name))
            .collect()
    }
}

/// One loaded page source file.
#[derive(Debug, Clone)]
pub struct Page {
    pub path: PathBuf,
    pub frontmatter: PageFrontmatter,
    pub body: String,
}

impl Page {
    /// Read and split a page file.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not classified as a page by `rules`; classification
    /// happens in the walk, so a violation is a caller bug.
    pub fn load(path: &Path, rules: &PageRules) -> Result<Self> {
        assert!(
            rules.is_page(path),
            "Page::load called on non-page path `{}`",
            path.display()
        );

        let text = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
        let extracted = frontmatter::extract::<PageFrontmatter>(&text, path)?;

        Ok(Self {
            path: path.to_path_buf(),
            frontmatter: extracted.frontmatter,
            body: extracted.body,
        })
    }

    /// Template name of the page body: its file name, e.g. `index.html.tmpl`.
    pub fn template_name(&self) -> String {
        file_name(&self.path).unwrap_or_default().to_owned()
    }
}

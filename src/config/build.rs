//! `[build]` section configuration.
//!
//! Contains the source/output directory layout, the clean switch and the
//! suffix rules that decide which files are pages.

use super::defaults;
use crate::page::PageRules;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// `[build]` section in fresco.toml - build pipeline configuration.
///
/// # Example
/// ```toml
/// [build]
/// site = "site"            # Source tree
/// output = "public"        # Output tree
/// partials = "partials"    # Shared fragments, registered as partials/<name>
/// layouts = "layouts"      # Page wrappers, registered as layouts/<name>
/// clean = true
/// ```
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Project root directory (usually set via CLI `--root`).
    #[serde(default = "defaults::build::root")]
    #[educe(Default = defaults::build::root())]
    pub root: Option<PathBuf>,

    /// Site source directory; every file below it is a page or an asset.
    #[serde(default = "defaults::build::site")]
    #[educe(Default = defaults::build::site())]
    pub site: PathBuf,

    /// Build output directory.
    #[serde(default = "defaults::build::output")]
    #[educe(Default = defaults::build::output())]
    pub output: PathBuf,

    /// Partials directory (files directly under it).
    #[serde(default = "defaults::build::partials")]
    #[educe(Default = defaults::build::partials())]
    pub partials: PathBuf,

    /// Layouts directory (files directly under it).
    #[serde(default = "defaults::build::layouts")]
    #[educe(Default = defaults::build::layouts())]
    pub layouts: PathBuf,

    /// Remove and recreate the output directory before each build.
    #[serde(default = "defaults::r#true")]
    #[educe(Default = true)]
    pub clean: bool,

    /// File name suffixes that mark a page.
    #[serde(default = "defaults::build::page_extensions")]
    #[educe(Default = defaults::build::page_extensions())]
    pub page_extensions: Vec<String>,

    /// Multi-part suffixes stripped as a unit when deriving names.
    #[serde(default = "defaults::build::compound_extensions")]
    #[educe(Default = defaults::build::compound_extensions())]
    pub compound_extensions: Vec<String>,
}

impl BuildConfig {
    pub fn page_rules(&self) -> PageRules {
        PageRules::new(&self.page_extensions, &self.compound_extensions)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Site building orchestration.
//!
//! # Architecture
//!
//! ```text
//! build_site()
//!     │
//!     ├── prepare_output()        clean + recreate the output root
//!     │
//!     ├── register_partials()     shared, read-only for this pass
//!     │
//!     └── SitePaths (walk) ──► classify
//!             │
//!             ├── Page  ──► load ─► extend_with_layouts ─► register_page ─► render
//!             │
//!             └── Asset ──► copy
//! ```
//!
//! A pass is synchronous and all-or-nothing: the first failing entry stops the
//! walk and is returned with its path. Files written before it stay on disk.

use crate::{
    config::{SiteConfig, SiteMeta},
    debug,
    error::BuildError,
    log,
    page::{EntryKind, Page, PageFrontmatter, PageRules},
    pathmap::map_path,
    template::TemplateSet,
};
use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use walkdir::WalkDir;

/// Counts of processed entries for one build pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub pages: usize,
    pub assets: usize,
}

/// Build the entire site from `config.build.site` into `config.build.output`.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport> {
    let start = Instant::now();
    let build = &config.build;
    let rules = build.page_rules();

    prepare_output(&build.site, &build.output, build.clean)?;

    debug!("build"; "loading partials from {}", build.partials.display());
    let partials = TemplateSet::register_partials(&build.partials, &rules)
        .context("Failed to load partials")?;
    if partials.is_empty() {
        debug!("build"; "no partials in {}", build.partials.display());
    } else {
        debug!("build"; "{} partials registered", partials.len());
    }

    let skip = [&build.partials, &build.layouts, &build.output];
    let mut paths = SitePaths::new(&build.site, &skip);
    let mut report = BuildReport::default();

    for path in paths.by_ref() {
        let kind = rules.classify(&path);
        let target = map_path(&path, &build.site, &build.output, kind, &rules)?;

        match kind {
            EntryKind::Page => {
                debug!("page"; "{}", path.display());
                render_page(&path, &target, &partials, &rules, config)
                    .with_context(|| format!("failed to process page `{}`", path.display()))?;
                report.pages += 1;
            }
            EntryKind::Asset => {
                debug!("asset"; "{}", path.display());
                copy_asset(&path, &target)
                    .with_context(|| format!("failed to process asset `{}`", path.display()))?;
                report.assets += 1;
            }
        }
    }

    paths.finish().context("Failed to iterate site paths")?;

    log!(
        "build";
        "{} pages, {} assets in {}ms",
        report.pages,
        report.assets,
        start.elapsed().as_millis()
    );
    Ok(report)
}

/// Make sure the output root exists, emptying it first when `clean` is set.
fn prepare_output(site: &Path, output: &Path, clean: bool) -> Result<()> {
    if clean {
        if site.starts_with(output) {
            bail!(
                "refusing to clean `{}`: it contains the site directory",
                output.display()
            );
        }
        match fs::remove_dir_all(output) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(BuildError::io(output, err))
                    .context("Failed to clear output directory");
            }
        }
    }

    fs::create_dir_all(output)
        .map_err(|err| BuildError::io(output, err))
        .context("Failed to create output directory")?;
    Ok(())
}

// ============================================================================
// Site Walk
// ============================================================================

/// File paths under the site root in walk order.
///
/// Directories are descended into but never yielded. A traversal error ends
/// the iteration and is reported by [`SitePaths::finish`].
pub struct SitePaths {
    walker: Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>>,
    error: Option<walkdir::Error>,
}

impl SitePaths {
    /// Walk `root`, skipping any directory listed in `skip`.
    pub fn new(root: &Path, skip: &[&PathBuf]) -> Self {
        let skip: Vec<PathBuf> = skip.iter().map(|p| p.to_path_buf()).collect();
        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                !(entry.file_type().is_dir() && skip.iter().any(|s| s == entry.path()))
            });

        Self {
            walker: Box::new(walker),
            error: None,
        }
    }

    /// Report the traversal error that ended the walk, if any.
    pub fn finish(self) -> Result<(), BuildError> {
        match self.error {
            Some(err) => Err(BuildError::Walk(err)),
            None => Ok(()),
        }
    }
}

impl Iterator for SitePaths {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.error.is_some() {
            return None;
        }

        loop {
            match self.walker.next()? {
                Ok(entry) if entry.file_type().is_dir() => continue,
                Ok(entry) => return Some(entry.into_path()),
                Err(err) => {
                    self.error = Some(err);
                    return None;
                }
            }
        }
    }
}

// ============================================================================
// Pages and Assets
// ============================================================================

/// Data handed to the template engine for every page.
#[derive(Serialize)]
struct RenderContext<'a> {
    site: &'a SiteMeta,
    page: PageContext<'a>,
}

#[derive(Serialize)]
struct PageContext<'a> {
    /// Name of the page body template, for `{{> (lookup page "template")}}`.
    template: String,
    /// Source path relative to the site root, `/`-separated.
    path: String,
    title: Option<&'a str>,
    layouts: &'a [String],
    extra: &'a BTreeMap<String, serde_json::Value>,
}

impl<'a> PageContext<'a> {
    fn new(page: &'a Page, site_root: &Path) -> Self {
        let PageFrontmatter {
            layouts,
            title,
            extra,
        } = &page.frontmatter;

        let relative = page.path.strip_prefix(site_root).unwrap_or(&page.path);
        let path = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        Self {
            template: page.template_name(),
            path,
            title: title.as_deref(),
            layouts,
            extra,
        }
    }
}

fn render_page(
    source: &Path,
    target: &Path,
    partials: &TemplateSet,
    rules: &PageRules,
    config: &SiteConfig,
) -> Result<(), BuildError> {
    let page = Page::load(source, rules)?;

    let layouts = page.frontmatter.layout_names();
    let (templates, render_name) = partials
        .extend_with_layouts(&layouts, &config.build.layouts, rules)?
        .register_page(&page)?;

    let context = RenderContext {
        site: &config.site,
        page: PageContext::new(&page, &config.build.site),
    };

    let mut writer = create_output(target)?;
    templates.render_to(&render_name, &context, &mut writer)?;
    writer.flush().map_err(|err| BuildError::io(target, err))
}

fn copy_asset(source: &Path, target: &Path) -> Result<(), BuildError> {
    ensure_parent(target)?;
    fs::copy(source, target).map_err(|err| BuildError::io(target, err))?;
    Ok(())
}

fn create_output(target: &Path) -> Result<BufWriter<fs::File>, BuildError> {
    ensure_parent(target)?;
    let file = fs::File::create(target).map_err(|err| BuildError::io(target, err))?;
    Ok(BufWriter::new(file))
}

fn ensure_parent(target: &Path) -> Result<(), BuildError> {
    match target.parent() {
        Some(dir) => fs::create_dir_all(dir).map_err(|err| BuildError::io(dir, err)),
        None => Ok(()),
    }
}

// ============================================================================
// Tests
// ============================================================================

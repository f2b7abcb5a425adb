//! Named template registry.
//!
//! A [`TemplateSet`] is built in three stages per page:
//!
//! ```text
//! register_partials()      partials/<name>   shared by every page of one build
//!        │
//!        ▼  (copy)
//! extend_with_layouts()    layouts/<name>    scoped to one page
//!        │
//!        ▼
//! register_page()          <file name>       the page body; yields the render name
//! ```
//!
//! Extending never touches the base set: `extend_with_layouts` takes `&self`
//! and returns a new set, so layout names cannot leak into the shared partials
//! or into another page's extension.

use crate::{
    error::{BuildError, Result},
    page::{Page, PageRules},
};
use handlebars::Handlebars;
use serde::Serialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const PARTIAL_NAMESPACE: &str = "partials";
pub const LAYOUT_NAMESPACE: &str = "layouts";

#[derive(Clone)]
pub struct TemplateSet {
    registry: Handlebars<'static>,
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("names", &self.names())
            .finish()
    }
}

impl TemplateSet {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        // Partials render exactly as written, without re-indentation
        registry.set_prevent_indent(true);
        Self { registry }
    }

    /// Register every file directly under `dir` as `partials/<base name>`.
    ///
    /// A missing directory yields an empty set.
    pub fn register_partials(dir: &Path, rules: &PageRules) -> Result<Self> {
        let mut set = Self::new();
        for path in list_files(dir)? {
            let name = namespaced(PARTIAL_NAMESPACE, &rules.base_name(&path));
            set.add_file(name, &path)?;
        }
        Ok(set)
    }

    /// Copy this set and add the named layouts resolved under `layouts_dir`.
    pub fn extend_with_layouts(
        &self,
        names: &[&str],
        layouts_dir: &Path,
        rules: &PageRules,
    ) -> Result<Self> {
        let mut set = self.clone();
        for name in names {
            let path = resolve_layout(name, layouts_dir, rules)?;
            let name = namespaced(LAYOUT_NAMESPACE, &rules.base_name(&path));
            set.add_file(name, &path)?;
        }
        Ok(set)
    }

    /// Add the page body and pick the name to execute.
    ///
    /// The render name is `layouts/<first layout>` when the page declares
    /// layouts, otherwise the page's own template name.
    pub fn register_page(mut self, page: &Page) -> Result<(Self, String)> {
        let page_name = page.template_name();
        self.add(page_name.clone(), &page.body)?;

        let render_name = match page.frontmatter.layout_names().first() {
            Some(layout) => namespaced(LAYOUT_NAMESPACE, layout),
            None => page_name,
        };
        Ok((self, render_name))
    }

    /// Render `name` with `context` into `writer`.
    pub fn render_to<T, W>(&self, name: &str, context: &T, writer: W) -> Result<()>
    where
        T: Serialize,
        W: io::Write,
    {
        self.registry
            .render_to_write(name, context, writer)
            .map_err(|source| BuildError::Render {
                name: name.to_owned(),
                source: Box::new(source),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self
            .registry
            .get_templates()
            .keys()
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.registry.get_templates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add_file(&mut self, name: String, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path).map_err(|err| BuildError::io(path, err))?;
        self.add(name, &text)
    }

    fn add(&mut self, name: String, text: &str) -> Result<()> {
        if self.contains(&name) {
            return Err(BuildError::DuplicateName { name });
        }
        self.registry
            .register_template_string(&name, text)
            .map_err(|source| BuildError::TemplateParse {
                name,
                source: Box::new(source),
            })
    }
}

fn namespaced(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// Find the single file under `dir` whose base name is `name`.
pub fn resolve_layout(name: &str, dir: &Path, rules: &PageRules) -> Result<PathBuf> {
    let mut matches: Vec<PathBuf> = list_files(dir)?
        .into_iter()
        .filter(|path| rules.base_name(path) == name)
        .collect();

    match matches.len() {
        0 => Err(BuildError::LayoutNotFound {
            name: name.to_owned(),
            dir: dir.to_path_buf(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(BuildError::AmbiguousLayout {
            name: name.to_owned(),
            matches,
        }),
    }
}

/// Files directly under `dir`, sorted by path. Missing directory → empty.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(BuildError::io(dir, err)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|err| BuildError::io(dir, err))?.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

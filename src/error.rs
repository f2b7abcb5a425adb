//! Build pipeline error types.
//!
//! Component-level failures carry the offending path or template name.
//! The build orchestrator adds per-entry context on top via `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("IO error at `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid frontmatter in `{path}`")]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },

    #[error("frontmatter block in `{path}` is never closed")]
    UnterminatedFrontmatter { path: PathBuf },

    #[error("template `{name}` is already registered")]
    DuplicateName { name: String },

    #[error("layout `{name}` matches more than one file: {}", display_paths(.matches))]
    AmbiguousLayout { name: String, matches: Vec<PathBuf> },

    #[error("layout `{name}` not found in `{dir}`")]
    LayoutNotFound { name: String, dir: PathBuf },

    #[error("failed to parse template `{name}`")]
    TemplateParse {
        name: String,
        #[source]
        source: Box<handlebars::TemplateError>,
    },

    #[error("failed to render template `{name}`")]
    Render {
        name: String,
        #[source]
        source: Box<handlebars::RenderError>,
    },

    #[error("failed to walk site tree")]
    Walk(#[from] walkdir::Error),

    #[error("`{path}` is not inside `{root}`")]
    OutsideRoot { path: PathBuf, root: PathBuf },
}

impl BuildError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("`{}`", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;

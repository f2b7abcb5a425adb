//! Source path → output path mapping.
//!
//! ```text
//! site/images/logo.png        → public/images/logo.png   (asset, verbatim)
//! site/blog/post.html.tmpl    → public/blog/post.html    (page)
//! site/about.gohtml           → public/about.html        (page)
//! ```

use crate::{
    error::{BuildError, Result},
    page::{EntryKind, PageRules},
};
use std::path::{Path, PathBuf};

/// Extension of every rendered page.
pub const RENDERED_EXTENSION: &str = "html";

/// Compute where `source` lands under `target_root`.
///
/// Pure: no filesystem access. The relative directory of `source` under
/// `site_root` is preserved; pages additionally get their (possibly compound)
/// extension replaced with [`RENDERED_EXTENSION`].
pub fn map_path(
    source: &Path,
    site_root: &Path,
    target_root: &Path,
    kind: EntryKind,
    rules: &PageRules,
) -> Result<PathBuf> {
    let relative = source
        .strip_prefix(site_root)
        .map_err(|_| BuildError::OutsideRoot {
            path: source.to_path_buf(),
            root: site_root.to_path_buf(),
        })?;

    Ok(match kind {
        EntryKind::Asset => target_root.join(relative),
        EntryKind::Page => {
            let file_name = format!("{}.{RENDERED_EXTENSION}", rules.base_name(relative));
            match relative.parent() {
                Some(dir) => target_root.join(dir).join(file_name),
                None => target_root.join(file_name),
            }
        }
    })
}

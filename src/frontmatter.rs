//! Frontmatter extraction.
//!
//! A frontmatter block sits at the very top of a file and is fenced by lines
//! made only of `-` characters (at least three):
//!
//! ```text
//! ---
//! layouts: [base]
//! title: Home
//! ---
//! {{#if page.title}}...{{/if}}
//! ```
//!
//! The block is decoded as YAML into any `Default + Deserialize` record.
//! Files without an opening fence have no frontmatter; the whole input is the body.

use crate::error::{BuildError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

const DELIMITER_CHAR: char = '-';
const MIN_DELIMITER_LEN: usize = 3;

/// Header record plus the remaining body text.
#[derive(Debug, Default, PartialEq)]
pub struct Extracted<T> {
    pub frontmatter: T,
    pub body: String,
}

/// Check whether a line is a frontmatter fence (`---`, `-----`, ...).
pub fn is_delimiter_line(line: &str) -> bool {
    line.len() >= MIN_DELIMITER_LEN && line.chars().all(|c| c == DELIMITER_CHAR)
}

/// Split `text` into a decoded header record and its body.
///
/// The body is newline-normalized: every line is re-emitted with a trailing `\n`.
/// `path` only labels errors.
pub fn extract<T>(text: &str, path: &Path) -> Result<Extracted<T>>
where
    T: DeserializeOwned + Default,
{
    let mut lines = text.lines();

    let has_header = text.lines().next().is_some_and(is_delimiter_line);
    if !has_header {
        return Ok(Extracted {
            frontmatter: T::default(),
            body: normalize(lines),
        });
    }

    lines.next(); // opening fence
    let mut header = String::new();
    let mut closed = false;
    for line in lines.by_ref() {
        if is_delimiter_line(line) {
            closed = true;
            break;
        }
        header.push_str(line);
        header.push('\n');
    }

    if !closed {
        return Err(BuildError::UnterminatedFrontmatter {
            path: path.to_path_buf(),
        });
    }

    let frontmatter = if header.trim().is_empty() {
        T::default()
    } else {
        serde_yaml_ng::from_str(&header).map_err(|source| BuildError::Frontmatter {
            path: path.to_path_buf(),
            source,
        })?
    };

    Ok(Extracted {
        frontmatter,
        body: normalize(lines),
    })
}

fn normalize<'a>(lines: impl Iterator<Item = &'a str>) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(line);
        body.push('\n');
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Meta {
        #[serde(default)]
        layouts: Vec<String>,
        title: Option<String>,
    }

    fn parse(text: &str) -> Result<Extracted<Meta>> {
        extract(text, Path::new("test.html"))
    }

    #[test]
    fn test_delimiter_line() {
        assert!(is_delimiter_line("---"));
        assert!(is_delimiter_line("--------"));
        assert!(!is_delimiter_line("--"));
        assert!(!is_delimiter_line("--- "));
        assert!(!is_delimiter_line("-+-"));
        assert!(!is_delimiter_line(""));
    }

    #[test]
    fn test_extract_with_header() {
        let text = "---\nlayouts:\n  - base\n  - article\ntitle: Hi\n---\n<p>body</p>\n";
        let result = parse(text).unwrap();

        assert_eq!(result.frontmatter.layouts, vec!["base", "article"]);
        assert_eq!(result.frontmatter.title.as_deref(), Some("Hi"));
        assert_eq!(result.body, "<p>body</p>\n");
    }

    #[test]
    fn test_extract_without_header() {
        let text = "{{> partials/header}}\n<p>hi</p>\n";
        let result = parse(text).unwrap();

        assert_eq!(result.frontmatter, Meta::default());
        assert_eq!(result.body, text);
    }

    #[test]
    fn test_fence_must_come_first() {
        let text = "intro\n---\nlayouts: [base]\n---\n";
        let result = parse(text).unwrap();

        assert!(result.frontmatter.layouts.is_empty());
        assert_eq!(result.body, text);
    }

    #[test]
    fn test_long_fences_and_crlf() {
        let text = "-----\r\nlayouts: [base]\r\n-----\r\nline one\r\nline two";
        let result = parse(text).unwrap();

        assert_eq!(result.frontmatter.layouts, vec!["base"]);
        assert_eq!(result.body, "line one\nline two\n");
    }

    #[test]
    fn test_later_fences_stay_in_body() {
        let text = "---\ntitle: x\n---\na\n---\nb\n";
        let result = parse(text).unwrap();

        assert_eq!(result.body, "a\n---\nb\n");
    }

    #[test]
    fn test_empty_header() {
        let result = parse("---\n---\nbody\n").unwrap();
        assert_eq!(result.frontmatter, Meta::default());
        assert_eq!(result.body, "body\n");
    }

    #[test]
    fn test_malformed_header() {
        let err = parse("---\nlayouts: [base\n---\n").unwrap_err();
        assert!(matches!(err, BuildError::Frontmatter { .. }));
    }

    #[test]
    fn test_unterminated_header() {
        let err = parse("---\nlayouts: [base]\nbody\n").unwrap_err();
        assert!(matches!(err, BuildError::UnterminatedFrontmatter { .. }));
    }
}

//! Default values for configuration fields.
//!
//! These functions are used by serde for default deserialization.

// ============================================================================
// Common Defaults
// ============================================================================

pub fn r#true() -> bool {
    true
}

// ============================================================================
// [site] Section Defaults
// ============================================================================

pub mod site {
    pub fn name() -> String {
        "my site".into()
    }
}

// ============================================================================
// [build] Section Defaults
// ============================================================================

pub mod build {
    use std::path::PathBuf;

    pub fn root() -> Option<PathBuf> {
        None
    }

    pub fn site() -> PathBuf {
        "site".into()
    }

    pub fn output() -> PathBuf {
        "public".into()
    }

    pub fn partials() -> PathBuf {
        "partials".into()
    }

    pub fn layouts() -> PathBuf {
        "layouts".into()
    }

    pub fn page_extensions() -> Vec<String> {
        [".html", ".tmpl", ".gohtml", ".hbs"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn compound_extensions() -> Vec<String> {
        [".html.tmpl", ".html.hbs", ".go.html"]
            .into_iter()
            .map(String::from)
            .collect()
    }
}

// ============================================================================
// [serve] Section Defaults
// ============================================================================

pub mod serve {
    pub fn interface() -> String {
        "127.0.0.1".into()
    }

    pub fn port() -> u16 {
        8080
    }

    pub fn debounce_ms() -> u64 {
        1000
    }
}

//! Site configuration management for `fresco.toml`.
//!
//! # Sections
//!
//! | Section     | Purpose                                              |
//! |-------------|------------------------------------------------------|
//! | `[site]`    | Metadata exposed to templates (`site.name`)          |
//! | `[build]`   | Site/output/partials/layouts paths, page suffixes    |
//! | `[serve]`   | Development server (port, interface, watch)          |
//!
//! The config file is optional; without it every field takes its default.
//!
//! # Example
//!
//! ```toml
//! [site]
//! name = "Field Notes"
//!
//! [build]
//! site = "site"
//! output = "public"
//!
//! [serve]
//! port = 8080
//! debounce_ms = 1000
//! ```

mod build;
pub mod defaults;
mod error;
mod serve;
mod site;

pub use error::ConfigError;
pub use site::SiteMeta;

use build::BuildConfig;
use serve::ServeConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    net::IpAddr,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing fresco.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Site metadata
    #[serde(default)]
    pub site: SiteMeta,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Load the config file named by the CLI, or defaults when it doesn't exist.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli.root.as_deref().unwrap_or(Path::new("./"));
        let config_path = root.join(&cli.config);

        let mut config = if config_path.exists() {
            Self::from_path(&config_path)?
        } else {
            Self::default()
        };
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| self.get_root().to_owned());

        let build_args = cli.build_args();
        Self::update_option(&mut self.build.clean, build_args.clean.as_ref());
        Self::update_option(&mut self.build.site, build_args.site.as_ref());
        Self::update_option(&mut self.build.output, build_args.output.as_ref());

        if let Some(Commands::Serve {
            interface,
            port,
            watch,
            ..
        }) = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }

        self.update_path_with_root(&root, &cli.config);
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Resolve all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, root: &Path, config_file: &Path) {
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(config_file));
        self.build.site = Self::normalize_path(&root.join(&self.build.site));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
        self.build.partials = Self::normalize_path(&root.join(&self.build.partials));
        self.build.layouts = Self::normalize_path(&root.join(&self.build.layouts));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.build.page_extensions.is_empty() {
            bail!(ConfigError::Validation(
                "[build.page_extensions] must have at least one element".into()
            ));
        }

        if let Some(ext) = self
            .build
            .page_extensions
            .iter()
            .chain(&self.build.compound_extensions)
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            bail!(ConfigError::Validation(format!(
                "extension `{ext}` must start with `.`"
            )));
        }

        if self.serve.debounce_ms == 0 {
            bail!(ConfigError::Validation(
                "[serve.debounce_ms] must be greater than 0".into()
            ));
        }

        if self.serve.interface.parse::<IpAddr>().is_err() {
            bail!(ConfigError::Validation(format!(
                "[serve.interface] `{}` is not an IP address",
                self.serve.interface
            )));
        }

        if !self.build.site.is_dir() {
            bail!(ConfigError::Validation(format!(
                "site directory `{}` not found",
                self.build.site.display()
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = SiteConfig::from_str("").unwrap();
        assert_eq!(config.build.site, PathBuf::from("site"));
        assert_eq!(config.serve.port, 8080);
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(SiteConfig::from_str("[deploy]\nforce = true").is_err());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = SiteConfig::from_path(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_update_with_cli_resolves_paths() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_str().unwrap();
        let cli = cli(&["fresco", "--root", root, "build", "--output", "dist", "--clean=false"]);

        let mut config = SiteConfig::default();
        config.update_with_cli(&cli);

        let root = dir.path().canonicalize().unwrap();
        assert_eq!(config.get_root(), root);
        assert_eq!(config.build.output, root.join("dist"));
        assert_eq!(config.build.site, root.join("site"));
        assert_eq!(config.build.layouts, root.join("layouts"));
        assert_eq!(config.config_path, root.join("fresco.toml"));
        assert!(!config.build.clean);
    }

    #[test]
    fn test_update_with_cli_serve_overrides() {
        let cli = cli(&["fresco", "serve", "--port", "9000", "--watch=false"]);

        let mut config = SiteConfig::default();
        config.update_with_cli(&cli);

        assert_eq!(config.serve.port, 9000);
        assert!(!config.serve.watch);
    }

    #[test]
    fn test_load_reads_config_file() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("fresco.toml"),
            "[site]\nname = \"Notes\"\n[build]\nsite = \"src\"\n",
        )
        .unwrap();

        let cli = cli(&["fresco", "--root", dir.path().to_str().unwrap(), "build"]);
        let config = SiteConfig::load(&cli).unwrap();

        assert_eq!(config.site.name, "Notes");
        assert_eq!(config.build.site, dir.path().canonicalize().unwrap().join("src"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.build.site = dir.path().to_path_buf();
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.serve.debounce_ms = 0;
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.build.page_extensions = vec!["html".into()];
        assert!(bad.validate().is_err());

        let mut bad = config.clone();
        bad.serve.interface = "localhost:80".into();
        assert!(bad.validate().is_err());

        let mut bad = config;
        bad.build.site = dir.path().join("missing");
        assert!(bad.validate().is_err());
    }
}

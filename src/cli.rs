//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Fresco static site builder CLI
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Project root directory
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Config file name (default: fresco.toml)
    #[arg(short = 'C', long, default_value = "fresco.toml")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// subcommands (default: build)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Build arguments used when no subcommand is given
static DEFAULT_BUILD_ARGS: BuildArgs = BuildArgs {
    clean: None,
    site: None,
    output: None,
};

/// Shared build arguments for Build and Serve commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct BuildArgs {
    /// Remove the output directory before building
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub clean: Option<bool>,

    /// Site source directory (relative to project root)
    #[arg(short, long)]
    pub site: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the site into the output directory
    Build {
        #[command(flatten)]
        build_args: BuildArgs,
    },

    /// Serve the site. Rebuild on change automatically
    Serve {
        #[command(flatten)]
        build_args: BuildArgs,

        /// Interface to bind on
        #[arg(short, long)]
        interface: Option<String>,

        /// The port you should provide
        #[arg(short, long)]
        port: Option<u16>,

        /// enable watch
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },
}

impl Cli {
    pub fn build_args(&self) -> &BuildArgs {
        match &self.command {
            Some(Commands::Build { build_args } | Commands::Serve { build_args, .. }) => build_args,
            None => &DEFAULT_BUILD_ARGS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_build() {
        let cli = Cli::try_parse_from(["fresco", "-v", "build", "--clean=false", "-o", "dist"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Some(Commands::Build { .. })));
        assert_eq!(cli.build_args().clean, Some(false));
        assert_eq!(cli.build_args().output, Some(PathBuf::from("dist")));
        assert_eq!(cli.config, PathBuf::from("fresco.toml"));
    }

    #[test]
    fn test_parse_serve() {
        let cli = Cli::try_parse_from(["fresco", "serve", "--port", "3000", "--watch"]).unwrap();
        match cli.command {
            Some(Commands::Serve { port, watch, .. }) => {
                assert_eq!(port, Some(3000));
                assert_eq!(watch, Some(true));
            }
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn test_bare_invocation_builds() {
        let cli = Cli::try_parse_from(["fresco", "--root", "blog"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.build_args().clean, None);
        assert_eq!(cli.root, Some(PathBuf::from("blog")));
    }

    #[test]
    fn test_unknown_subcommand() {
        assert!(Cli::try_parse_from(["fresco", "deploy"]).is_err());
    }
}

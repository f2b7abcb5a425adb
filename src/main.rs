//! Fresco - a static site builder with layouts, partials and a watch loop.

mod build;
mod cli;
mod config;
mod error;
mod frontmatter;
mod logger;
mod page;
mod pathmap;
mod serve;
mod template;
mod watch;

use anyhow::Result;
use build::build_site;
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use serve::serve_site;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::set_verbose(cli.verbose);

    let config = SiteConfig::load(&cli)?;
    debug!("config"; "root {}", config.get_root().display());
    if config.config_path.exists() {
        debug!("config"; "loaded {}", config.config_path.display());
    }

    match &cli.command {
        Some(Commands::Serve { .. }) => serve_site(&config),
        Some(Commands::Build { .. }) | None => build_site(&config).map(|_| ()),
    }
}

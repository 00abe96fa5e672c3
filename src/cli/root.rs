use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

use super::inspect::{PositionsCommand, StylesheetCommand};
use super::render::RenderCommand;
use modl::config::Settings;

/// Modl - modal dialog lifecycle controller
#[derive(Parser)]
#[command(
    name = "modl",
    version,
    about = "Modal dialog lifecycle controller on a headless document",
    long_about = r#"Modl builds modal dialogs on an in-memory document, drives them through
their open and close transitions, and prints the resulting markup.

Examples:
  modl render --content "<p>Hello</p>"      # Render a dialog and print the HTML
  modl render dialog.yaml --position top     # Render from a configuration file
  modl stylesheet --theme light              # Print the injected stylesheet
  modl positions                             # Print the alignment table"#
)]
pub struct Cli {
    /// Current working directory
    #[arg(short = 'c', long = "cwd", global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render a dialog and print the document HTML
    Render(RenderCommand),
    /// Print the dialog stylesheet for a theme
    Stylesheet(StylesheetCommand),
    /// Print the position to alignment table
    Positions(PositionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        // Change working directory if specified
        if let Some(cwd) = &self.cwd {
            std::env::set_current_dir(cwd)
                .map_err(|e| anyhow::anyhow!("Failed to change directory to {}: {}", cwd.display(), e))?;
            info!("Changed working directory to: {}", cwd.display());
        }

        let settings = Settings::init().await?;
        debug!("Settings initialized");

        match self.command {
            Some(Commands::Render(render)) => render.execute(&settings).await,
            Some(Commands::Stylesheet(stylesheet)) => stylesheet.execute(&settings).await,
            Some(Commands::Positions(positions)) => positions.execute().await,
            None => {
                Self::command().print_help()?;
                Ok(())
            }
        }
    }
}

use anyhow::Result;
use clap::Args;
use tracing::{debug, warn};

use modl::config::Settings;
use modl::dialog::{styles, theme, Position};

/// Print the stylesheet injected for a theme
#[derive(Debug, Args)]
pub struct StylesheetCommand {
    /// Theme name; unknown names fall back to the light palette
    #[arg(short, long)]
    pub theme: Option<String>,
}

impl StylesheetCommand {
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        debug!("Executing stylesheet command");

        let name = self
            .theme
            .as_deref()
            .or(settings.theme.as_deref())
            .unwrap_or(theme::LIGHT);

        let table = settings.theme_table();
        if !table.contains(name) {
            warn!("Unknown theme '{}', using the light palette", name);
        }

        print!("{}", styles::stylesheet(table.resolve(name)));
        Ok(())
    }
}

/// Print the position to alignment table
#[derive(Debug, Args)]
pub struct PositionsCommand {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl PositionsCommand {
    pub async fn execute(&self) -> Result<()> {
        debug!("Executing positions command");

        if self.json {
            println!("{}", serde_json::to_string_pretty(&positions_json())?);
            return Ok(());
        }

        println!("{:<14}{:<18}{}", "POSITION", "JUSTIFY-CONTENT", "ALIGN-ITEMS");
        for position in Position::ALL {
            let alignment = position.alignment();
            println!(
                "{:<14}{:<18}{}",
                position.as_str(),
                alignment.horizontal.as_css(),
                alignment.vertical.as_css()
            );
        }
        Ok(())
    }
}

fn positions_json() -> serde_json::Value {
    Position::ALL
        .iter()
        .map(|position| {
            let alignment = position.alignment();
            serde_json::json!({
                "position": position.as_str(),
                "justifyContent": alignment.horizontal.as_css(),
                "alignItems": alignment.vertical.as_css(),
            })
        })
        .collect()
}

use anyhow::{anyhow, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use modl::config::{load_dialog_config, Settings};
use modl::dialog::{styles, DialogConfig, DialogEvent, Position};
use modl::runtime::DialogRuntime;
use modl::surface::{HeadlessDocument, LayoutMetrics};

/// Open a dialog on a headless document and print the resulting HTML
#[derive(Debug, Args)]
pub struct RenderCommand {
    /// Dialog configuration file (JSON, or YAML with a .yaml/.yml extension)
    pub config: Option<PathBuf>,

    /// Content markup, inserted verbatim
    #[arg(long)]
    pub content: Option<String>,

    /// Anchor position, e.g. center or top-left
    #[arg(short, long)]
    pub position: Option<Position>,

    /// Dialog width in pixels
    #[arg(short, long)]
    pub width: Option<u32>,

    /// Theme name
    #[arg(short, long)]
    pub theme: Option<String>,

    /// Extra class for the dialog element (repeatable)
    #[arg(long = "class")]
    pub classes: Vec<String>,

    /// Animation duration (milliseconds or e.g. "250ms")
    #[arg(long, value_parser = parse_duration_arg)]
    pub duration: Option<Duration>,

    /// Render without the close button
    #[arg(long)]
    pub no_close_button: bool,

    /// Do not close when the backdrop is clicked
    #[arg(long)]
    pub no_overlay: bool,

    /// Disable the open/close transition
    #[arg(long)]
    pub no_animation: bool,

    /// Viewport height of the headless document
    #[arg(long)]
    pub viewport_height: Option<f64>,

    /// Simulated rendered height of the dialog, for the anchoring check
    #[arg(long)]
    pub dialog_height: Option<f64>,

    /// Leave the dialog open instead of closing it after printing
    #[arg(long)]
    pub keep_open: bool,
}

impl RenderCommand {
    pub async fn execute(&self, settings: &Settings) -> Result<()> {
        debug!("Executing render command");

        let config = self.dialog_config(settings).await?;
        let viewport_height = self.viewport_height.unwrap_or(settings.viewport_height);
        if !viewport_height.is_finite() || viewport_height <= 0.0 {
            return Err(anyhow!("viewport height must be a positive number"));
        }

        let mut document = HeadlessDocument::new(viewport_height);
        if let Some(height) = self.dialog_height {
            document.set_class_metrics(styles::DIALOG_CLASS, LayoutMetrics::new(height));
        }

        let (mut runtime, handle) = DialogRuntime::new(document, settings.controller_settings());
        *runtime.themes_mut() = settings.theme_table();
        let mut events = runtime.subscribe();
        let task = runtime.spawn();

        handle.open(config).await?;
        let instance = handle
            .instance()
            .await?
            .ok_or_else(|| anyhow!("Dialog was not opened"))?;
        info!("Rendered {} ({})", instance.id, instance.state);

        println!("{}", handle.snapshot().await?);

        if !self.keep_open {
            handle.close().await?;
        }
        handle.shutdown()?;
        task.await?;

        while let Ok(event) = events.try_recv() {
            eprintln!("{}", describe(&event));
        }

        Ok(())
    }

    async fn dialog_config(&self, settings: &Settings) -> Result<DialogConfig> {
        let path = self.config.as_ref().or(settings.dialog.as_ref());
        let mut config = match path {
            Some(path) => load_dialog_config(path).await?,
            None => DialogConfig::default(),
        };

        if let Some(content) = &self.content {
            config = config.with_content(content.as_str());
        }
        if let Some(position) = self.position {
            config = config.with_position(position);
        }
        if let Some(width) = self.width {
            config = config.with_width(width);
        }
        if let Some(theme) = self.theme.as_ref().or(settings.theme.as_ref()) {
            config = config.with_theme(theme.as_str());
        }
        for class in &self.classes {
            config = config.with_class(class.as_str());
        }
        if let Some(duration) = self.duration {
            config.animation.duration = duration;
        }
        if self.no_close_button {
            config = config.close_button(false);
        }
        if self.no_overlay {
            config = config.overlay(false);
        }
        if self.no_animation {
            config = config.without_animation();
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_duration_arg(value: &str) -> Result<Duration, String> {
    modl::dialog::config::parse_duration(value)
}

/// One line per lifecycle event
fn describe(event: &DialogEvent) -> String {
    match event {
        DialogEvent::Building(id) => format!("{}: building", id),
        DialogEvent::Opened { instance, anchored } => {
            if *anchored {
                format!("{}: open (anchored)", instance)
            } else {
                format!("{}: open", instance)
            }
        }
        DialogEvent::Closing(id) => format!("{}: closing", id),
        DialogEvent::Disposed { instance, forced } => {
            if *forced {
                format!("{}: disposed by fallback timer", instance)
            } else {
                format!("{}: disposed", instance)
            }
        }
        DialogEvent::RequestDropped => "pending open request dropped".to_string(),
    }
}

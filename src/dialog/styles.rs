//! Shared dialog stylesheet
//!
//! All dialogs share one `<style>` block in the document head. The block
//! only depends on the palette, so re-injecting the same palette is a no-op
//! and a new palette rewrites the existing block instead of stacking a
//! conflicting one on top.

use super::theme::Palette;
use crate::surface::{ElementId, RenderSurface, SurfaceResult};
use tracing::debug;

/// Class on the full-viewport backdrop
pub const WRAPPER_CLASS: &str = "modl-wrapper";
/// Class on the dialog surface
pub const DIALOG_CLASS: &str = "modl";
pub const CLOSE_BUTTON_CLASS: &str = "modl-close";
pub const CONTENT_CLASS: &str = "modl-content";
/// Present while the dialog is presented
pub const OPEN_CLASS: &str = "modl-open";
/// Present when the dialog is taller than the viewport and aligned to the top
pub const ANCHORED_CLASS: &str = "modl-anchored";

/// Writes the dialog stylesheet into a render surface
pub trait StyleInjector: Send {
    /// Make sure a stylesheet for `palette` is present in the document head
    fn ensure(&mut self, surface: &mut dyn RenderSurface, palette: &Palette) -> SurfaceResult<()>;
}

/// Build the stylesheet for a palette
pub fn stylesheet(palette: &Palette) -> String {
    format!(
        r#"
.{wrapper} * {{
  box-sizing: border-box;
}}

.{wrapper} {{
  background-color: {wrapper_background};
  display: flex;
  position: fixed;
  top: 0;
  right: 0;
  bottom: 0;
  left: 0;
  overflow-y: auto;
}}

.{wrapper}.{anchored} {{
  align-items: flex-start;
}}

.{dialog} {{
  background-color: {dialog_background};
  color: {text};
  margin: 1.4em;
  padding: 1.5em;
  position: relative;
  border-radius: 5px;
}}

.{dialog}.{open} {{
  opacity: 1;
}}

.{dialog} * {{
  max-width: 100%;
}}

.{close} {{
  background: none;
  border: 0;
  border-radius: 0;
  box-shadow: none;
  color: {close_color};
  font-family: serif;
  font-size: 1.5em;
  height: 1em;
  line-height: 1;
  padding: 0;
  cursor: pointer;
  position: absolute;
  right: 0;
  top: 0;
  width: 1em;
}}
"#,
        wrapper = WRAPPER_CLASS,
        dialog = DIALOG_CLASS,
        close = CLOSE_BUTTON_CLASS,
        open = OPEN_CLASS,
        anchored = ANCHORED_CLASS,
        wrapper_background = palette.wrapper_background,
        dialog_background = palette.dialog_background,
        text = palette.text,
        close_color = palette.close_button,
    )
}

/// Injector that owns a single `<style>` element
#[derive(Debug, Default)]
pub struct StylesheetInjector {
    node: Option<ElementId>,
    palette: Option<Palette>,
}

impl StylesheetInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `<style>` element, once injected
    pub fn node(&self) -> Option<ElementId> {
        self.node
    }
}

impl StyleInjector for StylesheetInjector {
    fn ensure(&mut self, surface: &mut dyn RenderSurface, palette: &Palette) -> SurfaceResult<()> {
        let node = match self.node {
            Some(node) if surface.is_attached(node) => {
                if self.palette.as_ref() == Some(palette) {
                    return Ok(());
                }
                debug!("Rewriting dialog stylesheet for a new palette");
                node
            }
            _ => {
                debug!("Injecting dialog stylesheet");
                let node = surface.create_element("style");
                let head = surface.head();
                surface.append_child(head, node)?;
                self.node = Some(node);
                node
            }
        };

        surface.set_inner_markup(node, &stylesheet(palette))?;
        self.palette = Some(palette.clone());
        Ok(())
    }
}

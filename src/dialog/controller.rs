//! Dialog controller
//!
//! The controller is responsible for:
//! - Owning the single active dialog instance
//! - Building its elements on a render surface
//! - Driving the lifecycle (Building -> Opening -> Open -> Closing -> Disposed)
//! - Serializing open requests through the close of the previous dialog
//!
//! It never blocks and never spawns. Deferred work goes to the [`Host`] as a
//! [`Signal`], and the host hands it back through [`DialogController::handle`].

use super::{
    config::DialogConfig,
    styles::{self, StyleInjector, StylesheetInjector},
    theme::ThemeTable,
    types::*,
};
use crate::surface::{ClickAction, ElementId, Host, ManualLoop, RenderSurface};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Property whose transition ends the close animation
const FADE_PROPERTY: &str = "opacity";

/// Controller tuning knobs
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Arm a timer that disposes the dialog if the close transition never
    /// reports completion
    pub fallback_timer: bool,
    /// Timer length as a multiple of the animation duration
    pub close_timeout_factor: f64,
    /// Added to the scaled duration
    pub close_timeout_grace: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            fallback_timer: true,
            close_timeout_factor: 2.0,
            close_timeout_grace: Duration::from_millis(100),
        }
    }
}

impl ControllerSettings {
    /// Fallback timer length for a transition of `duration`, saturating at
    /// `Duration::MAX`
    pub fn close_timeout(&self, duration: Duration) -> Duration {
        let scaled = duration.as_secs_f64() * self.close_timeout_factor.max(0.0);
        Duration::try_from_secs_f64(scaled)
            .unwrap_or(Duration::MAX)
            .saturating_add(self.close_timeout_grace)
    }
}

/// The live dialog
pub struct DialogInstance {
    id: InstanceId,
    state: DialogState,
    config: DialogConfig,
    wrapper: ElementId,
    dialog: ElementId,
    close_button: Option<ElementId>,
    content: ElementId,
    anchored: bool,
    on_close: Vec<CloseCallback>,
}

impl DialogInstance {
    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn state(&self) -> DialogState {
        self.state
    }

    pub fn config(&self) -> &DialogConfig {
        &self.config
    }

    /// Full-viewport backdrop element
    pub fn wrapper(&self) -> ElementId {
        self.wrapper
    }

    /// Dialog surface element
    pub fn dialog(&self) -> ElementId {
        self.dialog
    }

    pub fn close_button(&self) -> Option<ElementId> {
        self.close_button
    }

    pub fn content(&self) -> ElementId {
        self.content
    }

    /// Whether the anchored (top aligned) presentation was applied
    pub fn is_anchored(&self) -> bool {
        self.anchored
    }
}

impl std::fmt::Debug for DialogInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogInstance")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("wrapper", &self.wrapper)
            .field("dialog", &self.dialog)
            .field("close_button", &self.close_button)
            .field("content", &self.content)
            .field("anchored", &self.anchored)
            .field("on_close", &self.on_close.len())
            .finish()
    }
}

/// An open request waiting for the current dialog to go away
#[derive(Debug)]
struct PendingOpen {
    config: DialogConfig,
    markup: String,
}

/// Single-instance dialog state machine
pub struct DialogController<S, H> {
    surface: S,
    host: H,
    injector: Box<dyn StyleInjector>,
    themes: ThemeTable,
    settings: ControllerSettings,
    current: Option<DialogInstance>,
    pending: Option<PendingOpen>,
    next_id: u64,
    event_sender: Option<mpsc::UnboundedSender<DialogEvent>>,
}

impl<S: RenderSurface, H: Host> DialogController<S, H> {
    /// Create a controller with default settings
    pub fn new(surface: S, host: H) -> Self {
        Self::with_settings(surface, host, ControllerSettings::default())
    }

    pub fn with_settings(surface: S, host: H, settings: ControllerSettings) -> Self {
        Self {
            surface,
            host,
            injector: Box::new(StylesheetInjector::new()),
            themes: ThemeTable::new(),
            settings,
            current: None,
            pending: None,
            next_id: 1,
            event_sender: None,
        }
    }

    /// Replace the style injector
    pub fn with_injector(mut self, injector: Box<dyn StyleInjector>) -> Self {
        self.injector = injector;
        self
    }

    /// Set the sender for lifecycle events
    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<DialogEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn themes(&self) -> &ThemeTable {
        &self.themes
    }

    pub fn themes_mut(&mut self) -> &mut ThemeTable {
        &mut self.themes
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// The active instance, if any
    pub fn instance(&self) -> Option<&DialogInstance> {
        self.current.as_ref()
    }

    /// Lifecycle state of the active instance, `Idle` when there is none
    pub fn state(&self) -> DialogState {
        self.current
            .as_ref()
            .map(|instance| instance.state)
            .unwrap_or(DialogState::Idle)
    }

    /// Whether an open request is waiting for the current dialog to close
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Open a dialog
    ///
    /// With no active dialog the new one is built immediately. Otherwise the
    /// active dialog is closed first and the request is parked until it has
    /// been disposed; a newer request replaces a parked one.
    ///
    /// Content is captured here, so an invalid element reference fails this
    /// call even when the build itself is deferred.
    pub fn open(&mut self, config: DialogConfig) -> DialogResult<()> {
        config.validate()?;
        let markup = config.content.resolve(&self.surface)?;
        let request = PendingOpen { config, markup };

        let state = self.state();
        if !state.is_live() {
            return self.build(request);
        }

        if self.pending.replace(request).is_some() {
            warn!("Replacing a pending dialog open request; the earlier request is dropped");
            self.send_event(DialogEvent::RequestDropped);
        }

        if state == DialogState::Closing {
            debug!("Dialog already closing; open request parked");
            return Ok(());
        }

        debug!("Dialog active ({}); closing it before opening the next one", state);
        self.begin_close()
    }

    /// Close the active dialog
    ///
    /// `on_complete` runs once the dialog has been detached. With no active
    /// dialog it runs immediately. An open request parked behind the active
    /// dialog is dropped.
    pub fn close(&mut self, on_complete: Option<CloseCallback>) -> DialogResult<()> {
        let Some(instance) = self.current.as_mut() else {
            debug!("Close requested with no active dialog");
            if let Some(callback) = on_complete {
                callback();
            }
            return Ok(());
        };

        if let Some(callback) = on_complete {
            instance.on_close.push(callback);
        }
        let closing = instance.state == DialogState::Closing;

        if self.pending.take().is_some() {
            warn!("Close requested; the pending dialog open request is dropped");
            self.send_event(DialogEvent::RequestDropped);
        }

        if closing {
            return Ok(());
        }

        self.begin_close()
    }

    /// Route a click on `target` through the surface's listeners
    pub fn click(&mut self, target: ElementId) -> DialogResult<()> {
        let actions = self.surface.dispatch_click(target);
        // A fading dialog ignores close clicks, so a parked request survives
        if actions.contains(&ClickAction::Close) && self.state() != DialogState::Closing {
            debug!("Click on {} requested close", target);
            self.close(None)?;
        }
        Ok(())
    }

    /// Process a signal delivered by the host
    pub fn handle(&mut self, signal: Signal) -> DialogResult<()> {
        let current = self.current.as_ref().map(|instance| (instance.id, instance.state));
        let Some((id, state)) = current.filter(|(id, _)| *id == signal.instance()) else {
            debug!("Ignoring signal for stale {}", signal.instance());
            return Ok(());
        };

        match signal {
            Signal::Flush { .. } if state == DialogState::Opening => self.present(),
            Signal::TransitionEnd {
                element, property, ..
            } if state == DialogState::Closing => {
                let dialog = self.current.as_ref().map(|instance| instance.dialog);
                if Some(element) == dialog && property == FADE_PROPERTY {
                    self.dispose(false)
                } else {
                    debug!("Ignoring '{}' transition on {}", property, element);
                    Ok(())
                }
            }
            Signal::CloseTimeout { .. } if state == DialogState::Closing => {
                warn!("Close transition of {} never finished; forcing disposal", id);
                self.dispose(true)
            }
            signal => {
                debug!("Ignoring {:?} while {} is {}", signal, id, state);
                Ok(())
            }
        }
    }

    fn build(&mut self, request: PendingOpen) -> DialogResult<()> {
        let PendingOpen { config, markup } = request;
        let id = InstanceId(self.next_id);
        self.next_id += 1;

        debug!("Building {}", id);

        let alignment = config.position.alignment();
        let duration = config.animation.css_duration();
        let effect = config.animation.effect.clone();
        let surface = &mut self.surface;

        let wrapper = surface.create_element("div");
        surface.set_class_name(wrapper, styles::WRAPPER_CLASS)?;
        surface.set_style(wrapper, "transition-property", FADE_PROPERTY)?;
        surface.set_style(wrapper, "transition-duration", &duration)?;
        surface.set_style(wrapper, "transition-timing-function", &effect)?;
        surface.set_style(wrapper, "justify-content", alignment.horizontal.as_css())?;
        surface.set_style(wrapper, "align-items", alignment.vertical.as_css())?;
        surface.set_style(wrapper, "opacity", "0")?;

        let dialog = surface.create_element("div");
        let mut class_name = styles::DIALOG_CLASS.to_string();
        for class in &config.class_names {
            class_name.push(' ');
            class_name.push_str(class);
        }
        surface.set_class_name(dialog, &class_name)?;
        surface.set_style(dialog, "width", &format!("{}px", config.size.width))?;
        surface.set_style(dialog, "max-width", "100%")?;
        surface.set_style(dialog, "transition-property", FADE_PROPERTY)?;
        surface.set_style(dialog, "transition-duration", &duration)?;
        surface.set_style(dialog, "transition-timing-function", &effect)?;
        surface.set_style(dialog, "opacity", "0")?;
        surface.set_style(dialog, "z-index", "20")?;
        surface.append_child(wrapper, dialog)?;

        let close_button = if config.close_button.enabled {
            let button = surface.create_element("button");
            surface.set_class_name(button, styles::CLOSE_BUTTON_CLASS)?;
            surface.set_inner_markup(button, "×")?;
            surface.append_child(dialog, button)?;
            Some(button)
        } else {
            None
        };

        let content = surface.create_element("div");
        surface.set_class_name(content, styles::CONTENT_CLASS)?;
        surface.set_inner_markup(content, &markup)?;
        surface.append_child(dialog, content)?;

        if let Some(button) = close_button {
            surface.add_click_action(button, ClickAction::Close)?;
        }
        if config.overlay.enabled {
            surface.add_click_action(dialog, ClickAction::StopPropagation)?;
            surface.add_click_action(wrapper, ClickAction::Close)?;
        }

        let body = surface.body();
        surface.append_child(body, wrapper)?;

        let palette = self.themes.resolve(&config.theme).clone();
        if let Err(e) = self.injector.ensure(&mut self.surface, &palette) {
            let _ = self.surface.remove(wrapper);
            return Err(e.into());
        }

        self.send_event(DialogEvent::Building(id));
        self.current = Some(DialogInstance {
            id,
            state: DialogState::Opening,
            config,
            wrapper,
            dialog,
            close_button,
            content,
            anchored: false,
            on_close: Vec::new(),
        });

        // The open presentation must not land in the same task as the
        // initial styles, or the opacity transition never starts.
        self.host.defer(Signal::Flush { instance: id });
        Ok(())
    }

    /// Apply the open presentation
    fn present(&mut self) -> DialogResult<()> {
        let Some(instance) = self.current.as_mut() else {
            return Ok(());
        };
        let (id, wrapper, dialog) = (instance.id, instance.wrapper, instance.dialog);
        let surface = &mut self.surface;

        surface.add_class(wrapper, styles::OPEN_CLASS)?;
        surface.add_class(dialog, styles::OPEN_CLASS)?;
        surface.set_style(wrapper, "opacity", "1")?;

        let extent = surface.offset_height(dialog)?
            + css_pixels(surface.computed_style(dialog, "margin-top")?.as_deref())
            + css_pixels(surface.computed_style(dialog, "margin-bottom")?.as_deref());
        let anchored = extent > surface.viewport_height();
        if anchored {
            surface.add_class(wrapper, styles::ANCHORED_CLASS)?;
            surface.add_class(dialog, styles::ANCHORED_CLASS)?;
            surface.set_style(wrapper, "align-items", "flex-start")?;
        }

        surface.set_style(dialog, "opacity", "1")?;

        instance.anchored = anchored;
        instance.state = DialogState::Open;
        info!("Opened {} (anchored: {})", id, anchored);
        self.send_event(DialogEvent::Opened {
            instance: id,
            anchored,
        });
        Ok(())
    }

    /// Apply the close presentation and wait for the fade to finish
    fn begin_close(&mut self) -> DialogResult<()> {
        let Some(instance) = self.current.as_mut() else {
            return Ok(());
        };
        let presented = instance.state == DialogState::Open;
        let (id, wrapper, dialog) = (instance.id, instance.wrapper, instance.dialog);
        let duration = instance.config.animation.effective_duration();
        instance.state = DialogState::Closing;

        info!("Closing {}", id);
        self.send_event(DialogEvent::Closing(id));

        let surface = &mut self.surface;
        for element in [wrapper, dialog] {
            surface.remove_class(element, styles::OPEN_CLASS)?;
            surface.remove_class(element, styles::ANCHORED_CLASS)?;
            surface.set_style(element, "opacity", "0")?;
        }

        // Nothing is fading when the dialog never became visible or runs
        // without a transition, so no completion signal would ever arrive.
        if !presented || duration.is_zero() {
            debug!("No close transition for {}; disposing now", id);
            return self.dispose(false);
        }

        self.host.watch(
            dialog,
            FADE_PROPERTY,
            duration,
            Signal::TransitionEnd {
                instance: id,
                element: dialog,
                property: FADE_PROPERTY.to_string(),
            },
        );
        if self.settings.fallback_timer {
            self.host.defer_after(
                self.settings.close_timeout(duration),
                Signal::CloseTimeout { instance: id },
            );
        }
        Ok(())
    }

    /// Detach the dialog, run close callbacks, then open any parked request
    fn dispose(&mut self, forced: bool) -> DialogResult<()> {
        let Some(mut instance) = self.current.take() else {
            return Ok(());
        };
        instance.state = DialogState::Disposed;
        let id = instance.id;

        if let Err(e) = self.surface.remove(instance.wrapper) {
            warn!("Failed to detach {}: {}", id, e);
        }

        let callbacks = std::mem::take(&mut instance.on_close);
        drop(instance);
        for callback in callbacks {
            callback();
        }

        debug!("Disposed {} (forced: {})", id, forced);
        self.send_event(DialogEvent::Disposed {
            instance: id,
            forced,
        });

        match self.pending.take() {
            Some(request) => self.build(request),
            None => Ok(()),
        }
    }

    /// Send a lifecycle event if an event sender is configured
    fn send_event(&self, event: DialogEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }
}

impl<S: RenderSurface> DialogController<S, ManualLoop> {
    /// Handle every zero-delay signal, including ones queued while handling
    pub fn run_ready(&mut self) -> DialogResult<usize> {
        let mut handled = 0;
        while let Some(signal) = self.host.next_ready() {
            self.handle(signal)?;
            handled += 1;
        }
        Ok(handled)
    }

    /// Finish every watched transition, then drain zero-delay signals
    pub fn finish_transitions(&mut self) -> DialogResult<usize> {
        let mut handled = 0;
        for signal in self.host.finish_transitions() {
            self.handle(signal)?;
            handled += 1;
        }
        Ok(handled + self.run_ready()?)
    }

    /// Move virtual time forward, handle what became due, then drain
    /// zero-delay signals
    pub fn advance(&mut self, by: Duration) -> DialogResult<usize> {
        let mut handled = 0;
        for signal in self.host.advance(by) {
            self.handle(signal)?;
            handled += 1;
        }
        Ok(handled + self.run_ready()?)
    }
}

impl<S, H> std::fmt::Debug for DialogController<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DialogController")
            .field("current", &self.current)
            .field("pending", &self.pending.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Leading integer of a CSS length, `0` when there is none
fn css_pixels(value: Option<&str>) -> f64 {
    let Some(value) = value.map(str::trim) else {
        return 0.0;
    };
    let end = value
        .char_indices()
        .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+'))))
        .map(|(i, _)| i)
        .unwrap_or(value.len());
    value[..end].parse::<i64>().map(|n| n as f64).unwrap_or(0.0)
}

//! Async driver for the dialog controller
//!
//! [`DialogRuntime`] owns a controller over a [`HeadlessDocument`] inside a
//! single tokio task. Callers talk to it through a cloneable [`DialogHandle`];
//! every command and every deferred signal is processed on that one task, so
//! the controller itself never needs locking.

use crate::dialog::{
    CloseCallback, ControllerSettings, DialogConfig, DialogController, DialogEvent, DialogResult,
    DialogState, InstanceId, Signal, ThemeTable,
};
use crate::surface::{ElementId, HeadlessDocument, Scheduler, TransitionNotifier};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Host that delivers signals back to the runtime task
///
/// Zero-delay signals go straight into the channel and are picked up after
/// the current command finishes. Timers and transitions are emulated with
/// `tokio::time::sleep`.
#[derive(Debug, Clone)]
pub struct TokioHost {
    signals: mpsc::UnboundedSender<Signal>,
}

impl TokioHost {
    pub fn new(signals: mpsc::UnboundedSender<Signal>) -> Self {
        Self { signals }
    }

    fn deliver_after(&self, delay: Duration, signal: Signal) {
        let signals = self.signals.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = signals.send(signal);
        });
    }
}

impl Scheduler for TokioHost {
    fn defer(&mut self, signal: Signal) {
        let _ = self.signals.send(signal);
    }

    fn defer_after(&mut self, delay: Duration, signal: Signal) {
        self.deliver_after(delay, signal);
    }
}

impl TransitionNotifier for TokioHost {
    fn watch(&mut self, element: ElementId, property: &str, expected: Duration, signal: Signal) {
        debug!("Emulating '{}' transition on {} for {:?}", property, element, expected);
        self.deliver_after(expected, signal);
    }
}

/// Element handles of the active dialog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceInfo {
    pub id: InstanceId,
    pub state: DialogState,
    pub wrapper: ElementId,
    pub dialog: ElementId,
    pub close_button: Option<ElementId>,
    pub content: ElementId,
    pub anchored: bool,
}

/// Commands sent from handles to the runtime task
enum Command {
    Open {
        config: Box<DialogConfig>,
        reply: oneshot::Sender<DialogResult<()>>,
    },
    Close {
        reply: oneshot::Sender<()>,
    },
    Click {
        target: ElementId,
        reply: oneshot::Sender<DialogResult<()>>,
    },
    Snapshot {
        reply: oneshot::Sender<String>,
    },
    State {
        reply: oneshot::Sender<DialogState>,
    },
    Instance {
        reply: oneshot::Sender<Option<InstanceInfo>>,
    },
    Shutdown,
}

/// Cloneable handle to a running [`DialogRuntime`]
#[derive(Debug, Clone)]
pub struct DialogHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open { .. } => "Open",
            Self::Close { .. } => "Close",
            Self::Click { .. } => "Click",
            Self::Snapshot { .. } => "Snapshot",
            Self::State { .. } => "State",
            Self::Instance { .. } => "Instance",
            Self::Shutdown => "Shutdown",
        };
        f.write_str(name)
    }
}

impl DialogHandle {
    /// Open a dialog; returns once the request has been accepted
    pub async fn open(&self, config: DialogConfig) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Open {
            config: Box::new(config),
            reply,
        })?;
        Ok(Self::receive(rx).await??)
    }

    /// Close the active dialog and wait until it has been detached
    pub async fn close(&self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Close { reply })?;
        Self::receive(rx).await
    }

    /// Click an element of the document
    pub async fn click(&self, target: ElementId) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Click { target, reply })?;
        Ok(Self::receive(rx).await??)
    }

    /// Serialized HTML of the whole document
    pub async fn snapshot(&self) -> Result<String> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        Self::receive(rx).await
    }

    pub async fn state(&self) -> Result<DialogState> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::State { reply })?;
        Self::receive(rx).await
    }

    /// Element handles of the active dialog, if any
    pub async fn instance(&self) -> Result<Option<InstanceInfo>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Instance { reply })?;
        Self::receive(rx).await
    }

    /// Stop the runtime task; pending close waiters are dropped
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Dialog runtime has shut down"))
    }

    async fn receive<T>(rx: oneshot::Receiver<T>) -> Result<T> {
        rx.await
            .map_err(|_| anyhow!("Dialog runtime stopped before replying"))
    }
}

/// Event loop that owns the dialog controller
pub struct DialogRuntime {
    controller: DialogController<HeadlessDocument, TokioHost>,
    signals: mpsc::UnboundedReceiver<Signal>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl DialogRuntime {
    /// Create a runtime and a handle to it
    pub fn new(document: HeadlessDocument, settings: ControllerSettings) -> (Self, DialogHandle) {
        let (signal_tx, signals) = mpsc::unbounded_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();
        let controller = DialogController::with_settings(document, TokioHost::new(signal_tx), settings);

        let runtime = Self {
            controller,
            signals,
            commands,
        };
        (runtime, DialogHandle { commands: command_tx })
    }

    /// Receive lifecycle events from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<DialogEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.controller.set_event_sender(tx);
        rx
    }

    pub fn themes_mut(&mut self) -> &mut ThemeTable {
        self.controller.themes_mut()
    }

    /// Run the event loop on a new task
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the event loop until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        info!("Dialog runtime started");

        loop {
            tokio::select! {
                // Signals first, so a command never observes a state that
                // already has a delivered signal waiting
                biased;

                Some(signal) = self.signals.recv() => {
                    if let Err(e) = self.controller.handle(signal) {
                        warn!("Failed to handle dialog signal: {}", e);
                    }
                }

                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.execute(command),
                },
            }
        }

        info!("Dialog runtime stopped");
    }

    fn execute(&mut self, command: Command) {
        debug!("Runtime command: {:?}", command);

        match command {
            Command::Open { config, reply } => {
                let _ = reply.send(self.controller.open(*config));
            }
            Command::Close { reply } => {
                let callback: CloseCallback = Box::new(move || {
                    let _ = reply.send(());
                });
                if let Err(e) = self.controller.close(Some(callback)) {
                    warn!("Failed to close dialog: {}", e);
                }
            }
            Command::Click { target, reply } => {
                let _ = reply.send(self.controller.click(target));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(self.controller.surface().to_html());
            }
            Command::State { reply } => {
                let _ = reply.send(self.controller.state());
            }
            Command::Instance { reply } => {
                let info = self.controller.instance().map(|instance| InstanceInfo {
                    id: instance.id(),
                    state: instance.state(),
                    wrapper: instance.wrapper(),
                    dialog: instance.dialog(),
                    close_button: instance.close_button(),
                    content: instance.content(),
                    anchored: instance.is_anchored(),
                });
                let _ = reply.send(info);
            }
            Command::Shutdown => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::styles;
    use crate::surface::LayoutMetrics;
    use tokio::time::timeout;

    // Tests run on paused time, so these are virtual durations
    const FAST: Duration = Duration::from_millis(20);
    const LIMIT: Duration = Duration::from_secs(5);

    fn fast_config(content: &str) -> DialogConfig {
        DialogConfig::new()
            .with_content(content)
            .with_animation(FAST, "ease")
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<DialogEvent>) -> DialogEvent {
        timeout(LIMIT, rx.recv())
            .await
            .expect("timed out waiting for a dialog event")
            .expect("event channel closed")
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_open_and_close() {
        let (runtime, handle) = DialogRuntime::new(HeadlessDocument::new(800.0), ControllerSettings::default());
        let task = runtime.spawn();

        handle.open(fast_config("<p>hello</p>")).await.unwrap();
        assert_eq!(handle.state().await.unwrap(), DialogState::Open);

        let html = handle.snapshot().await.unwrap();
        assert!(html.contains("class=\"modl-wrapper modl-open\""));
        assert!(html.contains("<p>hello</p>"));

        timeout(LIMIT, handle.close()).await.unwrap().unwrap();
        assert_eq!(handle.state().await.unwrap(), DialogState::Idle);
        assert!(!handle.snapshot().await.unwrap().contains("class=\"modl-wrapper"));

        handle.shutdown().unwrap();
        task.await.unwrap();
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_close_when_idle_returns_immediately() {
        let (runtime, handle) = DialogRuntime::new(HeadlessDocument::default(), ControllerSettings::default());
        runtime.spawn();

        timeout(Duration::from_millis(500), handle.close())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_replacement_through_handle() {
        let (mut runtime, handle) = DialogRuntime::new(HeadlessDocument::new(800.0), ControllerSettings::default());
        let mut events = runtime.subscribe();
        runtime.spawn();

        handle.open(fast_config("A")).await.unwrap();
        handle.open(fast_config("B")).await.unwrap();

        let first = match next_event(&mut events).await {
            DialogEvent::Building(id) => id,
            other => panic!("unexpected event {:?}", other),
        };
        assert_eq!(
            next_event(&mut events).await,
            DialogEvent::Opened { instance: first, anchored: false }
        );
        assert_eq!(next_event(&mut events).await, DialogEvent::Closing(first));
        assert_eq!(
            next_event(&mut events).await,
            DialogEvent::Disposed { instance: first, forced: false }
        );
        let second = match next_event(&mut events).await {
            DialogEvent::Building(id) => id,
            other => panic!("unexpected event {:?}", other),
        };
        assert_ne!(first, second);
        assert_eq!(
            next_event(&mut events).await,
            DialogEvent::Opened { instance: second, anchored: false }
        );

        let info = handle.instance().await.unwrap().unwrap();
        assert_eq!(info.id, second);
        let html = handle.snapshot().await.unwrap();
        assert_eq!(html.matches("class=\"modl-wrapper").count(), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_backdrop_click_closes() {
        let (mut runtime, handle) = DialogRuntime::new(HeadlessDocument::new(800.0), ControllerSettings::default());
        let mut events = runtime.subscribe();
        runtime.spawn();

        handle.open(fast_config("x")).await.unwrap();
        let info = handle.instance().await.unwrap().unwrap();

        handle.click(info.dialog).await.unwrap();
        assert_eq!(handle.state().await.unwrap(), DialogState::Open);

        handle.click(info.wrapper).await.unwrap();
        loop {
            if let DialogEvent::Disposed { instance, forced } = next_event(&mut events).await {
                assert_eq!(instance, info.id);
                assert!(!forced);
                break;
            }
        }
        assert_eq!(handle.state().await.unwrap(), DialogState::Idle);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_anchored_dialog() {
        let document = HeadlessDocument::new(400.0)
            .with_class_metrics(styles::DIALOG_CLASS, LayoutMetrics::new(600.0));
        let (runtime, handle) = DialogRuntime::new(document, ControllerSettings::default());
        runtime.spawn();

        handle.open(fast_config("tall")).await.unwrap();

        let info = handle.instance().await.unwrap().unwrap();
        assert!(info.anchored);
        assert!(handle
            .snapshot()
            .await
            .unwrap()
            .contains("class=\"modl-wrapper modl-open modl-anchored\""));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_handle_fails_after_shutdown() {
        let (runtime, handle) = DialogRuntime::new(HeadlessDocument::default(), ControllerSettings::default());
        let task = runtime.spawn();

        handle.shutdown().unwrap();
        task.await.unwrap();

        assert!(handle.state().await.is_err());
        assert!(handle.open(DialogConfig::new()).await.is_err());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_close_waits_for_the_transition() {
        let (mut runtime, handle) = DialogRuntime::new(HeadlessDocument::new(800.0), ControllerSettings::default());
        let mut events = runtime.subscribe();
        runtime.spawn();

        let config = DialogConfig::new().with_animation(Duration::from_secs(1), "ease");
        handle.open(config).await.unwrap();

        let closer = handle.clone();
        let closed = tokio::spawn(async move { closer.close().await });
        let id = loop {
            if let DialogEvent::Closing(id) = next_event(&mut events).await {
                break id;
            }
        };
        tokio::task::yield_now().await;

        tokio::time::advance(Duration::from_millis(999)).await;
        tokio::task::yield_now().await;
        assert_eq!(handle.state().await.unwrap(), DialogState::Closing);

        tokio::time::advance(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        closed.await.unwrap().unwrap();
        assert_eq!(handle.state().await.unwrap(), DialogState::Idle);
        assert_eq!(
            next_event(&mut events).await,
            DialogEvent::Disposed { instance: id, forced: false }
        );
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_fallback_timer_forces_disposal() {
        // The timer is due halfway through the fade, so it always wins
        let settings = ControllerSettings {
            fallback_timer: true,
            close_timeout_factor: 0.5,
            close_timeout_grace: Duration::ZERO,
        };
        let (mut runtime, handle) = DialogRuntime::new(HeadlessDocument::new(800.0), settings);
        let mut events = runtime.subscribe();
        runtime.spawn();

        let config = DialogConfig::new().with_animation(Duration::from_secs(1), "ease");
        handle.open(config).await.unwrap();
        let id = handle.instance().await.unwrap().unwrap().id;

        let start = tokio::time::Instant::now();
        timeout(LIMIT, handle.close()).await.unwrap().unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(handle.state().await.unwrap(), DialogState::Idle);

        loop {
            if let DialogEvent::Disposed { instance, forced } = next_event(&mut events).await {
                assert_eq!(instance, id);
                assert!(forced);
                break;
            }
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_oversized_animation_does_not_panic_on_close() {
        let (mut runtime, handle) = DialogRuntime::new(HeadlessDocument::new(800.0), ControllerSettings::default());
        let mut events = runtime.subscribe();
        runtime.spawn();

        let config = DialogConfig::new().with_animation(Duration::from_secs(u64::MAX), "ease");
        handle.open(config).await.unwrap();

        let closer = handle.clone();
        tokio::spawn(async move { closer.close().await });
        while !matches!(next_event(&mut events).await, DialogEvent::Closing(_)) {}
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(3600)).await;
        tokio::task::yield_now().await;

        assert_eq!(handle.state().await.unwrap(), DialogState::Closing);
    }
}

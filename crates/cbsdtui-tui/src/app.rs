//! Main TUI application state and logic
//!
//! The app owns the container list of the kind being shown. Long commands
//! run on background tasks and stream into an [`OutputSink`]; their updates
//! and the containers' signals come back over channels consumed by the
//! select loop in [`App::run`], so nothing but this loop touches the state.

use crate::console::{ConsoleExit, ConsoleSession};
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::widgets::{Form, FormEvent, FormField, SelectableList};
use crate::AppResult;
use cbsdtui_config::GlobalConfig;
use cbsdtui_core::{
    Action, CloneRequest, Console, Container, ContainerKind, EditRequest, Host, LoginOutcome,
    MenuEntry, NoConsole, RefreshReason, Signals, Snapshot, DEFAULT_SNAPSHOT_NAME,
};
use cbsdtui_runner::{OutputBuffer, OutputSink, SinkUpdate};
use crossterm::event::{KeyCode, KeyModifiers};
use ratatui::prelude::*;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub const FIELD_AUTOSTART: &str = "Auto Start";
pub const FIELD_VERSION: &str = "Version";
pub const FIELD_VNC: &str = "VNC Console";
pub const FIELD_IP: &str = "IP address";
pub const FIELD_NEW_NAME: &str = "New name";
pub const FIELD_HOSTNAME: &str = "Hostname";
pub const FIELD_SNAPSHOT: &str = "Snapshot name";

/// Current view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Container table, possibly under a dialog
    Main,
    /// Output of the running or last command
    Output,
}

/// Focused button of a confirmation dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogFocus {
    Confirm,
    #[default]
    Cancel,
}

/// Action awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Destroy(String),
    DestroySnapshot { container: String, snapshot: String },
}

/// The one dialog open over the table
#[derive(Debug, Clone)]
pub enum Dialog {
    Help {
        scroll: u16,
    },
    Actions {
        container: String,
        entries: SelectableList<MenuEntry>,
    },
    View {
        container: String,
        text: String,
        scroll: u16,
    },
    Edit {
        container: String,
        form: Form,
    },
    Clone {
        container: String,
        form: Form,
    },
    CreateSnapshot {
        container: String,
        form: Form,
    },
    Snapshots {
        container: String,
        snapshots: SelectableList<Snapshot>,
    },
    Confirm(ConfirmAction),
}

/// Container signals forwarded to the event loop
#[derive(Debug)]
enum AppMsg {
    Updated(String),
    Refresh(RefreshReason),
}

/// Application state
pub struct App {
    pub host: Arc<Host>,
    /// Kind whose containers are listed
    pub kind: ContainerKind,
    pub view: View,
    pub containers: SelectableList<Container>,
    pub dialog: Option<Dialog>,
    pub dialog_focus: DialogFocus,
    /// Output of the current command
    pub output: OutputBuffer,
    pub output_title: String,
    /// First visible output line when not following
    pub output_scroll: usize,
    /// Keep the last output line in view
    pub output_auto_scroll: bool,
    /// Output lines that fit on screen, set while drawing
    pub output_viewport: usize,
    output_rx: Option<mpsc::UnboundedReceiver<SinkUpdate>>,
    pub status_message: Option<String>,
    pub should_quit: bool,
    pub node_name: Option<String>,
    signals: Signals,
    msg_rx: mpsc::UnboundedReceiver<AppMsg>,
    console: Arc<dyn Console>,
    session: Option<Arc<ConsoleSession>>,
    attach_requested: bool,
    tick_rate: Duration,
}

impl App {
    /// Create the application and load the first list
    pub async fn new(host: Host, config: &GlobalConfig) -> AppResult<Self> {
        let kind = config
            .ui
            .default_kind
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!("{}, showing jails", e);
                ContainerKind::Jail
            });

        let session = match ConsoleSession::spawn(&config.tools.shell) {
            Ok(session) => Some(Arc::new(session)),
            Err(e) => {
                tracing::warn!("Cannot start console shell {}: {}", config.tools.shell, e);
                None
            }
        };
        let console: Arc<dyn Console> = match &session {
            Some(session) => Arc::clone(session) as Arc<dyn Console>,
            None => Arc::new(NoConsole),
        };

        let mut app = Self::with_console(host, console, kind);
        app.session = session;
        app.tick_rate = config.ui.tick_rate();
        app.refresh_containers().await?;
        app.select_first_running();
        Ok(app)
    }

    /// Application state without loading anything
    pub fn with_console(host: Host, console: Arc<dyn Console>, kind: ContainerKind) -> Self {
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let signals = Signals::default();
        let updated_tx = msg_tx.clone();
        signals.updated.connect(move |name: &str| {
            let _ = updated_tx.send(AppMsg::Updated(name.to_string()));
        });
        signals.refresh.connect(move |reason: &RefreshReason| {
            let _ = msg_tx.send(AppMsg::Refresh(reason.clone()));
        });

        Self {
            node_name: host.node_name(),
            host: Arc::new(host),
            kind,
            view: View::Main,
            containers: SelectableList::default(),
            dialog: None,
            dialog_focus: DialogFocus::default(),
            output: OutputBuffer::new(),
            output_title: String::new(),
            output_scroll: 0,
            output_auto_scroll: true,
            output_viewport: 0,
            output_rx: None,
            status_message: None,
            should_quit: false,
            signals,
            msg_rx,
            console,
            session: None,
            attach_requested: false,
            tick_rate: Duration::from_millis(250),
        }
    }

    /// Run the application main loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> AppResult<()> {
        let mut events = EventHandler::new(self.tick_rate);

        while !self.should_quit {
            terminal.draw(|frame| ui::draw(frame, self))?;

            tokio::select! {
                event = events.next() => {
                    if let Some(e) = event {
                        self.handle_event(e).await?;
                    }
                }
                update = Self::recv_output(&mut self.output_rx) => {
                    self.handle_output(update);
                }
                Some(msg) = self.msg_rx.recv() => {
                    self.handle_message(msg).await?;
                }
            }

            if std::mem::take(&mut self.attach_requested) {
                self.attach_console(terminal, &mut events).await?;
            }
        }

        Ok(())
    }

    async fn recv_output(rx: &mut Option<mpsc::UnboundedReceiver<SinkUpdate>>) -> Option<SinkUpdate> {
        match rx {
            Some(ref mut receiver) => receiver.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Apply one sink update; a closed channel counts as completion
    fn handle_output(&mut self, update: Option<SinkUpdate>) {
        let update = update.unwrap_or(SinkUpdate::Finished);
        let finished = update == SinkUpdate::Finished;
        self.output.apply(update);
        if finished {
            self.output_rx = None;
            self.status_message = Some(format!("{}: done", self.output_title));
        }
    }

    async fn handle_message(&mut self, msg: AppMsg) -> AppResult<()> {
        match msg {
            AppMsg::Updated(name) => self.reload_container(&name).await,
            AppMsg::Refresh(reason) => {
                tracing::debug!("List refresh: {:?}", reason);
                if let Err(e) = self.refresh_containers().await {
                    self.report("Refreshing the list failed", e);
                } else if let RefreshReason::Cloned { to, .. } = &reason {
                    self.containers.select_where(|c| c.name() == to);
                }
            }
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: Event) -> AppResult<()> {
        match event {
            Event::Key(key) => self.handle_key(key.code, key.modifiers).await?,
            Event::Tick | Event::Resize(_, _) | Event::Mouse(_) => {}
        }
        Ok(())
    }

    /// Feed a key press as if typed
    pub async fn send_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> AppResult<()> {
        self.handle_key(code, modifiers).await
    }

    async fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> AppResult<()> {
        if self.view == View::Output {
            self.handle_output_key(code);
            return Ok(());
        }
        if self.dialog.is_some() {
            return self.handle_dialog_key(code).await;
        }
        self.handle_main_key(code, modifiers).await
    }

    async fn handle_main_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> AppResult<()> {
        match code {
            KeyCode::Char('t') if modifiers.contains(KeyModifiers::CONTROL) => self.reset_console(),
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('?') => self.execute_action(Action::Help).await?,
            KeyCode::Char('j') | KeyCode::Down => self.containers.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.containers.select_prev(),
            KeyCode::Char('g') | KeyCode::Home => self.containers.select(0),
            KeyCode::Char('G') | KeyCode::End => {
                self.containers.select(self.containers.len().saturating_sub(1))
            }
            KeyCode::Tab => self.switch_kind(self.next_kind(1)).await,
            KeyCode::BackTab => self.switch_kind(self.next_kind(ContainerKind::ALL.len() - 1)).await,
            KeyCode::Char(c @ '1'..='3') => {
                let idx = (c as usize) - ('1' as usize);
                self.switch_kind(ContainerKind::ALL[idx]).await;
            }
            KeyCode::Char('r') => match self.refresh_containers().await {
                Ok(()) => self.status_message = Some(format!("Reloaded {}", self.kind.title())),
                Err(e) => self.report("Refreshing the list failed", e),
            },
            KeyCode::Enter => self.login_selected(),
            KeyCode::F(key) => self.dispatch_key(key).await?,
            _ => {}
        }
        Ok(())
    }

    fn handle_output_key(&mut self, code: KeyCode) {
        let finished = self.output.is_finished();
        let max_scroll = self.output.line_count().saturating_sub(self.output_viewport);
        if self.output_auto_scroll && !matches!(code, KeyCode::End | KeyCode::Char('G')) {
            self.output_scroll = max_scroll;
        }
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') if finished => {
                self.view = View::Main;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.output_auto_scroll = false;
                self.output_scroll = self.output_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.output_scroll = (self.output_scroll + 1).min(max_scroll);
                self.output_auto_scroll = self.output_scroll == max_scroll;
            }
            KeyCode::PageUp => {
                self.output_auto_scroll = false;
                self.output_scroll = self.output_scroll.saturating_sub(self.output_viewport.max(1));
            }
            KeyCode::PageDown => {
                self.output_scroll = (self.output_scroll + self.output_viewport.max(1)).min(max_scroll);
                self.output_auto_scroll = self.output_scroll == max_scroll;
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.output_auto_scroll = false;
                self.output_scroll = 0;
            }
            KeyCode::End | KeyCode::Char('G') => self.output_auto_scroll = true,
            _ => {}
        }
    }

    async fn handle_dialog_key(&mut self, code: KeyCode) -> AppResult<()> {
        let Some(dialog) = self.dialog.take() else {
            return Ok(());
        };

        match dialog {
            Dialog::Help { scroll } | Dialog::View { scroll, .. }
                if matches!(code, KeyCode::Up | KeyCode::Down | KeyCode::Char('j') | KeyCode::Char('k')) =>
            {
                let scroll = match code {
                    KeyCode::Up | KeyCode::Char('k') => scroll.saturating_sub(1),
                    _ => scroll.saturating_add(1),
                };
                self.dialog = Some(with_scroll(dialog, scroll));
            }
            Dialog::Help { .. } | Dialog::View { .. } => {
                if !matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::F(1)) {
                    self.dialog = Some(dialog);
                }
            }
            Dialog::Actions { container, mut entries } => match code {
                KeyCode::Char('j') | KeyCode::Down => {
                    entries.select_next();
                    self.dialog = Some(Dialog::Actions { container, entries });
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    entries.select_prev();
                    self.dialog = Some(Dialog::Actions { container, entries });
                }
                KeyCode::Enter => {
                    let label = entries.selected_item().map(|e| e.label).unwrap_or_default();
                    if self.kind.action_for_label(label).is_some() {
                        self.dispatch_label(label).await?;
                    } else {
                        self.dialog = Some(Dialog::Actions { container, entries });
                    }
                }
                KeyCode::Esc | KeyCode::Char('q') => {}
                _ => self.dialog = Some(Dialog::Actions { container, entries }),
            },
            Dialog::Edit { container, mut form } => match form.handle_key(code) {
                FormEvent::Continue => self.dialog = Some(Dialog::Edit { container, form }),
                FormEvent::Cancel => {}
                FormEvent::Submit => self.submit_edit(&container, &form).await,
            },
            Dialog::Clone { container, mut form } => match form.handle_key(code) {
                FormEvent::Continue => self.dialog = Some(Dialog::Clone { container, form }),
                FormEvent::Cancel => {}
                FormEvent::Submit => self.submit_clone(container, form),
            },
            Dialog::CreateSnapshot { container, mut form } => match form.handle_key(code) {
                FormEvent::Continue => {
                    self.dialog = Some(Dialog::CreateSnapshot { container, form })
                }
                FormEvent::Cancel => {}
                FormEvent::Submit => {
                    let name = form.text(FIELD_SNAPSHOT);
                    if let Some(target) = self.container_named(&container) {
                        self.start_operation(format!("Snapshot {}", container), move |host, sink| async move {
                            target.create_snapshot(&host, &name, &sink).await;
                        });
                    }
                }
            },
            Dialog::Snapshots { container, mut snapshots } => match code {
                KeyCode::Char('j') | KeyCode::Down => {
                    snapshots.select_next();
                    self.dialog = Some(Dialog::Snapshots { container, snapshots });
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    snapshots.select_prev();
                    self.dialog = Some(Dialog::Snapshots { container, snapshots });
                }
                KeyCode::Enter => {
                    if let Some(snapshot) = snapshots.selected_item() {
                        self.confirm(ConfirmAction::DestroySnapshot {
                            container,
                            snapshot: snapshot.name.clone(),
                        });
                    }
                }
                KeyCode::Esc | KeyCode::Char('q') => {}
                _ => self.dialog = Some(Dialog::Snapshots { container, snapshots }),
            },
            Dialog::Confirm(action) => match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.execute_confirm_action(action),
                KeyCode::Enter if self.dialog_focus == DialogFocus::Confirm => {
                    self.execute_confirm_action(action)
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Enter => {}
                KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right => {
                    self.dialog_focus = match self.dialog_focus {
                        DialogFocus::Confirm => DialogFocus::Cancel,
                        DialogFocus::Cancel => DialogFocus::Confirm,
                    };
                    self.dialog = Some(Dialog::Confirm(action));
                }
                _ => self.dialog = Some(Dialog::Confirm(action)),
            },
        }
        Ok(())
    }

    /// Run the action bound to function key `key`
    pub async fn dispatch_key(&mut self, key: u8) -> AppResult<()> {
        match self.kind.action_for_key(key) {
            Some(action) => self.execute_action(action).await,
            None => Ok(()),
        }
    }

    /// Run the action behind a menu label
    pub async fn dispatch_label(&mut self, label: &str) -> AppResult<()> {
        match self.kind.action_for_label(label) {
            Some(action) => self.execute_action(action).await,
            None => Ok(()),
        }
    }

    /// Perform `action` on the selected container.
    ///
    /// Any open dialog is closed first, so at most one is ever open.
    pub async fn execute_action(&mut self, action: Action) -> AppResult<()> {
        self.dialog = None;
        match action {
            Action::Help => {
                self.dialog = Some(Dialog::Help { scroll: 0 });
                return Ok(());
            }
            Action::Exit => {
                self.should_quit = true;
                return Ok(());
            }
            _ => {}
        }

        let Some(container) = self.selected_container().cloned() else {
            self.status_message = Some(format!("No {} selected", self.kind.noun()));
            return Ok(());
        };
        let name = container.name().to_string();

        match action {
            Action::Actions => {
                self.dialog = Some(Dialog::Actions {
                    container: name,
                    entries: SelectableList::from_items(container.actions_menu()),
                });
            }
            Action::View => self.open_view(container),
            Action::Edit => {
                self.dialog = Some(Dialog::Edit {
                    container: name,
                    form: edit_form(&container),
                });
            }
            Action::Clone => {
                let defaults = CloneRequest::defaults_for(&container);
                self.dialog = Some(Dialog::Clone {
                    container: name,
                    form: Form::new(vec![
                        FormField::text(FIELD_NEW_NAME, &defaults.new_name),
                        FormField::text(FIELD_HOSTNAME, &defaults.hostname),
                        FormField::text(FIELD_IP, &defaults.ip4_addr),
                    ]),
                });
            }
            Action::CreateSnapshot => {
                self.dialog = Some(Dialog::CreateSnapshot {
                    container: name,
                    form: Form::new(vec![FormField::text(FIELD_SNAPSHOT, DEFAULT_SNAPSHOT_NAME)]),
                });
            }
            Action::DestroySnapshot => {
                let snapshots = container.snapshots(&self.host).await;
                if snapshots.is_empty() {
                    self.status_message = Some(format!("{} has no snapshots", name));
                } else {
                    self.dialog = Some(Dialog::Snapshots {
                        container: name,
                        snapshots: SelectableList::from_items(snapshots),
                    });
                }
            }
            Action::Destroy => self.confirm(ConfirmAction::Destroy(name)),
            Action::Export => {
                self.start_operation(format!("Export {}", name), move |host, sink| async move {
                    container.export(&host, &sink).await;
                });
            }
            Action::StartStop => self.start_stop(container),
            Action::Help | Action::Exit => {}
        }
        Ok(())
    }

    fn open_view(&mut self, mut container: Container) {
        if let Err(e) = container.load_params(&self.host) {
            self.report(&format!("Cannot read {}", container.name()), e);
        }
        self.dialog = Some(Dialog::View {
            container: container.name().to_string(),
            text: container.view_text(),
            scroll: 0,
        });
    }

    fn confirm(&mut self, action: ConfirmAction) {
        self.dialog_focus = DialogFocus::default();
        self.dialog = Some(Dialog::Confirm(action));
    }

    async fn submit_edit(&mut self, name: &str, form: &Form) {
        let Some(mut container) = self.container_named(name) else {
            return;
        };
        let detail = if container.version().is_some() {
            form.text(FIELD_VERSION)
        } else {
            form.text(FIELD_VNC)
        };
        let request = EditRequest {
            autostart: form.toggle(FIELD_AUTOSTART),
            detail,
            ip4_addr: form.text(FIELD_IP),
        };

        match container.edit(&self.host, request).await {
            Ok(true) => {
                self.status_message = Some(format!("Updated {}", name));
                if let Some(slot) = self.containers.find_mut(|c| c.name() == name) {
                    *slot = container;
                }
            }
            Ok(false) => self.status_message = Some(format!("No changes to {}", name)),
            Err(e) => self.report(&format!("Editing {} failed", name), e),
        }
    }

    fn submit_clone(&mut self, name: String, form: Form) {
        let request = CloneRequest {
            new_name: form.text(FIELD_NEW_NAME).trim().to_string(),
            hostname: form.text(FIELD_HOSTNAME).trim().to_string(),
            ip4_addr: form.text(FIELD_IP).trim().to_string(),
        };
        if request.new_name.is_empty() {
            self.status_message = Some("The clone needs a name".to_string());
            self.dialog = Some(Dialog::Clone { container: name, form });
            return;
        }
        let Some(source) = self.container_named(&name) else {
            return;
        };
        self.start_operation(
            format!("Clone {} to {}", name, request.new_name),
            move |host, sink| async move {
                source.clone_to(&host, &request, &sink).await;
            },
        );
    }

    fn start_stop(&mut self, container: Container) {
        if !container.is_running() && !container.is_runnable() {
            self.status_message = Some(format!(
                "{} is {} and cannot be started or stopped",
                container.name(),
                container.status()
            ));
            return;
        }
        let verb = if container.is_running() { "Stop" } else { "Start" };
        let console = Arc::clone(&self.console);
        self.start_operation(format!("{} {}", verb, container.name()), move |host, sink| async move {
            let mut container = container;
            container.start_stop(&host, console.as_ref(), &sink).await;
        });
    }

    fn execute_confirm_action(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::Destroy(name) => {
                if let Some(container) = self.container_named(&name) {
                    self.start_operation(format!("Destroy {}", name), move |host, sink| async move {
                        container.destroy(&host, &sink).await;
                    });
                }
            }
            ConfirmAction::DestroySnapshot { container, snapshot } => {
                if let Some(target) = self.container_named(&container) {
                    self.start_operation(
                        format!("Destroy snapshot {} of {}", snapshot, container),
                        move |host, sink| async move {
                            target.destroy_snapshot(&host, &snapshot, &sink).await;
                        },
                    );
                }
            }
        }
    }

    /// Switch to the output view and run `op` on a background task.
    ///
    /// The sink is finished when `op` returns.
    fn start_operation<F, Fut>(&mut self, title: String, op: F)
    where
        F: FnOnce(Arc<Host>, OutputSink) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sink, rx) = OutputSink::channel();
        tracing::info!("{}", title);

        self.dialog = None;
        self.output.clear();
        self.output_rx = Some(rx);
        self.output_title = title;
        self.output_scroll = 0;
        self.output_auto_scroll = true;
        self.view = View::Output;

        let task = op(Arc::clone(&self.host), sink.clone());
        tokio::spawn(async move {
            task.await;
            sink.finish();
        });
    }

    fn login_selected(&mut self) {
        let Some(container) = self.selected_container() else {
            return;
        };
        let name = container.name().to_string();
        let outcome = container.login(&self.host, self.console.as_ref());
        self.status_message = Some(match outcome {
            LoginOutcome::Attached => {
                self.attach_requested = true;
                format!("Logged into {}", name)
            }
            LoginOutcome::LoggedOut => format!("Logged out of {}", name),
            LoginOutcome::NotRunning => format!("{} is not running", name),
        });
    }

    /// Whether the terminal should be handed to the console next
    pub fn attach_requested(&self) -> bool {
        self.attach_requested
    }

    /// Name of the container logged into on the console
    pub fn active_console(&self) -> Option<String> {
        self.console.active()
    }

    fn reset_console(&mut self) {
        let Some(session) = self.session.clone() else {
            self.status_message = Some("No console available".to_string());
            return;
        };
        match session.reset() {
            Ok(()) => self.status_message = Some("Console reset".to_string()),
            Err(e) => self.report("Console reset failed", e),
        }
    }

    /// Suspend the TUI and relay the terminal to the console until detach
    async fn attach_console<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        events: &mut EventHandler,
    ) -> AppResult<()> {
        let Some(session) = self.session.clone() else {
            self.status_message = Some("No console available".to_string());
            return Ok(());
        };

        events.pause().await;
        crate::suspend_terminal()?;
        let exit = tokio::task::spawn_blocking(move || session.relay()).await;
        crate::resume_terminal()?;
        terminal.clear()?;
        events.resume();

        match exit {
            Ok(ConsoleExit::Detached) => {
                self.status_message = Some("Detached from console".to_string())
            }
            Ok(ConsoleExit::Exited) => {
                self.status_message = Some("Console shell exited, Ctrl-T starts a new one".to_string())
            }
            Ok(ConsoleExit::Error(e)) => self.report("Console failed", e),
            Err(e) => self.report("Console task failed", e),
        }
        Ok(())
    }

    async fn switch_kind(&mut self, kind: ContainerKind) {
        if kind == self.kind {
            return;
        }
        self.kind = kind;
        self.containers = SelectableList::default();
        match self.refresh_containers().await {
            Ok(()) => {
                self.select_first_running();
                self.status_message = None;
            }
            Err(e) => self.report(&format!("Loading {} failed", kind.title()), e),
        }
    }

    fn next_kind(&self, step: usize) -> ContainerKind {
        let all = ContainerKind::ALL;
        let idx = all.iter().position(|k| *k == self.kind).unwrap_or(0);
        all[(idx + step) % all.len()]
    }

    /// Reload the list from the database, keeping the selection by name
    pub async fn refresh_containers(&mut self) -> AppResult<()> {
        let containers = self.host.load_containers(self.kind).await?;
        self.set_containers(containers);
        Ok(())
    }

    /// Replace the list; every container reports to this app
    pub fn set_containers(&mut self, mut containers: Vec<Container>) {
        let selected = self.selected_container().map(|c| c.name().to_string());
        for container in &mut containers {
            container.set_signals(self.signals.clone());
        }
        self.containers.set_items(containers);
        if let Some(name) = selected {
            self.containers.select_where(|c| c.name() == name);
        }
    }

    async fn reload_container(&mut self, name: &str) {
        if !self.containers.iter().any(|c| c.name() == name) {
            return;
        }
        match self.host.find(self.kind, name).await {
            Ok(Some(mut fresh)) => {
                fresh.set_signals(self.signals.clone());
                if let Some(slot) = self.containers.find_mut(|c| c.name() == name) {
                    *slot = fresh;
                }
            }
            Ok(None) => {
                if let Err(e) = self.refresh_containers().await {
                    self.report("Refreshing the list failed", e);
                }
            }
            Err(e) => self.report(&format!("Reloading {} failed", name), e),
        }
    }

    fn select_first_running(&mut self) {
        if !self.containers.select_where(|c| c.is_running()) {
            self.containers.select(0);
        }
    }

    fn container_named(&self, name: &str) -> Option<Container> {
        self.containers.iter().find(|c| c.name() == name).cloned()
    }

    pub fn selected_container(&self) -> Option<&Container> {
        self.containers.selected_item()
    }

    /// Whether a command is still running
    pub fn is_busy(&self) -> bool {
        self.output_rx.is_some()
    }

    fn report(&mut self, context: &str, err: impl fmt::Display) {
        tracing::error!("{}: {}", context, err);
        self.status_message = Some(format!("{}: {}", context, err));
    }
}

fn with_scroll(dialog: Dialog, scroll: u16) -> Dialog {
    match dialog {
        Dialog::Help { .. } => Dialog::Help { scroll },
        Dialog::View { container, text, .. } => Dialog::View {
            container,
            text,
            scroll,
        },
        other => other,
    }
}

/// Fields of the edit dialog; the address is only editable while stopped
fn edit_form(container: &Container) -> Form {
    let mut fields = vec![FormField::toggle(FIELD_AUTOSTART, container.autostart())];
    match container.version() {
        Some(version) => fields.push(FormField::text(FIELD_VERSION, version)),
        None => fields.push(FormField::text(FIELD_VNC, container.vnc().unwrap_or_default())),
    }
    if !container.is_running() {
        fields.push(FormField::text(FIELD_IP, container.ip4_addr()));
    }
    Form::new(fields)
}

#[cfg(any(test, feature = "test-support"))]
impl App {
    /// App over a scripted runner and an empty in-memory store
    pub fn new_for_testing() -> Self {
        use cbsdtui_core::test_support::{mock_host, MockRunner, RecordingConsole};

        let (host, _store) = mock_host(MockRunner::new(), Vec::new());
        Self::with_console(host, Arc::new(RecordingConsole::default()), ContainerKind::Jail)
    }

    /// A jail row with fixed address and version
    pub fn create_test_container(name: &str, status: cbsdtui_core::Status) -> Container {
        Container::from_row(cbsdtui_core::ContainerRow {
            kind: ContainerKind::Jail,
            name: name.to_string(),
            ip4_addr: "10.0.0.10".to_string(),
            status,
            autostart: false,
            fields: cbsdtui_core::KindFields::Jail {
                version: "14.1".to_string(),
            },
        })
    }

    /// Wait for the running command, then apply queued container signals
    pub async fn settle(&mut self) -> AppResult<()> {
        while let Some(rx) = self.output_rx.as_mut() {
            let update = rx.recv().await;
            self.handle_output(update);
        }
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.handle_message(msg).await?;
        }
        Ok(())
    }
}

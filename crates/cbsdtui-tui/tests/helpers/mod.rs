#![allow(dead_code)]

use cbsdtui_core::test_support::{mock_host_shared, MockRunner, MockStore, RecordingConsole};
use cbsdtui_core::{ContainerKind, ContainerRow, KindFields, Status};
use cbsdtui_tui::App;
use ratatui::{backend::TestBackend, Terminal};
use std::sync::Arc;

/// Render the app to a TestBackend and capture output as a string
pub fn render_app(app: &mut App, width: u16, height: u16) -> String {
    let backend = TestBackend::new(width, height);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| cbsdtui_tui::ui::draw(frame, app))
        .unwrap();
    let buffer = terminal.backend().buffer().clone();
    buffer_to_string(&buffer)
}

/// Convert a ratatui buffer to a string representation
pub fn buffer_to_string(buffer: &ratatui::buffer::Buffer) -> String {
    let mut output = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            let cell = buffer.get(x, y);
            output.push_str(cell.symbol());
        }
        output.push('\n');
    }
    output
}

pub fn jail_row(name: &str, status: Status, autostart: bool) -> ContainerRow {
    ContainerRow {
        kind: ContainerKind::Jail,
        name: name.to_string(),
        ip4_addr: "10.0.0.10".to_string(),
        status,
        autostart,
        fields: KindFields::Jail {
            version: "14.1".to_string(),
        },
    }
}

pub fn vm_row(kind: ContainerKind, name: &str, status: Status) -> ContainerRow {
    ContainerRow {
        kind,
        name: name.to_string(),
        ip4_addr: String::new(),
        status,
        autostart: false,
        fields: KindFields::Vm {
            os_type: "freebsd".to_string(),
            vnc: "127.0.0.1:5900".to_string(),
        },
    }
}

/// An app over `rows` with everything the tests inspect afterwards
pub struct Harness {
    pub app: App,
    pub runner: Arc<MockRunner>,
    pub store: Arc<MockStore>,
    pub console: Arc<RecordingConsole>,
}

/// Jails `web` (running), `db` (stopped, autostart) and `old` (slave).
///
/// Status polls are left unscripted so the cached status stays.
pub async fn harness() -> Harness {
    harness_with(
        MockRunner::new(),
        vec![
            jail_row("web", Status::On, false),
            jail_row("db", Status::Off, true),
            jail_row("old", Status::Slave, false),
            vm_row(ContainerKind::Bhyve, "vm1", Status::Off),
        ],
    )
    .await
}

pub async fn harness_with(runner: MockRunner, rows: Vec<ContainerRow>) -> Harness {
    let runner = Arc::new(runner);
    let (host, store) = mock_host_shared(runner.clone(), rows);
    let console = Arc::new(RecordingConsole::default());
    let mut app = App::with_console(host, console.clone(), ContainerKind::Jail);
    app.refresh_containers().await.unwrap();
    app.containers.select(0);
    Harness {
        app,
        runner,
        store,
        console,
    }
}

/// Select the row named `name`
pub fn select(app: &mut App, name: &str) {
    assert!(
        app.containers.select_where(|c| c.name() == name),
        "no row named {}",
        name
    );
}

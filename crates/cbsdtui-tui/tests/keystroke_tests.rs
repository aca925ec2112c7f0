//! Integration tests that exercise App key handling via send_key()

mod helpers;

use cbsdtui_core::test_support::MockRunner;
use cbsdtui_core::{ContainerKind, Status};
use cbsdtui_tui::{App, ConfirmAction, Dialog, DialogFocus, View};
use crossterm::event::{KeyCode, KeyModifiers};
use helpers::{harness, harness_with, jail_row, select};

async fn press(app: &mut App, code: KeyCode) {
    app.send_key(code, KeyModifiers::NONE).await.unwrap();
}

/// Which dialog is open, ignoring its contents
fn dialog_name(app: &App) -> &'static str {
    match &app.dialog {
        None => "none",
        Some(Dialog::Help { .. }) => "help",
        Some(Dialog::Actions { .. }) => "actions",
        Some(Dialog::View { .. }) => "view",
        Some(Dialog::Edit { .. }) => "edit",
        Some(Dialog::Clone { .. }) => "clone",
        Some(Dialog::CreateSnapshot { .. }) => "create-snapshot",
        Some(Dialog::Snapshots { .. }) => "snapshots",
        Some(Dialog::Confirm(_)) => "confirm",
    }
}

// ---------------------------------------------------------------------------
// Navigation tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_j_moves_selection_down() {
    let mut h = harness().await;
    assert_eq!(h.app.containers.selected_index(), 0);

    press(&mut h.app, KeyCode::Char('j')).await;
    press(&mut h.app, KeyCode::Char('j')).await;
    assert_eq!(h.app.selected_container().unwrap().name(), "old");
}

#[tokio::test]
async fn test_k_wraps_selection_up() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::Char('k')).await;
    assert_eq!(
        h.app.containers.selected_index(),
        2,
        "k at position 0 should wrap to last item"
    );
}

#[tokio::test]
async fn test_number_keys_switch_kind() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::Char('2')).await;
    assert_eq!(h.app.kind, ContainerKind::Bhyve);

    press(&mut h.app, KeyCode::Char('3')).await;
    assert_eq!(h.app.kind, ContainerKind::Qemu);
    assert!(h.app.containers.is_empty());

    press(&mut h.app, KeyCode::BackTab).await;
    assert_eq!(h.app.kind, ContainerKind::Bhyve);
}

#[tokio::test]
async fn test_reload_keeps_selection_by_name() {
    let mut h = harness().await;
    select(&mut h.app, "db");
    h.store.remove(ContainerKind::Jail, "web");

    press(&mut h.app, KeyCode::Char('r')).await;
    assert_eq!(h.app.containers.len(), 2);
    assert_eq!(h.app.selected_container().unwrap().name(), "db");
}

#[tokio::test]
async fn test_q_quits() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::Char('q')).await;
    assert!(h.app.should_quit);
}

#[tokio::test]
async fn test_f10_exits() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::F(10)).await;
    assert!(h.app.should_quit);
}

// ---------------------------------------------------------------------------
// Dialog tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_help_opens_and_closes() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::F(1)).await;
    assert_eq!(dialog_name(&h.app), "help");

    press(&mut h.app, KeyCode::Down).await;
    assert!(matches!(h.app.dialog, Some(Dialog::Help { scroll: 1 })));

    press(&mut h.app, KeyCode::Esc).await;
    assert!(h.app.dialog.is_none());
}

#[tokio::test]
async fn test_keys_go_to_open_dialog() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::Char('?')).await;
    press(&mut h.app, KeyCode::Char('j')).await;

    // The help text scrolled, the table did not move
    assert_eq!(h.app.containers.selected_index(), 0);
    assert!(matches!(h.app.dialog, Some(Dialog::Help { scroll: 1 })));
}

#[tokio::test]
async fn test_menu_label_and_function_key_agree() {
    for item in ContainerKind::Jail.bottom_menu() {
        let label = item.label(ContainerKind::Jail);

        let mut by_key = harness().await;
        select(&mut by_key.app, "db");
        by_key.app.dispatch_key(item.key).await.unwrap();

        let mut by_label = harness().await;
        select(&mut by_label.app, "db");
        by_label.app.dispatch_label(label).await.unwrap();

        assert_eq!(dialog_name(&by_key.app), dialog_name(&by_label.app), "{}", label);
        assert_eq!(by_key.app.view, by_label.app.view, "{}", label);
        assert_eq!(by_key.app.should_quit, by_label.app.should_quit, "{}", label);
        assert_eq!(by_key.app.output_title, by_label.app.output_title, "{}", label);
    }
}

#[tokio::test]
async fn test_actions_menu_replaces_itself_with_chosen_dialog() {
    let mut h = harness().await;
    select(&mut h.app, "db");

    press(&mut h.app, KeyCode::F(2)).await;
    let Some(Dialog::Actions { entries, .. }) = &h.app.dialog else {
        panic!("expected the actions menu");
    };
    let labels: Vec<&str> = entries.iter().map(|e| e.label).collect();
    assert_eq!(
        labels,
        [
            "Start",
            "Create Snap.",
            "Destroy Snap.",
            "View",
            "Edit",
            "Clone",
            "Export",
            "Destroy Jail"
        ]
    );

    for _ in 0..4 {
        press(&mut h.app, KeyCode::Down).await;
    }
    press(&mut h.app, KeyCode::Enter).await;
    assert_eq!(dialog_name(&h.app), "edit");
}

#[tokio::test]
async fn test_actions_menu_stop_for_running() {
    let mut h = harness().await;
    select(&mut h.app, "web");

    press(&mut h.app, KeyCode::F(2)).await;
    let Some(Dialog::Actions { entries, .. }) = &h.app.dialog else {
        panic!("expected the actions menu");
    };
    assert_eq!(entries.items()[0].label, "Stop");

    press(&mut h.app, KeyCode::Enter).await;
    assert!(h.app.dialog.is_none());
    assert_eq!(h.app.view, View::Output);
    assert_eq!(h.app.output_title, "Stop web");
}

#[tokio::test]
async fn test_inert_menu_entry_keeps_menu_open() {
    let mut h = harness().await;
    select(&mut h.app, "old");

    press(&mut h.app, KeyCode::F(2)).await;
    press(&mut h.app, KeyCode::Enter).await;
    assert_eq!(dialog_name(&h.app), "actions");
    assert_eq!(h.app.view, View::Main);
}

#[tokio::test]
async fn test_confirm_defaults_to_cancel() {
    let mut h = harness().await;
    press(&mut h.app, KeyCode::F(8)).await;
    assert_eq!(h.app.dialog_focus, DialogFocus::Cancel);

    press(&mut h.app, KeyCode::Enter).await;
    assert!(h.app.dialog.is_none());
    assert_eq!(h.app.view, View::Main);
}

#[tokio::test]
async fn test_confirm_focus_then_enter() {
    let mut h = harness().await;
    select(&mut h.app, "db");
    press(&mut h.app, KeyCode::F(8)).await;

    press(&mut h.app, KeyCode::Tab).await;
    assert_eq!(h.app.dialog_focus, DialogFocus::Confirm);
    assert!(matches!(
        &h.app.dialog,
        Some(Dialog::Confirm(ConfirmAction::Destroy(name))) if name == "db"
    ));

    press(&mut h.app, KeyCode::Enter).await;
    assert_eq!(h.app.view, View::Output);
    assert_eq!(h.app.output_title, "Destroy db");
    h.app.settle().await.unwrap();
}

#[tokio::test]
async fn test_edit_esc_discards() {
    let mut h = harness().await;
    select(&mut h.app, "db");
    press(&mut h.app, KeyCode::F(4)).await;
    press(&mut h.app, KeyCode::Char(' ')).await;
    press(&mut h.app, KeyCode::Esc).await;

    assert!(h.app.dialog.is_none());
    assert_eq!(h.store.write_count(), 0);
    assert!(h.app.selected_container().unwrap().autostart());
}

// ---------------------------------------------------------------------------
// Console tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_enter_logs_into_running_jail() {
    let mut h = harness().await;
    select(&mut h.app, "web");

    press(&mut h.app, KeyCode::Enter).await;
    assert_eq!(h.console.sent(), ["cbsd jlogin jname=web"]);
    assert_eq!(h.app.active_console().as_deref(), Some("web"));
    assert!(h.app.attach_requested());
    assert_eq!(h.app.status_message.as_deref(), Some("Logged into web"));
}

#[tokio::test]
async fn test_enter_again_logs_out() {
    let mut h = harness().await;
    select(&mut h.app, "web");

    press(&mut h.app, KeyCode::Enter).await;
    press(&mut h.app, KeyCode::Enter).await;
    assert_eq!(h.console.sent(), ["cbsd jlogin jname=web", "^C", "exit"]);
    assert_eq!(h.app.active_console(), None);
    assert_eq!(h.app.status_message.as_deref(), Some("Logged out of web"));
}

#[tokio::test]
async fn test_enter_on_stopped_jail_does_nothing() {
    let mut h = harness().await;
    select(&mut h.app, "db");

    press(&mut h.app, KeyCode::Enter).await;
    assert!(h.console.sent().is_empty());
    assert!(!h.app.attach_requested());
    assert_eq!(h.app.status_message.as_deref(), Some("db is not running"));
}

#[tokio::test]
async fn test_login_switches_between_containers() {
    let rows = vec![
        jail_row("web", Status::On, false),
        jail_row("mail", Status::On, false),
    ];
    let mut h = harness_with(MockRunner::new(), rows).await;

    press(&mut h.app, KeyCode::Enter).await;
    press(&mut h.app, KeyCode::Down).await;
    press(&mut h.app, KeyCode::Enter).await;

    assert_eq!(
        h.console.sent(),
        ["cbsd jlogin jname=web", "exit", "cbsd jlogin jname=mail"]
    );
    assert_eq!(h.app.active_console().as_deref(), Some("mail"));
}

#[tokio::test]
async fn test_ctrl_t_without_session() {
    let mut h = harness().await;
    h.app
        .send_key(KeyCode::Char('t'), KeyModifiers::CONTROL)
        .await
        .unwrap();
    assert_eq!(h.app.status_message.as_deref(), Some("No console available"));
}

// ---------------------------------------------------------------------------
// Output view tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_output_scrolling_stops_following() {
    let lines: Vec<String> = (1..=50).map(|i| format!("line {}", i)).collect();
    let runner = MockRunner::new().with_attached_lines(lines);
    let mut h = harness_with(runner, vec![jail_row("web", Status::On, false)]).await;

    press(&mut h.app, KeyCode::F(6)).await;
    h.app.settle().await.unwrap();
    h.app.output_viewport = 10;

    press(&mut h.app, KeyCode::Up).await;
    assert!(!h.app.output_auto_scroll);
    assert_eq!(h.app.output_scroll, h.app.output.line_count() - 10 - 1);

    press(&mut h.app, KeyCode::Home).await;
    assert_eq!(h.app.output_scroll, 0);

    press(&mut h.app, KeyCode::End).await;
    assert!(h.app.output_auto_scroll);

    press(&mut h.app, KeyCode::Enter).await;
    assert_eq!(h.app.view, View::Main);
}

use super::*;

const KEY_HELP: &[(&str, &str)] = &[
    ("Enter", "Log into the selected container, again to log out"),
    ("Ctrl-\\", "Leave the console and return here"),
    ("Ctrl-T", "Reset the console"),
    ("Tab, 1-3", "Switch between jails, bhyve and QEMU VMs"),
    ("j/k", "Move the selection"),
    ("r", "Reload the list"),
    ("q", "Quit"),
];

/// Help text: navigation keys, then the function keys of `kind`
pub fn help_lines(kind: ContainerKind) -> Vec<String> {
    let mut lines: Vec<String> = KEY_HELP
        .iter()
        .map(|(key, text)| format!("{:<9} {}", key, text))
        .collect();
    lines.push(String::new());
    lines.extend(
        kind.bottom_menu()
            .iter()
            .map(|item| format!("{:<9} {}", format!("F{}", item.key), item.label(kind))),
    );
    lines
}

pub(super) fn draw_dialog(frame: &mut Frame, app: &App, area: Rect) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    match dialog {
        Dialog::Help { scroll } => DialogBuilder::new("Help")
            .width(62)
            .left_aligned()
            .lines(help_lines(app.kind).into_iter().map(Line::from))
            .scrolled(*scroll, area.height)
            .render(frame, area),

        Dialog::Actions { container, entries } => {
            let selected = entries.selected_index();
            let lines = entries.iter().enumerate().map(|(i, entry)| {
                let style = if i == selected {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else if entry.action.is_none() {
                    Style::default().fg(Color::DarkGray)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(format!(" {:<20}", entry.label), style))
            });
            DialogBuilder::new(container.as_str())
                .width(26)
                .border_color(Color::Cyan)
                .left_aligned()
                .lines(lines)
                .render(frame, area);
        }

        Dialog::View {
            container,
            text,
            scroll,
        } => DialogBuilder::new(format!("View {}", container))
            .width(72)
            .border_color(Color::Cyan)
            .left_aligned()
            .lines(text.lines().map(|l| Line::from(l.to_string())))
            .scrolled(*scroll, area.height)
            .render(frame, area),

        Dialog::Edit { container, form } => form_dialog(format!("Edit {}", container), form)
            .help("Tab: Next  Space: Toggle  Enter: Save  Esc: Cancel")
            .render(frame, area),

        Dialog::Clone { container, form } => form_dialog(format!("Clone {}", container), form)
            .help("Tab: Next  Enter: Clone  Esc: Cancel")
            .render(frame, area),

        Dialog::CreateSnapshot { container, form } => {
            form_dialog(format!("Snapshot {}", container), form)
                .help("Enter: Create  Esc: Cancel")
                .render(frame, area)
        }

        Dialog::Snapshots {
            container,
            snapshots,
        } => {
            let selected = snapshots.selected_index();
            let lines = snapshots.iter().enumerate().map(|(i, snap)| {
                let style = if i == selected {
                    Style::default().fg(Color::Black).bg(Color::Cyan)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(
                    format!(" {:<24} {}", snap.name, snap.created),
                    style,
                ))
            });
            DialogBuilder::new(format!("Snapshots of {}", container))
                .width(60)
                .border_color(Color::Cyan)
                .left_aligned()
                .lines(lines)
                .empty_line()
                .help("Enter: Destroy  Esc: Close")
                .render(frame, area);
        }

        Dialog::Confirm(action) => {
            let message = match action {
                ConfirmAction::Destroy(name) => format!("Destroy {} {}?", app.kind.noun(), name),
                ConfirmAction::DestroySnapshot {
                    container,
                    snapshot,
                } => format!("Destroy snapshot {} of {}?", snapshot, container),
            };
            DialogBuilder::new("Confirm")
                .width(50)
                .border_color(Color::Red)
                .empty_line()
                .message(message)
                .empty_line()
                .buttons(app.dialog_focus)
                .empty_line()
                .help("y: Yes  n/Esc: No  Tab: Switch")
                .render(frame, area);
        }
    }
}

/// Label/value rows of a form; the focused field shows its cursor
fn form_dialog(title: String, form: &Form) -> DialogBuilder<'static> {
    let mut builder = DialogBuilder::new(title)
        .width(56)
        .left_aligned()
        .empty_line();

    for (i, field) in form.fields().iter().enumerate() {
        let focused = i == form.focus();
        let label_style = if focused {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().fg(Color::Gray)
        };
        let mut spans = vec![Span::styled(format!(" {:>13}: ", field.label), label_style)];

        match &field.value {
            FieldValue::Toggle(on) => {
                let mark = if *on { "[X]" } else { "[ ]" };
                spans.push(Span::styled(mark, label_style));
            }
            FieldValue::Text(input) if focused => {
                let mut after = input.after_cursor().chars();
                let under = after.next().map(String::from).unwrap_or_else(|| " ".into());
                spans.push(Span::raw(input.before_cursor().to_string()));
                spans.push(Span::styled(under, Style::default().add_modifier(Modifier::REVERSED)));
                spans.push(Span::raw(after.as_str().to_string()));
            }
            FieldValue::Text(input) => spans.push(Span::raw(input.value().to_string())),
        }

        builder = builder.styled_message(Line::from(spans));
    }

    builder.empty_line()
}

use super::*;

pub(super) fn draw_header_with_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = ContainerKind::ALL
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let number = format!("{}:", i + 1);
            if *kind == app.kind {
                Line::from(vec![
                    Span::styled(number, Style::default().fg(Color::Yellow)),
                    Span::styled(kind.title(), Style::default().fg(Color::White).bold()),
                ])
            } else {
                Line::from(vec![
                    Span::styled(number, Style::default().fg(Color::DarkGray)),
                    Span::styled(kind.title(), Style::default().fg(Color::Gray)),
                ])
            }
        })
        .collect();

    let title = match &app.node_name {
        Some(node) => format!(" cbsd-tui - {} ", node),
        None => " cbsd-tui ".to_string(),
    };
    let selected = ContainerKind::ALL
        .iter()
        .position(|k| *k == app.kind)
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(Span::styled(title, Style::default().fg(Color::Cyan).bold()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .select(selected)
        .style(Style::default())
        .highlight_style(Style::default())
        .divider(" │ ");

    frame.render_widget(tabs, area);
}

/// Context help for the status line when there is no message
fn key_hints(app: &App) -> &'static str {
    match app.view {
        View::Output if app.output.is_finished() => "q/Esc: Close  ↑/↓ PgUp/PgDn: Scroll  End: Follow",
        View::Output => "Running...  ↑/↓ PgUp/PgDn: Scroll  End: Follow",
        View::Main if app.dialog.is_some() => "Esc: Close",
        View::Main => "Enter: Login  Tab/1-3: Kind  r: Reload  Ctrl-T: Reset console  q: Quit",
    }
}

/// The function-key bar as plain text
pub fn bottom_bar_text(kind: ContainerKind) -> String {
    kind.bottom_menu()
        .iter()
        .map(|item| format!("{}{}", item.key_label(), item.label(kind)))
        .collect()
}

pub(super) fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let status = match &app.status_message {
        Some(msg) => Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Yellow))),
        None => Line::from(Span::styled(key_hints(app), Style::default().fg(Color::DarkGray))),
    };

    let mut keys = Vec::new();
    for item in app.kind.bottom_menu() {
        keys.push(Span::styled(item.key_label(), Style::default().fg(Color::White)));
        keys.push(Span::styled(
            item.label(app.kind),
            Style::default().fg(Color::Black).bg(Color::Cyan),
        ));
    }

    frame.render_widget(Paragraph::new(vec![status, Line::from(keys)]), area);
}

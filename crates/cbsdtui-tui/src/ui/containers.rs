use super::*;

/// Column widths by position; the last column takes what is left
const COLUMN_WIDTHS: [u16; 5] = [22, 16, 12, 10, 14];

pub(super) fn draw_containers(frame: &mut Frame, app: &mut App, area: Rect) {
    let title = format!(" {} ({}) ", app.kind.title(), app.containers.len());

    if app.containers.is_empty() {
        let empty = Paragraph::new(format!(
            "No {} found.\n\nTab switches between jails, bhyve and QEMU VMs.",
            app.kind.title()
        ))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().title(title).borders(Borders::ALL))
        .wrap(Wrap { trim: true });

        frame.render_widget(empty, area);
        return;
    }

    let headers = app.kind.headers();
    let header = Row::new(headers.iter().map(|h| Cell::from(*h)))
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .bottom_margin(1);

    let active = app.active_console();
    let rows: Vec<Row> = app
        .containers
        .iter()
        .map(|container| {
            let mut cells = container.row_cells();
            if active.as_deref() == Some(container.name()) {
                cells[0].push_str(" [C]");
            }
            Row::new(cells).style(Style::default().fg(tone_color(container.row_tone())))
        })
        .collect();

    let last = headers.len().saturating_sub(1);
    let widths: Vec<Constraint> = (0..headers.len())
        .map(|i| {
            if i == last {
                Constraint::Min(10)
            } else {
                Constraint::Length(COLUMN_WIDTHS.get(i).copied().unwrap_or(12))
            }
        })
        .collect();

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(Style::default().bg(Color::DarkGray).bold())
        .highlight_symbol("▶ ");

    frame.render_stateful_widget(table, area, app.containers.table_state_mut());
}

use super::*;

/// Output of the running or last command, following the tail unless scrolled
pub(super) fn draw_output(frame: &mut Frame, app: &mut App, area: Rect) {
    let inner_height = area.height.saturating_sub(2) as usize;
    app.output_viewport = inner_height;
    let total_lines = app.output.line_count();
    let max_scroll = total_lines.saturating_sub(inner_height);

    let scroll = if app.output_auto_scroll {
        max_scroll
    } else {
        app.output_scroll.min(max_scroll)
    };

    let text: Vec<Line> = app
        .output
        .lines()
        .enumerate()
        .skip(scroll)
        .take(inner_height)
        .map(|(i, line)| {
            let clean_line = line.replace('\r', "");
            let line_num = Span::styled(
                format!("{:>4} ", i + 1),
                Style::default().fg(Color::DarkGray),
            );

            match clean_line.into_text() {
                Ok(text) => {
                    let mut spans = vec![line_num];
                    if let Some(first_line) = text.lines.into_iter().next() {
                        spans.extend(first_line.spans);
                    }
                    Line::from(spans)
                }
                Err(_) => Line::from(vec![line_num, Span::raw(clean_line)]),
            }
        })
        .collect();

    let finished = app.output.is_finished();
    let state = if finished {
        "Press q to close"
    } else {
        "Running..."
    };
    let title = if total_lines > 0 {
        format!(
            " {} [{}/{}] - {} ",
            app.output_title,
            scroll + 1,
            total_lines,
            state
        )
    } else {
        format!(" {} - {} ", app.output_title, state)
    };

    let border_color = if finished { Color::Green } else { Color::Yellow };

    let output = Paragraph::new(text).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color)),
    );

    frame.render_widget(output, area);

    if total_lines > inner_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("▲"))
            .end_symbol(Some("▼"));
        let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);

        let scrollbar_area = Rect {
            x: area.x + area.width.saturating_sub(1),
            y: area.y + 1,
            width: 1,
            height: area.height.saturating_sub(2),
        };
        frame.render_stateful_widget(scrollbar, scrollbar_area, &mut scrollbar_state);
    }
}

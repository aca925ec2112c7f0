//! Modal dialog builder
//!
//! Every dialog shares the same frame: a titled, bordered box centered over
//! the table, with lines added top to bottom.

use crate::app::DialogFocus;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

pub struct DialogBuilder<'a> {
    title: String,
    lines: Vec<Line<'a>>,
    width: u16,
    border_color: Color,
    alignment: Alignment,
    scroll: u16,
    max_height: Option<u16>,
}

impl<'a> DialogBuilder<'a> {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
            width: 50,
            border_color: Color::Yellow,
            alignment: Alignment::Center,
            scroll: 0,
            max_height: None,
        }
    }

    pub fn width(mut self, w: u16) -> Self {
        self.width = w;
        self
    }

    pub fn border_color(mut self, color: Color) -> Self {
        self.border_color = color;
        self
    }

    /// Left-align the body instead of centering it
    pub fn left_aligned(mut self) -> Self {
        self.alignment = Alignment::Left;
        self
    }

    /// Cap the dialog height and show the body from line `scroll`
    pub fn scrolled(mut self, scroll: u16, max_height: u16) -> Self {
        self.scroll = scroll;
        self.max_height = Some(max_height);
        self
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::from(text.into()));
        self
    }

    pub fn styled_message(mut self, line: Line<'a>) -> Self {
        self.lines.push(line);
        self
    }

    pub fn lines<I>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = Line<'a>>,
    {
        self.lines.extend(lines);
        self
    }

    pub fn empty_line(mut self) -> Self {
        self.lines.push(Line::from(""));
        self
    }

    /// Confirm/Cancel buttons with focus highlighting
    pub fn buttons(mut self, focus: DialogFocus) -> Self {
        let confirm_style = if focus == DialogFocus::Confirm {
            Style::default().bg(Color::Green).fg(Color::Black).bold()
        } else {
            Style::default().fg(Color::Green)
        };
        let cancel_style = if focus == DialogFocus::Cancel {
            Style::default().bg(Color::Red).fg(Color::White).bold()
        } else {
            Style::default().fg(Color::Red)
        };

        self.lines.push(Line::from(vec![
            Span::styled("  Confirm  ", confirm_style),
            Span::raw("    "),
            Span::styled("  Cancel  ", cancel_style),
        ]));
        self
    }

    pub fn help(mut self, text: impl Into<String>) -> Self {
        self.lines.push(Line::from(Span::styled(
            text.into(),
            Style::default().fg(Color::DarkGray),
        )));
        self
    }

    /// Render the dialog centered in `area`
    pub fn render(self, frame: &mut Frame, area: Rect) {
        let mut height = (self.lines.len() as u16) + 2;
        if let Some(max) = self.max_height {
            height = height.min(max);
        }
        let dialog_area = centered_rect(self.width, height, area);

        frame.render_widget(Clear, dialog_area);

        let dialog = Paragraph::new(self.lines)
            .alignment(self.alignment)
            .wrap(Wrap { trim: false })
            .scroll((self.scroll, 0))
            .block(
                Block::default()
                    .title(format!(" {} ", self.title))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.border_color)),
            );

        frame.render_widget(dialog, dialog_area);
    }
}

/// A `width` x `height` rectangle centered in `area`, clamped to it
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

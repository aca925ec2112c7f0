//! UI rendering for the TUI application

mod containers;
mod dialogs;
mod header_footer;
mod output;

use crate::app::{App, ConfirmAction, Dialog, View};
use crate::widgets::{DialogBuilder, FieldValue, Form};
use ansi_to_tui::IntoText;
use cbsdtui_core::{ContainerKind, RowTone};
use ratatui::{
    prelude::*,
    widgets::{
        Block, Borders, Cell, Paragraph, Row, Scrollbar, ScrollbarOrientation, ScrollbarState,
        Table, Tabs, Wrap,
    },
};

use containers::*;
use dialogs::*;
use header_footer::*;
use output::*;

pub use dialogs::help_lines;
pub use header_footer::bottom_bar_text;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
    let area = frame.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with kind tabs
            Constraint::Min(0),    // Content
            Constraint::Length(2), // Status line and function keys
        ])
        .split(area);

    draw_header_with_tabs(frame, app, chunks[0]);

    match app.view {
        View::Main => {
            draw_containers(frame, app, chunks[1]);
            draw_dialog(frame, app, chunks[1]);
        }
        View::Output => draw_output(frame, app, chunks[1]),
    }

    draw_footer(frame, app, chunks[2]);
}

fn tone_color(tone: RowTone) -> Color {
    match tone {
        RowTone::Running => Color::Green,
        RowTone::StoppedAutostart => Color::Red,
        RowTone::Stopped => Color::White,
        RowTone::Other => Color::Gray,
    }
}

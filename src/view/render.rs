use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::channel::ConnectionStatus;
use crate::view::state::{PublishStatus, ViewState};
use crate::view::theme::{ACCENT, BORDER, MUTED, STATUS_ERROR, STATUS_OK, TEXT};

const QUESTION: &str = "What is your name?";
const PROMPT: &str = "Name: ";

pub fn draw(frame: &mut Frame<'_>, state: &ViewState) {
    let area = frame.area();
    if !fits(area) {
        frame.render_widget(
            Paragraph::new("Terminal too small").style(Style::default().fg(MUTED)),
            area,
        );
        return;
    }

    let [card, input, status, hints] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(1),
    ])
    .areas(area);

    frame.render_widget(card_widget(state), card);
    frame.render_widget(input_widget(state), input);
    frame.render_widget(status_widget(state), status);
    frame.render_widget(
        Paragraph::new(" Enter: Submit │ Esc/Ctrl+C: Quit")
            .style(Style::default().fg(MUTED).add_modifier(Modifier::DIM)),
        hints,
    );

    if input.width > 2 && input.height > 2 {
        let typed = (PROMPT.chars().count() + state.input.chars().count()) as u16;
        let x = input.x + 1 + typed.min(input.width.saturating_sub(3));
        frame.set_cursor_position((x, input.y + 1));
    }
}

fn card_widget(state: &ViewState) -> Paragraph<'static> {
    let name = match &state.displayed {
        Some(name) => Span::styled(
            name.clone(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        None => Span::styled("(nobody yet)", Style::default().fg(MUTED)),
    };
    Paragraph::new(vec![
        Line::from(Span::styled(QUESTION, Style::default().fg(TEXT))),
        Line::from(name),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER))
            .title(format!(" {} ", state.event_name)),
    )
}

fn input_widget(state: &ViewState) -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::styled(PROMPT, Style::default().fg(MUTED)),
        Span::styled(state.input.clone(), Style::default().fg(TEXT)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER)),
    )
}

fn status_widget(state: &ViewState) -> Paragraph<'static> {
    let (connection, connection_color) = connection_label(state.connection);
    let (publish, publish_color) = publish_label(&state.publish);
    Paragraph::new(Line::from(vec![
        Span::styled(format!(" {connection}"), Style::default().fg(connection_color)),
        Span::styled(" │ ", Style::default().fg(MUTED)),
        Span::styled(publish, Style::default().fg(publish_color)),
    ]))
}

fn connection_label(status: ConnectionStatus) -> (&'static str, Color) {
    match status {
        ConnectionStatus::Connecting => ("connecting", MUTED),
        ConnectionStatus::Open => ("live", STATUS_OK),
        ConnectionStatus::Reconnecting => ("reconnecting", STATUS_ERROR),
        ConnectionStatus::Closed => ("closed", STATUS_ERROR),
    }
}

/// Text and color for the publish part of the status line.
pub fn publish_label(status: &PublishStatus) -> (String, Color) {
    match status {
        PublishStatus::Idle => (String::new(), MUTED),
        PublishStatus::Sending => ("sending…".to_string(), MUTED),
        PublishStatus::Sent => ("sent".to_string(), STATUS_OK),
        PublishStatus::Failed(message) => (format!("failed: {message}"), STATUS_ERROR),
    }
}

/// Whether `area` has room for the form.
pub fn fits(area: Rect) -> bool {
    area.height >= 8 && area.width >= (QUESTION.len() as u16 + 4)
}

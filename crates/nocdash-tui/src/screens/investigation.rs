//! Investigation screen — streamed AI analysis transcript.
//!
//! Shows the transcript of the current investigation with an in-flight
//! indicator while tokens are still streaming. Auto-follows the tail
//! unless the operator scrolls up.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Wrap};

use nocdash_core::{ChatRole, ChatState};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

const SPINNER: [&str; 4] = ["⠋", "⠙", "⠸", "⠴"];

pub struct InvestigationScreen {
    focused: bool,
    chat: Arc<ChatState>,
    /// Lines scrolled up from the tail. 0 = following the stream.
    scroll_up: u16,
    /// Tick counter driving the streaming spinner.
    ticks: usize,
}

impl InvestigationScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            chat: Arc::new(ChatState::default()),
            scroll_up: 0,
            ticks: 0,
        }
    }

    fn transcript_lines(&self) -> Vec<Line<'_>> {
        let mut lines = Vec::new();
        for message in &self.chat.messages {
            let (prefix, style) = match message.role {
                ChatRole::User => ("you", Style::default().fg(theme::ACCENT_CYAN)),
                ChatRole::Assistant => ("ai", Style::default().fg(theme::OK_GREEN)),
                ChatRole::System => ("sys", Style::default().fg(theme::FG_DIM)),
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("[{}] ", message.timestamp.format("%H:%M:%S")),
                    Style::default().fg(theme::FG_DIM),
                ),
                Span::styled(format!("{prefix}: "), style),
            ]));
            for text_line in message.content.lines() {
                lines.push(Line::from(Span::styled(
                    text_line.to_owned(),
                    theme::table_row(),
                )));
            }
            lines.push(Line::from(""));
        }
        lines
    }
}

impl Component for InvestigationScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll_up = self.scroll_up.saturating_add(1);
                Ok(None)
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll_up = self.scroll_up.saturating_sub(1);
                Ok(None)
            }
            // Snap back to the tail and resume following.
            KeyCode::Char('G') => {
                self.scroll_up = 0;
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ChatUpdated(chat) => {
                self.chat = Arc::clone(chat);
            }
            Action::Tick => {
                self.ticks = self.ticks.wrapping_add(1);
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let title = match &self.chat.investigation_id {
            Some(id) => format!(" Investigation {id} "),
            None => " Investigation ".to_owned(),
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let layout = Layout::vertical([
            Constraint::Min(1),    // transcript
            Constraint::Length(1), // streaming indicator / hints
        ])
        .split(inner);

        if self.chat.messages.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "  No investigation yet. Press i on an alarm to start one.",
                    Style::default().fg(theme::FG_DIM),
                ))),
                layout[0],
            );
        } else {
            let lines = self.transcript_lines();
            // Follow the tail: scroll so the last lines are visible,
            // minus however far the operator has scrolled up.
            let total = u16::try_from(lines.len()).unwrap_or(u16::MAX);
            let visible = layout[0].height;
            let tail = total.saturating_sub(visible);
            let scroll = tail.saturating_sub(self.scroll_up);

            frame.render_widget(
                Paragraph::new(lines)
                    .wrap(Wrap { trim: false })
                    .scroll((scroll, 0)),
                layout[0],
            );
        }

        let footer = if self.chat.streaming {
            Line::from(vec![
                Span::styled(
                    format!("  {} analyzing…", SPINNER[self.ticks % SPINNER.len()]),
                    Style::default().fg(theme::WARNING_YELLOW),
                ),
                Span::styled("   j/k ", theme::key_hint_key()),
                Span::styled("scroll", theme::key_hint()),
            ])
        } else {
            Line::from(vec![
                Span::styled("  j/k ", theme::key_hint_key()),
                Span::styled("scroll  ", theme::key_hint()),
                Span::styled("G ", theme::key_hint_key()),
                Span::styled("follow tail  ", theme::key_hint()),
                Span::styled("Esc ", theme::key_hint_key()),
                Span::styled("back", theme::key_hint()),
            ])
        };
        frame.render_widget(Paragraph::new(footer), layout[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Investigation"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nocdash_core::ChatMessage;

    #[test]
    fn transcript_renders_roles_and_content() {
        let mut screen = InvestigationScreen::new();
        let state = ChatState {
            investigation_id: Some("inv-1".into()),
            messages: vec![
                ChatMessage::new(ChatRole::System, "Starting investigation for: High CPU"),
                ChatMessage::new(ChatRole::Assistant, "Checking web-01.\nLoad is high."),
            ],
            streaming: true,
        };
        screen
            .update(&Action::ChatUpdated(Arc::new(state)))
            .unwrap();

        let lines = screen.transcript_lines();
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        assert!(text.iter().any(|l| l.contains("sys: ")));
        assert!(text.iter().any(|l| l == "Starting investigation for: High CPU"));
        // Multi-line assistant content becomes separate lines.
        assert!(text.iter().any(|l| l == "Checking web-01."));
        assert!(text.iter().any(|l| l == "Load is high."));
    }
}

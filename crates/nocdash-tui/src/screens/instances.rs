//! Instances screen — one card per monitoring instance.
//!
//! Enter on a card toggles the dashboard-wide instance filter: the
//! alarm list narrows to that instance until it is toggled off again.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use nocdash_core::{Instance, InstanceStatus};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

pub struct InstancesScreen {
    focused: bool,
    instances: Vec<Arc<Instance>>,
    selected: usize,
    /// Instance currently used as the dashboard filter, if any.
    filter: Option<String>,
}

impl InstancesScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            instances: Vec::new(),
            selected: 0,
            filter: None,
        }
    }

    fn clamp_selection(&mut self) {
        if self.instances.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.instances.len() - 1);
        }
    }

    fn render_card(&self, frame: &mut Frame, area: Rect, idx: usize, instance: &Instance) {
        let is_selected = idx == self.selected && self.focused;
        let is_filter = self.filter.as_deref() == Some(instance.id.as_str());

        let title = if is_filter {
            format!(" {} ● filtering ", instance.name)
        } else {
            format!(" {} ", instance.name)
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if is_selected {
                theme::border_focused()
            } else {
                theme::border_default()
            });
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (dot, status_text) = match instance.status {
            InstanceStatus::Connected => ("●", "connected"),
            InstanceStatus::Error => ("○", "error"),
            InstanceStatus::Disconnected => ("◐", "disconnected"),
        };
        let mut lines = vec![Line::from(vec![
            Span::styled(
                format!(" {dot} {status_text}"),
                Style::default().fg(theme::status_color(instance.status)),
            ),
            Span::styled(
                instance
                    .version
                    .as_deref()
                    .map(|v| format!("   v{v}"))
                    .unwrap_or_default(),
                Style::default().fg(theme::FG_DIM),
            ),
        ])];

        if let Some(counts) = &instance.problem_counts {
            lines.push(Line::from(vec![
                Span::styled(" problems: ", Style::default().fg(theme::FG_DIM)),
                Span::styled(
                    format!("{} ", counts.disaster),
                    Style::default().fg(theme::DISASTER_RED),
                ),
                Span::styled(
                    format!("{} ", counts.high),
                    Style::default().fg(theme::HIGH_ORANGE),
                ),
                Span::styled(
                    format!("{} ", counts.average),
                    Style::default().fg(theme::AVERAGE_AMBER),
                ),
                Span::styled(
                    format!("{} ", counts.warning),
                    Style::default().fg(theme::WARNING_YELLOW),
                ),
                Span::styled(
                    format!("({} total)", counts.total()),
                    Style::default().fg(theme::FG_DIM),
                ),
            ]));
        }

        if let Some(error) = &instance.error {
            lines.push(Line::from(Span::styled(
                format!(" {error}"),
                Style::default().fg(theme::DISASTER_RED),
            )));
        }

        if let Some(sync) = instance.last_sync {
            lines.push(Line::from(Span::styled(
                format!(" last sync {}", sync.format("%H:%M:%S")),
                Style::default().fg(theme::FG_DIM),
            )));
        }

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

impl Component for InstancesScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Char('l') | KeyCode::Right => {
                if !self.instances.is_empty() {
                    self.selected = (self.selected + 1) % self.instances.len();
                }
                Ok(None)
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::Char('h') | KeyCode::Left => {
                if !self.instances.is_empty() {
                    self.selected =
                        (self.selected + self.instances.len() - 1) % self.instances.len();
                }
                Ok(None)
            }
            KeyCode::Enter => Ok(self
                .instances
                .get(self.selected)
                .map(|i| Action::ToggleInstanceFilter(i.id.clone()))),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::InstancesUpdated(instances) => {
                self.instances = instances.iter().map(Arc::clone).collect();
                self.clamp_selection();
            }
            Action::SelectedInstanceChanged(filter) => {
                self.filter.clone_from(filter);
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" Instances ({}) ", self.instances.len()))
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

        if self.instances.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    " No instances reported by the backend yet.",
                    Style::default().fg(theme::FG_DIM),
                ))),
                inner,
            );
            return;
        }

        let layout = Layout::vertical([
            Constraint::Min(1),    // cards
            Constraint::Length(1), // hints
        ])
        .split(inner);

        // One card row per instance, 6 rows tall, as many as fit.
        let card_height = 6u16;
        let visible = (layout[0].height / card_height).max(1) as usize;
        let first = self.selected.saturating_sub(visible.saturating_sub(1));

        let mut y = layout[0].y;
        for (idx, instance) in self
            .instances
            .iter()
            .enumerate()
            .skip(first)
            .take(visible)
        {
            let card = Rect::new(
                layout[0].x,
                y,
                layout[0].width,
                card_height.min(layout[0].bottom().saturating_sub(y)),
            );
            if card.height < 3 {
                break;
            }
            self.render_card(frame, card, idx, instance);
            y += card_height;
        }

        let hints = Line::from(vec![
            Span::styled(" j/k ", theme::key_hint_key()),
            Span::styled("move  ", theme::key_hint()),
            Span::styled("Enter ", theme::key_hint_key()),
            Span::styled("filter alarms by instance", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[1]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Instances"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use nocdash_core::Instance;

    fn instance(id: &str) -> Arc<Instance> {
        Arc::new(Instance {
            id: id.into(),
            name: format!("Zabbix {id}"),
            status: InstanceStatus::Connected,
            version: None,
            error: None,
            problem_counts: None,
            last_sync: None,
        })
    }

    #[test]
    fn selection_survives_shrinking_fleet() {
        let mut screen = InstancesScreen::new();
        screen
            .update(&Action::InstancesUpdated(Arc::new(vec![
                instance("a"),
                instance("b"),
                instance("c"),
            ])))
            .unwrap();
        screen.selected = 2;

        screen
            .update(&Action::InstancesUpdated(Arc::new(vec![instance("a")])))
            .unwrap();
        assert_eq!(screen.selected, 0);
    }

    #[test]
    fn enter_dispatches_filter_toggle() {
        let mut screen = InstancesScreen::new();
        screen
            .update(&Action::InstancesUpdated(Arc::new(vec![
                instance("eu"),
                instance("us"),
            ])))
            .unwrap();

        let action = screen
            .handle_key_event(KeyEvent::from(KeyCode::Enter))
            .unwrap();
        assert!(matches!(action, Some(Action::ToggleInstanceFilter(ref id)) if id == "eu"));
    }
}

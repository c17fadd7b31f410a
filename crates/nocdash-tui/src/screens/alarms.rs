//! Alarms screen — the severity-colored alarm table.
//!
//! `a` acknowledges the selected alarm, `i` opens an AI investigation,
//! `s` cycles the severity filter, `u` toggles unacknowledged-only,
//! `c` clears all filters.

use std::sync::Arc;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use nocdash_core::{Alarm, AlarmFilters, AlarmStats, Severity};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

/// Severity filter cycle order: off, then most severe downward.
const SEVERITY_CYCLE: [Option<Severity>; 6] = [
    None,
    Some(Severity::Disaster),
    Some(Severity::High),
    Some(Severity::Average),
    Some(Severity::Warning),
    Some(Severity::Information),
];

fn next_severity_filter(current: Option<Severity>) -> Option<Severity> {
    let idx = SEVERITY_CYCLE
        .iter()
        .position(|s| *s == current)
        .unwrap_or(0);
    SEVERITY_CYCLE[(idx + 1) % SEVERITY_CYCLE.len()]
}

pub struct AlarmsScreen {
    focused: bool,
    alarms: Vec<Arc<Alarm>>,
    selected: usize,
    filters: AlarmFilters,
    stats: Option<AlarmStats>,
    poll_error: Option<String>,
}

impl AlarmsScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            alarms: Vec::new(),
            selected: 0,
            filters: AlarmFilters::default(),
            stats: None,
            poll_error: None,
        }
    }

    fn clamp_selection(&mut self) {
        if self.alarms.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.alarms.len() - 1);
        }
    }

    fn selected_alarm(&self) -> Option<&Arc<Alarm>> {
        self.alarms.get(self.selected)
    }

    fn filter_summary(&self) -> Line<'_> {
        let severity = self
            .filters
            .severities
            .first()
            .map_or("all", |s| s.as_str());
        let acked = match self.filters.acknowledged {
            Some(false) => "unacked",
            Some(true) => "acked",
            None => "all",
        };
        let instance = self.filters.instance_id.as_deref().unwrap_or("all");

        Line::from(vec![
            Span::styled("  severity ", Style::default().fg(theme::FG_DIM)),
            Span::styled(format!("[{severity}]"), Style::default().fg(theme::ACCENT_CYAN)),
            Span::styled("  ack ", Style::default().fg(theme::FG_DIM)),
            Span::styled(format!("[{acked}]"), Style::default().fg(theme::ACCENT_CYAN)),
            Span::styled("  instance ", Style::default().fg(theme::FG_DIM)),
            Span::styled(format!("[{instance}]"), Style::default().fg(theme::ACCENT_CYAN)),
        ])
    }

    fn stats_summary(&self) -> Line<'_> {
        let Some(stats) = &self.stats else {
            return Line::from(Span::styled("  no stats yet", Style::default().fg(theme::FG_DIM)));
        };
        Line::from(vec![
            Span::styled(format!("  {} active  ", stats.total), theme::table_row()),
            Span::styled(
                format!("{} ", stats.by_severity.disaster),
                Style::default().fg(theme::DISASTER_RED),
            ),
            Span::styled(
                format!("{} ", stats.by_severity.high),
                Style::default().fg(theme::HIGH_ORANGE),
            ),
            Span::styled(
                format!("{} ", stats.by_severity.average),
                Style::default().fg(theme::AVERAGE_AMBER),
            ),
            Span::styled(
                format!("{} ", stats.by_severity.warning),
                Style::default().fg(theme::WARNING_YELLOW),
            ),
        ])
    }
}

impl Component for AlarmsScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.alarms.is_empty() {
                    self.selected = (self.selected + 1).min(self.alarms.len() - 1);
                }
                Ok(None)
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                Ok(None)
            }
            KeyCode::Char('g') => {
                self.selected = 0;
                Ok(None)
            }
            KeyCode::Char('G') => {
                self.selected = self.alarms.len().saturating_sub(1);
                Ok(None)
            }
            KeyCode::Char('a') => Ok(self.selected_alarm().map(|alarm| {
                Action::AcknowledgeAlarm {
                    instance_id: alarm.instance_id.clone(),
                    alarm_id: alarm.id.clone(),
                }
            })),
            KeyCode::Char('i') => Ok(self.selected_alarm().map(|alarm| Action::Investigate {
                instance_id: alarm.instance_id.clone(),
                alarm_id: alarm.id.clone(),
            })),
            KeyCode::Char('s') => Ok(Some(Action::SetSeverityFilter(next_severity_filter(
                self.filters.severities.first().copied(),
            )))),
            KeyCode::Char('u') => Ok(Some(Action::ToggleAckFilter)),
            KeyCode::Char('c') => Ok(Some(Action::ClearFilters)),
            _ => Ok(None),
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::AlarmsUpdated(alarms) => {
                self.alarms = alarms.iter().map(Arc::clone).collect();
                self.clamp_selection();
            }
            Action::FiltersUpdated(filters) => {
                self.filters = filters.clone();
            }
            Action::StatsUpdated(stats) => {
                self.stats = stats.clone();
            }
            Action::PollError(error) => {
                self.poll_error.clone_from(error);
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" Alarms ({}) ", self.alarms.len()))
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
            Constraint::Length(1), // filters
            Constraint::Length(1), // stats / poll error
            Constraint::Min(1),    // table
            Constraint::Length(1), // hints
        ])
        .split(inner);

        frame.render_widget(Paragraph::new(self.filter_summary()), layout[0]);

        // A poll failure replaces the stats line until the next success.
        let status = match &self.poll_error {
            Some(error) => Line::from(Span::styled(
                format!("  poll failed: {error} (showing last good data)"),
                Style::default().fg(theme::DISASTER_RED),
            )),
            None => self.stats_summary(),
        };
        frame.render_widget(Paragraph::new(status), layout[1]);

        let header = Row::new([
            Cell::from("Sev"),
            Cell::from("Instance"),
            Cell::from("Host"),
            Cell::from("Description"),
            Cell::from("Age"),
            Cell::from("Ack"),
        ])
        .style(theme::table_header());

        let rows: Vec<Row> = self
            .alarms
            .iter()
            .map(|alarm| {
                let severity_style = Style::default().fg(theme::severity_color(alarm.severity));
                let ack = if alarm.acknowledged { "✓" } else { "" };
                let mut description = alarm.description.clone();
                if alarm.is_synthetic {
                    description.push_str(" [synthetic]");
                }
                Row::new([
                    Cell::from(Span::styled(alarm.severity.as_str(), severity_style)),
                    Cell::from(alarm.instance_name.clone()),
                    Cell::from(alarm.host.clone()),
                    Cell::from(Span::styled(description, severity_style)),
                    Cell::from(alarm.duration.clone()),
                    Cell::from(Span::styled(ack, Style::default().fg(theme::OK_GREEN))),
                ])
                .style(theme::table_row())
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(16),
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(3),
            ],
        )
        .header(header)
        .row_highlight_style(theme::table_selected());

        let mut state = TableState::default();
        if !self.alarms.is_empty() {
            state.select(Some(self.selected));
        }
        frame.render_stateful_widget(table, layout[2], &mut state);

        if self.alarms.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(
                    "  No active alarms match the current filters.",
                    Style::default().fg(theme::FG_DIM),
                ))),
                layout[2],
            );
        }

        let hints = Line::from(vec![
            Span::styled("  a ", theme::key_hint_key()),
            Span::styled("acknowledge  ", theme::key_hint()),
            Span::styled("i ", theme::key_hint_key()),
            Span::styled("investigate  ", theme::key_hint()),
            Span::styled("s ", theme::key_hint_key()),
            Span::styled("severity  ", theme::key_hint()),
            Span::styled("u ", theme::key_hint_key()),
            Span::styled("unacked  ", theme::key_hint()),
            Span::styled("c ", theme::key_hint_key()),
            Span::styled("clear filters", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[3]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &str {
        "Alarms"
    }
}

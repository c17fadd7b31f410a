//! Application core — event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nocdash_core::{HealthStatus, ServiceHealth, Session};

use crate::action::{Action, Notification, NotificationLevel};
use crate::component::Component;
use crate::data_bridge::run_data_bridge;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;

/// How many ticks (4 Hz) a notification stays visible.
const NOTIFICATION_TTL: u8 = 20;

/// Top-level application state and event loop.
pub struct App {
    session: Session,
    /// Current active screen.
    active_screen: ScreenId,
    /// Previous screen for GoBack.
    previous_screen: Option<ScreenId>,
    /// All screen components, keyed by ScreenId.
    screens: HashMap<ScreenId, Box<dyn Component>>,
    /// Whether the app should keep running.
    running: bool,
    /// Latest backend health report.
    health: Option<HealthStatus>,
    /// Last alarm poll failure, if any.
    poll_error: Option<String>,
    /// Transient status-bar notification with remaining ticks.
    notification: Option<(Notification, u8)>,
    /// Help overlay visibility.
    help_visible: bool,
    /// Action sender — components can dispatch actions through this.
    action_tx: mpsc::UnboundedSender<Action>,
    /// Action receiver — main loop drains this.
    action_rx: mpsc::UnboundedReceiver<Action>,
}

impl App {
    pub fn new(session: Session) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let screens: HashMap<ScreenId, Box<dyn Component>> =
            create_screens().into_iter().collect();

        Self {
            session,
            active_screen: ScreenId::Instances,
            previous_screen: None,
            screens,
            running: true,
            health: None,
            poll_error: None,
            notification: None,
            help_visible: false,
            action_tx,
            action_rx,
        }
    }

    /// Initialize all screen components with the action sender.
    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    /// Run the main event loop. This is the heart of the TUI.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.init_screens()?;

        let bridge_cancel = CancellationToken::new();
        let bridge = tokio::spawn(run_data_bridge(
            self.session.clone(),
            self.action_tx.clone(),
            bridge_cancel.clone(),
        ));

        let mut events = EventReader::new(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            // 1. Wait for the next event
            let Some(event) = events.next().await else {
                break;
            };

            // 2. Map event → action(s)
            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => {
                    self.action_tx.send(Action::Resize(w, h))?;
                }
                Event::Tick => {
                    self.action_tx.send(Action::Tick)?;
                }
                Event::Render => {
                    self.action_tx.send(Action::Render)?;
                }
            }

            // 3. Drain and process all queued actions
            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        bridge_cancel.cancel();
        let _ = bridge.await;
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys are delegated to the active screen component.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            // In help mode, Esc or ? closes help
            return match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Ok(Some(Action::ToggleHelp)),
                _ => Ok(None),
            };
        }

        // Global keybindings
        match (key.modifiers, key.code) {
            // Quit
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => return Ok(Some(Action::Quit)),
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),

            // Help
            (KeyModifiers::NONE, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),

            // Screen navigation via number keys
            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='3')) => {
                let n = c as u8 - b'0';
                if let Some(screen) = ScreenId::from_number(n) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            // Tab / Shift+Tab for screen cycling
            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (KeyModifiers::SHIFT, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            // Esc — context-dependent back
            (KeyModifiers::NONE, KeyCode::Esc) => return Ok(Some(Action::GoBack)),

            _ => {}
        }

        // Delegate to active screen component
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }

        Ok(None)
    }

    /// Process a single action — update app state and propagate to components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => {
                self.running = false;
            }

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {} → {}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.previous_screen = Some(self.active_screen);
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::GoBack => {
                if let Some(prev) = self.previous_screen.take() {
                    self.action_tx.send(Action::SwitchScreen(prev))?;
                }
            }

            Action::ToggleHelp => {
                self.help_visible = !self.help_visible;
            }

            Action::Notify(notification) => {
                self.notification = Some((notification.clone(), NOTIFICATION_TTL));
            }

            Action::Tick => {
                if let Some((_, ttl)) = &mut self.notification {
                    *ttl = ttl.saturating_sub(1);
                    if *ttl == 0 {
                        self.notification = None;
                    }
                }
                // Screens use ticks for animation.
                self.propagate_to_all(action)?;
            }

            // ── Session commands ──────────────────────────────────
            Action::ToggleInstanceFilter(id) => {
                let store = self.session.store();
                store.toggle_selected_instance(id);
                let mut filters = store.filters();
                filters.instance_id = store.selected_instance();
                self.session.set_filters(filters);
            }

            Action::SetSeverityFilter(severity) => {
                let mut filters = self.session.store().filters();
                filters.severities = severity.iter().copied().collect();
                self.session.set_filters(filters);
            }

            Action::ToggleAckFilter => {
                let mut filters = self.session.store().filters();
                filters.acknowledged = match filters.acknowledged {
                    Some(false) => None,
                    _ => Some(false),
                };
                self.session.set_filters(filters);
            }

            Action::ClearFilters => {
                let store = self.session.store();
                if let Some(id) = store.selected_instance() {
                    store.toggle_selected_instance(&id);
                }
                self.session.clear_filters();
            }

            Action::AcknowledgeAlarm {
                instance_id,
                alarm_id,
            } => {
                let session = self.session.clone();
                let tx = self.action_tx.clone();
                let (instance_id, alarm_id) = (instance_id.clone(), alarm_id.clone());
                tokio::spawn(async move {
                    let notification = match session
                        .acknowledge_alarm(&instance_id, &alarm_id)
                        .await
                    {
                        Ok(()) => Notification::success(format!("acknowledged {alarm_id}")),
                        Err(e) => Notification::error(e.to_string()),
                    };
                    let _ = tx.send(Action::Notify(notification));
                });
            }

            Action::Investigate {
                instance_id,
                alarm_id,
            } => {
                let session = self.session.clone();
                let tx = self.action_tx.clone();
                let (instance_id, alarm_id) = (instance_id.clone(), alarm_id.clone());
                tokio::spawn(async move {
                    match session.investigate(&instance_id, &alarm_id).await {
                        Ok(_) => {
                            let _ = tx.send(Action::SwitchScreen(ScreenId::Investigation));
                        }
                        Err(e) => {
                            let _ = tx.send(Action::Notify(Notification::error(e.to_string())));
                        }
                    }
                });
            }

            // ── Data events — every screen gets these ─────────────
            Action::AlarmsUpdated(_)
            | Action::InstancesUpdated(_)
            | Action::StatsUpdated(_)
            | Action::ChatUpdated(_)
            | Action::SelectedInstanceChanged(_)
            | Action::FiltersUpdated(_) => {
                self.propagate_to_all(action)?;
            }

            Action::HealthUpdated(health) => {
                self.health.clone_from(health);
            }

            Action::PollError(error) => {
                self.poll_error.clone_from(error);
                self.propagate_to_all(action)?;
            }

            // Render is handled in the main loop, not here
            Action::Render | Action::Resize(..) => {}
        }

        Ok(())
    }

    /// Push a data action to every screen, so inactive screens stay
    /// current and don't flash stale data when switched to.
    fn propagate_to_all(&mut self, action: &Action) -> Result<()> {
        for screen in self.screens.values_mut() {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    /// Render the full application frame.
    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        // Layout: [screen content] [tab bar] [status bar]
        let layout = Layout::vertical([
            Constraint::Min(1),    // Screen content
            Constraint::Length(1), // Tab bar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[0]);
        }

        self.render_tab_bar(frame, layout[1]);
        self.render_status_bar(frame, layout[2]);

        if self.help_visible {
            self.render_help_overlay(frame, area);
        }
    }

    /// Render the bottom tab bar.
    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(
                    format!(" {} {} ", id.number(), id.label()),
                    style,
                ))
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(
                ScreenId::ALL
                    .iter()
                    .position(|&s| s == self.active_screen)
                    .unwrap_or(0),
            );

        frame.render_widget(tabs, area);
    }

    /// Render the bottom status bar with backend health and key hints.
    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let health_indicator = match self.health.as_ref().map(|h| h.status) {
            Some(ServiceHealth::Healthy) => {
                Span::styled("● healthy", Style::default().fg(theme::OK_GREEN))
            }
            Some(ServiceHealth::Degraded) => {
                Span::styled("◐ degraded", Style::default().fg(theme::WARNING_YELLOW))
            }
            Some(ServiceHealth::Unhealthy) => {
                Span::styled("○ unhealthy", Style::default().fg(theme::DISASTER_RED))
            }
            None => Span::styled("○ waiting", Style::default().fg(theme::FG_DIM)),
        };

        let mut spans = vec![Span::raw(" "), health_indicator];

        if self.poll_error.is_some() {
            spans.push(Span::styled(
                "  ⚠ poll failing",
                Style::default().fg(theme::DISASTER_RED),
            ));
        }

        if let Some((notification, _)) = &self.notification {
            let color = match notification.level {
                NotificationLevel::Success => theme::OK_GREEN,
                NotificationLevel::Error => theme::DISASTER_RED,
                NotificationLevel::Info => theme::ACCENT_CYAN,
            };
            spans.push(Span::styled(
                format!("  {}", notification.message),
                Style::default().fg(color),
            ));
        } else {
            spans.push(Span::styled(" │ ? help  q quit", theme::key_hint()));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    /// Render the help overlay centered on screen.
    fn render_help_overlay(&self, frame: &mut Frame, area: Rect) {
        let help_width = 56u16.min(area.width.saturating_sub(4));
        let help_height = 18u16.min(area.height.saturating_sub(4));

        let x = (area.width.saturating_sub(help_width)) / 2;
        let y = (area.height.saturating_sub(help_height)) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        // Clear the background
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_DARK)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());

        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let row = |key: &'static str, desc: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(desc, theme::key_hint()),
            ])
        };

        let help_text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Navigation",
                Style::default().fg(theme::ACCENT_CYAN),
            )),
            row("1-3", "Jump to screen"),
            row("Tab", "Next screen"),
            row("j/k ↑/↓", "Move up/down"),
            row("Esc", "Back / close"),
            Line::from(""),
            Line::from(Span::styled(
                "  Alarms",
                Style::default().fg(theme::ACCENT_CYAN),
            )),
            row("a", "Acknowledge selected alarm"),
            row("i", "Start AI investigation"),
            row("s / u / c", "Severity / unacked / clear filters"),
            Line::from(""),
            Line::from(Span::styled(
                "  Instances",
                Style::default().fg(theme::ACCENT_CYAN),
            )),
            row("Enter", "Filter alarms by instance"),
            Line::from(""),
            Line::from(Span::styled(
                "                    Esc or ? to close",
                theme::key_hint(),
            )),
        ];

        frame.render_widget(Paragraph::new(help_text), inner);
    }
}

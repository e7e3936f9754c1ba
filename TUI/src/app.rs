use std::sync::Arc;
use std::time::{Duration, Instant};

use arboard::Clipboard;
use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::action::Action;
use crate::backend::{Backend, EmbeddingApi};
use crate::command::CommandParser;
use crate::config::{Config, COMMANDS};
use crate::effect::{Effect, Status, StatusKind};
use crate::plot::TerminalChart;
use crate::runtime::Runtime;
use crate::session::Session;
use crate::submission::EmbeddingPreview;
use crate::ui_state::{Focus, UIState};

/// What the status line currently shows and when it was set.
pub struct StatusLine {
    pub status: Status,
    pub at: DateTime<Local>,
    expires: Option<Instant>,
}

pub struct App {
    pub ui: UIState,
    pub session: Session<TerminalChart>,
    pub preview: Option<EmbeddingPreview>,
    pub status: Option<StatusLine>,
    pub api_url: String,
    pub animation_frame: usize,
    pub should_quit: bool,
    runtime: Runtime,
    success_ttl: Duration,
    animation_frame_mod: usize,
}

impl App {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let backend = Backend::new(config.api_url.as_str(), config.request_timeout)?;
        let api_url = backend.base_url().to_string();
        let mut app = Self::with_api(config, Arc::new(backend));
        app.api_url = api_url;
        Ok(app)
    }

    pub fn with_api(config: Config, api: Arc<dyn EmbeddingApi>) -> Self {
        Self {
            ui: UIState::new(),
            session: Session::new(
                TerminalChart::new(),
                config.overflow_policy,
                config.preview_components,
            ),
            preview: None,
            status: None,
            api_url: config.api_url,
            animation_frame: 0,
            should_quit: false,
            runtime: Runtime::new(api),
            success_ttl: config.success_status_ttl,
            animation_frame_mod: config.animation_frame_mod,
        }
    }

    /// Probe the backend and load the initial set of points.
    pub fn start(&mut self) {
        self.set_status(Status::loading("Connecting..."));
        let effects = self.session.start();
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Request(request) => self.runtime.dispatch(request),
                Effect::Status(status) => self.set_status(status),
                Effect::ShowEmbedding(preview) => self.preview = Some(preview),
                Effect::ClearPreview => self.preview = None,
                Effect::ClearInput => {
                    self.ui.input.clear();
                    self.reset_command_selection();
                }
            }
        }
    }

    fn set_status(&mut self, status: Status) {
        let expires = (status.kind == StatusKind::Success).then(|| Instant::now() + self.success_ttl);
        self.status = Some(StatusLine {
            status,
            at: Local::now(),
            expires,
        });
    }

    /// Feed every finished request back into the session.
    pub fn pump(&mut self) {
        while let Some(completion) = self.runtime.try_next() {
            let effects = self.session.complete(completion);
            self.apply(effects);
        }
    }

    pub fn tick(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % self.animation_frame_mod.max(1);

        // Success messages fade after a while, everything else stays
        if let Some(expires) = self.status.as_ref().and_then(|line| line.expires) {
            if Instant::now() >= expires {
                self.status = None;
            }
        }
    }

    /// Check if command popup should be shown
    pub fn showing_command_popup(&self) -> bool {
        self.ui.input.starts_with('/') && !self.ui.input.contains(' ')
    }

    /// Get filtered commands based on current input
    pub fn get_filtered_commands(&self) -> Vec<(&'static str, &'static str)> {
        let Some(filter) = self.ui.input.strip_prefix('/') else {
            return vec![];
        };
        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd[1..].starts_with(filter))
            .copied()
            .collect()
    }

    /// Move selection up in command popup
    pub fn command_select_up(&mut self) {
        let filtered = self.get_filtered_commands();
        if filtered.is_empty() {
            return;
        }

        // Cycle: None -> last command -> ... -> 0 -> None
        self.ui.command_selection = match self.ui.command_selection {
            None => Some(filtered.len() - 1),
            Some(0) => None,
            Some(n) => Some(n - 1),
        };
    }

    /// Move selection down in command popup
    pub fn command_select_down(&mut self) {
        let filtered = self.get_filtered_commands();
        if filtered.is_empty() {
            return;
        }

        // Cycle: None -> 0 -> 1 -> ... -> last -> None
        self.ui.command_selection = match self.ui.command_selection {
            None => Some(0),
            Some(n) if n >= filtered.len() - 1 => None,
            Some(n) => Some(n + 1),
        };
    }

    /// Apply selected command to input
    pub fn apply_command_selection(&mut self) {
        if let Some(idx) = self.ui.command_selection {
            if let Some((cmd, _)) = self.get_filtered_commands().get(idx) {
                self.ui.input = cmd.to_string();
            }
        }
        self.ui.command_selection = None;
    }

    /// Reset command selection when input changes
    pub fn reset_command_selection(&mut self) {
        self.ui.command_selection = None;
    }

    /// Enter in the input box: run a slash command or embed the text.
    pub fn submit_input(&mut self) {
        if self.ui.input.trim_start().starts_with('/') {
            let input = std::mem::take(&mut self.ui.input);
            self.reset_command_selection();
            match CommandParser::parse(&input) {
                Ok(action) => self.perform(action),
                Err(message) => self.set_status(Status::error(message)),
            }
            return;
        }

        let effects = self.session.submit(&self.ui.input);
        self.apply(effects);
    }

    pub fn perform(&mut self, action: Action) {
        debug!(?action, "performing action");
        match action {
            Action::Help => self.ui.show_help = true,
            Action::Refresh => {
                let effects = self.session.reload();
                self.apply(effects);
            }
            Action::Deselect => {
                if self.session.selection().is_empty() {
                    return;
                }
                let effects = self.session.clear_selection();
                self.apply(effects);
            }
            Action::ClearAll => {
                if !self.session.is_resetting() {
                    self.ui.confirm_reset = true;
                }
            }
            Action::Health => {
                self.set_status(Status::loading("Checking backend..."));
                let effects = self.session.check_health();
                self.apply(effects);
            }
            Action::Quit => self.should_quit = true,
        }
    }

    /// Answer to the "delete everything" prompt.
    pub fn confirm_reset(&mut self, confirmed: bool) {
        self.ui.confirm_reset = false;
        if confirmed {
            let effects = self.session.reset_all();
            self.apply(effects);
        }
    }

    pub fn click_at(&mut self, column: u16, row: u16) {
        let Some(hit) = self.session.chart().surface().hit_at(column, row) else {
            return;
        };
        self.ui.focus = Focus::Chart;
        debug!(chart = ?self.session.chart().current(), index = ?hit.index, "chart click");
        let effects = self.session.click(hit);
        self.apply(effects);
    }

    pub fn hover_at(&mut self, column: u16, row: u16) {
        self.session.chart_mut().surface_mut().hover_at(column, row);
    }

    pub fn move_cursor(&mut self, forward: bool) {
        self.session.chart_mut().surface_mut().move_cursor(forward);
    }

    /// Space on the chart: toggle the point under the keyboard cursor.
    pub fn toggle_cursor(&mut self) {
        if let Some(hit) = self.session.chart().surface().cursor_hit() {
            let effects = self.session.click(hit);
            self.apply(effects);
        }
    }

    pub fn cycle_focus(&mut self) {
        self.ui.focus = match self.ui.focus {
            Focus::Input => Focus::Chart,
            Focus::Chart => {
                self.session.chart_mut().surface_mut().clear_hover();
                Focus::Input
            }
        };
    }

    /// The input is frozen while a submission is in flight, since its
    /// success clears the box.
    fn input_locked(&self) -> bool {
        !self.session.can_submit()
    }

    pub fn push_char(&mut self, c: char) {
        if self.input_locked() {
            return;
        }
        self.ui.input.push(c);
        self.reset_command_selection();
    }

    pub fn backspace(&mut self) {
        if self.input_locked() {
            return;
        }
        self.ui.input.pop();
        self.reset_command_selection();
    }

    /// Insert pasted text into the single-line input.
    pub fn paste(&mut self, text: &str) {
        if self.input_locked() {
            return;
        }
        let filtered: String = text
            .chars()
            .filter(|c| *c != '\r')
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        self.ui.input.push_str(&filtered);
        self.reset_command_selection();
    }

    /// Ctrl+V: read the system clipboard.
    pub fn paste_clipboard(&mut self) {
        match Clipboard::new().and_then(|mut clipboard| clipboard.get_text()) {
            Ok(text) => self.paste(&text),
            Err(err) => {
                warn!(error = %err, "clipboard unavailable");
                self.set_status(Status::error(format!("Clipboard error: {err}")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Completion;
    use crate::error::FetchError;
    use crate::point_store::{Point, PointId};
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app() -> App {
        App::new(Config::default()).unwrap()
    }

    fn load(app: &mut App, points: Vec<Point>) {
        let ticket = app
            .session
            .refresh()
            .into_iter()
            .find_map(|e| match e {
                Effect::Request(crate::effect::Request::ListPoints { ticket }) => Some(ticket),
                _ => None,
            })
            .unwrap();
        app.session.complete(Completion::Points {
            ticket,
            result: Ok(points),
        });
    }

    #[test]
    fn test_command_popup_filters_and_cycles() {
        let mut app = app();
        app.ui.input = "/he".to_string();
        assert!(app.showing_command_popup());
        assert_eq!(app.get_filtered_commands(), vec![("/help", "Show keys and commands"), ("/health", "Check the backend")]);

        app.command_select_down();
        app.command_select_down();
        assert_eq!(app.ui.command_selection, Some(1));
        app.command_select_down();
        assert_eq!(app.ui.command_selection, None);

        app.command_select_up();
        app.apply_command_selection();
        assert_eq!(app.ui.input, "/health");
        assert_eq!(app.ui.command_selection, None);
    }

    #[test]
    fn test_unknown_command_sets_error_status() {
        let mut app = app();
        app.ui.input = "/bogus".to_string();
        app.submit_input();

        let line = app.status.as_ref().unwrap();
        assert_eq!(line.status.kind, StatusKind::Error);
        assert!(line.status.message.contains("/bogus"));
        assert!(app.ui.input.is_empty());
    }

    #[test]
    fn test_empty_submit_is_rejected_locally() {
        let mut app = app();
        app.ui.input = "   ".to_string();
        app.submit_input();

        let line = app.status.as_ref().unwrap();
        assert_eq!(line.status.kind, StatusKind::Error);
        assert_eq!(line.status.message, "Please enter some text");
        assert!(app.session.can_submit());
    }

    #[test]
    fn test_clear_command_asks_first() {
        let mut app = app();
        load(&mut app, vec![Point::new("a", "cat", 0.0, 0.0)]);
        app.ui.input = "/clear".to_string();
        app.submit_input();
        assert!(app.ui.confirm_reset);
        assert!(!app.session.is_resetting());

        app.confirm_reset(false);
        assert!(!app.ui.confirm_reset);
        assert!(!app.session.is_resetting());
    }

    #[test]
    fn test_clear_still_offered_after_failed_listing() {
        let mut app = app();
        let ticket = app
            .session
            .refresh()
            .into_iter()
            .find_map(|e| match e {
                Effect::Request(crate::effect::Request::ListPoints { ticket }) => Some(ticket),
                _ => None,
            })
            .unwrap();
        let effects = app.session.complete(Completion::Points {
            ticket,
            result: Err(FetchError::InvalidResponse("duplicate point id x".to_string())),
        });
        app.apply(effects);
        assert!(app.session.store().is_empty());

        app.perform(Action::ClearAll);
        assert!(app.ui.confirm_reset);
    }

    #[test]
    fn test_input_frozen_while_submitting() {
        let mut app = app();
        app.ui.input = "hello".to_string();
        // Drive the session directly so nothing is dispatched
        let _ = app.session.submit("hello");
        assert!(!app.session.can_submit());

        app.push_char('x');
        app.backspace();
        app.paste(" world");
        assert_eq!(app.ui.input, "hello");
    }

    #[tokio::test]
    async fn test_manual_refresh_reports_when_done() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "embeddings": [{"id": "a", "text": "cat", "x": 0.0, "y": 0.0}]
            })))
            .mount(&server)
            .await;

        let config = Config {
            api_url: server.uri(),
            ..Config::default()
        };
        let mut app = App::new(config).unwrap();
        app.perform(Action::Refresh);
        assert_eq!(app.status.as_ref().unwrap().status.kind, StatusKind::Loading);

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.session.store().is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.pump();
        }

        let line = app.status.as_ref().unwrap();
        assert_eq!(line.status, Status::success("Loaded 1 point"));
    }

    #[test]
    fn test_success_status_expires() {
        let mut config = Config::default();
        config.success_status_ttl = Duration::ZERO;
        let mut app = App::new(config).unwrap();

        app.set_status(Status::success("done"));
        app.tick();
        assert!(app.status.is_none());

        app.set_status(Status::error("broken"));
        app.tick();
        assert!(app.status.is_some());
    }

    #[test]
    fn test_paste_flattens_newlines() {
        let mut app = app();
        app.paste("one\r\ntwo\nthree");
        assert_eq!(app.ui.input, "one two three");
    }

    #[test]
    fn test_keyboard_cursor_selects_points() {
        let mut app = app();
        load(
            &mut app,
            vec![Point::new("a", "cat", 0.0, 0.0), Point::new("b", "dog", 1.0, 1.0)],
        );

        app.cycle_focus();
        assert_eq!(app.ui.focus, Focus::Chart);
        app.move_cursor(true);
        app.toggle_cursor();
        assert_eq!(app.session.selection().ids(), &[PointId::from("a")]);

        app.toggle_cursor();
        assert!(app.session.selection().is_empty());
    }

    #[tokio::test]
    async fn test_submit_round_trip_updates_preview_and_points() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "0f1e2d3c-aaaa",
                "text": "hello",
                "embedding": [0.5, 0.25, 0.125]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "count": 1,
                "embeddings": [{"id": "0f1e2d3c-aaaa", "text": "hello", "x": 1.0, "y": 2.0}]
            })))
            .mount(&server)
            .await;

        let config = Config {
            api_url: server.uri(),
            ..Config::default()
        };
        let mut app = App::new(config).unwrap();
        app.ui.input = "hello".to_string();
        app.submit_input();
        assert!(!app.session.can_submit());

        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.session.can_submit() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.pump();
        }

        assert!(app.session.can_submit());
        assert!(app.ui.input.is_empty());
        assert_eq!(app.preview.as_ref().map(|p| p.dimensions), Some(3));
        assert_eq!(app.session.store().len(), 1);
        assert!(app.session.chart().surface().spec().is_some());
    }
}

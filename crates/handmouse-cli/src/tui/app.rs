//! Dashboard state and event loop.
//!
//! The UI thread owns the telemetry binder and the shortcut table. Engine I/O
//! runs on a worker thread, so a slow or missing engine never stalls keys.

use std::collections::BTreeMap;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{debug, error, info, warn};
use ratatui::prelude::*;

use handmouse_core::{
    ConfigError, DashboardConfig, Dispatch, DisplayBindings, EngineClient, EngineCommand,
    EngineSource, Field, GaugeCell, KeyPress, LogCell, SampleSource, ShortcutDispatcher,
    SimulatedSource, TelemetryBinder, TelemetrySample, TextCell,
};

// ---------------------------------------------------------------------------
// Engine worker
// ---------------------------------------------------------------------------

enum Job {
    Poll,
    Execute(EngineCommand),
}

enum Outcome {
    Polled {
        sample: TelemetrySample,
        error: Option<String>,
    },
    Executed {
        command: EngineCommand,
        result: Result<Option<String>, String>,
    },
}

fn engine_worker(
    mut source: EngineSource,
    client: EngineClient,
    jobs: Receiver<Job>,
    outcomes: Sender<Outcome>,
) {
    for job in jobs {
        let outcome = match job {
            Job::Poll => match source.poll() {
                Ok(sample) => Outcome::Polled {
                    sample,
                    error: None,
                },
                Err(e) => Outcome::Polled {
                    sample: source.disconnected(),
                    error: Some(e.to_string()),
                },
            },
            Job::Execute(command) => Outcome::Executed {
                command,
                result: client
                    .execute(command)
                    .map(|reply| reply.message)
                    .map_err(|e| e.to_string()),
            },
        };
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
    debug!("engine worker exiting");
}

/// The UI end of the engine worker.
pub struct EngineLink {
    socket: String,
    jobs: Sender<Job>,
    outcomes: Receiver<Outcome>,
    polling: bool,
}

/// Where the dashboard's telemetry comes from.
pub enum Feed {
    Simulated(SimulatedSource),
    Engine(EngineLink),
}

impl Feed {
    pub fn simulated() -> Self {
        Feed::Simulated(SimulatedSource::new())
    }

    /// Spawn a worker talking to the engine at `socket`.
    pub fn engine(socket: &Path) -> Self {
        let client = EngineClient::new(socket);
        let (jobs, job_rx) = mpsc::channel();
        let (outcome_tx, outcomes) = mpsc::channel();
        let source = EngineSource::new(client.clone());
        thread::spawn(move || engine_worker(source, client, job_rx, outcome_tx));
        Feed::Engine(EngineLink {
            socket: socket.display().to_string(),
            jobs,
            outcomes,
            polling: false,
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Feed::Simulated(source) => source.name(),
            Feed::Engine(link) => &link.socket,
        }
    }
}

// ---------------------------------------------------------------------------
// Display cells
// ---------------------------------------------------------------------------

/// The cells the binder writes into, read back by the renderer.
pub struct DashboardView {
    fields: Vec<(Field, TextCell)>,
    cpu_gauge: Option<GaugeCell>,
    logs: Option<LogCell>,
}

impl DashboardView {
    fn for_config(config: &DashboardConfig) -> (Self, DisplayBindings) {
        let mut bindings = DisplayBindings::new().with_log_capacity(config.log_capacity);
        let mut fields = Vec::with_capacity(config.fields.len());
        for &field in &config.fields {
            let cell = TextCell::default();
            bindings = bindings.with_text(field, cell.clone());
            fields.push((field, cell));
        }

        let cpu_gauge = config.shows(Field::Cpu).then(GaugeCell::default);
        if let Some(gauge) = &cpu_gauge {
            bindings = bindings.with_cpu_gauge(gauge.clone());
        }
        let logs = config.show_log.then(LogCell::default);
        if let Some(logs) = &logs {
            bindings = bindings.with_logs(logs.clone());
        }

        (
            Self {
                fields,
                cpu_gauge,
                logs,
            },
            bindings,
        )
    }

    pub fn fields(&self) -> &[(Field, TextCell)] {
        &self.fields
    }

    pub fn cpu_ratio(&self) -> Option<f64> {
        self.cpu_gauge.as_ref().map(GaugeCell::ratio)
    }

    /// The CPU reading as written to its text cell, unclamped.
    pub fn cpu_text(&self) -> Option<String> {
        self.fields
            .iter()
            .find(|(field, _)| *field == Field::Cpu)
            .map(|(_, cell)| cell.text())
            .filter(|text| !text.is_empty())
    }

    pub fn logs(&self) -> Option<&LogCell> {
        self.logs.as_ref()
    }
}

// ---------------------------------------------------------------------------
// Key translation
// ---------------------------------------------------------------------------

/// Translate a terminal key event into the dispatcher's key model.
///
/// Named keys use their DOM names (`Escape`, `ArrowUp`, `Space`). Letters
/// held with Ctrl or Alt are reported uppercase, so `Ctrl+r` arrives as
/// `Ctrl+R`. Releases, repeats and bare modifier keys yield `None`.
pub fn key_press(key: KeyEvent) -> Option<KeyPress> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let mut shift = key.modifiers.contains(KeyModifiers::SHIFT);

    let name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) if (ctrl || alt) && c.is_ascii_alphabetic() => {
            c.to_ascii_uppercase().to_string()
        }
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Esc => "Escape".to_string(),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => {
            shift = true;
            "Tab".to_string()
        }
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::Insert => "Insert".to_string(),
        KeyCode::Home => "Home".to_string(),
        KeyCode::End => "End".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Up => "ArrowUp".to_string(),
        KeyCode::Down => "ArrowDown".to_string(),
        KeyCode::Left => "ArrowLeft".to_string(),
        KeyCode::Right => "ArrowRight".to_string(),
        KeyCode::F(n) => format!("F{n}"),
        _ => return None,
    };
    Some(KeyPress::new(name).with_modifiers(ctrl, shift, alt))
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

pub struct App {
    binder: TelemetryBinder,
    dispatcher: ShortcutDispatcher,
    commands: Receiver<EngineCommand>,
    view: DashboardView,
    feed: Feed,
    shortcuts: Vec<(String, EngineCommand)>,
    refresh_rate: Duration,
    running: bool,
    connected: Option<bool>,
    sample_count: u64,
}

impl App {
    pub fn new(config: &DashboardConfig, feed: Feed) -> Result<Self, ConfigError> {
        config.validate()?;
        let (sink, commands) = mpsc::channel();
        let mut dispatcher = ShortcutDispatcher::with_engine_commands(sink.clone());
        let mut shortcuts: BTreeMap<String, EngineCommand> = EngineCommand::ALL
            .into_iter()
            .map(|command| (command.default_chord().to_string(), command))
            .collect();
        for (chord, command) in config.resolved_shortcuts()? {
            let chord = chord.canonical();
            dispatcher.register_engine_command(chord.clone(), command, sink.clone());
            shortcuts.insert(chord, command);
        }

        let (view, bindings) = DashboardView::for_config(config);
        let mut binder = TelemetryBinder::with_bindings(bindings);
        binder.info(format!("Dashboard ready ({})", feed.label()));
        info!(
            "dashboard started: feed={} shortcuts={}",
            feed.label(),
            dispatcher.len()
        );

        Ok(Self {
            binder,
            dispatcher,
            commands,
            view,
            feed,
            shortcuts: shortcuts.into_iter().collect(),
            refresh_rate: Duration::from_secs_f64(config.refresh_secs),
            running: true,
            connected: None,
            sample_count: 0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let original_hook = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
            original_hook(info);
        }));

        let result = self.run_loop(&mut terminal);

        let _ = std::panic::take_hook();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;

        result
    }

    fn run_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> io::Result<()> {
        self.tick();
        let mut last_tick = Instant::now();

        while self.running {
            self.drain_outcomes();
            terminal.draw(|f| super::ui::draw(f, self))?;

            if event::poll(Duration::from_millis(50))?
                && let Event::Key(key) = event::read()?
            {
                self.handle_key(key);
            }

            if last_tick.elapsed() >= self.refresh_rate {
                self.tick();
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let Some(mut press) = key_press(key) else {
            return;
        };
        if self.dispatcher.handle_key_event(&mut press) == Dispatch::PassThrough {
            self.handle_unbound(&press);
        }
        self.drain_commands();
    }

    /// Keys no shortcut claimed.
    fn handle_unbound(&mut self, press: &KeyPress) {
        if matches!(press.chord().canonical().as_str(), "q" | "Ctrl+C") {
            self.running = false;
        }
    }

    /// Forward commands the shortcut table queued.
    fn drain_commands(&mut self) {
        let queued: Vec<EngineCommand> = self.commands.try_iter().collect();
        for command in queued {
            match &mut self.feed {
                Feed::Engine(link) => {
                    self.binder.info(format!("Sending {}", command.label()));
                    if link.jobs.send(Job::Execute(command)).is_err() {
                        error!("engine worker gone; dropped {command}");
                        self.binder.error(format!("{} failed: engine worker stopped", command.label()));
                    }
                }
                Feed::Simulated(_) => {
                    self.binder.info(format!("{} (simulated)", command.label()));
                }
            }
        }
    }

    /// Pull one sample, or ask the worker for one if none is in flight.
    fn tick(&mut self) {
        match &mut self.feed {
            Feed::Simulated(source) => {
                if let Some(sample) = source.next_sample() {
                    self.binder.update(&sample);
                    self.sample_count += 1;
                }
            }
            Feed::Engine(link) => {
                if !link.polling {
                    link.polling = link.jobs.send(Job::Poll).is_ok();
                }
            }
        }
    }

    fn drain_outcomes(&mut self) {
        let outcomes: Vec<Outcome> = match &self.feed {
            Feed::Engine(link) => link.outcomes.try_iter().collect(),
            Feed::Simulated(_) => return,
        };
        for outcome in outcomes {
            self.apply(outcome);
        }
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Polled { sample, error } => {
                if let Feed::Engine(link) = &mut self.feed {
                    link.polling = false;
                }
                self.binder.update(&sample);
                self.sample_count += 1;
                self.note_connection(error);
            }
            Outcome::Executed { command, result } => match result {
                Ok(message) => {
                    let message = message.unwrap_or_else(|| "ok".to_string());
                    self.binder.info(format!("{}: {message}", command.label()));
                }
                Err(e) => {
                    error!("{command} failed: {e}");
                    self.binder.error(format!("{} failed: {e}", command.label()));
                }
            },
        }
    }

    /// Log connection changes once per transition.
    fn note_connection(&mut self, error: Option<String>) {
        let connected = error.is_none();
        if self.connected == Some(connected) {
            return;
        }
        self.connected = Some(connected);
        match error {
            None => {
                info!("engine connected at {}", self.feed.label());
                self.binder
                    .info(format!("Connected to engine at {}", self.feed.label()));
            }
            Some(e) => {
                warn!("engine unreachable: {e}");
                self.binder.warn(format!("Engine unreachable: {e}"));
            }
        }
    }

    // --- Public accessors ---

    pub fn view(&self) -> &DashboardView {
        &self.view
    }

    pub fn feed_label(&self) -> &str {
        self.feed.label()
    }

    pub fn is_simulated(&self) -> bool {
        matches!(self.feed, Feed::Simulated(_))
    }

    /// `None` until the first poll answers.
    pub fn connected(&self) -> Option<bool> {
        self.connected
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Bound chords in display order.
    pub fn shortcuts(&self) -> &[(String, EngineCommand)] {
        &self.shortcuts
    }

    pub fn refresh_rate_secs(&self) -> f64 {
        self.refresh_rate.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handmouse_core::Severity;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn chord_of(code: KeyCode, modifiers: KeyModifiers) -> Option<String> {
        key_press(press(code, modifiers)).map(|p| p.chord().canonical())
    }

    fn simulated_app(config: &DashboardConfig) -> App {
        App::new(config, Feed::Simulated(SimulatedSource::seeded(7))).unwrap()
    }

    fn log_messages(app: &App) -> Vec<String> {
        app.binder
            .log()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    #[test]
    fn key_names_follow_dom_conventions() {
        assert_eq!(
            chord_of(KeyCode::Char(' '), KeyModifiers::CONTROL).as_deref(),
            Some("Ctrl+Space")
        );
        assert_eq!(
            chord_of(KeyCode::Char('r'), KeyModifiers::CONTROL).as_deref(),
            Some("Ctrl+R")
        );
        assert_eq!(
            chord_of(KeyCode::Esc, KeyModifiers::NONE).as_deref(),
            Some("Escape")
        );
        assert_eq!(
            chord_of(KeyCode::Up, KeyModifiers::NONE).as_deref(),
            Some("ArrowUp")
        );
        assert_eq!(
            chord_of(KeyCode::F(5), KeyModifiers::ALT).as_deref(),
            Some("Alt+F5")
        );
        assert_eq!(
            chord_of(KeyCode::BackTab, KeyModifiers::NONE).as_deref(),
            Some("Shift+Tab")
        );
    }

    #[test]
    fn plain_letters_keep_their_case() {
        assert_eq!(
            chord_of(KeyCode::Char('q'), KeyModifiers::NONE).as_deref(),
            Some("q")
        );
        assert_eq!(
            chord_of(KeyCode::Char('Q'), KeyModifiers::SHIFT).as_deref(),
            Some("Shift+Q")
        );
    }

    #[test]
    fn releases_are_ignored() {
        let release =
            KeyEvent::new_with_kind(KeyCode::Char('r'), KeyModifiers::CONTROL, KeyEventKind::Release);
        assert!(key_press(release).is_none());
        assert!(chord_of(KeyCode::Null, KeyModifiers::NONE).is_none());
    }

    #[test]
    fn startup_logs_ready_and_binds_configured_fields() {
        let config = DashboardConfig::from_toml_str("fields = [\"fps\", \"gesture\"]").unwrap();
        let app = simulated_app(&config);
        let fields: Vec<Field> = app.view().fields().iter().map(|(f, _)| *f).collect();
        assert_eq!(fields, vec![Field::Fps, Field::Gesture]);
        assert!(app.view().cpu_ratio().is_none());
        assert_eq!(log_messages(&app), vec!["Dashboard ready (simulated)"]);
    }

    #[test]
    fn tick_fills_fields_from_simulated_feed() {
        let app_config = DashboardConfig::default();
        let mut app = simulated_app(&app_config);
        app.tick();
        assert_eq!(app.sample_count(), 1);
        for (field, cell) in app.view().fields() {
            if matches!(field, Field::Memory | Field::Temperature) {
                continue;
            }
            assert!(!cell.text().is_empty(), "{field} left empty");
        }
        let ratio = app.view().cpu_ratio().unwrap();
        assert!((0.0..=1.0).contains(&ratio));
    }

    #[test]
    fn shortcut_is_logged_in_simulated_mode() {
        let mut app = simulated_app(&DashboardConfig::default());
        app.handle_key(press(KeyCode::Char('r'), KeyModifiers::CONTROL));
        let logs = app.binder.log().unwrap();
        assert_eq!(logs.newest().unwrap().message, "recalibrate (simulated)");
        assert!(app.running);
    }

    #[test]
    fn unbound_q_quits_but_bound_keys_do_not() {
        let mut app = simulated_app(&DashboardConfig::default());
        app.handle_key(press(KeyCode::Esc, KeyModifiers::NONE));
        assert!(app.running);
        app.handle_key(press(KeyCode::Char('x'), KeyModifiers::NONE));
        assert!(app.running);
        app.handle_key(press(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(!app.running);
    }

    #[test]
    fn config_shortcut_can_rebind_quit_key() {
        let config =
            DashboardConfig::from_toml_str("[shortcuts]\n\"q\" = \"save_settings\"\n").unwrap();
        let mut app = simulated_app(&config);
        app.handle_key(press(KeyCode::Char('q'), KeyModifiers::NONE));
        assert!(app.running);
        assert!(app.shortcuts().contains(&("q".to_string(), EngineCommand::SaveSettings)));
        assert_eq!(
            app.binder.log().unwrap().newest().unwrap().message,
            "save settings (simulated)"
        );
    }

    #[test]
    fn lowercase_config_letter_fires_from_terminal() {
        let config =
            DashboardConfig::from_toml_str("[shortcuts]\n\"Ctrl+p\" = \"save_settings\"\n").unwrap();
        let mut app = simulated_app(&config);
        assert!(app.dispatcher.contains("Ctrl+P"));
        app.handle_key(press(KeyCode::Char('p'), KeyModifiers::CONTROL));
        assert_eq!(
            app.binder.log().unwrap().newest().unwrap().message,
            "save settings (simulated)"
        );
    }

    #[test]
    fn unvalidated_config_is_refused() {
        let config = DashboardConfig {
            log_capacity: usize::MAX,
            ..DashboardConfig::default()
        };
        assert!(matches!(
            App::new(&config, Feed::Simulated(SimulatedSource::seeded(1))),
            Err(ConfigError::InvalidLogCapacity(_))
        ));

        let config = DashboardConfig {
            refresh_secs: 1e30,
            ..DashboardConfig::default()
        };
        assert!(matches!(
            App::new(&config, Feed::Simulated(SimulatedSource::seeded(1))),
            Err(ConfigError::InvalidRefresh(_))
        ));
    }

    #[test]
    fn cpu_text_is_not_clamped_like_the_gauge() {
        let mut app = simulated_app(&DashboardConfig::default());
        app.binder
            .update(&TelemetrySample::new(150.0, 30.0, "Palm_Open", "Tracking"));
        assert_eq!(app.view().cpu_text().as_deref(), Some("150%"));
        assert_eq!(app.view().cpu_ratio(), Some(1.0));
    }

    #[test]
    fn hidden_log_discards_messages() {
        let config = DashboardConfig::from_toml_str("show_log = false").unwrap();
        let mut app = simulated_app(&config);
        app.handle_key(press(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert!(app.binder.log().is_none());
        assert!(app.view().logs().is_none());
    }

    #[test]
    fn unreachable_engine_warns_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = DashboardConfig::default();
        let mut app = App::new(&config, Feed::engine(&dir.path().join("missing.sock"))).unwrap();

        for _ in 0..2 {
            app.tick();
            let deadline = Instant::now() + Duration::from_secs(5);
            let before = app.sample_count();
            while app.sample_count() == before && Instant::now() < deadline {
                app.drain_outcomes();
                thread::sleep(Duration::from_millis(10));
            }
        }

        assert_eq!(app.sample_count(), 2);
        assert_eq!(app.connected(), Some(false));
        let warnings = app
            .binder
            .log()
            .unwrap()
            .iter()
            .filter(|e| e.severity == Severity::Warn)
            .count();
        assert_eq!(warnings, 1);

        let action = app
            .view()
            .fields()
            .iter()
            .find(|(f, _)| *f == Field::Action)
            .map(|(_, cell)| cell.text());
        assert_eq!(action.as_deref(), Some("Disconnected"));
    }
}

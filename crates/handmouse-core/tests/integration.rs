//! Integration tests for handmouse-core.
//!
//! These tests drive the public API the way the dashboard does:
//! config → bindings → samples and key presses → display targets and commands.

use std::sync::mpsc;

use handmouse_core::{
    DashboardConfig, Dispatch, DisplayBindings, EngineCommand, Field, KeyPress, LogCell,
    MAX_LOG_ENTRIES, SampleSource, Severity, ShortcutDispatcher, SimulatedSource,
    TelemetryBinder, TelemetrySample, TextCell,
};

#[test]
fn sample_stream_keeps_fields_current() {
    let cpu = TextCell::default();
    let fps = TextCell::default();
    let gesture = TextCell::default();
    let mut binder = TelemetryBinder::with_bindings(
        DisplayBindings::new()
            .with_text(Field::Cpu, cpu.clone())
            .with_text(Field::Fps, fps.clone())
            .with_text(Field::Gesture, gesture.clone()),
    );

    let mut source = SimulatedSource::seeded(1);
    let mut last = None;
    for _ in 0..100 {
        let sample = source.next_sample().unwrap();
        binder.update(&sample);
        last = Some(sample);
    }

    let last = last.unwrap();
    assert_eq!(cpu.text(), format!("{}%", last.cpu_percent));
    assert_eq!(fps.text(), format!("{}", last.fps));
    assert_eq!(gesture.text(), last.gesture);
}

#[test]
fn reference_sample_renders() {
    let cpu = TextCell::default();
    let fps = TextCell::default();
    let mut binder = TelemetryBinder::with_bindings(
        DisplayBindings::new()
            .with_text(Field::Cpu, cpu.clone())
            .with_text(Field::Fps, fps.clone()),
    );
    binder.update(&TelemetrySample::new(42.0, 30.0, "Palm", "Tracking"));
    assert_eq!(cpu.text(), "42%");
    assert_eq!(fps.text(), "30");
}

#[test]
fn log_is_bounded_under_long_runs() {
    let logs = LogCell::default();
    let mut binder = TelemetryBinder::with_bindings(DisplayBindings::new().with_logs(logs.clone()));

    for n in 0..10_000 {
        let severity = match n % 3 {
            0 => Severity::Info,
            1 => Severity::Warn,
            _ => Severity::Error,
        };
        binder.add_log(format!("event {n}"), severity);
    }

    let entries = logs.entries();
    assert_eq!(entries.len(), MAX_LOG_ENTRIES);
    assert_eq!(entries[0].message, "event 9999");
    assert_eq!(entries[MAX_LOG_ENTRIES - 1].message, "event 9950");
}

#[test]
fn config_shortcuts_layer_over_defaults() {
    let config = DashboardConfig::from_toml_str(
        r#"
        [shortcuts]
        "Ctrl+Q" = "stop_engine"
        "Ctrl+S" = "recalibrate"
        "#,
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    let mut dispatcher = ShortcutDispatcher::with_engine_commands(tx.clone());
    for (chord, command) in config.resolved_shortcuts().unwrap() {
        dispatcher.register_engine_command(chord.canonical(), command, tx.clone());
    }
    assert_eq!(dispatcher.len(), 5);

    let mut save = KeyPress::new("S").with_modifiers(true, false, false);
    let mut quit = KeyPress::new("Q").with_modifiers(true, false, false);
    assert_eq!(dispatcher.handle_key_event(&mut save), Dispatch::Handled);
    assert_eq!(dispatcher.handle_key_event(&mut quit), Dispatch::Handled);

    let sent: Vec<EngineCommand> = rx.try_iter().collect();
    assert_eq!(sent, vec![EngineCommand::Recalibrate, EngineCommand::StopEngine]);
}

#[test]
fn typing_passes_through_default_bindings() {
    let (tx, rx) = mpsc::channel();
    let mut dispatcher = ShortcutDispatcher::with_engine_commands(tx);

    for key in "hello world".chars() {
        let name = if key == ' ' { "Space".to_string() } else { key.to_string() };
        let mut press = KeyPress::new(name);
        assert_eq!(dispatcher.handle_key_event(&mut press), Dispatch::PassThrough);
        assert!(!press.is_default_prevented());
    }
    assert!(rx.try_recv().is_err());
}

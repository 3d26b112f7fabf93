//! Dashboard rendering.
//!
//! ┌──────────────────────────────────────────────────────┐
//! │  🤚 Hand Mouse OS   feed: /tmp/handmouse.sock  ●     │
//! ├────────────────────────┬─────────────────────────────┤
//! │  Telemetry             │  Event log                  │
//! │  CPU      12%          │  [14:02:11] Connected to …  │
//! │  FPS      30           │  [14:02:10] Dashboard ready │
//! │  Gesture  Palm_Open    │                             │
//! │  ▕████░░░░░░░▏ CPU     │                             │
//! ├────────────────────────┴─────────────────────────────┤
//! │  Ctrl+R: recalibrate   Escape: stop engine   q: quit │
//! └──────────────────────────────────────────────────────┘

use handmouse_core::{Field, Severity};
use ratatui::{prelude::*, widgets::*};

use super::app::App;

pub fn draw(f: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // title
            Constraint::Min(8),    // main
            Constraint::Length(1), // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], app);
    draw_main(f, rows[1], app);
    draw_keys(f, rows[2], app);
}

fn draw_title(f: &mut Frame, area: Rect, app: &App) {
    let (status, color) = if app.is_simulated() {
        ("simulated", Color::Magenta)
    } else {
        match app.connected() {
            Some(true) => ("● connected", Color::Green),
            Some(false) => ("○ disconnected", Color::Red),
            None => ("… connecting", Color::Yellow),
        }
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" 🤚 Hand Mouse OS ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("  feed: "),
            Span::styled(app.feed_label(), Style::default().bold().fg(Color::Yellow)),
            Span::raw("  "),
            Span::styled(status, Style::default().fg(color)),
            Span::styled(
                format!(
                    "  #{}  {:.2}s ",
                    app.sample_count(),
                    app.refresh_rate_secs()
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

    f.render_widget(block, area);
}

fn draw_main(f: &mut Frame, area: Rect, app: &App) {
    if app.view().logs().is_none() {
        draw_telemetry(f, area, app);
        return;
    }

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    draw_telemetry(f, cols[0], app);
    draw_log(f, cols[1], app);
}

fn draw_telemetry(f: &mut Frame, area: Rect, app: &App) {
    let view = app.view();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Telemetry ")
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let gauge_height = if view.cpu_ratio().is_some() { 1 } else { 0 };
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(gauge_height)])
        .split(inner);

    let rows: Vec<Row> = view
        .fields()
        .iter()
        .map(|(field, cell)| {
            let text = cell.text();
            let value = if text.is_empty() {
                Span::styled("-", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(text, value_style(*field))
            };
            Row::new(vec![
                Cell::from(Span::styled(field.label(), Style::default().fg(Color::DarkGray))),
                Cell::from(value),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(9), Constraint::Min(6)]);
    f.render_widget(table, parts[0]);

    if let Some(ratio) = view.cpu_ratio() {
        let color = match ratio {
            r if r >= 0.8 => Color::Red,
            r if r >= 0.5 => Color::Yellow,
            _ => Color::Green,
        };
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio(ratio.clamp(0.0, 1.0))
            .label(format!("CPU {}", view.cpu_text().unwrap_or_else(|| "-".to_string())));
        f.render_widget(gauge, parts[1]);
    }
}

fn value_style(field: Field) -> Style {
    match field {
        Field::Gesture => Style::default().bold().fg(Color::Yellow),
        Field::Action => Style::default().fg(Color::Green),
        _ => Style::default().fg(Color::White),
    }
}

fn draw_log(f: &mut Frame, area: Rect, app: &App) {
    let Some(logs) = app.view().logs() else {
        return;
    };

    let items: Vec<ListItem> = logs
        .entries()
        .into_iter()
        .map(|entry| {
            let color = match entry.severity {
                Severity::Info => Color::White,
                Severity::Warn => Color::Yellow,
                Severity::Error => Color::Red,
            };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("[{}] ", entry.time_label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(entry.message, Style::default().fg(color)),
            ]))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" Event log ({}) ", logs.len()))
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(list, area);
}

fn draw_keys(f: &mut Frame, area: Rect, app: &App) {
    let mut text = String::from(" ");
    for (chord, command) in app.shortcuts() {
        text.push_str(&format!("{chord}: {}   ", command.label()));
    }
    text.push_str("q: quit");

    let bar = Paragraph::new(text).style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

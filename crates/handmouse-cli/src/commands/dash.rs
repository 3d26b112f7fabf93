use std::path::Path;

use handmouse_core::DashboardConfig;

use crate::tui::app::{App, Feed};

pub struct DashCommandConfig<'a> {
    pub socket: Option<&'a str>,
    pub refresh: Option<f64>,
    pub simulate: bool,
    pub config_path: Option<&'a str>,
}

pub fn run(cmd: DashCommandConfig<'_>) {
    let mut config = match cmd.config_path {
        Some(path) => DashboardConfig::load(Path::new(path)).unwrap_or_else(|e| super::fail(e)),
        None => DashboardConfig::default(),
    };
    if let Some(socket) = cmd.socket {
        config.socket_path = socket.into();
    }
    if let Some(refresh) = cmd.refresh {
        config.refresh_secs = refresh;
    }
    if let Err(e) = config.validate() {
        super::fail(e);
    }

    let feed = if cmd.simulate {
        Feed::simulated()
    } else {
        Feed::engine(&config.socket_path)
    };

    let mut app = match App::new(&config, feed) {
        Ok(app) => app,
        Err(e) => super::fail(e),
    };
    if let Err(e) = app.run() {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}

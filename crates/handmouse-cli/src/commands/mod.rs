pub mod config;
pub mod dash;
pub mod engine;
pub mod status;

use std::time::Duration;

use handmouse_core::{DEFAULT_SOCKET_PATH, EngineClient};

/// Connection attempts for one-shot commands (the engine may still be starting).
const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Client for a one-shot command, retrying while the engine comes up.
pub fn command_client(socket: Option<&str>) -> EngineClient {
    EngineClient::new(socket.unwrap_or(DEFAULT_SOCKET_PATH))
        .with_retry(CONNECT_ATTEMPTS, CONNECT_RETRY_DELAY)
}

/// Print `err` and exit with status 1.
pub fn fail(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {err}");
    std::process::exit(1);
}

/// Truthy spellings accepted for boolean settings.
pub fn parse_switch(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

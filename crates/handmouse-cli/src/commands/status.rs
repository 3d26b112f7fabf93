use handmouse_core::{DEFAULT_SOCKET_PATH, EngineClient};

pub fn run(socket: Option<&str>, json: bool) {
    let client = EngineClient::new(socket.unwrap_or(DEFAULT_SOCKET_PATH));
    let status = client.get_status();

    if json {
        match status {
            Ok(status) => match serde_json::to_string_pretty(&status) {
                Ok(out) => println!("{out}"),
                Err(e) => super::fail(e),
            },
            Err(e) => super::fail(e),
        }
        return;
    }

    println!("Hand Mouse OS status\n");
    match status {
        Ok(status) => {
            let state = if status.is_processing {
                "running"
            } else {
                "paused"
            };
            println!("  Engine:   {state}");
            println!(
                "  ASL:      {}",
                if status.asl_enabled { "on" } else { "off" }
            );
            println!("  FPS:      {}", status.fps.trunc());
            println!("  Socket:   {}", client.socket_path().display());
        }
        Err(e) => {
            println!("  Engine is not running");
            println!("  ({e})");
        }
    }
}

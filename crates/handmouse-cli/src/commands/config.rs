use super::{command_client, fail, parse_switch};

pub fn get(socket: Option<&str>, key: &str) {
    let status = command_client(socket)
        .get_status()
        .unwrap_or_else(|e| fail(e));

    match key {
        "asl" => println!("ASL: {}", status.asl_enabled),
        "status" => println!("Processing: {}", status.is_processing),
        other => fail(format!("unknown key '{other}' (expected asl or status)")),
    }
}

pub fn set(socket: Option<&str>, key: &str, value: &str) {
    match key {
        "asl" => {
            let enabled = parse_switch(value);
            let reported = command_client(socket)
                .set_asl(enabled)
                .unwrap_or_else(|e| fail(e));
            println!("ASL: {reported}");
        }
        other => fail(format!("unknown key '{other}' (expected asl)")),
    }
}

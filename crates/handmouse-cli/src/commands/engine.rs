use handmouse_core::Response;

use super::{command_client, fail};

pub fn start(socket: Option<&str>) {
    println!("Starting gesture processing...");
    let reply = command_client(socket).start().unwrap_or_else(|e| fail(e));
    report(&reply, "engine started");
}

pub fn stop(socket: Option<&str>) {
    println!("Stopping gesture processing...");
    let reply = command_client(socket).stop().unwrap_or_else(|e| fail(e));
    report(&reply, "engine stopped");
}

pub fn camera(socket: Option<&str>, index: u32) {
    let reply = command_client(socket)
        .set_camera(index)
        .unwrap_or_else(|e| fail(e));
    report(&reply, &format!("camera set to {index}"));
}

fn report(reply: &Response, fallback: &str) {
    println!("{}", reply.message.as_deref().unwrap_or(fallback));
}

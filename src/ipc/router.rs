use std::time::Instant;

use tracing::{debug, warn};

use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use crate::lockdown;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    debug!(id = %req.id, method = %req.method, "request");
    refresh_lockdown(state);

    if let Some(resp) = handlers::core::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::attendance::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::budget::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::roster::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::lockdown::try_handle(state, &req) {
        return resp;
    }
    if let Some(resp) = handlers::setup::try_handle(state, &req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}

// Picks up lockdown changes written by other sessions, at most once per poll interval.
fn refresh_lockdown(state: &mut AppState) {
    let AppState {
        db,
        lockdown,
        lockdown_watcher,
        ..
    } = state;
    let Some(conn) = db.as_ref() else {
        return;
    };
    if let Err(e) = lockdown_watcher.poll(Instant::now(), lockdown, || lockdown::load_flag(conn)) {
        warn!(error = %e, "lockdown poll failed");
    }
}

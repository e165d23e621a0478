use crate::ipc::helpers::{get_bool, get_optional_str, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::lockdown::{self, load_flag, LockdownEvent, LockdownState};
use crate::roles::Role;
use chrono::Utc;
use serde_json::json;

fn db_err(e: anyhow::Error) -> HandlerErr {
    HandlerErr::new("db_query_failed", e.to_string())
}

// Reads straight from the store so the answer is never older than the last write.
fn lockdown_get(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let flag = load_flag(conn).map_err(db_err)?;
    state.lockdown.observe(flag.clone());
    Ok(json!({
        "state": flag.state,
        "changedAt": flag.changed_at,
        "changedBy": flag.changed_by
    }))
}

fn lockdown_set(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let enabled = match params.get("enabled").and_then(|v| v.as_bool()) {
        Some(b) => b,
        None => return Err(HandlerErr::bad_params("missing enabled")),
    };
    let confirmed = get_bool(params, "confirmed", false)?;
    let role_raw = get_required_str(params, "role")?;
    let Some(role) = Role::parse(&role_raw) else {
        return Err(HandlerErr::bad_params(format!("unknown role: {}", role_raw)));
    };
    let actor = get_optional_str(params, "actor")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| role.to_string());

    let target = LockdownState::from_enabled(enabled);
    let changed = lockdown::toggle(
        conn,
        &mut state.lockdown,
        target,
        role,
        confirmed,
        &actor,
        Utc::now(),
    )?;

    let flag = state.lockdown.flag();
    Ok(json!({
        "state": flag.state,
        "changed": changed.is_some(),
        "changedAt": flag.changed_at,
        "changedBy": flag.changed_by
    }))
}

fn lockdown_events(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let events: Vec<LockdownEvent> = state.lockdown_events.try_iter().collect();
    Ok(json!({ "events": events }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let out = match req.method.as_str() {
        "lockdown.get" => lockdown_get(state),
        "lockdown.set" => lockdown_set(state, &req.params),
        "lockdown.events" => lockdown_events(state),
        _ => return None,
    };
    Some(respond(req, out))
}

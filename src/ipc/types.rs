use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::PortalConfig;
use crate::lockdown::{LockdownBroadcast, LockdownEvent, LockdownFlag, LockdownWatcher};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: PortalConfig,
    pub lockdown: LockdownBroadcast,
    pub lockdown_watcher: LockdownWatcher,
    /// The session's own subscription, drained by `lockdown.events`.
    pub lockdown_events: Receiver<LockdownEvent>,
}

impl AppState {
    pub fn new() -> Self {
        let config = PortalConfig::default();
        let mut lockdown = LockdownBroadcast::new(LockdownFlag::default());
        let lockdown_events = lockdown.subscribe();
        Self {
            workspace: None,
            db: None,
            lockdown_watcher: LockdownWatcher::new(config.lockdown_poll_interval),
            config,
            lockdown,
            lockdown_events,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

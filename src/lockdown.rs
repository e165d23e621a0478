//! Process-wide emergency lockdown flag.
//!
//! The flag is persisted in the workspace settings store so every session
//! sharing the workspace sees it. Inside one process, changes fan out through
//! [`LockdownBroadcast`] subscriptions; changes written by other processes are
//! picked up by [`LockdownWatcher`], which re-reads the store at most once per
//! poll interval.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;
use crate::error::LockdownError;
use crate::roles::Role;

const FLAG_KEY: &str = "lockdown.flag";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockdownState {
    #[default]
    Normal,
    Lockdown,
}

impl LockdownState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            Self::Lockdown
        } else {
            Self::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockdownFlag {
    pub state: LockdownState,
    pub changed_at: Option<DateTime<Utc>>,
    pub changed_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LockdownEvent {
    pub id: Uuid,
    pub state: LockdownState,
    pub changed_at: DateTime<Utc>,
    pub changed_by: String,
}

pub struct LockdownBroadcast {
    flag: LockdownFlag,
    subscribers: Vec<Sender<LockdownEvent>>,
}

impl LockdownBroadcast {
    pub fn new(flag: LockdownFlag) -> Self {
        Self {
            flag,
            subscribers: Vec::new(),
        }
    }

    pub fn flag(&self) -> &LockdownFlag {
        &self.flag
    }

    pub fn state(&self) -> LockdownState {
        self.flag.state
    }

    pub fn subscribe(&mut self) -> Receiver<LockdownEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// The flag an administrator toggle to `target` would produce, or `None`
    /// when `target` is already current. Leaves this broadcast untouched.
    pub fn propose(
        &self,
        target: LockdownState,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Option<LockdownFlag> {
        if target == self.flag.state {
            return None;
        }
        Some(LockdownFlag {
            state: target,
            changed_at: Some(now),
            changed_by: Some(actor.to_string()),
        })
    }

    /// Adopts a flag this session has already persisted and notifies subscribers.
    pub fn commit(&mut self, flag: LockdownFlag) -> LockdownEvent {
        let at = flag.changed_at.unwrap_or_else(Utc::now);
        self.flag = flag;
        info!(state = ?self.flag.state, changed_by = ?self.flag.changed_by, "lockdown state changed");
        self.publish(at)
    }

    /// Adopts a flag read from the shared store, publishing if the state moved.
    pub fn observe(&mut self, flag: LockdownFlag) -> Option<LockdownEvent> {
        if flag == self.flag {
            return None;
        }
        let moved = flag.state != self.flag.state;
        self.flag = flag;
        if !moved {
            return None;
        }
        info!(state = ?self.flag.state, "observed lockdown change from another session");
        let at = self.flag.changed_at.unwrap_or_else(Utc::now);
        Some(self.publish(at))
    }

    fn publish(&mut self, at: DateTime<Utc>) -> LockdownEvent {
        let event = LockdownEvent {
            id: Uuid::new_v4(),
            state: self.flag.state,
            changed_at: at,
            changed_by: self
                .flag
                .changed_by
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        };
        self.subscribers
            .retain(|tx| tx.send(event.clone()).is_ok());
        event
    }
}

pub struct LockdownWatcher {
    interval: Duration,
    last_poll: Option<Instant>,
}

impl LockdownWatcher {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_poll: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn due(&self, now: Instant) -> bool {
        match self.last_poll {
            None => true,
            Some(prev) => now.saturating_duration_since(prev) >= self.interval,
        }
    }

    pub fn poll<F>(
        &mut self,
        now: Instant,
        broadcast: &mut LockdownBroadcast,
        load: F,
    ) -> anyhow::Result<Option<LockdownEvent>>
    where
        F: FnOnce() -> anyhow::Result<LockdownFlag>,
    {
        if !self.due(now) {
            return Ok(None);
        }
        self.last_poll = Some(now);
        let flag = load()?;
        Ok(broadcast.observe(flag))
    }
}

impl Default for LockdownWatcher {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

/// Only a confirmed administrator may move the flag, in either direction.
pub fn authorize(role: Role, confirmed: bool, actor: &str) -> Result<(), LockdownError> {
    if !role.is_admin() {
        warn!(%role, actor, "rejected lockdown change from non-admin role");
        return Err(LockdownError::Forbidden(role));
    }
    if !confirmed {
        warn!(actor, "rejected unconfirmed lockdown change");
        return Err(LockdownError::NotConfirmed);
    }
    Ok(())
}

/// Applies an administrator toggle to the shared flag.
///
/// The store is read and written inside one `BEGIN IMMEDIATE` transaction, so
/// sessions racing on the same workspace serialize. Subscribers hear about
/// the change only after the write commits; `Ok(None)` means `target` was
/// already current.
pub fn toggle(
    conn: &Connection,
    broadcast: &mut LockdownBroadcast,
    target: LockdownState,
    role: Role,
    confirmed: bool,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<Option<LockdownEvent>, LockdownError> {
    authorize(role, confirmed, actor)?;

    let store_err = |e: anyhow::Error| LockdownError::Store(e.to_string());
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
        .map_err(|e| store_err(e.into()))?;
    let current = load_flag(&tx).map_err(store_err)?;
    broadcast.observe(current);

    let Some(next) = broadcast.propose(target, actor, now) else {
        return Ok(None);
    };
    store_flag(&tx, &next).map_err(store_err)?;
    tx.commit().map_err(|e| store_err(e.into()))?;
    Ok(Some(broadcast.commit(next)))
}

pub fn load_flag(conn: &Connection) -> anyhow::Result<LockdownFlag> {
    let Some(raw) = db::settings_get_json(conn, FLAG_KEY)? else {
        return Ok(LockdownFlag::default());
    };
    match serde_json::from_value(raw) {
        Ok(flag) => Ok(flag),
        Err(e) => {
            warn!(error = %e, "stored lockdown flag is malformed; treating as normal");
            Ok(LockdownFlag::default())
        }
    }
}

pub fn store_flag(conn: &Connection, flag: &LockdownFlag) -> anyhow::Result<()> {
    db::settings_set_json(conn, FLAG_KEY, &serde_json::to_value(flag)?)
}

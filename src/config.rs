use rusqlite::Connection;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::warn;

use crate::calc::{AttendanceThresholds, DEFAULT_ELIGIBILITY_THRESHOLD, DEFAULT_WARNING_THRESHOLD};
use crate::currency::{ExchangeRate, DEFAULT_USD_INR_RATE};
use crate::db;
use crate::lockdown::DEFAULT_POLL_INTERVAL;
use crate::roster::DEFAULT_AT_RISK_ATTENDANCE;

const MAX_RATE: f64 = 1_000_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupSection {
    Attendance,
    Budget,
    Lockdown,
}

impl SetupSection {
    pub const ALL: [SetupSection; 3] = [Self::Attendance, Self::Budget, Self::Lockdown];

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "attendance" => Some(Self::Attendance),
            "budget" => Some(Self::Budget),
            "lockdown" => Some(Self::Lockdown),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Attendance => "attendance",
            Self::Budget => "budget",
            Self::Lockdown => "lockdown",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Attendance => "setup.attendance",
            Self::Budget => "setup.budget",
            Self::Lockdown => "setup.lockdown",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Attendance => json!({
            "eligibilityThreshold": DEFAULT_ELIGIBILITY_THRESHOLD,
            "warningThreshold": DEFAULT_WARNING_THRESHOLD,
            "atRiskAttendance": DEFAULT_AT_RISK_ATTENDANCE
        }),
        SetupSection::Budget => json!({
            "usdInrRate": DEFAULT_USD_INR_RATE
        }),
        SetupSection::Lockdown => json!({
            "pollIntervalMs": DEFAULT_POLL_INTERVAL.as_millis() as u64
        }),
    }
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_rate(v: &Value, key: &str) -> Result<f64, String> {
    let r = v
        .as_f64()
        .ok_or_else(|| format!("{} must be a number", key))?;
    if !r.is_finite() || r <= 0.0 || r > MAX_RATE {
        return Err(format!("{} must be > 0 and <= {}", key, MAX_RATE));
    }
    Ok(r)
}

pub fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = current
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())?;
    for (k, v) in patch {
        match section {
            SetupSection::Attendance => match k.as_str() {
                "eligibilityThreshold" | "warningThreshold" | "atRiskAttendance" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 0, 100)?));
                }
                _ => return Err(format!("unknown attendance field: {}", k)),
            },
            SetupSection::Budget => match k.as_str() {
                "usdInrRate" => {
                    obj.insert(k.clone(), Value::from(parse_rate(v, k)?));
                }
                _ => return Err(format!("unknown budget field: {}", k)),
            },
            SetupSection::Lockdown => match k.as_str() {
                "pollIntervalMs" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 100, 60_000)?));
                }
                _ => return Err(format!("unknown lockdown field: {}", k)),
            },
        }
    }

    if section == SetupSection::Attendance {
        let eligibility = obj.get("eligibilityThreshold").and_then(|v| v.as_i64());
        let warning = obj.get("warningThreshold").and_then(|v| v.as_i64());
        if let (Some(e), Some(w)) = (eligibility, warning) {
            if w > e {
                return Err("warningThreshold must not exceed eligibilityThreshold".into());
            }
        }
    }
    Ok(())
}

pub fn load_section(conn: &Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            let mut merged = current.clone();
            match merge_section_patch(section, &mut merged, saved_obj) {
                Ok(()) => current = merged,
                Err(msg) => {
                    warn!(section = section.name(), %msg, "ignoring malformed saved setup");
                }
            }
        }
    }
    Ok(current)
}

/// Validates `patch` against the saved section and persists the result.
pub fn update_section(
    conn: &Connection,
    section: SetupSection,
    patch: &Map<String, Value>,
) -> anyhow::Result<Result<Value, String>> {
    let mut current = load_section(conn, section)?;
    if let Err(msg) = merge_section_patch(section, &mut current, patch) {
        return Ok(Err(msg));
    }
    db::settings_set_json(conn, section.key(), &current)?;
    Ok(Ok(current))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortalConfig {
    pub thresholds: AttendanceThresholds,
    pub at_risk_attendance: u32,
    pub exchange_rate: ExchangeRate,
    pub lockdown_poll_interval: Duration,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            thresholds: AttendanceThresholds::default(),
            at_risk_attendance: DEFAULT_AT_RISK_ATTENDANCE,
            exchange_rate: ExchangeRate::default(),
            lockdown_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

fn u32_field(section: &Value, key: &str, fallback: u32) -> u32 {
    section
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(fallback)
}

impl PortalConfig {
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let attendance = load_section(conn, SetupSection::Attendance)?;
        let budget = load_section(conn, SetupSection::Budget)?;
        let lockdown = load_section(conn, SetupSection::Lockdown)?;

        let exchange_rate = budget
            .get("usdInrRate")
            .and_then(|v| v.as_f64())
            .and_then(|r| ExchangeRate::new(r).ok())
            .unwrap_or(defaults.exchange_rate);
        let poll_ms = lockdown
            .get("pollIntervalMs")
            .and_then(|v| v.as_u64())
            .unwrap_or(defaults.lockdown_poll_interval.as_millis() as u64);

        Ok(Self {
            thresholds: AttendanceThresholds {
                eligibility: u32_field(
                    &attendance,
                    "eligibilityThreshold",
                    defaults.thresholds.eligibility,
                ),
                warning: u32_field(&attendance, "warningThreshold", defaults.thresholds.warning),
            },
            at_risk_attendance: u32_field(
                &attendance,
                "atRiskAttendance",
                defaults.at_risk_attendance,
            ),
            exchange_rate,
            lockdown_poll_interval: Duration::from_millis(poll_ms),
        })
    }
}

use serde::de::DeserializeOwned;
use serde_json::json;

use crate::error::{CalcError, LockdownError};
use crate::ipc::error::err;
use crate::ipc::types::Request;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<CalcError> for HandlerErr {
    fn from(e: CalcError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

impl From<LockdownError> for HandlerErr {
    fn from(e: LockdownError) -> Self {
        Self::new(e.code(), e.to_string())
    }
}

/// Wraps a fallible handler body into a response line.
pub fn respond(
    req: &Request,
    out: Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    match out {
        Ok(v) => crate::ipc::error::ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

pub fn get_required_u32(params: &serde_json::Value, key: &str) -> Result<u32, HandlerErr> {
    match get_optional_u32(params, key)? {
        Some(n) => Ok(n),
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn get_optional_u32(params: &serde_json::Value, key: &str) -> Result<Option<u32>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a non-negative integer", key)))
}

pub fn get_required_f64(params: &serde_json::Value, key: &str) -> Result<f64, HandlerErr> {
    match get_optional_f64(params, key)? {
        Some(n) => Ok(n),
        None => Err(HandlerErr::bad_params(format!("missing {}", key))),
    }
}

pub fn get_optional_f64(params: &serde_json::Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    v.as_f64()
        .map(Some)
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be a number", key)))
}

pub fn get_bool(params: &serde_json::Value, key: &str, default: bool) -> Result<bool, HandlerErr> {
    match params.get(key) {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| HandlerErr::bad_params(format!("{} must be boolean", key))),
    }
}

/// Decodes `params[key]` as a list, reporting the first bad element by index.
pub fn get_list<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<Vec<T>, HandlerErr> {
    let Some(items) = params.get(key).and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params(format!("{} must be an array", key)));
    };
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let parsed = serde_json::from_value::<T>(item.clone()).map_err(|e| {
            HandlerErr::new("bad_record", format!("{}[{}]: {}", key, index, e))
                .with_details(json!({ "index": index }))
        })?;
        out.push(parsed);
    }
    Ok(out)
}

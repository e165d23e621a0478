use thiserror::Error;

use crate::roles::Role;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("cannot parse budget amount: {input:?}")]
    Parse { input: String },

    #[error("attendance total is zero; percentage is undefined")]
    DivisionByZero,

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("exchange rate must be a positive finite number, got {0}")]
    InvalidRate(f64),

    #[error("budget amount out of range: {0}")]
    InvalidAmount(f64),
}

impl CalcError {
    /// Stable code used on the sidecar wire.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse_error",
            Self::DivisionByZero => "division_by_zero",
            Self::InvalidRecord(_) => "bad_record",
            Self::InvalidRate(_) => "bad_rate",
            Self::InvalidAmount(_) => "bad_params",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockdownError {
    #[error("lockdown changes require explicit confirmation")]
    NotConfirmed,

    #[error("role {0} may not change the lockdown flag")]
    Forbidden(Role),

    #[error("lockdown store unavailable: {0}")]
    Store(String),
}

impl LockdownError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotConfirmed => "not_confirmed",
            Self::Forbidden(_) => "forbidden",
            Self::Store(_) => "db_update_failed",
        }
    }
}

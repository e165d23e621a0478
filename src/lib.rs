//! Derivation rules for the campus portal: attendance eligibility, dual-currency
//! budgets, roster standing, and the shared lockdown flag, plus the JSON-lines
//! sidecar that serves them to the front end.

pub mod calc;
pub mod config;
pub mod currency;
pub mod db;
pub mod error;
pub mod ipc;
pub mod lockdown;
pub mod roles;
pub mod roster;

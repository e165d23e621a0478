pub mod attendance;
pub mod budget;
pub mod core;
pub mod lockdown;
pub mod roster;
pub mod setup;

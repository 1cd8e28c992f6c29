//! Sector Combat - automated multi-party space battle resolution

pub mod combat;
pub mod core;

//! Tabulation engine for British Parliamentary debating tournaments:
//! power-paired draws, standings, the elimination bracket and the tabs.

pub mod config;
pub mod error;
pub mod msg;
pub mod state;
pub mod tournaments;
pub mod workloads;

// src/services/mod.rs

pub mod attempt;
pub mod catalog;
pub mod history;
pub mod ledger;
pub mod scoring;
pub mod sweeper;

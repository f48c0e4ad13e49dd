//! Core domain types and logic.

pub mod bar;
pub mod error;
pub mod universe;
pub mod window;
pub mod signal;
pub mod selection;
pub mod allocation;
pub mod tranche;
pub mod execution;
pub mod schedule;
pub mod strategy;
pub mod engine;
pub mod position;
pub mod portfolio;
pub mod replay;
pub mod metrics;
pub mod config_validation;

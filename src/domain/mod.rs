//! Core domain types and decision logic.

pub mod aggregator;
pub mod analysis;
pub mod config;
pub mod config_validation;
pub mod context;
pub mod drivers;
pub mod engine;
pub mod error;
pub mod gates;
pub mod indicator;
pub mod indicator_helpers;
pub mod ohlcv;
pub mod regime;
pub mod signal;

pub mod analyzer;
pub mod cache;
pub mod calculator;
pub mod calculators;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod filters;
pub mod git;
pub mod logging;
pub mod retry;
pub mod strategies;
pub mod ui;
pub mod variables;

pub use calculator::{CalculatorOptions, VersionCalculator, VersionResult};
pub use error::{Result, VersionerError};

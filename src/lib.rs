//! Real-estate ROI simulation with smart-feature savings and a trained regression model.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod constants;
pub mod encoder;
pub mod engine;
pub mod error;
pub mod expense;
pub mod feature;
pub mod input;
pub mod log;
pub mod output;
pub mod predictor;
pub mod property;
pub mod roi;
pub mod savings;
pub mod sensitivity;
pub mod settings;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the config directory for the program
pub fn get_config_dir() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("smartroi");

    path
}

//! Configuration module for the dashboard.
//!
//! Provides YAML-based configuration loading and validation for:
//! - The website list (name, url)
//! - Ping settings (count, interval, timeout)
//! - Fetch settings (timeout, redirect bound, user agent)

mod app;
mod validation;

pub use app::{AppConfig, DEFAULT_CONFIG_FILE, Website};
pub use validation::{ConfigError, parse_duration};

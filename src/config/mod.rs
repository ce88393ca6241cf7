//! Configuration module for site-sync
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_sync::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-sync.toml")).unwrap();
//! println!("Records will be stamped with crawledBy = {}", config.crawler_name);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, IndexConfig, OutputConfig, SelectorEntry, SnapshotErrors,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

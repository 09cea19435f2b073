//! Shared types, error model, and configuration for drivesite.
//!
//! This crate is the foundation depended on by all other drivesite crates.
//! It provides:
//! - [`DriveSiteError`], the unified error type
//! - Domain types ([`RemoteItem`], [`ItemKind`], [`RunId`])
//! - Configuration ([`AppConfig`], [`SiteConfig`], env input loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DriveConfig, DriveInputs, ServiceAccountKey, SiteConfig, SiteSection,
    StateSection, config_dir, config_file_path, init_config, load_config, load_config_from,
    load_drive_inputs, parse_folder_ids,
};
pub use error::{DriveSiteError, Result};
pub use types::{INDEX_FILE_NAME, ItemKind, RemoteItem, RunId};

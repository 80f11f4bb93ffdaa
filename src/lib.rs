//! Gallery Renamer - rename photo and video groups after their capture time
//!
//! A batch moves through five phases: the source is scanned and its files
//! grouped by name (collect), each renameable group gets a target name from
//! its capture time (enrich), the user reviews and picks groups (ready), the
//! picked groups are renamed (commit) and the totals are shown (done).
//!
//! - [`workflow`] holds the phase controller, the item entities and the
//!   selection aggregate; it never touches the file system
//! - [`backend`] scans, reads metadata with Rayon and renames on disk
//! - [`driver`] feeds backend results into the workflow one event at a time
//! - [`tui`] is the interactive Ratatui front end

// Initialize i18n with locale files
rust_i18n::i18n!("locales", fallback = "en");

pub mod backend;
pub mod cli;
pub mod config;
pub mod driver;
pub mod error;
pub mod group;
pub mod i18n;
pub mod tui;
pub mod workflow;

pub use backend::{Backend, LocalBackend, LocalOptions};
pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use driver::{Driver, is_settled};
pub use error::{Error, Result};
pub use group::{FileGroup, GroupKey, ScanOutcome};
pub use i18n::init_locale;
pub use tui::TuiApp;
pub use workflow::{Phase, Session, WorkflowEvent};

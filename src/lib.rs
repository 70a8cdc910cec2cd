//! kindlebag: export wallabag entries tagged for reading to e-reader files.

pub mod cli;
pub mod config;
pub mod model;
pub mod output;
pub mod wallabag;

// Re-exports for CLI and consumers.
pub use config::{load_config, Config, ConfigError};
pub use model::{EntriesPage, Entry};
pub use output::{output_path, write_export, OutputError};
pub use wallabag::{
    fetch_all_entries, ApiError, EntryQuery, ExportFormat, WallabagApi, WallabagClient,
    WallabagClientBuilder,
};

use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod store;
pub mod types;

#[cfg(test)]
mod config_test;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use store::{HistorySink, SnapshotStore, StoreError};
pub use types::{
    Comment, Media, MediaType, NewSnapshot, Person, SearchKind, SearchRecord, SearchStatus,
    Snapshot, StoryItem,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

// Library interface for testing

// Declare all modules
pub mod audio_recorder;
pub mod cleaners;
pub mod conditions;
pub mod config;
pub mod constants;
pub mod data;
pub mod db;
pub mod error;
pub mod file_managers;
pub mod message_factories;
pub mod messengers;
pub mod outbox;
pub mod queries;
pub mod saving_filters;
pub mod schema;
pub mod solar;
pub mod store;
pub mod tasks;
pub mod types;

// Re-export the expected database version for convenience
pub use constants::EXPECTED_DB_VERSION;
pub use error::{Error, Result};

//! Core library for the weather music configuration.
//!
//! The crate owns the mapping from weather categories to musical generation
//! parameters. [`config`] describes the document and its canonical defaults,
//! [`store`] loads, queries and persists it, and [`edit`] turns raw user input
//! into store calls for interactive front ends.

pub mod config;
pub mod edit;
pub mod error;
pub mod store;
pub mod summary;

pub use config::{
    defaults, ConfigurationDocument, GeneralSettings, GeneralSettingsUpdate, WeatherProfile,
    WeatherProfileUpdate,
};
pub use edit::{EditReport, EditSession, FieldEdit};
pub use error::{MusicConfigError, Result};
pub use store::{ConfigStore, LoadSource};
pub use summary::{ConfigSummary, ProfileSummary};

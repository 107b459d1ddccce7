// Configuration loading

pub mod settings;

pub use settings::{ApiSettings, CatalogSettings, ConfigError, OutputSettings, Settings};

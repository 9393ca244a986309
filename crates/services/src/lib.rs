#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod loader_service;
pub mod source;
pub mod tracker_service;

pub use app_services::{AppServices, StoreMode};
pub use config::DataDir;
pub use error::{ConfigError, LoaderError, SourceError, StartupError, TrackerError};
pub use loader_service::{LoadReport, LoaderService, SourceOutcome};
pub use tracker_service::TrackerService;

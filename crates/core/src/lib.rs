pub mod client;
pub mod collector;
pub mod config;
pub mod error;
pub mod exposition;
pub mod model;

pub use client::{RedfishClient, TelemetrySource};
pub use collector::{CollectorConfig, RedfishCollector};
pub use config::{resolve, CliOverrides, EndpointConfig, FileConfig, ResolvedConfig};
pub use error::{CoreError, Result};
pub use model::*;

pub mod config;
pub mod error;
pub mod geo;
pub mod location;
pub mod observation;
pub mod prediction;
pub mod route;
pub mod service;
pub mod wire;

#[cfg(feature = "api")]
pub mod api;

pub use error::{ErrorKind, Result, TrafficError};

pub mod api;
pub mod catalog;
pub mod client;
pub mod config;
mod engine;
pub mod error;
pub mod invoke;
pub mod registry;
pub mod store;
pub mod types;

pub use config::Config;
pub use engine::Engine;
pub use error::{Error, ErrorBody, ErrorKind, Result};

//! Core types for webmark: configuration and the error taxonomy.

pub mod config;
pub mod error;

pub use config::{BrowserConfig, Config, ConvertConfig};
pub use error::{Result, WebmarkError};

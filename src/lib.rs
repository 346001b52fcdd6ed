pub mod config;
pub mod error;
pub mod introspect;
pub mod llm;
pub mod logger;
pub mod pipeline;
pub mod testgen;

pub use error::{Error, Result};

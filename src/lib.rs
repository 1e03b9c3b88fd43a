pub mod config;
pub mod error;
pub mod module;
pub mod shell;

pub use config::Config;
pub use error::{Result, ScullError};
pub use module::ScullModule;
pub use shell::{Command, Shell};

// Re-export key types from workspace crates
pub use device;
pub use storage;

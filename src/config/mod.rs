mod settings;

pub use settings::{ClientConfig, LoggingConfig, Settings};

//! Runtime settings for the command line and for embedding callers.

mod settings_struct;

pub use settings_struct::{Settings, SettingsError};

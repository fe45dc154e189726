use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::Storage;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Settings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Local hour of day at which the reminder scan runs.
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour: u32,
    #[serde(default = "default_reminder_window_hours")]
    pub reminder_window_hours: i64,
    /// Bearer token -> user id.
    #[serde(default)]
    pub api_tokens: BTreeMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            reminder_hour: default_reminder_hour(),
            reminder_window_hours: default_reminder_window_hours(),
            api_tokens: BTreeMap::new(),
        }
    }
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_reminder_hour() -> u32 {
    9
}

fn default_reminder_window_hours() -> i64 {
    24
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct SettingsFile {
    pub schema_version: u32,
    pub settings: Settings,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            settings: Settings::default(),
        }
    }
}

/// Reads `settings.json`, writing a default one on first start. A broken file
/// is left in place and the defaults are used.
pub fn load_or_init_settings(storage: &Storage) -> Settings {
    match storage.load_settings() {
        Ok(file) => file.settings,
        Err(err) if err.is_not_found() => {
            let file = SettingsFile::default();
            match storage.save_settings(&file) {
                Ok(()) => log::info!(
                    "wrote default settings to {}",
                    storage.root().join("settings.json").display()
                ),
                Err(err) => log::warn!("could not write default settings: {err}"),
            }
            file.settings
        }
        Err(err) => {
            log::warn!("could not load settings, using defaults: {err}");
            Settings::default()
        }
    }
}

#[cfg(feature = "app")]
pub use cli::Cli;

#[cfg(feature = "app")]
mod cli {
    use std::path::PathBuf;

    use super::Settings;

    /// Task board REST server.
    #[derive(clap::Parser, Debug, Default)]
    #[command(version, about = "Task board REST server")]
    pub struct Cli {
        /// Directory holding settings.json, tasks.json and the log files.
        #[arg(long, env = "TASKBOARD_DATA_DIR")]
        pub data_dir: Option<PathBuf>,

        /// Address to bind, overriding `bind_addr` from settings.json.
        #[arg(short, long, env = "TASKBOARD_BIND")]
        pub bind: Option<String>,
    }

    impl Cli {
        pub fn data_dir(&self) -> PathBuf {
            self.data_dir.clone().unwrap_or_else(|| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("taskboard")
            })
        }

        /// CLI flags win over the settings file.
        pub fn apply(&self, mut settings: Settings) -> Settings {
            if let Some(bind) = &self.bind {
                settings.bind_addr = bind.clone();
            }
            settings
        }
    }
}

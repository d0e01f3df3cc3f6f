// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Application configuration management.
//!
//! Persistent settings are stored with confy in TOML format. The radar
//! section is handed to the radar engine as-is; the rest covers the desktop
//! shell (basemap style, window size, host state file).

use std::path::PathBuf;

use radar_loop::RadarConfig;
use serde::{Deserialize, Serialize};

use crate::map::BasemapStyle;

const APP_NAME: &str = "willyradar-desktop";
const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Basemap tile style
    #[serde(default)]
    pub basemap: BasemapStyle,

    /// Initial window width in logical pixels
    #[serde(default = "default_window_width")]
    pub window_width: f32,

    /// Initial window height in logical pixels
    #[serde(default = "default_window_height")]
    pub window_height: f32,

    /// JSON snapshot of host entity states, used to locate the tracked
    /// entity or the home zone
    #[serde(default)]
    pub host_state_path: Option<PathBuf>,

    /// How often the host state file is re-read, in seconds
    #[serde(default = "default_host_poll_secs")]
    pub host_poll_secs: u64,

    /// Radar widget settings
    #[serde(default)]
    pub radar: RadarConfig,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_window_width() -> f32 {
    1024.0
}

fn default_window_height() -> f32 {
    768.0
}

fn default_host_poll_secs() -> u64 {
    30
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            basemap: BasemapStyle::default(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            host_state_path: None,
            host_poll_secs: default_host_poll_secs(),
            radar: RadarConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults on first run
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }
}

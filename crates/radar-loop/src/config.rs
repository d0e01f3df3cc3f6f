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

//! Widget configuration and host-state lookups.
//!
//! The host dashboard hands the widget a loosely typed configuration object.
//! Missing keys fall back to the defaults below; a missing object is fatal.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::viewport::GeoPoint;

/// Fallback map center when neither config nor host provide one (Sydney).
pub const DEFAULT_CENTER: GeoPoint = GeoPoint { lat: -33.8688, lon: 151.2093 };

/// Entity that carries the home location in the host state.
pub const HOME_ZONE_ENTITY: &str = "zone.home";

/// Highest zoom level served by the basemap.
pub const MAX_ZOOM: u8 = 19;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Initial map zoom level.
    pub zoom: u8,

    /// Number of most recent frames to animate through.
    pub frame_count: usize,

    /// Explicit map center override. Both must be set to take effect.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    /// Entity whose `latitude`/`longitude` attributes recenter the map.
    pub entity: Option<String>,

    /// Add-on slug used to build the ingress path of the radar service.
    pub addon_slug: String,

    /// Base URL of the host, e.g. `http://homeassistant.local:8123`.
    pub base_url: String,

    pub animation_interval_ms: u64,
    pub refresh_interval_secs: u64,

    /// Zoom radius above which the long-range `radar` product is requested.
    pub regional_radius_threshold: f64,

    /// Pans shorter than this (meters) reuse the current frame set.
    pub pan_refetch_distance_m: f64,

    /// Overlay opacity (0.0 - 1.0).
    pub opacity: f32,

    /// Start animating as soon as frames are available.
    pub autoplay: bool,

    pub show_timestamp: bool,
    pub request_timeout_secs: u64,

    /// Delay after (re)initializing the map before the first fetch.
    pub settle_delay_ms: u64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            zoom: 10,
            frame_count: 5,
            latitude: None,
            longitude: None,
            entity: None,
            addon_slug: "willyweather_radar".to_string(),
            base_url: "http://homeassistant.local:8123".to_string(),
            animation_interval_ms: 800,
            refresh_interval_secs: 300,
            regional_radius_threshold: 1500.0,
            pan_refetch_distance_m: 5000.0,
            opacity: 0.7,
            autoplay: true,
            show_timestamp: true,
            request_timeout_secs: 15,
            settle_delay_ms: 100,
        }
    }
}

impl RadarConfig {
    /// Build from the host-supplied configuration object.
    pub fn from_host(raw: Option<&Value>) -> Result<Self, ConfigError> {
        let raw = match raw {
            None | Some(Value::Null) => return Err(ConfigError::Missing),
            Some(raw) => raw,
        };
        let config: Self = serde_json::from_value(raw.clone())?;
        config.validate()?;
        Ok(config)
    }

    /// Minimal configuration offered by the card picker.
    #[must_use]
    pub fn stub() -> Value {
        serde_json::json!({
            "zoom": 10,
            "addon_slug": "willyweather_radar",
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_count == 0 {
            return Err(ConfigError::Invalid("frame_count must be at least 1".to_string()));
        }
        if self.zoom > MAX_ZOOM {
            return Err(ConfigError::Invalid(format!("zoom must be at most {MAX_ZOOM}")));
        }
        if self.animation_interval_ms == 0 || self.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid("timer intervals must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(ConfigError::Invalid("opacity must be between 0 and 1".to_string()));
        }
        if self.addon_slug.trim().is_empty() {
            return Err(ConfigError::Invalid("addon_slug must not be empty".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn explicit_center(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(GeoPoint::new(lat, lon)),
            _ => None,
        }
    }

    /// Root URL of the radar service behind the host's ingress proxy.
    #[must_use]
    pub fn service_root(&self) -> String {
        format!(
            "{}/api/hassio_ingress/{}",
            self.base_url.trim_end_matches('/'),
            self.addon_slug
        )
    }

    #[must_use]
    pub fn animation_interval(&self) -> Duration {
        Duration::from_millis(self.animation_interval_ms)
    }

    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// True if switching to `other` invalidates the current frame set.
    #[must_use]
    pub fn needs_refetch(&self, other: &Self) -> bool {
        self.frame_count != other.frame_count
            || self.zoom != other.zoom
            || self.service_root() != other.service_root()
            || self.explicit_center() != other.explicit_center()
            || (self.regional_radius_threshold - other.regional_radius_threshold).abs() > f64::EPSILON
    }
}

/// State of one host entity.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntityState {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
}

impl EntityState {
    #[must_use]
    pub fn location(&self) -> Option<GeoPoint> {
        let lat = self.attributes.get("latitude")?.as_f64()?;
        let lon = self.attributes.get("longitude")?.as_f64()?;
        Some(GeoPoint::new(lat, lon))
    }
}

/// Snapshot of host entity states, keyed by entity id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostState {
    #[serde(default)]
    pub states: HashMap<String, EntityState>,
}

impl HostState {
    #[must_use]
    pub fn location_of(&self, entity_id: &str) -> Option<GeoPoint> {
        self.states.get(entity_id)?.location()
    }

    #[must_use]
    pub fn home_location(&self) -> Option<GeoPoint> {
        self.location_of(HOME_ZONE_ENTITY)
    }
}

/// Initial map center: explicit override, then tracked entity, then home zone.
#[must_use]
pub fn resolve_center(config: &RadarConfig, host: Option<&HostState>) -> GeoPoint {
    if let Some(center) = config.explicit_center() {
        return center;
    }
    let Some(host) = host else {
        return DEFAULT_CENTER;
    };
    config
        .entity
        .as_deref()
        .and_then(|entity| host.location_of(entity))
        .or_else(|| host.home_location())
        .unwrap_or(DEFAULT_CENTER)
}

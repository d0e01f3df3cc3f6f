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

//! Viewport snapshots and radar product selection.
//!
//! A fetch sequence always works against a *locked* viewport captured when the
//! timestamp request starts. The user may keep panning while the request is in
//! flight; the live map state is only read again when the next fetch begins.

use serde::{Deserialize, Serialize};

use crate::map::MapSurface;

/// Mean Earth radius in meters.
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// A WGS-84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance between two points using the Haversine formula (meters).
#[must_use]
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let delta_lat = (b.lat - a.lat).to_radians();
    let delta_lon = (b.lon - a.lon).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Map center and zoom at a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: GeoPoint,
    pub zoom: u8,
}

impl Viewport {
    #[must_use]
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        Self { center, zoom }
    }
}

/// Reads the live map viewport and holds the snapshot used by in-flight requests.
#[derive(Debug, Default)]
pub struct ViewportTracker {
    locked: Option<Viewport>,
}

impl ViewportTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the live map state without touching the locked snapshot.
    #[must_use]
    pub fn current<M: MapSurface + ?Sized>(map: &M) -> Viewport {
        Viewport::new(map.center(), map.zoom())
    }

    /// Capture the live viewport and keep it for the rest of the fetch sequence.
    pub fn lock<M: MapSurface + ?Sized>(&mut self, map: &M) -> Viewport {
        let viewport = Self::current(map);
        self.locked = Some(viewport);
        viewport
    }

    /// The snapshot taken by the most recent [`lock`](Self::lock), if any.
    #[must_use]
    pub fn locked(&self) -> Option<Viewport> {
        self.locked
    }

    pub fn clear(&mut self) {
        self.locked = None;
    }
}

/// Imagery product requested from the radar service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadarProduct {
    /// Long-range composite radar.
    Radar,
    /// Short-range regional radar for closely zoomed views.
    RegionalRadar,
}

impl RadarProduct {
    /// Value of the `type` query parameter.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RadarProduct::Radar => "radar",
            RadarProduct::RegionalRadar => "regional-radar",
        }
    }

    /// Pick the product for a zoom level. Views whose radius exceeds the
    /// threshold use the long-range product.
    #[must_use]
    pub fn classify(zoom: u8, threshold: f64) -> Self {
        if zoom_radius(zoom) > threshold {
            RadarProduct::Radar
        } else {
            RadarProduct::RegionalRadar
        }
    }
}

/// Approximate view radius for a zoom level, in the service's radius units.
#[must_use]
pub fn zoom_radius(zoom: u8) -> f64 {
    5000.0 / 2f64.powi(i32::from(zoom) - 5)
}

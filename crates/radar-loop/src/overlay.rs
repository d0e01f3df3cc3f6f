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

//! Radar overlay images and the single live-overlay slot.
//!
//! Exactly one overlay is attached to the map at a time. Replacing it always
//! attaches the new overlay first and detaches the old one afterwards, so the
//! map never shows a blank frame during a transition.

use log::debug;

use crate::error::{FetchError, MapError};
use crate::map::{MapSurface, OverlayHandle};
use crate::viewport::Viewport;

pub const BOUNDS_SOUTH_HEADER: &str = "X-Radar-Bounds-South";
pub const BOUNDS_WEST_HEADER: &str = "X-Radar-Bounds-West";
pub const BOUNDS_NORTH_HEADER: &str = "X-Radar-Bounds-North";
pub const BOUNDS_EAST_HEADER: &str = "X-Radar-Bounds-East";

/// Geographic box of a radar image, as reported by the radar service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Parse bounds from response headers. `lookup` returns a header value by name.
    ///
    /// Every one of the four headers must be present and a finite number.
    pub fn from_headers<'a, F>(lookup: F) -> Result<Self, FetchError>
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let field = |name: &'static str| -> Result<f64, FetchError> {
            lookup(name)
                .and_then(|raw| raw.trim().parse::<f64>().ok())
                .filter(|value| value.is_finite())
                .ok_or(FetchError::MalformedBounds(name))
        };

        Ok(Self {
            south: field(BOUNDS_SOUTH_HEADER)?,
            west: field(BOUNDS_WEST_HEADER)?,
            north: field(BOUNDS_NORTH_HEADER)?,
            east: field(BOUNDS_EAST_HEADER)?,
        })
    }
}

/// Raw image payload returned by the radar service.
#[derive(Clone, PartialEq, Eq)]
pub struct RadarImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl std::fmt::Debug for RadarImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarImage")
            .field("len", &self.bytes.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// A displayable radar frame tied to one timestamp and one viewport.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayImage {
    pub timestamp: String,
    pub viewport: Viewport,
    pub bounds: GeoBounds,
    pub image: RadarImage,
    pub opacity: f32,
}

/// Owner of the overlay currently attached to the map.
#[derive(Debug, Default)]
pub struct OverlaySlot {
    live: Option<(OverlayHandle, OverlayImage)>,
}

impl OverlaySlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The overlay currently on the map.
    #[must_use]
    pub fn live(&self) -> Option<&OverlayImage> {
        self.live.as_ref().map(|(_, overlay)| overlay)
    }

    /// Replace the live overlay.
    ///
    /// If attaching fails the previous overlay stays on the map untouched.
    pub fn swap<M: MapSurface + ?Sized>(
        &mut self,
        map: &mut M,
        overlay: OverlayImage,
    ) -> Result<(), MapError> {
        let handle = map.attach_overlay(&overlay)?;
        debug!("Attached radar overlay {:?} for {}", handle, overlay.timestamp);

        if let Some((old_handle, old_overlay)) = self.live.replace((handle, overlay)) {
            map.detach_overlay(old_handle);
            drop(old_overlay);
            debug!("Released radar overlay {:?}", old_handle);
        }
        Ok(())
    }

    /// Detach and release the live overlay, if any.
    pub fn clear<M: MapSurface + ?Sized>(&mut self, map: &mut M) {
        if let Some((handle, overlay)) = self.live.take() {
            map.detach_overlay(handle);
            drop(overlay);
        }
    }
}

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

//! Mapping-component collaborator.
//!
//! The engine never renders tiles itself. A host supplies a [`MapSurface`]
//! (a slippy map with an image-overlay primitive) at construction time.

use std::future::Future;

use tokio::sync::OnceCell;

use crate::error::MapError;
use crate::overlay::OverlayImage;
use crate::viewport::{haversine_meters, GeoPoint};

/// Identifier of an overlay attached to a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayHandle(pub u64);

/// Operations the engine needs from the host map.
pub trait MapSurface {
    /// Live map center.
    fn center(&self) -> GeoPoint;

    /// Live zoom level.
    fn zoom(&self) -> u8;

    /// Move the map programmatically.
    fn set_view(&mut self, center: GeoPoint, zoom: u8);

    /// Attach an image overlay at its bounds and return a handle for later removal.
    fn attach_overlay(&mut self, overlay: &OverlayImage) -> Result<OverlayHandle, MapError>;

    /// Detach an overlay and release whatever backs it. Unknown handles are ignored.
    fn detach_overlay(&mut self, handle: OverlayHandle);

    /// Geodesic distance between two points in meters.
    fn distance_meters(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        haversine_meters(a, b)
    }

    /// Tear the map down. Called once when the widget is disposed.
    fn remove(&mut self) {}
}

/// Process-wide resource with an idempotent "ensure loaded" contract.
///
/// The first caller runs the initializer; later and concurrent callers wait on
/// and share that result. A failed initialization is not cached.
#[derive(Debug)]
pub struct Loader<T> {
    cell: OnceCell<T>,
}

impl<T> Loader<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { cell: OnceCell::new() }
    }

    pub async fn ensure_loaded<F, Fut, E>(&self, init: F) -> Result<&T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell.get_or_try_init(init).await
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.cell.get()
    }
}

impl<T> Default for Loader<T> {
    fn default() -> Self {
        Self::new()
    }
}

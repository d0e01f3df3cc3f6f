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

//! Map surface shared between the radar engine and the egui thread.
//!
//! The engine runs on a tokio worker and attaches/detaches overlays through
//! [`MapSurface`]. The UI thread reads the attached overlays each frame and
//! reports the viewport the user has scrolled to. Overlay images are decoded
//! into egui textures on attach; dropping the texture handle on detach
//! releases the GPU memory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;
use radar_loop::{GeoBounds, GeoPoint, MapError, MapSurface, OverlayHandle, OverlayImage};

/// An overlay decoded and ready to paint.
#[derive(Clone)]
pub struct LoadedOverlay {
    pub handle: OverlayHandle,
    pub timestamp: String,
    pub texture: egui::TextureHandle,
    pub bounds: GeoBounds,
    pub opacity: f32,
}

impl std::fmt::Debug for LoadedOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedOverlay")
            .field("handle", &self.handle)
            .field("timestamp", &self.timestamp)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct MapViewState {
    center: GeoPoint,
    zoom: u8,
    /// View requested by the engine, applied by the UI on its next frame.
    pending_view: Option<(GeoPoint, u8)>,
    overlays: Vec<LoadedOverlay>,
    removed: bool,
}

/// Cloneable handle to the map state.
#[derive(Clone)]
pub struct SharedMapView {
    state: Arc<Mutex<MapViewState>>,
    next_handle: Arc<AtomicU64>,
    ctx: egui::Context,
}

impl std::fmt::Debug for SharedMapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedMapView")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SharedMapView {
    pub fn new(ctx: egui::Context, center: GeoPoint, zoom: u8) -> Self {
        Self {
            state: Arc::new(Mutex::new(MapViewState {
                center,
                zoom,
                pending_view: None,
                overlays: Vec::new(),
                removed: false,
            })),
            next_handle: Arc::new(AtomicU64::new(1)),
            ctx,
        }
    }

    fn state(&self) -> MutexGuard<'_, MapViewState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the viewport the user has moved the map to.
    pub fn report_view(&self, center: GeoPoint, zoom: u8) {
        let mut state = self.state();
        state.center = center;
        state.zoom = zoom;
    }

    /// Take a view change requested by the engine, if any.
    pub fn take_pending_view(&self) -> Option<(GeoPoint, u8)> {
        self.state().pending_view.take()
    }

    /// Overlays to paint this frame, oldest first.
    pub fn overlays(&self) -> Vec<LoadedOverlay> {
        self.state().overlays.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.state().removed
    }

    fn decode(&self, handle: OverlayHandle, overlay: &OverlayImage) -> Result<egui::TextureHandle, MapError> {
        let decoded = image::load_from_memory(&overlay.image.bytes)
            .map_err(|e| MapError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());

        Ok(self.ctx.load_texture(
            format!("radar_overlay_{}", handle.0),
            color_image,
            egui::TextureOptions::LINEAR,
        ))
    }
}

impl MapSurface for SharedMapView {
    fn center(&self) -> GeoPoint {
        self.state().center
    }

    fn zoom(&self) -> u8 {
        self.state().zoom
    }

    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        {
            let mut state = self.state();
            state.center = center;
            state.zoom = zoom;
            state.pending_view = Some((center, zoom));
        }
        self.ctx.request_repaint();
    }

    fn attach_overlay(&mut self, overlay: &OverlayImage) -> Result<OverlayHandle, MapError> {
        if self.is_removed() {
            return Err(MapError::Removed);
        }
        let handle = OverlayHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let texture = self.decode(handle, overlay)?;

        self.state().overlays.push(LoadedOverlay {
            handle,
            timestamp: overlay.timestamp.clone(),
            texture,
            bounds: overlay.bounds,
            opacity: overlay.opacity,
        });
        self.ctx.request_repaint();
        Ok(handle)
    }

    fn detach_overlay(&mut self, handle: OverlayHandle) {
        let removed = {
            let mut state = self.state();
            state
                .overlays
                .iter()
                .position(|o| o.handle == handle)
                .map(|pos| state.overlays.remove(pos))
        };
        if let Some(overlay) = removed {
            debug!("Dropping radar texture for {}", overlay.timestamp);
            self.ctx.request_repaint();
        }
    }

    fn remove(&mut self) {
        let mut state = self.state();
        state.overlays.clear();
        state.pending_view = None;
        state.removed = true;
    }
}

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

//! Walkers plugin that paints radar overlays over the basemap.

use egui::{Color32, Rect, Ui};
use walkers::{lon_lat, MapMemory, Plugin, Projector};

use super::surface::LoadedOverlay;

/// Paints every attached overlay at its geographic bounds.
///
/// While a swap is in progress two overlays can be attached at once; the
/// newer one is drawn last so it sits on top.
pub struct RadarOverlayPlugin {
    overlays: Vec<LoadedOverlay>,
}

impl RadarOverlayPlugin {
    pub fn new(overlays: Vec<LoadedOverlay>) -> Self {
        Self { overlays }
    }
}

/// Tint that applies `opacity` to a texture.
pub fn opacity_tint(opacity: f32) -> Color32 {
    Color32::from_white_alpha((opacity.clamp(0.0, 1.0) * 255.0).round() as u8)
}

impl Plugin for RadarOverlayPlugin {
    fn run(
        self: Box<Self>,
        ui: &mut Ui,
        _response: &egui::Response,
        projector: &Projector,
        _memory: &MapMemory,
    ) {
        let painter = ui.painter();
        let uv = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

        for overlay in &self.overlays {
            let bounds = overlay.bounds;
            let nw = projector.project(lon_lat(bounds.west, bounds.north));
            let se = projector.project(lon_lat(bounds.east, bounds.south));
            let screen_rect = Rect::from_min_max(egui::pos2(nw.x, nw.y), egui::pos2(se.x, se.y));

            painter.image(overlay.texture.id(), screen_rect, uv, opacity_tint(overlay.opacity));
        }
    }
}

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

//! Map rendering for the radar widget.
//!
//! Basemap tile sources, the shared map surface handed to the radar engine,
//! and the walkers plugin that paints radar overlays.

pub mod basemap;
pub mod overlay_plugin;
pub mod surface;

pub use basemap::{BasemapSource, BasemapStyle};
pub use overlay_plugin::RadarOverlayPlugin;
pub use surface::SharedMapView;

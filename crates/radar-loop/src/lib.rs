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

//! Frame synchronization engine for animated weather radar overlays.
//!
//! The crate keeps a single radar image overlay on a slippy map in step with a
//! looping sequence of radar frames fetched from a radar service:
//!
//! - **Viewport layer**: live/locked map viewport and radar product selection
//! - **Frames layer**: size-capped frame sets and the wrapping frame cursor
//! - **Overlay layer**: bounds parsing and attach-before-detach overlay swaps
//! - **Governor**: supersede-not-queue cancellation for each request category
//! - **Timers and visibility**: animation loop, refresh timer, visibility gate
//! - **Engine/driver**: the [`RadarWidget`] state machine and its tokio driver
//!
//! The map and the radar service are collaborators supplied by the host
//! through the [`MapSurface`] and [`RadarBackend`] traits.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use radar_loop::{HttpBackend, RadarConfig, RadarWidget, WidgetEvent, WidgetHandle};
//! # use radar_loop::{GeoPoint, MapError, MapSurface, OverlayHandle, OverlayImage};
//! # struct MyMap;
//! # impl MapSurface for MyMap {
//! #     fn center(&self) -> GeoPoint { GeoPoint::new(-33.87, 151.21) }
//! #     fn zoom(&self) -> u8 { 10 }
//! #     fn set_view(&mut self, _: GeoPoint, _: u8) {}
//! #     fn attach_overlay(&mut self, _: &OverlayImage) -> Result<OverlayHandle, MapError> { Ok(OverlayHandle(0)) }
//! #     fn detach_overlay(&mut self, _: OverlayHandle) {}
//! # }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RadarConfig::default();
//!     let backend = Arc::new(HttpBackend::new(&config).unwrap());
//!     let (widget, completions) = RadarWidget::new(config, MyMap, backend);
//!     let handle = WidgetHandle::spawn(widget, completions);
//!
//!     handle.send(WidgetEvent::Pan);
//!     println!("{:?}", handle.status().label);
//! }
//! ```

pub mod animation;
pub mod backend;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod frames;
pub mod governor;
pub mod map;
pub mod overlay;
pub mod viewport;
pub mod visibility;

pub use animation::{AnimationLoop, PeriodicTimer};
pub use backend::{HttpBackend, RadarBackend};
pub use config::{resolve_center, EntityState, HostState, RadarConfig, DEFAULT_CENTER};
pub use driver::WidgetHandle;
pub use engine::{Completion, RadarWidget, WidgetEvent, WidgetStatus};
pub use error::{ConfigError, FetchError, MapError};
pub use frames::{format_timestamp, FrameCursor, FrameSet};
pub use governor::{RequestSlot, Ticket};
pub use map::{Loader, MapSurface, OverlayHandle};
pub use overlay::{GeoBounds, OverlayImage, OverlaySlot, RadarImage};
pub use viewport::{GeoPoint, RadarProduct, Viewport, ViewportTracker};
pub use visibility::{Transition, VisibilityGate, VisibilitySignal, VisibilityState};

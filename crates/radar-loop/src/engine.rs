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

//! The radar widget engine.
//!
//! [`RadarWidget`] owns all widget state and is driven by two kinds of input:
//!
//! - [`WidgetEvent`]s from the host and from timers (`handle`)
//! - [`Completion`]s of the fetches it spawned (`apply`)
//!
//! Both are processed one at a time by a single owner, so no state is shared
//! with the spawned fetch tasks. Stale completions are discarded by checking
//! their [`Ticket`] against the request slot that issued them.

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::mpsc;

use crate::animation::{AnimationLoop, PeriodicTimer};
use crate::backend::RadarBackend;
use crate::config::RadarConfig;
use crate::error::FetchError;
use crate::frames::{format_timestamp, FrameCursor, FrameSet};
use crate::governor::{run_cancellable, RequestSlot, Ticket};
use crate::map::MapSurface;
use crate::overlay::{GeoBounds, OverlayImage, OverlaySlot, RadarImage};
use crate::viewport::{GeoPoint, RadarProduct, Viewport, ViewportTracker};
use crate::visibility::{Transition, VisibilityGate, VisibilitySignal, VisibilityState};

/// Everything that can happen to a widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    /// Initial load once the map has settled.
    Load,
    /// Animation timer fired.
    Tick,
    /// Periodic long-interval refresh fired.
    Refresh,
    /// User asked for fresh data.
    UserRefresh,
    /// The map finished panning.
    Pan,
    /// The map finished zooming.
    Zoom,
    Visibility(VisibilitySignal),
    ConfigChanged(RadarConfig),
    /// The tracked entity (or home zone) moved.
    HomeMoved(GeoPoint),
    NextFrame,
    PreviousFrame,
    TogglePlay,
    Dispose,
}

/// Result of a fetch spawned by the widget.
#[derive(Debug)]
pub enum Completion {
    FrameSet {
        ticket: Ticket,
        viewport: Viewport,
        result: Result<Vec<String>, FetchError>,
    },
    Overlay {
        ticket: Ticket,
        viewport: Viewport,
        timestamp: String,
        result: Result<(RadarImage, GeoBounds), FetchError>,
    },
}

/// Read-only snapshot of widget state for the host UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetStatus {
    pub frames: Vec<String>,
    pub index: usize,
    /// Formatted label of the active frame.
    pub label: Option<String>,
    /// Identifier of the frame currently on the map.
    pub displayed: Option<String>,
    pub playing: bool,
    pub animating: bool,
    pub loading: bool,
    pub visible: bool,
    pub last_error: Option<String>,
    pub disposed: bool,
}

/// Frame synchronization engine for one radar widget.
pub struct RadarWidget<M> {
    config: RadarConfig,
    map: M,
    backend: Arc<dyn RadarBackend>,
    completions: mpsc::UnboundedSender<Completion>,

    tracker: ViewportTracker,
    frames: FrameSet,
    /// Viewport the installed frame set was fetched for. Overlays are always
    /// requested against it, even while a refetch for a newer viewport is pending.
    frames_viewport: Option<Viewport>,
    cursor: FrameCursor,
    overlay: OverlaySlot,

    timestamp_requests: RequestSlot,
    overlay_requests: RequestSlot,

    animation: AnimationLoop,
    refresh: PeriodicTimer,
    visibility: VisibilityGate,

    /// User pressed pause; visibility changes must not resume the loop.
    paused: bool,
    last_error: Option<String>,
    disposed: bool,
}

impl<M> std::fmt::Debug for RadarWidget<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadarWidget")
            .field("frames", &self.frames)
            .field("cursor", &self.cursor)
            .field("animation", &self.animation)
            .field("visibility", &self.visibility)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl<M: MapSurface> RadarWidget<M> {
    /// Create a widget. Completions of the fetches it spawns arrive on the
    /// returned receiver and must be fed back through [`apply`](Self::apply).
    pub fn new(
        config: RadarConfig,
        map: M,
        backend: Arc<dyn RadarBackend>,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let widget = Self {
            animation: AnimationLoop::new(config.animation_interval()),
            refresh: PeriodicTimer::new(config.refresh_interval()),
            paused: !config.autoplay,
            config,
            map,
            backend,
            completions,
            tracker: ViewportTracker::new(),
            frames: FrameSet::empty(),
            frames_viewport: None,
            cursor: FrameCursor::default(),
            overlay: OverlaySlot::new(),
            timestamp_requests: RequestSlot::new("timestamps"),
            overlay_requests: RequestSlot::new("overlay"),
            visibility: VisibilityGate::new(VisibilityState::default()),
            last_error: None,
            disposed: false,
        };
        (widget, completion_rx)
    }

    #[must_use]
    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    #[must_use]
    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    #[must_use]
    pub fn frames(&self) -> &FrameSet {
        &self.frames
    }

    #[must_use]
    pub fn frame_index(&self) -> usize {
        self.cursor.index()
    }

    #[must_use]
    pub fn live_overlay(&self) -> Option<&OverlayImage> {
        self.overlay.live()
    }

    #[must_use]
    pub fn locked_viewport(&self) -> Option<Viewport> {
        self.tracker.locked()
    }

    #[must_use]
    pub fn is_animating(&self) -> bool {
        self.animation.is_running()
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visibility.is_visible()
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn status(&self) -> WidgetStatus {
        WidgetStatus {
            frames: self.frames.as_slice().to_vec(),
            index: self.cursor.index(),
            label: self.cursor.current(&self.frames).map(format_timestamp),
            displayed: self.overlay.live().map(|o| o.timestamp.clone()),
            playing: !self.paused,
            animating: self.animation.is_running(),
            loading: self.timestamp_requests.in_flight(),
            visible: self.visibility.is_visible(),
            last_error: self.last_error.clone(),
            disposed: self.disposed,
        }
    }

    /// Wait for the next animation or refresh timer tick.
    pub async fn next_timer_event(&mut self) -> WidgetEvent {
        tokio::select! {
            () = self.animation.tick() => WidgetEvent::Tick,
            () = self.refresh.tick() => WidgetEvent::Refresh,
        }
    }

    pub fn handle(&mut self, event: WidgetEvent) {
        if self.disposed {
            debug!("Ignoring {:?} on disposed widget", event);
            return;
        }

        match event {
            WidgetEvent::Load => {
                if self.visibility.is_visible() {
                    self.refresh.start();
                }
                self.load_frames();
            }
            WidgetEvent::Tick => self.on_tick(),
            WidgetEvent::Refresh | WidgetEvent::UserRefresh => self.load_frames(),
            WidgetEvent::Pan => self.on_pan(),
            WidgetEvent::Zoom => self.on_zoom(),
            WidgetEvent::Visibility(signal) => self.on_visibility(signal),
            WidgetEvent::ConfigChanged(config) => self.on_config_changed(config),
            WidgetEvent::HomeMoved(center) => self.on_home_moved(center),
            WidgetEvent::NextFrame => {
                if self.cursor.advance(&self.frames, self.config.frame_count).is_some() {
                    self.render_current();
                }
            }
            WidgetEvent::PreviousFrame => {
                if self.cursor.retreat(&self.frames, self.config.frame_count).is_some() {
                    self.render_current();
                }
            }
            WidgetEvent::TogglePlay => self.toggle_play(),
            WidgetEvent::Dispose => self.dispose(),
        }
    }

    pub fn apply(&mut self, completion: Completion) {
        if self.disposed {
            return;
        }

        match completion {
            Completion::FrameSet { ticket, viewport, result } => {
                if !self.timestamp_requests.is_current(&ticket) {
                    debug!("Discarding superseded timestamp response #{}", ticket.epoch());
                    return;
                }
                self.timestamp_requests.finish(&ticket);
                self.install_frames(viewport, result);
            }
            Completion::Overlay { ticket, viewport, timestamp, result } => {
                if !self.overlay_requests.is_current(&ticket) {
                    debug!("Discarding superseded overlay response for {}", timestamp);
                    return;
                }
                self.overlay_requests.finish(&ticket);
                self.install_overlay(viewport, timestamp, result);
            }
        }
    }

    fn on_tick(&mut self) {
        if !self.animation.is_running() || !self.visibility.is_visible() {
            return;
        }
        if self.cursor.advance(&self.frames, self.config.frame_count).is_some() {
            self.render_current();
        }
    }

    fn on_pan(&mut self) {
        let live = ViewportTracker::current(&self.map);
        let Some(locked) = self.tracker.locked() else {
            self.load_frames();
            return;
        };
        if live.zoom != locked.zoom {
            self.load_frames();
            return;
        }
        let moved = self.map.distance_meters(locked.center, live.center);
        if moved > self.config.pan_refetch_distance_m {
            info!("Map moved {:.0} m, refreshing radar frames", moved);
            self.load_frames();
        } else {
            debug!("Map moved {:.0} m, keeping current frames", moved);
        }
    }

    fn on_zoom(&mut self) {
        let live = ViewportTracker::current(&self.map);
        if self.tracker.locked().map_or(true, |locked| locked.zoom != live.zoom) {
            self.load_frames();
        }
    }

    fn on_visibility(&mut self, signal: VisibilitySignal) {
        match self.visibility.update(signal) {
            Transition::BecameVisible => {
                debug!("Radar widget visible");
                self.refresh.start();
                self.resume_animation();
            }
            Transition::BecameHidden => {
                debug!("Radar widget hidden, pausing animation");
                self.animation.stop();
                self.refresh.stop();
            }
            Transition::Unchanged => {}
        }
    }

    fn on_config_changed(&mut self, config: RadarConfig) {
        if let Err(e) = config.validate() {
            warn!("Ignoring invalid radar configuration: {}", e);
            self.last_error = Some(e.to_string());
            return;
        }

        let refetch = self.config.needs_refetch(&config);
        let restyle = (self.config.opacity - config.opacity).abs() > f32::EPSILON;
        let recenter = self.config.zoom != config.zoom
            || self.config.explicit_center() != config.explicit_center();

        self.animation.set_interval(config.animation_interval());
        self.refresh.set_period(config.refresh_interval());
        if self.config.autoplay != config.autoplay {
            self.paused = !config.autoplay;
            if self.paused {
                self.animation.stop();
            }
        }
        self.config = config;

        if recenter {
            let center = self.config.explicit_center().unwrap_or_else(|| self.map.center());
            self.map.set_view(center, self.config.zoom);
        }
        if restyle && !refetch {
            self.restyle_live_overlay();
        }
        if refetch {
            self.load_frames();
        } else {
            self.resume_animation();
        }
    }

    /// Re-attach the live overlay with the configured opacity.
    fn restyle_live_overlay(&mut self) {
        let Some(mut overlay) = self.overlay.live().cloned() else {
            return;
        };
        overlay.opacity = self.config.opacity;
        if let Err(e) = self.overlay.swap(&mut self.map, overlay) {
            warn!("Error restyling radar overlay: {}", e);
            self.last_error = Some(e.to_string());
        }
    }

    fn on_home_moved(&mut self, center: GeoPoint) {
        if self.config.explicit_center().is_some() {
            return;
        }
        if self.map.center() == center {
            return;
        }
        info!("Tracked location moved to {:.4}, {:.4}", center.lat, center.lon);
        let zoom = self.map.zoom();
        self.map.set_view(center, zoom);
        self.load_frames();
    }

    fn toggle_play(&mut self) {
        self.paused = !self.paused;
        if self.paused {
            info!("Radar animation paused");
            self.animation.stop();
        } else {
            info!("Radar animation playing");
            self.resume_animation();
        }
    }

    fn resume_animation(&mut self) {
        if !self.paused && !self.frames.is_empty() {
            self.animation.start(self.visibility.is_visible());
        }
    }

    /// Lock the viewport and fetch a new frame set, superseding any pending fetch.
    fn load_frames(&mut self) {
        let viewport = self.tracker.lock(&self.map);
        let product = RadarProduct::classify(viewport.zoom, self.config.regional_radius_threshold);
        let ticket = self.timestamp_requests.begin();
        debug!(
            "Fetching {} timestamps #{} for {:?}",
            product.as_str(),
            ticket.epoch(),
            viewport
        );

        let backend = Arc::clone(&self.backend);
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let result = run_cancellable(&ticket, backend.timestamps(&viewport, product)).await;
            if matches!(result, Err(FetchError::Cancelled)) {
                return;
            }
            let _ = tx.send(Completion::FrameSet { ticket, viewport, result });
        });
    }

    fn install_frames(&mut self, viewport: Viewport, result: Result<Vec<String>, FetchError>) {
        match result {
            Ok(all) => {
                self.frames = FrameSet::trimmed(all, self.config.frame_count);
                self.frames_viewport = Some(viewport);
                self.cursor.reset();
                self.last_error = None;
                info!("Loaded {} radar frames for {:?}", self.frames.len(), viewport);

                if self.frames.is_empty() {
                    self.animation.stop();
                    return;
                }
                self.render_current();
                self.resume_animation();
            }
            Err(FetchError::Cancelled) => {}
            Err(e) => {
                warn!("Error loading radar timestamps: {}", e);
                self.frames = FrameSet::empty();
                self.frames_viewport = None;
                self.cursor.reset();
                self.animation.stop();
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Fetch the overlay for the active frame, superseding any pending one.
    fn render_current(&mut self) {
        let Some(timestamp) = self.cursor.current(&self.frames).map(ToString::to_string) else {
            return;
        };
        let Some(viewport) = self.frames_viewport else {
            return;
        };
        let ticket = self.overlay_requests.begin();

        let backend = Arc::clone(&self.backend);
        let tx = self.completions.clone();
        tokio::spawn(async move {
            let result = run_cancellable(&ticket, backend.radar_image(&viewport, &timestamp)).await;
            if matches!(result, Err(FetchError::Cancelled)) {
                return;
            }
            let _ = tx.send(Completion::Overlay { ticket, viewport, timestamp, result });
        });
    }

    fn install_overlay(
        &mut self,
        viewport: Viewport,
        timestamp: String,
        result: Result<(RadarImage, GeoBounds), FetchError>,
    ) {
        match result {
            Ok((image, bounds)) => {
                let overlay = OverlayImage {
                    timestamp,
                    viewport,
                    bounds,
                    image,
                    opacity: self.config.opacity,
                };
                if let Err(e) = self.overlay.swap(&mut self.map, overlay) {
                    warn!("Error attaching radar overlay: {}", e);
                    self.last_error = Some(e.to_string());
                }
            }
            Err(FetchError::Cancelled) => {}
            Err(e) => {
                warn!("Error updating radar for {}: {}", timestamp, e);
                self.last_error = Some(e.to_string());
            }
        }
    }

    fn dispose(&mut self) {
        info!("Disposing radar widget");
        self.timestamp_requests.cancel();
        self.overlay_requests.cancel();
        self.animation.stop();
        self.refresh.stop();
        self.overlay.clear(&mut self.map);
        self.map.remove();
        self.tracker.clear();
        self.frames_viewport = None;
        self.disposed = true;
    }
}

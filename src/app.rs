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

//! Desktop shell around the radar widget.

use std::sync::Arc;
use std::time::{Duration, Instant};

use eframe::egui;
use log::{error, info, warn};
use radar_loop::config::MAX_ZOOM;
use radar_loop::{
    GeoPoint, HttpBackend, RadarBackend, RadarConfig, RadarWidget, VisibilitySignal, WidgetEvent,
    WidgetHandle, WidgetStatus,
};
use tokio::runtime::Runtime;
use tokio::sync::watch;
use walkers::{lon_lat, HttpOptions, HttpTiles, Map, MapMemory, Position};

use crate::config::AppConfig;
use crate::host_state;
use crate::map::basemap::tile_cache_dir;
use crate::map::{BasemapSource, BasemapStyle, RadarOverlayPlugin, SharedMapView};

/// How long the map must stay still before a move counts as finished.
const MOVE_END_DELAY: Duration = Duration::from_millis(250);

fn to_position(point: GeoPoint) -> Position {
    lon_lat(point.lon, point.lat)
}

fn to_geo(position: Position) -> GeoPoint {
    GeoPoint::new(position.y(), position.x())
}

fn zoom_level(zoom: f64) -> u8 {
    zoom.round().clamp(0.0, f64::from(MAX_ZOOM)) as u8
}

/// View the user settled on, compared against the last one reported.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ReportedView {
    center: GeoPoint,
    zoom: u8,
}

/// Movement waiting for the map to settle.
#[derive(Debug, Clone, Copy)]
struct PendingMove {
    view: ReportedView,
    since: Instant,
}

pub struct RadarApp {
    config: AppConfig,
    /// Settings being edited, applied on demand
    draft: AppConfig,
    show_settings: bool,

    runtime: Runtime,
    widget: WidgetHandle,
    view: SharedMapView,

    tiles: HttpTiles,
    memory: MapMemory,
    map_center: Position,
    /// Latest home location, kept current by the host state watcher
    home: watch::Receiver<GeoPoint>,

    reported: ReportedView,
    pending_move: Option<PendingMove>,
    in_viewport: bool,
    foreground: bool,
}

impl RadarApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: AppConfig,
        runtime: Runtime,
        center: GeoPoint,
    ) -> Result<Self, String> {
        let ctx = cc.egui_ctx.clone();
        let zoom = config.radar.zoom;

        let view = SharedMapView::new(ctx.clone(), center, zoom);
        let (widget, home) = spawn_widget(&runtime, &config, &view, center)?;
        let tiles = build_tiles(&runtime, config.basemap, &ctx);

        let mut memory = MapMemory::default();
        if let Err(e) = memory.set_zoom(f64::from(zoom)) {
            warn!("Invalid initial zoom {}: {:?}", zoom, e);
        }

        info!("Radar app initialized at {:?}, zoom {}", center, zoom);
        Ok(Self {
            draft: config.clone(),
            config,
            show_settings: false,
            runtime,
            widget,
            view,
            tiles,
            memory,
            map_center: to_position(center),
            home,
            reported: ReportedView { center, zoom },
            pending_move: None,
            in_viewport: true,
            foreground: true,
        })
    }

    /// Apply a view change requested by the widget (recenter on home).
    fn apply_pending_view(&mut self) {
        if let Some((center, zoom)) = self.view.take_pending_view() {
            self.map_center = to_position(center);
            self.memory.follow_my_position();
            if let Err(e) = self.memory.set_zoom(f64::from(zoom)) {
                warn!("Invalid zoom {} requested: {:?}", zoom, e);
            }
            self.reported = ReportedView { center, zoom };
            self.pending_move = None;
        }
    }

    /// Forward visibility changes of the window and the map panel.
    fn update_visibility(&mut self, ctx: &egui::Context, map_visible: bool) {
        let minimized = ctx.input(|i| i.viewport().minimized).unwrap_or(false);
        let foreground = !minimized;

        if foreground != self.foreground {
            self.foreground = foreground;
            self.widget.send(WidgetEvent::Visibility(VisibilitySignal::Foreground(foreground)));
        }
        if map_visible != self.in_viewport {
            self.in_viewport = map_visible;
            self.widget.send(WidgetEvent::Visibility(VisibilitySignal::Viewport(map_visible)));
        }
    }

    /// Track the map view and emit Pan/Zoom once the user lets go.
    fn track_movement(&mut self, ctx: &egui::Context, response: &egui::Response) {
        let center = to_geo(self.memory.detached().unwrap_or(self.map_center));
        let current = ReportedView { center, zoom: zoom_level(self.memory.zoom()) };
        let now = Instant::now();

        let interacting = response.dragged() || ctx.input(|i| i.pointer.any_down());
        if current != self.pending_move.map_or(self.reported, |m| m.view) {
            self.pending_move = Some(PendingMove { view: current, since: now });
        }

        let Some(pending) = self.pending_move else {
            return;
        };
        if interacting || now.duration_since(pending.since) < MOVE_END_DELAY {
            ctx.request_repaint_after(MOVE_END_DELAY);
            return;
        }

        self.view.report_view(pending.view.center, pending.view.zoom);
        let event = if pending.view.zoom == self.reported.zoom {
            WidgetEvent::Pan
        } else {
            WidgetEvent::Zoom
        };
        self.reported = pending.view;
        self.pending_move = None;
        self.widget.send(event);
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui, status: &WidgetStatus) {
        ui.horizontal(|ui| {
            let has_frames = !status.frames.is_empty();

            if ui.add_enabled(has_frames, egui::Button::new("⏮")).on_hover_text("Previous frame").clicked() {
                self.widget.send(WidgetEvent::PreviousFrame);
            }
            let play_label = if status.playing { "⏸" } else { "▶" };
            if ui.add_enabled(has_frames, egui::Button::new(play_label)).on_hover_text("Play / pause").clicked() {
                self.widget.send(WidgetEvent::TogglePlay);
            }
            if ui.add_enabled(has_frames, egui::Button::new("⏭")).on_hover_text("Next frame").clicked() {
                self.widget.send(WidgetEvent::NextFrame);
            }
            if ui.button("⟳").on_hover_text("Refresh radar").clicked() {
                self.widget.send(WidgetEvent::UserRefresh);
            }
            if ui.button("⌂").on_hover_text("Recenter on home").clicked() {
                let home = *self.home.borrow();
                self.widget.send(WidgetEvent::HomeMoved(home));
            }

            ui.separator();

            if self.config.radar.show_timestamp {
                if let Some(label) = &status.label {
                    ui.label(
                        egui::RichText::new(label)
                            .monospace()
                            .strong(),
                    );
                    if has_frames {
                        ui.label(
                            egui::RichText::new(format!("{}/{}", status.index + 1, status.frames.len()))
                                .color(egui::Color32::from_rgb(150, 150, 150))
                                .monospace(),
                        );
                    }
                }
            }
            if status.loading {
                ui.spinner();
            }
            if let Some(err) = &status.last_error {
                ui.label(egui::RichText::new(err).color(egui::Color32::from_rgb(255, 100, 100)));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("⚙").on_hover_text("Settings").clicked() {
                    self.draft = self.config.clone();
                    self.show_settings = !self.show_settings;
                }
            });
        });
    }

    fn draw_settings(&mut self, ctx: &egui::Context) {
        let mut open = self.show_settings;
        let mut apply = false;

        egui::Window::new("Radar Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let radar = &mut self.draft.radar;
                egui::Grid::new("radar_settings").num_columns(2).show(ui, |ui| {
                    ui.label("Frames");
                    ui.add(egui::Slider::new(&mut radar.frame_count, 1..=20));
                    ui.end_row();

                    ui.label("Frame interval (ms)");
                    ui.add(egui::Slider::new(&mut radar.animation_interval_ms, 100..=5000));
                    ui.end_row();

                    ui.label("Refresh interval (s)");
                    ui.add(egui::Slider::new(&mut radar.refresh_interval_secs, 30..=3600));
                    ui.end_row();

                    ui.label("Opacity");
                    ui.add(egui::Slider::new(&mut radar.opacity, 0.0..=1.0));
                    ui.end_row();

                    ui.label("Autoplay");
                    ui.checkbox(&mut radar.autoplay, "");
                    ui.end_row();

                    ui.label("Show timestamp");
                    ui.checkbox(&mut radar.show_timestamp, "");
                    ui.end_row();

                    ui.label("Base URL");
                    ui.text_edit_singleline(&mut radar.base_url);
                    ui.end_row();

                    ui.label("Add-on slug");
                    ui.text_edit_singleline(&mut radar.addon_slug);
                    ui.end_row();

                    ui.label("Basemap");
                    egui::ComboBox::from_id_salt("basemap_style")
                        .selected_text(self.draft.basemap.display_name())
                        .show_ui(ui, |ui| {
                            for style in [BasemapStyle::OpenStreetMap, BasemapStyle::CartoDark] {
                                ui.selectable_value(&mut self.draft.basemap, style, style.display_name());
                            }
                        });
                    ui.end_row();
                });

                ui.add_space(8.0);
                if let Ok(path) = AppConfig::get_config_path() {
                    ui.label(
                        egui::RichText::new(path.display().to_string())
                            .color(egui::Color32::from_rgb(150, 150, 150))
                            .small(),
                    );
                }
                if ui.button("Apply").clicked() {
                    apply = true;
                }
            });

        self.show_settings = open;
        if apply {
            self.apply_settings(ctx);
        }
    }

    fn apply_settings(&mut self, ctx: &egui::Context) {
        let draft = self.draft.clone();
        if let Err(e) = draft.radar.validate() {
            warn!("Rejected radar settings: {}", e);
            return;
        }

        if draft.basemap != self.config.basemap {
            self.tiles = build_tiles(&self.runtime, draft.basemap, ctx);
        }

        if service_changed(&self.config.radar, &draft.radar) {
            // The backend is bound to the service root; start a fresh widget
            info!("Radar service changed, restarting widget");
            self.widget.dispose();
            let center = to_geo(self.memory.detached().unwrap_or(self.map_center));
            self.view = SharedMapView::new(ctx.clone(), center, zoom_level(self.memory.zoom()));
            let home = *self.home.borrow();
            match spawn_widget(&self.runtime, &draft, &self.view, home) {
                Ok((widget, home)) => {
                    self.widget = widget;
                    self.home = home;
                }
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            }
        } else {
            self.widget.send(WidgetEvent::ConfigChanged(draft.radar.clone()));
        }

        self.config = draft;
        if let Err(e) = self.config.save() {
            warn!("Failed to save config: {}", e);
        }
    }
}

/// Whether the backend must be rebuilt for the new settings.
fn service_changed(old: &RadarConfig, new: &RadarConfig) -> bool {
    old.service_root() != new.service_root() || old.request_timeout_secs != new.request_timeout_secs
}

fn build_tiles(runtime: &Runtime, style: BasemapStyle, ctx: &egui::Context) -> HttpTiles {
    let cache = match runtime.block_on(tile_cache_dir(style)) {
        Ok(dir) => Some(dir),
        Err(e) => {
            warn!("Tile cache unavailable: {}", e);
            None
        }
    };
    let http_options = HttpOptions {
        cache,
        ..Default::default()
    };
    HttpTiles::with_options(BasemapSource::new(style), http_options, ctx.clone())
}

/// Start a widget on `view`. The returned receiver tracks the home location,
/// updated by the host state watcher when one is configured.
fn spawn_widget(
    runtime: &Runtime,
    config: &AppConfig,
    view: &SharedMapView,
    home: GeoPoint,
) -> Result<(WidgetHandle, watch::Receiver<GeoPoint>), String> {
    let backend: Arc<dyn RadarBackend> = Arc::new(
        HttpBackend::new(&config.radar).map_err(|e| format!("Failed to create radar client: {}", e))?,
    );

    let _guard = runtime.enter();
    let (widget, completions) = RadarWidget::new(config.radar.clone(), view.clone(), backend);
    let handle = WidgetHandle::spawn(widget, completions);
    let (home_tx, home_rx) = watch::channel(home);

    if let Some(path) = &config.host_state_path {
        runtime.spawn(host_state::watch_host_state(
            path.clone(),
            config.radar.clone(),
            Duration::from_secs(config.host_poll_secs.max(1)),
            home_tx,
            handle.event_sender(),
        ));
    }

    Ok((handle, home_rx))
}

impl eframe::App for RadarApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let status = self.widget.status();
        self.apply_pending_view();

        egui::TopBottomPanel::top("radar_controls").show(ctx, |ui| {
            self.draw_controls(ui, &status);
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let plugin = RadarOverlayPlugin::new(self.view.overlays());
                let map = Map::new(Some(&mut self.tiles), &mut self.memory, self.map_center)
                    .with_plugin(plugin);
                let response = ui.add(map);

                let map_visible = response.rect.area() > 0.0 && ui.is_rect_visible(response.rect);
                self.update_visibility(ctx, map_visible);
                self.track_movement(ctx, &response);
            });

        if self.show_settings {
            self.draw_settings(ctx);
        }

        // Status updates arrive from the widget task
        ctx.request_repaint_after(Duration::from_millis(200));
    }
}

impl Drop for RadarApp {
    fn drop(&mut self) {
        info!("Shutting down radar widget");
        self.widget.dispose();
    }
}

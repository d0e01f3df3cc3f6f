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

mod app;
mod config;
mod host_state;
mod map;

use std::path::PathBuf;

use clap::Parser;
use eframe::egui;
use log::{info, warn};
use mimalloc::MiMalloc;
use radar_loop::resolve_center;

use crate::app::RadarApp;
use crate::config::AppConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Animated weather radar on a slippy map.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Map center latitude (requires --lon)
    #[arg(long, allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Map center longitude (requires --lat)
    #[arg(long, allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Initial zoom level
    #[arg(long)]
    zoom: Option<u8>,

    /// Base URL of the host running the radar add-on
    #[arg(long)]
    base_url: Option<String>,

    /// Add-on slug of the radar service
    #[arg(long)]
    slug: Option<String>,

    /// Number of frames to animate
    #[arg(long)]
    frames: Option<usize>,

    /// Delay between frames in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Entity whose location the map follows
    #[arg(long)]
    entity: Option<String>,

    /// JSON snapshot of host entity states
    #[arg(long)]
    host_state: Option<PathBuf>,
}

impl Args {
    /// Command line values take precedence over the saved config.
    fn apply(self, config: &mut AppConfig) {
        let radar = &mut config.radar;
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            radar.latitude = Some(lat);
            radar.longitude = Some(lon);
        }
        if let Some(zoom) = self.zoom {
            radar.zoom = zoom;
        }
        if let Some(base_url) = self.base_url {
            radar.base_url = base_url;
        }
        if let Some(slug) = self.slug {
            radar.addon_slug = slug;
        }
        if let Some(frames) = self.frames {
            radar.frame_count = frames;
        }
        if let Some(interval_ms) = self.interval_ms {
            radar.animation_interval_ms = interval_ms;
        }
        if let Some(entity) = self.entity {
            radar.entity = Some(entity);
        }
        if let Some(path) = self.host_state {
            config.host_state_path = Some(path);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Starting WillyRadar Desktop...");

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    args.apply(&mut config);
    config.radar.validate()?;

    let runtime = tokio::runtime::Runtime::new()?;

    let host = config.host_state_path.as_deref().and_then(|path| {
        match runtime.block_on(host_state::load_host_state(path)) {
            Ok(host) => Some(host),
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    });
    let center = resolve_center(&config.radar, host.as_ref());
    info!("Radar service at {}", config.radar.service_root());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.window_width, config.window_height])
            .with_title("WillyRadar Desktop"),
        ..Default::default()
    };

    eframe::run_native(
        "WillyRadar Desktop",
        options,
        Box::new(move |cc| Ok(Box::new(RadarApp::new(cc, config, runtime, center)?))),
    )?;

    Ok(())
}

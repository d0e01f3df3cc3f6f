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

//! Host state file loading and watching.
//!
//! The host exports its entity states as JSON. On startup the snapshot
//! picks the initial map center; afterwards it is re-read periodically and
//! a move of the tracked entity (or the home zone) is forwarded to the
//! radar widget.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info, warn};
use radar_loop::{GeoPoint, HostState, RadarConfig, WidgetEvent};
use tokio::sync::{mpsc, watch};

/// Read and parse a host state snapshot.
pub async fn load_host_state(path: &Path) -> Result<HostState, String> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_host_state(&raw)
}

pub fn parse_host_state(raw: &str) -> Result<HostState, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid host state: {}", e))
}

/// Location the map follows: the configured entity, else the home zone.
#[must_use]
pub fn tracked_location(config: &RadarConfig, host: &HostState) -> Option<GeoPoint> {
    config
        .entity
        .as_deref()
        .and_then(|entity| host.location_of(entity))
        .or_else(|| host.home_location())
}

/// Re-read `path` every `period` and send [`WidgetEvent::HomeMoved`] when the
/// tracked location changes. The latest location is also published on `home`
/// for the UI. Exits once the widget stops accepting events.
pub async fn watch_host_state(
    path: PathBuf,
    config: RadarConfig,
    period: Duration,
    home: watch::Sender<GeoPoint>,
    events: mpsc::UnboundedSender<WidgetEvent>,
) {
    info!("Watching host state at {}", path.display());
    let mut last = Some(*home.borrow());
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // The first tick completes immediately and the initial state is already known
    interval.tick().await;

    loop {
        interval.tick().await;
        if events.is_closed() {
            break;
        }

        let host = match load_host_state(&path).await {
            Ok(host) => host,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        let location = tracked_location(&config, &host);
        if location.is_some() && location != last {
            debug!("Tracked location moved to {:?}", location);
            last = location;
            if let Some(point) = location {
                home.send_replace(point);
                if events.send(WidgetEvent::HomeMoved(point)).is_err() {
                    break;
                }
            }
        }
    }
    debug!("Host state watcher stopped");
}

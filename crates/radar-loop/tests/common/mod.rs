//! Test doubles for the map and the radar service.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use radar_loop::{
    Completion, FetchError, GeoBounds, GeoPoint, MapError, MapSurface, OverlayHandle,
    OverlayImage, RadarBackend, RadarConfig, RadarImage, RadarProduct, RadarWidget, Viewport,
};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::timeout;

pub const SYDNEY: GeoPoint = GeoPoint { lat: -33.8688, lon: 151.2093 };
pub const BRISBANE: GeoPoint = GeoPoint { lat: -27.4698, lon: 153.0251 };

pub const BOUNDS: GeoBounds = GeoBounds { south: -35.0, west: 150.0, north: -32.5, east: 152.5 };

/// Map operations in the order the engine issued them.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOp {
    Attach(u64, String),
    Detach(u64),
    SetView(GeoPoint, u8),
    Remove,
}

/// In-memory map that records every operation.
#[derive(Debug)]
pub struct RecordingMap {
    pub center: GeoPoint,
    pub zoom: u8,
    pub attached: Vec<(OverlayHandle, OverlayImage)>,
    pub ops: Vec<MapOp>,
    pub removed: bool,
    pub fail_attach: bool,
    next_id: u64,
}

impl RecordingMap {
    pub fn new(center: GeoPoint, zoom: u8) -> Self {
        Self {
            center,
            zoom,
            attached: Vec::new(),
            ops: Vec::new(),
            removed: false,
            fail_attach: false,
            next_id: 1,
        }
    }

    /// Number of attached overlays after each recorded operation.
    pub fn overlay_counts(&self) -> Vec<usize> {
        let mut count = 0usize;
        self.ops
            .iter()
            .filter_map(|op| match op {
                MapOp::Attach(..) => {
                    count += 1;
                    Some(count)
                }
                MapOp::Detach(_) => {
                    count -= 1;
                    Some(count)
                }
                _ => None,
            })
            .collect()
    }

    pub fn attach_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, MapOp::Attach(..))).count()
    }
}

impl MapSurface for RecordingMap {
    fn center(&self) -> GeoPoint {
        self.center
    }

    fn zoom(&self) -> u8 {
        self.zoom
    }

    fn set_view(&mut self, center: GeoPoint, zoom: u8) {
        self.center = center;
        self.zoom = zoom;
        self.ops.push(MapOp::SetView(center, zoom));
    }

    fn attach_overlay(&mut self, overlay: &OverlayImage) -> Result<OverlayHandle, MapError> {
        if self.removed {
            return Err(MapError::Removed);
        }
        if self.fail_attach {
            return Err(MapError::Decode("corrupt image".to_string()));
        }
        let handle = OverlayHandle(self.next_id);
        self.next_id += 1;
        self.attached.push((handle, overlay.clone()));
        self.ops.push(MapOp::Attach(handle.0, overlay.timestamp.clone()));
        Ok(handle)
    }

    fn detach_overlay(&mut self, handle: OverlayHandle) {
        if let Some(pos) = self.attached.iter().position(|(h, _)| *h == handle) {
            self.attached.remove(pos);
            self.ops.push(MapOp::Detach(handle.0));
        }
    }

    fn remove(&mut self) {
        self.removed = true;
        self.ops.push(MapOp::Remove);
    }
}

fn lat_key(lat: f64) -> i64 {
    (lat * 1000.0).round() as i64
}

/// Radar service double with per-request gates and scripted failures.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    frames: Mutex<Vec<String>>,
    frames_by_lat: Mutex<HashMap<i64, Vec<String>>>,
    timestamp_status: Mutex<Option<u16>>,
    timestamp_gates: Mutex<HashMap<i64, Arc<Semaphore>>>,
    image_gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    bad_bounds: Mutex<HashSet<String>>,
    pub timestamp_calls: Mutex<Vec<(Viewport, RadarProduct)>>,
    pub image_calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn with_frames(frames: &[&str]) -> Arc<Self> {
        let backend = Self::default();
        *backend.frames.lock().unwrap() = frames.iter().map(ToString::to_string).collect();
        Arc::new(backend)
    }

    pub fn set_frames_at(&self, center: GeoPoint, frames: &[&str]) {
        self.frames_by_lat
            .lock()
            .unwrap()
            .insert(lat_key(center.lat), frames.iter().map(ToString::to_string).collect());
    }

    pub fn fail_timestamps(&self, status: Option<u16>) {
        *self.timestamp_status.lock().unwrap() = status;
    }

    /// Hold timestamp requests for `center` until [`release`](Self::release_timestamps).
    pub fn gate_timestamps(&self, center: GeoPoint) {
        self.timestamp_gates
            .lock()
            .unwrap()
            .insert(lat_key(center.lat), Arc::new(Semaphore::new(0)));
    }

    pub fn release_timestamps(&self, center: GeoPoint) {
        if let Some(gate) = self.timestamp_gates.lock().unwrap().get(&lat_key(center.lat)) {
            gate.add_permits(1);
        }
    }

    pub fn gate_image(&self, timestamp: &str) {
        self.image_gates
            .lock()
            .unwrap()
            .insert(timestamp.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release_image(&self, timestamp: &str) {
        if let Some(gate) = self.image_gates.lock().unwrap().get(timestamp) {
            gate.add_permits(1);
        }
    }

    pub fn drop_bounds_for(&self, timestamp: &str) {
        self.bad_bounds.lock().unwrap().insert(timestamp.to_string());
    }

    pub fn timestamp_call_count(&self) -> usize {
        self.timestamp_calls.lock().unwrap().len()
    }

    pub fn image_call_count(&self) -> usize {
        self.image_calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RadarBackend for ScriptedBackend {
    async fn timestamps(
        &self,
        viewport: &Viewport,
        product: RadarProduct,
    ) -> Result<Vec<String>, FetchError> {
        self.timestamp_calls.lock().unwrap().push((*viewport, product));
        let key = lat_key(viewport.center.lat);

        let gate = self.timestamp_gates.lock().unwrap().get(&key).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if let Some(status) = *self.timestamp_status.lock().unwrap() {
            return Err(FetchError::Status(status));
        }
        let scripted = self.frames_by_lat.lock().unwrap().get(&key).cloned();
        Ok(scripted.unwrap_or_else(|| self.frames.lock().unwrap().clone()))
    }

    async fn radar_image(
        &self,
        _viewport: &Viewport,
        timestamp: &str,
    ) -> Result<(RadarImage, GeoBounds), FetchError> {
        self.image_calls.lock().unwrap().push(timestamp.to_string());

        let gate = self.image_gates.lock().unwrap().get(timestamp).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        if self.bad_bounds.lock().unwrap().contains(timestamp) {
            return Err(FetchError::MalformedBounds("X-Radar-Bounds-South"));
        }
        let image = RadarImage {
            bytes: timestamp.as_bytes().to_vec(),
            content_type: Some("image/png".to_string()),
        };
        Ok((image, BOUNDS))
    }
}

pub type TestWidget = RadarWidget<RecordingMap>;

pub fn widget(
    backend: &Arc<ScriptedBackend>,
    config: RadarConfig,
) -> (TestWidget, mpsc::UnboundedReceiver<Completion>) {
    let zoom = config.zoom;
    RadarWidget::new(config, RecordingMap::new(SYDNEY, zoom), backend.clone())
}

/// Apply completions until the widget goes quiet.
pub async fn pump(widget: &mut TestWidget, completions: &mut mpsc::UnboundedReceiver<Completion>) {
    while let Ok(Some(completion)) = timeout(Duration::from_millis(50), completions.recv()).await {
        widget.apply(completion);
    }
}

pub fn displayed(widget: &TestWidget) -> Option<String> {
    widget.live_overlay().map(|overlay| overlay.timestamp.clone())
}

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

//! Client for the radar image service.
//!
//! The service exposes two endpoints behind the host's ingress proxy:
//!
//! ```text
//! GET /api/timestamps?lat=<f64>&lng=<f64>&zoom=<u8>&type=radar|regional-radar
//! GET /api/radar?lat=<f64>&lng=<f64>&zoom=<u8>&timestamp=<id>
//! ```
//!
//! The first returns a JSON array of frame identifiers (oldest first). The
//! second returns the image body with its authoritative geographic bounds in
//! `X-Radar-Bounds-{South,West,North,East}` headers.

use async_trait::async_trait;
use log::debug;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};

use crate::config::RadarConfig;
use crate::error::FetchError;
use crate::overlay::{GeoBounds, RadarImage};
use crate::viewport::{RadarProduct, Viewport};

/// Operations the engine needs from the radar service.
#[async_trait]
pub trait RadarBackend: Send + Sync {
    /// Frame identifiers available for a viewport, oldest first.
    async fn timestamps(
        &self,
        viewport: &Viewport,
        product: RadarProduct,
    ) -> Result<Vec<String>, FetchError>;

    /// Radar image for one frame, with its bounds.
    async fn radar_image(
        &self,
        viewport: &Viewport,
        timestamp: &str,
    ) -> Result<(RadarImage, GeoBounds), FetchError>;
}

/// [`RadarBackend`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    root: String,
}

impl HttpBackend {
    pub fn new(config: &RadarConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self::with_client(client, config.service_root()))
    }

    /// Use a preconfigured client against an explicit service root.
    #[must_use]
    pub fn with_client(client: Client, root: impl Into<String>) -> Self {
        Self { client, root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &str {
        &self.root
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.root.trim_end_matches('/'), path)
    }

    fn viewport_query(viewport: &Viewport) -> [(&'static str, String); 3] {
        [
            ("lat", viewport.center.lat.to_string()),
            ("lng", viewport.center.lon.to_string()),
            ("zoom", viewport.zoom.to_string()),
        ]
    }

    fn check_status(response: Response) -> Result<Response, FetchError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(FetchError::Status(status.as_u16()))
        }
    }
}

#[async_trait]
impl RadarBackend for HttpBackend {
    async fn timestamps(
        &self,
        viewport: &Viewport,
        product: RadarProduct,
    ) -> Result<Vec<String>, FetchError> {
        let url = self.endpoint("/api/timestamps");
        debug!("GET {} ({}, {:?})", url, product.as_str(), viewport);

        let response = self
            .client
            .get(&url)
            .query(&Self::viewport_query(viewport))
            .query(&[("type", product.as_str())])
            .send()
            .await?;
        let body = Self::check_status(response)?.text().await?;

        serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    async fn radar_image(
        &self,
        viewport: &Viewport,
        timestamp: &str,
    ) -> Result<(RadarImage, GeoBounds), FetchError> {
        let url = self.endpoint("/api/radar");
        debug!("GET {} (timestamp {})", url, timestamp);

        let response = self
            .client
            .get(&url)
            .query(&Self::viewport_query(viewport))
            .query(&[("timestamp", timestamp)])
            .send()
            .await?;
        let response = Self::check_status(response)?;

        let headers = response.headers();
        let bounds = GeoBounds::from_headers(|name| {
            headers.get(name).and_then(|value| value.to_str().ok())
        })?;
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string);

        let bytes = response.bytes().await?.to_vec();
        Ok((RadarImage { bytes, content_type }, bounds))
    }
}

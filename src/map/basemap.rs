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

//! Basemap tile sources.

use std::path::PathBuf;

use lazy_static::lazy_static;
use radar_loop::Loader;
use serde::{Deserialize, Serialize};
use walkers::sources::{Attribution, TileSource};
use walkers::TileId;

lazy_static! {
    static ref TILE_CACHE: Loader<PathBuf> = Loader::new();
}

/// Available basemap styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BasemapStyle {
    #[default]
    OpenStreetMap,
    CartoDark,
}

impl BasemapStyle {
    /// Cache directory name
    pub fn as_str(&self) -> &'static str {
        match self {
            BasemapStyle::OpenStreetMap => "osm",
            BasemapStyle::CartoDark => "carto_dark",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BasemapStyle::OpenStreetMap => "OpenStreetMap",
            BasemapStyle::CartoDark => "Carto Dark",
        }
    }
}

/// Tile source for the configured basemap style
#[derive(Debug, Clone, Copy)]
pub struct BasemapSource {
    style: BasemapStyle,
}

impl BasemapSource {
    pub fn new(style: BasemapStyle) -> Self {
        Self { style }
    }
}

impl TileSource for BasemapSource {
    fn tile_url(&self, tile_id: TileId) -> String {
        match self.style {
            BasemapStyle::OpenStreetMap => format!(
                "https://tile.openstreetmap.org/{}/{}/{}.png",
                tile_id.zoom, tile_id.x, tile_id.y
            ),
            BasemapStyle::CartoDark => {
                // Subdomain load balancing (a, b, c, d) based on tile coordinates
                let subdomain = ['a', 'b', 'c', 'd'][((tile_id.x + tile_id.y) % 4) as usize];
                format!(
                    "https://{}.basemaps.cartocdn.com/dark_all/{}/{}/{}.png",
                    subdomain, tile_id.zoom, tile_id.x, tile_id.y
                )
            }
        }
    }

    fn attribution(&self) -> Attribution {
        match self.style {
            BasemapStyle::OpenStreetMap => Attribution {
                text: "© OpenStreetMap contributors",
                url: "https://www.openstreetmap.org/copyright",
                logo_light: None,
                logo_dark: None,
            },
            BasemapStyle::CartoDark => Attribution {
                text: "© OpenStreetMap contributors, © CARTO",
                url: "https://carto.com/attributions",
                logo_light: None,
                logo_dark: None,
            },
        }
    }
}

/// Tile cache directory for a style, created on first use.
pub async fn tile_cache_dir(style: BasemapStyle) -> std::io::Result<PathBuf> {
    let root = TILE_CACHE
        .ensure_loaded(|| async {
            let dir = dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("willyradar-desktop")
                .join("tiles");
            tokio::fs::create_dir_all(&dir).await?;
            Ok::<_, std::io::Error>(dir)
        })
        .await?;

    let dir = root.join(style.as_str());
    tokio::fs::create_dir_all(&dir).await?;
    Ok(dir)
}

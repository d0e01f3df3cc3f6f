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

//! Error types shared by the radar layers.

use thiserror::Error;

/// Errors produced while fetching timestamps or radar imagery.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request was superseded by a newer one of the same kind.
    #[error("request superseded")]
    Cancelled,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("radar service returned HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    /// One of the four `X-Radar-Bounds-*` headers was absent or not a number.
    #[error("missing or invalid bounds header: {0}")]
    MalformedBounds(&'static str),
}

impl FetchError {
    /// Cancelled requests are not failures and are never surfaced to the host.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::Status(status.as_u16())
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Errors raised while building or validating widget configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The host supplied no configuration at all. Fatal at construction.
    #[error("invalid configuration: none supplied")]
    Missing,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors reported by the mapping component.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("map has been removed")]
    Removed,

    #[error("failed to decode overlay image: {0}")]
    Decode(String),
}

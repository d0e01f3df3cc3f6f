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

//! Frame sets and the active frame cursor.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Ordered, size-capped list of radar frame identifiers (oldest first).
///
/// An empty set means "no data"; a non-empty set only exists after a
/// successful timestamp fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<String>,
}

impl FrameSet {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Keep only the most recent `frame_count` identifiers from a full backend result.
    #[must_use]
    pub fn trimmed(mut all: Vec<String>, frame_count: usize) -> Self {
        if all.len() > frame_count {
            all.drain(..all.len() - frame_count);
        }
        Self { frames: all }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.frames.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.frames
    }
}

/// Active frame index. Wraps modulo `min(frame_count, len(set))`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameCursor {
    index: usize,
}

impl FrameCursor {
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Step forward one frame. Returns the new index, or `None` for an empty set.
    pub fn advance(&mut self, set: &FrameSet, frame_count: usize) -> Option<usize> {
        let cycle = cycle_len(set, frame_count)?;
        self.index = (self.index + 1) % cycle;
        Some(self.index)
    }

    /// Step back one frame, wrapping to the last frame of the cycle.
    pub fn retreat(&mut self, set: &FrameSet, frame_count: usize) -> Option<usize> {
        let cycle = cycle_len(set, frame_count)?;
        self.index = (self.index % cycle + cycle - 1) % cycle;
        Some(self.index)
    }

    /// Identifier under the cursor, if the set has one at this index.
    #[must_use]
    pub fn current<'a>(&self, set: &'a FrameSet) -> Option<&'a str> {
        set.get(self.index)
    }
}

fn cycle_len(set: &FrameSet, frame_count: usize) -> Option<usize> {
    let cycle = frame_count.max(1).min(set.len());
    (cycle > 0).then_some(cycle)
}

/// Render a frame identifier as a short local clock label, e.g. `02:35 pm`.
#[must_use]
pub fn format_timestamp(raw: &str) -> String {
    format_timestamp_in(raw, &Local)
}

/// Same as [`format_timestamp`] but converting zoned identifiers into `tz`.
///
/// Identifiers without an offset are taken to already be wall-clock time.
/// Anything unparseable is returned unchanged.
#[must_use]
pub fn format_timestamp_in<Tz>(raw: &str, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    const LABEL: &str = "%I:%M %P";

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(tz).format(LABEL).to_string();
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map_or_else(|| raw.to_string(), |naive| naive.format(LABEL).to_string())
}

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

//! Visibility gate combining viewport intersection and foreground state.

/// One of the two independent visibility inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilitySignal {
    /// Whether the widget intersects the visible area of its container.
    Viewport(bool),
    /// Whether the hosting window/tab is in the foreground.
    Foreground(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityState {
    pub in_viewport: bool,
    pub tab_foreground: bool,
}

impl VisibilityState {
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.in_viewport && self.tab_foreground
    }
}

impl Default for VisibilityState {
    /// A freshly mounted widget is assumed on screen until told otherwise.
    fn default() -> Self {
        Self { in_viewport: true, tab_foreground: true }
    }
}

/// Change in overall visibility caused by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    BecameVisible,
    BecameHidden,
    Unchanged,
}

#[derive(Debug, Default)]
pub struct VisibilityGate {
    state: VisibilityState,
}

impl VisibilityGate {
    #[must_use]
    pub fn new(state: VisibilityState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> VisibilityState {
        self.state
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.is_visible()
    }

    pub fn update(&mut self, signal: VisibilitySignal) -> Transition {
        let before = self.state.is_visible();
        match signal {
            VisibilitySignal::Viewport(v) => self.state.in_viewport = v,
            VisibilitySignal::Foreground(v) => self.state.tab_foreground = v,
        }
        match (before, self.state.is_visible()) {
            (false, true) => Transition::BecameVisible,
            (true, false) => Transition::BecameHidden,
            _ => Transition::Unchanged,
        }
    }
}

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

//! Async driver that runs a [`RadarWidget`] on tokio.
//!
//! The driver task owns the widget and is the only place its state changes.
//! Host events, fetch completions and timer ticks are multiplexed with
//! `tokio::select!` and handled strictly one after another.

use std::time::Duration;

use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::engine::{Completion, RadarWidget, WidgetEvent, WidgetStatus};
use crate::map::MapSurface;

/// Handle to a widget running in a background task.
///
/// Dropping the handle disposes the widget.
pub struct WidgetHandle {
    event_tx: mpsc::UnboundedSender<WidgetEvent>,
    status_rx: watch::Receiver<WidgetStatus>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for WidgetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WidgetHandle")
            .field("cancel_token", &self.cancel_token)
            .finish_non_exhaustive()
    }
}

impl WidgetHandle {
    /// Spawn the driver loop. The first load is issued after the configured
    /// settle delay so the host map has time to lay itself out.
    #[must_use]
    pub fn spawn<M>(widget: RadarWidget<M>, completions: mpsc::UnboundedReceiver<Completion>) -> Self
    where
        M: MapSurface + Send + 'static,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(widget.status());
        let cancel_token = CancellationToken::new();
        let settle_delay = widget.config().settle_delay();

        tokio::spawn(drive(
            widget,
            completions,
            event_rx,
            status_tx,
            cancel_token.clone(),
            settle_delay,
        ));

        Self { event_tx, status_rx, cancel_token }
    }

    /// Queue an event for the widget. Returns `false` once the widget is gone.
    pub fn send(&self, event: WidgetEvent) -> bool {
        self.event_tx.send(event).is_ok()
    }

    /// Sender for producers that outlive a borrow of the handle, such as
    /// background watchers. Sends fail once the widget is gone.
    #[must_use]
    pub fn event_sender(&self) -> mpsc::UnboundedSender<WidgetEvent> {
        self.event_tx.clone()
    }

    /// Latest status snapshot.
    #[must_use]
    pub fn status(&self) -> WidgetStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified whenever the status changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WidgetStatus> {
        self.status_rx.clone()
    }

    /// Dispose the widget: cancel fetches, stop timers and release the map.
    pub fn dispose(&self) {
        self.cancel_token.cancel();
    }
}

impl Drop for WidgetHandle {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

async fn drive<M: MapSurface>(
    mut widget: RadarWidget<M>,
    mut completions: mpsc::UnboundedReceiver<Completion>,
    mut events: mpsc::UnboundedReceiver<WidgetEvent>,
    status_tx: watch::Sender<WidgetStatus>,
    cancel_token: CancellationToken,
    settle_delay: Duration,
) {
    tokio::select! {
        () = sleep(settle_delay) => {}
        () = cancel_token.cancelled() => {
            widget.handle(WidgetEvent::Dispose);
            status_tx.send_replace(widget.status());
            return;
        }
    }

    widget.handle(WidgetEvent::Load);
    status_tx.send_replace(widget.status());

    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                widget.handle(WidgetEvent::Dispose);
                break;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Widget handle dropped");
                    widget.handle(WidgetEvent::Dispose);
                    break;
                };
                let disposing = event == WidgetEvent::Dispose;
                widget.handle(event);
                if disposing {
                    break;
                }
            }

            Some(completion) = completions.recv() => {
                widget.apply(completion);
            }

            event = widget.next_timer_event() => {
                widget.handle(event);
            }
        }

        status_tx.send_replace(widget.status());
    }

    status_tx.send_replace(widget.status());
    info!("Radar widget driver stopped");
}

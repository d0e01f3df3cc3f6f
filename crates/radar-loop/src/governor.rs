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

//! Supersede-not-queue request governor.
//!
//! Each request category (timestamps, overlay) owns one [`RequestSlot`].
//! Starting a request cancels whatever the slot held before, and a completion
//! is only applied if its ticket is still the slot's current one.

use std::future::Future;

use log::debug;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// Identity and cancellation handle of one issued request.
#[derive(Debug, Clone)]
pub struct Ticket {
    epoch: u64,
    token: CancellationToken,
}

impl Ticket {
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Holds at most one outstanding request of a single category.
#[derive(Debug)]
pub struct RequestSlot {
    name: &'static str,
    epoch: u64,
    current: Option<Ticket>,
}

impl RequestSlot {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { name, epoch: 0, current: None }
    }

    /// Cancel any outstanding request and issue a ticket for a new one.
    pub fn begin(&mut self) -> Ticket {
        self.cancel();
        self.epoch += 1;
        let ticket = Ticket { epoch: self.epoch, token: CancellationToken::new() };
        self.current = Some(ticket.clone());
        ticket
    }

    /// True if `ticket` belongs to the outstanding request and was not cancelled.
    #[must_use]
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        !ticket.is_cancelled()
            && self.current.as_ref().is_some_and(|cur| cur.epoch == ticket.epoch)
    }

    /// Mark the request as complete. Stale tickets leave the slot alone.
    pub fn finish(&mut self, ticket: &Ticket) {
        if self.is_current(ticket) {
            self.current = None;
        }
    }

    /// Ticket of the outstanding request.
    #[must_use]
    pub fn current(&self) -> Option<&Ticket> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.current.is_some()
    }

    /// Cancel the outstanding request, if any. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if let Some(previous) = self.current.take() {
            debug!("Superseding {} request #{}", self.name, previous.epoch);
            previous.token.cancel();
        }
    }
}

/// Run `fut` until it finishes or `ticket` is cancelled, whichever comes first.
pub async fn run_cancellable<T, F>(ticket: &Ticket, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    tokio::select! {
        biased;
        () = ticket.token.cancelled() => Err(FetchError::Cancelled),
        result = fut => result,
    }
}

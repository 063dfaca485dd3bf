//! Per-channel search state.
//!
//! Each search channel (augmented, baseline) is one [`Channel`]: a tagged
//! [`ChannelState`] plus a monotonically increasing generation counter.
//!
//! ```text
//!              begin()            settle(Ok)
//! NotStarted ──────────▶ Searching ──────────▶ Ready(T)
//!      ▲                   │    ▲                 │
//!      │ reset()           │    └── begin() ──────┤
//!      │                   ▼ settle(Err)          │
//!      └─────────────── Failed(msg) ◀─────────────┘
//! ```
//!
//! `begin()` hands out a [`Ticket`] carrying the generation at issue time.
//! A response is applied only if its ticket still matches, so a slow
//! response to an older submission can never overwrite a newer one.

use std::mem;

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelState<T> {
    NotStarted,
    /// A call is in flight. `previous` is the last successful result, kept
    /// visible until the new one lands.
    Searching { previous: Option<T> },
    Ready(T),
    Failed(String),
}

impl<T> Default for ChannelState<T> {
    fn default() -> Self {
        ChannelState::NotStarted
    }
}

impl<T> ChannelState<T> {
    /// Transition into `Searching`, carrying over whatever result is visible.
    /// Any error is dropped.
    pub fn searching(self) -> Self {
        let previous = match self {
            ChannelState::Ready(result) => Some(result),
            ChannelState::Searching { previous } => previous,
            ChannelState::NotStarted | ChannelState::Failed(_) => None,
        };
        ChannelState::Searching { previous }
    }

    /// Apply a call outcome. Success replaces the result wholesale; failure
    /// discards any stale result.
    pub fn settled(self, outcome: Result<T, String>) -> Self {
        match outcome {
            Ok(result) => ChannelState::Ready(result),
            Err(message) => ChannelState::Failed(message),
        }
    }

    pub fn is_searching(&self) -> bool {
        matches!(self, ChannelState::Searching { .. })
    }

    pub fn is_not_started(&self) -> bool {
        matches!(self, ChannelState::NotStarted)
    }

    /// The settled result, if the last call succeeded.
    pub fn result(&self) -> Option<&T> {
        match self {
            ChannelState::Ready(result) => Some(result),
            _ => None,
        }
    }

    /// The result to render: the settled one, or the previous one while searching.
    pub fn visible(&self) -> Option<&T> {
        match self {
            ChannelState::Ready(result) => Some(result),
            ChannelState::Searching { previous } => previous.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ChannelState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Generation captured when a call is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel<T> {
    generation: u64,
    state: ChannelState<T>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            state: ChannelState::NotStarted,
        }
    }
}

impl<T> Channel<T> {
    pub fn state(&self) -> &ChannelState<T> {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// Start a new call, invalidating every ticket issued before it.
    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        let state = mem::take(&mut self.state);
        self.state = state.searching();
        Ticket(self.generation)
    }

    /// Apply `outcome` if `ticket` is still current. Returns whether it was applied.
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<T, String>) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        let state = mem::take(&mut self.state);
        self.state = state.settled(outcome);
        true
    }

    /// Clear back to `NotStarted` and invalidate any call still in flight.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = ChannelState::NotStarted;
    }
}

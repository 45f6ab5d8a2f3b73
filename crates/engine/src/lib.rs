use now_listening_core::NowPlayingResponse;
use serde::Serialize;

mod fetch;
mod poller;
mod view;

pub use fetch::{FetchError, HttpNowPlayingSource};
pub use poller::{CancelFlag, NowPlayingSource, Poller, DEFAULT_REFRESH_INTERVAL};
pub use view::{
    render, Artwork, StatusView, TrackCard, View, ALBUM_SEPARATOR, LAST_LISTENED_LABEL,
    NOW_LISTENING_LABEL,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PollState {
    Loading,
    Loaded(NowPlayingResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PollTicket(u64);

impl PollTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleOutcome {
    Applied,
    /// A newer poll already landed; this result was dropped.
    Stale,
}

/// Client-side poll state machine.
///
/// Every poll takes a ticket before it starts. A settled result replaces the
/// held payload only when its ticket is newer than the last applied one, so a
/// slow poll can never overwrite a faster, later one.
#[derive(Debug)]
pub struct PollEngine {
    state: PollState,
    next_seq: u64,
    last_applied: Option<PollTicket>,
}

impl Default for PollEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PollEngine {
    pub fn new() -> Self {
        Self {
            state: PollState::Loading,
            next_seq: 0,
            last_applied: None,
        }
    }

    pub fn begin(&mut self) -> PollTicket {
        self.next_seq += 1;
        PollTicket(self.next_seq)
    }

    pub fn settle(&mut self, ticket: PollTicket, response: NowPlayingResponse) -> SettleOutcome {
        if self.last_applied.is_some_and(|last| ticket <= last) {
            return SettleOutcome::Stale;
        }
        self.last_applied = Some(ticket);
        self.state = PollState::Loaded(response);
        SettleOutcome::Applied
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn view(&self) -> View {
        render(&self.state)
    }
}

// Change notifications for draft viewers.
//
// Delivery is best effort: receivers can lag and drop events, so a viewer
// treats an event as a hint to re-fetch state rather than as the state.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::draft::pick::DraftPick;
use crate::draft::roster::LeagueId;
use crate::draft::state::DraftState;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DraftEvent {
    Started { league: LeagueId, state: DraftState },
    PickMade { league: LeagueId, pick: DraftPick, state: DraftState },
    Completed { league: LeagueId },
}

impl DraftEvent {
    pub fn league(&self) -> &LeagueId {
        match self {
            DraftEvent::Started { league, .. }
            | DraftEvent::PickMade { league, .. }
            | DraftEvent::Completed { league } => league,
        }
    }
}

pub struct DraftEvents {
    sender: broadcast::Sender<DraftEvent>,
}

impl DraftEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish to current subscribers. Having none is fine.
    pub fn publish(&self, event: DraftEvent) {
        if self.sender.send(event).is_err() {
            trace!("No draft event subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DraftEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for DraftEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

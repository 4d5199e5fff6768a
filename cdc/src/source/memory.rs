use std::collections::VecDeque;

use crate::bail;
use crate::error::{CdcResult, ErrorKind};
use crate::source::MutationFeed;
use crate::types::BufferedEvent;

/// What the feed does once its queued events are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExhaustionBehavior {
    /// Report end of stream.
    End,
    /// Park forever, as a live feed with no traffic would.
    Hold,
}

/// In-memory feed for testing and development purposes.
///
/// [`MemoryMutationFeed`] replays a queued sequence of events. Once the queue
/// is exhausted it either reports [`ErrorKind::StreamEnded`] (the default) or
/// parks forever, so that shutdown paths can be exercised against a feed that
/// never terminates on its own.
#[derive(Debug)]
pub struct MemoryMutationFeed {
    events: VecDeque<BufferedEvent>,
    exhaustion: ExhaustionBehavior,
}

impl MemoryMutationFeed {
    /// Creates a feed that replays `events` and then reports end of stream.
    pub fn from_events(events: Vec<BufferedEvent>) -> Self {
        Self {
            events: events.into(),
            exhaustion: ExhaustionBehavior::End,
        }
    }

    /// Creates a feed that replays `events` and then parks forever.
    pub fn open_ended(events: Vec<BufferedEvent>) -> Self {
        Self {
            events: events.into(),
            exhaustion: ExhaustionBehavior::Hold,
        }
    }
}

impl MutationFeed for MemoryMutationFeed {
    async fn pull_event(&mut self) -> CdcResult<BufferedEvent> {
        match self.events.pop_front() {
            Some(event) => Ok(event),
            None => match self.exhaustion {
                ExhaustionBehavior::End => bail!(
                    ErrorKind::StreamEnded,
                    "Memory feed has replayed all queued events"
                ),
                ExhaustionBehavior::Hold => std::future::pending().await,
            },
        }
    }
}

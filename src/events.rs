//! Cross-view refresh signalling
//!
//! Views that show proposals subscribe to a [`RefreshBus`] and reload when
//! another view reports a change, e.g. after a vote lands on chain.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

use crate::types::{ProposalCategory, Vote};

/// Default event channel capacity
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Events published on the refresh bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DashboardEvent {
    /// Proposal tables should reload; `None` means every category
    RefreshProposals { category: Option<ProposalCategory> },
    /// A vote was observed on chain
    VoteRecorded { proposal_id: u64, vote: Vote },
    /// Roles or thresholds may have changed
    PolicyChanged,
}

impl DashboardEvent {
    /// Whether a table showing `category` should reload on this event
    pub fn affects(&self, category: ProposalCategory) -> bool {
        match self {
            DashboardEvent::RefreshProposals { category: None } => true,
            DashboardEvent::RefreshProposals { category: Some(c) } => *c == category,
            DashboardEvent::VoteRecorded { .. } | DashboardEvent::PolicyChanged => true,
        }
    }
}

/// Broadcast channel for [`DashboardEvent`]s
#[derive(Debug, Clone)]
pub struct RefreshBus {
    sender: broadcast::Sender<DashboardEvent>,
}

impl RefreshBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: DashboardEvent) -> usize {
        trace!(?event, "publishing dashboard event");
        // No subscribers is not an error
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RefreshBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let bus = RefreshBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        let event = DashboardEvent::VoteRecorded {
            proposal_id: 4,
            vote: Vote::Approve,
        };
        assert_eq!(bus.publish(event.clone()), 2);
        assert_eq!(first.recv().await.unwrap(), event);
        assert_eq!(second.recv().await.unwrap(), event);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = RefreshBus::new();
        assert_eq!(bus.publish(DashboardEvent::PolicyChanged), 0);
    }

    #[test]
    fn test_event_scope() {
        let payments = DashboardEvent::RefreshProposals {
            category: Some(ProposalCategory::Payments),
        };
        assert!(payments.affects(ProposalCategory::Payments));
        assert!(!payments.affects(ProposalCategory::Lockup));
        assert!(DashboardEvent::RefreshProposals { category: None }.affects(ProposalCategory::Lockup));
    }
}

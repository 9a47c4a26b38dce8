use crate::reward::PassTier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What presentation subscribers get told about
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum PassSignal {
    /// Points or the set of claimable rewards moved
    ProgressChanged { points_acquired: u64, unclaimed_rewards: usize },
    TierChanged { from: PassTier, to: PassTier },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&PassSignal)>;

/// Synchronous fan-out to subscribers, called in subscription order
#[derive(Default)]
pub struct SignalHub {
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_id: u64,
}

impl fmt::Debug for SignalHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalHub").field("subscribers", &self.subscribers.len()).finish()
    }
}

impl SignalHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, subscriber: F) -> SubscriptionId
    where
        F: FnMut(&PassSignal) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(subscriber)));
        id
    }

    /// Returns false when the id was not subscribed
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub fn emit(&mut self, signal: PassSignal) {
        for (_, subscriber) in self.subscribers.iter_mut() {
            subscriber(&signal);
        }
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

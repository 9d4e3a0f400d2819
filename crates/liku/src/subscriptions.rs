//! Per-connection topic subscriptions, per spec.md §4.10: a connection
//! chooses which event topics to receive; `*` subscribes to everything and
//! `state` is always implicit.

use std::collections::HashSet;

pub const WILDCARD: &str = "*";
pub const IMPLICIT_STATE_TOPIC: &str = "state";

#[derive(Debug, Clone, Default)]
pub struct SubscriptionSet {
    topics: HashSet<String>,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: impl Into<String>) {
        self.topics.insert(topic.into());
    }

    pub fn unsubscribe(&mut self, topic: &str) {
        self.topics.remove(topic);
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        topic == IMPLICIT_STATE_TOPIC || self.topics.contains(WILDCARD) || self.topics.contains(topic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_topic_is_always_implicit() {
        let subs = SubscriptionSet::new();
        assert!(subs.is_subscribed(IMPLICIT_STATE_TOPIC));
    }

    #[test]
    fn test_wildcard_matches_any_topic() {
        let mut subs = SubscriptionSet::new();
        subs.subscribe(WILDCARD);
        assert!(subs.is_subscribed("chat"));
        assert!(subs.is_subscribed("anything"));
    }

    #[test]
    fn test_unsubscribed_topic_is_not_matched() {
        let subs = SubscriptionSet::new();
        assert!(!subs.is_subscribed("chat"));
    }

    #[test]
    fn test_unsubscribe_removes_a_prior_subscription() {
        let mut subs = SubscriptionSet::new();
        subs.subscribe("chat");
        subs.unsubscribe("chat");
        assert!(!subs.is_subscribed("chat"));
    }
}

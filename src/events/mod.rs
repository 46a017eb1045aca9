//! Topic-based subscription engine and fan-out (§4.6, C6).
//!
//! Grounded on `ipc::event::EventBroadcaster`'s broadcast-channel shape,
//! but replaced with a targeted per-subscriber index: the teacher
//! broadcasts every event to every connected client, while this spec
//! requires topic- and filter-scoped delivery. Two indices
//! (`subs_by_client`, `subs_by_topic`) live under one `RwLock` so they can
//! never be updated out of step with each other.

pub mod topics;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::gateway::manager::{OutboundFrame, SessionManager};
use crate::rpc::codec::EventNotification;
pub use topics::Topic;

/// Per-client subscription record. A subsequent `subscribe_events` call
/// for the same client replaces this record wholesale (§3: "Replace or
/// create the client's record and update both indices").
#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    pub topics: HashSet<Topic>,
    pub filters: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub last_matched: Option<DateTime<Utc>>,
}

struct EngineState {
    subs_by_client: HashMap<String, SubscriptionRecord>,
    subs_by_topic: HashMap<Topic, HashSet<String>>,
}

pub struct EventEngine {
    state: RwLock<EngineState>,
}

impl EventEngine {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState {
                subs_by_client: HashMap::new(),
                subs_by_topic: HashMap::new(),
            }),
        }
    }

    /// Replace (or create) a client's subscription record.
    pub async fn subscribe(
        &self,
        client_id: &str,
        topics: HashSet<Topic>,
        filters: HashMap<String, Value>,
    ) {
        let mut state = self.state.write().await;
        if let Some(prev) = state.subs_by_client.remove(client_id) {
            for topic in prev.topics {
                if let Some(set) = state.subs_by_topic.get_mut(&topic) {
                    set.remove(client_id);
                }
            }
        }
        for topic in &topics {
            state
                .subs_by_topic
                .entry(*topic)
                .or_default()
                .insert(client_id.to_string());
        }
        state.subs_by_client.insert(
            client_id.to_string(),
            SubscriptionRecord {
                topics,
                filters,
                created_at: Utc::now(),
                last_matched: None,
            },
        );
    }

    /// Remove a subset of topics (or all topics, when `topics` is empty)
    /// from a client's subscription.
    pub async fn unsubscribe(&self, client_id: &str, topics: &HashSet<Topic>) {
        let mut state = self.state.write().await;
        let remove_all = topics.is_empty();
        let Some(record) = state.subs_by_client.get_mut(client_id) else {
            return;
        };
        let to_remove: Vec<Topic> = if remove_all {
            record.topics.iter().copied().collect()
        } else {
            topics.iter().copied().collect()
        };
        for topic in &to_remove {
            record.topics.remove(topic);
            if let Some(set) = state.subs_by_topic.get_mut(topic) {
                set.remove(client_id);
            }
        }
        if record.topics.is_empty() {
            state.subs_by_client.remove(client_id);
        }
    }

    /// Drop a client's subscription entirely — called from connection
    /// teardown (§4.2 step 2).
    pub async fn remove_client(&self, client_id: &str) {
        let mut state = self.state.write().await;
        if let Some(record) = state.subs_by_client.remove(client_id) {
            for topic in record.topics {
                if let Some(set) = state.subs_by_topic.get_mut(&topic) {
                    set.remove(client_id);
                }
            }
        }
    }

    /// Publish an event to every matching, authenticated, currently
    /// connected subscriber. Returns the number of sessions the event was
    /// actually delivered to.
    ///
    /// Scalar-equality filter matching only (§3): a filter key whose
    /// payload value is an object or array never matches and is logged.
    pub async fn publish(&self, topic: Topic, payload: Value, sessions: &SessionManager) -> usize {
        let client_ids: Vec<String> = {
            let state = self.state.read().await;
            state
                .subs_by_topic
                .get(&topic)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        };

        let mut delivered = 0usize;
        for client_id in client_ids {
            let matches = {
                let state = self.state.read().await;
                match state.subs_by_client.get(&client_id) {
                    Some(record) => filters_match(&record.filters, &payload),
                    None => false,
                }
            };
            if !matches {
                continue;
            }
            if !sessions.is_authenticated(&client_id).await {
                warn!(client_id, topic = %topic, "dropping event for unauthenticated session");
                continue;
            }
            let notification = EventNotification::new(topic.as_str(), payload.clone());
            let text = match serde_json::to_string(&notification) {
                Ok(t) => t,
                Err(err) => {
                    warn!(%err, "failed to encode event notification");
                    continue;
                }
            };
            if sessions.send_to(&client_id, OutboundFrame::Text(text)).await {
                delivered += 1;
            }
        }

        if delivered == 0 {
            debug!(topic = %topic, "event published with no deliverable subscribers");
        } else {
            sessions.metrics().inc_events_delivered(delivered);
        }
        delivered
    }

    pub async fn subscription_count(&self) -> usize {
        self.state.read().await.subs_by_client.len()
    }
}

impl Default for EventEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn filters_match(filters: &HashMap<String, Value>, payload: &Value) -> bool {
    if filters.is_empty() {
        return true;
    }
    let Some(obj) = payload.as_object() else {
        return false;
    };
    filters.iter().all(|(key, expected)| match obj.get(key) {
        Some(actual) if actual.is_object() || actual.is_array() => {
            warn!(key, "subscription filter cannot match non-scalar payload field");
            false
        }
        Some(actual) => actual == expected,
        None => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn sample_filters(key: &str, value: Value) -> HashMap<String, Value> {
        let mut m = HashMap::new();
        m.insert(key.to_string(), value);
        m
    }

    #[tokio::test]
    async fn subscribe_replaces_prior_record() {
        let engine = EventEngine::new();
        let mut first = HashSet::new();
        first.insert(Topic::CameraConnected);
        engine.subscribe("c1", first, HashMap::new()).await;

        let mut second = HashSet::new();
        second.insert(Topic::RecordingStart);
        engine.subscribe("c1", second, HashMap::new()).await;

        let sessions = SessionManager::new(10, Arc::new(crate::metrics::MetricsRecorder::new()));
        let delivered = engine
            .publish(Topic::CameraConnected, serde_json::json!({}), &sessions)
            .await;
        assert_eq!(delivered, 0);
    }

    #[test]
    fn scalar_filter_matches_equal_value() {
        let filters = sample_filters("device", Value::from("camera0"));
        let payload = serde_json::json!({"device": "camera0"});
        assert!(filters_match(&filters, &payload));
    }

    #[test]
    fn non_scalar_payload_field_never_matches() {
        let filters = sample_filters("device", Value::from("camera0"));
        let payload = serde_json::json!({"device": {"nested": true}});
        assert!(!filters_match(&filters, &payload));
    }
}

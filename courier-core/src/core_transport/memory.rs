//! In-process envelope store
//!
//! Behaves like the remote store for everything the identity bootstrap
//! relies on: topic partitioning, newest-first queries, authenticated
//! publishing and live subscriptions.

use async_trait::async_trait;
use metrics::counter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    Envelope, Pagination, PublishResponse, SortDirection, Topic, Transport, TransportError,
    TransportResult,
};
use crate::atomic::AtomicCell;
use crate::core_identity::AuthToken;

/// Buffered envelopes per subscription before new ones are dropped
const SUBSCRIPTION_BUFFER: usize = 256;

struct Subscription {
    topics: Vec<String>,
    sender: mpsc::Sender<Envelope>,
}

pub struct InMemoryTransport {
    /// Envelopes per topic in arrival order
    topics: AtomicCell<HashMap<String, Vec<Envelope>>>,
    subscriptions: AtomicCell<Vec<Subscription>>,
    publish_calls: AtomicUsize,
    offline: AtomicBool,
    token_max_age: Duration,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::with_token_max_age(Duration::from_secs(60 * 60))
    }

    pub fn with_token_max_age(token_max_age: Duration) -> Self {
        Self {
            topics: AtomicCell::default(),
            subscriptions: AtomicCell::default(),
            publish_calls: AtomicUsize::new(0),
            offline: AtomicBool::new(false),
            token_max_age,
        }
    }

    /// Number of accepted publish calls so far
    pub fn publish_count(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    /// Simulate losing (or regaining) the network
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Store envelopes directly, bypassing authentication
    pub fn seed(&self, envelopes: impl IntoIterator<Item = Envelope>) {
        self.topics.mutate(|topics| {
            for envelope in envelopes {
                topics.entry(envelope.topic.clone()).or_default().push(envelope);
            }
        });
    }

    /// Every envelope stored under `topic`, in arrival order
    pub fn envelopes(&self, topic: &Topic) -> Vec<Envelope> {
        let key = topic.to_string();
        self.topics
            .read(|topics| topics.get(&key).cloned().unwrap_or_default())
    }

    fn ensure_online(&self) -> TransportResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable("transport is offline".to_string()));
        }
        Ok(())
    }

    fn authorize(&self, token: &AuthToken) -> TransportResult<String> {
        let data = token
            .verify()
            .map_err(|e| TransportError::Unauthorized(e.to_string()))?;
        if data.is_expired(self.token_max_age) {
            return Err(TransportError::Unauthorized("auth token expired".to_string()));
        }
        Ok(data.wallet_address)
    }

    fn notify(&self, envelopes: &[Envelope]) {
        self.subscriptions.mutate(|subscriptions| {
            subscriptions.retain(|sub| !sub.sender.is_closed());
            for envelope in envelopes {
                for sub in subscriptions.iter() {
                    if !sub.topics.contains(&envelope.topic) {
                        continue;
                    }
                    if let Err(e) = sub.sender.try_send(envelope.clone()) {
                        warn!(topic = %envelope.topic, error = %e, "Dropping envelope for slow subscriber");
                    }
                }
            }
        });
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn query(
        &self,
        topic: &Topic,
        pagination: Option<Pagination>,
    ) -> TransportResult<Vec<Envelope>> {
        self.ensure_online()?;
        let pagination = pagination.unwrap_or_default();

        let mut envelopes = self.envelopes(topic);
        match pagination.direction {
            SortDirection::Ascending => envelopes.sort_by_key(|e| e.timestamp_ns),
            SortDirection::Descending => {
                // Later arrivals win ties
                envelopes.reverse();
                envelopes.sort_by(|a, b| b.timestamp_ns.cmp(&a.timestamp_ns));
            }
        }
        if let Some(limit) = pagination.limit {
            envelopes.truncate(limit);
        }

        debug!(topic = %topic, count = envelopes.len(), "Query served");
        Ok(envelopes)
    }

    async fn publish(
        &self,
        envelopes: Vec<Envelope>,
        token: &AuthToken,
    ) -> TransportResult<PublishResponse> {
        self.ensure_online()?;
        let publisher = self.authorize(token)?;

        if envelopes.iter().any(|e| e.topic.is_empty()) {
            return Err(TransportError::Rejected("envelope without topic".to_string()));
        }

        let accepted = envelopes.len();
        self.topics.mutate(|topics| {
            for envelope in &envelopes {
                topics
                    .entry(envelope.topic.clone())
                    .or_default()
                    .push(envelope.clone());
            }
        });
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        counter!("courier.transport.envelopes_published").increment(accepted as u64);

        self.notify(&envelopes);

        debug!(%publisher, accepted, "Publish accepted");
        Ok(PublishResponse { accepted })
    }

    async fn subscribe(&self, topics: &[Topic]) -> TransportResult<mpsc::Receiver<Envelope>> {
        self.ensure_online()?;
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);

        self.subscriptions.mutate(|subscriptions| {
            subscriptions.push(Subscription {
                topics: topics.iter().map(Topic::to_string).collect(),
                sender,
            })
        });

        Ok(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_identity::{AuthTokenIssuer, LocalWallet, PrivateKeyBundleV1};
    use std::sync::Arc;

    fn envelope(topic: &Topic, timestamp_ns: u64, message: &[u8]) -> Envelope {
        Envelope {
            topic: topic.to_string(),
            timestamp_ns,
            message: message.to_vec(),
        }
    }

    async fn issuer() -> AuthTokenIssuer {
        let wallet = LocalWallet::generate();
        let keys = PrivateKeyBundleV1::generate(&wallet).await.unwrap();
        AuthTokenIssuer::new(Arc::new(keys)).unwrap()
    }

    #[tokio::test]
    async fn test_query_newest_first() {
        let transport = InMemoryTransport::new();
        let topic = Topic::Contact("0xabc".to_string());
        transport.seed(vec![
            envelope(&topic, 1, b"old"),
            envelope(&topic, 3, b"new"),
            envelope(&topic, 2, b"mid"),
        ]);

        let found = transport.query(&topic, None).await.unwrap();
        let messages: Vec<_> = found.iter().map(|e| e.message.as_slice()).collect();
        assert_eq!(messages, vec![&b"new"[..], b"mid", b"old"]);

        let latest = transport
            .query(&topic, Some(Pagination::latest(1)))
            .await
            .unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].message, b"new");
    }

    #[tokio::test]
    async fn test_topics_are_isolated() {
        let transport = InMemoryTransport::new();
        transport.seed(vec![envelope(&Topic::Contact("0xa".to_string()), 1, b"a")]);

        let other = transport
            .query(&Topic::Contact("0xb".to_string()), None)
            .await
            .unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_publish_requires_valid_token() {
        let transport = InMemoryTransport::new();
        let issuer = issuer().await;
        let topic = Topic::Contact(issuer.address().to_string());

        let mut token = issuer.issue().unwrap();
        token.auth_data_signature[0] ^= 0xff;
        let result = transport.publish(vec![Envelope::new(&topic, vec![1])], &token).await;
        assert!(matches!(result, Err(TransportError::Unauthorized(_))));
        assert_eq!(transport.publish_count(), 0);

        let token = issuer.issue().unwrap();
        let response = transport
            .publish(vec![Envelope::new(&topic, vec![1])], &token)
            .await
            .unwrap();
        assert_eq!(response.accepted, 1);
        assert_eq!(transport.publish_count(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let transport = InMemoryTransport::with_token_max_age(Duration::from_nanos(1));
        let issuer = issuer().await;
        let token = issuer.issue().unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;

        let result = transport
            .publish(
                vec![Envelope::new(&Topic::Contact("0x1".to_string()), vec![])],
                &token,
            )
            .await;
        assert!(matches!(result, Err(TransportError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_offline_fails() {
        let transport = InMemoryTransport::new();
        transport.set_offline(true);

        let result = transport.query(&Topic::Contact("0x1".to_string()), None).await;
        assert!(matches!(result, Err(TransportError::Unreachable(_))));
    }

    #[tokio::test]
    async fn test_subscribers_receive_published_envelopes() {
        let transport = InMemoryTransport::new();
        let issuer = issuer().await;
        let watched = Topic::Contact("0xa".to_string());
        let ignored = Topic::Contact("0xb".to_string());

        let mut rx = transport.subscribe(&[watched.clone()]).await.unwrap();
        let token = issuer.issue().unwrap();
        transport
            .publish(
                vec![
                    Envelope::new(&ignored, b"skip".to_vec()),
                    Envelope::new(&watched, b"hit".to_vec()),
                ],
                &token,
            )
            .await
            .unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, b"hit");
        assert!(rx.try_recv().is_err());
    }
}

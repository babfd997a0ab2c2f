//! Transport trait
//!
//! Topic-addressed access to the remote envelope store. Pagination, streaming
//! and connection management belong to implementations.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Envelope, Pagination, PublishResponse, Topic, TransportResult};
use crate::core_identity::AuthToken;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Envelopes stored under `topic`, newest first unless `pagination` says otherwise
    async fn query(
        &self,
        topic: &Topic,
        pagination: Option<Pagination>,
    ) -> TransportResult<Vec<Envelope>>;

    /// Store envelopes. `token` is freshly issued by the caller for this call only.
    async fn publish(
        &self,
        envelopes: Vec<Envelope>,
        token: &AuthToken,
    ) -> TransportResult<PublishResponse>;

    /// Live stream of envelopes published to any of `topics` from now on
    async fn subscribe(&self, topics: &[Topic]) -> TransportResult<mpsc::Receiver<Envelope>>;
}

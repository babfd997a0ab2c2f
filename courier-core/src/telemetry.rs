//! Metrics for observability
//!
//! Counters are recorded at their call sites with the `metrics` macros; this
//! module registers their descriptions and times multi-step operations.
//! Installing a recorder is left to the embedding application.

use metrics::{describe_counter, describe_histogram, histogram};
use std::time::Instant;

/// Register metric descriptions
pub fn init_metrics() {
    // Identity
    describe_counter!("courier.identity.bundles_created", "Private key bundles generated and stored");
    describe_counter!(
        "courier.identity.bundles_discarded",
        "Stored key bundles skipped because they could not be used"
    );
    describe_counter!("courier.auth.tokens_issued", "Auth tokens issued for publishing");

    // Contacts
    describe_counter!("courier.contacts.published", "Contact record publishes");

    // Transport
    describe_counter!(
        "courier.transport.envelopes_published",
        "Envelopes accepted by the in-memory transport"
    );

    // Bootstrap
    describe_counter!("courier.bootstrap.completed", "Clients that reached the ready state");
    describe_counter!("courier.bootstrap.failed", "Client bootstraps that failed");
    describe_histogram!("courier.bootstrap.duration_ms", "Client bootstrap duration in milliseconds");

    // Attachments
    describe_histogram!(
        "courier.attachments.fetch.duration_ms",
        "Remote attachment fetch and decrypt duration in milliseconds"
    );
}

/// Timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Stop the timer and record the duration
    pub fn stop(self) {
        let duration = self.start.elapsed();
        histogram!(self.name).record(duration.as_secs_f64() * 1000.0);
    }
}

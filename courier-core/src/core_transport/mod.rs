//! Envelope store boundary

mod envelope;
mod error;
mod memory;
mod transport;

pub use envelope::{
    timestamp_now_ns, Envelope, Pagination, PublishResponse, SortDirection, Topic,
};
pub use error::{TransportError, TransportResult};
pub use memory::InMemoryTransport;
pub use transport::Transport;

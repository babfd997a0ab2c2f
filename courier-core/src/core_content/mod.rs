//! Message content
//!
//! Codecs turn typed values into [`EncodedContent`]. Remote attachments wrap
//! any other codec's output in an encrypted, digest-addressed payload that is
//! fetched out of band.

mod codec;
mod encoded;
mod error;
mod fetcher;
mod reaction;
mod remote_attachment;

pub use codec::{ContentCodec, TextCodec};
pub use encoded::{ContentTypeId, EncodedContent};
pub use error::{ContentError, RemoteAttachmentError};
#[cfg(feature = "http-fetch")]
pub use fetcher::HttpFetcher;
pub use fetcher::{default_fetcher, RemoteContentFetcher, UnavailableFetcher};
pub use reaction::{Reaction, ReactionAction, ReactionCodec, ReactionSchema};
pub use remote_attachment::{
    EncryptedEncodedContent, RemoteAttachment, RemoteAttachmentCodec, Scheme,
};

//! Streaming types shared by the upload path and the storage engine.

use std::pin::Pin;

use bytes::Bytes;
use futures::Stream;

/// A byte stream type used for archive uploads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Wrap an in-memory buffer as a single-chunk [`ByteStream`].
pub fn bytes_stream(data: impl Into<Bytes>) -> ByteStream {
    let data: Bytes = data.into();
    Box::pin(futures::stream::once(async move { Ok(data) }))
}

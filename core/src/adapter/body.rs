//! # Request Bodies
//!
//! Body sources and size-capped reading.

use crate::procedure::{ErrorCode, RpcError};
use bytes::{Bytes, BytesMut};
use derive_more::Display;
use futures::stream::{LocalBoxStream, Stream, StreamExt};
use serde_json::Value;
use std::fmt;
use std::io;

/// A stream of body chunks.
pub type BodyStream = LocalBoxStream<'static, Result<Bytes, io::Error>>;

/// The unread body of a request.
#[derive(Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    Empty,
    /// The whole body, already in memory.
    Bytes(Bytes),
    /// Chunks still to be received.
    Stream(BodyStream),
    /// A body the hosting framework already parsed. Used as-is.
    Parsed(Value),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            RequestBody::Stream(_) => f.write_str("Stream(..)"),
            RequestBody::Parsed(value) => f.debug_tuple("Parsed").field(value).finish(),
        }
    }
}

impl RequestBody {
    /// Wraps a chunk stream.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, io::Error>> + 'static,
    {
        RequestBody::Stream(stream.boxed_local())
    }

    /// Reads the body, failing as soon as more than `limit` bytes arrive.
    pub async fn read(self, limit: usize) -> Result<BodyContent, BodyReadError> {
        match self {
            RequestBody::Empty => Ok(BodyContent::Raw(Bytes::new())),
            RequestBody::Parsed(value) => Ok(BodyContent::Parsed(value)),
            RequestBody::Bytes(bytes) if bytes.len() > limit => Err(BodyReadError::TooLarge),
            RequestBody::Bytes(bytes) => Ok(BodyContent::Raw(bytes)),
            RequestBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk?;
                    if buf.len() + chunk.len() > limit {
                        return Err(BodyReadError::TooLarge);
                    }
                    buf.extend_from_slice(&chunk);
                }
                Ok(BodyContent::Raw(buf.freeze()))
            }
        }
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes.into())
    }
}

impl From<String> for RequestBody {
    fn from(body: String) -> Self {
        RequestBody::Bytes(body.into())
    }
}

impl From<&'static str> for RequestBody {
    fn from(body: &'static str) -> Self {
        RequestBody::Bytes(Bytes::from_static(body.as_bytes()))
    }
}

impl From<()> for RequestBody {
    fn from(_: ()) -> Self {
        RequestBody::Empty
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Parsed(value)
    }
}

/// A fully read body.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyContent {
    /// Raw bytes, possibly empty.
    Raw(Bytes),
    /// Pre-parsed by the host.
    Parsed(Value),
}

/// Failure while reading a body.
#[derive(Debug, Display)]
pub enum BodyReadError {
    /// The cap was exceeded.
    #[display("Request body too large")]
    TooLarge,
    /// The transport failed.
    #[display("Failed to read request body: {_0}")]
    Io(io::Error),
}

impl std::error::Error for BodyReadError {}

impl From<io::Error> for BodyReadError {
    fn from(err: io::Error) -> Self {
        BodyReadError::Io(err)
    }
}

impl From<BodyReadError> for RpcError {
    fn from(err: BodyReadError) -> Self {
        match err {
            BodyReadError::TooLarge => {
                RpcError::new(ErrorCode::PayloadTooLarge, "Request body too large")
            }
            BodyReadError::Io(io) => {
                RpcError::new(ErrorCode::ParseError, "Failed to parse request body").with_cause(io)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn test_stream_is_concatenated() {
        let body = RequestBody::from_stream(stream::iter(vec![
            Ok(Bytes::from_static(b"{\"a\":")),
            Ok(Bytes::from_static(b"1}")),
        ]));
        let content = body.read(100).await.unwrap();
        assert_eq!(content, BodyContent::Raw(Bytes::from_static(b"{\"a\":1}")));
    }

    #[tokio::test]
    async fn test_stream_over_limit() {
        let body = RequestBody::from_stream(stream::iter(vec![
            Ok(Bytes::from(vec![b'x'; 8])),
            Ok(Bytes::from(vec![b'x'; 8])),
        ]));
        assert!(matches!(body.read(10).await, Err(BodyReadError::TooLarge)));
    }

    #[tokio::test]
    async fn test_bytes_at_limit_are_accepted() {
        let body = RequestBody::from(vec![b'x'; 10]);
        assert!(body.read(10).await.is_ok());
        let body = RequestBody::from(vec![b'x'; 11]);
        let err: RpcError = body.read(10).await.unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::PayloadTooLarge);
        assert_eq!(err.message(), "Request body too large");
    }

    #[tokio::test]
    async fn test_io_failure_is_parse_error() {
        let body = RequestBody::from_stream(stream::iter(vec![Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "reset",
        ))]));
        let err: RpcError = body.read(10).await.unwrap_err().into();
        assert_eq!(err.code(), ErrorCode::ParseError);
        assert_eq!(err.message(), "Failed to parse request body");
    }

    #[tokio::test]
    async fn test_parsed_passes_through() {
        let body = RequestBody::from(serde_json::json!({"a": 1}));
        assert_eq!(
            body.read(0).await.unwrap(),
            BodyContent::Parsed(serde_json::json!({"a": 1}))
        );
    }
}

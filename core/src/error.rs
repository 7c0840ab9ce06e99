//! Error types for the exchange engine.
//!
//! # Design
//! Every failure of one exchange lands in [`Error`]. The variants follow the
//! pipeline: `NoWriter` and `Encode` fail before anything is sent,
//! `Transport` covers the round trip itself, and `Handler`, `Client`,
//! `NoReader` and `Decode` classify the response. A 4xx/5xx response always
//! surfaces as `Client`, even when its body could not be decoded; the
//! payload is simply absent in that case.
//!
//! `Error` is generic over the decoded error payload `E`, defaulting to
//! [`ErrorResponse`].

use std::error::Error as StdError;
use std::fmt;

use http::{HeaderMap, StatusCode};
use thiserror::Error;

use crate::types::ErrorResponse;

/// Boxed error used at the strategy and status-handler seams, where the
/// concrete error type belongs to the caller.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

pub type Result<T, E = ErrorResponse> = std::result::Result<T, Error<E>>;

#[derive(Debug, Error)]
pub enum Error<E = ErrorResponse> {
    /// No writer strategy accepts this body and content type. Nothing was sent.
    #[error("no strategy to write this request: {} ({}) - {}", body.as_deref().unwrap_or("<no body>"), body_type.unwrap_or("-"), content_type.as_deref().unwrap_or("<no content-type>"))]
    NoWriter {
        body: Option<String>,
        body_type: Option<&'static str>,
        content_type: Option<String>,
    },

    /// The selected writer failed to serialize the body. Nothing was sent.
    #[error("failed to encode request body")]
    Encode(#[source] BoxError),

    #[error("transport error")]
    Transport(#[from] TransportError),

    /// A registered status handler matched and produced this error.
    #[error("status handler rejected the response")]
    Handler(#[source] BoxError),

    /// The server answered with a status in `[400, 600)`.
    #[error("{0}")]
    Client(ClientException<E>),

    /// No reader strategy can produce the requested type from this response.
    #[error("no strategy to read this response: {target} - {}", content_type.as_deref().unwrap_or("<no content-type>"))]
    NoReader {
        target: &'static str,
        content_type: Option<String>,
    },

    /// The selected reader failed on a success response.
    #[error("failed to decode response body as {target}")]
    Decode {
        target: &'static str,
        #[source]
        source: BoxError,
    },
}

impl<E> Error<E> {
    /// Status code of the response that caused this error, if one arrived
    /// and was classified as a client exception.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Client(exception) => Some(exception.status),
            _ => None,
        }
    }

    pub fn client_exception(&self) -> Option<&ClientException<E>> {
        match self {
            Error::Client(exception) => Some(exception),
            _ => None,
        }
    }
}

/// An error response that no status handler claimed.
#[derive(Debug, Clone)]
pub struct ClientException<E = ErrorResponse> {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Decoded error body. `None` when no reader matched or decoding failed.
    pub error_response: Option<E>,
}

impl<E> ClientException<E> {
    pub fn new(status: StatusCode, headers: HeaderMap, error_response: Option<E>) -> Self {
        Self {
            status,
            headers,
            error_response,
        }
    }
}

impl<E: fmt::Debug> fmt::Display for ClientException<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_response {
            Some(payload) => write!(f, "{} returned {payload:?}", self.status),
            None => write!(f, "{} returned no decodable error body", self.status),
        }
    }
}

impl<E: fmt::Debug> StdError for ClientException<E> {}

/// Failures of the underlying HTTP round trip.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response body of {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { size: usize, limit: usize },

    #[error("transport failure")]
    Other(#[source] BoxError),
}

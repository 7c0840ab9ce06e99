//! Asynchronous HTTP exchange engine.
//!
//! # Overview
//! [`WebClient`] performs one request/response cycle per call: it picks a
//! writer strategy for the outgoing body by content type, sends through a
//! pluggable [`Transport`], lets caller-registered status handlers claim the
//! response, and otherwise decodes either the requested type or, for
//! 4xx/5xx, an error payload wrapped in a [`ClientException`].
//!
//! # Design
//! - Strategies are ordered and first-match-wins; selection never has side
//!   effects.
//! - All configuration goes through [`WebClientBuilder`]; a built client is
//!   immutable and safe to share across concurrent exchanges.
//! - No retries, rate limiting or caching happen here. Callers layer their
//!   own policy on top of the returned [`Error`].
//! - The engine only sees buffered bodies (`Bytes`); streaming, pooling and
//!   TLS belong to the transport.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod status;
pub mod strategy;
pub mod transport;
pub mod types;

pub use client::{is_error_status, WebClient, WebClientBuilder};
pub use config::ClientConfig;
pub use error::{BoxError, ClientException, Error, Result, TransportError};
pub use crate::http::{ClientRequest, HttpRequest, HttpResponse};
pub use status::StatusHandler;
pub use strategy::{
    Body, BodyType, EmptyReaderStrategy, EmptyWriterStrategy, ExchangeStrategies, JsonReaderStrategy,
    JsonWriterStrategy, ReaderStrategy, TargetType, TextReaderStrategy, TextWriterStrategy, WriterStrategy,
};
#[cfg(feature = "reqwest")]
pub use transport::ReqwestTransport;
pub use transport::Transport;
pub use types::ErrorResponse;

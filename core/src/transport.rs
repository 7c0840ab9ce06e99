//! The transport seam: whatever actually moves bytes over the network.
//!
//! # Design
//! The engine only needs "send this request, give me a buffered response".
//! Connection pooling, TLS and timeouts live behind [`Transport`]. The
//! default `reqwest` feature provides [`ReqwestTransport`]; tests plug in
//! their own implementations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one HTTP round trip. Non-2xx statuses are responses, not
    /// errors.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request).await
    }
}

#[cfg(feature = "reqwest")]
pub use self::reqwest_transport::ReqwestTransport;

#[cfg(feature = "reqwest")]
mod reqwest_transport {
    use async_trait::async_trait;
    use bytes::BytesMut;
    use tracing::{debug, warn};

    use super::Transport;
    use crate::config::ClientConfig;
    use crate::error::TransportError;
    use crate::http::{HttpRequest, HttpResponse};

    /// [`Transport`] backed by a pooled `reqwest::Client`.
    #[derive(Debug, Clone)]
    pub struct ReqwestTransport {
        client: reqwest::Client,
        max_response_size: usize,
    }

    impl ReqwestTransport {
        /// Redirects are never followed: a 3xx is handed back to the engine
        /// like any other response.
        pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
            let client = reqwest::Client::builder()
                .timeout(config.timeout)
                .connect_timeout(config.connect_timeout)
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .map_err(TransportError::from)?;
            Ok(Self {
                client,
                max_response_size: config.max_response_size,
            })
        }

        /// Wrap an already configured client. No response size limit applies
        /// and the client's own redirect policy is kept.
        pub fn from_client(client: reqwest::Client) -> Self {
            Self {
                client,
                max_response_size: usize::MAX,
            }
        }
    }

    #[async_trait]
    impl Transport for ReqwestTransport {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            let mut response = self
                .client
                .request(request.method, &request.url)
                .headers(request.headers)
                .body(request.body)
                .send()
                .await?;

            let status = response.status();
            let headers = response.headers().clone();
            let limit = self.max_response_size;
            if let Some(length) = response.content_length() {
                let length = usize::try_from(length).unwrap_or(usize::MAX);
                if length > limit {
                    warn!(url = %request.url, length, limit, "response exceeds size limit");
                    return Err(TransportError::BodyTooLarge { size: length, limit });
                }
            }

            let mut buffer = BytesMut::new();
            while let Some(chunk) = response.chunk().await? {
                let size = buffer.len().saturating_add(chunk.len());
                if size > limit {
                    warn!(url = %request.url, size, limit, "streamed response exceeds size limit");
                    return Err(TransportError::BodyTooLarge { size, limit });
                }
                buffer.extend_from_slice(&chunk);
            }
            let body = buffer.freeze();
            debug!(status = status.as_u16(), body_length = body.len(), "transport received response");

            Ok(HttpResponse { status, headers, body })
        }
    }

    impl From<reqwest::Error> for TransportError {
        fn from(err: reqwest::Error) -> Self {
            if err.is_timeout() {
                TransportError::Timeout
            } else if err.is_connect() {
                TransportError::Connect(err.to_string())
            } else if err.is_builder() {
                TransportError::InvalidUrl(err.to_string())
            } else {
                TransportError::Other(Box::new(err))
            }
        }
    }
}

//! The exchange engine: one request out, one classified response back.
//!
//! # Design
//! `WebClient` is assembled by [`WebClientBuilder`] and immutable afterwards,
//! so any number of `exchange` futures can run against one `&WebClient`
//! without locking. Each call:
//!
//! 1. merges default headers under the request headers,
//! 2. picks the first writer strategy for the body type and content type
//!    (failing with `NoWriter` before any I/O if there is none),
//! 3. sends through the transport exactly once,
//! 4. hands status and headers to the caller's `on_response` callback,
//! 5. lets the first matching status handler short-circuit with its error,
//! 6. otherwise treats `[400, 600)` as an error response and everything else
//!    as success,
//! 7. decodes the error payload (best effort) or the requested type.

use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use futures::future::BoxFuture;
use http::header::{IntoHeaderName, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::ClientConfig;
use crate::error::{BoxError, ClientException, Error};
use crate::http::{header_str, merge_headers, ClientRequest, HttpRequest, HttpResponse};
use crate::status::{find_handler, StatusHandler};
use crate::strategy::{Body, ExchangeStrategies, TargetType};
use crate::transport::Transport;
use crate::types::ErrorResponse;

/// Whether `status` takes the error-response path. 1xx and 3xx are decoded
/// like successes.
pub fn is_error_status(status: StatusCode) -> bool {
    (400..600).contains(&status.as_u16())
}

/// Assembles a [`WebClient`]. All configuration happens here; the built
/// client cannot be reconfigured.
pub struct WebClientBuilder<E = ErrorResponse> {
    default_headers: HeaderMap,
    strategies: ExchangeStrategies,
    status_handlers: Vec<StatusHandler>,
    _error: PhantomData<fn() -> E>,
}

impl WebClientBuilder {
    /// JSON/text strategies, no default headers, no status handlers, and
    /// [`ErrorResponse`] as the error payload.
    pub fn new() -> Self {
        Self {
            default_headers: HeaderMap::new(),
            strategies: ExchangeStrategies::json_default(),
            status_handlers: Vec::new(),
            _error: PhantomData,
        }
    }
}

impl Default for WebClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> WebClientBuilder<E> {
    /// Decode 4xx/5xx bodies into `P` instead.
    pub fn error_payload<P>(self) -> WebClientBuilder<P> {
        WebClientBuilder {
            default_headers: self.default_headers,
            strategies: self.strategies,
            status_handlers: self.status_handlers,
            _error: PhantomData,
        }
    }

    /// Set a default header, replacing any earlier default of that name.
    pub fn default_header<K: IntoHeaderName>(mut self, name: K, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Apply the header-level settings of `config` (currently `User-Agent`).
    pub fn config(self, config: &ClientConfig) -> Self {
        match HeaderValue::from_str(&config.user_agent) {
            Ok(agent) => self.default_header(USER_AGENT, agent),
            Err(_) => {
                warn!(user_agent = %config.user_agent, "user agent is not a valid header value, skipping");
                self
            }
        }
    }

    pub fn strategies(mut self, strategies: ExchangeStrategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// Register a status handler. Handlers are consulted in registration
    /// order and the first match wins.
    pub fn on_status<P, F>(mut self, predicate: P, producer: F) -> Self
    where
        P: Fn(StatusCode) -> bool + Send + Sync + 'static,
        F: Fn(&HttpResponse) -> BoxFuture<'static, BoxError> + Send + Sync + 'static,
    {
        self.status_handlers.push(StatusHandler::new(predicate, producer));
        self
    }

    pub fn build<T: Transport>(self, transport: T) -> WebClient<T, E> {
        WebClient {
            transport,
            default_headers: self.default_headers,
            strategies: self.strategies,
            status_handlers: self.status_handlers,
            _error: PhantomData,
        }
    }
}

impl<E> fmt::Debug for WebClientBuilder<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebClientBuilder")
            .field("default_headers", &self.default_headers)
            .field("strategies", &self.strategies)
            .field("status_handlers", &self.status_handlers.len())
            .finish()
    }
}

/// Asynchronous HTTP exchange engine, generic over its transport `T` and the
/// error payload `E` decoded from 4xx/5xx bodies.
pub struct WebClient<T, E = ErrorResponse> {
    transport: T,
    default_headers: HeaderMap,
    strategies: ExchangeStrategies,
    status_handlers: Vec<StatusHandler>,
    _error: PhantomData<fn() -> E>,
}

impl<T: Transport> WebClient<T> {
    /// A client with the default builder settings.
    pub fn new(transport: T) -> Self {
        WebClientBuilder::new().build(transport)
    }
}

impl<T, E> WebClient<T, E>
where
    T: Transport,
    E: DeserializeOwned + fmt::Debug + Send + 'static,
{
    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub fn strategies(&self) -> &ExchangeStrategies {
        &self.strategies
    }

    /// Send `request` with an optional `body` and decode the response as `R`.
    ///
    /// `on_response` is called exactly once with the status and headers as
    /// soon as a response arrives, before it is classified. It is not called
    /// when no response arrives (no writer, encode or transport failure).
    ///
    /// Use `R = ()` for responses whose body should be ignored.
    #[instrument(name = "exchange", skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn exchange<B, R, F>(
        &self,
        request: ClientRequest,
        body: Option<&B>,
        on_response: F,
    ) -> Result<R, Error<E>>
    where
        B: Body,
        R: DeserializeOwned + Send + 'static,
        F: FnOnce(StatusCode, &HeaderMap),
    {
        let headers = merge_headers(&self.default_headers, &request.headers);
        let content_type = header_str(&headers, CONTENT_TYPE).map(str::to_owned);
        let body = body.map(|b| b as &dyn Body);
        let body_type = body.map(|b| b.body_type());

        let Some(writer) = self.strategies.find_writer(body_type, content_type.as_deref()) else {
            debug!(body_type = body_type.map(|t| t.name), content_type = ?content_type, "no writer strategy matched");
            return Err(Error::NoWriter {
                body: body.map(|b| format!("{b:?}")),
                body_type: body_type.map(|t| t.name),
                content_type,
            });
        };

        let mut outgoing = HttpRequest {
            method: request.method,
            url: request.url,
            headers,
            body: Bytes::new(),
        };
        writer.write(&mut outgoing, body).map_err(Error::Encode)?;
        debug!(
            writer = writer.name(),
            content_type = ?content_type,
            body_length = outgoing.body.len(),
            "dispatching request"
        );

        let response = self.transport.send(outgoing).await?;
        on_response(response.status, &response.headers);
        debug!(
            status = response.status.as_u16(),
            body_length = response.body.len(),
            "response received"
        );

        if let Some(handler) = find_handler(&self.status_handlers, response.status) {
            debug!(status = response.status.as_u16(), "status handler matched");
            return Err(Error::Handler(handler.produce(&response).await));
        }

        let content_type = response.content_type().map(str::to_owned);
        if is_error_status(response.status) {
            let payload = self.read_error_payload(&response, content_type.as_deref()).await;
            return Err(Error::Client(ClientException::new(
                response.status,
                response.headers,
                payload,
            )));
        }

        let target = TargetType::of::<R>();
        let Some(reader) = self.strategies.find_reader(&target, content_type.as_deref()) else {
            debug!(target = target.name, content_type = ?content_type, "no reader strategy matched");
            return Err(Error::NoReader {
                target: target.name,
                content_type,
            });
        };

        let decoded = reader
            .read(response.body, &target)
            .await
            .map_err(|source| Error::Decode {
                target: target.name,
                source,
            })?;
        match decoded.downcast::<R>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(Error::Decode {
                target: target.name,
                source: format!("{} produced a value of another type", reader.name()).into(),
            }),
        }
    }

    /// [`exchange`](Self::exchange) without a body or response callback.
    pub async fn retrieve<R>(&self, request: ClientRequest) -> Result<R, Error<E>>
    where
        R: DeserializeOwned + Send + 'static,
    {
        self.exchange(request, None::<&()>, |_, _| {}).await
    }

    /// Best-effort decode of an error body. Any failure yields `None` so the
    /// HTTP error itself is still reported.
    async fn read_error_payload(&self, response: &HttpResponse, content_type: Option<&str>) -> Option<E> {
        let target = TargetType::of::<E>();
        let Some(reader) = self.strategies.find_reader(&target, content_type) else {
            debug!(status = response.status.as_u16(), content_type, "no reader for error payload");
            return None;
        };
        match reader.read(response.body.clone(), &target).await {
            Ok(decoded) => decoded.downcast::<E>().ok().map(|payload| *payload),
            Err(err) => {
                warn!(status = response.status.as_u16(), error = %err, "failed to decode error response body");
                None
            }
        }
    }
}

impl<T: fmt::Debug, E> fmt::Debug for WebClient<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebClient")
            .field("transport", &self.transport)
            .field("default_headers", &self.default_headers)
            .field("strategies", &self.strategies)
            .field("status_handlers", &self.status_handlers.len())
            .finish()
    }
}

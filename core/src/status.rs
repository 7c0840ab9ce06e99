//! Status handlers: caller-registered rules that turn a response status into
//! a custom error before the default 4xx/5xx classification runs.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use http::StatusCode;

use crate::error::BoxError;
use crate::http::HttpResponse;

type Predicate = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;
type ErrorProducer = Arc<dyn Fn(&HttpResponse) -> BoxFuture<'static, BoxError> + Send + Sync>;

#[derive(Clone)]
pub struct StatusHandler {
    predicate: Predicate,
    producer: ErrorProducer,
}

impl StatusHandler {
    pub fn new<P, F>(predicate: P, producer: F) -> Self
    where
        P: Fn(StatusCode) -> bool + Send + Sync + 'static,
        F: Fn(&HttpResponse) -> BoxFuture<'static, BoxError> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
            producer: Arc::new(producer),
        }
    }

    pub fn matches(&self, status: StatusCode) -> bool {
        (self.predicate)(status)
    }

    pub async fn produce(&self, response: &HttpResponse) -> BoxError {
        (self.producer)(response).await
    }
}

impl fmt::Debug for StatusHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusHandler").finish_non_exhaustive()
    }
}

/// The first handler in `handlers` whose predicate accepts `status`.
pub fn find_handler(handlers: &[StatusHandler], status: StatusCode) -> Option<&StatusHandler> {
    handlers.iter().find(|handler| handler.matches(status))
}

use crate::cache::CacheStore;
use crate::classify::Classification;
use crate::dispatch::TransformDispatcher;
use crate::error::TransformFailure;
use crate::key::CacheKey;
use crate::options::TransformOptions;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// What the error handler decided to do with a failed transform.
#[derive(Debug, Clone)]
pub struct ErrorOutcome {
    /// The bytes served to the client.
    pub body: Bytes,
    /// Whether those bytes are written to cache under the response's key.
    pub cache: bool,
}

/// The pluggable handler invoked on every compile or minify failure.
///
/// Receives the tagged failure and the original buffered body, and decides
/// the final output and whether to cache it. The default serves the
/// original body untouched and never caches.
pub type ErrorHandler = Arc<dyn Fn(&TransformFailure, &Bytes) -> ErrorOutcome + Send + Sync>;

/// The default error policy: correctness over optimization. The client
/// receives the pre-transform body with no cache entry created.
pub fn default_error_handler(_failure: &TransformFailure, original: &Bytes) -> ErrorOutcome {
    ErrorOutcome {
        body: original.clone(),
        cache: false,
    }
}

/// The per-response transform cycle, shared by every response the layer
/// wraps: key derivation, cache lookup, dispatch on miss, populate, and
/// error-handler routing.
pub(crate) struct Pipeline {
    pub(crate) dispatcher: TransformDispatcher,
    store: Arc<dyn CacheStore>,
    error_handler: ErrorHandler,
}

impl Pipeline {
    pub(crate) fn new(
        dispatcher: TransformDispatcher,
        store: Arc<dyn CacheStore>,
        error_handler: ErrorHandler,
    ) -> Self {
        Self {
            dispatcher,
            store,
            error_handler,
        }
    }

    /// Runs the full cycle over a complete buffered body. Infallible from
    /// the caller's perspective: cache errors degrade to a miss or an
    /// uncached response, transform errors route through the handler.
    pub(crate) async fn run(
        self: Arc<Self>,
        classification: Classification,
        options: TransformOptions,
        body: Bytes,
    ) -> Bytes {
        let key = CacheKey::derive(&options, &body);

        match self.store.get(&key).await {
            Ok(Some(cached)) => {
                debug!(key = %key, "cache hit");
                return cached;
            }
            Ok(None) => {}
            Err(err) => {
                warn!(key = %key, error = %err, "cache read failed, treating as miss");
            }
        }

        match self
            .dispatcher
            .process(classification.asset_type, &options, body.clone())
            .await
        {
            Ok(output) => {
                if classification.should_cache {
                    self.store_entry(&key, &output).await;
                }
                output
            }
            Err(failure) => {
                debug!(
                    asset_type = %failure.asset_type,
                    stage = %failure.stage,
                    "transform failed, routing to error handler"
                );
                let outcome = (self.error_handler)(&failure, &body);
                if outcome.cache && classification.should_cache {
                    self.store_entry(&key, &outcome.body).await;
                }
                outcome.body
            }
        }
    }

    async fn store_entry(&self, key: &CacheKey, body: &Bytes) {
        if let Err(err) = self.store.put(key, body.clone()).await {
            warn!(key = %key, error = %err, "cache write failed, serving uncached");
        }
    }
}

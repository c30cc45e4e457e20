use crate::backend::{Compile, Minify};
use crate::cache::{CacheConfig, CacheStore, build_store};
use crate::classify::{TypeMatcher, TypeMatchers};
use crate::dispatch::TransformDispatcher;
use crate::error::TransformFailure;
use crate::pipeline::{ErrorHandler, ErrorOutcome, Pipeline, default_error_handler};
use crate::service::{MinifyService, Shared};
use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tower::Layer;

/// A Tower layer that minifies HTTP response bodies.
///
/// Built with defaults, the layer carries only the built-in JSON minifier
/// and a volatile in-memory cache; JavaScript/CSS minifiers and the
/// sass/less/stylus/coffee compilers are registered through the builder
/// methods. Asset types without a registered backend are never intercepted.
#[derive(Clone)]
pub struct MinifyLayer {
    matchers: TypeMatchers,
    dispatcher: TransformDispatcher,
    store: Arc<dyn CacheStore>,
    error_handler: ErrorHandler,
}

impl MinifyLayer {
    /// Creates a layer with default settings: default matchers, the
    /// built-in JSON backend, an in-memory cache, and the default error
    /// policy (serve the original body, never cache a failure).
    pub fn new() -> Self {
        Self {
            matchers: TypeMatchers::default(),
            dispatcher: TransformDispatcher::default(),
            store: build_store(&CacheConfig::Memory),
            error_handler: Arc::new(default_error_handler),
        }
    }

    /// Uses a durable file cache under the given directory.
    ///
    /// The directory is probed for writability immediately; if it is not
    /// writable the layer logs one warning and keeps the in-memory cache
    /// instead of failing.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.store = build_store(&CacheConfig::Dir(dir.into()));
        self
    }

    /// Uses a custom cache store.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = store;
        self
    }

    /// Replaces the whole backend registry.
    pub fn dispatcher(mut self, dispatcher: TransformDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Registers the JavaScript minifier backend.
    pub fn js_minifier(mut self, backend: Arc<dyn Minify>) -> Self {
        self.dispatcher = self.dispatcher.js_minifier(backend);
        self
    }

    /// Registers the CSS minifier backend.
    pub fn css_minifier(mut self, backend: Arc<dyn Minify>) -> Self {
        self.dispatcher = self.dispatcher.css_minifier(backend);
        self
    }

    /// Registers the JSON minifier backend, replacing the built-in one.
    pub fn json_minifier(mut self, backend: Arc<dyn Minify>) -> Self {
        self.dispatcher = self.dispatcher.json_minifier(backend);
        self
    }

    /// Registers the SASS compiler backend.
    pub fn sass_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.dispatcher = self.dispatcher.sass_compiler(backend);
        self
    }

    /// Registers the LESS compiler backend.
    pub fn less_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.dispatcher = self.dispatcher.less_compiler(backend);
        self
    }

    /// Registers the Stylus compiler backend.
    pub fn stylus_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.dispatcher = self.dispatcher.stylus_compiler(backend);
        self
    }

    /// Registers the CoffeeScript compiler backend.
    pub fn coffee_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.dispatcher = self.dispatcher.coffee_compiler(backend);
        self
    }

    /// Replaces all content-type matchers.
    pub fn matchers(mut self, matchers: TypeMatchers) -> Self {
        self.matchers = matchers;
        self
    }

    /// Overrides the JavaScript content-type matcher.
    pub fn js_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.js = matcher;
        self
    }

    /// Overrides the CSS content-type matcher.
    pub fn css_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.css = matcher;
        self
    }

    /// Overrides the JSON content-type matcher.
    pub fn json_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.json = matcher;
        self
    }

    /// Overrides the SASS content-type matcher.
    pub fn sass_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.sass = matcher;
        self
    }

    /// Overrides the LESS content-type matcher.
    pub fn less_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.less = matcher;
        self
    }

    /// Overrides the Stylus content-type matcher.
    pub fn stylus_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.stylus = matcher;
        self
    }

    /// Overrides the CoffeeScript content-type matcher.
    pub fn coffee_match(mut self, matcher: TypeMatcher) -> Self {
        self.matchers.coffee = matcher;
        self
    }

    /// Replaces the error handler invoked on compile/minify failures.
    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&TransformFailure, &Bytes) -> ErrorOutcome + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }
}

impl Default for MinifyLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MinifyLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinifyLayer")
            .field("matchers", &self.matchers)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl<S> Layer<S> for MinifyLayer {
    type Service = MinifyService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        let shared = Arc::new(Shared {
            matchers: self.matchers.clone(),
            pipeline: Arc::new(Pipeline::new(
                self.dispatcher.clone(),
                self.store.clone(),
                self.error_handler.clone(),
            )),
        });
        MinifyService::new(inner, shared)
    }
}

//! HTTP response minification middleware for Tower.
//!
//! This crate provides a Tower layer that intercepts outgoing response
//! bodies, classifies them by `Content-Type`, optionally compiles them from
//! a higher-level dialect into its base format (SASS/LESS/Stylus into CSS,
//! CoffeeScript into JavaScript), minifies the result through a pluggable
//! backend, and caches the output keyed by a digest of the body bytes and
//! the effective transform options, so identical bodies are never
//! transformed twice.
//!
//! # Example
//!
//! ```ignore
//! use http_response_minify::MinifyLayer;
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .layer(
//!         MinifyLayer::new()
//!             .cache_dir("/var/cache/minify")
//!             .js_minifier(my_js_backend),
//!     )
//!     .service(my_service);
//! ```
//!
//! # Interception Rules
//!
//! The middleware will **not** transform responses when:
//! - The request method is `HEAD`
//! - No `Content-Type` header is present
//! - The content type matches no configured asset family
//! - The matched family has no registered backend
//! - The response's [`TransformOptions`] set `enabled: false`
//! - The response is a base format (js/css/json) and its options set
//!   `minify: false`
//!
//! Untransformed responses pass through byte-for-byte with all headers,
//! including `Content-Length`, untouched.
//!
//! # Response Modifications
//!
//! When transformation is applied:
//! - `Content-Length` is removed (transformed size is unknown at header time)
//! - Compiled formats face outward as their base type: sass/less/stylus
//!   responses are re-labeled `text/css`, coffeescript `text/javascript`
//! - All other headers pass through unchanged
//!
//! # Failure Policy
//!
//! Transform failures are routed to a single pluggable error handler; the
//! default serves the original, untransformed body and caches nothing.
//! Cache read/write failures never surface to the client: reads degrade to
//! a miss, writes are logged and the response served uncached.

#![deny(missing_docs)]

mod backend;
mod body;
mod cache;
mod classify;
mod dispatch;
mod error;
mod future;
mod key;
mod layer;
mod options;
mod pipeline;
mod service;

pub use backend::{Compile, JsonMinifier, Minify};
pub use body::MinifyBody;
pub use cache::{CacheConfig, CacheStore, FileCache, MemoryCache};
pub use classify::{AssetType, Classification, TypeMatcher, TypeMatchers};
pub use dispatch::TransformDispatcher;
pub use error::{BackendError, CacheError, Stage, TransformFailure};
pub use future::ResponseFuture;
pub use key::CacheKey;
pub use layer::MinifyLayer;
pub use options::{CssOptions, JsOptions, TransformOptions};
pub use pipeline::{ErrorHandler, ErrorOutcome, default_error_handler};
pub use service::MinifyService;

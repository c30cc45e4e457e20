use serde::Serialize;
use sha2::{Digest, Sha256};

/// Per-response transform configuration.
///
/// A handler that wants to override the defaults inserts one of these into
/// the response's [`http::Extensions`] before returning; the middleware
/// removes it at classification time. A response without one is transformed
/// normally.
///
/// ```ignore
/// let mut response = http::Response::new(body);
/// response.extensions_mut().insert(
///     TransformOptions::default().minify(false),
/// );
/// ```
#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformOptions {
    /// When `Some(false)`, skips interception entirely for this response.
    pub enabled: Option<bool>,
    /// When `Some(false)`, skips the minify stage. Base formats pass through
    /// untouched; compiled formats are still compiled.
    pub minify: Option<bool>,
    /// When `Some(false)`, the transformed output is not written to cache.
    pub cache: Option<bool>,
    /// JavaScript minifier knobs.
    pub js: JsOptions,
    /// CSS minifier knobs.
    pub css: CssOptions,
    /// Free-form options forwarded to custom backends verbatim.
    pub extra: Option<serde_json::Value>,
}

impl TransformOptions {
    /// Sets the skip-entirely flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the minify-stage flag.
    pub fn minify(mut self, minify: bool) -> Self {
        self.minify = Some(minify);
        self
    }

    /// Sets the cache-write flag.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the JavaScript minifier options.
    pub fn js(mut self, js: JsOptions) -> Self {
        self.js = js;
        self
    }

    /// Sets the CSS minifier options.
    pub fn css(mut self, css: CssOptions) -> Self {
        self.css = css;
        self
    }

    /// Sets free-form backend options.
    pub fn extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }

    pub(crate) fn skip_entirely(&self) -> bool {
        self.enabled == Some(false)
    }

    pub(crate) fn minify_allowed(&self) -> bool {
        self.minify != Some(false)
    }

    pub(crate) fn cache_allowed(&self) -> bool {
        self.cache != Some(false)
    }

    pub(crate) fn cache_opted_in(&self) -> bool {
        self.cache == Some(true)
    }

    /// Feeds a canonical, deterministic encoding of the effective options
    /// into the digest. Field order is fixed; absent flags encode the same
    /// way on every call so identical options always hash identically.
    pub(crate) fn hash_into(&self, hasher: &mut Sha256) {
        fn flag(value: Option<bool>) -> u8 {
            match value {
                None => 0,
                Some(false) => 1,
                Some(true) => 2,
            }
        }

        hasher.update([
            flag(self.enabled),
            flag(self.minify),
            flag(self.cache),
            self.js.mangle as u8,
            self.js.keep_comments as u8,
            self.js.compress as u8,
            self.css.keep_comments as u8,
        ]);
        if let Some(extra) = &self.extra {
            hasher.update(extra.to_string().as_bytes());
        }
    }
}

/// Knobs forwarded to the JavaScript minifier backend.
#[derive(Debug, Clone, Serialize)]
pub struct JsOptions {
    /// Whether identifiers may be renamed.
    pub mangle: bool,
    /// Whether comments survive minification.
    pub keep_comments: bool,
    /// Whether expression-level compression is applied.
    pub compress: bool,
}

impl Default for JsOptions {
    fn default() -> Self {
        Self {
            mangle: true,
            keep_comments: false,
            compress: true,
        }
    }
}

/// Knobs forwarded to the CSS minifier backend.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CssOptions {
    /// Whether comments survive minification.
    pub keep_comments: bool,
}

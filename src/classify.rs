use crate::dispatch::TransformDispatcher;
use crate::options::TransformOptions;
use std::fmt;
use std::sync::Arc;

/// The detected logical format of a response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetType {
    /// Unrecognized content, never transformed.
    Plain,
    /// JavaScript source.
    Js,
    /// CSS source.
    Css,
    /// JSON content.
    Json,
    /// SASS/SCSS source, compiled to CSS.
    Sass,
    /// LESS source, compiled to CSS.
    Less,
    /// Stylus source, compiled to CSS.
    Stylus,
    /// CoffeeScript source, compiled to JavaScript.
    Coffee,
}

impl AssetType {
    /// Returns the outward-facing content type for compiled formats, or
    /// `None` for types whose content type is left untouched.
    pub fn base_content_type(&self) -> Option<&'static str> {
        match self {
            AssetType::Sass | AssetType::Less | AssetType::Stylus => Some("text/css"),
            AssetType::Coffee => Some("text/javascript"),
            _ => None,
        }
    }

    /// Returns true for formats that are already in their base form and
    /// only need a minify stage.
    pub fn is_base_format(&self) -> bool {
        matches!(self, AssetType::Js | AssetType::Css | AssetType::Json)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssetType::Plain => "plain",
            AssetType::Js => "js",
            AssetType::Css => "css",
            AssetType::Json => "json",
            AssetType::Sass => "sass",
            AssetType::Less => "less",
            AssetType::Stylus => "stylus",
            AssetType::Coffee => "coffee",
        };
        f.write_str(name)
    }
}

/// A predicate over the declared `Content-Type` of a response.
#[derive(Clone)]
pub struct TypeMatcher(Arc<dyn Fn(&str) -> bool + Send + Sync>);

impl TypeMatcher {
    /// Matches any content type containing the given substring.
    pub fn contains(needle: impl Into<String>) -> Self {
        let needle = needle.into();
        Self(Arc::new(move |ct| ct.contains(&needle)))
    }

    /// Matches the given content type exactly, ignoring any parameters
    /// (`text/custom; charset=utf-8` matches `text/custom`).
    pub fn exact(mime: impl Into<String>) -> Self {
        let mime = mime.into();
        Self(Arc::new(move |ct| {
            ct.split(';').next().is_some_and(|m| m.trim() == mime)
        }))
    }

    /// Matches content types for which the predicate returns true.
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub(crate) fn matches(&self, content_type: &str) -> bool {
        (self.0)(content_type)
    }
}

impl fmt::Debug for TypeMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeMatcher").finish_non_exhaustive()
    }
}

/// The per-family content-type matchers consulted at classification time.
///
/// Defaults mirror the conventional content types for each family:
/// `javascript`, `css`, `json`, `scss`, `less`, `stylus`, `coffeescript`
/// as substrings.
#[derive(Debug, Clone)]
pub struct TypeMatchers {
    /// Matcher for JavaScript responses.
    pub js: TypeMatcher,
    /// Matcher for CSS responses.
    pub css: TypeMatcher,
    /// Matcher for JSON responses.
    pub json: TypeMatcher,
    /// Matcher for SASS/SCSS responses.
    pub sass: TypeMatcher,
    /// Matcher for LESS responses.
    pub less: TypeMatcher,
    /// Matcher for Stylus responses.
    pub stylus: TypeMatcher,
    /// Matcher for CoffeeScript responses.
    pub coffee: TypeMatcher,
}

impl Default for TypeMatchers {
    fn default() -> Self {
        Self {
            js: TypeMatcher::contains("javascript"),
            css: TypeMatcher::contains("css"),
            json: TypeMatcher::contains("json"),
            sass: TypeMatcher::contains("scss"),
            less: TypeMatcher::contains("less"),
            stylus: TypeMatcher::contains("stylus"),
            coffee: TypeMatcher::contains("coffeescript"),
        }
    }
}

impl TypeMatchers {
    /// Runs the declared content type against the matchers in fixed order:
    /// compiled formats first (they imply a compile stage), then json, js,
    /// css. First match wins. A type whose backend is not registered in the
    /// dispatcher is treated as non-matching.
    pub(crate) fn classify(
        &self,
        content_type: &str,
        dispatcher: &TransformDispatcher,
    ) -> AssetType {
        let ordered = [
            (AssetType::Sass, &self.sass),
            (AssetType::Less, &self.less),
            (AssetType::Stylus, &self.stylus),
            (AssetType::Coffee, &self.coffee),
            (AssetType::Json, &self.json),
            (AssetType::Js, &self.js),
            (AssetType::Css, &self.css),
        ];

        for (asset_type, matcher) in ordered {
            if dispatcher.is_available(asset_type) && matcher.matches(content_type) {
                return asset_type;
            }
        }
        AssetType::Plain
    }
}

/// The per-response decision made once, when headers are finalized.
///
/// Immutable afterward; drives all downstream behavior for that response.
#[derive(Debug, Clone, Copy)]
pub struct Classification {
    /// The detected asset type.
    pub asset_type: AssetType,
    /// Whether the body is buffered and routed through the transform cycle.
    pub should_buffer: bool,
    /// Whether the minify stage runs.
    pub should_minify: bool,
    /// Whether transformed output may be written to cache.
    pub should_cache: bool,
}

impl Classification {
    /// Classifies a response from its declared content type and per-response
    /// options. `HEAD` responses, responses with the skip flag set, absent
    /// or unrecognized content types, and base formats with minification
    /// disabled all pass through untouched.
    pub(crate) fn new(
        is_head: bool,
        options: &TransformOptions,
        content_type: Option<&str>,
        matchers: &TypeMatchers,
        dispatcher: &TransformDispatcher,
    ) -> Self {
        let passthrough = Self {
            asset_type: AssetType::Plain,
            should_buffer: false,
            should_minify: false,
            should_cache: false,
        };

        if is_head || options.skip_entirely() {
            return passthrough;
        }
        let Some(content_type) = content_type else {
            return passthrough;
        };

        let asset_type = matchers.classify(content_type, dispatcher);
        if asset_type == AssetType::Plain {
            return passthrough;
        }
        if asset_type.is_base_format() && !options.minify_allowed() {
            return passthrough;
        }

        let should_minify = options.minify_allowed();
        // A response that opted out of minification is only compiled; its
        // output goes to cache only when the cache flag explicitly opts in.
        let should_cache = if should_minify {
            options.cache_allowed()
        } else {
            options.cache_opted_in()
        };

        Self {
            asset_type,
            should_buffer: true,
            should_minify,
            should_cache,
        }
    }
}

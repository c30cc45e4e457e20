use crate::backend::{Compile, JsonMinifier, Minify};
use crate::classify::AssetType;
use crate::error::{Stage, TransformFailure};
use crate::options::TransformOptions;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The registry mapping an asset type to its transform pipeline.
///
/// Base formats (js, css, json) run a single minify stage; compiled formats
/// (sass/less/stylus into css, coffee into js) run a compile stage followed
/// by the base format's minify stage. Backends are registered at
/// construction; a type with no backend is reported unavailable and never
/// matched during classification.
///
/// The default registry carries only the built-in [`JsonMinifier`]; every
/// other backend is injected.
#[derive(Clone)]
pub struct TransformDispatcher {
    js: Option<Arc<dyn Minify>>,
    css: Option<Arc<dyn Minify>>,
    json: Option<Arc<dyn Minify>>,
    sass: Option<Arc<dyn Compile>>,
    less: Option<Arc<dyn Compile>>,
    stylus: Option<Arc<dyn Compile>>,
    coffee: Option<Arc<dyn Compile>>,
}

impl Default for TransformDispatcher {
    fn default() -> Self {
        Self::empty().json_minifier(Arc::new(JsonMinifier))
    }
}

impl TransformDispatcher {
    /// Creates a registry with no backends at all, not even the built-in
    /// JSON minifier.
    pub fn empty() -> Self {
        Self {
            js: None,
            css: None,
            json: None,
            sass: None,
            less: None,
            stylus: None,
            coffee: None,
        }
    }

    /// Registers the JavaScript minifier backend.
    pub fn js_minifier(mut self, backend: Arc<dyn Minify>) -> Self {
        self.js = Some(backend);
        self
    }

    /// Registers the CSS minifier backend.
    pub fn css_minifier(mut self, backend: Arc<dyn Minify>) -> Self {
        self.css = Some(backend);
        self
    }

    /// Registers the JSON minifier backend.
    pub fn json_minifier(mut self, backend: Arc<dyn Minify>) -> Self {
        self.json = Some(backend);
        self
    }

    /// Registers the SASS compiler backend.
    pub fn sass_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.sass = Some(backend);
        self
    }

    /// Registers the LESS compiler backend.
    pub fn less_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.less = Some(backend);
        self
    }

    /// Registers the Stylus compiler backend.
    pub fn stylus_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.stylus = Some(backend);
        self
    }

    /// Registers the CoffeeScript compiler backend.
    pub fn coffee_compiler(mut self, backend: Arc<dyn Compile>) -> Self {
        self.coffee = Some(backend);
        self
    }

    /// Reports whether a pipeline is registered for the asset type.
    pub fn is_available(&self, asset_type: AssetType) -> bool {
        match asset_type {
            AssetType::Plain => false,
            AssetType::Js => self.js.is_some(),
            AssetType::Css => self.css.is_some(),
            AssetType::Json => self.json.is_some(),
            AssetType::Sass => self.sass.is_some(),
            AssetType::Less => self.less.is_some(),
            AssetType::Stylus => self.stylus.is_some(),
            AssetType::Coffee => self.coffee.is_some(),
        }
    }

    /// Runs the pipeline for the asset type over the full buffered body.
    ///
    /// Unregistered stages are identity. With `minify == false` in the
    /// options, compiled formats are compiled but not minified and base
    /// formats are returned unchanged.
    pub async fn process(
        &self,
        asset_type: AssetType,
        options: &TransformOptions,
        body: Bytes,
    ) -> Result<Bytes, TransformFailure> {
        debug!(asset_type = %asset_type, bytes = body.len(), "dispatching transform");
        match asset_type {
            AssetType::Plain => Ok(body),
            AssetType::Js => self.minify_base(&self.js, asset_type, options, body).await,
            AssetType::Css => self.minify_base(&self.css, asset_type, options, body).await,
            AssetType::Json => self.minify_base(&self.json, asset_type, options, body).await,
            AssetType::Sass => {
                self.compile_then_minify(&self.sass, &self.css, asset_type, options, body)
                    .await
            }
            AssetType::Less => {
                self.compile_then_minify(&self.less, &self.css, asset_type, options, body)
                    .await
            }
            AssetType::Stylus => {
                self.compile_then_minify(&self.stylus, &self.css, asset_type, options, body)
                    .await
            }
            AssetType::Coffee => {
                self.compile_then_minify(&self.coffee, &self.js, asset_type, options, body)
                    .await
            }
        }
    }

    async fn minify_base(
        &self,
        minifier: &Option<Arc<dyn Minify>>,
        asset_type: AssetType,
        options: &TransformOptions,
        body: Bytes,
    ) -> Result<Bytes, TransformFailure> {
        if !options.minify_allowed() {
            return Ok(body);
        }
        let Some(minifier) = minifier else {
            return Ok(body);
        };
        let source = String::from_utf8_lossy(&body);
        match minifier.minify(options, &source).await {
            Ok(minified) => Ok(Bytes::from(minified)),
            Err(error) => Err(TransformFailure {
                asset_type,
                stage: Stage::Minify,
                error,
                body,
            }),
        }
    }

    async fn compile_then_minify(
        &self,
        compiler: &Option<Arc<dyn Compile>>,
        minifier: &Option<Arc<dyn Minify>>,
        asset_type: AssetType,
        options: &TransformOptions,
        body: Bytes,
    ) -> Result<Bytes, TransformFailure> {
        let Some(compiler) = compiler else {
            return Ok(body);
        };
        let source = String::from_utf8_lossy(&body);
        let compiled = match compiler.compile(options, &source).await {
            Ok(compiled) => compiled,
            Err(error) => {
                return Err(TransformFailure {
                    asset_type,
                    stage: Stage::Compile,
                    error,
                    body,
                });
            }
        };

        if !options.minify_allowed() {
            return Ok(Bytes::from(compiled));
        }
        let Some(minifier) = minifier else {
            return Ok(Bytes::from(compiled));
        };
        match minifier.minify(options, &compiled).await {
            Ok(minified) => Ok(Bytes::from(minified)),
            Err(error) => Err(TransformFailure {
                asset_type,
                stage: Stage::Minify,
                error,
                // best available intermediate: the compiled base-format source
                body: Bytes::from(compiled),
            }),
        }
    }
}

impl fmt::Debug for TransformDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformDispatcher")
            .field("js", &self.js.is_some())
            .field("css", &self.css.is_some())
            .field("json", &self.json.is_some())
            .field("sass", &self.sass.is_some())
            .field("less", &self.less.is_some())
            .field("stylus", &self.stylus.is_some())
            .field("coffee", &self.coffee.is_some())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;

    /// Compiler test double that emits its input unchanged.
    pub(crate) struct IdentityCompiler;

    #[async_trait]
    impl Compile for IdentityCompiler {
        async fn compile(
            &self,
            _options: &TransformOptions,
            source: &str,
        ) -> Result<String, BackendError> {
            Ok(source.to_owned())
        }
    }

    /// Minifier test double that collapses whitespace runs to one space.
    pub(crate) struct WhitespaceMinifier;

    #[async_trait]
    impl Minify for WhitespaceMinifier {
        async fn minify(
            &self,
            _options: &TransformOptions,
            source: &str,
        ) -> Result<String, BackendError> {
            Ok(source.split_whitespace().collect::<Vec<_>>().join(" "))
        }
    }

    /// Compiler test double that prefixes its output, to make stage order
    /// observable.
    pub(crate) struct PrefixCompiler(pub &'static str);

    #[async_trait]
    impl Compile for PrefixCompiler {
        async fn compile(
            &self,
            _options: &TransformOptions,
            source: &str,
        ) -> Result<String, BackendError> {
            Ok(format!("{}{}", self.0, source))
        }
    }

    /// Backend test double that always fails.
    pub(crate) struct FailingBackend(pub &'static str);

    #[async_trait]
    impl Compile for FailingBackend {
        async fn compile(
            &self,
            _options: &TransformOptions,
            _source: &str,
        ) -> Result<String, BackendError> {
            Err(BackendError::new(self.0))
        }
    }

    #[async_trait]
    impl Minify for FailingBackend {
        async fn minify(
            &self,
            _options: &TransformOptions,
            _source: &str,
        ) -> Result<String, BackendError> {
            Err(BackendError::new(self.0))
        }
    }

    #[tokio::test]
    async fn test_plain_is_identity() {
        let dispatcher = TransformDispatcher::default();
        let body = Bytes::from_static(b"anything at  all");
        let out = dispatcher
            .process(AssetType::Plain, &TransformOptions::default(), body.clone())
            .await
            .unwrap();
        assert_eq!(out, body);
    }

    #[tokio::test]
    async fn test_base_format_minifies() {
        let dispatcher = TransformDispatcher::empty().js_minifier(Arc::new(WhitespaceMinifier));
        let out = dispatcher
            .process(
                AssetType::Js,
                &TransformOptions::default(),
                Bytes::from_static(b"var  x =  1;"),
            )
            .await
            .unwrap();
        assert_eq!(out, Bytes::from_static(b"var x = 1;"));
    }

    #[tokio::test]
    async fn test_compiled_format_runs_both_stages() {
        let dispatcher = TransformDispatcher::empty()
            .sass_compiler(Arc::new(PrefixCompiler("compiled:")))
            .css_minifier(Arc::new(WhitespaceMinifier));
        let out = dispatcher
            .process(
                AssetType::Sass,
                &TransformOptions::default(),
                Bytes::from_static(b"a  b"),
            )
            .await
            .unwrap();
        assert_eq!(out, Bytes::from_static(b"compiled:a b"));
    }

    #[tokio::test]
    async fn test_minify_disabled_still_compiles() {
        let dispatcher = TransformDispatcher::empty()
            .sass_compiler(Arc::new(PrefixCompiler("compiled:")))
            .css_minifier(Arc::new(WhitespaceMinifier));
        let out = dispatcher
            .process(
                AssetType::Sass,
                &TransformOptions::default().minify(false),
                Bytes::from_static(b"a  b"),
            )
            .await
            .unwrap();
        assert_eq!(out, Bytes::from_static(b"compiled:a  b"));
    }

    #[tokio::test]
    async fn test_compile_failure_tagged_with_original_body() {
        let dispatcher = TransformDispatcher::empty()
            .sass_compiler(Arc::new(FailingBackend("bad nesting")))
            .css_minifier(Arc::new(WhitespaceMinifier));
        let failure = dispatcher
            .process(
                AssetType::Sass,
                &TransformOptions::default(),
                Bytes::from_static(b"a {"),
            )
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Compile);
        assert_eq!(failure.asset_type, AssetType::Sass);
        assert_eq!(failure.body, Bytes::from_static(b"a {"));
        assert_eq!(failure.error.message(), "bad nesting");
    }

    #[tokio::test]
    async fn test_minify_failure_carries_compiled_intermediate() {
        let dispatcher = TransformDispatcher::empty()
            .coffee_compiler(Arc::new(PrefixCompiler("js:")))
            .js_minifier(Arc::new(FailingBackend("parse error")));
        let failure = dispatcher
            .process(
                AssetType::Coffee,
                &TransformOptions::default(),
                Bytes::from_static(b"square = (x) -> x * x"),
            )
            .await
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Minify);
        assert_eq!(failure.body, Bytes::from_static(b"js:square = (x) -> x * x"));
    }

    #[tokio::test]
    async fn test_missing_base_minifier_skips_minify_stage() {
        let dispatcher =
            TransformDispatcher::empty().stylus_compiler(Arc::new(PrefixCompiler("css:")));
        let out = dispatcher
            .process(
                AssetType::Stylus,
                &TransformOptions::default(),
                Bytes::from_static(b"body"),
            )
            .await
            .unwrap();
        assert_eq!(out, Bytes::from_static(b"css:body"));
    }

    #[test]
    fn test_availability() {
        let dispatcher = TransformDispatcher::default();
        assert!(dispatcher.is_available(AssetType::Json));
        assert!(!dispatcher.is_available(AssetType::Js));
        assert!(!dispatcher.is_available(AssetType::Sass));
        assert!(!dispatcher.is_available(AssetType::Plain));

        let dispatcher = dispatcher.js_minifier(Arc::new(WhitespaceMinifier));
        assert!(dispatcher.is_available(AssetType::Js));
    }
}

use crate::error::BackendError;
use crate::options::TransformOptions;
use async_trait::async_trait;

/// A minifier backend for a base format (js, css, json).
///
/// Backends may complete synchronously or await external work; both are
/// modeled uniformly as async calls. A backend reports failure through
/// [`BackendError`]; it never panics on malformed input.
#[async_trait]
pub trait Minify: Send + Sync {
    /// Produces a size-reduced, semantically equivalent rendition of the
    /// source.
    async fn minify(
        &self,
        options: &TransformOptions,
        source: &str,
    ) -> Result<String, BackendError>;
}

/// A compiler backend converting a source dialect into its base format
/// (sass/less/stylus into css, coffee into js).
#[async_trait]
pub trait Compile: Send + Sync {
    /// Compiles the source dialect into base-format output.
    async fn compile(
        &self,
        options: &TransformOptions,
        source: &str,
    ) -> Result<String, BackendError>;
}

/// The built-in JSON minifier: parse and reserialize compactly.
///
/// Registered by default; the only transform this crate implements itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMinifier;

#[async_trait]
impl Minify for JsonMinifier {
    async fn minify(
        &self,
        _options: &TransformOptions,
        source: &str,
    ) -> Result<String, BackendError> {
        let value: serde_json::Value = serde_json::from_str(source)?;
        Ok(value.to_string())
    }
}

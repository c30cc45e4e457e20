use crate::classify::AssetType;
use bytes::Bytes;
use thiserror::Error;

/// The transform stage at which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Compiling a source dialect into its base format (sass/less/stylus/coffee).
    Compile,
    /// Minifying base-format content (js/css/json).
    Minify,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Compile => f.write_str("compile"),
            Stage::Minify => f.write_str("minify"),
        }
    }
}

/// A diagnostic reported by a compiler or minifier backend.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(String);

impl BackendError {
    /// Creates a backend error from a diagnostic message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    /// Returns the diagnostic message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        Self(err.to_string())
    }
}

/// A failed transform, tagged with the stage that rejected its input.
///
/// Carries the input to the failing stage: for a minify failure after a
/// successful compile, that is the compiled intermediate rather than the
/// bytes the handler originally wrote.
#[derive(Debug, Error)]
#[error("{stage} stage failed for {asset_type}: {error}")]
pub struct TransformFailure {
    /// The classified asset type being transformed.
    pub asset_type: AssetType,
    /// The stage that reported the failure.
    pub stage: Stage,
    /// The backend diagnostic.
    pub error: BackendError,
    /// The input to the failing stage.
    pub body: Bytes,
}

/// A durable cache read or write failure.
///
/// Never surfaced to the client: reads degrade to a miss, writes are logged
/// and the response is served uncached.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store failed an I/O operation.
    #[error("cache i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Reason an engine-side image object could not be created.
///
/// Never surfaced to the declarative caller: the layer controller logs it
/// and the layer simply does not appear.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Descriptor could not be fetched (network, 404, CORS).
    Fetch(String),
    /// Descriptor fetched but not understood.
    InvalidSource(String),
    /// Engine was torn down before the image could be added.
    EngineGone,
    Other(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Fetch(e) => write!(f, "Fetch error: {}", e),
            LoadError::InvalidSource(e) => write!(f, "Invalid tile source: {}", e),
            LoadError::EngineGone => write!(f, "Viewer destroyed before load completed"),
            LoadError::Other(e) => write!(f, "Load error: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

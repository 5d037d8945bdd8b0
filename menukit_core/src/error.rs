use thiserror::Error;

/// Failures raised by the host's surface provider.
#[derive(Debug, Error)]
pub enum SurfaceError {
    /// The designated surface cannot be created or is gone; the open is
    /// aborted and no partial state may be registered.
    #[error("surface unavailable: {0}")]
    Unavailable(String),
}

use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid configuration value or structure.
    #[error("Configuration invalide : {0}")]
    Config(String),

    /// Referenced file does not exist.
    #[error("Fichier introuvable : {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// Unsupported file or data format.
    #[error("Format non supporté : {format}")]
    UnsupportedFormat {
        /// The format string that is unsupported.
        format: String,
    },

    /// Invalid width/height dimensions (zero-sized source or grid).
    #[error("Dimensions invalides : {width}×{height}")]
    InvalidDimensions {
        /// Width value.
        width: u32,
        /// Height value.
        height: u32,
    },

    /// The source never signalled seek completion within the allotted time.
    #[error("Seek à {at_secs:.3}s non terminé après {timeout_ms} ms")]
    SeekTimeout {
        /// Requested timestamp in seconds.
        at_secs: f64,
        /// Timeout that expired, in milliseconds.
        timeout_ms: u64,
    },
}

//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers every failure mode of the
//! rendering core:
//! - Stale or out-of-range handles
//! - Shader stage compilation and program link failures
//! - Incomplete render targets
//! - Resource loading and decoding failures
//! - GPU adapter, device and surface setup failures
//!
//! # Propagation
//!
//! Setup code returns [`Result<T>`] and aborts on the first failure. Code that
//! runs mid-frame logs the error and skips the affected pass instead, so a
//! missing program degrades the image rather than the frame loop.
//!
//! ```rust,ignore
//! use penumbra_core::errors::{RenderError, Result};
//!
//! fn init() -> Result<()> {
//!     Err(RenderError::UnknownRenderer("raytraced".into()))
//! }
//! ```

use thiserror::Error;

/// The main error type for the Penumbra rendering core.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Handle Errors
    // ========================================================================
    /// A handle that does not resolve: stale, never issued, or the invalid sentinel.
    #[error("Invalid {kind} handle: {id}")]
    InvalidHandle {
        /// Resource category (`"mesh"`, `"texture"`, `"scene object"`, ...)
        kind: &'static str,
        /// Raw handle value, formatted for diagnostics
        id: String,
    },

    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// A shader stage failed to compile or the program failed to link.
    #[error("Shader compile failure in '{label}': {log}")]
    ShaderCompileFailure {
        /// Program label
        label: String,
        /// Diagnostic text reported by the backend
        log: String,
    },

    /// A render target's attachments are inconsistent.
    #[error("Render target incomplete: {0}")]
    RenderTargetIncomplete(String),

    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request GPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create GPU device: {0}")]
    DeviceRequestFailed(String),

    /// Surface creation, configuration or acquisition failed.
    #[error("Surface error: {0}")]
    SurfaceError(String),

    /// A frame was requested before the render system was initialized.
    #[error("Render system is not initialized")]
    NotInitialized,

    /// A renderer name other than `"deferred"` or `"forward"` was requested.
    #[error("Unknown renderer: {0}")]
    UnknownRenderer(String),

    // ========================================================================
    // Resource Loading Errors
    // ========================================================================
    /// A file could not be found, read or decoded.
    #[error("Failed to load '{path}': {reason}")]
    ResourceLoadFailure {
        /// Path or key that was being loaded
        path: String,
        /// What went wrong
        reason: String,
    },

    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration parse error.
    #[error("Config error: {0}")]
    ConfigError(String),
}

impl RenderError {
    /// Shorthand for [`RenderError::InvalidHandle`].
    #[must_use]
    pub fn invalid_handle(kind: &'static str, id: impl std::fmt::Debug) -> Self {
        Self::InvalidHandle {
            kind,
            id: format!("{id:?}"),
        }
    }

    /// Shorthand for [`RenderError::ResourceLoadFailure`].
    #[must_use]
    pub fn load_failure(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::ResourceLoadFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;

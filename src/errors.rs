//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`ArborError`] covers all failure modes including:
//! - Invalid user input at API boundaries
//! - GPU adapter/device acquisition failures
//! - Pipeline and shader build failures
//! - Device loss
//!
//! All public APIs return [`Result<T>`], an alias for
//! `std::result::Result<T, ArborError>`. Constructor-time validation fails
//! eagerly; per-frame traversals log and skip soft failures instead of
//! returning errors (see the draw traversal).

use thiserror::Error;

/// The main error type for the Arbor engine.
#[derive(Error, Debug)]
pub enum ArborError {
    // ========================================================================
    // Input Validation Errors
    // ========================================================================
    /// Bad parameters passed to a public API (negative viewport dimensions,
    /// non-finite numeric inputs, malformed index arrays, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A mandatory field was read before it was set.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // ========================================================================
    // GPU & Rendering Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter or configure the surface.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation or pipeline assembly failed.
    #[error("Failed to build pipeline for shader '{shader}': {log}")]
    PipelineBuildFailed {
        /// Name of the shader whose pipeline failed to build
        shader: String,
        /// Compile or validation log
        log: String,
    },

    /// The GPU device was lost; rendering quiesces until a new device is
    /// installed.
    #[error("Device lost ({reason}): {message}")]
    DeviceLost {
        /// Backend-reported loss reason
        reason: String,
        /// Backend-reported description
        message: String,
    },

    /// A synchronous `render()` was invoked while a frame is already being
    /// rendered.
    #[error("A render is already in progress")]
    RenderInProgress,

    // ========================================================================
    // Internal Errors
    // ========================================================================
    /// A defensive invariant check failed. These are fatal.
    #[error("Internal invariant violated: {0}")]
    InternalInvariant(String),
}

/// Alias for `Result<T, ArborError>`.
pub type Result<T> = std::result::Result<T, ArborError>;

//! Error types for the Orbit3D rendering layer
//!
//! This module defines the error taxonomy shared by buffers, GPU program
//! parameters and the managers that own them.

use std::fmt;

/// Result type for Orbit3D operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orbit3D errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Lock, read or write region outside the buffer extent
    BoundsViolation(String),

    /// Double lock, unlock without lock, shrinking a growable list...
    StateViolation(String),

    /// The active render system lacks a required capability
    Unsupported(String),

    /// Factory, language, program or named constant not found
    NotFound(String),

    /// Operation the active backend does not provide
    Unimplemented(String),

    /// Invalid resource (buffer, program, parameter definition, ...)
    InvalidResource(String),

    /// Backend-specific error (poisoned lock, device failure, ...)
    BackendError(String),

    /// Initialization failed (context, managers, factories)
    InitializationFailed(String),

    /// Out of memory
    OutOfMemory,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BoundsViolation(msg) => write!(f, "Bounds violation: {}", msg),
            Error::StateViolation(msg) => write!(f, "State violation: {}", msg),
            Error::Unsupported(msg) => write!(f, "Unsupported operation: {}", msg),
            Error::NotFound(msg) => write!(f, "Not found: {}", msg),
            Error::Unimplemented(msg) => write!(f, "Unimplemented: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an error and build it
///
/// Without a variant the error is an `Error::InvalidResource`.
///
/// # Example
///
/// ```no_run
/// use orbit3d_render::orbit_err;
///
/// let err = orbit_err!("orbit3d::HardwareBuffer", "Buffer '{}' is empty", 3);
/// let err = orbit_err!(BoundsViolation => "orbit3d::HardwareBuffer", "Offset {} too large", 64);
/// ```
#[macro_export]
macro_rules! orbit_err {
    ($kind:ident => $source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::orbit_error!($source, "{}", message);
        $crate::orbit3d::Error::$kind(message)
    }};
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::orbit_error!($source, "{}", message);
        $crate::orbit3d::Error::InvalidResource(message)
    }};
}

/// Log an error and return it from the current function
///
/// # Example
///
/// ```no_run
/// use orbit3d_render::orbit_bail;
///
/// fn check(size: usize) -> orbit3d_render::orbit3d::Result<()> {
///     if size == 0 {
///         orbit_bail!(StateViolation => "orbit3d::Example", "size must not be zero");
///     }
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! orbit_bail {
    ($($arg:tt)*) => {
        return Err($crate::orbit_err!($($arg)*))
    };
}

/// Map a poisoned lock to a backend error
pub(crate) fn poisoned(what: &str) -> Error {
    crate::orbit_error!("orbit3d::Sync", "{} lock poisoned", what);
    Error::BackendError(format!("{} lock poisoned", what))
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;

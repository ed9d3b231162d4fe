//! Error taxonomy for the scripting host.
//!
//! Every failure is returned as a value; no category aborts the host
//! process.  Construction-time categories ([`Error::UnsupportedCapability`],
//! [`Error::Install`]) mean no usable [`Runner`](crate::Runner) exists.
//! Call-time categories are fatal to the current call only; the Runner
//! stays reusable and resets its session before the next call where the
//! state machine requires it.

use std::fmt;

use thiserror::Error;

/// Which way a value was crossing the host/script boundary when a
/// conversion failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Host value into the script value model.
    ToScript,
    /// Script value back into a host value.
    ToNative,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ToScript => f.write_str("host to script"),
            Direction::ToNative => f.write_str("script to host"),
        }
    }
}

/// A value could not cross the host/script boundary.
///
/// Carries the direction and a message naming the offending shape or key.
/// Stands alone (rather than as a bare `Error` variant) so the marshaling
/// serializers can use it as their `serde::ser::Error` type.
#[derive(Debug, Clone, Error)]
#[error("conversion failed ({direction}): {message}")]
pub struct ConversionError {
    pub direction: Direction,
    pub message: String,
}

impl ConversionError {
    pub(crate) fn to_script(message: impl Into<String>) -> Self {
        ConversionError { direction: Direction::ToScript, message: message.into() }
    }

    pub(crate) fn to_native(message: impl Into<String>) -> Self {
        ConversionError { direction: Direction::ToNative, message: message.into() }
    }
}

impl serde::ser::Error for ConversionError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ConversionError::to_script(msg.to_string())
    }
}

/// Top-level error type returned by [`Runner`](crate::Runner) operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Capability name absent from the registry.  Construction only.
    #[error("unsupported capability: {0}")]
    UnsupportedCapability(String),

    /// A resolved capability failed to install into a fresh session.
    /// Raised at construction, or from a call that had to rebuild a dirty
    /// session.
    #[error("cannot install capability {name}: {source}")]
    Install {
        name: String,
        source: mlua::Error,
    },

    /// Value marshaling failed; the current call is abandoned.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Source text failed to load into the session; no function call ran.
    #[error("cannot load source into session: {0}")]
    Load(#[source] mlua::Error),

    /// The protected call failed: the function was missing or not callable,
    /// or the script raised an error.  The engine's own error is kept as
    /// the cause.
    #[error("cannot run script function {function}: {source}")]
    Execution {
        function: String,
        source: mlua::Error,
    },

    /// Incidental engine failure outside the categories above (e.g.
    /// allocating a string or table while pushing arguments).
    #[error("script engine error: {0}")]
    Engine(#[from] mlua::Error),
}

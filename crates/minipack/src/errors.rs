//! Error taxonomy for the bundler.
//!
//! Every error here is fatal: the build aborts at the failure point, no
//! partial module table is salvaged, and no later hook fires.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal build errors, each carrying enough context to identify the
/// offending file, rule, or loader.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Malformed configuration: bad rule shape, invalid `test` pattern, or a
    /// rule referencing a loader that was never registered.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A module file could not be read during dependency resolution.
    #[error("failed to read module `{}`", .path.display())]
    Resolution {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A loader transform raised while processing a module.
    #[error("loader `{loader}` failed on `{}`: {message}", .path.display())]
    Loader {
        loader: String,
        path: PathBuf,
        message: String,
    },

    /// A module's source could not be parsed into an editable syntax tree.
    #[error("failed to parse `{}`: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    /// The final bundle could not be written.
    #[error("failed to write bundle to `{}`", .path.display())]
    Emit {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A hook registration or invocation failed.
    #[error(transparent)]
    Hook(#[from] HookError),
}

/// Errors raised by the hook dispatcher.
#[derive(Debug, Error)]
pub enum HookError {
    /// A plugin tapped a hook name the compiler never declared.
    #[error("cannot tap unknown hook `{0}`")]
    UnknownHook(String),

    /// An asynchronous hook callback failed; surfaced to the caller of
    /// `call_async` with the first failure in registration order.
    #[error("hook `{hook}` callback `{tap}` failed: {message}")]
    Callback {
        hook: String,
        tap: String,
        message: String,
    },
}

//! minipack: a minimal module bundler.
//!
//! Starting from a configured entry module, minipack recursively
//! resolves `require("…")` dependencies, runs each module through a
//! rule-matched loader pipeline, rewrites the import calls into runtime
//! accessor calls, and emits a single self-contained bundle file.

pub mod compiler;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod hooks;
pub mod loaders;
pub mod plugin;
pub mod resolver;
pub mod rewriter;
pub mod types;

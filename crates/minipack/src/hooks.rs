//! Typed lifecycle hooks.
//!
//! Plugins observe the build through named extension points. Two kinds
//! exist: [`SyncHook`] runs its callbacks sequentially in registration
//! order, [`AsyncHook`] fans its callbacks out across scoped threads and
//! joins all of them before returning. The compiler itself only declares
//! synchronous hooks; the asynchronous kind is a generic facility for
//! other consumers.

use std::{fmt, path::Path, thread};

use crate::errors::HookError;

struct SyncTap<T: ?Sized> {
    name: String,
    callback: Box<dyn Fn(&T)>,
}

/// A synchronous extension point.
///
/// Callbacks run in registration order and their return values are
/// ignored; `call` returns only after the last one has.
pub struct SyncHook<T: ?Sized> {
    name: &'static str,
    taps: Vec<SyncTap<T>>,
}

impl<T: ?Sized> SyncHook<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: Vec::new(),
        }
    }

    /// The hook's declared name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a named callback.
    pub fn tap(&mut self, tap_name: impl Into<String>, callback: impl Fn(&T) + 'static) {
        self.taps.push(SyncTap {
            name: tap_name.into(),
            callback: Box::new(callback),
        });
    }

    /// Fire every callback in registration order.
    pub fn call(&self, arg: &T) {
        for tap in &self.taps {
            log::trace!("firing sync hook `{}` tap `{}`", self.name, tap.name);
            (tap.callback)(arg);
        }
    }

    pub fn is_tapped(&self) -> bool {
        !self.taps.is_empty()
    }
}

impl<T: ?Sized> fmt::Debug for SyncHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncHook")
            .field("name", &self.name)
            .field("taps", &self.taps.len())
            .finish()
    }
}

struct AsyncTap<T: ?Sized> {
    name: String,
    callback: Box<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>,
}

/// An asynchronous parallel extension point.
///
/// `call_async` starts every callback concurrently and completes only
/// once all of them have signaled completion (fan-out/fan-in barrier).
/// Callbacks must not assume any ordering relative to each other.
pub struct AsyncHook<T: ?Sized + Sync> {
    name: &'static str,
    taps: Vec<AsyncTap<T>>,
}

impl<T: ?Sized + Sync> AsyncHook<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            taps: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a named fallible callback.
    pub fn tap_async(
        &mut self,
        tap_name: impl Into<String>,
        callback: impl Fn(&T) -> anyhow::Result<()> + Send + Sync + 'static,
    ) {
        self.taps.push(AsyncTap {
            name: tap_name.into(),
            callback: Box::new(callback),
        });
    }

    /// Fire every callback concurrently and wait for all of them.
    ///
    /// If any callback fails, the first failure in registration order is
    /// returned after the barrier; a panicking callback is reported as a
    /// failed callback rather than tearing down the process.
    pub fn call_async(&self, arg: &T) -> Result<(), HookError> {
        if self.taps.is_empty() {
            return Ok(());
        }

        let results: Vec<thread::Result<anyhow::Result<()>>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .taps
                .iter()
                .map(|tap| scope.spawn(move || (tap.callback)(arg)))
                .collect();
            handles.into_iter().map(|handle| handle.join()).collect()
        });

        for (tap, result) in self.taps.iter().zip(results) {
            let message = match result {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => format!("{err:#}"),
                Err(_) => "callback panicked".to_string(),
            };
            return Err(HookError::Callback {
                hook: self.name.to_string(),
                tap: tap.name.clone(),
                message,
            });
        }
        Ok(())
    }

    pub fn is_tapped(&self) -> bool {
        !self.taps.is_empty()
    }
}

impl<T: ?Sized + Sync> fmt::Debug for AsyncHook<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncHook")
            .field("name", &self.name)
            .field("taps", &self.taps.len())
            .finish()
    }
}

/// The six lifecycle hooks declared by the compiler, fired in this order
/// on a successful build: `start`, `compile`, `afterCompile`, `emit`,
/// `afterEmit`, `done`.
#[derive(Debug)]
pub struct CompilerHooks {
    pub start: SyncHook<()>,
    /// Fired with the entry module's configured relative path.
    pub compile: SyncHook<str>,
    pub after_compile: SyncHook<()>,
    /// Fired with the configured output filename, before rendering.
    pub emit: SyncHook<str>,
    /// Fired with the full output path, after a successful write.
    pub after_emit: SyncHook<Path>,
    pub done: SyncHook<()>,
}

impl CompilerHooks {
    pub fn new() -> Self {
        Self {
            start: SyncHook::new("start"),
            compile: SyncHook::new("compile"),
            after_compile: SyncHook::new("afterCompile"),
            emit: SyncHook::new("emit"),
            after_emit: SyncHook::new("afterEmit"),
            done: SyncHook::new("done"),
        }
    }

    /// Tap a hook by its declared name.
    ///
    /// This is the string-addressed surface for plugins that pick hooks
    /// dynamically; the payload is rendered to a string (empty for the
    /// argument-less hooks). Unknown names fail with
    /// [`HookError::UnknownHook`].
    pub fn tap_named(
        &mut self,
        hook: &str,
        tap_name: &str,
        callback: impl Fn(&str) + 'static,
    ) -> Result<(), HookError> {
        match hook {
            "start" => self.start.tap(tap_name, move |()| callback("")),
            "compile" => self.compile.tap(tap_name, move |path| callback(path)),
            "afterCompile" => self.after_compile.tap(tap_name, move |()| callback("")),
            "emit" => self.emit.tap(tap_name, move |filename| callback(filename)),
            "afterEmit" => self
                .after_emit
                .tap(tap_name, move |path| callback(&path.to_string_lossy())),
            "done" => self.done.tap(tap_name, move |()| callback("")),
            other => return Err(HookError::UnknownHook(other.to_string())),
        }
        Ok(())
    }
}

impl Default for CompilerHooks {
    fn default() -> Self {
        Self::new()
    }
}

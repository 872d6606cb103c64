//! Plugin surface.
//!
//! Plugins are applied exactly once, synchronously, when the compiler is
//! constructed. They receive only the hook surface, never the resolver
//! or its state.

use crate::hooks::CompilerHooks;

/// An external collaborator that taps lifecycle hooks at startup.
pub trait Plugin {
    fn apply(&self, hooks: &mut CompilerHooks);
}

/// Logs every build phase; the default plugin installed by the CLI.
#[derive(Debug)]
pub struct BuildLogPlugin;

impl Plugin for BuildLogPlugin {
    fn apply(&self, hooks: &mut CompilerHooks) {
        hooks
            .start
            .tap("BuildLogPlugin", |()| log::info!("build started"));
        hooks.compile.tap("BuildLogPlugin", |entry: &str| {
            log::info!("compiling from `{entry}`");
        });
        hooks
            .after_compile
            .tap("BuildLogPlugin", |()| log::info!("compilation finished"));
        hooks.emit.tap("BuildLogPlugin", |filename: &str| {
            log::info!("emitting `{filename}`");
        });
        hooks.after_emit.tap("BuildLogPlugin", |path| {
            log::info!("bundle written to {}", path.display());
        });
        hooks
            .done
            .tap("BuildLogPlugin", |()| log::info!("build done"));
    }
}

//! Build orchestration.
//!
//! The compiler owns the configuration and the hook instance, applies
//! plugins once at construction, and sequences the build:
//! `start` hook, `compile` hook, dependency resolution, `afterCompile`
//! hook, emission (which fires `emit`/`afterEmit`), `done` hook. Every
//! error is fatal and skips all later hooks.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    config::Config,
    emitter::{BundleTemplate, Emitter, PythonRuntime},
    errors::BundleError,
    hooks::CompilerHooks,
    loaders::{LoaderPipeline, LoaderRegistry},
    plugin::Plugin,
    resolver::DependencyResolver,
};

/// Build lifecycle states. `Failed` is reachable from any non-terminal
/// state; there is no recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Created,
    Started,
    Compiling,
    Compiled,
    Emitting,
    Done,
    Failed,
}

/// The build orchestrator.
pub struct Compiler {
    config: Config,
    root: PathBuf,
    hooks: CompilerHooks,
    registry: LoaderRegistry,
    template: Box<dyn BundleTemplate>,
    phase: BuildPhase,
}

impl Compiler {
    /// Construct a compiler, validating rule loader references and
    /// applying every plugin exactly once, in order.
    pub fn new(
        config: Config,
        root: PathBuf,
        registry: LoaderRegistry,
        plugins: &[Box<dyn Plugin>],
    ) -> Result<Self, BundleError> {
        for (index, rule) in config.module.rules.iter().enumerate() {
            for name in rule.use_.loader_names() {
                if !registry.contains(name) {
                    return Err(BundleError::Config(format!(
                        "rule #{index} (test `{}`) references unknown loader `{name}`",
                        rule.test.as_str()
                    )));
                }
            }
        }

        let mut hooks = CompilerHooks::new();
        for plugin in plugins {
            plugin.apply(&mut hooks);
        }

        Ok(Self {
            config,
            root,
            hooks,
            registry,
            template: Box::new(PythonRuntime),
            phase: BuildPhase::Created,
        })
    }

    /// Swap the bundle template; defaults to [`PythonRuntime`].
    pub fn with_template(mut self, template: Box<dyn BundleTemplate>) -> Self {
        self.template = template;
        self
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn hooks(&self) -> &CompilerHooks {
        &self.hooks
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the whole build, returning the output path on success.
    pub fn run(&mut self) -> Result<PathBuf, BundleError> {
        let result = self.run_build();
        if result.is_err() {
            self.phase = BuildPhase::Failed;
        }
        result
    }

    fn run_build(&mut self) -> Result<PathBuf, BundleError> {
        self.phase = BuildPhase::Started;
        self.hooks.start.call(&());

        self.phase = BuildPhase::Compiling;
        self.hooks.compile.call(&self.config.entry);
        let pipeline = LoaderPipeline::new(&self.config.module.rules, &self.registry);
        let modules = DependencyResolver::new(&self.root, pipeline).run(&self.config.entry)?;

        self.phase = BuildPhase::Compiled;
        self.hooks.after_compile.call(&());

        self.phase = BuildPhase::Emitting;
        let emitter = Emitter::new(&self.root, &self.hooks, self.template.as_ref());
        let output_path = emitter.emit(&self.config.entry, &modules, &self.config.output)?;

        self.phase = BuildPhase::Done;
        self.hooks.done.call(&());
        Ok(output_path)
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("root", &self.root)
            .field("entry", &self.config.entry)
            .field("phase", &self.phase)
            .finish()
    }
}

//! Dependency resolution.
//!
//! Walks the import graph depth-first from the entry module, running each
//! module through the loader pipeline and the import rewriter, and
//! records the rewritten source in the module table under a canonical
//! root-relative key.

use std::{
    fs,
    path::{Component, Path},
};

use crate::{errors::BundleError, loaders::LoaderPipeline, rewriter, types::FxIndexMap};

/// Canonical module key to final rewritten source, in resolution order.
pub type ModuleTable = FxIndexMap<String, String>;

/// Recursive depth-first resolver; owns the module table for the
/// duration of the compile phase.
#[derive(Debug)]
pub struct DependencyResolver<'a> {
    root: &'a Path,
    pipeline: LoaderPipeline<'a>,
    modules: ModuleTable,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(root: &'a Path, pipeline: LoaderPipeline<'a>) -> Self {
        Self {
            root,
            pipeline,
            modules: ModuleTable::default(),
        }
    }

    /// Resolve the entry module and everything reachable from it,
    /// yielding the completed module table.
    pub fn run(mut self, entry: &str) -> Result<ModuleTable, BundleError> {
        let entry_path = self.root.join(entry);
        self.resolve(&entry_path, entry)?;
        Ok(self.modules)
    }

    /// Resolve one module and recurse into its dependencies, pre-order.
    fn resolve(&mut self, module_path: &Path, specifier: &str) -> Result<(), BundleError> {
        let key = self.table_key(module_path);
        // A key already in the table is already resolved; skipping here
        // terminates circular graphs and de-duplicates diamond imports.
        if self.modules.contains_key(&key) {
            log::trace!("skipping `{specifier}`, `{key}` already resolved");
            return Ok(());
        }

        let source = fs::read_to_string(module_path).map_err(|err| BundleError::Resolution {
            path: module_path.to_path_buf(),
            source: err,
        })?;
        let source = self.pipeline.run(module_path, source)?;
        let output = rewriter::rewrite(module_path, &source)?;

        log::debug!(
            "resolved `{specifier}` as `{key}` with {} dependencies",
            output.dependencies.len()
        );
        self.modules.insert(key, output.source);

        for dependency in &output.dependencies {
            let dependency_path = self.root.join(dependency);
            self.resolve(&dependency_path, dependency)?;
        }
        Ok(())
    }

    /// Canonical table key: root-relative, forward-slash normalized,
    /// `./`-prefixed.
    fn table_key(&self, module_path: &Path) -> String {
        let relative = module_path.strip_prefix(self.root).unwrap_or(module_path);
        let parts: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect();
        format!("./{}", parts.join("/"))
    }
}

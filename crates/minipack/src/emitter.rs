//! Bundle emission.
//!
//! Renders the completed module table through a [`BundleTemplate`] and
//! writes the result to the configured output location, firing the
//! `emit` and `afterEmit` hooks around the write.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use crate::{
    config::OutputConfig,
    errors::BundleError,
    hooks::CompilerHooks,
    resolver::ModuleTable,
    rewriter::RUNTIME_ACCESSOR,
};

/// The templating capability: turns an entry pointer plus module table
/// into final bundle text. The rendered runtime format is the template's
/// own business; the bundler only contracts on this input shape.
pub trait BundleTemplate {
    fn render(&self, entry: &str, modules: &ModuleTable) -> String;
}

/// Default template: a self-contained Python file with a module-source
/// table, a caching `__minipack_require__` accessor, and a closing call
/// for the entry module.
#[derive(Debug)]
pub struct PythonRuntime;

impl BundleTemplate for PythonRuntime {
    fn render(&self, entry: &str, modules: &ModuleTable) -> String {
        let mut out = String::new();
        out.push_str("# Generated by minipack. Do not edit.\n");
        out.push_str("_MODULES = {\n");
        for (key, source) in modules {
            out.push_str("    ");
            out.push_str(&python_string(key));
            out.push_str(": ");
            out.push_str(&python_string(source));
            out.push_str(",\n");
        }
        out.push_str("}\n\n_CACHE = {}\n\n\n");
        out.push_str(&format!(
            "def {RUNTIME_ACCESSOR}(key):\n    if key in _CACHE:\n        return _CACHE[key]\n    namespace = {{\"{RUNTIME_ACCESSOR}\": {RUNTIME_ACCESSOR}}}\n    _CACHE[key] = namespace\n    exec(_MODULES[key], namespace)\n    return namespace\n\n\n"
        ));
        out.push_str(&format!("{RUNTIME_ACCESSOR}({})\n", python_string(entry)));
        out
    }
}

/// A double-quoted Python string literal with the content escaped.
fn python_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Writes the rendered bundle, firing emit hooks around the write.
pub struct Emitter<'a> {
    root: &'a Path,
    hooks: &'a CompilerHooks,
    template: &'a dyn BundleTemplate,
}

impl<'a> Emitter<'a> {
    pub fn new(root: &'a Path, hooks: &'a CompilerHooks, template: &'a dyn BundleTemplate) -> Self {
        Self {
            root,
            hooks,
            template,
        }
    }

    /// Render and write the bundle, returning the full output path.
    pub fn emit(
        &self,
        entry: &str,
        modules: &ModuleTable,
        output: &OutputConfig,
    ) -> Result<PathBuf, BundleError> {
        self.hooks.emit.call(&output.filename);

        let rendered = self.template.render(entry, modules);
        let output_dir = self.root.join(&output.path);
        fs::create_dir_all(&output_dir).map_err(|err| BundleError::Emit {
            path: output_dir.clone(),
            source: err,
        })?;
        let output_path = output_dir.join(&output.filename);
        fs::write(&output_path, rendered).map_err(|err| BundleError::Emit {
            path: output_path.clone(),
            source: err,
        })?;
        log::info!(
            "emitted bundle with {} modules to {}",
            modules.len(),
            output_path.display()
        );

        self.hooks.after_emit.call(&output_path);
        Ok(output_path)
    }
}

impl fmt::Debug for Emitter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn sample_table() -> ModuleTable {
        let mut table = ModuleTable::default();
        table.insert(
            "./src/index.py".to_string(),
            "foo = __minipack_require__(\"./src/foo.py\")".to_string(),
        );
        table.insert("./src/foo.py".to_string(), "value = 42".to_string());
        table
    }

    #[test]
    fn rendered_bundle_contains_every_module_and_the_entry_pointer() {
        let rendered = PythonRuntime.render("./src/index.py", &sample_table());
        assert!(rendered.contains("\"./src/index.py\""));
        assert!(rendered.contains("\"./src/foo.py\""));
        assert!(rendered.ends_with("__minipack_require__(\"./src/index.py\")\n"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let table = sample_table();
        let first = PythonRuntime.render("./src/index.py", &table);
        let second = PythonRuntime.render("./src/index.py", &table);
        assert_eq!(first, second);
    }

    #[test]
    fn emit_writes_the_bundle_and_fires_hooks_in_order() {
        let temp = TempDir::new().unwrap();
        let events = Arc::new(Mutex::new(Vec::new()));

        let mut hooks = CompilerHooks::new();
        let sink = Arc::clone(&events);
        hooks.emit.tap("test", move |filename: &str| {
            sink.lock().unwrap().push(format!("emit:{filename}"));
        });
        let sink = Arc::clone(&events);
        hooks.after_emit.tap("test", move |path: &Path| {
            sink.lock()
                .unwrap()
                .push(format!("afterEmit:{}", path.display()));
        });

        let output = OutputConfig {
            path: PathBuf::from("dist"),
            filename: "bundle.py".to_string(),
        };
        let template = PythonRuntime;
        let emitter = Emitter::new(temp.path(), &hooks, &template);
        let written = emitter
            .emit("./src/index.py", &sample_table(), &output)
            .unwrap();

        assert_eq!(written, temp.path().join("dist").join("bundle.py"));
        assert!(written.exists());

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], "emit:bundle.py");
        assert!(events[1].starts_with("afterEmit:"));
        assert!(events[1].ends_with("bundle.py"));
    }

    #[test]
    fn python_string_escapes_quotes_newlines_and_backslashes() {
        assert_eq!(
            python_string("line \"one\"\nc:\\path\t"),
            "\"line \\\"one\\\"\\nc:\\\\path\\t\""
        );
    }
}

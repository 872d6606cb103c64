//! Loader pipeline: per-file source transforms applied before parsing.
//!
//! Loaders are external collaborators registered by name; rules pair a
//! path predicate with the loaders to run. Loaders are pure with respect
//! to build state: they see source text and options, never the module
//! table or the hooks.

use std::{fmt, path::Path};

use crate::{
    config::{LoaderUse, Rule},
    errors::BundleError,
    types::FxIndexMap,
};

/// A source-to-source transform.
pub trait Loader {
    fn transform(&self, source: &str, options: Option<&toml::Table>) -> anyhow::Result<String>;
}

/// Name-addressed collection of loaders available to rules.
pub struct LoaderRegistry {
    loaders: FxIndexMap<String, Box<dyn Loader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self {
            loaders: FxIndexMap::default(),
        }
    }

    /// Registry pre-populated with the built-in loaders.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("banner", BannerLoader);
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, loader: impl Loader + 'static) {
        self.loaders.insert(name.into(), Box::new(loader));
    }

    pub fn get(&self, name: &str) -> Option<&dyn Loader> {
        self.loaders.get(name).map(|loader| &**loader)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }
}

impl Default for LoaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderRegistry")
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Prepends a `__banner__ = "..."` assignment taken from `options.text`.
///
/// An assignment rather than a comment: the rewriter re-renders modules
/// from their syntax tree, and comments would not survive that.
#[derive(Debug)]
pub struct BannerLoader;

impl Loader for BannerLoader {
    fn transform(&self, source: &str, options: Option<&toml::Table>) -> anyhow::Result<String> {
        let text = options
            .and_then(|options| options.get("text"))
            .and_then(toml::Value::as_str)
            .unwrap_or("generated by minipack");
        Ok(format!("__banner__ = \"{text}\"\n{source}"))
    }
}

/// Matches rules against module paths and runs the selected loaders.
#[derive(Debug)]
pub struct LoaderPipeline<'a> {
    rules: &'a [Rule],
    registry: &'a LoaderRegistry,
}

impl<'a> LoaderPipeline<'a> {
    pub fn new(rules: &'a [Rule], registry: &'a LoaderRegistry) -> Self {
        Self { rules, registry }
    }

    /// Transform a module's source through the first matching rule.
    ///
    /// Rules are consulted in declaration order and matching stops at the
    /// first hit; later rules are never considered. With no matching rule
    /// the source passes through unchanged. A chain applies every loader
    /// right-to-left, so the last declared loader runs first.
    pub fn run(&self, module_path: &Path, source: String) -> Result<String, BundleError> {
        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.test.is_match(module_path))
        else {
            return Ok(source);
        };

        match &rule.use_ {
            LoaderUse::Single(name) => self.apply(name, module_path, source, None),
            LoaderUse::Chain(names) => {
                let mut source = source;
                for name in names.iter().rev() {
                    source = self.apply(name, module_path, source, None)?;
                }
                Ok(source)
            }
            LoaderUse::Descriptor { loader, options } => {
                self.apply(loader, module_path, source, options.as_ref())
            }
        }
    }

    fn apply(
        &self,
        name: &str,
        module_path: &Path,
        source: String,
        options: Option<&toml::Table>,
    ) -> Result<String, BundleError> {
        let loader = self.registry.get(name).ok_or_else(|| {
            BundleError::Config(format!(
                "rule matching `{}` references unknown loader `{name}`",
                module_path.display()
            ))
        })?;
        log::debug!("applying loader `{name}` to {}", module_path.display());
        loader
            .transform(&source, options)
            .map_err(|err| BundleError::Loader {
                loader: name.to_string(),
                path: module_path.to_path_buf(),
                message: format!("{err:#}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::PathBuf,
        sync::{Arc, Mutex},
    };

    use super::*;
    use crate::config::PathPattern;

    struct TagLoader {
        tag: &'static str,
        invocations: Arc<Mutex<Vec<String>>>,
    }

    impl Loader for TagLoader {
        fn transform(&self, source: &str, _options: Option<&toml::Table>) -> anyhow::Result<String> {
            self.invocations.lock().unwrap().push(self.tag.to_string());
            Ok(format!("{source}|{}", self.tag))
        }
    }

    struct FailingLoader;

    impl Loader for FailingLoader {
        fn transform(&self, _source: &str, _options: Option<&toml::Table>) -> anyhow::Result<String> {
            anyhow::bail!("synthetic loader failure")
        }
    }

    fn rule(pattern: &str, use_: LoaderUse) -> Rule {
        Rule {
            test: PathPattern::try_from(pattern.to_string()).unwrap(),
            use_,
        }
    }

    #[test]
    fn no_matching_rule_passes_source_through() {
        let registry = LoaderRegistry::new();
        let rules = vec![rule("\\.md$", LoaderUse::Single("missing".to_string()))];
        let pipeline = LoaderPipeline::new(&rules, &registry);

        let out = pipeline
            .run(&PathBuf::from("/p/src/index.py"), "x = 1".to_string())
            .unwrap();
        assert_eq!(out, "x = 1");
    }

    #[test]
    fn first_matching_rule_wins() {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let mut registry = LoaderRegistry::new();
        registry.register(
            "first",
            TagLoader {
                tag: "first",
                invocations: Arc::clone(&invocations),
            },
        );
        registry.register(
            "second",
            TagLoader {
                tag: "second",
                invocations: Arc::clone(&invocations),
            },
        );

        // Both rules match; only the first may apply.
        let rules = vec![
            rule("\\.py$", LoaderUse::Single("first".to_string())),
            rule("index", LoaderUse::Single("second".to_string())),
        ];
        let pipeline = LoaderPipeline::new(&rules, &registry);

        let out = pipeline
            .run(&PathBuf::from("/p/src/index.py"), "x".to_string())
            .unwrap();
        assert_eq!(out, "x|first");
        assert_eq!(*invocations.lock().unwrap(), vec!["first"]);
    }

    #[test]
    fn chain_applies_all_loaders_right_to_left() {
        let invocations = Arc::new(Mutex::new(Vec::new()));
        let mut registry = LoaderRegistry::new();
        for tag in ["a", "b", "c"] {
            registry.register(
                tag,
                TagLoader {
                    tag,
                    invocations: Arc::clone(&invocations),
                },
            );
        }

        let rules = vec![rule(
            "\\.py$",
            LoaderUse::Chain(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
        )];
        let pipeline = LoaderPipeline::new(&rules, &registry);

        let out = pipeline
            .run(&PathBuf::from("/p/src/index.py"), "x".to_string())
            .unwrap();
        // Last declared runs first, and every loader in the chain runs.
        assert_eq!(out, "x|c|b|a");
        assert_eq!(*invocations.lock().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn descriptor_passes_options_to_the_loader() {
        let mut registry = LoaderRegistry::new();
        registry.register("banner", BannerLoader);

        let mut options = toml::Table::new();
        options.insert("text".to_string(), toml::Value::String("hello".to_string()));
        let rules = vec![rule(
            "\\.py$",
            LoaderUse::Descriptor {
                loader: "banner".to_string(),
                options: Some(options),
            },
        )];
        let pipeline = LoaderPipeline::new(&rules, &registry);

        let out = pipeline
            .run(&PathBuf::from("/p/src/index.py"), "x = 1".to_string())
            .unwrap();
        assert_eq!(out, "__banner__ = \"hello\"\nx = 1");
    }

    #[test]
    fn loader_failure_is_fatal_with_context() {
        let mut registry = LoaderRegistry::new();
        registry.register("broken", FailingLoader);
        let rules = vec![rule("\\.py$", LoaderUse::Single("broken".to_string()))];
        let pipeline = LoaderPipeline::new(&rules, &registry);

        let err = pipeline
            .run(&PathBuf::from("/p/src/index.py"), "x".to_string())
            .unwrap_err();
        match err {
            BundleError::Loader {
                loader,
                path,
                message,
            } => {
                assert_eq!(loader, "broken");
                assert_eq!(path, PathBuf::from("/p/src/index.py"));
                assert!(message.contains("synthetic loader failure"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_loader_reference_is_a_config_error() {
        let registry = LoaderRegistry::new();
        let rules = vec![rule("\\.py$", LoaderUse::Single("ghost".to_string()))];
        let pipeline = LoaderPipeline::new(&rules, &registry);

        let err = pipeline
            .run(&PathBuf::from("/p/src/index.py"), "x".to_string())
            .unwrap_err();
        assert!(matches!(err, BundleError::Config(_)));
    }
}

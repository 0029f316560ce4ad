//! Static test registry.
//!
//! Tests are plain functions registered under a name. Names are unique and
//! kept sorted, which is also the execution order.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use futures_util::future::LocalBoxFuture;
use globset::{Glob, GlobMatcher};
use thiserror::Error;

use crate::context::TestContext;

/// Future returned by a test body.
pub type TestFuture<'a> = LocalBoxFuture<'a, anyhow::Result<()>>;

/// A test body. It borrows the context for as long as it runs.
pub type TestFn = for<'a, 't> fn(&'a mut TestContext<'t>) -> TestFuture<'a>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("test `{0}` registered twice")]
    Duplicate(String),
    #[error("invalid test pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

#[derive(Default)]
pub struct TestRegistry {
    tests: BTreeMap<&'static str, TestFn>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(name, test)` pairs.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (&'static str, TestFn)>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (name, test) in entries {
            registry.register(name, test)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: &'static str, test: TestFn) -> Result<(), RegistryError> {
        match self.tests.entry(name) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(test);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// All names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tests.keys().copied()
    }

    /// Tests whose bare name matches the glob `pattern`, sorted by name.
    pub fn select(&self, pattern: &str) -> Result<Vec<(&'static str, TestFn)>, RegistryError> {
        let matcher = compile_pattern(pattern)?;
        Ok(self
            .tests
            .iter()
            .filter(|(name, _)| matcher.is_match(name))
            .map(|(name, test)| (*name, *test))
            .collect())
    }
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher, RegistryError> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|source| RegistryError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop<'a>(_ctx: &'a mut TestContext<'_>) -> TestFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    fn registry() -> TestRegistry {
        TestRegistry::from_entries([
            ("textDocument_definition", noop as TestFn),
            ("publish_diagnostics_warnings", noop as TestFn),
            ("textDocument_didChange_at_eol", noop as TestFn),
            ("publish_diagnostics_errors", noop as TestFn),
        ])
        .unwrap()
    }

    #[test]
    fn names_are_sorted() {
        let names: Vec<_> = registry().names().collect();
        assert_eq!(
            names,
            vec![
                "publish_diagnostics_errors",
                "publish_diagnostics_warnings",
                "textDocument_definition",
                "textDocument_didChange_at_eol",
            ]
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        let err = registry.register("textDocument_definition", noop).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "textDocument_definition"));
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn select_with_star_returns_everything() {
        assert_eq!(registry().select("*").unwrap().len(), 4);
    }

    #[test]
    fn select_filters_on_bare_name() {
        let selected: Vec<_> = registry()
            .select("textDocument_*")
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            selected,
            vec!["textDocument_definition", "textDocument_didChange_at_eol"]
        );

        let selected = registry().select("*_errors").unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].0, "publish_diagnostics_errors");
    }

    #[test]
    fn select_without_match_is_empty() {
        assert!(registry().select("nothing_*").unwrap().is_empty());
    }

    #[test]
    fn invalid_pattern_is_error() {
        assert!(matches!(
            registry().select("publish_[diagnostics"),
            Err(RegistryError::InvalidPattern { .. })
        ));
    }
}

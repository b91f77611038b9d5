use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use super::{eval::Requirements, EvalContext, FilterConfig, FilterExpr};
use crate::{
    batch::ColumnBatch,
    error::{CompositionCycleError, FilterError, RegistryError},
    logging::{filter_log, LogContext},
    mask::Mask,
};

const REGISTRY_LOG_CTX: LogContext<'static> = LogContext::component("registry");

/// Named filter: an expression plus the thresholds its leaves read.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeFilter {
    name: Arc<str>,
    expr: FilterExpr,
    config: FilterConfig,
}

impl CompositeFilter {
    /// Creates a filter with the default configuration.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, expr: FilterExpr) -> Self {
        Self {
            name: name.into(),
            expr,
            config: FilterConfig::default(),
        }
    }

    /// Replaces the configuration.
    #[must_use]
    pub fn with_config(self, config: FilterConfig) -> Self {
        Self { config, ..self }
    }

    /// Registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expression tree.
    #[must_use]
    pub fn expr(&self) -> &FilterExpr {
        &self.expr
    }

    /// Thresholds used by the leaves of [`CompositeFilter::expr`].
    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

/// Mapping from filter name to definition.
///
/// The registry is an ordinary value owned by the pipeline; there is no
/// process-wide registration. Every registered filter only references
/// filters registered before it, so the reference graph is a DAG.
#[derive(Debug, Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<Arc<str>, Arc<CompositeFilter>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `filter`, returning the definition it replaced, if any.
    ///
    /// Fails without modifying the registry when the name is empty, when the
    /// expression references an unregistered filter, or when the new
    /// definition would close a reference cycle.
    pub fn register(
        &mut self,
        filter: CompositeFilter,
    ) -> Result<Option<Arc<CompositeFilter>>, RegistryError> {
        if filter.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        let references = filter.expr.references();
        for reference in &references {
            if *reference != filter.name && !self.filters.contains_key(reference) {
                return Err(RegistryError::UnknownReference {
                    filter: filter.name.to_string(),
                    reference: reference.to_string(),
                });
            }
        }
        if let Some(path) = self.find_cycle(&filter.name, &references) {
            let err = CompositionCycleError { path };
            filter_log!(
                log::Level::Warn,
                ctx: REGISTRY_LOG_CTX,
                "cycle_rejected",
                "filter={} {}",
                filter.name,
                err,
            );
            return Err(err.into());
        }

        let name = Arc::clone(&filter.name);
        let replaced = self.filters.insert(Arc::clone(&name), Arc::new(filter));
        if replaced.is_some() {
            filter_log!(
                log::Level::Info,
                ctx: REGISTRY_LOG_CTX,
                "filter_replaced",
                "filter={} references={}",
                name,
                references.len(),
            );
        } else {
            filter_log!(
                log::Level::Debug,
                ctx: REGISTRY_LOG_CTX,
                "filter_registered",
                "filter={} references={}",
                name,
                references.len(),
            );
        }
        Ok(replaced)
    }

    /// Looks up a filter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<CompositeFilter>> {
        self.filters.get(name)
    }

    /// Returns true when `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names in lexical order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(AsRef::as_ref)
    }

    /// Number of registered filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns true when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Input columns the host must supply to evaluate `name`, in first-use order.
    ///
    /// Derived columns are reported through their inputs: `ra`/`dec` for sky
    /// latitudes and the resolver score columns for classification labels.
    /// Returns `None` for an unknown filter.
    #[must_use]
    pub fn required_columns(&self, name: &str) -> Option<Vec<Arc<str>>> {
        let filter = self.filters.get(name)?;
        Requirements::collect(self, &filter.expr, &filter.config)
            .ok()
            .map(|requirements| requirements.input_columns())
    }

    /// Evaluates `name` over `batch` without a resolver or catalog hosts.
    ///
    /// Use [`EvalContext`] when the filter needs classification labels the
    /// batch does not already carry.
    pub fn evaluate(&self, name: &str, batch: &ColumnBatch) -> Result<Mask, FilterError> {
        EvalContext::new(self).evaluate(name, batch)
    }

    /// Depth-first search for a path from `start` back to itself, treating
    /// `start_refs` as the outgoing edges of `start`.
    fn find_cycle(&self, start: &Arc<str>, start_refs: &BTreeSet<Arc<str>>) -> Option<Vec<String>> {
        let mut path = vec![start.to_string()];
        let mut visited = BTreeSet::new();
        for next in start_refs {
            if self.reaches(start, next, &mut path, &mut visited) {
                return Some(path);
            }
        }
        None
    }

    fn reaches(
        &self,
        start: &Arc<str>,
        current: &Arc<str>,
        path: &mut Vec<String>,
        visited: &mut BTreeSet<Arc<str>>,
    ) -> bool {
        path.push(current.to_string());
        if current == start {
            return true;
        }
        if visited.insert(Arc::clone(current)) {
            if let Some(filter) = self.filters.get(current) {
                for next in filter.expr.references() {
                    if self.reaches(start, &next, path, visited) {
                        return true;
                    }
                }
            }
        }
        path.pop();
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{batch::columns, classification::SCORE_COLUMNS, filter::FilterBuilder};

    fn leaf_filter(name: &str) -> CompositeFilter {
        CompositeFilter::new(name, FilterBuilder::leaf().non_bogus().build())
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut registry = FilterRegistry::new();
        let err = registry
            .register(CompositeFilter::new(
                "loop",
                FilterBuilder::and().non_bogus().filter("loop").build(),
            ))
            .expect_err("self reference");
        assert_eq!(
            err,
            RegistryError::Cycle(CompositionCycleError {
                path: vec!["loop".into(), "loop".into()],
            })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn replacement_that_closes_a_loop_is_rejected() {
        let mut registry = FilterRegistry::new();
        registry.register(leaf_filter("a")).expect("a");
        registry
            .register(CompositeFilter::new(
                "b",
                FilterBuilder::leaf().filter("a").build(),
            ))
            .expect("b");
        registry
            .register(CompositeFilter::new(
                "c",
                FilterBuilder::or().filter("b").brightness().build(),
            ))
            .expect("c");

        let err = registry
            .register(CompositeFilter::new(
                "a",
                FilterBuilder::leaf().filter("c").build(),
            ))
            .expect_err("a -> c -> b -> a");
        match err {
            RegistryError::Cycle(cycle) => {
                assert_eq!(cycle.path, vec!["a", "c", "b", "a"]);
                assert_eq!(cycle.to_string(), "composition cycle: a -> c -> b -> a");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The failed registration left the old definition in place.
        assert_eq!(
            registry.get("a").map(|f| f.expr().clone()),
            Some(FilterBuilder::leaf().non_bogus().build())
        );
    }

    #[test]
    fn diamonds_are_not_cycles() {
        let mut registry = FilterRegistry::new();
        registry.register(leaf_filter("base")).expect("base");
        for name in ["left", "right"] {
            registry
                .register(CompositeFilter::new(
                    name,
                    FilterBuilder::leaf().filter("base").build(),
                ))
                .expect("branch");
        }
        registry
            .register(CompositeFilter::new(
                "top",
                FilterBuilder::and().filter("left").filter("right").build(),
            ))
            .expect("diamond");
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn unknown_references_and_empty_names_are_rejected() {
        let mut registry = FilterRegistry::new();
        let err = registry
            .register(CompositeFilter::new(
                "orphan",
                FilterBuilder::leaf().filter("missing").build(),
            ))
            .expect_err("unknown reference");
        assert_eq!(
            err,
            RegistryError::UnknownReference {
                filter: "orphan".into(),
                reference: "missing".into(),
            }
        );
        assert_eq!(
            registry.register(leaf_filter("")).expect_err("empty name"),
            RegistryError::EmptyName
        );
    }

    #[test]
    fn replacing_returns_previous_definition() {
        let mut registry = FilterRegistry::new();
        assert!(registry.register(leaf_filter("x")).expect("first").is_none());
        let old = registry
            .register(CompositeFilter::new("x", FilterBuilder::leaf().recency().build()))
            .expect("replace")
            .expect("previous definition");
        assert_eq!(old.expr(), &FilterBuilder::leaf().non_bogus().build());
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn required_columns_follow_references() {
        let mut registry = FilterRegistry::new();
        registry
            .register(CompositeFilter::new(
                "bright",
                FilterBuilder::and().brightness().recency().build(),
            ))
            .expect("bright");
        registry
            .register(CompositeFilter::new(
                "outer",
                FilterBuilder::and()
                    .non_bogus()
                    .filter("bright")
                    .galactic_exclusion()
                    .build(),
            ))
            .expect("outer");
        let columns: Vec<_> = registry
            .required_columns("outer")
            .expect("registered")
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            columns,
            vec![
                columns::RB,
                columns::MAGPSF,
                columns::JD,
                columns::JDSTARTHIST,
                columns::RA,
                columns::DEC,
            ]
        );
        assert!(registry.required_columns("nope").is_none());

        registry
            .register(CompositeFilter::new(
                "classified",
                FilterBuilder::leaf().extragalactic_category().build(),
            ))
            .expect("classified");
        let columns = registry.required_columns("classified").expect("registered");
        assert_eq!(columns.len(), SCORE_COLUMNS.len());
    }
}

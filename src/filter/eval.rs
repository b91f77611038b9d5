//! Mask evaluation of filter expressions over column batches.
//!
//! Evaluation runs in two phases. The expression (and every filter it
//! references) is first analysed for the columns it needs; those are checked
//! against the batch and the derived columns (sky latitudes, classification
//! labels) are attached once. Only then are the leaves evaluated and folded,
//! so every schema problem surfaces before any mask work and short-circuiting
//! can never change the outcome.

use std::{collections::BTreeSet, sync::Arc};

use arrow::error::ArrowError;

use super::{
    EvalOptions, ExprInner, ExprNode, ExprVisitor, FilterConfig, FilterExpr, FilterRegistry, Leaf,
};
use crate::{
    batch::{columns, BatchId, ColumnBatch, ColumnKind},
    classification::{resolve_labels, ClassificationResolver, SCORE_COLUMNS},
    error::FilterError,
    logging::{filter_log, LogContext},
    mask::Mask,
    predicate::{self, CategorySet},
    sky,
};

const EVAL_LOG_CTX: LogContext<'static> = LogContext::component("eval");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Origin {
    /// Read by a leaf.
    Direct,
    /// Input of the sky latitude transform.
    Sky,
    /// Input of the classification resolver.
    Classification,
}

#[derive(Clone, Debug)]
struct Requirement {
    name: Arc<str>,
    kind: ColumnKind,
    origin: Origin,
}

/// Columns an expression reads, gathered across referenced filters.
#[derive(Clone, Debug, Default)]
pub(crate) struct Requirements {
    columns: Vec<Requirement>,
    galactic: bool,
    ecliptic: bool,
    classification: bool,
    max_invalid_fraction: Option<f64>,
}

impl Requirements {
    /// Walks `expr` and every filter it references.
    ///
    /// Fails with the first referenced name the registry does not know.
    pub(crate) fn collect(
        registry: &FilterRegistry,
        expr: &FilterExpr,
        config: &FilterConfig,
    ) -> Result<Self, Arc<str>> {
        let mut requirements = Self::default();
        let mut visited = BTreeSet::new();
        requirements.walk(registry, expr, config, &mut visited)?;
        Ok(requirements)
    }

    fn walk(
        &mut self,
        registry: &FilterRegistry,
        expr: &FilterExpr,
        config: &FilterConfig,
        visited: &mut BTreeSet<Arc<str>>,
    ) -> Result<(), Arc<str>> {
        match expr.kind() {
            ExprNode::Leaf(leaf) => self.leaf(registry, leaf, config, visited),
            ExprNode::Inner(ExprInner::Not(inner)) => self.walk(registry, inner, config, visited),
            ExprNode::Inner(ExprInner::And(clauses) | ExprInner::Or(clauses)) => {
                for clause in clauses {
                    self.walk(registry, clause, config, visited)?;
                }
                Ok(())
            }
        }
    }

    fn leaf(
        &mut self,
        registry: &FilterRegistry,
        leaf: &Leaf,
        config: &FilterConfig,
        visited: &mut BTreeSet<Arc<str>>,
    ) -> Result<(), Arc<str>> {
        match leaf {
            Leaf::SsoCandidate => self.direct(columns::ROID, ColumnKind::Numeric),
            Leaf::CatalogMatch => self.direct(columns::SPICY_ID, ColumnKind::Numeric),
            Leaf::NonBogus => self.direct(columns::RB, ColumnKind::Numeric),
            Leaf::Brightness => self.direct(columns::MAGPSF, ColumnKind::Numeric),
            Leaf::Recency => {
                self.direct(columns::JD, ColumnKind::Numeric);
                self.direct(columns::JDSTARTHIST, ColumnKind::Numeric);
            }
            Leaf::ExtragalacticCategory => {
                self.classification = true;
                for name in SCORE_COLUMNS {
                    self.push(Arc::from(name), ColumnKind::Any, Origin::Classification);
                }
            }
            Leaf::GalacticExclusion | Leaf::EclipticExclusion => {
                if matches!(leaf, Leaf::GalacticExclusion) {
                    self.galactic = true;
                } else {
                    self.ecliptic = true;
                }
                let tolerance = config.max_invalid_fraction;
                self.max_invalid_fraction = Some(
                    self.max_invalid_fraction
                        .map_or(tolerance, |current| current.min(tolerance)),
                );
                self.push(Arc::from(columns::RA), ColumnKind::Numeric, Origin::Sky);
                self.push(Arc::from(columns::DEC), ColumnKind::Numeric, Origin::Sky);
            }
            Leaf::Threshold { column, .. } => {
                self.push(Arc::clone(column), ColumnKind::Numeric, Origin::Direct)
            }
            Leaf::Present { column } => {
                self.push(Arc::clone(column), ColumnKind::Any, Origin::Direct)
            }
            Leaf::Filter(name) => {
                let filter = registry.get(name).ok_or_else(|| Arc::clone(name))?;
                if visited.insert(Arc::clone(name)) {
                    self.walk(registry, filter.expr(), filter.config(), visited)?;
                }
            }
        }
        Ok(())
    }

    fn direct(&mut self, name: &'static str, kind: ColumnKind) {
        self.push(Arc::from(name), kind, Origin::Direct);
    }

    fn push(&mut self, name: Arc<str>, kind: ColumnKind, origin: Origin) {
        match self.columns.iter_mut().find(|req| req.name == name) {
            Some(existing) => {
                if origin == Origin::Direct {
                    existing.origin = Origin::Direct;
                }
                if kind != ColumnKind::Any {
                    existing.kind = kind;
                }
            }
            None => self.columns.push(Requirement { name, kind, origin }),
        }
    }

    /// Input column names in first-use order.
    pub(crate) fn input_columns(&self) -> Vec<Arc<str>> {
        self.columns.iter().map(|req| Arc::clone(&req.name)).collect()
    }

    fn needs_sky(&self, batch: &ColumnBatch) -> bool {
        (self.galactic && !batch.contains(columns::GALACTIC_LATITUDE))
            || (self.ecliptic && !batch.contains(columns::ECLIPTIC_LATITUDE))
    }

    fn needs_labels(&self, batch: &ColumnBatch) -> bool {
        self.classification && !batch.contains(columns::CLASSIFICATION)
    }
}

/// Everything a batch evaluation needs besides the batch itself.
///
/// A context is cheap to build and only borrows the registry and resolver;
/// it holds no per-batch state, so one context can evaluate many batches,
/// from many threads at once.
#[derive(Clone)]
pub struct EvalContext<'a> {
    registry: &'a FilterRegistry,
    resolver: Option<&'a dyn ClassificationResolver>,
    catalog_hosts: CategorySet,
    options: EvalOptions,
}

impl std::fmt::Debug for EvalContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvalContext")
            .field("filters", &self.registry.len())
            .field("resolver", &self.resolver.is_some())
            .field("catalog_hosts", &self.catalog_hosts)
            .field("options", &self.options)
            .finish()
    }
}

impl<'a> EvalContext<'a> {
    /// Context without resolver, catalog hosts, or custom options.
    #[must_use]
    pub fn new(registry: &'a FilterRegistry) -> Self {
        Self {
            registry,
            resolver: None,
            catalog_hosts: CategorySet::new(),
            options: EvalOptions::default(),
        }
    }

    /// Resolver used when a filter needs labels the batch does not carry.
    #[must_use]
    pub fn resolver(self, resolver: &'a dyn ClassificationResolver) -> Self {
        Self {
            resolver: Some(resolver),
            ..self
        }
    }

    /// Catalog host tags accepted by every extragalactic leaf, on top of each
    /// filter's configured categories.
    #[must_use]
    pub fn catalog_hosts<I, S>(self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            catalog_hosts: hosts.into_iter().collect(),
            ..self
        }
    }

    /// Evaluation options.
    #[must_use]
    pub fn options(self, options: EvalOptions) -> Self {
        Self { options, ..self }
    }

    /// Registry the context resolves filter names against.
    #[must_use]
    pub fn registry(&self) -> &'a FilterRegistry {
        self.registry
    }

    /// Evaluates the registered filter `name` over `batch`.
    pub fn evaluate(&self, name: &str, batch: &ColumnBatch) -> Result<Mask, FilterError> {
        let filter = self
            .registry
            .get(name)
            .ok_or_else(|| FilterError::UnknownFilter {
                batch: batch.id().clone(),
                name: name.to_string(),
            })?;
        self.evaluate_with(name, filter.expr(), filter.config(), batch)
    }

    /// Evaluates an unregistered expression over `batch`.
    ///
    /// `expr` may reference registered filters, which are evaluated with their
    /// own configuration.
    pub fn evaluate_expr(
        &self,
        expr: &FilterExpr,
        config: &FilterConfig,
        batch: &ColumnBatch,
    ) -> Result<Mask, FilterError> {
        self.evaluate_with("<expr>", expr, config, batch)
    }

    fn evaluate_with(
        &self,
        name: &str,
        expr: &FilterExpr,
        config: &FilterConfig,
        batch: &ColumnBatch,
    ) -> Result<Mask, FilterError> {
        let requirements = Requirements::collect(self.registry, expr, config).map_err(|missing| {
            FilterError::UnknownFilter {
                batch: batch.id().clone(),
                name: missing.to_string(),
            }
        })?;
        if batch.is_empty() {
            return Ok(Mask::splat(0, false));
        }

        let prepared = self.prepare(batch, &requirements)?;
        let mut evaluator = MaskEvaluator {
            ctx: self,
            batch: &prepared,
            config,
        };
        let mask = expr.accept(&mut evaluator)?;
        filter_log!(
            log::Level::Debug,
            ctx: EVAL_LOG_CTX.batch(batch.id()),
            "batch_evaluated",
            "filter={} rows={} selected={}",
            name,
            mask.len(),
            mask.true_count(),
        );
        Ok(mask)
    }

    /// Checks every required column and attaches the derived ones.
    fn prepare(
        &self,
        batch: &ColumnBatch,
        requirements: &Requirements,
    ) -> Result<ColumnBatch, FilterError> {
        let needs_sky = requirements.needs_sky(batch);
        let needs_labels = requirements.needs_labels(batch);
        for req in &requirements.columns {
            let checked_now = match req.origin {
                Origin::Direct => false,
                Origin::Sky => needs_sky,
                Origin::Classification => needs_labels,
            };
            if checked_now {
                batch.check_column(&req.name, req.kind)?;
            }
        }

        let mut prepared = batch.clone();
        if needs_sky {
            let ra = batch.float64(columns::RA)?;
            let dec = batch.float64(columns::DEC)?;
            let latitudes = sky::derive_latitudes(
                batch.id(),
                &ra,
                &dec,
                requirements.max_invalid_fraction.unwrap_or(0.5),
            )?;
            if requirements.galactic && !prepared.contains(columns::GALACTIC_LATITUDE) {
                prepared = prepared
                    .with_column(columns::GALACTIC_LATITUDE, Arc::new(latitudes.galactic))?;
            }
            if requirements.ecliptic && !prepared.contains(columns::ECLIPTIC_LATITUDE) {
                prepared = prepared
                    .with_column(columns::ECLIPTIC_LATITUDE, Arc::new(latitudes.ecliptic))?;
            }
        }
        if needs_labels {
            let resolver = self.resolver.ok_or_else(|| FilterError::ResolverUnavailable {
                batch: batch.id().clone(),
            })?;
            let labels = resolve_labels(resolver, batch)?;
            prepared = prepared.with_column(columns::CLASSIFICATION, Arc::new(labels))?;
        }

        // Leaf columns are checked last so derived columns count as present.
        for req in &requirements.columns {
            if req.origin == Origin::Direct {
                prepared.check_column(&req.name, req.kind)?;
            }
        }
        if requirements.galactic {
            prepared.check_column(columns::GALACTIC_LATITUDE, ColumnKind::Numeric)?;
        }
        if requirements.ecliptic {
            prepared.check_column(columns::ECLIPTIC_LATITUDE, ColumnKind::Numeric)?;
        }
        if requirements.classification {
            prepared.check_column(columns::CLASSIFICATION, ColumnKind::Utf8)?;
        }
        Ok(prepared)
    }
}

/// Folds an expression into a mask over one prepared batch.
struct MaskEvaluator<'c, 'a> {
    ctx: &'c EvalContext<'a>,
    batch: &'c ColumnBatch,
    config: &'c FilterConfig,
}

impl MaskEvaluator<'_, '_> {
    fn batch_id(&self) -> &BatchId {
        self.batch.id()
    }

    fn arrow(&self, result: Result<Mask, ArrowError>) -> Result<Mask, FilterError> {
        result.map_err(|source| FilterError::Arrow {
            batch: self.batch_id().clone(),
            source,
        })
    }
}

impl ExprVisitor for MaskEvaluator<'_, '_> {
    type Error = FilterError;
    type Value = Mask;

    fn visit_leaf(&mut self, leaf: &Leaf) -> Result<Mask, FilterError> {
        let batch = self.batch;
        let config = self.config;
        match leaf {
            Leaf::SsoCandidate => {
                let roid = batch.int64(columns::ROID)?;
                self.arrow(predicate::sso_candidate(&roid))
            }
            Leaf::CatalogMatch => {
                let spicy = batch.float64(columns::SPICY_ID)?;
                self.arrow(predicate::catalog_match(&spicy))
            }
            Leaf::NonBogus => {
                let rb = batch.float64(columns::RB)?;
                self.arrow(predicate::non_bogus(&rb, config.min_real_bogus))
            }
            Leaf::Brightness => {
                let magpsf = batch.float64(columns::MAGPSF)?;
                self.arrow(predicate::brightness(&magpsf, config.brightness_threshold))
            }
            Leaf::Recency => {
                let jd = batch.float64(columns::JD)?;
                let start = batch.float64(columns::JDSTARTHIST)?;
                self.arrow(predicate::recency(&jd, &start, config.recency_window_days))
            }
            Leaf::ExtragalacticCategory => {
                let labels = batch.utf8(columns::CLASSIFICATION)?;
                let accepted = &config.extragalactic_categories;
                let hosts = &self.ctx.catalog_hosts;
                Ok(predicate::labels_matching(&labels, |label| {
                    accepted.contains(label) || hosts.contains(label)
                }))
            }
            Leaf::GalacticExclusion => {
                let b = batch.float64(columns::GALACTIC_LATITUDE)?;
                self.arrow(predicate::galactic_exclusion(&b, config.sky_exclusion_deg))
            }
            Leaf::EclipticExclusion => {
                let lat = batch.float64(columns::ECLIPTIC_LATITUDE)?;
                self.arrow(predicate::ecliptic_exclusion(&lat, config.sky_exclusion_deg))
            }
            Leaf::Threshold { column, op, value } => {
                let values = batch.float64(column)?;
                self.arrow(predicate::threshold(&values, *op, *value))
            }
            Leaf::Present { column } => {
                let array = batch.column(column)?;
                self.arrow(predicate::present_any(array.as_ref()))
            }
            Leaf::Filter(name) => {
                let filter = self.ctx.registry.get(name).ok_or_else(|| {
                    FilterError::UnknownFilter {
                        batch: batch.id().clone(),
                        name: name.to_string(),
                    }
                })?;
                let mut nested = MaskEvaluator {
                    ctx: self.ctx,
                    batch,
                    config: filter.config(),
                };
                filter.expr().accept(&mut nested)
            }
        }
    }

    fn combine_not(&mut self, child: Mask) -> Result<Mask, FilterError> {
        Ok(child.negate())
    }

    fn combine_and(&mut self, children: Vec<Mask>) -> Result<Mask, FilterError> {
        Ok(fold(children, self.batch.num_rows(), true))
    }

    fn combine_or(&mut self, children: Vec<Mask>) -> Result<Mask, FilterError> {
        Ok(fold(children, self.batch.num_rows(), false))
    }

    fn visit_and(&mut self, clauses: &[FilterExpr]) -> Result<Mask, FilterError> {
        let mut acc = Mask::splat(self.batch.num_rows(), true);
        for clause in clauses {
            acc = acc.and(&self.visit_expr(clause)?);
            if self.ctx.options.short_circuit && acc.none_selected() {
                break;
            }
        }
        Ok(acc)
    }

    fn visit_or(&mut self, clauses: &[FilterExpr]) -> Result<Mask, FilterError> {
        let mut acc = Mask::splat(self.batch.num_rows(), false);
        for clause in clauses {
            acc = acc.or(&self.visit_expr(clause)?);
            if self.ctx.options.short_circuit && acc.all_selected() {
                break;
            }
        }
        Ok(acc)
    }
}

fn fold(children: Vec<Mask>, len: usize, conjunction: bool) -> Mask {
    children
        .iter()
        .fold(Mask::splat(len, conjunction), |acc, mask| {
            if conjunction {
                acc.and(mask)
            } else {
                acc.or(mask)
            }
        })
}

//! Builder for composing filter expressions.

use std::sync::Arc;

use super::{ComparisonOp, ExprInner, ExprNode, FilterExpr, Leaf};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BuilderCombine {
    Leaf,
    Conjunction,
    Disjunction,
}

/// Builder for composing filter expressions incrementally.
///
/// ```
/// use fink_filters::filter::FilterBuilder;
///
/// let expr = FilterBuilder::and()
///     .non_bogus()
///     .brightness()
///     .or_group(|b| b.galactic_exclusion().ecliptic_exclusion())
///     .build();
/// assert_eq!(
///     expr.to_string(),
///     "(non_bogus AND brightness AND (galactic_exclusion OR ecliptic_exclusion))"
/// );
/// ```
#[derive(Debug)]
pub struct FilterBuilder {
    combine: BuilderCombine,
    clauses: Vec<FilterExpr>,
}

impl FilterBuilder {
    const fn new(combine: BuilderCombine) -> Self {
        Self {
            combine,
            clauses: Vec::new(),
        }
    }

    /// Creates a builder that expects a single clause.
    #[must_use]
    pub fn leaf() -> Self {
        Self::new(BuilderCombine::Leaf)
    }

    /// Creates a builder that emits an `AND` of all clauses.
    #[must_use]
    pub fn and() -> Self {
        Self::new(BuilderCombine::Conjunction)
    }

    /// Creates a builder that emits an `OR` of all clauses.
    #[must_use]
    pub fn or() -> Self {
        Self::new(BuilderCombine::Disjunction)
    }

    /// Adds an existing expression to the builder.
    #[must_use]
    pub fn expr(mut self, expr: FilterExpr) -> Self {
        self.clauses.push(expr);
        self
    }

    /// Adds a leaf predicate.
    #[must_use]
    pub fn with_leaf(mut self, leaf: Leaf) -> Self {
        self.push_leaf(leaf);
        self
    }

    /// Adds [`Leaf::SsoCandidate`].
    #[must_use]
    pub fn sso_candidate(self) -> Self {
        self.with_leaf(Leaf::SsoCandidate)
    }

    /// Adds [`Leaf::CatalogMatch`].
    #[must_use]
    pub fn catalog_match(self) -> Self {
        self.with_leaf(Leaf::CatalogMatch)
    }

    /// Adds [`Leaf::NonBogus`].
    #[must_use]
    pub fn non_bogus(self) -> Self {
        self.with_leaf(Leaf::NonBogus)
    }

    /// Adds [`Leaf::Brightness`].
    #[must_use]
    pub fn brightness(self) -> Self {
        self.with_leaf(Leaf::Brightness)
    }

    /// Adds [`Leaf::Recency`].
    #[must_use]
    pub fn recency(self) -> Self {
        self.with_leaf(Leaf::Recency)
    }

    /// Adds [`Leaf::ExtragalacticCategory`].
    #[must_use]
    pub fn extragalactic_category(self) -> Self {
        self.with_leaf(Leaf::ExtragalacticCategory)
    }

    /// Adds [`Leaf::GalacticExclusion`].
    #[must_use]
    pub fn galactic_exclusion(self) -> Self {
        self.with_leaf(Leaf::GalacticExclusion)
    }

    /// Adds [`Leaf::EclipticExclusion`].
    #[must_use]
    pub fn ecliptic_exclusion(self) -> Self {
        self.with_leaf(Leaf::EclipticExclusion)
    }

    /// Adds a generic `column <op> value` comparison.
    #[must_use]
    pub fn threshold(self, column: impl Into<Arc<str>>, op: ComparisonOp, value: f64) -> Self {
        self.with_leaf(Leaf::threshold(column, op, value))
    }

    /// Adds a presence test on `column`.
    #[must_use]
    pub fn present(self, column: impl Into<Arc<str>>) -> Self {
        self.with_leaf(Leaf::present(column))
    }

    /// Adds a reference to another registered filter.
    #[must_use]
    pub fn filter(self, name: impl Into<Arc<str>>) -> Self {
        self.with_leaf(Leaf::filter(name))
    }

    fn branch<F>(mut self, combine: BuilderCombine, build: F) -> Self
    where
        F: FnOnce(FilterBuilder) -> FilterBuilder,
    {
        let expr = build(FilterBuilder::new(combine)).build();
        self.clauses.push(expr);
        self
    }

    /// Adds a nested conjunction built by the supplied closure.
    #[must_use]
    pub fn and_group<F>(self, build: F) -> Self
    where
        F: FnOnce(FilterBuilder) -> FilterBuilder,
    {
        self.branch(BuilderCombine::Conjunction, build)
    }

    /// Adds a nested disjunction built by the supplied closure.
    #[must_use]
    pub fn or_group<F>(self, build: F) -> Self
    where
        F: FnOnce(FilterBuilder) -> FilterBuilder,
    {
        self.branch(BuilderCombine::Disjunction, build)
    }

    /// Adds the negation of the conjunction built by the supplied closure.
    #[must_use]
    pub fn not_group<F>(mut self, build: F) -> Self
    where
        F: FnOnce(FilterBuilder) -> FilterBuilder,
    {
        let expr = build(FilterBuilder::and()).build();
        let negated =
            FilterExpr::from_kind(ExprNode::Inner(ExprInner::Not(Box::new(expr)))).simplify();
        self.clauses.push(negated);
        self
    }

    fn push_leaf(&mut self, leaf: Leaf) {
        self.clauses.push(FilterExpr::from_kind(ExprNode::Leaf(leaf)));
    }

    /// Consumes the builder and returns the composed expression.
    ///
    /// # Panics
    ///
    /// Panics when no clause was added, or when a [`FilterBuilder::leaf`]
    /// builder holds more than one clause.
    #[must_use]
    pub fn build(self) -> FilterExpr {
        assert!(
            !self.clauses.is_empty(),
            "FilterBuilder requires at least one clause"
        );
        match self.combine {
            BuilderCombine::Leaf => {
                assert!(
                    self.clauses.len() == 1,
                    "FilterBuilder::leaf must contain exactly one clause"
                );
                self.clauses
                    .into_iter()
                    .next()
                    .expect("length checked for leaf builder")
            }
            BuilderCombine::Conjunction => FilterExpr::make_and(self.clauses),
            BuilderCombine::Disjunction => FilterExpr::make_or(self.clauses),
        }
    }
}

impl Default for FilterBuilder {
    fn default() -> Self {
        Self::leaf()
    }
}

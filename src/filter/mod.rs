//! Boolean composition of elementary predicates into named filters.
//!
//! A [`FilterExpr`] is a tree of [`Leaf`] predicates joined by `AND`, `OR`
//! and `NOT`. Leaves read their thresholds from the [`FilterConfig`] of the
//! composite filter that owns them, and [`Leaf::Filter`] lets one registered
//! filter reuse another. Registration goes through a [`FilterRegistry`],
//! which keeps the reference graph acyclic.

mod builder;
mod config;
mod eval;
mod registry;

use std::{collections::BTreeSet, fmt, sync::Arc};

pub use builder::FilterBuilder;
pub use config::{EvalOptions, FilterConfig};
pub use eval::EvalContext;
pub use registry::{CompositeFilter, FilterRegistry};

pub use crate::predicate::ComparisonOp;

/// Terminal predicates of a filter expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Leaf {
    /// `roid == 3`.
    SsoCandidate,
    /// `spicy_id != -1`.
    CatalogMatch,
    /// `rb >= FilterConfig::min_real_bogus`.
    NonBogus,
    /// `magpsf <= FilterConfig::brightness_threshold`.
    Brightness,
    /// `jd - jdstarthist <= FilterConfig::recency_window_days`.
    Recency,
    /// Classification label in `FilterConfig::extragalactic_categories` or
    /// in the catalog-host list supplied at evaluation time.
    ExtragalacticCategory,
    /// `|b| > FilterConfig::sky_exclusion_deg`.
    GalacticExclusion,
    /// `|ecliptic lat| > FilterConfig::sky_exclusion_deg`.
    EclipticExclusion,
    /// Generic numeric comparison against a literal.
    Threshold {
        /// Column to compare.
        column: Arc<str>,
        /// Operator.
        op: ComparisonOp,
        /// Literal right-hand side.
        value: f64,
    },
    /// The column holds a value (not null, not `NaN`).
    Present {
        /// Column to inspect.
        column: Arc<str>,
    },
    /// Another registered composite filter.
    Filter(Arc<str>),
}

impl Leaf {
    /// Builds a [`Leaf::Threshold`].
    #[must_use]
    pub fn threshold(column: impl Into<Arc<str>>, op: ComparisonOp, value: f64) -> Self {
        Leaf::Threshold {
            column: column.into(),
            op,
            value,
        }
    }

    /// Builds a [`Leaf::Present`].
    #[must_use]
    pub fn present(column: impl Into<Arc<str>>) -> Self {
        Leaf::Present {
            column: column.into(),
        }
    }

    /// Builds a [`Leaf::Filter`] reference.
    #[must_use]
    pub fn filter(name: impl Into<Arc<str>>) -> Self {
        Leaf::Filter(name.into())
    }
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::SsoCandidate => f.write_str("sso_candidate"),
            Leaf::CatalogMatch => f.write_str("catalog_match"),
            Leaf::NonBogus => f.write_str("non_bogus"),
            Leaf::Brightness => f.write_str("brightness"),
            Leaf::Recency => f.write_str("recency"),
            Leaf::ExtragalacticCategory => f.write_str("extragalactic_category"),
            Leaf::GalacticExclusion => f.write_str("galactic_exclusion"),
            Leaf::EclipticExclusion => f.write_str("ecliptic_exclusion"),
            Leaf::Threshold { column, op, value } => write!(f, "{column} {op} {value}"),
            Leaf::Present { column } => write!(f, "present({column})"),
            Leaf::Filter(name) => write!(f, "filter({name})"),
        }
    }
}

/// Categorises an expression node as leaf or branch.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprNode {
    /// Terminal predicate.
    Leaf(Leaf),
    /// Boolean combination of child expressions.
    Inner(ExprInner),
}

/// Branch expressions contain one or more children.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprInner {
    /// Logical negation.
    Not(Box<FilterExpr>),
    /// Conjunction over multiple expressions.
    And(Vec<FilterExpr>),
    /// Disjunction over multiple expressions.
    Or(Vec<FilterExpr>),
}

/// Boolean expression over elementary predicates.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterExpr {
    kind: ExprNode,
}

impl FilterExpr {
    /// Returns a reference to the underlying node.
    #[must_use]
    pub fn kind(&self) -> &ExprNode {
        &self.kind
    }

    /// Expression consisting of a single leaf.
    #[must_use]
    pub fn leaf(leaf: Leaf) -> Self {
        Self::from_kind(ExprNode::Leaf(leaf))
    }

    /// Builds a conjunction from the supplied expressions, if any are provided.
    #[must_use]
    pub fn conjunction(exprs: Vec<FilterExpr>) -> Option<FilterExpr> {
        match exprs.len() {
            0 => None,
            1 => exprs.into_iter().next(),
            _ => Some(FilterExpr::make_and(exprs).simplify()),
        }
    }

    /// Builds a disjunction from the supplied expressions, if any.
    #[must_use]
    pub fn disjunction(exprs: Vec<FilterExpr>) -> Option<FilterExpr> {
        match exprs.len() {
            0 => None,
            1 => exprs.into_iter().next(),
            _ => Some(FilterExpr::make_or(exprs).simplify()),
        }
    }

    /// Returns the logical negation of this expression.
    ///
    /// Negation complements the evaluated mask, so rows with missing data
    /// (false under the inner expression) become true. Guard with
    /// [`Leaf::Present`] when that is not wanted.
    #[must_use]
    pub fn negate(self) -> Self {
        Self::from_kind(ExprNode::Inner(ExprInner::Not(Box::new(self)))).simplify()
    }

    /// Flattens nested conjunctions/disjunctions and removes double negations.
    #[must_use]
    pub fn simplify(self) -> Self {
        match self.kind {
            ExprNode::Leaf(_) => self,
            ExprNode::Inner(ExprInner::Not(inner)) => match inner.simplify().into_kind() {
                ExprNode::Inner(ExprInner::Not(grandchild)) => *grandchild,
                other => Self::from_kind(ExprNode::Inner(ExprInner::Not(Box::new(
                    Self::from_kind(other),
                )))),
            },
            ExprNode::Inner(ExprInner::And(clauses)) => {
                FilterExpr::make_and(clauses.into_iter().map(FilterExpr::simplify))
            }
            ExprNode::Inner(ExprInner::Or(clauses)) => {
                FilterExpr::make_or(clauses.into_iter().map(FilterExpr::simplify))
            }
        }
    }

    /// Names of the composite filters referenced directly by this expression.
    #[must_use]
    pub fn references(&self) -> BTreeSet<Arc<str>> {
        let mut out = BTreeSet::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut BTreeSet<Arc<str>>) {
        match &self.kind {
            ExprNode::Leaf(Leaf::Filter(name)) => {
                out.insert(Arc::clone(name));
            }
            ExprNode::Leaf(_) => {}
            ExprNode::Inner(ExprInner::Not(inner)) => inner.collect_references(out),
            ExprNode::Inner(ExprInner::And(clauses) | ExprInner::Or(clauses)) => {
                for clause in clauses {
                    clause.collect_references(out);
                }
            }
        }
    }

    /// Accepts a visitor that walks the expression tree bottom-up.
    pub fn accept<V>(&self, visitor: &mut V) -> Result<V::Value, V::Error>
    where
        V: ExprVisitor + ?Sized,
    {
        visitor.visit_expr(self)
    }

    /// # Panics
    ///
    /// Panics if no clauses are provided.
    fn make_and<I>(clauses: I) -> Self
    where
        I: IntoIterator<Item = FilterExpr>,
    {
        let mut acc = Vec::new();
        for clause in clauses {
            match clause.into_kind() {
                ExprNode::Inner(ExprInner::And(mut nested)) => acc.append(&mut nested),
                other => acc.push(FilterExpr::from_kind(other)),
            }
        }

        assert!(
            !acc.is_empty(),
            "FilterExpr::make_and requires at least one clause"
        );

        if acc.len() == 1 {
            acc.pop().expect("length checked")
        } else {
            Self::from_kind(ExprNode::Inner(ExprInner::And(acc)))
        }
    }

    /// # Panics
    ///
    /// Panics if no clauses are provided.
    fn make_or<I>(clauses: I) -> Self
    where
        I: IntoIterator<Item = FilterExpr>,
    {
        let mut acc = Vec::new();
        for clause in clauses {
            match clause.into_kind() {
                ExprNode::Inner(ExprInner::Or(mut nested)) => acc.append(&mut nested),
                other => acc.push(FilterExpr::from_kind(other)),
            }
        }

        assert!(
            !acc.is_empty(),
            "FilterExpr::make_or requires at least one clause"
        );

        if acc.len() == 1 {
            acc.pop().expect("length checked")
        } else {
            Self::from_kind(ExprNode::Inner(ExprInner::Or(acc)))
        }
    }

    fn from_kind(kind: ExprNode) -> Self {
        Self { kind }
    }

    fn into_kind(self) -> ExprNode {
        self.kind
    }
}

impl From<Leaf> for FilterExpr {
    fn from(leaf: Leaf) -> Self {
        FilterExpr::leaf(leaf)
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, clauses: &[FilterExpr], sep: &str) -> fmt::Result {
            f.write_str("(")?;
            for (i, clause) in clauses.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{clause}")?;
            }
            f.write_str(")")
        }
        match &self.kind {
            ExprNode::Leaf(leaf) => write!(f, "{leaf}"),
            ExprNode::Inner(ExprInner::Not(inner)) => write!(f, "NOT {inner}"),
            ExprNode::Inner(ExprInner::And(clauses)) => join(f, clauses, " AND "),
            ExprNode::Inner(ExprInner::Or(clauses)) => join(f, clauses, " OR "),
        }
    }
}

/// Visitor that folds an expression tree into a single value.
pub trait ExprVisitor {
    /// Error type used when evaluation fails.
    type Error;
    /// Concrete value type produced while walking the expression.
    type Value;

    /// Evaluates a leaf predicate.
    fn visit_leaf(&mut self, leaf: &Leaf) -> Result<Self::Value, Self::Error>;

    /// Combines the result of a negated child.
    fn combine_not(&mut self, child: Self::Value) -> Result<Self::Value, Self::Error>;

    /// Combines an `AND` clause from the supplied child results.
    fn combine_and(&mut self, children: Vec<Self::Value>) -> Result<Self::Value, Self::Error>;

    /// Combines an `OR` clause from the supplied child results.
    fn combine_or(&mut self, children: Vec<Self::Value>) -> Result<Self::Value, Self::Error>;

    /// Visits the supplied expression by walking the tree.
    fn visit_expr(&mut self, expr: &FilterExpr) -> Result<Self::Value, Self::Error> {
        match expr.kind() {
            ExprNode::Leaf(leaf) => self.visit_leaf(leaf),
            ExprNode::Inner(ExprInner::Not(inner)) => {
                let child = self.visit_expr(inner)?;
                self.combine_not(child)
            }
            ExprNode::Inner(ExprInner::And(clauses)) => self.visit_and(clauses),
            ExprNode::Inner(ExprInner::Or(clauses)) => self.visit_or(clauses),
        }
    }

    /// Visits every clause of a conjunction, then combines them.
    fn visit_and(&mut self, clauses: &[FilterExpr]) -> Result<Self::Value, Self::Error> {
        debug_assert!(
            !clauses.is_empty(),
            "FilterExpr::make_and enforces at least one clause"
        );
        let mut children = Vec::with_capacity(clauses.len());
        for clause in clauses {
            children.push(self.visit_expr(clause)?);
        }
        self.combine_and(children)
    }

    /// Visits every clause of a disjunction, then combines them.
    fn visit_or(&mut self, clauses: &[FilterExpr]) -> Result<Self::Value, Self::Error> {
        debug_assert!(
            !clauses.is_empty(),
            "FilterExpr::make_or enforces at least one clause"
        );
        let mut children = Vec::with_capacity(clauses.len());
        for clause in clauses {
            children.push(self.visit_expr(clause)?);
        }
        self.combine_or(children)
    }
}

//! WHERE-clause predicate tree.
//!
//! [`Criterion`] is a single `(column operator value)` comparison;
//! [`CriterionGroup`] is an ordered, positional sequence of predicates
//! and `AND`/`OR` connective tokens wrapped in one parenthesis pair.
//! [`Where`] is the union every operation accepts, including the plain
//! mapping shorthand that expands to an AND-conjunction of equalities.
//!
//! No operator validation is performed: any string renders verbatim.
//! That is intentional minimalism inherited from the system this crate
//! replaces, not a safety feature; see the crate-level security note.

use crate::models::value::{DEFAULT_QUOTE, SqlValue};

/// A single comparison predicate.
///
/// Immutable once constructed. Renders as `(column operator value)` with
/// the value quoted iff it is textual.
///
/// # Examples
///
/// ```
/// use sysdb::Criterion;
///
/// let c = Criterion::new("user_id", "=", 1);
/// assert_eq!(c.to_text(), "(user_id = 1)");
///
/// let c = Criterion::new("name", "LIKE", "%admin%");
/// assert_eq!(c.to_text(), "(name LIKE '%admin%')");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    column: String,
    operator: String,
    value: SqlValue,
    quote: char,
}

impl Criterion {
    /// Creates a criterion with the default `'` quote character.
    pub fn new(column: impl Into<String>, operator: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self {
            column: column.into(),
            operator: operator.into(),
            value: value.into(),
            quote: DEFAULT_QUOTE,
        }
    }

    /// Overrides the quote character used for textual values.
    #[must_use]
    pub const fn with_quote(mut self, quote: char) -> Self {
        self.quote = quote;
        self
    }

    /// Renders the predicate fragment.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!(
            "({} {} {})",
            self.column,
            self.operator,
            self.value.render(self.quote)
        )
    }
}

/// One positional element of a [`CriterionGroup`].
#[derive(Debug, Clone, PartialEq)]
pub enum GroupNode {
    /// A leaf comparison.
    Criterion(Criterion),
    /// A nested group.
    Group(CriterionGroup),
    /// The `AND` connective token.
    And,
    /// The `OR` connective token.
    Or,
}

impl GroupNode {
    fn to_text(&self) -> String {
        match self {
            Self::Criterion(c) => c.to_text(),
            Self::Group(g) => g.to_text(),
            Self::And => "AND".to_string(),
            Self::Or => "OR".to_string(),
        }
    }
}

impl From<Criterion> for GroupNode {
    fn from(c: Criterion) -> Self {
        Self::Criterion(c)
    }
}

impl From<CriterionGroup> for GroupNode {
    fn from(g: CriterionGroup) -> Self {
        Self::Group(g)
    }
}

/// An ordered sequence of predicates and connective tokens.
///
/// A well-formed group alternates predicate, connective, predicate, …;
/// a lone predicate is a legal degenerate group. The sequence is taken
/// as supplied, with no validation and no reordering.
///
/// # Examples
///
/// ```
/// use sysdb::{Criterion, CriterionGroup};
///
/// let g = CriterionGroup::of(Criterion::new("user_id", "=", 5))
///     .and(Criterion::new("active", "=", 1));
/// assert_eq!(g.to_text(), "((user_id = 5) AND (active = 1))");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CriterionGroup {
    nodes: Vec<GroupNode>,
}

impl CriterionGroup {
    /// Creates an empty group.
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a group seeded with one predicate.
    pub fn of(node: impl Into<GroupNode>) -> Self {
        Self {
            nodes: vec![node.into()],
        }
    }

    /// Creates a group from an explicit positional node sequence.
    #[must_use]
    pub fn from_nodes(nodes: Vec<GroupNode>) -> Self {
        Self { nodes }
    }

    /// Appends `AND` followed by a predicate or nested group.
    #[must_use]
    pub fn and(mut self, node: impl Into<GroupNode>) -> Self {
        self.nodes.push(GroupNode::And);
        self.nodes.push(node.into());
        self
    }

    /// Appends `OR` followed by a predicate or nested group.
    #[must_use]
    pub fn or(mut self, node: impl Into<GroupNode>) -> Self {
        self.nodes.push(GroupNode::Or);
        self.nodes.push(node.into());
        self
    }

    /// Renders the group: space-joined children in one parenthesis pair.
    #[must_use]
    pub fn to_text(&self) -> String {
        let inner: Vec<String> = self.nodes.iter().map(GroupNode::to_text).collect();
        format!("({})", inner.join(" "))
    }
}

/// The predicate forms accepted by every operation taking a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Where {
    /// A single comparison.
    Criterion(Criterion),
    /// A predicate tree.
    Group(CriterionGroup),
    /// Mapping shorthand: expands to one equality per pair, in supplied
    /// order, joined with `AND`.
    Pairs(Vec<(String, SqlValue)>),
}

impl Where {
    /// Builds the mapping shorthand from ordered key/value pairs.
    pub fn pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<SqlValue>,
    {
        Self::Pairs(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<Criterion> for Where {
    fn from(c: Criterion) -> Self {
        Self::Criterion(c)
    }
}

impl From<CriterionGroup> for Where {
    fn from(g: CriterionGroup) -> Self {
        Self::Group(g)
    }
}

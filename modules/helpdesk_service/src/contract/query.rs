//! Query option model
//!
//! A table-agnostic description of "select + filter + sort + paginate".
//! The same value renders the same request shape no matter which table
//! consumes it; translation into SQL lives in `infra::storage::executor`.

use super::error::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A row as returned by the store: column name to JSON value, with embedded
/// relations inlined as nested objects or arrays.
pub type Row = serde_json::Map<String, Value>;

/// Page size used when an offset is given without a limit.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Gte,
    Lte,
    /// Case-sensitive pattern match
    Like,
    /// Case-insensitive pattern match
    Ilike,
    /// Set membership; value must be an array
    In,
    /// Null / boolean check
    Is,
    /// Negated equality
    Not,
    /// Array column contains every element of the value
    Contains,
    /// Array column shares at least one element with the value
    Overlaps,
}

impl FilterOp {
    pub const ALL: [FilterOp; 13] = [
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Gt,
        FilterOp::Lt,
        FilterOp::Gte,
        FilterOp::Lte,
        FilterOp::Like,
        FilterOp::Ilike,
        FilterOp::In,
        FilterOp::Is,
        FilterOp::Not,
        FilterOp::Contains,
        FilterOp::Overlaps,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::Ilike => "ilike",
            FilterOp::In => "in",
            FilterOp::Is => "is",
            FilterOp::Not => "not",
            FilterOp::Contains => "contains",
            FilterOp::Overlaps => "overlaps",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| QueryError::UnknownOperator(s.to_string()))
    }
}

/// One `{column, operator, value}` predicate. Predicates are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub column: String,
    #[serde(default, rename = "order")]
    pub direction: SortDirection,
}

/// Inclusive row range `[from, to]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowRange {
    pub from: u64,
    pub to: u64,
}

impl RowRange {
    pub fn len(&self) -> u64 {
        (self.to - self.from).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Select + filter + sort + paginate descriptor.
///
/// A zero `limit` is treated as unset, so `offset` alone still pages by
/// [`DEFAULT_PAGE_SIZE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    pub select: Option<String>,
    pub filters: Vec<Filter>,
    pub sort: Vec<Sort>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, projection: impl Into<String>) -> Self {
        self.select = Some(projection.into());
        self
    }

    pub fn filter(
        mut self,
        column: impl Into<String>,
        operator: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter::new(column, operator, value));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn order_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(Sort {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    fn effective_limit(&self) -> Option<u64> {
        self.limit.filter(|limit| *limit > 0)
    }

    /// Row range implied by `offset` (and `limit`, defaulting to 10).
    ///
    /// The end saturates at `u64::MAX`.
    pub fn range(&self) -> Option<RowRange> {
        let from = self.offset?;
        let size = self.effective_limit().unwrap_or(DEFAULT_PAGE_SIZE);
        Some(RowRange {
            from,
            to: from.saturating_add(size - 1),
        })
    }

    /// `(LIMIT, OFFSET)` pair the statement should carry.
    pub fn window(&self) -> (Option<u64>, Option<u64>) {
        match self.range() {
            Some(range) => (Some(range.len()), Some(range.from)),
            None => (self.effective_limit(), None),
        }
    }

    /// Parse the `select` string, `*` when absent.
    pub fn projection(&self) -> Result<Projection, QueryError> {
        Projection::parse(self.select.as_deref().unwrap_or("*"))
    }
}

/// Columns requested from one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    Named(Vec<String>),
}

/// A relation embedded in a projection, e.g. `profiles(id, full_name)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub relation: String,
    pub projection: Projection,
}

/// Parsed `select` expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub columns: Columns,
    pub embeds: Vec<Embed>,
}

impl Projection {
    pub fn all() -> Self {
        Self {
            columns: Columns::All,
            embeds: Vec::new(),
        }
    }

    pub fn includes(&self, column: &str) -> bool {
        match &self.columns {
            Columns::All => true,
            Columns::Named(names) => names.iter().any(|name| name == column),
        }
    }

    pub fn parse(select: &str) -> Result<Self, QueryError> {
        let invalid = |reason: &str| QueryError::InvalidProjection {
            select: select.to_string(),
            reason: reason.to_string(),
        };

        let mut all = false;
        let mut names = Vec::new();
        let mut embeds = Vec::new();

        for item in split_top_level(select).map_err(|reason| invalid(reason))? {
            let item = item.trim();
            if item.is_empty() {
                return Err(invalid("empty projection item"));
            }
            if item == "*" {
                all = true;
                continue;
            }
            match item.find('(') {
                Some(open) => {
                    if !item.ends_with(')') {
                        return Err(invalid("embedded relation must end with ')'"));
                    }
                    let relation = item[..open].trim();
                    if !is_identifier(relation) {
                        return Err(invalid("invalid relation name"));
                    }
                    let inner = &item[open + 1..item.len() - 1];
                    let projection = Projection::parse(inner).map_err(|_| invalid(inner))?;
                    embeds.push(Embed {
                        relation: relation.to_string(),
                        projection,
                    });
                }
                None => {
                    if !is_identifier(item) {
                        return Err(invalid("invalid column name"));
                    }
                    names.push(item.to_string());
                }
            }
        }

        let columns = if all { Columns::All } else { Columns::Named(names) };
        Ok(Self { columns, embeds })
    }
}

fn split_top_level(input: &str) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in input.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1).ok_or("unbalanced ')'")?;
            }
            ',' if depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err("unbalanced '('");
    }
    parts.push(&input[start..]);
    Ok(parts)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

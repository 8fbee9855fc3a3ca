//! Relational table port
//!
//! Rows travel as JSON objects. Queries carry equality/range filters, a
//! projection and an optional ordering, encoded PostgREST-style by the hosted
//! adapter and evaluated in process by the local one.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::domain::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Gte => "gte",
            Self::Lte => "lte",
        }
    }

    /// Whether `actual` satisfies this operator against `expected`
    pub fn matches(&self, actual: &JsonValue, expected: &JsonValue) -> bool {
        let Some(ord) = compare_values(actual, expected) else {
            return false;
        };
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Gte => ord != Ordering::Less,
            Self::Lte => ord != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: JsonValue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

/// A query against one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableQuery {
    pub table: String,
    pub columns: String,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
}

impl TableQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    pub fn eq(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn gte(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lte(self, column: &str, value: impl Into<JsonValue>) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            ascending,
        });
        self
    }

    fn filter(mut self, column: &str, op: FilterOp, value: impl Into<JsonValue>) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.into(),
        });
        self
    }

    /// Query string pairs in PostgREST syntax
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.columns.clone())];
        pairs.extend(self.filter_pairs());
        if let Some(order) = &self.order {
            let dir = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{}", order.column, dir)));
        }
        pairs
    }

    /// Only the filter pairs, for updates and deletes
    pub fn filter_pairs(&self) -> Vec<(String, String)> {
        self.filters
            .iter()
            .map(|f| {
                (
                    f.column.clone(),
                    format!("{}.{}", f.op.as_str(), value_text(&f.value)),
                )
            })
            .collect()
    }

    /// Whether a row passes every filter
    pub fn matches(&self, row: &JsonValue) -> bool {
        self.filters.iter().all(|f| {
            let actual = row.get(&f.column).unwrap_or(&JsonValue::Null);
            f.op.matches(actual, &f.value)
        })
    }

    /// Sort rows by the query ordering; nulls sort last
    pub fn sort(&self, rows: &mut [JsonValue]) {
        let Some(order) = &self.order else {
            return;
        };
        rows.sort_by(|a, b| {
            let left = a.get(&order.column).unwrap_or(&JsonValue::Null);
            let right = b.get(&order.column).unwrap_or(&JsonValue::Null);
            let ord = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => return Ordering::Greater,
                (false, true) => return Ordering::Less,
                (false, false) => compare_values(left, right).unwrap_or(Ordering::Equal),
            };
            if order.ascending {
                ord
            } else {
                ord.reverse()
            }
        });
    }

    /// Keep only the projected columns
    pub fn project(&self, row: JsonValue) -> JsonValue {
        if self.columns.trim() == "*" {
            return row;
        }
        let JsonValue::Object(map) = row else {
            return row;
        };
        let wanted: Vec<&str> = self.columns.split(',').map(str::trim).collect();
        JsonValue::Object(
            map.into_iter()
                .filter(|(k, _)| wanted.contains(&k.as_str()))
                .collect(),
        )
    }
}

/// Filter value as it appears in a query string
fn value_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numbers compare numerically, everything else by its text form
fn compare_values(a: &JsonValue, b: &JsonValue) -> Option<Ordering> {
    if a.is_null() || b.is_null() {
        return None;
    }
    if let (Some(x), Some(y)) = (as_number(a), as_number(b)) {
        return x.partial_cmp(&y);
    }
    Some(value_text(a).cmp(&value_text(b)))
}

fn as_number(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Decode returned rows into records
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<JsonValue>) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(Error::from))
        .collect()
}

/// Decode the first returned row, or fail with not found
pub fn first_row<T: DeserializeOwned>(rows: Vec<JsonValue>) -> Result<T> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found("Record not found"))?;
    Ok(serde_json::from_value(row)?)
}

/// Row storage scoped by the caller's access token
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn select(&self, access_token: &str, query: &TableQuery) -> Result<Vec<JsonValue>>;

    /// Insert one row and return it as stored
    async fn insert(&self, access_token: &str, table: &str, row: JsonValue) -> Result<Vec<JsonValue>>;

    /// Insert or merge on the primary key
    async fn upsert(&self, access_token: &str, table: &str, row: JsonValue) -> Result<Vec<JsonValue>>;

    /// Patch every row matching the query filters and return them
    async fn update(
        &self,
        access_token: &str,
        query: &TableQuery,
        patch: JsonValue,
    ) -> Result<Vec<JsonValue>>;

    async fn delete(&self, access_token: &str, query: &TableQuery) -> Result<()>;
}

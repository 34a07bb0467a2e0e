//! Listing query builder: produces the page statement and its count statement from one filter set.
//!
//! Both statements share a single parameter list, so the count and page queries always bind the
//! same values to the same placeholders. LIMIT/OFFSET are left to the pagination helper.

use super::params::SqlParam;

#[derive(Clone, Debug)]
pub struct ListQuery {
    select: String,
    from: String,
    where_parts: Vec<String>,
    order_by: Vec<String>,
    params: Vec<SqlParam>,
}

impl ListQuery {
    /// `select` is the projection (without `SELECT`), `from` the table expression including joins.
    pub fn new(select: impl Into<String>, from: impl Into<String>) -> Self {
        ListQuery {
            select: select.into(),
            from: from.into(),
            where_parts: Vec::new(),
            order_by: Vec::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlParam) -> usize {
        self.params.push(v);
        self.params.len()
    }

    /// `column = $n`.
    pub fn filter_eq(&mut self, column: &str, value: impl Into<SqlParam>) -> &mut Self {
        let n = self.push_param(value.into());
        self.where_parts.push(format!("{} = ${}", column, n));
        self
    }

    /// `column = $n::pg_type`, for values that arrive as text (query strings).
    pub fn filter_eq_cast(&mut self, column: &str, value: impl Into<SqlParam>, pg_type: &str) -> &mut Self {
        let n = self.push_param(value.into());
        self.where_parts.push(format!("{} = ${}::{}", column, n, pg_type));
        self
    }

    pub fn filter_bool(&mut self, column: &str, value: bool) -> &mut Self {
        self.filter_eq(column, value)
    }

    /// Case-insensitive substring match on one column.
    pub fn filter_ilike(&mut self, column: &str, text: &str) -> &mut Self {
        self.filter_any_ilike(&[column], text)
    }

    /// Case-insensitive substring match on any of `columns`; one bound value shared by all of them.
    pub fn filter_any_ilike<S: AsRef<str>>(&mut self, columns: &[S], text: &str) -> &mut Self {
        if columns.is_empty() {
            return self;
        }
        let n = self.push_param(SqlParam::String(format!("%{}%", escape_like(text))));
        let ors: Vec<String> = columns
            .iter()
            .map(|c| format!("{}::text ILIKE ${}", c.as_ref(), n))
            .collect();
        let clause = if ors.len() == 1 {
            ors.concat()
        } else {
            format!("({})", ors.join(" OR "))
        };
        self.where_parts.push(clause);
        self
    }

    pub fn order_by(&mut self, expr: impl Into<String>) -> &mut Self {
        self.order_by.push(expr.into());
        self
    }

    fn where_clause(&self) -> String {
        if self.where_parts.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_parts.join(" AND "))
        }
    }

    /// Page statement without LIMIT/OFFSET.
    pub fn page_sql(&self) -> String {
        let order = if self.order_by.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", self.order_by.join(", "))
        };
        format!("SELECT {} FROM {}{}{}", self.select, self.from, self.where_clause(), order)
    }

    pub fn count_sql(&self) -> String {
        format!("SELECT COUNT(*) FROM {}{}", self.from, self.where_clause())
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }
}

/// Escape LIKE metacharacters so user text matches literally (default escape is backslash).
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#![forbid(unsafe_code)]
//! SQL text compilation for recordit.
//!
//! Everything here is pure string building: predicate accumulation with
//! positional parameters, the handful of statement shapes the query builder
//! emits, and the expansion of collection-valued `IN ?` parameters that
//! executors apply right before running a statement.
//!
//! All statements use `?` placeholders.

use recordit_core::Value;

/// Projection used when a query does not select explicit columns.
pub const DEFAULT_PROJECTION: &str = "*";

const AND: &str = " AND ";

/// Accumulated boolean predicate text and its positional parameters.
///
/// Every fragment is stored with a leading `" AND "`; parameters are kept in
/// the exact order their fragments were appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    text: String,
    params: Vec<Value>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment without a parameter.
    pub fn and(&mut self, fragment: &str) {
        self.text.push_str(AND);
        self.text.push_str(fragment);
    }

    /// Append a fragment holding exactly one placeholder, and bind its value.
    pub fn and_bind(&mut self, fragment: &str, value: Value) {
        self.and(fragment);
        self.params.push(value);
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Raw accumulated text, including the leading connector.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Predicate text suitable after `WHERE`: the leading connector stripped once.
    pub fn where_sql(&self) -> Option<&str> {
        self.text.strip_prefix(AND)
    }
}

/// The parts of a SELECT statement over one table.
#[derive(Debug, Clone, Copy)]
pub struct SelectParts<'a> {
    pub columns: &'a str,
    pub table: &'a str,
    pub where_sql: Option<&'a str>,
    pub group_by: &'a [String],
    pub order_by: &'a [String],
}

fn push_list(sql: &mut String, keyword: &str, items: &[String]) {
    let items: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !items.is_empty() {
        sql.push_str(keyword);
        sql.push_str(&items.join(", "));
    }
}

/// Build SELECT <cols> FROM <table> WHERE <pk> = ? LIMIT 1
pub fn select_by_id(columns: &str, table: &str, pk: &str) -> String {
    format!(
        "SELECT {cols} FROM {table} WHERE {pk} = ? LIMIT 1",
        cols = columns,
        table = table,
        pk = pk
    )
}

/// Build SELECT <cols> FROM <table> [WHERE ..] [GROUP BY ..] [ORDER BY ..]
pub fn select(parts: &SelectParts<'_>) -> String {
    let mut sql = format!(
        "SELECT {cols} FROM {table}",
        cols = parts.columns,
        table = parts.table
    );
    if let Some(w) = parts.where_sql {
        if !w.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(w);
        }
    }
    push_list(&mut sql, " GROUP BY ", parts.group_by);
    push_list(&mut sql, " ORDER BY ", parts.order_by);
    sql
}

/// Build a SELECT with optional LIMIT and OFFSET appended.
pub fn select_with_pagination(
    parts: &SelectParts<'_>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> String {
    let mut sql = select(parts);
    if let Some(l) = limit {
        sql.push_str(" LIMIT ");
        sql.push_str(&l.to_string());
    }
    if let Some(off) = offset {
        sql.push_str(" OFFSET ");
        sql.push_str(&off.to_string());
    }
    sql
}

/// Build SELECT COUNT(*) FROM <table> [WHERE ..]
pub fn select_count(table: &str, where_sql: Option<&str>) -> String {
    match where_sql.filter(|w| !w.trim().is_empty()) {
        Some(w) => format!("SELECT COUNT(*) FROM {table} WHERE {w}", table = table, w = w),
        None => format!("SELECT COUNT(*) FROM {table}", table = table),
    }
}

/// Build SELECT COUNT(*) over the rows `select(parts)` would return.
///
/// Plain projections count the table directly; `DISTINCT` projections and
/// GROUP BY count the derived rows of an unbounded subquery.
pub fn select_count_of(parts: &SelectParts<'_>) -> String {
    let grouped = parts.group_by.iter().any(|g| !g.trim().is_empty());
    if !grouped && parts.columns.trim() == DEFAULT_PROJECTION {
        return select_count(parts.table, parts.where_sql);
    }
    let inner = SelectParts {
        order_by: &[],
        ..*parts
    };
    format!("SELECT COUNT(*) FROM ({inner}) AS t", inner = select(&inner))
}

/// Build INSERT INTO <table> (<cols>) VALUES (<placeholders>)
pub fn insert(table: &str, columns: &[&str]) -> String {
    let phs = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {table} ({cols}) VALUES ({vals})",
        table = table,
        cols = columns.join(", "),
        vals = phs
    )
}

/// A statement whose placeholders and bound parameters disagree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("statement has {placeholders} placeholders but {params} parameters were bound")]
pub struct PlaceholderMismatch {
    pub placeholders: usize,
    pub params: usize,
}

/// Rewrite every `?` bound to a [`Value::List`] into `(?, ?, ...)` and flatten
/// the list into the parameter sequence, keeping positional order.
///
/// An empty list becomes `(NULL)`, which matches nothing. Question marks inside
/// quoted literals or identifiers are not placeholders.
pub fn expand_params(
    sql: &str,
    params: &[Value],
) -> Result<(String, Vec<Value>), PlaceholderMismatch> {
    let mut out = String::with_capacity(sql.len());
    let mut flat = Vec::with_capacity(params.len());
    let mut quote: Option<char> = None;
    let mut index = 0usize;

    for ch in sql.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                out.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    out.push(ch);
                }
                '?' => {
                    match params.get(index) {
                        Some(Value::List(items)) if items.is_empty() => out.push_str("(NULL)"),
                        Some(Value::List(items)) => {
                            out.push('(');
                            out.push_str(&vec!["?"; items.len()].join(", "));
                            out.push(')');
                            flat.extend(items.iter().cloned());
                        }
                        Some(v) => {
                            out.push('?');
                            flat.push(v.clone());
                        }
                        None => out.push('?'),
                    }
                    index += 1;
                }
                _ => out.push(ch),
            },
        }
    }

    if index != params.len() {
        return Err(PlaceholderMismatch {
            placeholders: index,
            params: params.len(),
        });
    }
    Ok((out, flat))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts<'a>(where_sql: Option<&'a str>, group: &'a [String], order: &'a [String]) -> SelectParts<'a> {
        SelectParts {
            columns: DEFAULT_PROJECTION,
            table: "users",
            where_sql,
            group_by: group,
            order_by: order,
        }
    }

    #[test]
    fn conditions_accumulate_in_order() {
        let mut c = Conditions::new();
        assert!(c.is_empty());
        assert_eq!(c.where_sql(), None);
        c.and_bind("age > ?", Value::I64(15));
        c.and("name IS NOT NULL");
        c.and_bind("name LIKE ?", Value::from("%j%"));
        assert_eq!(
            c.text(),
            " AND age > ? AND name IS NOT NULL AND name LIKE ?"
        );
        assert_eq!(
            c.where_sql(),
            Some("age > ? AND name IS NOT NULL AND name LIKE ?")
        );
        assert_eq!(
            c.params(),
            &[Value::I64(15), Value::String("%j%".into())]
        );
    }

    #[test]
    fn where_sql_strips_connector_once() {
        let mut c = Conditions::new();
        c.and(" AND x = 1");
        assert_eq!(c.where_sql(), Some(" AND x = 1"));
    }

    #[test]
    fn test_select_by_id_default() {
        assert_eq!(
            select_by_id("*", "users", "id"),
            "SELECT * FROM users WHERE id = ? LIMIT 1"
        );
        assert_eq!(
            select_by_id("id, name", "people", "uid"),
            "SELECT id, name FROM people WHERE uid = ? LIMIT 1"
        );
    }

    #[test]
    fn test_select_plain() {
        assert_eq!(select(&parts(None, &[], &[])), "SELECT * FROM users");
    }

    #[test]
    fn test_select_full() {
        let group = vec!["age".to_string()];
        let order = vec!["age DESC".to_string(), "id ASC".to_string()];
        assert_eq!(
            select(&parts(Some("age > ?"), &group, &order)),
            "SELECT * FROM users WHERE age > ? GROUP BY age ORDER BY age DESC, id ASC"
        );
    }

    #[test]
    fn test_select_blank_fragments_ignored() {
        let order = vec!["   \t".to_string()];
        assert_eq!(
            select(&parts(Some("  "), &[], &order)),
            "SELECT * FROM users"
        );
    }

    #[test]
    fn test_select_with_pagination() {
        let order = vec!["id DESC".to_string()];
        assert_eq!(
            select_with_pagination(&parts(None, &[], &order), Some(10), Some(20)),
            "SELECT * FROM users ORDER BY id DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            select_with_pagination(&parts(None, &[], &[]), Some(7), None),
            "SELECT * FROM users LIMIT 7"
        );
    }

    #[test]
    fn test_select_count() {
        assert_eq!(select_count("users", None), "SELECT COUNT(*) FROM users");
        assert_eq!(
            select_count("users", Some("age > ? AND name IS NOT NULL")),
            "SELECT COUNT(*) FROM users WHERE age > ? AND name IS NOT NULL"
        );
    }

    #[test]
    fn test_select_count_blank_predicate() {
        assert_eq!(select_count("users", Some("   ")), "SELECT COUNT(*) FROM users");
    }

    #[test]
    fn test_select_count_of() {
        let group = vec!["age".to_string()];
        let order = vec!["age DESC".to_string()];
        assert_eq!(
            select_count_of(&parts(Some("age > ?"), &[], &order)),
            "SELECT COUNT(*) FROM users WHERE age > ?"
        );
        assert_eq!(
            select_count_of(&parts(None, &group, &order)),
            "SELECT COUNT(*) FROM (SELECT * FROM users GROUP BY age) AS t"
        );
        let distinct = SelectParts {
            columns: "DISTINCT age",
            ..parts(Some("age > ?"), &[], &order)
        };
        assert_eq!(
            select_count_of(&distinct),
            "SELECT COUNT(*) FROM (SELECT DISTINCT age FROM users WHERE age > ?) AS t"
        );
    }

    #[test]
    fn test_insert() {
        assert_eq!(
            insert("users", &["name", "age"]),
            "INSERT INTO users (name, age) VALUES (?, ?)"
        );
    }

    #[test]
    fn expand_list_parameter() {
        let params = vec![
            Value::I64(15),
            Value::from(vec![1, 2, 3]),
            Value::from("j%"),
        ];
        let (sql, flat) =
            expand_params("SELECT * FROM users WHERE age > ? AND id IN ? AND name LIKE ?", &params)
                .unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM users WHERE age > ? AND id IN (?, ?, ?) AND name LIKE ?"
        );
        assert_eq!(
            flat,
            vec![
                Value::I64(15),
                Value::I64(1),
                Value::I64(2),
                Value::I64(3),
                Value::String("j%".into())
            ]
        );
    }

    #[test]
    fn expand_empty_list_matches_nothing() {
        let (sql, flat) =
            expand_params("SELECT * FROM t WHERE id IN ?", &[Value::List(vec![])]).unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE id IN (NULL)");
        assert!(flat.is_empty());
    }

    #[test]
    fn expand_ignores_quoted_question_marks() {
        let (sql, flat) =
            expand_params("SELECT * FROM t WHERE note = 'why?' AND id = ?", &[Value::I64(1)])
                .unwrap();
        assert_eq!(sql, "SELECT * FROM t WHERE note = 'why?' AND id = ?");
        assert_eq!(flat, vec![Value::I64(1)]);
    }

    #[test]
    fn expand_reports_mismatch() {
        let err = expand_params("SELECT * FROM t WHERE a = ? AND b = ?", &[Value::I64(1)])
            .unwrap_err();
        assert_eq!(
            err,
            PlaceholderMismatch {
                placeholders: 2,
                params: 1
            }
        );
        let err = expand_params("SELECT * FROM t", &[Value::I64(1)]).unwrap_err();
        assert_eq!(err.placeholders, 0);
    }
}

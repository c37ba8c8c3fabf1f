use proptest::prelude::*;
use recordit_core::Value;
use recordit_sql_builder::{expand_params, select_count, Conditions};

/// One chained predicate call, as the query builder issues them.
#[derive(Debug, Clone)]
enum Call {
    Where(String),
    WhereValue(String, i64),
    Not(String, i64),
    Like(String, String),
    IsNotNull(String),
    In(String, Vec<i64>),
}

fn column() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,8}"
}

fn call() -> impl Strategy<Value = Call> {
    prop_oneof![
        column().prop_map(|c| Call::Where(format!("{} IS NULL", c))),
        (column(), any::<i64>()).prop_map(|(c, v)| Call::WhereValue(format!("{} > ?", c), v)),
        (column(), any::<i64>()).prop_map(|(c, v)| Call::Not(c, v)),
        (column(), "[a-z%]{0,6}").prop_map(|(c, v)| Call::Like(c, v)),
        column().prop_map(Call::IsNotNull),
        (column(), prop::collection::vec(any::<i64>(), 0..5)).prop_map(|(c, v)| Call::In(c, v)),
    ]
}

fn apply(calls: &[Call]) -> (Conditions, Vec<Value>) {
    let mut c = Conditions::new();
    let mut expected = Vec::new();
    for call in calls {
        match call {
            Call::Where(p) => c.and(p),
            Call::WhereValue(p, v) => {
                c.and_bind(p, Value::from(*v));
                expected.push(Value::from(*v));
            }
            Call::Not(col, v) => {
                c.and_bind(&format!("{} != ?", col), Value::from(*v));
                expected.push(Value::from(*v));
            }
            Call::Like(col, v) => {
                c.and_bind(&format!("{} LIKE ?", col), Value::from(v.as_str()));
                expected.push(Value::from(v.as_str()));
            }
            Call::IsNotNull(col) => c.and(&format!("{} IS NOT NULL", col)),
            Call::In(col, vs) => {
                c.and_bind(&format!("{} IN ?", col), Value::from(vs.clone()));
                expected.push(Value::from(vs.clone()));
            }
        }
    }
    (c, expected)
}

proptest! {
    // Property: placeholders in the accumulated text equal bound params, in call order.
    #[test]
    fn placeholder_count_matches_params(calls in prop::collection::vec(call(), 0..12)) {
        let (c, expected) = apply(&calls);
        prop_assert_eq!(c.text().matches('?').count(), c.params().len());
        prop_assert_eq!(c.params(), expected.as_slice());
    }

    // Property: COUNT has no WHERE without predicates, and strips exactly one connector otherwise.
    #[test]
    fn count_where_clause(calls in prop::collection::vec(call(), 0..6)) {
        let (c, _) = apply(&calls);
        let sql = select_count("users", c.where_sql());
        if calls.is_empty() {
            prop_assert_eq!(sql, "SELECT COUNT(*) FROM users");
        } else {
            prop_assert!(sql.starts_with("SELECT COUNT(*) FROM users WHERE "));
            prop_assert!(!sql.contains("WHERE  AND"));
            prop_assert!(!sql.contains("WHERE AND"));
            prop_assert_eq!(sql.matches(" AND ").count(), calls.len() - 1);
        }
    }

    // Property: after expansion each placeholder carries exactly one scalar parameter.
    #[test]
    fn expansion_flattens_lists(calls in prop::collection::vec(call(), 0..8)) {
        let (c, _) = apply(&calls);
        let sql = select_count("users", c.where_sql());
        let (expanded, flat) = expand_params(&sql, c.params()).expect("counts agree");
        prop_assert_eq!(expanded.matches('?').count(), flat.len());
        prop_assert!(flat.iter().all(|v| !matches!(v, Value::List(_))));
    }
}

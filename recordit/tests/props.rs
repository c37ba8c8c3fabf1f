use proptest::prelude::*;
use recordit::{Query, Value};
use tests_common::{RecordingExecutor, User};

/// One chained predicate call on the builder.
#[derive(Debug, Clone)]
enum Step {
    WhereValue(i64),
    Not(i64),
    Like(String),
    IsNotNull,
    In(Vec<i64>),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<i64>().prop_map(Step::WhereValue),
        any::<i64>().prop_map(Step::Not),
        "[a-z%]{0,6}".prop_map(Step::Like),
        Just(Step::IsNotNull),
        prop::collection::vec(any::<i64>(), 0..5).prop_map(Step::In),
    ]
}

/// Apply `steps` and return the fragments and parameters they should produce.
fn apply(q: &mut Query<User>, steps: &[Step]) -> (Vec<&'static str>, Vec<Value>) {
    let mut fragments = Vec::new();
    let mut params = Vec::new();
    for s in steps {
        match s {
            Step::WhereValue(v) => {
                q.where_value("age > ?", *v);
                fragments.push("age > ?");
                params.push(Value::I64(*v));
            }
            Step::Not(v) => {
                q.not("age", *v);
                fragments.push("age != ?");
                params.push(Value::I64(*v));
            }
            Step::Like(p) => {
                q.like("name", p.as_str());
                fragments.push("name LIKE ?");
                params.push(Value::from(p.as_str()));
            }
            Step::IsNotNull => {
                q.is_not_null("name");
                fragments.push("name IS NOT NULL");
            }
            Step::In(vs) => {
                q.in_("id", vs.clone());
                fragments.push("id IN ?");
                params.push(Value::from(vs.clone()));
            }
        }
    }
    (fragments, params)
}

proptest! {
    // Property: the builder keeps fragments and params in call order, one param per placeholder.
    #[test]
    fn builder_params_follow_call_order(steps in prop::collection::vec(step(), 0..10)) {
        let exec = RecordingExecutor::new();
        let mut q = Query::<User>::with_config(exec.config());
        let (fragments, params) = apply(&mut q, &steps);

        let expected: String = fragments.iter().map(|f| format!(" AND {}", f)).collect();
        prop_assert_eq!(q.predicate(), expected.as_str());
        prop_assert_eq!(q.params(), params.as_slice());
        prop_assert_eq!(q.predicate().matches('?').count(), q.params().len());
    }

    // Property: count sends exactly the accumulated params and leaves the builder fresh.
    #[test]
    fn count_sends_accumulated_params(steps in prop::collection::vec(step(), 0..10)) {
        let exec = RecordingExecutor::new();
        let mut q = Query::<User>::with_config(exec.config());
        let (fragments, params) = apply(&mut q, &steps);
        q.count().unwrap();

        let stmt = exec.last().unwrap();
        if fragments.is_empty() {
            prop_assert_eq!(stmt.sql.as_str(), "SELECT COUNT(*) FROM users");
        } else {
            prop_assert_eq!(
                stmt.sql,
                format!("SELECT COUNT(*) FROM users WHERE {}", fragments.join(" AND "))
            );
        }
        prop_assert_eq!(stmt.params, params);
        prop_assert_eq!(stmt.expanded_sql.matches('?').count(), stmt.expanded_params.len());
        prop_assert!(q.is_fresh());
    }
}

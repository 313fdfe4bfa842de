//! Property-based tests for surrogate chains
//!
//! These tests check that:
//! - Reading through a surrogate matches reading the value directly
//! - A failure anywhere upstream reaches the end of a chain unchanged
//! - Paths record every step of the chain

use proptest::prelude::*;

use eventual::property;
use eventual::test_support::{expect_fault, rejected, resolved, settle};
use eventual::{Fault, PropertyKey, Surrogate, Value};

// ============================================================================
// Strategies
// ============================================================================

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        (-1000i32..1000).prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

/// Nested objects and arrays with small member names
fn tree() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::vec(("[a-c]", inner), 0..4).prop_map(|members| Value::object(members)),
        ]
    })
}

#[derive(Debug, Clone)]
enum Step {
    Get(String),
    Index(usize),
    Call,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-c]|length|toString".prop_map(Step::Get),
        (0usize..4).prop_map(Step::Index),
        Just(Step::Call),
    ]
}

fn apply_step(surrogate: &Surrogate, step: &Step) -> Surrogate {
    match step {
        Step::Get(name) => surrogate.get(name.as_str()),
        Step::Index(i) => surrogate.index(*i),
        Step::Call => surrogate.call([]),
    }
}

/// The same read performed directly on a value
fn direct_read(value: &Value, key: &PropertyKey) -> Result<Value, Fault> {
    if value.is_absent() {
        return Err(Fault::AbsentReceiver {
            key: key.clone(),
            receiver: value.type_name(),
            path: "$".to_string(),
        });
    }
    if property::is_reachable(value, key) {
        property::read_property(value, key)
    } else {
        Ok(Value::Undefined)
    }
}

// ============================================================================
// Property: Chaining Equals Direct Access
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_get_matches_direct_read(value in tree(), name in "[a-c]|length") {
        let key = PropertyKey::from(name.as_str());
        let direct = direct_read(&value, &key);
        let chained = settle(&resolved(value).get(name.as_str()));
        prop_assert_eq!(direct, chained);
    }

    #[test]
    fn prop_index_matches_direct_read(items in prop::collection::vec(leaf(), 0..6), i in 0usize..8) {
        let expected = items.get(i).cloned().unwrap_or(Value::Undefined);
        let chained = settle(&resolved(Value::from(items)).index(i));
        prop_assert_eq!(chained, Ok(expected));
    }

    #[test]
    fn prop_round_trip(value in tree()) {
        prop_assert_eq!(settle(&resolved(value.clone())), Ok(value));
    }
}

// ============================================================================
// Property: Failure Propagation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_upstream_failure_reaches_the_end(
        payload in -100i32..100,
        steps in prop::collection::vec(step(), 0..8),
    ) {
        let original = Fault::thrown(payload);
        let mut surrogate = rejected(original.clone());
        for step in &steps {
            surrogate = apply_step(&surrogate, step);
        }
        prop_assert_eq!(expect_fault(&surrogate), original);
    }

    #[test]
    fn prop_absence_fails_any_read(name in "[a-z]{1,6}", null in any::<bool>()) {
        let absent = if null { Value::Null } else { Value::Undefined };
        let fault = expect_fault(&resolved(absent).get(name.as_str()));
        let is_absent_receiver = matches!(fault, Fault::AbsentReceiver { .. });
        prop_assert!(is_absent_receiver);
    }

    #[test]
    fn prop_path_records_each_step(steps in prop::collection::vec(step(), 0..8)) {
        let mut surrogate = resolved(Value::Null);
        let mut expected = String::from("$");
        for step in &steps {
            surrogate = apply_step(&surrogate, step);
            match step {
                Step::Get(name) => expected.push_str(&format!(".{}", name)),
                Step::Index(i) => expected.push_str(&format!("[{}]", i)),
                Step::Call => expected.push_str("()"),
            }
        }
        prop_assert_eq!(surrogate.path(), expected.as_str());
    }
}

#![allow(clippy::unwrap_used, clippy::expect_used)]

use cmdbx_core::{CompareOp, Condition, FieldValue, Predicate};
use proptest::prelude::*;

fn field_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("ip".to_string()),
        Just("cpu".to_string()),
        Just("name".to_string()),
        "[a-z]{1,6}",
    ]
}

fn scalar() -> impl Strategy<Value = FieldValue> {
    prop_oneof![
        Just(FieldValue::Null),
        any::<bool>().prop_map(FieldValue::Bool),
        any::<i64>().prop_map(FieldValue::Int),
        "[a-z0-9.]{0,8}".prop_map(FieldValue::String),
    ]
}

fn predicate() -> impl Strategy<Value = Predicate> {
    let compare = (
        field_name(),
        prop_oneof![
            Just(CompareOp::Eq),
            Just(CompareOp::Ne),
            Just(CompareOp::Lt),
            Just(CompareOp::Lte),
            Just(CompareOp::Gt),
            Just(CompareOp::Gte),
        ],
        scalar(),
    )
        .prop_map(|(f, op, v)| Predicate::new(f, op, v));

    let membership = (
        field_name(),
        prop_oneof![Just(CompareOp::In), Just(CompareOp::NotIn)],
        prop::collection::vec(scalar(), 0..4),
    )
        .prop_map(|(f, op, vs)| Predicate::new(f, op, FieldValue::List(vs)));

    prop_oneof![compare, membership]
}

proptest! {
    #[test]
    fn test_mapping_preserves_predicates(preds in prop::collection::vec(predicate(), 0..8)) {
        let mut cond = Condition::new();
        for p in preds {
            cond.push(p);
        }

        let back = Condition::from_mapping(&cond.to_mapping()).unwrap();
        prop_assert!(back.same_predicates(&cond));
    }

    #[test]
    fn test_parse_merge_is_additive(
        left in prop::collection::vec(predicate(), 0..4),
        right in prop::collection::vec(predicate(), 0..4),
    ) {
        let mut a = Condition::new();
        for p in left {
            a.push(p);
        }
        let mut b = Condition::new();
        for p in right {
            b.push(p);
        }

        let mut merged = a.clone();
        merged.parse(&b.to_mapping()).unwrap();
        prop_assert_eq!(merged.len(), a.len() + b.len());
    }
}

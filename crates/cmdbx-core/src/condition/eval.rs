use std::cmp::Ordering;

use super::{CompareOp, Condition, Predicate};
use crate::errors::CoreError;
use crate::model::{FieldValue, MapStr};

impl Condition {
    /// Evaluate the conjunction against a document held in memory
    ///
    /// A missing field reads as null. Opaque operators cannot be evaluated
    /// here and fail with `MalformedFilter`.
    pub fn matches(&self, doc: &MapStr) -> Result<bool, CoreError> {
        for p in self.predicates() {
            let actual = doc.get(&p.field).unwrap_or(&FieldValue::Null);
            if !predicate_holds(p, actual)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

fn predicate_holds(p: &Predicate, actual: &FieldValue) -> Result<bool, CoreError> {
    let ordered = |want: &[Ordering]| {
        actual
            .compare(&p.value)
            .map(|ord| want.contains(&ord))
            .unwrap_or(false)
    };

    let holds = match &p.op {
        CompareOp::Eq => actual.loose_eq(&p.value),
        CompareOp::Ne => !actual.loose_eq(&p.value),
        CompareOp::Lt => ordered(&[Ordering::Less]),
        CompareOp::Lte => ordered(&[Ordering::Less, Ordering::Equal]),
        CompareOp::Gt => ordered(&[Ordering::Greater]),
        CompareOp::Gte => ordered(&[Ordering::Greater, Ordering::Equal]),
        CompareOp::In | CompareOp::NotIn => {
            let candidates = p.value.as_list().ok_or_else(|| CoreError::MalformedFilter {
                reason: format!("'{}' on '{}' needs a list", p.op, p.field),
            })?;
            let found = candidates.iter().any(|c| actual.loose_eq(c));
            if p.op == CompareOp::In {
                found
            } else {
                !found
            }
        }
        CompareOp::Other(name) => {
            return Err(CoreError::MalformedFilter {
                reason: format!("operator '{}' cannot be evaluated in memory", name),
            })
        }
    };
    Ok(holds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> MapStr {
        MapStr::new()
            .with("ip", "10.0.0.1")
            .with("cpu", 4)
            .with("mem", 15.5)
    }

    #[test]
    fn test_eq_and_ne() {
        let mut cond = Condition::new();
        cond.field("ip").eq("10.0.0.1").field("cpu").ne(8);
        assert!(cond.matches(&doc()).unwrap());
    }

    #[test]
    fn test_ordering_ops() {
        let mut cond = Condition::new();
        cond.field("cpu").gte(4).field("cpu").lt(5).field("mem").gt(15);
        assert!(cond.matches(&doc()).unwrap());

        let mut cond = Condition::new();
        cond.field("ip").gt(3);
        assert!(!cond.matches(&doc()).unwrap());
    }

    #[test]
    fn test_in_and_not_in() {
        let mut cond = Condition::new();
        cond.field("cpu").in_(vec![2, 4]).field("ip").not_in(vec!["10.0.0.9"]);
        assert!(cond.matches(&doc()).unwrap());
    }

    #[test]
    fn test_missing_field_is_null() {
        let mut cond = Condition::new();
        cond.field("os").eq(FieldValue::Null);
        assert!(cond.matches(&doc()).unwrap());
    }

    #[test]
    fn test_opaque_operator_errors() {
        let mut cond = Condition::new();
        cond.field("ip").op(CompareOp::Other("$regex".to_string()), "^10");
        assert!(cond.matches(&doc()).is_err());
    }

    #[test]
    fn test_empty_condition_matches_everything() {
        assert!(Condition::new().matches(&doc()).unwrap());
    }
}

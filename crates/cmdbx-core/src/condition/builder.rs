use serde::Serialize;

use super::CompareOp;
use crate::model::FieldValue;

/// One `(field, operator, value)` triple
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub field: String,
    pub op: CompareOp,
    pub value: FieldValue,
}

impl Predicate {
    pub fn new(field: impl Into<String>, op: CompareOp, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn is_eq(&self) -> bool {
        self.op == CompareOp::Eq
    }
}

/// Conjunction of predicates, in insertion order
///
/// Repeated predicates on the same field are kept side by side; nothing is
/// overwritten.
///
/// ```
/// use cmdbx_core::condition::Condition;
///
/// let mut cond = Condition::new();
/// cond.field("owner_id").eq("acme").field("cpu").gte(4);
/// assert_eq!(cond.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Condition {
    predicates: Vec<Predicate>,
}

impl Condition {
    pub fn new() -> Self {
        Self {
            predicates: Vec::new(),
        }
    }

    /// Start a predicate on `name`
    pub fn field(&mut self, name: impl Into<String>) -> FieldBuilder<'_> {
        FieldBuilder {
            cond: self,
            name: name.into(),
        }
    }

    pub fn push(&mut self, predicate: Predicate) -> &mut Self {
        self.predicates.push(predicate);
        self
    }

    /// Append every predicate of `other`
    pub fn extend(&mut self, other: Condition) -> &mut Self {
        self.predicates.extend(other.predicates);
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn predicates_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a Predicate> {
        self.predicates.iter().filter(move |p| p.field == field)
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.predicates.iter().any(|p| p.field == field)
    }

    /// The value of the single equality predicate on `field`, if exactly
    /// one exists
    pub fn eq_value(&self, field: &str) -> Option<&FieldValue> {
        let mut eqs = self
            .predicates
            .iter()
            .filter(|p| p.field == field && p.is_eq());
        match (eqs.next(), eqs.next()) {
            (Some(p), None) => Some(&p.value),
            _ => None,
        }
    }

    /// Drop every predicate on `field`, returning them
    pub fn take_field(&mut self, field: &str) -> Vec<Predicate> {
        let (taken, kept) = std::mem::take(&mut self.predicates)
            .into_iter()
            .partition(|p| p.field == field);
        self.predicates = kept;
        taken
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Order-insensitive comparison of two conjunctions
    pub fn same_predicates(&self, other: &Condition) -> bool {
        self.normalized() == other.normalized()
    }

    fn normalized(&self) -> Vec<(String, String, String)> {
        let mut keys: Vec<_> = self
            .predicates
            .iter()
            .map(|p| {
                (
                    p.field.clone(),
                    p.op.as_str().to_string(),
                    p.value.to_json().to_string(),
                )
            })
            .collect();
        keys.sort();
        keys
    }
}

/// Pending predicate on one field; finishing it appends to the condition
pub struct FieldBuilder<'a> {
    cond: &'a mut Condition,
    name: String,
}

impl<'a> FieldBuilder<'a> {
    pub fn op(self, op: CompareOp, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.cond.push(Predicate::new(self.name, op, value))
    }

    pub fn eq(self, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.op(CompareOp::Eq, value)
    }

    pub fn ne(self, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.op(CompareOp::Ne, value)
    }

    pub fn lt(self, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.op(CompareOp::Lt, value)
    }

    pub fn lte(self, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.op(CompareOp::Lte, value)
    }

    pub fn gt(self, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.op(CompareOp::Gt, value)
    }

    pub fn gte(self, value: impl Into<FieldValue>) -> &'a mut Condition {
        self.op(CompareOp::Gte, value)
    }

    pub fn in_<T: Into<FieldValue>>(self, values: Vec<T>) -> &'a mut Condition {
        self.op(CompareOp::In, FieldValue::from(values))
    }

    pub fn not_in<T: Into<FieldValue>>(self, values: Vec<T>) -> &'a mut Condition {
        self.op(CompareOp::NotIn, FieldValue::from(values))
    }
}

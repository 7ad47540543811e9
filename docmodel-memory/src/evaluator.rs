//! Filter evaluation for in-memory documents.
//!
//! Values are compared through [`Comparable`], which puts every numeric BSON type on one
//! scale so that an `Int32` field matches an `Int64` or `Double` filter value. Integers are
//! compared exactly, also against floats. Values of different kinds never match each other.
//! When sorting they are grouped by kind: null, bool, number, string, datetime, then
//! everything else.

use std::cmp::Ordering;

use bson::{Bson, DateTime, Document};

use docmodel_core::{
    error::StoreError,
    query::{Filter, FieldOp, QueryVisitor},
    schema::ID_FIELD,
};

/// 2^63, the first float past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Comparable view of a primitive BSON value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    /// `Int32` and `Int64`.
    Int(i64),
    Float(f64),
    DateTime(DateTime),
    String(&'a str),
    /// Arrays, documents and exotic BSON types. Equal to nothing, not even itself.
    Other,
}

impl Comparable<'_> {
    fn rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Bool(_) => 1,
            Comparable::Int(_) | Comparable::Float(_) => 2,
            Comparable::String(_) => 3,
            Comparable::DateTime(_) => 4,
            Comparable::Other => 5,
        }
    }

    fn is_nan(&self) -> bool {
        matches!(self, Comparable::Float(value) if value.is_nan())
    }

    /// Total order used for sorting. NaN sorts after every other number.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.rank()
            .cmp(&other.rank())
            .then_with(|| {
                self.partial_cmp(other)
                    .unwrap_or_else(|| self.is_nan().cmp(&other.is_nan()))
            })
    }
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Int(i64::from(*value)),
            Bson::Int64(value) => Comparable::Int(*value),
            Bson::Double(value) => Comparable::Float(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            _ => Comparable::Other,
        }
    }
}

/// Compares an integer with a float without rounding the integer.
fn compare_int_float(int: i64, float: f64) -> Option<Ordering> {
    if float.is_nan() {
        return None;
    }
    if float >= I64_BOUND {
        return Some(Ordering::Less);
    }
    if float < -I64_BOUND {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    let fraction = float - whole;

    Some(int.cmp(&(whole as i64)).then(if fraction > 0.0 {
        Ordering::Less
    } else if fraction < 0.0 {
        Ordering::Greater
    } else {
        Ordering::Equal
    }))
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => Some(Ordering::Equal),
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Int(b)) => a.partial_cmp(b),
            (Comparable::Int(a), Comparable::Float(b)) => compare_int_float(*a, *b),
            (Comparable::Float(a), Comparable::Int(b)) => {
                compare_int_float(*b, *a).map(Ordering::reverse)
            }
            (Comparable::Float(a), Comparable::Float(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Order used for sorting: missing and null values first, then grouped by kind and ordered
/// by value within a kind.
pub(crate) fn sort_order(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    let left = left.map_or(Comparable::Null, Comparable::from);
    let right = right.map_or(Comparable::Null, Comparable::from);

    left.sort_cmp(&right)
}

/// Evaluates filters against one stored document and its key.
pub(crate) struct DocumentEvaluator<'a> {
    id: &'a str,
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(id: &'a str, document: &'a Document) -> Self {
        Self { id, document }
    }

    /// Returns `true` if the document satisfies every filter.
    pub fn matches(&mut self, filters: &[Filter]) -> Result<bool, StoreError> {
        self.visit_filters(filters)
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = StoreError;

    fn visit_filter(&mut self, field: &str, op: FieldOp, value: &Bson) -> Result<bool, StoreError> {
        let key;
        let stored = if field == ID_FIELD {
            key = Bson::String(self.id.to_string());
            &key
        } else {
            match self.document.get(field) {
                Some(stored) => stored,
                None => return Ok(false),
            }
        };

        let (left, right) = (Comparable::from(stored), Comparable::from(value));

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Lte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Less | Ordering::Equal)
            ),
            FieldOp::Gte => matches!(
                left.partial_cmp(&right),
                Some(Ordering::Greater | Ordering::Equal)
            ),
        })
    }

    fn visit_all(&mut self, clauses: Vec<bool>) -> Result<bool, StoreError> {
        Ok(clauses.into_iter().all(|matched| matched))
    }
}

//! Dynamic values described by a [`TypeShape`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use uuid::Uuid;

use crate::identifier::DEFAULT_IDENTIFIER;
use crate::shape::{LeafKind, TypeShape};

/// A value of some [`TypeShape`].
///
/// `Map`, `Optional` and `Sequence` are nil-able: `None` is the absent value,
/// distinct from a present empty container. Record fields are positional, in
/// the order of the record shape's fields.
///
/// Values are totally ordered so they can key a map; floats compare with
/// [`f64::total_cmp`].
#[derive(Debug, Clone)]
pub enum Value {
    Identifier(Uuid),
    Text(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Array(Vec<Value>),
    Map(Option<BTreeMap<Value, Value>>),
    Optional(Option<Box<Value>>),
    Sequence(Option<Vec<Value>>),
    Record(Vec<Value>),
}

impl Value {
    /// The zero value of `shape`: nil identifier, empty text, `false`, `0`,
    /// zeroed arrays and records, absent maps, optionals and sequences.
    pub fn zero(shape: &TypeShape) -> Self {
        match shape {
            TypeShape::Leaf(LeafKind::Identifier) => Self::Identifier(DEFAULT_IDENTIFIER),
            TypeShape::Leaf(LeafKind::Text) => Self::Text(String::new()),
            TypeShape::Leaf(LeafKind::Bool) => Self::Bool(false),
            TypeShape::Leaf(LeafKind::Int(_)) => Self::Int(0),
            TypeShape::Leaf(LeafKind::Uint(_)) => Self::Uint(0),
            TypeShape::Leaf(LeafKind::Float(_)) => Self::Float(0.0),
            TypeShape::FixedArray(len, elem) => Self::Array(zero_items(*len, elem)),
            TypeShape::Map(..) => Self::Map(None),
            TypeShape::Optional(_) => Self::Optional(None),
            TypeShape::Sequence(_) => Self::Sequence(None),
            TypeShape::Record(record) => Self::Record(
                record
                    .fields
                    .iter()
                    .map(|field| Self::zero(&field.shape))
                    .collect(),
            ),
        }
    }

    /// Filler for a destination slot that a copy function overwrites whole.
    pub(crate) fn placeholder() -> Self {
        Self::Optional(None)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Identifier(_) => "identifier",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Optional(_) => "optional",
            Self::Sequence(_) => "sequence",
            Self::Record(_) => "record",
        }
    }

    /// Whether this value, all the way down, is a value of `shape`.
    pub fn conforms_to(&self, shape: &TypeShape) -> bool {
        match (shape, self) {
            (TypeShape::Leaf(leaf), value) => leaf_admits(*leaf, value),
            (TypeShape::FixedArray(len, elem), Self::Array(items)) => {
                items.len() == *len && items.iter().all(|item| item.conforms_to(elem))
            }
            (TypeShape::Map(key, value), Self::Map(entries)) => {
                entries.as_ref().map_or(true, |entries| {
                    entries
                        .iter()
                        .all(|(k, v)| k.conforms_to(key) && v.conforms_to(value))
                })
            }
            (TypeShape::Optional(inner), Self::Optional(slot)) => {
                slot.as_deref().map_or(true, |value| value.conforms_to(inner))
            }
            (TypeShape::Sequence(elem), Self::Sequence(items)) => items
                .as_ref()
                .map_or(true, |items| items.iter().all(|item| item.conforms_to(elem))),
            (TypeShape::Record(record), Self::Record(fields)) => {
                fields.len() == record.fields.len()
                    && record
                        .fields
                        .iter()
                        .zip(fields)
                        .all(|(field, value)| value.conforms_to(&field.shape))
            }
            _ => false,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Identifier(_) => 0,
            Self::Text(_) => 1,
            Self::Bool(_) => 2,
            Self::Int(_) => 3,
            Self::Uint(_) => 4,
            Self::Float(_) => 5,
            Self::Array(_) => 6,
            Self::Map(_) => 7,
            Self::Optional(_) => 8,
            Self::Sequence(_) => 9,
            Self::Record(_) => 10,
        }
    }
}

fn zero_items(len: usize, elem: &TypeShape) -> Vec<Value> {
    (0..len).map(|_| Value::zero(elem)).collect()
}

fn leaf_admits(leaf: LeafKind, value: &Value) -> bool {
    matches!(
        (leaf, value),
        (LeafKind::Identifier, Value::Identifier(_))
            | (LeafKind::Text, Value::Text(_))
            | (LeafKind::Bool, Value::Bool(_))
            | (LeafKind::Int(_), Value::Int(_))
            | (LeafKind::Uint(_), Value::Uint(_))
            | (LeafKind::Float(_), Value::Float(_))
    )
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Identifier(a), Self::Identifier(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Uint(a), Self::Uint(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::Array(a), Self::Array(b)) | (Self::Record(a), Self::Record(b)) => a.cmp(b),
            (Self::Map(a), Self::Map(b)) => a.cmp(b),
            (Self::Optional(a), Self::Optional(b)) => a.cmp(b),
            (Self::Sequence(a), Self::Sequence(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl From<Uuid> for Value {
    fn from(id: Uuid) -> Self {
        Self::Identifier(id)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Field;

    fn shape() -> TypeShape {
        TypeShape::record(
            "Row",
            vec![
                Field::new("Id", TypeShape::identifier()),
                Field::new("Pair", TypeShape::array(2, TypeShape::int(64))),
                Field::new("Tags", TypeShape::map(TypeShape::text(), TypeShape::bool())),
                Field::new("Parent", TypeShape::optional(TypeShape::identifier())),
                Field::new("Scores", TypeShape::sequence(TypeShape::float(64))),
            ],
        )
    }

    #[test]
    fn zero_matrix() {
        assert_eq!(
            Value::zero(&shape()),
            Value::Record(vec![
                Value::Identifier(Uuid::nil()),
                Value::Array(vec![Value::Int(0), Value::Int(0)]),
                Value::Map(None),
                Value::Optional(None),
                Value::Sequence(None),
            ])
        );
        assert!(Value::zero(&shape()).conforms_to(&shape()));
    }

    #[test]
    fn conformance_checks_nested_values() {
        let mut value = Value::zero(&shape());
        if let Value::Record(fields) = &mut value {
            fields[3] = Value::Optional(Some(Box::new(Value::from("not an id"))));
        }
        assert!(!value.conforms_to(&shape()));
        assert!(!Value::Array(vec![Value::Int(0)])
            .conforms_to(&TypeShape::array(2, TypeShape::int(64))));
        assert!(Value::Map(Some(BTreeMap::new()))
            .conforms_to(&TypeShape::map(TypeShape::identifier(), TypeShape::text())));
    }

    #[test]
    fn ordering_is_total() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert!(Value::Identifier(Uuid::nil()) < Value::Text(String::new()));
        assert!(Value::Text("a".into()) < Value::Text("b".into()));
        assert!(Value::Sequence(None) < Value::Sequence(Some(vec![])));
        assert_ne!(Value::Array(vec![]), Value::Record(vec![]));
    }
}

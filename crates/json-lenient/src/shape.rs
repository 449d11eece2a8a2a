//! Type shapes: the closed structural description of a decodable type.
//!
//! A shape depends only on the static type it describes, never on a value.
//! Proxy shapes are ordinary shapes in which identifier leaves were replaced
//! by text leaves.

use std::fmt;

use crate::error::DecodeError;

/// Scalar leaf kinds. Integer and float kinds carry their bit width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeafKind {
    Identifier,
    Text,
    Bool,
    Int(u8),
    Uint(u8),
    Float(u8),
}

impl LeafKind {
    pub fn kind(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Text => "text",
            Self::Bool => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
        }
    }

    /// Whether this leaf can key a map in JSON text.
    pub fn is_map_key(self) -> bool {
        matches!(
            self,
            Self::Identifier | Self::Text | Self::Int(_) | Self::Uint(_)
        )
    }
}

impl fmt::Display for LeafKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier => f.write_str("uuid"),
            Self::Text => f.write_str("string"),
            Self::Bool => f.write_str("bool"),
            Self::Int(bits) => write!(f, "i{bits}"),
            Self::Uint(bits) => write!(f, "u{bits}"),
            Self::Float(bits) => write!(f, "f{bits}"),
        }
    }
}

/// Field metadata carried unchanged from a record into its proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldTag {
    /// External JSON key; the field name is used when absent.
    pub rename: Option<String>,
    /// Never matched by a JSON key.
    pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: String,
    pub tag: FieldTag,
    pub shape: TypeShape,
}

impl Field {
    pub fn new(name: impl Into<String>, shape: TypeShape) -> Self {
        Self {
            name: name.into(),
            tag: FieldTag::default(),
            shape,
        }
    }

    pub fn rename(mut self, key: impl Into<String>) -> Self {
        self.tag.rename = Some(key.into());
        self
    }

    pub fn skip(mut self) -> Self {
        self.tag.skip = true;
        self
    }

    /// The JSON key this field is decoded from.
    pub fn external_name(&self) -> &str {
        self.tag.rename.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordShape {
    pub name: String,
    pub fields: Vec<Field>,
}

impl RecordShape {
    /// Index of the field a JSON key selects: an exact match on the external
    /// name wins over a case-insensitive one. Skipped fields never match.
    pub fn field_index(&self, key: &str) -> Option<usize> {
        let visible = || {
            self.fields
                .iter()
                .enumerate()
                .filter(|(_, field)| !field.tag.skip)
        };
        visible()
            .find(|(_, field)| field.external_name() == key)
            .or_else(|| visible().find(|(_, field)| fold_eq(field.external_name(), key)))
            .map(|(index, _)| index)
    }
}

/// Case-insensitive comparison under Unicode lowercase mapping.
fn fold_eq(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Structural description of a decodable type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeShape {
    Leaf(LeafKind),
    FixedArray(usize, Box<TypeShape>),
    Map(Box<TypeShape>, Box<TypeShape>),
    Optional(Box<TypeShape>),
    Sequence(Box<TypeShape>),
    Record(RecordShape),
}

impl TypeShape {
    pub fn identifier() -> Self {
        Self::Leaf(LeafKind::Identifier)
    }

    pub fn text() -> Self {
        Self::Leaf(LeafKind::Text)
    }

    pub fn bool() -> Self {
        Self::Leaf(LeafKind::Bool)
    }

    pub fn int(bits: u8) -> Self {
        Self::Leaf(LeafKind::Int(bits))
    }

    pub fn uint(bits: u8) -> Self {
        Self::Leaf(LeafKind::Uint(bits))
    }

    pub fn float(bits: u8) -> Self {
        Self::Leaf(LeafKind::Float(bits))
    }

    pub fn array(len: usize, elem: TypeShape) -> Self {
        Self::FixedArray(len, Box::new(elem))
    }

    pub fn map(key: TypeShape, value: TypeShape) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    pub fn optional(inner: TypeShape) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn sequence(elem: TypeShape) -> Self {
        Self::Sequence(Box::new(elem))
    }

    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self::Record(RecordShape {
            name: name.into(),
            fields,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Leaf(leaf) => leaf.kind(),
            Self::FixedArray(..) => "array",
            Self::Map(..) => "map",
            Self::Optional(_) => "optional",
            Self::Sequence(_) => "sequence",
            Self::Record(_) => "record",
        }
    }

    pub fn is_identifier(&self) -> bool {
        matches!(self, Self::Leaf(LeafKind::Identifier))
    }

    /// Whether an identifier leaf occurs anywhere in this shape.
    pub fn contains_identifier(&self) -> bool {
        match self {
            Self::Leaf(leaf) => *leaf == LeafKind::Identifier,
            Self::FixedArray(_, elem) | Self::Optional(elem) | Self::Sequence(elem) => {
                elem.contains_identifier()
            }
            Self::Map(key, value) => key.contains_identifier() || value.contains_identifier(),
            Self::Record(record) => record
                .fields
                .iter()
                .any(|field| field.shape.contains_identifier()),
        }
    }

    /// Checks that JSON text can be decoded into this shape at all.
    pub fn validate(&self) -> Result<(), DecodeError> {
        match self {
            Self::Leaf(LeafKind::Int(bits) | LeafKind::Uint(bits))
                if !matches!(bits, 8 | 16 | 32 | 64) =>
            {
                Err(DecodeError::Usage(format!("unsupported integer width {bits}")))
            }
            Self::Leaf(LeafKind::Float(bits)) if !matches!(bits, 32 | 64) => {
                Err(DecodeError::Usage(format!("unsupported float width {bits}")))
            }
            Self::Leaf(_) => Ok(()),
            Self::FixedArray(_, elem) | Self::Optional(elem) | Self::Sequence(elem) => {
                elem.validate()
            }
            Self::Map(key, value) => {
                match key.as_ref() {
                    Self::Leaf(leaf) if leaf.is_map_key() => key.validate()?,
                    other => {
                        return Err(DecodeError::Usage(format!(
                            "unsupported map key type {other}"
                        )))
                    }
                }
                value.validate()
            }
            Self::Record(record) => record
                .fields
                .iter()
                .try_for_each(|field| field.shape.validate()),
        }
    }
}

impl fmt::Display for TypeShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(leaf) => write!(f, "{leaf}"),
            Self::FixedArray(len, elem) => write!(f, "[{elem}; {len}]"),
            Self::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            Self::Optional(inner) => write!(f, "Option<{inner}>"),
            Self::Sequence(elem) => write!(f, "Vec<{elem}>"),
            Self::Record(record) => {
                write!(f, "{} {{ ", record.name)?;
                for (i, field) in record.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.shape)?;
                }
                f.write_str(" }")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TypeShape {
        TypeShape::record(
            "Sample",
            vec![
                Field::new("Ids", TypeShape::array(2, TypeShape::identifier())),
                Field::new("Names", TypeShape::map(TypeShape::text(), TypeShape::text()))
                    .rename("names"),
            ],
        )
    }

    #[test]
    fn display_matrix() {
        assert_eq!(TypeShape::identifier().to_string(), "uuid");
        assert_eq!(TypeShape::int(32).to_string(), "i32");
        assert_eq!(
            TypeShape::optional(TypeShape::sequence(TypeShape::uint(8))).to_string(),
            "Option<Vec<u8>>"
        );
        assert_eq!(
            sample().to_string(),
            "Sample { Ids: [uuid; 2], Names: Map<string, string> }"
        );
    }

    #[test]
    fn contains_identifier_looks_through_composites() {
        assert!(sample().contains_identifier());
        assert!(TypeShape::map(TypeShape::identifier(), TypeShape::bool()).contains_identifier());
        assert!(!TypeShape::sequence(TypeShape::optional(TypeShape::text())).contains_identifier());
    }

    #[test]
    fn field_lookup_prefers_exact_match() {
        let TypeShape::Record(record) = TypeShape::record(
            "Keys",
            vec![
                Field::new("ID", TypeShape::text()),
                Field::new("id", TypeShape::text()),
                Field::new("Hidden", TypeShape::text()).skip(),
                Field::new("Other", TypeShape::text()).rename("other_key"),
            ],
        ) else {
            panic!("record expected");
        };
        assert_eq!(record.field_index("id"), Some(1));
        assert_eq!(record.field_index("ID"), Some(0));
        assert_eq!(record.field_index("Id"), Some(0));
        assert_eq!(record.field_index("hidden"), None);
        assert_eq!(record.field_index("Other"), None);
        assert_eq!(record.field_index("OTHER_KEY"), Some(3));
    }

    #[test]
    fn field_lookup_folds_unicode_case() {
        let TypeShape::Record(record) = TypeShape::record(
            "Sizes",
            vec![
                Field::new("Größe", TypeShape::text()),
                Field::new("Ärger", TypeShape::text()),
            ],
        ) else {
            panic!("record expected");
        };
        assert_eq!(record.field_index("GRÖßE"), Some(0));
        assert_eq!(record.field_index("größe"), Some(0));
        assert_eq!(record.field_index("ärger"), Some(1));
        assert_eq!(record.field_index("Arger"), None);
    }

    #[test]
    fn validate_rejects_undecodable_shapes() {
        assert!(sample().validate().is_ok());
        assert!(TypeShape::map(TypeShape::uint(16), TypeShape::identifier())
            .validate()
            .is_ok());
        assert!(TypeShape::map(TypeShape::bool(), TypeShape::text())
            .validate()
            .unwrap_err()
            .is_usage());
        assert!(TypeShape::map(TypeShape::sequence(TypeShape::text()), TypeShape::text())
            .validate()
            .is_err());
        assert!(TypeShape::int(12).validate().is_err());
        assert!(TypeShape::optional(TypeShape::float(16)).validate().is_err());
    }
}

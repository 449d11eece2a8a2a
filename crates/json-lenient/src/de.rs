//! Shape-directed decoding: lets a serde deserializer fill a [`Value`] of any
//! [`TypeShape`] in place.
//!
//! The conventions follow the usual JSON object-binding rules:
//! - `null` leaves leaves, fixed arrays and records unchanged and makes maps,
//!   optionals and sequences absent;
//! - record keys match exactly, then case-insensitively, and unknown
//!   keys are skipped;
//! - missing trailing fixed-array positions are zeroed, extra ones dropped;
//! - a present map is merged into; sequences are rebuilt.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Unexpected, Visitor};

use crate::error::DecodeError;
use crate::identifier::parse_identifier;
use crate::shape::{LeafKind, RecordShape, TypeShape};
use crate::value::Value;

/// Side channel for the identifier error that aborted a decode, so it can be
/// reported as [`DecodeError::IdentifierFormat`] rather than a syntax error.
#[derive(Default)]
pub(crate) struct DecodeContext {
    identifier_error: RefCell<Option<(String, uuid::Error)>>,
}

impl DecodeContext {
    fn record(&self, text: &str, source: uuid::Error) {
        let mut slot = self.identifier_error.borrow_mut();
        if slot.is_none() {
            *slot = Some((text.to_owned(), source));
        }
    }

    pub(crate) fn into_error(self, err: serde_json::Error) -> DecodeError {
        match self.identifier_error.into_inner() {
            Some((text, source)) => DecodeError::IdentifierFormat { text, source },
            None => DecodeError::Syntax(err),
        }
    }
}

/// Decodes one JSON document from `bytes` into `slot`.
pub(crate) fn decode_slice(bytes: &[u8], shape: &TypeShape, slot: &mut Value) -> Result<(), DecodeError> {
    let ctx = DecodeContext::default();
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    let result = Place::new(shape, slot, &ctx)
        .deserialize(&mut deserializer)
        .and_then(|()| deserializer.end());
    result.map_err(|err| ctx.into_error(err))
}

/// A destination slot together with the shape it holds.
pub(crate) struct Place<'a> {
    shape: &'a TypeShape,
    slot: &'a mut Value,
    ctx: &'a DecodeContext,
}

impl<'a> Place<'a> {
    pub(crate) fn new(shape: &'a TypeShape, slot: &'a mut Value, ctx: &'a DecodeContext) -> Self {
        Self { shape, slot, ctx }
    }
}

impl<'de> DeserializeSeed<'de> for Place<'_> {
    type Value = ();

    fn deserialize<D>(self, deserializer: D) -> Result<(), D::Error>
    where
        D: Deserializer<'de>,
    {
        let Place { shape, slot, ctx } = self;

        match shape {
            TypeShape::Leaf(kind) => {
                let visitor = LeafVisitor { kind: *kind, ctx };
                if let Some(value) = deserializer.deserialize_any(visitor)? {
                    *slot = value;
                }
            }
            TypeShape::FixedArray(len, elem) => {
                let items = match &mut *slot {
                    Value::Array(items) if items.len() == *len => std::mem::take(items),
                    _ => zero_items(*len, elem),
                };
                let visitor = ArrayVisitor { elem, items, ctx };
                *slot = Value::Array(deserializer.deserialize_any(visitor)?);
            }
            TypeShape::Map(key, value) => {
                let existing = match &mut *slot {
                    Value::Map(entries) => entries.take(),
                    _ => None,
                };
                let visitor = MapVisitor { key, value, existing, ctx };
                *slot = Value::Map(deserializer.deserialize_any(visitor)?);
            }
            TypeShape::Optional(inner) => {
                let existing = match &mut *slot {
                    Value::Optional(boxed) => boxed.take(),
                    _ => None,
                };
                let visitor = OptionalVisitor { inner, existing, ctx };
                *slot = Value::Optional(deserializer.deserialize_option(visitor)?);
            }
            TypeShape::Sequence(elem) => {
                let visitor = SequenceVisitor { elem, ctx };
                *slot = Value::Sequence(deserializer.deserialize_any(visitor)?);
            }
            TypeShape::Record(record) => {
                let fields = match &mut *slot {
                    Value::Record(fields) if fields.len() == record.fields.len() => std::mem::take(fields),
                    _ => record
                        .fields
                        .iter()
                        .map(|field| Value::zero(&field.shape))
                        .collect(),
                };
                let visitor = RecordVisitor { record, fields, ctx };
                *slot = Value::Record(deserializer.deserialize_any(visitor)?);
            }
        }
        Ok(())
    }
}

fn zero_items(len: usize, elem: &TypeShape) -> Vec<Value> {
    (0..len).map(|_| Value::zero(elem)).collect()
}

fn fits_signed(v: i64, bits: u8) -> bool {
    match bits {
        8 => i8::try_from(v).is_ok(),
        16 => i16::try_from(v).is_ok(),
        32 => i32::try_from(v).is_ok(),
        _ => true,
    }
}

fn fits_unsigned(v: u64, bits: u8) -> bool {
    match bits {
        8 => u8::try_from(v).is_ok(),
        16 => u16::try_from(v).is_ok(),
        32 => u32::try_from(v).is_ok(),
        _ => true,
    }
}

fn fits_float(v: f64, bits: u8) -> bool {
    bits != 32 || !v.is_finite() || v.abs() <= f64::from(f32::MAX)
}

// -------------------------------------------------------------------------
// Leaves

/// Yields `None` for `null`, which leaves the slot unchanged.
struct LeafVisitor<'a> {
    kind: LeafKind,
    ctx: &'a DecodeContext,
}

impl LeafVisitor<'_> {
    fn signed<E: de::Error>(self, v: i64) -> Result<Option<Value>, E> {
        match self.kind {
            LeafKind::Int(bits) if fits_signed(v, bits) => Ok(Some(Value::Int(v))),
            LeafKind::Uint(bits) if v >= 0 && fits_unsigned(v as u64, bits) => {
                Ok(Some(Value::Uint(v as u64)))
            }
            LeafKind::Int(_) | LeafKind::Uint(_) => Err(E::invalid_value(Unexpected::Signed(v), &self)),
            LeafKind::Float(_) => Ok(Some(Value::Float(v as f64))),
            _ => Err(E::invalid_type(Unexpected::Signed(v), &self)),
        }
    }

    fn unsigned<E: de::Error>(self, v: u64) -> Result<Option<Value>, E> {
        match self.kind {
            LeafKind::Uint(bits) if fits_unsigned(v, bits) => Ok(Some(Value::Uint(v))),
            LeafKind::Int(bits) if i64::try_from(v).is_ok_and(|v| fits_signed(v, bits)) => {
                Ok(Some(Value::Int(v as i64)))
            }
            LeafKind::Int(_) | LeafKind::Uint(_) => {
                Err(E::invalid_value(Unexpected::Unsigned(v), &self))
            }
            LeafKind::Float(_) => Ok(Some(Value::Float(v as f64))),
            _ => Err(E::invalid_type(Unexpected::Unsigned(v), &self)),
        }
    }
}

impl<'de> Visitor<'de> for LeafVisitor<'_> {
    type Value = Option<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LeafKind::Identifier => f.write_str("a UUID string"),
            LeafKind::Text => f.write_str("a string"),
            LeafKind::Bool => f.write_str("a boolean"),
            LeafKind::Int(bits) => write!(f, "a signed {bits}-bit integer"),
            LeafKind::Uint(bits) => write!(f, "an unsigned {bits}-bit integer"),
            LeafKind::Float(_) => f.write_str("a number"),
        }
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        match self.kind {
            LeafKind::Bool => Ok(Some(Value::Bool(v))),
            _ => Err(E::invalid_type(Unexpected::Bool(v), &self)),
        }
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        self.signed(v)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        self.unsigned(v)
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        match self.kind {
            LeafKind::Float(bits) if fits_float(v, bits) => Ok(Some(Value::Float(v))),
            LeafKind::Float(_) => Err(E::invalid_value(Unexpected::Float(v), &self)),
            _ => Err(E::invalid_type(Unexpected::Float(v), &self)),
        }
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        match self.kind {
            LeafKind::Text => Ok(Some(Value::Text(v.to_owned()))),
            LeafKind::Identifier => match parse_identifier(v) {
                Ok(id) => Ok(Some(Value::Identifier(id))),
                Err(source) => {
                    self.ctx.record(v, source);
                    Err(E::custom(format_args!("invalid identifier {v:?}")))
                }
            },
            _ => Err(E::invalid_type(Unexpected::Str(v), &self)),
        }
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        match self.kind {
            LeafKind::Text => Ok(Some(Value::Text(v))),
            _ => self.visit_str(&v),
        }
    }
}

// -------------------------------------------------------------------------
// Fixed arrays

struct ArrayVisitor<'a> {
    elem: &'a TypeShape,
    items: Vec<Value>,
    ctx: &'a DecodeContext,
}

impl<'de> Visitor<'de> for ArrayVisitor<'_> {
    type Value = Vec<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of {} elements", self.items.len())
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(self.items)
    }

    fn visit_seq<A: SeqAccess<'de>>(mut self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut filled = 0;
        while filled < self.items.len() {
            let place = Place::new(self.elem, &mut self.items[filled], self.ctx);
            if seq.next_element_seed(place)?.is_none() {
                break;
            }
            filled += 1;
        }
        for item in &mut self.items[filled..] {
            *item = Value::zero(self.elem);
        }
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(self.items)
    }
}

// -------------------------------------------------------------------------
// Maps

struct MapVisitor<'a> {
    key: &'a TypeShape,
    value: &'a TypeShape,
    existing: Option<BTreeMap<Value, Value>>,
    ctx: &'a DecodeContext,
}

impl MapVisitor<'_> {
    fn parse_key<E: de::Error>(&self, raw: String) -> Result<Value, E> {
        match self.key {
            TypeShape::Leaf(LeafKind::Text) => Ok(Value::Text(raw)),
            TypeShape::Leaf(LeafKind::Identifier) => match parse_identifier(&raw) {
                Ok(id) => Ok(Value::Identifier(id)),
                Err(source) => {
                    self.ctx.record(&raw, source);
                    Err(E::custom(format_args!("invalid identifier map key {raw:?}")))
                }
            },
            TypeShape::Leaf(LeafKind::Int(bits)) => match raw.parse::<i64>() {
                Ok(v) if fits_signed(v, *bits) => Ok(Value::Int(v)),
                _ => Err(E::invalid_value(Unexpected::Str(&raw), &"an integer map key")),
            },
            TypeShape::Leaf(LeafKind::Uint(bits)) => match raw.parse::<u64>() {
                Ok(v) if fits_unsigned(v, *bits) => Ok(Value::Uint(v)),
                _ => Err(E::invalid_value(Unexpected::Str(&raw), &"an unsigned integer map key")),
            },
            other => Err(E::custom(format_args!("unsupported map key type {other}"))),
        }
    }
}

impl<'de> Visitor<'de> for MapVisitor<'_> {
    type Value = Option<BTreeMap<Value, Value>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an object of {} values", self.value)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_map<A: MapAccess<'de>>(mut self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = self.existing.take().unwrap_or_default();
        while let Some(raw) = map.next_key::<String>()? {
            let key = self.parse_key::<A::Error>(raw)?;
            let mut value = Value::zero(self.value);
            map.next_value_seed(Place::new(self.value, &mut value, self.ctx))?;
            entries.insert(key, value);
        }
        Ok(Some(entries))
    }
}

// -------------------------------------------------------------------------
// Optionals

struct OptionalVisitor<'a> {
    inner: &'a TypeShape,
    existing: Option<Box<Value>>,
    ctx: &'a DecodeContext,
}

impl<'de> Visitor<'de> for OptionalVisitor<'_> {
    type Value = Option<Box<Value>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "null or {}", self.inner)
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        let mut boxed = self
            .existing
            .unwrap_or_else(|| Box::new(Value::zero(self.inner)));
        Place::new(self.inner, &mut boxed, self.ctx).deserialize(deserializer)?;
        Ok(Some(boxed))
    }
}

// -------------------------------------------------------------------------
// Sequences

struct SequenceVisitor<'a> {
    elem: &'a TypeShape,
    ctx: &'a DecodeContext,
}

impl<'de> Visitor<'de> for SequenceVisitor<'_> {
    type Value = Option<Vec<Value>>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an array of {}", self.elem)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        loop {
            let mut item = Value::zero(self.elem);
            if seq
                .next_element_seed(Place::new(self.elem, &mut item, self.ctx))?
                .is_none()
            {
                break;
            }
            items.push(item);
        }
        Ok(Some(items))
    }
}

// -------------------------------------------------------------------------
// Records

struct RecordVisitor<'a> {
    record: &'a RecordShape,
    fields: Vec<Value>,
    ctx: &'a DecodeContext,
}

impl<'de> Visitor<'de> for RecordVisitor<'_> {
    type Value = Vec<Value>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an object for {}", self.record.name)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(self.fields)
    }

    fn visit_map<A: MapAccess<'de>>(mut self, mut map: A) -> Result<Self::Value, A::Error> {
        while let Some(key) = map.next_key::<String>()? {
            match self.record.field_index(&key) {
                Some(index) => {
                    let shape = &self.record.fields[index].shape;
                    map.next_value_seed(Place::new(shape, &mut self.fields[index], self.ctx))?;
                }
                None => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Field;
    use uuid::Uuid;

    const ID: &str = "14720916-dd67-11eb-b5da-305a3a7ae79b";

    fn decode(json: &str, shape: &TypeShape) -> Result<Value, DecodeError> {
        let mut value = Value::zero(shape);
        decode_slice(json.as_bytes(), shape, &mut value)?;
        Ok(value)
    }

    fn text(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn leaf_matrix() {
        assert_eq!(decode(r#""abc""#, &TypeShape::text()).unwrap(), text("abc"));
        assert_eq!(decode("true", &TypeShape::bool()).unwrap(), Value::Bool(true));
        assert_eq!(decode("-5", &TypeShape::int(8)).unwrap(), Value::Int(-5));
        assert_eq!(decode("255", &TypeShape::uint(8)).unwrap(), Value::Uint(255));
        assert_eq!(decode("3", &TypeShape::float(64)).unwrap(), Value::Float(3.0));
        assert_eq!(decode("2.5", &TypeShape::float(32)).unwrap(), Value::Float(2.5));
        assert_eq!(
            decode(&format!("\"{ID}\""), &TypeShape::identifier()).unwrap(),
            Value::Identifier(Uuid::parse_str(ID).unwrap())
        );
        assert_eq!(decode("null", &TypeShape::text()).unwrap(), text(""));
    }

    #[test]
    fn leaf_errors() {
        assert!(decode("256", &TypeShape::uint(8)).unwrap_err().is_syntax());
        assert!(decode("-1", &TypeShape::uint(64)).unwrap_err().is_syntax());
        assert!(decode("1.5", &TypeShape::int(64)).unwrap_err().is_syntax());
        assert!(decode("1e39", &TypeShape::float(32)).unwrap_err().is_syntax());
        assert!(decode("-1e39", &TypeShape::float(32)).unwrap_err().is_syntax());
        assert_eq!(decode("1e39", &TypeShape::float(64)).unwrap(), Value::Float(1e39));
        assert_eq!(decode("3.0e38", &TypeShape::float(32)).unwrap(), Value::Float(3.0e38));
        assert!(decode("{}", &TypeShape::text()).unwrap_err().is_syntax());
        assert!(decode(r#""x""#, &TypeShape::bool()).unwrap_err().is_syntax());
        assert!(decode(r#""abc" 1"#, &TypeShape::text()).unwrap_err().is_syntax());
        assert!(decode(r#""""#, &TypeShape::identifier())
            .unwrap_err()
            .is_identifier_format());
    }

    #[test]
    fn null_keeps_leaf_and_clears_nilable() {
        let shape = TypeShape::record(
            "Row",
            vec![
                Field::new("Name", TypeShape::text()),
                Field::new("Tags", TypeShape::sequence(TypeShape::text())),
            ],
        );
        let mut value = Value::Record(vec![text("kept"), Value::Sequence(Some(vec![text("x")]))]);
        decode_slice(br#"{"name": null, "tags": null}"#, &shape, &mut value).unwrap();
        assert_eq!(value, Value::Record(vec![text("kept"), Value::Sequence(None)]));
    }

    #[test]
    fn fixed_array_pads_and_truncates() {
        let shape = TypeShape::array(3, TypeShape::int(32));
        let mut value = Value::Array(vec![Value::Int(7), Value::Int(8), Value::Int(9)]);
        decode_slice(b"[1]", &shape, &mut value).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(0), Value::Int(0)]));

        decode_slice(b"[1, 2, 3, 4, 5]", &shape, &mut value).unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[test]
    fn map_keys_are_parsed_per_key_shape() {
        let shape = TypeShape::map(TypeShape::int(16), TypeShape::text());
        let value = decode(r#"{"-3": "a", "10": "b"}"#, &shape).unwrap();
        let Value::Map(Some(entries)) = value else {
            panic!("present map expected");
        };
        assert_eq!(entries[&Value::Int(-3)], text("a"));
        assert_eq!(entries[&Value::Int(10)], text("b"));

        assert!(decode(r#"{"x": "a"}"#, &shape).unwrap_err().is_syntax());
        assert!(decode(
            r#"{"nope": "a"}"#,
            &TypeShape::map(TypeShape::identifier(), TypeShape::text())
        )
        .unwrap_err()
        .is_identifier_format());
    }

    #[test]
    fn present_map_is_merged_into() {
        let shape = TypeShape::map(TypeShape::text(), TypeShape::int(64));
        let mut existing = BTreeMap::new();
        existing.insert(text("old"), Value::Int(1));
        let mut value = Value::Map(Some(existing));
        decode_slice(br#"{"new": 2}"#, &shape, &mut value).unwrap();
        let Value::Map(Some(entries)) = value else {
            panic!("present map expected");
        };
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn absent_versus_empty_containers() {
        let seq = TypeShape::sequence(TypeShape::text());
        assert_eq!(decode("null", &seq).unwrap(), Value::Sequence(None));
        assert_eq!(decode("[]", &seq).unwrap(), Value::Sequence(Some(vec![])));

        let map = TypeShape::map(TypeShape::text(), TypeShape::text());
        assert_eq!(decode("null", &map).unwrap(), Value::Map(None));
        assert_eq!(decode("{}", &map).unwrap(), Value::Map(Some(BTreeMap::new())));

        let opt = TypeShape::optional(TypeShape::sequence(TypeShape::text()));
        assert_eq!(decode("null", &opt).unwrap(), Value::Optional(None));
        assert_eq!(
            decode("[]", &opt).unwrap(),
            Value::Optional(Some(Box::new(Value::Sequence(Some(vec![])))))
        );
    }

    #[test]
    fn record_keys_match_case_insensitively_and_skip_unknown() {
        let shape = TypeShape::record(
            "Person",
            vec![
                Field::new("Name", TypeShape::text()),
                Field::new("Age", TypeShape::uint(8)).rename("years"),
                Field::new("Secret", TypeShape::text()).skip(),
            ],
        );
        let value = decode(
            r#"{"NAME": "ann", "Years": 30, "secret": "s", "extra": [1, {"a": null}]}"#,
            &shape,
        )
        .unwrap();
        assert_eq!(value, Value::Record(vec![text("ann"), Value::Uint(30), text("")]));
    }

    #[test]
    fn record_keys_fold_non_ascii_case() {
        let shape = TypeShape::record("Size", vec![Field::new("Größe", TypeShape::text())]);
        let value = decode(r#"{"GRÖßE": "xl"}"#, &shape).unwrap();
        assert_eq!(value, Value::Record(vec![text("xl")]));
    }
}

//! Static Rust types as shapes.
//!
//! [`Shaped`] maps a concrete type to its [`TypeShape`] and converts values to
//! and from [`Value`]. Records are declared with [`shaped_record!`].
//!
//! Rust maps and vectors cannot be nil, so `HashMap`, `BTreeMap` and `Vec`
//! read an absent value as empty; wrap them in `Option` to keep absence.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use uuid::Uuid;

use crate::cache::SchemaCache;
use crate::decode::wrap;
use crate::error::DecodeError;
use crate::options::Options;
use crate::shape::TypeShape;
use crate::value::Value;

/// A Rust type with a [`TypeShape`].
pub trait Shaped: Sized {
    fn shape() -> TypeShape;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, DecodeError>;
}

/// Decodes `bytes` into `target`, keeping fields the input does not mention.
pub fn decode<T: Shaped>(bytes: &[u8], target: &mut T, options: Options) -> Result<(), DecodeError> {
    let shape = T::shape();
    let mut value = target.to_value();
    wrap(&shape, &mut value, options)
        .cached(SchemaCache::global())
        .decode(bytes)?;
    *target = T::from_value(value)?;
    Ok(())
}

/// Decodes `bytes` into a fresh `T::default()`.
pub fn from_slice<T: Shaped + Default>(bytes: &[u8], options: Options) -> Result<T, DecodeError> {
    let mut target = T::default();
    decode(bytes, &mut target, options)?;
    Ok(target)
}

#[doc(hidden)]
pub fn record_fields(
    value: Value,
    name: &str,
    arity: usize,
) -> Result<std::vec::IntoIter<Value>, DecodeError> {
    match value {
        Value::Record(fields) if fields.len() == arity => Ok(fields.into_iter()),
        other => Err(DecodeError::unexpected(&format!("record {name}"), &other)),
    }
}

#[doc(hidden)]
pub fn next_field(fields: &mut std::vec::IntoIter<Value>) -> Result<Value, DecodeError> {
    fields
        .next()
        .ok_or_else(|| DecodeError::InternalConsistency("record ran out of fields".to_string()))
}

/// Declares a struct and implements [`Shaped`] for it.
///
/// Fields decode from their own name (matched case-insensitively), or from the
/// key given with `#[json = "..."]`.
///
/// ```
/// use json_lenient::{shaped_record, typed, Options};
/// use uuid::Uuid;
///
/// shaped_record! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Order {
///         pub id: Uuid,
///         #[json = "customer_id"]
///         pub customer: Option<Uuid>,
///     }
/// }
///
/// let order: Order = typed::from_slice(br#"{"id": "", "customer_id": null}"#, Options::ALLOW_EMPTY)?;
/// assert_eq!(order, Order { id: Uuid::nil(), customer: None });
/// # Ok::<_, json_lenient::DecodeError>(())
/// ```
#[macro_export]
macro_rules! shaped_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[json = $rename:literal])?
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($field_vis $field: $ty,)*
        }

        impl $crate::Shaped for $name {
            fn shape() -> $crate::TypeShape {
                $crate::TypeShape::record(
                    stringify!($name),
                    vec![
                        $(
                            $crate::Field::new(
                                stringify!($field),
                                <$ty as $crate::Shaped>::shape(),
                            )
                            $(.rename($rename))?,
                        )*
                    ],
                )
            }

            fn to_value(&self) -> $crate::Value {
                $crate::Value::Record(vec![
                    $($crate::Shaped::to_value(&self.$field),)*
                ])
            }

            fn from_value(
                value: $crate::Value,
            ) -> ::std::result::Result<Self, $crate::DecodeError> {
                let arity = 0usize $(+ { let _ = stringify!($field); 1 })*;
                #[allow(unused_mut, unused_variables)]
                let mut fields = $crate::typed::record_fields(value, stringify!($name), arity)?;
                Ok(Self {
                    $(
                        $field: <$ty as $crate::Shaped>::from_value(
                            $crate::typed::next_field(&mut fields)?,
                        )?,
                    )*
                })
            }
        }
    };
}

impl Shaped for Uuid {
    fn shape() -> TypeShape {
        TypeShape::identifier()
    }

    fn to_value(&self) -> Value {
        Value::Identifier(*self)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Identifier(id) => Ok(id),
            other => Err(DecodeError::unexpected("identifier", &other)),
        }
    }
}

impl Shaped for String {
    fn shape() -> TypeShape {
        TypeShape::text()
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Text(text) => Ok(text),
            other => Err(DecodeError::unexpected("text", &other)),
        }
    }
}

impl Shaped for bool {
    fn shape() -> TypeShape {
        TypeShape::bool()
    }

    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(DecodeError::unexpected("bool", &other)),
        }
    }
}

macro_rules! shaped_signed {
    ($($ty:ty),*) => {$(
        impl Shaped for $ty {
            fn shape() -> TypeShape {
                TypeShape::int(<$ty>::BITS as u8)
            }

            fn to_value(&self) -> Value {
                Value::Int(*self as i64)
            }

            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::Int(v) => <$ty>::try_from(v).map_err(|_| {
                        DecodeError::InternalConsistency(format!(
                            "{v} out of range for {}",
                            stringify!($ty)
                        ))
                    }),
                    other => Err(DecodeError::unexpected("int", &other)),
                }
            }
        }
    )*};
}

macro_rules! shaped_unsigned {
    ($($ty:ty),*) => {$(
        impl Shaped for $ty {
            fn shape() -> TypeShape {
                TypeShape::uint(<$ty>::BITS as u8)
            }

            fn to_value(&self) -> Value {
                Value::Uint(*self as u64)
            }

            fn from_value(value: Value) -> Result<Self, DecodeError> {
                match value {
                    Value::Uint(v) => <$ty>::try_from(v).map_err(|_| {
                        DecodeError::InternalConsistency(format!(
                            "{v} out of range for {}",
                            stringify!($ty)
                        ))
                    }),
                    other => Err(DecodeError::unexpected("uint", &other)),
                }
            }
        }
    )*};
}

shaped_signed!(i8, i16, i32, i64, isize);
shaped_unsigned!(u8, u16, u32, u64, usize);

impl Shaped for f32 {
    fn shape() -> TypeShape {
        TypeShape::float(32)
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => Err(
                DecodeError::InternalConsistency(format!("{v} out of range for f32")),
            ),
            Value::Float(v) => Ok(v as f32),
            other => Err(DecodeError::unexpected("float", &other)),
        }
    }
}

impl Shaped for f64 {
    fn shape() -> TypeShape {
        TypeShape::float(64)
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(v) => Ok(v),
            other => Err(DecodeError::unexpected("float", &other)),
        }
    }
}

impl<T: Shaped, const N: usize> Shaped for [T; N] {
    fn shape() -> TypeShape {
        TypeShape::array(N, T::shape())
    }

    fn to_value(&self) -> Value {
        Value::Array(self.iter().map(Shaped::to_value).collect())
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        let Value::Array(items) = value else {
            return Err(DecodeError::unexpected("array", &value));
        };
        let items = items
            .into_iter()
            .map(T::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        let len = items.len();
        items.try_into().map_err(|_| {
            DecodeError::InternalConsistency(format!("array of length {len} where {N} is required"))
        })
    }
}

impl<T: Shaped> Shaped for Vec<T> {
    fn shape() -> TypeShape {
        TypeShape::sequence(T::shape())
    }

    fn to_value(&self) -> Value {
        Value::Sequence(Some(self.iter().map(Shaped::to_value).collect()))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Sequence(items) => items
                .unwrap_or_default()
                .into_iter()
                .map(T::from_value)
                .collect(),
            other => Err(DecodeError::unexpected("sequence", &other)),
        }
    }
}

impl<T: Shaped> Shaped for Option<T> {
    fn shape() -> TypeShape {
        TypeShape::optional(T::shape())
    }

    fn to_value(&self) -> Value {
        Value::Optional(self.as_ref().map(|v| Box::new(v.to_value())))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Optional(inner) => inner.map(|v| T::from_value(*v)).transpose(),
            other => Err(DecodeError::unexpected("optional", &other)),
        }
    }
}

impl<T: Shaped> Shaped for Box<T> {
    fn shape() -> TypeShape {
        T::shape()
    }

    fn to_value(&self) -> Value {
        T::to_value(self)
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        T::from_value(value).map(Box::new)
    }
}

impl<K, V, S> Shaped for HashMap<K, V, S>
where
    K: Shaped + Eq + Hash,
    V: Shaped,
    S: BuildHasher + Default,
{
    fn shape() -> TypeShape {
        TypeShape::map(K::shape(), V::shape())
    }

    fn to_value(&self) -> Value {
        Value::Map(Some(
            self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect(),
        ))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Map(entries) => entries
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(DecodeError::unexpected("map", &other)),
        }
    }
}

impl<K, V> Shaped for BTreeMap<K, V>
where
    K: Shaped + Ord,
    V: Shaped,
{
    fn shape() -> TypeShape {
        TypeShape::map(K::shape(), V::shape())
    }

    fn to_value(&self) -> Value {
        Value::Map(Some(
            self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect(),
        ))
    }

    fn from_value(value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Map(entries) => entries
                .unwrap_or_default()
                .into_iter()
                .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
                .collect(),
            other => Err(DecodeError::unexpected("map", &other)),
        }
    }
}
